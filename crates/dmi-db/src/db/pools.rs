//! Connection pools for the two physical stores

use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use dmi_core::{Config, DatabaseRouter, Store, DATA_DOMAIN};

static OPERATIONAL_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/operational");
static ANALYTICAL_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/analytical");

/// Domain whose schema the operational migration set creates
pub const USERS_DOMAIN: &str = "users";

/// Migration sets, each tagged with the store and domain it was written for
fn migration_sets() -> [(Store, &'static str, &'static Migrator); 2] {
    [
        (Store::Operational, USERS_DOMAIN, &OPERATIONAL_MIGRATIONS),
        (Store::Analytical, DATA_DOMAIN, &ANALYTICAL_MIGRATIONS),
    ]
}

/// Pools for both stores plus the policy that picks between them
#[derive(Clone)]
pub struct DatabasePools {
    operational: PgPool,
    analytical: PgPool,
    router: DatabaseRouter,
}

impl DatabasePools {
    pub fn new(operational: PgPool, analytical: PgPool, router: DatabaseRouter) -> Self {
        Self {
            operational,
            analytical,
            router,
        }
    }

    /// Connect both stores and, if enabled, run their migrations
    pub async fn connect(config: &Config) -> Result<Self> {
        let db = config.database();
        let operational = connect_pool(Store::Operational, &db.operational_url, config).await?;
        let analytical = connect_pool(Store::Analytical, &db.analytical_url, config).await?;

        let pools = Self::new(operational, analytical, config.router());
        if db.run_migrations {
            pools.migrate().await?;
        }
        Ok(pools)
    }

    pub fn router(&self) -> &DatabaseRouter {
        &self.router
    }

    pub fn pool(&self, store: Store) -> &PgPool {
        match store {
            Store::Operational => &self.operational,
            Store::Analytical => &self.analytical,
        }
    }

    /// Pool serving reads for `domain`
    pub fn for_read(&self, domain: &str) -> &PgPool {
        self.pool(self.router.route_for_read(domain))
    }

    /// Pool receiving writes for `domain`
    pub fn for_write(&self, domain: &str) -> &PgPool {
        self.pool(self.router.route_for_write(domain))
    }

    /// Apply every migration set the router allows on its store.
    ///
    /// Returns the (store, domain) pairs that were migrated.
    pub async fn migrate(&self) -> Result<Vec<(Store, &'static str)>> {
        let mut applied = Vec::new();
        for (store, domain, migrator) in migration_sets() {
            if !self.router.allow_migrate(store, domain) {
                tracing::warn!(
                    store = %store,
                    domain,
                    "Skipping migrations: domain is not owned by this store"
                );
                continue;
            }
            migrator
                .run(self.pool(store))
                .await
                .with_context(|| format!("Failed to run {} migrations on {}", domain, store))?;
            tracing::info!(store = %store, domain, "Database migrations applied");
            applied.push((store, domain));
        }
        Ok(applied)
    }
}

async fn connect_pool(store: Store, url: &str, config: &Config) -> Result<PgPool> {
    let db = config.database();
    tracing::info!(store = %store, "Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(url)
        .await
        .with_context(|| format!("Failed to connect to the {} store", store))?;

    tracing::info!(
        store = %store,
        max_connections = db.max_connections,
        "Database connected successfully"
    );
    Ok(pool)
}
