//! Configuration module
//!
//! Environment-driven settings for the intake service: the two database
//! connections, upload limits and where original files are kept.

use std::env;

use crate::routing::{DatabaseRouter, DATA_DOMAIN};

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const UPLOAD_MAX_FILE_SIZE_MB: u64 = 20;
const BYTES_PER_MB: u64 = 1024 * 1024;

fn megabytes_to_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(BYTES_PER_MB)
        .ok_or_else(|| anyhow::anyhow!("UPLOAD_MAX_FILE_SIZE_MB is too large: {}", mb))
}

/// Upload ceiling in bytes from `UPLOAD_MAX_FILE_SIZE_MB` (default 20 MB)
pub fn upload_limit_from_env() -> Result<u64, anyhow::Error> {
    let mb = env::var("UPLOAD_MAX_FILE_SIZE_MB")
        .unwrap_or_else(|_| UPLOAD_MAX_FILE_SIZE_MB.to_string())
        .parse::<u64>()
        .unwrap_or(UPLOAD_MAX_FILE_SIZE_MB);
    megabytes_to_bytes(mb)
}

/// Domains served by the analytical store, from `ANALYTICAL_DOMAINS`
pub fn analytical_domains_from_env() -> Vec<String> {
    env::var("ANALYTICAL_DOMAINS")
        .unwrap_or_else(|_| DATA_DOMAIN.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Connection settings for both physical stores
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Operational store (`default`): identity, sessions, profiles
    pub operational_url: String,
    /// Analytical store (`msdat`): intake data
    pub analytical_url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
    pub run_migrations: bool,
}

/// Intake service configuration
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub environment: String,
    pub database: DatabaseConfig,
    pub max_file_size_bytes: u64,
    pub storage_path: String,
    pub storage_base_url: String,
    pub analytical_domains: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IntakeConfig>);

impl Config {
    fn as_intake(&self) -> &IntakeConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_intake().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IntakeConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_intake().validate()
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.as_intake().database
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.as_intake().max_file_size_bytes
    }

    pub fn storage_path(&self) -> &str {
        &self.as_intake().storage_path
    }

    pub fn storage_base_url(&self) -> &str {
        &self.as_intake().storage_base_url
    }

    /// Routing policy built from `ANALYTICAL_DOMAINS`
    pub fn router(&self) -> DatabaseRouter {
        DatabaseRouter::new(self.as_intake().analytical_domains.iter().cloned())
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let max_file_size_bytes = upload_limit_from_env()?;
        let analytical_domains = analytical_domains_from_env();

        let database = DatabaseConfig {
            operational_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            analytical_url: env::var("MSDAT_DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("MSDAT_DATABASE_URL must be set"))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            run_migrations: env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
        };

        let config = IntakeConfig {
            environment,
            database,
            max_file_size_bytes,
            storage_path: env::var("UPLOAD_STORAGE_PATH").unwrap_or_else(|_| "./media".to_string()),
            storage_base_url: env::var("UPLOAD_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/media".to_string()),
            analytical_domains,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, url) in [
            ("DATABASE_URL", &self.database.operational_url),
            ("MSDAT_DATABASE_URL", &self.database.analytical_url),
        ] {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "{} must be a valid PostgreSQL connection string",
                    name
                ));
            }
        }

        let is_production = matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        );
        if is_production && self.database.operational_url == self.database.analytical_url {
            return Err(anyhow::anyhow!(
                "DATABASE_URL and MSDAT_DATABASE_URL must point at different databases in production"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_FILE_SIZE_MB must be greater than zero"));
        }

        if !self.analytical_domains.iter().any(|d| d == DATA_DOMAIN) {
            return Err(anyhow::anyhow!(
                "ANALYTICAL_DOMAINS must include the '{}' domain",
                DATA_DOMAIN
            ));
        }

        Ok(())
    }
}
