//! DMI CLI: validate and load tabular intake files.
//!
//! `schemas`, `validate` and `route` work offline. `upload`, `recent`,
//! `set-status` and `migrate` need DATABASE_URL and MSDAT_DATABASE_URL.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use dmi_cli::{field_summary, init_tracing};
use dmi_core::models::FileUploadStatus;
use dmi_core::{
    analytical_domains_from_env, upload_limit_from_env, Config, DatabaseRouter, ErrorMetadata,
    Store, DATA_DOMAIN,
};
use dmi_db::{DatabasePools, FileUploadRepository};
use dmi_intake::{
    FileValidator, SchemaRegistry, UploadError, UploadFile, UploadRequest, UploadValidator,
    UploadedFile,
};
use dmi_storage::create_storage;

#[derive(Parser)]
#[command(name = "dmi", about = "DMI data intake CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered file types and their required columns
    Schemas {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Validate a file without storing anything
    Validate {
        /// Registered file type, e.g. farmer_registry
        #[arg(long)]
        file_type: String,
        /// Path to a .csv, .xls, .xlsx or .xlsm file
        file: PathBuf,
    },
    /// Validate, store and record a file
    Upload {
        #[arg(long)]
        file_type: String,
        /// Uploading user's id in the operational store
        #[arg(long)]
        uploaded_by: Option<Uuid>,
        file: PathBuf,
    },
    /// List recent uploads
    Recent {
        #[arg(long)]
        file_type: Option<String>,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Move an upload to another status
    SetStatus {
        id: Uuid,
        /// pending, processing, processed or failed
        status: String,
    },
    /// Apply each store's migrations
    Migrate,
    /// Show which store serves a domain
    Route {
        domain: String,
    },
}

#[derive(Serialize)]
struct RouteReport<'a> {
    domain: &'a str,
    read: Store,
    write: Store,
    migrate: Vec<Store>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn parse_status(s: &str) -> anyhow::Result<FileUploadStatus> {
    match s.trim().to_lowercase().as_str() {
        "pending" => Ok(FileUploadStatus::Pending),
        "processing" => Ok(FileUploadStatus::Processing),
        "processed" => Ok(FileUploadStatus::Processed),
        "failed" => Ok(FileUploadStatus::Failed),
        other => bail!("Unknown status '{}'", other),
    }
}

/// Routing policy from the environment, without requiring database URLs
fn router_from_env() -> DatabaseRouter {
    DatabaseRouter::new(analytical_domains_from_env())
}

fn report_upload_error(err: &UploadError) -> anyhow::Error {
    tracing::debug!(code = err.error_code(), status = err.http_status_code(), "Upload failed");
    match err.suggested_action() {
        Some(action) => anyhow::anyhow!("{} [{}] ({})", err.client_message(), err.error_code(), action),
        None => anyhow::anyhow!("{} [{}]", err.client_message(), err.error_code()),
    }
}

async fn load_request(
    file_type: String,
    path: &Path,
    uploaded_by: Option<Uuid>,
) -> anyhow::Result<UploadRequest> {
    let file = UploadedFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let request = UploadRequest::new(file_type, file);
    Ok(match uploaded_by {
        Some(user) => request.uploaded_by(user),
        None => request,
    })
}

async fn connect(config: &Config) -> anyhow::Result<FileUploadRepository> {
    let pools = DatabasePools::connect(config).await?;
    Ok(FileUploadRepository::new(pools))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schemas { json } => {
            let registry = SchemaRegistry::builtin(router_from_env());
            if json {
                let schemas: Vec<_> = registry.iter().collect();
                print_json(&schemas)?;
            } else {
                for schema in registry.iter() {
                    let store = registry.router().route_for_write(&schema.domain);
                    println!(
                        "{:<20} {:<6} {}",
                        schema.tag,
                        store.alias(),
                        field_summary(&schema.expected_fields, 70)
                    );
                }
            }
        }
        Commands::Validate { file_type, file } => {
            let registry = Arc::new(SchemaRegistry::builtin(router_from_env()));
            let max_bytes = upload_limit_from_env().context("Failed to load configuration")?;
            let validator = UploadValidator::new(registry)
                .with_file_validator(FileValidator::new(max_bytes));

            let request = load_request(file_type, &file, None).await?;
            let validated = validator
                .validate(&request)
                .map_err(|e| report_upload_error(&e))?;
            print_json(validated.attrs())?;
        }
        Commands::Upload {
            file_type,
            uploaded_by,
            file,
        } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            let storage = create_storage(&config).await?;
            let repository = connect(&config).await?;
            let registry = Arc::new(SchemaRegistry::builtin(config.router()));
            let upload = UploadFile::new(registry, storage, Arc::new(repository))
                .with_validator(FileValidator::new(config.max_file_size_bytes()));

            let request = load_request(file_type, &file, uploaded_by).await?;
            let record = upload
                .process(&request)
                .await
                .map_err(|e| report_upload_error(&e))?;
            print_json(&record)?;
        }
        Commands::Recent { file_type, limit } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            let repository = connect(&config).await?;
            let records = repository.list_recent(file_type.as_deref(), limit).await?;
            print_json(&records)?;
        }
        Commands::SetStatus { id, status } => {
            let status = parse_status(&status)?;
            let config = Config::from_env().context("Failed to load configuration")?;
            let repository = connect(&config).await?;
            let record = repository.update_status(id, status).await?;
            print_json(&record)?;
        }
        Commands::Migrate => {
            let mut config = Config::from_env().context("Failed to load configuration")?;
            config.0.database.run_migrations = false;
            let pools = DatabasePools::connect(&config).await?;
            for (store, domain) in pools.migrate().await? {
                println!("migrated {} domain on {}", domain, store);
            }
        }
        Commands::Route { domain } => {
            let router = router_from_env();
            let report = RouteReport {
                domain: &domain,
                read: router.route_for_read(&domain),
                write: router.route_for_write(&domain),
                migrate: Store::ALL
                    .into_iter()
                    .filter(|s| router.allow_migrate(*s, &domain))
                    .collect(),
            };
            if domain.trim().eq_ignore_ascii_case(DATA_DOMAIN) && report.write != Store::Analytical {
                tracing::warn!("The data domain is not routed to the analytical store");
            }
            print_json(&report)?;
        }
    }

    Ok(())
}
