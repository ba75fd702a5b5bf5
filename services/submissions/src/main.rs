use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::sync::Arc;
use submission_service::{
    api::{start_api_server, AppState},
    hash_password, AdminAuth, BlobStore, Config, InMemoryBlobStore, InMemoryRecordStore,
    IngestionService, PgRecordStore, QueryService, RecordStore, S3BlobStore, StatusUpdater,
    StorageBackend,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "submission-service", about = "Contest submission intake and review service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Print an argon2id hash for `auth.admin_password_hash`
    HashPassword {
        /// Password to hash; read from the first line of stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::HashPassword { password } => print_password_hash(password),
    }
}

fn print_password_hash(password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }

    let hash = hash_password(&password).context("Failed to hash password")?;
    println!("{hash}");
    Ok(())
}

async fn serve() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        environment = %config.service.environment,
        backend = ?config.service.storage_backend,
        "Starting submission service"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    let (records, blobs) = build_stores(&config).await?;

    let auth = Arc::new(
        AdminAuth::new(&config.auth).context("Failed to load admin credentials")?,
    );

    let state = AppState {
        ingestion: Arc::new(IngestionService::new(
            records.clone(),
            blobs,
            &config.uploads,
        )),
        queries: Arc::new(QueryService::new(records.clone())),
        status: Arc::new(StatusUpdater::new(records.clone())),
        records,
        auth,
        max_body_bytes: AppState::body_limit_for(config.uploads.max_file_size_bytes),
        expose_details: !config.is_production(),
    };

    let shutdown = CancellationToken::new();

    // Spawn API server task
    let api_config = config.api.clone();
    let api_shutdown = shutdown.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(state, &api_config, api_shutdown).await {
            error!(error = %e, "API server error");
        }
    });

    shutdown_signal().await;

    info!("Shutting down submission service");

    // In-flight requests finish before the server task returns
    shutdown.cancel();
    if let Err(e) = api_handle.await {
        error!(error = %e, "API server task failed");
    }

    info!("Submission service stopped");

    Ok(())
}

/// Build the record and blob stores for the configured backend
async fn build_stores(config: &Config) -> Result<(Arc<dyn RecordStore>, Arc<dyn BlobStore>)> {
    match config.service.storage_backend {
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("database section is required for the postgres backend")?;
            let s3 = config
                .s3
                .as_ref()
                .context("s3 section is required for the postgres backend")?;

            let records = PgRecordStore::new(database)
                .await
                .context("Failed to initialize record store")?;

            // Run migrations if enabled
            if database.run_migrations {
                records
                    .run_migrations()
                    .await
                    .context("Failed to run database migrations")?;
            }

            let blobs = S3BlobStore::new(s3)
                .await
                .context("Failed to initialize S3 blob store")?;

            Ok((Arc::new(records), Arc::new(blobs)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory stores; submissions are lost on restart");
            let prefix = config
                .s3
                .as_ref()
                .map(|s3| s3.public_url_prefix.clone())
                .unwrap_or_else(|| format!("http://localhost:{}/files", config.api.port));

            Ok((
                Arc::new(InMemoryRecordStore::new()),
                Arc::new(InMemoryBlobStore::new(prefix)),
            ))
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
