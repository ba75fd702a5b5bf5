use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the submission service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,
    /// Database configuration (required for the postgres backend)
    pub database: Option<DatabaseConfig>,
    /// S3 configuration (required for the postgres backend)
    pub s3: Option<S3Config>,
    /// Upload handling configuration
    #[serde(default)]
    pub uploads: UploadConfig,
    /// API configuration
    pub api: ApiConfig,
    /// Admin credential configuration
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Deployment environment; anything other than "production" exposes error details
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Which record/blob store pair to run against
    #[serde(default)]
    pub storage_backend: StorageBackend,
}

/// Backing stores selection
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// PostgreSQL records + S3 blobs
    #[default]
    Postgres,
    /// Process-local stores, for development without infrastructure
    Memory,
}

/// S3 storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket name for submission files
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for R2, MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Public URL prefix objects are served from, e.g. `https://files.example.org`
    pub public_url_prefix: String,
    /// Multipart upload threshold in bytes (5MB default)
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold_bytes: usize,
    /// Part size for multipart uploads in bytes (5MB default)
    #[serde(default = "default_part_size")]
    pub part_size_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Run migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

/// Per-submission upload handling
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Files of one submission uploaded in parallel
    #[serde(default = "default_upload_concurrency")]
    pub concurrency: usize,
    /// Bound on a single blob store call; expiry counts as a failed file
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest accepted file part
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: usize,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Admin credentials for the review endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`
    pub admin_password_hash: String,
}

// Default value functions
fn default_service_name() -> String {
    "submission-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_multipart_threshold() -> usize {
    5 * 1024 * 1024 // 5MB
}

fn default_part_size() -> usize {
    5 * 1024 * 1024 // 5MB
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

fn default_upload_concurrency() -> usize {
    2
}

fn default_upload_timeout_secs() -> u64 {
    60
}

fn default_max_file_size() -> usize {
    100 * 1024 * 1024 // 100MB, reels can be large
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("service.name", "submission-service")?
            .set_default("service.log_level", "info")?
            .set_default("service.metrics_port", 9090)?
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 8080)?
            // Add config file if present
            .add_source(config::File::with_name("config/submissions").required(false))
            .add_source(config::File::with_name("/etc/contest/submissions").required(false))
            // Override with environment variables
            // SUBMISSIONS__AUTH__ADMIN_PASSWORD_HASH -> auth.admin_password_hash
            .add_source(
                config::Environment::with_prefix("SUBMISSIONS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Whether error responses may carry diagnostic detail
    pub fn is_production(&self) -> bool {
        matches!(
            self.service.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }
}

impl UploadConfig {
    /// Blob store call timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DatabaseConfig {
    /// Get database connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get database idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_upload_concurrency(),
            timeout_secs: default_upload_timeout_secs(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
            environment: default_environment(),
            storage_backend: StorageBackend::default(),
        }
    }
}
