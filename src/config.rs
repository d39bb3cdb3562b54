use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "hosted";
const DEFAULT_RECONCILE_INITIAL_DELAY_MS: u64 = 1500;
const DEFAULT_RECONCILE_AFTER_SAVE_DELAY_MS: u64 = 0;
const DEFAULT_ADMIN_WORKSPACE_LIMIT: usize = 64;

/// Which implementation answers the table and auth calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Hosted,
    InMemory,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// "hosted" or "in-memory"
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub store_backend: String,

    /// Base URL of the hosted tables+auth service
    #[serde(default)]
    pub store_url: String,

    /// Public (anonymous) API key of the hosted service
    #[serde(default)]
    pub store_anon_key: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Delay before the reconciliation pass scheduled when an admin
    /// dashboard is opened
    #[serde(default = "default_reconcile_initial_delay_ms")]
    pub reconcile_initial_delay_ms: u64,

    /// Delay before the reconciliation pass that follows an inventory save
    #[serde(default = "default_reconcile_after_save_delay_ms")]
    pub reconcile_after_save_delay_ms: u64,

    /// Admin workspaces kept in memory; the least recently used one is
    /// dropped when a new admin opens the dashboard past this limit
    #[serde(default = "default_admin_workspace_limit")]
    #[validate(range(min = 1))]
    pub admin_workspace_limit: usize,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl AppConfig {
    pub fn new(store_url: String, store_anon_key: String, environment: String) -> Self {
        Self {
            store_backend: default_store_backend(),
            store_url,
            store_anon_key,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            reconcile_initial_delay_ms: DEFAULT_RECONCILE_INITIAL_DELAY_MS,
            reconcile_after_save_delay_ms: DEFAULT_RECONCILE_AFTER_SAVE_DELAY_MS,
            admin_workspace_limit: DEFAULT_ADMIN_WORKSPACE_LIMIT,
        }
    }

    /// Configuration for local runs against the seeded in-memory store
    pub fn in_memory() -> Self {
        Self {
            store_backend: "in-memory".to_string(),
            ..Self::new(String::new(), String::new(), DEFAULT_ENV.to_string())
        }
    }

    pub fn store_backend(&self) -> StoreBackend {
        if self.store_backend.eq_ignore_ascii_case("in-memory") {
            StoreBackend::InMemory
        } else {
            StoreBackend::Hosted
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn reconcile_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_initial_delay_ms)
    }

    pub fn reconcile_after_save_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_after_save_delay_ms)
    }

    /// First four characters of the anon key, enough to tell keys apart in
    /// a log without revealing them.
    pub fn masked_anon_key(&self) -> String {
        let prefix: String = self.store_anon_key.chars().take(4).collect();
        format!("{}...", prefix)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.store_backend() == StoreBackend::Hosted {
            let url = self.store_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                let mut err = ValidationError::new("store_url_required");
                err.message = Some(
                    "Set APP__STORE_URL to the http(s) base URL of the hosted store, or use APP__STORE_BACKEND=in-memory".into(),
                );
                errors.add("store_url", err);
            }
            if self.store_anon_key.trim().is_empty() {
                let mut err = ValidationError::new("store_anon_key_required");
                err.message = Some("Set APP__STORE_ANON_KEY for the hosted store".into());
                errors.add("store_anon_key", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_reconcile_initial_delay_ms() -> u64 {
    DEFAULT_RECONCILE_INITIAL_DELAY_MS
}

fn default_reconcile_after_save_delay_ms() -> u64 {
    DEFAULT_RECONCILE_AFTER_SAVE_DELAY_MS
}

fn default_admin_workspace_limit() -> usize {
    DEFAULT_ADMIN_WORKSPACE_LIMIT
}

fn validate_store_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "hosted" | "in-memory" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_backend");
            err.message = Some("Must be one of: hosted, in-memory".into());
            Err(err)
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("mams_portal={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("store_backend", DEFAULT_STORE_BACKEND)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
