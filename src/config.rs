use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const CONFIG_DIR: &str = "config";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_FORECAST_DAYS: u32 = 365;
const DEFAULT_FALLBACK_HISTORY_DAYS: u32 = 90;
const DEFAULT_FOREST_TREES: usize = 100;
const DEFAULT_FOREST_SEED: u64 = 42;
const DEFAULT_FOREST_MIN_SAMPLES_SPLIT: usize = 2;

/// Forecasting engine configuration, resolved once at startup
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastingConfig {
    /// Whether the seasonal decomposition engine serves `prophet` requests.
    /// When disabled those requests run on the statistical model.
    #[serde(default = "default_true_bool")]
    pub seasonal_engine_enabled: bool,

    /// Upper bound accepted for `forecast_days`
    #[serde(default = "default_max_forecast_days")]
    #[validate(range(min = 1, max = 3650))]
    pub max_forecast_days: u32,

    /// Length of the synthetic series used when a request carries no history
    #[serde(default = "default_fallback_history_days")]
    #[validate(range(min = 2, max = 3650))]
    pub fallback_history_days: u32,

    /// Number of trees grown by the random forest model
    #[serde(default = "default_forest_trees")]
    #[validate(range(min = 1, max = 1000))]
    pub random_forest_trees: usize,

    /// Seed for bootstrap sampling, keeps forest forecasts reproducible
    #[serde(default = "default_forest_seed")]
    pub random_forest_seed: u64,

    /// Maximum tree depth, unlimited when absent
    #[serde(default)]
    pub random_forest_max_depth: Option<usize>,

    /// Minimum samples a node needs before it is split
    #[serde(default = "default_forest_min_samples_split")]
    #[validate(range(min = 2))]
    pub random_forest_min_samples_split: usize,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            seasonal_engine_enabled: true,
            max_forecast_days: default_max_forecast_days(),
            fallback_history_days: default_fallback_history_days(),
            random_forest_trees: default_forest_trees(),
            random_forest_seed: default_forest_seed(),
            random_forest_max_depth: None,
            random_forest_min_samples_split: default_forest_min_samples_split(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
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

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes (default 10MB)
    #[serde(default = "default_max_body_size")]
    #[validate(range(min = 1024))]
    pub max_body_size: usize,

    /// Forecasting engine settings
    #[serde(default)]
    #[validate]
    pub forecasting: ForecastingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(default_host(), default_port(), default_environment())
    }
}

impl AppConfig {
    /// Creates a new configuration with default tuning
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            request_timeout_secs: default_request_timeout_secs(),
            max_body_size: default_max_body_size(),
            forecasting: ForecastingConfig::default(),
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
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

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB default max body size
}

fn default_max_forecast_days() -> u32 {
    DEFAULT_MAX_FORECAST_DAYS
}

fn default_fallback_history_days() -> u32 {
    DEFAULT_FALLBACK_HISTORY_DAYS
}

fn default_forest_trees() -> usize {
    DEFAULT_FOREST_TREES
}

fn default_forest_seed() -> u64 {
    DEFAULT_FOREST_SEED
}

fn default_forest_min_samples_split() -> usize {
    DEFAULT_FOREST_MIN_SAMPLES_SPLIT
}

/// Validates log level values
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

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("stateset_insights={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] but reads the TOML layers from `config_dir`
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let default_file = config_dir.join("default");
    let env_file = config_dir.join(&run_env);

    let config = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        seasonal_engine = app_config.forecasting.seasonal_engine_enabled,
        "Configuration loaded successfully"
    );
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_enable_seasonal_engine() {
        let cfg = AppConfig::default();
        assert!(cfg.forecasting.seasonal_engine_enabled);
        assert_eq!(cfg.forecasting.random_forest_trees, 100);
        assert_eq!(cfg.forecasting.random_forest_seed, 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = AppConfig::default();
        cfg.log_level = "loud".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn reads_forecasting_section_from_file() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
            port = 9100

            [forecasting]
            seasonal_engine_enabled = false
            max_forecast_days = 90
            "#
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.port, 9100);
        assert!(!cfg.forecasting.seasonal_engine_enabled);
        assert_eq!(cfg.forecasting.max_forecast_days, 90);
        assert_eq!(cfg.forecasting.random_forest_trees, 100);
    }
}
