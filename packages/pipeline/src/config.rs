//! Pipeline configuration.
//!
//! Values come from an optional TOML file, then from command-line
//! overrides. Every field has a default, so an empty or missing file is a
//! valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use airfield_recon_airfield_models::MatchMode;
use airfield_recon_reconcile::DEFAULT_THRESHOLD_KM;
use airfield_recon_scraper::fetch::{DEFAULT_BASE_URL, HttpConfig};
use airfield_recon_scraper::retry::RetryPolicy;
use airfield_recon_source::bts::BtsColumns;
use airfield_recon_source::nfdc::NfdcLayout;
use serde::{Deserialize, Serialize};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "airfield_recon.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "AIRFIELD_RECON_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML.
    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            user_agent: http.user_agent,
            timeout_secs: http.timeout.as_secs(),
            max_retries: http.retry.max_retries,
        }
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the abandoned-airfields site.
    pub base_url: String,
    /// Directory of mirrored pages.
    pub cache_dir: PathBuf,
    /// Directory for every output artifact.
    pub output_dir: PathBuf,
    /// BTS master coordinate list. Reconciliation is skipped without it.
    pub bts_path: Option<PathBuf>,
    /// NFDC facility file. Reconciliation is skipped without it.
    pub nfdc_path: Option<PathBuf>,
    /// Country code kept from the BTS list.
    pub country: String,
    pub threshold_km: f64,
    pub match_mode: MatchMode,
    /// Skip the crawl and use the cache as is.
    pub offline: bool,
    pub http: HttpSettings,
    pub bts_columns: BtsColumns,
    pub nfdc_layout: NfdcLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            cache_dir: PathBuf::from("data/pages"),
            output_dir: PathBuf::from("data/output"),
            bts_path: None,
            nfdc_path: None,
            country: "US".to_owned(),
            threshold_km: DEFAULT_THRESHOLD_KM,
            match_mode: MatchMode::default(),
            offline: false,
            http: HttpSettings::default(),
            bts_columns: BtsColumns::default(),
            nfdc_layout: NfdcLayout::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from `explicit`, else from the file named by
    /// [`CONFIG_ENV`], else from [`DEFAULT_CONFIG_FILE`] if it exists.
    ///
    /// An explicitly named file must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file cannot be read or parsed, or a
    /// value is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_named(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// [`PipelineConfig::load`] with the environment value passed in.
    fn load_named(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let named = explicit.map(Path::to_path_buf).or(from_env);

        match named {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// See [`PipelineConfig::load`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold_km must be a non-negative number, got {}",
                self.threshold_km
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".to_owned()));
        }
        if self.country.trim().is_empty() {
            return Err(ConfigError::Invalid("country is empty".to_owned()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// HTTP client settings for the crawler.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.http.user_agent.clone(),
            timeout: Duration::from_secs(self.http.timeout_secs),
            retry: RetryPolicy {
                max_retries: self.http.max_retries,
                ..RetryPolicy::default()
            },
        }
    }
}

/// Command-line values that replace file values when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub bts_path: Option<PathBuf>,
    pub nfdc_path: Option<PathBuf>,
    pub country: Option<String>,
    pub threshold_km: Option<f64>,
    pub match_mode: Option<MatchMode>,
    /// `true` forces offline; `false` leaves the file value alone.
    pub offline: bool,
}

impl ConfigOverrides {
    /// Applies the overrides and re-validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override is out of range.
    pub fn apply(self, config: &mut PipelineConfig) -> Result<(), ConfigError> {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.cache_dir = cache_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if self.bts_path.is_some() {
            config.bts_path = self.bts_path;
        }
        if self.nfdc_path.is_some() {
            config.nfdc_path = self.nfdc_path;
        }
        if let Some(country) = self.country {
            config.country = country;
        }
        if let Some(threshold_km) = self.threshold_km {
            config.threshold_km = threshold_km;
        }
        if let Some(match_mode) = self.match_mode {
            config.match_mode = match_mode;
        }
        config.offline |= self.offline;
        config.validate()
    }
}
