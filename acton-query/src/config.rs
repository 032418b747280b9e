//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: ACTON_QUERY_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/acton-query/{app_name}/config.toml
//! 4. System directory: /etc/acton-query/{app_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [query]
//! default_page_size = 25
//! max_page_size = 200
//! max_tree_depth = 32
//!
//! [logging]
//! level = "acton_query=debug,info"
//! json = true
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::hierarchy::{DEFAULT_MAX_DEPTH, MAX_TREE_DEPTH};
use crate::specification::{QuerySettings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_QUERY_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Query construction limits
    #[serde(default)]
    pub query: QueryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limits applied while building specifications and trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used when a page number arrives without a size
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size a caller may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Deepest hierarchy the assembler will walk
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

impl QueryConfig {
    /// Check that the limits work together
    ///
    /// A default page size outside `1..=max_page_size` would make every
    /// page-only request fail as if the caller had sent a bad size.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.max_page_size == 0 {
            Some("query.max_page_size must be at least 1".to_string())
        } else if self.default_page_size == 0 {
            Some("query.default_page_size must be at least 1".to_string())
        } else if self.default_page_size > self.max_page_size {
            Some(format!(
                "query.default_page_size ({}) must not exceed query.max_page_size ({})",
                self.default_page_size, self.max_page_size
            ))
        } else if self.max_tree_depth > MAX_TREE_DEPTH {
            Some(format!(
                "query.max_tree_depth must not exceed {}, got {}",
                MAX_TREE_DEPTH, self.max_tree_depth
            ))
        } else {
            None
        };

        match problem {
            Some(message) => Err(figment::Error::from(message).into()),
            None => Ok(()),
        }
    }

    /// Settings consumed by specification construction
    pub fn settings(&self) -> QuerySettings {
        QuerySettings {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            max_tree_depth: self.max_tree_depth,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error, or per-target)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The application name is inferred from the running binary.
    pub fn load() -> Result<Self> {
        let app_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "acton-query".to_string());

        Self::load_for_app(&app_name)
    }

    /// Load configuration for a specific application name
    pub fn load_for_app(app_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(app_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config: Config = figment.merge(Self::env()).extract()?;
        config.query.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the search path. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        config.query.validate()?;
        Ok(config)
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Possible config file paths in priority order (highest first)
    fn find_config_paths(app_name: &str) -> Vec<PathBuf> {
        let config_file_path = Path::new(app_name).join("config.toml");
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(path) = xdg::BaseDirectories::with_prefix("acton-query")
            .find_config_file(&config_file_path)
        {
            paths.push(path);
        }

        paths.push(Path::new("/etc/acton-query").join(config_file_path));
        paths
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
