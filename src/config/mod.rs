use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout when fetching one asset at a time.
    #[serde(default = "default_sequential_timeout_secs")]
    pub sequential_timeout_secs: u64,

    /// Per-request timeout in concurrent mode.
    #[serde(default = "default_concurrent_timeout_secs")]
    pub concurrent_timeout_secs: u64,

    /// Cap on in-flight requests (and idle pooled connections) in concurrent mode.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// On-disk table cache
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: FetchMode,

    /// Abort the run on the first fetch failure instead of reporting it.
    #[serde(default = "default_true")]
    pub fail_fast: bool,

    #[serde(default)]
    pub show_progress: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Sequential,
    Concurrent,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://coinmarketcap.com".to_string()
}
fn default_user_agent() -> String {
    "cmc-history/0.1 (daily USD price history export)".to_string()
}
fn default_sequential_timeout_secs() -> u64 {
    10
}
fn default_concurrent_timeout_secs() -> u64 {
    60 * 60
}
fn default_max_concurrency() -> usize {
    100
}
fn default_true() -> bool {
    true
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            sequential_timeout_secs: default_sequential_timeout_secs(),
            concurrent_timeout_secs: default_concurrent_timeout_secs(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            fail_fast: true,
            show_progress: false,
        }
    }
}

impl ScraperConfig {
    pub fn timeout_for(&self, mode: FetchMode) -> Duration {
        match mode {
            FetchMode::Sequential => Duration::from_secs(self.sequential_timeout_secs),
            FetchMode::Concurrent => Duration::from_secs(self.concurrent_timeout_secs),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("CMC").separator("__"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scraper.max_concurrency, 100);
        assert_eq!(cfg.scraper.timeout_for(FetchMode::Sequential), Duration::from_secs(10));
        assert_eq!(cfg.scraper.timeout_for(FetchMode::Concurrent), Duration::from_secs(3600));
        assert_eq!(cfg.pipeline.mode, FetchMode::Sequential);
        assert!(cfg.pipeline.fail_fast);
        assert!(cfg.cache.dir.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nmode = \"concurrent\"\n[cache]\ndir = \"cache\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.pipeline.mode, FetchMode::Concurrent);
        assert!(cfg.pipeline.fail_fast);
        assert_eq!(cfg.cache.dir, Some(PathBuf::from("cache")));
        assert_eq!(cfg.scraper.base_url, "https://coinmarketcap.com");
    }
}
