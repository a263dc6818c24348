//! Settings - 設定の読み込み
//!
//! 優先順位（後勝ち）:
//! 1. コード内のデフォルト値
//! 2. YAML ファイル（`--config` で指定、任意）
//! 3. 環境変数 `UNLOCKER__<SECTION>__<KEY>`（例: `UNLOCKER__PIPELINE__TIME_BUDGET_SECS=30`）

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::app::MAX_ATTEMPTS;

/// Settings loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback log level when `RUST_LOG` is not set.
    pub log_level: String,
    pub routing: RoutingSettings,
    pub pipeline: PipelineSettings,
    pub stages: StageSettings,
    pub resolvers: ResolverEndpoints,
    pub http: HttpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            routing: RoutingSettings::default(),
            pipeline: PipelineSettings::default(),
            stages: StageSettings::default(),
            resolvers: ResolverEndpoints::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Links whose URL contains one of these go through the sequential executor.
    pub bypass_domains: Vec<String>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            bypass_domains: strings(&["gadgetsweb", "review-tech", "ngwin", "cryptoinsights"]),
        }
    }
}

/// Timeouts, budgets and retry limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Per-link timeout for one chain attempt.
    pub link_timeout_secs: u64,
    /// Wall-clock budget of the sequential executor, measured from invocation start.
    pub time_budget_secs: u64,
    /// Total chain attempts per link (first try included), at most one retry.
    pub max_attempts: u32,
    /// Upper bound on bypass loop iterations.
    pub bypass_max_iterations: u32,
    /// How long overlay entries outlive the end of their stream.
    pub overlay_grace_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            link_timeout_secs: 30,
            time_budget_secs: 45,
            max_attempts: MAX_ATTEMPTS,
            bypass_max_iterations: 3,
            overlay_grace_secs: 15,
        }
    }
}

impl PipelineSettings {
    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.link_timeout_secs)
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn overlay_grace(&self) -> Duration {
        Duration::from_secs(self.overlay_grace_secs)
    }
}

/// Domain families used by the stage table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub fast_path: Vec<String>,
    /// Reaching any of these ends the bypass loop.
    pub final_family: Vec<String>,
    /// Bypass domains served by the native solver instead of the timer service.
    pub native_bypass: Vec<String>,
    pub link_page: Vec<String>,
    pub drive: Vec<String>,
    pub cloud: Vec<String>,
    pub pass_through: Vec<String>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            fast_path: strings(&["hubcdn.fans"]),
            final_family: strings(&[
                "hblinks", "hubdrive", "hubcdn", "hubcloud", "gdflix", "drivehub",
            ]),
            native_bypass: strings(&["gadgetsweb"]),
            link_page: strings(&["hblinks"]),
            drive: strings(&["hubdrive"]),
            cloud: strings(&["hubcloud", "hubcdn"]),
            pass_through: strings(&["gdflix", "drivehub"]),
        }
    }
}

/// Base URL of each remote unlock service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverEndpoints {
    pub fast_path: String,
    pub timer_bypass: String,
    pub native_bypass: String,
    pub link_page: String,
    pub drive: String,
    pub cloud: String,
}

impl Default for ResolverEndpoints {
    fn default() -> Self {
        Self {
            fast_path: "http://127.0.0.1:10001/hubcdn".to_string(),
            timer_bypass: "http://127.0.0.1:10000/solve".to_string(),
            native_bypass: "http://127.0.0.1:10001/gadgetsweb".to_string(),
            link_page: "http://127.0.0.1:10001/hblinks".to_string(),
            drive: "http://127.0.0.1:10001/hubdrive".to_string(),
            cloud: "http://127.0.0.1:10001/hubcloud".to_string(),
        }
    }
}

impl ResolverEndpoints {
    /// `(capability name, endpoint)` pairs.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("fast_path", self.fast_path.as_str()),
            ("timer_bypass", self.timer_bypass.as_str()),
            ("native_bypass", self.native_bypass.as_str()),
            ("link_page", self.link_page.as_str()),
            ("drive", self.drive.as_str()),
            ("cloud", self.cloud.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Timeout of a single remote call (the per-link timeout still applies on top).
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "MflixPro/3.0".to_string(),
            request_timeout_secs: 20,
        }
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Load defaults, then the optional YAML file, then `UNLOCKER__*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("UNLOCKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ATTEMPTS).contains(&self.pipeline.max_attempts) {
            return Err(ConfigError::Invalid(format!(
                "pipeline.max_attempts must be between 1 and {MAX_ATTEMPTS}"
            )));
        }
        if self.pipeline.link_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.link_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.pipeline.time_budget_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.time_budget_secs must be > 0".to_string(),
            ));
        }
        for (name, endpoint) in self.resolvers.entries() {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "resolvers.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
