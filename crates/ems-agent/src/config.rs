//! Assistant configuration, loadable from TOML and overridable from the environment.

use std::str::FromStr;
use std::time::Duration;

use ems_llm::OpenAiConfig;
use ems_protocol::EndpointCatalog;
use serde::Deserialize;

const PRODUCTION_BASE_URL: &str = "https://energy-api-628964750053.us-east1.run.app";

/// Which intent resolution approach answers questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// The model picks any number of data tools itself.
    #[default]
    ToolCalling,
    /// The model emits one endpoint label, then analyzes that payload.
    Classification,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tool_calling" | "tools" => Ok(Self::ToolCalling),
            "classification" | "classify" => Ok(Self::Classification),
            other => {
                anyhow::bail!("unknown strategy '{other}', expected tool_calling or classification")
            }
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ToolCalling => "tool_calling",
            Self::Classification => "classification",
        })
    }
}

/// Full URLs of the four data endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_summary_url")]
    pub summary: String,
    #[serde(default = "default_moldes_url")]
    pub moldes: String,
    #[serde(default = "default_referencias_url")]
    pub referencias: String,
    #[serde(default = "default_linea_base_url")]
    pub linea_base: String,
}

fn default_summary_url() -> String {
    format!("{PRODUCTION_BASE_URL}/test-summary")
}
fn default_moldes_url() -> String {
    format!("{PRODUCTION_BASE_URL}/test-mold")
}
fn default_referencias_url() -> String {
    format!("{PRODUCTION_BASE_URL}/test-reference")
}
fn default_linea_base_url() -> String {
    format!("{PRODUCTION_BASE_URL}/test-baseline")
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self::with_base_url(PRODUCTION_BASE_URL)
    }
}

impl EndpointsConfig {
    /// The standard endpoint paths under another host (staging, mock server).
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            summary: format!("{base}/test-summary"),
            moldes: format!("{base}/test-mold"),
            referencias: format!("{base}/test-reference"),
            linea_base: format!("{base}/test-baseline"),
        }
    }

    pub fn catalog(&self) -> EndpointCatalog {
        EndpointCatalog::new(&self.summary, &self.moldes, &self.referencias, &self.linea_base)
    }
}

/// Data fetch timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> u64 {
    300
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub llm: OpenAiConfig,
}

impl AssistantConfig {
    /// Load config from a TOML file path, then apply environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env()?;
        tracing::info!(
            path,
            strategy = %config.strategy,
            model = %config.llm.model,
            "config loaded"
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override fields from `OPENAI_API_KEY`, `EMS_LLM_MODEL`,
    /// `EMS_LLM_BASE_URL` and `EMS_STRATEGY`.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Same as `apply_env` with an arbitrary variable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("EMS_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = var("EMS_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(strategy) = var("EMS_STRATEGY") {
            self.strategy = strategy.parse()?;
        }
        Ok(())
    }
}
