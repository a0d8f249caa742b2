use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub search: SearchConfig,
    pub browser: BrowserConfig,
    pub pipeline: PipelineConfig,
    pub ai: AiConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Max ranked links returned per run (1..=15).
    pub default_top: usize,
    /// SERP pages visited per run (1..=10).
    pub default_pages: usize,
    /// Max anchor candidates collected per SERP page.
    pub max_candidates_per_page: usize,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub devtools: bool,
    pub profile_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Worker pool size for per-link contact discovery.
    pub concurrency: usize,
    pub navigation_timeout_secs: u64,
    pub hint_navigation_timeout_secs: u64,
    pub search_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    pub model: String,
    /// Max HTML characters sent to the contact-extraction prompt.
    pub extraction_html_limit: usize,
    /// Max HTML characters sent to the hint-suggestion prompt.
    pub hint_html_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub max_entries: usize,
}

impl Config {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.navigation_timeout_secs)
    }

    pub fn hint_navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.hint_navigation_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.search_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                default_top: 10,
                default_pages: 3,
                max_candidates_per_page: 120,
                user_agent: None,
            },
            browser: BrowserConfig {
                headless: true,
                slow_mo_ms: 0,
                devtools: false,
                profile_dir: None,
            },
            pipeline: PipelineConfig {
                concurrency: 3,
                navigation_timeout_secs: 90,
                hint_navigation_timeout_secs: 30,
                search_timeout_secs: 60,
            },
            ai: AiConfig {
                model: "gpt-4o-mini".to_string(),
                extraction_html_limit: 120_000,
                hint_html_limit: 20_000,
            },
            history: HistoryConfig {
                path: PathBuf::from("data/history.json"),
                max_entries: 200,
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}
