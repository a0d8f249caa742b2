// src/browser.rs
//
// One reusable headless Chrome process shared by every worker. Pages are
// cheap; relaunching the process is not, so the session is keyed by its
// launch configuration and torn down only when that key changes or the
// process has died.
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const LAUNCH_ARGS: [&str; 6] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--lang=ru-RU,ru",
    "--disable-blink-features=AutomationControlled",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub headless: bool,
    pub slow_mo: Duration,
    pub devtools: bool,
    pub profile_dir: Option<PathBuf>,
}

impl From<&crate::config::BrowserConfig> for LaunchConfig {
    fn from(cfg: &crate::config::BrowserConfig) -> Self {
        Self {
            headless: cfg.headless,
            slow_mo: Duration::from_millis(cfg.slow_mo_ms),
            devtools: cfg.devtools,
            profile_dir: cfg.profile_dir.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    /// Another process holds the profile lock. Retrying will not help.
    #[error("browser profile is busy: {0}")]
    ProfileBusy(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
}

/// A live browser process plus the configuration key it was launched with.
#[derive(Debug)]
pub struct BrowserSession {
    config: LaunchConfig,
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Opens a fresh page. The caller owns the page and must close it on
    /// every exit path.
    pub async fn new_page(&self, url: &str) -> crate::models::Result<Page> {
        let browser = self.browser.lock().await;
        let page = browser.new_page(url).await?;
        Ok(page)
    }

    async fn is_alive(&self) -> bool {
        let browser = self.browser.lock().await;
        browser.pages().await.is_ok()
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Browser close failed (ignored): {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser wait failed (ignored): {}", e);
        }
        self.handler_task.abort();
    }
}

/// Owns the process-wide browser singleton. `acquire` serializes relaunches:
/// the inner mutex is held across the launch await, so concurrent callers
/// block until the first one publishes the new session.
pub struct BrowserSessionManager {
    inner: Mutex<Option<Arc<BrowserSession>>>,
}

impl BrowserSessionManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub async fn acquire(
        &self,
        config: LaunchConfig,
    ) -> std::result::Result<Arc<BrowserSession>, BrowserError> {
        let mut slot = self.inner.lock().await;

        if let Some(session) = slot.as_ref() {
            if session.config == config && session.is_alive().await {
                return Ok(Arc::clone(session));
            }
            info!("Browser config changed or process died, relaunching");
            session.shutdown().await;
            *slot = None;
        }

        let session = Arc::new(launch_session(&config).await?);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Terminates the session if present. Idempotent.
    pub async fn close(&self) {
        let mut slot = self.inner.lock().await;
        if let Some(session) = slot.take() {
            info!("Closing browser session");
            session.shutdown().await;
        }
    }
}

impl Default for BrowserSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn launch_session(config: &LaunchConfig) -> std::result::Result<BrowserSession, BrowserError> {
    let mut builder = BrowserConfig::builder()
        .window_size(1366, 768)
        .request_timeout(Duration::from_secs(60))
        .args(LAUNCH_ARGS);

    if !config.headless {
        builder = builder.with_head();
    }
    if config.devtools {
        builder = builder.arg("--auto-open-devtools-for-tabs");
    }
    if let Some(dir) = &config.profile_dir {
        // Chrome refuses to start when another process holds the profile;
        // fail fast with a distinguished error instead of spinning.
        if dir.join("SingletonLock").exists() {
            return Err(BrowserError::ProfileBusy(dir.display().to_string()));
        }
        builder = builder.user_data_dir(dir);
    }

    let browser_config = builder.build().map_err(BrowserError::Launch)?;

    info!(
        "Launching browser (headless={}, devtools={})",
        config.headless, config.devtools
    );
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| classify_launch_error(e.to_string()))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok(BrowserSession {
        config: config.clone(),
        browser: Mutex::new(browser),
        handler_task,
    })
}

fn classify_launch_error(message: String) -> BrowserError {
    if message.contains("SingletonLock") || message.contains("ProcessSingleton") {
        BrowserError::ProfileBusy(message)
    } else {
        BrowserError::Launch(message)
    }
}
