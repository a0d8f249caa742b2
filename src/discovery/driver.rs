// src/discovery/driver.rs
//
// Page-driving capability the worker depends on. The pipeline only needs
// "fetch a page" and "click toward a contacts page"; everything
// browser-specific stays behind this trait.
use crate::browser::{BrowserSessionManager, LaunchConfig};
use crate::models::Result;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub status: Option<u16>,
    pub final_url: String,
}

#[derive(Debug, Clone)]
pub struct NavigatedPage {
    pub html: String,
    pub url: String,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and returns the settled page content, final URL and HTTP
    /// status where available.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// Opens `url`, then tries each hint in order: the first anchor whose
    /// text contains the hint (or whose href looks contact-related) is
    /// clicked and navigation awaited. Hints after the first successful
    /// click are not tried.
    async fn navigate_by_hints(&self, url: &str, hints: &[String]) -> Result<NavigatedPage>;
}

/// Document response status as seen by the page itself. Cheaper than
/// subscribing to CDP network events and good enough for narration.
const STATUS_JS: &str = "(() => { \
    const nav = performance.getEntriesByType('navigation')[0]; \
    return nav && nav.responseStatus ? nav.responseStatus : null; \
})()";

pub struct BrowserPageDriver {
    manager: Arc<BrowserSessionManager>,
    launch: LaunchConfig,
    user_agent: Option<String>,
    navigation_timeout: Duration,
    hint_navigation_timeout: Duration,
}

impl BrowserPageDriver {
    pub fn new(
        manager: Arc<BrowserSessionManager>,
        launch: LaunchConfig,
        user_agent: Option<String>,
        navigation_timeout: Duration,
        hint_navigation_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            launch,
            user_agent,
            navigation_timeout,
            hint_navigation_timeout,
        }
    }

    async fn open_page(&self) -> Result<Page> {
        let session = self.manager.acquire(self.launch.clone()).await?;
        let page = session.new_page("about:blank").await?;
        if let Some(ua) = &self.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(ua.clone())
                .build()
                .map_err(|e| format!("invalid user agent override: {e}"))?;
            page.set_user_agent(params).await?;
        }
        Ok(page)
    }

    async fn goto_settled(&self, page: &Page, url: &str) -> Result<()> {
        tokio::time::timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| format!("navigation to {url} timed out"))??;
        // Load completion is best-effort; slow third-party assets must not
        // wedge the pipeline.
        let _ = tokio::time::timeout(Duration::from_secs(15), page.wait_for_navigation()).await;
        if !self.launch.slow_mo.is_zero() {
            tokio::time::sleep(self.launch.slow_mo).await;
        }
        Ok(())
    }

    async fn read_status(&self, page: &Page) -> Option<u16> {
        let evaluated = page.evaluate(STATUS_JS).await.ok()?;
        evaluated.into_value::<Option<u16>>().ok().flatten()
    }

    async fn try_click_hint(&self, page: &Page, hint: &str) -> Result<bool> {
        let needle = serde_json::to_string(&hint.to_lowercase())?;
        let js = format!(
            "(() => {{ \
                const h = {needle}; \
                const anchors = Array.from(document.querySelectorAll('a')); \
                const candidate = anchors.find(a => {{ \
                    const text = (a.textContent || '').trim().toLowerCase(); \
                    const href = (a.getAttribute('href') || '').toLowerCase(); \
                    return text.includes(h) || href.includes('contact') || \
                           href.includes('contacts') || href.includes('kontakt') || \
                           href.includes('контакт'); \
                }}); \
                if (candidate) {{ candidate.click(); return true; }} \
                return false; \
            }})()"
        );
        let clicked = page
            .evaluate(js)
            .await?
            .into_value::<bool>()
            .unwrap_or(false);
        Ok(clicked)
    }

    async fn close_page(page: Page, url: &str) {
        if let Err(e) = page.close().await {
            warn!("Failed to close page for {}: {}", url, e);
        }
    }
}

#[async_trait]
impl PageDriver for BrowserPageDriver {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let page = self.open_page().await?;
        let result = async {
            self.goto_settled(&page, url).await?;
            let html = page.content().await?;
            let final_url = page.url().await?.unwrap_or_else(|| url.to_string());
            let status = self.read_status(&page).await;
            Ok(FetchedPage {
                html,
                status,
                final_url,
            })
        }
        .await;
        Self::close_page(page, url).await;
        result
    }

    async fn navigate_by_hints(&self, url: &str, hints: &[String]) -> Result<NavigatedPage> {
        let page = self.open_page().await?;
        let result = async {
            self.goto_settled(&page, url).await?;

            for hint in hints {
                match self.try_click_hint(&page, hint).await {
                    Ok(true) => {
                        debug!("Hint matched an anchor: {}", hint);
                        let _ = tokio::time::timeout(
                            self.hint_navigation_timeout,
                            page.wait_for_navigation(),
                        )
                        .await;
                        break;
                    }
                    Ok(false) => continue,
                    Err(e) => {
                        debug!("Hint click evaluation failed for '{}': {}", hint, e);
                        continue;
                    }
                }
            }

            let html = page.content().await?;
            let current = page.url().await?.unwrap_or_else(|| url.to_string());
            Ok(NavigatedPage { html, url: current })
        }
        .await;
        Self::close_page(page, url).await;
        result
    }
}
