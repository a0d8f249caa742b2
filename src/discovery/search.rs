// src/discovery/search.rs
//
// Drives the search engine through the shared browser: load the results
// page, dismiss the consent banner if one appears, then follow the "next
// page" control up to the requested page count. Each captured page is fed
// to the anchor extractor and candidates are merged across pages.
use crate::browser::{BrowserSessionManager, LaunchConfig};
use crate::discovery::runlog::RunLog;
use crate::extract::{extract_anchor_candidates, strip_html_assets};
use crate::models::{Result, SearchCandidate};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const CONSENT_SELECTOR: &str = "#L2AGLb, button[aria-label=\"Принять все\"]";
const NEXT_PAGE_SELECTOR: &str = "#pnnext";

#[derive(Debug, Clone)]
pub struct SerpPage {
    pub index: usize,
    pub html: String,
    pub url: String,
}

pub struct SearchDiscovery {
    manager: Arc<BrowserSessionManager>,
    launch: LaunchConfig,
    user_agent: Option<String>,
    timeout: Duration,
}

impl SearchDiscovery {
    pub fn new(
        manager: Arc<BrowserSessionManager>,
        launch: LaunchConfig,
        user_agent: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            manager,
            launch,
            user_agent,
            timeout,
        }
    }

    /// Captures up to `page_count` result pages for `query`. Stops early
    /// when the engine offers no next-page control or navigation stalls.
    pub async fn discover(
        &self,
        query: &str,
        page_count: usize,
        log: &RunLog,
    ) -> Result<Vec<SerpPage>> {
        let session = self.manager.acquire(self.launch.clone()).await?;
        let page = session.new_page("about:blank").await?;
        let result = self.discover_inner(&page, query, page_count, log).await;
        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close search page: {}", e);
        }
        result
    }

    async fn discover_inner(
        &self,
        page: &Page,
        query: &str,
        page_count: usize,
        log: &RunLog,
    ) -> Result<Vec<SerpPage>> {
        if let Some(ua) = &self.user_agent {
            let params = SetUserAgentOverrideParams::builder()
                .user_agent(ua.clone())
                .build()
                .map_err(|e| format!("invalid user agent override: {e}"))?;
            page.set_user_agent(params).await?;
        }

        let serp_url = Url::parse_with_params(
            "https://www.google.com/search",
            &[("q", query), ("hl", "ru")],
        )?;

        tokio::time::timeout(self.timeout, page.goto(serp_url.as_str()))
            .await
            .map_err(|_| "search results page did not load in time")??;
        let _ = tokio::time::timeout(Duration::from_secs(10), page.wait_for_navigation()).await;

        self.dismiss_consent(page, log).await;

        let mut pages = Vec::with_capacity(page_count);
        pages.push(self.capture(page, 0, serp_url.as_str()).await?);

        for index in 1..page_count {
            let next = match tokio::time::timeout(
                Duration::from_secs(5),
                page.find_element(NEXT_PAGE_SELECTOR),
            )
            .await
            {
                Ok(Ok(element)) => element,
                _ => {
                    log.push(format!("No next-page control after page {index}, stopping"));
                    break;
                }
            };

            if let Err(e) = next.click().await {
                log.push(format!("Next-page click failed: {e}, stopping"));
                break;
            }
            if tokio::time::timeout(self.timeout, page.wait_for_navigation())
                .await
                .is_err()
            {
                log.push(format!("Navigation to page {} timed out, stopping", index + 1));
                break;
            }
            if !self.launch.slow_mo.is_zero() {
                tokio::time::sleep(self.launch.slow_mo).await;
            }

            pages.push(self.capture(page, index, serp_url.as_str()).await?);
        }

        log.push(format!("Captured {} result page(s)", pages.len()));
        Ok(pages)
    }

    /// Best-effort cookie banner dismissal; absence or timeout is fine.
    async fn dismiss_consent(&self, page: &Page, log: &RunLog) {
        let found =
            tokio::time::timeout(Duration::from_secs(4), page.find_element(CONSENT_SELECTOR)).await;
        if let Ok(Ok(button)) = found {
            if button.click().await.is_ok() {
                log.push("Consent banner dismissed");
                let _ =
                    tokio::time::timeout(Duration::from_secs(10), page.wait_for_navigation()).await;
            }
        }
    }

    async fn capture(&self, page: &Page, index: usize, fallback_url: &str) -> Result<SerpPage> {
        let html = page.content().await?;
        let url = page
            .url()
            .await?
            .unwrap_or_else(|| fallback_url.to_string());
        Ok(SerpPage { index, html, url })
    }
}

/// Strips each captured page and merges anchor candidates across pages,
/// deduplicating by URL with first occurrence winning.
pub fn collect_candidates(pages: &[SerpPage], max_per_page: usize) -> Vec<SearchCandidate> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for serp in pages {
        let reduced = strip_html_assets(&serp.html);
        for candidate in extract_anchor_candidates(&reduced, &serp.url, max_per_page) {
            if seen.insert(candidate.url.clone()) {
                merged.push(candidate);
            }
        }
    }
    merged
}
