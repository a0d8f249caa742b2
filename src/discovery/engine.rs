// src/discovery/engine.rs
//
// Top-level orchestration for one discovery run: capture result pages,
// rank candidate links, then fan the ranked links out over the bounded
// worker pool. One failing link never aborts the batch.
use crate::ai::ContactAssistant;
use crate::browser::{BrowserSessionManager, LaunchConfig};
use crate::config::Config;
use crate::discovery::driver::PageDriver;
use crate::discovery::ranking::LinkRankingStage;
use crate::discovery::runlog::RunLog;
use crate::discovery::scheduler::run_bounded;
use crate::discovery::search::{collect_candidates, SearchDiscovery};
use crate::discovery::worker::ContactDiscoveryWorker;
use crate::extract::HeuristicExtractor;
use crate::models::{PipelineResult, Result, SearchCandidate};
use crate::normalize::ContactNormalizer;
use std::sync::Arc;
use tracing::info;

pub struct DiscoveryOutcome {
    pub results: Vec<PipelineResult>,
    pub logs: Vec<String>,
}

pub struct DiscoveryEngine {
    config: Config,
    manager: Arc<BrowserSessionManager>,
    driver: Arc<dyn PageDriver>,
    assistant: Arc<dyn ContactAssistant>,
    extractor: Arc<HeuristicExtractor>,
    normalizer: Arc<ContactNormalizer>,
}

impl DiscoveryEngine {
    pub fn new(
        config: Config,
        manager: Arc<BrowserSessionManager>,
        driver: Arc<dyn PageDriver>,
        assistant: Arc<dyn ContactAssistant>,
    ) -> Self {
        Self {
            config,
            manager,
            driver,
            assistant,
            extractor: Arc::new(HeuristicExtractor::new()),
            normalizer: Arc::new(ContactNormalizer::new()),
        }
    }

    /// Full run: search, rank, process. `top` and `pages` are assumed
    /// already validated by the caller.
    pub async fn run(&self, query: &str, top: usize, pages: usize) -> Result<DiscoveryOutcome> {
        let log = RunLog::global();
        log.push(format!("Searching \"{query}\" across {pages} result page(s)"));

        let search = SearchDiscovery::new(
            Arc::clone(&self.manager),
            LaunchConfig::from(&self.config.browser),
            self.config.search.user_agent.clone(),
            self.config.search_timeout(),
        );
        let serp_pages = search.discover(query, pages, &log).await?;
        let candidates =
            collect_candidates(&serp_pages, self.config.search.max_candidates_per_page);
        log.push(format!("Collected {} candidate link(s)", candidates.len()));

        self.run_from_candidates(query, candidates, top, log).await
    }

    /// Everything after SERP capture. Split out so the ranking and worker
    /// stages can be exercised without a browser.
    pub async fn run_from_candidates(
        &self,
        query: &str,
        candidates: Vec<SearchCandidate>,
        top: usize,
        log: RunLog,
    ) -> Result<DiscoveryOutcome> {
        if candidates.is_empty() {
            log.push("No candidates to process");
            return Ok(DiscoveryOutcome {
                results: Vec::new(),
                logs: log.lines(),
            });
        }

        let ranking = LinkRankingStage::new(self.assistant.as_ref());
        let links = ranking.rank(query, &candidates, top, &log).await;
        if links.is_empty() {
            log.push("No relevant links after ranking");
            return Ok(DiscoveryOutcome {
                results: Vec::new(),
                logs: log.lines(),
            });
        }

        log.push(format!(
            "Processing {} link(s) with concurrency {}",
            links.len(),
            self.config.pipeline.concurrency
        ));

        let driver = Arc::clone(&self.driver);
        let assistant = Arc::clone(&self.assistant);
        let extractor = Arc::clone(&self.extractor);
        let normalizer = Arc::clone(&self.normalizer);
        let results = run_bounded(
            links,
            self.config.pipeline.concurrency,
            move |_, link| {
                let driver = Arc::clone(&driver);
                let assistant = Arc::clone(&assistant);
                let extractor = Arc::clone(&extractor);
                let normalizer = Arc::clone(&normalizer);
                async move {
                    let worker = ContactDiscoveryWorker::new(
                        driver.as_ref(),
                        assistant.as_ref(),
                        extractor.as_ref(),
                        normalizer.as_ref(),
                    );
                    Some(worker.process(&link).await)
                }
            },
        )
        .await;

        let with_contacts = results.iter().filter(|r| r.contacts.has_contacts()).count();
        let failed = results.iter().filter(|r| r.error).count();
        log.push(format!(
            "Run finished: {} processed, {} with contacts, {} failed",
            results.len(),
            with_contacts,
            failed
        ));
        info!(
            processed = results.len(),
            with_contacts, failed, "Discovery run finished"
        );

        Ok(DiscoveryOutcome {
            results,
            logs: log.lines(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ContactExtraction, LinkSummary};
    use crate::discovery::driver::{FetchedPage, NavigatedPage};
    use crate::models::RankedLink;
    use async_trait::async_trait;

    struct AllRelevantAssistant;

    #[async_trait]
    impl ContactAssistant for AllRelevantAssistant {
        async fn select_links_from_candidates(
            &self,
            _query: &str,
            candidates: &[LinkSummary],
            _max_items: usize,
        ) -> Result<Vec<LinkSummary>> {
            Ok(candidates.to_vec())
        }

        async fn select_relevant_links(
            &self,
            _query: &str,
            links: &[LinkSummary],
        ) -> Result<Vec<RankedLink>> {
            Ok(links
                .iter()
                .map(|l| RankedLink {
                    url: l.url.clone(),
                    title: l.title.clone(),
                    snippet: l.snippet.clone(),
                    relevant: true,
                    reason: "test".to_string(),
                })
                .collect())
        }

        async fn extract_contacts(&self, _html: &str, _url: &str) -> Result<ContactExtraction> {
            Ok(ContactExtraction::default())
        }

        async fn suggest_navigation(&self, _html: &str, _url: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    /// Serves a tel: anchor for every URL except ones containing "broken",
    /// which fail at fetch time.
    struct MixedDriver;

    #[async_trait]
    impl PageDriver for MixedDriver {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            if url.contains("broken") {
                return Err("connection refused".into());
            }
            Ok(FetchedPage {
                html: r#"<a href="tel:+79991234567">tel</a>"#.to_string(),
                status: Some(200),
                final_url: url.to_string(),
            })
        }

        async fn navigate_by_hints(&self, url: &str, _hints: &[String]) -> Result<NavigatedPage> {
            Ok(NavigatedPage {
                html: String::new(),
                url: url.to_string(),
            })
        }
    }

    fn engine() -> DiscoveryEngine {
        DiscoveryEngine::new(
            Config::default(),
            Arc::new(BrowserSessionManager::new()),
            Arc::new(MixedDriver),
            Arc::new(AllRelevantAssistant),
        )
    }

    fn candidate(url: &str) -> SearchCandidate {
        SearchCandidate {
            url: url.to_string(),
            title: url.to_string(),
        }
    }

    #[tokio::test]
    async fn failing_link_is_isolated_from_the_batch() {
        let outcome = engine()
            .run_from_candidates(
                "студия звукозаписи",
                vec![
                    candidate("https://ok.ru.example/"),
                    candidate("https://broken.example/"),
                    candidate("https://fine.example/"),
                ],
                10,
                RunLog::global(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 3);
        let broken = &outcome.results[1];
        assert!(broken.error);
        assert!(!broken.contacts.has_contacts());
        assert!(!outcome.results[0].error);
        assert_eq!(outcome.results[2].contacts.phones, vec!["+79991234567"]);
    }

    #[tokio::test]
    async fn aggregators_never_reach_the_workers() {
        let outcome = engine()
            .run_from_candidates(
                "студия звукозаписи",
                vec![
                    candidate("https://2gis.ru/tyumen/firm/1"),
                    candidate("https://studio.example/"),
                ],
                10,
                RunLog::global(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].link.url, "https://studio.example/");
    }

    #[tokio::test]
    async fn empty_candidate_list_yields_empty_outcome() {
        let outcome = engine()
            .run_from_candidates("query", Vec::new(), 10, RunLog::global())
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
        assert!(!outcome.logs.is_empty());
    }
}
