// src/discovery/worker.rs
//
// Per-link state machine with two terminal states: Resolved (a contact
// record, possibly empty) and Error (anything threw). Errors never leave
// the worker; the batch keeps going.
use crate::ai::{ContactAssistant, ContactExtraction};
use crate::discovery::driver::PageDriver;
use crate::discovery::runlog::RunLog;
use crate::extract::contacts::RawContacts;
use crate::extract::{strip_html_assets, HeuristicExtractor};
use crate::models::{ContactRecord, PipelineResult, RankedLink, Result};
use crate::normalize::ContactNormalizer;

pub struct ContactDiscoveryWorker<'a> {
    driver: &'a dyn PageDriver,
    assistant: &'a dyn ContactAssistant,
    extractor: &'a HeuristicExtractor,
    normalizer: &'a ContactNormalizer,
}

impl<'a> ContactDiscoveryWorker<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        assistant: &'a dyn ContactAssistant,
        extractor: &'a HeuristicExtractor,
        normalizer: &'a ContactNormalizer,
    ) -> Self {
        Self {
            driver,
            assistant,
            extractor,
            normalizer,
        }
    }

    pub async fn process(&self, link: &RankedLink) -> PipelineResult {
        let log = RunLog::scoped(&link.url);
        match self.try_process(link, &log).await {
            Ok(result) => result,
            Err(e) => {
                log.push(format!("Processing failed: {e}"));
                PipelineResult {
                    link: link.clone(),
                    page: link.url.clone(),
                    contacts: ContactRecord::default(),
                    hints_tried: Vec::new(),
                    logs: log.lines(),
                    error: true,
                }
            }
        }
    }

    async fn try_process(&self, link: &RankedLink, log: &RunLog) -> Result<PipelineResult> {
        log.push("Loading page...");
        let fetched = self.driver.fetch(&link.url).await?;
        log.push(format!(
            "Page loaded: {} (status={})",
            fetched.final_url,
            fetched
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));

        let (merged, first_extraction) =
            self.extract_and_merge(&fetched.html, &fetched.final_url, log).await;
        log.push(format!(
            "First extraction: emails={}, phones={}, socials={}",
            merged.emails.len(),
            merged.phones.len(),
            merged.socials.len()
        ));

        if merged.has_contacts() {
            log.push("Contacts found on the landing page");
            return Ok(PipelineResult {
                link: link.clone(),
                page: fetched.final_url,
                contacts: merged,
                hints_tried: Vec::new(),
                logs: log.lines(),
                error: false,
            });
        }

        // AI-reported hints from the first extraction win; only an empty
        // list triggers a fresh hint request.
        let hints = if !first_extraction.contact_page_hints.is_empty() {
            first_extraction.contact_page_hints
        } else {
            match self
                .assistant
                .suggest_navigation(&fetched.html, &fetched.final_url)
                .await
            {
                Ok(hints) => hints,
                Err(e) => {
                    log.push(format!("Hint suggestion failed ({e}), continuing without"));
                    Vec::new()
                }
            }
        };

        log.push(format!("Following {} hint(s) toward a contacts page...", hints.len()));
        let navigated = self
            .driver
            .navigate_by_hints(&fetched.final_url, &hints)
            .await?;
        log.push(format!("Opened page: {}", navigated.url));

        let (merged, _) = self.extract_and_merge(&navigated.html, &navigated.url, log).await;
        log.push(format!(
            "Second extraction: emails={}, phones={}, socials={}",
            merged.emails.len(),
            merged.phones.len(),
            merged.socials.len()
        ));

        // An empty record after hint navigation is a valid terminal outcome.
        Ok(PipelineResult {
            link: link.clone(),
            page: navigated.url,
            contacts: merged,
            hints_tried: hints,
            logs: log.lines(),
            error: false,
        })
    }

    /// Runs heuristic and AI extraction over the same stripped HTML and
    /// merges them through the normalizer. AI failure degrades to
    /// heuristic-only.
    async fn extract_and_merge(
        &self,
        html: &str,
        url: &str,
        log: &RunLog,
    ) -> (ContactRecord, ContactExtraction) {
        let stripped = strip_html_assets(html);
        let heuristic = self.extractor.extract(&stripped, url);
        let ai = match self.assistant.extract_contacts(&stripped, url).await {
            Ok(extraction) => extraction,
            Err(e) => {
                log.push(format!("AI extraction failed ({e}), using heuristics only"));
                ContactExtraction::default()
            }
        };
        let merged = self.merge(&ai, &heuristic);
        (merged, ai)
    }

    fn merge(&self, ai: &ContactExtraction, heuristic: &RawContacts) -> ContactRecord {
        let emails = self
            .normalizer
            .dedup_emails(ai.emails.iter().chain(&heuristic.emails).cloned());
        let phones = self
            .normalizer
            .clean_phones(ai.phones.iter().chain(&heuristic.phones).cloned());
        let socials = self
            .normalizer
            .clean_socials(ai.socials.iter().chain(&heuristic.socials).cloned());

        ContactRecord {
            emails,
            phones,
            socials,
            contact_page_hints: ai.contact_page_hints.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::LinkSummary;
    use crate::discovery::driver::{FetchedPage, NavigatedPage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubDriver {
        fetch_html: String,
        fetch_fails: bool,
        navigated_html: String,
        navigated_url: String,
        hints_seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageDriver for StubDriver {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            if self.fetch_fails {
                return Err("navigation timed out".into());
            }
            Ok(FetchedPage {
                html: self.fetch_html.clone(),
                status: Some(200),
                final_url: url.to_string(),
            })
        }

        async fn navigate_by_hints(&self, url: &str, hints: &[String]) -> Result<NavigatedPage> {
            self.hints_seen.lock().unwrap().extend(hints.iter().cloned());
            Ok(NavigatedPage {
                html: self.navigated_html.clone(),
                url: if self.navigated_url.is_empty() {
                    url.to_string()
                } else {
                    self.navigated_url.clone()
                },
            })
        }
    }

    #[derive(Default)]
    struct StubAssistant {
        extraction: ContactExtraction,
        fresh_hints: Vec<String>,
    }

    #[async_trait]
    impl ContactAssistant for StubAssistant {
        async fn select_links_from_candidates(
            &self,
            _query: &str,
            _candidates: &[LinkSummary],
            _max_items: usize,
        ) -> Result<Vec<LinkSummary>> {
            Ok(Vec::new())
        }

        async fn select_relevant_links(
            &self,
            _query: &str,
            _links: &[LinkSummary],
        ) -> Result<Vec<RankedLink>> {
            Ok(Vec::new())
        }

        async fn extract_contacts(&self, _html: &str, _url: &str) -> Result<ContactExtraction> {
            Ok(self.extraction.clone())
        }

        async fn suggest_navigation(&self, _html: &str, _url: &str) -> Result<Vec<String>> {
            Ok(self.fresh_hints.clone())
        }
    }

    fn link(url: &str) -> RankedLink {
        RankedLink {
            url: url.to_string(),
            title: "Музыкальная студия".to_string(),
            snippet: String::new(),
            relevant: true,
            reason: String::new(),
        }
    }

    fn worker_parts() -> (HeuristicExtractor, ContactNormalizer) {
        (HeuristicExtractor::new(), ContactNormalizer::new())
    }

    #[tokio::test]
    async fn tel_anchor_resolves_on_landing_page() {
        let driver = StubDriver {
            fetch_html: r#"<a href="tel:+79991234567">Позвонить</a>"#.to_string(),
            ..Default::default()
        };
        let assistant = StubAssistant::default();
        let (extractor, normalizer) = worker_parts();
        let worker = ContactDiscoveryWorker::new(&driver, &assistant, &extractor, &normalizer);

        let result = worker.process(&link("https://example-studio.ru/")).await;
        assert!(!result.error);
        assert_eq!(result.contacts.phones, vec!["+79991234567"]);
        assert!(result.contacts.emails.is_empty());
        assert_eq!(result.page, "https://example-studio.ru/");
        assert!(result.hints_tried.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_becomes_error_result_with_original_url() {
        let driver = StubDriver {
            fetch_fails: true,
            ..Default::default()
        };
        let assistant = StubAssistant::default();
        let (extractor, normalizer) = worker_parts();
        let worker = ContactDiscoveryWorker::new(&driver, &assistant, &extractor, &normalizer);

        let result = worker.process(&link("https://example-studio.ru/")).await;
        assert!(result.error);
        assert!(!result.contacts.has_contacts());
        assert_eq!(result.page, "https://example-studio.ru/");
    }

    #[tokio::test]
    async fn empty_landing_page_triggers_hint_navigation() {
        let driver = StubDriver {
            fetch_html: "<p>Добро пожаловать</p>".to_string(),
            navigated_html: "Пишите: info@studio.ru".to_string(),
            navigated_url: "https://example-studio.ru/contacts".to_string(),
            ..Default::default()
        };
        let assistant = StubAssistant {
            extraction: ContactExtraction {
                contact_page_hints: vec!["Контакты".to_string()],
                ..Default::default()
            },
            fresh_hints: vec!["should not be used".to_string()],
        };
        let (extractor, normalizer) = worker_parts();
        let worker = ContactDiscoveryWorker::new(&driver, &assistant, &extractor, &normalizer);

        let result = worker.process(&link("https://example-studio.ru/")).await;
        assert!(!result.error);
        assert_eq!(result.contacts.emails, vec!["info@studio.ru"]);
        assert_eq!(result.page, "https://example-studio.ru/contacts");
        // AI-reported hints win over a fresh hint request.
        assert_eq!(result.hints_tried, vec!["Контакты"]);
        assert_eq!(*driver.hints_seen.lock().unwrap(), vec!["Контакты"]);
    }

    #[tokio::test]
    async fn fresh_hints_requested_only_when_ai_reported_none() {
        let driver = StubDriver {
            fetch_html: "<p>ничего</p>".to_string(),
            navigated_html: "<p>опять ничего</p>".to_string(),
            ..Default::default()
        };
        let assistant = StubAssistant {
            extraction: ContactExtraction::default(),
            fresh_hints: vec!["Контакты".to_string(), "About".to_string()],
        };
        let (extractor, normalizer) = worker_parts();
        let worker = ContactDiscoveryWorker::new(&driver, &assistant, &extractor, &normalizer);

        let result = worker.process(&link("https://example-studio.ru/")).await;
        assert!(!result.error);
        // Empty record after hint navigation is still a Resolved outcome.
        assert!(!result.contacts.has_contacts());
        assert_eq!(result.hints_tried, vec!["Контакты", "About"]);
    }

    #[tokio::test]
    async fn ai_and_heuristic_results_merge_and_normalize() {
        let driver = StubDriver {
            fetch_html: concat!(
                r#"<a href="tel:8 999 123-45-67">tel</a>"#,
                r#"<a href="https://vk.com/studio?from=footer">vk</a>"#,
                " info@studio.ru"
            )
            .to_string(),
            ..Default::default()
        };
        let assistant = StubAssistant {
            extraction: ContactExtraction {
                emails: vec!["info@studio.ru".to_string(), "boss@studio.ru".to_string()],
                phones: vec!["8 (999) 123-45-67".to_string(), "2024-01-15".to_string()],
                socials: vec![crate::models::SocialLink {
                    platform: "vk".to_string(),
                    url: "https://vk.com/studio".to_string(),
                }],
                contact_page_hints: Vec::new(),
            },
            fresh_hints: Vec::new(),
        };
        let (extractor, normalizer) = worker_parts();
        let worker = ContactDiscoveryWorker::new(&driver, &assistant, &extractor, &normalizer);

        let result = worker.process(&link("https://studio.ru/")).await;
        assert_eq!(result.contacts.emails, vec!["info@studio.ru", "boss@studio.ru"]);
        // Same number through AI and heuristics, date-like string rejected.
        assert_eq!(result.contacts.phones, vec!["8 (999) 123-45-67"]);
        // Query variant and canonical VK URL collapse to one entry.
        assert_eq!(result.contacts.socials.len(), 1);
        assert_eq!(result.contacts.socials[0].url, "https://vk.com/studio");
    }
}
