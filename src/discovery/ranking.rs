// src/discovery/ranking.rs
//
// Two AI-assisted steps plus one deterministic filter. The AI may select
// and classify, but it may not invent URLs and it may not rescue known
// aggregator domains.
use crate::ai::{ContactAssistant, LinkSummary};
use crate::discovery::runlog::RunLog;
use crate::models::{RankedLink, SearchCandidate};
use std::collections::HashSet;
use url::Url;

/// Hard cap on AI-selected candidates, independent of the requested top.
pub const SELECTION_CAP: usize = 15;

/// Directory/map/review sites that are never the target organization.
const AGGREGATOR_DOMAINS: [&str; 8] = [
    "google.com",
    "google.ru",
    "2gis.ru",
    "yandex.ru",
    "tripadvisor.ru",
    "profi.ru",
    "flamp.ru",
    "kudatumen.ru",
];

pub struct LinkRankingStage<'a> {
    assistant: &'a dyn ContactAssistant,
}

impl<'a> LinkRankingStage<'a> {
    pub fn new(assistant: &'a dyn ContactAssistant) -> Self {
        Self { assistant }
    }

    /// Selection, relevance classification, aggregator filter — in that
    /// order. Returns at most `top` links, all marked relevant.
    pub async fn rank(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
        top: usize,
        log: &RunLog,
    ) -> Vec<RankedLink> {
        let selected = self.select(query, candidates, top, log).await;
        log.push(format!("Selection stage kept {} link(s)", selected.len()));
        if selected.is_empty() {
            return Vec::new();
        }

        let classified = self.classify(query, selected, log).await;
        let relevant_count = classified.iter().filter(|l| l.relevant).count();
        log.push(format!("Relevance classification: {relevant_count} relevant"));

        let filtered: Vec<RankedLink> = classified
            .into_iter()
            .filter(|link| link.relevant)
            .filter(|link| !is_aggregator(&link.url))
            .collect();
        log.push(format!("Aggregator filter: {} link(s) remain", filtered.len()));
        filtered
    }

    async fn select(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
        top: usize,
        log: &RunLog,
    ) -> Vec<LinkSummary> {
        let summaries: Vec<LinkSummary> = candidates
            .iter()
            .map(|c| LinkSummary {
                url: c.url.clone(),
                title: c.title.clone(),
                snippet: String::new(),
            })
            .collect();

        let ai_picked = match self
            .assistant
            .select_links_from_candidates(query, &summaries, SELECTION_CAP)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                log.push(format!("AI selection failed ({e}), falling back to first candidates"));
                Vec::new()
            }
        };

        // Anti-hallucination: the AI chooses, it does not contribute. Any
        // URL outside the supplied candidate set is dropped.
        let allowed: HashSet<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        let mut picked: Vec<LinkSummary> = ai_picked
            .into_iter()
            .filter(|item| allowed.contains(item.url.as_str()))
            .take(top)
            .collect();

        if picked.is_empty() {
            picked = summaries.into_iter().take(top).collect();
        }
        picked
    }

    async fn classify(
        &self,
        query: &str,
        links: Vec<LinkSummary>,
        log: &RunLog,
    ) -> Vec<RankedLink> {
        match self.assistant.select_relevant_links(query, &links).await {
            Ok(ranked) => ranked,
            Err(e) => {
                // Permissive fallback: better to visit a few extra pages
                // than to drop the whole run.
                log.push(format!("AI relevance classification failed ({e}), keeping all links"));
                links
                    .into_iter()
                    .map(|link| RankedLink {
                        url: link.url,
                        title: link.title,
                        snippet: link.snippet,
                        relevant: true,
                        reason: "fallback".to_string(),
                    })
                    .collect()
            }
        }
    }
}

/// Hostname (minus a leading `www.`) suffix match against the fixed
/// aggregator list. Deterministic and AI-independent.
pub fn is_aggregator(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    AGGREGATOR_DOMAINS.iter().any(|domain| host.ends_with(domain))
}
