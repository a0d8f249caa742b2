use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// An anchor pulled out of raw SERP HTML before any relevance judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub url: String,
    pub title: String,
}

/// A candidate annotated with a relevance verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedLink {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    pub relevant: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Merged, normalized contact data for one page. Emails and phones are
/// deduplicated by normalized form; socials hold at most one canonical URL
/// per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub socials: Vec<SocialLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_page_hints: Vec<String>,
}

impl ContactRecord {
    pub fn has_contacts(&self) -> bool {
        !self.emails.is_empty() || !self.phones.is_empty() || !self.socials.is_empty()
    }
}

/// Terminal outcome for one ranked link. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub link: RankedLink,
    /// Final URL actually visited (after redirects / hint navigation).
    pub page: String,
    pub contacts: ContactRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints_tried: Vec<String>,
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top: Option<usize>,
    pub pages: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<PipelineResult>,
    pub logs: Vec<String>,
    pub history_id: Option<i64>,
}
