// src/ai.rs
//
// AI collaborator contract plus the OpenAI-compatible client. Every call is
// optional-quality: a malformed response surfaces as an Err and the call site
// applies its documented fallback instead of failing the run.
use crate::config::AiConfig;
use crate::models::{RankedLink, Result, SocialLink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSummary {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Structured contact-extraction reply. Keys follow the prompt contract;
/// everything defaults to empty because models omit what they did not find.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactExtraction {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub socials: Vec<SocialLink>,
    #[serde(default, alias = "contactPageHints")]
    pub contact_page_hints: Vec<String>,
}

#[async_trait]
pub trait ContactAssistant: Send + Sync {
    /// Choose up to `max_items` candidates relevant to the query. Callers
    /// must still enforce the subset invariant on the reply.
    async fn select_links_from_candidates(
        &self,
        query: &str,
        candidates: &[LinkSummary],
        max_items: usize,
    ) -> Result<Vec<LinkSummary>>;

    /// Mark each link relevant or not, with a reason.
    async fn select_relevant_links(
        &self,
        query: &str,
        links: &[LinkSummary],
    ) -> Result<Vec<RankedLink>>;

    /// Extract structured contacts and contact-page hints from stripped HTML.
    async fn extract_contacts(&self, html: &str, url: &str) -> Result<ContactExtraction>;

    /// Suggest up to five link texts / hrefs leading to a contacts page.
    async fn suggest_navigation(&self, html: &str, url: &str) -> Result<Vec<String>>;
}

pub struct AiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    extraction_html_limit: usize,
    hint_html_limit: usize,
}

impl AiClient {
    /// Key and endpoint come from the environment (`PROXYAPI_API_KEY` or
    /// `OPENAI_API_KEY`, optional `PROXYAPI_BASE_URL`), model from config.
    pub fn from_env(config: &AiConfig) -> Result<Self> {
        let api_key = std::env::var("PROXYAPI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| "API key is not set (PROXYAPI_API_KEY or OPENAI_API_KEY)")?;
        let base_url = std::env::var("PROXYAPI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            extraction_html_limit: config.extraction_html_limit,
            hint_html_limit: config.hint_html_limit,
        })
    }

    async fn chat(&self, system: &str, user: &str, json_object: bool) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.2,
        });
        if json_object {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!("AI reply: {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl ContactAssistant for AiClient {
    async fn select_links_from_candidates(
        &self,
        query: &str,
        candidates: &[LinkSummary],
        max_items: usize,
    ) -> Result<Vec<LinkSummary>> {
        let system = format!(
            "You will be given a search intent and a list of CANDIDATE links already \
             extracted from the same HTML. Choose only from the provided candidates. \
             Do NOT invent new links. Return JSON with key \"items\": \
             [{{url,title,snippet}}] with up to {max_items} items."
        );
        let user = serde_json::to_string(&json!({
            "intent": query,
            "candidates": candidates,
        }))?;

        let content = self.chat(&system, &user, true).await?;
        parse_items(&content)
    }

    async fn select_relevant_links(
        &self,
        query: &str,
        links: &[LinkSummary],
    ) -> Result<Vec<RankedLink>> {
        let system = "You are a precise research assistant. Given a search intent and a list \
                      of search results, mark which links are relevant to the intent.\n\
                      Rules:\n\
                      - Prefer DIRECT company/organization websites for the intent.\n\
                      - INCLUDE official company pages on social networks \
                      (vk/telegram/instagram/facebook) when they represent the specific \
                      company (not generic categories).\n\
                      - EXCLUDE general aggregators/directories/maps or generic category \
                      pages unless the page is a specific company profile.\n\
                      - Keep only direct matches.";
        let mut user = format!("Intent: {query}\nResults:\n");
        for (i, link) in links.iter().enumerate() {
            user.push_str(&format!(
                "{}. {} | {}\n{}\n",
                i + 1,
                link.title,
                link.url,
                link.snippet
            ));
        }
        user.push_str(
            "\nRespond as JSON array of objects: {url,title,snippet,relevant:boolean,reason} \
             with the same order.",
        );

        let content = self.chat(system, &user, false).await?;
        parse_ranked_links(&content)
    }

    async fn extract_contacts(&self, html: &str, url: &str) -> Result<ContactExtraction> {
        let system = "You extract contacts from raw HTML. Respond strictly as json object. \
                      Return structured contacts and hints where a contact/contacts link \
                      might be located.\n\
                      Keys: emails[], phones[], socials[{platform,url}], contactPageHints[].\n\
                      Phones: ONLY real phone numbers (no dates, ids, coordinates, order \
                      numbers). Keep human-readable formatting, but do NOT include 'tel:' \
                      prefix.\n\
                      Include social links (vk/telegram/whatsapp/instagram/facebook) with \
                      platform and absolute url.";
        let html: String = html.chars().take(self.extraction_html_limit).collect();
        let user = format!("Return json only. URL: {url}\nHTML:\n{html}");

        let content = self.chat(system, &user, true).await?;
        parse_contact_extraction(&content)
    }

    async fn suggest_navigation(&self, html: &str, url: &str) -> Result<Vec<String>> {
        let system = "Given a page HTML, suggest link texts, hrefs, or steps to navigate to \
                      a contacts page. Return up to 5 actionable hints.";
        let html: String = html.chars().take(self.hint_html_limit).collect();
        let user = format!("URL: {url}\nHTML:\n{html}");

        let content = self.chat(system, &user, false).await?;
        Ok(parse_hint_lines(&content))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<LinkSummary>,
}

fn parse_items(content: &str) -> Result<Vec<LinkSummary>> {
    let envelope: ItemsEnvelope = serde_json::from_str(content)?;
    Ok(envelope
        .items
        .into_iter()
        .filter(|item| !item.url.is_empty())
        .collect())
}

fn parse_ranked_links(content: &str) -> Result<Vec<RankedLink>> {
    let links: Vec<RankedLink> = serde_json::from_str(content)?;
    Ok(links)
}

fn parse_contact_extraction(content: &str) -> Result<ContactExtraction> {
    let extraction: ContactExtraction = serde_json::from_str(content)?;
    Ok(extraction)
}

fn parse_hint_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(5)
        .collect()
}
