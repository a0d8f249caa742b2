// src/extract/contacts.rs
use crate::models::SocialLink;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Raw, unnormalized contacts found by pattern matching. Normalization
/// (phone validity, social canonicalization, per-platform capping) is a
/// separate stage.
#[derive(Debug, Clone, Default)]
pub struct RawContacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub socials: Vec<SocialLink>,
}

pub struct HeuristicExtractor {
    email_regex: Regex,
    tel_href_regex: Regex,
    social_patterns: Vec<(&'static str, Regex)>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self {
            email_regex: Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap(),
            // Phones come only from tel: anchors. Free text is full of dates,
            // ids and prices that look like phone numbers.
            tel_href_regex: Regex::new(r#"(?i)<a\s+[^>]*href=["']tel:([^"']+)["'][^>]*>"#)
                .unwrap(),
            social_patterns: vec![
                (
                    "vk",
                    Regex::new(r"(?i)https?://(?:www\.)?vk\.com/[A-Za-z0-9_./-]+").unwrap(),
                ),
                (
                    "telegram",
                    Regex::new(r"(?i)https?://(?:t\.me|telegram\.me)/[A-Za-z0-9_./-]+").unwrap(),
                ),
                (
                    "whatsapp",
                    Regex::new(r"(?i)https?://(?:wa\.me|api\.whatsapp\.com)/[A-Za-z0-9_?=&#%-]+")
                        .unwrap(),
                ),
                (
                    "instagram",
                    Regex::new(r"(?i)https?://(?:www\.)?instagram\.com/[A-Za-z0-9_./-]+").unwrap(),
                ),
                (
                    "facebook",
                    Regex::new(r"(?i)https?://(?:www\.)?facebook\.com/[A-Za-z0-9_./-]+").unwrap(),
                ),
            ],
        }
    }

    /// Pure pattern scan over stripped HTML. Values come back raw; the
    /// normalizer decides what survives.
    pub fn extract(&self, html: &str, source_url: &str) -> RawContacts {
        let mut emails = Vec::new();
        let mut seen_emails = HashSet::new();
        for m in self.email_regex.find_iter(html) {
            let email = m.as_str().to_string();
            if seen_emails.insert(email.clone()) {
                emails.push(email);
            }
        }

        let mut phones = Vec::new();
        let mut seen_phones = HashSet::new();
        for caps in self.tel_href_regex.captures_iter(html) {
            if let Some(raw) = caps.get(1) {
                let display = raw.as_str().trim().to_string();
                if !display.is_empty() && seen_phones.insert(display.clone()) {
                    phones.push(display);
                }
            }
        }

        let mut socials = Vec::new();
        let mut seen_socials = HashSet::new();
        for (platform, pattern) in &self.social_patterns {
            for m in pattern.find_iter(html) {
                let url = m.as_str().to_string();
                if seen_socials.insert(url.clone()) {
                    socials.push(SocialLink {
                        platform: platform.to_string(),
                        url,
                    });
                }
            }
        }

        debug!(
            "Heuristic extraction on {}: {} emails, {} tel links, {} socials",
            source_url,
            emails.len(),
            phones.len(),
            socials.len()
        );

        RawContacts {
            emails,
            phones,
            socials,
        }
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}
