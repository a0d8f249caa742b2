// src/normalize.rs
use crate::models::SocialLink;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use url::Url;

/// First VK path segments that point at subresources (posts, albums,
/// marketplace) rather than the profile/community page itself.
const VK_RESERVED: [&str; 15] = [
    "wall", "video", "photo", "events", "topic", "album", "app", "market", "artist", "sticker",
    "feed", "write", "share", "audio", "groups",
];

pub struct ContactNormalizer {
    date_like: Regex,
    segmented_id: Regex,
}

impl ContactNormalizer {
    pub fn new() -> Self {
        Self {
            date_like: Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
            segmented_id: Regex::new(r"^(?:\d{4}-){3}\d{3,4}$").unwrap(),
        }
    }

    /// Digits only, preserving a single leading `+`.
    fn normalize_phone(phone: &str) -> String {
        let plus = phone.trim().starts_with('+');
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if plus {
            format!("+{digits}")
        } else {
            digits
        }
    }

    /// Validity predicate for phone display strings. Dots mean coordinates or
    /// amounts; hyphenated groups mean dates or order ids. Numbers without a
    /// leading `+` must start with 7 or 8 (local convention).
    pub fn looks_like_phone(&self, display: &str) -> bool {
        if display.is_empty() || display.contains('.') {
            return false;
        }
        if self.date_like.is_match(display) {
            return false;
        }
        if self.segmented_id.is_match(display.trim()) {
            return false;
        }
        let norm = Self::normalize_phone(display);
        let digits = norm.strip_prefix('+').unwrap_or(&norm);
        if digits.len() < 10 || digits.len() > 15 {
            return false;
        }
        if !norm.starts_with('+') && !digits.starts_with('7') && !digits.starts_with('8') {
            return false;
        }
        true
    }

    /// Filters invalid phones and dedupes by normalized form, keeping the
    /// first human-readable display form seen.
    pub fn clean_phones<I>(&self, phones: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for display in phones {
            if !self.looks_like_phone(&display) {
                continue;
            }
            let norm = Self::normalize_phone(&display);
            if seen.insert(norm) {
                out.push(display);
            }
        }
        out
    }

    /// Reduces a social URL to its minimal stable profile-identifying form.
    /// Returns `None` when the URL does not identify a profile at all.
    pub fn canonicalize_social_url(&self, raw: &str) -> Option<String> {
        let mut url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_string();

        if host.ends_with("vk.com") {
            let path = url.path().trim_end_matches('/').to_string();
            let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            if segs.first().is_some_and(|s| VK_RESERVED.contains(s)) {
                return None;
            }
            // Only the community/profile main page, e.g. /labnota or /club123.
            if segs.len() != 1 {
                return None;
            }
            url.set_query(None);
            url.set_fragment(None);
            return Some(url.to_string().trim_end_matches('/').to_string());
        }

        if host == "t.me" || host.ends_with(".t.me") || host.ends_with("telegram.me") {
            let handle = url
                .path_segments()
                .and_then(|mut s| s.find(|seg| !seg.is_empty()).map(str::to_string))?;
            url.set_path(&format!("/{handle}"));
            url.set_query(None);
            url.set_fragment(None);
            return Some(url.to_string());
        }

        if host == "wa.me" || host.ends_with(".wa.me") || host.ends_with("api.whatsapp.com") {
            // Query may carry the phone number or a prefilled message.
            url.set_fragment(None);
            return Some(url.to_string());
        }

        if host.contains("instagram.com") || host.contains("facebook.com") {
            url.set_query(None);
            url.set_fragment(None);
            return Some(url.to_string());
        }

        Some(url.to_string())
    }

    /// Canonicalizes, dedupes by `(platform, canonical url)` and keeps at most
    /// one entry per platform, first surviving entry wins.
    pub fn clean_socials<I>(&self, socials: I) -> Vec<SocialLink>
    where
        I: IntoIterator<Item = SocialLink>,
    {
        let mut seen = HashSet::new();
        let mut per_platform: HashMap<String, SocialLink> = HashMap::new();
        let mut order = Vec::new();

        for social in socials {
            if social.url.is_empty() {
                continue;
            }
            let Some(canonical) = self.canonicalize_social_url(&social.url) else {
                continue;
            };
            let key = format!("{}|{}", social.platform, canonical);
            if !seen.insert(key) {
                continue;
            }
            if !per_platform.contains_key(&social.platform) {
                order.push(social.platform.clone());
                per_platform.insert(
                    social.platform.clone(),
                    SocialLink {
                        platform: social.platform,
                        url: canonical,
                    },
                );
            }
        }

        order
            .into_iter()
            .filter_map(|p| per_platform.remove(&p))
            .collect()
    }

    /// Case-sensitive set union of email sources, first occurrence wins.
    pub fn dedup_emails<I>(&self, emails: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for email in emails {
            if !email.is_empty() && seen.insert(email.clone()) {
                out.push(email);
            }
        }
        out
    }
}

impl Default for ContactNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
