// src/extract/candidates.rs
use crate::models::SearchCandidate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

const TITLE_MAX_LEN: usize = 180;

/// Search-engine internal paths that never lead to an organization site.
const ENGINE_INTERNAL: [&str; 10] = [
    "google.com/preferences",
    "/preferences",
    "/setprefs",
    "/sorry",
    "/imgres",
    "/search?",
    "/maps/preview",
    "accounts.google.",
    "consent.google.",
    "support.google.",
];

const ENGINE_SUBDOMAINS: [&str; 1] = ["policies.google."];

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s+[^>]*href=["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap()
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Removes scripts, styles, noscript blocks, comments and excess whitespace.
/// The pipeline runs this before any extraction so the pattern-based passes
/// below do not trip over inline JS.
pub fn strip_html_assets(html: &str) -> String {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static STYLE: OnceLock<Regex> = OnceLock::new();
    static NOSCRIPT: OnceLock<Regex> = OnceLock::new();
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let script = SCRIPT.get_or_init(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
    let style = STYLE.get_or_init(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
    let noscript = NOSCRIPT.get_or_init(|| Regex::new(r"(?is)<noscript.*?</noscript>").unwrap());
    let comment = COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s{2,}").unwrap());

    let html = script.replace_all(html, "");
    let html = style.replace_all(&html, "");
    let html = noscript.replace_all(&html, "");
    let html = comment.replace_all(&html, "");
    spaces.replace_all(&html, " ").into_owned()
}

/// Resolves `href` against `base`, keeping only HTTP(S) URLs that are not
/// search-engine internal navigation.
fn normalize_candidate_url(href: &str, base: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let abs = base.join(href).ok()?;
    if abs.scheme() != "http" && abs.scheme() != "https" {
        return None;
    }
    let abs = abs.to_string();
    if ENGINE_INTERNAL.iter().any(|b| abs.contains(b)) {
        return None;
    }
    if ENGINE_SUBDOMAINS.iter().any(|b| abs.contains(b)) {
        return None;
    }
    Some(abs)
}

/// Lightweight anchor scan over possibly-malformed HTML. No DOM parse: the
/// SERP markup changes often and is not guaranteed to be well-formed.
/// Candidates are deduplicated by resolved URL, first occurrence wins, and
/// collection stops at `max`.
pub fn extract_anchor_candidates(html: &str, base_url: &str, max: usize) -> Vec<SearchCandidate> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for caps in anchor_regex().captures_iter(html) {
        if out.len() >= max {
            break;
        }
        let (Some(href), Some(inner)) = (caps.get(1), caps.get(2)) else {
            continue;
        };

        let text = tag_regex().replace_all(inner.as_str(), " ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }

        let Some(abs) = normalize_candidate_url(href.as_str(), base_url) else {
            continue;
        };
        if !seen.insert(abs.clone()) {
            continue;
        }

        let title: String = text.chars().take(TITLE_MAX_LEN).collect();
        out.push(SearchCandidate { url: abs, title });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_comments() {
        let html = "<html><script>var x = 1;</script><style>.a{}</style>\
                    <!-- hidden --><body>hello   world</body></html>";
        let out = strip_html_assets(html);
        assert!(!out.contains("var x"));
        assert!(!out.contains(".a{}"));
        assert!(!out.contains("hidden"));
        assert!(out.contains("hello world"));
    }

    #[test]
    fn extracts_and_resolves_relative_hrefs() {
        let html = r#"<a href="/about">About us</a>"#;
        let out = extract_anchor_candidates(html, "https://example.com/", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://example.com/about");
        assert_eq!(out[0].title, "About us");
    }

    #[test]
    fn dedupes_by_url_keeping_first() {
        let html = r#"
            <a href="https://example.com/">First title</a>
            <a href="https://example.com/">Second title</a>
        "#;
        let out = extract_anchor_candidates(html, "https://example.com/", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "First title");
    }

    #[test]
    fn never_exceeds_cap() {
        let mut html = String::new();
        for i in 0..50 {
            html.push_str(&format!(r#"<a href="https://site{i}.ru/">Site {i}</a>"#));
        }
        let out = extract_anchor_candidates(&html, "https://www.google.com/search?q=x", 7);
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn drops_engine_internal_and_non_http() {
        let html = r#"
            <a href="https://www.google.com/preferences?hl=ru">prefs</a>
            <a href="/setprefs?sig=1">set</a>
            <a href="https://consent.google.com/m?continue=x">consent</a>
            <a href="https://policies.google.com/privacy">policy</a>
            <a href="mailto:x@y.ru">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="https://studio.ru/">Студия</a>
        "#;
        let out = extract_anchor_candidates(html, "https://www.google.com/search?q=x", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://studio.ru/");
    }

    #[test]
    fn skips_anchors_with_empty_text() {
        let html = r#"<a href="https://a.ru/"><img src="x.png"></a><a href="https://b.ru/">B</a>"#;
        let out = extract_anchor_candidates(html, "https://www.google.com/", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://b.ru/");
    }

    #[test]
    fn truncates_long_link_text() {
        let long = "т".repeat(400);
        let html = format!(r#"<a href="https://a.ru/">{long}</a>"#);
        let out = extract_anchor_candidates(&html, "https://www.google.com/", 10);
        assert_eq!(out[0].title.chars().count(), 180);
    }
}
