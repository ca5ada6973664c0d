use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::types::MessageDetail;

/// Pulls the confirmation link out of a verification email. HTML hrefs win
/// over URLs found in the plain-text body; known verification shapes win
/// over arbitrary links.
pub struct LinkExtractor {
    url_re: Regex,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self {
            url_re: Regex::new(r#"https?://[^\s<>"']+"#).unwrap(),
        }
    }

    pub fn extract(&self, message: &MessageDetail) -> Option<String> {
        let mut candidates = collect_hrefs(message);
        if candidates.is_empty() {
            candidates = self.collect_text_urls(&message.text);
        }
        debug!(count = candidates.len(), "link candidates");

        let chosen = candidates
            .iter()
            .find(|url| is_verification_link(url))
            .or_else(|| {
                candidates
                    .iter()
                    .find(|url| url.starts_with("http") && !is_static_asset(url))
            })?;
        Some(resolve_ccurl(chosen))
    }

    fn collect_text_urls(&self, text: &str) -> Vec<String> {
        self.url_re
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_hrefs(message: &MessageDetail) -> Vec<String> {
    let selector = Selector::parse("[href]").unwrap();
    let mut hrefs = Vec::new();
    for fragment in message.html.fragments() {
        let doc = Html::parse_document(fragment);
        for element in doc.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if !href.is_empty() {
                    hrefs.push(href.to_string());
                }
            }
        }
    }
    hrefs
}

fn is_verification_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    (lower.contains("tappaction=cc") && lower.contains("ccurl="))
        || lower.contains("chayns.cc/login1")
        || (lower.contains("code=") && (lower.contains("chayns") || lower.contains("login")))
}

fn is_static_asset(url: &str) -> bool {
    let path = match url.split_once('?') {
        Some((path, _)) => path,
        None => url,
    };
    let lower = path.to_lowercase();
    [".png", ".jpg", ".gif", ".css", ".js"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// If the link carries a `ccUrl` query parameter, that parameter is the real
/// destination. It is percent-decoded exactly once; a value that does not
/// decode to an http(s) URL leaves the wrapper link untouched.
fn resolve_ccurl(url: &str) -> String {
    let (_, query) = match url.split_once('?') {
        Some(parts) => parts,
        None => return url.to_string(),
    };
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        if !key.eq_ignore_ascii_case("ccurl") {
            continue;
        }
        return match percent_decode_str(value).decode_utf8() {
            Ok(decoded) if decoded.starts_with("http") => decoded.into_owned(),
            _ => url.to_string(),
        };
    }
    url.to_string()
}
