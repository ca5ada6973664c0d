use std::collections::HashMap;

use async_trait::async_trait;
use fantoccini::error::{CmdError, NewSessionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("webdriver command failed: {0}")]
    Command(#[from] CmdError),

    #[error("webdriver session could not be created: {0}")]
    Connect(#[from] NewSessionError),

    #[error("element handle {0} is no longer valid")]
    StaleHandle(usize),
}

/// How to find elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{s}"),
            Self::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Attributes probed on every matched element; the locator keys off these.
pub const PROBED_ATTRS: [&str; 6] = [
    "type",
    "name",
    "id",
    "placeholder",
    "autocomplete",
    "aria-label",
];

/// A point-in-time view of one matched element. The handle stays usable for
/// click and type calls until the page navigates or switches frames.
#[derive(Debug, Clone)]
pub struct ElementSnapshot {
    pub handle: usize,
    pub tag: String,
    pub text: String,
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub attrs: HashMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Everything the flow engine needs from a browser tab. The live
/// implementation speaks WebDriver; tests substitute a scripted page.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&mut self, url: &str) -> Result<(), SessionError>;
    async fn document_ready(&mut self) -> Result<bool, SessionError>;

    async fn query(&mut self, query: &Query) -> Result<Vec<ElementSnapshot>, SessionError>;
    /// Text of the element's parent node, used when an input itself carries
    /// no identifying attributes.
    async fn parent_text(&mut self, handle: usize) -> Result<String, SessionError>;

    async fn click(&mut self, handle: usize) -> Result<(), SessionError>;
    async fn clear_and_type(&mut self, handle: usize, text: &str) -> Result<(), SessionError>;
    async fn blur_active(&mut self) -> Result<(), SessionError>;

    /// Switch into the first iframe whose src contains `fragment`. Returns
    /// false when no such iframe exists yet.
    async fn enter_frame_by_src(&mut self, fragment: &str) -> Result<bool, SessionError>;
    async fn leave_frames(&mut self) -> Result<(), SessionError>;

    async fn page_text(&mut self) -> Result<String, SessionError>;
    async fn eval(&mut self, script: &str) -> Result<serde_json::Value, SessionError>;
    async fn cookies(&mut self) -> Result<Vec<(String, String)>, SessionError>;

    async fn refresh(&mut self) -> Result<(), SessionError>;
    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError>;
    async fn close(&mut self) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_attr_defaults_to_empty() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), "email-phone".to_string());
        let snap = ElementSnapshot {
            handle: 0,
            tag: "input".to_string(),
            text: String::new(),
            visible: true,
            x: 10.0,
            y: 20.0,
            attrs,
        };
        assert_eq!(snap.attr("name"), "email-phone");
        assert_eq!(snap.attr("placeholder"), "");
    }

    #[test]
    fn queries_render_with_their_kind() {
        assert_eq!(Query::css("button.x").to_string(), "css:button.x");
        assert_eq!(Query::xpath("//div[1]").to_string(), "xpath://div[1]");
    }
}
