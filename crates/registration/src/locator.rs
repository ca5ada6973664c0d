use std::time::{Duration, Instant};

use tracing::debug;

use crate::session::{BrowserPage, ElementSnapshot, Query, SessionError};

/// CSS for anything that renders as a pressable control.
pub const CLICKABLE_CSS: &str = "button, [role='button'], a.button, a[class*='button']";

const TEXT_INPUT_EXCLUDED_TYPES: [&str; 8] = [
    "email", "tel", "password", "hidden", "checkbox", "radio", "submit", "button",
];

/// One way of finding the element(s) a flow step needs. Strategies are
/// stacked into a [`LocatorChain`] so a layout change only costs one rung.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Direct selector match, visible elements only.
    Selector(Query),
    /// Submit-typed buttons and inputs.
    SubmitControl,
    /// Pressable controls matched by their label text. Exact matches win
    /// over substring matches; excluded words veto a control entirely.
    ClickableText {
        keywords: Vec<String>,
        exclude: Vec<String>,
        exact_only: bool,
    },
    /// Inputs whose probed attributes (or surrounding text) mention one of
    /// the keywords.
    AttributeKeyword {
        keywords: Vec<String>,
        include_parent_text: bool,
    },
    /// Plain text inputs in document order, for forms with anonymous fields.
    VisibleTextInputs { limit: usize },
}

impl Strategy {
    pub async fn resolve(
        &self,
        page: &mut dyn BrowserPage,
    ) -> Result<Vec<ElementSnapshot>, SessionError> {
        match self {
            Self::Selector(query) => {
                let found = page.query(query).await?;
                Ok(found.into_iter().filter(|s| s.visible).collect())
            }
            Self::SubmitControl => {
                let query = Query::css("button[type='submit'], input[type='submit']");
                let found = page.query(&query).await?;
                Ok(found.into_iter().filter(|s| s.visible).collect())
            }
            Self::ClickableText {
                keywords,
                exclude,
                exact_only,
            } => resolve_clickable_text(page, keywords, exclude, *exact_only).await,
            Self::AttributeKeyword {
                keywords,
                include_parent_text,
            } => resolve_attribute_keyword(page, keywords, *include_parent_text).await,
            Self::VisibleTextInputs { limit } => {
                let found = page.query(&Query::css("input")).await?;
                Ok(found
                    .into_iter()
                    .filter(|s| s.visible && is_plain_text_input(s))
                    .take(*limit)
                    .collect())
            }
        }
    }
}

async fn resolve_clickable_text(
    page: &mut dyn BrowserPage,
    keywords: &[String],
    exclude: &[String],
    exact_only: bool,
) -> Result<Vec<ElementSnapshot>, SessionError> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let exclude: Vec<String> = exclude.iter().map(|k| k.to_lowercase()).collect();

    let found = page.query(&Query::css(CLICKABLE_CSS)).await?;
    let visible: Vec<ElementSnapshot> = found.into_iter().filter(|s| s.visible).collect();

    let vetoed = |text: &str| exclude.iter().any(|e| text.contains(e));

    let exact: Vec<ElementSnapshot> = visible
        .iter()
        .filter(|s| {
            let text = s.text.to_lowercase();
            !vetoed(&text) && keywords.iter().any(|k| text.trim() == k)
        })
        .cloned()
        .collect();
    if !exact.is_empty() || exact_only {
        return Ok(exact);
    }

    Ok(visible
        .into_iter()
        .filter(|s| {
            let text = s.text.to_lowercase();
            !text.is_empty() && !vetoed(&text) && keywords.iter().any(|k| text.contains(k))
        })
        .collect())
}

async fn resolve_attribute_keyword(
    page: &mut dyn BrowserPage,
    keywords: &[String],
    include_parent_text: bool,
) -> Result<Vec<ElementSnapshot>, SessionError> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let found = page.query(&Query::css("input")).await?;
    let mut matched = Vec::new();
    for snapshot in found.into_iter().filter(|s| s.visible) {
        let haystack = snapshot
            .attrs
            .values()
            .map(|v| v.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if keywords.iter().any(|k| haystack.contains(k)) {
            matched.push(snapshot);
            continue;
        }
        if include_parent_text {
            let parent = page.parent_text(snapshot.handle).await?.to_lowercase();
            if keywords.iter().any(|k| parent.contains(k)) {
                matched.push(snapshot);
            }
        }
    }
    Ok(matched)
}

fn is_plain_text_input(snapshot: &ElementSnapshot) -> bool {
    let input_type = snapshot.attr("type").to_lowercase();
    if TEXT_INPUT_EXCLUDED_TYPES.contains(&input_type.as_str()) {
        return false;
    }
    snapshot.attr("autocomplete").to_lowercase() != "email"
}

struct ChainStep {
    strategy: Strategy,
    wait: Duration,
}

/// Ordered list of strategies. `first` walks the rungs with a bounded wait
/// per rung; `collect` unions all rungs in one pass.
pub struct LocatorChain {
    steps: Vec<ChainStep>,
    interval: Duration,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            interval: Duration::from_millis(500),
        }
    }

    pub fn step(mut self, strategy: Strategy, wait: Duration) -> Self {
        self.steps.push(ChainStep { strategy, wait });
        self
    }

    /// First snapshot produced by the earliest rung that yields anything
    /// within its wait budget.
    pub async fn first(
        &self,
        page: &mut dyn BrowserPage,
    ) -> Result<Option<ElementSnapshot>, SessionError> {
        for step in &self.steps {
            let deadline = Instant::now() + step.wait;
            loop {
                let mut found = step.strategy.resolve(page).await?;
                if !found.is_empty() {
                    return Ok(Some(found.remove(0)));
                }
                if Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(self.interval).await;
            }
            debug!(strategy = ?step.strategy, "locator rung exhausted");
        }
        Ok(None)
    }

    /// Union of every rung's matches in a single pass, deduplicated by
    /// screen position and ordered top-to-bottom.
    pub async fn collect(
        &self,
        page: &mut dyn BrowserPage,
    ) -> Result<Vec<ElementSnapshot>, SessionError> {
        let mut merged: Vec<ElementSnapshot> = Vec::new();
        for step in &self.steps {
            for snapshot in step.strategy.resolve(page).await? {
                let position = (snapshot.x as i64, snapshot.y as i64);
                if merged
                    .iter()
                    .any(|m| (m.x as i64, m.y as i64) == position)
                {
                    continue;
                }
                merged.push(snapshot);
            }
        }
        merged.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });
        Ok(merged)
    }
}

impl Default for LocatorChain {
    fn default() -> Self {
        Self::new()
    }
}
