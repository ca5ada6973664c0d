use std::collections::HashMap;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, info};

use autoreg_core::config::WebdriverConfig;

use crate::session::{BrowserPage, ElementSnapshot, Query, SessionError, PROBED_ATTRS};

/// Live page backed by a chromedriver session.
pub struct WebdriverPage {
    client: Client,
    // Handle registry; indices back the ElementSnapshot handles and are
    // invalidated by navigation and frame switches.
    elements: Vec<Element>,
}

pub async fn connect(cfg: &WebdriverConfig) -> Result<WebdriverPage, SessionError> {
    let mut caps = serde_json::map::Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": chrome_args(cfg) }),
    );

    let mut builder = ClientBuilder::native();
    builder.capabilities(caps);
    let client = builder.connect(&cfg.url).await?;
    info!(url = %cfg.url, headless = cfg.headless, "webdriver session ready");

    Ok(WebdriverPage {
        client,
        elements: Vec::new(),
    })
}

fn chrome_args(cfg: &WebdriverConfig) -> Vec<String> {
    let mut args = Vec::new();
    if cfg.headless {
        args.push("--headless=new".to_string());
    }
    args.push("--no-sandbox".to_string());
    args.push("--disable-dev-shm-usage".to_string());
    args.push("--disable-gpu".to_string());
    args.push(format!("--window-size={}", cfg.window_size));
    args.push("--disable-blink-features=AutomationControlled".to_string());
    args.push(format!("--user-agent={}", cfg.user_agent));
    args
}

impl WebdriverPage {
    fn element(&self, handle: usize) -> Result<&Element, SessionError> {
        self.elements
            .get(handle)
            .ok_or(SessionError::StaleHandle(handle))
    }
}

async fn probe(element: &Element, handle: usize) -> Result<ElementSnapshot, SessionError> {
    let tag = element
        .prop("tagName")
        .await?
        .unwrap_or_default()
        .to_lowercase();
    let text = element.text().await?.trim().to_string();
    let visible = element.is_displayed().await?;
    let (x, y, _, _) = element.rectangle().await?;

    let mut attrs = HashMap::new();
    for name in PROBED_ATTRS {
        if let Some(value) = element.attr(name).await? {
            attrs.insert(name.to_string(), value);
        }
    }

    Ok(ElementSnapshot {
        handle,
        tag,
        text,
        visible,
        x,
        y,
        attrs,
    })
}

#[async_trait]
impl BrowserPage for WebdriverPage {
    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        self.elements.clear();
        self.client.goto(url).await?;
        Ok(())
    }

    async fn document_ready(&mut self) -> Result<bool, SessionError> {
        let value = self
            .client
            .execute("return document.readyState === 'complete';", vec![])
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<ElementSnapshot>, SessionError> {
        let found = match query {
            Query::Css(s) => self.client.find_all(Locator::Css(s)).await?,
            Query::XPath(s) => self.client.find_all(Locator::XPath(s)).await?,
        };

        let mut snapshots = Vec::with_capacity(found.len());
        for element in found {
            let handle = self.elements.len();
            self.elements.push(element.clone());
            match probe(&element, handle).await {
                Ok(snapshot) => snapshots.push(snapshot),
                // Element vanished mid-probe; skip it but keep the handle
                // slot so earlier snapshots stay valid.
                Err(err) => debug!(%query, error = %err, "element probe failed"),
            }
        }
        Ok(snapshots)
    }

    async fn parent_text(&mut self, handle: usize) -> Result<String, SessionError> {
        let element = self.element(handle)?.clone();
        match element.find(Locator::XPath("..")).await {
            Ok(parent) => Ok(parent.text().await.unwrap_or_default()),
            Err(_) => Ok(String::new()),
        }
    }

    async fn click(&mut self, handle: usize) -> Result<(), SessionError> {
        let element = self.element(handle)?.clone();
        element.click().await?;
        Ok(())
    }

    async fn clear_and_type(&mut self, handle: usize, text: &str) -> Result<(), SessionError> {
        let element = self.element(handle)?.clone();
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn blur_active(&mut self) -> Result<(), SessionError> {
        self.client
            .execute(
                "if (document.activeElement) { document.activeElement.blur(); } return true;",
                vec![],
            )
            .await?;
        Ok(())
    }

    async fn enter_frame_by_src(&mut self, fragment: &str) -> Result<bool, SessionError> {
        let selector = format!("iframe[src*='{fragment}']");
        let frames = self.client.find_all(Locator::Css(&selector)).await?;
        let frame = match frames.into_iter().next() {
            Some(frame) => frame,
            None => return Ok(false),
        };
        self.elements.clear();
        frame.enter_frame().await?;
        Ok(true)
    }

    async fn leave_frames(&mut self) -> Result<(), SessionError> {
        self.elements.clear();
        self.client.enter_frame(None).await?;
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, SessionError> {
        let value = self
            .client
            .execute("return document.body ? document.body.innerText : '';", vec![])
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn eval(&mut self, script: &str) -> Result<serde_json::Value, SessionError> {
        Ok(self.client.execute(script, vec![]).await?)
    }

    async fn cookies(&mut self) -> Result<Vec<(String, String)>, SessionError> {
        let cookies = self.client.get_all_cookies().await?;
        Ok(cookies
            .iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect())
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        self.elements.clear();
        self.client.refresh().await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(self.client.screenshot().await?)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.client.clone().close().await?;
        Ok(())
    }
}
