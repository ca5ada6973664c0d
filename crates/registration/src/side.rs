use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use autoreg_core::config::SideCallConfig;

/// Post-registration calls that must never fail the run. Both return
/// `None` on any failure and log what went wrong; an empty URL in the
/// config disables the call outright.
pub struct SideCalls {
    http: reqwest::Client,
    cfg: SideCallConfig,
}

impl SideCalls {
    pub fn new(cfg: SideCallConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self { http, cfg })
    }

    pub async fn notify_registration(&self, token: &str) -> Option<()> {
        if self.cfg.webhook_url.is_empty() {
            debug!("webhook disabled");
            return None;
        }

        let body = json!({
            "message": self.cfg.webhook_message,
            "nerMode": self.cfg.webhook_ner_mode,
            "siteId": self.cfg.webhook_site_id,
        });
        let sent = self
            .http
            .post(&self.cfg.webhook_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await;

        match sent {
            Ok(resp) if resp.status().is_success() => {
                info!("registration webhook delivered");
                Some(())
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "registration webhook rejected");
                None
            }
            Err(err) => {
                warn!(error = %err, "registration webhook failed");
                None
            }
        }
    }

    pub async fn pro_access(&self, person_id: &str, token: &str) -> Option<bool> {
        if self.cfg.pro_access_url_template.is_empty() {
            debug!("pro access lookup disabled");
            return None;
        }

        // The backend needs a moment to materialize the new account.
        if self.cfg.pro_access_sync_delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(self.cfg.pro_access_sync_delay_secs)).await;
        }

        let url = render_pro_url(&self.cfg.pro_access_url_template, person_id);
        let sent = self.http.get(&url).bearer_auth(token).send().await;

        match sent {
            Ok(resp) if resp.status().as_u16() == 200 => match resp.json::<serde_json::Value>().await {
                Ok(value) => value.get("hasProAccess").and_then(|v| v.as_bool()),
                Err(err) => {
                    warn!(error = %err, "pro access response unreadable");
                    None
                }
            },
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "pro access lookup rejected");
                None
            }
            Err(err) => {
                warn!(error = %err, "pro access lookup failed");
                None
            }
        }
    }
}

fn render_pro_url(template: &str, person_id: &str) -> String {
    template.replace("{personId}", person_id)
}
