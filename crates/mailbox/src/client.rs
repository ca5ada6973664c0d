use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{
    CreatedAccount, MailboxAccount, MessageDetail, MessageList, MessageSummary, TokenResponse,
};

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("mailbox http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mailbox provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("mailbox response missing {0}")]
    MissingField(&'static str),
}

/// Read side of the mailbox, so the poller and the flow engine can be
/// driven by a scripted mailbox in tests.
#[async_trait]
pub trait MailboxPort: Send + Sync {
    async fn create_account(&self) -> Result<MailboxAccount, MailboxError>;
    async fn list_messages(&self, token: &str) -> Result<Vec<MessageSummary>, MailboxError>;
    async fn fetch_message(&self, token: &str, id: &str) -> Result<MessageDetail, MailboxError>;
}

/// HTTP client for a mail.tm-compatible disposable-mail API.
pub struct MailboxClient {
    http: reqwest::Client,
    base_url: String,
    domain: String,
}

impl MailboxClient {
    pub fn new(base_url: &str, domain: &str, timeout: Duration) -> Result<Self, MailboxError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
        })
    }

    /// 10 lowercase alphanumerics, enough to never collide in practice.
    pub fn generate_local_part() -> String {
        const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..10)
            .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
            .collect()
    }

    pub fn generate_password() -> String {
        const CHARS: &[u8] =
            b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%";
        let mut rng = rand::thread_rng();
        (0..16)
            .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
            .collect()
    }

    async fn obtain_token(&self, address: &str, password: &str) -> Result<String, MailboxError> {
        let resp = self
            .http
            .post(format!("{}/token", self.base_url))
            .json(&json!({ "address": address, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = read_json(resp).await?;
        Ok(token.token)
    }
}

#[async_trait]
impl MailboxPort for MailboxClient {
    async fn create_account(&self) -> Result<MailboxAccount, MailboxError> {
        let address = format!("{}@{}", Self::generate_local_part(), self.domain);
        let password = Self::generate_password();
        debug!(%address, "creating mailbox");

        let resp = self
            .http
            .post(format!("{}/accounts", self.base_url))
            .json(&json!({ "address": address, "password": password }))
            .send()
            .await?;
        let created: CreatedAccount = read_json(resp).await?;
        let account_id = created
            .account_id()
            .ok_or(MailboxError::MissingField("account id"))?;

        let token = self.obtain_token(&address, &password).await?;
        info!(%address, "mailbox ready");

        Ok(MailboxAccount {
            address,
            password,
            account_id,
            token,
        })
    }

    async fn list_messages(&self, token: &str) -> Result<Vec<MessageSummary>, MailboxError> {
        let resp = self
            .http
            .get(format!("{}/messages", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let list: MessageList = read_json(resp).await?;
        Ok(list.into_vec())
    }

    async fn fetch_message(&self, token: &str, id: &str) -> Result<MessageDetail, MailboxError> {
        let resp = self
            .http
            .get(format!("{}/messages/{}", self.base_url, id))
            .bearer_auth(token)
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, MailboxError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(MailboxError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}
