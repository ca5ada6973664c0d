use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A provisioned disposable mailbox plus the bearer token for reading it.
#[derive(Debug, Clone)]
pub struct MailboxAccount {
    pub address: String,
    pub password: String,
    pub account_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
}

/// One entry of the mailbox listing. Only the fields the poller and the
/// matcher need; the provider sends more.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: Sender,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seen: bool,
}

/// Full message body. The provider returns `html` either as a list of
/// fragments or a single string depending on the message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: HtmlBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HtmlBody {
    Many(Vec<String>),
    One(String),
}

impl Default for HtmlBody {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl HtmlBody {
    pub fn fragments(&self) -> Vec<&str> {
        match self {
            Self::Many(parts) => parts.iter().map(String::as_str).collect(),
            Self::One(body) => vec![body.as_str()],
        }
    }
}

/// Account-creation response. Some deployments return a plain `id`, others
/// only a JSON-LD `@id` IRI whose last segment is the id.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedAccount {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "@id")]
    pub iri: Option<String>,
    #[serde(default)]
    pub address: String,
}

impl CreatedAccount {
    pub fn account_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            if !id.is_empty() {
                return Some(id.clone());
            }
        }
        self.iri
            .as_deref()
            .and_then(|iri| iri.rsplit('/').next())
            .filter(|tail| !tail.is_empty())
            .map(|tail| tail.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

/// Message listing, either wrapped in a hydra collection or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageList {
    Collection {
        #[serde(rename = "hydra:member")]
        member: Vec<MessageSummary>,
    },
    Plain(Vec<MessageSummary>),
}

impl MessageList {
    pub fn into_vec(self) -> Vec<MessageSummary> {
        match self {
            Self::Collection { member } => member,
            Self::Plain(items) => items,
        }
    }
}
