// Disposable-mailbox client and verification-email tooling: account
// creation, message polling with id dedup, and confirmation-link
// extraction from delivered mail.

pub mod client;
pub mod links;
pub mod matcher;
pub mod poller;
pub mod types;

pub use client::{MailboxClient, MailboxError, MailboxPort};
pub use links::LinkExtractor;
pub use matcher::VerificationMatcher;
pub use poller::MailPoller;
pub use types::{HtmlBody, MailboxAccount, MessageDetail, MessageSummary, Sender};
