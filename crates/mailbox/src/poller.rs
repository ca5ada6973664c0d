use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::client::MailboxPort;
use crate::types::MessageSummary;

/// Polls the mailbox until a message satisfies the predicate or the budget
/// runs out. Every message id is considered at most once, so a message that
/// was inspected and rejected is never re-offered on later polls.
pub struct MailPoller {
    interval: Duration,
}

impl MailPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn poll<F>(
        &self,
        source: &dyn MailboxPort,
        token: &str,
        timeout: Duration,
        mut predicate: F,
    ) -> Option<MessageSummary>
    where
        F: FnMut(&MessageSummary) -> bool + Send,
    {
        let deadline = Instant::now() + timeout;
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            match source.list_messages(token).await {
                Ok(messages) => {
                    for message in messages {
                        if seen.insert(message.id.clone()) && predicate(&message) {
                            debug!(id = %message.id, "matching message");
                            return Some(message);
                        }
                    }
                }
                Err(err) => warn!(error = %err, "listing messages failed"),
            }

            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MailboxError;
    use crate::types::{MailboxAccount, MessageDetail, Sender};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedMailbox {
        batches: Mutex<VecDeque<Result<Vec<MessageSummary>, MailboxError>>>,
    }

    impl ScriptedMailbox {
        fn new(batches: Vec<Result<Vec<MessageSummary>, MailboxError>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
            }
        }
    }

    #[async_trait]
    impl MailboxPort for ScriptedMailbox {
        async fn create_account(&self) -> Result<MailboxAccount, MailboxError> {
            Ok(MailboxAccount {
                address: "test@duckmail.sbs".to_string(),
                password: "pw".to_string(),
                account_id: "acc".to_string(),
                token: "tok".to_string(),
            })
        }

        async fn list_messages(&self, _token: &str) -> Result<Vec<MessageSummary>, MailboxError> {
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_message(
            &self,
            _token: &str,
            _id: &str,
        ) -> Result<MessageDetail, MailboxError> {
            Err(MailboxError::MissingField("unused"))
        }
    }

    fn summary(id: &str, from: &str) -> MessageSummary {
        MessageSummary {
            id: id.to_string(),
            subject: String::new(),
            from: Sender {
                address: from.to_string(),
                name: String::new(),
            },
            created_at: None,
            seen: false,
        }
    }

    #[tokio::test]
    async fn each_message_id_is_evaluated_once() {
        let source = ScriptedMailbox::new(vec![
            Ok(vec![summary("m1", "a@b.c")]),
            Ok(vec![summary("m1", "a@b.c"), summary("m2", "a@b.c")]),
        ]);
        let mut evaluations: HashMap<String, usize> = HashMap::new();

        let poller = MailPoller::new(Duration::from_millis(5));
        let found = poller
            .poll(&source, "tok", Duration::from_millis(50), |m| {
                *evaluations.entry(m.id.clone()).or_insert(0) += 1;
                false
            })
            .await;

        assert!(found.is_none());
        assert_eq!(evaluations.get("m1"), Some(&1));
        assert_eq!(evaluations.get("m2"), Some(&1));
    }

    #[tokio::test]
    async fn matching_message_ends_the_poll() {
        let source = ScriptedMailbox::new(vec![
            Ok(vec![summary("noise", "ads@elsewhere.net")]),
            Ok(vec![summary("hit", "noreply@chayns.de")]),
        ]);

        let poller = MailPoller::new(Duration::from_millis(5));
        let found = poller
            .poll(&source, "tok", Duration::from_secs(5), |m| {
                m.from.address == "noreply@chayns.de"
            })
            .await;

        assert_eq!(found.map(|m| m.id).as_deref(), Some("hit"));
    }

    #[tokio::test]
    async fn listing_errors_do_not_abort_the_poll() {
        let source = ScriptedMailbox::new(vec![
            Err(MailboxError::Provider {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            Ok(vec![summary("hit", "noreply@chayns.de")]),
        ]);

        let poller = MailPoller::new(Duration::from_millis(5));
        let found = poller
            .poll(&source, "tok", Duration::from_secs(5), |m| {
                m.from.address == "noreply@chayns.de"
            })
            .await;

        assert!(found.is_some());
    }

    #[tokio::test]
    async fn zero_budget_still_lists_once() {
        let source = ScriptedMailbox::new(vec![Ok(vec![summary("hit", "noreply@chayns.de")])]);

        let poller = MailPoller::new(Duration::from_millis(5));
        let found = poller
            .poll(&source, "tok", Duration::ZERO, |m| {
                m.from.address == "noreply@chayns.de"
            })
            .await;

        assert!(found.is_some());
    }
}
