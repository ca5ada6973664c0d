use regex::{Regex, RegexBuilder};

use crate::types::MessageSummary;

/// Decides whether a mailbox message is the verification email. A known
/// sender address is authoritative; otherwise the subject has to match one
/// of the configured patterns.
pub struct VerificationMatcher {
    senders: Vec<String>,
    subjects: Vec<Regex>,
}

impl VerificationMatcher {
    pub fn new(senders: &[String], subject_patterns: &[String]) -> Result<Self, regex::Error> {
        let subjects = subject_patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            senders: senders.iter().map(|s| s.to_lowercase()).collect(),
            subjects,
        })
    }

    pub fn matches(&self, message: &MessageSummary) -> bool {
        let from = message.from.address.to_lowercase();
        if self.senders.iter().any(|s| *s == from) {
            return true;
        }
        self.subjects.iter().any(|re| re.is_match(&message.subject))
    }
}
