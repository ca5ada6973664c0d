use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FlowError;

/// Lifecycle of a single registration or login run. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Init,
    MailboxCreated,
    SiteOpened,
    LoginEntry,
    EmailEntered,
    BranchDetected,
    RegisterForm,
    WaitingEmail,
    ConfirmationLink,
    SetPassword,
    VerifyLogin,
    Complete,
    Failed,
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::MailboxCreated => "MAILBOX_CREATED",
            Self::SiteOpened => "SITE_OPENED",
            Self::LoginEntry => "LOGIN_ENTRY",
            Self::EmailEntered => "EMAIL_ENTERED",
            Self::BranchDetected => "BRANCH_DETECTED",
            Self::RegisterForm => "REGISTER_FORM",
            Self::WaitingEmail => "WAITING_EMAIL",
            Self::ConfirmationLink => "CONFIRMATION_LINK",
            Self::SetPassword => "SET_PASSWORD",
            Self::VerifyLogin => "VERIFY_LOGIN",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One edge of the run's state machine, kept as run evidence.
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
    pub at: DateTime<Utc>,
    /// Milliseconds spent in `from` before this transition fired.
    pub step_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Screenshot {
    pub state: RunState,
    pub png: Vec<u8>,
}

/// Mutable bookkeeping for one run: current state, elapsed-time budget and
/// the evidence trail handed back to the caller.
#[derive(Debug)]
pub struct RunContext {
    state: RunState,
    started: Instant,
    started_at: DateTime<Utc>,
    entered_state: Instant,
    deadline: Duration,
    timeout_suppressed: bool,
    transitions: Vec<StateTransition>,
    debug_log: Vec<String>,
    screenshots: Vec<Screenshot>,
}

impl RunContext {
    pub fn new(global_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            state: RunState::Init,
            started: now,
            started_at: Utc::now(),
            entered_state: now,
            deadline: global_timeout,
            timeout_suppressed: false,
            transitions: Vec::new(),
            debug_log: Vec::new(),
            screenshots: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn advance(&mut self, to: RunState, note: Option<String>) {
        let from = std::mem::replace(&mut self.state, to);
        let step_ms = self.entered_state.elapsed().as_millis() as u64;
        self.entered_state = Instant::now();
        info!(from = %from, to = %to, step_ms, "state transition");
        self.transitions.push(StateTransition {
            from,
            to,
            at: Utc::now(),
            step_ms,
            note,
        });
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let line = format!("[+{}s] {}", self.elapsed().as_secs(), message.into());
        self.debug_log.push(line);
    }

    pub fn attach_screenshot(&mut self, png: Vec<u8>) {
        self.screenshots.push(Screenshot {
            state: self.state,
            png,
        });
    }

    /// After the password is set the account exists server-side, so the run
    /// is allowed to finish verification past the global deadline.
    pub fn suppress_timeout(&mut self) {
        self.timeout_suppressed = true;
    }

    pub fn is_timeout_suppressed(&self) -> bool {
        self.timeout_suppressed
    }

    pub fn check_deadline(&self) -> Result<(), FlowError> {
        if self.timeout_suppressed {
            return Ok(());
        }
        if self.started.elapsed() >= self.deadline {
            return Err(FlowError::timeout(
                self.state,
                format!("global budget of {}s exhausted", self.deadline.as_secs()),
            ));
        }
        Ok(())
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            started_at: self.started_at,
            total_ms: self.started.elapsed().as_millis() as u64,
            final_state: self.state,
            transitions: self.transitions.clone(),
            debug_log: self.debug_log.clone(),
            screenshots: self.screenshots.clone(),
        }
    }
}

/// Everything a caller needs to understand what a run did, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub total_ms: u64,
    pub final_state: RunState,
    pub transitions: Vec<StateTransition>,
    pub debug_log: Vec<String>,
    #[serde(skip)]
    pub screenshots: Vec<Screenshot>,
}
