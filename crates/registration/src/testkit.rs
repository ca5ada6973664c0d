// Scripted doubles for the browser page and the mailbox, shared by the
// engine, locator, login and service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use autoreg_core::config::AppConfig;
use autoreg_mailbox::{
    HtmlBody, MailboxAccount, MailboxError, MailboxPort, MessageDetail, MessageSummary, Sender,
};

use crate::engine::NAME_HINT_CSS;
use crate::locator::CLICKABLE_CSS;
use crate::session::{BrowserPage, ElementSnapshot, Query, SessionError};

const SUBMIT_CSS: &str = "button[type='submit'], input[type='submit']";

/// Defaults shrunk so scripted runs finish in milliseconds.
pub(crate) fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.target.other_account_xpath = None;
    cfg.timeouts.global_secs = 30;
    cfg.timeouts.page_wait_secs = 1;
    cfg.timeouts.element_wait_secs = 0;
    cfg.timeouts.cookie_wait_secs = 1;
    cfg.timeouts.settle_secs = 0;
    cfg.retries.branch_attempts = 3;
    cfg.retries.branch_delay_secs = 0;
    cfg.retries.name_input_attempts = 2;
    cfg.retries.name_input_delay_secs = 0;
    cfg.retries.register_click_attempts = 1;
    cfg.mailbox.poll_interval_secs = 1;
    cfg.mailbox.poll_max_attempts = 40;
    cfg.side_calls.webhook_url = String::new();
    cfg.side_calls.pro_access_url_template = String::new();
    cfg.side_calls.pro_access_sync_delay_secs = 0;
    cfg
}

/// The controls a scripted login UI can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    LoginButton,
    EmailInput,
    ContinueButton,
    RegisterButton,
    FirstNameInput,
    LastNameInput,
    PasswordEntryInput,
    PasswordNewInput,
    PasswordRepeatInput,
    SetPasswordButton,
}

/// What the scripted site does after the email is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BranchScript {
    /// Create-account prompt text plus a register button.
    NewUserKeywords,
    /// Name inputs appear without any prompt text.
    NewUserNameInputs,
    /// Password prompt for a known address.
    ExistingUser,
    /// Blank page forever.
    Undetectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Landing,
    LoginForm,
    BranchPending,
    RegisterNames,
    AwaitingActivation,
    Activation,
    LoggedIn,
}

/// Everything a scripted page records; kept behind an Arc so tests can
/// inspect it after the page was consumed by the service.
#[derive(Default)]
pub(crate) struct PageLog {
    pub urls: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(Control, String)>>,
    pub clicked: Mutex<Vec<Control>>,
    pub close_calls: AtomicUsize,
}

/// Browser double that plays through the login UI phases.
pub(crate) struct ScriptedPage {
    phase: Phase,
    branch: BranchScript,
    handles: Vec<Control>,
    log: Arc<PageLog>,
    pause_on_goto: Option<Arc<Notify>>,
}

impl ScriptedPage {
    pub fn new(branch: BranchScript) -> Self {
        Self {
            phase: Phase::Landing,
            branch,
            handles: Vec::new(),
            log: Arc::new(PageLog::default()),
            pause_on_goto: None,
        }
    }

    /// Page whose first navigation blocks until the gate is notified.
    pub fn paused(branch: BranchScript, gate: Arc<Notify>) -> Self {
        let mut page = Self::new(branch);
        page.pause_on_goto = Some(gate);
        page
    }

    pub fn log(&self) -> Arc<PageLog> {
        self.log.clone()
    }

    fn snap(&mut self, control: Control) -> ElementSnapshot {
        let handle = self.handles.len();
        self.handles.push(control);
        let (tag, text, y, attrs): (&str, &str, f64, &[(&str, &str)]) = match control {
            Control::LoginButton => ("button", "Anmelden", 10.0, &[]),
            Control::EmailInput => (
                "input",
                "",
                20.0,
                &[("name", "email-phone"), ("type", "email")],
            ),
            Control::ContinueButton => ("button", "Weiter", 30.0, &[("type", "submit")]),
            Control::RegisterButton => ("button", "Registrieren", 40.0, &[]),
            Control::FirstNameInput => ("input", "", 50.0, &[("name", "firstName")]),
            Control::LastNameInput => ("input", "", 60.0, &[("name", "lastName")]),
            Control::PasswordEntryInput => ("input", "", 70.0, &[("type", "password")]),
            Control::PasswordNewInput => (
                "input",
                "",
                80.0,
                &[("type", "password"), ("name", "password")],
            ),
            Control::PasswordRepeatInput => (
                "input",
                "",
                90.0,
                &[("type", "password"), ("autocomplete", "new-password")],
            ),
            Control::SetPasswordButton => ("button", "Passwort festlegen", 100.0, &[]),
        };
        ElementSnapshot {
            handle,
            tag: tag.to_string(),
            text: text.to_string(),
            visible: true,
            x: 10.0,
            y,
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn present(&self, css: &str) -> Vec<Control> {
        use Control::*;
        match self.phase {
            Phase::Landing => {
                if css == "button.beta-chayns-button" || css == CLICKABLE_CSS {
                    vec![LoginButton]
                } else {
                    Vec::new()
                }
            }
            Phase::LoginForm => {
                if css == "input[name=\"email-phone\"]" || css == "input" {
                    vec![EmailInput]
                } else if css == SUBMIT_CSS {
                    vec![ContinueButton]
                } else {
                    Vec::new()
                }
            }
            Phase::BranchPending => match self.branch {
                BranchScript::ExistingUser => {
                    if css == "input[type='password']" || css == "input" {
                        vec![PasswordEntryInput]
                    } else if css == SUBMIT_CSS {
                        vec![ContinueButton]
                    } else {
                        Vec::new()
                    }
                }
                BranchScript::NewUserKeywords => {
                    if css == CLICKABLE_CSS {
                        vec![RegisterButton]
                    } else {
                        Vec::new()
                    }
                }
                BranchScript::NewUserNameInputs => {
                    if css == NAME_HINT_CSS || css == "input" {
                        vec![FirstNameInput, LastNameInput]
                    } else if css == SUBMIT_CSS {
                        vec![ContinueButton]
                    } else {
                        Vec::new()
                    }
                }
                BranchScript::Undetectable => Vec::new(),
            },
            Phase::RegisterNames => {
                if css == NAME_HINT_CSS || css == "input" {
                    vec![FirstNameInput, LastNameInput]
                } else if css == SUBMIT_CSS {
                    vec![ContinueButton]
                } else {
                    Vec::new()
                }
            }
            Phase::AwaitingActivation => Vec::new(),
            Phase::Activation => {
                if css == "input[type='password']" || css == "input" {
                    vec![PasswordNewInput, PasswordRepeatInput]
                } else if css == "input[autocomplete='new-password']" {
                    vec![PasswordRepeatInput]
                } else if css == CLICKABLE_CSS {
                    vec![SetPasswordButton]
                } else {
                    Vec::new()
                }
            }
            Phase::LoggedIn => Vec::new(),
        }
    }

    fn current_text(&self) -> String {
        match (self.phase, self.branch) {
            (Phase::BranchPending, BranchScript::NewUserKeywords) => {
                "Neu hier? Konto erstellen und direkt loslegen.".to_string()
            }
            _ => String::new(),
        }
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        if let Some(gate) = self.pause_on_goto.take() {
            gate.notified().await;
        }
        self.log.urls.lock().unwrap().push(url.to_string());
        self.handles.clear();
        self.phase = if url.contains("login1") {
            Phase::Activation
        } else {
            Phase::Landing
        };
        Ok(())
    }

    async fn document_ready(&mut self) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<ElementSnapshot>, SessionError> {
        let css = match query {
            Query::Css(s) => s.clone(),
            Query::XPath(_) => return Ok(Vec::new()),
        };
        let controls = self.present(&css);
        Ok(controls.into_iter().map(|c| self.snap(c)).collect())
    }

    async fn parent_text(&mut self, _handle: usize) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn click(&mut self, handle: usize) -> Result<(), SessionError> {
        let control = *self
            .handles
            .get(handle)
            .ok_or(SessionError::StaleHandle(handle))?;
        self.log.clicked.lock().unwrap().push(control);
        self.phase = match (control, self.phase) {
            (Control::LoginButton, _) => Phase::LoginForm,
            (Control::RegisterButton, _) => Phase::RegisterNames,
            (Control::SetPasswordButton, _) => Phase::LoggedIn,
            (Control::ContinueButton, Phase::LoginForm) => Phase::BranchPending,
            (Control::ContinueButton, Phase::RegisterNames) => Phase::AwaitingActivation,
            (Control::ContinueButton, Phase::BranchPending) => match self.branch {
                BranchScript::ExistingUser => Phase::LoggedIn,
                _ => Phase::AwaitingActivation,
            },
            (_, phase) => phase,
        };
        Ok(())
    }

    async fn clear_and_type(&mut self, handle: usize, text: &str) -> Result<(), SessionError> {
        let control = *self
            .handles
            .get(handle)
            .ok_or(SessionError::StaleHandle(handle))?;
        self.log.typed.lock().unwrap().push((control, text.to_string()));
        Ok(())
    }

    async fn blur_active(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn enter_frame_by_src(&mut self, _fragment: &str) -> Result<bool, SessionError> {
        Ok(self.phase == Phase::LoginForm)
    }

    async fn leave_frames(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, SessionError> {
        Ok(self.current_text())
    }

    async fn eval(&mut self, script: &str) -> Result<serde_json::Value, SessionError> {
        if script.contains("cwInfo") && self.phase == Phase::LoggedIn {
            return Ok(serde_json::json!({ "id": 4242, "personId": "PER-1" }));
        }
        Ok(serde_json::Value::Null)
    }

    async fn cookies(&mut self) -> Result<Vec<(String, String)>, SessionError> {
        if self.phase == Phase::LoggedIn {
            Ok(vec![
                ("at_mychayns".to_string(), "tok-123".to_string()),
                ("_ga".to_string(), "tracking".to_string()),
            ])
        } else {
            Ok(Vec::new())
        }
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.log.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Canned query responses keyed by selector, for locator unit tests.
pub(crate) struct StaticPage {
    responses: HashMap<String, Vec<ElementSnapshot>>,
    parent_texts: HashMap<usize, String>,
}

impl StaticPage {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            parent_texts: HashMap::new(),
        }
    }

    pub fn add(&mut self, css: &str, snapshots: Vec<ElementSnapshot>) {
        self.responses.insert(css.to_string(), snapshots);
    }

    pub fn set_parent_text(&mut self, handle: usize, text: &str) {
        self.parent_texts.insert(handle, text.to_string());
    }

    pub fn button(&self, handle: usize, text: &str, x: f64, y: f64) -> ElementSnapshot {
        ElementSnapshot {
            handle,
            tag: "button".to_string(),
            text: text.to_string(),
            visible: true,
            x,
            y,
            attrs: HashMap::new(),
        }
    }

    pub fn input(&self, handle: usize, attrs: &[(&str, &str)], x: f64, y: f64) -> ElementSnapshot {
        ElementSnapshot {
            handle,
            tag: "input".to_string(),
            text: String::new(),
            visible: true,
            x,
            y,
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl BrowserPage for StaticPage {
    async fn goto(&mut self, _url: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn document_ready(&mut self) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<ElementSnapshot>, SessionError> {
        let key = match query {
            Query::Css(s) => s.clone(),
            Query::XPath(s) => s.clone(),
        };
        Ok(self.responses.get(&key).cloned().unwrap_or_default())
    }

    async fn parent_text(&mut self, handle: usize) -> Result<String, SessionError> {
        Ok(self.parent_texts.get(&handle).cloned().unwrap_or_default())
    }

    async fn click(&mut self, _handle: usize) -> Result<(), SessionError> {
        Ok(())
    }

    async fn clear_and_type(&mut self, _handle: usize, _text: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn blur_active(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn enter_frame_by_src(&mut self, _fragment: &str) -> Result<bool, SessionError> {
        Ok(false)
    }

    async fn leave_frames(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn eval(&mut self, _script: &str) -> Result<serde_json::Value, SessionError> {
        Ok(serde_json::Value::Null)
    }

    async fn cookies(&mut self) -> Result<Vec<(String, String)>, SessionError> {
        Ok(Vec::new())
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Mailbox double fed from a queue of listing results.
pub(crate) struct ScriptedMailbox {
    account: MailboxAccount,
    batches: Mutex<VecDeque<Result<Vec<MessageSummary>, MailboxError>>>,
    details: HashMap<String, MessageDetail>,
}

impl ScriptedMailbox {
    pub fn empty() -> Self {
        Self {
            account: MailboxAccount {
                address: "fresh@duckmail.sbs".to_string(),
                password: "mb-secret".to_string(),
                account_id: "acc-1".to_string(),
                token: "mb-token".to_string(),
            },
            batches: Mutex::new(VecDeque::new()),
            details: HashMap::new(),
        }
    }

    pub fn with_verification_mail() -> Self {
        let mut mailbox = Self::empty();
        mailbox
            .batches
            .lock()
            .unwrap()
            .push_back(Ok(vec![summary("v1")]));
        mailbox.details.insert("v1".to_string(), detail_with_link("v1"));
        mailbox
    }

    pub fn with_linkless_then_good_mail() -> Self {
        let mut mailbox = Self::empty();
        {
            let mut batches = mailbox.batches.lock().unwrap();
            batches.push_back(Ok(vec![summary("bad")]));
            batches.push_back(Ok(vec![summary("bad"), summary("good")]));
        }
        mailbox.details.insert("bad".to_string(), detail_plain("bad"));
        mailbox
            .details
            .insert("good".to_string(), detail_with_link("good"));
        mailbox
    }
}

fn summary(id: &str) -> MessageSummary {
    MessageSummary {
        id: id.to_string(),
        subject: "Welcome to chayns".to_string(),
        from: Sender {
            address: "noreply@chayns.de".to_string(),
            name: "chayns".to_string(),
        },
        created_at: None,
        seen: false,
    }
}

fn detail_with_link(id: &str) -> MessageDetail {
    MessageDetail {
        id: id.to_string(),
        subject: "Welcome to chayns".to_string(),
        from: Sender {
            address: "noreply@chayns.de".to_string(),
            name: "chayns".to_string(),
        },
        text: String::new(),
        html: HtmlBody::Many(vec![
            r#"<a href="https://chayns.net/tapp?TappAction=cc&ccUrl=https%3A%2F%2Fchayns.cc%2Flogin1%3Fcode%3DOK">Confirm</a>"#
                .to_string(),
        ]),
    }
}

fn detail_plain(id: &str) -> MessageDetail {
    MessageDetail {
        id: id.to_string(),
        subject: "Welcome to chayns".to_string(),
        from: Sender {
            address: "noreply@chayns.de".to_string(),
            name: "chayns".to_string(),
        },
        text: "Welcome! Nothing to click here.".to_string(),
        html: HtmlBody::default(),
    }
}

#[async_trait]
impl MailboxPort for ScriptedMailbox {
    async fn create_account(&self) -> Result<MailboxAccount, MailboxError> {
        Ok(self.account.clone())
    }

    async fn list_messages(&self, _token: &str) -> Result<Vec<MessageSummary>, MailboxError> {
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_message(&self, _token: &str, id: &str) -> Result<MessageDetail, MailboxError> {
        self.details
            .get(id)
            .cloned()
            .ok_or(MailboxError::MissingField("message"))
    }
}
