use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use autoreg_core::config::AppConfig;
use autoreg_core::error::FlowError;
use autoreg_core::state::{RunContext, RunState};
use autoreg_core::types::CredentialResult;
use autoreg_mailbox::{LinkExtractor, MailPoller, MailboxAccount, MailboxPort, VerificationMatcher};

use crate::locator::{LocatorChain, Strategy};
use crate::session::{BrowserPage, Query, SessionError};
use crate::side::SideCalls;

/// Inputs that hint at a name form before keyword matching kicks in.
pub(crate) const NAME_HINT_CSS: &str = "input[name*='name'], input[name*='first'], \
     input[name*='last'], input[placeholder*='name'], input[placeholder*='Name']";

const USER_INFO_SCRIPT: &str =
    "return (typeof window.cwInfo !== 'undefined' && window.cwInfo.user) ? window.cwInfo.user : null;";

/// What a single step decided: move to the next state, or stay and retry
/// after a pause. Fatal conditions surface as `Err(FlowError)`.
pub(crate) enum StepOutcome {
    Advance(RunState),
    Wait(Duration),
}

pub(crate) enum FlowMode {
    Register,
    Login,
}

/// Everything a run accumulates on its way through the states.
#[derive(Default)]
pub(crate) struct RunData {
    pub account: Option<MailboxAccount>,
    pub login_email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirmation_link: Option<String>,
    pub token: Option<String>,
    pub user_id: Option<i64>,
    pub person_id: Option<String>,
    pub result: Option<CredentialResult>,
}

/// Drives one registration (or login) run over a browser page. The engine
/// owns no resources; page, mailbox and side-call clients are borrowed from
/// the service that scheduled the run.
pub struct RegistrationEngine<'a> {
    pub(crate) cfg: &'a AppConfig,
    pub(crate) page: &'a mut dyn BrowserPage,
    pub(crate) mailbox: &'a dyn MailboxPort,
    pub(crate) side: &'a SideCalls,
    pub(crate) data: RunData,
}

impl<'a> RegistrationEngine<'a> {
    pub fn new(
        cfg: &'a AppConfig,
        page: &'a mut dyn BrowserPage,
        mailbox: &'a dyn MailboxPort,
        side: &'a SideCalls,
    ) -> Self {
        Self {
            cfg,
            page,
            mailbox,
            side,
            data: RunData::default(),
        }
    }

    pub async fn run(
        &mut self,
        ctx: &mut RunContext,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<CredentialResult, FlowError> {
        self.data.first_name = first_name.to_string();
        self.data.last_name = last_name.to_string();
        self.data.password = password.to_string();
        self.drive(ctx, FlowMode::Register).await
    }

    pub(crate) async fn drive(
        &mut self,
        ctx: &mut RunContext,
        mode: FlowMode,
    ) -> Result<CredentialResult, FlowError> {
        let mut waits_in_state: u32 = 0;
        loop {
            if let Err(err) = ctx.check_deadline() {
                return Err(self.fail(ctx, err).await);
            }

            let state = ctx.state();
            let outcome = match mode {
                FlowMode::Register => self.step(state, waits_in_state, ctx).await,
                FlowMode::Login => self.login_step(state, waits_in_state, ctx).await,
            };

            match outcome {
                Ok(StepOutcome::Advance(next)) => {
                    ctx.advance(next, None);
                    waits_in_state = 0;
                    // Once the password is set the account exists; the run
                    // is allowed to finish verification past the deadline.
                    if next == RunState::SetPassword {
                        ctx.suppress_timeout();
                    }
                    if next == RunState::Complete {
                        break;
                    }
                }
                Ok(StepOutcome::Wait(delay)) => {
                    waits_in_state += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(self.fail(ctx, err).await),
            }
        }

        match self.data.result.take() {
            Some(result) => Ok(result),
            None => Err(FlowError::unexpected(
                RunState::Complete,
                anyhow::anyhow!("run completed without credentials"),
            )),
        }
    }

    async fn step(
        &mut self,
        state: RunState,
        waits: u32,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        match state {
            RunState::Init => self.create_mailbox(ctx).await,
            RunState::MailboxCreated => self.open_site(ctx).await,
            RunState::SiteOpened => self.click_login_entry(ctx).await,
            RunState::LoginEntry => self.enter_email(ctx).await,
            RunState::EmailEntered => self.detect_branch(ctx, waits).await,
            RunState::BranchDetected => self.fill_register_form(ctx).await,
            RunState::RegisterForm => {
                ctx.log("registration form submitted");
                Ok(StepOutcome::Advance(RunState::WaitingEmail))
            }
            RunState::WaitingEmail => self.wait_for_confirmation(ctx).await,
            RunState::ConfirmationLink => self.open_link_and_set_password(ctx).await,
            RunState::SetPassword => self.verify_login(ctx).await,
            RunState::VerifyLogin => self.finish(ctx).await,
            RunState::Complete | RunState::Failed => Err(FlowError::unexpected(
                state,
                anyhow::anyhow!("step invoked in terminal state"),
            )),
        }
    }

    async fn fail(&mut self, ctx: &mut RunContext, err: FlowError) -> FlowError {
        self.capture_failure(ctx).await;
        warn!(state = %ctx.state(), error = %err, "run failed");
        ctx.advance(RunState::Failed, Some(err.to_string()));
        err
    }

    async fn capture_failure(&mut self, ctx: &mut RunContext) {
        if self.cfg.webdriver.screenshot_on_failure {
            match self.page.screenshot().await {
                Ok(png) => ctx.attach_screenshot(png),
                Err(err) => debug!(error = %err, "failure screenshot unavailable"),
            }
        }
        if let Ok(text) = self.page.page_text().await {
            let snippet: String = text.chars().take(400).collect();
            ctx.log(format!("page text at failure: {snippet}"));
        }
    }

    async fn create_mailbox(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let account = self
            .mailbox
            .create_account()
            .await
            .map_err(|e| FlowError::unexpected(state, e))?;
        ctx.log(format!("mailbox ready: {}", account.address));
        self.data.account = Some(account);
        Ok(StepOutcome::Advance(RunState::MailboxCreated))
    }

    pub(crate) async fn open_site(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let url = self.cfg.target.site_url.clone();
        self.page.goto(&url).await.map_err(sess(state))?;
        self.await_document_ready(state).await?;
        ctx.log(format!("opened {url}"));
        Ok(StepOutcome::Advance(RunState::SiteOpened))
    }

    pub(crate) async fn click_login_entry(
        &mut self,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let wait = Duration::from_secs(self.cfg.timeouts.element_wait_secs);
        let chain = LocatorChain::new()
            .step(
                Strategy::Selector(Query::css(self.cfg.target.login_button_selector.clone())),
                wait,
            )
            .step(
                Strategy::ClickableText {
                    keywords: self.cfg.keywords.login_buttons.clone(),
                    exclude: Vec::new(),
                    exact_only: false,
                },
                wait,
            );

        let button = chain
            .first(&mut *self.page)
            .await
            .map_err(sess(state))?
            .ok_or_else(|| FlowError::assertion(state, "login button not found"))?;
        self.page.click(button.handle).await.map_err(sess(state))?;
        ctx.log("clicked login entry");
        self.settle().await;
        Ok(StepOutcome::Advance(RunState::LoginEntry))
    }

    pub(crate) async fn enter_email(
        &mut self,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();

        let deadline = Instant::now() + Duration::from_secs(self.cfg.timeouts.page_wait_secs);
        loop {
            let entered = self
                .page
                .enter_frame_by_src(&self.cfg.target.login_iframe_hint)
                .await
                .map_err(sess(state))?;
            if entered {
                break;
            }
            if Instant::now() >= deadline {
                return Err(FlowError::assertion(state, "login iframe not found"));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        ctx.log("entered login iframe");

        self.dismiss_other_account(ctx).await;

        let chain = LocatorChain::new().step(
            Strategy::Selector(Query::css(self.cfg.target.email_input_selector.clone())),
            Duration::from_secs(self.cfg.timeouts.element_wait_secs),
        );
        let input = chain
            .first(&mut *self.page)
            .await
            .map_err(sess(state))?
            .ok_or_else(|| FlowError::assertion(state, "email input not found"))?;

        let address = match self.flow_email() {
            Some(address) => address.to_string(),
            None => {
                return Err(FlowError::unexpected(
                    state,
                    anyhow::anyhow!("no email bound to the run"),
                ))
            }
        };
        self.page
            .clear_and_type(input.handle, &address)
            .await
            .map_err(sess(state))?;
        self.page.blur_active().await.map_err(sess(state))?;
        ctx.log(format!("typed email {address}"));

        self.click_continue(state).await?;
        self.settle().await;
        Ok(StepOutcome::Advance(RunState::EmailEntered))
    }

    /// The "signed in as somebody else" prompt only shows up when the
    /// browser profile carries leftovers. Dismissing it is best effort.
    async fn dismiss_other_account(&mut self, ctx: &mut RunContext) -> Option<()> {
        let xpath = self.cfg.target.other_account_xpath.clone()?;
        let chain = LocatorChain::new().step(
            Strategy::Selector(Query::xpath(xpath)),
            Duration::from_secs(5),
        );
        let found = match chain.first(&mut *self.page).await {
            Ok(found) => found,
            Err(err) => {
                debug!(error = %err, "other-account prompt lookup failed");
                return None;
            }
        };
        let prompt = found?;
        if let Err(err) = self.page.click(prompt.handle).await {
            debug!(error = %err, "other-account prompt click failed");
            return None;
        }
        ctx.log("dismissed other-account prompt");
        self.settle().await;
        Some(())
    }

    pub(crate) async fn detect_branch(
        &mut self,
        ctx: &mut RunContext,
        waits: u32,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        if waits >= self.cfg.retries.branch_attempts {
            return Err(FlowError::assertion(state, "could not determine login branch"));
        }

        // Existing account: the UI asks for the password right away.
        if self.password_prompt_visible(state).await? {
            let email = self.flow_email().unwrap_or_default().to_string();
            return Err(FlowError::AlreadyExists { email, state });
        }

        let text = self
            .page
            .page_text()
            .await
            .map_err(sess(state))?
            .to_lowercase();
        if contains_any(&text, &self.cfg.keywords.create_account) {
            ctx.log("create-account prompt detected");
            self.try_click_register(ctx).await;
            return Ok(StepOutcome::Advance(RunState::BranchDetected));
        }

        let hints = Strategy::Selector(Query::css(NAME_HINT_CSS))
            .resolve(&mut *self.page)
            .await
            .map_err(sess(state))?;
        if !hints.is_empty() {
            ctx.log("name inputs already present");
            return Ok(StepOutcome::Advance(RunState::BranchDetected));
        }

        Ok(StepOutcome::Wait(Duration::from_secs(
            self.cfg.retries.branch_delay_secs,
        )))
    }

    pub(crate) async fn password_prompt_visible(
        &mut self,
        state: RunState,
    ) -> Result<bool, FlowError> {
        let found = Strategy::Selector(Query::css("input[type='password']"))
            .resolve(&mut *self.page)
            .await
            .map_err(sess(state))?;
        Ok(!found.is_empty())
    }

    /// Some layouts need an explicit press on the register button before the
    /// name form shows; others render it regardless. Best effort.
    async fn try_click_register(&mut self, ctx: &mut RunContext) -> Option<()> {
        let strategy = Strategy::ClickableText {
            keywords: self.cfg.keywords.register_buttons.clone(),
            exclude: self.cfg.keywords.register_exclude.clone(),
            exact_only: false,
        };
        for attempt in 0..self.cfg.retries.register_click_attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let found = match strategy.resolve(&mut *self.page).await {
                Ok(found) => found,
                Err(err) => {
                    debug!(error = %err, "register button lookup failed");
                    continue;
                }
            };
            let button = match found.first() {
                Some(button) => button.clone(),
                None => continue,
            };
            match self.page.click(button.handle).await {
                Ok(()) => {
                    ctx.log("clicked register button");
                    self.settle().await;
                    return Some(());
                }
                Err(err) => debug!(error = %err, "register button click failed"),
            }
        }
        debug!("register button not clicked; relying on page state");
        None
    }

    async fn fill_register_form(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        self.settle().await;

        let (first, last) = self.find_name_inputs(state).await?;
        let first_name = self.data.first_name.clone();
        let last_name = self.data.last_name.clone();
        self.page
            .clear_and_type(first, &first_name)
            .await
            .map_err(sess(state))?;
        self.page
            .clear_and_type(last, &last_name)
            .await
            .map_err(sess(state))?;
        ctx.log(format!("entered name {first_name} {last_name}"));

        self.click_continue(state).await?;
        self.settle().await;
        Ok(StepOutcome::Advance(RunState::RegisterForm))
    }

    async fn find_name_inputs(&mut self, state: RunState) -> Result<(usize, usize), FlowError> {
        let first_strategy = Strategy::AttributeKeyword {
            keywords: self.cfg.keywords.first_name.clone(),
            include_parent_text: true,
        };
        let last_strategy = Strategy::AttributeKeyword {
            keywords: self.cfg.keywords.last_name.clone(),
            include_parent_text: true,
        };
        let fallback = Strategy::VisibleTextInputs { limit: 2 };

        for attempt in 0..self.cfg.retries.name_input_attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(self.cfg.retries.name_input_delay_secs))
                    .await;
            }

            let first = first_strategy.resolve(&mut *self.page).await.map_err(sess(state))?;
            let last = last_strategy.resolve(&mut *self.page).await.map_err(sess(state))?;
            if let Some(f) = first.first() {
                let first_pos = (f.x as i64, f.y as i64);
                let distinct = last
                    .iter()
                    .find(|l| (l.x as i64, l.y as i64) != first_pos);
                if let Some(l) = distinct {
                    return Ok((f.handle, l.handle));
                }
            }

            // Anonymous two-field form: first input is the first name.
            let anonymous = fallback.resolve(&mut *self.page).await.map_err(sess(state))?;
            if anonymous.len() >= 2 {
                return Ok((anonymous[0].handle, anonymous[1].handle));
            }
        }
        Err(FlowError::assertion(state, "first/last name inputs not found"))
    }

    async fn wait_for_confirmation(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let account = match &self.data.account {
            Some(account) => account.clone(),
            None => {
                return Err(FlowError::unexpected(
                    state,
                    anyhow::anyhow!("no mailbox bound to the run"),
                ))
            }
        };

        let matcher = VerificationMatcher::new(
            &self.cfg.verification.senders,
            &self.cfg.verification.subject_patterns,
        )
        .map_err(|e| FlowError::unexpected(state, e))?;
        let extractor = LinkExtractor::new();
        let interval = Duration::from_secs(self.cfg.mailbox.poll_interval_secs);
        let poller = MailPoller::new(interval);
        let budget = interval * self.cfg.mailbox.poll_max_attempts;
        let deadline = Instant::now() + budget;
        let timeout_detail = format!("no verification email within {}s", budget.as_secs());

        // Messages that matched but carried no usable link.
        let mut rejected: HashSet<String> = HashSet::new();
        let mut first_attempt = true;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && !first_attempt {
                return Err(FlowError::timeout(state, timeout_detail));
            }
            first_attempt = false;

            let found = poller
                .poll(self.mailbox, &account.token, remaining, |m| {
                    !rejected.contains(&m.id) && matcher.matches(m)
                })
                .await;
            let message = match found {
                Some(message) => message,
                None => return Err(FlowError::timeout(state, timeout_detail)),
            };
            ctx.log(format!(
                "verification mail {} from {}",
                message.id, message.from.address
            ));

            let detail = match self.mailbox.fetch_message(&account.token, &message.id).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(error = %err, id = %message.id, "fetching message failed");
                    rejected.insert(message.id);
                    continue;
                }
            };
            match extractor.extract(&detail) {
                Some(link) => {
                    ctx.log(format!("confirmation link: {link}"));
                    self.data.confirmation_link = Some(link);
                    return Ok(StepOutcome::Advance(RunState::ConfirmationLink));
                }
                None => {
                    warn!(id = %message.id, "no usable link in message");
                    rejected.insert(message.id);
                }
            }
        }
    }

    async fn open_link_and_set_password(
        &mut self,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let link = match self.data.confirmation_link.clone() {
            Some(link) => link,
            None => {
                return Err(FlowError::unexpected(
                    state,
                    anyhow::anyhow!("no confirmation link bound to the run"),
                ))
            }
        };

        self.page.leave_frames().await.map_err(sess(state))?;
        self.page.goto(&link).await.map_err(sess(state))?;
        self.await_document_ready(state).await?;
        self.settle().await;

        // The password form may render inside the login iframe again.
        match self
            .page
            .enter_frame_by_src(&self.cfg.target.login_iframe_hint)
            .await
        {
            Ok(true) => ctx.log("password form inside login iframe"),
            Ok(false) => {}
            Err(err) => debug!(error = %err, "iframe probe failed"),
        }

        let inputs = self.password_inputs(state).await?;
        let password = self.data.password.clone();
        self.page
            .clear_and_type(inputs[0], &password)
            .await
            .map_err(sess(state))?;
        if let Some(second) = inputs.get(1).copied() {
            self.page
                .clear_and_type(second, &password)
                .await
                .map_err(sess(state))?;
        }
        ctx.log("password entered");

        self.click_set_password(state).await?;
        self.settle().await;
        Ok(StepOutcome::Advance(RunState::SetPassword))
    }

    async fn password_inputs(&mut self, state: RunState) -> Result<Vec<usize>, FlowError> {
        let chain = LocatorChain::new()
            .step(
                Strategy::Selector(Query::css("input[type='password']")),
                Duration::ZERO,
            )
            .step(
                Strategy::Selector(Query::css("input[autocomplete='new-password']")),
                Duration::ZERO,
            )
            .step(
                Strategy::AttributeKeyword {
                    keywords: self.cfg.keywords.password_fields.clone(),
                    include_parent_text: false,
                },
                Duration::ZERO,
            );

        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            let found = chain.collect(&mut *self.page).await.map_err(sess(state))?;
            if !found.is_empty() {
                return Ok(found.into_iter().map(|s| s.handle).collect());
            }
        }
        Err(FlowError::assertion(state, "no password inputs found"))
    }

    async fn click_set_password(&mut self, state: RunState) -> Result<(), FlowError> {
        let chain = LocatorChain::new().step(
            Strategy::ClickableText {
                keywords: self.cfg.keywords.set_password_buttons.clone(),
                exclude: Vec::new(),
                exact_only: false,
            },
            Duration::from_secs(3),
        );
        if let Some(button) = chain.first(&mut *self.page).await.map_err(sess(state))? {
            self.page.click(button.handle).await.map_err(sess(state))?;
            return Ok(());
        }
        self.click_continue(state).await
    }

    pub(crate) async fn verify_login(
        &mut self,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        self.page.leave_frames().await.map_err(sess(state))?;

        let token = self.await_login_cookie(state).await?;
        ctx.log("login cookie present");

        let user = self.await_user_info(state).await?;
        let user_id = match user.get("id") {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        let user_id = match user_id {
            Some(id) => id,
            None => return Err(FlowError::assertion(state, "user info lacks a numeric id")),
        };
        let person_id = match user.get("personId") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(FlowError::assertion(state, "user info lacks a person id")),
        };
        ctx.log(format!("verified user {user_id} ({person_id})"));

        self.data.token = Some(token);
        self.data.user_id = Some(user_id);
        self.data.person_id = Some(person_id);
        Ok(StepOutcome::Advance(RunState::VerifyLogin))
    }

    async fn await_login_cookie(&mut self, state: RunState) -> Result<String, FlowError> {
        let deadline = Instant::now() + Duration::from_secs(self.cfg.timeouts.cookie_wait_secs);
        loop {
            let cookies = self.page.cookies().await.map_err(sess(state))?;
            let hit = cookies.into_iter().find(|(name, _)| name.starts_with("at_"));
            if let Some((name, value)) = hit {
                debug!(cookie = %name, "login cookie found");
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(FlowError::assertion(state, "login cookie (at_) never appeared"));
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn await_user_info(&mut self, state: RunState) -> Result<serde_json::Value, FlowError> {
        for attempt in 0..2 {
            if attempt > 0 {
                self.page.refresh().await.map_err(sess(state))?;
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            let deadline = Instant::now() + Duration::from_secs(self.cfg.timeouts.page_wait_secs);
            loop {
                let value = self.page.eval(USER_INFO_SCRIPT).await.map_err(sess(state))?;
                if value.is_object() {
                    return Ok(value);
                }
                if Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            debug!("user info not ready; reloading");
        }
        Err(FlowError::assertion(state, "user info object never appeared"))
    }

    async fn finish(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let (email, token, user_id, person_id) = self.assemble_identity(state)?;

        self.side.notify_registration(&token).await;
        let pro_access = self.side.pro_access(&person_id, &token).await;

        let result = CredentialResult {
            email,
            password: self.data.password.clone(),
            user_id,
            person_id,
            token,
            pro_access,
        };
        info!(email = %result.email, user_id = result.user_id, "registration complete");
        ctx.log("credentials assembled");
        self.data.result = Some(result);
        Ok(StepOutcome::Advance(RunState::Complete))
    }

    pub(crate) fn assemble_identity(
        &self,
        state: RunState,
    ) -> Result<(String, String, i64, String), FlowError> {
        let email = match self.flow_email() {
            Some(email) => email.to_string(),
            None => {
                return Err(FlowError::unexpected(
                    state,
                    anyhow::anyhow!("no email bound to the run"),
                ))
            }
        };
        match (
            self.data.token.clone(),
            self.data.user_id,
            self.data.person_id.clone(),
        ) {
            (Some(token), Some(user_id), Some(person_id)) => {
                Ok((email, token, user_id, person_id))
            }
            _ => Err(FlowError::unexpected(
                state,
                anyhow::anyhow!("verification left the identity incomplete"),
            )),
        }
    }

    pub(crate) async fn click_continue(&mut self, state: RunState) -> Result<(), FlowError> {
        let chain = LocatorChain::new()
            .step(Strategy::SubmitControl, Duration::from_secs(2))
            .step(
                Strategy::ClickableText {
                    keywords: self.cfg.keywords.continue_buttons.clone(),
                    exclude: Vec::new(),
                    exact_only: false,
                },
                Duration::from_secs(self.cfg.timeouts.element_wait_secs),
            );
        let button = chain
            .first(&mut *self.page)
            .await
            .map_err(sess(state))?
            .ok_or_else(|| FlowError::assertion(state, "continue control not found"))?;
        self.page.click(button.handle).await.map_err(sess(state))?;
        Ok(())
    }

    async fn await_document_ready(&mut self, state: RunState) -> Result<(), FlowError> {
        let deadline = Instant::now() + Duration::from_secs(self.cfg.timeouts.page_wait_secs);
        loop {
            let ready = self.page.document_ready().await.map_err(sess(state))?;
            if ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FlowError::timeout(state, "page never finished loading"));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    pub(crate) fn flow_email(&self) -> Option<&str> {
        if let Some(account) = &self.data.account {
            return Some(account.address.as_str());
        }
        self.data.login_email.as_deref()
    }

    pub(crate) async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(self.cfg.timeouts.settle_secs)).await;
    }
}

pub(crate) fn sess(state: RunState) -> impl Fn(SessionError) -> FlowError {
    move |err| FlowError::unexpected(state, err)
}

pub(crate) fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}
