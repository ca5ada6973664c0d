use std::time::Duration;

use tracing::info;

use autoreg_core::error::FlowError;
use autoreg_core::state::{RunContext, RunState};
use autoreg_core::types::CredentialResult;

use crate::engine::{contains_any, sess, FlowMode, RegistrationEngine, StepOutcome};
use crate::locator::Strategy;
use crate::session::Query;

/// Login against an existing account walks the same site states as a
/// registration but branches into the password prompt instead of the
/// register form. No mailbox is involved.
impl<'a> RegistrationEngine<'a> {
    pub async fn run_login(
        &mut self,
        ctx: &mut RunContext,
        email: &str,
        password: &str,
    ) -> Result<CredentialResult, FlowError> {
        self.data.login_email = Some(email.to_string());
        self.data.password = password.to_string();
        self.drive(ctx, FlowMode::Login).await
    }

    pub(crate) async fn login_step(
        &mut self,
        state: RunState,
        waits: u32,
        ctx: &mut RunContext,
    ) -> Result<StepOutcome, FlowError> {
        match state {
            RunState::Init => self.open_site(ctx).await,
            RunState::SiteOpened => self.click_login_entry(ctx).await,
            RunState::LoginEntry => self.enter_email(ctx).await,
            RunState::EmailEntered => self.enter_password_branch(ctx, waits).await,
            RunState::SetPassword => self.verify_login(ctx).await,
            RunState::VerifyLogin => self.finish_login(ctx).await,
            other => Err(FlowError::unexpected(
                other,
                anyhow::anyhow!("login flow has no step for this state"),
            )),
        }
    }

    async fn enter_password_branch(
        &mut self,
        ctx: &mut RunContext,
        waits: u32,
    ) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        if waits >= self.cfg.retries.branch_attempts {
            return Err(FlowError::assertion(state, "password prompt never appeared"));
        }

        let found = Strategy::Selector(Query::css("input[type='password']"))
            .resolve(&mut *self.page)
            .await
            .map_err(sess(state))?;
        if let Some(input) = found.first() {
            let password = self.data.password.clone();
            self.page
                .clear_and_type(input.handle, &password)
                .await
                .map_err(sess(state))?;
            ctx.log("password entered");
            self.click_continue(state).await?;
            self.settle().await;
            return Ok(StepOutcome::Advance(RunState::SetPassword));
        }

        // A create-account prompt here means the address is unknown.
        let text = self
            .page
            .page_text()
            .await
            .map_err(sess(state))?
            .to_lowercase();
        if contains_any(&text, &self.cfg.keywords.create_account) {
            let email = self.flow_email().unwrap_or_default().to_string();
            return Err(FlowError::assertion(
                state,
                format!("no existing account for {email}"),
            ));
        }

        Ok(StepOutcome::Wait(Duration::from_secs(
            self.cfg.retries.branch_delay_secs,
        )))
    }

    async fn finish_login(&mut self, ctx: &mut RunContext) -> Result<StepOutcome, FlowError> {
        let state = ctx.state();
        let (email, token, user_id, person_id) = self.assemble_identity(state)?;

        let result = CredentialResult {
            email,
            password: self.data.password.clone(),
            user_id,
            person_id,
            token,
            pro_access: None,
        };
        info!(email = %result.email, user_id = result.user_id, "login verified");
        ctx.log("credentials assembled");
        self.data.result = Some(result);
        Ok(StepOutcome::Advance(RunState::Complete))
    }
}
