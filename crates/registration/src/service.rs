use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use autoreg_core::config::AppConfig;
use autoreg_core::error::FlowError;
use autoreg_core::state::{RunContext, RunReport, RunState};
use autoreg_core::types::{CredentialResult, LoginRequest, RegistrationRequest};
use autoreg_mailbox::{MailboxClient, MailboxPort};

use crate::engine::RegistrationEngine;
use crate::session::{BrowserPage, SessionError};
use crate::side::SideCalls;
use crate::webdriver;

/// Result of one orchestrated run: the credentials when the flow reached
/// COMPLETE, plus the transition report either way.
pub struct RunOutcome {
    pub result: Result<CredentialResult, FlowError>,
    pub report: RunReport,
}

pub(crate) enum RunPlan {
    Register {
        first_name: String,
        last_name: String,
        password: String,
    },
    Login {
        email: String,
        password: String,
    },
}

/// Owns the shared mailbox and side-call clients plus the single run permit.
/// A browser session is created per run and torn down when the run ends,
/// whether it succeeded or not.
pub struct OrchestratorService {
    cfg: Arc<AppConfig>,
    permit: Arc<Semaphore>,
    mailbox: Arc<dyn MailboxPort>,
    side: Arc<SideCalls>,
}

impl OrchestratorService {
    pub fn new(cfg: AppConfig) -> anyhow::Result<Self> {
        let mailbox = MailboxClient::new(
            &cfg.mailbox.base_url,
            &cfg.mailbox.domain,
            Duration::from_secs(cfg.mailbox.http_timeout_secs),
        )?;
        let side = SideCalls::new(cfg.side_calls.clone())?;
        Ok(Self {
            cfg: Arc::new(cfg),
            permit: Arc::new(Semaphore::new(1)),
            mailbox: Arc::new(mailbox),
            side: Arc::new(side),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_parts(cfg: AppConfig, mailbox: Arc<dyn MailboxPort>) -> Self {
        let side = SideCalls::new(cfg.side_calls.clone()).unwrap();
        Self {
            cfg: Arc::new(cfg),
            permit: Arc::new(Semaphore::new(1)),
            mailbox,
            side: Arc::new(side),
        }
    }

    pub async fn register(&self, request: RegistrationRequest) -> RunOutcome {
        let plan = match self.registration_plan(request) {
            Ok(plan) => plan,
            Err(err) => return rejected(err),
        };
        let webdriver_cfg = self.cfg.webdriver.clone();
        self.execute(plan, move || async move {
            let page = webdriver::connect(&webdriver_cfg).await?;
            Ok(Box::new(page) as Box<dyn BrowserPage>)
        })
        .await
    }

    pub async fn login(&self, request: LoginRequest) -> RunOutcome {
        let plan = match login_plan(request) {
            Ok(plan) => plan,
            Err(err) => return rejected(err),
        };
        let webdriver_cfg = self.cfg.webdriver.clone();
        self.execute(plan, move || async move {
            let page = webdriver::connect(&webdriver_cfg).await?;
            Ok(Box::new(page) as Box<dyn BrowserPage>)
        })
        .await
    }

    fn registration_plan(&self, request: RegistrationRequest) -> Result<RunPlan, FlowError> {
        check_name(&request.first_name, "first name")?;
        check_name(&request.last_name, "last name")?;
        if let Some(password) = &request.password {
            if password.len() < 8 || password.len() > 100 {
                return Err(FlowError::InvalidRequest(
                    "password must be between 8 and 100 characters".to_string(),
                ));
            }
        }
        let password = request
            .password
            .unwrap_or_else(|| self.cfg.target.default_password.clone());
        Ok(RunPlan::Register {
            first_name: request.first_name,
            last_name: request.last_name,
            password,
        })
    }

    pub(crate) async fn execute<F, Fut>(&self, plan: RunPlan, connect: F) -> RunOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Box<dyn BrowserPage>, SessionError>>,
    {
        let _permit = match self.permit.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("run rejected while another is in progress");
                return rejected(FlowError::Busy);
            }
        };

        match &plan {
            RunPlan::Register {
                first_name,
                last_name,
                ..
            } => info!(first_name = %first_name, last_name = %last_name, "starting registration run"),
            RunPlan::Login { email, .. } => info!(email = %email, "starting login run"),
        }

        let mut ctx = RunContext::new(Duration::from_secs(self.cfg.timeouts.global_secs));

        let mut page = match connect().await {
            Ok(page) => page,
            Err(err) => {
                let flow = FlowError::unexpected(ctx.state(), err);
                ctx.advance(RunState::Failed, Some(flow.to_string()));
                return RunOutcome {
                    result: Err(flow),
                    report: ctx.report(),
                };
            }
        };

        let result = {
            let mut engine = RegistrationEngine::new(
                self.cfg.as_ref(),
                page.as_mut(),
                self.mailbox.as_ref(),
                self.side.as_ref(),
            );
            match plan {
                RunPlan::Register {
                    first_name,
                    last_name,
                    password,
                } => {
                    engine
                        .run(&mut ctx, &first_name, &last_name, &password)
                        .await
                }
                RunPlan::Login { email, password } => {
                    engine.run_login(&mut ctx, &email, &password).await
                }
            }
        };

        if let Err(err) = page.close().await {
            warn!(error = %err, "browser teardown failed");
        }

        RunOutcome {
            result,
            report: ctx.report(),
        }
    }
}

fn login_plan(request: LoginRequest) -> Result<RunPlan, FlowError> {
    if !request.email.contains('@') {
        return Err(FlowError::InvalidRequest(
            "email must be a valid address".to_string(),
        ));
    }
    if request.password.is_empty() || request.password.len() > 100 {
        return Err(FlowError::InvalidRequest(
            "password must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(RunPlan::Login {
        email: request.email,
        password: request.password,
    })
}

fn check_name(value: &str, field: &str) -> Result<(), FlowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 50 {
        return Err(FlowError::InvalidRequest(format!(
            "{field} must be between 1 and 50 characters"
        )));
    }
    Ok(())
}

fn rejected(err: FlowError) -> RunOutcome {
    RunOutcome {
        result: Err(err),
        report: RunContext::new(Duration::ZERO).report(),
    }
}
