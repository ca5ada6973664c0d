use anyhow::Result;
use tracing::info;

use autoreg_core::config::AppConfig;
use autoreg_core::types::LoginRequest;
use autoreg_registration::OrchestratorService;

use crate::commands::print_outcome;

pub async fn run(config: AppConfig, email: String, password: String, json: bool) -> Result<()> {
    info!(email = %email, "verifying login");

    let service = OrchestratorService::new(config)?;
    let outcome = service.login(LoginRequest { email, password }).await;

    print_outcome(outcome, json)
}
