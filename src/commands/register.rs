use anyhow::Result;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use tracing::info;

use autoreg_core::config::AppConfig;
use autoreg_core::types::RegistrationRequest;
use autoreg_registration::OrchestratorService;

use crate::commands::print_outcome;

pub async fn run(
    config: AppConfig,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let first_name = first_name.unwrap_or_else(|| FirstName().fake());
    let last_name = last_name.unwrap_or_else(|| LastName().fake());
    info!(first_name = %first_name, last_name = %last_name, "registering a fresh account");

    let service = OrchestratorService::new(config)?;
    let outcome = service
        .register(RegistrationRequest {
            first_name,
            last_name,
            password,
        })
        .await;

    print_outcome(outcome, json)
}
