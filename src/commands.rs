use anyhow::Result;
use tracing::{debug, error, info, warn};

use autoreg_core::state::RunReport;
use autoreg_registration::RunOutcome;

pub mod login;
pub mod register;

/// Print the outcome of a run and turn failures into a process error once
/// the report has been shown.
pub fn print_outcome(outcome: RunOutcome, json: bool) -> Result<()> {
    for step in &outcome.report.transitions {
        debug!(from = %step.from, to = %step.to, step_ms = step.step_ms, "transition");
    }

    match outcome.result {
        Ok(credentials) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&credentials)?);
            } else {
                println!("Account ready after {} ms:", outcome.report.total_ms);
                println!("  email:     {}", credentials.email);
                println!("  password:  {}", credentials.password);
                println!("  user id:   {}", credentials.user_id);
                println!("  person id: {}", credentials.person_id);
                if let Some(pro) = credentials.pro_access {
                    println!("  pro:       {}", pro);
                }
            }
            Ok(())
        }
        Err(err) => {
            let response = err.to_response();
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                error!(
                    code = response.code,
                    state = response.state.as_deref().unwrap_or("-"),
                    "run failed: {}",
                    response.message
                );
            }
            save_screenshots(&outcome.report);
            Err(anyhow::anyhow!("run failed with status {}", response.code))
        }
    }
}

fn save_screenshots(report: &RunReport) {
    for shot in &report.screenshots {
        let path = format!("failure-{}.png", shot.state.label().to_lowercase());
        match std::fs::write(&path, &shot.png) {
            Ok(()) => info!(path = %path, "saved failure screenshot"),
            Err(err) => warn!(error = %err, "could not save failure screenshot"),
        }
    }
}
