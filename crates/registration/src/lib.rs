// Browser-driven registration and login flows against the third-party
// login UI, plus the single-run service wrapper around them.

pub mod engine;
pub mod locator;
pub mod login;
pub mod service;
pub mod session;
pub mod side;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod testkit;

// Re-exports for convenience
pub use engine::RegistrationEngine;
pub use service::{OrchestratorService, RunOutcome};
pub use session::{BrowserPage, ElementSnapshot, Query, SessionError};
pub use side::SideCalls;
