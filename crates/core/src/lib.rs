pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use config::AppConfig;
pub use error::{ErrorResponse, FlowError};
pub use state::{RunContext, RunReport, RunState, StateTransition};
pub use types::*;
