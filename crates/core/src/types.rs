use serde::{Deserialize, Serialize};

/// Input for a registration run. The mailbox address is generated, never
/// supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    /// Account password to set. Defaults to the configured password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Input for a login run against an existing account.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Credentials and platform identity produced by a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialResult {
    pub email: String,
    pub password: String,
    pub user_id: i64,
    pub person_id: String,
    pub token: String,
    /// Best-effort lookup; `None` when the side call failed or was skipped.
    pub pro_access: Option<bool>,
}
