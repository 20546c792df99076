use crate::errors::{AppError, AppResult};
use crate::models::{Role, User};
use crate::policy::InputPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolves a login code into a verified email address.
pub trait IdentityProvider {
    fn name(&self) -> &'static str;
    fn resolve_email(&self, code: &str) -> AppResult<String>;
}

/// Treats the login code as the email itself. Meant for local use where the
/// operator already controls who can reach the dashboard.
#[derive(Debug, Clone, Default)]
pub struct TrustedEmailProvider {
    policy: InputPolicy,
}

impl TrustedEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for TrustedEmailProvider {
    fn name(&self) -> &'static str {
        "trusted-email"
    }

    fn resolve_email(&self, code: &str) -> AppResult<String> {
        let email = code.trim().to_ascii_lowercase();
        self.policy
            .validate_email(&email)
            .map_err(|error| AppError::Authentication(error.into_message()))?;
        Ok(email)
    }
}

/// Identity and role of the user behind the current interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub email: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn open(user: User) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            email: user.email,
            role: user.role,
            started_at: Utc::now(),
        }
    }

    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role != role {
            return Err(AppError::Authorization(format!(
                "{} is signed in as {} but this view requires {}",
                self.email,
                self.role.as_str(),
                role.as_str()
            )));
        }
        Ok(())
    }
}
