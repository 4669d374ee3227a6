//! Coarse role allow-list gate.

use std::sync::Arc;

use sis_core::error::AppError;
use sis_entity::user::UserRole;

use crate::session::{Authenticator, RequestContext, SessionStatus};

/// Admits a request only when the caller's role is in the allow-list.
///
/// Allowing [`UserRole::Unset`] admits not-yet-activated sessions; this is
/// how a freshly registered account reaches the role-assignment endpoint.
#[derive(Debug, Clone)]
pub struct RoleGate {
    authenticator: Arc<Authenticator>,
    allowed: Vec<UserRole>,
}

impl RoleGate {
    pub fn new(authenticator: Arc<Authenticator>, allowed: impl Into<Vec<UserRole>>) -> Self {
        Self {
            authenticator,
            allowed: allowed.into(),
        }
    }

    pub fn allowed(&self) -> &[UserRole] {
        &self.allowed
    }

    pub async fn check(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let authentication = ctx.resolve(&self.authenticator).await?;

        if authentication.status == SessionStatus::NotActivated {
            return if self.allowed.contains(&UserRole::Unset) {
                Ok(())
            } else {
                Err(AppError::not_activated())
            };
        }

        if self.allowed.contains(&authentication.identity.role) {
            return Ok(());
        }

        let roles: Vec<&str> = self.allowed.iter().map(UserRole::as_str).collect();
        Err(AppError::forbidden(format!(
            "invalid role, only {} can access this resource",
            roles.join(", ")
        )))
    }
}
