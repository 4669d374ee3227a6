//! Per-request state shared by the gates.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar};

use sis_core::error::AppError;
use sis_entity::admin::AdminWithGrants;

use super::authenticator::{Authentication, Authenticator};

/// Request cookies plus whatever the gates have resolved so far.
///
/// The first gate to run authenticates; later gates reuse the result, so a
/// request costs at most one revocation lookup.
#[derive(Debug, Default)]
pub struct RequestContext {
    jar: CookieJar,
    authentication: Option<Authentication>,
    admin: Option<Arc<AdminWithGrants>>,
}

impl RequestContext {
    pub fn new(jar: CookieJar) -> Self {
        Self {
            jar,
            authentication: None,
            admin: None,
        }
    }

    /// Context whose identity was already resolved upstream.
    pub fn authenticated(jar: CookieJar, authentication: Authentication) -> Self {
        Self {
            jar,
            authentication: Some(authentication),
            admin: None,
        }
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Authenticate on first use and cache the outcome.
    pub async fn resolve(&mut self, authenticator: &Authenticator) -> Result<&Authentication, AppError> {
        if self.authentication.is_none() {
            let authentication = authenticator.authenticate(&self.jar).await?;
            self.authentication = Some(authentication);
        }
        self.authentication
            .as_ref()
            .ok_or_else(|| AppError::internal("request authentication missing after resolve"))
    }

    /// Administrator record loaded by the permission gate.
    pub fn admin(&self) -> Option<&Arc<AdminWithGrants>> {
        self.admin.as_ref()
    }

    pub(crate) fn attach_admin(&mut self, admin: Arc<AdminWithGrants>) {
        self.admin = Some(admin);
    }

    /// Cookies the response must set.
    pub fn outgoing_cookies(&self) -> &[Cookie<'static>] {
        self.authentication
            .as_ref()
            .map(|a| a.cookies.as_slice())
            .unwrap_or_default()
    }

    /// Apply the outgoing cookies to a response jar.
    pub fn apply_cookies(&self, mut jar: CookieJar) -> CookieJar {
        for cookie in self.outgoing_cookies() {
            jar = jar.add(cookie.clone());
        }
        jar
    }
}
