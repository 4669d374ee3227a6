//! Shared auth state handed to whatever transport fronts the core.

use std::sync::Arc;

use tracing::info;

use sis_core::config::AppConfig;
use sis_core::error::AppError;
use sis_database::{AccountStore, PermissionStore, RevocationStore};
use sis_entity::permission::{PermissionAction, PermissionResource};
use sis_entity::user::UserRole;

use crate::assignment::RoleAssigner;
use crate::cookie::CookieFactory;
use crate::jwt::TokenCodec;
use crate::rbac::{PermissionGate, RoleGate};
use crate::registry::{PermissionRegistry, seed};
use crate::session::{Authenticator, SessionManager};

/// Every auth component, built once at process start.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
    pub cookies: Arc<CookieFactory>,
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<PermissionRegistry>,
    pub assigner: Arc<RoleAssigner>,
    permissions: Arc<dyn PermissionStore>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("codec", &self.codec)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Plant the seed permissions, then wire the components over the stores.
    pub async fn build(
        config: &AppConfig,
        accounts: Arc<dyn AccountStore>,
        permissions: Arc<dyn PermissionStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Result<Self, AppError> {
        let seeds = seed::plant(permissions.as_ref()).await?;

        let codec = Arc::new(TokenCodec::new(&config.auth));
        let cookies = Arc::new(CookieFactory::new(config.cookie.clone()));
        let authenticator = Arc::new(Authenticator::new(
            Arc::clone(&codec),
            Arc::clone(&cookies),
            Arc::clone(&revocations),
        ));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&accounts),
            revocations,
            Arc::clone(&codec),
            Arc::clone(&cookies),
            config.auth.clone(),
            seeds.clone(),
        ));
        let registry = Arc::new(PermissionRegistry::new(
            Arc::clone(&permissions),
            Arc::clone(&accounts),
            seeds,
        ));
        let assigner = Arc::new(RoleAssigner::new(accounts));

        info!(seeds = registry.seeds().len(), "Auth state initialized");
        Ok(Self {
            codec,
            cookies,
            authenticator,
            sessions,
            registry,
            assigner,
            permissions,
        })
    }

    /// A gate admitting only `roles`.
    pub fn role_gate(&self, roles: impl Into<Vec<UserRole>>) -> RoleGate {
        RoleGate::new(Arc::clone(&self.authenticator), roles)
    }

    /// A gate requiring every action in `required` on `resource`.
    pub fn permission_gate(
        &self,
        resource: PermissionResource,
        required: impl IntoIterator<Item = PermissionAction>,
    ) -> PermissionGate {
        PermissionGate::new(
            Arc::clone(&self.authenticator),
            Arc::clone(&self.permissions),
            resource,
            required,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::codec::tests::test_config;
    use crate::payload::SignUpPayload;
    use crate::session::RequestContext;
    use axum_extra::extract::cookie::CookieJar;
    use sis_core::ErrorKind;
    use sis_core::config::{CookieConfig, DatabaseConfig, LoggingConfig, WorkerConfig};
    use sis_database::MemoryStore;
    use sis_entity::user::Gender;

    fn app_config() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                url: "postgres://localhost/sis".into(),
                max_connections: 1,
                min_connections: 0,
                acquire_timeout_seconds: 1,
                idle_timeout_seconds: 1,
                run_migrations: false,
            },
            auth: test_config(),
            cookie: CookieConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_build_plants_seeds_once() {
        let store = MemoryStore::new();
        let config = app_config();
        let first = AuthState::build(
            &config,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
        .await
        .unwrap();
        let second = AuthState::build(
            &config,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        )
        .await
        .unwrap();

        assert!(!first.registry.seeds().is_empty());
        assert_eq!(first.registry.seeds().ids(), second.registry.seeds().ids());
    }

    #[tokio::test]
    async fn test_gates_share_the_session_protocol() {
        let store = MemoryStore::new();
        let state = AuthState::build(
            &app_config(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        )
        .await
        .unwrap();

        let signed = state
            .sessions
            .sign_up(SignUpPayload {
                full_name: "Ada Lovelace".into(),
                email: "ada@school.test".into(),
                password: "correct-horse".into(),
                gender: Gender::Female,
                phone: "081100000001".into(),
                remember_me: false,
            })
            .await
            .unwrap();

        let mut jar = CookieJar::new();
        for cookie in signed.cookies {
            jar = jar.add(cookie);
        }

        let mut ctx = RequestContext::new(jar.clone());
        state.role_gate([UserRole::Unset]).check(&mut ctx).await.unwrap();

        let mut ctx = RequestContext::new(jar);
        let err = state
            .permission_gate(PermissionResource::Class, [PermissionAction::Update])
            .check(&mut ctx)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotActivated));
    }
}
