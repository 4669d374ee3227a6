//! Fine-grained gate over administrator grants.

use std::sync::Arc;

use tracing::debug;

use sis_core::error::AppError;
use sis_database::PermissionStore;
use sis_entity::permission::{ActionSet, PermissionAction, PermissionResource};
use sis_entity::user::UserRole;

use crate::session::{Authenticator, RequestContext, SessionStatus};

/// Requires the caller to hold every `required` action on `resource`,
/// summed over all of their grants for that resource.
///
/// Roles listed in `bypass` pass without any grant lookup. Everyone else must
/// be an administrator; the loaded administrator record is attached to the
/// request context for the handler.
#[derive(Clone)]
pub struct PermissionGate {
    authenticator: Arc<Authenticator>,
    permissions: Arc<dyn PermissionStore>,
    resource: PermissionResource,
    required: ActionSet,
    bypass: Vec<UserRole>,
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("resource", &self.resource)
            .field("required", &self.required)
            .field("bypass", &self.bypass)
            .finish_non_exhaustive()
    }
}

impl PermissionGate {
    pub fn new(
        authenticator: Arc<Authenticator>,
        permissions: Arc<dyn PermissionStore>,
        resource: PermissionResource,
        required: impl IntoIterator<Item = PermissionAction>,
    ) -> Self {
        Self {
            authenticator,
            permissions,
            resource,
            required: required.into_iter().collect(),
            bypass: Vec::new(),
        }
    }

    /// Let these roles through without a grant check.
    pub fn with_bypass(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.bypass.extend(roles);
        self
    }

    pub async fn check(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let authentication = ctx.resolve(&self.authenticator).await?;
        if authentication.status == SessionStatus::NotActivated {
            return Err(AppError::not_activated());
        }

        let identity = authentication.identity;
        if self.bypass.contains(&identity.role) {
            return Ok(());
        }
        if !identity.role.is_admin() {
            return Err(AppError::forbidden(
                "invalid role, only admin can access this resource",
            ));
        }

        let cached = ctx
            .admin()
            .filter(|admin| admin.user_id() == identity.user_id)
            .cloned();
        let admin = match cached {
            Some(admin) => admin,
            None => {
                let loaded = self
                    .permissions
                    .find_admin_with_grants(identity.user_id)
                    .await?
                    .ok_or_else(|| AppError::forbidden("admin profile not found"))?;
                let loaded = Arc::new(loaded);
                ctx.attach_admin(loaded.clone());
                loaded
            }
        };

        // An admin with no grant on the resource is denied even when no
        // specific action is required.
        let granted = admin.actions_for(self.resource);
        let missing = granted.missing(&self.required);
        if !granted.is_empty() && missing.is_empty() {
            return Ok(());
        }

        debug!(
            user_id = %identity.user_id,
            resource = %self.resource,
            missing = missing.len(),
            "Permission gate denied request"
        );
        if missing.is_empty() {
            return Err(AppError::forbidden(format!(
                "no permission granted on {}",
                self.resource
            )));
        }
        let names: Vec<String> = missing
            .iter()
            .map(|action| format!("{}.{}", self.resource, action))
            .collect();
        Err(AppError::forbidden(format!(
            "missing permission(s): {}",
            names.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookieFactory;
    use crate::jwt::codec::tests::test_config;
    use crate::jwt::{TokenCodec, TokenKind};
    use axum_extra::extract::cookie::{Cookie, CookieJar};
    use chrono::Utc;
    use sis_core::ErrorKind;
    use sis_core::config::CookieConfig;
    use sis_database::{AccountStore, MemoryStore, PermissionUnitOfWork};
    use sis_entity::permission::NewPermission;
    use sis_entity::profile::AdminEnrollment;
    use sis_entity::user::{Gender, NewAccount};
    use uuid::Uuid;

    struct Fixture {
        store: MemoryStore,
        codec: TokenCodec,
        authenticator: Arc<Authenticator>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let authenticator = Authenticator::new(
            Arc::new(TokenCodec::new(&test_config())),
            Arc::new(CookieFactory::new(CookieConfig::default())),
            Arc::new(store.clone()),
        );
        Fixture {
            store,
            codec: TokenCodec::new(&test_config()),
            authenticator: Arc::new(authenticator),
        }
    }

    impl Fixture {
        fn gate(&self, resource: PermissionResource, actions: &[PermissionAction]) -> PermissionGate {
            PermissionGate::new(
                self.authenticator.clone(),
                Arc::new(self.store.clone()),
                resource,
                actions.iter().copied(),
            )
        }

        fn ctx(&self, user_id: Uuid, role: UserRole) -> RequestContext {
            let access = self.codec.issue(user_id, role, false, TokenKind::Access).unwrap();
            RequestContext::new(CookieJar::new().add(Cookie::new("access_token", access.token)))
        }

        /// Admin holding one permission on `resource` with `actions`.
        async fn admin_with(&self, resource: PermissionResource, actions: &[PermissionAction]) -> Uuid {
            let user = self
                .store
                .create(NewAccount {
                    full_name: "Grace Hopper".into(),
                    email: format!("{}@school.test", Uuid::new_v4()),
                    password_hash: "hash".into(),
                    gender: Gender::Female,
                    phone: format!("+1555{}", Uuid::new_v4().as_u128() % 10_000_000),
                })
                .await
                .unwrap();

            let mut tx = self.store.begin().await.unwrap();
            let permission = tx
                .insert(&NewPermission {
                    name: format!("{resource} limited {}", Uuid::new_v4()),
                    resource,
                    description: "limited permission".into(),
                    actions: actions.iter().copied().collect(),
                    author_id: None,
                })
                .await
                .unwrap();
            tx.commit().await.unwrap();

            self.store
                .promote_to_admin(
                    user.id,
                    &AdminEnrollment {
                        staff_role: "operator".into(),
                        employee_id: format!("EMP-{}", Uuid::new_v4()),
                        joined_at: Utc::now(),
                    },
                    &[permission.id],
                )
                .await
                .unwrap();
            user.id
        }
    }

    #[tokio::test]
    async fn test_read_grant_admits_read_only() {
        let f = fixture();
        let admin = f
            .admin_with(PermissionResource::Class, &[PermissionAction::Read])
            .await;

        let read = f.gate(PermissionResource::Class, &[PermissionAction::Read]);
        let mut ctx = f.ctx(admin, UserRole::Admin);
        read.check(&mut ctx).await.unwrap();
        assert_eq!(ctx.admin().unwrap().user_id(), admin);

        let read_update = f.gate(
            PermissionResource::Class,
            &[PermissionAction::Read, PermissionAction::Update],
        );
        let err = read_update
            .check(&mut f.ctx(admin, UserRole::Admin))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Forbidden));
        assert_eq!(err.message, "missing permission(s): class.update");
    }

    #[tokio::test]
    async fn test_grants_for_other_resources_do_not_count() {
        let f = fixture();
        let admin = f
            .admin_with(PermissionResource::Subject, &PermissionAction::ALL)
            .await;
        let gate = f.gate(PermissionResource::Class, &[PermissionAction::Read]);
        let err = gate.check(&mut f.ctx(admin, UserRole::Admin)).await.unwrap_err();
        assert_eq!(err.message, "missing permission(s): class.read");
    }

    #[tokio::test]
    async fn test_empty_requirement_still_needs_a_grant_on_the_resource() {
        let f = fixture();
        let admin = f
            .admin_with(PermissionResource::Subject, &[PermissionAction::Read])
            .await;

        let any_class = f.gate(PermissionResource::Class, &[]);
        let err = any_class
            .check(&mut f.ctx(admin, UserRole::Admin))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Forbidden));
        assert_eq!(err.message, "no permission granted on class");

        let any_subject = f.gate(PermissionResource::Subject, &[]);
        any_subject.check(&mut f.ctx(admin, UserRole::Admin)).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_without_grants_is_denied() {
        let f = fixture();
        let user = f
            .store
            .create(NewAccount {
                full_name: "Ada Lovelace".into(),
                email: "ada@school.test".into(),
                password_hash: "hash".into(),
                gender: Gender::Female,
                phone: "+15550000001".into(),
            })
            .await
            .unwrap();
        f.store
            .promote_to_admin(
                user.id,
                &AdminEnrollment {
                    staff_role: "operator".into(),
                    employee_id: "EMP-0001".into(),
                    joined_at: Utc::now(),
                },
                &[],
            )
            .await
            .unwrap();

        for required in [&[][..], &[PermissionAction::Read][..]] {
            let gate = f.gate(PermissionResource::Class, required);
            let err = gate
                .check(&mut f.ctx(user.id, UserRole::Admin))
                .await
                .unwrap_err();
            assert!(err.is(ErrorKind::Forbidden));
        }
    }

    #[tokio::test]
    async fn test_bypass_and_non_admin() {
        let f = fixture();
        let gate = f
            .gate(PermissionResource::Class, &[PermissionAction::Read])
            .with_bypass([UserRole::Teacher]);

        assert!(gate.check(&mut f.ctx(Uuid::new_v4(), UserRole::Teacher)).await.is_ok());

        let err = gate
            .check(&mut f.ctx(Uuid::new_v4(), UserRole::Student))
            .await
            .unwrap_err();
        assert_eq!(err.message, "invalid role, only admin can access this resource");
    }

    #[tokio::test]
    async fn test_not_activated_is_rejected() {
        let f = fixture();
        let gate = f.gate(PermissionResource::Class, &[PermissionAction::Read]);
        let refresh = f
            .codec
            .issue(Uuid::new_v4(), UserRole::Unset, false, TokenKind::Refresh)
            .unwrap();
        let mut ctx =
            RequestContext::new(CookieJar::new().add(Cookie::new("refresh_token", refresh.token)));
        let err = gate.check(&mut ctx).await.unwrap_err();
        assert!(err.is(ErrorKind::NotActivated));
    }
}
