use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use crates::domain::{
    entities::{user_profiles::UpsertUserProfileEntity, user_roles::UpsertUserRoleEntity},
    repositories::{user_profiles::UserProfileRepository, user_roles::UserRoleRepository},
    value_objects::{enums::user_roles::UserRole, principal::Principal, user_profiles::UserProfile},
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("anonymous callers cannot perform this action")]
    Anonymous,
    #[error("admin role required")]
    Forbidden,
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AccessError::Anonymous => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden => StatusCode::FORBIDDEN,
            AccessError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AccessResult<T> = std::result::Result<T, AccessError>;

/// Proof that a principal was checked to hold the admin role. Only
/// [`AccessControlUseCase::require_admin`] hands these out.
#[derive(Debug, Clone)]
pub struct AdminCapability {
    principal: Principal,
}

impl AdminCapability {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    #[cfg(test)]
    pub(crate) fn granted_to(principal: Principal) -> Self {
        Self { principal }
    }
}

pub struct AccessControlUseCase {
    role_repo: Arc<dyn UserRoleRepository + Send + Sync>,
    profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
    bootstrap_admins: HashSet<Principal>,
}

impl AccessControlUseCase {
    pub fn new(
        role_repo: Arc<dyn UserRoleRepository + Send + Sync>,
        profile_repo: Arc<dyn UserProfileRepository + Send + Sync>,
        bootstrap_admins: Vec<Principal>,
    ) -> Self {
        Self {
            role_repo,
            profile_repo,
            bootstrap_admins: bootstrap_admins.into_iter().collect(),
        }
    }

    pub async fn caller_role(&self, caller: &Principal) -> AccessResult<UserRole> {
        if caller.is_anonymous() {
            return Ok(UserRole::Guest);
        }
        if self.bootstrap_admins.contains(caller) {
            return Ok(UserRole::Admin);
        }

        let stored = self
            .role_repo
            .find_role(caller.to_string())
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    db_error = ?err,
                    "access: failed to load caller role"
                );
                AccessError::Internal(err)
            })?;

        let Some(stored) = stored else {
            return Ok(UserRole::User);
        };

        match UserRole::from_str(&stored.role) {
            Some(role) => Ok(role),
            None => {
                warn!(
                    principal = %caller,
                    role = %stored.role,
                    "access: unknown stored role, treating caller as guest"
                );
                Ok(UserRole::Guest)
            }
        }
    }

    pub async fn is_admin(&self, caller: &Principal) -> AccessResult<bool> {
        Ok(self.caller_role(caller).await? == UserRole::Admin)
    }

    pub async fn require_admin(&self, caller: &Principal) -> AccessResult<AdminCapability> {
        if self.is_admin(caller).await? {
            return Ok(AdminCapability {
                principal: caller.clone(),
            });
        }

        warn!(principal = %caller, "access: admin capability denied");
        Err(AccessError::Forbidden)
    }

    pub async fn assign_role(
        &self,
        admin: &AdminCapability,
        target: Principal,
        role: UserRole,
    ) -> AccessResult<()> {
        if target.is_anonymous() && role != UserRole::Guest {
            return Err(AccessError::InvalidRequest(
                "the anonymous principal is always a guest".to_string(),
            ));
        }
        if self.bootstrap_admins.contains(&target) {
            return Err(AccessError::InvalidRequest(
                "bootstrap admins are managed by configuration".to_string(),
            ));
        }

        self.role_repo
            .upsert_role(UpsertUserRoleEntity {
                principal_id: target.to_string(),
                role: role.to_string(),
                assigned_by: admin.principal().to_string(),
                updated_at: Utc::now(),
            })
            .await
            .map_err(|err| {
                error!(
                    admin = %admin.principal(),
                    principal = %target,
                    %role,
                    db_error = ?err,
                    "access: failed to assign role"
                );
                AccessError::Internal(err)
            })?;

        info!(
            admin = %admin.principal(),
            principal = %target,
            %role,
            "access: role assigned"
        );
        Ok(())
    }

    pub async fn get_caller_profile(
        &self,
        caller: &Principal,
    ) -> AccessResult<Option<UserProfile>> {
        self.load_profile(caller).await
    }

    pub async fn save_caller_profile(
        &self,
        caller: &Principal,
        profile: UserProfile,
    ) -> AccessResult<()> {
        if self.caller_role(caller).await? == UserRole::Guest {
            return Err(AccessError::Anonymous);
        }
        profile.validate().map_err(AccessError::InvalidRequest)?;

        self.profile_repo
            .upsert_profile(UpsertUserProfileEntity {
                principal_id: caller.to_string(),
                user_name: profile.user_name.trim().to_string(),
                description: profile.description,
                updated_at: Utc::now(),
            })
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    db_error = ?err,
                    "access: failed to save profile"
                );
                AccessError::Internal(err)
            })?;

        info!(principal = %caller, "access: profile saved");
        Ok(())
    }

    pub async fn get_user_profile(
        &self,
        caller: &Principal,
        target: &Principal,
    ) -> AccessResult<Option<UserProfile>> {
        if caller != target && !self.is_admin(caller).await? {
            return Err(AccessError::Forbidden);
        }
        self.load_profile(target).await
    }

    async fn load_profile(&self, principal: &Principal) -> AccessResult<Option<UserProfile>> {
        let profile = self
            .profile_repo
            .find_profile(principal.to_string())
            .await
            .map_err(|err| {
                error!(
                    %principal,
                    db_error = ?err,
                    "access: failed to load profile"
                );
                AccessError::Internal(err)
            })?;

        Ok(profile.map(UserProfile::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::domain::{
        entities::user_roles::UserRoleEntity,
        repositories::{
            user_profiles::MockUserProfileRepository, user_roles::MockUserRoleRepository,
        },
    };
    use mockall::predicate::eq;

    const ADMIN: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
    const USER: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

    fn principal(text: &str) -> Principal {
        Principal::parse(text).unwrap()
    }

    fn usecase(
        role_repo: MockUserRoleRepository,
        profile_repo: MockUserProfileRepository,
    ) -> AccessControlUseCase {
        AccessControlUseCase::new(
            Arc::new(role_repo),
            Arc::new(profile_repo),
            vec![principal(ADMIN)],
        )
    }

    #[tokio::test]
    async fn resolves_roles_from_config_storage_and_defaults() {
        let mut role_repo = MockUserRoleRepository::new();
        role_repo
            .expect_find_role()
            .with(eq(USER.to_string()))
            .returning(|_| Box::pin(async { Ok(None) }));

        let access = usecase(role_repo, MockUserProfileRepository::new());

        assert_eq!(access.caller_role(&Principal::anonymous()).await.unwrap(), UserRole::Guest);
        assert_eq!(access.caller_role(&principal(ADMIN)).await.unwrap(), UserRole::Admin);
        assert_eq!(access.caller_role(&principal(USER)).await.unwrap(), UserRole::User);
    }

    #[tokio::test]
    async fn stored_admin_role_grants_capability() {
        let mut role_repo = MockUserRoleRepository::new();
        role_repo.expect_find_role().returning(|principal_id| {
            Box::pin(async move {
                Ok(Some(UserRoleEntity {
                    principal_id,
                    role: "admin".to_string(),
                    assigned_by: ADMIN.to_string(),
                    updated_at: Utc::now(),
                }))
            })
        });

        let access = usecase(role_repo, MockUserProfileRepository::new());
        let capability = access.require_admin(&principal(USER)).await.unwrap();
        assert_eq!(capability.principal(), &principal(USER));
    }

    #[tokio::test]
    async fn plain_users_are_denied_admin_capability() {
        let mut role_repo = MockUserRoleRepository::new();
        role_repo
            .expect_find_role()
            .returning(|_| Box::pin(async { Ok(None) }));

        let access = usecase(role_repo, MockUserProfileRepository::new());
        let err = access.require_admin(&principal(USER)).await.unwrap_err();
        assert!(matches!(err, AccessError::Forbidden));
    }

    #[tokio::test]
    async fn assign_role_refuses_bootstrap_admins() {
        let access = usecase(MockUserRoleRepository::new(), MockUserProfileRepository::new());
        let admin = AdminCapability::granted_to(principal(ADMIN));

        let err = access
            .assign_role(&admin, principal(ADMIN), UserRole::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn assign_role_records_the_assigning_admin() {
        let mut role_repo = MockUserRoleRepository::new();
        role_repo
            .expect_upsert_role()
            .withf(|role| {
                role.principal_id == USER && role.role == "admin" && role.assigned_by == ADMIN
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let access = usecase(role_repo, MockUserProfileRepository::new());
        let admin = AdminCapability::granted_to(principal(ADMIN));

        access
            .assign_role(&admin, principal(USER), UserRole::Admin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn guests_cannot_save_profiles() {
        let access = usecase(MockUserRoleRepository::new(), MockUserProfileRepository::new());
        let profile = UserProfile {
            user_name: "satoshi".to_string(),
            description: String::new(),
        };

        let err = access
            .save_caller_profile(&Principal::anonymous(), profile)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Anonymous));
    }

    #[tokio::test]
    async fn other_users_profiles_require_admin() {
        let mut role_repo = MockUserRoleRepository::new();
        role_repo
            .expect_find_role()
            .returning(|_| Box::pin(async { Ok(None) }));

        let access = usecase(role_repo, MockUserProfileRepository::new());
        let err = access
            .get_user_profile(&principal(USER), &principal(ADMIN))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden));
    }
}
