use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::user_roles::{UpsertUserRoleEntity, UserRoleEntity};

#[async_trait]
#[automock]
pub trait UserRoleRepository {
    async fn find_role(&self, principal_id: String) -> Result<Option<UserRoleEntity>>;

    async fn upsert_role(&self, role: UpsertUserRoleEntity) -> Result<()>;
}
