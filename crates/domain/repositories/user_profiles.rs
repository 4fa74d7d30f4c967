use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::user_profiles::{UpsertUserProfileEntity, UserProfileEntity};

#[async_trait]
#[automock]
pub trait UserProfileRepository {
    async fn find_profile(&self, principal_id: String) -> Result<Option<UserProfileEntity>>;

    async fn upsert_profile(&self, profile: UpsertUserProfileEntity) -> Result<()>;
}
