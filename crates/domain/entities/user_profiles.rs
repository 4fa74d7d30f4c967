use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::value_objects::user_profiles::UserProfile;
use crate::infra::db::postgres::schema::user_profiles;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = user_profiles)]
#[diesel(primary_key(principal_id))]
pub struct UserProfileEntity {
    pub principal_id: String,
    pub user_name: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = user_profiles)]
pub struct UpsertUserProfileEntity {
    pub principal_id: String,
    pub user_name: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfileEntity> for UserProfile {
    fn from(value: UserProfileEntity) -> Self {
        Self {
            user_name: value.user_name,
            description: value.description,
        }
    }
}
