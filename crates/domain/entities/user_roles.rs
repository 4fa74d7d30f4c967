use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::user_roles;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = user_roles)]
#[diesel(primary_key(principal_id))]
pub struct UserRoleEntity {
    pub principal_id: String,
    pub role: String,
    pub assigned_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = user_roles)]
pub struct UpsertUserRoleEntity {
    pub principal_id: String,
    pub role: String,
    pub assigned_by: String,
    pub updated_at: DateTime<Utc>,
}
