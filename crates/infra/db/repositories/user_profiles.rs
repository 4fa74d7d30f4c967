use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_profiles},
};
use domain::{
    entities::user_profiles::{UpsertUserProfileEntity, UserProfileEntity},
    repositories::user_profiles::UserProfileRepository,
};

pub struct UserProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserProfileRepository for UserProfilePostgres {
    async fn find_profile(&self, principal_id: String) -> Result<Option<UserProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = user_profiles::table
            .filter(user_profiles::principal_id.eq(principal_id))
            .select(UserProfileEntity::as_select())
            .first::<UserProfileEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_profile(&self, profile: UpsertUserProfileEntity) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(user_profiles::table)
            .values(&profile)
            .on_conflict(user_profiles::principal_id)
            .do_update()
            .set(&profile)
            .execute(&mut conn)?;

        Ok(())
    }
}
