use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_roles},
};
use domain::{
    entities::user_roles::{UpsertUserRoleEntity, UserRoleEntity},
    repositories::user_roles::UserRoleRepository,
};

pub struct UserRolePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserRolePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRoleRepository for UserRolePostgres {
    async fn find_role(&self, principal_id: String) -> Result<Option<UserRoleEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = user_roles::table
            .filter(user_roles::principal_id.eq(principal_id))
            .select(UserRoleEntity::as_select())
            .first::<UserRoleEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_role(&self, role: UpsertUserRoleEntity) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(user_roles::table)
            .values(&role)
            .on_conflict(user_roles::principal_id)
            .do_update()
            .set(&role)
            .execute(&mut conn)?;

        Ok(())
    }
}
