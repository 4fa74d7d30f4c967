use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    PgConnection, RunQueryDsl, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{consumed_blocks, subscriptions},
    },
};
use domain::{
    entities::{
        consumed_blocks::InsertConsumedBlockEntity,
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    repositories::subscriptions::{SubscriptionRepository, SubscriptionWrite},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_principal(&self, principal_id: String) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::principal_id.eq(principal_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn is_block_consumed(&self, block_index: i64) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let consumed = diesel::select(diesel::dsl::exists(
            consumed_blocks::table.filter(consumed_blocks::block_index.eq(block_index)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(consumed)
    }

    async fn activate_with_block(
        &self,
        subscription: InsertSubscriptionEntity,
        consumed_block: InsertConsumedBlockEntity,
    ) -> Result<SubscriptionWrite> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let write = conn.transaction::<_, DieselError, _>(|conn| {
            if let Some(rejected) = lock_ineligible(conn, &subscription.principal_id)? {
                return Ok(rejected);
            }

            // A concurrent transaction holding the same key makes this wait, then no-op.
            let inserted = insert_into(consumed_blocks::table)
                .values(&consumed_block)
                .on_conflict_do_nothing()
                .execute(conn)?;
            if inserted == 0 {
                return Ok(SubscriptionWrite::BlockAlreadyConsumed);
            }

            let entity = upsert_subscription(conn, &subscription)?;
            Ok(SubscriptionWrite::Activated(entity))
        });

        map_unique_violation(write)
    }

    async fn record_manual_payment(
        &self,
        subscription: InsertSubscriptionEntity,
    ) -> Result<SubscriptionWrite> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let write = conn.transaction::<_, DieselError, _>(|conn| {
            if let Some(rejected) = lock_ineligible(conn, &subscription.principal_id)? {
                return Ok(rejected);
            }

            let entity = upsert_subscription(conn, &subscription)?;
            Ok(SubscriptionWrite::Activated(entity))
        });

        map_unique_violation(write)
    }

    async fn expire_lapsed(&self, now_nanos: i64) -> Result<Vec<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let expired = update(subscriptions::table)
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscriptions::expires_at.le(now_nanos))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Expired.as_str()),
                subscriptions::updated_at.eq(Utc::now()),
            ))
            .returning(subscriptions::principal_id)
            .get_results::<String>(&mut conn)?;

        Ok(expired)
    }
}

/// Row-locks the principal's record and reports it when its status cannot become active.
fn lock_ineligible(
    conn: &mut PgConnection,
    principal_id: &str,
) -> QueryResult<Option<SubscriptionWrite>> {
    let status = subscriptions::table
        .filter(subscriptions::principal_id.eq(principal_id))
        .select(subscriptions::status)
        .for_update()
        .first::<String>(conn)
        .optional()?;

    Ok(status
        .filter(|status| status != SubscriptionStatus::Pending.as_str())
        .map(|status| SubscriptionWrite::PrincipalNotEligible { status }))
}

fn upsert_subscription(
    conn: &mut PgConnection,
    subscription: &InsertSubscriptionEntity,
) -> QueryResult<SubscriptionEntity> {
    insert_into(subscriptions::table)
        .values(subscription)
        .on_conflict(subscriptions::principal_id)
        .do_update()
        .set(subscription)
        .returning(SubscriptionEntity::as_returning())
        .get_result::<SubscriptionEntity>(conn)
}

/// Two first-time activations for one principal race on the primary key; the loser lands
/// here after its transaction was rolled back.
fn map_unique_violation(
    write: std::result::Result<SubscriptionWrite, DieselError>,
) -> Result<SubscriptionWrite> {
    match write {
        Ok(write) => Ok(write),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            if info
                .constraint_name()
                .is_some_and(|name| name.contains("block_index"))
            {
                Ok(SubscriptionWrite::BlockAlreadyConsumed)
            } else {
                Ok(SubscriptionWrite::PrincipalNotEligible {
                    status: SubscriptionStatus::Active.to_string(),
                })
            }
        }
        Err(err) => Err(err.into()),
    }
}
