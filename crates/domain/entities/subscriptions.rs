use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus, subscriptions::SubscriptionRecord,
};
use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
#[diesel(primary_key(principal_id))]
pub struct SubscriptionEntity {
    pub principal_id: String,
    pub status: String,
    pub paid_amount: i64,
    pub paid_at: i64,
    pub expires_at: Option<i64>,
    pub block_index: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = subscriptions)]
#[diesel(treat_none_as_null = true)]
pub struct InsertSubscriptionEntity {
    pub principal_id: String,
    pub status: String,
    pub paid_amount: i64,
    pub paid_at: i64,
    pub expires_at: Option<i64>,
    pub block_index: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> Result<SubscriptionStatus> {
        SubscriptionStatus::from_str(&self.status)
            .with_context(|| format!("unknown subscription status: {}", self.status))
    }
}

impl TryFrom<SubscriptionEntity> for SubscriptionRecord {
    type Error = anyhow::Error;

    fn try_from(entity: SubscriptionEntity) -> Result<Self> {
        let status = entity.status()?;
        let paid_amount = u64::try_from(entity.paid_amount)
            .with_context(|| format!("negative paid amount: {}", entity.paid_amount))?;
        let block_index = entity
            .block_index
            .map(u64::try_from)
            .transpose()
            .context("negative block index")?;

        Ok(SubscriptionRecord {
            principal_id: entity.principal_id,
            status,
            paid_amount,
            paid_at: entity.paid_at,
            expires_at: entity.expires_at,
            block_index,
        })
    }
}
