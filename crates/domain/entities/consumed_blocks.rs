use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::consumed_blocks;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = consumed_blocks)]
#[diesel(primary_key(block_index))]
pub struct ConsumedBlockEntity {
    pub block_index: i64,
    pub principal_id: String,
    pub amount: i64,
    pub consumed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = consumed_blocks)]
pub struct InsertConsumedBlockEntity {
    pub block_index: i64,
    pub principal_id: String,
    pub amount: i64,
    pub consumed_at: DateTime<Utc>,
}
