use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::{
    consumed_blocks::InsertConsumedBlockEntity,
    subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
};

/// Outcome of an atomic subscription write. Conflicts detected by the store are values,
/// not errors, so callers can report them as business rejections.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionWrite {
    Activated(SubscriptionEntity),
    BlockAlreadyConsumed,
    /// The principal already has a record whose status cannot move to active.
    PrincipalNotEligible { status: String },
}

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn find_by_principal(&self, principal_id: String) -> Result<Option<SubscriptionEntity>>;

    async fn is_block_consumed(&self, block_index: i64) -> Result<bool>;

    /// Writes the active subscription and marks the block consumed in one transaction.
    async fn activate_with_block(
        &self,
        subscription: InsertSubscriptionEntity,
        consumed_block: InsertConsumedBlockEntity,
    ) -> Result<SubscriptionWrite>;

    /// Writes an active subscription that is not backed by a ledger block.
    async fn record_manual_payment(
        &self,
        subscription: InsertSubscriptionEntity,
    ) -> Result<SubscriptionWrite>;

    /// Flips active subscriptions whose expiry is at or before `now_nanos` to expired and
    /// returns the affected principals.
    async fn expire_lapsed(&self, now_nanos: i64) -> Result<Vec<String>>;
}
