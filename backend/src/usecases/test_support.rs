use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use crates::domain::{
    entities::{
        consumed_blocks::InsertConsumedBlockEntity,
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
        user_profiles::{UpsertUserProfileEntity, UserProfileEntity},
        user_roles::{UpsertUserRoleEntity, UserRoleEntity},
    },
    repositories::{
        subscriptions::{SubscriptionRepository, SubscriptionWrite},
        user_profiles::UserProfileRepository,
        user_roles::UserRoleRepository,
    },
    value_objects::{
        account_identifier::AccountIdentifier,
        enums::subscription_statuses::SubscriptionStatus,
        ledger::{LedgerBlock, LedgerOperation, LedgerTransaction, Transfer},
    },
};

use crate::usecases::subscriptions::LedgerGateway;

pub const TREASURY_HEX: &str = "156853c40cb612680accef359c70d569cc9cd60453f5b055bf69e4ce87cf67a5";
pub const P1: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
pub const P2: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

pub fn treasury() -> AccountIdentifier {
    AccountIdentifier::from_hex(TREASURY_HEX).unwrap()
}

pub fn transfer_block(index: u64, to: AccountIdentifier, amount: u64, memo: u64) -> LedgerBlock {
    LedgerBlock {
        index,
        timestamp_nanos: 1_700_000_000_000_000_000,
        transaction: LedgerTransaction {
            memo,
            operation: LedgerOperation::Transfer(Transfer {
                from: AccountIdentifier::from_bytes([9u8; 32]),
                to,
                amount,
                fee: 10_000,
            }),
        },
    }
}

/// Subscription store with the same conflict rules as the Postgres repository.
#[derive(Default)]
pub struct InMemorySubscriptions {
    state: Mutex<SubscriptionState>,
}

#[derive(Default)]
struct SubscriptionState {
    records: HashMap<String, SubscriptionEntity>,
    consumed: HashSet<i64>,
}

impl InMemorySubscriptions {
    pub fn with_record(self, entity: SubscriptionEntity) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(entity.principal_id.clone(), entity);
        self
    }

    pub fn record(&self, principal_id: &str) -> Option<SubscriptionEntity> {
        self.state.lock().unwrap().records.get(principal_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn consumed_count(&self) -> usize {
        self.state.lock().unwrap().consumed.len()
    }
}

fn ineligible(state: &SubscriptionState, principal_id: &str) -> Option<SubscriptionWrite> {
    state
        .records
        .get(principal_id)
        .filter(|existing| existing.status != SubscriptionStatus::Pending.as_str())
        .map(|existing| SubscriptionWrite::PrincipalNotEligible {
            status: existing.status.clone(),
        })
}

fn stored(subscription: InsertSubscriptionEntity) -> SubscriptionEntity {
    SubscriptionEntity {
        principal_id: subscription.principal_id,
        status: subscription.status,
        paid_amount: subscription.paid_amount,
        paid_at: subscription.paid_at,
        expires_at: subscription.expires_at,
        block_index: subscription.block_index,
        created_at: subscription.updated_at,
        updated_at: subscription.updated_at,
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn find_by_principal(&self, principal_id: String) -> Result<Option<SubscriptionEntity>> {
        Ok(self.record(&principal_id))
    }

    async fn is_block_consumed(&self, block_index: i64) -> Result<bool> {
        Ok(self.state.lock().unwrap().consumed.contains(&block_index))
    }

    async fn activate_with_block(
        &self,
        subscription: InsertSubscriptionEntity,
        consumed_block: InsertConsumedBlockEntity,
    ) -> Result<SubscriptionWrite> {
        let mut state = self.state.lock().unwrap();
        if let Some(rejected) = ineligible(&state, &subscription.principal_id) {
            return Ok(rejected);
        }
        if !state.consumed.insert(consumed_block.block_index) {
            return Ok(SubscriptionWrite::BlockAlreadyConsumed);
        }

        let entity = stored(subscription);
        state
            .records
            .insert(entity.principal_id.clone(), entity.clone());
        Ok(SubscriptionWrite::Activated(entity))
    }

    async fn record_manual_payment(
        &self,
        subscription: InsertSubscriptionEntity,
    ) -> Result<SubscriptionWrite> {
        let mut state = self.state.lock().unwrap();
        if let Some(rejected) = ineligible(&state, &subscription.principal_id) {
            return Ok(rejected);
        }

        let entity = stored(subscription);
        state
            .records
            .insert(entity.principal_id.clone(), entity.clone());
        Ok(SubscriptionWrite::Activated(entity))
    }

    async fn expire_lapsed(&self, now_nanos: i64) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        let mut expired = Vec::new();
        for entity in state.records.values_mut() {
            let lapsed = entity.expires_at.is_some_and(|expires_at| expires_at <= now_nanos);
            if entity.status == SubscriptionStatus::Active.as_str() && lapsed {
                entity.status = SubscriptionStatus::Expired.to_string();
                entity.updated_at = Utc::now();
                expired.push(entity.principal_id.clone());
            }
        }
        Ok(expired)
    }
}

/// Ledger that serves a fixed set of blocks and counts queries.
#[derive(Default)]
pub struct StaticLedger {
    blocks: HashMap<u64, LedgerBlock>,
    queries: AtomicUsize,
}

impl StaticLedger {
    pub fn with_block(mut self, block: LedgerBlock) -> Self {
        self.blocks.insert(block.index, block);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerGateway for StaticLedger {
    async fn query_block(&self, block_index: u64) -> Result<Option<LedgerBlock>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave between the query and the write.
        tokio::task::yield_now().await;
        Ok(self.blocks.get(&block_index).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryRoles {
    roles: Mutex<HashMap<String, UserRoleEntity>>,
}

#[async_trait]
impl UserRoleRepository for InMemoryRoles {
    async fn find_role(&self, principal_id: String) -> Result<Option<UserRoleEntity>> {
        Ok(self.roles.lock().unwrap().get(&principal_id).cloned())
    }

    async fn upsert_role(&self, role: UpsertUserRoleEntity) -> Result<()> {
        self.roles.lock().unwrap().insert(
            role.principal_id.clone(),
            UserRoleEntity {
                principal_id: role.principal_id,
                role: role.role,
                assigned_by: role.assigned_by,
                updated_at: role.updated_at,
            },
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: Mutex<HashMap<String, UserProfileEntity>>,
}

#[async_trait]
impl UserProfileRepository for InMemoryProfiles {
    async fn find_profile(&self, principal_id: String) -> Result<Option<UserProfileEntity>> {
        Ok(self.profiles.lock().unwrap().get(&principal_id).cloned())
    }

    async fn upsert_profile(&self, profile: UpsertUserProfileEntity) -> Result<()> {
        self.profiles.lock().unwrap().insert(
            profile.principal_id.clone(),
            UserProfileEntity {
                principal_id: profile.principal_id,
                user_name: profile.user_name,
                description: profile.description,
                updated_at: profile.updated_at,
            },
        );
        Ok(())
    }
}
