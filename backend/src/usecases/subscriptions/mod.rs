pub mod attribution;

use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{
            consumed_blocks::InsertConsumedBlockEntity, subscriptions::InsertSubscriptionEntity,
        },
        repositories::subscriptions::{SubscriptionRepository, SubscriptionWrite},
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            ledger::LedgerBlock,
            principal::Principal,
            subscriptions::{
                ActivationOutcome, PaymentInstructions, SubscriptionPolicy, SubscriptionRecord,
            },
        },
    },
    infra::ledger::ledger_client::LedgerHttpClient,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::usecases::access_control::AdminCapability;
use attribution::TransferAttribution;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// `Ok(None)` when the ledger has no block at `block_index`.
    async fn query_block(&self, block_index: u64) -> AnyResult<Option<LedgerBlock>>;
}

#[async_trait]
impl LedgerGateway for LedgerHttpClient {
    async fn query_block(&self, block_index: u64) -> AnyResult<Option<LedgerBlock>> {
        self.fetch_block(block_index).await
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("ledger is unavailable, the same block index can be resubmitted")]
    LedgerUnavailable(#[source] anyhow::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Infrastructure failures leave no state behind, so the same request is safe to resend.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::LedgerUnavailable(_) | SubscriptionError::Internal(_)
        )
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct SubscriptionUseCase {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    ledger: Arc<dyn LedgerGateway>,
    attribution: Arc<dyn TransferAttribution>,
    policy: SubscriptionPolicy,
    clock: Clock,
    /// Serializes the check-then-act part of every activation and manual payment.
    activation_lock: Mutex<()>,
}

impl SubscriptionUseCase {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        ledger: Arc<dyn LedgerGateway>,
        attribution: Arc<dyn TransferAttribution>,
        policy: SubscriptionPolicy,
    ) -> Self {
        Self {
            subscription_repo,
            ledger,
            attribution,
            policy,
            clock: Arc::new(Utc::now),
            activation_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &SubscriptionPolicy {
        &self.policy
    }

    pub fn payment_instructions(&self, caller: &Principal) -> PaymentInstructions {
        PaymentInstructions {
            treasury_account_id: self.policy.treasury,
            min_fee_e8s: self.policy.min_fee_e8s,
            memo: caller.payment_memo(),
        }
    }

    /// Never fails: a missing record or a storage failure both read as "not subscribed".
    pub async fn is_subscribed(&self, principal: &Principal) -> bool {
        let entity = match self
            .subscription_repo
            .find_by_principal(principal.to_string())
            .await
        {
            Ok(Some(entity)) => entity,
            Ok(None) => return false,
            Err(err) => {
                error!(
                    %principal,
                    db_error = ?err,
                    "subscriptions: failed to load subscription for access check"
                );
                return false;
            }
        };

        match SubscriptionRecord::try_from(entity) {
            Ok(record) => match self.now_nanos() {
                Ok(now) => record.is_active_at(now),
                Err(err) => {
                    error!(%principal, error = ?err, "subscriptions: clock out of range");
                    false
                }
            },
            Err(err) => {
                error!(
                    %principal,
                    error = ?err,
                    "subscriptions: stored subscription is malformed"
                );
                false
            }
        }
    }

    pub async fn get_subscription_status(
        &self,
        principal: &Principal,
    ) -> UseCaseResult<SubscriptionRecord> {
        let entity = self
            .subscription_repo
            .find_by_principal(principal.to_string())
            .await
            .map_err(|err| {
                error!(
                    %principal,
                    db_error = ?err,
                    "subscriptions: failed to load subscription status"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                SubscriptionError::NotFound(format!("no subscription found for {principal}"))
            })?;

        Ok(SubscriptionRecord::try_from(entity)?)
    }

    /// Administrative activation without ledger proof.
    pub async fn record_payment(
        &self,
        admin: &AdminCapability,
        principal: &Principal,
        amount: u64,
    ) -> UseCaseResult<SubscriptionRecord> {
        info!(
            admin = %admin.principal(),
            %principal,
            amount,
            "subscriptions: manual payment requested"
        );

        if amount < self.policy.min_fee_e8s {
            return Err(SubscriptionError::Rejected(format!(
                "amount {amount} e8s is below the minimum fee of {} e8s",
                self.policy.min_fee_e8s
            )));
        }
        storable_amount(amount).map_err(SubscriptionError::Rejected)?;
        let purchased = self
            .policy
            .purchased_duration(amount)
            .map_err(SubscriptionError::Rejected)?;

        let _guard = self.activation_lock.lock().await;

        let now = (self.clock)();
        let subscription = self.active_subscription(principal, amount, now, purchased, None)?;
        let write = self
            .subscription_repo
            .record_manual_payment(subscription)
            .await
            .map_err(|err| {
                error!(
                    %principal,
                    amount,
                    db_error = ?err,
                    "subscriptions: failed to record manual payment"
                );
                SubscriptionError::Internal(err)
            })?;

        match write {
            SubscriptionWrite::Activated(entity) => {
                let record = SubscriptionRecord::try_from(entity)?;
                info!(
                    admin = %admin.principal(),
                    %principal,
                    amount,
                    "subscriptions: manual payment recorded"
                );
                Ok(record)
            }
            SubscriptionWrite::PrincipalNotEligible { status } => {
                Err(SubscriptionError::Rejected(format!(
                    "subscription for {principal} is {status} and cannot be activated again"
                )))
            }
            SubscriptionWrite::BlockAlreadyConsumed => Err(SubscriptionError::Internal(
                anyhow::anyhow!("manual payment unexpectedly reported a consumed block"),
            )),
        }
    }

    /// Verifies the transfer at `block_index` and activates the caller's subscription.
    /// Checks run in a fixed order and stop at the first rejection.
    pub async fn verify_and_activate_subscription(
        &self,
        caller: &Principal,
        block_index: u64,
    ) -> UseCaseResult<ActivationOutcome> {
        info!(
            principal = %caller,
            block_index,
            "subscriptions: verify and activate requested"
        );

        if let Some(outcome) = self.reject_ineligible_caller(caller).await? {
            return Ok(self.report(caller, block_index, outcome));
        }

        // Storage cannot hold indexes past i64::MAX, and the ledger never reaches them.
        let Ok(stored_index) = i64::try_from(block_index) else {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::BlockNotFound(block_index),
            ));
        };

        let block = self
            .ledger
            .query_block(block_index)
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    block_index,
                    error = ?err,
                    "subscriptions: ledger query failed"
                );
                SubscriptionError::LedgerUnavailable(err)
            })?;

        let Some(block) = block else {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::BlockNotFound(block_index),
            ));
        };

        let transfer = match block.transfer() {
            Some(transfer) if block.index == block_index => transfer,
            _ => {
                return Ok(self.report(
                    caller,
                    block_index,
                    ActivationOutcome::InvalidBlock(block_index),
                ));
            }
        };

        if transfer.to != self.policy.treasury {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::WrongAddress(transfer.to),
            ));
        }

        if transfer.amount < self.policy.min_fee_e8s {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::InsufficientAmount(transfer.amount.to_string()),
            ));
        }

        if let Err(message) = storable_amount(transfer.amount) {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::ExceedsMaximumSubscriptionTime(message),
            ));
        }

        if let Err(reason) = self.attribution.attribute(caller, &block, transfer) {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::PayerMismatch(reason),
            ));
        }

        let _guard = self.activation_lock.lock().await;

        // Another request may have activated this caller while the ledger was queried.
        if let Some(outcome) = self.reject_ineligible_caller(caller).await? {
            return Ok(self.report(caller, block_index, outcome));
        }

        let consumed = self
            .subscription_repo
            .is_block_consumed(stored_index)
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    block_index,
                    db_error = ?err,
                    "subscriptions: failed to check consumed block"
                );
                SubscriptionError::Internal(err)
            })?;
        if consumed {
            return Ok(self.report(
                caller,
                block_index,
                ActivationOutcome::BlockAlreadyUsed(block_index),
            ));
        }

        let purchased = match self.policy.purchased_duration(transfer.amount) {
            Ok(purchased) => purchased,
            Err(message) => {
                return Ok(self.report(
                    caller,
                    block_index,
                    ActivationOutcome::ExceedsMaximumSubscriptionTime(message),
                ));
            }
        };

        let now = (self.clock)();
        let subscription =
            self.active_subscription(caller, transfer.amount, now, purchased, Some(stored_index))?;
        let consumed_block = InsertConsumedBlockEntity {
            block_index: stored_index,
            principal_id: caller.to_string(),
            amount: subscription.paid_amount,
            consumed_at: now,
        };

        let write = self
            .subscription_repo
            .activate_with_block(subscription, consumed_block)
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    block_index,
                    db_error = ?err,
                    "subscriptions: failed to persist activation"
                );
                SubscriptionError::Internal(err)
            })?;

        let outcome = match write {
            SubscriptionWrite::Activated(entity) => {
                let record = SubscriptionRecord::try_from(entity)?;
                ActivationOutcome::Ok(format!(
                    "Subscription activated for {}: {} e8s received at ledger block {}.",
                    record.principal_id, record.paid_amount, block_index
                ))
            }
            SubscriptionWrite::BlockAlreadyConsumed => {
                ActivationOutcome::BlockAlreadyUsed(block_index)
            }
            SubscriptionWrite::PrincipalNotEligible { status } => ineligible_outcome(&status),
        };

        Ok(self.report(caller, block_index, outcome))
    }

    /// Flips lapsed active subscriptions to expired. Returns how many were flipped.
    pub async fn expire_lapsed_subscriptions(&self) -> UseCaseResult<usize> {
        let now = self.now_nanos()?;
        let expired = self
            .subscription_repo
            .expire_lapsed(now)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to expire lapsed subscriptions");
                SubscriptionError::Internal(err)
            })?;

        for principal in &expired {
            info!(%principal, "subscriptions: subscription expired");
        }

        Ok(expired.len())
    }

    async fn reject_ineligible_caller(
        &self,
        caller: &Principal,
    ) -> UseCaseResult<Option<ActivationOutcome>> {
        let existing = self
            .subscription_repo
            .find_by_principal(caller.to_string())
            .await
            .map_err(|err| {
                error!(
                    principal = %caller,
                    db_error = ?err,
                    "subscriptions: failed to load caller subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        Ok(match existing.status()? {
            SubscriptionStatus::Pending => None,
            SubscriptionStatus::Active => Some(ActivationOutcome::AlreadySubscribed),
            SubscriptionStatus::Expired => Some(ActivationOutcome::SubscriptionExpired),
        })
    }

    fn active_subscription(
        &self,
        principal: &Principal,
        amount: u64,
        now: DateTime<Utc>,
        purchased: Option<chrono::Duration>,
        block_index: Option<i64>,
    ) -> AnyResult<InsertSubscriptionEntity> {
        let paid_at = now
            .timestamp_nanos_opt()
            .context("current time is out of nanosecond range")?;
        let expires_at = purchased
            .map(|purchased| {
                now.checked_add_signed(purchased)
                    .and_then(|expires_at| expires_at.timestamp_nanos_opt())
                    .context("subscription expiry is out of range")
            })
            .transpose()?;
        let paid_amount = storable_amount(amount).map_err(anyhow::Error::msg)?;

        Ok(InsertSubscriptionEntity {
            principal_id: principal.to_string(),
            status: SubscriptionStatus::Active.to_string(),
            paid_amount,
            paid_at,
            expires_at,
            block_index,
            updated_at: now,
        })
    }

    fn now_nanos(&self) -> AnyResult<i64> {
        (self.clock)()
            .timestamp_nanos_opt()
            .context("current time is out of nanosecond range")
    }

    fn report(
        &self,
        caller: &Principal,
        block_index: u64,
        outcome: ActivationOutcome,
    ) -> ActivationOutcome {
        if outcome.is_ok() {
            info!(
                principal = %caller,
                block_index,
                "subscriptions: subscription activated"
            );
        } else {
            warn!(
                principal = %caller,
                block_index,
                outcome = outcome.kind(),
                attribution = self.attribution.name(),
                "subscriptions: activation rejected"
            );
        }
        outcome
    }
}

/// Amounts are stored as signed 64-bit integers.
fn storable_amount(amount: u64) -> Result<i64, String> {
    i64::try_from(amount).map_err(|_| {
        format!("a payment of {amount} e8s is larger than a subscription can record")
    })
}

fn ineligible_outcome(status: &str) -> ActivationOutcome {
    match SubscriptionStatus::from_str(status) {
        Some(SubscriptionStatus::Expired) => ActivationOutcome::SubscriptionExpired,
        _ => ActivationOutcome::AlreadySubscribed,
    }
}
