use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    account_identifier::AccountIdentifier, enums::subscription_statuses::SubscriptionStatus,
    principal::Principal,
};

/// Default minimum subscription fee: 0.001 of the native unit.
pub const DEFAULT_MIN_FEE_E8S: u64 = 100_000;
pub const E8S_PER_UNIT: u64 = 100_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub principal_id: String,
    pub status: SubscriptionStatus,
    pub paid_amount: u64,
    /// Nanoseconds since the unix epoch.
    pub paid_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u64>,
}

impl SubscriptionRecord {
    pub fn is_active_at(&self, now_nanos: i64) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.is_none_or(|expires_at| now_nanos < expires_at)
    }
}

/// Result of `verify_and_activate_subscription`. Every expected business outcome is a
/// variant; infrastructure failures travel separately as errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(into = "OutcomeWire", from = "OutcomeWire")]
pub enum ActivationOutcome {
    Ok(String),
    InsufficientAmount(String),
    BlockNotFound(u64),
    InvalidBlock(u64),
    WrongAddress(AccountIdentifier),
    AlreadySubscribed,
    ExceedsMaximumSubscriptionTime(String),
    BlockAlreadyUsed(u64),
    PayerMismatch(String),
    SubscriptionExpired,
}

/// Wire shape of [`ActivationOutcome`]: every variant is a single-key object, with `null`
/// as the payload of the variants that carry nothing.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum OutcomeWire {
    Ok(String),
    InsufficientAmount(String),
    BlockNotFound(u64),
    InvalidBlock(u64),
    WrongAddress(AccountIdentifier),
    AlreadySubscribed(()),
    ExceedsMaximumSubscriptionTime(String),
    BlockAlreadyUsed(u64),
    PayerMismatch(String),
    SubscriptionExpired(()),
}

impl From<ActivationOutcome> for OutcomeWire {
    fn from(outcome: ActivationOutcome) -> Self {
        match outcome {
            ActivationOutcome::Ok(message) => OutcomeWire::Ok(message),
            ActivationOutcome::InsufficientAmount(amount) => {
                OutcomeWire::InsufficientAmount(amount)
            }
            ActivationOutcome::BlockNotFound(index) => OutcomeWire::BlockNotFound(index),
            ActivationOutcome::InvalidBlock(index) => OutcomeWire::InvalidBlock(index),
            ActivationOutcome::WrongAddress(account) => OutcomeWire::WrongAddress(account),
            ActivationOutcome::AlreadySubscribed => OutcomeWire::AlreadySubscribed(()),
            ActivationOutcome::ExceedsMaximumSubscriptionTime(message) => {
                OutcomeWire::ExceedsMaximumSubscriptionTime(message)
            }
            ActivationOutcome::BlockAlreadyUsed(index) => OutcomeWire::BlockAlreadyUsed(index),
            ActivationOutcome::PayerMismatch(reason) => OutcomeWire::PayerMismatch(reason),
            ActivationOutcome::SubscriptionExpired => OutcomeWire::SubscriptionExpired(()),
        }
    }
}

impl From<OutcomeWire> for ActivationOutcome {
    fn from(wire: OutcomeWire) -> Self {
        match wire {
            OutcomeWire::Ok(message) => ActivationOutcome::Ok(message),
            OutcomeWire::InsufficientAmount(amount) => {
                ActivationOutcome::InsufficientAmount(amount)
            }
            OutcomeWire::BlockNotFound(index) => ActivationOutcome::BlockNotFound(index),
            OutcomeWire::InvalidBlock(index) => ActivationOutcome::InvalidBlock(index),
            OutcomeWire::WrongAddress(account) => ActivationOutcome::WrongAddress(account),
            OutcomeWire::AlreadySubscribed(()) => ActivationOutcome::AlreadySubscribed,
            OutcomeWire::ExceedsMaximumSubscriptionTime(message) => {
                ActivationOutcome::ExceedsMaximumSubscriptionTime(message)
            }
            OutcomeWire::BlockAlreadyUsed(index) => ActivationOutcome::BlockAlreadyUsed(index),
            OutcomeWire::PayerMismatch(reason) => ActivationOutcome::PayerMismatch(reason),
            OutcomeWire::SubscriptionExpired(()) => ActivationOutcome::SubscriptionExpired,
        }
    }
}

impl ActivationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ActivationOutcome::Ok(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActivationOutcome::Ok(_) => "ok",
            ActivationOutcome::InsufficientAmount(_) => "insufficientAmount",
            ActivationOutcome::BlockNotFound(_) => "blockNotFound",
            ActivationOutcome::InvalidBlock(_) => "invalidBlock",
            ActivationOutcome::WrongAddress(_) => "wrongAddress",
            ActivationOutcome::AlreadySubscribed => "alreadySubscribed",
            ActivationOutcome::ExceedsMaximumSubscriptionTime(_) => {
                "exceedsMaximumSubscriptionTime"
            }
            ActivationOutcome::BlockAlreadyUsed(_) => "blockAlreadyUsed",
            ActivationOutcome::PayerMismatch(_) => "payerMismatch",
            ActivationOutcome::SubscriptionExpired => "subscriptionExpired",
        }
    }
}

/// Payment rules applied during verification.
#[derive(Debug, Clone)]
pub struct SubscriptionPolicy {
    pub treasury: AccountIdentifier,
    pub min_fee_e8s: u64,
    /// Access bought by one minimum fee. `None` means lifetime access.
    pub period: Option<Duration>,
    /// Upper bound on the access a single payment may buy.
    pub max_duration: Option<Duration>,
}

impl SubscriptionPolicy {
    pub fn lifetime(treasury: AccountIdentifier, min_fee_e8s: u64) -> Self {
        Self {
            treasury,
            min_fee_e8s,
            period: None,
            max_duration: None,
        }
    }

    /// Access bought by `amount_e8s`, or the rejection message when the payment buys more
    /// than the policy allows.
    pub fn purchased_duration(&self, amount_e8s: u64) -> Result<Option<Duration>, String> {
        let Some(period) = self.period else {
            return Ok(None);
        };

        let periods = amount_e8s / self.min_fee_e8s.max(1);
        let purchased = i32::try_from(periods)
            .ok()
            .and_then(|periods| period.checked_mul(periods));

        let Some(purchased) = purchased else {
            return Err(format!(
                "a payment of {amount_e8s} e8s buys more subscription time than can be granted"
            ));
        };

        if let Some(max_duration) = self.max_duration {
            if purchased > max_duration {
                return Err(format!(
                    "a payment of {amount_e8s} e8s buys {} days, the maximum is {} days",
                    purchased.num_days(),
                    max_duration.num_days()
                ));
            }
        }

        Ok(Some(purchased))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySubscriptionRequest {
    pub block_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub principal: Principal,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsSubscribedResponse {
    pub subscribed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatusResponse {
    Ok(SubscriptionRecord),
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInstructions {
    pub treasury_account_id: AccountIdentifier,
    pub min_fee_e8s: u64,
    pub memo: u64,
}
