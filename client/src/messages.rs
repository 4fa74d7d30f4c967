use crates::domain::value_objects::subscriptions::{ActivationOutcome, E8S_PER_UNIT};

use crate::error::ClientError;

pub const VERIFICATION_FAILED: &str =
    "Verification failed. Please check the transaction index and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    /// The user has to change something (index, amount, account) before trying again.
    ActionableError,
    /// Nothing was recorded; the same request may be sent again.
    RetryableError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl UserMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    fn actionable(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::ActionableError,
            text: text.into(),
        }
    }

    fn retryable(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::RetryableError,
            text: text.into(),
        }
    }
}

fn format_e8s(raw: &str) -> String {
    match raw.parse::<u64>() {
        Ok(e8s) => format!(
            "{}.{:08} ({} e8s)",
            e8s / E8S_PER_UNIT,
            e8s % E8S_PER_UNIT,
            e8s
        ),
        Err(_) => raw.to_string(),
    }
}

pub fn outcome_message(outcome: &ActivationOutcome) -> UserMessage {
    match outcome {
        ActivationOutcome::Ok(message) => UserMessage::success(message.clone()),
        ActivationOutcome::InsufficientAmount(amount) => UserMessage::actionable(format!(
            "The transfer amount {} is below the subscription fee.",
            format_e8s(amount)
        )),
        ActivationOutcome::BlockNotFound(index) => UserMessage::actionable(format!(
            "No ledger transaction exists at index {index}. Check the index in your wallet."
        )),
        ActivationOutcome::InvalidBlock(index) => UserMessage::actionable(format!(
            "The ledger transaction at index {index} is not a transfer."
        )),
        ActivationOutcome::WrongAddress(account) => UserMessage::actionable(format!(
            "The transfer went to {account}, not to the treasury account."
        )),
        ActivationOutcome::AlreadySubscribed => {
            UserMessage::actionable("Your subscription is already active.")
        }
        ActivationOutcome::ExceedsMaximumSubscriptionTime(message) => UserMessage::actionable(
            format!("This payment exceeds the maximum subscription time: {message}"),
        ),
        ActivationOutcome::BlockAlreadyUsed(index) => UserMessage::actionable(format!(
            "The transaction at index {index} has already been used to activate a subscription."
        )),
        ActivationOutcome::PayerMismatch(reason) => UserMessage::actionable(format!(
            "This transfer cannot be credited to your account: {reason}"
        )),
        ActivationOutcome::SubscriptionExpired => UserMessage::actionable(
            "Your subscription has expired and cannot be reactivated with a new payment.",
        ),
    }
}

pub fn error_message(err: &ClientError) -> UserMessage {
    match err {
        ClientError::Rejected { status: 401, .. } => {
            UserMessage::actionable("Sign in before activating a subscription.")
        }
        ClientError::Rejected { message, .. } => UserMessage::actionable(message.clone()),
        ClientError::Transient { .. } | ClientError::Internal(_) => {
            UserMessage::retryable(VERIFICATION_FAILED)
        }
    }
}
