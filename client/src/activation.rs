use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::SubscriptionApi,
    messages::{UserMessage, error_message, outcome_message},
    status_cache::StatusCache,
};

pub const INDEX_REQUIRED: &str = "Transaction index is required.";
pub const INDEX_NOT_NON_NEGATIVE_INTEGER: &str =
    "Transaction index must be a non-negative integer.";

/// Reasons a submit never reaches the backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0}")]
    InvalidIndex(&'static str),
    #[error("Accept the terms of service before activating.")]
    TermsNotAccepted,
    #[error("A verification is already in progress.")]
    InFlight,
}

pub fn validate_block_index(raw: &str) -> Result<u64, SubmitError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::InvalidIndex(INDEX_REQUIRED));
    }
    if !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(SubmitError::InvalidIndex(INDEX_NOT_NON_NEGATIVE_INTEGER));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| SubmitError::InvalidIndex(INDEX_NOT_NON_NEGATIVE_INTEGER))
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ActivationFlow {
    api: Arc<dyn SubscriptionApi>,
    cache: Arc<StatusCache>,
    terms_accepted: AtomicBool,
    in_flight: AtomicBool,
}

impl ActivationFlow {
    pub fn new(api: Arc<dyn SubscriptionApi>, cache: Arc<StatusCache>) -> Self {
        Self {
            api,
            cache,
            terms_accepted: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn set_terms_accepted(&self, accepted: bool) {
        self.terms_accepted.store(accepted, Ordering::Release);
    }

    /// Validates the input and makes exactly one verification call. Service outcomes and
    /// transport failures both come back as a message.
    pub async fn submit(&self, raw_index: &str) -> Result<UserMessage, SubmitError> {
        let block_index = validate_block_index(raw_index)?;
        if !self.terms_accepted.load(Ordering::Acquire) {
            return Err(SubmitError::TermsNotAccepted);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let message = match self.api.verify_and_activate(block_index).await {
            Ok(outcome) => {
                if outcome.is_ok() {
                    info!(block_index, "client: subscription activated");
                    self.cache.invalidate().await;
                } else {
                    info!(block_index, outcome = outcome.kind(), "client: activation rejected");
                }
                outcome_message(&outcome)
            }
            Err(err) => {
                warn!(block_index, error = %err, "client: verification request failed");
                error_message(&err)
            }
        };

        Ok(message)
    }
}
