use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::usecases::subscriptions::SubscriptionUseCase;

pub async fn run_expiry_loop(usecase: Arc<SubscriptionUseCase>, interval: Duration) {
    info!(
        interval_secs = interval.as_secs(),
        "expiry: starting subscription expiry loop"
    );
    loop {
        sweep_once(&usecase).await;
        tokio::time::sleep(interval).await;
    }
}

/// One pass over lapsed subscriptions. Failures are logged and retried on the next tick.
pub async fn sweep_once(usecase: &SubscriptionUseCase) -> usize {
    match usecase.expire_lapsed_subscriptions().await {
        Ok(0) => {
            debug!("expiry: no lapsed subscriptions");
            0
        }
        Ok(expired) => {
            info!(expired, "expiry: lapsed subscriptions expired");
            expired
        }
        Err(e) => {
            error!(error = ?e, "expiry: sweep failed");
            0
        }
    }
}
