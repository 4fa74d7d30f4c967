use std::{sync::Arc, time::Duration};

use crates::domain::value_objects::{principal::Principal, subscriptions::SubscriptionRecord};
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::{api::SubscriptionApi, error::ClientError};

/// Minimum age before a cached status is fetched again.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub subscribed: bool,
    pub record: Option<SubscriptionRecord>,
}

struct Cached {
    principal: Principal,
    snapshot: StatusSnapshot,
    fetched_at: Instant,
}

pub struct StatusCache {
    api: Arc<dyn SubscriptionApi>,
    window: Duration,
    cached: Mutex<Option<Cached>>,
}

impl StatusCache {
    pub fn new(api: Arc<dyn SubscriptionApi>) -> Self {
        Self::with_window(api, STALENESS_WINDOW)
    }

    pub fn with_window(api: Arc<dyn SubscriptionApi>, window: Duration) -> Self {
        Self {
            api,
            window,
            cached: Mutex::new(None),
        }
    }

    /// Subscription flag and record for `principal`, refetching both together when the
    /// cached pair is stale, was invalidated, or belongs to another identity.
    pub async fn status(&self, principal: &Principal) -> Result<StatusSnapshot, ClientError> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if &entry.principal == principal && entry.fetched_at.elapsed() < self.window {
                return Ok(entry.snapshot.clone());
            }
        }

        debug!(%principal, "client: refreshing subscription status");
        let subscribed = self.api.is_subscribed(principal).await?;
        let record = self.api.get_subscription_status(principal).await?;
        let snapshot = StatusSnapshot { subscribed, record };

        *cached = Some(Cached {
            principal: principal.clone(),
            snapshot: snapshot.clone(),
            fetched_at: Instant::now(),
        });

        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    pub async fn on_identity_changed(&self, principal: &Principal) {
        let mut cached = self.cached.lock().await;
        if cached
            .as_ref()
            .is_some_and(|entry| &entry.principal != principal)
        {
            *cached = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockSubscriptionApi;

    const P1: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
    const P2: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

    fn principal(text: &str) -> Principal {
        Principal::parse(text).unwrap()
    }

    fn api_expecting(fetches: usize) -> MockSubscriptionApi {
        let mut api = MockSubscriptionApi::new();
        api.expect_is_subscribed()
            .times(fetches)
            .returning(|_| Ok(false));
        api.expect_get_subscription_status()
            .times(fetches)
            .returning(|_| Ok(None));
        api
    }

    #[tokio::test(start_paused = true)]
    async fn serves_cached_status_inside_the_window() {
        let cache = StatusCache::new(Arc::new(api_expecting(2)));

        cache.status(&principal(P1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        cache.status(&principal(P1)).await.unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.status(&principal(P1)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_forces_a_refetch() {
        let cache = StatusCache::new(Arc::new(api_expecting(2)));

        cache.status(&principal(P1)).await.unwrap();
        cache.invalidate().await;
        cache.status(&principal(P1)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn identity_change_drops_the_cached_status() {
        let cache = StatusCache::new(Arc::new(api_expecting(3)));

        cache.status(&principal(P1)).await.unwrap();
        cache.on_identity_changed(&principal(P1)).await;
        cache.status(&principal(P1)).await.unwrap();

        cache.on_identity_changed(&principal(P2)).await;
        cache.status(&principal(P1)).await.unwrap();
        cache.status(&principal(P2)).await.unwrap();
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mut api = MockSubscriptionApi::new();
        let mut calls = 0;
        api.expect_is_subscribed().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(ClientError::Transient {
                    status: None,
                    message: "connection refused".to_string(),
                })
            } else {
                Ok(true)
            }
        });
        api.expect_get_subscription_status()
            .times(1)
            .returning(|_| Ok(None));

        let cache = StatusCache::new(Arc::new(api));
        assert!(cache.status(&principal(P1)).await.is_err());
        assert!(cache.status(&principal(P1)).await.unwrap().subscribed);
    }
}
