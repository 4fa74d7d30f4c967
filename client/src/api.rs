use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use crates::domain::value_objects::{
    principal::Principal,
    subscriptions::{
        ActivationOutcome, IsSubscribedResponse, PaymentInstructions, SubscriptionRecord,
        SubscriptionStatusResponse, VerifySubscriptionRequest,
    },
    user_profiles::UserProfile,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{config::ClientConfig, error::ClientError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn is_subscribed(&self, principal: &Principal) -> Result<bool, ClientError>;

    /// `Ok(None)` when the principal has no subscription record.
    async fn get_subscription_status(
        &self,
        principal: &Principal,
    ) -> Result<Option<SubscriptionRecord>, ClientError>;

    async fn verify_and_activate(&self, block_index: u64)
    -> Result<ActivationOutcome, ClientError>;

    async fn payment_instructions(&self) -> Result<PaymentInstructions, ClientError>;

    async fn caller_profile(&self) -> Result<Option<UserProfile>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    retryable: bool,
}

pub struct HttpSubscriptionApi {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpSubscriptionApi {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build backend http client")?;

        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn ensure_success(resp: Response) -> Result<Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        let retryable = parsed.as_ref().is_some_and(|error| error.retryable)
            || status.is_server_error();
        let message = parsed
            .map(|error| error.message)
            .unwrap_or_else(|| format!("backend request failed with status {status}"));

        warn!(status = %status, retryable, message = %message, "client: backend request failed");

        if retryable {
            Err(ClientError::Transient {
                status: Some(status.as_u16()),
                message,
            })
        } else {
            Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl SubscriptionApi for HttpSubscriptionApi {
    async fn is_subscribed(&self, principal: &Principal) -> Result<bool, ClientError> {
        let url = self.url(&format!("/subscriptions/{principal}/active"));
        debug!(%url, "client: checking subscription");

        let resp = self.authorized(self.http.get(&url)).send().await?;
        let body: IsSubscribedResponse = Self::ensure_success(resp).await?.json().await?;
        Ok(body.subscribed)
    }

    async fn get_subscription_status(
        &self,
        principal: &Principal,
    ) -> Result<Option<SubscriptionRecord>, ClientError> {
        let url = self.url(&format!("/subscriptions/{principal}"));
        let resp = self.authorized(self.http.get(&url)).send().await?;

        // The backend answers 404 with `{ "error": ... }` when there is no record.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: SubscriptionStatusResponse = Self::ensure_success(resp).await?.json().await?;
        match body {
            SubscriptionStatusResponse::Ok(record) => Ok(Some(record)),
            SubscriptionStatusResponse::Error(_) => Ok(None),
        }
    }

    async fn verify_and_activate(
        &self,
        block_index: u64,
    ) -> Result<ActivationOutcome, ClientError> {
        let url = self.url("/subscriptions/verify");
        debug!(%url, block_index, "client: submitting block index");

        let resp = self
            .authorized(self.http.post(&url))
            .json(&VerifySubscriptionRequest { block_index })
            .send()
            .await?;

        Ok(Self::ensure_success(resp).await?.json().await?)
    }

    async fn payment_instructions(&self) -> Result<PaymentInstructions, ClientError> {
        let url = self.url("/subscriptions/payment-memo");
        let resp = self.authorized(self.http.get(&url)).send().await?;
        Ok(Self::ensure_success(resp).await?.json().await?)
    }

    async fn caller_profile(&self) -> Result<Option<UserProfile>, ClientError> {
        let url = self.url("/profile");
        let resp = self.authorized(self.http.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::ensure_success(resp).await?.json().await?))
    }
}
