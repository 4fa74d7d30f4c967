use anyhow::{Context, Result};
use crates::domain::value_objects::principal::Principal;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub access_token: Option<String>,
    /// Identity used for status queries. Defaults to the anonymous principal.
    pub principal: Principal,
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(
        backend_url: String,
        access_token: Option<String>,
        principal: Option<String>,
        request_timeout_secs: u64,
    ) -> Result<Self> {
        let principal = match principal.filter(|value| !value.trim().is_empty()) {
            Some(raw) => Principal::parse(&raw).context("PRINCIPAL is invalid")?,
            None => Principal::anonymous(),
        };

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|token| !token.trim().is_empty()),
            principal,
            request_timeout_secs,
        })
    }
}
