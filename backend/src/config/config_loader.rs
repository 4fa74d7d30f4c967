use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use crates::domain::value_objects::{
    account_identifier::AccountIdentifier,
    principal::Principal,
    subscriptions::{DEFAULT_MIN_FEE_E8S, SubscriptionPolicy},
};

use super::config_model::{
    Access, Auth, BackendServer, Database, DotEnvyConfig, Ledger, Subscription,
};
use crate::config::stage::Stage;
use crate::usecases::subscriptions::attribution::AttributionStrategy;

pub const DEFAULT_TREASURY_ACCOUNT_ID: &str =
    "156853c40cb612680accef359c70d569cc9cd60453f5b055bf69e4ce87cf67a5";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from an arbitrary variable source.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_server = BackendServer {
        port: required_parse(&lookup, "SERVER_PORT_BACKEND")?,
        body_limit: optional_parse(&lookup, "SERVER_BODY_LIMIT")?.unwrap_or(1),
        timeout: optional_parse(&lookup, "SERVER_TIMEOUT")?.unwrap_or(30),
    };

    let database = Database {
        url: required(&lookup, "DATABASE_URL")?,
        max_connections: optional_parse(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
    };

    let auth = Auth {
        jwt_secret: required(&lookup, "JWT_SECRET")?,
    };

    let ledger = Ledger {
        api_url: required(&lookup, "LEDGER_API_URL")?,
        timeout_secs: optional_parse(&lookup, "LEDGER_TIMEOUT_SECS")?.unwrap_or(10),
    };

    let attribution = match non_empty(&lookup, "TRANSFER_ATTRIBUTION") {
        Some(raw) => AttributionStrategy::from_str(&raw)?,
        None => AttributionStrategy::default(),
    };

    let subscription = Subscription {
        treasury_account_id: non_empty(&lookup, "TREASURY_ACCOUNT_ID")
            .unwrap_or_else(|| DEFAULT_TREASURY_ACCOUNT_ID.to_string()),
        min_fee_e8s: optional_parse(&lookup, "SUBSCRIPTION_MIN_FEE_E8S")?
            .unwrap_or(DEFAULT_MIN_FEE_E8S),
        period_secs: optional_parse(&lookup, "SUBSCRIPTION_PERIOD_SECS")?,
        max_duration_secs: optional_parse(&lookup, "SUBSCRIPTION_MAX_DURATION_SECS")?,
        attribution,
        expiry_sweep_interval_secs: optional_parse(&lookup, "EXPIRY_SWEEP_INTERVAL_SECS")?
            .unwrap_or(300),
    };

    let admin_principals = non_empty(&lookup, "ADMIN_PRINCIPALS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(Principal::parse)
                .collect::<Result<Vec<_>>>()
        })
        .transpose()
        .context("ADMIN_PRINCIPALS is invalid")?
        .unwrap_or_default();

    let config = DotEnvyConfig {
        backend_server,
        database,
        auth,
        ledger,
        subscription,
        access: Access { admin_principals },
    };

    // Fail at startup rather than on the first verification.
    config.subscription.policy()?;

    Ok(config)
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

impl Subscription {
    pub fn policy(&self) -> Result<SubscriptionPolicy> {
        let treasury = AccountIdentifier::from_hex(&self.treasury_account_id)
            .context("TREASURY_ACCOUNT_ID is invalid")?;
        if self.min_fee_e8s == 0 {
            return Err(anyhow!("SUBSCRIPTION_MIN_FEE_E8S must be positive"));
        }

        Ok(SubscriptionPolicy {
            treasury,
            min_fee_e8s: self.min_fee_e8s,
            period: positive_seconds(self.period_secs, "SUBSCRIPTION_PERIOD_SECS")?,
            max_duration: positive_seconds(
                self.max_duration_secs,
                "SUBSCRIPTION_MAX_DURATION_SECS",
            )?,
        })
    }
}

fn positive_seconds(value: Option<i64>, key: &str) -> Result<Option<Duration>> {
    match value {
        None => Ok(None),
        Some(secs) if secs > 0 => Duration::try_seconds(secs)
            .map(Some)
            .ok_or_else(|| anyhow!("{key} is out of range")),
        Some(_) => Err(anyhow!("{key} must be positive")),
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or_else(|| anyhow!("{key} is invalid"))
}

fn required_parse<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(lookup, key)?
        .trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional_parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty(lookup, key)
        .map(|raw| raw.trim().parse())
        .transpose()
        .with_context(|| format!("{key} is invalid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_PORT_BACKEND", "8080"),
            ("DATABASE_URL", "postgres://localhost:5432/db"),
            ("JWT_SECRET", "supersecretjwtsecretforunittesting123"),
            ("LEDGER_API_URL", "http://localhost:9000"),
        ])
    }

    fn load_map(env: &HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).map(|value| value.to_string()))
    }

    #[test]
    fn applies_defaults() {
        let config = load_map(&base_env()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.backend_server.timeout, 30);
        assert_eq!(config.subscription.min_fee_e8s, 100_000);
        assert_eq!(
            config.subscription.treasury_account_id,
            DEFAULT_TREASURY_ACCOUNT_ID
        );
        assert_eq!(config.subscription.attribution, AttributionStrategy::Memo);
        assert!(config.access.admin_principals.is_empty());

        let policy = config.subscription.policy().unwrap();
        assert!(policy.period.is_none());
        assert!(policy.max_duration.is_none());
    }

    #[test]
    fn reads_policy_and_admins() {
        let mut env = base_env();
        env.insert("SUBSCRIPTION_PERIOD_SECS", "2592000");
        env.insert("SUBSCRIPTION_MAX_DURATION_SECS", "31536000");
        env.insert("TRANSFER_ATTRIBUTION", "caller_assertion");
        env.insert(
            "ADMIN_PRINCIPALS",
            "rrkah-fqaaa-aaaaa-aaaaq-cai, ryjl3-tyaaa-aaaaa-aaaba-cai",
        );

        let config = load_map(&env).unwrap();
        let policy = config.subscription.policy().unwrap();

        assert_eq!(policy.period, Some(Duration::days(30)));
        assert_eq!(policy.max_duration, Some(Duration::days(365)));
        assert_eq!(
            config.subscription.attribution,
            AttributionStrategy::CallerAssertion
        );
        assert_eq!(config.access.admin_principals.len(), 2);
    }

    #[test]
    fn rejects_missing_and_malformed_values() {
        let mut env = base_env();
        env.remove("JWT_SECRET");
        assert!(load_map(&env).is_err());

        let mut env = base_env();
        env.insert("TREASURY_ACCOUNT_ID", "not-hex");
        assert!(load_map(&env).is_err());

        let mut env = base_env();
        env.insert("SUBSCRIPTION_PERIOD_SECS", "-5");
        assert!(load_map(&env).is_err());

        let mut env = base_env();
        env.insert("TRANSFER_ATTRIBUTION", "signature");
        assert!(load_map(&env).is_err());
    }
}
