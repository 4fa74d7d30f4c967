use crates::domain::value_objects::principal::Principal;

use crate::usecases::subscriptions::attribution::AttributionStrategy;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: Auth,
    pub ledger: Ledger,
    pub subscription: Subscription,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub treasury_account_id: String,
    pub min_fee_e8s: u64,
    pub period_secs: Option<i64>,
    pub max_duration_secs: Option<i64>,
    pub attribution: AttributionStrategy,
    pub expiry_sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Access {
    pub admin_principals: Vec<Principal>,
}
