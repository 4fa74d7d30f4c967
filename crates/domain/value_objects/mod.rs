pub mod account_identifier;
pub mod enums;
pub mod ledger;
pub mod principal;
pub mod subscriptions;
pub mod user_profiles;
