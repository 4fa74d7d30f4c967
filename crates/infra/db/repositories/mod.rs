pub mod subscriptions;
pub mod user_profiles;
pub mod user_roles;
