pub mod consumed_blocks;
pub mod subscriptions;
pub mod user_profiles;
pub mod user_roles;
