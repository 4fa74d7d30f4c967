pub mod access_control;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod test_support;
