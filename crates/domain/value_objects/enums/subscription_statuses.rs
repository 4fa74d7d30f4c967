use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubscriptionStatus::Pending),
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }

    /// Status only moves forward: pending -> active -> expired.
    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        matches!(
            (self, next),
            (SubscriptionStatus::Pending, SubscriptionStatus::Active)
                | (SubscriptionStatus::Pending, SubscriptionStatus::Expired)
                | (SubscriptionStatus::Active, SubscriptionStatus::Expired)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert!(SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Pending));
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Expired.can_transition_to(SubscriptionStatus::Active));
    }

    #[test]
    fn unknown_status_text_is_rejected() {
        assert_eq!(SubscriptionStatus::from_str("active"), Some(SubscriptionStatus::Active));
        assert_eq!(SubscriptionStatus::from_str("canceled"), None);
    }
}
