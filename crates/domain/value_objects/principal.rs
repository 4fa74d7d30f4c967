use std::fmt::Display;

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Textual form of the anonymous principal.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

const MAX_PRINCIPAL_TEXT_LEN: usize = 63;
const MAX_GROUP_LEN: usize = 5;

/// A caller identity in its textual form (dash-separated base32 groups).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal(String);

impl Principal {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            bail!("principal is empty");
        }
        if value.len() > MAX_PRINCIPAL_TEXT_LEN {
            bail!("principal is longer than {MAX_PRINCIPAL_TEXT_LEN} characters");
        }

        for group in value.split('-') {
            if group.is_empty() || group.len() > MAX_GROUP_LEN {
                bail!("principal has a malformed group: {value}");
            }
            if !group
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            {
                bail!("principal contains invalid characters: {value}");
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_PRINCIPAL.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_PRINCIPAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Memo a payer puts on a ledger transfer to bind it to this principal:
    /// the first 8 bytes of SHA-256 over the textual principal, big-endian.
    pub fn payment_memo(&self) -> u64 {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Principal::parse(&raw).map_err(serde::de::Error::custom)
    }
}
