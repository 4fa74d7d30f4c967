use std::fmt::Display;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const ACCOUNT_IDENTIFIER_LEN: usize = 32;

/// Ledger account identifier, rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountIdentifier([u8; ACCOUNT_IDENTIFIER_LEN]);

impl AccountIdentifier {
    pub fn from_bytes(bytes: [u8; ACCOUNT_IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self> {
        let decoded = hex::decode(value.trim())
            .with_context(|| format!("account identifier is not valid hex: {value}"))?;
        if decoded.len() != ACCOUNT_IDENTIFIER_LEN {
            bail!(
                "account identifier must be {ACCOUNT_IDENTIFIER_LEN} bytes, got {}",
                decoded.len()
            );
        }
        let mut bytes = [0u8; ACCOUNT_IDENTIFIER_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_IDENTIFIER_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for AccountIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccountIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AccountIdentifier::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
