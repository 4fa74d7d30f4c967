use serde::{Deserialize, Serialize};

use crate::domain::value_objects::account_identifier::AccountIdentifier;

/// A block as returned by the ledger index: one transaction per block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerBlock {
    pub index: u64,
    pub timestamp_nanos: u64,
    pub transaction: LedgerTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerTransaction {
    #[serde(default)]
    pub memo: u64,
    pub operation: LedgerOperation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LedgerOperation {
    Transfer(Transfer),
    Mint {
        to: AccountIdentifier,
        amount: u64,
    },
    Burn {
        from: AccountIdentifier,
        amount: u64,
    },
    Approve {
        from: AccountIdentifier,
        spender: AccountIdentifier,
        allowance: u64,
    },
    /// Any operation this service does not model, kept as the ledger sent it.
    #[serde(untagged)]
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub from: AccountIdentifier,
    pub to: AccountIdentifier,
    pub amount: u64,
    #[serde(default)]
    pub fee: u64,
}

impl LedgerBlock {
    /// The transfer carried by this block, if the operation is a plain transfer.
    pub fn transfer(&self) -> Option<&Transfer> {
        match &self.transaction.operation {
            LedgerOperation::Transfer(transfer) => Some(transfer),
            LedgerOperation::Mint { .. }
            | LedgerOperation::Burn { .. }
            | LedgerOperation::Approve { .. }
            | LedgerOperation::Other(_) => None,
        }
    }

    pub fn memo(&self) -> u64 {
        self.transaction.memo
    }
}
