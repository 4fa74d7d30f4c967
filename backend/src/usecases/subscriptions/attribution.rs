use std::{fmt::Display, str::FromStr, sync::Arc};

use anyhow::bail;
use crates::domain::value_objects::{
    ledger::{LedgerBlock, Transfer},
    principal::Principal,
};

/// Decides whether a ledger transfer may be credited to the calling principal.
pub trait TransferAttribution: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Err` carries the reason reported back to the caller.
    fn attribute(
        &self,
        caller: &Principal,
        block: &LedgerBlock,
        transfer: &Transfer,
    ) -> Result<(), String>;
}

/// The payer puts the principal's payment memo on the transfer.
pub struct MemoAttribution;

impl TransferAttribution for MemoAttribution {
    fn name(&self) -> &'static str {
        "memo"
    }

    fn attribute(
        &self,
        caller: &Principal,
        block: &LedgerBlock,
        _transfer: &Transfer,
    ) -> Result<(), String> {
        let expected = caller.payment_memo();
        if block.memo() == expected {
            Ok(())
        } else {
            Err(format!(
                "transfer memo {} does not match the payment memo {} for {}",
                block.memo(),
                expected,
                caller
            ))
        }
    }
}

/// The caller's claim is accepted; only the single-use block index guards against replay.
pub struct CallerAssertion;

impl TransferAttribution for CallerAssertion {
    fn name(&self) -> &'static str {
        "caller_assertion"
    }

    fn attribute(
        &self,
        _caller: &Principal,
        _block: &LedgerBlock,
        _transfer: &Transfer,
    ) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttributionStrategy {
    #[default]
    Memo,
    CallerAssertion,
}

impl AttributionStrategy {
    pub fn build(self) -> Arc<dyn TransferAttribution> {
        match self {
            AttributionStrategy::Memo => Arc::new(MemoAttribution),
            AttributionStrategy::CallerAssertion => Arc::new(CallerAssertion),
        }
    }
}

impl Display for AttributionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributionStrategy::Memo => f.write_str("memo"),
            AttributionStrategy::CallerAssertion => f.write_str("caller_assertion"),
        }
    }
}

impl FromStr for AttributionStrategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memo" => Ok(AttributionStrategy::Memo),
            "caller_assertion" | "caller-assertion" => Ok(AttributionStrategy::CallerAssertion),
            other => bail!("unknown transfer attribution strategy: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::value_objects::{
        account_identifier::AccountIdentifier,
        ledger::{LedgerOperation, LedgerTransaction},
    };

    fn block_with_memo(memo: u64) -> LedgerBlock {
        LedgerBlock {
            index: 42,
            timestamp_nanos: 0,
            transaction: LedgerTransaction {
                memo,
                operation: LedgerOperation::Transfer(Transfer {
                    from: AccountIdentifier::from_bytes([1u8; 32]),
                    to: AccountIdentifier::from_bytes([2u8; 32]),
                    amount: 100_000,
                    fee: 10_000,
                }),
            },
        }
    }

    #[test]
    fn memo_attribution_requires_the_callers_memo() {
        let caller = Principal::parse("rrkah-fqaaa-aaaaa-aaaaq-cai").unwrap();
        let other = Principal::parse("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap();
        let block = block_with_memo(caller.payment_memo());
        let transfer = block.transfer().unwrap().clone();

        assert!(MemoAttribution.attribute(&caller, &block, &transfer).is_ok());
        let reason = MemoAttribution
            .attribute(&other, &block, &transfer)
            .unwrap_err();
        assert!(reason.contains("does not match"));
    }

    #[test]
    fn caller_assertion_accepts_any_caller() {
        let caller = Principal::parse("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap();
        let block = block_with_memo(0);
        let transfer = block.transfer().unwrap().clone();

        assert!(CallerAssertion.attribute(&caller, &block, &transfer).is_ok());
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in [AttributionStrategy::Memo, AttributionStrategy::CallerAssertion] {
            let parsed: AttributionStrategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
            assert_eq!(strategy.build().name(), strategy.to_string());
        }
    }
}
