//! Static adapters for the balance oracle and deposit escrow.
//!
//! The daemon loads a balance snapshot and a list of escrow receipts from
//! its config file. Both are fixed for the life of the process, which keeps
//! `weight_of` deterministic for any `at`.

use agora_types::{Timestamp, WalletAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use agora_types::{BalanceOracle, DepositEscrow, DepositProof, OracleError};

/// Voting power taken from a fixed snapshot. Absent accounts weigh zero.
#[derive(Clone, Debug, Default)]
pub struct SnapshotBalances {
    balances: HashMap<WalletAddress, u64>,
}

impl SnapshotBalances {
    pub fn new(balances: HashMap<WalletAddress, u64>) -> Self {
        Self { balances }
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl FromIterator<(WalletAddress, u64)> for SnapshotBalances {
    fn from_iter<I: IntoIterator<Item = (WalletAddress, u64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl BalanceOracle for SnapshotBalances {
    fn weight_of(&self, voter: &WalletAddress, _at: Timestamp) -> Result<u64, OracleError> {
        Ok(self.balances.get(voter).copied().unwrap_or(0))
    }
}

/// A deposit the escrow has confirmed, identified by its receipt reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    pub reference: String,
    pub depositor: WalletAddress,
    pub amount: u64,
}

/// Verifies proofs against a known set of escrow receipts.
///
/// A proof is valid when its reference is known, the depositor matches and
/// it claims no more than was escrowed.
#[derive(Clone, Debug, Default)]
pub struct ReceiptEscrow {
    receipts: HashMap<String, EscrowReceipt>,
}

impl ReceiptEscrow {
    pub fn new(receipts: impl IntoIterator<Item = EscrowReceipt>) -> Self {
        Self {
            receipts: receipts
                .into_iter()
                .map(|r| (r.reference.clone(), r))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

impl DepositEscrow for ReceiptEscrow {
    fn verify(&self, proof: &DepositProof) -> Result<bool, OracleError> {
        Ok(self
            .receipts
            .get(&proof.reference)
            .is_some_and(|r| r.depositor == proof.depositor && proof.amount <= r.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).unwrap()
    }

    #[test]
    fn snapshot_defaults_to_zero() {
        let balances: SnapshotBalances = [(wallet(1), 42)].into_iter().collect();
        assert_eq!(balances.weight_of(&wallet(1), Timestamp::new(0)).unwrap(), 42);
        assert_eq!(balances.weight_of(&wallet(2), Timestamp::new(0)).unwrap(), 0);
    }

    #[test]
    fn escrow_checks_reference_depositor_and_amount() {
        let escrow = ReceiptEscrow::new([EscrowReceipt {
            reference: "tx-1".into(),
            depositor: wallet(1),
            amount: 5_000,
        }]);
        let proof = |depositor, amount, reference: &str| DepositProof {
            depositor,
            amount,
            reference: reference.into(),
        };
        assert!(escrow.verify(&proof(wallet(1), 5_000, "tx-1")).unwrap());
        assert!(escrow.verify(&proof(wallet(1), 1_000, "tx-1")).unwrap());
        assert!(!escrow.verify(&proof(wallet(1), 5_001, "tx-1")).unwrap());
        assert!(!escrow.verify(&proof(wallet(2), 1_000, "tx-1")).unwrap());
        assert!(!escrow.verify(&proof(wallet(1), 1_000, "tx-2")).unwrap());
    }
}
