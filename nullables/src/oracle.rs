//! Nullable balance oracle and deposit escrow.

use agora_types::{
    BalanceOracle, DepositEscrow, DepositProof, OracleError, Timestamp, WalletAddress,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Balances set by the test. Unknown voters have zero weight.
pub struct NullBalanceOracle {
    balances: Mutex<HashMap<WalletAddress, u64>>,
    unavailable: AtomicBool,
    queries: AtomicU64,
}

impl NullBalanceOracle {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            queries: AtomicU64::new(0),
        }
    }

    /// Builder-style balance setup.
    pub fn with_balance(self, voter: &WalletAddress, weight: u64) -> Self {
        self.set_balance(voter, weight);
        self
    }

    pub fn set_balance(&self, voter: &WalletAddress, weight: u64) {
        self.balances.lock().unwrap().insert(voter.clone(), weight);
    }

    /// Make every query fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `weight_of` calls seen so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for NullBalanceOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceOracle for NullBalanceOracle {
    fn weight_of(&self, voter: &WalletAddress, _at: Timestamp) -> Result<u64, OracleError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::new("null balance oracle", "switched off"));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(voter)
            .copied()
            .unwrap_or(0))
    }
}

/// An escrow that accepts every proof unless told otherwise.
pub struct NullDepositEscrow {
    accept: AtomicBool,
    unavailable: AtomicBool,
}

impl NullDepositEscrow {
    pub fn accepting() -> Self {
        Self {
            accept: AtomicBool::new(true),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for NullDepositEscrow {
    fn default() -> Self {
        Self::accepting()
    }
}

impl DepositEscrow for NullDepositEscrow {
    fn verify(&self, _proof: &DepositProof) -> Result<bool, OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::new("null deposit escrow", "switched off"));
        }
        Ok(self.accept.load(Ordering::SeqCst))
    }
}
