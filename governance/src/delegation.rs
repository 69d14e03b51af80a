//! Vote delegation: hand your say on every proposal to a representative.
//!
//! Delegation here is a blocking marker, not a power transfer. An account
//! with an active delegation cannot vote directly, and its weight is not
//! added to the delegate's. `none → active → none`, last writer wins, no
//! history is kept.

use crate::error::GovernanceError;
use agora_store::{DelegationRecord, GovernanceStore};
use agora_types::{Clock, WalletAddress};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DelegationRegistry {
    store: Arc<dyn GovernanceStore>,
    clock: Arc<dyn Clock>,
}

impl DelegationRegistry {
    pub fn new(store: Arc<dyn GovernanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Set or replace `voter`'s delegation.
    ///
    /// `delegate` arrives unvalidated from the caller. Self-delegation is
    /// rejected and leaves any prior delegation in place.
    pub fn delegate(
        &self,
        voter: &WalletAddress,
        delegate: &str,
    ) -> Result<WalletAddress, GovernanceError> {
        let delegate = WalletAddress::parse(delegate)
            .map_err(|_| GovernanceError::InvalidAddress(delegate.to_string()))?;
        if &delegate == voter {
            return Err(GovernanceError::SelfDelegation);
        }
        let record = DelegationRecord {
            voter: voter.clone(),
            delegate: delegate.clone(),
            activated_at: self.clock.now(),
            active: true,
        };
        self.store.put_delegation(&record)?;
        info!(voter = %voter, delegate = %delegate, "delegation set");
        Ok(delegate)
    }

    /// Clear `voter`'s delegation. Returns whether anything changed.
    pub fn undelegate(&self, voter: &WalletAddress) -> Result<bool, GovernanceError> {
        let changed = self.store.deactivate_delegation(voter)?;
        if changed {
            info!(voter = %voter, "delegation cleared");
        } else {
            debug!(voter = %voter, "undelegate with no active delegation");
        }
        Ok(changed)
    }

    pub fn is_delegated(&self, voter: &WalletAddress) -> Result<bool, GovernanceError> {
        Ok(self.delegate_of(voter)?.is_some())
    }

    /// The current delegate, if the delegation is active.
    pub fn delegate_of(
        &self,
        voter: &WalletAddress,
    ) -> Result<Option<WalletAddress>, GovernanceError> {
        Ok(self
            .store
            .get_delegation(voter)?
            .filter(|r| r.active)
            .map(|r| r.delegate))
    }

    /// The active delegation record, including when it was set.
    pub fn record_of(
        &self,
        voter: &WalletAddress,
    ) -> Result<Option<DelegationRecord>, GovernanceError> {
        Ok(self.store.get_delegation(voter)?.filter(|r| r.active))
    }

    /// Accounts currently delegating to `delegate`, sorted. Informational.
    pub fn delegators_of(
        &self,
        delegate: &WalletAddress,
    ) -> Result<Vec<WalletAddress>, GovernanceError> {
        Ok(self.store.delegators_of(delegate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullClock, NullGovernanceStore};
    use agora_types::Timestamp;

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).unwrap()
    }

    fn registry() -> (DelegationRegistry, Arc<NullGovernanceStore>) {
        let store = Arc::new(NullGovernanceStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        (DelegationRegistry::new(store.clone(), clock), store)
    }

    #[test]
    fn test_delegate_and_lookup() {
        let (registry, _) = registry();
        let a = wallet(1);
        let b = wallet(2);
        registry.delegate(&a, b.as_str()).unwrap();

        assert!(registry.is_delegated(&a).unwrap());
        assert_eq!(registry.delegate_of(&a).unwrap(), Some(b.clone()));
        assert!(!registry.is_delegated(&b).unwrap());
        assert_eq!(
            registry.record_of(&a).unwrap().unwrap().activated_at,
            Timestamp::new(1_000)
        );
    }

    #[test]
    fn test_self_delegation_leaves_prior_untouched() {
        let (registry, _) = registry();
        let a = wallet(0xab);
        let b = wallet(2);
        registry.delegate(&a, b.as_str()).unwrap();

        // Mixed case normalises to the same address.
        let shouting = a.as_str().to_uppercase().replacen("0X", "0x", 1);
        assert!(matches!(
            registry.delegate(&a, &shouting),
            Err(GovernanceError::SelfDelegation)
        ));
        assert_eq!(registry.delegate_of(&a).unwrap(), Some(b));
    }

    #[test]
    fn test_invalid_delegate_address() {
        let (registry, _) = registry();
        let err = registry.delegate(&wallet(1), "0x1234").unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidAddress(s) if s == "0x1234"));
        assert!(!registry.is_delegated(&wallet(1)).unwrap());
    }

    #[test]
    fn test_undelegate_is_idempotent() {
        let (registry, _) = registry();
        let a = wallet(1);
        registry.delegate(&a, wallet(2).as_str()).unwrap();

        assert!(registry.undelegate(&a).unwrap());
        assert!(!registry.undelegate(&a).unwrap());
        assert!(!registry.undelegate(&wallet(9)).unwrap());
        assert!(!registry.is_delegated(&a).unwrap());
        assert_eq!(registry.delegate_of(&a).unwrap(), None);
    }

    #[test]
    fn test_update_delegation_overwrites() {
        let (registry, _) = registry();
        let a = wallet(1);
        registry.delegate(&a, wallet(2).as_str()).unwrap();
        registry.delegate(&a, wallet(3).as_str()).unwrap();

        assert_eq!(registry.delegate_of(&a).unwrap(), Some(wallet(3)));
        assert!(registry.delegators_of(&wallet(2)).unwrap().is_empty());
        assert_eq!(registry.delegators_of(&wallet(3)).unwrap(), vec![a]);
    }

    #[test]
    fn test_reverse_lookup_sorted() {
        let (registry, _) = registry();
        let rep = wallet(9);
        for n in [4, 1, 3] {
            registry.delegate(&wallet(n), rep.as_str()).unwrap();
        }
        registry.undelegate(&wallet(3)).unwrap();
        assert_eq!(
            registry.delegators_of(&rep).unwrap(),
            vec![wallet(1), wallet(4)]
        );
    }

    #[test]
    fn test_store_failure_is_transient() {
        let (registry, store) = registry();
        store.set_fail_writes(true);
        let err = registry.delegate(&wallet(1), wallet(2).as_str()).unwrap_err();
        assert!(err.is_transient());
    }
}
