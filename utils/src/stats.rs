//! Named activity counters shared across threads.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters fixed at construction. Bumping a name that was never registered
/// does nothing.
pub struct StatsCounter {
    slots: Vec<(&'static str, AtomicU64)>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let mut slots: Vec<_> = names.iter().map(|&n| (n, AtomicU64::new(0))).collect();
        slots.sort_by_key(|(n, _)| *n);
        slots.dedup_by_key(|(n, _)| *n);
        Self { slots }
    }

    fn slot(&self, name: &str) -> Option<&AtomicU64> {
        self.slots
            .binary_search_by_key(&name, |(n, _)| *n)
            .ok()
            .map(|i| &self.slots[i].1)
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.slot(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.slot(name).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.slots
            .iter()
            .map(|(n, c)| (*n, c.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unregistered_names_stay_zero() {
        let stats = StatsCounter::new(&["votes_cast", "votes_cast"]);
        stats.increment("proposals_created");
        assert_eq!(stats.get("proposals_created"), 0);
        assert_eq!(stats.snapshot().len(), 1);
    }

    #[test]
    fn parallel_votes_are_all_counted() {
        let stats = Arc::new(StatsCounter::new(&["votes_cast", "votes_rejected"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || (0..1000).for_each(|_| stats.increment("votes_cast")))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.get("votes_cast"), 8000);
        assert_eq!(stats.get("votes_rejected"), 0);
    }
}
