//! Governance policy parameters.
//!
//! Quorum threshold and minimum deposit are policy, not code: the daemon
//! loads them from its TOML config, and tests construct them directly.

use serde::{Deserialize, Serialize};

const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Minimum total participating weight for an outcome to be binding.
    #[serde(default = "default_quorum_threshold")]
    pub quorum_threshold: u64,

    /// Minimum escrowed deposit to open a proposal, in governance tokens.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: u64,

    /// Voting period used when a draft does not ask for one.
    #[serde(default = "default_voting_period_secs")]
    pub default_voting_period_secs: u64,

    /// Longest voting period a draft may ask for.
    #[serde(default = "default_max_voting_period_secs")]
    pub max_voting_period_secs: u64,

    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,

    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,
}

fn default_quorum_threshold() -> u64 {
    1_000_000
}

fn default_min_deposit() -> u64 {
    1_000
}

fn default_voting_period_secs() -> u64 {
    7 * DAY_SECS
}

fn default_max_voting_period_secs() -> u64 {
    30 * DAY_SECS
}

fn default_max_title_len() -> usize {
    200
}

fn default_max_description_len() -> usize {
    20_000
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            quorum_threshold: default_quorum_threshold(),
            min_deposit: default_min_deposit(),
            default_voting_period_secs: default_voting_period_secs(),
            max_voting_period_secs: default_max_voting_period_secs(),
            max_title_len: default_max_title_len(),
            max_description_len: default_max_description_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let params: GovernanceParams = toml::from_str("").unwrap();
        assert_eq!(params, GovernanceParams::default());
        assert_eq!(params.min_deposit, 1_000);
    }

    #[test]
    fn partial_toml_overrides() {
        let params: GovernanceParams = toml::from_str("quorum_threshold = 1000").unwrap();
        assert_eq!(params.quorum_threshold, 1_000);
        assert_eq!(params.default_voting_period_secs, 7 * DAY_SECS);
    }
}
