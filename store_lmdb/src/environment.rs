//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::governance::LmdbGovernanceStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// Number of named databases opened below.
const DATABASE_COUNT: u32 = 6;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) proposals_by_time_db: Database<Bytes, Bytes>,
    pub(crate) proposals_by_deadline_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) delegations_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating the
    /// directory and any missing databases, then bring the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(max_dbs.max(DATABASE_COUNT));
        // SAFETY: each data directory is opened by a single environment per
        // process; the daemon owns its data dir exclusively.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let proposals_db = env.create_database(&mut wtxn, Some("proposals"))?;
        let proposals_by_time_db = env.create_database(&mut wtxn, Some("proposals_by_time"))?;
        let proposals_by_deadline_db =
            env.create_database(&mut wtxn, Some("proposals_by_deadline"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let delegations_db = env.create_database(&mut wtxn, Some("delegations"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            proposals_db,
            proposals_by_time_db,
            proposals_by_deadline_db,
            votes_db,
            delegations_db,
            meta_db,
        };

        Migrator::run(&environment.meta_store(), &environment.governance_store())?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    /// A handle implementing the proposal, vote and delegation stores.
    pub fn governance_store(&self) -> LmdbGovernanceStore {
        LmdbGovernanceStore {
            env: Arc::clone(&self.env),
            proposals_db: self.proposals_db,
            proposals_by_time_db: self.proposals_by_time_db,
            proposals_by_deadline_db: self.proposals_by_deadline_db,
            votes_db: self.votes_db,
            delegations_db: self.delegations_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }

    /// Flush all pending writes to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env().force_sync()?;
        Ok(())
    }
}
