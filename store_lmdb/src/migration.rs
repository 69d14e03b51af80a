//! Schema versioning for the LMDB environment.
//!
//! The meta table records which table layout the data was written with.
//! Opening a database stamped by a newer build fails instead of guessing.

use agora_store::MetaStore;

use crate::{LmdbError, LmdbGovernanceStore};

/// Table layout written by this build.
///
/// 1: proposals, proposals_by_time, votes, delegations, meta.
/// 2: adds proposals_by_deadline.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub struct Migrator;

impl Migrator {
    /// Upgrade the stored layout one version at a time until it is current.
    pub fn run(
        meta_store: &impl MetaStore,
        governance: &LmdbGovernanceStore,
    ) -> Result<(), LmdbError> {
        let found = meta_store.get_schema_version().map_err(backend)?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "schema current");
            return Ok(());
        }

        for from in found..CURRENT_SCHEMA_VERSION {
            upgrade_from(from, governance)?;
            meta_store.set_schema_version(from + 1).map_err(backend)?;
            tracing::info!(from, to = from + 1, "schema upgraded");
        }
        Ok(())
    }
}

fn backend(e: agora_store::StoreError) -> LmdbError {
    LmdbError::Heed(e.to_string())
}

fn upgrade_from(version: u32, governance: &LmdbGovernanceStore) -> Result<(), LmdbError> {
    match version {
        // Fresh environment; the named databases already exist.
        0 => Ok(()),
        1 => {
            let indexed = governance.rebuild_deadline_index().map_err(backend)?;
            tracing::info!(indexed, "built proposal deadline index");
            Ok(())
        }
        other => Err(LmdbError::Heed(format!("no upgrade from schema {other}"))),
    }
}
