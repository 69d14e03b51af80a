use thiserror::Error;

use agora_store::StoreError;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("heed: {0}")]
    Heed(String),

    #[error("cannot prepare data directory: {0}")]
    Io(String),

    #[error("missing key {0}")]
    NotFound(String),

    #[error("bincode: {0}")]
    Serialization(String),

    #[error("data was written with schema {found}; this build reads up to {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        Self::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(key) => StoreError::NotFound(key),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            backend => StoreError::Backend(backend.to_string()),
        }
    }
}
