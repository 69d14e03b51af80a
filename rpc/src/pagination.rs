//! Cursor-based pagination for list endpoints.
//!
//! A cursor is the hex encoding of the last returned proposal's position in
//! the listing order, so pages stay stable while new proposals arrive.

use agora_store::ProposalCursor;
use serde::Serialize;

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Default)]
pub struct PaginationParams {
    pub cursor: Option<String>,
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Effective page size, clamped to [1, MAX_PAGE_SIZE].
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// The decoded cursor. `Err` holds the raw value when it is malformed.
    pub fn decode(&self) -> Result<Option<ProposalCursor>, String> {
        match self.cursor.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => decode_cursor(raw).map(Some).ok_or_else(|| raw.to_string()),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Cursor to pass for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

pub fn encode_cursor(cursor: &ProposalCursor) -> String {
    hex::encode(cursor.to_key())
}

pub fn decode_cursor(raw: &str) -> Option<ProposalCursor> {
    let bytes = hex::decode(raw).ok()?;
    ProposalCursor::from_key(&bytes)
}
