//! # Store Seam
//!
//! The form never persists anything itself. It talks to an [`NcrStore`]
//! collaborator that allocates document numbers and accepts records.
//!
//! The trait is `?Send`: the browser adapter wraps JavaScript promises,
//! which cannot cross threads, and the save flow awaits every call in
//! sequence on one thread anyway.
//!
//! Adapters shipped here:
//! - [`MemoryStore`] - in-process, with failure injection for tests
//! - [`JsonFileStore`] - one locked JSON file (native only)

#[cfg(not(target_arch = "wasm32"))]
pub mod json_file;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use crate::errors::NcrError;
use crate::records::{NcrRecord, ReturnRecord};

#[cfg(not(target_arch = "wasm32"))]
pub use json_file::JsonFileStore;

/// Result type alias for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a store adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

impl From<NcrError> for StoreError {
    fn from(e: NcrError) -> Self {
        match e {
            NcrError::FileLocked { .. } => StoreError::Unavailable(e.to_string()),
            other => StoreError::Other(other.to_string()),
        }
    }
}

/// External data-store collaborator
#[async_trait(?Send)]
pub trait NcrStore {
    /// Allocate the next document number.
    ///
    /// Adapters that can only return a string may encode failure as an
    /// empty value or one starting with `ERROR`; the controller treats both
    /// as allocation failures.
    async fn next_document_number(&self) -> StoreResult<String>;

    /// Persist one NCR record
    async fn add_ncr_record(&self, record: &NcrRecord) -> StoreResult<()>;

    /// Persist one mirrored return record
    async fn add_return_record(&self, record: &ReturnRecord) -> StoreResult<()>;

    /// Existing NCR records, for autocomplete lists
    async fn ncr_records(&self) -> StoreResult<Vec<NcrRecord>>;
}

/// Format a sequential document number: `NCR-2024-001`
pub fn format_document_number(year: i32, sequence: u32) -> String {
    format!("NCR-{}-{:03}", year, sequence)
}

#[derive(Debug, Default)]
struct MemoryState {
    sequence: u32,
    ncr_records: Vec<NcrRecord>,
    return_records: Vec<ReturnRecord>,
    /// Number of NCR writes that succeed before every later one fails
    ncr_write_budget: Option<usize>,
    fail_returns: bool,
    fail_numbering: bool,
}

/// In-process store.
///
/// ```rust
/// use ncr_core::store::{MemoryStore, NcrStore};
///
/// let store = MemoryStore::with_year(2024);
/// let number = block_on(store.next_document_number());
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// assert_eq!(number.unwrap(), "NCR-2024-001");
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    year: i32,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::with_year(Utc::now().year())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store that numbers documents within a fixed year
    pub fn with_year(year: i32) -> Self {
        MemoryStore {
            year,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Let the first `n` NCR writes succeed and fail the rest
    pub fn fail_ncr_writes_after(self, n: usize) -> Self {
        self.state.lock().ncr_write_budget = Some(n);
        self
    }

    /// Fail every return-record write
    pub fn fail_return_writes(self) -> Self {
        self.state.lock().fail_returns = true;
        self
    }

    /// Fail document number allocation
    pub fn fail_numbering(self) -> Self {
        self.state.lock().fail_numbering = true;
        self
    }

    /// Seed existing records (suggestion sources)
    pub fn seed(&self, records: impl IntoIterator<Item = NcrRecord>) {
        self.state.lock().ncr_records.extend(records);
    }

    pub fn ncr_count(&self) -> usize {
        self.state.lock().ncr_records.len()
    }

    pub fn return_count(&self) -> usize {
        self.state.lock().return_records.len()
    }

    pub fn return_records(&self) -> Vec<ReturnRecord> {
        self.state.lock().return_records.clone()
    }
}

#[async_trait(?Send)]
impl NcrStore for MemoryStore {
    async fn next_document_number(&self) -> StoreResult<String> {
        let mut state = self.state.lock();
        if state.fail_numbering {
            return Err(StoreError::Unavailable("numbering service offline".to_string()));
        }
        state.sequence += 1;
        Ok(format_document_number(self.year, state.sequence))
    }

    async fn add_ncr_record(&self, record: &NcrRecord) -> StoreResult<()> {
        let mut state = self.state.lock();
        if let Some(budget) = state.ncr_write_budget {
            if budget == 0 {
                return Err(StoreError::PermissionDenied("ncr collection is read-only".to_string()));
            }
            state.ncr_write_budget = Some(budget - 1);
        }
        state.ncr_records.push(record.clone());
        Ok(())
    }

    async fn add_return_record(&self, record: &ReturnRecord) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.fail_returns {
            return Err(StoreError::PermissionDenied("returns collection is read-only".to_string()));
        }
        state.return_records.push(record.clone());
        Ok(())
    }

    async fn ncr_records(&self) -> StoreResult<Vec<NcrRecord>> {
        Ok(self.state.lock().ncr_records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormData;
    use crate::item::ItemDraft;
    use uuid::Uuid;

    fn record() -> NcrRecord {
        let item = ItemDraft {
            branch: "B".into(),
            product_code: "P".into(),
            return_route: "R".into(),
            ..ItemDraft::default()
        }
        .build(Uuid::new_v4());
        NcrRecord::new("NCR-2024-001", &item, &FormData::default())
    }

    #[test]
    fn test_document_number_format() {
        assert_eq!(format_document_number(2024, 1), "NCR-2024-001");
        assert_eq!(format_document_number(2025, 1234), "NCR-2025-1234");
    }

    #[tokio::test]
    async fn test_sequential_numbers() {
        let store = MemoryStore::with_year(2024);
        assert_eq!(store.next_document_number().await.unwrap(), "NCR-2024-001");
        assert_eq!(store.next_document_number().await.unwrap(), "NCR-2024-002");
    }

    #[tokio::test]
    async fn test_write_budget() {
        let store = MemoryStore::with_year(2024).fail_ncr_writes_after(1);
        assert!(store.add_ncr_record(&record()).await.is_ok());
        let err = store.add_ncr_record(&record()).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
        assert_eq!(store.ncr_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_returns_and_numbering() {
        let store = MemoryStore::with_year(2024).fail_return_writes().fail_numbering();
        let mirrored = ReturnRecord::mirror(&record());
        assert!(store.add_return_record(&mirrored).await.is_err());
        assert!(store.next_document_number().await.is_err());
        assert_eq!(store.return_count(), 0);
    }
}
