//! # Error Types
//!
//! Structured error types for ncr_core. Every failure point of the form
//! controller, the store seam and the exporters maps onto one variant, so a
//! caller (or the browser facade) can branch on [`NcrError::error_code`]
//! instead of parsing messages.
//!
//! ## Example
//!
//! ```rust
//! use ncr_core::errors::{NcrError, NcrResult};
//!
//! fn require_route(route: &str) -> NcrResult<()> {
//!     if route.trim().is_empty() {
//!         return Err(NcrError::incomplete_item(vec!["return_route".to_string()]));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_route("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationIssue;

/// Result type alias for ncr_core operations
pub type NcrResult<T> = Result<T, NcrError>;

/// Structured error type for form, save and export operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum NcrError {
    /// Required form fields are missing (blocking for save/print)
    #[error("Form is incomplete: {} issue(s)", issues.len())]
    ValidationFailed { issues: Vec<ValidationIssue> },

    /// The item draft lacks a mandatory field
    #[error("Item is missing required fields: {}", missing.join(", "))]
    IncompleteItem { missing: Vec<String> },

    /// No item with the given id is in the list
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    /// The edit policy refused an item change
    #[error("Not permitted to {action}")]
    PermissionDenied { action: String },

    /// `confirm_save` was called outside the confirming state
    #[error("Save cannot proceed while {state}")]
    SaveNotReady { state: String },

    /// The store could not hand out a document number
    #[error("Could not allocate a document number: {reason}")]
    NumberAllocation { reason: String },

    /// An NCR record write failed part-way through the item list
    #[error(
        "Saved {saved} of {total} item(s) for {document_number}; check write permission on the NCR store ({reason})"
    )]
    PersistFailed {
        document_number: String,
        saved: usize,
        total: usize,
        reason: String,
        sync_warnings: Vec<String>,
    },

    /// Store collaborator error outside the save loop
    #[error("Store error: {operation} - {reason}")]
    Store { operation: String, reason: String },

    /// Spreadsheet generation failed
    #[error("Export failed: {reason}")]
    Export { reason: String },

    /// Print layout compilation failed
    #[error("Print rendering failed: {reason}")]
    Render { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl NcrError {
    /// Create an IncompleteItem error
    pub fn incomplete_item(missing: Vec<String>) -> Self {
        NcrError::IncompleteItem { missing }
    }

    /// Create an ItemNotFound error
    pub fn item_not_found(id: impl ToString) -> Self {
        NcrError::ItemNotFound { id: id.to_string() }
    }

    /// Create a PermissionDenied error
    pub fn permission_denied(action: impl Into<String>) -> Self {
        NcrError::PermissionDenied {
            action: action.into(),
        }
    }

    /// Create a Store error
    pub fn store(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        NcrError::Store {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an Export error
    pub fn export(reason: impl Into<String>) -> Self {
        NcrError::Export {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        NcrError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        NcrError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if the user can simply retry (state was preserved)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NcrError::FileLocked { .. }
                | NcrError::NumberAllocation { .. }
                | NcrError::PersistFailed { .. }
                | NcrError::ValidationFailed { .. }
                | NcrError::IncompleteItem { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            NcrError::ValidationFailed { .. } => "VALIDATION_FAILED",
            NcrError::IncompleteItem { .. } => "INCOMPLETE_ITEM",
            NcrError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            NcrError::PermissionDenied { .. } => "PERMISSION_DENIED",
            NcrError::SaveNotReady { .. } => "SAVE_NOT_READY",
            NcrError::NumberAllocation { .. } => "NUMBER_ALLOCATION",
            NcrError::PersistFailed { .. } => "PERSIST_FAILED",
            NcrError::Store { .. } => "STORE_ERROR",
            NcrError::Export { .. } => "EXPORT_FAILED",
            NcrError::Render { .. } => "RENDER_FAILED",
            NcrError::FileError { .. } => "FILE_ERROR",
            NcrError::FileLocked { .. } => "FILE_LOCKED",
            NcrError::SerializationError { .. } => "SERIALIZATION_ERROR",
            NcrError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for NcrError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        NcrError::export(e.to_string())
    }
}

impl From<serde_json::Error> for NcrError {
    fn from(e: serde_json::Error) -> Self {
        NcrError::SerializationError {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = NcrError::incomplete_item(vec!["product_code".to_string()]);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("IncompleteItem"));
        let roundtrip: NcrError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(NcrError::item_not_found("x").error_code(), "ITEM_NOT_FOUND");
        assert_eq!(NcrError::permission_denied("delete items").error_code(), "PERMISSION_DENIED");
        assert_eq!(NcrError::export("boom").error_code(), "EXPORT_FAILED");
    }

    #[test]
    fn test_persist_failure_message_mentions_permission() {
        let error = NcrError::PersistFailed {
            document_number: "NCR-2024-001".to_string(),
            saved: 1,
            total: 3,
            reason: "denied".to_string(),
            sync_warnings: Vec::new(),
        };
        let msg = error.to_string();
        assert!(msg.contains("1 of 3"));
        assert!(msg.contains("permission"));
        assert!(error.is_recoverable());
    }
}
