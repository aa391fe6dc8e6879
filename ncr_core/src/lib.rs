//! # ncr_core - Non-Conformance Report Engine
//!
//! `ncr_core` holds everything about an NCR that does not depend on where it
//! runs: the form model, validation, the save flow against an external
//! store, the Excel export and the printed PDF. The browser front end
//! (`ncr_web`) is a thin layer over [`controller::FormController`].
//!
//! ## Design Philosophy
//!
//! - **JSON-First**: form data, records and errors all serialize
//! - **Closed groups**: each mutually exclusive checkbox group is one `Option<Enum>`
//! - **Store seam**: persistence goes through the [`store::NcrStore`] trait
//! - **Pure layout**: sheet placement is computed before any cell is written
//!
//! ## Quick Start
//!
//! ```rust
//! use ncr_core::controller::FormController;
//! use ncr_core::form::{ProblemType, RootCause};
//!
//! let mut controller = FormController::new();
//! controller.form_mut().founder = "Somchai".into();
//! controller.select_problem(Some(ProblemType::Damaged));
//! controller.select_root_cause(Some(RootCause::Transport));
//!
//! let draft = controller.draft_mut();
//! draft.product_code = "P001".into();
//! draft.branch = "นครสวรรค์".into();
//! draft.return_route = "นครสวรรค์".into();
//! controller.add_item().unwrap();
//!
//! assert!(controller.validate().is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`form`] - NCR fields and choice groups
//! - [`item`] - Item lines, problem origins, the item draft
//! - [`validation`] - Save/print gate
//! - [`controller`] - Form state and the save flow
//! - [`records`] - Persisted NCR and return records
//! - [`store`] - Store seam and adapters
//! - [`export`] - Excel export
//! - [`print`] - PDF rendering
//! - [`suggestions`] - Autocomplete lists
//! - [`config`] - Identity, export and calibration settings
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic writes and lock files

pub mod config;
pub mod controller;
pub mod errors;
pub mod export;
pub mod file_io;
pub mod form;
pub mod item;
pub mod print;
pub mod records;
pub mod store;
pub mod suggestions;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use config::NcrConfig;
pub use controller::{FormController, FormSnapshot, SaveReport};
pub use errors::{NcrError, NcrResult};
pub use export::{ExcelExporter, ExportFile};
pub use store::{MemoryStore, NcrStore};
