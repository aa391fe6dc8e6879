//! # Form Controller
//!
//! Owns the live form, the item list and the item dialog's draft, and runs
//! the save flow against an [`NcrStore`].
//!
//! ## Save flow
//!
//! ```text
//! Idle ──request_save──▶ Validating ──issues──▶ Idle
//!                            │
//!                            ▼
//!                       Confirming ──cancel_save──▶ Idle
//!                            │
//!                      confirm_save
//!                            ▼
//!                         Saving ──▶ Idle (report or error)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ncr_core::controller::FormController;
//! use ncr_core::form::{ProblemType, RootCause};
//! use ncr_core::store::MemoryStore;
//!
//! let mut ctl = FormController::new();
//! ctl.form_mut().founder = "Somchai".to_string();
//! ctl.select_problem(Some(ProblemType::Damaged));
//! ctl.select_root_cause(Some(RootCause::Transport));
//!
//! let draft = ctl.draft_mut();
//! draft.product_code = "P001".to_string();
//! draft.branch = "นครสวรรค์".to_string();
//! draft.return_route = "นครสวรรค์".to_string();
//! ctl.add_item().unwrap();
//!
//! assert!(ctl.validate().is_empty());
//! ctl.request_save().unwrap();
//!
//! let store = MemoryStore::with_year(2024);
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let report = rt.block_on(ctl.confirm_save(&store, false)).unwrap();
//! assert_eq!(report.document_number, "NCR-2024-001");
//! assert!(ctl.items().is_empty());
//! ```

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{NcrError, NcrResult};
use crate::form::{CorrectiveAction, FormData, ProblemType, QaDisposition, RootCause};
use crate::item::{ItemDraft, NcrItem};
use crate::records::{check_document_number, NcrRecord, ReturnRecord};
use crate::store::NcrStore;
use crate::validation::{validate, ValidationIssue};

// ============================================================================
// Edit Policy
// ============================================================================

/// Capability check for changing items already in the list.
///
/// Access control, if a deployment wants any, belongs to the host system;
/// the controller only asks.
pub trait ItemEditPolicy {
    fn may_modify_items(&self) -> bool;
}

/// Policy that permits every change
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ItemEditPolicy for AllowAll {
    fn may_modify_items(&self) -> bool {
        true
    }
}

// ============================================================================
// Save State and Results
// ============================================================================

/// Where the save flow currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveState {
    #[default]
    Idle,
    Validating,
    Confirming,
    Saving,
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveState::Idle => write!(f, "idle"),
            SaveState::Validating => write!(f, "validating"),
            SaveState::Confirming => write!(f, "waiting for confirmation"),
            SaveState::Saving => write!(f, "saving"),
        }
    }
}

/// Immutable copy of everything needed to print or export a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub form: FormData,
    pub items: Vec<NcrItem>,
    /// Set once the document has been saved
    pub document_number: Option<String>,
    pub taken_on: NaiveDate,
}

impl FormSnapshot {
    /// Document numbers shown on the sheet and in file names
    pub fn document_numbers(&self) -> Vec<String> {
        self.document_number.iter().cloned().collect()
    }
}

/// A mirrored return record that could not be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncWarning {
    pub item_index: usize,
    pub product_code: String,
    pub reason: String,
}

impl std::fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "item {} ({}) saved but not sent to operations: {}",
            self.item_index + 1,
            self.product_code,
            self.reason
        )
    }
}

/// Outcome of a fully successful save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    pub document_number: String,
    pub saved: usize,
    pub total: usize,
    pub sync_warnings: Vec<SyncWarning>,
    pub print_queued: bool,
    /// What was saved; the live form has already been cleared
    pub snapshot: FormSnapshot,
}

// ============================================================================
// Controller
// ============================================================================

/// Live form state and the operations on it
pub struct FormController {
    form: FormData,
    items: Vec<NcrItem>,
    draft: ItemDraft,
    save_state: SaveState,
    policy: Box<dyn ItemEditPolicy>,
    /// Pinned date; `None` follows the local clock
    fixed_date: Option<NaiveDate>,
}

impl Default for FormController {
    fn default() -> Self {
        FormController::new()
    }
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("form", &self.form)
            .field("items", &self.items.len())
            .field("save_state", &self.save_state)
            .field("fixed_date", &self.fixed_date)
            .finish()
    }
}

impl FormController {
    /// Start a session that follows the local date
    pub fn new() -> Self {
        FormController::with_date(None)
    }

    /// Start a session pinned to a fixed date
    pub fn dated(today: NaiveDate) -> Self {
        FormController::with_date(Some(today))
    }

    fn with_date(fixed_date: Option<NaiveDate>) -> Self {
        let today = fixed_date.unwrap_or_else(|| Local::now().date_naive());
        FormController {
            form: FormData::dated(today),
            items: Vec::new(),
            draft: ItemDraft::default(),
            save_state: SaveState::Idle,
            policy: Box::new(AllowAll),
            fixed_date,
        }
    }

    /// The session date: the pinned date, or the local date right now
    pub fn today(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Replace the item edit policy
    pub fn with_policy(mut self, policy: impl ItemEditPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormData {
        &mut self.form
    }

    pub fn items(&self) -> &[NcrItem] {
        &self.items
    }

    pub fn draft(&self) -> &ItemDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ItemDraft {
        &mut self.draft
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    /// True while records are being written; the save trigger is disabled
    pub fn is_saving(&self) -> bool {
        self.save_state == SaveState::Saving
    }

    pub fn select_problem(&mut self, problem: Option<ProblemType>) {
        self.form.select_problem(problem);
    }

    pub fn select_action(&mut self, action: Option<CorrectiveAction>) {
        self.form.select_action(action);
    }

    pub fn select_root_cause(&mut self, cause: Option<RootCause>) {
        self.form.select_root_cause(cause);
    }

    pub fn set_qa(&mut self, qa: Option<QaDisposition>) {
        self.form.set_qa(qa);
    }

    // --- items ---

    /// Append the draft as a new item and clear the draft.
    ///
    /// Rejected, leaving list and draft untouched, while product code,
    /// branch or return route is blank.
    pub fn add_item(&mut self) -> NcrResult<Uuid> {
        let missing = self.draft.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(?missing, "item not added");
            return Err(NcrError::incomplete_item(missing));
        }

        let id = Uuid::new_v4();
        let item = self.draft.build(id);
        tracing::debug!(%id, product = %item.product_code, "item added");
        self.items.push(item);
        self.draft = ItemDraft::default();
        Ok(id)
    }

    /// Remove an item from the list
    pub fn remove_item(&mut self, id: Uuid) -> NcrResult<NcrItem> {
        self.check_policy("remove items")?;
        let index = self.index_of(id)?;
        Ok(self.items.remove(index))
    }

    /// Move an item back into the draft for editing.
    ///
    /// The item leaves the list; adding the draft again puts the edited
    /// version at the end.
    pub fn edit_item(&mut self, id: Uuid) -> NcrResult<()> {
        self.check_policy("edit items")?;
        let index = self.index_of(id)?;
        let item = self.items.remove(index);
        self.draft = ItemDraft::from_item(&item);
        Ok(())
    }

    fn check_policy(&self, action: &str) -> NcrResult<()> {
        if self.policy.may_modify_items() {
            Ok(())
        } else {
            Err(NcrError::permission_denied(action))
        }
    }

    fn index_of(&self, id: Uuid) -> NcrResult<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| NcrError::item_not_found(id))
    }

    // --- validation gates ---

    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate(&self.form, &self.items)
    }

    pub fn validation_messages(&self) -> Vec<String> {
        self.validate().iter().map(|i| i.message().to_string()).collect()
    }

    fn require_valid(&self) -> NcrResult<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(NcrError::ValidationFailed { issues })
        }
    }

    /// Current state as an unsaved snapshot
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            form: self.form.clone(),
            items: self.items.clone(),
            document_number: None,
            taken_on: self.today(),
        }
    }

    /// Snapshot for export.
    ///
    /// Validation is advisory here: with `override_validation` the user has
    /// confirmed exporting an incomplete form.
    pub fn prepare_export(&self, override_validation: bool) -> NcrResult<FormSnapshot> {
        if !override_validation {
            self.require_valid()?;
        }
        Ok(self.snapshot())
    }

    /// Snapshot for printing; an incomplete form is refused.
    pub fn prepare_print(&self) -> NcrResult<FormSnapshot> {
        self.require_valid()?;
        Ok(self.snapshot())
    }

    // --- save ---

    /// Validate and wait for confirmation
    pub fn request_save(&mut self) -> NcrResult<()> {
        if self.save_state == SaveState::Saving {
            return Err(NcrError::SaveNotReady {
                state: self.save_state.to_string(),
            });
        }

        self.save_state = SaveState::Validating;
        match self.require_valid() {
            Ok(()) => {
                self.save_state = SaveState::Confirming;
                Ok(())
            }
            Err(e) => {
                self.save_state = SaveState::Idle;
                Err(e)
            }
        }
    }

    /// Back out of the confirmation
    pub fn cancel_save(&mut self) {
        if self.save_state == SaveState::Confirming {
            self.save_state = SaveState::Idle;
        }
    }

    /// Write one NCR record per item, mirroring each into operations.
    ///
    /// Items are written in list order, one call at a time. The first NCR
    /// write failure stops the loop; earlier writes stay in the store and
    /// the form keeps its state for another attempt. A failed mirror write
    /// only adds a warning.
    pub async fn confirm_save<S>(&mut self, store: &S, queue_print: bool) -> NcrResult<SaveReport>
    where
        S: NcrStore + ?Sized,
    {
        if self.save_state != SaveState::Confirming {
            return Err(NcrError::SaveNotReady {
                state: self.save_state.to_string(),
            });
        }
        if let Err(e) = self.require_valid() {
            self.save_state = SaveState::Idle;
            return Err(e);
        }

        self.save_state = SaveState::Saving;
        let result = self.write_records(store).await;
        self.save_state = SaveState::Idle;

        let (document_number, sync_warnings) = result?;
        let total = self.items.len();
        let snapshot = FormSnapshot {
            document_number: Some(document_number.clone()),
            ..self.snapshot()
        };
        self.reset();

        tracing::info!(%document_number, items = total, warnings = sync_warnings.len(), "NCR saved");
        Ok(SaveReport {
            document_number,
            saved: total,
            total,
            sync_warnings,
            print_queued: queue_print,
            snapshot,
        })
    }

    async fn write_records<S>(&self, store: &S) -> NcrResult<(String, Vec<SyncWarning>)>
    where
        S: NcrStore + ?Sized,
    {
        let raw = store
            .next_document_number()
            .await
            .map_err(|e| NcrError::NumberAllocation { reason: e.to_string() })?;
        let document_number = check_document_number(&raw)?;

        let total = self.items.len();
        let mut sync_warnings = Vec::new();

        for (index, item) in self.items.iter().enumerate() {
            let record = NcrRecord::new(document_number.clone(), item, &self.form);

            if let Err(e) = store.add_ncr_record(&record).await {
                tracing::error!(%document_number, saved = index, total, error = %e, "NCR write failed");
                return Err(NcrError::PersistFailed {
                    document_number,
                    saved: index,
                    total,
                    reason: e.to_string(),
                    sync_warnings: sync_warnings.iter().map(SyncWarning::to_string).collect(),
                });
            }

            let mirrored = ReturnRecord::mirror(&record);
            if let Err(e) = store.add_return_record(&mirrored).await {
                let warning = SyncWarning {
                    item_index: index,
                    product_code: item.product_code.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!(%document_number, "{}", warning);
                sync_warnings.push(warning);
            }
        }

        Ok((document_number, sync_warnings))
    }

    /// Clear form, items and draft back to session defaults
    pub fn reset(&mut self) {
        self.form = FormData::dated(self.today());
        self.items.clear();
        self.draft = ItemDraft::default();
        self.save_state = SaveState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{NcrStatus, ReturnStatus};
    use crate::store::{MemoryStore, StoreResult};
    use async_trait::async_trait;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn fill_draft(ctl: &mut FormController, code: &str) {
        let draft = ctl.draft_mut();
        draft.product_code = code.to_string();
        draft.branch = "นครสวรรค์".to_string();
        draft.quantity = 5.0;
        draft.unit = "กล่อง".to_string();
        draft.price_bill = 500.0;
        draft.return_route = "นครสวรรค์".to_string();
    }

    fn valid_controller(item_count: usize) -> FormController {
        let mut ctl = FormController::dated(today());
        ctl.form_mut().founder = "Somchai".to_string();
        ctl.select_problem(Some(ProblemType::Damaged));
        ctl.select_root_cause(Some(RootCause::Transport));
        for i in 0..item_count {
            fill_draft(&mut ctl, &format!("P{:03}", i + 1));
            ctl.add_item().unwrap();
        }
        ctl
    }

    struct DenyAll;

    impl ItemEditPolicy for DenyAll {
        fn may_modify_items(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_add_item_requires_mandatory_fields() {
        let mut ctl = FormController::dated(today());
        fill_draft(&mut ctl, "P001");
        ctl.draft_mut().return_route.clear();

        let err = ctl.add_item().unwrap_err();
        assert_eq!(err, NcrError::incomplete_item(vec!["return_route".to_string()]));
        assert!(ctl.items().is_empty());
        assert_eq!(ctl.draft().product_code, "P001");

        ctl.draft_mut().return_route = "ลำปาง".to_string();
        let id = ctl.add_item().unwrap();
        assert_eq!(ctl.items().len(), 1);
        assert_eq!(ctl.items()[0].id, id);
        assert_eq!(ctl.draft(), &ItemDraft::default());
    }

    #[test]
    fn test_edit_moves_item_back_to_draft() {
        let mut ctl = valid_controller(2);
        let first = ctl.items()[0].id;

        ctl.edit_item(first).unwrap();
        assert_eq!(ctl.items().len(), 1);
        assert_eq!(ctl.draft().product_code, "P001");

        ctl.draft_mut().quantity = 7.0;
        ctl.add_item().unwrap();
        assert_eq!(ctl.items().len(), 2);
        assert_eq!(ctl.items()[1].quantity, 7.0);
    }

    #[test]
    fn test_remove_item_and_unknown_id() {
        let mut ctl = valid_controller(1);
        let id = ctl.items()[0].id;
        assert_eq!(ctl.remove_item(id).unwrap().product_code, "P001");
        assert_eq!(ctl.remove_item(id).unwrap_err().error_code(), "ITEM_NOT_FOUND");
    }

    #[test]
    fn test_policy_blocks_changes() {
        let mut ctl = valid_controller(1).with_policy(DenyAll);
        let id = ctl.items()[0].id;
        assert_eq!(ctl.remove_item(id).unwrap_err().error_code(), "PERMISSION_DENIED");
        assert_eq!(ctl.edit_item(id).unwrap_err().error_code(), "PERMISSION_DENIED");
        assert_eq!(ctl.items().len(), 1);
    }

    #[test]
    fn test_empty_form_gates() {
        let mut ctl = FormController::dated(today());
        assert_eq!(ctl.validation_messages().len(), 4);

        assert!(ctl.prepare_export(false).is_err());
        assert!(ctl.prepare_export(true).is_ok());
        assert_eq!(ctl.prepare_print().unwrap_err().error_code(), "VALIDATION_FAILED");

        assert!(ctl.request_save().is_err());
        assert_eq!(ctl.save_state(), SaveState::Idle);
    }

    #[test]
    fn test_request_and_cancel() {
        let mut ctl = valid_controller(1);
        ctl.request_save().unwrap();
        assert_eq!(ctl.save_state(), SaveState::Confirming);
        ctl.cancel_save();
        assert_eq!(ctl.save_state(), SaveState::Idle);
    }

    #[tokio::test]
    async fn test_confirm_requires_request() {
        let mut ctl = valid_controller(1);
        let store = MemoryStore::with_year(2024);
        let err = ctl.confirm_save(&store, false).await.unwrap_err();
        assert_eq!(err.error_code(), "SAVE_NOT_READY");
        assert_eq!(store.ncr_count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_save() {
        let mut ctl = valid_controller(1);
        let store = MemoryStore::with_year(2024);

        assert!(ctl.validate().is_empty());
        ctl.request_save().unwrap();
        let report = ctl.confirm_save(&store, true).await.unwrap();

        assert_eq!(report.document_number, "NCR-2024-001");
        assert_eq!((report.saved, report.total), (1, 1));
        assert!(report.print_queued);
        assert!(report.sync_warnings.is_empty());

        let records = store.ncr_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, NcrStatus::Open);
        assert_eq!(records[0].item.product_code, "P001");
        assert_eq!(store.return_records()[0].status, ReturnStatus::Pending);

        // saved snapshot survives, live form is cleared
        assert_eq!(report.snapshot.items.len(), 1);
        assert_eq!(report.snapshot.form.founder, "Somchai");
        assert!(ctl.items().is_empty());
        assert!(ctl.form().founder.is_empty());
        assert_eq!(ctl.form().date, Some(today()));
        assert_eq!(ctl.save_state(), SaveState::Idle);
    }

    #[test]
    fn test_unpinned_session_dates_snapshot_when_taken() {
        let ctl = FormController::new();
        let before = Local::now().date_naive();
        let taken = ctl.snapshot().taken_on;
        let after = Local::now().date_naive();
        assert!(taken == before || taken == after);
    }

    #[test]
    fn test_pinned_session_keeps_its_date() {
        let mut ctl = FormController::dated(today());
        assert_eq!(ctl.snapshot().taken_on, today());
        ctl.reset();
        assert_eq!(ctl.form().date, Some(today()));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_state() {
        for k in 0..3 {
            let mut ctl = valid_controller(3);
            let store = MemoryStore::with_year(2024).fail_ncr_writes_after(k);

            ctl.request_save().unwrap();
            let err = ctl.confirm_save(&store, false).await.unwrap_err();
            match err {
                NcrError::PersistFailed { saved, total, .. } => {
                    assert_eq!(saved, k);
                    assert_eq!(total, 3);
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(store.ncr_count(), k);
            assert!(store.return_count() <= k);
            assert_eq!(ctl.items().len(), 3);
            assert_eq!(ctl.save_state(), SaveState::Idle);
        }
    }

    #[tokio::test]
    async fn test_all_writes_succeed_at_budget() {
        let mut ctl = valid_controller(3);
        let store = MemoryStore::with_year(2024).fail_ncr_writes_after(3);
        ctl.request_save().unwrap();
        let report = ctl.confirm_save(&store, false).await.unwrap();
        assert_eq!(report.saved, 3);
        assert_eq!(store.return_count(), 3);
    }

    #[tokio::test]
    async fn test_mirror_failure_is_only_a_warning() {
        let mut ctl = valid_controller(2);
        let store = MemoryStore::with_year(2024).fail_return_writes();

        ctl.request_save().unwrap();
        let report = ctl.confirm_save(&store, false).await.unwrap();
        assert_eq!(report.saved, 2);
        assert_eq!(report.sync_warnings.len(), 2);
        assert_eq!(report.sync_warnings[1].product_code, "P002");
        assert_eq!(store.ncr_count(), 2);
        assert_eq!(store.return_count(), 0);
    }

    #[tokio::test]
    async fn test_numbering_failure_aborts() {
        let mut ctl = valid_controller(2);
        let store = MemoryStore::with_year(2024).fail_numbering();

        ctl.request_save().unwrap();
        let err = ctl.confirm_save(&store, false).await.unwrap_err();
        assert_eq!(err.error_code(), "NUMBER_ALLOCATION");
        assert_eq!(store.ncr_count(), 0);
        assert_eq!(ctl.items().len(), 2);
    }

    struct SentinelStore;

    #[async_trait(?Send)]
    impl NcrStore for SentinelStore {
        async fn next_document_number(&self) -> StoreResult<String> {
            Ok("ERROR: counter locked".to_string())
        }
        async fn add_ncr_record(&self, _record: &NcrRecord) -> StoreResult<()> {
            panic!("must not write after a sentinel number");
        }
        async fn add_return_record(&self, _record: &ReturnRecord) -> StoreResult<()> {
            panic!("must not write after a sentinel number");
        }
        async fn ncr_records(&self) -> StoreResult<Vec<NcrRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_sentinel_number_aborts() {
        let mut ctl = valid_controller(1);
        ctl.request_save().unwrap();
        let err = ctl.confirm_save(&SentinelStore, false).await.unwrap_err();
        assert_eq!(err.error_code(), "NUMBER_ALLOCATION");
        assert_eq!(ctl.items().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_status_when_qa_accepts() {
        let mut ctl = valid_controller(1);
        ctl.set_qa(Some(QaDisposition::Accepted));
        let store = MemoryStore::with_year(2024);
        ctl.request_save().unwrap();
        ctl.confirm_save(&store, false).await.unwrap();
        assert_eq!(store.ncr_records().await.unwrap()[0].status, NcrStatus::Closed);
    }
}
