//! # ncr_web - Browser Front End
//!
//! The page talks to one [`NcrSession`] through JSON strings: the form,
//! the item draft and the item list go in and out as JSON, errors come back
//! as a JSON object carrying the error code. The session itself is plain
//! Rust and is tested natively; the `browser` module adds the
//! `wasm-bindgen` surface, the download helper, the logo fetch and the
//! store adapter that calls into page JavaScript.

#[cfg(target_arch = "wasm32")]
pub mod browser;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use ncr_core::config::NcrConfig;
use ncr_core::controller::{FormController, FormSnapshot, SaveReport, SaveState};
use ncr_core::errors::NcrError;
use ncr_core::export::{ExcelExporter, ExportFile, LogoSource};
use ncr_core::form::FormData;
use ncr_core::item::ItemDraft;
use ncr_core::print::{print_file, PrintFonts};
use ncr_core::store::NcrStore;
use ncr_core::suggestions::load_suggestions;

/// Error as handed to the page: a JSON object string
pub type WebResult<T> = Result<T, String>;

/// JSON error payload: `{"code": ..., "message": ..., "recoverable": ..., "error": {...}}`
pub fn error_json(error: &NcrError) -> String {
    serde_json::json!({
        "code": error.error_code(),
        "message": error.to_string(),
        "recoverable": error.is_recoverable(),
        "error": error,
    })
    .to_string()
}

fn web_err(error: NcrError) -> String {
    error_json(&error)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> WebResult<String> {
    serde_json::to_string(value).map_err(|e| web_err(e.into()))
}

fn parse_id(id: &str) -> WebResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| web_err(NcrError::item_not_found(id)))
}

/// Save-button state shown by the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub save_state: SaveState,
    pub saving: bool,
    pub item_count: usize,
    pub issues: Vec<String>,
}

/// One browser tab's NCR form
#[derive(Debug)]
pub struct NcrSession {
    controller: FormController,
    exporter: ExcelExporter,
    fonts: PrintFonts,
    /// What the last successful save wrote, with its document number
    last_saved: Option<FormSnapshot>,
}

impl NcrSession {
    pub fn new(config: NcrConfig) -> Self {
        Self::with_controller(FormController::new(), config)
    }

    /// Session with a fixed date
    pub fn dated(today: NaiveDate, config: NcrConfig) -> Self {
        Self::with_controller(FormController::dated(today), config)
    }

    fn with_controller(controller: FormController, config: NcrConfig) -> Self {
        NcrSession {
            controller,
            exporter: ExcelExporter::new(config),
            fonts: PrintFonts::bundled(),
            last_saved: None,
        }
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn config(&self) -> &NcrConfig {
        self.exporter.config()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            save_state: self.controller.save_state(),
            saving: self.controller.is_saving(),
            item_count: self.controller.items().len(),
            issues: self.controller.validation_messages(),
        }
    }

    pub fn status_json(&self) -> WebResult<String> {
        to_json(&self.status())
    }

    // --- form ---

    pub fn form_json(&self) -> WebResult<String> {
        to_json(self.controller.form())
    }

    /// Replace the form fields from page JSON; missing keys become defaults.
    pub fn set_form_json(&mut self, json: &str) -> WebResult<()> {
        let mut form: FormData = serde_json::from_str(json).map_err(|e| web_err(e.into()))?;
        // keep the "other" text consistent with the selected problem
        let problem = form.problem;
        form.select_problem(problem);
        *self.controller.form_mut() = form;
        Ok(())
    }

    // --- items ---

    pub fn draft_json(&self) -> WebResult<String> {
        to_json(self.controller.draft())
    }

    pub fn set_draft_json(&mut self, json: &str) -> WebResult<()> {
        let draft: ItemDraft = serde_json::from_str(json).map_err(|e| web_err(e.into()))?;
        *self.controller.draft_mut() = draft;
        Ok(())
    }

    pub fn items_json(&self) -> WebResult<String> {
        to_json(&self.controller.items())
    }

    /// Add the draft as an item; returns the new item id.
    pub fn add_item(&mut self) -> WebResult<String> {
        self.controller.add_item().map(|id| id.to_string()).map_err(web_err)
    }

    pub fn remove_item(&mut self, id: &str) -> WebResult<()> {
        let id = parse_id(id)?;
        self.controller.remove_item(id).map(|_| ()).map_err(web_err)
    }

    /// Move an item back into the draft for editing.
    pub fn edit_item(&mut self, id: &str) -> WebResult<()> {
        let id = parse_id(id)?;
        self.controller.edit_item(id).map_err(web_err)
    }

    // --- save ---

    pub fn request_save(&mut self) -> WebResult<()> {
        self.controller.request_save().map_err(web_err)
    }

    pub fn cancel_save(&mut self) {
        self.controller.cancel_save();
    }

    /// Run the confirmed save.
    pub async fn confirm_save<S>(&mut self, store: &S, queue_print: bool) -> WebResult<SaveReport>
    where
        S: NcrStore + ?Sized,
    {
        let report = self.controller.confirm_save(store, queue_print).await.map_err(web_err)?;
        self.last_saved = Some(report.snapshot.clone());
        Ok(report)
    }

    pub fn last_saved(&self) -> Option<&FormSnapshot> {
        self.last_saved.as_ref()
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    // --- output ---

    /// Build the workbook for the current form.
    pub async fn export_excel<L>(&self, override_validation: bool, logo: &L) -> WebResult<ExportFile>
    where
        L: LogoSource + ?Sized,
    {
        let snapshot = self.controller.prepare_export(override_validation).map_err(web_err)?;
        self.exporter.export(&snapshot, logo).await.map_err(web_err)
    }

    /// Build the workbook for the last saved NCR, named after its document number.
    pub async fn export_saved_excel<L>(&self, logo: &L) -> WebResult<ExportFile>
    where
        L: LogoSource + ?Sized,
    {
        let snapshot = self.saved_snapshot()?;
        self.exporter.export(snapshot, logo).await.map_err(web_err)
    }

    /// Render the current form for printing.
    pub fn print(&self) -> WebResult<ExportFile> {
        let snapshot = self.controller.prepare_print().map_err(web_err)?;
        print_file(&snapshot, self.config(), &self.fonts).map_err(web_err)
    }

    /// Render the last saved NCR for printing.
    pub fn print_saved(&self) -> WebResult<ExportFile> {
        print_file(self.saved_snapshot()?, self.config(), &self.fonts).map_err(web_err)
    }

    /// Register a print font (TTF/OTF/TTC bytes); returns the faces added.
    pub fn add_print_font(&mut self, data: Vec<u8>) -> WebResult<usize> {
        self.fonts.add_font_data(data).map_err(web_err)
    }

    fn saved_snapshot(&self) -> WebResult<&FormSnapshot> {
        self.last_saved
            .as_ref()
            .ok_or_else(|| web_err(NcrError::export("no NCR has been saved in this session")))
    }

    /// Suggestion lists as JSON
    pub async fn suggestions_json<S>(&self, store: &S) -> WebResult<String>
    where
        S: NcrStore + ?Sized,
    {
        let suggestions = load_suggestions(store).await.map_err(web_err)?;
        to_json(&suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncr_core::export::NoLogo;
    use ncr_core::store::MemoryStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn session() -> NcrSession {
        NcrSession::dated(date(), NcrConfig::default())
    }

    fn fill(session: &mut NcrSession) {
        session
            .set_form_json(r#"{"founder": "Somchai", "problem": "Damaged", "root_cause": "Transport", "date": "2024-03-15"}"#)
            .unwrap();
        session
            .set_draft_json(
                r#"{"branch": "นครสวรรค์", "product_code": "P001", "quantity": 5, "unit": "กล่อง", "price_bill": 500, "return_route": "นครสวรรค์"}"#,
            )
            .unwrap();
        session.add_item().unwrap();
    }

    #[test]
    fn test_error_json_carries_code() {
        let value: serde_json::Value =
            serde_json::from_str(&error_json(&NcrError::item_not_found("x"))).unwrap();
        assert_eq!(value["code"], "ITEM_NOT_FOUND");
        assert!(value["message"].as_str().unwrap().contains("x"));
    }

    #[test]
    fn test_form_round_trip_and_status() {
        let mut s = session();
        assert_eq!(s.status().issues.len(), 4);
        fill(&mut s);
        assert!(s.status().issues.is_empty());
        assert_eq!(s.status().item_count, 1);

        let form: serde_json::Value = serde_json::from_str(&s.form_json().unwrap()).unwrap();
        assert_eq!(form["founder"], "Somchai");
    }

    #[test]
    fn test_other_text_dropped_when_problem_not_other() {
        let mut s = session();
        s.set_form_json(r#"{"problem": "Lost", "problem_other": "leftover"}"#).unwrap();
        assert_eq!(s.controller().form().problem_other, "");
    }

    #[test]
    fn test_incomplete_draft_reports_missing_fields() {
        let mut s = session();
        let err = s.add_item().unwrap_err();
        let value: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(value["code"], "INCOMPLETE_ITEM");
    }

    #[test]
    fn test_bad_item_id() {
        let mut s = session();
        let err = s.remove_item("not-a-uuid").unwrap_err();
        assert!(err.contains("ITEM_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_save_flow() {
        let mut s = session();
        fill(&mut s);
        let store = MemoryStore::with_year(2024);

        s.request_save().unwrap();
        let report = s.confirm_save(&store, false).await.unwrap();
        assert_eq!(report.document_number, "NCR-2024-001");
        assert_eq!(report.saved, 1);
        assert_eq!(store.ncr_count(), 1);
        assert_eq!(store.return_count(), 1);
        assert_eq!(s.status().item_count, 0);

        let suggestions: serde_json::Value =
            serde_json::from_str(&s.suggestions_json(&store).await.unwrap()).unwrap();
        assert_eq!(suggestions["founders"][0], "Somchai");
    }

    #[tokio::test]
    async fn test_export_requires_override_for_empty_form() {
        let s = session();
        assert!(s.export_excel(false, &NoLogo).await.is_err());
        let file = s.export_excel(true, &NoLogo).await.unwrap();
        assert_eq!(file.file_name, "NCR_DRAFT_2024-03-15.xlsx");
    }

    #[test]
    fn test_print_refuses_incomplete_form() {
        let err = session().print().unwrap_err();
        assert!(err.contains("VALIDATION_FAILED"));
    }

    #[tokio::test]
    async fn test_export_after_save_carries_document_number() {
        let mut s = session();
        fill(&mut s);
        let store = MemoryStore::with_year(2024);

        s.request_save().unwrap();
        s.confirm_save(&store, false).await.unwrap();

        let file = s.export_saved_excel(&NoLogo).await.unwrap();
        assert_eq!(file.file_name, "NCR_NCR-2024-001_2024-03-15.xlsx");
        assert!(file.bytes.starts_with(b"PK"));
        assert_eq!(s.last_saved().unwrap().items.len(), 1);

        // the live form was cleared by the save
        let live = s.export_excel(true, &NoLogo).await.unwrap();
        assert_eq!(live.file_name, "NCR_DRAFT_2024-03-15.xlsx");
    }

    #[tokio::test]
    async fn test_saved_output_needs_a_save() {
        let s = session();
        let err = s.export_saved_excel(&NoLogo).await.unwrap_err();
        assert!(err.contains("EXPORT_FAILED"));
        assert!(s.print_saved().unwrap_err().contains("EXPORT_FAILED"));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_saved_snapshot() {
        let mut s = session();
        fill(&mut s);
        let store = MemoryStore::with_year(2024);
        s.request_save().unwrap();
        s.confirm_save(&store, false).await.unwrap();

        fill(&mut s);
        let broken = MemoryStore::with_year(2024).fail_numbering();
        s.request_save().unwrap();
        assert!(s.confirm_save(&broken, false).await.is_err());
        assert_eq!(s.last_saved().unwrap().document_number.as_deref(), Some("NCR-2024-001"));
    }

    #[test]
    fn test_print_needs_thai_font() {
        let mut s = session();
        fill(&mut s);
        let err: serde_json::Value = serde_json::from_str(&s.print().unwrap_err()).unwrap();
        assert_eq!(err["code"], "RENDER_FAILED");
    }

    #[test]
    fn test_add_print_font_rejects_garbage() {
        let mut s = session();
        assert!(s.add_print_font(b"not a font".to_vec()).unwrap_err().contains("RENDER_FAILED"));
    }
}
