//! # Print Rendering
//!
//! Renders an NCR snapshot as an A4 PDF with Typst, for the browser's print
//! path and for archiving.
//!
//! ## Layout rules
//!
//! - Values are plain text: no input borders
//! - Choice groups print as `■` (selected) and `□` (not selected)
//! - Item rows never split across a page break
//!
//! The template is a string constant with `{{PLACEHOLDER}}` slots, filled
//! in one pass before compilation.
//!
//! ## Fonts
//!
//! The `typst-assets` fonts are always loaded, but none of them has Thai
//! glyphs. A Thai face (TH Sarabun, Noto Sans Thai, ...) must be supplied
//! through [`PrintFonts`]; rendering refuses with `RENDER_FAILED` when no
//! loaded font covers the Thai text of the page.
//!
//! ```rust,no_run
//! use ncr_core::config::NcrConfig;
//! use ncr_core::controller::FormController;
//! use ncr_core::print::{print_file, PrintFonts};
//!
//! let config = NcrConfig::default();
//! let fonts = PrintFonts::from_settings(&config.export);
//! let controller = FormController::new();
//! let snapshot = controller.prepare_print().unwrap();
//! let file = print_file(&snapshot, &config, &fonts).unwrap();
//! std::fs::write(&file.file_name, &file.bytes).unwrap();
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use chrono::Utc;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::config::{ExportSettings, NcrConfig};
use crate::controller::FormSnapshot;
use crate::errors::{NcrError, NcrResult};
use crate::export::{checkbox, export_file_name, format_date, format_quantity, ExportFile};
use crate::form::{ActionKind, FormData, ProblemType, QaDisposition, RootCause};
use crate::item::NcrItem;

/// MIME type of the printed form
pub const PDF_MIME: &str = "application/pdf";

/// Families tried after the Thai face, for Latin text and symbols
const FALLBACK_FAMILIES: [&str; 2] = ["Libertinus Serif", "DejaVu Sans Mono"];

/// Bundled fonts, parsed once
static BUNDLED: Lazy<Vec<Font>> = Lazy::new(|| {
    typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data.to_vec())))
        .collect()
});

// ============================================================================
// Fonts
// ============================================================================

/// Fonts available to the print layout.
///
/// Supplied faces come first, in the order they were added, followed by
/// the bundled `typst-assets` faces.
#[derive(Clone)]
pub struct PrintFonts {
    fonts: Vec<Font>,
    supplied: usize,
}

impl Default for PrintFonts {
    fn default() -> Self {
        Self::bundled()
    }
}

impl fmt::Debug for PrintFonts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintFonts")
            .field("supplied", &self.supplied)
            .field("families", &self.families())
            .finish()
    }
}

impl PrintFonts {
    /// Only the `typst-assets` fonts
    pub fn bundled() -> Self {
        PrintFonts {
            fonts: BUNDLED.clone(),
            supplied: 0,
        }
    }

    /// Bundled fonts plus the font files listed in `settings.print_fonts`.
    ///
    /// Files that are missing or not fonts are logged and skipped; the
    /// coverage check at render time reports what is still missing.
    pub fn from_settings(settings: &ExportSettings) -> Self {
        let mut fonts = Self::bundled();
        for location in &settings.print_fonts {
            let loaded = std::fs::read(Path::new(location))
                .map_err(|e| NcrError::file_error("read", location.as_str(), e.to_string()))
                .and_then(|data| fonts.add_font_data(data));
            if let Err(e) = loaded {
                tracing::warn!(path = %location, error = %e, "print font skipped");
            }
        }
        fonts
    }

    /// Add every face found in a TTF/OTF/TTC file, ahead of the bundled
    /// faces. Returns the number of faces added.
    pub fn add_font_data(&mut self, data: Vec<u8>) -> NcrResult<usize> {
        let added: Vec<Font> = Font::iter(Bytes::new(data)).collect();
        let Some(first) = added.first() else {
            return Err(NcrError::Render {
                reason: "font data contains no usable face".to_string(),
            });
        };
        tracing::debug!(family = %first.info().family, faces = added.len(), "print font loaded");

        let count = added.len();
        let at = self.supplied;
        self.fonts.splice(at..at, added);
        self.supplied += count;
        Ok(count)
    }

    pub fn with_font_data(mut self, data: Vec<u8>) -> NcrResult<Self> {
        self.add_font_data(data)?;
        Ok(self)
    }

    /// Family names in lookup order (one entry per face)
    pub fn families(&self) -> Vec<&str> {
        self.fonts.iter().map(|f| f.info().family.as_str()).collect()
    }

    /// Whether a single loaded face has glyphs for every non-space char of `text`
    pub fn covers(&self, text: &str) -> bool {
        self.family_covering(text).is_some()
    }

    /// First family with one face covering every non-space char of `text`
    pub fn family_covering(&self, text: &str) -> Option<&str> {
        self.fonts
            .iter()
            .find(|font| {
                let coverage = &font.info().coverage;
                text.chars()
                    .filter(|c| !c.is_whitespace())
                    .all(|c| coverage.contains(c as u32))
            })
            .map(|font| font.info().family.as_str())
    }
}

/// Distinct Thai characters of `text`, in code point order
fn thai_chars(text: &str) -> String {
    text.chars()
        .filter(|c| ('\u{0E00}'..='\u{0E7F}').contains(c))
        .collect::<BTreeSet<char>>()
        .into_iter()
        .collect()
}

// ============================================================================
// Typst World Implementation
// ============================================================================

/// Single-source Typst world with no file access.
struct PrintWorld {
    main: Source,
    book: LazyHash<FontBook>,
    library: LazyHash<Library>,
    fonts: Vec<Font>,
}

impl PrintWorld {
    fn new(source: String, fonts: &PrintFonts) -> Self {
        PrintWorld {
            main: Source::detached(source),
            book: LazyHash::new(FontBook::from_fonts(fonts.fonts.iter())),
            library: LazyHash::new(Library::default()),
            fonts: fonts.fonts.clone(),
        }
    }
}

impl World for PrintWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now().date_naive();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// Template
// ============================================================================

const NCR_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (x: 1.2cm, y: 1.2cm),
  footer: context [
    #set text(size: 8pt)
    #grid(
      columns: (1fr, 1fr),
      align(left)[{{FORM_CODE}} {{REVISION}}],
      align(right)[#counter(page).display("1/1", both: true)],
    )
  ]
)
#set table(stroke: 0.5pt, inset: 4pt)
#set table.cell(breakable: false)
#show heading: set text(size: 11pt)

#grid(
  columns: (1fr, 3fr, 1fr),
  align: (left + horizon, center + horizon, right + horizon),
  [*{{COMPANY}}*],
  [#text(size: 15pt, weight: "bold")[{{TITLE}}]],
  [เลขที่: {{NUMBERS}}],
)
#line(length: 100%, stroke: 0.5pt)

#grid(
  columns: (auto, 1fr, auto, 1fr, auto, 1fr),
  column-gutter: 6pt,
  row-gutter: 6pt,
  [*ถึง*], [{{TO}}], [*วันที่*], [{{DATE}}], [*เลขที่ PO*], [{{PO}}],
  [*สำเนา*], [{{COPY_TO}}], [*ผู้พบปัญหา*], [{{FOUNDER}}], [], [],
)

== 1\. รายการสินค้า

#table(
  columns: (auto, 1fr, 1.2fr, 2fr, 1.2fr, auto, auto, auto, auto, 2.2fr),
  align: (center, left, left, left, left, center, right, right, center, left),
  table.header(
    [*ลำดับ*], [*สาขา*], [*เลขที่อ้างอิง*], [*สินค้า*], [*ลูกค้า*],
    [*จำนวน*], [*ราคา/หน่วย*], [*ราคารวม*], [*วันหมดอายุ*], [*วิเคราะห์ปัญหา*],
  ),
{{ITEM_ROWS}}
)

== 2\. ลักษณะปัญหาที่พบ

#grid(
  columns: (1fr, 1fr, 1fr, 1fr),
  row-gutter: 4pt,
{{PROBLEM_BOXES}}
)

*รายละเอียดปัญหา:* {{DETAIL}}

== 3\. การดำเนินการแก้ไข

#grid(
  columns: (1fr, 1fr, 1fr),
  row-gutter: 4pt,
{{ACTION_BOXES}}
)

#grid(
  columns: (auto, 1fr, auto, 1fr, auto, 1fr),
  column-gutter: 6pt,
  row-gutter: 6pt,
  [*กำหนดแล้วเสร็จ*], [{{DUE_DATE}}], [*ผู้อนุมัติ*], [{{APPROVER}}], [*ตำแหน่ง*], [{{POSITION}}],
  [*วันที่อนุมัติ*], [{{APPROVER_DATE}}], [], [], [], [],
)

== 4\. สาเหตุของปัญหาและการป้องกัน

#grid(
  columns: (1fr, 1fr, 1fr, 1fr),
{{CAUSE_BOXES}}
)

*สาเหตุ:* {{CAUSE_DETAIL}}

*การป้องกันการเกิดซ้ำ:* {{PREVENTION}}

*ผู้รับผิดชอบ:* {{RESPONSIBLE}}

== 5\. ผลการตรวจสอบ (QA)

{{QA_BOXES}} #h(1em) *เหตุผล:* {{QA_REASON}}

#v(24pt)
#block(breakable: false)[
  #grid(
    columns: (1fr, 1fr, 1fr),
    align: center,
    row-gutter: 6pt,
    [ลงชื่อ ..............................], [ลงชื่อ ..............................], [ลงชื่อ ..............................],
    [( {{FOUNDER}} )], [( {{APPROVER}} )], [( {{QA_NAME}} )],
    [ผู้พบปัญหา], [ผู้อนุมัติ {{APPROVER_DATE}}], [QA {{QA_DATE}}],
  )
]
"##;

// ============================================================================
// Rendering
// ============================================================================

/// Render the snapshot to PDF bytes.
///
/// Fails with `RENDER_FAILED` when no font in `fonts` covers the Thai text
/// of the page.
pub fn render_print_pdf(snapshot: &FormSnapshot, config: &NcrConfig, fonts: &PrintFonts) -> NcrResult<Vec<u8>> {
    let body = build_source(snapshot, config);
    let thai = thai_chars(&body);
    let family = fonts.family_covering(&thai).ok_or_else(|| NcrError::Render {
        reason: format!(
            "no loaded font covers the Thai text (needs glyphs for \"{}\"); add a Thai font to export.print_fonts",
            thai
        ),
    })?;

    let source = format!("{}\n{}", text_rule(family, config), body);
    compile_pdf(source, fonts)
}

/// Render and name the printed form.
pub fn print_file(snapshot: &FormSnapshot, config: &NcrConfig, fonts: &PrintFonts) -> NcrResult<ExportFile> {
    let bytes = render_print_pdf(snapshot, config, fonts)?;
    let file_name = export_file_name(&snapshot.document_numbers(), snapshot.taken_on, "pdf");
    tracing::info!(file = %file_name, size = bytes.len(), "NCR print rendered");
    Ok(ExportFile {
        file_name,
        mime: PDF_MIME.to_string(),
        bytes,
    })
}

fn compile_pdf(source: String, fonts: &PrintFonts) -> NcrResult<Vec<u8>> {
    let world = PrintWorld::new(source, fonts);

    let warned = typst::compile(&world);
    if !warned.warnings.is_empty() {
        tracing::debug!(count = warned.warnings.len(), "print layout compiled with warnings");
    }

    let document = warned.output.map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        NcrError::Render {
            reason: format!("layout compilation failed: {}", error_msgs.join("; ")),
        }
    })?;

    typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        NcrError::Render {
            reason: format!("PDF output failed: {}", error_msgs.join("; ")),
        }
    })
}

/// `#set text` rule: the covering Thai family, the configured family, then fallbacks
fn text_rule(family: &str, config: &NcrConfig) -> String {
    let quote = |name: &str| format!("\"{}\"", name.replace(['"', '\\'], ""));
    let families: Vec<String> = [family, config.export.font_name.as_str()]
        .into_iter()
        .chain(FALLBACK_FAMILIES)
        .map(quote)
        .collect();
    format!("#set text(font: ({}), size: 10pt)", families.join(", "))
}

/// Substitute every `{{NAME}}` slot of `template` in a single scan.
///
/// Inserted text is never rescanned, so user input that looks like a slot
/// stays literal. Unknown names are left as they are.
fn fill_template(template: &str, mut value: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match value(name) {
            Some(text) => out.push_str(&text),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn build_source(snapshot: &FormSnapshot, config: &NcrConfig) -> String {
    let form = &snapshot.form;
    let identity = &config.identity;
    let numbers = snapshot.document_numbers();
    let numbers = if numbers.is_empty() { "-".to_string() } else { numbers.join(", ") };

    let problem = form.problem_label().unwrap_or_default();
    let detail = if form.detail.trim().is_empty() {
        problem
    } else {
        form.detail.clone()
    };

    fill_template(NCR_TEMPLATE, |name| {
        let text = match name {
            "FORM_CODE" => escape_typst(&identity.form_code),
            "REVISION" => escape_typst(&identity.revision),
            "COMPANY" => escape_typst(&identity.company_name),
            "TITLE" => escape_typst(&identity.title),
            "NUMBERS" => escape_typst(&numbers),
            "TO" => escape_typst(&form.to),
            "DATE" => format_date(form.date),
            "PO" => escape_typst(&form.po_number),
            "COPY_TO" => escape_typst(&form.copy_to),
            "FOUNDER" => escape_typst(&form.founder),
            "ITEM_ROWS" => build_item_rows(&snapshot.items),
            "PROBLEM_BOXES" => build_problem_boxes(form),
            "DETAIL" => escape_typst(&detail),
            "ACTION_BOXES" => build_action_boxes(form),
            "DUE_DATE" => format_date(form.due_date),
            "APPROVER" => escape_typst(&form.approver_name),
            "POSITION" => escape_typst(&form.approver_position),
            "APPROVER_DATE" => format_date(form.approver_date),
            "CAUSE_BOXES" => build_cause_boxes(form),
            "CAUSE_DETAIL" => escape_typst(&form.cause_detail),
            "PREVENTION" => escape_typst(&form.prevention),
            "RESPONSIBLE" => escape_typst(&form.responsible_person),
            "QA_BOXES" => build_qa_boxes(form),
            "QA_REASON" => escape_typst(&form.qa_reason),
            "QA_NAME" => escape_typst(&form.qa_name),
            "QA_DATE" => format_date(form.qa_date),
            _ => return None,
        };
        Some(text)
    })
}

fn build_item_rows(items: &[NcrItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let quantity = format!("{} {}", format_quantity(item.quantity), item.unit);
            format!(
                "  [{}], [{}], [{}], [{}], [{}], [{}], [{:.2}], [{:.2}], [{}], [{}],",
                i + 1,
                escape_typst(&item.branch),
                escape_typst(&item.references()),
                escape_typst(&item.product_label()),
                escape_typst(&item.customer_label()),
                escape_typst(quantity.trim()),
                item.price_per_unit,
                item.price_bill,
                format_date(item.expiry_date),
                escape_typst(&item.analysis()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_problem_boxes(form: &FormData) -> String {
    ProblemType::ALL
        .iter()
        .map(|problem| {
            let checked = form.problem == Some(*problem);
            let label = match problem {
                ProblemType::Other if checked && !form.problem_other.trim().is_empty() => {
                    format!("{}: {}", problem.display_name(), form.problem_other.trim())
                }
                _ => problem.display_name().to_string(),
            };
            format!("  [{} {}],", checkbox(checked), escape_typst(&label))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_action_boxes(form: &FormData) -> String {
    ActionKind::ALL
        .iter()
        .map(|kind| {
            let selected = form.action.as_ref().filter(|a| a.kind == *kind);
            let mut label = kind.display_name().to_string();
            if let Some(action) = selected {
                if !action.quantity.trim().is_empty() {
                    label.push_str(&format!(" จำนวน {}", action.quantity.trim()));
                }
                if !action.note.trim().is_empty() {
                    label.push_str(&format!(" ({})", action.note.trim()));
                }
            }
            format!("  [{} {}],", checkbox(selected.is_some()), escape_typst(&label))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_cause_boxes(form: &FormData) -> String {
    RootCause::ALL
        .iter()
        .map(|cause| {
            format!(
                "  [{} {}],",
                checkbox(form.root_cause == Some(*cause)),
                escape_typst(cause.display_name())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_qa_boxes(form: &FormData) -> String {
    [QaDisposition::Accepted, QaDisposition::Rejected]
        .iter()
        .map(|qa| format!("{} {}", checkbox(form.qa == Some(*qa)), qa.display_name()))
        .collect::<Vec<_>>()
        .join(" #h(1em) ")
}

/// Escape Typst markup characters in user text; line breaks are kept.
fn escape_typst(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '*' | '_' | '#' | '$' | '@' | '<' | '>' | '\\' | '`' | '[' | ']' | '~' | '=' | '-' | '+' | '/' => {
                out.push('\\');
                out.push(c);
            }
            '\r' => {}
            '\n' => out.push_str("\\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::CorrectiveAction;
    use crate::item::ItemDraft;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn snapshot() -> FormSnapshot {
        let mut form = FormData::dated(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        form.founder = "Somchai".into();
        form.detail = "กล่องบุบ\nสินค้าแตก 2 ชิ้น".into();
        form.select_problem(Some(ProblemType::Damaged));
        form.select_action(Some(CorrectiveAction::new(ActionKind::Return).with_quantity("5")));
        form.select_root_cause(Some(RootCause::Transport));
        let item = ItemDraft {
            branch: "นครสวรรค์".into(),
            product_code: "P001".into(),
            product_name: "Widget [large] *new*".into(),
            quantity: 5.0,
            unit: "กล่อง".into(),
            price_bill: 500.0,
            return_route: "นครสวรรค์".into(),
            ..ItemDraft::default()
        }
        .build(Uuid::new_v4());
        FormSnapshot {
            form,
            items: vec![item],
            document_number: Some("NCR-2024-001".into()),
            taken_on: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    #[test]
    fn test_escape_typst() {
        assert_eq!(escape_typst("a*b"), "a\\*b");
        assert_eq!(escape_typst("#x [y]"), "\\#x \\[y\\]");
        assert_eq!(escape_typst("l1\r\nl2"), "l1\\\nl2");
        assert_eq!(escape_typst("ไทย"), "ไทย");
    }

    #[test]
    fn test_source_marks_selected_boxes() {
        let source = build_source(&snapshot(), &NcrConfig::default());
        assert!(source.contains("[■ สินค้าชำรุด]"));
        assert!(source.contains("[□ สินค้าสูญหาย]"));
        assert!(source.contains("[■ การขนส่ง]"));
        assert!(source.contains("■ ส่งคืน จำนวน 5"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_user_text_is_not_expanded_as_placeholder() {
        let mut snap = snapshot();
        snap.form.to = "{{PREVENTION}}".into();
        snap.form.prevention = "strap pallets".into();

        let source = build_source(&snap, &NcrConfig::default());
        assert!(source.contains("[{{PREVENTION}}]"));
        assert_eq!(source.matches("strap pallets").count(), 1);
    }

    #[test]
    fn test_fill_template_keeps_unknown_and_unclosed_slots() {
        let filled = fill_template("a {{X}} b {{Y}} c {{Z", |name| (name == "X").then(|| "1".to_string()));
        assert_eq!(filled, "a 1 b {{Y}} c {{Z");
    }

    #[test]
    fn test_bundled_fonts_lack_thai() {
        let fonts = PrintFonts::bundled();
        assert!(fonts.covers("Non-Conformance"));
        assert!(!fonts.covers("สินค้าชำรุด"));

        let err = render_print_pdf(&snapshot(), &NcrConfig::default(), &fonts).unwrap_err();
        assert_eq!(err.error_code(), "RENDER_FAILED");
        assert!(err.to_string().contains("Thai"));
    }

    #[test]
    fn test_page_labels_need_thai_glyphs() {
        let thai = thai_chars(&build_source(&snapshot(), &NcrConfig::default()));
        assert!(thai.contains('ส'));
        assert!(thai.chars().all(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c)));
    }

    #[test]
    fn test_supplied_font_is_looked_up_first() {
        let data = typst_assets::fonts().last().unwrap().to_vec();
        let family = Font::new(Bytes::new(data.clone()), 0).unwrap().info().family.clone();

        let fonts = PrintFonts::bundled().with_font_data(data).unwrap();
        assert_eq!(fonts.families()[0], family);
        assert_eq!(fonts.families().len(), PrintFonts::bundled().families().len() + 1);
    }

    #[test]
    fn test_invalid_font_data_rejected() {
        let err = PrintFonts::bundled().with_font_data(b"not a font".to_vec()).unwrap_err();
        assert_eq!(err.error_code(), "RENDER_FAILED");
    }

    #[test]
    fn test_font_files_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.otf");
        std::fs::write(&path, typst_assets::fonts().next().unwrap()).unwrap();

        let mut settings = ExportSettings::default();
        settings.print_fonts = vec![
            "/nonexistent/Sarabun-Regular.ttf".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let fonts = PrintFonts::from_settings(&settings);
        assert_eq!(fonts.families().len(), PrintFonts::bundled().families().len() + 1);
    }

    #[test]
    fn test_text_rule_strips_quotes() {
        let mut config = NcrConfig::default();
        config.export.font_name = "Bad\"Name".into();
        let rule = text_rule("Sarabun", &config);
        assert_eq!(
            rule,
            "#set text(font: (\"Sarabun\", \"BadName\", \"Libertinus Serif\", \"DejaVu Sans Mono\"), size: 10pt)"
        );
    }

    #[test]
    fn test_pdf_generation() {
        // layout check only: bundled fonts draw the Thai labels as tofu
        let config = NcrConfig::default();
        let source = format!("{}\n{}", text_rule("Libertinus Serif", &config), build_source(&snapshot(), &config));
        let pdf = compile_pdf(source, &PrintFonts::bundled());
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let pdf_bytes = pdf.unwrap();
        assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        assert!(pdf_bytes.len() > 1000, "PDF seems too small");
    }
}
