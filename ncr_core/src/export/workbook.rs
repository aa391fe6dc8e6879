//! Worksheet writer for the NCR paper form.
//!
//! Each `write_*` function fills the rows its [`PlacedBlock`] was given and
//! nothing else. Multi-cell fields are merges over the grid; single cells are
//! written directly because a one-cell merge is rejected by the writer.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Image, Workbook, Worksheet};

use crate::config::{ExportSettings, NcrConfig};
use crate::controller::FormSnapshot;
use crate::errors::NcrResult;
use crate::export::layout::{
    split_grid, Block, PlacedBlock, SheetPlan, Span, ACTIONS_PER_ROW, CAUSE_ROWS, DETAIL_ROWS, GRID_COLUMNS,
    LAST_COLUMN, PREVENTION_ROWS, PROBLEMS_PER_ROW,
};
use crate::export::{checkbox, format_date, format_quantity};
use crate::form::{ActionKind, FormData, ProblemType, QaDisposition, RootCause};

/// A4 in Excel's paper size table
const PAPER_A4: u8 = 9;

/// Logo region: first four columns of the three header rows
const LOGO_SPAN: Span = Span::new(0, 3);
const TITLE_SPAN: Span = Span::new(4, 15);
const CONTROL_SPAN: Span = Span::new(16, 19);

/// Item table columns: span and heading
const ITEM_COLUMNS: [(Span, &str); 10] = [
    (Span::new(0, 0), "ลำดับ"),
    (Span::new(1, 2), "สาขา"),
    (Span::new(3, 4), "เลขที่อ้างอิง"),
    (Span::new(5, 8), "รหัส/ชื่อสินค้า"),
    (Span::new(9, 10), "ลูกค้า"),
    (Span::new(11, 12), "จำนวน"),
    (Span::new(13, 13), "ราคา/หน่วย"),
    (Span::new(14, 14), "ราคารวม"),
    (Span::new(15, 15), "วันหมดอายุ"),
    (Span::new(16, 19), "วิเคราะห์ปัญหา"),
];

/// Reusable cell formats
struct SheetFormats {
    title: Format,
    subtitle: Format,
    control: Format,
    section: Format,
    label: Format,
    value: Format,
    heading: Format,
    cell: Format,
    cell_center: Format,
    money: Format,
    checkbox: Format,
    text_block: Format,
    placeholder: Format,
    signature: Format,
}

impl SheetFormats {
    fn new(settings: &ExportSettings) -> Self {
        let base = Format::new()
            .set_font_name(settings.font_name.as_str())
            .set_font_size(settings.font_size)
            .set_align(FormatAlign::VerticalCenter);
        let boxed = base.clone().set_border(FormatBorder::Thin);

        SheetFormats {
            title: base
                .clone()
                .set_bold()
                .set_font_size(settings.font_size + 4.0)
                .set_align(FormatAlign::Center)
                .set_text_wrap()
                .set_border(FormatBorder::Thin),
            subtitle: base.clone().set_align(FormatAlign::Center).set_border(FormatBorder::Thin),
            control: boxed.clone().set_font_size(settings.font_size - 2.0),
            section: base
                .clone()
                .set_bold()
                .set_background_color(0xF2F2F2)
                .set_border(FormatBorder::Thin),
            label: boxed.clone().set_bold(),
            value: boxed.clone().set_text_wrap(),
            heading: boxed
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_text_wrap()
                .set_background_color(0xF2F2F2),
            cell: boxed.clone().set_text_wrap().set_align(FormatAlign::Top),
            cell_center: boxed.clone().set_align(FormatAlign::Center).set_align(FormatAlign::Top),
            money: boxed.clone().set_num_format("#,##0.00").set_align(FormatAlign::Top),
            checkbox: base.clone().set_border_left(FormatBorder::Thin).set_border_right(FormatBorder::Thin),
            text_block: boxed.clone().set_text_wrap().set_align(FormatAlign::Top),
            placeholder: boxed.clone().set_italic().set_align(FormatAlign::Center).set_text_wrap(),
            signature: boxed.set_align(FormatAlign::Center),
        }
    }
}

/// Write `text` into rows `first_row..=last_row` over `span`.
fn put(sheet: &mut Worksheet, first_row: u32, last_row: u32, span: Span, text: &str, format: &Format) -> NcrResult<()> {
    if first_row == last_row && span.first == span.last {
        sheet.write_string_with_format(first_row, span.first, text, format)?;
    } else {
        sheet.merge_range(first_row, span.first, last_row, span.last, text, format)?;
    }
    Ok(())
}

/// Single-row shorthand for [`put`]
fn put_row(sheet: &mut Worksheet, row: u32, span: Span, text: &str, format: &Format) -> NcrResult<()> {
    put(sheet, row, row, span, text, format)
}

/// Render the snapshot to `.xlsx` bytes.
///
/// `logo` is the fetched image, or `None` to print the company name in its
/// place.
pub fn render_workbook(snapshot: &FormSnapshot, config: &NcrConfig, logo: Option<&[u8]>) -> NcrResult<Vec<u8>> {
    let settings = &config.export;
    let plan = SheetPlan::build(snapshot, &settings.row_height);
    tracing::debug!(rows = plan.total_rows(), items = snapshot.items.len(), "laying out NCR sheet");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("NCR")?;
    setup_page(sheet, settings, &plan)?;

    let formats = SheetFormats::new(settings);
    let form = &snapshot.form;

    write_header(sheet, &formats, plan.placed(Block::Header), snapshot, config, logo)?;
    write_metadata(sheet, &formats, plan.placed(Block::Metadata), form)?;
    write_items(sheet, &formats, plan.placed(Block::Items), snapshot, &plan.item_heights)?;
    write_problem(sheet, &formats, plan.placed(Block::Problem), form)?;
    write_action(sheet, &formats, plan.placed(Block::Action), form)?;
    write_root_cause(sheet, &formats, plan.placed(Block::RootCause), form)?;
    write_closing(sheet, &formats, plan.placed(Block::Closing), form)?;

    Ok(workbook.save_to_buffer()?)
}

fn setup_page(sheet: &mut Worksheet, settings: &ExportSettings, plan: &SheetPlan) -> NcrResult<()> {
    let m = settings.margins;
    sheet
        .set_paper_size(PAPER_A4)
        .set_portrait()
        .set_margins(m.left, m.right, m.top, m.bottom, m.header, m.footer)
        .set_print_fit_to_pages(1, 0);

    for col in 0..GRID_COLUMNS {
        sheet.set_column_width(col, settings.column_width)?;
    }
    for row in 0..plan.total_rows() {
        sheet.set_row_height(row, settings.default_row_height)?;
    }
    if plan.total_rows() > 0 {
        sheet.set_print_area(0, 0, plan.total_rows() - 1, LAST_COLUMN)?;
    }
    Ok(())
}

// ============================================================================
// Blocks
// ============================================================================

fn write_header(
    sheet: &mut Worksheet,
    f: &SheetFormats,
    p: PlacedBlock,
    snapshot: &FormSnapshot,
    config: &NcrConfig,
    logo: Option<&[u8]>,
) -> NcrResult<()> {
    let top = p.first_row;
    let bottom = top + p.rows - 1;
    let identity = &config.identity;

    let image = logo.and_then(|bytes| match Image::new_from_buffer(bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!(error = %e, "logo is not a usable image, using text placeholder");
            None
        }
    });

    match image {
        Some(image) => {
            put(sheet, top, bottom, LOGO_SPAN, "", &f.subtitle)?;
            let settings = &config.export;
            let width_px = f64::from(LOGO_SPAN.width()) * (settings.column_width * 7.0 + 5.0);
            let height_px = f64::from(p.rows) * settings.default_row_height * 4.0 / 3.0;
            let image = image.set_scale_to_size(width_px, height_px, true);
            sheet.insert_image(top, LOGO_SPAN.first, &image)?;
        }
        None => put(sheet, top, bottom, LOGO_SPAN, &identity.company_name, &f.placeholder)?,
    }

    put(sheet, top, top + 1, TITLE_SPAN, &identity.title, &f.title)?;
    put_row(sheet, bottom, TITLE_SPAN, &identity.company_name, &f.subtitle)?;

    let numbers = snapshot.document_numbers();
    let number_text = if numbers.is_empty() { "-".to_string() } else { numbers.join(", ") };
    put_row(sheet, top, CONTROL_SPAN, &format!("เลขที่: {}", number_text), &f.control)?;
    put_row(sheet, top + 1, CONTROL_SPAN, &identity.form_code, &f.control)?;
    put_row(sheet, bottom, CONTROL_SPAN, &identity.revision, &f.control)?;
    Ok(())
}

fn write_metadata(sheet: &mut Worksheet, f: &SheetFormats, p: PlacedBlock, form: &FormData) -> NcrResult<()> {
    let r = p.first_row;

    put_row(sheet, r, Span::new(0, 1), "ถึง", &f.label)?;
    put_row(sheet, r, Span::new(2, 8), &form.to, &f.value)?;
    put_row(sheet, r, Span::new(9, 10), "วันที่", &f.label)?;
    put_row(sheet, r, Span::new(11, 14), &format_date(form.date), &f.value)?;
    put_row(sheet, r, Span::new(15, 16), "เลขที่ PO", &f.label)?;
    put_row(sheet, r, Span::new(17, 19), &form.po_number, &f.value)?;

    let r = r + 1;
    put_row(sheet, r, Span::new(0, 1), "สำเนา", &f.label)?;
    put_row(sheet, r, Span::new(2, 8), &form.copy_to, &f.value)?;
    put_row(sheet, r, Span::new(9, 10), "ผู้พบปัญหา", &f.label)?;
    put_row(sheet, r, Span::new(11, 19), &form.founder, &f.value)?;
    Ok(())
}

fn write_items(
    sheet: &mut Worksheet,
    f: &SheetFormats,
    p: PlacedBlock,
    snapshot: &FormSnapshot,
    heights: &[f64],
) -> NcrResult<()> {
    let header_row = p.first_row;
    for (span, heading) in ITEM_COLUMNS {
        put_row(sheet, header_row, span, heading, &f.heading)?;
    }

    for (i, item) in snapshot.items.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        if let Some(height) = heights.get(i) {
            sheet.set_row_height(row, *height)?;
        }

        let [no, branch, refs, product, customer, qty, unit_price, total, expiry, analysis] =
            ITEM_COLUMNS.map(|(span, _)| span);

        put_row(sheet, row, no, &(i + 1).to_string(), &f.cell_center)?;
        put_row(sheet, row, branch, &item.branch, &f.cell)?;
        put_row(sheet, row, refs, &item.references(), &f.cell)?;
        put_row(sheet, row, product, &item.product_label(), &f.cell)?;
        put_row(sheet, row, customer, &item.customer_label(), &f.cell)?;
        put_row(
            sheet,
            row,
            qty,
            &format!("{} {}", format_quantity(item.quantity), item.unit).trim().to_string(),
            &f.cell_center,
        )?;
        sheet.write_number_with_format(row, unit_price.first, item.price_per_unit, &f.money)?;
        sheet.write_number_with_format(row, total.first, item.price_bill, &f.money)?;
        put_row(sheet, row, expiry, &format_date(item.expiry_date), &f.cell_center)?;
        put_row(sheet, row, analysis, &item.analysis(), &f.cell)?;
    }
    Ok(())
}

/// Text of one problem checkbox
fn problem_box(form: &FormData, problem: ProblemType) -> String {
    let checked = form.problem == Some(problem);
    match problem {
        ProblemType::Other if checked && !form.problem_other.trim().is_empty() => {
            format!("{} {}: {}", checkbox(true), problem.display_name(), form.problem_other.trim())
        }
        _ => format!("{} {}", checkbox(checked), problem.display_name()),
    }
}

fn write_problem(sheet: &mut Worksheet, f: &SheetFormats, p: PlacedBlock, form: &FormData) -> NcrResult<()> {
    let title = p.first_row;
    put_row(sheet, title, Span::full(), "2. ลักษณะปัญหาที่พบ", &f.section)?;

    let spans = split_grid(PROBLEMS_PER_ROW);
    for (i, problem) in ProblemType::ALL.iter().enumerate() {
        let row = title + 1 + (i / PROBLEMS_PER_ROW) as u32;
        put_row(sheet, row, spans[i % PROBLEMS_PER_ROW], &problem_box(form, *problem), &f.checkbox)?;
    }

    let label = title + 1 + ProblemType::ALL.len().div_ceil(PROBLEMS_PER_ROW) as u32;
    put_row(sheet, label, Span::full(), "รายละเอียดปัญหา", &f.label)?;
    put(sheet, label + 1, label + DETAIL_ROWS, Span::full(), &form.detail, &f.text_block)?;
    Ok(())
}

/// Text of one action checkbox, with quantity and note when selected
fn action_box(form: &FormData, kind: ActionKind) -> String {
    match form.action.as_ref().filter(|a| a.kind == kind) {
        Some(action) => {
            let mut text = format!("{} {}", checkbox(true), kind.display_name());
            if !action.quantity.trim().is_empty() {
                text.push_str(&format!(" จำนวน {}", action.quantity.trim()));
            }
            if !action.note.trim().is_empty() {
                text.push_str(&format!(" ({})", action.note.trim()));
            }
            text
        }
        None => format!("{} {}", checkbox(false), kind.display_name()),
    }
}

fn write_action(sheet: &mut Worksheet, f: &SheetFormats, p: PlacedBlock, form: &FormData) -> NcrResult<()> {
    let title = p.first_row;
    put_row(sheet, title, Span::full(), "3. การดำเนินการแก้ไข", &f.section)?;

    let spans = split_grid(ACTIONS_PER_ROW);
    for (i, kind) in ActionKind::ALL.iter().enumerate() {
        let row = title + 1 + (i / ACTIONS_PER_ROW) as u32;
        put_row(sheet, row, spans[i % ACTIONS_PER_ROW], &action_box(form, *kind), &f.checkbox)?;
    }

    let r = title + 1 + ActionKind::ALL.len().div_ceil(ACTIONS_PER_ROW) as u32;
    put_row(sheet, r, Span::new(0, 2), "กำหนดแล้วเสร็จ", &f.label)?;
    put_row(sheet, r, Span::new(3, 6), &format_date(form.due_date), &f.value)?;
    put_row(sheet, r, Span::new(7, 9), "ผู้อนุมัติ", &f.label)?;
    put_row(sheet, r, Span::new(10, 13), &form.approver_name, &f.value)?;
    put_row(sheet, r, Span::new(14, 15), "ตำแหน่ง", &f.label)?;
    put_row(sheet, r, Span::new(16, 19), &form.approver_position, &f.value)?;

    let r = r + 1;
    put_row(sheet, r, Span::new(0, 2), "วันที่อนุมัติ", &f.label)?;
    put_row(sheet, r, Span::new(3, 6), &format_date(form.approver_date), &f.value)?;
    put_row(sheet, r, Span::new(7, LAST_COLUMN), "", &f.value)?;
    Ok(())
}

fn write_root_cause(sheet: &mut Worksheet, f: &SheetFormats, p: PlacedBlock, form: &FormData) -> NcrResult<()> {
    let title = p.first_row;
    put_row(sheet, title, Span::full(), "4. สาเหตุของปัญหาและการป้องกัน", &f.section)?;

    let spans = split_grid(RootCause::ALL.len());
    for (cause, span) in RootCause::ALL.iter().zip(spans) {
        let text = format!("{} {}", checkbox(form.root_cause == Some(*cause)), cause.display_name());
        put_row(sheet, title + 1, span, &text, &f.checkbox)?;
    }

    let mut r = title + 2;
    put_row(sheet, r, Span::full(), "สาเหตุ", &f.label)?;
    put(sheet, r + 1, r + CAUSE_ROWS, Span::full(), &form.cause_detail, &f.text_block)?;
    r += 1 + CAUSE_ROWS;

    put_row(sheet, r, Span::full(), "การป้องกันการเกิดซ้ำ", &f.label)?;
    put(sheet, r + 1, r + PREVENTION_ROWS, Span::full(), &form.prevention, &f.text_block)?;
    r += 1 + PREVENTION_ROWS;

    put_row(sheet, r, Span::new(0, 3), "ผู้รับผิดชอบ", &f.label)?;
    put_row(sheet, r, Span::new(4, LAST_COLUMN), &form.responsible_person, &f.value)?;
    Ok(())
}

fn write_closing(sheet: &mut Worksheet, f: &SheetFormats, p: PlacedBlock, form: &FormData) -> NcrResult<()> {
    let title = p.first_row;
    put_row(sheet, title, Span::full(), "5. ผลการตรวจสอบ (QA)", &f.section)?;

    let r = title + 1;
    for (qa, span) in [
        (QaDisposition::Accepted, Span::new(0, 4)),
        (QaDisposition::Rejected, Span::new(5, 9)),
    ] {
        let text = format!("{} {}", checkbox(form.qa == Some(qa)), qa.display_name());
        put_row(sheet, r, span, &text, &f.checkbox)?;
    }
    put_row(sheet, r, Span::new(10, 11), "เหตุผล", &f.label)?;
    put_row(sheet, r, Span::new(12, LAST_COLUMN), &form.qa_reason, &f.value)?;

    let signers = [
        (form.founder.as_str(), "ผู้พบปัญหา".to_string()),
        (
            form.approver_name.as_str(),
            format!("ผู้อนุมัติ {}", format_date(form.approver_date)),
        ),
        (form.qa_name.as_str(), format!("QA {}", format_date(form.qa_date))),
    ];
    let spans = split_grid(signers.len());
    let sign_row = r + 1;
    for ((name, role), span) in signers.iter().zip(spans) {
        put_row(sheet, sign_row, span, "ลงชื่อ ..................................", &f.signature)?;
        put_row(sheet, sign_row + 1, span, &format!("( {} )", name), &f.signature)?;
        put_row(sheet, sign_row + 2, span, role.trim(), &f.signature)?;
    }
    Ok(())
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
        form.select_problem(Some(ProblemType::Damaged));
        form.select_action(Some(CorrectiveAction::new(ActionKind::Return).with_quantity("5")));
        form.select_root_cause(Some(RootCause::Transport));
        let item = ItemDraft {
            branch: "นครสวรรค์".into(),
            product_code: "P001".into(),
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
    fn test_item_columns_cover_grid_without_overlap() {
        let mut next = 0;
        for (span, _) in ITEM_COLUMNS {
            assert_eq!(span.first, next);
            next = span.last + 1;
        }
        assert_eq!(next, GRID_COLUMNS);
    }

    #[test]
    fn test_checkbox_texts() {
        let snap = snapshot();
        assert_eq!(problem_box(&snap.form, ProblemType::Damaged), "■ สินค้าชำรุด");
        assert_eq!(problem_box(&snap.form, ProblemType::Lost), "□ สินค้าสูญหาย");
        assert_eq!(action_box(&snap.form, ActionKind::Return), "■ ส่งคืน จำนวน 5");
        assert_eq!(action_box(&snap.form, ActionKind::Destroy), "□ ทำลาย");
    }

    #[test]
    fn test_render_produces_xlsx_zip() {
        let bytes = render_workbook(&snapshot(), &NcrConfig::default(), None).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_render_empty_form() {
        let snap = FormSnapshot {
            form: FormData::default(),
            items: Vec::new(),
            document_number: None,
            taken_on: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        };
        assert!(render_workbook(&snap, &NcrConfig::default(), None).is_ok());
    }

    #[test]
    fn test_bad_logo_bytes_fall_back_to_text() {
        let bytes = render_workbook(&snapshot(), &NcrConfig::default(), Some(b"not an image")).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_many_items_render() {
        let mut snap = snapshot();
        let template = snap.items[0].clone();
        for i in 0..30 {
            let mut item = template.clone();
            item.id = Uuid::new_v4();
            item.problem_source = "ยาว ".repeat(i * 5);
            snap.items.push(item);
        }
        assert!(render_workbook(&snap, &NcrConfig::default(), None).is_ok());
    }
}
