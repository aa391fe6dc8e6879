//! Excel export of an NCR snapshot.
//!
//! The sheet is laid out in two steps: [`layout::SheetPlan`] decides which
//! rows each block of the paper form occupies, then [`workbook`] writes the
//! cells. The logo is fetched through a [`LogoSource`] and is the only input
//! whose failure is tolerated.
//!
//! ```rust,ignore
//! let snapshot = controller.prepare_export(false)?;
//! let file = ExcelExporter::new(config).export(&snapshot, &NoLogo).await?;
//! // file.file_name == "NCR_NCR-2024-001_2024-03-15.xlsx"
//! ```

pub mod layout;
pub mod logo;
pub mod row_height;
pub mod workbook;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::NcrConfig;
use crate::controller::FormSnapshot;
use crate::errors::NcrResult;

pub use logo::{FileLogo, LogoSource, NoLogo, StaticLogo};

/// MIME type of `.xlsx` files
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished file ready to hand to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// `NCR_<numbers>_<date>.<ext>`; numbers are joined with `-`, or `DRAFT`
/// when the NCR has not been saved.
pub fn export_file_name(document_numbers: &[String], date: NaiveDate, extension: &str) -> String {
    let numbers = if document_numbers.is_empty() {
        "DRAFT".to_string()
    } else {
        document_numbers.join("-")
    };
    format!("NCR_{}_{}.{}", numbers, date.format("%Y-%m-%d"), extension)
}

/// Checkbox glyph
pub(crate) fn checkbox(checked: bool) -> &'static str {
    if checked {
        "■"
    } else {
        "□"
    }
}

/// `dd/mm/yyyy`, empty when unset
pub(crate) fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

/// Whole quantities print without decimals
pub(crate) fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{:.2}", quantity)
    }
}

/// Renders snapshots to workbooks using one configuration
#[derive(Debug, Clone, Default)]
pub struct ExcelExporter {
    config: NcrConfig,
}

impl ExcelExporter {
    pub fn new(config: NcrConfig) -> Self {
        ExcelExporter { config }
    }

    pub fn config(&self) -> &NcrConfig {
        &self.config
    }

    /// Workbook bytes for `snapshot` with an already fetched logo.
    pub fn render(&self, snapshot: &FormSnapshot, logo: Option<&[u8]>) -> NcrResult<Vec<u8>> {
        workbook::render_workbook(snapshot, &self.config, logo)
    }

    /// Fetch the logo, render, and name the file.
    ///
    /// A logo that cannot be fetched is logged and replaced by the company
    /// name; any other failure aborts the export.
    pub async fn export<L>(&self, snapshot: &FormSnapshot, logo: &L) -> NcrResult<ExportFile>
    where
        L: LogoSource + ?Sized,
    {
        let logo_bytes = match logo.fetch_logo().await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                tracing::warn!("logo source returned no bytes, using text placeholder");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "logo unavailable, using text placeholder");
                None
            }
        };

        let bytes = self.render(snapshot, logo_bytes.as_deref())?;
        let file_name = export_file_name(&snapshot.document_numbers(), snapshot.taken_on, "xlsx");
        tracing::info!(file = %file_name, size = bytes.len(), "NCR workbook exported");

        Ok(ExportFile {
            file_name,
            mime: XLSX_MIME.to_string(),
            bytes,
        })
    }
}
