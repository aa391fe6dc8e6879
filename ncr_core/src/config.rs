//! # Configuration
//!
//! Settings for the printed/exported form. Everything has a default that
//! reproduces the company paper form; a JSON file only needs the keys it
//! wants to override.
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "identity": { "company_name": "ACME Logistics", "form_code": "FM-QA-07" },
//!   "export": { "row_height": { "analysis_chars_per_line": 30 } }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::NcrResult;
use crate::file_io::{read_json, validate_version, write_json_atomic};

/// Current schema version of config files
pub const CONFIG_SCHEMA_VERSION: &str = "0.1.0";

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcrConfig {
    pub version: String,
    pub identity: FormIdentity,
    pub export: ExportSettings,
}

impl Default for NcrConfig {
    fn default() -> Self {
        NcrConfig {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            identity: FormIdentity::default(),
            export: ExportSettings::default(),
        }
    }
}

impl NcrConfig {
    /// Load a config file, filling unspecified keys with defaults
    pub fn load(path: &Path) -> NcrResult<Self> {
        let config: NcrConfig = read_json(path)?;
        validate_version(&config.version, CONFIG_SCHEMA_VERSION)?;
        Ok(config)
    }

    /// Save atomically
    pub fn save(&self, path: &Path) -> NcrResult<()> {
        write_json_atomic(self, path)
    }
}

/// Company and document-control details printed in the header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormIdentity {
    pub company_name: String,
    pub title: String,
    pub form_code: String,
    pub revision: String,
}

impl Default for FormIdentity {
    fn default() -> Self {
        FormIdentity {
            company_name: "บริษัท ตัวอย่าง จำกัด".to_string(),
            title: "ใบรายงานสินค้าไม่เป็นไปตามข้อกำหนด (Non-Conformance Report)".to_string(),
            form_code: "FM-QA-001".to_string(),
            revision: "Rev.00".to_string(),
        }
    }
}

/// Worksheet geometry and page setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Width of each of the 20 grid columns (Excel character units)
    pub column_width: f64,
    /// Height of ordinary single-line rows (points)
    pub default_row_height: f64,
    pub margins: PageMargins,
    pub row_height: RowHeightCalibration,
    /// Where the logo image comes from (path or URL, adapter-specific)
    pub logo_location: Option<String>,
    pub font_name: String,
    pub font_size: f64,
    /// Font files for the printed PDF (paths natively, URLs in the browser).
    /// One of them must cover Thai.
    pub print_fonts: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            column_width: 4.6,
            default_row_height: 20.0,
            margins: PageMargins::default(),
            row_height: RowHeightCalibration::default(),
            logo_location: Some("assets/logo.png".to_string()),
            font_name: "TH SarabunPSK".to_string(),
            font_size: 14.0,
            print_fonts: Vec::new(),
        }
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        PageMargins {
            left: 0.25,
            right: 0.25,
            top: 0.4,
            bottom: 0.4,
            header: 0.2,
            footer: 0.2,
        }
    }
}

/// Calibration for the wrapped-text row height estimate.
///
/// The chars-per-line values are empirical for the export font at the
/// configured column width; retune them if either changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowHeightCalibration {
    pub reference_chars_per_line: usize,
    pub product_chars_per_line: usize,
    pub analysis_chars_per_line: usize,
    /// Points per wrapped line
    pub line_height: f64,
    /// Points added once per row
    pub padding: f64,
}

impl Default for RowHeightCalibration {
    fn default() -> Self {
        RowHeightCalibration {
            reference_chars_per_line: 12,
            product_chars_per_line: 22,
            analysis_chars_per_line: 28,
            line_height: 20.0,
            padding: 12.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_paper_form() {
        let cal = RowHeightCalibration::default();
        assert_eq!(cal.line_height, 20.0);
        assert_eq!(cal.padding, 12.0);
        assert!(cal.reference_chars_per_line < cal.product_chars_per_line);
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncr.json");
        std::fs::write(
            &path,
            r#"{"version":"0.1.0","export":{"row_height":{"analysis_chars_per_line":30}}}"#,
        )
        .unwrap();

        let config = NcrConfig::load(&path).unwrap();
        assert_eq!(config.export.row_height.analysis_chars_per_line, 30);
        assert!(config.export.print_fonts.is_empty());
        assert_eq!(config.export.row_height.product_chars_per_line, 22);
        assert_eq!(config.identity, FormIdentity::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncr.json");

        let mut config = NcrConfig::default();
        config.identity.company_name = "ACME".to_string();
        config.export.logo_location = None;
        config.save(&path).unwrap();

        assert_eq!(NcrConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_incompatible_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncr.json");
        std::fs::write(&path, r#"{"version":"2.0.0"}"#).unwrap();
        assert_eq!(NcrConfig::load(&path).unwrap_err().error_code(), "VERSION_MISMATCH");
    }
}
