//! Row height estimate for item rows with wrapped text.
//!
//! There is no text measurement pass: each free-text column has a
//! calibrated characters-per-line figure and lines are counted from that.
//! The result is a heuristic, close to the paper form's line spacing but not
//! pixel-exact.

use crate::config::RowHeightCalibration;
use crate::item::NcrItem;

/// Wrapped line count of `text` in a column holding `chars_per_line`.
///
/// Explicit line breaks start new lines; an empty line still takes one.
pub fn wrapped_lines(text: &str, chars_per_line: usize) -> usize {
    let per_line = chars_per_line.max(1);
    text.split('\n')
        .map(|line| {
            let len = line.trim_end_matches('\r').chars().count();
            if len == 0 {
                1
            } else {
                len.div_ceil(per_line)
            }
        })
        .sum()
}

/// Height in points for a row whose free-text cells are `cells`
/// (text, chars-per-line). The tallest cell wins, with a floor of one line.
pub fn estimate_row_height(cells: &[(&str, usize)], line_height: f64, padding: f64) -> f64 {
    let lines = cells
        .iter()
        .map(|(text, per_line)| wrapped_lines(text, *per_line))
        .max()
        .unwrap_or(1)
        .max(1);
    lines as f64 * line_height + padding
}

/// Height of one item row: reference, product and analysis columns compete.
pub fn item_row_height(item: &NcrItem, calibration: &RowHeightCalibration) -> f64 {
    let references = item.references();
    let product = item.product_label();
    let analysis = item.analysis();
    estimate_row_height(
        &[
            (references.as_str(), calibration.reference_chars_per_line),
            (product.as_str(), calibration.product_chars_per_line),
            (analysis.as_str(), calibration.analysis_chars_per_line),
        ],
        calibration.line_height,
        calibration.padding,
    )
}
