//! Vertical plan of the worksheet.
//!
//! Blocks are placed top to bottom by a cursor that only moves forward, so
//! one pass over the blocks decides every row and no two blocks share one.
//! Horizontally everything sits on a fixed grid of [`GRID_COLUMNS`] equal
//! columns; a field is just a column span.

use crate::config::RowHeightCalibration;
use crate::controller::FormSnapshot;
use crate::export::row_height::item_row_height;
use crate::form::{ActionKind, ProblemType, RootCause};

/// Number of equal-width columns on the sheet
pub const GRID_COLUMNS: u16 = 20;

/// Last grid column index
pub const LAST_COLUMN: u16 = GRID_COLUMNS - 1;

/// Checkboxes per row in the problem block
pub const PROBLEMS_PER_ROW: usize = 4;

/// Checkboxes per row in the action block
pub const ACTIONS_PER_ROW: usize = 3;

/// Rows of the merged free-text areas
pub const DETAIL_ROWS: u32 = 3;
pub const CAUSE_ROWS: u32 = 2;
pub const PREVENTION_ROWS: u32 = 2;

/// Inclusive column span on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: u16,
    pub last: u16,
}

impl Span {
    pub const fn new(first: u16, last: u16) -> Self {
        Span { first, last }
    }

    pub const fn full() -> Self {
        Span::new(0, LAST_COLUMN)
    }

    pub fn width(&self) -> u16 {
        self.last - self.first + 1
    }
}

/// Split the full grid into `parts` adjacent spans, wider ones first.
pub fn split_grid(parts: usize) -> Vec<Span> {
    let parts = parts.clamp(1, GRID_COLUMNS as usize) as u16;
    let base = GRID_COLUMNS / parts;
    let extra = GRID_COLUMNS % parts;
    let mut spans = Vec::with_capacity(parts as usize);
    let mut first = 0;
    for i in 0..parts {
        let width = base + u16::from(i < extra);
        spans.push(Span::new(first, first + width - 1));
        first += width;
    }
    spans
}

/// Blocks of the paper form, in page order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Header,
    Metadata,
    Items,
    Problem,
    Action,
    RootCause,
    Closing,
}

/// A block placed at `first_row`, covering `rows` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedBlock {
    pub block: Block,
    pub first_row: u32,
    pub rows: u32,
}

impl PlacedBlock {
    pub fn end_row(&self) -> u32 {
        self.first_row + self.rows
    }
}

/// Rows each block consumes for a given snapshot
pub fn block_rows(block: Block, item_count: usize) -> u32 {
    let checkbox_rows = |count: usize, per_row: usize| count.div_ceil(per_row) as u32;
    match block {
        // logo/title rows
        Block::Header => 3,
        // to/date/po, copy-to/founder
        Block::Metadata => 2,
        // column headings + one row per item
        Block::Items => 1 + item_count as u32,
        // title, checkboxes, detail label, detail area
        Block::Problem => 1 + checkbox_rows(ProblemType::ALL.len(), PROBLEMS_PER_ROW) + 1 + DETAIL_ROWS,
        // title, checkboxes, approval rows
        Block::Action => 1 + checkbox_rows(ActionKind::ALL.len(), ACTIONS_PER_ROW) + 2,
        // title, checkboxes, cause label+area, prevention label+area, responsible
        Block::RootCause => {
            1 + checkbox_rows(RootCause::ALL.len(), RootCause::ALL.len())
                + 1
                + CAUSE_ROWS
                + 1
                + PREVENTION_ROWS
                + 1
        }
        // title, QA decision, signature line, names, roles
        Block::Closing => 1 + 1 + 3,
    }
}

/// Full vertical plan: block placement and item row heights
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPlan {
    pub blocks: Vec<PlacedBlock>,
    /// Height in points of each item row, in item order
    pub item_heights: Vec<f64>,
}

impl SheetPlan {
    /// Walk the blocks once, advancing the row cursor.
    pub fn build(snapshot: &FormSnapshot, calibration: &RowHeightCalibration) -> Self {
        const ORDER: [Block; 7] = [
            Block::Header,
            Block::Metadata,
            Block::Items,
            Block::Problem,
            Block::Action,
            Block::RootCause,
            Block::Closing,
        ];

        let mut cursor = 0u32;
        let blocks = ORDER
            .iter()
            .map(|&block| {
                let rows = block_rows(block, snapshot.items.len());
                let placed = PlacedBlock {
                    block,
                    first_row: cursor,
                    rows,
                };
                cursor += rows;
                placed
            })
            .collect();

        let item_heights = snapshot
            .items
            .iter()
            .map(|item| item_row_height(item, calibration))
            .collect();

        SheetPlan { blocks, item_heights }
    }

    /// Placement of `block`
    pub fn placed(&self, block: Block) -> PlacedBlock {
        self.blocks
            .iter()
            .copied()
            .find(|p| p.block == block)
            .unwrap_or(PlacedBlock {
                block,
                first_row: self.total_rows(),
                rows: 0,
            })
    }

    /// Rows used by the whole sheet
    pub fn total_rows(&self) -> u32 {
        self.blocks.last().map(PlacedBlock::end_row).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDraft;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn snapshot(items: usize) -> FormSnapshot {
        let items = (0..items)
            .map(|i| {
                ItemDraft {
                    branch: "B".into(),
                    product_code: format!("P{i}"),
                    return_route: "R".into(),
                    ..ItemDraft::default()
                }
                .build(Uuid::new_v4())
            })
            .collect();
        FormSnapshot {
            form: Default::default(),
            items,
            document_number: None,
            taken_on: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    #[test]
    fn test_split_grid() {
        assert_eq!(split_grid(1), vec![Span::full()]);
        assert_eq!(split_grid(4), vec![Span::new(0, 4), Span::new(5, 9), Span::new(10, 14), Span::new(15, 19)]);
        let thirds = split_grid(3);
        assert_eq!(thirds, vec![Span::new(0, 6), Span::new(7, 13), Span::new(14, 19)]);
        assert_eq!(thirds.iter().map(Span::width).sum::<u16>(), GRID_COLUMNS);
    }

    #[test]
    fn test_blocks_are_contiguous_and_ordered() {
        let plan = SheetPlan::build(&snapshot(3), &RowHeightCalibration::default());
        assert_eq!(plan.blocks[0].first_row, 0);
        for pair in plan.blocks.windows(2) {
            assert_eq!(pair[0].end_row(), pair[1].first_row);
            assert!(pair[1].rows > 0);
        }
        assert_eq!(plan.placed(Block::Items).rows, 4);
        assert_eq!(plan.item_heights.len(), 3);
    }

    #[test]
    fn test_each_item_adds_one_row() {
        let cal = RowHeightCalibration::default();
        let empty = SheetPlan::build(&snapshot(0), &cal);
        let five = SheetPlan::build(&snapshot(5), &cal);
        assert_eq!(five.total_rows(), empty.total_rows() + 5);
        assert_eq!(
            five.placed(Block::Problem).first_row,
            empty.placed(Block::Problem).first_row + 5
        );
    }

    #[test]
    fn test_fixed_block_sizes() {
        assert_eq!(block_rows(Block::Problem, 0), 1 + 5 + 1 + DETAIL_ROWS);
        assert_eq!(block_rows(Block::Action, 0), 1 + 2 + 2);
        assert_eq!(block_rows(Block::RootCause, 9), 1 + 1 + 1 + 2 + 1 + 2 + 1);
    }
}
