//! Row sizing and the page-break decision.
//!
//! A row is: top padding, the wrapped text block, the note field, bottom padding.
//! Its height is content driven, so whether item k fits depends on every row drawn
//! since the last header; the decision is made one row at a time.

use crate::worksheet::config::RowLayout;
use crate::worksheet::text::WrappedText;

/// Space between a row's top edge and the first text baseline.
pub const TEXT_TOP_PADDING: f32 = 18.0;
/// Space between the text block and the note field.
pub const NOTE_FIELD_PADDING: f32 = 0.0;
/// Space below the note field.
pub const BOTTOM_PADDING: f32 = 12.0;

/// Vertical plan for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPlan {
    pub lines: Vec<String>,
    pub line_height: f32,
    pub text_block_height: f32,
    /// Never below the configured minimum row height.
    pub row_height: f32,
}

impl RowPlan {
    pub fn compose(wrapped: WrappedText, row: &RowLayout) -> Self {
        let text_block_height = wrapped.block_height();
        let required = TEXT_TOP_PADDING
            + text_block_height
            + NOTE_FIELD_PADDING
            + row.textfield_height
            + BOTTOM_PADDING;
        Self {
            lines: wrapped.lines,
            line_height: wrapped.line_height,
            text_block_height,
            row_height: row.row_height.max(required),
        }
    }

    /// Bottom edge of the note field for a row whose top is at `row_top`.
    pub fn note_field_y(&self, row_top: f32, note_field_height: f32) -> f32 {
        row_top - TEXT_TOP_PADDING - self.text_block_height - NOTE_FIELD_PADDING - note_field_height
    }
}

/// Outcome of asking whether the next row fits on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Fits,
    /// Close the page and start a new one before drawing the row.
    BreakBefore,
    /// The row is taller than an empty page; it is drawn anyway so the build
    /// always terminates.
    Oversize,
}

/// Mutable vertical position within the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub row_top: f32,
    pub page_number: u32,
    rows_on_page: usize,
}

impl PageCursor {
    /// Cursor for page 1 with rows starting at `row_top`.
    pub fn new(row_top: f32) -> Self {
        Self {
            row_top,
            page_number: 1,
            rows_on_page: 0,
        }
    }

    pub fn decide(&self, row_height: f32, bottom_margin: f32) -> Placement {
        if self.row_top - row_height >= bottom_margin {
            Placement::Fits
        } else if self.rows_on_page == 0 {
            Placement::Oversize
        } else {
            Placement::BreakBefore
        }
    }

    /// Moves to the next page, resuming at that page's header bottom.
    pub fn start_page(&mut self, page_number: u32, row_top: f32) {
        self.page_number = page_number;
        self.row_top = row_top;
        self.rows_on_page = 0;
    }

    pub fn advance(&mut self, row_height: f32) {
        self.row_top -= row_height;
        self.rows_on_page += 1;
    }

    pub fn rows_on_page(&self) -> usize {
        self.rows_on_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_layout(min_height: f32) -> RowLayout {
        RowLayout {
            row_height: min_height,
            item_text_width: 300.0,
            textfield_width: 260.0,
            textfield_height: 22.0,
            gap_x: 12.0,
            checkbox_size: 14.0,
        }
    }

    fn wrapped(lines: usize) -> WrappedText {
        WrappedText {
            lines: vec!["line".to_string(); lines],
            line_height: 12.0,
        }
    }

    #[test]
    fn test_minimum_height_wins_for_short_rows() {
        // 18 + 12 + 0 + 22 + 12 = 64 < 80
        let plan = RowPlan::compose(wrapped(1), &row_layout(80.0));
        assert_eq!(plan.row_height, 80.0);
        assert_eq!(plan.text_block_height, 12.0);
    }

    #[test]
    fn test_content_height_wins_for_wrapped_rows() {
        // 18 + 36 + 0 + 22 + 12 = 88
        let plan = RowPlan::compose(wrapped(3), &row_layout(60.0));
        assert_eq!(plan.row_height, 88.0);
    }

    #[test]
    fn test_note_field_sits_below_text_block() {
        let plan = RowPlan::compose(wrapped(2), &row_layout(60.0));
        // 600 - 18 - 24 - 0 - 22
        assert_eq!(plan.note_field_y(600.0, 22.0), 536.0);
        assert!(plan.note_field_y(600.0, 22.0) >= 600.0 - plan.row_height);
    }

    #[test]
    fn test_decide_fits_and_breaks() {
        let mut cursor = PageCursor::new(200.0);
        assert_eq!(cursor.decide(160.0, 40.0), Placement::Fits);
        cursor.advance(100.0);
        assert_eq!(cursor.row_top, 100.0);
        // 100 - 60 = 40, exactly at the margin, still fits
        assert_eq!(cursor.decide(60.0, 40.0), Placement::Fits);
        assert_eq!(cursor.decide(61.0, 40.0), Placement::BreakBefore);
    }

    #[test]
    fn test_oversize_row_on_empty_page() {
        let mut cursor = PageCursor::new(200.0);
        assert_eq!(cursor.decide(500.0, 40.0), Placement::Oversize);
        cursor.advance(500.0);
        cursor.start_page(2, 200.0);
        assert_eq!(cursor.page_number, 2);
        assert_eq!(cursor.rows_on_page(), 0);
        assert_eq!(cursor.decide(500.0, 40.0), Placement::Oversize);
    }
}
