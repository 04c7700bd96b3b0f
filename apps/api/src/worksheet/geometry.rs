//! Horizontal column plan, computed once per document.
//!
//! Columns are laid out right to left: the not-needed widget hugs the right margin,
//! the uploaded widget sits one fixed spacing to its left, and the note field takes
//! everything between the left margin and a fixed gap before the uploaded widget.
//! Wrapped item text shares the note-field column.

use crate::worksheet::config::LayoutConfig;
use crate::worksheet::BuildError;

/// Distance between the left edges of the two widget columns.
pub const CHOICE_COLUMN_SPACING: f32 = 72.0;
/// Gap between the note field's right edge and the uploaded widget.
pub const NOTE_FIELD_GAP: f32 = 24.0;
/// Narrowest usable note-field column.
pub const MIN_NOTE_FIELD_WIDTH: f32 = 210.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryPlan {
    /// Left edge of the text and note-field column.
    pub text_x: f32,
    pub note_field_width: f32,
    pub uploaded_x: f32,
    pub not_needed_x: f32,
}

impl GeometryPlan {
    /// Derives the column plan, rejecting layouts whose right-hand columns leave
    /// less than [`MIN_NOTE_FIELD_WIDTH`] for the note field.
    pub fn plan(layout: &LayoutConfig) -> Result<Self, BuildError> {
        let margins = &layout.margins;
        let widget_size = layout.row_layout.checkbox_size;

        let not_needed_x = layout.page_size.width - margins.right - widget_size;
        let uploaded_x = not_needed_x - CHOICE_COLUMN_SPACING;
        let note_field_right = uploaded_x - NOTE_FIELD_GAP;

        let text_x = margins.left;
        let note_field_width = note_field_right - text_x;
        if note_field_width < MIN_NOTE_FIELD_WIDTH {
            return Err(BuildError::InsufficientSpace {
                available: note_field_width,
                required: MIN_NOTE_FIELD_WIDTH,
            });
        }

        Ok(Self {
            text_x,
            note_field_width,
            uploaded_x,
            not_needed_x,
        })
    }

    /// Wrapped item text uses the same column as the note field.
    pub fn text_column_width(&self) -> f32 {
        self.note_field_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::config::resolve_layout;
    use crate::worksheet::test_support::layout_doc;
    use serde_json::json;

    #[test]
    fn test_plan_default_letter_layout() {
        let layout = resolve_layout(&layout_doc()).unwrap();
        let plan = GeometryPlan::plan(&layout).unwrap();
        // 612 - 40 - 14 = 558; 558 - 72 = 486; 486 - 24 - 40 = 422
        assert_eq!(plan.not_needed_x, 558.0);
        assert_eq!(plan.uploaded_x, 486.0);
        assert_eq!(plan.text_x, 40.0);
        assert_eq!(plan.note_field_width, 422.0);
        assert_eq!(plan.text_column_width(), plan.note_field_width);
    }

    #[test]
    fn test_plan_rejects_narrow_page() {
        let mut doc = layout_doc();
        doc["page_size"] = json!([300, 792]);
        let layout = resolve_layout(&doc).unwrap();
        match GeometryPlan::plan(&layout) {
            Err(BuildError::InsufficientSpace { available, required }) => {
                assert!(available < required);
                assert_eq!(required, MIN_NOTE_FIELD_WIDTH);
            }
            other => panic!("expected InsufficientSpace, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_accepts_exact_minimum() {
        // width = page - right - size - 72 - 24 - left = 210
        let mut doc = layout_doc();
        doc["page_size"] = json!([400.0, 792.0]);
        doc["columns"]["checkbox_size"] = json!(14.0);
        doc["margins"]["left"] = json!(40.0);
        doc["margins"]["right"] = json!(40.0);
        let layout = resolve_layout(&doc).unwrap();
        let plan = GeometryPlan::plan(&layout).unwrap();
        assert!((plan.note_field_width - MIN_NOTE_FIELD_WIDTH).abs() < 1e-4);
    }

    #[test]
    fn test_large_widgets_shrink_note_field() {
        // 612 - 40 - 250 - 72 - 24 - 40 = 186 < 210
        let mut doc = layout_doc();
        doc["columns"]["checkbox_size"] = json!(250);
        let layout = resolve_layout(&doc).unwrap();
        assert!(matches!(
            GeometryPlan::plan(&layout),
            Err(BuildError::InsufficientSpace { .. })
        ));
    }
}
