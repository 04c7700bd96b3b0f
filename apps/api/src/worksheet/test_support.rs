//! Shared fixtures for worksheet engine tests.

use serde_json::{json, Value};

use crate::worksheet::config::WorksheetConfig;

/// Mirrors `config/layout.json`.
pub fn layout_doc() -> Value {
    json!({
        "year_label_template": "{year} Tax Document Checklist",
        "page_size": "LETTER",
        "margins": { "left": 40, "right": 40, "top": 30, "bottom": 40 },
        "fonts": {
            "base": "Helvetica",
            "bold": "Helvetica-Bold",
            "sizes": { "title": 20, "client_name": 14, "item_text": 10, "column_header": 10 }
        },
        "row_layout": {
            "row_height": 60,
            "item_text_width": 300,
            "textfield_width": 260,
            "textfield_height": 22,
            "gap_x": 12
        },
        "columns": {
            "checkbox_size": 14,
            "uploaded_label": "Uploaded",
            "not_needed_label": "Not Needed"
        }
    })
}

pub fn options_doc(choice_style: &str) -> Value {
    json!({
        "choice_style": choice_style,
        "prefix_mode": "auto",
        "auto_prefix": ""
    })
}

pub fn resolved_config(choice_style: &str) -> WorksheetConfig {
    WorksheetConfig::resolve(&layout_doc(), &options_doc(choice_style))
        .expect("fixture config resolves")
}

/// A request long enough to wrap over several lines of the default text column.
pub fn long_item(index: usize) -> String {
    format!(
        "Please upload your consolidated brokerage statement number {index} including every \
         1099-B, 1099-DIV and 1099-INT page, the supplemental cost basis detail, and any \
         corrected forms issued after the original mailing date."
    )
}
