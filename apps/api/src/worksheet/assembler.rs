//! Drives the item sequence through row composition and page rendering.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::worksheet::config::{OptionsConfig, WorksheetConfig, FALLBACK_TITLE};
use crate::worksheet::geometry::GeometryPlan;
use crate::worksheet::pdf::PdfCanvas;
use crate::worksheet::render::{PageRenderer, RowPlacement};
use crate::worksheet::row::{PageCursor, Placement, RowPlan};
use crate::worksheet::text::{prefix_item, wrap_text};
use crate::worksheet::BuildError;

/// Per-request input to a build.
#[derive(Debug, Clone, PartialEq)]
pub struct WorksheetJob {
    pub client_name: String,
    pub tax_year: Option<String>,
    pub items: Vec<String>,
}

/// One document request as it will be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// 1-based; used in field names.
    pub index: usize,
    pub raw: String,
    pub display: String,
}

impl Item {
    pub fn new(index: usize, raw: &str, options: &OptionsConfig) -> Self {
        Self {
            index,
            raw: raw.to_string(),
            display: prefix_item(raw, options),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedWorksheet {
    pub pdf: Vec<u8>,
    pub page_count: u32,
    pub rows: Vec<RowPlacement>,
}

impl RenderedWorksheet {
    /// Selection widgets emitted: always two per item.
    pub fn widget_count(&self) -> usize {
        self.rows.iter().map(|row| row.widgets.len()).sum()
    }

    pub fn note_field_count(&self) -> usize {
        self.rows.len()
    }
}

/// Builds the complete worksheet PDF for `job`.
///
/// Fails before drawing anything when there are no items or the configured columns
/// leave too little room for the note field.
pub fn build_worksheet(
    job: &WorksheetJob,
    config: &WorksheetConfig,
) -> Result<RenderedWorksheet, BuildError> {
    if job.items.is_empty() {
        return Err(BuildError::NoItems);
    }
    let geometry = GeometryPlan::plan(&config.layout)?;

    let layout = &config.layout;
    let fonts = &layout.fonts;
    let bottom = layout.margins.bottom;
    let renderer = PageRenderer::new(config, geometry, &job.client_name, job.tax_year.as_deref());
    let mut canvas = PdfCanvas::new(layout.page_size.width, layout.page_size.height);
    let mut cursor = PageCursor::new(renderer.start_page(&mut canvas)?);
    let mut rows = Vec::with_capacity(job.items.len());

    for (offset, raw) in job.items.iter().enumerate() {
        let item = Item::new(offset + 1, raw, &config.options);
        let wrapped = wrap_text(
            &item.display,
            fonts.base,
            fonts.item_text_size,
            geometry.text_column_width(),
        );
        let plan = RowPlan::compose(wrapped, &layout.row_layout);

        if cursor.decide(plan.row_height, bottom) == Placement::BreakBefore {
            let filled = cursor.rows_on_page();
            let row_top = renderer.start_page(&mut canvas)?;
            cursor.start_page(canvas.page_number(), row_top);
            debug!(
                item = item.index,
                page = cursor.page_number,
                previous_page_rows = filled,
                row_height = plan.row_height,
                "Page break"
            );
        }
        if cursor.decide(plan.row_height, bottom) == Placement::Oversize {
            warn!(
                item = item.index,
                text = %item.raw,
                page = cursor.page_number,
                row_height = plan.row_height,
                available = cursor.row_top - bottom,
                "Row is taller than a page; it will run past the bottom margin"
            );
        }

        rows.push(renderer.draw_row(&mut canvas, &item, &plan, cursor.row_top)?);
        cursor.advance(plan.row_height);
    }

    let (pdf, page_count) = canvas.finish(&format!("{FALLBACK_TITLE} - {}", job.client_name))?;
    info!(
        client = %job.client_name,
        year_label = %renderer.year_label(),
        items = rows.len(),
        pages = page_count,
        bytes = pdf.len(),
        "Worksheet built"
    );

    Ok(RenderedWorksheet {
        pdf,
        page_count,
        rows,
    })
}

/// Resolves raw layout/options documents and builds in one step.
pub fn build_from_documents(
    client_name: &str,
    tax_year: Option<&str>,
    items: &[String],
    layout_doc: &Value,
    options_doc: &Value,
) -> Result<RenderedWorksheet, BuildError> {
    if items.is_empty() {
        return Err(BuildError::NoItems);
    }
    let config = WorksheetConfig::resolve(layout_doc, options_doc)?;
    let job = WorksheetJob {
        client_name: client_name.to_string(),
        tax_year: tax_year.map(str::to_string),
        items: items.to_vec(),
    };
    build_worksheet(&job, &config)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
