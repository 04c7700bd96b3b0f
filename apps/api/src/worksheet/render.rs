//! Page header and per-item row drawing.

use crate::worksheet::assembler::Item;
use crate::worksheet::config::{ChoiceStyle, LayoutConfig, OptionsConfig, WorksheetConfig};
use crate::worksheet::font_metrics::StandardFont;
use crate::worksheet::geometry::GeometryPlan;
use crate::worksheet::logo::LogoAsset;
use crate::worksheet::pdf::{PdfCanvas, Rect, Rgb};
use crate::worksheet::row::{RowPlan, TEXT_TOP_PADDING};
use crate::worksheet::BuildError;

/// #712674
pub const ACCENT: Rgb = Rgb(113.0 / 255.0, 38.0 / 255.0, 116.0 / 255.0);
pub const TEXT_COLOR: Rgb = Rgb::BLACK;

const TITLE_BAR_HEIGHT: f32 = 60.0;
/// The title bar stops this far short of the right page edge, leaving room for the logo.
const TITLE_BAR_RIGHT_INSET: f32 = 100.0;
const TITLE_BASELINE_OFFSET: f32 = 18.0;
const LOGO_RIGHT_INSET: f32 = 80.0;

// Offsets below the title bar's bottom edge.
const CLIENT_NAME_OFFSET: f32 = 26.0;
const INSTRUCTIONS_OFFSET: f32 = 46.0;
const COLUMN_HEADER_OFFSET: f32 = 70.0;
const HEADER_TO_ROWS_GAP: f32 = 16.0;

pub const INSTRUCTIONS: &str =
    "Please upload your documents and then mark the below checkbox as uploaded or not needed.";
const INSTRUCTIONS_FONT: StandardFont = StandardFont::HelveticaOblique;
const DOCUMENT_COLUMN_LABEL: &str = "Document";

/// Where one item ended up. Collected by the assembler for callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPlacement {
    pub index: usize,
    pub page: u32,
    pub row_top: f32,
    pub row_height: f32,
    pub note_field: Rect,
    /// Uploaded widget, then not-needed widget.
    pub widgets: [Rect; 2],
}

/// x at which `label` is drawn so that it is centered over a widget column.
pub fn column_label_x(
    widget_x: f32,
    widget_size: f32,
    label: &str,
    font: StandardFont,
    size: f32,
) -> f32 {
    widget_x + widget_size / 2.0 - font.string_width(label, size) / 2.0
}

/// Selection widget drawing, picked once per document from [`ChoiceStyle`].
#[derive(Debug, Clone, Copy)]
enum ChoiceRenderer<'a> {
    Checkboxes,
    Radios { uploaded: &'a str, not_needed: &'a str },
}

impl<'a> ChoiceRenderer<'a> {
    fn for_options(options: &'a OptionsConfig) -> Self {
        match options.choice_style {
            ChoiceStyle::Checkbox => ChoiceRenderer::Checkboxes,
            ChoiceStyle::Radio => ChoiceRenderer::Radios {
                uploaded: &options.radio_values.uploaded,
                not_needed: &options.radio_values.not_needed,
            },
        }
    }

    fn draw(
        &self,
        canvas: &mut PdfCanvas,
        index: usize,
        uploaded: Rect,
        not_needed: Rect,
    ) -> Result<(), BuildError> {
        match *self {
            ChoiceRenderer::Checkboxes => {
                canvas.add_checkbox(&format!("uploaded_{index}"), uploaded, ACCENT)?;
                canvas.add_checkbox(&format!("notneeded_{index}"), not_needed, ACCENT)
            }
            ChoiceRenderer::Radios {
                uploaded: uploaded_value,
                not_needed: not_needed_value,
            } => canvas.add_radio_group(
                &format!("status_{index}"),
                &[(uploaded_value, uploaded), (not_needed_value, not_needed)],
                ACCENT,
            ),
        }
    }
}

pub struct PageRenderer<'a> {
    layout: &'a LayoutConfig,
    logo: &'a LogoAsset,
    geometry: GeometryPlan,
    choices: ChoiceRenderer<'a>,
    client_name: &'a str,
    year_label: String,
}

impl<'a> PageRenderer<'a> {
    pub fn new(
        config: &'a WorksheetConfig,
        geometry: GeometryPlan,
        client_name: &'a str,
        tax_year: Option<&str>,
    ) -> Self {
        Self {
            layout: &config.layout,
            logo: &config.logo,
            geometry,
            choices: ChoiceRenderer::for_options(&config.options),
            client_name,
            year_label: config.layout.year_label(tax_year),
        }
    }

    pub fn year_label(&self) -> &str {
        &self.year_label
    }

    /// Opens a new page and draws its header. Returns the first row's top edge.
    pub fn start_page(&self, canvas: &mut PdfCanvas) -> Result<f32, BuildError> {
        canvas.begin_page()?;
        self.draw_header(canvas)
    }

    fn draw_header(&self, canvas: &mut PdfCanvas) -> Result<f32, BuildError> {
        let layout = self.layout;
        let fonts = &layout.fonts;
        let left = layout.margins.left;
        let page_width = canvas.page_width();
        let bar_bottom = canvas.page_height() - layout.margins.top - TITLE_BAR_HEIGHT;

        canvas.fill_rect(
            Rect::new(0.0, bar_bottom, page_width - TITLE_BAR_RIGHT_INSET, TITLE_BAR_HEIGHT),
            ACCENT,
        )?;
        canvas.draw_text(
            left,
            bar_bottom + TITLE_BASELINE_OFFSET,
            fonts.base,
            fonts.title_size,
            Rgb::WHITE,
            &self.year_label,
        )?;

        match self.logo {
            LogoAsset::Present(image) => {
                let (width, height) = image.fitted_size();
                let y = bar_bottom + (TITLE_BAR_HEIGHT - height) / 2.0;
                canvas.draw_image(image, Rect::new(page_width - LOGO_RIGHT_INSET, y, width, height))?;
            }
            LogoAsset::Absent => {}
        }

        canvas.draw_text(
            left,
            bar_bottom - CLIENT_NAME_OFFSET,
            fonts.base,
            fonts.client_name_size,
            TEXT_COLOR,
            self.client_name,
        )?;

        if canvas.page_number() == 1 {
            canvas.draw_text(
                left,
                bar_bottom - INSTRUCTIONS_OFFSET,
                INSTRUCTIONS_FONT,
                fonts.item_text_size,
                TEXT_COLOR,
                INSTRUCTIONS,
            )?;
        }

        let column_y = bar_bottom - COLUMN_HEADER_OFFSET;
        let header_size = fonts.column_header_size;
        let widget_size = layout.row_layout.checkbox_size;
        canvas.draw_text(left, column_y, fonts.bold, header_size, TEXT_COLOR, DOCUMENT_COLUMN_LABEL)?;
        for (widget_x, label) in [
            (self.geometry.uploaded_x, layout.uploaded_label.as_str()),
            (self.geometry.not_needed_x, layout.not_needed_label.as_str()),
        ] {
            let x = column_label_x(widget_x, widget_size, label, fonts.bold, header_size);
            canvas.draw_text(x, column_y, fonts.bold, header_size, TEXT_COLOR, label)?;
        }

        Ok(column_y - HEADER_TO_ROWS_GAP)
    }

    /// Draws one item's text, note field and selection widgets below `row_top`.
    pub fn draw_row(
        &self,
        canvas: &mut PdfCanvas,
        item: &Item,
        plan: &RowPlan,
        row_top: f32,
    ) -> Result<RowPlacement, BuildError> {
        let layout = self.layout;
        let row = &layout.row_layout;
        let x = self.geometry.text_x;

        let mut baseline = row_top - TEXT_TOP_PADDING;
        for line in &plan.lines {
            canvas.draw_text(
                x,
                baseline,
                layout.fonts.base,
                layout.fonts.item_text_size,
                TEXT_COLOR,
                line,
            )?;
            baseline -= plan.line_height;
        }

        let note_y = plan.note_field_y(row_top, row.textfield_height);
        let note_field = Rect::new(x, note_y, self.geometry.note_field_width, row.textfield_height);
        canvas.add_text_field(&format!("note_{}", item.index), note_field, ACCENT)?;

        let widget_y = note_y + (row.textfield_height - row.checkbox_size) / 2.0;
        let uploaded = Rect::new(self.geometry.uploaded_x, widget_y, row.checkbox_size, row.checkbox_size);
        let not_needed = Rect::new(self.geometry.not_needed_x, widget_y, row.checkbox_size, row.checkbox_size);
        self.choices.draw(canvas, item.index, uploaded, not_needed)?;

        Ok(RowPlacement {
            index: item.index,
            page: canvas.page_number(),
            row_top,
            row_height: plan.row_height,
            note_field,
            widgets: [uploaded, not_needed],
        })
    }
}
