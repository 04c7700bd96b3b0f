//! Worksheet configuration: raw layout/options documents resolved into validated,
//! typed structures.
//!
//! The raw documents are loosely shaped JSON. Everything downstream works only with
//! `LayoutConfig` / `OptionsConfig`, whose invariants (positive sizes, known fonts,
//! recognized page size) are checked once here.

use serde::Deserialize;
use serde_json::Value;

use crate::worksheet::font_metrics::StandardFont;
use crate::worksheet::logo::LogoAsset;
use crate::worksheet::pdf::OFF_STATE;
use crate::worksheet::BuildError;

/// Title used when no tax year is available or the template renders empty.
pub const FALLBACK_TITLE: &str = "Client Worksheet";
const YEAR_PLACEHOLDER: &str = "{year}";

// ────────────────────────────────────────────────────────────────────────────
// Resolved types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fonts {
    pub base: StandardFont,
    pub bold: StandardFont,
    pub title_size: f32,
    pub client_name_size: f32,
    pub item_text_size: f32,
    pub column_header_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    /// Minimum row height; rows grow past it when their text wraps.
    pub row_height: f32,
    pub item_text_width: f32,
    pub textfield_width: f32,
    pub textfield_height: f32,
    pub gap_x: f32,
    /// Edge length of each selection widget.
    pub checkbox_size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };
    pub const LEGAL: PageSize = PageSize { width: 612.0, height: 1008.0 };
    pub const A4: PageSize = PageSize { width: 595.2756, height: 841.8898 };

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LETTER" => Some(PageSize::LETTER),
            "LEGAL" => Some(PageSize::LEGAL),
            "A4" => Some(PageSize::A4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub year_label_template: String,
    pub logo_path: Option<String>,
    pub margins: Margins,
    pub fonts: Fonts,
    pub row_layout: RowLayout,
    pub uploaded_label: String,
    pub not_needed_label: String,
    pub page_size: PageSize,
}

impl LayoutConfig {
    /// Splices the tax year into the year-label template.
    ///
    /// Falls back to [`FALLBACK_TITLE`] when no year is supplied or the substituted
    /// template is blank.
    pub fn year_label(&self, tax_year: Option<&str>) -> String {
        let year = match tax_year.map(str::trim) {
            Some(year) if !year.is_empty() => year,
            _ => return FALLBACK_TITLE.to_string(),
        };
        let label = self.year_label_template.replace(YEAR_PLACEHOLDER, year);
        let label = label.trim();
        if label.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            label.to_string()
        }
    }
}

/// Selection widget variant, chosen once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceStyle {
    /// Two independent boolean widgets per item.
    Checkbox,
    /// Two mutually exclusive widgets sharing one per-item group.
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    Auto,
    Verbatim,
}

/// Export values bound to the two radio widgets of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioValues {
    pub uploaded: String,
    pub not_needed: String,
}

impl Default for RadioValues {
    fn default() -> Self {
        Self {
            uploaded: "uploaded".to_string(),
            not_needed: "not_needed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionsConfig {
    pub choice_style: ChoiceStyle,
    pub prefix_mode: PrefixMode,
    pub auto_prefix: String,
    pub radio_values: RadioValues,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            choice_style: ChoiceStyle::Checkbox,
            prefix_mode: PrefixMode::Auto,
            auto_prefix: String::new(),
            radio_values: RadioValues::default(),
        }
    }
}

/// Everything a build needs besides the per-request job. Immutable once resolved,
/// so it is shared between concurrent builds behind an `Arc`.
#[derive(Debug, Clone)]
pub struct WorksheetConfig {
    pub layout: LayoutConfig,
    pub options: OptionsConfig,
    pub logo: LogoAsset,
}

impl WorksheetConfig {
    /// Resolves both raw documents. The logo starts out absent; attach one with
    /// [`WorksheetConfig::with_logo`].
    pub fn resolve(layout_doc: &Value, options_doc: &Value) -> Result<Self, BuildError> {
        Ok(Self {
            layout: resolve_layout(layout_doc)?,
            options: resolve_options(options_doc)?,
            logo: LogoAsset::Absent,
        })
    }

    pub fn with_logo(mut self, logo: LogoAsset) -> Self {
        self.logo = logo;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw document shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawLayout {
    year_label_template: String,
    #[serde(default)]
    logo_path: Option<String>,
    margins: RawMargins,
    fonts: RawFonts,
    row_layout: RawRowLayout,
    columns: RawColumns,
    #[serde(default)]
    page_size: Option<RawPageSize>,
}

#[derive(Debug, Deserialize)]
struct RawMargins {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

#[derive(Debug, Deserialize)]
struct RawFonts {
    base: String,
    bold: String,
    sizes: RawFontSizes,
}

#[derive(Debug, Deserialize)]
struct RawFontSizes {
    title: f32,
    client_name: f32,
    item_text: f32,
    column_header: f32,
}

#[derive(Debug, Deserialize)]
struct RawRowLayout {
    row_height: f32,
    item_text_width: f32,
    textfield_width: f32,
    textfield_height: f32,
    gap_x: f32,
}

#[derive(Debug, Deserialize)]
struct RawColumns {
    checkbox_size: f32,
    uploaded_label: String,
    not_needed_label: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPageSize {
    Named(String),
    Dimensions(Vec<f32>),
}

#[derive(Debug, Default, Deserialize)]
struct RawOptions {
    #[serde(default)]
    choice_style: Option<String>,
    #[serde(default)]
    prefix_mode: Option<String>,
    #[serde(default)]
    auto_prefix: Option<String>,
    #[serde(default)]
    radio_values: Option<RawRadioValues>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRadioValues {
    #[serde(default)]
    uploaded: Option<String>,
    #[serde(default)]
    not_needed: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Validates the layout document.
pub fn resolve_layout(doc: &Value) -> Result<LayoutConfig, BuildError> {
    let raw = RawLayout::deserialize(doc)
        .map_err(|e| BuildError::config(format!("layout: {e}")))?;

    let margins = Margins {
        left: positive("margins.left", raw.margins.left)?,
        right: positive("margins.right", raw.margins.right)?,
        top: positive("margins.top", raw.margins.top)?,
        bottom: positive("margins.bottom", raw.margins.bottom)?,
    };

    let fonts = Fonts {
        base: font("fonts.base", &raw.fonts.base)?,
        bold: font("fonts.bold", &raw.fonts.bold)?,
        title_size: positive("fonts.sizes.title", raw.fonts.sizes.title)?,
        client_name_size: positive("fonts.sizes.client_name", raw.fonts.sizes.client_name)?,
        item_text_size: positive("fonts.sizes.item_text", raw.fonts.sizes.item_text)?,
        column_header_size: positive("fonts.sizes.column_header", raw.fonts.sizes.column_header)?,
    };

    let row_layout = RowLayout {
        row_height: positive("row_layout.row_height", raw.row_layout.row_height)?,
        item_text_width: positive("row_layout.item_text_width", raw.row_layout.item_text_width)?,
        textfield_width: positive("row_layout.textfield_width", raw.row_layout.textfield_width)?,
        textfield_height: positive("row_layout.textfield_height", raw.row_layout.textfield_height)?,
        gap_x: positive("row_layout.gap_x", raw.row_layout.gap_x)?,
        checkbox_size: positive("columns.checkbox_size", raw.columns.checkbox_size)?,
    };

    let page_size = match raw.page_size {
        None => PageSize::LETTER,
        Some(RawPageSize::Named(name)) => PageSize::from_name(&name).ok_or_else(|| {
            BuildError::config(format!("page_size: unrecognized page size '{name}'"))
        })?,
        Some(RawPageSize::Dimensions(dims)) => match dims.as_slice() {
            [width, height] => PageSize {
                width: positive("page_size[0]", *width)?,
                height: positive("page_size[1]", *height)?,
            },
            _ => {
                return Err(BuildError::config(format!(
                    "page_size: expected [width, height], got {} values",
                    dims.len()
                )))
            }
        },
    };

    let logo_path = raw
        .logo_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    Ok(LayoutConfig {
        year_label_template: raw.year_label_template,
        logo_path,
        margins,
        fonts,
        row_layout,
        uploaded_label: raw.columns.uploaded_label,
        not_needed_label: raw.columns.not_needed_label,
        page_size,
    })
}

/// Validates the options document, applying defaults for every absent key.
pub fn resolve_options(doc: &Value) -> Result<OptionsConfig, BuildError> {
    let raw = if doc.is_null() {
        RawOptions::default()
    } else {
        RawOptions::deserialize(doc).map_err(|e| BuildError::config(format!("options: {e}")))?
    };

    let choice_style = match raw.choice_style.as_deref().map(str::trim) {
        None | Some("") => ChoiceStyle::Checkbox,
        Some(token) => match token.to_ascii_lowercase().as_str() {
            "checkbox" => ChoiceStyle::Checkbox,
            "radio" => ChoiceStyle::Radio,
            other => {
                return Err(BuildError::config(format!(
                    "choice_style: expected 'checkbox' or 'radio', got '{other}'"
                )))
            }
        },
    };

    let prefix_mode = match raw.prefix_mode.as_deref().map(str::trim) {
        None | Some("") => PrefixMode::Auto,
        Some(token) => match token.to_ascii_lowercase().as_str() {
            "auto" => PrefixMode::Auto,
            "verbatim" => PrefixMode::Verbatim,
            other => {
                return Err(BuildError::config(format!(
                    "prefix_mode: expected 'auto' or 'verbatim', got '{other}'"
                )))
            }
        },
    };

    let defaults = RadioValues::default();
    let raw_radio = raw.radio_values.unwrap_or_default();
    let radio_values = RadioValues {
        uploaded: export_value("radio_values.uploaded", raw_radio.uploaded)?
            .unwrap_or(defaults.uploaded),
        not_needed: export_value("radio_values.not_needed", raw_radio.not_needed)?
            .unwrap_or(defaults.not_needed),
    };
    if radio_values.uploaded == radio_values.not_needed {
        return Err(BuildError::config(format!(
            "radio_values: both choices map to '{}'",
            radio_values.uploaded
        )));
    }

    Ok(OptionsConfig {
        choice_style,
        prefix_mode,
        auto_prefix: raw.auto_prefix.unwrap_or_default(),
        radio_values,
    })
}

fn positive(field: &str, value: f32) -> Result<f32, BuildError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BuildError::config(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

fn font(field: &str, name: &str) -> Result<StandardFont, BuildError> {
    StandardFont::from_name(name)
        .ok_or_else(|| BuildError::config(format!("{field}: unknown font '{name}'")))
}

/// A radio export value names an appearance state, so it can be neither blank
/// nor the reserved off state.
fn export_value(field: &str, value: Option<String>) -> Result<Option<String>, BuildError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(BuildError::config(format!("{field} must not be blank")));
    }
    if value == OFF_STATE {
        return Err(BuildError::config(format!(
            "{field}: '{OFF_STATE}' is reserved for the unselected state"
        )));
    }
    Ok(Some(value.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
