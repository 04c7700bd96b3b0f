//! Minimal `lopdf` writer for fillable worksheets.
//!
//! `PdfCanvas` accumulates one page at a time (content operations plus widget
//! annotations) and assembles the catalog, shared resources and AcroForm on
//! `finish`. Coordinates are PDF user space: origin bottom-left, y grows upward.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::worksheet::font_metrics::StandardFont;
use crate::worksheet::logo::LogoImage;
use crate::worksheet::BuildError;

/// Radio field flags: Radio (bit 16) | NoToggleToOff (bit 15).
const RADIO_FIELD_FLAGS: i64 = (1 << 15) | (1 << 14);
/// Annotation flag: Print.
const ANNOT_PRINT: i64 = 4;
const LOGO_RESOURCE: &str = "Im1";
const DINGBATS_RESOURCE: &str = "ZaDb";
/// Appearance state name every button uses for "not selected".
pub const OFF_STATE: &str = "Off";
/// ZapfDingbats check mark.
const CHECK_GLYPH: u8 = b'4';
/// ZapfDingbats filled circle.
const DOT_GLYPH: u8 = b'l';

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);

    fn to_array(self) -> Object {
        real_array(&[self.0, self.1, self.2])
    }
}

/// Axis-aligned rectangle, bottom-left anchored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[cfg(test)]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    fn to_pdf_rect(self) -> Object {
        real_array(&[self.x, self.y, self.right(), self.top()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ButtonLook {
    Off,
    Check,
    Dot,
}

struct PageBuilder {
    id: ObjectId,
    ops: Vec<Operation>,
    annots: Vec<ObjectId>,
}

pub struct PdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    width: f32,
    height: f32,
    page_ids: Vec<ObjectId>,
    current: Option<PageBuilder>,
    fields: Vec<ObjectId>,
    fonts: BTreeMap<StandardFont, ObjectId>,
    dingbats_id: Option<ObjectId>,
    logo_id: Option<ObjectId>,
    appearances: HashMap<(ButtonLook, u32), ObjectId>,
}

impl PdfCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let resources_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            resources_id,
            width,
            height,
            page_ids: Vec::new(),
            current: None,
            fields: Vec::new(),
            fonts: BTreeMap::new(),
            dingbats_id: None,
            logo_id: None,
            appearances: HashMap::new(),
        }
    }

    pub fn page_width(&self) -> f32 {
        self.width
    }

    pub fn page_height(&self) -> f32 {
        self.height
    }

    /// 1-based number of the page being drawn, 0 before the first page.
    pub fn page_number(&self) -> u32 {
        self.page_ids.len() as u32 + u32::from(self.current.is_some())
    }

    /// Closes the current page (if any) and opens a new one.
    pub fn begin_page(&mut self) -> Result<u32, BuildError> {
        self.end_page()?;
        let id = self.doc.new_object_id();
        self.current = Some(PageBuilder {
            id,
            ops: Vec::new(),
            annots: Vec::new(),
        });
        Ok(self.page_number())
    }

    fn end_page(&mut self) -> Result<(), BuildError> {
        let Some(page) = self.current.take() else {
            return Ok(());
        };
        let content = Content {
            operations: page.ops,
        }
        .encode()
        .map_err(|e| BuildError::Serialize(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(deflate_stream(Dictionary::new(), &content)?);

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => real_array(&[0.0, 0.0, self.width, self.height]),
            "Contents" => content_id,
            "Resources" => self.resources_id,
        };
        if !page.annots.is_empty() {
            page_dict.set(
                "Annots",
                Object::Array(page.annots.into_iter().map(Object::Reference).collect()),
            );
        }
        self.doc.objects.insert(page.id, Object::Dictionary(page_dict));
        self.page_ids.push(page.id);
        Ok(())
    }

    fn page(&mut self) -> Result<&mut PageBuilder, BuildError> {
        self.current
            .as_mut()
            .ok_or_else(|| BuildError::Serialize("drawing outside of a page".to_string()))
    }

    // ── Drawing ─────────────────────────────────────────────────────────────

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) -> Result<(), BuildError> {
        let page = self.page()?;
        page.ops.push(Operation::new("q", vec![]));
        page.ops.push(fill_color(color));
        page.ops.push(Operation::new(
            "re",
            vec![rect.x.into(), rect.y.into(), rect.width.into(), rect.height.into()],
        ));
        page.ops.push(Operation::new("f", vec![]));
        page.ops.push(Operation::new("Q", vec![]));
        Ok(())
    }

    pub fn draw_text(
        &mut self,
        x: f32,
        y: f32,
        font: StandardFont,
        size: f32,
        color: Rgb,
        text: &str,
    ) -> Result<(), BuildError> {
        self.font_id(font);
        let page = self.page()?;
        page.ops.push(Operation::new("BT", vec![]));
        page.ops.push(fill_color(color));
        page.ops.push(Operation::new(
            "Tf",
            vec![font.resource_name().into(), size.into()],
        ));
        page.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        page.ops.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
        ));
        page.ops.push(Operation::new("ET", vec![]));
        Ok(())
    }

    /// Places the logo at `rect`. The image XObject is embedded once per document.
    pub fn draw_image(&mut self, logo: &LogoImage, rect: Rect) -> Result<(), BuildError> {
        if self.logo_id.is_none() {
            self.logo_id = Some(self.embed_image(logo)?);
        }
        let page = self.page()?;
        page.ops.push(Operation::new("q", vec![]));
        page.ops.push(Operation::new(
            "cm",
            vec![
                rect.width.into(),
                0.0f32.into(),
                0.0f32.into(),
                rect.height.into(),
                rect.x.into(),
                rect.y.into(),
            ],
        ));
        page.ops.push(Operation::new("Do", vec![LOGO_RESOURCE.into()]));
        page.ops.push(Operation::new("Q", vec![]));
        Ok(())
    }

    fn embed_image(&mut self, logo: &LogoImage) -> Result<ObjectId, BuildError> {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => logo.width as i64,
            "Height" => logo.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        };
        if let Some(alpha) = &logo.alpha {
            let mask = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => logo.width as i64,
                "Height" => logo.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
            };
            let mask_id = self.doc.add_object(deflate_stream(mask, alpha)?);
            dict.set("SMask", mask_id);
        }
        Ok(self.doc.add_object(deflate_stream(dict, &logo.rgb)?))
    }

    // ── Form fields ─────────────────────────────────────────────────────────

    /// Adds a single-line text field with a visible border.
    pub fn add_text_field(&mut self, name: &str, rect: Rect, border: Rgb) -> Result<(), BuildError> {
        self.font_id(StandardFont::Helvetica);
        let page_id = self.page()?.id;
        let field = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal(name),
            "V" => Object::string_literal(""),
            "Rect" => rect.to_pdf_rect(),
            "F" => ANNOT_PRINT,
            "P" => page_id,
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            "MK" => dictionary! { "BC" => border.to_array(), "BG" => Rgb::WHITE.to_array() },
            "BS" => dictionary! { "W" => 1i64, "S" => "I" },
        };
        let field_id = self.doc.add_object(field);
        self.fields.push(field_id);
        self.page()?.annots.push(field_id);
        Ok(())
    }

    /// Adds an independent on/off checkbox, initially off.
    pub fn add_checkbox(&mut self, name: &str, rect: Rect, border: Rgb) -> Result<(), BuildError> {
        let page_id = self.page()?.id;
        let on = self.button_appearance(ButtonLook::Check, rect.width, border)?;
        let off = self.button_appearance(ButtonLook::Off, rect.width, border)?;
        let field = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal(name),
            "V" => "Off",
            "AS" => "Off",
            "Rect" => rect.to_pdf_rect(),
            "F" => ANNOT_PRINT,
            "P" => page_id,
            "DA" => Object::string_literal(format!("/{DINGBATS_RESOURCE} 0 Tf 0 g")),
            "MK" => dictionary! {
                "BC" => border.to_array(),
                "BG" => Rgb::WHITE.to_array(),
                "CA" => Object::string_literal(vec![CHECK_GLYPH]),
            },
            "BS" => dictionary! { "W" => 1i64, "S" => "S" },
            "AP" => dictionary! { "N" => dictionary! { "Yes" => on, "Off" => off } },
        };
        let field_id = self.doc.add_object(field);
        self.fields.push(field_id);
        self.page()?.annots.push(field_id);
        Ok(())
    }

    /// Adds one radio field named `name` whose kid widgets are `choices`
    /// (export value, rect). All kids start off; selecting one clears the others.
    pub fn add_radio_group(
        &mut self,
        name: &str,
        choices: &[(&str, Rect)],
        border: Rgb,
    ) -> Result<(), BuildError> {
        let page_id = self.page()?.id;
        let parent_id = self.doc.new_object_id();

        let mut kids = Vec::with_capacity(choices.len());
        for (value, rect) in choices {
            if *value == OFF_STATE || value.trim().is_empty() {
                return Err(BuildError::Serialize(format!(
                    "radio field '{name}' has reserved export value {value:?}"
                )));
            }
            let on = self.button_appearance(ButtonLook::Dot, rect.width, border)?;
            let off = self.button_appearance(ButtonLook::Off, rect.width, border)?;
            let mut normal = Dictionary::new();
            normal.set(value.as_bytes(), on);
            normal.set(OFF_STATE, off);
            let kid = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Parent" => parent_id,
                "AS" => "Off",
                "Rect" => rect.to_pdf_rect(),
                "F" => ANNOT_PRINT,
                "P" => page_id,
                "MK" => dictionary! {
                    "BC" => border.to_array(),
                    "BG" => Rgb::WHITE.to_array(),
                    "CA" => Object::string_literal(vec![DOT_GLYPH]),
                },
                "BS" => dictionary! { "W" => 1i64, "S" => "S" },
                "AP" => dictionary! { "N" => normal },
            };
            let kid_id = self.doc.add_object(kid);
            self.page()?.annots.push(kid_id);
            kids.push(Object::Reference(kid_id));
        }

        let parent = dictionary! {
            "FT" => "Btn",
            "Ff" => RADIO_FIELD_FLAGS,
            "T" => Object::string_literal(name),
            "V" => "Off",
            "DA" => Object::string_literal(format!("/{DINGBATS_RESOURCE} 0 Tf 0 g")),
            "Kids" => kids,
        };
        self.doc.objects.insert(parent_id, Object::Dictionary(parent));
        self.fields.push(parent_id);
        Ok(())
    }

    /// Appearance stream for a square button of edge `size`, cached per look and size.
    fn button_appearance(
        &mut self,
        look: ButtonLook,
        size: f32,
        border: Rgb,
    ) -> Result<ObjectId, BuildError> {
        let key = (look, size.to_bits());
        if let Some(id) = self.appearances.get(&key) {
            return Ok(*id);
        }
        let dingbats = self.dingbats_id();

        let mut ops = vec![
            fill_color(Rgb::WHITE),
            Operation::new("RG", vec![border.0.into(), border.1.into(), border.2.into()]),
            Operation::new("w", vec![1.0f32.into()]),
            Operation::new(
                "re",
                vec![0.5f32.into(), 0.5f32.into(), (size - 1.0).into(), (size - 1.0).into()],
            ),
            Operation::new("B", vec![]),
        ];
        let glyph = match look {
            ButtonLook::Off => None,
            ButtonLook::Check => Some(CHECK_GLYPH),
            ButtonLook::Dot => Some(DOT_GLYPH),
        };
        if let Some(glyph) = glyph {
            let glyph_size = size * 0.7;
            let inset = (size - glyph_size) / 2.0;
            ops.extend([
                Operation::new("BT", vec![]),
                fill_color(Rgb::BLACK),
                Operation::new("Tf", vec![DINGBATS_RESOURCE.into(), glyph_size.into()]),
                Operation::new("Td", vec![inset.into(), (inset + glyph_size * 0.15).into()]),
                Operation::new("Tj", vec![Object::String(vec![glyph], StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let bytes = Content { operations: ops }
            .encode()
            .map_err(|e| BuildError::Serialize(format!("appearance stream: {e}")))?;
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => real_array(&[0.0, 0.0, size, size]),
            "Resources" => dictionary! {
                "Font" => dictionary! { DINGBATS_RESOURCE => dingbats },
            },
        };
        let id = self.doc.add_object(Stream::new(dict, bytes));
        self.appearances.insert(key, id);
        Ok(id)
    }

    // ── Resources ───────────────────────────────────────────────────────────

    fn font_id(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.postscript_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        id
    }

    fn dingbats_id(&mut self) -> ObjectId {
        if let Some(id) = self.dingbats_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ZapfDingbats",
        });
        self.dingbats_id = Some(id);
        id
    }

    // ── Finalization ────────────────────────────────────────────────────────

    /// Closes the last page, writes catalog, page tree and AcroForm, and serializes.
    /// Returns the PDF bytes and the page count.
    pub fn finish(mut self, title: &str) -> Result<(Vec<u8>, u32), BuildError> {
        self.end_page()?;
        if self.page_ids.is_empty() {
            return Err(BuildError::Serialize("document has no pages".to_string()));
        }

        let helv = self.font_id(StandardFont::Helvetica);
        let dingbats = self.dingbats_id();

        let mut fonts = Dictionary::new();
        for (font, id) in &self.fonts {
            fonts.set(font.resource_name(), *id);
        }
        fonts.set(DINGBATS_RESOURCE, dingbats);
        let mut resources = dictionary! { "Font" => fonts };
        if let Some(logo_id) = self.logo_id {
            resources.set("XObject", dictionary! { LOGO_RESOURCE => logo_id });
        }
        self.doc
            .objects
            .insert(self.resources_id, Object::Dictionary(resources));

        let page_count = self.page_ids.len() as u32;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.page_ids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => page_count as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let acroform = dictionary! {
            "Fields" => self.fields.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
            "NeedAppearances" => true,
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            "DR" => dictionary! {
                "Font" => dictionary! { "Helv" => helv, DINGBATS_RESOURCE => dingbats },
            },
        };
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
            "AcroForm" => acroform,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal(concat!("worksheet-api ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| BuildError::Serialize(e.to_string()))?;
        Ok((bytes, page_count))
    }
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new("rg", vec![color.0.into(), color.1.into(), color.2.into()])
}

fn real_array(values: &[f32]) -> Object {
    Object::Array(values.iter().copied().map(Object::Real).collect())
}

fn deflate_stream(mut dict: Dictionary, data: &[u8]) -> Result<Stream, BuildError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map(|compressed| {
            dict.set("Filter", "FlateDecode");
            Stream::new(dict, compressed)
        })
        .map_err(|e| BuildError::Serialize(format!("deflate: {e}")))
}

/// Encodes text for the WinAnsi-encoded base fonts. Characters without a WinAnsi
/// code point become '?'.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ACCENT: Rgb = Rgb(0.44, 0.15, 0.45);

    fn widget_dicts(doc: &Document) -> Vec<&Dictionary> {
        doc.objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| matches!(d.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Widget"))
            .collect()
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(0.0, 20.0, 10.0, 10.0)));
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(to_win_ansi("W2"), b"W2".to_vec());
        assert_eq!(to_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(to_win_ansi("it’s"), vec![b'i', b't', 0x92, b's']);
        assert_eq!(to_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn test_drawing_requires_open_page() {
        let mut canvas = PdfCanvas::new(612.0, 792.0);
        assert_eq!(canvas.page_number(), 0);
        assert!(canvas
            .draw_text(0.0, 0.0, StandardFont::Helvetica, 10.0, Rgb::BLACK, "x")
            .is_err());
    }

    #[test]
    fn test_finish_without_pages_fails() {
        let canvas = PdfCanvas::new(612.0, 792.0);
        assert!(matches!(canvas.finish("t"), Err(BuildError::Serialize(_))));
    }

    #[test]
    fn test_radio_group_rejects_off_export_value() {
        let mut canvas = PdfCanvas::new(612.0, 792.0);
        canvas.begin_page().unwrap();
        let rect = Rect::new(486.0, 604.0, 14.0, 14.0);
        for value in ["Off", " "] {
            let result = canvas.add_radio_group("status_1", &[(value, rect), ("no", rect)], ACCENT);
            assert!(matches!(result, Err(BuildError::Serialize(_))), "value {value:?}");
        }
    }

    #[test]
    fn test_pages_and_fields_round_trip_through_lopdf() {
        let mut canvas = PdfCanvas::new(612.0, 792.0);
        assert_eq!(canvas.begin_page().unwrap(), 1);
        canvas
            .draw_text(40.0, 700.0, StandardFont::Helvetica, 12.0, Rgb::BLACK, "Hello")
            .unwrap();
        canvas
            .add_text_field("note_1", Rect::new(40.0, 600.0, 300.0, 22.0), ACCENT)
            .unwrap();
        canvas
            .add_checkbox("uploaded_1", Rect::new(486.0, 604.0, 14.0, 14.0), ACCENT)
            .unwrap();
        assert_eq!(canvas.begin_page().unwrap(), 2);
        canvas
            .add_radio_group(
                "status_2",
                &[
                    ("uploaded", Rect::new(486.0, 604.0, 14.0, 14.0)),
                    ("not_needed", Rect::new(558.0, 604.0, 14.0, 14.0)),
                ],
                ACCENT,
            )
            .unwrap();

        let (bytes, pages) = canvas.finish("Client Worksheet - Test").unwrap();
        assert_eq!(pages, 2);
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        // text field + checkbox + two radio kids
        assert_eq!(widget_dicts(&doc).len(), 4);

        let catalog = doc.catalog().unwrap();
        let acroform = catalog.get(b"AcroForm").unwrap().as_dict().unwrap();
        // text field, checkbox, radio parent
        assert_eq!(acroform.get(b"Fields").unwrap().as_array().unwrap().len(), 3);
    }
}
