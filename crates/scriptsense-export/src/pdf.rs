//! PDF export with `lopdf`.
//!
//! Text is laid out on A4 pages in 12 pt type, wrapped to the text width and
//! paginated. English and unrecognized languages use the builtin Times-Roman
//! with WinAnsi encoding; script languages embed their TrueType font as a
//! Type0 font with Identity-H encoding, addressing glyphs by id. Glyphs are
//! placed in logical order without shaping.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::ExportError;
use crate::fonts::{FontLibrary, PdfFont};
use crate::ttf::TrueTypeFont;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 28.0;
const TEXT_WIDTH: f32 = 510.0;
const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 16.0;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2.0 * MARGIN) / LEADING) as usize;

/// Render `text` in the font for `lang`.
pub fn export_pdf(text: &str, lang: &str, fonts: &FontLibrary) -> Result<Vec<u8>, ExportError> {
    let font = fonts.resolve(lang)?;
    render_pdf(text, &font)
}

pub fn render_pdf(text: &str, font: &PdfFont) -> Result<Vec<u8>, ExportError> {
    let face = match font {
        PdfFont::Builtin(_) => Face::Builtin,
        PdfFont::Embedded { font, .. } => Face::Embedded(font),
    };
    let lines = wrap_text(text, TEXT_WIDTH, |s| face.width(s));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = match font {
        PdfFont::Builtin(name) => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => *name,
            "Encoding" => "WinAnsiEncoding",
        }),
        PdfFont::Embedded { name, font } => embed_truetype(&mut doc, name, font, text),
    };
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut page_ids = Vec::with_capacity(pages.len());
    for page_lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - FONT_SIZE).into()],
            ),
        ];
        for line in page_lines {
            operations.push(Operation::new("Tj", vec![face.encode(line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    log::debug!(
        "rendered {} lines on {} pages ({} bytes)",
        lines.len(),
        page_ids.len(),
        buffer.len()
    );
    Ok(buffer)
}

enum Face<'a> {
    Builtin,
    Embedded(&'a TrueTypeFont),
}

impl Face<'_> {
    /// Width of `s` in points at the export font size.
    fn width(&self, s: &str) -> f32 {
        let units: i64 = match self {
            Face::Builtin => s.chars().map(times_roman_width).sum(),
            Face::Embedded(font) => s
                .chars()
                .map(|c| font.to_pdf_units(i32::from(font.advance(font.glyph_id(c)))))
                .sum(),
        };
        units as f32 * FONT_SIZE / 1000.0
    }

    fn encode(&self, s: &str) -> Object {
        match self {
            Face::Builtin => {
                Object::String(s.chars().map(win_ansi_byte).collect(), StringFormat::Literal)
            }
            Face::Embedded(font) => Object::String(
                s.chars()
                    .flat_map(|c| font.glyph_id(c).to_be_bytes())
                    .collect(),
                StringFormat::Hexadecimal,
            ),
        }
    }
}

/// Approximate Times-Roman advance widths (per 1000 em).
fn times_roman_width(c: char) -> i64 {
    match c {
        ' ' | '.' | ',' | ':' | ';' | '\'' | '!' | 'i' | 'j' | 'l' | 't' | 'f' => 278,
        'm' | 'M' | 'W' => 889,
        'w' => 722,
        'A'..='Z' => 667,
        'a'..='z' => 472,
        '0'..='9' => 500,
        _ => 500,
    }
}

/// WinAnsi byte for `c`; anything outside Latin-1 prints as `?`.
fn win_ansi_byte(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
        _ => b'?',
    }
}

/// Embed `font` as Type0/CIDFontType2 and return the Type0 font object.
fn embed_truetype(doc: &mut Document, name: &str, font: &TrueTypeFont, text: &str) -> ObjectId {
    let mut used: BTreeMap<u16, char> = BTreeMap::new();
    for c in text.chars().filter(|c| !c.is_control()) {
        used.entry(font.glyph_id(c)).or_insert(c);
    }

    let data = font.data().to_vec();
    let font_file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => data.len() as i64 },
        data,
    ));

    let bbox: Vec<Object> = font
        .bbox
        .iter()
        .map(|v| Object::Integer(font.to_pdf_units(i32::from(*v))))
        .collect();
    let ascent = font.to_pdf_units(i32::from(font.ascender));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(name.as_bytes().to_vec()),
        "Flags" => 4,
        "FontBBox" => bbox,
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => font.to_pdf_units(i32::from(font.descender)),
        "CapHeight" => ascent,
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    let mut widths = Vec::with_capacity(used.len() * 2);
    for gid in used.keys() {
        let advance = font.to_pdf_units(i32::from(font.advance(*gid)));
        widths.push(Object::Integer(i64::from(*gid)));
        widths.push(Object::Array(vec![Object::Integer(advance)]));
    }

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(name.as_bytes().to_vec()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(&used).into_bytes(),
    ));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(name.as_bytes().to_vec()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

/// CMap from glyph ids back to Unicode, so the text stays searchable.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(u16, char)> = used
        .iter()
        .filter(|(gid, _)| **gid != 0)
        .map(|(gid, c)| (*gid, *c))
        .collect();
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut buf = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut buf)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            cmap.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Greedy word wrap. Words wider than the line are broken between characters.
fn wrap_text(text: &str, max_width: f32, width: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if width(&candidate) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for c in word.chars() {
                line.push(c);
                if line.chars().count() > 1 && width(&line) > max_width {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(c);
                }
            }
        }
        lines.push(line);
    }
    lines
}
