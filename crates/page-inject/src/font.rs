//! Font resources for inserted text
//!
//! Latin runs use one of the 14 standard fonts every viewer provides.
//! CJK runs use a composite Type0 font that is never embedded: the viewer
//! substitutes a system font matching the declared CID collection.

use crate::script::Ordering;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Default glyph width for composite fonts, in 1/1000 em
pub const CJK_DEFAULT_WIDTH: i64 = 1000;

/// Descriptor flags: Serif (bit 2) | Nonsymbolic (bit 6)
const CJK_DESCRIPTOR_FLAGS: i64 = 2 | 32;

/// Picks the font name a composite font declares for a collection
///
/// Viewers that lack the exact font use this name to choose a stand-in,
/// so it should be one of the well-known substitution names.
pub trait FontSubstitution {
    fn cjk_base_font(&self, ordering: Ordering) -> String;
}

/// Adobe's standard CJK substitution fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSubstitution;

impl FontSubstitution for StandardSubstitution {
    fn cjk_base_font(&self, ordering: Ordering) -> String {
        match ordering {
            Ordering::TraditionalChinese => "MSung-Light",
            Ordering::Japanese => "HeiseiMin-W3",
            Ordering::Korean => "HYSMyeongJo-Medium",
            Ordering::SimplifiedChinese | Ordering::Latin => "STSong-Light",
        }
        .to_string()
    }
}

/// Resolve a caller font name to one of the 14 standard fonts
///
/// Accepts the full names (case-insensitive) and the four-letter aliases.
pub fn resolve_base14(name: &str) -> Option<&'static str> {
    const BASE14: [&str; 14] = [
        "Helvetica",
        "Helvetica-Bold",
        "Helvetica-Oblique",
        "Helvetica-BoldOblique",
        "Times-Roman",
        "Times-Bold",
        "Times-Italic",
        "Times-BoldItalic",
        "Courier",
        "Courier-Bold",
        "Courier-Oblique",
        "Courier-BoldOblique",
        "Symbol",
        "ZapfDingbats",
    ];

    let alias = match name.to_ascii_lowercase().as_str() {
        "helv" => Some("Helvetica"),
        "hebo" => Some("Helvetica-Bold"),
        "heit" => Some("Helvetica-Oblique"),
        "hebi" => Some("Helvetica-BoldOblique"),
        "tiro" => Some("Times-Roman"),
        "tibo" => Some("Times-Bold"),
        "tiit" => Some("Times-Italic"),
        "tibi" => Some("Times-BoldItalic"),
        "cour" => Some("Courier"),
        "cobo" => Some("Courier-Bold"),
        "coit" => Some("Courier-Oblique"),
        "cobi" => Some("Courier-BoldOblique"),
        "symb" => Some("Symbol"),
        "zadb" => Some("ZapfDingbats"),
        _ => None,
    };

    alias.or_else(|| {
        BASE14
            .iter()
            .copied()
            .find(|base| base.eq_ignore_ascii_case(name))
    })
}

/// Single-byte Type1 font dictionary for a standard font
pub fn simple_font(base_font: &str) -> Dictionary {
    let mut dict = Dictionary::from_iter(vec![
        ("Type", "Font".into()),
        ("Subtype", "Type1".into()),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
    ]);
    // Symbolic fonts keep their built-in encoding
    if base_font != "Symbol" && base_font != "ZapfDingbats" {
        dict.set("Encoding", "WinAnsiEncoding");
    }
    dict
}

/// PDF objects making up a non-embedded composite font
///
/// References between the objects are filled in by [`FontResource::install`].
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFontType0 descendant dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary (no font file)
    pub font_descriptor: Dictionary,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

/// Build the composite font for a CJK collection
pub fn composite_font(ordering: Ordering, substitution: &dyn FontSubstitution) -> FontObjects {
    let base_font = substitution.cjk_base_font(ordering);
    let collection = ordering.collection().unwrap_or("GB1");
    let cmap = ordering.ucs2_cmap().unwrap_or("UniGB-UCS2-H");

    let tounicode_content = generate_identity_tounicode();
    let tounicode_stream = Stream::new(
        Dictionary::from_iter(vec![("Length", (tounicode_content.len() as i64).into())]),
        tounicode_content.into_bytes(),
    );

    let font_descriptor = Dictionary::from_iter(vec![
        ("Type", "FontDescriptor".into()),
        ("FontName", Object::Name(base_font.as_bytes().to_vec())),
        ("Flags", CJK_DESCRIPTOR_FLAGS.into()),
        (
            "FontBBox",
            vec![0.into(), (-200).into(), 1000.into(), 900.into()].into(),
        ),
        ("ItalicAngle", 0.into()),
        ("Ascent", 880.into()),
        ("Descent", (-120).into()),
        ("CapHeight", 880.into()),
        ("StemV", 80.into()),
    ]);

    let cid_system_info = Dictionary::from_iter(vec![
        ("Registry", Object::string_literal("Adobe")),
        ("Ordering", Object::string_literal(collection)),
        ("Supplement", ordering.supplement().into()),
    ]);

    let cid_font = Dictionary::from_iter(vec![
        ("Type", "Font".into()),
        ("Subtype", "CIDFontType0".into()),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
        ("CIDSystemInfo", cid_system_info.into()),
        ("DW", CJK_DEFAULT_WIDTH.into()),
    ]);

    let type0_font = Dictionary::from_iter(vec![
        ("Type", "Font".into()),
        ("Subtype", "Type0".into()),
        (
            "BaseFont",
            Object::Name(format!("{base_font}-{cmap}").into_bytes()),
        ),
        ("Encoding", Object::Name(cmap.as_bytes().to_vec())),
    ]);

    FontObjects {
        type0_font,
        cid_font,
        font_descriptor,
        tounicode_stream,
    }
}

/// ToUnicode CMap for the identity scheme: every 2-byte code maps to the
/// same BMP scalar. Surrogate codes are left unmapped.
fn generate_identity_tounicode() -> String {
    let mut cmap = String::new();

    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");

    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str("<0000> <FFFF>\n");
    cmap.push_str("endcodespacerange\n");

    // A bfrange may only vary in its last byte, so emit one row per high byte
    let high_bytes: Vec<u32> = (0x00..=0xFF)
        .filter(|hi| !(0xD8..=0xDF).contains(hi))
        .collect();

    // At most 100 entries per block
    for chunk in high_bytes.chunks(100) {
        cmap.push_str(&format!("{} beginbfrange\n", chunk.len()));
        for hi in chunk {
            cmap.push_str(&format!("<{hi:02X}00> <{hi:02X}FF> <{hi:02X}00>\n"));
        }
        cmap.push_str("endbfrange\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");

    cmap
}

/// A font waiting to be written into the document
pub enum FontResource {
    Simple(Dictionary),
    Composite(FontObjects),
}

impl FontResource {
    /// Font resource for a run of the given ordering
    ///
    /// `base14` is only used for Latin runs.
    pub fn for_run(ordering: Ordering, base14: &str, substitution: &dyn FontSubstitution) -> Self {
        if ordering.is_cjk() {
            FontResource::Composite(composite_font(ordering, substitution))
        } else {
            FontResource::Simple(simple_font(base14))
        }
    }

    /// Add the font's objects to the document, returning the font dictionary's id
    pub fn install(self, doc: &mut Document) -> ObjectId {
        match self {
            FontResource::Simple(dict) => doc.add_object(dict),
            FontResource::Composite(objects) => {
                let descriptor_id = doc.add_object(objects.font_descriptor);

                let mut cid_font = objects.cid_font;
                cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
                let cid_font_id = doc.add_object(cid_font);

                let tounicode_id = doc.add_object(objects.tounicode_stream);

                let mut type0_font = objects.type0_font;
                type0_font.set(
                    "DescendantFonts",
                    Object::Array(vec![Object::Reference(cid_font_id)]),
                );
                type0_font.set("ToUnicode", Object::Reference(tounicode_id));

                doc.add_object(type0_font)
            }
        }
    }
}
