//! Integration tests for page-inject
//!
//! These tests verify end-to-end insertion into in-memory PDFs.

use lopdf::content::Content;
use lopdf::{dictionary, Object, ObjectId};
use page_inject::encoding::encode_literal;
use page_inject::geometry::PageSpace;
use page_inject::{
    classify, Color, FlowContent, FlowDrawing, FlowMeasure, FlowOptions, FlowRenderer,
    ImageOptions, Ordering, Origin, PdfDocument, PdfError, PendingResource, Point, Rect,
    ResourceCategory, ResourceSet, TextOptions,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Cursor;

/// Create a minimal valid PDF with US Letter pages
fn create_test_pdf_with_pages(page_count: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.7");

    let pages_id = doc.new_object_id();

    let mut page_ids: Vec<Object> = Vec::new();
    for _ in 0..page_count {
        // Contents stream as a separate object
        let contents_id = doc.add_object(lopdf::Stream::new(dictionary! {}, b"0 0 m".to_vec()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {},
            "Contents" => contents_id,
        });
        page_ids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "Kids" => page_ids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn create_test_pdf() -> Vec<u8> {
    create_test_pdf_with_pages(1)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn page_dict(doc: &PdfDocument, page: usize) -> lopdf::Dictionary {
    let id = doc.page_id(page).unwrap();
    doc.inner().get_dictionary(id).unwrap().clone()
}

fn content_ids(doc: &PdfDocument, page: usize) -> Vec<ObjectId> {
    page_dict(doc, page)
        .get(b"Contents")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_reference().unwrap())
        .collect()
}

fn stream_text(doc: &PdfDocument, id: ObjectId) -> String {
    let stream = doc.inner().get_object(id).unwrap().as_stream().unwrap();
    String::from_utf8(stream.content.clone()).unwrap()
}

fn last_stream_text(doc: &PdfDocument, page: usize) -> String {
    let ids = content_ids(doc, page);
    stream_text(doc, *ids.last().unwrap())
}

fn resource_names(doc: &PdfDocument, page: usize, category: &[u8]) -> Vec<String> {
    let page = page_dict(doc, page);
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    match resources.get(category) {
        Ok(dict) => dict
            .as_dict()
            .unwrap()
            .iter()
            .map(|(k, _)| String::from_utf8(k.clone()).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn resource_ref(doc: &PdfDocument, page: usize, category: &[u8], name: &[u8]) -> ObjectId {
    page_dict(doc, page)
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(category)
        .unwrap()
        .as_dict()
        .unwrap()
        .get(name)
        .unwrap()
        .as_reference()
        .unwrap()
}

/// Five objects, with the page already using the font name `F6`
fn pdf_with_font_named_f6() -> PdfDocument {
    let mut doc = lopdf::Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let contents_id = doc.add_object(lopdf::Stream::new(dictionary! {}, b"0 0 m".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F6" => font_id },
        },
        "Contents" => contents_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    assert_eq!(doc.max_id, 5);
    PdfDocument::from_document(doc)
}

/// Draws a fixed 10pt block, optionally failing or registering extra
/// resource kinds
#[derive(Default)]
struct StubRenderer {
    fail_measure: bool,
    fail_draw: bool,
    graphics_state: bool,
}

impl FlowRenderer for StubRenderer {
    fn measure(
        &mut self,
        _content: &FlowContent,
        _width: f64,
        height: f64,
    ) -> page_inject::Result<FlowMeasure> {
        if self.fail_measure {
            return Err(PdfError::Render("layout failed".to_string()));
        }
        Ok(FlowMeasure {
            fits: height >= 10.0,
            used_height: height.min(10.0),
        })
    }

    fn draw(
        &mut self,
        content: &FlowContent,
        width: f64,
        height: f64,
        resources: &mut ResourceSet,
    ) -> page_inject::Result<FlowDrawing> {
        if self.fail_draw {
            return Err(PdfError::Render("drawing failed".to_string()));
        }
        let measure = self.measure(content, width, height)?;

        let mut ops = String::from("0 0 10 10 re f\n");
        if self.graphics_state {
            let gs = resources.add(
                ResourceCategory::ExtGState,
                PendingResource::Object(Object::Dictionary(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(0.5),
                })),
            );
            let form = resources.add(
                ResourceCategory::XObject,
                PendingResource::Object(Object::Stream(lopdf::Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                    },
                    b"0 0 m".to_vec(),
                ))),
            );
            ops.push_str(&format!("/{gs} gs\n/{form} Do\n"));
        }

        Ok(FlowDrawing {
            content: ops.into_bytes(),
            measure,
        })
    }
}

#[test]
fn test_open_and_count_pages() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(3)).unwrap();
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.page_space(2).unwrap().height, 792.0);
}

#[test]
fn test_open_invalid_bytes() {
    let result = PdfDocument::open_from_bytes(b"not a pdf");
    assert!(matches!(result, Err(PdfError::OpenError(_))));
}

#[test]
fn test_text_baseline_is_flipped() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();

    doc.insert_text(1, Point::new(10.0, 10.0), "A", &TextOptions::new())
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("10 782 Td"), "{ops}");
    assert!(ops.starts_with("q\n"));
    assert!(ops.ends_with("Q\n"));

    let fonts = resource_names(&doc, 1, b"Font");
    assert_eq!(fonts.len(), 1);
    assert!(ops.contains(&format!("/{} 11 Tf", fonts[0])));
}

#[test]
fn test_text_operator_sequence() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = TextOptions::new()
        .font_name("tiro")
        .font_size(14.0)
        .color(Color::rgb(0.0, 0.0, 1.0));
    doc.insert_text(1, Point::new(72.0, 100.0), "Total (net)", &options)
        .unwrap();

    let ids = content_ids(&doc, 1);
    let stream = doc.inner().get_object(ids[1]).unwrap().as_stream().unwrap();
    let content = Content::decode(&stream.content).unwrap();
    let operators: Vec<&str> = content
        .operations
        .iter()
        .map(|op| op.operator.as_str())
        .collect();
    assert_eq!(
        operators,
        vec!["q", "BT", "rg", "Tf", "Td", "Tj", "ET", "Q"]
    );

    let shown = content.operations[5].operands[0].as_str().unwrap();
    assert_eq!(shown, b"Total (net)");

    let font_name = resource_names(&doc, 1, b"Font").remove(0);
    let font = page_dict(&doc, 1)
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Font")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(font_name.as_bytes())
        .unwrap()
        .as_reference()
        .unwrap();
    let font = doc.inner().get_dictionary(font).unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Times-Roman");
}

#[test]
fn test_cjk_text_uses_composite_font() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    doc.insert_text(1, Point::new(50.0, 50.0), "こんにちは", &TextOptions::new())
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("<30533093306B3061306F> Tj"), "{ops}");

    let page = page_dict(&doc, 1);
    let fonts = page
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Font")
        .unwrap()
        .as_dict()
        .unwrap();
    let (_, font_ref) = fonts.iter().next().unwrap();
    let font = doc
        .inner()
        .get_dictionary(font_ref.as_reference().unwrap())
        .unwrap();

    assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
    assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"UniJIS-UCS2-H");
    assert!(font.get(b"ToUnicode").unwrap().as_reference().is_ok());

    let descendants = font.get(b"DescendantFonts").unwrap().as_array().unwrap();
    let cid_font = doc
        .inner()
        .get_dictionary(descendants[0].as_reference().unwrap())
        .unwrap();
    let info = cid_font.get(b"CIDSystemInfo").unwrap().as_dict().unwrap();
    assert_eq!(info.get(b"Registry").unwrap().as_str().unwrap(), b"Adobe");
    assert_eq!(info.get(b"Ordering").unwrap().as_str().unwrap(), b"Japan1");
    assert_eq!(info.get(b"Supplement").unwrap().as_i64().unwrap(), 7);
    assert_eq!(cid_font.get(b"DW").unwrap().as_i64().unwrap(), 1000);
}

#[test]
fn test_invalid_utf8_is_substituted() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    doc.insert_text_bytes(1, Point::new(10.0, 20.0), b"ok\xff", &TextOptions::new())
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("<006F006BFFFD> Tj"), "{ops}");
}

#[test]
fn test_unknown_font_falls_back() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = TextOptions::new().font_name("NoSuchFont");
    doc.insert_text(1, Point::new(10.0, 20.0), "x", &options)
        .unwrap();

    let page = page_dict(&doc, 1);
    let fonts = page
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Font")
        .unwrap()
        .as_dict()
        .unwrap();
    let (_, font_ref) = fonts.iter().next().unwrap();
    let font = doc
        .inner()
        .get_dictionary(font_ref.as_reference().unwrap())
        .unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
}

#[test]
fn test_image_letterboxed() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    doc.insert_image(
        1,
        Rect::new(0.0, 0.0, 50.0, 50.0),
        &png_bytes(200, 100),
        &ImageOptions::new(),
    )
    .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("1 0 0 -1 0 792 cm\n"), "{ops}");
    assert!(ops.contains("50 0 0 -25 0 37.5 cm\n"), "{ops}");

    let images = resource_names(&doc, 1, b"XObject");
    assert_eq!(images.len(), 1);
    assert!(images[0].starts_with("Img"));
    assert!(ops.contains(&format!("/{} Do", images[0])));
}

#[test]
fn test_image_stretched() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = ImageOptions::new().keep_proportion(false);
    doc.insert_image(1, Rect::new(0.0, 0.0, 50.0, 50.0), &png_bytes(200, 100), &options)
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("50 0 0 -50 0 50 cm\n"), "{ops}");
}

#[test]
fn test_image_underlay_goes_first() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let original = page_dict(&doc, 1)
        .get(b"Contents")
        .unwrap()
        .as_reference()
        .unwrap();

    let options = ImageOptions::new().overlay(false);
    doc.insert_image(1, Rect::new(10.0, 10.0, 60.0, 60.0), &png_bytes(4, 4), &options)
        .unwrap();

    let ids = content_ids(&doc, 1);
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[1], original);
    assert!(stream_text(&doc, ids[0]).contains(" Do\n"));
}

#[test]
fn test_overlay_wraps_single_stream() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let original = page_dict(&doc, 1)
        .get(b"Contents")
        .unwrap()
        .as_reference()
        .unwrap();

    doc.insert_text(1, Point::new(10.0, 10.0), "A", &TextOptions::new())
        .unwrap();

    let ids = content_ids(&doc, 1);
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], original);
}

#[test]
fn test_invalid_rect_leaves_page_untouched() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let before = doc.inner().objects.len();

    let result = doc.insert_image(
        1,
        Rect::new(50.0, 50.0, 50.0, 80.0),
        &png_bytes(4, 4),
        &ImageOptions::new(),
    );
    assert!(matches!(result, Err(PdfError::InvalidRect { .. })));
    assert_eq!(doc.inner().objects.len(), before);
}

#[test]
fn test_corrupt_image_leaves_page_untouched() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let before = doc.inner().objects.len();

    let result = doc.insert_image(
        1,
        Rect::new(0.0, 0.0, 50.0, 50.0),
        b"\x89PNG\r\n\x1a\ngarbage",
        &ImageOptions::new(),
    );
    assert!(matches!(result, Err(PdfError::ImageError(_))));
    assert_eq!(doc.inner().objects.len(), before);
    assert!(resource_names(&doc, 1, b"XObject").is_empty());
}

#[test]
fn test_resource_names_strictly_increase() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    for i in 0..5 {
        doc.insert_text(1, Point::new(10.0, 10.0 + i as f64 * 12.0), "line", &TextOptions::new())
            .unwrap();
    }

    let mut numbers: Vec<u32> = resource_names(&doc, 1, b"Font")
        .iter()
        .map(|name| name.trim_start_matches('F').parse().unwrap())
        .collect();
    assert_eq!(numbers.len(), 5);
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 5);
}

#[test]
fn test_second_page_is_independent() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(2)).unwrap();
    doc.insert_text(2, Point::new(10.0, 10.0), "A", &TextOptions::new())
        .unwrap();

    assert!(resource_names(&doc, 1, b"Font").is_empty());
    assert_eq!(resource_names(&doc, 2, b"Font").len(), 1);
}

#[test]
fn test_save_and_reopen() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    doc.insert_text(1, Point::new(10.0, 10.0), "漢字", &TextOptions::new())
        .unwrap();
    doc.insert_image(
        1,
        Rect::new(100.0, 100.0, 200.0, 150.0),
        &png_bytes(20, 10),
        &ImageOptions::new(),
    )
    .unwrap();

    let bytes = doc.to_bytes().unwrap();
    let reopened = PdfDocument::open_from_bytes(&bytes).unwrap();
    assert_eq!(reopened.page_count(), 1);
    assert_eq!(content_ids(&reopened, 1).len(), 3);
    assert_eq!(resource_names(&reopened, 1, b"Font").len(), 1);
}

proptest! {
    #[test]
    fn prop_ascii_runs_are_latin(text in "[ -~]{0,64}") {
        prop_assert_eq!(classify(&text), Ordering::Latin);
    }

    #[test]
    fn prop_hiragana_wins(
        prefix in "\\PC{0,16}",
        kana in "[\u{3041}-\u{3096}]",
        suffix in "\\PC{0,16}",
    ) {
        let text = format!("{prefix}{kana}{suffix}");
        prop_assert_eq!(classify(&text), Ordering::Japanese);
    }

    #[test]
    fn prop_literal_round_trip(text in "[ -~]{1,64}") {
        let mut ops = b"BT ".to_vec();
        ops.extend_from_slice(&encode_literal(&text));
        ops.extend_from_slice(b" Tj ET");

        let content = Content::decode(&ops).unwrap();
        let shown = content.operations[1].operands[0].as_str().unwrap();
        prop_assert_eq!(shown, text.as_bytes());
    }

    #[test]
    fn prop_flip_is_involution(height in 1.0f64..5000.0, y in -5000.0f64..5000.0) {
        let space = PageSpace::new(height);
        let twice = space.flip_y(space.flip_y(y));
        prop_assert!((twice - y).abs() < 1e-9);
    }
}

#[test]
fn test_existing_resource_name_is_not_replaced() {
    let mut doc = pdf_with_font_named_f6();

    doc.insert_text(1, Point::new(10.0, 10.0), "A", &TextOptions::new())
        .unwrap();

    assert_eq!(resource_ref(&doc, 1, b"Font", b"F6"), (2, 0));
    let mut fonts = resource_names(&doc, 1, b"Font");
    fonts.sort();
    assert_eq!(fonts, vec!["F6".to_string(), "F7".to_string()]);
    assert!(last_stream_text(&doc, 1).contains("/F7 11 Tf"));
}

#[test]
fn test_text_with_bottom_left_origin() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = TextOptions::new().origin(Origin::BottomLeft);

    doc.insert_text(1, Point::new(10.0, 10.0), "A", &options)
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("10 10 Td"), "{ops}");
}

#[test]
fn test_image_with_bottom_left_origin() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = ImageOptions::new()
        .keep_proportion(false)
        .origin(Origin::BottomLeft);

    doc.insert_image(1, Rect::new(10.0, 20.0, 60.0, 40.0), &png_bytes(4, 4), &options)
        .unwrap();

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains("1 0 0 1 0 0 cm\n"), "{ops}");
    assert!(ops.contains("50 0 0 20 10 20 cm\n"), "{ops}");
}

#[test]
fn test_flow_placement_for_both_origins() {
    let rect = Rect::new(72.0, 100.0, 272.0, 300.0);

    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    doc.insert_flow(1, rect, "<p>x</p>", &FlowOptions::new(), &mut StubRenderer::default())
        .unwrap();
    let ops = last_stream_text(&doc, 1);
    assert!(ops.starts_with("q\n1 0 0 1 72 492 cm\n"), "{ops}");

    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let options = FlowOptions::new().origin(Origin::BottomLeft);
    doc.insert_flow(1, rect, "<p>x</p>", &options, &mut StubRenderer::default())
        .unwrap();
    let ops = last_stream_text(&doc, 1);
    assert!(ops.starts_with("q\n1 0 0 1 72 100 cm\n"), "{ops}");
}

#[test]
fn test_flow_renderer_failures_leave_document_untouched() {
    let failing = [
        StubRenderer {
            fail_measure: true,
            ..StubRenderer::default()
        },
        StubRenderer {
            fail_draw: true,
            graphics_state: true,
            ..StubRenderer::default()
        },
    ];

    for mut renderer in failing {
        let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
        let objects = doc.inner().objects.len();
        let max_id = doc.inner().max_id;
        let page = page_dict(&doc, 1);

        let result = doc.insert_flow(
            1,
            Rect::new(72.0, 72.0, 540.0, 200.0),
            "<p>x</p>",
            &FlowOptions::new(),
            &mut renderer,
        );

        assert!(matches!(result, Err(PdfError::Render(_))));
        assert_eq!(doc.inner().objects.len(), objects);
        assert_eq!(doc.inner().max_id, max_id);
        assert_eq!(page_dict(&doc, 1), page);
    }
}

#[test]
fn test_flow_merges_graphics_state_and_xobjects() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf()).unwrap();
    let mut renderer = StubRenderer {
        graphics_state: true,
        ..StubRenderer::default()
    };

    let result = doc
        .insert_flow(
            1,
            Rect::new(72.0, 72.0, 540.0, 200.0),
            "<p>x</p>",
            &FlowOptions::new(),
            &mut renderer,
        )
        .unwrap();
    assert!(result.fitted);

    let states = resource_names(&doc, 1, b"ExtGState");
    let forms = resource_names(&doc, 1, b"XObject");
    assert_eq!(states.len(), 1);
    assert_eq!(forms.len(), 1);
    assert!(states[0].starts_with("GS"));
    assert!(forms[0].starts_with("Img"));

    let state = resource_ref(&doc, 1, b"ExtGState", states[0].as_bytes());
    let state = doc.inner().get_dictionary(state).unwrap();
    assert_eq!(state.get(b"Type").unwrap().as_name().unwrap(), b"ExtGState");

    let ops = last_stream_text(&doc, 1);
    assert!(ops.contains(&format!("/{} gs", states[0])), "{ops}");
    assert!(ops.contains(&format!("/{} Do", forms[0])), "{ops}");
}
