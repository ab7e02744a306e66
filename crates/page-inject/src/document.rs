//! PDF Document wrapper

use crate::content::{image_operators, placed_operators, text_operators, Color, TextRun};
use crate::encoding::encode_run;
use crate::fit::{fit_and_draw, FitResult, FlowContent, FlowRenderer};
use crate::font::{resolve_base14, FontResource, FontSubstitution, StandardSubstitution};
use crate::geometry::{fit_image, Origin, PageSpace, Point, Rect, DEFAULT_PAGE_HEIGHT};
use crate::image::ImageXObject;
use crate::resources::{commit, PendingResource, Placement, ResourceCategory, ResourceSet};
use crate::script::{classify, decode_lossy};
use crate::{PdfError, Result};
use log::{debug, warn};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;

/// Options for [`PdfDocument::insert_text`]
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    /// One of the 14 standard font names or a short alias like `helv`
    pub font_name: String,
    pub font_size: f64,
    pub color: Color,
    /// Counter-clockwise rotation about the baseline origin: 0, 90, 180 or 270
    pub rotate: i32,
    pub origin: Origin,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_name: "Helvetica".to_string(),
            font_size: 11.0,
            color: Color::black(),
            rotate: 0,
            origin: Origin::TopLeft,
        }
    }
}

impl TextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn rotate(mut self, degrees: i32) -> Self {
        self.rotate = degrees;
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

/// Options for [`PdfDocument::insert_image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Scale without distortion and center inside the rectangle
    pub keep_proportion: bool,
    /// Draw above existing page content; `false` draws beneath it
    pub overlay: bool,
    pub origin: Origin,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            keep_proportion: true,
            overlay: true,
            origin: Origin::TopLeft,
        }
    }
}

impl ImageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_proportion(mut self, keep: bool) -> Self {
        self.keep_proportion = keep;
        self
    }

    pub fn overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

/// Options for [`PdfDocument::insert_flow`]
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    /// Stylesheet applied to the markup
    pub css: String,
    /// Smallest scale content may shrink to; 1.0 disables shrinking
    pub scale_low: f64,
    pub overlay: bool,
    pub origin: Origin,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            css: String::new(),
            scale_low: 0.0,
            overlay: true,
            origin: Origin::TopLeft,
        }
    }
}

impl FlowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn css(mut self, css: impl Into<String>) -> Self {
        self.css = css.into();
        self
    }

    pub fn scale_low(mut self, scale: f64) -> Self {
        self.scale_low = scale;
        self
    }

    pub fn overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

/// PDF Document wrapper providing content insertion on existing pages
///
/// All positions are in caller space: by default the origin is the top-left
/// corner of the page with Y growing downward. Each insertion's options may
/// select [`Origin::BottomLeft`] to pass PDF user-space coordinates.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Names the fonts declared for CJK text
    substitution: Box<dyn FontSubstitution>,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    /// Wrap an already loaded document
    pub fn from_document(inner: Document) -> Self {
        Self {
            inner,
            substitution: Box::new(StandardSubstitution),
        }
    }

    /// Replace the policy naming CJK fonts
    pub fn set_font_substitution(&mut self, substitution: Box<dyn FontSubstitution>) {
        self.substitution = substitution;
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Coordinate frame of a page (1-indexed)
    pub fn page_space(&self, page: usize) -> Result<PageSpace> {
        let page_id = self.page_id(page)?;
        self.page_space_of(page_id)
    }

    /// Insert a single run of text with its baseline origin at `at`
    ///
    /// ASCII text uses the requested standard font; text with any other
    /// character gets a composite CJK font chosen from the run's script.
    ///
    /// # Example
    /// ```ignore
    /// doc.insert_text(1, Point::new(72.0, 72.0), "Hello", &TextOptions::new().font_size(14.0))?;
    /// ```
    pub fn insert_text(
        &mut self,
        page: usize,
        at: Point,
        text: &str,
        options: &TextOptions,
    ) -> Result<()> {
        if !at.is_finite() {
            return Err(PdfError::InvalidArgument(format!(
                "text position ({}, {}) is not finite",
                at.x, at.y
            )));
        }
        if !options.font_size.is_finite() || options.font_size <= 0.0 {
            return Err(PdfError::InvalidArgument(format!(
                "font size must be positive, got {}",
                options.font_size
            )));
        }
        if !matches!(options.rotate, 0 | 90 | 180 | 270) {
            return Err(PdfError::InvalidArgument(format!(
                "rotation must be 0, 90, 180 or 270, got {}",
                options.rotate
            )));
        }

        let page_id = self.page_id(page)?;
        if text.is_empty() {
            return Ok(());
        }
        let space = self.page_space_of(page_id)?.with_origin(options.origin);

        let ordering = classify(text);
        let base_font = resolve_base14(&options.font_name).unwrap_or_else(|| {
            warn!(
                "Unknown font '{}', falling back to Helvetica",
                options.font_name
            );
            "Helvetica"
        });
        let encoded = encode_run(text, ordering);

        let mut resources = ResourceSet::for_page(&self.inner, page_id)?;
        let font = FontResource::for_run(ordering, base_font, self.substitution.as_ref());
        let font_name = resources.add(ResourceCategory::Font, PendingResource::Font(font));

        let origin = space.to_native(at);
        let operators = text_operators(&TextRun {
            font_name: &font_name,
            font_size: options.font_size,
            color: options.color,
            origin,
            rotate: options.rotate,
            encoded: &encoded,
        });

        commit(
            &mut self.inner,
            page_id,
            resources,
            operators,
            Placement::Overlay,
        )?;
        debug!(
            "Inserted {:?} text as /{} on page {} at ({}, {})",
            ordering, font_name, page, origin.x, origin.y
        );
        Ok(())
    }

    /// Insert text given as UTF-8 bytes
    ///
    /// Invalid sequences become U+FFFD instead of failing the insertion.
    pub fn insert_text_bytes(
        &mut self,
        page: usize,
        at: Point,
        bytes: &[u8],
        options: &TextOptions,
    ) -> Result<()> {
        let text = decode_lossy(bytes);
        self.insert_text(page, at, &text, options)
    }

    /// Insert a JPEG or PNG image into `rect`
    ///
    /// # Example
    /// ```ignore
    /// let logo = std::fs::read("logo.png")?;
    /// doc.insert_image(1, Rect::new(50.0, 50.0, 150.0, 100.0), &logo, &ImageOptions::new())?;
    /// ```
    pub fn insert_image(
        &mut self,
        page: usize,
        rect: Rect,
        data: &[u8],
        options: &ImageOptions,
    ) -> Result<()> {
        rect.validate()?;
        if data.is_empty() {
            return Err(PdfError::InvalidArgument("image data is empty".to_string()));
        }

        let page_id = self.page_id(page)?;
        let space = self.page_space_of(page_id)?.with_origin(options.origin);

        let image = ImageXObject::decode(data)?;
        let target = fit_image(rect, image.width, image.height, options.keep_proportion);
        let (width, height) = (image.width, image.height);

        let mut resources = ResourceSet::for_page(&self.inner, page_id)?;
        let name = resources.add(ResourceCategory::XObject, PendingResource::Image(image));
        let operators =
            image_operators(&name, space.caller_to_native(), space.image_matrix(target));

        commit(
            &mut self.inner,
            page_id,
            resources,
            operators,
            Placement::from_overlay(options.overlay),
        )?;
        debug!(
            "Inserted {}x{} image as /{} on page {} at {:?}",
            width, height, name, page, target
        );
        Ok(())
    }

    /// Lay out `html` inside `rect`, shrinking it if needed
    ///
    /// Overflow is not an error: the content is drawn at the smallest
    /// permitted scale and the result reports `fitted == false`.
    pub fn insert_flow(
        &mut self,
        page: usize,
        rect: Rect,
        html: &str,
        options: &FlowOptions,
        renderer: &mut dyn FlowRenderer,
    ) -> Result<FitResult> {
        rect.validate()?;
        let page_id = self.page_id(page)?;

        if html.trim().is_empty() {
            return Ok(FitResult {
                fitted: true,
                scale: 1.0,
                spare_height: rect.height(),
            });
        }
        let space = self.page_space_of(page_id)?.with_origin(options.origin);

        let content = FlowContent {
            html,
            css: &options.css,
        };
        let mut resources = ResourceSet::for_page(&self.inner, page_id)?;
        let (result, drawing) = fit_and_draw(
            renderer,
            &content,
            rect.width(),
            rect.height(),
            options.scale_low,
            &mut resources,
        )?;

        let operators = placed_operators(space.flow_matrix(rect, result.scale), &drawing);
        commit(
            &mut self.inner,
            page_id,
            resources,
            operators,
            Placement::from_overlay(options.overlay),
        )?;
        debug!(
            "Inserted flow on page {} at scale {:.4} (fitted: {})",
            page, result.scale, result.fitted
        );
        Ok(result)
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Object id of a page (1-indexed)
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        u32::try_from(page)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Frame of the visible page: CropBox when present, else MediaBox
    fn page_space_of(&self, page_id: ObjectId) -> Result<PageSpace> {
        let page_box = match self.get_inherited_box(page_id, b"CropBox")? {
            Some(crop_box) => Some(crop_box),
            None => self.get_inherited_box(page_id, b"MediaBox")?,
        };
        let height = match page_box {
            Some(page_box) => extract_height_from_media_box(&page_box)?,
            None => DEFAULT_PAGE_HEIGHT,
        };
        Ok(PageSpace::new(height))
    }

    /// Get a page box entry, following the parent inheritance chain
    fn get_inherited_box(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Vec<Object>>> {
        let mut current_id = page_id;

        // Follow parent chain up to 10 levels
        for _ in 0..10 {
            let dict = self.inner.get_dictionary(current_id)?;

            if let Ok(media_box) = dict.get(key) {
                let media_box_array = match media_box {
                    Object::Array(arr) => arr.clone(),
                    Object::Reference(ref_id) => self
                        .inner
                        .get_object(*ref_id)?
                        .as_array()
                        .map_err(|_| {
                            PdfError::ParseError("MediaBox reference is not an array".to_string())
                        })?
                        .clone(),
                    _ => return Err(PdfError::ParseError("MediaBox is not an array".to_string())),
                };
                return Ok(Some(media_box_array));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }
}

fn box_number(value: &Object) -> Option<f64> {
    value
        .as_f32()
        .map(|v| v as f64)
        .ok()
        .or_else(|| value.as_i64().ok().map(|v| v as f64))
}

/// Height of a `[x0 y0 x1 y1]` box
fn extract_height_from_media_box(media_box: &[Object]) -> Result<f64> {
    if media_box.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }
    let y0 = box_number(&media_box[1])
        .ok_or_else(|| PdfError::ParseError("Invalid MediaBox y1".to_string()))?;
    let y1 = box_number(&media_box[3])
        .ok_or_else(|| PdfError::ParseError("Invalid MediaBox y2".to_string()))?;
    Ok((y1 - y0).abs())
}
