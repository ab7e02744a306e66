//! Caller coordinates and PDF user space
//!
//! Callers describe positions with a top-left origin and Y growing
//! downward unless they ask for [`Origin::BottomLeft`]. PDF user space has a
//! bottom-left origin with Y growing upward. [`PageSpace`] converts between
//! the two for a page of known height.

use crate::{PdfError, Result};

/// Page height used when a page has no MediaBox or CropBox (US Letter)
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Corner caller coordinates are measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Y grows downward from the top edge
    #[default]
    TopLeft,
    /// PDF user space; Y grows upward from the bottom edge
    BottomLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle given by two corners
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Reject degenerate, inverted or non-finite rectangles
    pub fn validate(&self) -> Result<()> {
        let finite = [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(PdfError::InvalidRect {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Uniform scale followed by a translation
    pub fn scale_translate(scale: f64, e: f64, f: f64) -> Self {
        Self::new(scale, 0.0, 0.0, scale, e, f)
    }

    /// Counter-clockwise rotation by a multiple of 90 degrees about `origin`
    pub fn rotation(degrees: i32, origin: Point) -> Self {
        let (sin, cos) = match degrees.rem_euclid(360) {
            90 => (1.0, 0.0),
            180 => (0.0, -1.0),
            270 => (-1.0, 0.0),
            _ => (0.0, 1.0),
        };
        Self::new(cos, sin, -sin, cos, origin.x, origin.y)
    }

    /// Apply `self` first, then `next`; equals `self × next`
    pub fn concat(self, next: Self) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    pub fn to_array(self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Vertical frame of one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpace {
    pub height: f64,
    pub origin: Origin,
}

impl Default for PageSpace {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_HEIGHT)
    }
}

impl PageSpace {
    pub fn new(height: f64) -> Self {
        Self {
            height,
            origin: Origin::TopLeft,
        }
    }

    pub fn with_origin(self, origin: Origin) -> Self {
        Self { origin, ..self }
    }

    /// Map a Y value between caller and PDF space; it is its own inverse
    pub fn flip_y(&self, y: f64) -> f64 {
        match self.origin {
            Origin::TopLeft => self.height - y,
            Origin::BottomLeft => y,
        }
    }

    /// Caller point to PDF user space
    pub fn to_native(&self, p: Point) -> Point {
        Point::new(p.x, self.flip_y(p.y))
    }

    /// Matrix mapping caller coordinates onto PDF user space
    pub fn caller_to_native(&self) -> Matrix {
        match self.origin {
            Origin::TopLeft => Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, self.height),
            Origin::BottomLeft => Matrix::identity(),
        }
    }

    /// Placement for `s 0 0 s e f cm` that maps a box-local drawing of size
    /// `(rect.width() / scale, rect.height() / scale)` onto `rect`
    pub fn flow_matrix(&self, rect: Rect, scale: f64) -> Matrix {
        let bottom = match self.origin {
            Origin::TopLeft => self.flip_y(rect.y1),
            Origin::BottomLeft => rect.y0,
        };
        Matrix::scale_translate(scale, rect.x0, bottom)
    }

    /// Image placement matrix, expressed in caller space
    ///
    /// Once composed with [`caller_to_native`](Self::caller_to_native) the
    /// image's first row lands at the top of the rectangle. For a top-left
    /// origin the vertical extent is negated and the origin sits on the
    /// rectangle's bottom edge.
    pub fn image_matrix(&self, rect: Rect) -> Matrix {
        match self.origin {
            Origin::TopLeft => {
                Matrix::new(rect.width(), 0.0, 0.0, -rect.height(), rect.x0, rect.y1)
            }
            Origin::BottomLeft => {
                Matrix::new(rect.width(), 0.0, 0.0, rect.height(), rect.x0, rect.y0)
            }
        }
    }
}

/// Target rectangle for an image of `width × height` pixels
///
/// With `keep_proportion` the image is scaled to the largest size fitting
/// `rect` without distortion and centered inside it.
pub fn fit_image(rect: Rect, width: u32, height: u32, keep_proportion: bool) -> Rect {
    if !keep_proportion || width == 0 || height == 0 {
        return rect;
    }

    let scale = (rect.width() / width as f64).min(rect.height() / height as f64);
    let new_width = width as f64 * scale;
    let new_height = height as f64 * scale;
    let x0 = rect.x0 + (rect.width() - new_width) / 2.0;
    let y0 = rect.y0 + (rect.height() - new_height) / 2.0;

    Rect::new(x0, y0, x0 + new_width, y0 + new_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_validate() {
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).validate().is_ok());
        assert!(matches!(
            Rect::new(10.0, 0.0, 10.0, 10.0).validate(),
            Err(PdfError::InvalidRect { .. })
        ));
        assert!(Rect::new(0.0, 10.0, 10.0, 0.0).validate().is_err());
        assert!(Rect::new(0.0, 0.0, f64::NAN, 10.0).validate().is_err());
    }

    #[test]
    fn test_to_native() {
        let space = PageSpace::new(792.0);
        assert_eq!(space.to_native(Point::new(10.0, 10.0)), Point::new(10.0, 782.0));
        assert_eq!(PageSpace::default().height, 792.0);
    }

    #[test]
    fn test_caller_to_native_matches_to_native() {
        let space = PageSpace::new(841.89);
        let p = Point::new(72.0, 100.0);
        let via_matrix = space.caller_to_native().apply(p);
        let direct = space.to_native(p);
        assert!((via_matrix.x - direct.x).abs() < 1e-9);
        assert!((via_matrix.y - direct.y).abs() < 1e-9);
    }

    #[test]
    fn test_concat_order() {
        let scale = Matrix::scale_translate(2.0, 0.0, 0.0);
        let shift = Matrix::scale_translate(1.0, 10.0, 0.0);
        // Scale first, then shift
        assert_eq!(scale.concat(shift).apply(Point::new(1.0, 0.0)), Point::new(12.0, 0.0));
        // Shift first, then scale
        assert_eq!(shift.concat(scale).apply(Point::new(1.0, 0.0)), Point::new(22.0, 0.0));
    }

    #[test]
    fn test_image_matrix_lands_upright() {
        let space = PageSpace::new(792.0);
        let rect = Rect::new(100.0, 50.0, 150.0, 75.0);
        let ctm = space.image_matrix(rect).concat(space.caller_to_native());
        assert_eq!(ctm.to_array(), [50.0, 0.0, 0.0, 25.0, 100.0, 717.0]);

        // Top row of the image (v = 1) lands on the rectangle's top edge
        let top = ctm.apply(Point::new(0.0, 1.0));
        assert_eq!(top, space.to_native(Point::new(100.0, 50.0)));
    }

    #[test]
    fn test_fit_image_letterbox() {
        let placed = fit_image(Rect::new(0.0, 0.0, 50.0, 50.0), 200, 100, true);
        assert_eq!(placed, Rect::new(0.0, 12.5, 50.0, 37.5));
        assert_eq!(placed.width(), 50.0);
        assert_eq!(placed.height(), 25.0);
    }

    #[test]
    fn test_fit_image_pillarbox() {
        let placed = fit_image(Rect::new(10.0, 10.0, 110.0, 60.0), 100, 100, true);
        assert_eq!(placed, Rect::new(35.0, 10.0, 85.0, 60.0));
    }

    #[test]
    fn test_fit_image_stretch() {
        let rect = Rect::new(0.0, 0.0, 50.0, 50.0);
        assert_eq!(fit_image(rect, 200, 100, false), rect);
    }

    #[test]
    fn test_flow_matrix() {
        let space = PageSpace::new(800.0);
        let m = space.flow_matrix(Rect::new(50.0, 100.0, 250.0, 300.0), 0.5);
        assert_eq!(m.to_array(), [0.5, 0.0, 0.0, 0.5, 50.0, 500.0]);
        // Top of the enlarged local box maps to the rectangle's top edge
        let top = m.apply(Point::new(0.0, 200.0 / 0.5));
        assert_eq!(top.y, space.flip_y(100.0));
    }

    #[test]
    fn test_bottom_left_origin_is_native() {
        let space = PageSpace::new(792.0).with_origin(Origin::BottomLeft);
        assert_eq!(space.to_native(Point::new(10.0, 10.0)), Point::new(10.0, 10.0));
        assert_eq!(space.caller_to_native(), Matrix::identity());

        let rect = Rect::new(50.0, 100.0, 250.0, 300.0);
        assert_eq!(
            space.flow_matrix(rect, 0.5).to_array(),
            [0.5, 0.0, 0.0, 0.5, 50.0, 100.0]
        );

        let ctm = space.image_matrix(rect).concat(space.caller_to_native());
        assert_eq!(ctm.to_array(), [200.0, 0.0, 0.0, 200.0, 50.0, 100.0]);
        assert_eq!(ctm.apply(Point::new(0.0, 1.0)), Point::new(50.0, 300.0));
    }

    #[test]
    fn test_rotation() {
        let m = Matrix::rotation(90, Point::new(10.0, 20.0));
        assert_eq!(m.apply(Point::new(1.0, 0.0)), Point::new(10.0, 21.0));
        assert_eq!(Matrix::rotation(0, Point::default()), Matrix::identity());
    }
}
