//! Content stream operators for inserted content
//!
//! Every generated stream is bracketed by `q … Q` so its graphics state
//! cannot leak into streams drawn before or after it.

use crate::geometry::{Matrix, Point};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn red() -> Self {
        Self::rgb(1.0, 0.0, 0.0)
    }

    pub fn green() -> Self {
        Self::rgb(0.0, 1.0, 0.0)
    }

    pub fn blue() -> Self {
        Self::rgb(0.0, 0.0, 1.0)
    }

    /// Components limited to the 0.0 - 1.0 range
    pub fn clamped(self) -> Self {
        Self::rgb(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Compact decimal form: at most four fractional digits, no trailing zeros
pub fn format_number(value: f64) -> String {
    let mut s = format!("{value:.4}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Append-only operator writer
///
/// Operands are always complete tokens, so no operator ever splits an
/// escape sequence.
#[derive(Debug, Default)]
pub struct ContentWriter {
    buf: Vec<u8>,
}

impl ContentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, operands: &[f64], operator: &str) -> &mut Self {
        for value in operands {
            self.buf.extend_from_slice(format_number(*value).as_bytes());
            self.buf.push(b' ');
        }
        self.buf.extend_from_slice(operator.as_bytes());
        self.buf.push(b'\n');
        self
    }

    pub fn save_state(&mut self) -> &mut Self {
        self.op(&[], "q")
    }

    pub fn restore_state(&mut self) -> &mut Self {
        self.op(&[], "Q")
    }

    pub fn begin_text(&mut self) -> &mut Self {
        self.op(&[], "BT")
    }

    pub fn end_text(&mut self) -> &mut Self {
        self.op(&[], "ET")
    }

    pub fn fill_color(&mut self, color: Color) -> &mut Self {
        let c = color.clamped();
        self.op(&[c.r as f64, c.g as f64, c.b as f64], "rg")
    }

    pub fn set_font(&mut self, resource_name: &str, size: f64) -> &mut Self {
        self.buf.push(b'/');
        self.buf.extend_from_slice(resource_name.as_bytes());
        self.buf.push(b' ');
        self.op(&[size], "Tf")
    }

    pub fn move_text(&mut self, x: f64, y: f64) -> &mut Self {
        self.op(&[x, y], "Td")
    }

    pub fn text_matrix(&mut self, m: Matrix) -> &mut Self {
        self.op(&m.to_array(), "Tm")
    }

    /// Show an already encoded string operand (`(…)` or `<…>`)
    pub fn show_text(&mut self, encoded: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(encoded);
        self.buf.extend_from_slice(b" Tj\n");
        self
    }

    pub fn concat_matrix(&mut self, m: Matrix) -> &mut Self {
        self.op(&m.to_array(), "cm")
    }

    pub fn draw_xobject(&mut self, resource_name: &str) -> &mut Self {
        self.buf.push(b'/');
        self.buf.extend_from_slice(resource_name.as_bytes());
        self.buf.extend_from_slice(b" Do\n");
        self
    }

    /// Append operators produced elsewhere, ensuring a trailing newline
    pub fn raw(&mut self, content: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(content);
        if !content.is_empty() && !content.ends_with(b"\n") {
            self.buf.push(b'\n');
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A single positioned text run
pub struct TextRun<'a> {
    /// Font resource name (e.g., "F12")
    pub font_name: &'a str,
    pub font_size: f64,
    pub color: Color,
    /// Baseline origin in PDF user space
    pub origin: Point,
    /// Counter-clockwise rotation in degrees, a multiple of 90
    pub rotate: i32,
    /// Encoded string operand
    pub encoded: &'a [u8],
}

/// Generate `q BT rg Tf Td Tj ET Q` for one text run
///
/// A rotated run is positioned with `Tm` instead of `Td`.
pub fn text_operators(run: &TextRun) -> Vec<u8> {
    let mut w = ContentWriter::new();
    w.save_state().begin_text().fill_color(run.color);
    w.set_font(run.font_name, run.font_size);
    if run.rotate.rem_euclid(360) == 0 {
        w.move_text(run.origin.x, run.origin.y);
    } else {
        w.text_matrix(Matrix::rotation(run.rotate, run.origin));
    }
    w.show_text(run.encoded).end_text().restore_state();
    w.finish()
}

/// Generate operators drawing an image XObject
///
/// `to_native` maps caller space onto PDF user space and `placement` maps the
/// unit square onto the target rectangle in caller space.
pub fn image_operators(image_name: &str, to_native: Matrix, placement: Matrix) -> Vec<u8> {
    let mut w = ContentWriter::new();
    w.save_state()
        .concat_matrix(to_native)
        .concat_matrix(placement)
        .draw_xobject(image_name)
        .restore_state();
    w.finish()
}

/// Wrap foreign operators in a state bracket under a placement matrix
pub fn placed_operators(placement: Matrix, content: &[u8]) -> Vec<u8> {
    let mut w = ContentWriter::new();
    w.save_state().concat_matrix(placement).raw(content).restore_state();
    w.finish()
}
