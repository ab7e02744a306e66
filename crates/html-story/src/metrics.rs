//! Advance widths for layout
//!
//! Standard-font widths come from the Helvetica and Helvetica-Bold AFM
//! files, in 1/1000 em, for the printable ASCII range. The oblique faces
//! share the upright widths.

/// Width of every glyph in a composite CJK font, in 1/1000 em
pub const CJK_ADVANCE: u16 = 1000;

/// Fallback width for Latin characters outside the tables
const DEFAULT_ADVANCE: u16 = 556;

/// Helvetica, codes 32..=126
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// Helvetica-Bold, codes 32..=126
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

/// Advance of one character in a standard font, in 1/1000 em
pub fn latin_advance(c: char, bold: bool) -> u16 {
    // No-break space draws as a space
    let c = if c == '\u{a0}' { ' ' } else { c };
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    (c as usize)
        .checked_sub(32)
        .and_then(|index| table.get(index))
        .copied()
        .unwrap_or(DEFAULT_ADVANCE)
}

/// Width of a Latin string at `size` points
pub fn latin_width(text: &str, bold: bool, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| latin_advance(c, bold) as u32).sum();
    units as f64 * size / 1000.0
}

/// Width of a CJK string at `size` points
pub fn cjk_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * CJK_ADVANCE as f64 * size / 1000.0
}
