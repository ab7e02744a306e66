//! Line layout
//!
//! Greedy filling: words are placed left to right until the next one would
//! cross the box's right edge. Latin words break only at spaces; each CJK
//! character is a word of its own and may start a new line.

use crate::metrics::{cjk_width, latin_width};
use crate::parser::{Inline, Paragraph, Story};
use crate::style::{Style, TextAlign};
use page_inject::{classify, Color, Ordering};

/// Share of the font size above the baseline
const ASCENT: f64 = 0.8;
/// Slack for floating-point comparisons against the box edges
const EPSILON: f64 = 1e-6;

/// Font a piece of text is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKey {
    Latin { bold: bool, italic: bool },
    Cjk(Ordering),
}

impl FontKey {
    /// Standard font name for Latin text
    pub fn base14(self) -> &'static str {
        match self {
            FontKey::Latin {
                bold: false,
                italic: false,
            } => "Helvetica",
            FontKey::Latin {
                bold: true,
                italic: false,
            } => "Helvetica-Bold",
            FontKey::Latin {
                bold: false,
                italic: true,
            } => "Helvetica-Oblique",
            FontKey::Latin {
                bold: true,
                italic: true,
            } => "Helvetica-BoldOblique",
            FontKey::Cjk(_) => "Helvetica",
        }
    }

    pub fn ordering(self) -> Ordering {
        match self {
            FontKey::Latin { .. } => Ordering::Latin,
            FontKey::Cjk(ordering) => ordering,
        }
    }
}

/// Text drawn with one font, size and color
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub text: String,
    pub font: FontKey,
    pub size: f64,
    pub color: Color,
    /// Offset from the box's left edge
    pub x: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub pieces: Vec<Piece>,
    /// Distance from the box's top edge to the line's top
    pub top: f64,
    pub height: f64,
    /// Distance from the line's top to its baseline
    pub baseline: f64,
    pub width: f64,
}

impl Line {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Laid-out story for one box width
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub lines: Vec<Line>,
    /// Height from the top edge to the bottom of the last line
    pub height: f64,
    /// Some word is wider than the box
    pub overfull: bool,
}

impl Layout {
    pub fn fits(&self, height: f64) -> bool {
        !self.overfull && self.height <= height + EPSILON
    }

    /// Lines lying entirely within `height`
    pub fn visible_lines(&self, height: f64) -> impl Iterator<Item = &Line> {
        self.lines
            .iter()
            .take_while(move |line| line.bottom() <= height + EPSILON)
    }
}

/// Characters drawn with a standard font
pub fn is_latin(c: char) -> bool {
    c.is_ascii() || c == '\u{a0}'
}

enum Atom {
    Space { width: f64 },
    Break,
    Word { piece: Piece, line_height: f64, breakable: bool },
}

fn latin_key(style: &Style) -> FontKey {
    FontKey::Latin {
        bold: style.bold,
        italic: style.italic,
    }
}

fn word(text: String, font: FontKey, style: &Style, breakable: bool) -> Atom {
    let width = match font {
        FontKey::Latin { bold, .. } => latin_width(&text, bold, style.font_size),
        FontKey::Cjk(_) => cjk_width(&text, style.font_size),
    };
    Atom::Word {
        piece: Piece {
            text,
            font,
            size: style.font_size,
            color: style.color,
            x: 0.0,
            width,
        },
        line_height: style.line_height.resolve(style.font_size),
        breakable,
    }
}

/// Split a paragraph's content into words, collapsed spaces and breaks
fn atoms(paragraph: &Paragraph) -> Vec<Atom> {
    let mut atoms: Vec<Atom> = Vec::new();

    for item in &paragraph.items {
        let (text, style) = match item {
            Inline::Break => {
                atoms.push(Atom::Break);
                continue;
            }
            Inline::Text { text, style } => (text, style),
        };

        let cjk: String = text.chars().filter(|c| !is_latin(*c)).collect();
        let cjk_font = FontKey::Cjk(match classify(&cjk) {
            Ordering::Latin => Ordering::SimplifiedChinese,
            ordering => ordering,
        });

        let mut current = String::new();
        let flush = |current: &mut String, atoms: &mut Vec<Atom>| {
            if current.is_empty() {
                return;
            }
            // A Latin word glued to the previous Latin word cannot break
            let breakable = !matches!(
                atoms.last(),
                Some(Atom::Word {
                    piece: Piece {
                        font: FontKey::Latin { .. },
                        ..
                    },
                    ..
                })
            );
            atoms.push(word(
                std::mem::take(current),
                latin_key(style),
                style,
                breakable,
            ));
        };

        for c in text.chars() {
            if c.is_ascii_whitespace() {
                flush(&mut current, &mut atoms);
                if !matches!(atoms.last(), Some(Atom::Space { .. })) {
                    atoms.push(Atom::Space {
                        width: latin_width(" ", style.bold, style.font_size),
                    });
                }
            } else if is_latin(c) {
                current.push(c);
            } else {
                flush(&mut current, &mut atoms);
                atoms.push(word(c.to_string(), cjk_font, style, true));
            }
        }
        flush(&mut current, &mut atoms);
    }

    atoms
}

struct LineBuilder {
    pieces: Vec<Piece>,
    width: f64,
    height: f64,
    max_size: f64,
    pending_space: Option<f64>,
}

impl LineBuilder {
    fn new(strut: &Style) -> Self {
        Self {
            pieces: Vec::new(),
            width: 0.0,
            height: strut.line_height.resolve(strut.font_size),
            max_size: strut.font_size,
            pending_space: None,
        }
    }

    fn place(&mut self, mut piece: Piece, line_height: f64) {
        let gap = self.pending_space.take().unwrap_or(0.0);
        piece.x = self.width + gap;
        self.width = piece.x + piece.width;
        self.height = self.height.max(line_height);
        self.max_size = self.max_size.max(piece.size);

        if let Some(last) = self.pieces.last_mut() {
            let same_look = last.font == piece.font
                && last.size == piece.size
                && last.color == piece.color;
            // Spaces are only drawn with standard fonts
            let joinable = match piece.font {
                FontKey::Latin { .. } => true,
                FontKey::Cjk(_) => gap == 0.0,
            };
            if same_look && joinable {
                if gap > 0.0 {
                    last.text.push(' ');
                }
                last.text.push_str(&piece.text);
                last.width = self.width - last.x;
                return;
            }
        }
        self.pieces.push(piece);
    }
}

/// Lay out a story into a box `width` points wide
pub fn layout(story: &Story, width: f64) -> Layout {
    let mut result = Layout::default();
    let mut cursor = 0.0;

    for paragraph in &story.paragraphs {
        let strut = &paragraph.style;
        let mut line = LineBuilder::new(strut);
        let finish = |line: LineBuilder, result: &mut Layout, cursor: &mut f64| {
            let offset = match strut.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((width - line.width) / 2.0).max(0.0),
                TextAlign::Right => (width - line.width).max(0.0),
            };
            if line.width > width + EPSILON {
                result.overfull = true;
            }
            let pieces = line
                .pieces
                .into_iter()
                .map(|piece| Piece {
                    x: piece.x + offset,
                    ..piece
                })
                .collect();
            result.lines.push(Line {
                pieces,
                top: *cursor,
                height: line.height,
                baseline: (line.height - line.max_size) / 2.0 + line.max_size * ASCENT,
                width: line.width,
            });
            *cursor += line.height;
            result.height = *cursor;
        };

        for atom in atoms(paragraph) {
            match atom {
                Atom::Space { width } => {
                    if !line.pieces.is_empty() {
                        line.pending_space = Some(width);
                    }
                }
                Atom::Break => {
                    let done = std::mem::replace(&mut line, LineBuilder::new(strut));
                    finish(done, &mut result, &mut cursor);
                }
                Atom::Word {
                    piece,
                    line_height,
                    breakable,
                } => {
                    let gap = line.pending_space.unwrap_or(0.0);
                    let can_break = breakable || line.pending_space.is_some();
                    if !line.pieces.is_empty()
                        && can_break
                        && line.width + gap + piece.width > width + EPSILON
                    {
                        let done = std::mem::replace(&mut line, LineBuilder::new(strut));
                        finish(done, &mut result, &mut cursor);
                    }
                    line.place(piece, line_height);
                }
            }
        }

        if !line.pieces.is_empty() {
            finish(line, &mut result, &mut cursor);
        }
        cursor += paragraph.margin_bottom;
    }

    result
}
