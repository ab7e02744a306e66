//! Markup parsing
//!
//! Markup is parsed into a DOM with kuchiki, which recovers from malformed
//! input the way browsers do, and the body is walked into styled paragraphs.

use crate::style::{Style, Stylesheet};
use crate::StoryConfig;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

/// Elements that start a new paragraph
const BLOCK_TAGS: [&str; 8] = ["p", "div", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements that never have content
const VOID_TAGS: [&str; 10] = [
    "br", "hr", "img", "meta", "link", "input", "col", "area", "base", "wbr",
];

/// Elements whose content is not text to lay out
const HIDDEN_TAGS: [&str; 5] = ["head", "title", "style", "script", "template"];

/// Content of a paragraph
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text { text: String, style: Style },
    Break,
}

/// A block of inline content
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Style of the enclosing block element
    pub style: Style,
    pub items: Vec<Inline>,
    /// Space below the paragraph
    pub margin_bottom: f64,
}

impl Paragraph {
    fn new(style: Style) -> Self {
        Self {
            style,
            items: Vec::new(),
            margin_bottom: 0.0,
        }
    }

    fn has_content(&self) -> bool {
        self.items.iter().any(|item| match item {
            Inline::Text { text, .. } => !text.chars().all(|c| c.is_ascii_whitespace()),
            Inline::Break => true,
        })
    }
}

/// Parsed markup, ready for layout
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Story {
    pub paragraphs: Vec<Paragraph>,
}

impl Story {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

struct Builder<'a> {
    sheet: &'a Stylesheet,
    spacing_em: f64,
    paragraphs: Vec<Paragraph>,
    current: Option<Paragraph>,
}

impl<'a> Builder<'a> {
    fn flush(&mut self) {
        if let Some(paragraph) = self.current.take() {
            if paragraph.has_content() {
                self.paragraphs.push(paragraph);
            }
        }
    }

    fn paragraph(&mut self, block_style: &Style) -> &mut Paragraph {
        self.current
            .get_or_insert_with(|| Paragraph::new(block_style.clone()))
    }

    fn text(&mut self, text: String, style: &Style, block_style: &Style) {
        if self.current.is_none() && text.chars().all(|c| c.is_ascii_whitespace()) {
            return;
        }
        self.paragraph(block_style).items.push(Inline::Text {
            text,
            style: style.clone(),
        });
    }

    /// Walk the children of `node`
    fn walk(&mut self, node: &NodeRef, style: &Style, block_style: &Style) {
        for child in node.children() {
            match child.data() {
                NodeData::Text(text) => {
                    let text = text.borrow().clone();
                    self.text(text, style, block_style);
                }
                NodeData::Element(_) => self.element(&child, style, block_style),
                _ => {}
            }
        }
    }

    fn element(&mut self, node: &NodeRef, parent: &Style, block_style: &Style) {
        let Some(element) = node.clone().into_element_ref() else {
            return;
        };
        let tag = element.name.local.as_ref().to_ascii_lowercase();

        match tag.as_str() {
            _ if HIDDEN_TAGS.contains(&tag.as_str()) => return,
            "br" => {
                self.paragraph(block_style).items.push(Inline::Break);
                return;
            }
            "hr" => {
                self.flush();
                return;
            }
            _ if VOID_TAGS.contains(&tag.as_str()) => return,
            _ => {}
        }

        let style = self.sheet.compute(&element, parent, self.spacing_em);
        if !BLOCK_TAGS.contains(&tag.as_str()) {
            self.walk(node, &style, block_style);
            return;
        }

        self.flush();
        let first_paragraph = self.paragraphs.len();
        self.walk(node, &style, &style);
        self.flush();
        if self.paragraphs.len() > first_paragraph {
            if let Some(last) = self.paragraphs.last_mut() {
                last.margin_bottom = last.margin_bottom.max(style.margin_bottom);
            }
        }
    }
}

/// Stylesheet text embedded in `<style>` elements
fn embedded_css(document: &NodeRef) -> String {
    let mut css = String::new();
    if let Ok(styles) = document.select("style") {
        for style in styles {
            css.push_str(&style.as_node().text_contents());
            css.push('\n');
        }
    }
    css
}

/// Parse markup and stylesheet into paragraphs
///
/// Rules from `css` come after any `<style>` elements, so they win ties.
pub fn parse_story(html: &str, css: &str, config: &StoryConfig) -> Story {
    let document = kuchiki::parse_html().one(html);

    let mut sheet = Stylesheet::parse(&embedded_css(&document));
    sheet.extend(css);

    let spacing_em = config.paragraph_spacing;
    let mut root = Style::root(config);
    for tag in ["html", "body"] {
        if let Ok(element) = document.select_first(tag) {
            root = sheet.compute(&element, &root, spacing_em);
        }
    }

    let mut builder = Builder {
        sheet: &sheet,
        spacing_em,
        paragraphs: Vec::new(),
        current: None,
    };
    match document.select_first("body") {
        Ok(body) => builder.walk(body.as_node(), &root, &root),
        Err(()) => builder.walk(&document, &root, &root),
    }
    builder.flush();

    Story {
        paragraphs: builder.paragraphs,
    }
}
