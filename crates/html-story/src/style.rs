//! Computed styles
//!
//! Stylesheets and `style` attributes are parsed with lightningcss; rules are
//! matched against elements with kuchiki's selector engine. Only the
//! properties the layout understands are kept. `1px` is `0.75pt`.

use crate::StoryConfig;
use kuchiki::{ElementData, NodeDataRef, Selectors, Specificity};
use lightningcss::declaration::DeclarationBlock;
use lightningcss::properties::font::{
    AbsoluteFontSize, FontSize, FontStyle as CssFontStyle, LineHeight as CssLineHeight,
    RelativeFontSize,
};
use lightningcss::properties::text::TextAlign as CssTextAlign;
use lightningcss::properties::Property;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute, StyleSheet};
use lightningcss::traits::ToCss;
use lightningcss::values::color::{CssColor, SRGB};
use lightningcss::values::length::{LengthPercentage, LengthPercentageOrAuto, LengthValue};
use log::debug;
use page_inject::Color;

/// Points per CSS pixel
const PT_PER_PX: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    /// Multiple of the font size
    Factor(f64),
    /// Absolute height in points
    Points(f64),
}

impl LineHeight {
    pub fn resolve(self, font_size: f64) -> f64 {
        match self {
            LineHeight::Factor(factor) => factor * font_size,
            LineHeight::Points(points) => points,
        }
    }
}

/// A length that may depend on a font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Points(f64),
    Em(f64),
}

impl Length {
    pub fn resolve(self, em: f64) -> f64 {
        match self {
            Length::Points(points) => points,
            Length::Em(factor) => factor * em,
        }
    }
}

/// A supported declaration, converted out of lightningcss
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Declaration {
    FontSize(Length),
    Color(Color),
    Bold(bool),
    Italic(bool),
    LineHeight(LineHeight),
    Align(TextAlign),
    MarginBottom(Length),
}

/// Computed style of an element
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub font_size: f64,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub line_height: LineHeight,
    pub align: TextAlign,
    /// Not inherited
    pub margin_bottom: f64,
}

impl Style {
    /// Root style from configuration defaults
    pub fn root(config: &StoryConfig) -> Self {
        Self {
            font_size: config.font_size,
            color: parse_color(&config.color).unwrap_or_default(),
            bold: false,
            italic: false,
            line_height: LineHeight::Factor(config.line_height),
            align: TextAlign::Left,
            margin_bottom: 0.0,
        }
    }

    /// Style a child element starts from
    pub fn inherit(&self) -> Self {
        Self {
            margin_bottom: 0.0,
            ..self.clone()
        }
    }

    /// Apply one declaration; `parent_size` resolves relative font sizes
    pub fn apply(&mut self, declaration: &Declaration, parent_size: f64) {
        match *declaration {
            Declaration::FontSize(length) => {
                let size = length.resolve(parent_size);
                if size.is_finite() && size > 0.0 {
                    self.font_size = size;
                }
            }
            Declaration::Color(color) => self.color = color,
            Declaration::Bold(bold) => self.bold = bold,
            Declaration::Italic(italic) => self.italic = italic,
            Declaration::LineHeight(line_height) => self.line_height = line_height,
            Declaration::Align(align) => self.align = align,
            Declaration::MarginBottom(length) => {
                self.margin_bottom = length.resolve(self.font_size).max(0.0);
            }
        }
    }

    /// Apply a block, font size first so `em` margins see the new size
    pub fn apply_all(&mut self, declarations: &[Declaration], parent_size: f64) {
        let (sizes, rest): (Vec<&Declaration>, Vec<&Declaration>) = declarations
            .iter()
            .partition(|d| matches!(d, Declaration::FontSize(_)));
        for declaration in sizes.into_iter().chain(rest) {
            self.apply(declaration, parent_size);
        }
    }
}

fn length_value(value: &LengthValue) -> Option<Length> {
    match value {
        LengthValue::Pt(pt) => Some(Length::Points(*pt as f64)),
        LengthValue::Px(px) => Some(Length::Points(*px as f64 * PT_PER_PX)),
        LengthValue::Em(em) => Some(Length::Em(*em as f64)),
        _ => value.to_px().map(|px| Length::Points(px as f64 * PT_PER_PX)),
    }
}

fn font_size(value: &FontSize) -> Option<Length> {
    match value {
        FontSize::Length(LengthPercentage::Dimension(length)) => length_value(length),
        FontSize::Length(LengthPercentage::Percentage(pct)) => Some(Length::Em(pct.0 as f64)),
        FontSize::Length(_) => None,
        FontSize::Absolute(size) => {
            let px = match size {
                AbsoluteFontSize::XXSmall => 9.0,
                AbsoluteFontSize::XSmall => 10.0,
                AbsoluteFontSize::Small => 13.0,
                AbsoluteFontSize::Medium => 16.0,
                AbsoluteFontSize::Large => 18.0,
                AbsoluteFontSize::XLarge => 24.0,
                AbsoluteFontSize::XXLarge => 32.0,
                AbsoluteFontSize::XXXLarge => 40.0,
            };
            Some(Length::Points(px * PT_PER_PX))
        }
        FontSize::Relative(RelativeFontSize::Smaller) => Some(Length::Em(0.8)),
        FontSize::Relative(RelativeFontSize::Larger) => Some(Length::Em(1.2)),
    }
}

fn line_height(value: &CssLineHeight) -> Option<LineHeight> {
    match value {
        CssLineHeight::Normal => Some(LineHeight::Factor(1.2)),
        CssLineHeight::Number(n) if *n > 0.0 => Some(LineHeight::Factor(*n as f64)),
        CssLineHeight::Number(_) => None,
        CssLineHeight::Length(LengthPercentage::Percentage(pct)) => {
            Some(LineHeight::Factor(pct.0 as f64))
        }
        CssLineHeight::Length(LengthPercentage::Dimension(length)) => {
            match length_value(length)? {
                Length::Points(points) => Some(LineHeight::Points(points)),
                Length::Em(factor) => Some(LineHeight::Factor(factor)),
            }
        }
        CssLineHeight::Length(_) => None,
    }
}

fn margin(value: &LengthPercentageOrAuto) -> Option<Length> {
    match value {
        LengthPercentageOrAuto::LengthPercentage(LengthPercentage::Dimension(length)) => {
            length_value(length)
        }
        _ => None,
    }
}

fn css_color(color: &CssColor) -> Option<Color> {
    if let CssColor::RGBA(rgba) = color {
        return Some(Color::from_rgb(rgba.red, rgba.green, rgba.blue));
    }
    SRGB::try_from(color)
        .ok()
        .map(|srgb| Color::rgb(srgb.r, srgb.g, srgb.b))
}

fn bold_from_weight(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bold" | "bolder" => Some(true),
        "normal" | "lighter" => Some(false),
        other => other.parse::<f32>().ok().map(|weight| weight >= 600.0),
    }
}

/// Convert one parsed property; unsupported ones yield `None`
fn declaration(property: &Property) -> Option<Declaration> {
    match property {
        Property::FontSize(size) => font_size(size).map(Declaration::FontSize),
        Property::Color(color) => css_color(color).map(Declaration::Color),
        Property::FontWeight(weight) => weight
            .to_css_string(PrinterOptions::default())
            .ok()
            .and_then(|raw| bold_from_weight(&raw))
            .map(Declaration::Bold),
        Property::FontStyle(style) => Some(Declaration::Italic(matches!(
            style,
            CssFontStyle::Italic | CssFontStyle::Oblique(_)
        ))),
        Property::LineHeight(value) => line_height(value).map(Declaration::LineHeight),
        Property::TextAlign(align) => Some(Declaration::Align(match align {
            CssTextAlign::Center => TextAlign::Center,
            CssTextAlign::Right | CssTextAlign::End => TextAlign::Right,
            _ => TextAlign::Left,
        })),
        Property::MarginBottom(value) => margin(value).map(Declaration::MarginBottom),
        Property::Margin(value) => margin(&value.bottom).map(Declaration::MarginBottom),
        other => {
            debug!("ignoring CSS property {:?}", other.property_id());
            None
        }
    }
}

/// Normal and `!important` declarations of a block
fn block_declarations(block: &DeclarationBlock) -> (Vec<Declaration>, Vec<Declaration>) {
    (
        block.declarations.iter().filter_map(declaration).collect(),
        block
            .important_declarations
            .iter()
            .filter_map(declaration)
            .collect(),
    )
}

fn parser_options<'i>() -> ParserOptions<'i> {
    ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    }
}

/// Declarations of a `style` attribute
pub fn inline_declarations(style: &str) -> (Vec<Declaration>, Vec<Declaration>) {
    match StyleAttribute::parse(style, parser_options()) {
        Ok(attribute) => block_declarations(&attribute.declarations),
        Err(err) => {
            debug!("ignoring style attribute '{}': {}", style, err);
            (Vec::new(), Vec::new())
        }
    }
}

/// Parse a CSS color value
pub fn parse_color(value: &str) -> Option<Color> {
    let (normal, important) = inline_declarations(&format!("color: {value}"));
    normal
        .into_iter()
        .chain(important)
        .find_map(|declaration| match declaration {
            Declaration::Color(color) => Some(color),
            _ => None,
        })
}

struct Rule {
    selectors: Selectors,
    normal: Vec<Declaration>,
    important: Vec<Declaration>,
}

/// Ordered list of style rules
#[derive(Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.extend(css);
        sheet
    }

    /// Append the style rules of another stylesheet text
    pub fn extend(&mut self, css: &str) {
        if css.trim().is_empty() {
            return;
        }
        let sheet = match StyleSheet::parse(css, parser_options()) {
            Ok(sheet) => sheet,
            Err(err) => {
                debug!("ignoring unparseable stylesheet: {}", err);
                return;
            }
        };

        for rule in &sheet.rules.0 {
            let CssRule::Style(rule) = rule else {
                debug!("skipping non-style rule");
                continue;
            };
            let text = match rule.selectors.to_css_string(PrinterOptions::default()) {
                Ok(text) => text,
                Err(_) => continue,
            };
            let Ok(selectors) = Selectors::compile(&text) else {
                debug!("skipping rule with unsupported selector '{}'", text);
                continue;
            };
            let (normal, important) = block_declarations(&rule.declarations);
            self.rules.push(Rule {
                selectors,
                normal,
                important,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of rules matching `element`, least specific first, ties in
    /// source order
    fn matching(&self, element: &NodeDataRef<ElementData>) -> Vec<usize> {
        let mut matched: Vec<(Specificity, usize)> = self
            .rules
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                rule.selectors
                    .0
                    .iter()
                    .filter(|selector| selector.matches(element))
                    .map(|selector| selector.specificity())
                    .max()
                    .map(|specificity| (specificity, index))
            })
            .collect();
        matched.sort();
        matched.into_iter().map(|(_, index)| index).collect()
    }

    /// Compute the style of `element` under `parent`
    ///
    /// `spacing_em` is the default space below paragraphs and headings.
    pub fn compute(
        &self,
        element: &NodeDataRef<ElementData>,
        parent: &Style,
        spacing_em: f64,
    ) -> Style {
        let tag = element.name.local.as_ref().to_ascii_lowercase();
        let mut style = parent.inherit();
        apply_tag_defaults(&mut style, &tag, parent.font_size, spacing_em);

        let (inline, inline_important) = match element.attributes.borrow().get("style") {
            Some(text) => inline_declarations(text),
            None => (Vec::new(), Vec::new()),
        };
        let matched = self.matching(element);

        for &index in &matched {
            style.apply_all(&self.rules[index].normal, parent.font_size);
        }
        style.apply_all(&inline, parent.font_size);
        for &index in &matched {
            style.apply_all(&self.rules[index].important, parent.font_size);
        }
        style.apply_all(&inline_important, parent.font_size);
        style
    }
}

/// Built-in presentation of the supported elements
fn apply_tag_defaults(style: &mut Style, tag: &str, parent_size: f64, spacing_em: f64) {
    let heading_scale = match tag {
        "h1" => Some(2.0),
        "h2" => Some(1.5),
        "h3" => Some(1.17),
        "h4" => Some(1.0),
        "h5" => Some(0.83),
        "h6" => Some(0.67),
        _ => None,
    };
    if let Some(scale) = heading_scale {
        style.font_size = parent_size * scale;
        style.bold = true;
    }

    match tag {
        "b" | "strong" => style.bold = true,
        "i" | "em" => style.italic = true,
        "p" => style.margin_bottom = spacing_em * style.font_size,
        _ => {}
    }
    if heading_scale.is_some() {
        style.margin_bottom = spacing_em * style.font_size;
    }
}
