//! HTML Story - Flowing styled markup into a PDF rectangle
//!
//! This crate provides:
//! - A lenient parser for a small HTML subset and its CSS
//! - Greedy line layout with standard-font metrics
//! - [`StoryRenderer`], a [`page_inject::FlowRenderer`] for
//!   [`page_inject::PdfDocument::insert_flow`]
//!
//! # Example
//!
//! ```ignore
//! use html_story::StoryRenderer;
//! use page_inject::{FlowOptions, PdfDocument, Rect};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! let mut renderer = StoryRenderer::new();
//! let result = doc.insert_flow(
//!     1,
//!     Rect::new(72.0, 72.0, 540.0, 300.0),
//!     "<h1>Notice</h1><p>Body text</p>",
//!     &FlowOptions::new().css("p { font-size: 10pt }"),
//!     &mut renderer,
//! )?;
//! ```

pub mod layout;
pub mod metrics;
pub mod parser;
mod renderer;
pub mod style;

pub use renderer::StoryRenderer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while laying out a story
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Layout error: {0}")]
    LayoutError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] page_inject::PdfError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for story operations
pub type Result<T> = std::result::Result<T, StoryError>;

impl From<StoryError> for page_inject::PdfError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::PdfError(inner) => inner,
            other => page_inject::PdfError::Render(other.to_string()),
        }
    }
}

/// Defaults applied before any stylesheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Base font size in points
    #[serde(rename = "fontSize")]
    pub font_size: f64,

    /// Line height as a multiple of the font size
    #[serde(rename = "lineHeight")]
    pub line_height: f64,

    /// Space after paragraphs and headings, in em
    #[serde(rename = "paragraphSpacing")]
    pub paragraph_spacing: f64,

    /// Text color as a CSS color value
    pub color: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            line_height: 1.2,
            paragraph_spacing: 0.5,
            color: "black".to_string(),
        }
    }
}

impl StoryConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StoryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject sizes that would make layout meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(StoryError::InvalidConfig(format!(
                "fontSize must be positive, got {}",
                self.font_size
            )));
        }
        if !self.line_height.is_finite() || self.line_height <= 0.0 {
            return Err(StoryError::InvalidConfig(format!(
                "lineHeight must be positive, got {}",
                self.line_height
            )));
        }
        if !self.paragraph_spacing.is_finite() || self.paragraph_spacing < 0.0 {
            return Err(StoryError::InvalidConfig(format!(
                "paragraphSpacing must not be negative, got {}",
                self.paragraph_spacing
            )));
        }
        if style::parse_color(&self.color).is_none() {
            return Err(StoryError::InvalidConfig(format!(
                "unrecognized color '{}'",
                self.color
            )));
        }
        Ok(())
    }
}
