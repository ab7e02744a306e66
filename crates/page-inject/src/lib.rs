//! Page Inject - Adding content to existing PDF pages
//!
//! This crate provides functionality for:
//! - Inserting text runs, with composite fonts for Chinese, Japanese and Korean
//! - Inserting images (JPEG, PNG) into a rectangle
//! - Flowing styled markup into a rectangle, shrinking it to fit
//!
//! Positions use a top-left origin with Y growing downward.
//!
//! # Example
//!
//! ```ignore
//! use page_inject::{PdfDocument, Point, TextOptions};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! doc.insert_text(1, Point::new(72.0, 72.0), "こんにちは", &TextOptions::new())?;
//! doc.save("output.pdf")?;
//! ```

pub mod content;
mod document;
pub mod encoding;
pub mod fit;
pub mod font;
pub mod geometry;
mod image;
pub mod resources;
pub mod script;

pub use content::{Color, ContentWriter};
pub use document::{FlowOptions, ImageOptions, PdfDocument, TextOptions};
pub use fit::{FitResult, FitStatus, FlowContent, FlowDrawing, FlowMeasure, FlowRenderer};
pub use font::{FontResource, FontSubstitution, StandardSubstitution};
pub use geometry::{Matrix, Origin, PageSpace, Point, Rect};
pub use image::ImageXObject;
pub use resources::{PendingResource, Placement, ResourceCategory, ResourceSet};
pub use script::{classify, Ordering};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Invalid rectangle: {width} x {height}")]
    InvalidRect { width: f64, height: f64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Flow rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
