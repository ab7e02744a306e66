//! Story rendering

use crate::layout::{layout, FontKey, Layout};
use crate::parser::{parse_story, Story};
use crate::{Result, StoryConfig, StoryError};
use log::debug;
use page_inject::content::{text_operators, TextRun};
use page_inject::encoding::encode_run;
use page_inject::{
    FlowContent, FlowDrawing, FlowMeasure, FlowRenderer, FontResource, FontSubstitution,
    PendingResource, Point, ResourceCategory, ResourceSet, StandardSubstitution,
};
use std::collections::HashMap;

/// Lays out HTML with standard-font metrics and draws it as text runs
pub struct StoryRenderer {
    config: StoryConfig,
    substitution: Box<dyn FontSubstitution>,
    /// Last parsed markup, reused while the box-fit solver retries scales
    cache: Option<(String, String, Story)>,
}

impl Default for StoryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryRenderer {
    /// Create a renderer with the default configuration
    pub fn new() -> Self {
        Self {
            config: StoryConfig::default(),
            substitution: Box::new(StandardSubstitution),
            cache: None,
        }
    }

    /// Create a renderer with custom defaults
    pub fn with_config(config: StoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Choose the base fonts named by composite CJK fonts
    pub fn with_substitution(mut self, substitution: Box<dyn FontSubstitution>) -> Self {
        self.substitution = substitution;
        self
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    fn story(&mut self, content: &FlowContent) -> &Story {
        let stale = !matches!(
            &self.cache,
            Some((html, css, _)) if html == content.html && css == content.css
        );
        if stale {
            self.cache = None;
        }
        let config = &self.config;
        let (_, _, story) = self.cache.get_or_insert_with(|| {
            let story = parse_story(content.html, content.css, config);
            debug!("Parsed story with {} paragraphs", story.paragraphs.len());
            (content.html.to_string(), content.css.to_string(), story)
        });
        story
    }

    fn lay_out(&mut self, content: &FlowContent, width: f64) -> Result<Layout> {
        if !width.is_finite() || width <= 0.0 {
            return Err(StoryError::LayoutError(format!(
                "box width must be positive, got {}",
                width
            )));
        }
        Ok(layout(self.story(content), width))
    }
}

fn measure_of(layout: &Layout, height: f64) -> FlowMeasure {
    FlowMeasure {
        fits: layout.fits(height),
        used_height: layout.height.min(height),
    }
}

impl FlowRenderer for StoryRenderer {
    fn measure(
        &mut self,
        content: &FlowContent,
        width: f64,
        height: f64,
    ) -> page_inject::Result<FlowMeasure> {
        let layout = self.lay_out(content, width)?;
        Ok(measure_of(&layout, height))
    }

    fn draw(
        &mut self,
        content: &FlowContent,
        width: f64,
        height: f64,
        resources: &mut ResourceSet,
    ) -> page_inject::Result<FlowDrawing> {
        let layout = self.lay_out(content, width)?;

        let mut fonts: HashMap<FontKey, String> = HashMap::new();
        let mut operators = Vec::new();
        let mut runs = 0usize;

        for line in layout.visible_lines(height) {
            let baseline = height - (line.top + line.baseline);
            for piece in &line.pieces {
                let font_name = fonts.entry(piece.font).or_insert_with(|| {
                    let font = FontResource::for_run(
                        piece.font.ordering(),
                        piece.font.base14(),
                        self.substitution.as_ref(),
                    );
                    resources.add(ResourceCategory::Font, PendingResource::Font(font))
                });

                let encoded = encode_run(&piece.text, piece.font.ordering());
                operators.extend(text_operators(&TextRun {
                    font_name: font_name.as_str(),
                    font_size: piece.size,
                    color: piece.color,
                    origin: Point::new(piece.x, baseline),
                    rotate: 0,
                    encoded: &encoded,
                }));
                runs += 1;
            }
        }

        debug!(
            "Drew {} runs with {} fonts, {} of {} lines",
            runs,
            fonts.len(),
            layout.visible_lines(height).count(),
            layout.lines.len()
        );

        Ok(FlowDrawing {
            content: operators,
            measure: measure_of(&layout, height),
        })
    }
}
