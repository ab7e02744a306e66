//! Shrink-to-fit for flowed content
//!
//! Layout itself is delegated to a [`FlowRenderer`]. The solver only decides
//! the scale: content laid out into a box of `width / s × height / s` and
//! then drawn under a uniform scale `s` fills exactly the target rectangle.

use crate::resources::ResourceSet;
use crate::Result;
use log::{debug, trace, warn};

/// Maximum number of bisection steps
pub const MAX_ITERATIONS: usize = 20;
/// Bisection stops once the search interval is narrower than this
pub const SCALE_TOLERANCE: f64 = 0.005;
/// Smallest scale the solver will ever try
pub const MIN_SCALE: f64 = 0.05;

/// Markup and stylesheet handed to the renderer
#[derive(Debug, Clone, Copy)]
pub struct FlowContent<'a> {
    pub html: &'a str,
    pub css: &'a str,
}

/// Outcome of laying content out into a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMeasure {
    /// Whether all content fit
    pub fits: bool,
    /// Height actually consumed, in box units
    pub used_height: f64,
}

/// Operators and layout of a drawn flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDrawing {
    pub content: Vec<u8>,
    pub measure: FlowMeasure,
}

/// Layout engine for flowed markup
///
/// Both methods work in a box-local space: origin at the bottom-left corner
/// of a `width × height` box, Y up, content flowing down from the top edge.
pub trait FlowRenderer {
    fn measure(&mut self, content: &FlowContent, width: f64, height: f64) -> Result<FlowMeasure>;

    /// Lay out and emit operators, registering any fonts or images in
    /// `resources`. Content that does not fit is drawn as far as it lays out.
    fn draw(
        &mut self,
        content: &FlowContent,
        width: f64,
        height: f64,
        resources: &mut ResourceSet,
    ) -> Result<FlowDrawing>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    Fitted,
    /// Drawn, but some content did not fit
    Overflow,
}

/// Result of a flow insertion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub fitted: bool,
    /// Scale the content was drawn at, in (0, 1]
    pub scale: f64,
    /// Unused height below the content, in page units
    pub spare_height: f64,
}

impl FitResult {
    pub fn status(&self) -> FitStatus {
        if self.fitted {
            FitStatus::Fitted
        } else {
            FitStatus::Overflow
        }
    }
}

/// Chosen scale and whether content fits at it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleChoice {
    pub scale: f64,
    pub fitted: bool,
}

fn fits_at(
    renderer: &mut dyn FlowRenderer,
    content: &FlowContent,
    width: f64,
    height: f64,
    scale: f64,
) -> Result<bool> {
    Ok(renderer.measure(content, width / scale, height / scale)?.fits)
}

/// Find the largest scale in `[scale_low, 1]` at which content fits
///
/// `scale_low` is clamped to `[MIN_SCALE, 1]`; 1 disables shrinking. If the
/// content does not fit even at `scale_low`, that scale is returned with
/// `fitted == false`.
pub fn solve_scale(
    renderer: &mut dyn FlowRenderer,
    content: &FlowContent,
    width: f64,
    height: f64,
    scale_low: f64,
) -> Result<ScaleChoice> {
    if fits_at(renderer, content, width, height, 1.0)? {
        return Ok(ScaleChoice {
            scale: 1.0,
            fitted: true,
        });
    }

    let floor = if scale_low.is_nan() {
        MIN_SCALE
    } else {
        scale_low.clamp(MIN_SCALE, 1.0)
    };
    if floor >= 1.0 {
        return Ok(ScaleChoice {
            scale: 1.0,
            fitted: false,
        });
    }

    if !fits_at(renderer, content, width, height, floor)? {
        return Ok(ScaleChoice {
            scale: floor,
            fitted: false,
        });
    }

    let (mut lo, mut hi) = (floor, 1.0);
    for iteration in 0..MAX_ITERATIONS {
        if hi - lo < SCALE_TOLERANCE {
            break;
        }
        let mid = (lo + hi) / 2.0;
        let fits = fits_at(renderer, content, width, height, mid)?;
        trace!("fit iteration {iteration}: scale {mid:.4} fits={fits}");
        if fits {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(ScaleChoice {
        scale: lo,
        fitted: true,
    })
}

/// Solve for a scale, then draw the flow at it
///
/// Returns the box-local operators, to be placed with a uniform `scale`
/// matrix, and the fit result in page units.
pub fn fit_and_draw(
    renderer: &mut dyn FlowRenderer,
    content: &FlowContent,
    width: f64,
    height: f64,
    scale_low: f64,
    resources: &mut ResourceSet,
) -> Result<(FitResult, Vec<u8>)> {
    let choice = solve_scale(renderer, content, width, height, scale_low)?;
    let drawing = renderer.draw(
        content,
        width / choice.scale,
        height / choice.scale,
        resources,
    )?;

    let fitted = choice.fitted && drawing.measure.fits;
    let spare_height = (height - drawing.measure.used_height * choice.scale).max(0.0);
    if fitted {
        debug!("flow fitted at scale {:.4}", choice.scale);
    } else {
        warn!("flow overflows its rectangle at scale {:.4}", choice.scale);
    }

    Ok((
        FitResult {
            fitted,
            scale: choice.scale,
            spare_height,
        },
        drawing.content,
    ))
}
