use serde::{Deserialize, Serialize};

/// Raw page scroll measurements as a host reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    /// Current vertical offset (px).
    pub scroll_y: f64,
    /// Full document height (px).
    pub scroll_height: f64,
    /// Visible viewport height (px).
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Fraction of the scrollable distance covered, in `[0, 1]`.
    ///
    /// `None` when the page cannot scroll or the measurements are not finite.
    pub fn ratio(&self) -> Option<f64> {
        let scrollable = self.scroll_height - self.viewport_height;
        if !scrollable.is_finite() || !self.scroll_y.is_finite() || scrollable <= 0.0 {
            return None;
        }
        Some((self.scroll_y / scrollable).clamp(0.0, 1.0))
    }
}

/// Clamp a host-supplied ratio into `[0, 1]`; NaN yields `None`.
pub(crate) fn sanitize_ratio(ratio: f64) -> Option<f64> {
    if ratio.is_nan() {
        None
    } else {
        Some(ratio.clamp(0.0, 1.0))
    }
}
