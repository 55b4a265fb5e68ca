//! crates/shortcut_core/src/reading.rs
//!
//! Reading-progress computation for the article screens.

/// Progress reports below this fraction are never sent.
pub const PROGRESS_THRESHOLD: f64 = 0.10;

/// Fraction of the content scrolled past, clamped to `[0, 1]`.
/// Content that fits in the viewport has no scrollable range and reports 0.
pub fn scroll_fraction(offset: f64, content_height: f64, viewport_height: f64) -> f64 {
    let scrollable = content_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 || !offset.is_finite() {
        return 0.0;
    }
    (offset / scrollable).clamp(0.0, 1.0)
}

/// Decides which scroll reports turn into remote progress updates.
///
/// Only reports past the threshold are sent; each one is sent and the backend
/// keeps the last write.
#[derive(Debug, Default, Clone)]
pub struct ProgressGate {
    last_fraction: f64,
    sent: usize,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fraction and returns the percent to send, if any.
    pub fn observe(&mut self, fraction: f64) -> Option<u8> {
        self.last_fraction = fraction.clamp(0.0, 1.0);
        if self.last_fraction <= PROGRESS_THRESHOLD {
            return None;
        }
        self.sent += 1;
        Some((self.last_fraction * 100.0).round() as u8)
    }

    /// How many reports have passed the gate.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// The most recent fraction, for the progress bar.
    pub fn fraction(&self) -> f64 {
        self.last_fraction
    }
}
