use crate::scroll::animator::ScrollContainer;
use crate::ui::transcript::ROW_HEIGHT;

/// Most of the viewport that rubber-band padding may take up.
const MAX_OVERSHOOT_FRACTION: f64 = 0.5;

/// Scroll state of the transcript pane, in layout units.
#[derive(Debug, Clone)]
pub struct TranscriptViewport {
    scroll_top: f64,
    overshoot: f64,
    content_rows: usize,
    viewport_rows: usize,
    rubberband: bool,
}

impl TranscriptViewport {
    pub fn new(rubberband: bool) -> Self {
        Self {
            scroll_top: 0.0,
            overshoot: 0.0,
            content_rows: 0,
            viewport_rows: 0,
            rubberband,
        }
    }

    pub fn set_rubberband(&mut self, enabled: bool) {
        self.rubberband = enabled;
        if !enabled {
            self.overshoot = 0.0;
        }
    }

    pub fn rubberband(&self) -> bool {
        self.rubberband
    }

    /// Update the measured sizes; the offset is clamped into the new range.
    pub fn resize(&mut self, content_rows: usize, viewport_rows: usize) {
        self.content_rows = content_rows;
        self.viewport_rows = viewport_rows;
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll());
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    pub fn overshoot(&self) -> f64 {
        self.overshoot
    }

    pub fn scroll_by_rows(&mut self, rows: i32) {
        let offset = self.scroll_top + f64::from(rows) * ROW_HEIGHT;
        self.scroll_top = offset.clamp(0.0, self.max_scroll());
        self.overshoot = 0.0;
    }

    pub fn page(&self) -> i32 {
        i32::try_from(self.viewport_rows.saturating_sub(1).max(1)).unwrap_or(i32::MAX)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.max_scroll() - self.scroll_top < ROW_HEIGHT
    }

    /// First content row to draw.
    pub fn first_row(&self) -> usize {
        (self.scroll_top / ROW_HEIGHT).round() as usize
    }

    /// Blank rows drawn above (`top`) or below (`bottom`) the content while
    /// the view is stretched past an edge.
    pub fn padding_rows(&self) -> (usize, usize) {
        if self.overshoot == 0.0 {
            return (0, 0);
        }
        let limit = (self.viewport_rows as f64 * MAX_OVERSHOOT_FRACTION).floor();
        let rows = (self.overshoot.abs() / ROW_HEIGHT).round().min(limit) as usize;
        if self.overshoot < 0.0 {
            (rows, 0)
        } else {
            (0, rows)
        }
    }
}

impl ScrollContainer for TranscriptViewport {
    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, offset: f64) {
        self.scroll_top = offset.clamp(0.0, self.max_scroll());
    }

    fn max_scroll(&self) -> f64 {
        self.content_rows.saturating_sub(self.viewport_rows) as f64 * ROW_HEIGHT
    }

    fn set_overshoot(&mut self, overshoot: f64) {
        self.overshoot = if self.rubberband { overshoot } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_scroll_follows_content() {
        let mut viewport = TranscriptViewport::new(true);
        viewport.resize(50, 20);
        assert_eq!(viewport.max_scroll(), 30.0 * ROW_HEIGHT);
        viewport.resize(10, 20);
        assert_eq!(viewport.max_scroll(), 0.0);
    }

    #[test]
    fn shrinking_content_clamps_offset() {
        let mut viewport = TranscriptViewport::new(true);
        viewport.resize(50, 20);
        viewport.set_scroll_top(600.0);
        viewport.resize(30, 20);
        assert_eq!(viewport.scroll_top(), 200.0);
        assert!(viewport.is_at_bottom());
    }

    #[test]
    fn manual_scroll_is_row_based_and_clamped() {
        let mut viewport = TranscriptViewport::new(true);
        viewport.resize(50, 20);
        viewport.scroll_by_rows(3);
        assert_eq!(viewport.first_row(), 3);
        viewport.scroll_by_rows(-10);
        assert_eq!(viewport.first_row(), 0);
        viewport.scroll_by_rows(1_000);
        assert_eq!(viewport.first_row(), 30);
    }

    #[test]
    fn overshoot_becomes_padding() {
        let mut viewport = TranscriptViewport::new(true);
        viewport.resize(50, 20);
        viewport.set_overshoot(-45.0);
        assert_eq!(viewport.padding_rows(), (2, 0));
        viewport.set_overshoot(10_000.0);
        assert_eq!(viewport.padding_rows(), (0, 10));
    }

    #[test]
    fn disabled_rubberband_ignores_overshoot() {
        let mut viewport = TranscriptViewport::new(false);
        viewport.resize(50, 20);
        viewport.set_overshoot(80.0);
        assert_eq!(viewport.padding_rows(), (0, 0));
    }
}
