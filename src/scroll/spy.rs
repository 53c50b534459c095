use tracing::trace;

/// Default distance below the visible top edge used to decide which section
/// is being read.
pub const DEFAULT_LOOKAHEAD: f64 = 100.0;

/// Layout of one navigable stage block, in container coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionAnchor {
    pub id: String,
    pub offset_top: f64,
    pub offset_height: f64,
}

impl SectionAnchor {
    pub fn new(id: impl Into<String>, offset_top: f64, offset_height: f64) -> Self {
        Self {
            id: id.into(),
            offset_top,
            offset_height,
        }
    }

    pub fn contains(&self, probe: f64) -> bool {
        probe >= self.offset_top && probe < self.offset_top + self.offset_height
    }
}

/// First section, in document order, whose span contains `probe`.
pub fn find_active(anchors: &[SectionAnchor], probe: f64) -> Option<&SectionAnchor> {
    anchors.iter().find(|anchor| anchor.contains(probe))
}

/// Tracks the section under the reading line. Scroll events only mark the
/// spy dirty; the recomputation happens at most once per frame.
#[derive(Debug)]
pub struct ScrollSpy {
    lookahead: f64,
    active: Option<String>,
    dirty: bool,
}

impl Default for ScrollSpy {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD)
    }
}

impl ScrollSpy {
    pub fn new(lookahead: f64) -> Self {
        Self {
            lookahead,
            active: None,
            dirty: true,
        }
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn set_lookahead(&mut self, lookahead: f64) {
        self.lookahead = lookahead;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The container scrolled.
    pub fn observe_scroll(&mut self) {
        self.dirty = true;
    }

    /// Section layout changed (new message, stage completed, resize).
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Recompute once for this frame if anything changed since the last one.
    /// When no section contains the reading line the previous section stays
    /// active.
    pub fn on_frame(
        &mut self,
        scroll_top: f64,
        container_offset: f64,
        anchors: &[SectionAnchor],
    ) -> Option<&str> {
        if self.dirty {
            self.dirty = false;
            let probe = scroll_top + container_offset + self.lookahead;
            if let Some(anchor) = find_active(anchors, probe) {
                if self.active.as_deref() != Some(anchor.id.as_str()) {
                    trace!(section = %anchor.id, probe, "Active section changed");
                    self.active = Some(anchor.id.clone());
                }
            }
        }
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Forget the active section, e.g. when switching conversations.
    pub fn reset(&mut self) {
        self.active = None;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sections() -> Vec<SectionAnchor> {
        vec![
            SectionAnchor::new("s1", 0.0, 500.0),
            SectionAnchor::new("s2", 500.0, 400.0),
        ]
    }

    #[test]
    fn reading_line_selects_containing_section() {
        let anchors = two_sections();
        assert_eq!(find_active(&anchors, 150.0).map(|a| a.id.as_str()), Some("s1"));
        assert_eq!(find_active(&anchors, 500.0).map(|a| a.id.as_str()), Some("s2"));
        assert_eq!(find_active(&anchors, 900.0), None);
    }

    #[test]
    fn adjacent_sections_split_at_their_boundary() {
        let anchors = vec![
            SectionAnchor::new("s1", 0.0, 100.0),
            SectionAnchor::new("s2", 100.0, 100.0),
        ];
        assert_eq!(find_active(&anchors, 150.0).map(|a| a.id.as_str()), Some("s2"));
        assert_eq!(find_active(&anchors, 99.0).map(|a| a.id.as_str()), Some("s1"));

        let mut spy = ScrollSpy::new(0.0);
        assert_eq!(spy.on_frame(150.0, 0.0, &anchors), Some("s2"));

        let mut ahead = ScrollSpy::default();
        assert_eq!(ahead.on_frame(50.0, 0.0, &anchors), Some("s2"));
    }

    #[test]
    fn lookahead_shifts_the_reading_line() {
        let anchors = two_sections();
        let mut spy = ScrollSpy::default();
        assert_eq!(spy.on_frame(150.0, 0.0, &anchors), Some("s1"));

        spy.observe_scroll();
        assert_eq!(spy.on_frame(420.0, 0.0, &anchors), Some("s2"));

        let mut exact = ScrollSpy::new(0.0);
        assert_eq!(exact.on_frame(499.0, 0.0, &anchors), Some("s1"));
    }

    #[test]
    fn container_offset_is_added_to_probe() {
        let anchors = two_sections();
        let mut spy = ScrollSpy::new(0.0);
        assert_eq!(spy.on_frame(450.0, 60.0, &anchors), Some("s2"));
    }

    #[test]
    fn gaps_keep_previous_section() {
        let anchors = vec![
            SectionAnchor::new("stage1-1", 0.0, 100.0),
            SectionAnchor::new("stage2-1", 300.0, 100.0),
        ];
        let mut spy = ScrollSpy::new(0.0);
        assert_eq!(spy.on_frame(50.0, 0.0, &anchors), Some("stage1-1"));
        spy.observe_scroll();
        assert_eq!(spy.on_frame(200.0, 0.0, &anchors), Some("stage1-1"));
        spy.observe_scroll();
        assert_eq!(spy.on_frame(350.0, 0.0, &anchors), Some("stage2-1"));
    }

    #[test]
    fn first_matching_section_wins_on_overlap() {
        let anchors = vec![
            SectionAnchor::new("outer", 0.0, 1_000.0),
            SectionAnchor::new("inner", 100.0, 100.0),
        ];
        assert_eq!(
            find_active(&anchors, 150.0).map(|a| a.id.as_str()),
            Some("outer")
        );
    }

    #[test]
    fn recomputes_at_most_once_per_frame() {
        let anchors = two_sections();
        let mut spy = ScrollSpy::new(0.0);
        assert_eq!(spy.on_frame(0.0, 0.0, &anchors), Some("s1"));
        assert!(!spy.is_dirty());

        // Without a scroll notification the stale answer is kept.
        assert_eq!(spy.on_frame(600.0, 0.0, &anchors), Some("s1"));

        for _ in 0..50 {
            spy.observe_scroll();
        }
        assert_eq!(spy.on_frame(600.0, 0.0, &anchors), Some("s2"));
        assert!(!spy.is_dirty());
    }

    #[test]
    fn reset_clears_active_section() {
        let anchors = two_sections();
        let mut spy = ScrollSpy::default();
        spy.on_frame(0.0, 0.0, &anchors);
        spy.reset();
        assert_eq!(spy.active(), None);
        assert!(spy.is_dirty());
        assert_eq!(spy.on_frame(0.0, 0.0, &[]), None);
    }
}
