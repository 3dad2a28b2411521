/*
 * Decides whether a chat viewport that receives streamed content should stay
 * pinned to its follow edge: the bottom for a top-down layout, the top for a
 * bottom-up (reversed) layout.
 *
 * Following stops once the user scrolls clearly away from the edge and resumes
 * when they come back close to it, send a new message, or switch conversation.
 * User scroll events are sampled with a trailing debounce; a pending sample is
 * flushed early whenever content arrives, so a scroll-away that races a streamed
 * chunk is never overridden by a snap.
 */
use std::time::{Duration, Instant};

pub const DEFAULT_NEAR_EDGE_THRESHOLD: f64 = 20.0;
pub const DEFAULT_SCROLL_AWAY_THRESHOLD: f64 = 50.0;
pub const DEFAULT_SCROLL_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutDirection {
    TopDown,
    BottomUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ViewportMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        ViewportMetrics {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    pub fn distance_from_follow_edge(&self, direction: LayoutDirection) -> f64 {
        match direction {
            LayoutDirection::TopDown => (self.max_scroll_top() - self.scroll_top).max(0.0),
            LayoutDirection::BottomUp => self.scroll_top.abs(),
        }
    }

    /*
     * Offset to assign to reach the follow edge. For top-down layouts this is the
     * full scroll height; the viewport clamps it to its maximum.
     */
    pub fn follow_edge_offset(&self, direction: LayoutDirection) -> f64 {
        match direction {
            LayoutDirection::TopDown => self.scroll_height,
            LayoutDirection::BottomUp => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollDecision {
    SnapTo(f64),
    Hold,
}

#[derive(Debug, Clone, Copy)]
pub struct FollowerConfig {
    pub near_edge_threshold: f64,
    pub scroll_away_threshold: f64,
    pub scroll_debounce: Duration,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        FollowerConfig {
            near_edge_threshold: DEFAULT_NEAR_EDGE_THRESHOLD,
            scroll_away_threshold: DEFAULT_SCROLL_AWAY_THRESHOLD,
            scroll_debounce: DEFAULT_SCROLL_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollFollower {
    config: FollowerConfig,
    direction: LayoutDirection,
    user_has_scrolled: bool,
    was_following_stream: bool,
    pending_sample: Option<(ViewportMetrics, Instant)>,
}

impl ScrollFollower {
    pub fn new(direction: LayoutDirection, config: FollowerConfig) -> Self {
        ScrollFollower {
            config,
            direction,
            user_has_scrolled: false,
            was_following_stream: true,
            pending_sample: None,
        }
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn user_has_scrolled(&self) -> bool {
        self.user_has_scrolled
    }

    pub fn is_following(&self) -> bool {
        !self.user_has_scrolled && self.was_following_stream
    }

    fn snap(&mut self, metrics: &ViewportMetrics) -> ScrollDecision {
        self.was_following_stream = true;
        ScrollDecision::SnapTo(metrics.follow_edge_offset(self.direction))
    }

    /* A message authored by the user always brings the view back to the edge. */
    pub fn on_user_message(&mut self, metrics: &ViewportMetrics) -> ScrollDecision {
        log::debug!("ScrollFollower: User message sent; resuming follow.");
        self.pending_sample = None;
        self.user_has_scrolled = false;
        self.snap(metrics)
    }

    /* Resets to the following state for a freshly opened conversation. */
    pub fn on_conversation_switched(&mut self, metrics: &ViewportMetrics) -> ScrollDecision {
        log::debug!("ScrollFollower: Conversation switched; resetting to follow.");
        self.pending_sample = None;
        self.user_has_scrolled = false;
        self.snap(metrics)
    }

    /*
     * Called after the content grew. `metrics` describes the viewport after the
     * update. Only streamed content is followed.
     */
    pub fn on_content_update(
        &mut self,
        metrics: &ViewportMetrics,
        streaming: bool,
    ) -> ScrollDecision {
        if let Some((sample, _)) = self.pending_sample.take() {
            self.apply_sample(&sample);
        }
        if streaming && !self.user_has_scrolled && self.was_following_stream {
            self.snap(metrics)
        } else {
            ScrollDecision::Hold
        }
    }

    /* Records a user scroll event. It takes effect once the debounce elapses. */
    pub fn record_user_scroll(&mut self, metrics: ViewportMetrics, now: Instant) {
        self.pending_sample = Some((metrics, now));
    }

    /*
     * Applies the pending scroll sample if no newer event arrived within the
     * debounce window. Returns true when a sample was applied.
     */
    pub fn poll(&mut self, now: Instant) -> bool {
        let debounce = self.config.scroll_debounce;
        match self.pending_sample {
            Some((sample, at)) if now.saturating_duration_since(at) >= debounce => {
                self.pending_sample = None;
                self.apply_sample(&sample);
                true
            }
            _ => false,
        }
    }

    fn apply_sample(&mut self, sample: &ViewportMetrics) {
        let distance = sample.distance_from_follow_edge(self.direction);
        if distance > self.config.scroll_away_threshold {
            if !self.user_has_scrolled {
                log::debug!("ScrollFollower: User scrolled {distance:.0}px away; pausing follow.");
            }
            self.user_has_scrolled = true;
            self.was_following_stream = false;
        } else if distance <= self.config.near_edge_threshold {
            if self.user_has_scrolled {
                log::debug!("ScrollFollower: User returned to the edge; resuming follow.");
            }
            self.user_has_scrolled = false;
            self.was_following_stream = true;
        } else {
            self.was_following_stream = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower(direction: LayoutDirection) -> ScrollFollower {
        ScrollFollower::new(direction, FollowerConfig::default())
    }

    #[test]
    fn test_streaming_update_pins_to_scroll_height() {
        let mut f = follower(LayoutDirection::TopDown);
        let after_update = ViewportMetrics::new(600.0, 1200.0, 400.0);

        let decision = f.on_content_update(&after_update, true);

        assert_eq!(decision, ScrollDecision::SnapTo(1200.0));
    }

    #[test]
    fn test_non_streaming_update_holds() {
        let mut f = follower(LayoutDirection::TopDown);
        let decision = f.on_content_update(&ViewportMetrics::new(600.0, 1200.0, 400.0), false);
        assert_eq!(decision, ScrollDecision::Hold);
    }

    #[test]
    fn test_scroll_away_stops_following_until_return() {
        // Arrange
        crate::initialize_logging();
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();

        // Act: scroll 300px up from the bottom and let the debounce elapse.
        f.record_user_scroll(ViewportMetrics::new(500.0, 1200.0, 400.0), t0);
        assert!(!f.poll(t0 + Duration::from_millis(10)));
        assert!(f.poll(t0 + Duration::from_millis(60)));

        // Assert
        assert!(f.user_has_scrolled());
        for grown in [1300.0, 1400.0, 1500.0] {
            let decision = f.on_content_update(&ViewportMetrics::new(500.0, grown, 400.0), true);
            assert_eq!(decision, ScrollDecision::Hold);
        }

        // Back within 20px of the bottom.
        let back = ViewportMetrics::new(1090.0, 1500.0, 400.0);
        f.record_user_scroll(back, t0 + Duration::from_millis(500));
        f.poll(t0 + Duration::from_millis(600));
        assert!(!f.user_has_scrolled());
        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(1090.0, 1600.0, 400.0), true),
            ScrollDecision::SnapTo(1600.0)
        );
    }

    #[test]
    fn test_user_message_overrides_scroll_away() {
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();
        f.record_user_scroll(ViewportMetrics::new(0.0, 1200.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(100));
        assert!(f.user_has_scrolled());

        let decision = f.on_user_message(&ViewportMetrics::new(0.0, 1300.0, 400.0));

        assert_eq!(decision, ScrollDecision::SnapTo(1300.0));
        assert!(!f.user_has_scrolled());
        assert!(f.is_following());
    }

    #[test]
    fn test_pending_sample_is_flushed_by_content_update() {
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();
        f.record_user_scroll(ViewportMetrics::new(100.0, 1200.0, 400.0), t0);

        // Content arrives before the debounce elapsed.
        let decision = f.on_content_update(&ViewportMetrics::new(100.0, 1250.0, 400.0), true);

        assert_eq!(decision, ScrollDecision::Hold);
        assert!(f.user_has_scrolled());
    }

    #[test]
    fn test_small_drift_pauses_without_marking_user_scroll() {
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();
        // 35px from the bottom: between the two thresholds.
        f.record_user_scroll(ViewportMetrics::new(765.0, 1200.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(50));

        assert!(!f.user_has_scrolled());
        assert!(!f.is_following());
        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(765.0, 1300.0, 400.0), true),
            ScrollDecision::Hold
        );
    }

    #[test]
    fn test_exactly_near_edge_threshold_resumes_following() {
        // Arrange
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();
        f.record_user_scroll(ViewportMetrics::new(0.0, 1200.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(60));
        assert!(f.user_has_scrolled());

        // Act: 780 is exactly 20px above the bottom (max scroll top 800).
        let near = ViewportMetrics::new(780.0, 1200.0, 400.0);
        f.record_user_scroll(near, t0 + Duration::from_millis(100));
        f.poll(t0 + Duration::from_millis(200));

        // Assert
        assert!(!f.user_has_scrolled());
        assert!(f.is_following());
        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(780.0, 1300.0, 400.0), true),
            ScrollDecision::SnapTo(1300.0)
        );
    }

    #[test]
    fn test_exactly_scroll_away_threshold_pauses_without_user_scroll() {
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();

        // 750 is exactly 50px above the bottom.
        f.record_user_scroll(ViewportMetrics::new(750.0, 1200.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(60));

        assert!(!f.user_has_scrolled());
        assert!(!f.is_following());
        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(750.0, 1300.0, 400.0), true),
            ScrollDecision::Hold
        );
    }

    #[test]
    fn test_bottom_up_layout_follows_top_edge() {
        let mut f = follower(LayoutDirection::BottomUp);
        let t0 = Instant::now();

        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(0.0, 900.0, 400.0), true),
            ScrollDecision::SnapTo(0.0)
        );

        f.record_user_scroll(ViewportMetrics::new(200.0, 900.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(80));
        assert!(f.user_has_scrolled());
        assert_eq!(
            f.on_content_update(&ViewportMetrics::new(200.0, 1000.0, 400.0), true),
            ScrollDecision::Hold
        );
    }

    #[test]
    fn test_conversation_switch_resets_state() {
        let mut f = follower(LayoutDirection::TopDown);
        let t0 = Instant::now();
        f.record_user_scroll(ViewportMetrics::new(0.0, 2000.0, 400.0), t0);
        f.poll(t0 + Duration::from_millis(60));
        assert!(f.user_has_scrolled());

        let decision = f.on_conversation_switched(&ViewportMetrics::new(0.0, 800.0, 400.0));

        assert_eq!(decision, ScrollDecision::SnapTo(800.0));
        assert!(f.is_following());
    }
}
