/*
 * A model of the scrollable chat message list. `ChatViewport` tracks the scroll
 * metrics of the active conversation and applies the `ScrollFollower`'s decisions
 * to its scroll offset, clamping the way a real viewport does.
 */
use crate::core::{
    FollowerConfig, LayoutDirection, ScrollDecision, ScrollFollower, ViewportMetrics,
};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ChatViewport {
    conversation_id: Option<String>,
    metrics: ViewportMetrics,
    follower: ScrollFollower,
}

impl ChatViewport {
    pub fn new(direction: LayoutDirection, client_height: f64, config: FollowerConfig) -> Self {
        ChatViewport {
            conversation_id: None,
            metrics: ViewportMetrics::new(0.0, client_height, client_height),
            follower: ScrollFollower::new(direction, config),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn metrics(&self) -> ViewportMetrics {
        self.metrics
    }

    pub fn scroll_top(&self) -> f64 {
        self.metrics.scroll_top
    }

    pub fn is_following(&self) -> bool {
        self.follower.is_following()
    }

    fn apply(&mut self, decision: ScrollDecision) {
        if let ScrollDecision::SnapTo(offset) = decision {
            self.metrics.scroll_top = offset.clamp(0.0, self.metrics.max_scroll_top());
        }
    }

    fn grow(&mut self, added_height: f64) {
        self.metrics.scroll_height += added_height.max(0.0);
    }

    /* The user sent a message of the given rendered height. */
    pub fn append_user_message(&mut self, height: f64) {
        self.grow(height);
        let decision = self.follower.on_user_message(&self.metrics);
        self.apply(decision);
    }

    /* A streamed chunk grew the last message by `added_height`. */
    pub fn stream_chunk(&mut self, added_height: f64) {
        self.grow(added_height);
        let decision = self.follower.on_content_update(&self.metrics, true);
        self.apply(decision);
    }

    /* A complete, non-streamed message arrived. */
    pub fn append_message(&mut self, height: f64) {
        self.grow(height);
        let decision = self.follower.on_content_update(&self.metrics, false);
        self.apply(decision);
    }

    /* The user dragged or wheeled the list to `offset`. */
    pub fn user_scroll_to(&mut self, offset: f64, now: Instant) {
        self.metrics.scroll_top = offset.clamp(0.0, self.metrics.max_scroll_top());
        self.follower.record_user_scroll(self.metrics, now);
    }

    /* Drives the scroll debounce. Returns true when a scroll sample took effect. */
    pub fn tick(&mut self, now: Instant) -> bool {
        self.follower.poll(now)
    }

    /*
     * Shows another conversation whose messages take `content_height`. Scroll
     * state from the previous conversation does not carry over.
     */
    pub fn switch_conversation(&mut self, conversation_id: &str, content_height: f64) {
        log::debug!("ChatViewport: Switching to conversation {conversation_id:?}.");
        self.conversation_id = Some(conversation_id.to_string());
        self.metrics = ViewportMetrics::new(
            0.0,
            content_height.max(self.metrics.client_height),
            self.metrics.client_height,
        );
        let decision = self.follower.on_conversation_switched(&self.metrics);
        self.apply(decision);
    }
}
