//! Announcement debouncing.
//!
//! A sign that stays in view would otherwise be announced on every frame.
//! The policy remembers the single most recently announced sign and lets a
//! detection through only when it is a different sign, or the same sign
//! after the cooldown window has fully elapsed.

use std::time::{Duration, Instant};

/// Default confidence gate for announcements.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.75;
/// Default cooldown before re-announcing the same sign.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Rolling memory of the last announced sign.
///
/// One instance exists per pipeline; it is overwritten, never accumulated
/// into a history. Both fields are set together.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnnounceState {
    last_sign: Option<&'static str>,
    last_at: Option<Instant>,
}

impl AnnounceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_sign(&self) -> Option<&'static str> {
        self.last_sign
    }

    pub fn last_at(&self) -> Option<Instant> {
        self.last_at
    }
}

/// Confidence gate plus single rolling cooldown window.
#[derive(Clone, Copy, Debug)]
pub struct DebouncePolicy {
    confidence_threshold: f32,
    cooldown: Duration,
}

impl DebouncePolicy {
    pub fn new(confidence_threshold: f32, cooldown: Duration) -> Self {
        Self {
            confidence_threshold,
            cooldown,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide whether a detection is novel enough to announce.
    ///
    /// True iff the confidence clears the gate AND the sign differs from
    /// the remembered one OR strictly more than the cooldown has elapsed
    /// since it was last announced. On true, the state is updated to this
    /// sign and `now` before returning. Below-threshold detections leave
    /// the state untouched.
    ///
    /// The window is global, not per sign: a different sign overwrites the
    /// remembered identity immediately, so only the last sign is ever
    /// cooled down.
    pub fn should_announce(
        &self,
        state: &mut AnnounceState,
        sign_name: &'static str,
        confidence: f32,
        now: Instant,
    ) -> bool {
        if confidence < self.confidence_threshold {
            return false;
        }

        let novel = match (state.last_sign, state.last_at) {
            (Some(last_sign), Some(last_at)) => {
                last_sign != sign_name || now.duration_since(last_at) > self.cooldown
            }
            _ => true,
        };

        if novel {
            state.last_sign = Some(sign_name);
            state.last_at = Some(now);
        }
        novel
    }
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_COOLDOWN)
    }
}
