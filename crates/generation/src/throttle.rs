//! Advisory per-user throttle policy.

use std::time::Duration;

/// Sliding-window throttle signal.
///
/// Purely advisory: it tells the submitting client that its request may be
/// queued, it never blocks submission. The count is recomputed on demand
/// from the job store and includes the job that was just
/// created, so the warning first fires on the submission that pushes the
/// window past the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Trailing window over `created_at`.
    pub window: Duration,
    /// Warn when the in-window count exceeds this.
    pub warn_threshold: usize,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            warn_threshold: 3,
        }
    }
}

impl ThrottlePolicy {
    /// `recent_count` is the owner's job count within [`Self::window`],
    /// including the just-created job.
    pub fn should_warn(&self, recent_count: usize) -> bool {
        recent_count > self.warn_threshold
    }
}
