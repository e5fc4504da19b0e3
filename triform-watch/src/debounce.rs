use std::time::Duration;

use tokio::time::Instant;

/// Holds a pending change until `window` has elapsed since the last push.
///
/// The first change after start-up is released immediately.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_push: Option<Instant>,
    pending: bool,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            last_push: None,
            pending: false,
        }
    }

    pub fn mark(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether a push may start at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        self.pending
            && self
                .last_push
                .map_or(true, |last| now.duration_since(last) >= self.window)
    }

    /// Clear the pending flag and restart the window.
    pub fn record_push(&mut self, now: Instant) {
        self.pending = false;
        self.last_push = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn bursts_collapse_to_one_push_per_window() {
        let mut debounce = Debouncer::new(Duration::from_millis(1000));
        let mut pushes = 0usize;

        for _ in 0..10 {
            debounce.mark();
            if debounce.ready(Instant::now()) {
                pushes += 1;
                debounce.record_push(Instant::now());
            }
            advance(Duration::from_millis(50)).await;
        }
        assert_eq!(pushes, 1, "first edit pushes, the rest wait for the window");
        assert!(debounce.is_pending());

        advance(Duration::from_millis(600)).await;
        assert!(debounce.ready(Instant::now()), "pending change survives the window");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn nothing_pending_is_never_ready() {
        let mut debounce = Debouncer::new(Duration::from_millis(100));
        assert!(!debounce.ready(Instant::now()));
        debounce.mark();
        debounce.record_push(Instant::now());
        advance(Duration::from_secs(5)).await;
        assert!(!debounce.ready(Instant::now()));
    }
}
