use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Rolling-window request throttle shared by every metered exchange call.
///
/// Binance budgets requests in weight units per minute; the gate admits
/// callers up to 90% of that budget and makes the rest of them sit out the
/// remainder of the window. Callers serialize on one lock, including across
/// the sleep, so a waiting caller holds back everyone behind it. After a
/// single wait the weight is added unconditionally rather than re-checked in
/// a loop, so a burst released together can overshoot the threshold once.
pub struct RateGate {
    threshold: u32,
    window: Duration,
    state: Mutex<RateWindow>,
}

struct RateWindow {
    consumed: u32,
    window_start: Instant,
}

const WINDOW: Duration = Duration::from_secs(60);

impl RateGate {
    pub fn new(capacity_per_minute: u32) -> Self {
        Self::with_window(capacity_per_minute, WINDOW)
    }

    fn with_window(capacity_per_minute: u32, window: Duration) -> Self {
        Self {
            threshold: (capacity_per_minute as f64 * 0.9) as u32,
            window,
            state: Mutex::new(RateWindow {
                consumed: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Blocks until `weight` units can be consumed, then consumes them.
    pub async fn acquire(&self, weight: u32) {
        let mut state = self.state.lock().await;
        self.reset_if_elapsed(&mut state);

        if state.consumed + weight > self.threshold {
            let elapsed = state.window_start.elapsed();
            if elapsed < self.window {
                let wait = self.window - elapsed;
                log::info!(
                    "Rate limit approaching. Sleeping for {:.2} seconds.",
                    wait.as_secs_f64()
                );
                sleep(wait).await;
            }
            self.reset_if_elapsed(&mut state);
        }

        state.consumed += weight;
    }

    fn reset_if_elapsed(&self, state: &mut RateWindow) {
        if state.window_start.elapsed() >= self.window {
            state.consumed = 0;
            state.window_start = Instant::now();
            log::info!("Rate limit counter reset.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_under_threshold_without_waiting() {
        let gate = RateGate::new(1200);
        let before = Instant::now();

        for _ in 0..27 {
            gate.acquire(40).await;
        }

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_at_threshold_until_window_reset() {
        let gate = RateGate::new(1200); // threshold 1080
        gate.acquire(1080).await;

        let before = Instant::now();
        gate.acquire(1).await;

        // Must have slept out the remainder of the 60s window.
        assert!(before.elapsed() >= Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_resets_after_window_elapses() {
        let gate = RateGate::new(1200);
        gate.acquire(1080).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        let before = Instant::now();
        gate.acquire(1080).await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn short_window_gate_wakes_after_window() {
        let gate = RateGate::with_window(100, Duration::from_secs(2)); // threshold 90
        gate.acquire(90).await;

        let before = Instant::now();
        gate.acquire(10).await;

        assert!(before.elapsed() >= Duration::from_secs(1));
        assert!(before.elapsed() <= Duration::from_secs(3));
    }
}
