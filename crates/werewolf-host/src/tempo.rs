//! Real-time pacing: inter-step delay, skip, and pause/resume.
//!
//! The controller sits between orchestrator steps. Waits run in bounded
//! slices so a pause engaged mid-wait takes effect promptly, and a pause
//! that nobody resumes force-resumes after a timeout rather than hanging
//! the game forever.

use crate::config::TempoConfig;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::warn;

/// Upper clamp for the configurable inter-step delay
const MAX_STEP_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct TempoState {
    delay: Duration,
    skip: bool,
    paused: bool,
}

/// Shared pacing state with a resume signal for paused waiters
#[derive(Debug)]
pub struct TempoController {
    state: Mutex<TempoState>,
    resume: Notify,
    pause_timeout: Duration,
    poll_interval: Duration,
}

impl TempoController {
    pub fn new(config: TempoConfig) -> Self {
        Self {
            state: Mutex::new(TempoState {
                delay: config.step_delay.min(MAX_STEP_DELAY),
                skip: false,
                paused: false,
            }),
            resume: Notify::new(),
            pause_timeout: config.pause_timeout,
            // A zero slice would spin; one millisecond is the floor
            poll_interval: config.poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Change the inter-step delay, clamped to a sane range
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay.min(MAX_STEP_DELAY);
    }

    pub fn delay(&self) -> Duration {
        self.lock().delay
    }

    /// Bypass delays entirely (pauses still apply)
    pub fn set_skip(&self, skip: bool) {
        self.lock().skip = skip;
    }

    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Clear the paused flag and release every queued waiter
    pub fn resume(&self) {
        self.lock().paused = false;
        self.resume.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Block while paused. A pause held longer than the configured timeout
    /// force-resumes so the game keeps its liveness guarantee.
    pub async fn wait_while_paused(&self) {
        if !self.is_paused() {
            return;
        }
        let start = Instant::now();
        loop {
            if !self.is_paused() {
                return;
            }
            if start.elapsed() >= self.pause_timeout {
                warn!("pause held past its timeout, forcing resume");
                self.resume();
                return;
            }
            // Re-check the flag periodically even without a resume signal
            let _ = tokio::time::timeout(self.poll_interval, self.resume.notified()).await;
        }
    }

    /// The standard between-steps wait: block on pause first, then sleep
    /// the configured delay in slices that keep honoring a new pause.
    pub async fn wait_for_tempo(&self) {
        self.wait_while_paused().await;

        let (delay, skip) = {
            let state = self.lock();
            (state.delay, state.skip)
        };
        if skip || delay.is_zero() {
            return;
        }

        let mut remaining = delay;
        while !remaining.is_zero() {
            let slice = remaining.min(self.poll_interval);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
            if self.is_paused() {
                self.wait_while_paused().await;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TempoState> {
        // Tempo state is plain flags; a poisoned lock only means another
        // thread panicked mid-toggle, so take the data as-is
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fast(pause_timeout: Duration) -> TempoConfig {
        TempoConfig {
            step_delay: Duration::ZERO,
            pause_timeout,
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let tempo = TempoController::new(fast(Duration::from_secs(5)));
        let start = Instant::now();
        tempo.wait_for_tempo().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_skip_bypasses_delay() {
        let tempo = TempoController::new(TempoConfig {
            step_delay: Duration::from_secs(2),
            ..fast(Duration::from_secs(5))
        });
        tempo.set_skip(true);
        let start = Instant::now();
        tempo.wait_for_tempo().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_delay_is_clamped() {
        let tempo = TempoController::new(fast(Duration::from_secs(5)));
        tempo.set_delay(Duration::from_secs(3600));
        assert_eq!(tempo.delay(), MAX_STEP_DELAY);
    }

    #[tokio::test]
    async fn test_pause_blocks_until_resume() {
        let tempo = Arc::new(TempoController::new(fast(Duration::from_secs(5))));
        tempo.pause();

        let waiter = {
            let tempo = tempo.clone();
            tokio::spawn(async move { tempo.wait_for_tempo().await })
        };

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!waiter.is_finished(), "waiter should still be parked");

        tempo.resume();
        tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should release on resume")
            .expect("waiter task should not panic");
    }

    #[tokio::test]
    async fn test_pause_timeout_forces_resume() {
        let tempo = TempoController::new(fast(Duration::from_millis(40)));
        tempo.pause();

        let start = Instant::now();
        tempo.wait_while_paused().await;

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(!tempo.is_paused(), "forced resume should clear the flag");
    }

    #[tokio::test]
    async fn test_pause_engages_mid_delay() {
        let tempo = Arc::new(TempoController::new(TempoConfig {
            step_delay: Duration::from_millis(60),
            pause_timeout: Duration::from_millis(80),
            poll_interval: Duration::from_millis(5),
        }));

        let waiter = {
            let tempo = tempo.clone();
            tokio::spawn(async move { tempo.wait_for_tempo().await })
        };

        // Pause lands while the delay sleep is in progress, then the
        // timeout force-resumes and the delay finishes
        tokio::time::sleep(Duration::from_millis(20)).await;
        tempo.pause();

        tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("delay should complete after the forced resume")
            .expect("waiter task should not panic");
    }
}
