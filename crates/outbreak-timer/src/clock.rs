//! Fixed-rate frame clock that feeds elapsed time into a [`TimerScheduler`].
//!
//! [`TimerScheduler`]: crate::TimerScheduler

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Configuration for the frame clock.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Frames per second. Host timer resolution is 0.1 s, so the default
    /// is 10 Hz.
    pub frame_rate_hz: u32,
    /// Random jitter (0–max µs) added to the first frame.
    pub initial_jitter_us: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 10,
            initial_jitter_us: 2_000,
        }
    }
}

impl FrameConfig {
    pub const MAX_FRAME_RATE_HZ: u32 = 128;

    pub fn with_rate(frame_rate_hz: u32) -> Self {
        Self {
            frame_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps `frame_rate_hz` into `1..=MAX_FRAME_RATE_HZ`.
    pub fn validated(mut self) -> Self {
        let clamped = self.frame_rate_hz.clamp(1, Self::MAX_FRAME_RATE_HZ);
        if clamped != self.frame_rate_hz {
            warn!(
                rate = self.frame_rate_hz,
                clamped,
                "frame_rate_hz out of range, clamping"
            );
            self.frame_rate_hz = clamped;
        }
        self
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// Information about one frame, returned by [`FrameClock::wait_for_frame`].
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Monotonically increasing frame number (starts at 1).
    pub frame: u64,
    /// Wall time since the previous frame. Feed this to
    /// `TimerScheduler::advance` so timers keep real-time deadlines even
    /// after an overrun.
    pub elapsed: Duration,
    /// `true` if the frame fired more than 10% late.
    pub overrun: bool,
    pub frames_skipped: u64,
}

/// Fixed-rate clock for the controller actor's `tokio::select!` loop.
///
/// On overrun the missed frames are skipped and the next deadline is
/// scheduled from now, but `elapsed` still reports the full gap.
pub struct FrameClock {
    frame_duration: Duration,
    frame_count: u64,
    next_frame: Instant,
    last_frame: Instant,
}

impl FrameClock {
    pub fn new(config: FrameConfig) -> Self {
        let config = config.validated();
        let frame_duration = config.frame_duration();
        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };
        let now = Instant::now();

        debug!(
            rate_hz = config.frame_rate_hz,
            frame_ms = frame_duration.as_secs_f64() * 1000.0,
            "frame clock created"
        );

        Self {
            frame_duration,
            frame_count: 0,
            next_frame: now + frame_duration + jitter,
            last_frame: now,
        }
    }

    pub fn with_rate(frame_rate_hz: u32) -> Self {
        Self::new(FrameConfig::with_rate(frame_rate_hz))
    }

    /// Waits until the next frame is due.
    pub async fn wait_for_frame(&mut self) -> FrameInfo {
        let due = self.next_frame;
        time::sleep_until(due).await;

        let now = Instant::now();
        self.frame_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.frame_duration / 10;
        let mut frames_skipped = 0;
        if overrun {
            frames_skipped = (late_by.as_nanos() / self.frame_duration.as_nanos()) as u64;
            if frames_skipped > 0 {
                warn!(
                    frame = self.frame_count,
                    skipped = frames_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "frame overrun, skipping ahead"
                );
            }
        }

        self.next_frame = now + self.frame_duration;
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        trace!(frame = self.frame_count, overrun, "frame");

        FrameInfo {
            frame: self.frame_count,
            elapsed,
            overrun,
            frames_skipped,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}
