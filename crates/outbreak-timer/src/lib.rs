//! Timer scheduling for Outbreak.
//!
//! Timers are the only concurrency primitive of the controller. Every
//! delayed or repeating callback (respawns, HUD overlays, ambience, the
//! round deadline) is a task in one [`TimerScheduler`], identified by a
//! [`TaskHandle`] that exactly one record field owns.
//!
//! # Integration
//!
//! The [`FrameClock`] sits inside the controller actor's `tokio::select!`
//! loop and feeds elapsed time into the scheduler:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* host events */ }
//!         frame = clock.wait_for_frame() => {
//!             scheduler.advance(frame.elapsed);
//!             while let Some(fired) = scheduler.pop_due() {
//!                 run(fired.task);
//!             }
//!         }
//!     }
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::{FrameClock, FrameConfig, FrameInfo};
pub use scheduler::{Fired, MIN_INTERVAL, TaskHandle, TimerScheduler};
