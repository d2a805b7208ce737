//! Delayed and repeating tasks on a virtual clock.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use tracing::trace;

/// Smallest interval a repeating task may use. Prevents a zero interval
/// from firing forever inside one `advance`.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Opaque, never-reused identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

struct Entry<T> {
    deadline: Duration,
    interval: Option<Duration>,
    task: T,
}

/// A task whose deadline has passed, handed back to the owner to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub handle: TaskHandle,
    pub task: T,
    /// Clock value the task was due at.
    pub at: Duration,
    /// Repeating tasks stay live after firing until cancelled.
    pub repeating: bool,
}

/// Schedules tasks of type `T` against a virtual clock.
///
/// The scheduler never runs anything itself. The owner calls
/// [`advance`](Self::advance) with the elapsed time and then drains
/// [`pop_due`](Self::pop_due), running each task with full mutable access
/// to its own state. A task may schedule or cancel other tasks (including
/// itself) while it runs; the change is seen by the next `pop_due`.
///
/// ```text
/// schedule_once ──→ [live] ──(deadline)──→ pop_due ──→ [gone]
/// schedule_repeating ──→ [live] ──(deadline)──→ pop_due ──→ [live, re-armed]
///                          │
///                          └──(cancel)──→ [gone]
/// ```
pub struct TimerScheduler<T> {
    now: Duration,
    /// Clock target of the current `advance`. `pop_due` walks `now` up to it.
    horizon: Duration,
    next_id: u64,
    entries: HashMap<TaskHandle, Entry<T>>,
    /// Ordered index of `entries` by (deadline, handle). Kept in sync.
    queue: BTreeSet<(Duration, TaskHandle)>,
}

impl<T: Clone> TimerScheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            horizon: Duration::ZERO,
            next_id: 1,
            entries: HashMap::new(),
            queue: BTreeSet::new(),
        }
    }

    /// Current clock value. While draining, this is the deadline of the
    /// task being run.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Runs `task` once, `delay` from now.
    pub fn schedule_once(&mut self, delay: Duration, task: T) -> TaskHandle {
        self.insert(delay, None, task)
    }

    /// Runs `task` every `interval`, first after one interval.
    pub fn schedule_repeating(&mut self, interval: Duration, task: T) -> TaskHandle {
        let interval = interval.max(MIN_INTERVAL);
        self.insert(interval, Some(interval), task)
    }

    fn insert(&mut self, delay: Duration, interval: Option<Duration>, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        let deadline = self.now + delay;
        self.entries.insert(
            handle,
            Entry {
                deadline,
                interval,
                task,
            },
        );
        self.queue.insert((deadline, handle));
        trace!(%handle, deadline_ms = deadline.as_millis() as u64, "task scheduled");
        handle
    }

    /// Cancels a task. Returns `false` if it already fired (one-shot) or
    /// was cancelled before.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.entries.remove(&handle) {
            Some(entry) => {
                self.queue.remove(&(entry.deadline, handle));
                trace!(%handle, "task cancelled");
                true
            }
            None => false,
        }
    }

    /// Takes the handle out of an owner field and cancels it.
    pub fn clear(&mut self, field: &mut Option<TaskHandle>) -> bool {
        field.take().is_some_and(|h| self.cancel(h))
    }

    /// Cancels whatever `field` holds, then stores `handle` in it.
    pub fn replace(&mut self, field: &mut Option<TaskHandle>, handle: TaskHandle) {
        self.clear(field);
        *field = Some(handle);
    }

    pub fn is_live(&self, handle: TaskHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Whether the owner field holds a handle that is still scheduled.
    pub fn is_live_field(&self, field: &Option<TaskHandle>) -> bool {
        field.is_some_and(|h| self.is_live(h))
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves the clock target forward by `dt`. Call `pop_due` until it
    /// returns `None` to run everything that came due.
    pub fn advance(&mut self, dt: Duration) {
        self.horizon = self.horizon.max(self.now) + dt;
    }

    /// Yields the earliest task due at or before the clock target.
    ///
    /// One-shot tasks are removed before they are returned, so their handle
    /// is already stale inside the callback. Repeating tasks are re-armed
    /// first, so the callback can cancel its own handle.
    pub fn pop_due(&mut self) -> Option<Fired<T>> {
        let Some(&(deadline, handle)) = self.queue.first() else {
            self.now = self.horizon.max(self.now);
            return None;
        };
        if deadline > self.horizon {
            self.now = self.horizon.max(self.now);
            return None;
        }

        self.queue.remove(&(deadline, handle));
        self.now = self.now.max(deadline);

        let interval = match self.entries.get(&handle) {
            Some(entry) => entry.interval,
            None => return self.pop_due(),
        };
        let (task, repeating) = match interval {
            Some(interval) => {
                let entry = self.entries.get_mut(&handle)?;
                entry.deadline = deadline + interval;
                self.queue.insert((entry.deadline, handle));
                (entry.task.clone(), true)
            }
            None => (self.entries.remove(&handle)?.task, false),
        };

        trace!(%handle, repeating, "task due");
        Some(Fired {
            handle,
            task,
            at: deadline,
            repeating,
        })
    }
}

impl<T: Clone> Default for TimerScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn drain(s: &mut TimerScheduler<&'static str>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(f) = s.pop_due() {
            out.push(f.task);
        }
        out
    }

    #[test]
    fn test_once_fires_after_delay_and_is_consumed() {
        let mut s = TimerScheduler::new();
        let h = s.schedule_once(secs(3), "respawn");

        s.advance(secs(2));
        assert!(drain(&mut s).is_empty());
        assert!(s.is_live(h));

        s.advance(secs(1));
        assert_eq!(drain(&mut s), vec!["respawn"]);
        assert!(!s.is_live(h));
        assert_eq!(s.now(), secs(3));
    }

    #[test]
    fn test_due_tasks_come_out_in_deadline_order() {
        let mut s = TimerScheduler::new();
        s.schedule_once(secs(5), "late");
        s.schedule_once(secs(1), "early");
        s.schedule_once(secs(1), "early-second");
        s.advance(secs(10));
        assert_eq!(drain(&mut s), vec!["early", "early-second", "late"]);
    }

    #[test]
    fn test_repeating_fires_every_interval_until_cancelled() {
        let mut s = TimerScheduler::new();
        let h = s.schedule_repeating(secs(1), "hud");
        s.advance(secs(3));
        assert_eq!(drain(&mut s), vec!["hud", "hud", "hud"]);
        assert!(s.is_live(h));

        assert!(s.cancel(h));
        s.advance(secs(3));
        assert!(drain(&mut s).is_empty());
    }

    #[test]
    fn test_repeating_task_can_cancel_itself_while_firing() {
        let mut s = TimerScheduler::new();
        s.schedule_repeating(secs(1), "ambient");
        s.advance(secs(5));
        let fired = s.pop_due().unwrap();
        assert!(fired.repeating);
        assert!(s.cancel(fired.handle));
        assert!(s.pop_due().is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel_stale_handle_is_noop() {
        let mut s = TimerScheduler::new();
        let h = s.schedule_once(secs(1), "x");
        s.advance(secs(1));
        drain(&mut s);
        assert!(!s.cancel(h));
    }

    #[test]
    fn test_replace_cancels_previous_handle() {
        let mut s = TimerScheduler::new();
        let mut field = None;
        let first = s.schedule_once(secs(2), "first");
        s.replace(&mut field, first);
        let second = s.schedule_once(secs(2), "second");
        s.replace(&mut field, second);

        assert!(!s.is_live(first));
        assert_eq!(field, Some(second));
        assert_eq!(s.len(), 1);

        s.advance(secs(2));
        assert_eq!(drain(&mut s), vec!["second"]);
    }

    #[test]
    fn test_clear_empties_field() {
        let mut s = TimerScheduler::new();
        let mut field = Some(s.schedule_once(secs(1), "x"));
        assert!(s.clear(&mut field));
        assert_eq!(field, None);
        assert!(!s.clear(&mut field));
        assert!(!s.is_live_field(&field));
    }

    #[test]
    fn test_task_scheduled_while_draining_is_relative_to_fire_time() {
        let mut s = TimerScheduler::new();
        s.schedule_once(secs(1), "first");
        s.advance(secs(10));
        let fired = s.pop_due().unwrap();
        assert_eq!(s.now(), secs(1));
        // Scheduled from inside the first callback: due at 1 + 2 = 3 s,
        // still inside this advance.
        s.schedule_once(secs(2), "chained");
        let next = s.pop_due().unwrap();
        assert_eq!(next.task, "chained");
        assert_eq!(next.at, secs(3));
        assert!(s.pop_due().is_none());
        assert_eq!(s.now(), secs(10));
        assert_eq!(fired.at, secs(1));
    }

    #[test]
    fn test_repeating_interval_is_clamped() {
        let mut s = TimerScheduler::new();
        s.schedule_repeating(Duration::ZERO, "spin");
        s.advance(Duration::from_millis(250));
        assert_eq!(drain(&mut s).len(), 2);
    }
}
