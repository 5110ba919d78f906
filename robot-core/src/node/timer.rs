//! Node timers.
//!
//! Timers never fire on their own: `Node::receive` bounds its wait by the next
//! due timer and turns every expired one into a `Timer` event.

use robot::TimerId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Shortest period of a repeating timer.
const MIN_REPEAT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Instant,
    repeat: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: HashMap<TimerId, Timer>,
    next_id: TimerId,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot timer firing after `interval`.
    pub fn start(&mut self, interval: Duration) -> TimerId {
        self.arm(Instant::now() + interval, None)
    }

    /// Arms a timer firing after `start`, then every `repeat`.
    pub fn start_repeat(&mut self, start: Duration, repeat: Duration) -> TimerId {
        self.arm(Instant::now() + start, Some(repeat.max(MIN_REPEAT)))
    }

    /// Disarms a timer. Returns false if it was not armed.
    pub fn stop(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Time left until the earliest timer is due.
    pub fn next_due_in(&self, now: Instant) -> Option<Duration> {
        self.timers
            .values()
            .map(|timer| timer.due.saturating_duration_since(now))
            .min()
    }

    /// Collects the timers due at `now`, earliest first.
    ///
    /// One-shot timers are disarmed, repeating ones re-armed for their next period.
    pub fn expire(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= now)
            .map(|(id, timer)| (timer.due, *id))
            .collect();
        due.sort();

        for (_, id) in &due {
            let rearm = self.timers.get(id).and_then(|timer| timer.repeat);
            match rearm {
                Some(repeat) => {
                    if let Some(timer) = self.timers.get_mut(id) {
                        timer.due = now + repeat;
                    }
                }
                None => {
                    self.timers.remove(id);
                }
            }
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    fn arm(&mut self, due: Instant, repeat: Option<Duration>) -> TimerId {
        self.next_id += 1;
        self.timers.insert(self.next_id, Timer { due, repeat });
        self.next_id
    }
}
