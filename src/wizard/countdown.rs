//! Offer countdown.
//!
//! [`tick`] is the pure decomposition; [`Countdown`] republishes it on a
//! fixed cadence for as long as the handle is alive.

use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Time left until the deadline. All zero once it has passed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeRemaining {
    /// Split a millisecond difference into calendar-agnostic units.
    pub fn from_millis(ms: i64) -> Self {
        if ms <= 0 {
            return Self::default();
        }
        let ms = ms as u64;
        Self {
            days: ms / MS_PER_DAY as u64,
            hours: (ms % MS_PER_DAY as u64) / MS_PER_HOUR as u64,
            minutes: (ms % MS_PER_HOUR as u64) / MS_PER_MINUTE as u64,
            seconds: (ms % MS_PER_MINUTE as u64) / MS_PER_SECOND as u64,
        }
    }

    pub fn is_expired(&self) -> bool {
        *self == Self::default()
    }
}

/// Time remaining from `now` until `target`.
pub fn tick<A: TimeZone, B: TimeZone>(now: &DateTime<A>, target: &DateTime<B>) -> TimeRemaining {
    TimeRemaining::from_millis(target.timestamp_millis() - now.timestamp_millis())
}

/// A spawned task that is aborted when the handle is dropped.
#[derive(Debug)]
pub struct ScopedTask(JoinHandle<()>);

impl ScopedTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Periodic countdown publisher. Dropping it stops the ticking.
#[derive(Debug)]
pub struct Countdown {
    rx: watch::Receiver<TimeRemaining>,
    _task: ScopedTask,
}

impl Countdown {
    /// Start ticking toward `target` every `period`. Must be called inside a
    /// Tokio runtime.
    pub fn start<Tz>(target: DateTime<Tz>, period: Duration) -> Self
    where
        Tz: TimeZone + Send + 'static,
        Tz::Offset: Send,
    {
        let (tx, rx) = watch::channel(tick(&chrono::Utc::now(), &target));
        let task = ScopedTask::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let remaining = tick(&chrono::Utc::now(), &target);
                if tx.send(remaining).is_err() {
                    break;
                }
            }
        });
        Self { rx, _task: task }
    }

    /// Most recently published value.
    pub fn current(&self) -> TimeRemaining {
        *self.rx.borrow()
    }

    /// A receiver that observes every publish.
    pub fn subscribe(&self) -> watch::Receiver<TimeRemaining> {
        self.rx.clone()
    }
}
