//! Time sources for the turn daemon.
//!
//! Turn times are naive local wall-clock times: the tick grid is anchored
//! to local 01:00, and the game never reasons about time zones. The daemon
//! only talks to time through [`Clock`], so tests can swap in a
//! [`SimulatedClock`] that follows tokio's (pausable) timer.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};

/// A source of the current time plus a suspend primitive.
pub trait Clock: Send + Sync {
    /// The current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Suspend the caller for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production clock backed by the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Deterministic clock: a fixed origin plus elapsed tokio time.
///
/// Under `#[tokio::test(start_paused = true)]` tokio's clock only moves when
/// every task is idle (auto-advance) or when a test calls
/// `tokio::time::advance`, so `now()` and `sleep()` stay in lockstep without
/// any real waiting.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedClock {
    origin: NaiveDateTime,
    started: tokio::time::Instant,
}

impl SimulatedClock {
    /// Start a clock that reads `origin` right now.
    pub fn starting_at(origin: NaiveDateTime) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.origin
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// How long from `now` until `target`, or `None` if `target` is not in the
/// future.
pub fn duration_until(now: NaiveDateTime, target: NaiveDateTime) -> Option<Duration> {
    let remaining = target.signed_duration_since(now);
    if remaining <= TimeDelta::zero() {
        return None;
    }
    remaining.to_std().ok()
}
