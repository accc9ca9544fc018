//! Session timer.
//!
//! The displayed value is always recomputed from a wall-clock anchor rather
//! than accumulated tick by tick, so a stalled or jittery tick source never
//! makes the timer drift:
//! - count-up shows `now - anchor`
//! - countdown shows `total - (now - anchor)`, floored at zero
//!
//! States: `Idle -> Running <-> Paused -> Complete`. The completion signal is
//! emitted exactly once; only [`SessionTimer::reset`] leaves `Complete`.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// Countdowns longer than this are clamped (well beyond any workout)
const MAX_COUNTDOWN_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Whether the timer counts up (stopwatch) or down from a fixed total
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    CountUp,
    CountDown { total_seconds: u64 },
}

impl TimerMode {
    /// Countdown of `seconds`, or a stopwatch when `seconds` is zero
    pub fn from_countdown_seconds(seconds: u64) -> Self {
        if seconds == 0 {
            TimerMode::CountUp
        } else {
            TimerMode::CountDown {
                total_seconds: seconds,
            }
            .clamped()
        }
    }

    fn clamped(self) -> Self {
        match self {
            TimerMode::CountDown { total_seconds } => TimerMode::CountDown {
                total_seconds: total_seconds.min(MAX_COUNTDOWN_SECONDS),
            },
            mode => mode,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running { anchor: DateTime<Utc> },
    Paused { elapsed: Duration },
    Complete { elapsed: Duration },
}

/// Result of recomputing the timer at an instant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerTick {
    /// Value to render: elapsed (count-up) or remaining (countdown) seconds
    pub display_seconds: u64,
    pub elapsed_seconds: u64,
    /// True on the single tick that observes completion
    pub completed: bool,
}

#[derive(Clone, Debug)]
pub struct SessionTimer {
    mode: TimerMode,
    state: TimerState,
    completion_emitted: bool,
}

impl SessionTimer {
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode: mode.clamped(),
            state: TimerState::Idle,
            completion_emitted: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, TimerState::Complete { .. })
    }

    /// Anchor the timer at `anchor` and start running
    pub fn start(&mut self, anchor: DateTime<Utc>) -> Result<()> {
        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Running { anchor };
                tracing::debug!(mode = ?self.mode, %anchor, "Timer started");
                Ok(())
            }
            other => Err(Error::Timer(format!("cannot start from {:?}", other))),
        }
    }

    /// Recompute the display value at `now`
    pub fn tick(&mut self, now: DateTime<Utc>) -> TimerTick {
        if let TimerState::Running { anchor } = self.state {
            let elapsed = non_negative(now - anchor);
            if let Some(total) = self.total() {
                if elapsed >= total {
                    self.state = TimerState::Complete { elapsed: total };
                    tracing::info!("Countdown reached zero");
                }
            }
        }

        let completed = self.is_complete() && !self.completion_emitted;
        if completed {
            self.completion_emitted = true;
        }

        let elapsed = self.elapsed_at(now);
        TimerTick {
            display_seconds: self.display_for(elapsed),
            elapsed_seconds: seconds(elapsed),
            completed,
        }
    }

    /// Stop recomputation, remembering elapsed-so-far
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            TimerState::Running { .. } => {
                let elapsed = self.elapsed_at(now);
                self.state = match self.total() {
                    Some(total) if elapsed >= total => TimerState::Complete { elapsed: total },
                    _ => TimerState::Paused { elapsed },
                };
                tracing::debug!(elapsed = seconds(elapsed), "Timer paused");
                Ok(())
            }
            other => Err(Error::Timer(format!("cannot pause from {:?}", other))),
        }
    }

    /// Re-anchor at `now - elapsed_so_far` so the display continues seamlessly
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.state {
            TimerState::Paused { elapsed } => {
                self.state = TimerState::Running {
                    anchor: now - elapsed,
                };
                tracing::debug!(elapsed = seconds(elapsed), "Timer resumed");
                Ok(())
            }
            other => Err(Error::Timer(format!("cannot resume from {:?}", other))),
        }
    }

    /// External finish signal. Returns the elapsed seconds the first time
    /// completion is observed and `None` on every later call.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Option<u64>> {
        match self.state {
            TimerState::Idle => Err(Error::Timer("cannot finish a timer that never started".into())),
            TimerState::Running { .. } | TimerState::Paused { .. } => {
                let elapsed = self.elapsed_at(now);
                self.state = TimerState::Complete { elapsed };
                Ok(self.take_completion(elapsed))
            }
            TimerState::Complete { elapsed } => Ok(self.take_completion(elapsed)),
        }
    }

    /// Back to `Idle`; the next start takes a fresh anchor
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.completion_emitted = false;
    }

    /// Elapsed seconds at `now`
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        seconds(self.elapsed_at(now))
    }

    /// Display value at `now` without changing state
    pub fn display_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.display_for(self.elapsed_at(now))
    }

    fn take_completion(&mut self, elapsed: Duration) -> Option<u64> {
        if self.completion_emitted {
            None
        } else {
            self.completion_emitted = true;
            Some(seconds(elapsed))
        }
    }

    fn total(&self) -> Option<Duration> {
        match self.mode {
            TimerMode::CountUp => None,
            TimerMode::CountDown { total_seconds } => {
                Some(Duration::seconds(total_seconds as i64))
            }
        }
    }

    fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = match self.state {
            TimerState::Idle => Duration::zero(),
            TimerState::Running { anchor } => non_negative(now - anchor),
            TimerState::Paused { elapsed } | TimerState::Complete { elapsed } => elapsed,
        };
        match self.total() {
            Some(total) => elapsed.min(total),
            None => elapsed,
        }
    }

    fn display_for(&self, elapsed: Duration) -> u64 {
        match self.mode {
            TimerMode::CountUp => seconds(elapsed),
            TimerMode::CountDown { total_seconds } => {
                total_seconds.saturating_sub(seconds(elapsed))
            }
        }
    }
}

fn non_negative(d: Duration) -> Duration {
    d.max(Duration::zero())
}

fn seconds(d: Duration) -> u64 {
    d.num_seconds().max(0) as u64
}
