//! Workout session controller.
//!
//! Drives one workout from loading through its steps and the timer to a
//! recorded history entry:
//!
//! ```text
//! Loading -> Steps { cursor } -> Timer -> Complete
//! ```
//!
//! A workout without steps goes straight to the timer. Completion is
//! recorded at most once per session; a failed write leaves the session in
//! the timer phase so the caller can retry.

use crate::auth::IdentityWatch;
use crate::catalog;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::feedback::FeedbackCue;
use crate::gateway::{collections, to_row, DataGateway};
use crate::scope::ViewScope;
use crate::timer::{SessionTimer, TimerMode, TimerTick};
use crate::{Error, NewHistoryEntry, Result, Workout, WorkoutStep};
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub timer_mode: TimerMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            timer_mode: TimerMode::from_countdown_seconds(config.countdown_seconds),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Steps { cursor: usize },
    Timer,
    Complete,
}

/// Outcome of moving through the steps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMove {
    Moved { cursor: usize },
    /// Advanced past the last step; the timer is running
    EnteredTimer,
    /// Went back from the first step; the caller leaves the session view
    Exited,
}

/// Outcome of toggling pause on the timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseToggle {
    Paused,
    Resumed,
    /// The countdown had already reached zero; the caller should finish
    Completed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub history_id: String,
    pub workout_id: String,
    pub workout_title: String,
    /// Recorded session length
    pub duration_seconds: u64,
    /// Time spent in the step phase before the timer started
    pub engagement_seconds: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Recorded(SessionSummary),
    /// This session was already recorded; nothing was written
    AlreadyRecorded,
}

pub struct WorkoutSession<G: DataGateway, C: Clock> {
    gateway: G,
    clock: C,
    feedback: Box<dyn FeedbackCue>,
    identity: IdentityWatch,
    scope: ViewScope,
    options: SessionOptions,
    phase: Phase,
    workout: Option<Workout>,
    steps: Vec<WorkoutStep>,
    steps_started_at: Option<DateTime<Utc>>,
    engagement_seconds: u64,
    timer: SessionTimer,
    summary: Option<SessionSummary>,
}

impl<G: DataGateway, C: Clock> WorkoutSession<G, C> {
    pub fn new(
        gateway: G,
        clock: C,
        feedback: Box<dyn FeedbackCue>,
        identity: IdentityWatch,
        options: SessionOptions,
    ) -> Self {
        Self {
            gateway,
            clock,
            feedback,
            identity,
            scope: ViewScope::new(),
            options,
            phase: Phase::Loading,
            workout: None,
            steps: Vec::new(),
            steps_started_at: None,
            engagement_seconds: 0,
            timer: SessionTimer::new(options.timer_mode),
            summary: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.workout.as_ref()
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&WorkoutStep> {
        match self.phase {
            Phase::Steps { cursor } => self.steps.get(cursor),
            _ => None,
        }
    }

    pub fn engagement_seconds(&self) -> u64 {
        self.engagement_seconds
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    /// The scope that pending loads are tied to
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Drop any pending load; its result is discarded when it arrives
    pub fn cancel(&self) {
        self.scope.close();
    }

    /// Fetch the workout and its steps and enter the step phase
    pub async fn load_workout(&mut self, workout_id: &str) -> Result<()> {
        self.phase = Phase::Loading;
        self.workout = None;
        self.steps.clear();
        self.timer = SessionTimer::new(self.options.timer_mode);
        self.engagement_seconds = 0;
        self.steps_started_at = None;
        self.summary = None;

        let gateway = &self.gateway;
        let (workout, steps) = self
            .scope
            .run(async {
                let workout = catalog::get_workout(gateway, workout_id).await?;
                let steps = catalog::load_steps(gateway, workout_id).await?;
                Ok::<_, Error>((workout, steps))
            })
            .await
            .ok_or(Error::Cancelled)??;

        tracing::info!(
            workout = %workout.id,
            steps = steps.len(),
            "Loaded workout '{}'",
            workout.title
        );
        self.workout = Some(workout);
        self.steps = steps;

        let now = self.clock.now();
        if self.steps.is_empty() {
            self.enter_timer(now, 0)?;
        } else {
            self.steps_started_at = Some(now);
            self.phase = Phase::Steps { cursor: 0 };
        }
        Ok(())
    }

    pub fn advance_step(&mut self) -> Result<StepMove> {
        let Phase::Steps { cursor } = self.phase else {
            return Err(self.wrong_phase("advance a step"));
        };

        if cursor + 1 < self.steps.len() {
            self.phase = Phase::Steps { cursor: cursor + 1 };
            return Ok(StepMove::Moved { cursor: cursor + 1 });
        }

        let now = self.clock.now();
        let engagement = self
            .steps_started_at
            .map(|start| (now - start).num_seconds().max(0) as u64)
            .unwrap_or(0);
        self.enter_timer(now, engagement)?;
        Ok(StepMove::EnteredTimer)
    }

    pub fn retreat_step(&mut self) -> Result<StepMove> {
        let Phase::Steps { cursor } = self.phase else {
            return Err(self.wrong_phase("go back a step"));
        };

        if cursor == 0 {
            return Ok(StepMove::Exited);
        }
        self.phase = Phase::Steps { cursor: cursor - 1 };
        Ok(StepMove::Moved { cursor: cursor - 1 })
    }

    pub fn tick(&mut self) -> Result<TimerTick> {
        self.require_timer("tick")?;
        Ok(self.timer.tick(self.clock.now()))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.require_timer("pause")?;
        self.timer.pause(self.clock.now())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.require_timer("resume")?;
        self.timer.resume(self.clock.now())
    }

    /// Pause a running timer or resume a paused one. A countdown that ran
    /// out between ticks reports `Completed` instead of failing.
    pub fn toggle_pause(&mut self) -> Result<PauseToggle> {
        self.require_timer("pause")?;
        if self.timer.is_complete() {
            return Ok(PauseToggle::Completed);
        }
        if self.timer.is_running() {
            self.timer.pause(self.clock.now())?;
            if self.timer.is_complete() {
                return Ok(PauseToggle::Completed);
            }
            Ok(PauseToggle::Paused)
        } else {
            self.timer.resume(self.clock.now())?;
            Ok(PauseToggle::Resumed)
        }
    }

    /// Stop the timer early (or end a stopwatch). Returns the elapsed
    /// seconds the first time and `None` afterwards.
    pub fn finish_timer(&mut self) -> Result<Option<u64>> {
        self.require_timer("finish the timer")?;
        self.timer.finish(self.clock.now())
    }

    /// Record the finished session as one history entry
    pub async fn complete_session(&mut self, duration_seconds: u64) -> Result<Completion> {
        if self.summary.is_some() {
            tracing::debug!("Session already recorded, ignoring repeat completion");
            return Ok(Completion::AlreadyRecorded);
        }

        let identity = self.identity.borrow().clone().ok_or(Error::NoIdentity)?;
        let workout = self.workout.as_ref().ok_or(Error::NoWorkout)?;

        let completed_at = self.clock.now();
        let entry = NewHistoryEntry {
            user_id: identity.user_id.clone(),
            workout_id: workout.id.clone(),
            completed_at,
            duration_seconds,
        };

        let row = match self
            .gateway
            .insert(collections::WORKOUT_HISTORY, to_row(&entry)?)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(workout = %workout.id, "Failed to record session: {}", e);
                return Err(e);
            }
        };

        let summary = SessionSummary {
            history_id: row
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            workout_id: workout.id.clone(),
            workout_title: workout.title.clone(),
            duration_seconds,
            engagement_seconds: self.engagement_seconds,
            completed_at,
        };

        if !self.timer.is_complete() && self.timer.finish(completed_at).is_err() {
            // Completed from the step phase, the timer never ran
            tracing::debug!("Session completed without a running timer");
        }
        self.phase = Phase::Complete;
        self.summary = Some(summary.clone());

        tracing::info!(
            user = %identity.user_id,
            workout = %summary.workout_id,
            duration_seconds,
            "Workout session recorded"
        );

        if let Err(e) = self.feedback.completion() {
            tracing::warn!("Completion cue failed: {}", e);
        }

        Ok(Completion::Recorded(summary))
    }

    /// The recorded summary, once the session is complete
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    fn enter_timer(&mut self, now: DateTime<Utc>, engagement_seconds: u64) -> Result<()> {
        self.engagement_seconds = engagement_seconds;
        self.timer.start(now)?;
        self.phase = Phase::Timer;
        tracing::info!(engagement_seconds, "Entered timer phase");
        Ok(())
    }

    fn require_timer(&self, action: &str) -> Result<()> {
        match self.phase {
            Phase::Timer => Ok(()),
            _ => Err(self.wrong_phase(action)),
        }
    }

    fn wrong_phase(&self, action: &str) -> Error {
        match self.phase {
            Phase::Loading => Error::NoWorkout,
            phase => Error::Other(format!("cannot {} during {:?}", action, phase)),
        }
    }
}
