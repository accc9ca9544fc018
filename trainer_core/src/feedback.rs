//! Completion cues (sound/haptics).
//!
//! Cues are best-effort: callers log and ignore failures.

use crate::config::FeedbackConfig;
use crate::Result;
use std::io::Write;

pub trait FeedbackCue: Send + Sync {
    /// Signal that a workout session finished
    fn completion(&self) -> Result<()>;
}

/// Rings the terminal bell on stderr
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalBell;

impl FeedbackCue for TerminalBell {
    fn completion(&self) -> Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

/// Flashes the terminal (reverse video on, then off); the terminal's stand-in
/// for a haptic pulse
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalFlash;

impl FeedbackCue for TerminalFlash {
    fn completion(&self) -> Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x1b[?5h")?;
        stderr.flush()?;
        std::thread::sleep(std::time::Duration::from_millis(120));
        stderr.write_all(b"\x1b[?5l")?;
        stderr.flush()?;
        Ok(())
    }
}

/// No cue at all
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl FeedbackCue for Silent {
    fn completion(&self) -> Result<()> {
        Ok(())
    }
}

/// Several cues fired in order; every cue runs even if an earlier one fails
pub struct Combined(Vec<Box<dyn FeedbackCue>>);

impl FeedbackCue for Combined {
    fn completion(&self) -> Result<()> {
        let mut first_err = None;
        for cue in &self.0 {
            if let Err(e) = cue.completion() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueKind {
    Sound,
    Haptic,
}

/// Which cues the feedback settings allow
pub fn enabled_cues(config: &FeedbackConfig) -> Vec<CueKind> {
    let mut kinds = Vec::new();
    if config.sound {
        kinds.push(CueKind::Sound);
    }
    if config.haptics {
        kinds.push(CueKind::Haptic);
    }
    kinds
}

/// Pick the cue allowed by the feedback settings
pub fn cue_for(config: &FeedbackConfig) -> Box<dyn FeedbackCue> {
    let mut cues: Vec<Box<dyn FeedbackCue>> = enabled_cues(config)
        .into_iter()
        .map(|kind| -> Box<dyn FeedbackCue> {
            match kind {
                CueKind::Sound => Box::new(TerminalBell),
                CueKind::Haptic => Box::new(TerminalFlash),
            }
        })
        .collect();

    match cues.len() {
        0 => Box::new(Silent),
        1 => cues.remove(0),
        _ => Box::new(Combined(cues)),
    }
}
