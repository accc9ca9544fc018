//! Badges earned from workout history.

use crate::history::HistoryRow;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

pub const STREAK_DAYS: usize = 5;
pub const CALORIE_GOAL: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Badge {
    FirstWorkout,
    FiveDayStreak,
    Burn1000,
}

impl Badge {
    pub const ALL: [Badge; 3] = [Badge::FirstWorkout, Badge::FiveDayStreak, Badge::Burn1000];

    pub fn title(&self) -> &'static str {
        match self {
            Badge::FirstWorkout => "First Workout",
            Badge::FiveDayStreak => "5-Day Streak",
            Badge::Burn1000 => "Burn 1000",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Badge::FirstWorkout => "Complete your first workout",
            Badge::FiveDayStreak => "Work out five days in a row",
            Badge::Burn1000 => "Burn 1000 calories in total",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Badges earned by the given history, in [`Badge::ALL`] order
pub fn earned(rows: &[HistoryRow]) -> Vec<Badge> {
    let mut badges = Vec::new();
    if !rows.is_empty() {
        badges.push(Badge::FirstWorkout);
    }
    if longest_streak(rows) >= STREAK_DAYS {
        badges.push(Badge::FiveDayStreak);
    }
    if total_calories(rows) >= CALORIE_GOAL {
        badges.push(Badge::Burn1000);
    }
    badges
}

/// Sum of planned calories over completed workouts that still exist
pub fn total_calories(rows: &[HistoryRow]) -> u64 {
    rows.iter()
        .filter_map(|r| r.workout.as_ref())
        .map(|w| u64::from(w.calories))
        .sum()
}

/// Longest run of consecutive UTC calendar days with a completion
pub fn longest_streak(rows: &[HistoryRow]) -> usize {
    let days: BTreeSet<NaiveDate> = rows
        .iter()
        .map(|r| r.entry.completed_at.date_naive())
        .collect();

    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        current = match previous {
            Some(p) if p.succ_opt() == Some(day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }
    longest
}
