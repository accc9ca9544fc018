//! Completed-session history: loading, sorting and CSV export.
//!
//! History rows are joined with their workout so the list and the export
//! can show the plan next to what the user actually did.

use crate::gateway::{self, collections, DataGateway, Filter, Query};
use crate::prefs::PreferenceStore;
use crate::{persist, Result, UserId, Workout, WorkoutHistoryEntry};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// Preference key holding the chosen sort column
pub const SORT_PREFERENCE_KEY: &str = "sort_preference";

/// Column the history list is ordered by, newest or longest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistorySort {
    #[default]
    CompletedAt,
    Duration,
}

impl HistorySort {
    pub fn column(&self) -> &'static str {
        match self {
            HistorySort::CompletedAt => "completed_at",
            HistorySort::Duration => "duration_seconds",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "completed_at" => Some(HistorySort::CompletedAt),
            "duration_seconds" => Some(HistorySort::Duration),
            _ => None,
        }
    }

    /// The stored preference; unknown or unreadable values fall back to date
    pub fn load(prefs: &dyn PreferenceStore) -> Self {
        match prefs.get(SORT_PREFERENCE_KEY) {
            Ok(Some(value)) => Self::from_column(&value).unwrap_or_else(|| {
                tracing::warn!("Unknown sort preference '{}', using date", value);
                HistorySort::default()
            }),
            Ok(None) => HistorySort::default(),
            Err(e) => {
                tracing::warn!("Failed to read sort preference: {}", e);
                HistorySort::default()
            }
        }
    }

    pub fn store(&self, prefs: &mut dyn PreferenceStore) -> Result<()> {
        prefs.set(SORT_PREFERENCE_KEY, self.column())
    }
}

/// A history entry with its workout, when the workout still exists
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryRow {
    pub entry: WorkoutHistoryEntry,
    pub workout: Option<Workout>,
}

impl HistoryRow {
    /// Session length in minutes, one decimal place
    pub fn session_minutes(&self) -> Option<f64> {
        self.entry
            .duration_seconds
            .map(|s| (s as f64 / 60.0 * 10.0).round() / 10.0)
    }
}

pub async fn load_history<G>(gateway: &G, user: &UserId, sort: HistorySort) -> Result<Vec<HistoryRow>>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new()
        .eq("user_id", user.as_str())
        .order(sort.column(), false);
    let entries: Vec<WorkoutHistoryEntry> =
        gateway::select_as(gateway, collections::WORKOUT_HISTORY, &query).await?;

    let workouts: HashMap<String, Workout> =
        gateway::select_as::<Workout, _>(gateway, collections::WORKOUTS, &Query::new())
            .await?
            .into_iter()
            .map(|w| (w.id.clone(), w))
            .collect();

    let rows: Vec<HistoryRow> = entries
        .into_iter()
        .map(|entry| HistoryRow {
            workout: workouts.get(&entry.workout_id).cloned(),
            entry,
        })
        .collect();

    tracing::debug!(user = %user, sort = sort.column(), "Loaded {} history rows", rows.len());
    Ok(rows)
}

/// Sort descending by the chosen column; rows without a duration go last
pub fn sort_entries(rows: &mut [HistoryRow], sort: HistorySort) {
    match sort {
        HistorySort::CompletedAt => {
            rows.sort_by(|a, b| b.entry.completed_at.cmp(&a.entry.completed_at))
        }
        HistorySort::Duration => rows.sort_by(|a, b| {
            match (a.entry.duration_seconds, b.entry.duration_seconds) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
    }
}

/// Delete every history entry of the user
pub async fn reset_history<G>(gateway: &G, user: &UserId) -> Result<usize>
where
    G: DataGateway + ?Sized,
{
    let deleted = gateway
        .delete(
            collections::WORKOUT_HISTORY,
            &[Filter::eq("user_id", user.as_str())],
        )
        .await?;
    tracing::info!(user = %user, "Deleted {} history entries", deleted);
    Ok(deleted)
}

// ============================================================================
// Presentation helpers
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Same,
}

/// Compare a value with the one from the next-older row
pub fn trend<T: PartialOrd>(current: Option<T>, previous: Option<T>) -> Option<Trend> {
    let (current, previous) = (current?, previous?);
    match current.partial_cmp(&previous)? {
        Ordering::Greater => Some(Trend::Up),
        Ordering::Less => Some(Trend::Down),
        Ordering::Equal => Some(Trend::Same),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionLabel {
    /// Session at least as long as the planned workout
    Intense,
    Short,
    /// No duration was recorded
    NotLogged,
}

pub fn session_label(row: &HistoryRow) -> SessionLabel {
    let Some(seconds) = row.entry.duration_seconds else {
        return SessionLabel::NotLogged;
    };
    match &row.workout {
        Some(w) if seconds as f64 / 60.0 >= w.duration as f64 => SessionLabel::Intense,
        _ => SessionLabel::Short,
    }
}

// ============================================================================
// CSV export
// ============================================================================

const NOT_RECORDED: &str = "--";

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Duration (min)")]
    duration: Option<u32>,
    #[serde(rename = "Calories")]
    calories: Option<u32>,
    #[serde(rename = "Session Time (min)")]
    session_time: String,
    #[serde(rename = "Weight (kg)")]
    weight: String,
    #[serde(rename = "Completed At")]
    completed_at: String,
}

impl From<&HistoryRow> for CsvRow {
    fn from(row: &HistoryRow) -> Self {
        let workout = row.workout.as_ref();
        CsvRow {
            title: workout.map(|w| w.title.clone()).unwrap_or_default(),
            kind: workout
                .and_then(|w| w.kind.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            duration: workout.map(|w| w.duration),
            calories: workout.map(|w| w.calories),
            session_time: row
                .session_minutes()
                .map(|m| format!("{:.1}", m))
                .unwrap_or_else(|| NOT_RECORDED.to_string()),
            weight: row
                .entry
                .weight
                .map(|w| w.to_string())
                .unwrap_or_else(|| NOT_RECORDED.to_string()),
            completed_at: row
                .entry
                .completed_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
        }
    }
}

/// Render the rows as CSV, header first, in the order given
pub fn export_csv(rows: &[HistoryRow]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // Written by hand so an empty export still carries the header
    writer.write_record([
        "Title",
        "Type",
        "Duration (min)",
        "Calories",
        "Session Time (min)",
        "Weight (kg)",
        "Completed At",
    ])?;
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| crate::Error::Other(format!("CSV is not UTF-8: {}", e)))
}

/// Write the CSV export to `path` atomically
pub fn write_export(rows: &[HistoryRow], path: &Path) -> Result<()> {
    let text = export_csv(rows)?;
    persist::write_atomic(path, |w| Ok(w.write_all(text.as_bytes())?))?;
    tracing::info!("Exported {} history rows to {:?}", rows.len(), path);
    Ok(())
}
