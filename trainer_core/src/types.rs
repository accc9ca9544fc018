//! Core domain types for the trainer system.
//!
//! These mirror the records held by the data store:
//! - Users, identities and profiles
//! - Workouts and their ordered steps
//! - Completed-session history and weight measurements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identity Types
// ============================================================================

/// Opaque user identifier issued by the identity provider
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// A signed-in user. Fixed for the lifetime of one sign-in session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

/// Per-user profile, one row per user keyed by the user id
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub age: u32,
    pub weight: f64,
}

// ============================================================================
// Workout Types
// ============================================================================

/// A workout definition. Seeded externally and read-only for the client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Planned duration in minutes
    pub duration: u32,
    pub calories: u32,
    /// Free-form type label ("HIIT", "Yoga", ...)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// One step of a workout. Steps are ordered by `step_number` ascending.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutStep {
    pub id: String,
    pub workout_id: String,
    pub step_number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Suggested hold/work time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

// ============================================================================
// History and Measurement Types
// ============================================================================

/// One completed workout session. Append-only from the client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutHistoryEntry {
    pub id: String,
    pub user_id: UserId,
    pub workout_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Insert payload for a history entry (the store assigns the id)
#[derive(Clone, Debug, Serialize)]
pub struct NewHistoryEntry {
    pub user_id: UserId,
    pub workout_id: String,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
}

/// A body-weight measurement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    pub id: String,
    pub user_id: UserId,
    pub weight: f64,
    pub recorded_at: DateTime<Utc>,
}
