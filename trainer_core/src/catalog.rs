//! Workout catalog.
//!
//! Workouts and their steps are read-only for the client. This module
//! queries them through the gateway and also carries the built-in seed
//! catalog that the CLI loads into an empty local store.

use crate::gateway::{self, collections, to_row, DataGateway, Query};
use crate::{Error, Result, Workout, WorkoutStep};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Workouts keyed by id, with their steps keyed by workout id
#[derive(Clone, Debug)]
pub struct Catalog {
    pub workouts: HashMap<String, Workout>,
    pub steps: HashMap<String, Vec<WorkoutStep>>,
}

/// Cached default catalog - built once and reused
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

// ============================================================================
// Gateway queries
// ============================================================================

/// All workouts, newest first, keeping the first workout for each title
pub async fn list_workouts<G>(gateway: &G) -> Result<Vec<Workout>>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new().order("created_at", false);
    let workouts: Vec<Workout> = gateway::select_as(gateway, collections::WORKOUTS, &query).await?;

    let mut seen = HashSet::new();
    let unique: Vec<Workout> = workouts
        .into_iter()
        .filter(|w| seen.insert(w.title.clone()))
        .collect();

    tracing::debug!("Listed {} workouts", unique.len());
    Ok(unique)
}

pub async fn get_workout<G>(gateway: &G, workout_id: &str) -> Result<Workout>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new().eq("id", workout_id);
    gateway::maybe_single(gateway, collections::WORKOUTS, &query)
        .await?
        .ok_or_else(|| Error::NotFound(format!("workout {}", workout_id)))
}

/// Steps of a workout in ascending step order
pub async fn load_steps<G>(gateway: &G, workout_id: &str) -> Result<Vec<WorkoutStep>>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new()
        .eq("workout_id", workout_id)
        .order("step_number", true);
    gateway::select_as(gateway, collections::WORKOUT_STEPS, &query).await
}

/// Write a catalog into the store, replacing rows with the same ids
pub async fn seed<G>(gateway: &G, catalog: &Catalog) -> Result<usize>
where
    G: DataGateway + ?Sized,
{
    let errors = catalog.validate();
    if !errors.is_empty() {
        return Err(Error::InvalidInput(format!(
            "catalog is invalid: {}",
            errors.join("; ")
        )));
    }

    let mut workouts: Vec<&Workout> = catalog.workouts.values().collect();
    workouts.sort_by(|a, b| a.id.cmp(&b.id));

    for workout in &workouts {
        gateway
            .upsert(collections::WORKOUTS, to_row(workout)?)
            .await?;
        for step in catalog.steps.get(&workout.id).into_iter().flatten() {
            gateway
                .upsert(collections::WORKOUT_STEPS, to_row(step)?)
                .await?;
        }
    }

    tracing::info!("Seeded {} workouts", workouts.len());
    Ok(workouts.len())
}

// ============================================================================
// Built-in catalog
// ============================================================================

const VIDEO_BASE: &str = "https://videos.trainer.example";

fn seeded_at(day: i64) -> DateTime<Utc> {
    // 2025-01-01T00:00:00Z plus `day` days
    DateTime::from_timestamp(1_735_689_600 + day * 86_400, 0).unwrap_or_default()
}

struct StepTemplate {
    name: &'static str,
    description: &'static str,
    duration: Option<u32>,
    reps: Option<u32>,
    video: Option<&'static str>,
}

const fn timed(name: &'static str, description: &'static str, seconds: u32, video: Option<&'static str>) -> StepTemplate {
    StepTemplate {
        name,
        description,
        duration: Some(seconds),
        reps: None,
        video,
    }
}

const fn counted(name: &'static str, description: &'static str, reps: u32, video: Option<&'static str>) -> StepTemplate {
    StepTemplate {
        name,
        description,
        duration: None,
        reps: Some(reps),
        video,
    }
}

fn add_workout(
    catalog: &mut Catalog,
    workout: Workout,
    steps: &[StepTemplate],
) {
    let workout_steps = steps
        .iter()
        .enumerate()
        .map(|(i, template)| WorkoutStep {
            id: format!("{}-step-{}", workout.id, i + 1),
            workout_id: workout.id.clone(),
            step_number: i as u32 + 1,
            name: template.name.into(),
            description: Some(template.description.into()),
            duration: template.duration,
            reps: template.reps,
            video_url: template.video.map(|v| format!("{}/{}", VIDEO_BASE, v)),
        })
        .collect();

    catalog.steps.insert(workout.id.clone(), workout_steps);
    catalog.workouts.insert(workout.id.clone(), workout);
}

/// Builds the built-in catalog
///
/// **Note**: prefer `get_default_catalog()`, which returns a cached
/// reference. This function is kept for tests and custom catalogs.
pub fn build_default_catalog() -> Catalog {
    let mut catalog = Catalog {
        workouts: HashMap::new(),
        steps: HashMap::new(),
    };

    add_workout(
        &mut catalog,
        Workout {
            id: "yoga-flow".into(),
            title: "Yoga Flow".into(),
            description: "Gentle flow for mobility and balance.".into(),
            duration: 20,
            calories: 120,
            kind: Some("Yoga".into()),
            created_at: seeded_at(0),
        },
        &[
            timed("Child's Pose", "Sink the hips back and breathe.", 60, Some("childs-pose")),
            timed("Cat-Cow", "Alternate arching and rounding the spine.", 60, Some("cat-cow")),
            timed("Downward Dog", "Press the heels toward the floor.", 45, None),
            timed("Warrior II", "Hold each side, arms long.", 60, Some("warrior-two")),
        ],
    );

    add_workout(
        &mut catalog,
        Workout {
            id: "strength-training".into(),
            title: "Strength Training".into(),
            description: "Bodyweight basics for building strength.".into(),
            duration: 30,
            calories: 220,
            kind: Some("Strength".into()),
            created_at: seeded_at(1),
        },
        &[
            counted("Squats", "Feet shoulder width, sit back.", 15, Some("squat")),
            counted("Push-ups", "Knees down if needed.", 10, Some("push-up")),
            counted("Glute Bridges", "Squeeze at the top.", 15, None),
            timed("Plank", "Straight line from head to heels.", 45, Some("plank")),
        ],
    );

    add_workout(
        &mut catalog,
        Workout {
            id: "full-body-beginner".into(),
            title: "Full Body Beginner".into(),
            description: "A friendly full-body circuit.".into(),
            duration: 25,
            calories: 200,
            kind: Some("Circuit".into()),
            created_at: seeded_at(2),
        },
        &[
            timed("Jumping Jacks", "Warm up at an easy pace.", 60, Some("jumping-jacks")),
            counted("Bodyweight Squats", "Controlled tempo.", 12, Some("squat")),
            counted("Incline Push-ups", "Hands on a bench or wall.", 10, None),
            counted("Reverse Lunges", "Alternate legs.", 10, Some("reverse-lunge")),
            timed("Cool Down Walk", "Bring the heart rate down.", 120, None),
        ],
    );

    add_workout(
        &mut catalog,
        Workout {
            id: "hiit-blast".into(),
            title: "HIIT Blast".into(),
            description: "Short, hard intervals.".into(),
            duration: 15,
            calories: 250,
            kind: Some("HIIT".into()),
            created_at: seeded_at(3),
        },
        &[
            timed("High Knees", "Drive the knees up fast.", 30, Some("high-knees")),
            counted("Burpees", "Full extension at the top.", 10, Some("burpee")),
            timed("Mountain Climbers", "Keep the hips low.", 30, Some("mountain-climbers")),
            counted("Jump Squats", "Land softly.", 12, None),
        ],
    );

    add_workout(
        &mut catalog,
        Workout {
            id: "fat-burners".into(),
            title: "Fat Burners".into(),
            description: "Steady cardio to keep the burn going.".into(),
            duration: 30,
            calories: 320,
            kind: Some("HIIT".into()),
            created_at: seeded_at(4),
        },
        &[
            timed("Skater Hops", "Side to side, stay light.", 45, Some("skater-hops")),
            timed("Butt Kicks", "Quick feet.", 45, None),
            counted("Squat Thrusts", "Kick back, snap in.", 12, Some("squat-thrust")),
        ],
    );

    catalog
}

impl Catalog {
    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, workout) in &self.workouts {
            if id != &workout.id {
                errors.push(format!(
                    "Workout key '{}' doesn't match workout id '{}'",
                    id, workout.id
                ));
            }
            if workout.title.trim().is_empty() {
                errors.push(format!("Workout '{}' has empty title", id));
            }
            if workout.duration == 0 {
                errors.push(format!("Workout '{}' has zero duration", id));
            }
        }

        let mut step_ids = HashSet::new();
        for (workout_id, steps) in &self.steps {
            if !self.workouts.contains_key(workout_id) {
                errors.push(format!(
                    "Steps reference non-existent workout '{}'",
                    workout_id
                ));
            }

            let mut numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
            numbers.sort_unstable();
            let contiguous = numbers
                .iter()
                .enumerate()
                .all(|(i, n)| *n == i as u32 + 1);
            if !contiguous {
                errors.push(format!(
                    "Workout '{}' step numbers are not contiguous from 1: {:?}",
                    workout_id, numbers
                ));
            }

            for step in steps {
                if &step.workout_id != workout_id {
                    errors.push(format!(
                        "Step '{}' is filed under '{}' but belongs to '{}'",
                        step.id, workout_id, step.workout_id
                    ));
                }
                if !step_ids.insert(step.id.as_str()) {
                    errors.push(format!("Duplicate step id '{}'", step.id));
                }
            }
        }

        errors
    }
}
