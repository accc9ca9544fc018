//! Weight-based workout advice.
//!
//! Three fixed buckets keyed on the latest body weight (kg):
//! - below 50: low intensity
//! - 50 to 70 inclusive: medium intensity
//! - above 70: high intensity

use crate::gateway::{self, collections, DataGateway, Query};
use crate::{Error, Result, Workout};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Advice {
    pub intensity: Intensity,
    pub message: &'static str,
    /// Title used to look up the recommended workout
    pub workout_title: &'static str,
}

const LOW: Advice = Advice {
    intensity: Intensity::Low,
    message: "You might benefit from Yoga Flow and Strength Training. Intensity: Low",
    workout_title: "Yoga Flow",
};

const MEDIUM: Advice = Advice {
    intensity: Intensity::Medium,
    message: "Try Full Body Beginner or HIIT Blast. Intensity: Medium",
    workout_title: "Full Body Beginner",
};

const HIGH: Advice = Advice {
    intensity: Intensity::High,
    message: "HIIT Blast and Fat Burners are great options. Intensity: High",
    workout_title: "HIIT Blast",
};

/// Advice for a weight; `None` when the value is not a usable weight
pub fn advise(weight: f64) -> Option<Advice> {
    if !weight.is_finite() || weight <= 0.0 {
        return None;
    }
    let advice = if weight < 50.0 {
        LOW
    } else if weight <= 70.0 {
        MEDIUM
    } else {
        HIGH
    };
    Some(advice)
}

/// Find the workout whose title contains the advice's workout title
pub async fn find_recommended_workout<G>(gateway: &G, advice: &Advice) -> Result<Workout>
where
    G: DataGateway + ?Sized,
{
    let query = Query::new().ilike("title", format!("%{}%", advice.workout_title));
    gateway::maybe_single(gateway, collections::WORKOUTS, &query)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("no workout matching '{}'", advice.workout_title))
        })
}
