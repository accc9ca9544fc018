#![forbid(unsafe_code)]

//! Core domain model and business logic for the Trainer workout app.
//!
//! This crate provides:
//! - Domain types (workouts, steps, history, weights, profiles)
//! - The data gateway and identity provider seams, with local file backends
//! - The workout session controller and its timer
//! - Weight advice, history export and achievements

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod persist;
pub mod gateway;
pub mod auth;
pub mod prefs;
pub mod clock;
pub mod timer;
pub mod scope;
pub mod feedback;
pub mod media;
pub mod catalog;
pub mod profile;
pub mod advice;
pub mod weight;
pub mod history;
pub mod achievements;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use gateway::{DataGateway, FileGateway};
pub use auth::{IdentityProvider, IdentityWatch, LocalIdentityProvider};
pub use clock::{Clock, SystemClock};
pub use catalog::build_default_catalog;
pub use advice::{advise, Advice};
pub use history::{HistoryRow, HistorySort};
pub use session::{Completion, PauseToggle, SessionOptions, StepMove, WorkoutSession};
