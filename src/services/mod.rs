//! Load → mutate → save operations.
//!
//! Each function loads the entities it needs from a [`DocumentStore`], runs
//! the rules from [`crate::domain`] and persists the result. A concurrent
//! writer that saved first makes the save fail with
//! [`crate::errors::AppError::StaleWrite`]; callers may reload and retry.

pub mod classes;
pub mod contracts;
pub mod evaluations;
pub mod lessons;
pub mod payments;
pub mod plans;
pub mod students;
pub mod teachers;
pub mod users;

use chrono::{DateTime, NaiveDate, Utc};

/// The instant a service operation runs at. Tests pin it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub now: DateTime<Utc>,
}

impl Clock {
    pub fn system() -> Self {
        Self { now: Utc::now() }
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
