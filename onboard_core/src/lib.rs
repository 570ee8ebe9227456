#![forbid(unsafe_code)]

//! Core domain model and business logic for the Onboard training system.
//!
//! This crate provides:
//! - Domain types (modules, lessons, quizzes, learner progress)
//! - Content catalog loading and validation
//! - Gating engine (lock state, percentages, module status)
//! - Quiz engine (attempt-limited sessions and scoring)
//! - Certificate eligibility and export data
//! - Persistence (per-user progress store, CSV reports)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod gating;
pub mod progress;
pub mod quiz;
pub mod certificate;
pub mod store;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{default_catalog, format_minutes, load_catalog, Catalog};
pub use config::Config;
pub use progress::{LessonOutcome, ProgressRules};
pub use quiz::{QuizRules, QuizSession, Selection, SessionState};
pub use certificate::{verify_certificate_requirements, CertificateData, CertificateRequirements};
pub use store::{FileProgressStore, MemoryProgressStore, ProgressStore};
