//! Core domain types for the Onboard training system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Modules, lessons and their content blocks
//! - Quizzes and glossary terms
//! - Per-user progress and quiz results
//! - Derived views (module status, dashboard statistics)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ============================================================================
// Content Types
// ============================================================================

/// Visual tone of a highlighted block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HighlightTone {
    Green,
    Blue,
    Amber,
}

/// A piece of lesson content, passed through untouched to the renderer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        body: String,
    },
    Highlight {
        body: String,
        tone: HighlightTone,
    },
    Important {
        body: String,
    },
    Definition {
        term: String,
        explanation: String,
    },
    List {
        title: String,
        items: Vec<String>,
    },
    Example {
        title: String,
        body: String,
    },
}

/// An atomic, completable unit of content inside a module
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A top-level training unit: an ordered list of lessons
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: u32,
    pub lessons: Vec<Lesson>,
}

impl Module {
    /// Position of a lesson within this module
    pub fn lesson_position(&self, lesson_id: &str) -> Option<usize> {
        self.lessons.iter().position(|l| l.id == lesson_id)
    }
}

/// A multiple-choice question
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
    #[serde(default)]
    pub reference: Option<String>,
}

/// The end-of-module quiz
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub module_id: String,
    #[serde(default)]
    pub title: String,
    pub questions: Vec<Question>,
}

/// A glossary entry tied to the module that introduces it
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub acronym: Option<String>,
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
    pub module_id: String,
}

/// Address of a lesson inside the catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRef {
    pub module_id: String,
    pub lesson_id: String,
}

impl LessonRef {
    pub fn new(module_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            lesson_id: lesson_id.into(),
        }
    }
}

// ============================================================================
// Progress Types
// ============================================================================

/// Outcome of one finished quiz attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    pub module_id: String,
    pub correct_count: u32,
    pub total_count: u32,
    pub percent: u8,
    pub completed_at: DateTime<Utc>,
}

/// Everything we know about one learner's progress.
///
/// Every field is defaulted on deserialization so records written by older
/// versions load with empty collections and zero counters.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProgress {
    pub completed_lesson_ids: BTreeSet<String>,
    pub completed_module_ids: BTreeSet<String>,
    pub quiz_results: BTreeMap<String, QuizResult>,
    pub study_minutes: u32,
    pub experience: u32,
    pub certificate_earned_at: Option<DateTime<Utc>>,
    pub certificate_id: Option<Uuid>,
    pub current_module_id: Option<String>,
    pub current_lesson_id: Option<String>,
    pub last_access_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Derived Views
// ============================================================================

/// Display status of a module for one learner
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Locked,
    InProgress,
    Complete,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Locked => "locked",
            ModuleStatus::InProgress => "in_progress",
            ModuleStatus::Complete => "complete",
        }
    }
}

/// Headline numbers for a learner's dashboard
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overall_percent: u8,
    pub modules_completed: usize,
    pub lessons_completed: usize,
    pub study_minutes: u32,
    pub total_modules: usize,
    pub total_lessons: usize,
}

/// Who the certificate is issued to (resolved by the auth layer)
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LearnerProfile {
    pub name: String,
    pub department: Option<String>,
}
