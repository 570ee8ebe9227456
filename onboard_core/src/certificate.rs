//! Certificate eligibility and the data handed to the certificate renderer.
//!
//! Eligibility only counts work done: every catalog lesson complete and a
//! stored result for every catalog quiz. Quiz scores are reported but do
//! not gate the certificate.

use crate::gating::{completed_catalog_lessons, percent};
use crate::{Catalog, Error, LearnerProfile, QuizResult, Result, UserProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a learner stands against the certificate requirements
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequirements {
    pub lessons_completed: usize,
    pub total_lessons: usize,
    pub quizzes_completed: usize,
    pub total_quizzes: usize,
    pub average_quiz_percent: u8,
    pub can_issue: bool,
}

/// Aggregate quiz performance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total_quizzes: usize,
    pub quizzes_completed: usize,
    pub average_percent: u8,
    pub total_questions: u32,
    pub correct_answers: u32,
}

/// Everything the document renderer needs to print a certificate
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub certificate_id: Uuid,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub issued_date: DateTime<Utc>,
    pub total_study_minutes: u32,
    pub average_quiz_percent: u8,
    pub total_modules: usize,
    pub total_lessons: usize,
}

/// Stored results for quizzes the catalog still has
fn catalog_results<'a>(
    catalog: &'a Catalog,
    progress: &'a UserProgress,
) -> impl Iterator<Item = &'a QuizResult> + 'a {
    catalog
        .quizzes()
        .iter()
        .filter_map(move |q| progress.quiz_results.get(&q.id))
}

/// Mean of the catalog quiz percentages, rounded half-up
pub fn average_quiz_percent(catalog: &Catalog, progress: &UserProgress) -> u8 {
    let (count, sum) = catalog_results(catalog, progress)
        .fold((0usize, 0usize), |(count, sum), r| (count + 1, sum + r.percent as usize));
    if count == 0 {
        return 0;
    }
    // sum / count with the same half-up rule as `percent`, scaled back down
    ((2 * sum + count) / (2 * count)) as u8
}

/// Quiz results for quizzes the catalog still has
fn attempted_catalog_quizzes(catalog: &Catalog, progress: &UserProgress) -> usize {
    catalog_results(catalog, progress).count()
}

pub fn verify_certificate_requirements(
    catalog: &Catalog,
    progress: &UserProgress,
) -> CertificateRequirements {
    let lessons_completed = completed_catalog_lessons(catalog, progress);
    let total_lessons = catalog.total_lesson_count();
    let quizzes_completed = attempted_catalog_quizzes(catalog, progress);
    let total_quizzes = catalog.total_quiz_count();

    CertificateRequirements {
        lessons_completed,
        total_lessons,
        quizzes_completed,
        total_quizzes,
        average_quiz_percent: average_quiz_percent(catalog, progress),
        can_issue: lessons_completed >= total_lessons && quizzes_completed >= total_quizzes,
    }
}

pub fn quiz_stats(catalog: &Catalog, progress: &UserProgress) -> QuizStats {
    let (total_questions, correct_answers) = catalog_results(catalog, progress).fold(
        (0u32, 0u32),
        |(total, correct), r| {
            (
                total.saturating_add(r.total_count),
                correct.saturating_add(r.correct_count),
            )
        },
    );

    QuizStats {
        total_quizzes: catalog.total_quiz_count(),
        quizzes_completed: attempted_catalog_quizzes(catalog, progress),
        average_percent: average_quiz_percent(catalog, progress),
        total_questions,
        correct_answers,
    }
}

/// Build the renderer payload for an earned certificate
///
/// Fails with `Error::State` if the certificate has not been earned yet.
pub fn certificate_data(
    catalog: &Catalog,
    progress: &UserProgress,
    learner: &LearnerProfile,
) -> Result<CertificateData> {
    let (Some(issued_date), Some(certificate_id)) =
        (progress.certificate_earned_at, progress.certificate_id)
    else {
        return Err(Error::State("certificate has not been earned".into()));
    };

    Ok(CertificateData {
        certificate_id,
        user_name: learner.name.clone(),
        department: learner.department.clone(),
        issued_date,
        total_study_minutes: progress.study_minutes,
        average_quiz_percent: average_quiz_percent(catalog, progress),
        total_modules: catalog.total_module_count(),
        total_lessons: catalog.total_lesson_count(),
    })
}

/// Share of catalog quizzes attempted, for the progress screen
pub fn quiz_completion_percent(catalog: &Catalog, progress: &UserProgress) -> u8 {
    percent(
        attempted_catalog_quizzes(catalog, progress),
        catalog.total_quiz_count(),
    )
}
