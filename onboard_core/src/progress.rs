//! Progress mutations applied to a learner's `UserProgress`.
//!
//! These are the only operations that change progress. Gating and quiz
//! scoring compute what should change; callers apply it here and then
//! persist the record through a [`crate::store::ProgressStore`].

use crate::gating;
use crate::{Catalog, Error, LessonRef, QuizResult, Result, UserProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Experience awarded for first-time completions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressRules {
    #[serde(default = "default_lesson_xp")]
    pub lesson_xp: u32,

    #[serde(default = "default_module_xp")]
    pub module_xp: u32,
}

impl Default for ProgressRules {
    fn default() -> Self {
        Self {
            lesson_xp: default_lesson_xp(),
            module_xp: default_module_xp(),
        }
    }
}

fn default_lesson_xp() -> u32 {
    10
}

fn default_module_xp() -> u32 {
    50
}

/// What happened when a learner finished a lesson
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonOutcome {
    /// False when the lesson was only reviewed
    pub lesson_newly_completed: bool,
    /// The lesson closed out its module just now
    pub module_completed: bool,
    /// Where to go next, if anywhere
    pub next: Option<LessonRef>,
}

impl UserProgress {
    /// Mark a lesson complete with the default experience rules
    pub fn complete_lesson(&mut self, lesson_id: &str, duration_minutes: u32) -> bool {
        self.complete_lesson_with(&ProgressRules::default(), lesson_id, duration_minutes)
    }

    /// Mark a lesson complete
    ///
    /// Idempotent: study time and experience are only credited the first
    /// time. Returns whether the record changed.
    pub fn complete_lesson_with(
        &mut self,
        rules: &ProgressRules,
        lesson_id: &str,
        duration_minutes: u32,
    ) -> bool {
        if !self.completed_lesson_ids.insert(lesson_id.to_string()) {
            tracing::debug!("Lesson {} already complete, not crediting again", lesson_id);
            return false;
        }

        self.study_minutes = self.study_minutes.saturating_add(duration_minutes);
        self.experience = self.experience.saturating_add(rules.lesson_xp);
        tracing::debug!(
            "Completed lesson {} (+{} min, +{} xp)",
            lesson_id,
            duration_minutes,
            rules.lesson_xp
        );
        true
    }

    /// Mark a module complete with the default experience rules
    pub fn complete_module(&mut self, catalog: &Catalog, module_id: &str) -> Result<bool> {
        self.complete_module_with(&ProgressRules::default(), catalog, module_id)
    }

    /// Mark a module complete
    ///
    /// Refuses with `ModuleNotEligible` unless every lesson of the module is
    /// already complete. Idempotent once accepted.
    pub fn complete_module_with(
        &mut self,
        rules: &ProgressRules,
        catalog: &Catalog,
        module_id: &str,
    ) -> Result<bool> {
        let module = catalog
            .module_by_id(module_id)
            .ok_or_else(|| Error::NotFound(format!("module '{}'", module_id)))?;

        let missing = module.lessons.len()
            - gating::completed_lessons_in_module(catalog, self, module_id);
        if missing > 0 {
            return Err(Error::ModuleNotEligible {
                module_id: module_id.to_string(),
                missing,
            });
        }

        if !self.completed_module_ids.insert(module_id.to_string()) {
            return Ok(false);
        }

        self.experience = self.experience.saturating_add(rules.module_xp);
        tracing::info!("Completed module {} (+{} xp)", module_id, rules.module_xp);
        Ok(true)
    }

    /// Store a quiz result, replacing any earlier attempt at the same quiz
    pub fn record_quiz_result(&mut self, result: QuizResult) {
        tracing::info!(
            "Recorded quiz {}: {}/{} ({}%)",
            result.quiz_id,
            result.correct_count,
            result.total_count,
            result.percent
        );
        self.quiz_results.insert(result.quiz_id.clone(), result);
    }

    /// Stamp the certificate as earned
    ///
    /// Does not check eligibility; see
    /// [`crate::certificate::verify_certificate_requirements`].
    pub fn earn_certificate(&mut self, now: DateTime<Utc>) -> bool {
        if self.certificate_earned_at.is_some() {
            return false;
        }
        self.certificate_earned_at = Some(now);
        self.certificate_id = Some(Uuid::new_v4());
        tracing::info!("Certificate earned at {}", now.to_rfc3339());
        true
    }

    /// Throw away all progress
    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::info!("Progress reset");
    }

    /// Remember where the learner is in the course
    pub fn set_current_position(&mut self, module_id: &str, lesson_id: &str, now: DateTime<Utc>) {
        self.current_module_id = Some(module_id.to_string());
        self.current_lesson_id = Some(lesson_id.to_string());
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access_at = Some(now);
    }

    /// Finish a lesson the way the lesson view does
    ///
    /// Rejects unknown and locked lessons, completes the lesson, completes
    /// its module when this was the last missing lesson and the module is
    /// unlocked, and records the learner's position.
    pub fn finish_lesson(
        &mut self,
        rules: &ProgressRules,
        catalog: &Catalog,
        module_id: &str,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LessonOutcome> {
        let lesson = catalog.lesson_by_id(module_id, lesson_id).ok_or_else(|| {
            Error::NotFound(format!("lesson '{}' in module '{}'", lesson_id, module_id))
        })?;

        if gating::is_module_locked(catalog, self, module_id)
            || gating::is_lesson_locked(catalog, self, module_id, lesson_id)
        {
            return Err(Error::LessonLocked {
                module_id: module_id.to_string(),
                lesson_id: lesson_id.to_string(),
            });
        }

        let lesson_newly_completed =
            self.complete_lesson_with(rules, lesson_id, lesson.duration_minutes);

        let module_completed = if gating::is_module_complete(catalog, self, module_id) {
            self.complete_module_with(rules, catalog, module_id)?
        } else {
            false
        };

        self.set_current_position(module_id, lesson_id, now);

        Ok(LessonOutcome {
            lesson_newly_completed,
            module_completed,
            next: catalog.next_lesson(module_id, lesson_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::two_module_catalog;

    fn result(quiz_id: &str, correct: u32, total: u32) -> QuizResult {
        QuizResult {
            quiz_id: quiz_id.into(),
            module_id: "A".into(),
            correct_count: correct,
            total_count: total,
            percent: gating::percent(correct as usize, total as usize),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_complete_lesson_is_idempotent() {
        let mut progress = UserProgress::default();

        assert!(progress.complete_lesson("a1", 10));
        let snapshot = progress.clone();
        assert!(!progress.complete_lesson("a1", 10));

        assert_eq!(progress, snapshot);
        assert_eq!(progress.completed_lesson_ids.len(), 1);
        assert_eq!(progress.study_minutes, 10);
        assert_eq!(progress.experience, 10);
    }

    #[test]
    fn test_complete_lesson_uses_rules() {
        let rules = ProgressRules {
            lesson_xp: 3,
            module_xp: 7,
        };
        let mut progress = UserProgress::default();
        progress.complete_lesson_with(&rules, "a1", 0);
        assert_eq!(progress.experience, 3);
        assert_eq!(progress.study_minutes, 0);
    }

    #[test]
    fn test_complete_module_requires_all_lessons() {
        let catalog = two_module_catalog();
        let mut progress = UserProgress::default();
        progress.complete_lesson("a1", 10);

        let err = progress.complete_module(&catalog, "A").unwrap_err();
        assert!(matches!(
            err,
            Error::ModuleNotEligible { ref module_id, missing: 1 } if module_id == "A"
        ));
        assert!(progress.completed_module_ids.is_empty());
    }

    #[test]
    fn test_complete_module_is_idempotent() {
        let catalog = two_module_catalog();
        let mut progress = UserProgress::default();
        progress.complete_lesson("a1", 10);
        progress.complete_lesson("a2", 15);

        assert!(progress.complete_module(&catalog, "A").unwrap());
        assert!(!progress.complete_module(&catalog, "A").unwrap());
        assert_eq!(progress.completed_module_ids.len(), 1);
        assert_eq!(progress.experience, 10 + 10 + 50);
    }

    #[test]
    fn test_complete_unknown_module() {
        let catalog = two_module_catalog();
        let mut progress = UserProgress::default();
        assert!(matches!(
            progress.complete_module(&catalog, "nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_record_quiz_result_upserts() {
        let mut progress = UserProgress::default();
        progress.record_quiz_result(result("quiz-a", 1, 2));
        let second = result("quiz-a", 2, 2);
        progress.record_quiz_result(second.clone());

        assert_eq!(progress.quiz_results.len(), 1);
        assert_eq!(progress.quiz_results["quiz-a"], second);
    }

    #[test]
    fn test_earn_certificate_once() {
        let mut progress = UserProgress::default();
        let first = Utc::now();
        assert!(progress.earn_certificate(first));
        let id = progress.certificate_id;
        assert!(id.is_some());

        assert!(!progress.earn_certificate(first + chrono::Duration::days(1)));
        assert_eq!(progress.certificate_earned_at, Some(first));
        assert_eq!(progress.certificate_id, id);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut progress = UserProgress::default();
        progress.complete_lesson("a1", 10);
        progress.record_quiz_result(result("quiz-a", 1, 2));
        progress.earn_certificate(Utc::now());

        progress.reset();
        assert_eq!(progress, UserProgress::default());
    }

    #[test]
    fn test_finish_lesson_completes_module_on_last_lesson() {
        let catalog = two_module_catalog();
        let rules = ProgressRules::default();
        let mut progress = UserProgress::default();
        let now = Utc::now();

        let first = progress
            .finish_lesson(&rules, &catalog, "A", "a1", now)
            .unwrap();
        assert!(first.lesson_newly_completed);
        assert!(!first.module_completed);
        assert_eq!(first.next, Some(LessonRef::new("A", "a2")));

        let second = progress
            .finish_lesson(&rules, &catalog, "A", "a2", now)
            .unwrap();
        assert!(second.module_completed);
        assert_eq!(second.next, Some(LessonRef::new("B", "b1")));
        assert!(progress.completed_module_ids.contains("A"));
        assert_eq!(progress.study_minutes, 25);
        assert_eq!(progress.current_lesson_id.as_deref(), Some("a2"));
        assert_eq!(progress.last_access_at, Some(now));
    }

    #[test]
    fn test_finish_lesson_review_does_not_double_count() {
        let catalog = two_module_catalog();
        let rules = ProgressRules::default();
        let mut progress = UserProgress::default();
        let now = Utc::now();

        progress.finish_lesson(&rules, &catalog, "A", "a1", now).unwrap();
        let review = progress
            .finish_lesson(&rules, &catalog, "A", "a1", now)
            .unwrap();
        assert!(!review.lesson_newly_completed);
        assert_eq!(progress.study_minutes, 10);
    }

    #[test]
    fn test_finish_lesson_rejects_locked() {
        let catalog = two_module_catalog();
        let rules = ProgressRules::default();
        let mut progress = UserProgress::default();
        let now = Utc::now();

        assert!(matches!(
            progress.finish_lesson(&rules, &catalog, "A", "a2", now),
            Err(Error::LessonLocked { .. })
        ));
        assert!(matches!(
            progress.finish_lesson(&rules, &catalog, "B", "b1", now),
            Err(Error::LessonLocked { .. })
        ));
        assert!(matches!(
            progress.finish_lesson(&rules, &catalog, "A", "b1", now),
            Err(Error::NotFound(_))
        ));
        assert!(progress.completed_lesson_ids.is_empty());
    }
}
