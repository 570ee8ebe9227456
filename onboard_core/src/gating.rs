//! Gating engine: lock state, completion percentages and module status.
//!
//! Every function here is a pure read over a catalog and a progress
//! snapshot. Nothing in this module mutates `UserProgress`.
//!
//! ## Unlock rules
//!
//! 1. **Modules** unlock linearly by `order`: order 1 is always open,
//!    order k opens once module k-1 is marked complete.
//! 2. **Lessons** unlock linearly inside their module: the first lesson is
//!    always open, lesson i opens once lesson i-1 is complete.
//! 3. A lesson that is already complete stays open for review.

use crate::{Catalog, DashboardStats, LessonRef, ModuleStatus, UserProgress};

/// Integer percentage of `part / whole`, rounded half-up
///
/// Returns 0 when `whole` is 0 and never exceeds 100.
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u8
}

/// Is this module gated behind its predecessor?
///
/// Unknown modules are never reported locked; callers render them as
/// "not found" instead.
pub fn is_module_locked(catalog: &Catalog, progress: &UserProgress, module_id: &str) -> bool {
    let Some(module) = catalog.module_by_id(module_id) else {
        return false;
    };
    if module.order <= 1 {
        return false;
    }

    match catalog.module_by_order(module.order - 1) {
        Some(previous) => !progress.completed_module_ids.contains(&previous.id),
        None => false,
    }
}

/// Is this lesson gated behind the previous lesson of its module?
///
/// A lesson in an unknown module is locked. An unknown lesson in a known
/// module is not.
pub fn is_lesson_locked(
    catalog: &Catalog,
    progress: &UserProgress,
    module_id: &str,
    lesson_id: &str,
) -> bool {
    let Some(module) = catalog.module_by_id(module_id) else {
        return true;
    };
    if progress.completed_lesson_ids.contains(lesson_id) {
        return false;
    }

    match module.lesson_position(lesson_id) {
        None | Some(0) => false,
        Some(index) => {
            let previous = &module.lessons[index - 1];
            !progress.completed_lesson_ids.contains(&previous.id)
        }
    }
}

/// Does the learner have every lesson of this module?
pub fn is_module_complete(catalog: &Catalog, progress: &UserProgress, module_id: &str) -> bool {
    catalog.module_by_id(module_id).is_some_and(|m| {
        m.lessons
            .iter()
            .all(|l| progress.completed_lesson_ids.contains(&l.id))
    })
}

/// Number of lessons of a module the learner has completed
pub fn completed_lessons_in_module(
    catalog: &Catalog,
    progress: &UserProgress,
    module_id: &str,
) -> usize {
    catalog.module_by_id(module_id).map_or(0, |m| {
        m.lessons
            .iter()
            .filter(|l| progress.completed_lesson_ids.contains(&l.id))
            .count()
    })
}

pub fn module_progress_percent(catalog: &Catalog, progress: &UserProgress, module_id: &str) -> u8 {
    let total = catalog.module_by_id(module_id).map_or(0, |m| m.lessons.len());
    percent(
        completed_lessons_in_module(catalog, progress, module_id),
        total,
    )
}

/// Completed lessons that still exist in the catalog
pub fn completed_catalog_lessons(catalog: &Catalog, progress: &UserProgress) -> usize {
    progress
        .completed_lesson_ids
        .iter()
        .filter(|id| catalog.contains_lesson(id))
        .count()
}

pub fn overall_progress_percent(catalog: &Catalog, progress: &UserProgress) -> u8 {
    percent(
        completed_catalog_lessons(catalog, progress),
        catalog.total_lesson_count(),
    )
}

/// First incomplete lesson of the first unlocked module that has one
pub fn next_incomplete_lesson(catalog: &Catalog, progress: &UserProgress) -> Option<LessonRef> {
    catalog
        .modules()
        .iter()
        .filter(|m| !is_module_locked(catalog, progress, &m.id))
        .find_map(|m| {
            m.lessons
                .iter()
                .find(|l| !progress.completed_lesson_ids.contains(&l.id))
                .map(|l| LessonRef::new(&m.id, &l.id))
        })
}

/// Display status of a module
///
/// An unlocked module that is not marked complete is `InProgress` even if
/// no lesson has been started.
pub fn module_status(catalog: &Catalog, progress: &UserProgress, module_id: &str) -> ModuleStatus {
    if catalog.module_by_id(module_id).is_none() || is_module_locked(catalog, progress, module_id) {
        return ModuleStatus::Locked;
    }
    if progress.completed_module_ids.contains(module_id) {
        return ModuleStatus::Complete;
    }
    ModuleStatus::InProgress
}

pub fn dashboard_stats(catalog: &Catalog, progress: &UserProgress) -> DashboardStats {
    let modules_completed = catalog
        .modules()
        .iter()
        .filter(|m| progress.completed_module_ids.contains(&m.id))
        .count();

    DashboardStats {
        overall_percent: overall_progress_percent(catalog, progress),
        modules_completed,
        lessons_completed: completed_catalog_lessons(catalog, progress),
        study_minutes: progress.study_minutes,
        total_modules: catalog.total_module_count(),
        total_lessons: catalog.total_lesson_count(),
    }
}
