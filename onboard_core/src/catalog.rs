//! Content catalog of modules, lessons, quizzes and glossary terms.
//!
//! The catalog is parsed and validated once at startup and is read-only
//! afterwards. Lookups never fail: unknown IDs come back as `None`.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Catalog document shipped with the binary
const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

/// Cached default catalog - parsed once and reused across all operations
static DEFAULT_CATALOG: OnceCell<Catalog> = OnceCell::new();

/// Every question carries exactly this many options
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Get a reference to the cached default catalog
///
/// The embedded document is parsed and validated on first use only.
pub fn default_catalog() -> Result<&'static Catalog> {
    DEFAULT_CATALOG.get_or_try_init(|| load_catalog(EMBEDDED_CATALOG))
}

/// Parse and validate a catalog document
pub fn load_catalog(document: &str) -> Result<Catalog> {
    let doc: CatalogDocument = serde_json::from_str(document)?;
    Catalog::from_document(doc)
}

/// On-disk shape of the catalog
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub modules: Vec<Module>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub glossary_terms: Vec<GlossaryTerm>,
}

impl CatalogDocument {
    /// Validate the document for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut orders: Vec<u32> = self.modules.iter().map(|m| m.order).collect();
        orders.sort_unstable();
        let contiguous = orders
            .iter()
            .enumerate()
            .all(|(i, order)| *order as usize == i + 1);
        if !contiguous {
            errors.push(format!(
                "Module order values must be exactly 1..={}, found {:?}",
                self.modules.len(),
                orders
            ));
        }

        let mut module_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();
        for module in &self.modules {
            if module.id.is_empty() {
                errors.push("Module has empty ID".to_string());
            }
            if !module_ids.insert(module.id.as_str()) {
                errors.push(format!("Duplicate module ID '{}'", module.id));
            }
            for lesson in &module.lessons {
                if lesson.id.is_empty() {
                    errors.push(format!("Module '{}' has a lesson with empty ID", module.id));
                }
                if !lesson_ids.insert(lesson.id.as_str()) {
                    errors.push(format!("Duplicate lesson ID '{}'", lesson.id));
                }
            }
        }

        let mut quiz_ids = HashSet::new();
        let mut quizzed_modules = HashSet::new();
        for quiz in &self.quizzes {
            if !quiz_ids.insert(quiz.id.as_str()) {
                errors.push(format!("Duplicate quiz ID '{}'", quiz.id));
            }
            if !module_ids.contains(quiz.module_id.as_str()) {
                errors.push(format!(
                    "Quiz '{}' references non-existent module '{}'",
                    quiz.id, quiz.module_id
                ));
            }
            if !quizzed_modules.insert(quiz.module_id.as_str()) {
                errors.push(format!(
                    "Module '{}' has more than one quiz",
                    quiz.module_id
                ));
            }

            let mut question_ids = HashSet::new();
            for question in &quiz.questions {
                if !question_ids.insert(question.id.as_str()) {
                    errors.push(format!(
                        "Quiz '{}': duplicate question ID '{}'",
                        quiz.id, question.id
                    ));
                }
                if question.options.len() != OPTIONS_PER_QUESTION {
                    errors.push(format!(
                        "Quiz '{}': question '{}' has {} options, expected {}",
                        quiz.id,
                        question.id,
                        question.options.len(),
                        OPTIONS_PER_QUESTION
                    ));
                }
                if question.correct_option_index >= question.options.len() {
                    errors.push(format!(
                        "Quiz '{}': question '{}' correct option {} out of range 0..{}",
                        quiz.id,
                        question.id,
                        question.correct_option_index,
                        question.options.len()
                    ));
                }
            }
        }

        for term in &self.glossary_terms {
            if !module_ids.contains(term.module_id.as_str()) {
                errors.push(format!(
                    "Glossary term '{}' references non-existent module '{}'",
                    term.id, term.module_id
                ));
            }
        }

        errors
    }
}

/// The validated, read-only content catalog
#[derive(Clone, Debug)]
pub struct Catalog {
    modules: Vec<Module>,
    quizzes: Vec<Quiz>,
    glossary: Vec<GlossaryTerm>,
}

impl Catalog {
    /// Build a catalog from a parsed document, failing on any validation error
    pub fn from_document(doc: CatalogDocument) -> Result<Self> {
        let errors = doc.validate();
        if !errors.is_empty() {
            for error in &errors {
                tracing::error!("Catalog: {}", error);
            }
            return Err(Error::CatalogValidation(errors.join("; ")));
        }

        let CatalogDocument {
            mut modules,
            quizzes,
            glossary_terms,
        } = doc;
        modules.sort_by_key(|m| m.order);

        tracing::debug!(
            "Loaded catalog: {} modules, {} quizzes, {} glossary terms",
            modules.len(),
            quizzes.len(),
            glossary_terms.len()
        );

        Ok(Self {
            modules,
            quizzes,
            glossary: glossary_terms,
        })
    }

    /// Load and validate a catalog document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = load_catalog(&contents)?;
        tracing::info!("Loaded catalog from {:?}", path);
        Ok(catalog)
    }

    /// Modules in unlock order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn glossary(&self) -> &[GlossaryTerm] {
        &self.glossary
    }

    pub fn module_by_id(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    pub fn module_by_order(&self, order: u32) -> Option<&Module> {
        self.modules.iter().find(|m| m.order == order)
    }

    pub fn lesson_by_id(&self, module_id: &str, lesson_id: &str) -> Option<&Lesson> {
        self.module_by_id(module_id)?
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
    }

    /// Find a lesson anywhere in the catalog along with its module
    pub fn find_lesson(&self, lesson_id: &str) -> Option<(&Module, &Lesson)> {
        self.modules.iter().find_map(|m| {
            m.lessons
                .iter()
                .find(|l| l.id == lesson_id)
                .map(|l| (m, l))
        })
    }

    pub fn contains_lesson(&self, lesson_id: &str) -> bool {
        self.find_lesson(lesson_id).is_some()
    }

    pub fn quiz_by_module_id(&self, module_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.module_id == module_id)
    }

    pub fn quiz_by_id(&self, quiz_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == quiz_id)
    }

    pub fn total_lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn total_module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn total_quiz_count(&self) -> usize {
        self.quizzes.len()
    }

    pub fn total_question_count(&self) -> usize {
        self.quizzes.iter().map(|q| q.questions.len()).sum()
    }

    /// Total course duration as advertised by the modules
    pub fn total_duration_minutes(&self) -> u32 {
        self.modules.iter().map(|m| m.duration_minutes).sum()
    }

    /// The lesson before this one, crossing back into the previous module
    pub fn previous_lesson(&self, module_id: &str, lesson_id: &str) -> Option<LessonRef> {
        let module = self.module_by_id(module_id)?;
        let index = module.lesson_position(lesson_id)?;

        if index > 0 {
            return Some(LessonRef::new(&module.id, &module.lessons[index - 1].id));
        }

        let previous = self.module_by_order(module.order.checked_sub(1)?)?;
        previous
            .lessons
            .last()
            .map(|l| LessonRef::new(&previous.id, &l.id))
    }

    /// The lesson after this one, crossing into the next module
    pub fn next_lesson(&self, module_id: &str, lesson_id: &str) -> Option<LessonRef> {
        let module = self.module_by_id(module_id)?;
        let index = module.lesson_position(lesson_id)?;

        if let Some(next) = module.lessons.get(index + 1) {
            return Some(LessonRef::new(&module.id, &next.id));
        }

        let following = self.module_by_order(module.order + 1)?;
        following
            .lessons
            .first()
            .map(|l| LessonRef::new(&following.id, &l.id))
    }

    /// Case-insensitive search over term, acronym and definition
    ///
    /// A blank query returns every term.
    pub fn search_glossary(&self, query: &str) -> Vec<&GlossaryTerm> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.glossary.iter().collect();
        }

        self.glossary
            .iter()
            .filter(|t| {
                t.term.to_lowercase().contains(&query)
                    || t
                        .acronym
                        .as_ref()
                        .is_some_and(|a| a.to_lowercase().contains(&query))
                    || t.definition.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn glossary_for_module(&self, module_id: &str) -> Vec<&GlossaryTerm> {
        self.glossary
            .iter()
            .filter(|t| t.module_id == module_id)
            .collect()
    }
}

/// Human-readable duration ("45 min", "2h", "1h 30min")
pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}min", hours, rest)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn doc(modules: Vec<Module>, quizzes: Vec<Quiz>) -> CatalogDocument {
        CatalogDocument {
            modules,
            quizzes,
            glossary_terms: vec![],
        }
    }

    #[test]
    fn test_default_catalog_loads() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.total_module_count(), 3);
        assert_eq!(catalog.total_lesson_count(), 8);
        assert_eq!(catalog.total_quiz_count(), 3);
        assert_eq!(catalog.total_question_count(), 7);
        assert_eq!(catalog.total_duration_minutes(), 110);
    }

    #[test]
    fn test_default_catalog_is_cached() {
        let first = default_catalog().unwrap() as *const Catalog;
        let second = default_catalog().unwrap() as *const Catalog;
        assert_eq!(first, second);
    }

    #[test]
    fn test_modules_sorted_by_order() {
        let catalog = Catalog::from_document(doc(
            vec![
                module("second", 2, vec![lesson("s1", 5)]),
                module("first", 1, vec![lesson("f1", 5)]),
            ],
            vec![],
        ))
        .unwrap();
        let ids: Vec<_> = catalog.modules().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_rejects_gap_in_order() {
        let result = Catalog::from_document(doc(
            vec![
                module("m1", 1, vec![lesson("l1", 5)]),
                module("m3", 3, vec![lesson("l3", 5)]),
            ],
            vec![],
        ));
        assert!(matches!(result, Err(Error::CatalogValidation(_))));
    }

    #[test]
    fn test_rejects_order_not_starting_at_one() {
        let errors = doc(vec![module("m2", 2, vec![])], vec![]).validate();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_lesson_ids_across_modules() {
        let errors = doc(
            vec![
                module("m1", 1, vec![lesson("same", 5)]),
                module("m2", 2, vec![lesson("same", 5)]),
            ],
            vec![],
        )
        .validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate lesson ID")));
    }

    #[test]
    fn test_rejects_duplicate_quiz_ids() {
        let errors = doc(
            vec![
                module("m1", 1, vec![lesson("l1", 5)]),
                module("m2", 2, vec![lesson("l2", 5)]),
            ],
            vec![
                quiz("q", "m1", vec![question("x", 0)]),
                quiz("q", "m2", vec![question("y", 0)]),
            ],
        )
        .validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate quiz ID")));
    }

    #[test]
    fn test_rejects_out_of_range_correct_option() {
        let errors = doc(
            vec![module("m1", 1, vec![lesson("l1", 5)])],
            vec![quiz("q", "m1", vec![question("x", 4)])],
        )
        .validate();
        assert!(errors.iter().any(|e| e.contains("out of range")));
    }

    #[test]
    fn test_rejects_quiz_for_unknown_module() {
        let errors = doc(
            vec![module("m1", 1, vec![lesson("l1", 5)])],
            vec![quiz("q", "ghost", vec![question("x", 0)])],
        )
        .validate();
        assert!(errors.iter().any(|e| e.contains("non-existent module")));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(load_catalog("{ not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_lookups_return_none_for_unknown_ids() {
        let catalog = two_module_catalog();
        assert!(catalog.module_by_id("Z").is_none());
        assert!(catalog.lesson_by_id("A", "b1").is_none());
        assert!(catalog.lesson_by_id("Z", "a1").is_none());
        assert!(catalog.quiz_by_module_id("Z").is_none());
        assert_eq!(catalog.lesson_by_id("A", "a2").unwrap().duration_minutes, 15);
        assert_eq!(catalog.quiz_by_module_id("B").unwrap().id, "quiz-b");
    }

    #[test]
    fn test_navigation_crosses_module_boundaries() {
        let catalog = two_module_catalog();
        assert_eq!(catalog.next_lesson("A", "a1"), Some(LessonRef::new("A", "a2")));
        assert_eq!(catalog.next_lesson("A", "a2"), Some(LessonRef::new("B", "b1")));
        assert_eq!(catalog.next_lesson("B", "b1"), None);
        assert_eq!(catalog.previous_lesson("B", "b1"), Some(LessonRef::new("A", "a2")));
        assert_eq!(catalog.previous_lesson("A", "a1"), None);
        assert_eq!(catalog.previous_lesson("A", "nope"), None);
    }

    #[test]
    fn test_glossary_search() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.search_glossary("  ").len(), 3);
        let hits = catalog.search_glossary("dpo");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "term-3");
        assert_eq!(catalog.search_glossary("HEALTH PLAN").len(), 1);
        assert_eq!(catalog.glossary_for_module("mod-2").len(), 1);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45 min");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(90), "1h 30min");
    }
}
