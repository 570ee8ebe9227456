//! Quiz engine: one quiz-taking session and its scoring.
//!
//! A session walks the questions in order. Each question allows a limited
//! number of wrong selections; a correct pick or running out of attempts
//! reveals the explanation and the session waits for `advance`. Advancing
//! past the last question produces the `QuizResult` the caller persists.
//!
//! ```text
//! Presenting(i, n) --correct--> Answered(i, true)
//! Presenting(i, n) --wrong, n+1 < max--> Presenting(i, n+1)
//! Presenting(i, n) --wrong, n+1 == max--> Answered(i, false)
//! Answered(i, _) --advance--> Presenting(i+1, 0) | Finished(result)
//! ```

use crate::gating::percent;
use crate::{Error, Question, Quiz, QuizResult, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scoring and attempt rules
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizRules {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Display-only pass mark; certificate eligibility ignores it
    #[serde(default = "default_pass_threshold_percent")]
    pub pass_threshold_percent: u8,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            pass_threshold_percent: default_pass_threshold_percent(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_pass_threshold_percent() -> u8 {
    60
}

impl QuizRules {
    pub fn passed(&self, result: &QuizResult) -> bool {
        result.percent >= self.pass_threshold_percent
    }
}

/// Where a session currently is
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a selection on this question
    Presenting { question_index: usize, attempts: u32 },
    /// The question is settled; explanation is visible
    Answered { question_index: usize, correct: bool },
    /// Every question is settled
    Finished(QuizResult),
}

/// Feedback for a single selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Correct {
        explanation: String,
    },
    /// Wrong, but the learner may pick again
    Retry {
        attempts_left: u32,
    },
    /// Wrong and out of attempts; the answer is revealed
    Exhausted {
        correct_option_index: usize,
        explanation: String,
    },
}

/// How one question went
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub correct: bool,
    pub attempts: u32,
}

/// In-memory state of one attempt at a quiz
#[derive(Clone, Debug)]
pub struct QuizSession<'a> {
    quiz: &'a Quiz,
    rules: QuizRules,
    state: SessionState,
    outcomes: Vec<QuestionOutcome>,
}

impl<'a> QuizSession<'a> {
    pub fn new(quiz: &'a Quiz, rules: QuizRules) -> Self {
        tracing::debug!(
            "Starting quiz {} ({} questions)",
            quiz.id,
            quiz.questions.len()
        );
        Self {
            quiz,
            rules,
            state: SessionState::Presenting {
                question_index: 0,
                attempts: 0,
            },
            outcomes: Vec::new(),
        }
    }

    pub fn quiz(&self) -> &'a Quiz {
        self.quiz
    }

    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished(_))
    }

    /// The question being shown, if any
    pub fn current_question(&self) -> Option<&'a Question> {
        match self.state {
            SessionState::Presenting { question_index, .. }
            | SessionState::Answered { question_index, .. } => {
                self.quiz.questions.get(question_index)
            }
            SessionState::Finished(_) => None,
        }
    }

    pub fn correct_so_far(&self) -> usize {
        self.outcomes.iter().filter(|o| o.correct).count()
    }

    /// Share of questions already passed, for a progress bar
    pub fn progress_percent(&self) -> u8 {
        let index = match self.state {
            SessionState::Presenting { question_index, .. }
            | SessionState::Answered { question_index, .. } => question_index,
            SessionState::Finished(_) => self.quiz.questions.len(),
        };
        percent(index, self.quiz.questions.len())
    }

    /// Pick an option for the current question
    pub fn select(&mut self, option_index: usize) -> Result<Selection> {
        let SessionState::Presenting {
            question_index,
            attempts,
        } = self.state
        else {
            return Err(Error::Quiz(
                "no selection accepted: current question is already settled".into(),
            ));
        };

        let quiz = self.quiz;
        let question = quiz
            .questions
            .get(question_index)
            .ok_or_else(|| Error::Quiz(format!("quiz '{}' has no questions", quiz.id)))?;

        if option_index >= question.options.len() {
            return Err(Error::Quiz(format!(
                "option {} out of range 0..{}",
                option_index,
                question.options.len()
            )));
        }

        let attempts = attempts + 1;

        if option_index == question.correct_option_index {
            self.settle(question_index, question, true, attempts);
            return Ok(Selection::Correct {
                explanation: question.explanation.clone(),
            });
        }

        if attempts >= self.rules.max_attempts {
            tracing::debug!("Question {} exhausted after {} attempts", question.id, attempts);
            self.settle(question_index, question, false, attempts);
            return Ok(Selection::Exhausted {
                correct_option_index: question.correct_option_index,
                explanation: question.explanation.clone(),
            });
        }

        self.state = SessionState::Presenting {
            question_index,
            attempts,
        };
        Ok(Selection::Retry {
            attempts_left: self.rules.max_attempts - attempts,
        })
    }

    fn settle(&mut self, question_index: usize, question: &Question, correct: bool, attempts: u32) {
        self.outcomes.push(QuestionOutcome {
            question_id: question.id.clone(),
            correct,
            attempts,
        });
        self.state = SessionState::Answered {
            question_index,
            correct,
        };
    }

    /// Move past a settled question
    ///
    /// Returns the final result when the last question was settled. A quiz
    /// without questions can be advanced straight away and scores 0%.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Option<QuizResult>> {
        let next_index = match self.state {
            SessionState::Answered { question_index, .. } => question_index + 1,
            SessionState::Presenting { .. } if self.quiz.questions.is_empty() => 0,
            SessionState::Presenting { .. } => {
                return Err(Error::Quiz("current question has not been answered".into()))
            }
            SessionState::Finished(_) => {
                return Err(Error::Quiz("quiz is already finished".into()))
            }
        };

        if next_index < self.quiz.questions.len() {
            self.state = SessionState::Presenting {
                question_index: next_index,
                attempts: 0,
            };
            return Ok(None);
        }

        let total = self.quiz.questions.len();
        let correct = self.correct_so_far();
        let result = QuizResult {
            quiz_id: self.quiz.id.clone(),
            module_id: self.quiz.module_id.clone(),
            correct_count: correct as u32,
            total_count: total as u32,
            percent: percent(correct, total),
            completed_at: now,
        };

        tracing::info!(
            "Finished quiz {}: {}/{} ({}%)",
            result.quiz_id,
            correct,
            total,
            result.percent
        );
        self.state = SessionState::Finished(result.clone());
        Ok(Some(result))
    }

    /// Start over from the first question, discarding this attempt
    pub fn restart(&mut self) {
        self.state = SessionState::Presenting {
            question_index: 0,
            attempts: 0,
        };
        self.outcomes.clear();
    }
}
