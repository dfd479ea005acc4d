use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::exam::question::Question;
use crate::exam::templates::Language;

/// The exam is always scored out of 20, split evenly across questions.
pub(crate) const EXAM_TOTAL_MARKS: f64 = 20.0;

/// Recorded in the submission for questions whose draft was never edited.
pub(crate) const NOT_ATTEMPTED: &str = "Not Attempted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Phase {
    Active,
    Summary,
    Submitted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum StateError {
    #[error("this question has been submitted and locked")]
    QuestionLocked,
    #[error("a run is already in progress for this question")]
    RunInProgress,
    #[error("the session is no longer active")]
    SessionClosed,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Phase already left `active`; the countdown should stop.
    Ignored,
    Running(u32),
    /// The clock reached zero; the caller must trigger finalization.
    Expired,
}

/// Everything a grading run needs, captured under the state lock so the run
/// itself can suspend without holding it.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) question: Question,
    pub(crate) source: String,
    pub(crate) language: Language,
}

#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) newly_credited: bool,
    pub(crate) score: f64,
}

#[derive(Debug)]
pub(crate) struct FinalizeSnapshot {
    pub(crate) score: f64,
    pub(crate) time_taken_seconds: u32,
    pub(crate) code_by_question: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub(crate) struct StateSnapshot {
    pub(crate) phase: Phase,
    pub(crate) current_index: usize,
    pub(crate) question_count: usize,
    pub(crate) question_title: String,
    pub(crate) question_description: String,
    pub(crate) open_input: String,
    pub(crate) open_expected: String,
    pub(crate) visible_code: String,
    pub(crate) language: Language,
    pub(crate) current_locked: bool,
    pub(crate) locked_count: usize,
    pub(crate) remaining_seconds: u32,
    pub(crate) score: f64,
}

/// Per-student exam session state. One instance per session, owned by a
/// single controller; every mutation goes through the methods below.
///
/// Drafts are keyed by question id only. A question with no draft shows the
/// starter template of the *currently selected* language, so revisiting an
/// untouched question after a language switch shows the new language's
/// template. That follows the portal's long-standing behavior and is relied
/// on by the client.
pub(crate) struct SessionState {
    questions: Vec<Question>,
    current_index: usize,
    drafts: HashMap<String, String>,
    language: Language,
    locked: HashSet<String>,
    credited: HashSet<String>,
    running: HashSet<String>,
    score: f64,
    duration_seconds: u32,
    remaining_seconds: u32,
    phase: Phase,
    finalize_in_flight: bool,
}

impl SessionState {
    /// `questions` must be non-empty; an empty set never reaches an active
    /// session (the entry flow rejects it first).
    pub(crate) fn new(questions: Vec<Question>, duration_seconds: u32) -> Self {
        debug_assert!(!questions.is_empty());
        Self {
            questions,
            current_index: 0,
            drafts: HashMap::new(),
            language: Language::C,
            locked: HashSet::new(),
            credited: HashSet::new(),
            running: HashSet::new(),
            score: 0.0,
            duration_seconds,
            remaining_seconds: duration_seconds,
            phase: Phase::Active,
            finalize_in_flight: false,
        }
    }

    fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    fn marks_per_question(&self) -> f64 {
        EXAM_TOTAL_MARKS / self.questions.len() as f64
    }

    /// Shared guard for mutations of the current question: the session must
    /// be active, the question unlocked, and no run outstanding for it.
    fn guard_current_mutable(&self) -> Result<(), StateError> {
        if self.phase != Phase::Active {
            return Err(StateError::SessionClosed);
        }
        let id = &self.current_question().id;
        if self.locked.contains(id) {
            return Err(StateError::QuestionLocked);
        }
        if self.running.contains(id) {
            return Err(StateError::RunInProgress);
        }
        Ok(())
    }

    /// Draft-or-template resolution for the current question.
    pub(crate) fn visible_code(&self) -> String {
        let id = &self.current_question().id;
        self.drafts
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.language.starter_template().to_string())
    }

    /// Out-of-range indexes and non-active phases are ignored; navigation is
    /// never an error. Moving stays allowed while a run is outstanding.
    pub(crate) fn select_question(&mut self, index: usize) {
        if self.phase != Phase::Active || index >= self.questions.len() {
            return;
        }
        self.current_index = index;
    }

    pub(crate) fn set_language(&mut self, language: Language) -> Result<(), StateError> {
        self.guard_current_mutable()?;
        self.language = language;
        Ok(())
    }

    pub(crate) fn edit_draft(&mut self, code: String) -> Result<(), StateError> {
        self.guard_current_mutable()?;
        let id = self.current_question().id.clone();
        self.drafts.insert(id, code);
        Ok(())
    }

    /// Locks the current question. When this locks the last open question the
    /// phase moves to `summary`; the returned phase lets the caller cancel
    /// the countdown on that transition.
    pub(crate) fn lock_current(&mut self) -> Result<Phase, StateError> {
        self.guard_current_mutable()?;
        let id = self.current_question().id.clone();
        self.locked.insert(id);
        if self.locked.len() == self.questions.len() {
            self.phase = Phase::Summary;
        }
        Ok(self.phase)
    }

    pub(crate) fn tick(&mut self) -> Tick {
        if self.phase != Phase::Active {
            return Tick::Ignored;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Tick::Expired
        } else {
            Tick::Running(self.remaining_seconds)
        }
    }

    /// Marks a run as outstanding for the current question and captures what
    /// the grading engine needs. At most one run per question at a time.
    pub(crate) fn begin_run(&mut self) -> Result<RunContext, StateError> {
        if self.phase != Phase::Active {
            return Err(StateError::SessionClosed);
        }
        let id = self.current_question().id.clone();
        if self.locked.contains(&id) {
            return Err(StateError::QuestionLocked);
        }
        if self.running.contains(&id) {
            return Err(StateError::RunInProgress);
        }
        let source = self.visible_code();
        self.running.insert(id);
        Ok(RunContext { question: self.current_question().clone(), source, language: self.language })
    }

    /// Clears the outstanding-run marker and awards credit at most once per
    /// question. Credit does not require locking, and re-running a credited
    /// question never changes the score.
    pub(crate) fn complete_run(&mut self, question_id: &str, all_passed: bool) -> RunOutcome {
        self.running.remove(question_id);
        let mut newly_credited = false;
        if all_passed && self.phase == Phase::Active && !self.credited.contains(question_id) {
            self.credited.insert(question_id.to_string());
            self.score = self.marks_per_question() * self.credited.len() as f64;
            newly_credited = true;
        }
        RunOutcome { newly_credited, score: self.score }
    }

    /// Claims the right to finalize and snapshots the submission data in one
    /// step. Returns `None` when already submitted or another finalization is
    /// in flight; the claim must be released with `commit_finalize` or
    /// `abort_finalize`.
    pub(crate) fn begin_finalize(&mut self) -> Option<FinalizeSnapshot> {
        if self.phase == Phase::Submitted || self.finalize_in_flight {
            return None;
        }
        self.finalize_in_flight = true;
        let code_by_question = self
            .questions
            .iter()
            .map(|question| {
                let code = self
                    .drafts
                    .get(&question.id)
                    .cloned()
                    .unwrap_or_else(|| NOT_ATTEMPTED.to_string());
                (format!("Q: {}", question.title), code)
            })
            .collect();
        Some(FinalizeSnapshot {
            score: self.score,
            time_taken_seconds: self.duration_seconds - self.remaining_seconds,
            code_by_question,
        })
    }

    /// Commits the phase only after the submission write succeeded; the phase
    /// never moves backward after this.
    pub(crate) fn commit_finalize(&mut self) {
        self.phase = Phase::Submitted;
        self.finalize_in_flight = false;
    }

    /// Releases the finalize claim after a failed submission write so the
    /// student can retry.
    pub(crate) fn abort_finalize(&mut self) {
        self.finalize_in_flight = false;
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot {
        let question = self.current_question();
        StateSnapshot {
            phase: self.phase,
            current_index: self.current_index,
            question_count: self.questions.len(),
            question_title: question.title.clone(),
            question_description: question.description.clone(),
            open_input: question.open.input.clone(),
            open_expected: question.open.expected.clone(),
            visible_code: self.visible_code(),
            language: self.language,
            current_locked: self.locked.contains(&question.id),
            locked_count: self.locked.len(),
            remaining_seconds: self.remaining_seconds,
            score: self.score,
        }
    }
}
