use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::core::time::{format_minutes_seconds, format_offset};
use crate::exam::question::Question;
use crate::exam::state::{Phase, SessionState, StateError, StateSnapshot, Tick};
use crate::exam::templates::Language;
use crate::services::execution::CodeExecutor;
use crate::services::grading;
use crate::stores::types::SubmissionDoc;
use crate::stores::{ApprovalStore, StoreError, SubmissionStore};

#[derive(Debug, Clone)]
pub(crate) struct StudentIdentity {
    pub(crate) name: String,
    pub(crate) register_number: String,
    /// Document id in the approval store, used for the completion update.
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    AutoDeadline,
}

impl FinalizeMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::ManualSubmit => "manual_submit",
            Self::AutoDeadline => "auto_deadline",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionSummary {
    pub(crate) score: f64,
    pub(crate) time_taken_seconds: u32,
}

#[derive(Debug)]
pub(crate) enum FinalizeOutcome {
    Submitted(SubmissionSummary),
    /// Another trigger already finalized (or is finalizing) this session.
    AlreadySubmitted,
}

#[derive(Debug, Error)]
pub(crate) enum FinalizeError {
    #[error("failed to store the submission: {0}")]
    Persistence(StoreError),
}

#[derive(Debug)]
pub(crate) struct RunReport {
    pub(crate) open_output: String,
    pub(crate) all_passed: bool,
    pub(crate) newly_credited: bool,
    pub(crate) score: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) session_id: String,
    pub(crate) student_name: String,
    pub(crate) register_number: String,
    pub(crate) started_at: String,
    pub(crate) state: StateSnapshot,
}

/// Owns one student's `SessionState` behind a mutex and orchestrates the
/// operations that suspend: grading runs and finalization. The lock is never
/// held across an await; suspension points capture what they need, release,
/// and re-acquire to apply the result.
pub(crate) struct SessionController {
    id: String,
    student: StudentIdentity,
    started_at: OffsetDateTime,
    state: Mutex<SessionState>,
    executor: Arc<dyn CodeExecutor>,
    submissions: Arc<dyn SubmissionStore>,
    approvals: Arc<dyn ApprovalStore>,
    cancel: watch::Sender<bool>,
}

impl SessionController {
    pub(crate) fn new(
        student: StudentIdentity,
        questions: Vec<Question>,
        duration_seconds: u32,
        executor: Arc<dyn CodeExecutor>,
        submissions: Arc<dyn SubmissionStore>,
        approvals: Arc<dyn ApprovalStore>,
    ) -> Arc<Self> {
        let (cancel, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            student,
            started_at: OffsetDateTime::now_utc(),
            state: Mutex::new(SessionState::new(questions, duration_seconds)),
            executor,
            submissions,
            approvals,
            cancel,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn student(&self) -> &StudentIdentity {
        &self.student
    }

    /// Receiver for the countdown task; flips to `true` the moment the phase
    /// leaves `active`.
    pub(crate) fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    fn stop_countdown(&self) {
        let _ = self.cancel.send(true);
    }

    fn wrap(&self, state: StateSnapshot) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            student_name: self.student.name.clone(),
            register_number: self.student.register_number.clone(),
            started_at: format_offset(self.started_at),
            state,
        }
    }

    pub(crate) async fn snapshot(&self) -> SessionSnapshot {
        self.wrap(self.state.lock().await.snapshot())
    }

    pub(crate) async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub(crate) async fn select_question(&self, index: usize) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.select_question(index);
        self.wrap(state.snapshot())
    }

    pub(crate) async fn set_language(
        &self,
        language: Language,
    ) -> Result<SessionSnapshot, StateError> {
        let mut state = self.state.lock().await;
        state.set_language(language)?;
        Ok(self.wrap(state.snapshot()))
    }

    pub(crate) async fn edit_draft(&self, code: String) -> Result<SessionSnapshot, StateError> {
        let mut state = self.state.lock().await;
        state.edit_draft(code)?;
        Ok(self.wrap(state.snapshot()))
    }

    pub(crate) async fn lock_current(&self) -> Result<SessionSnapshot, StateError> {
        let (snapshot, phase) = {
            let mut state = self.state.lock().await;
            let phase = state.lock_current()?;
            (self.wrap(state.snapshot()), phase)
        };
        if phase == Phase::Summary {
            self.stop_countdown();
            tracing::info!(session_id = %self.id, "All questions locked; session moved to summary");
        }
        Ok(snapshot)
    }

    /// Grades the current question against the execution service. The state
    /// refuses conflicting mutations for this question while the run is
    /// outstanding; navigation to other questions stays possible.
    pub(crate) async fn run_current(&self) -> Result<RunReport, StateError> {
        let context = { self.state.lock().await.begin_run()? };

        let report =
            grading::run_test_cases(&*self.executor, &context.question, &context.source, context.language)
                .await;

        let outcome =
            { self.state.lock().await.complete_run(&context.question.id, report.all_passed) };

        metrics::counter!("exam_runs_total").increment(1);
        if outcome.newly_credited {
            tracing::info!(
                session_id = %self.id,
                question_id = %context.question.id,
                score = outcome.score,
                "Question credited"
            );
        }

        Ok(RunReport {
            open_output: report.open_output,
            all_passed: report.all_passed,
            newly_credited: outcome.newly_credited,
            score: outcome.score,
        })
    }

    pub(crate) async fn tick(&self) -> Tick {
        self.state.lock().await.tick()
    }

    /// Finalizes the session at most once. The finalize claim and the state
    /// snapshot happen in one critical section; the submission write runs
    /// outside the lock and only a successful write commits the phase to
    /// `submitted`. The approval-status update afterwards is best-effort.
    pub(crate) async fn finalize(
        &self,
        mode: FinalizeMode,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let Some(snapshot) = ({ self.state.lock().await.begin_finalize() }) else {
            return Ok(FinalizeOutcome::AlreadySubmitted);
        };

        let record = SubmissionDoc {
            student_name: self.student.name.clone(),
            student_reg_no: self.student.register_number.clone(),
            student_mark: format_mark(snapshot.score),
            student_time_taken: format_minutes_seconds(snapshot.time_taken_seconds),
            student_codes: snapshot.code_by_question.into_iter().collect(),
        };

        if let Err(err) = self.submissions.append(record).await {
            self.state.lock().await.abort_finalize();
            tracing::error!(session_id = %self.id, error = %err, "Failed to store exam submission");
            return Err(FinalizeError::Persistence(err));
        }

        self.state.lock().await.commit_finalize();
        self.stop_countdown();
        metrics::counter!("exam_submissions_total").increment(1);

        if let Some(student_id) = &self.student.student_id {
            if let Err(err) = self.approvals.mark_completed(student_id).await {
                tracing::warn!(
                    session_id = %self.id,
                    student_id = %student_id,
                    error = %err,
                    "Failed to mark student completed; the submission is already stored"
                );
            }
        }

        tracing::info!(
            session_id = %self.id,
            mode = FinalizeMode::as_str(mode),
            score = snapshot.score,
            time_taken_seconds = snapshot.time_taken_seconds,
            "Exam submitted"
        );

        Ok(FinalizeOutcome::Submitted(SubmissionSummary {
            score: snapshot.score,
            time_taken_seconds: snapshot.time_taken_seconds,
        }))
    }
}

pub(crate) fn format_mark(score: f64) -> String {
    format!("{score:.1} out of 20")
}

/// Registry of open sessions, keyed by session id. Sessions stay listed after
/// submission so the client can still fetch the final snapshot; capacity and
/// reuse checks only look at sessions that have not been submitted.
pub(crate) struct SessionManager {
    sessions: Mutex<HashMap<String, Arc<SessionController>>>,
}

impl SessionManager {
    pub(crate) fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    pub(crate) async fn insert(&self, controller: Arc<SessionController>) {
        self.sessions.lock().await.insert(controller.id().to_string(), controller);
    }

    pub(crate) async fn get(&self, session_id: &str) -> Option<Arc<SessionController>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Finds an unsubmitted session for the given register number, so a
    /// student who re-enters resumes instead of starting a second attempt.
    pub(crate) async fn find_for_student(
        &self,
        register_number: &str,
    ) -> Option<Arc<SessionController>> {
        let candidates: Vec<Arc<SessionController>> =
            self.sessions.lock().await.values().cloned().collect();
        for controller in candidates {
            if controller.student().register_number == register_number
                && controller.phase().await != Phase::Submitted
            {
                return Some(controller);
            }
        }
        None
    }

    pub(crate) async fn active_count(&self) -> usize {
        let candidates: Vec<Arc<SessionController>> =
            self.sessions.lock().await.values().cloned().collect();
        let mut count = 0;
        for controller in candidates {
            if controller.phase().await != Phase::Submitted {
                count += 1;
            }
        }
        count
    }
}
