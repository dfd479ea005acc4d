use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_minutes_seconds;
use crate::exam::state::Phase;
use crate::exam::templates::Language;
use crate::services::session::{format_mark, RunReport, SessionSnapshot, SubmissionSummary};

pub(crate) const HIDDEN_PASSED_MESSAGE: &str = "All hidden test cases passed!";
pub(crate) const HIDDEN_FAILED_MESSAGE: &str = "Some hidden test cases failed.";

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnterExamRequest {
    #[serde(alias = "studentName")]
    #[validate(length(min = 1, message = "student_name must not be empty"))]
    pub(crate) student_name: String,
    #[serde(alias = "registerNumber")]
    #[validate(length(min = 1, message = "register_number must not be empty"))]
    pub(crate) register_number: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectQuestionRequest {
    pub(crate) index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetLanguageRequest {
    pub(crate) language: Language,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditDraftRequest {
    pub(crate) code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenTestCaseView {
    pub(crate) input: String,
    pub(crate) expected_output: String,
}

/// The current question as shown to the student. Hidden test cases are never
/// part of any response.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) number: usize,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) open_test_case: OpenTestCaseView,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) session_id: String,
    pub(crate) student_name: String,
    pub(crate) register_number: String,
    pub(crate) started_at: String,
    pub(crate) phase: Phase,
    pub(crate) question: QuestionView,
    pub(crate) question_count: usize,
    pub(crate) visible_code: String,
    pub(crate) language: Language,
    pub(crate) current_locked: bool,
    pub(crate) locked_count: usize,
    pub(crate) remaining_seconds: u32,
    pub(crate) score: f64,
}

impl SessionResponse {
    pub(crate) fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let state = snapshot.state;
        Self {
            session_id: snapshot.session_id,
            student_name: snapshot.student_name,
            register_number: snapshot.register_number,
            started_at: snapshot.started_at,
            phase: state.phase,
            question: QuestionView {
                number: state.current_index + 1,
                title: state.question_title,
                description: state.question_description,
                open_test_case: OpenTestCaseView {
                    input: state.open_input,
                    expected_output: state.open_expected,
                },
            },
            question_count: state.question_count,
            visible_code: state.visible_code,
            language: state.language,
            current_locked: state.current_locked,
            locked_count: state.locked_count,
            remaining_seconds: state.remaining_seconds,
            score: state.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunResponse {
    pub(crate) open_output: String,
    pub(crate) hidden_passed: bool,
    pub(crate) message: String,
    pub(crate) newly_credited: bool,
    pub(crate) score: f64,
}

impl RunResponse {
    pub(crate) fn from_report(report: RunReport) -> Self {
        let message = if report.all_passed {
            HIDDEN_PASSED_MESSAGE.to_string()
        } else {
            HIDDEN_FAILED_MESSAGE.to_string()
        };
        Self {
            open_output: report.open_output,
            hidden_passed: report.all_passed,
            message,
            newly_credited: report.newly_credited,
            score: report.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) message: String,
    pub(crate) final_mark: String,
    pub(crate) time_taken: Option<String>,
    pub(crate) already_submitted: bool,
}

impl SubmitResponse {
    pub(crate) fn submitted(summary: SubmissionSummary) -> Self {
        Self {
            message: "Exam submitted successfully".to_string(),
            final_mark: format_mark(summary.score),
            time_taken: Some(format_minutes_seconds(summary.time_taken_seconds)),
            already_submitted: false,
        }
    }

    pub(crate) fn already_submitted(score: f64) -> Self {
        Self {
            message: "Your results have been submitted.".to_string(),
            final_mark: format_mark(score),
            time_taken: None,
            already_submitted: true,
        }
    }
}
