use crate::exam::question::Question;
use crate::exam::templates::Language;
use crate::services::execution::{CodeExecutor, CONNECTION_ERROR_MESSAGE};

/// Result of grading one question: the open case's raw output plus the
/// aggregated hidden-case outcome. Credit bookkeeping stays with the session
/// state, which owns the score.
#[derive(Debug)]
pub(crate) struct GradeReport {
    pub(crate) open_output: String,
    pub(crate) all_passed: bool,
    pub(crate) passed_hidden: usize,
    pub(crate) hidden_total: usize,
}

/// Runs the open test case (informational only), then every hidden case in
/// definition order. Hidden cases are compared by exact string equality after
/// trimming. A transport failure on any case yields the connection-error
/// string for that case and the loop continues; grading never raises a fault.
pub(crate) async fn run_test_cases(
    executor: &dyn CodeExecutor,
    question: &Question,
    source: &str,
    language: Language,
) -> GradeReport {
    let open_output = match executor.execute(source, language, &question.open.input).await {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(question_id = %question.id, error = %err, "Open test case execution failed");
            CONNECTION_ERROR_MESSAGE.to_string()
        }
    };

    // Hidden cases run one at a time: the execution service is a shared
    // resource with no documented concurrency limit.
    let mut passed_hidden = 0;
    for (index, case) in question.hidden.iter().enumerate() {
        let actual = match executor.execute(source, language, &case.input).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    question_id = %question.id,
                    case_index = index,
                    error = %err,
                    "Hidden test case execution failed"
                );
                CONNECTION_ERROR_MESSAGE.to_string()
            }
        };
        if actual.trim() == case.expected {
            passed_hidden += 1;
        }
    }

    let hidden_total = question.hidden.len();
    GradeReport { open_output, all_passed: passed_hidden == hidden_total, passed_hidden, hidden_total }
}
