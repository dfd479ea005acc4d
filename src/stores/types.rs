use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StudentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StudentRecord {
    pub(crate) id: String,
    #[serde(default = "default_status")]
    pub(crate) status: StudentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TestCaseDoc {
    #[serde(default)]
    pub(crate) input: String,
    #[serde(default)]
    pub(crate) output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionDoc {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default, alias = "openTestCase")]
    pub(crate) open_test_case: TestCaseDoc,
    #[serde(default, alias = "hiddenTestCases")]
    pub(crate) hidden_test_cases: Vec<TestCaseDoc>,
}

/// One finalized exam result, written exactly once per session. Field names
/// follow the store's camelCase document schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionDoc {
    pub(crate) student_name: String,
    pub(crate) student_reg_no: String,
    pub(crate) student_mark: String,
    pub(crate) student_time_taken: String,
    pub(crate) student_codes: BTreeMap<String, String>,
}

fn default_status() -> StudentStatus {
    StudentStatus::Pending
}
