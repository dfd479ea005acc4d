use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use axum::Router;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::exam::question::{Question, TestCase};
use crate::exam::templates::Language;
use crate::services::execution::{CodeExecutor, ExecutionError, NO_OUTPUT_MESSAGE};
use crate::stores::types::{QuestionDoc, StudentRecord, StudentStatus, SubmissionDoc, TestCaseDoc};
use crate::stores::{ApprovalStore, QuestionStore, StoreError, SubmissionStore};

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("CODEXAM_ENV", "test");
    std::env::set_var("CODEXAM_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("EXAM_DURATION_SECONDS");
    std::env::remove_var("MAX_CONCURRENT_SESSIONS");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
}

pub(crate) struct MemoryQuestionStore {
    docs: Vec<QuestionDoc>,
}

impl MemoryQuestionStore {
    pub(crate) fn new(docs: Vec<QuestionDoc>) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn list_ordered(&self) -> Result<Vec<QuestionDoc>, StoreError> {
        Ok(self.docs.clone())
    }
}

pub(crate) struct MemoryApprovalStore {
    students: Mutex<Vec<(String, String, StudentRecord)>>,
    completed: Mutex<Vec<String>>,
    fail_completion: AtomicBool,
}

impl MemoryApprovalStore {
    pub(crate) fn new() -> Self {
        Self {
            students: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            fail_completion: AtomicBool::new(false),
        }
    }

    pub(crate) fn insert_student(&self, name: &str, register_number: &str, id: &str, status: StudentStatus) {
        self.students.lock().unwrap().push((
            name.to_string(),
            register_number.to_string(),
            StudentRecord { id: id.to_string(), status },
        ));
    }

    pub(crate) fn completed_ids(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub(crate) fn fail_completion_updates(&self) {
        self.fail_completion.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn find_student(
        &self,
        name: &str,
        register_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let students = self.students.lock().unwrap();
        Ok(students
            .iter()
            .find(|(n, reg, _)| n == name && reg == register_number)
            .map(|(_, _, record)| record.clone()))
    }

    async fn mark_completed(&self, student_id: &str) -> Result<(), StoreError> {
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("injected approval failure".to_string()));
        }
        self.completed.lock().unwrap().push(student_id.to_string());
        Ok(())
    }
}

pub(crate) struct MemorySubmissionStore {
    records: Mutex<Vec<SubmissionDoc>>,
    fail_next: AtomicBool,
}

impl MemorySubmissionStore {
    pub(crate) fn new() -> Self {
        Self { records: Mutex::new(Vec::new()), fail_next: AtomicBool::new(false) }
    }

    pub(crate) fn fail_next_append(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn records(&self) -> Vec<SubmissionDoc> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn append(&self, record: SubmissionDoc) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Transport("injected submission failure".to_string()));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

enum ScriptedResponse {
    Output(String),
    Fail,
}

/// Executor fake keyed by stdin: each input either yields a fixed output or a
/// transport failure. Unscripted inputs resolve to the no-output message.
pub(crate) struct ScriptedExecutor {
    responses: Mutex<HashMap<String, ScriptedResponse>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn respond(&self, stdin: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(stdin.to_string(), ScriptedResponse::Output(output.to_string()));
    }

    pub(crate) fn fail(&self, stdin: &str) {
        self.responses.lock().unwrap().insert(stdin.to_string(), ScriptedResponse::Fail);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _source: &str,
        _language: Language,
        stdin: &str,
    ) -> Result<String, ExecutionError> {
        self.calls.lock().unwrap().push(stdin.to_string());
        match self.responses.lock().unwrap().get(stdin) {
            Some(ScriptedResponse::Output(output)) => Ok(output.clone()),
            Some(ScriptedResponse::Fail) => {
                Err(ExecutionError::Transport("injected execution failure".to_string()))
            }
            None => Ok(NO_OUTPUT_MESSAGE.to_string()),
        }
    }
}

/// Executor whose calls block until released, for exercising the
/// run-in-progress guards.
pub(crate) struct GatedExecutor {
    permits: Semaphore,
}

impl GatedExecutor {
    pub(crate) fn new() -> Self {
        Self { permits: Semaphore::new(0) }
    }

    pub(crate) fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }
}

#[async_trait]
impl CodeExecutor for GatedExecutor {
    async fn execute(
        &self,
        _source: &str,
        _language: Language,
        _stdin: &str,
    ) -> Result<String, ExecutionError> {
        let permit = self.permits.acquire().await.expect("gate semaphore");
        permit.forget();
        Ok("ok".to_string())
    }
}

pub(crate) fn sample_question(
    id: &str,
    title: &str,
    open_input: &str,
    open_output: &str,
    hidden: &[(&str, &str)],
) -> QuestionDoc {
    QuestionDoc {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("Solve {title}"),
        open_test_case: TestCaseDoc { input: open_input.to_string(), output: open_output.to_string() },
        hidden_test_cases: hidden
            .iter()
            .map(|(input, output)| TestCaseDoc { input: input.to_string(), output: output.to_string() })
            .collect(),
    }
}

/// Two-question exam used across controller and countdown tests; each
/// question is worth 10 marks.
pub(crate) fn sample_questions() -> Vec<Question> {
    vec![
        Question {
            id: "q-1".to_string(),
            title: "Sum".to_string(),
            description: "Add two numbers".to_string(),
            open: TestCase { input: "1 2".to_string(), expected: "3".to_string() },
            hidden: vec![TestCase { input: "10 20".to_string(), expected: "30".to_string() }],
        },
        Question {
            id: "q-2".to_string(),
            title: "Product".to_string(),
            description: "Multiply two numbers".to_string(),
            open: TestCase { input: "2 3".to_string(), expected: "6".to_string() },
            hidden: vec![TestCase { input: "4 5".to_string(), expected: "20".to_string() }],
        },
    ]
}

pub(crate) fn sample_question_docs() -> Vec<QuestionDoc> {
    vec![
        sample_question("q-1", "Sum", "1 2", "3", &[("10 20", "30")]),
        sample_question("q-2", "Product", "2 3", "6", &[("4 5", "20")]),
    ]
}

pub(crate) fn build_state(questions: Vec<QuestionDoc>) -> AppState {
    let settings = Settings::load().expect("settings");
    AppState::new(
        settings,
        Arc::new(MemoryQuestionStore::new(questions)),
        Arc::new(MemoryApprovalStore::new()),
        Arc::new(MemorySubmissionStore::new()),
        Arc::new(ScriptedExecutor::new()),
    )
}

pub(crate) struct TestContext {
    pub(crate) app: Router,
    pub(crate) approvals: Arc<MemoryApprovalStore>,
    pub(crate) submissions: Arc<MemorySubmissionStore>,
    pub(crate) executor: Arc<ScriptedExecutor>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn setup_test_context(questions: Vec<QuestionDoc>) -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let approvals = Arc::new(MemoryApprovalStore::new());
    let submissions = Arc::new(MemorySubmissionStore::new());
    let executor = Arc::new(ScriptedExecutor::new());
    let state = AppState::new(
        settings,
        Arc::new(MemoryQuestionStore::new(questions)),
        approvals.clone(),
        submissions.clone(),
        executor.clone(),
    );
    let app = api::router::router(state);

    TestContext { app, approvals, submissions, executor, _guard: guard }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .expect("request")
}

pub(crate) async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}
