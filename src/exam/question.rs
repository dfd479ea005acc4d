use crate::stores::types::QuestionDoc;
use crate::stores::{QuestionStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestCase {
    pub(crate) input: String,
    pub(crate) expected: String,
}

/// One exam question, immutable once loaded. The open test case is shown to
/// the student and never scored; hidden cases are scored and never shown.
#[derive(Debug, Clone)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) open: TestCase,
    pub(crate) hidden: Vec<TestCase>,
}

impl Question {
    fn from_doc(doc: QuestionDoc) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            open: TestCase { input: doc.open_test_case.input, expected: doc.open_test_case.output },
            hidden: doc
                .hidden_test_cases
                .into_iter()
                .map(|case| TestCase { input: case.input, expected: case.output })
                .collect(),
        }
    }
}

/// Fetches the question set once per session, preserving the store's creation
/// order. An empty result is valid and means the session must not start.
pub(crate) async fn load_question_set(
    store: &dyn QuestionStore,
) -> Result<Vec<Question>, StoreError> {
    let docs = store.list_ordered().await?;
    tracing::debug!(count = docs.len(), "Loaded exam question set");
    Ok(docs.into_iter().map(Question::from_doc).collect())
}
