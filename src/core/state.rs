use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::execution::CodeExecutor;
use crate::services::session::SessionManager;
use crate::stores::{ApprovalStore, QuestionStore, SubmissionStore};

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    questions: Arc<dyn QuestionStore>,
    approvals: Arc<dyn ApprovalStore>,
    submissions: Arc<dyn SubmissionStore>,
    executor: Arc<dyn CodeExecutor>,
    sessions: SessionManager,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        questions: Arc<dyn QuestionStore>,
        approvals: Arc<dyn ApprovalStore>,
        submissions: Arc<dyn SubmissionStore>,
        executor: Arc<dyn CodeExecutor>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                questions,
                approvals,
                submissions,
                executor,
                sessions: SessionManager::new(),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn questions(&self) -> &Arc<dyn QuestionStore> {
        &self.inner.questions
    }

    pub(crate) fn approvals(&self) -> &Arc<dyn ApprovalStore> {
        &self.inner.approvals
    }

    pub(crate) fn submissions(&self) -> &Arc<dyn SubmissionStore> {
        &self.inner.submissions
    }

    pub(crate) fn executor(&self) -> &Arc<dyn CodeExecutor> {
        &self.inner.executor
    }

    pub(crate) fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }
}
