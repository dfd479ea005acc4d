use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::stores::types::{QuestionDoc, StudentRecord, SubmissionDoc};
use crate::stores::{ApprovalStore, QuestionStore, StoreError, SubmissionStore};

/// REST client for the portal's document store. One client backs all three
/// collections: questions, students, and exam submissions.
#[derive(Debug, Clone)]
pub(crate) struct DocumentStoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DocumentStoreClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.store().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build document store HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.store().base_url.trim_end_matches('/').to_string(),
            api_key: settings.store().api_key.clone(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| StoreError::Malformed(format!("non-JSON body: {err}")))?;

        if !status.is_success() {
            return Err(StoreError::Transport(format!(
                "status {status}: {}",
                extract_error_message(&body)
            )));
        }

        Ok(body)
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<(), StoreError> {
        let response = request
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|err| StoreError::Transport(format!("{context}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(StoreError::Transport(format!(
                "{context}: status {status}: {}",
                extract_error_message(&body)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl QuestionStore for DocumentStoreClient {
    async fn list_ordered(&self) -> Result<Vec<QuestionDoc>, StoreError> {
        let body = self.get_json("/questions", &[("order", "createdAt")]).await?;
        parse_document_list(&body)
    }
}

#[async_trait]
impl ApprovalStore for DocumentStoreClient {
    async fn find_student(
        &self,
        name: &str,
        register_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let body = self
            .get_json("/students", &[("name", name), ("registerNumber", register_number)])
            .await?;
        let records: Vec<StudentRecord> = parse_document_list(&body)?;
        Ok(records.into_iter().next())
    }

    async fn mark_completed(&self, student_id: &str) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(format!("{}/students/{}", self.base_url, student_id))
            .json(&json!({"status": "completed"}));
        self.send_json(request, "update student status").await
    }
}

#[async_trait]
impl SubmissionStore for DocumentStoreClient {
    async fn append(&self, record: SubmissionDoc) -> Result<(), StoreError> {
        let request =
            self.client.post(format!("{}/examSubmissions", self.base_url)).json(&record);
        self.send_json(request, "append exam submission").await
    }
}

/// Accepts both a bare JSON array and the `{"items": [...]}` envelope some
/// store deployments return.
fn parse_document_list<T: serde::de::DeserializeOwned>(body: &Value) -> Result<Vec<T>, StoreError> {
    let items = match body {
        Value::Array(_) => body,
        Value::Object(map) => map
            .get("items")
            .filter(|value| value.is_array())
            .ok_or_else(|| StoreError::Malformed("expected a document list".to_string()))?,
        _ => return Err(StoreError::Malformed("expected a document list".to_string())),
    };

    serde_json::from_value(items.clone()).map_err(|err| StoreError::Malformed(err.to_string()))
}

fn extract_error_message(payload: &Value) -> String {
    payload
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_list_accepts_bare_array() {
        let body = json!([{"id": "q-1", "title": "Sum"}]);
        let docs: Vec<QuestionDoc> = parse_document_list(&body).expect("docs");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "q-1");
    }

    #[test]
    fn parse_document_list_accepts_items_envelope() {
        let body = json!({"items": [{"id": "s-1", "status": "approved"}]});
        let records: Vec<StudentRecord> = parse_document_list(&body).expect("records");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn parse_document_list_rejects_scalars() {
        let result: Result<Vec<QuestionDoc>, _> = parse_document_list(&json!("nope"));
        assert!(matches!(result, Err(StoreError::Malformed(_))));
    }

    #[test]
    fn extract_error_message_prefers_detail() {
        let payload = json!({"detail": "bad request", "message": "other"});
        assert_eq!(extract_error_message(&payload), "bad request");
        assert_eq!(extract_error_message(&json!({})), "unknown_error");
    }
}
