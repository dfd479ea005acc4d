use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::exam::templates::Language;

/// Shown when the service answered but produced no usable output.
pub(crate) const NO_OUTPUT_MESSAGE: &str = "Execution failed or produced no output.";

/// Shown in place of output when the service could not be reached at all.
pub(crate) const CONNECTION_ERROR_MESSAGE: &str =
    "Error: Could not connect to the execution server.";

#[derive(Debug, Error)]
pub(crate) enum ExecutionError {
    #[error("execution service request failed: {0}")]
    Transport(String),
}

/// Runs one piece of source code against the remote execution service.
/// Implementations return trimmed standard output; `Err` is reserved for
/// transport-level failures and is never surfaced to students as a fault.
#[async_trait]
pub(crate) trait CodeExecutor: Send + Sync {
    async fn execute(
        &self,
        source: &str,
        language: Language,
        stdin: &str,
    ) -> Result<String, ExecutionError>;
}

#[derive(Debug, Clone)]
pub(crate) struct ExecutionClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl ExecutionClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.executor().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build execution service HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.executor().base_url.trim_end_matches('/').to_string(),
            client_id: settings.executor().client_id.clone(),
            client_secret: settings.executor().client_secret.clone(),
        })
    }
}

#[async_trait]
impl CodeExecutor for ExecutionClient {
    async fn execute(
        &self,
        source: &str,
        language: Language,
        stdin: &str,
    ) -> Result<String, ExecutionError> {
        let payload = json!({
            "clientId": self.client_id,
            "clientSecret": self.client_secret,
            "script": source,
            "language": language.execution_id(),
            "versionIndex": language.version_index(),
            "stdin": stdin,
        });

        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| ExecutionError::Transport(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| ExecutionError::Transport(format!("non-JSON body: {err}")))?;

        if !status.is_success() {
            return Err(ExecutionError::Transport(format!(
                "status {status}: {}",
                extract_error_message(&body)
            )));
        }

        Ok(extract_output(&body))
    }
}

fn extract_output(payload: &Value) -> String {
    match payload.get("output").and_then(Value::as_str).map(str::trim) {
        Some(output) if !output.is_empty() => output.to_string(),
        _ => NO_OUTPUT_MESSAGE.to_string(),
    }
}

fn extract_error_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_output_trims_whitespace() {
        assert_eq!(extract_output(&json!({"output": " 5\n"})), "5");
    }

    #[test]
    fn extract_output_handles_absent_or_empty_output() {
        assert_eq!(extract_output(&json!({})), NO_OUTPUT_MESSAGE);
        assert_eq!(extract_output(&json!({"output": ""})), NO_OUTPUT_MESSAGE);
        assert_eq!(extract_output(&json!({"output": "   "})), NO_OUTPUT_MESSAGE);
        assert_eq!(extract_output(&json!({"output": null})), NO_OUTPUT_MESSAGE);
    }

    #[test]
    fn extract_error_message_falls_back() {
        assert_eq!(extract_error_message(&json!({"message": "quota exceeded"})), "quota exceeded");
        assert_eq!(extract_error_message(&json!({"error": "boom"})), "boom");
        assert_eq!(extract_error_message(&json!({})), "unknown_error");
    }
}
