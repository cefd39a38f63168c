//! Provider API client with retry logic.
//!
//! This module provides:
//! - HTTP client for the provider file, fine-tuning, and completion APIs
//! - Retry logic with exponential backoff for retryable failures
//! - Response status triage into [`ProviderError`]

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::config::{ClientConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use super::types::{
    ChatMessage, ChatRequest, ChatResponse, CreateJobRequest, FileHandle, FineTuneJob,
};
use crate::error::ProviderError;
use crate::traits::ProviderClient;

/// Purpose value attached to training-file uploads.
const UPLOAD_PURPOSE: &str = "fine-tune";

/// Provider API client.
#[derive(Debug)]
pub struct ProviderHttpClient {
    client: Client,
    api_key: String,
    config: ClientConfig,
}

impl ProviderHttpClient {
    /// Create a new provider client.
    pub fn new(api_key: impl Into<String>, config: ClientConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ProviderError::Network {
                    message: format!("Failed to create HTTP client: {e}"),
                })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create a client with default configuration.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(api_key, ClientConfig::default())
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload serialized training data, receiving a file handle.
    pub async fn upload_training_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<FileHandle, ProviderError> {
        self.execute_with_retry("upload_training_file", || {
            self.upload_once(&bytes, filename)
        })
        .await
    }

    /// Request a fine-tune job referencing an uploaded file.
    pub async fn create_fine_tune_job(
        &self,
        base_model: &str,
        training_file_id: &str,
    ) -> Result<FineTuneJob, ProviderError> {
        let request = CreateJobRequest {
            model: base_model.to_string(),
            training_file: training_file_id.to_string(),
        };
        self.execute_with_retry("create_fine_tune_job", || self.create_job_once(&request))
            .await
    }

    /// Fetch the current state of a fine-tune job.
    pub async fn get_fine_tune_job(&self, job_id: &str) -> Result<FineTuneJob, ProviderError> {
        self.execute_with_retry("get_fine_tune_job", || self.get_job_once(job_id))
            .await
    }

    /// Generate text from a chat-style prompt pair.
    pub async fn chat_completion(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        self.execute_with_retry("chat_completion", || self.chat_once(&request))
            .await
    }

    /// Execute an operation with bounded retries and exponential backoff.
    ///
    /// Non-retryable errors return immediately; retryable errors are
    /// retried up to the configured ceiling.
    async fn execute_with_retry<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt_fn: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;
        let mut delay = self.config.retry_delay_ms;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(operation, attempt, delay_ms = delay, "Retrying provider request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = delay.saturating_mul(2);
            }

            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    tracing::warn!(operation, error = %e, attempt, "Retryable provider error");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Network {
            message: "Unknown error after retries".to_string(),
        }))
    }

    /// Execute a single upload attempt.
    ///
    /// The multipart form is rebuilt per attempt; `reqwest` forms are
    /// consumed on send.
    async fn upload_once(&self, bytes: &[u8], filename: &str) -> Result<FileHandle, ProviderError> {
        let url = format!("{}/files", self.config.base_url);

        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/jsonl")
            .map_err(|e| ProviderError::UnexpectedResponse {
                message: format!("Invalid upload part: {e}"),
            })?;
        let form = Form::new().text("purpose", UPLOAD_PURPOSE).part("file", part);

        tracing::debug!(url = %url, bytes = bytes.len(), "Uploading training file");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse {
                message: format!("Failed to parse file response: {e}"),
            })
    }

    /// Execute a single job-creation attempt.
    async fn create_job_once(
        &self,
        request: &CreateJobRequest,
    ) -> Result<FineTuneJob, ProviderError> {
        let url = format!("{}/fine_tuning/jobs", self.config.base_url);

        tracing::debug!(
            url = %url,
            model = %request.model,
            training_file = %request.training_file,
            "Creating fine-tune job"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse {
                message: format!("Failed to parse job response: {e}"),
            })
    }

    /// Execute a single job-retrieval attempt.
    async fn get_job_once(&self, job_id: &str) -> Result<FineTuneJob, ProviderError> {
        let url = format!("{}/fine_tuning/jobs/{job_id}", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse {
                message: format!("Failed to parse job response: {e}"),
            })
    }

    /// Execute a single chat-completion attempt.
    async fn chat_once(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        tracing::debug!(url = %url, model = %request.model, "Requesting chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let response = Self::check_status(response).await?;
        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::UnexpectedResponse {
                    message: format!("Failed to parse completion response: {e}"),
                })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                message: "No choices in completion response".to_string(),
            })
    }

    /// Map a reqwest send error into a [`ProviderError`].
    fn map_send_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            ProviderError::Network {
                message: error.to_string(),
            }
        }
    }

    /// Triage an HTTP status into success or a typed error.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 401 {
            return Err(ProviderError::AuthenticationFailed);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_seconds: retry_after,
            });
        }

        if status.is_server_error() {
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
            });
        }

        // Remaining 4xx: the provider rejected the request itself
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Rejected {
            message: format!("Status {status}: {body}"),
        })
    }
}

#[async_trait]
impl ProviderClient for ProviderHttpClient {
    async fn upload_training_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<FileHandle, ProviderError> {
        Self::upload_training_file(self, bytes, filename).await
    }

    async fn create_fine_tune_job(
        &self,
        base_model: &str,
        training_file_id: &str,
    ) -> Result<FineTuneJob, ProviderError> {
        Self::create_fine_tune_job(self, base_model, training_file_id).await
    }

    async fn get_fine_tune_job(&self, job_id: &str) -> Result<FineTuneJob, ProviderError> {
        Self::get_fine_tune_job(self, job_id).await
    }

    async fn chat_completion(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        Self::chat_completion(self, model, system_prompt, user_prompt).await
    }
}
