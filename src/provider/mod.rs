//! Fine-tuning provider integration.
//!
//! This module provides:
//! - [`ProviderHttpClient`]: HTTP client for the provider file, fine-tuning,
//!   and completion APIs
//! - [`ClientConfig`]: client configuration with builder methods
//! - Request/response types for uploads, jobs, and completions
//!
//! The wire protocol is the OpenAI-style REST API: multipart file upload,
//! JSON fine-tune job creation and retrieval, and chat completions.

mod client;
mod config;
mod types;

pub use client::ProviderHttpClient;
pub use config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOKENS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_MS,
};
pub use types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, CreateJobRequest, FileHandle, FineTuneJob,
    JobStatus,
};
