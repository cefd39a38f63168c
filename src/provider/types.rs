//! Request and response types for the provider API.

use serde::{Deserialize, Serialize};

/// Handle returned by the provider for an uploaded training file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileHandle {
    /// Provider-assigned file identifier.
    pub id: String,
    /// Original filename, if echoed back.
    #[serde(default)]
    pub filename: Option<String>,
    /// File size in bytes, if reported.
    #[serde(default)]
    pub bytes: Option<i64>,
}

/// Status of a provider-side fine-tune job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted and waiting to run.
    Queued,
    /// Training in progress.
    Running,
    /// Training finished; the fine-tuned model is available.
    Succeeded,
    /// Training failed.
    Failed,
    /// Any provider status this client does not model (treated as pending).
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns true if the job has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Stable string form for storage and logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// A provider-side fine-tune job descriptor.
///
/// `fine_tuned_model` is populated by the provider only once training
/// completes; at submission time it is usually absent.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FineTuneJob {
    /// Provider-assigned job identifier.
    pub id: String,
    /// Current job status.
    pub status: JobStatus,
    /// Base model the job was created against.
    pub model: String,
    /// Final fine-tuned model identifier, once available.
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
}

/// Request body for creating a fine-tune job.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    /// Base model to fine-tune.
    pub model: String,
    /// Uploaded training file id.
    pub training_file: String,
}

/// A single chat message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Message role (`system`, `user`, `assistant`).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for a chat completion.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// One completion choice in a chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChatMessage,
}

/// Response body for a chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Generated choices; the first is used.
    pub choices: Vec<ChatChoice>,
}
