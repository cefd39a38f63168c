//! Report-section generation.
//!
//! Resolves the current model through the registry read path and calls
//! the provider completion API with the fixed forensic-report prompt.
//! A missing or unreachable registry degrades to the default base model
//! with a logged warning; generation never fails because of it.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::storage::SqliteStorage;
use crate::training::SYSTEM_INSTRUCTION;
use crate::traits::ProviderClient;

/// A generated report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    /// Section name the text was generated for.
    pub section: String,
    /// The generated text.
    pub content: String,
    /// Model that produced it.
    pub model_id: String,
}

/// Section generation service.
#[derive(Clone)]
pub struct GenerateService {
    storage: SqliteStorage,
    provider: Arc<dyn ProviderClient>,
    base_model: String,
}

impl std::fmt::Debug for GenerateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateService")
            .field("base_model", &self.base_model)
            .finish_non_exhaustive()
    }
}

impl GenerateService {
    /// Create a generation service over the given storage and provider.
    #[must_use]
    pub fn new(
        storage: SqliteStorage,
        provider: Arc<dyn ProviderClient>,
        base_model: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            provider,
            base_model: base_model.into(),
        }
    }

    /// Generate the named section with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the completion call fails after
    /// retries. Registry failures do not error; they fall back to the
    /// default base model.
    pub async fn generate(
        &self,
        section: &str,
        context: &str,
    ) -> Result<GeneratedSection, ProviderError> {
        let model_id = self.storage.current_model_or(&self.base_model).await;

        let user_prompt = format!(
            "Generate the \"{section}\" section for a forensic engineering report \
             with the following context: {context}"
        );

        tracing::debug!(section, model_id = %model_id, "Generating report section");

        let content = self
            .provider
            .chat_completion(&model_id, SYSTEM_INSTRUCTION, &user_prompt)
            .await
            .inspect_err(|e| {
                tracing::error!(section, error = %e, "Section generation failed");
            })?;

        Ok(GeneratedSection {
            section: section.to_string(),
            content,
            model_id,
        })
    }
}
