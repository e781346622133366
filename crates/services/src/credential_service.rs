use std::sync::Arc;

use crate::collaborators::{CredentialPrompt, GradingBackend, KeyStatus};
use crate::error::CredentialError;

/// What `ensure_configured` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOutcome {
    AlreadyConfigured,
    Configured,
    Skipped,
}

/// Makes sure the AI-grading backend has a key, asking the host once if not.
#[derive(Clone)]
pub struct CredentialService {
    backend: Arc<dyn GradingBackend>,
    prompt: Arc<dyn CredentialPrompt>,
}

impl CredentialService {
    #[must_use]
    pub fn new(backend: Arc<dyn GradingBackend>, prompt: Arc<dyn CredentialPrompt>) -> Self {
        Self { backend, prompt }
    }

    /// Current key status as reported by the backend.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Collaborator` if the backend is unreachable.
    pub async fn status(&self) -> Result<KeyStatus, CredentialError> {
        Ok(self.backend.key_status().await?)
    }

    /// Prompt for a key unless one is already configured.
    ///
    /// An unreachable status endpoint is treated like a missing key.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::EmptyKey` when the prompt yields a blank key,
    /// or `CredentialError::Collaborator` if storing the key fails.
    pub async fn ensure_configured(&self) -> Result<CredentialOutcome, CredentialError> {
        match self.backend.key_status().await {
            Ok(status) if status.ai_grading_enabled => {
                return Ok(CredentialOutcome::AlreadyConfigured);
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "could not read AI grading status"),
        }

        let Some(raw) = self.prompt.request_api_key().await else {
            tracing::info!("AI grading key prompt skipped");
            return Ok(CredentialOutcome::Skipped);
        };
        self.set_key(&raw).await?;
        Ok(CredentialOutcome::Configured)
    }

    /// Store `raw` (trimmed) as the AI-grading key.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::EmptyKey` for a blank key.
    pub async fn set_key(&self, raw: &str) -> Result<KeyStatus, CredentialError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        let status = self.backend.set_api_key(key).await?;
        tracing::info!(enabled = status.ai_grading_enabled, "AI grading key stored");
        Ok(status)
    }

    /// Remove the stored key.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Collaborator` if the backend rejects the call.
    pub async fn clear(&self) -> Result<KeyStatus, CredentialError> {
        let status = self.backend.clear_api_key().await?;
        tracing::info!("AI grading key cleared");
        Ok(status)
    }
}
