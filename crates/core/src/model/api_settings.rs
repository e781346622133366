use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default per-call timeout for collaborator requests.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the quiz backend lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiSettings {
    base_url: Url,
    call_timeout: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct ApiSettingsDraft {
    pub base_url: Option<String>,
    pub call_timeout_secs: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiSettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("call timeout must be at least one second")]
    ZeroTimeout,
}

impl ApiSettingsDraft {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000";

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `ApiSettingsError` if the base URL does not parse or the
    /// timeout is zero.
    pub fn validate(self) -> Result<ApiSettings, ApiSettingsError> {
        let raw = self
            .base_url
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        let base_url =
            Url::parse(&raw).map_err(|_| ApiSettingsError::InvalidBaseUrl(raw.clone()))?;

        let call_timeout = match self.call_timeout_secs {
            Some(0) => return Err(ApiSettingsError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_CALL_TIMEOUT,
        };

        Ok(ApiSettings {
            base_url,
            call_timeout,
        })
    }
}

impl ApiSettings {
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Absolute URL for the given path segments, percent-encoding each one.
    ///
    /// Returns `None` when the base URL cannot carry a path (e.g. `mailto:`).
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments);
        Some(url)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(ApiSettingsDraft::DEFAULT_BASE_URL)
                .expect("default base URL should be valid"),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}
