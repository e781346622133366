//! `reqwest` adapters for every collaborator port.

mod wire;

use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use quiz_core::model::{
    ApiSettings, ApiSettingsDraft, DatasetId, Feedback, GradeResult, Question,
    SubmissionEntry,
};

use crate::collaborators::{
    AnswerChecker, Grader, GradingBackend, KeyStatus, QuestionStore, RequestScope, Scoped,
    SetRegistry,
};
use crate::error::CollaboratorError;
use wire::{AnswerResult, ApiKeyPayload, KeyStatusRecord, QuestionRecord, SetItem};

/// Header carrying the selected dataset on every scoped request.
pub const DATASET_HEADER: &str = "X-DB-SET";

/// Environment-driven API settings.
#[derive(Clone, Debug, Default)]
pub struct HttpConfig;

impl HttpConfig {
    /// Read `QUIZ_API_BASE_URL` and `QUIZ_API_TIMEOUT_SECS` into an
    /// unvalidated draft. Unset variables fall back to defaults on `validate`;
    /// a non-numeric timeout is kept as zero so validation rejects it.
    #[must_use]
    pub fn from_env() -> ApiSettingsDraft {
        let base_url = env::var("QUIZ_API_BASE_URL").ok();
        let call_timeout_secs = env::var("QUIZ_API_TIMEOUT_SECS")
            .ok()
            .map(|raw| raw.trim().parse::<u64>().unwrap_or(0));
        ApiSettingsDraft {
            base_url,
            call_timeout_secs,
        }
    }
}

/// One client for the whole backend: registry, store, checker, grader and
/// the AI-grading config endpoints.
#[derive(Clone)]
pub struct HttpCollaborators {
    client: Client,
    settings: ApiSettings,
}

impl HttpCollaborators {
    /// Build a client whose requests time out after the configured limit.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Http` if the TLS backend cannot start.
    pub fn new(settings: ApiSettings) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(settings.call_timeout())
            .build()?;
        Ok(Self { client, settings })
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, CollaboratorError> {
        self.settings.endpoint(segments).ok_or_else(|| {
            CollaboratorError::Unavailable(format!(
                "base URL {} cannot carry a path",
                self.settings.base_url()
            ))
        })
    }

    fn scoped(&self, builder: RequestBuilder, scope: &RequestScope) -> RequestBuilder {
        builder.header(DATASET_HEADER, scope.dataset.as_str())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CollaboratorError> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, url = %response.url(), "backend returned an error status");
            return Err(CollaboratorError::HttpStatus(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SetRegistry for HttpCollaborators {
    async fn list(&self) -> Result<Vec<DatasetId>, CollaboratorError> {
        let response = self.client.get(self.url(&["api", "sets"])?).send().await?;
        let items: Vec<SetItem> = Self::read_json(response).await?;
        items
            .into_iter()
            .map(|item| {
                DatasetId::parse(item.name)
                    .map_err(|err| CollaboratorError::Malformed(err.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl QuestionStore for HttpCollaborators {
    async fn fetch(
        &self,
        scope: &RequestScope,
    ) -> Result<Scoped<Vec<Question>>, CollaboratorError> {
        let url = self.url(&["api", "questions", scope.subject.as_str()])?;
        tracing::debug!(%url, dataset = %scope.dataset, "fetching questions");
        let response = self.scoped(self.client.get(url), scope).send().await?;
        let records: Vec<QuestionRecord> = Self::read_json(response).await?;
        let questions = records
            .into_iter()
            .map(QuestionRecord::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Scoped::new(scope.clone(), questions))
    }
}

#[async_trait]
impl AnswerChecker for HttpCollaborators {
    async fn check(
        &self,
        scope: &RequestScope,
        entry: &SubmissionEntry,
    ) -> Result<Scoped<Feedback>, CollaboratorError> {
        let url = self.url(&["api", "check-answer", scope.subject.as_str()])?;
        let response = self
            .scoped(self.client.post(url), scope)
            .json(entry)
            .send()
            .await?;
        let result: AnswerResult = Self::read_json(response).await?;
        Ok(Scoped::new(scope.clone(), result.into_feedback()))
    }
}

#[async_trait]
impl Grader for HttpCollaborators {
    async fn grade(
        &self,
        scope: &RequestScope,
        entries: &[SubmissionEntry],
    ) -> Result<Scoped<Vec<GradeResult>>, CollaboratorError> {
        let url = self.url(&["api", "submit", scope.subject.as_str()])?;
        let response = self
            .scoped(self.client.post(url), scope)
            .json(entries)
            .send()
            .await?;
        let results: Vec<AnswerResult> = Self::read_json(response).await?;
        let results = results
            .into_iter()
            .map(AnswerResult::into_grade_result)
            .collect();
        Ok(Scoped::new(scope.clone(), results))
    }
}

#[async_trait]
impl GradingBackend for HttpCollaborators {
    async fn key_status(&self) -> Result<KeyStatus, CollaboratorError> {
        let url = self.url(&["api", "config", "status"])?;
        let response = self.client.get(url).send().await?;
        let record: KeyStatusRecord = Self::read_json(response).await?;
        Ok(record.into())
    }

    async fn set_api_key(&self, key: &str) -> Result<KeyStatus, CollaboratorError> {
        let url = self.url(&["api", "config", "gemini"])?;
        let response = self
            .client
            .post(url)
            .json(&ApiKeyPayload { api_key: key })
            .send()
            .await?;
        let record: KeyStatusRecord = Self::read_json(response).await?;
        Ok(record.into())
    }

    async fn clear_api_key(&self) -> Result<KeyStatus, CollaboratorError> {
        let url = self.url(&["api", "config", "gemini", "clear"])?;
        let response = self.client.post(url).send().await?;
        let record: KeyStatusRecord = Self::read_json(response).await?;
        Ok(record.into())
    }
}
