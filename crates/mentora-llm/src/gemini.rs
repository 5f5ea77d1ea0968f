use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use mentora_core::errors::CollaboratorError;
use mentora_core::provider::{ReplyGenerator, ReplyRequest, ScoreBreakdown, Scorer};
use mentora_settings::LlmSettings;

use crate::converter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

pub const EXAMINER_PROMPT: &str = include_str!("../prompts/examiner.txt");
pub const SCORER_PROMPT: &str = include_str!("../prompts/scorer.txt");

/// Gemini REST client. One instance serves both examiner replies and
/// scoring, each on its own model.
pub struct GeminiClient {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    reply_model: String,
    scoring_model: String,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, CollaboratorError> {
        let request_timeout = Duration::from_secs(settings.request_timeout_secs);
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| CollaboratorError::NetworkError(format!("http client: {e}")))?;

        Ok(Self {
            client,
            api_key: settings
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            reply_model: settings.reply_model.clone(),
            scoring_model: settings.scoring_model.clone(),
            request_timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, CollaboratorError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| CollaboratorError::NotConfigured("Kunci API Gemini belum dikonfigurasi.".into()))?;

        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::from_status(status, body));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> CollaboratorError {
        if e.is_timeout() {
            CollaboratorError::Timeout(self.request_timeout)
        } else {
            CollaboratorError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip_all, fields(model = %self.reply_model, turns = request.history.len()))]
    async fn generate(&self, request: &ReplyRequest) -> Result<String, CollaboratorError> {
        let body = converter::build_reply_body(request, EXAMINER_PROMPT);
        let response = self.generate_content(&self.reply_model, &body).await?;
        let text = converter::speakable(&converter::extract_text(&response)?);
        debug!(chars = text.chars().count(), "examiner reply generated");
        Ok(text)
    }
}

#[async_trait]
impl Scorer for GeminiClient {
    #[instrument(skip_all, fields(model = %self.scoring_model))]
    async fn score(&self, transcript: &str) -> Result<ScoreBreakdown, CollaboratorError> {
        let body = converter::build_scoring_body(transcript, SCORER_PROMPT);
        let response = self.generate_content(&self.scoring_model, &body).await?;
        converter::parse_score(&converter::extract_text(&response)?)
    }
}
