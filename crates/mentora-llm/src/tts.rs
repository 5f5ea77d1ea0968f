use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::instrument;

use mentora_core::errors::CollaboratorError;
use mentora_core::provider::SpeechSynthesizer;
use mentora_core::voice::Voice;
use mentora_settings::SpeechSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Cloud Text-to-Speech, LINEAR16 output.
pub struct GoogleSpeech {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    language_code: String,
    sample_rate_hertz: u32,
}

impl GoogleSpeech {
    pub fn new(settings: &SpeechSettings) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
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
            language_code: settings.language_code.clone(),
            sample_rate_hertz: settings.sample_rate_hertz,
        })
    }

    fn request_body(&self, text: &str, voice: Voice) -> Value {
        json!({
            "input": {"text": text},
            "voice": {"languageCode": self.language_code, "name": voice.voice_name()},
            "audioConfig": {"audioEncoding": "LINEAR16", "sampleRateHertz": self.sample_rate_hertz},
        })
    }
}

/// Decode the `audioContent` field of a synthesis response.
fn decode_audio(response: &Value) -> Result<Bytes, CollaboratorError> {
    let encoded = response["audioContent"]
        .as_str()
        .ok_or_else(|| CollaboratorError::MalformedResponse("missing audioContent".into()))?;
    STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| CollaboratorError::MalformedResponse(format!("audioContent: {e}")))
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    #[instrument(skip_all, fields(voice = voice.voice_name(), chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Bytes, CollaboratorError> {
        if text.trim().is_empty() {
            return Ok(Bytes::new());
        }
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| CollaboratorError::NotConfigured("speech API key".into()))?;

        let resp = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .header("x-goog-api-key", key.expose_secret())
            .json(&self.request_body(text, voice))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(REQUEST_TIMEOUT)
                } else {
                    CollaboratorError::NetworkError(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::from_status(status, body));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;
        decode_audio(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech(key: Option<&str>) -> GoogleSpeech {
        GoogleSpeech::new(&SpeechSettings {
            api_key: key.map(String::from),
            ..SpeechSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn request_body_uses_voice_and_format() {
        let body = speech(Some("k")).request_body("Selamat pagi", Voice::Aoede);
        assert_eq!(body["input"]["text"], "Selamat pagi");
        assert_eq!(body["voice"]["languageCode"], "id-ID");
        assert_eq!(body["voice"]["name"], "id-ID-Chirp3-HD-Aoede");
        assert_eq!(body["audioConfig"]["audioEncoding"], "LINEAR16");
        assert_eq!(body["audioConfig"]["sampleRateHertz"], 24_000);
    }

    #[test]
    fn decode_audio_reads_base64() {
        let audio = decode_audio(&json!({"audioContent": "UklGRg=="})).unwrap();
        assert_eq!(&audio[..], b"RIFF");
        assert!(decode_audio(&json!({})).is_err());
        assert!(decode_audio(&json!({"audioContent": "***"})).is_err());
    }

    #[tokio::test]
    async fn blank_text_yields_no_audio() {
        let audio = speech(None).synthesize("   ", Voice::Achird).await.unwrap();
        assert!(audio.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let err = speech(None).synthesize("Halo", Voice::Achird).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::NotConfigured(_)));
    }
}
