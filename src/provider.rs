use crate::config::{SamplingParams, Settings};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>>;

/// Text returned by a provider for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api failure ({0}): {1}")]
    Api(StatusCode, String),
    #[error("completion did not contain any text")]
    EmptyCompletion,
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// A text-generation backend: one prompt in, generated text out.
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn complete<'a>(&'a self, prompt: &'a str, params: &'a SamplingParams) -> ProviderFuture<'a>;
}

/// Chat-completions client for the OpenAI API (or any compatible endpoint).
pub struct OpenAiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// Returns `None` when the settings carry no usable credential.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, ProviderError> {
        settings
            .usable_api_key()
            .map(|key| Self::new(key, &settings.base_url, settings.request_timeout))
            .transpose()
    }

    async fn request(&self, prompt: &str, params: &SamplingParams) -> Result<Completion, ProviderError> {
        let payload = ChatRequest::new(prompt, params);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status, detail));
        }

        let body: ChatResponse = response.json().await?;
        let completion = body.into_completion()?;
        info!(
            target: "provider",
            model = %params.model,
            tokens = completion.total_tokens,
            "completion received"
        );
        Ok(completion)
    }
}

impl TextProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete<'a>(&'a self, prompt: &'a str, params: &'a SamplingParams) -> ProviderFuture<'a> {
        Box::pin(self.request(prompt, params))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(prompt: &'a str, params: &'a SamplingParams) -> Self {
        Self {
            model: &params.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion, ProviderError> {
        let total_tokens = self.usage.map(|usage| usage.total_tokens);
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .map(|text| Completion { text, total_tokens })
            .ok_or(ProviderError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SamplingParams {
        SamplingParams {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 300,
            temperature: 0.7,
        }
    }

    #[test]
    fn chat_request_carries_sampling_params() {
        let params = params();
        let request = ChatRequest::new("prompt", &params);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["max_tokens"], 300);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "prompt");
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn response_yields_first_choice_and_usage() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"問題: Q"}}],"usage":{"total_tokens":42}}"#,
        )
        .unwrap();
        let completion = body.into_completion().unwrap();
        assert_eq!(completion.text, "問題: Q");
        assert_eq!(completion.total_tokens, Some(42));
    }

    #[test]
    fn response_without_text_is_an_error() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            body.into_completion(),
            Err(ProviderError::EmptyCompletion)
        ));
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(body.into_completion().is_err());
    }

    #[test]
    fn provider_requires_sk_prefixed_key() {
        let settings = Settings {
            api_key: Some("invalid".into()),
            ..Settings::default()
        };
        assert!(OpenAiProvider::from_settings(&settings).unwrap().is_none());

        let settings = Settings {
            api_key: Some("sk-abc".into()),
            base_url: "http://localhost:1/v1/".into(),
            ..Settings::default()
        };
        let provider = OpenAiProvider::from_settings(&settings).unwrap().unwrap();
        assert_eq!(provider.endpoint, "http://localhost:1/v1/chat/completions");
        assert_eq!(provider.name(), "openai");
    }
}
