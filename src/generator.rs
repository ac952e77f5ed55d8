//! Quiz generation with a fallback to the static catalog.
//!
//! A generator either has a provider or it does not. Without one, every
//! request is answered from [`crate::fallback`] without touching the network.
//! With one, a single completion is attempted; any failure (including a
//! timeout) falls back to the catalog. There are no retries.

use crate::config::{SamplingParams, Settings};
use crate::fallback::{fallback_quiz_for, fallback_rule_name};
use crate::parser::parse_quiz_report;
use crate::prompt::build_prompt;
use crate::provider::{OpenAiProvider, ProviderError, TextProvider};
use crate::quiz::{Quiz, QuizRequest, QuizSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuiz {
    pub quiz: Quiz,
    pub source: QuizSource,
}

#[derive(Clone)]
pub struct QuizGenerator {
    provider: Option<Arc<dyn TextProvider>>,
    sampling: SamplingParams,
    timeout: Duration,
}

impl QuizGenerator {
    pub fn new(
        provider: Option<Arc<dyn TextProvider>>,
        sampling: SamplingParams,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            sampling,
            timeout,
        }
    }

    /// A generator that always serves catalog quizzes.
    pub fn fallback_only(settings: &Settings) -> Self {
        Self::new(None, settings.sampling.clone(), settings.request_timeout)
    }

    /// Wires the OpenAI provider when the settings carry a usable key.
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let provider = match OpenAiProvider::from_settings(settings)? {
            Some(provider) => {
                info!(model = %settings.sampling.model, "OpenAI provider configured");
                Some(Arc::new(provider) as Arc<dyn TextProvider>)
            }
            None => {
                warn!("OpenAI API key not configured; quizzes will come from the fallback catalog");
                None
            }
        };
        Ok(Self::new(
            provider,
            settings.sampling.clone(),
            settings.request_timeout,
        ))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub async fn generate(&self, request: &QuizRequest) -> GeneratedQuiz {
        let points = request.points();
        let Some(provider) = self.provider.as_deref() else {
            return fallback(request, points);
        };

        let prompt = build_prompt(
            &request.spot_name,
            &request.difficulty,
            &request.spot_description,
        );
        match self.complete(provider, &prompt).await {
            Ok(text) => {
                let parsed = parse_quiz_report(&text, points);
                if parsed.patches.any() {
                    warn!(
                        spot = %request.spot_name,
                        patches = ?parsed.patches,
                        "generated quiz needed defaults"
                    );
                }
                info!(
                    spot = %request.spot_name,
                    provider = provider.name(),
                    "quiz generated"
                );
                GeneratedQuiz {
                    quiz: parsed.quiz,
                    source: QuizSource::OpenAi,
                }
            }
            Err(err) => {
                error!(
                    spot = %request.spot_name,
                    provider = provider.name(),
                    error = %err,
                    "quiz generation failed; using fallback"
                );
                fallback(request, points)
            }
        }
    }

    async fn complete(
        &self,
        provider: &dyn TextProvider,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let call = provider.complete(prompt, &self.sampling);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map(|completion| completion.text),
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }
}

fn fallback(request: &QuizRequest, points: u32) -> GeneratedQuiz {
    info!(
        spot = %request.spot_name,
        rule = fallback_rule_name(&request.spot_name),
        "serving fallback quiz"
    );
    GeneratedQuiz {
        quiz: fallback_quiz_for(&request.spot_name, points),
        source: QuizSource::Fallback,
    }
}
