use dotenvy::Error as DotenvError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001,http://localhost:3002,http://127.0.0.1:3000,http://127.0.0.1:3001,http://127.0.0.1:3002";
/// Rough USD cost of one generated quiz, echoed by the usage endpoint.
pub const ESTIMATED_COST_PER_QUIZ: f64 = 0.001;

const API_KEY_PREFIX: &str = "sk-";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("invalid listen address {0:?}")]
    Address(String),
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Process-wide settings, read once at start-up and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub sampling: SamplingParams,
    pub base_url: String,
    pub request_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            sampling: SamplingParams {
                model: DEFAULT_MODEL.to_string(),
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: DEFAULT_TEMPERATURE,
            },
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Loads `.env.local` and `.env`, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let allowed_origins = value("ALLOWED_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or(defaults.allowed_origins);

        Ok(Self {
            api_key: value("OPENAI_API_KEY"),
            sampling: SamplingParams {
                model: value("OPENAI_MODEL").unwrap_or(defaults.sampling.model),
                max_tokens: parse_or("OPENAI_MAX_TOKENS", value("OPENAI_MAX_TOKENS"), "integer")?
                    .unwrap_or(defaults.sampling.max_tokens),
                temperature: parse_or("OPENAI_TEMPERATURE", value("OPENAI_TEMPERATURE"), "number")?
                    .unwrap_or(defaults.sampling.temperature),
            },
            base_url: value("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            request_timeout: parse_or("REQUEST_TIMEOUT_SECS", value("REQUEST_TIMEOUT_SECS"), "integer")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            allowed_origins,
            host: value("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", value("PORT"), "port number")?.unwrap_or(defaults.port),
        })
    }

    /// Whether any credential was supplied, usable or not.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// The credential, if it looks like an OpenAI secret key.
    pub fn usable_api_key(&self) -> Option<&str> {
        match self.api_key.as_deref() {
            Some(key) if key.starts_with(API_KEY_PREFIX) => Some(key),
            Some(_) => {
                warn!("OPENAI_API_KEY does not look like an OpenAI key; using fallback quizzes");
                None
            }
            None => None,
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Address(raw))
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value,
        })
    })
    .transpose()
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_env_files() {
    fn load(file: &str) {
        match dotenvy::from_filename(file) {
            Ok(_) => {}
            Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => eprintln!("Warning: unable to load {file}: {err}"),
        }
    }

    load(".env.local");
    load(".env");
}
