use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        })
    }
}

impl Environment {
    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub port: u16,

    // Gemini
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,

    // Limits
    pub generation_timeout_seconds: u64,
    pub http_timeout_seconds: u64,
    pub max_image_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            port: 8080,
            gemini_api_key: DEMO_KEY.to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            generation_timeout_seconds: 120, // both stages together
            http_timeout_seconds: 60,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let settings = Settings {
            env: parse_or("APP_ENV", non_empty("APP_ENV"), defaults.env)?,
            port: parse_or("PORT", non_empty("PORT"), defaults.port)?,
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or(defaults.gemini_api_key),
            gemini_api_base: non_empty("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            generation_timeout_seconds: parse_or(
                "GENERATION_TIMEOUT_SECONDS",
                non_empty("GENERATION_TIMEOUT_SECONDS"),
                defaults.generation_timeout_seconds,
            )?,
            http_timeout_seconds: parse_or("HTTP_TIMEOUT_SECONDS", non_empty("HTTP_TIMEOUT_SECONDS"), defaults.http_timeout_seconds)?,
            max_image_bytes: parse_or("MAX_IMAGE_BYTES", non_empty("MAX_IMAGE_BYTES"), defaults.max_image_bytes)?,
        };

        // a zero deadline would time out every submission
        anyhow::ensure!(
            settings.generation_timeout_seconds > 0,
            "GENERATION_TIMEOUT_SECONDS must be greater than zero"
        );

        Ok(settings)
    }

    /// No real key configured: serve canned results instead of calling Gemini.
    pub fn demo_mode(&self) -> bool {
        self.gemini_api_key == DEMO_KEY
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse().with_context(|| format!("{key} has an invalid value: {v}")),
        None => Ok(default),
    }
}
