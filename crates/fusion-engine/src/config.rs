use std::env;
use std::time::Duration;

pub const API_KEY_ENV: &str = "API_KEY";
pub const API_BASE_ENV: &str = "GEMINI_API_BASE";
pub const MODEL_ENV: &str = "FUSION_IMAGE_MODEL";
pub const TIMEOUT_ENV: &str = "FUSION_REQUEST_TIMEOUT";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 15.0;
const MAX_TIMEOUT_S: f64 = 300.0;

/// Runtime settings for the generation client.
///
/// Only the credential is required, and its absence is reported when a
/// generation is attempted rather than at startup.
#[derive(Clone, PartialEq)]
pub struct FusionConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_timeout_s: f64,
}

impl std::fmt::Debug for FusionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout_s", &self.request_timeout_s)
            .finish()
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_s: DEFAULT_TIMEOUT_S,
        }
    }
}

impl FusionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_key: read(API_KEY_ENV),
            api_base: read(API_BASE_ENV)
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            model: read(MODEL_ENV).unwrap_or(defaults.model),
            request_timeout_s: read(TIMEOUT_ENV)
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .map(|value| value.clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S))
                .unwrap_or(defaults.request_timeout_s),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_s)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
