// src/config/mod.rs
// Runtime configuration loaded from the environment (and .env if present)

use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PlexusError, Result};
use crate::llm::{Credentials, GenerationConfig, ProviderKind};

/// A selectable model and the provider serving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: ProviderKind,
}

pub const AVAILABLE_MODELS: &[ModelOption] = &[
    ModelOption { id: "gpt-4o", name: "GPT-4o", provider: ProviderKind::OpenAi },
    ModelOption { id: "gemini-3-flash-preview", name: "Gemini 3 Flash Preview", provider: ProviderKind::Google },
    ModelOption { id: "gemini-2.5-pro", name: "Gemini 2.5 Pro", provider: ProviderKind::Google },
    ModelOption { id: "gemini-2.5-flash", name: "Gemini 2.5 Flash", provider: ProviderKind::Google },
    ModelOption { id: "gemini-2.5-flash-lite", name: "Gemini 2.5 Flash Lite", provider: ProviderKind::Google },
    ModelOption { id: "gemini-2.0-flash-exp", name: "Gemini 2.0 Flash Exp", provider: ProviderKind::Google },
];

pub fn find_model(id: &str) -> Option<&'static ModelOption> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

#[derive(Debug, Clone)]
pub struct PlexusConfig {
    // ── Credentials
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,

    // ── Generation
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub top_k: u32,
    pub auto_summarize: bool,

    // ── Endpoints
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub request_timeout_secs: u64,

    // ── Logging
    pub log_level: String,
}

/// Per-invocation settings layered over the environment (CLI flags)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    /// Can only switch summaries on; the environment default stands otherwise
    pub summarize: bool,
}

impl Default for PlexusConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Parse a raw value, dropping trailing `# comments` and whitespace.
/// Falls back to `default` when the value is missing or unparseable.
fn value_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
{
    let Some(val) = raw else {
        return default;
    };
    let clean_val = val.split('#').next().unwrap_or("").trim();
    match clean_val.parse::<T>() {
        Ok(parsed) => {
            debug!("Config: {} = {} (from environment)", key, clean_val);
            parsed
        }
        Err(_) => {
            warn!("Config: {} = '{}' (parse failed, using default)", key, val);
            default
        }
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl PlexusConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            debug!(".env file not found, using process environment and defaults");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; used by `from_env` and by tests
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            openai_api_key: non_empty(lookup("OPENAI_API_KEY")),
            google_api_key: non_empty(lookup("GOOGLE_API_KEY")).or_else(|| non_empty(lookup("GEMINI_API_KEY"))),
            model: value_or("PLEXUS_MODEL", lookup("PLEXUS_MODEL"), "gemini-2.5-flash".to_string()),
            system_prompt: non_empty(lookup("PLEXUS_SYSTEM_PROMPT")),
            temperature: value_or("PLEXUS_TEMPERATURE", lookup("PLEXUS_TEMPERATURE"), 0.7),
            top_k: value_or("PLEXUS_TOP_K", lookup("PLEXUS_TOP_K"), 40),
            auto_summarize: value_or("PLEXUS_AUTO_SUMMARIZE", lookup("PLEXUS_AUTO_SUMMARIZE"), true),
            openai_base_url: value_or(
                "OPENAI_BASE_URL",
                lookup("OPENAI_BASE_URL"),
                crate::llm::provider::OPENAI_BASE_URL.to_string(),
            ),
            gemini_base_url: value_or(
                "GEMINI_BASE_URL",
                lookup("GEMINI_BASE_URL"),
                crate::llm::provider::GEMINI_BASE_URL.to_string(),
            ),
            request_timeout_secs: value_or("PLEXUS_REQUEST_TIMEOUT", lookup("PLEXUS_REQUEST_TIMEOUT"), 120),
            log_level: value_or("PLEXUS_LOG", lookup("PLEXUS_LOG"), "info".to_string()),
        }
    }

    /// Layer explicit overrides on top. Unlike the environment, an explicit
    /// model must exist in the catalog.
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(model) = overrides.model {
            let option = find_model(&model).ok_or(PlexusError::UnknownModel(model))?;
            self.model = option.id.to_string();
        }
        if let Some(system_prompt) = non_empty(overrides.system_prompt) {
            self.system_prompt = Some(system_prompt);
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(top_k) = overrides.top_k {
            self.top_k = top_k;
        }
        self.auto_summarize |= overrides.summarize;
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PlexusError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.top_k == 0 {
            return Err(PlexusError::Config("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Configured model, or the first catalog entry if the id is unknown
    pub fn selected_model(&self) -> &'static ModelOption {
        find_model(&self.model).unwrap_or_else(|| {
            warn!("Unknown model '{}', falling back to {}", self.model, AVAILABLE_MODELS[0].id);
            &AVAILABLE_MODELS[0]
        })
    }

    pub fn generation_config(&self) -> GenerationConfig {
        let model = self.selected_model();
        GenerationConfig {
            provider: model.provider,
            model: model.id.to_string(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            top_k: self.top_k,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            openai: self.openai_api_key.clone(),
            google: self.google_api_key.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
