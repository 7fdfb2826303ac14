use crate::i18n::Locale;
use crate::normalize::DEFAULT_RECORD_URL;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryBackend {
    #[default]
    Remote,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub api_base: String,
    pub analysis_endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub locale: Locale,
    pub record_url: String,
    pub history: HistoryBackend,
}

impl Settings {
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            analysis_endpoint: format!("{api_base}/analyze"),
            api_base,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            locale: Locale::default(),
            record_url: DEFAULT_RECORD_URL.to_string(),
            history: HistoryBackend::default(),
        }
    }

    /// Reads `CASE_ASSISTANT_*` variables from the environment.
    pub fn from_env() -> Result<Self> {
        let api_base = env::var("CASE_ASSISTANT_API_BASE").map_err(|_| {
            anyhow!("No backend configured. Set CASE_ASSISTANT_API_BASE to the case gateway URL")
        })?;
        let mut settings = Self::new(api_base);

        if let Ok(endpoint) = env::var("CASE_ASSISTANT_ANALYSIS_ENDPOINT") {
            settings.analysis_endpoint = endpoint;
        }
        settings.api_key = env::var("CASE_ASSISTANT_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        if let Ok(raw) = env::var("CASE_ASSISTANT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid CASE_ASSISTANT_TIMEOUT_SECS: {raw}"))?;
            settings.timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = env::var("CASE_ASSISTANT_LOCALE") {
            settings.locale = raw.parse().map_err(|e: String| anyhow!(e))?;
        }

        if let Ok(template) = env::var("CASE_ASSISTANT_RECORD_URL") {
            if !template.contains("{id}") {
                return Err(anyhow!(
                    "CASE_ASSISTANT_RECORD_URL must contain an {{id}} placeholder"
                ));
            }
            settings.record_url = template;
        }

        if let Ok(raw) = env::var("CASE_ASSISTANT_HISTORY") {
            settings.history = match raw.trim().to_ascii_lowercase().as_str() {
                "remote" => HistoryBackend::Remote,
                "memory" => HistoryBackend::Memory,
                other => return Err(anyhow!("unknown CASE_ASSISTANT_HISTORY: {other}")),
            };
        }

        Ok(settings)
    }
}
