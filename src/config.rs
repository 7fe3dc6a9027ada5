//! Configuration types for the boardroom consultation engine
//!
//! `ConsultationConfig` collects the orchestration tunables (the source
//! material disagreed on several of them, so everything contentious is a
//! knob with a sensible default). `OpenRouterConfig` configures the bundled
//! OpenRouter generation backend.

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Orchestration tunables for one consultation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationConfig {
    /// Turn count at which the discussion phase ends
    #[serde(default = "default_opening_turns")]
    pub opening_turns: usize,
    /// Turn count from which synthesis is forced once everyone has spoken
    #[serde(default = "default_synthesis_threshold")]
    pub synthesis_threshold: usize,
    /// Turn count at which synthesis is forced regardless of other signals
    #[serde(default = "default_max_discussion_turns")]
    pub max_discussion_turns: usize,
    /// Hard cap on orchestration loop iterations (including skipped turns)
    #[serde(default = "default_hard_step_cap")]
    pub hard_step_cap: usize,
    /// Minimum character count for a text to qualify as a final report
    #[serde(default = "default_report_min_chars")]
    pub report_min_chars: usize,
    /// Texts shorter than this are treated as uninformative near-duplicates
    #[serde(default = "default_min_informative_chars")]
    pub min_informative_chars: usize,
    /// How many of a role's recent signatures the repetition guard keeps
    #[serde(default = "default_similarity_window")]
    pub similarity_window: usize,
    /// Per-invocation generation deadline, in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Consecutive generation failures for one role before giving up
    #[serde(default = "default_max_generation_failures")]
    pub max_generation_failures: u32,
    /// Quality score below which the discussion is considered degraded
    #[serde(default = "default_quality_floor")]
    pub quality_floor: f32,
    /// Turns that must elapse before quality degradation may end the run
    #[serde(default = "default_quality_grace_turns")]
    pub quality_grace_turns: usize,
    /// Whether quality degradation forces early synthesis
    #[serde(default = "default_end_on_quality_collapse")]
    pub end_on_quality_collapse: bool,
    /// External-context fetches allowed per role
    #[serde(default = "default_context_fetch_limit")]
    pub context_fetch_limit: usize,
}

fn default_opening_turns() -> usize {
    4
}
fn default_synthesis_threshold() -> usize {
    8
}
fn default_max_discussion_turns() -> usize {
    12
}
fn default_hard_step_cap() -> usize {
    30
}
fn default_report_min_chars() -> usize {
    500
}
fn default_min_informative_chars() -> usize {
    100
}
fn default_similarity_window() -> usize {
    5
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_max_generation_failures() -> u32 {
    3
}
fn default_quality_floor() -> f32 {
    0.4
}
fn default_quality_grace_turns() -> usize {
    6
}
fn default_end_on_quality_collapse() -> bool {
    true
}
fn default_context_fetch_limit() -> usize {
    2
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            opening_turns: default_opening_turns(),
            synthesis_threshold: default_synthesis_threshold(),
            max_discussion_turns: default_max_discussion_turns(),
            hard_step_cap: default_hard_step_cap(),
            report_min_chars: default_report_min_chars(),
            min_informative_chars: default_min_informative_chars(),
            similarity_window: default_similarity_window(),
            generation_timeout_secs: default_generation_timeout_secs(),
            max_generation_failures: default_max_generation_failures(),
            quality_floor: default_quality_floor(),
            quality_grace_turns: default_quality_grace_turns(),
            end_on_quality_collapse: default_end_on_quality_collapse(),
            context_fetch_limit: default_context_fetch_limit(),
        }
    }
}

impl ConsultationConfig {
    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("Failed to parse YAML: {e}")))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Set the synthesis threshold
    pub fn with_synthesis_threshold(mut self, turns: usize) -> Self {
        self.synthesis_threshold = turns;
        self
    }

    /// Set the hard step cap
    pub fn with_hard_step_cap(mut self, steps: usize) -> Self {
        self.hard_step_cap = steps;
        self
    }

    /// Set the per-invocation generation timeout
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Enable or disable quality-collapse early synthesis
    pub fn with_end_on_quality_collapse(mut self, enabled: bool) -> Self {
        self.end_on_quality_collapse = enabled;
        self
    }

    /// Set the maximum consecutive generation failures per role
    pub fn with_max_generation_failures(mut self, attempts: u32) -> Self {
        self.max_generation_failures = attempts;
        self
    }

    /// Per-invocation generation deadline
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Check the thresholds are mutually consistent
    pub fn validate(&self) -> Result<()> {
        if self.synthesis_threshold == 0 {
            return Err(Error::config("synthesis_threshold must be positive"));
        }
        if self.opening_turns > self.synthesis_threshold {
            return Err(Error::config(
                "opening_turns must not exceed synthesis_threshold",
            ));
        }
        if self.max_discussion_turns < self.synthesis_threshold {
            return Err(Error::config(
                "max_discussion_turns must not be below synthesis_threshold",
            ));
        }
        if self.hard_step_cap <= self.synthesis_threshold {
            return Err(Error::config(
                "hard_step_cap must leave room for the synthesis turn",
            ));
        }
        if self.max_generation_failures == 0 {
            return Err(Error::config("max_generation_failures must be positive"));
        }
        if !(0.0..=1.0).contains(&self.quality_floor) {
            return Err(Error::config("quality_floor must be within [0, 1]"));
        }
        Ok(())
    }
}

/// OpenRouter backend configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key (loaded from environment variable)
    pub api_key: SecretString,
    /// Base URL for the OpenRouter API
    pub base_url: Url,
    /// Model identifier used for every role
    pub model: String,
    /// Temperature for sampling
    pub temperature: f32,
    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
    /// Request timeout
    pub timeout: Duration,
    /// App name for OpenRouter tracking
    pub app_name: String,
}

impl OpenRouterConfig {
    /// Create a configuration from environment variables
    ///
    /// Reads `OPENROUTER_API_KEY` (required) and `BOARDROOM_MODEL` (optional).
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up OPENROUTER_API_KEY
        let _ = dotenv();

        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| Error::config("OPENROUTER_API_KEY environment variable not set"))?;
        let model = std::env::var("BOARDROOM_MODEL").unwrap_or_else(|_| presets::BALANCED.to_string());

        Ok(Self::new(api_key).with_model(model))
    }

    /// Create a configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: Url::parse("https://openrouter.ai/api/v1").expect("valid OpenRouter URL"),
            model: presets::BALANCED.to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(120),
            app_name: "Boardroom".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum completion tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Recommended model configurations
pub mod presets {
    /// Recommended for complex synthesis work
    pub const REASONING: &str = "anthropic/claude-opus-4";

    /// Balanced performance and cost
    pub const BALANCED: &str = "anthropic/claude-sonnet-4";

    /// Fast responses, lower cost
    pub const FAST: &str = "anthropic/claude-haiku-4";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConsultationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.synthesis_threshold, 8);
        assert_eq!(config.hard_step_cap, 30);
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let yaml = r#"
synthesis_threshold: 10
hard_step_cap: 50
end_on_quality_collapse: false
"#;
        let config = ConsultationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.synthesis_threshold, 10);
        assert_eq!(config.hard_step_cap, 50);
        assert!(!config.end_on_quality_collapse);
        // untouched fields keep their defaults
        assert_eq!(config.report_min_chars, 500);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_inconsistent_thresholds() {
        let config = ConsultationConfig::default().with_synthesis_threshold(40);
        assert!(config.validate().is_err());

        let mut config = ConsultationConfig::default();
        config.quality_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn openrouter_config_redacts_key() {
        let config = OpenRouterConfig::new("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert_eq!(config.api_key(), "sk-secret");
    }
}
