use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: OperationMode,
    pub generator: GeneratorConfig,
    pub retry: RetryConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,      // Smaller completions, no retries
    Accurate,  // Lower temperature, retries and an extra regeneration
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after a failed agent call. 0 means call once.
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_utilization_rate: f64,
    pub max_regenerations: usize,
    pub long_string_threshold: usize,
    pub prefix_len: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 0.9,
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_utilization_rate: 0.9,
            max_regenerations: 1,
            long_string_threshold: 50,
            prefix_len: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            generator: GeneratorConfig::default(),
            retry: RetryConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            generator: GeneratorConfig {
                max_tokens: 2048,
                request_timeout_secs: 60,
                ..GeneratorConfig::default()
            },
            retry: RetryConfig::default(),
            validation: ValidationConfig {
                max_regenerations: 0,
                ..ValidationConfig::default()
            },
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            generator: GeneratorConfig {
                max_tokens: 8192,
                temperature: 0.3,
                request_timeout_secs: 240,
                ..GeneratorConfig::default()
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            validation: ValidationConfig {
                max_regenerations: 2,
                ..ValidationConfig::default()
            },
        }
    }

    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Accurate => Self::accurate_mode(),
            OperationMode::Balanced => Self::default(),
        }
    }

    /// Mode preset overlaid with `PIPELINE__...` environment variables,
    /// e.g. `PIPELINE__GENERATOR__MODEL=mistral`.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`from_env`](Self::from_env); an explicit mode wins over `PIPELINE__MODE`.
    pub fn load(mode_override: Option<OperationMode>) -> Result<Self> {
        Self::load_from(Self::environment(), mode_override)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("PIPELINE")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(env: config::Environment, mode_override: Option<OperationMode>) -> Result<Self> {
        let env = config::Config::builder()
            .add_source(env)
            .build()
            .context("Failed to read environment configuration")?;

        let mode = match mode_override {
            Some(mode) => mode,
            None => match env.get::<OperationMode>("mode") {
                Ok(mode) => mode,
                Err(config::ConfigError::NotFound(_)) => OperationMode::default(),
                Err(e) => return Err(e).context("Invalid PIPELINE__MODE"),
            },
        };

        let preset = config::Config::try_from(&Self::for_mode(mode))
            .context("Failed to serialize configuration preset")?;

        let mut config: Self = config::Config::builder()
            .add_source(preset)
            .add_source(env)
            .build()
            .context("Failed to merge configuration")?
            .try_deserialize()
            .context("Invalid pipeline configuration")?;

        config.mode = mode;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_do_not_retry() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.validation.min_utilization_rate, 0.9);
    }

    #[test]
    fn test_mode_presets() {
        let fast = PipelineConfig::for_mode(OperationMode::Fast);
        assert_eq!(fast.validation.max_regenerations, 0);
        let accurate = PipelineConfig::for_mode(OperationMode::Accurate);
        assert_eq!(accurate.retry.max_retries, 2);
        let balanced = PipelineConfig::for_mode(OperationMode::Balanced);
        assert_eq!(balanced.mode, OperationMode::Balanced);
    }

    #[test]
    fn test_load_with_mode_override() {
        let config = PipelineConfig::load(Some(OperationMode::Accurate)).unwrap();
        assert_eq!(config.mode, OperationMode::Accurate);
        assert_eq!(config.generator.request_timeout_secs, 240);
    }

    fn vars(pairs: &[(&str, &str)]) -> config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        PipelineConfig::environment().source(Some(map))
    }

    #[test]
    fn test_env_overlays_preset() {
        let env = vars(&[
            ("PIPELINE__MODE", "accurate"),
            ("PIPELINE__GENERATOR__MODEL", "mistral"),
            ("PIPELINE__RETRY__MAX_RETRIES", "5"),
            ("OTHER__GENERATOR__MODEL", "ignored"),
        ]);
        let config = PipelineConfig::load_from(env, None).unwrap();

        assert_eq!(config.mode, OperationMode::Accurate);
        assert_eq!(config.generator.model, "mistral");
        assert_eq!(config.retry.max_retries, 5);
        // Untouched keys come from the accurate preset.
        assert_eq!(config.generator.request_timeout_secs, 240);
        assert_eq!(config.validation.max_regenerations, 2);
    }

    #[test]
    fn test_explicit_mode_beats_env_mode() {
        let env = vars(&[("PIPELINE__MODE", "accurate")]);
        let config = PipelineConfig::load_from(env, Some(OperationMode::Fast)).unwrap();
        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.validation.max_regenerations, 0);
    }

    #[test]
    fn test_invalid_env_mode_is_an_error() {
        let env = vars(&[("PIPELINE__MODE", "turbo")]);
        assert!(PipelineConfig::load_from(env, None).is_err());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let json = r#"{"generator": {"model": "mistral"}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.generator.model, "mistral");
        assert_eq!(config.generator.base_url, "http://localhost:11434");
        assert_eq!(config.validation.max_regenerations, 1);
    }
}
