//! Configuration loading for formex.
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! command-line overrides applied by the caller.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bedrock::ModelSettings;
use crate::error::{FormexError, Result};
use crate::prompt::DEFAULT_MAX_INPUT_CHARS;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub model: Option<ModelConfig>,
    pub extraction: Option<ExtractionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub id: Option<String>,
    pub region: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    pub max_input_chars: Option<usize>,
    pub include_metadata: Option<bool>,
}

/// Fully resolved settings for one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorSettings {
    pub model: ModelSettings,
    /// `None` defers to the ambient AWS region
    pub region: Option<String>,
    pub max_input_chars: usize,
    pub include_metadata: bool,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            region: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            include_metadata: false,
        }
    }
}

impl ExtractorSettings {
    /// Reject values the service or the prompt builder cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`FormexError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        validate_model(&self.model)?;
        if self.max_input_chars == 0 {
            return Err(FormexError::Config(
                "max_input_chars must be at least 1".to_string(),
            ));
        }
        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(FormexError::Config("region must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Check model parameters against what Bedrock accepts.
///
/// # Errors
///
/// Returns [`FormexError::Config`] describing the first bad value.
pub fn validate_model(model: &ModelSettings) -> Result<()> {
    if model.model_id.trim().is_empty() {
        return Err(FormexError::Config("model id must not be empty".to_string()));
    }
    if model.max_tokens == 0 {
        return Err(FormexError::Config(
            "max_tokens must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&model.temperature) {
        return Err(FormexError::Config(format!(
            "temperature must be between 0 and 1, got {}",
            model.temperature
        )));
    }
    if let Some(top_p) = model.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(FormexError::Config(format!(
                "top_p must be between 0 and 1, got {top_p}"
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Apply this file's values over `base` model settings.
    #[must_use]
    pub fn model_settings(&self, base: ModelSettings) -> ModelSettings {
        let Some(model) = &self.model else {
            return base;
        };
        ModelSettings {
            model_id: model.id.clone().unwrap_or(base.model_id),
            max_tokens: model.max_tokens.unwrap_or(base.max_tokens),
            temperature: model.temperature.unwrap_or(base.temperature),
            top_p: model.top_p.or(base.top_p),
        }
    }

    #[must_use]
    pub fn region(&self) -> Option<String> {
        self.model.as_ref().and_then(|model| model.region.clone())
    }

    /// Settings for form extraction with this file's values applied.
    #[must_use]
    pub fn extractor_settings(&self) -> ExtractorSettings {
        let defaults = ExtractorSettings::default();
        let extraction = self.extraction.clone().unwrap_or_default();
        ExtractorSettings {
            model: self.model_settings(defaults.model),
            region: self.region(),
            max_input_chars: extraction
                .max_input_chars
                .unwrap_or(defaults.max_input_chars),
            include_metadata: extraction
                .include_metadata
                .unwrap_or(defaults.include_metadata),
        }
    }
}

/// `<config dir>/formex/config.toml` for the current platform.
///
/// # Errors
///
/// Returns [`FormexError::Config`] if no home directory can be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "formex")
        .ok_or_else(|| FormexError::Config("Could not determine config directory".to_string()))?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load `path`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns [`FormexError::Config`] if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        FormexError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    toml::from_str(&contents).map_err(|e| {
        FormexError::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })
}
