//! Editor configuration
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields [`EditorConfig::default`].

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::plugins::speech::VoiceCommand;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub normalize: NormalizeConfig,
    pub mentions: MentionsConfig,
    pub keywords: KeywordsConfig,
    pub speech: SpeechConfig,
    pub toolbar: ToolbarConfig,
}

impl EditorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Missing files yield the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo steps kept; older steps are dropped.
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_undo: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub max_iterations: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionsConfig {
    pub trigger: char,
    pub max_query_len: usize,
    pub debounce_ms: u64,
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            trigger: '@',
            max_query_len: 75,
            debounce_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub words: Vec<String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            words: [
                "congrats",
                "congratulations",
                "bravo",
                "awesome",
                "amazing",
                "excellent",
                "great",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Spoken phrase (lowercase, trimmed) to editor command. A phrase made
    /// only of a line break is keyed as `"\n"`.
    pub vocabulary: IndexMap<String, VoiceCommand>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            vocabulary: IndexMap::from([
                ("\n".to_string(), VoiceCommand::NewParagraph),
                ("undo".to_string(), VoiceCommand::Undo),
                ("redo".to_string(), VoiceCommand::Redo),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    pub font_families: Vec<String>,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            font_families: [
                "Arial",
                "Courier New",
                "Georgia",
                "Times New Roman",
                "Trebuchet MS",
                "Verdana",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
