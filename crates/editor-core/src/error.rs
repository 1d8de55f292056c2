use thiserror::Error;

use crate::node::NodeKind;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(
        "command `{command}` carries payload `{registered}`, handler expects `{requested}`"
    )]
    PayloadMismatch {
        command: &'static str,
        registered: &'static str,
        requested: &'static str,
    },
    #[error("invalid payload for `{command}`: {message}")]
    InvalidPayload {
        command: &'static str,
        message: String,
    },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
}

impl CommandError {
    pub fn rejected(message: impl Into<String>) -> Self {
        CommandError::Rejected(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("equation expression must not be empty")]
    EmptyEquation,
    #[error("mention name must not be empty")]
    EmptyMention,
    #[error("keyword text must not be empty")]
    EmptyKeyword,
    #[error("image source must not be empty")]
    EmptyImageSource,
    #[error("poll `{question}` needs at least {min} options, has {found}")]
    TooFewPollOptions {
        question: String,
        min: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document failed validation: {0}")]
    Invalid(#[from] NodeError),
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("node kind `{kind}` registered by `{plugin}` is already provided")]
    DuplicateNodeKind { plugin: &'static str, kind: NodeKind },
    #[error("plugin `{plugin}` failed to register: {source}")]
    Register {
        plugin: &'static str,
        #[source]
        source: CommandError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
    #[error("lookup failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("speech recognition could not start: {0}")]
    Start(String),
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
}
