//! Speech-to-text input.
//!
//! The host passes its recognizer when the platform has one. Without a
//! recognizer the plugin installs nothing: no commands, no toolbar control.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bus::{Command, CommandPriority};
use crate::commands::{INSERT_PARAGRAPH, INSERT_TEXT, REDO, UNDO};
use crate::core::Editor;
use crate::error::{CommandError, SpeechError};
use crate::plugin::EditorPlugin;
use crate::toolbar::{ControlKind, ToolbarControl};

/// Payload `true` starts listening, `false` stops.
pub const SPEECH_TOGGLE: Command<bool> = Command::new("speech.toggle");
pub const SPEECH_RESULT: Command<SpeechResult> = Command::new("speech.result");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceCommand {
    Undo,
    Redo,
    NewParagraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub transcript: String,
    pub is_final: bool,
}

impl SpeechResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

pub trait SpeechRecognizer {
    fn start(&mut self) -> Result<(), SpeechError>;
    fn stop(&mut self);
}

pub struct SpeechSession {
    recognizer: Box<dyn SpeechRecognizer>,
    vocabulary: IndexMap<String, VoiceCommand>,
    listening: bool,
}

impl SpeechSession {
    pub fn is_listening(&self) -> bool {
        self.listening
    }
}

pub struct SpeechToTextPlugin {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
}

impl SpeechToTextPlugin {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        Self { recognizer }
    }
}

impl EditorPlugin for SpeechToTextPlugin {
    fn id(&self) -> &'static str {
        "speech"
    }

    fn toolbar_controls(&self) -> Vec<ToolbarControl> {
        if self.recognizer.is_none() {
            return Vec::new();
        }
        vec![ToolbarControl::new(
            "speech",
            "Speech to text",
            SPEECH_TOGGLE.id(),
            ControlKind::Toggle,
        )]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        let Some(recognizer) = self.recognizer.take() else {
            tracing::debug!("speech recognition unavailable, plugin inactive");
            return Ok(());
        };
        let vocabulary = editor.config().speech.vocabulary.clone();
        editor.insert_extension(SpeechSession {
            recognizer,
            vocabulary,
            listening: false,
        });

        editor.register_command(SPEECH_TOGGLE, CommandPriority::Editor, |editor, listen| {
            let Some(session) = editor.extension_mut::<SpeechSession>() else {
                return Ok(false);
            };
            if session.listening == *listen {
                return Ok(true);
            }
            if *listen {
                session.recognizer.start()?;
            } else {
                session.recognizer.stop();
            }
            session.listening = *listen;
            tracing::debug!(listening = *listen, "speech recognition toggled");
            Ok(true)
        })?;

        editor.register_command(SPEECH_RESULT, CommandPriority::Editor, |editor, result| {
            let Some(session) = editor.extension::<SpeechSession>() else {
                return Ok(false);
            };
            if !session.listening {
                return Ok(false);
            }
            if !result.is_final {
                return Ok(true);
            }

            let command = session
                .vocabulary
                .get(&vocabulary_key(&result.transcript))
                .copied();
            match command {
                Some(VoiceCommand::Undo) => editor.dispatch(UNDO, ()),
                Some(VoiceCommand::Redo) => editor.dispatch(REDO, ()),
                Some(VoiceCommand::NewParagraph) => editor.dispatch(INSERT_PARAGRAPH, ()),
                None => editor.dispatch(INSERT_TEXT, result.transcript.clone()),
            }
        })?;
        Ok(())
    }
}

pub fn is_listening(editor: &Editor) -> bool {
    editor
        .extension::<SpeechSession>()
        .is_some_and(SpeechSession::is_listening)
}

fn vocabulary_key(transcript: &str) -> String {
    let trimmed = transcript.trim();
    if trimmed.is_empty() && transcript.contains('\n') {
        return "\n".to_string();
    }
    trimmed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::vocabulary_key;

    #[test]
    fn phrases_are_trimmed_and_lowercased() {
        assert_eq!(vocabulary_key("  Undo "), "undo");
        assert_eq!(vocabulary_key("REDO"), "redo");
    }

    #[test]
    fn bare_line_break_keeps_its_key() {
        assert_eq!(vocabulary_key("\n"), "\n");
        assert_eq!(vocabulary_key(" \n "), "\n");
        assert_eq!(vocabulary_key("   "), "");
    }
}
