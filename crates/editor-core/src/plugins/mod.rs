pub mod code;
pub mod equations;
pub mod formatting;
pub mod image;
pub mod keywords;
pub mod mentions;
pub mod poll;
pub mod speech;

use crate::config::EditorConfig;
use crate::plugin::EditorPlugin;

/// Every plugin that needs no host capability, configured from `config`.
/// Mentions and speech-to-text take a lookup backend and a recognizer and
/// are added by the host.
pub fn standard_plugins(config: &EditorConfig) -> Vec<Box<dyn EditorPlugin>> {
    vec![
        Box::new(keywords::KeywordsPlugin::from_config(&config.keywords)),
        Box::new(equations::EquationsPlugin),
        Box::new(formatting::ToolbarFormattingPlugin::from_config(&config.toolbar)),
        Box::new(image::InlineImagePlugin),
        Box::new(poll::PollPlugin),
        Box::new(code::CodePlugin),
    ]
}
