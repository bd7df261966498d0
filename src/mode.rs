//! Correction modes and their prompt templates
//!
//! Each mode maps 1:1 to a prompt template and a configured hotkey chord.
//! Templates instruct tone/length/register only; they never ask the model
//! to change meaning-bearing content.

use serde::{Deserialize, Serialize};

/// The five supported text-transformation intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMode {
    GrammarFix,
    Formal,
    Casual,
    Simplify,
    Expand,
}

impl CorrectionMode {
    /// All modes, in the order they appear in config and the startup table
    pub const ALL: [CorrectionMode; 5] = [
        CorrectionMode::GrammarFix,
        CorrectionMode::Formal,
        CorrectionMode::Casual,
        CorrectionMode::Simplify,
        CorrectionMode::Expand,
    ];

    /// Config-file name for this mode (keys under `[hotkeys]`)
    pub fn config_name(&self) -> &'static str {
        match self {
            CorrectionMode::GrammarFix => "grammar_fix",
            CorrectionMode::Formal => "formal",
            CorrectionMode::Casual => "casual",
            CorrectionMode::Simplify => "simplify",
            CorrectionMode::Expand => "expand",
        }
    }

    /// Parse a config-file mode name
    pub fn from_config_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.config_name() == name)
    }

    /// Human-readable description, shown in the startup hotkey table
    pub fn description(&self) -> &'static str {
        match self {
            CorrectionMode::GrammarFix => "Fix grammar, spelling, and punctuation",
            CorrectionMode::Formal => "Make more formal and professional",
            CorrectionMode::Casual => "Make more casual and friendly",
            CorrectionMode::Simplify => "Simplify and clarify",
            CorrectionMode::Expand => "Expand with more detail",
        }
    }

    /// Instruction template for this mode. `{text}` is replaced with the
    /// verbatim source text.
    fn template(&self) -> &'static str {
        match self {
            CorrectionMode::GrammarFix => {
                "Fix any grammar, spelling, and punctuation errors in the following text.\n\
                 Maintain the original tone and style. Only return the corrected text, nothing else.\n\n\
                 Text: {text}"
            }
            CorrectionMode::Formal => {
                "Rewrite the following text in a more formal and professional style.\n\
                 Maintain the core message. Only return the rewritten text, nothing else.\n\n\
                 Text: {text}"
            }
            CorrectionMode::Casual => {
                "Rewrite the following text in a more casual and friendly style.\n\
                 Maintain the core message. Only return the rewritten text, nothing else.\n\n\
                 Text: {text}"
            }
            CorrectionMode::Simplify => {
                "Simplify the following text to make it clearer and easier to understand.\n\
                 Use simpler words and shorter sentences. Only return the simplified text, nothing else.\n\n\
                 Text: {text}"
            }
            CorrectionMode::Expand => {
                "Expand and elaborate on the following text with more detail and context.\n\
                 Maintain the original style. Only return the expanded text, nothing else.\n\n\
                 Text: {text}"
            }
        }
    }

    /// Build the full prompt for a piece of source text
    pub fn build_prompt(&self, text: &str) -> String {
        self.template().replace("{text}", text)
    }
}

impl std::fmt::Display for CorrectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_name())
    }
}
