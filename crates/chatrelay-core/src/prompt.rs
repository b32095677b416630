//! Conversation → prompt serialisation.
//!
//! The hosted model is a plain completion model, so the whole dialogue is
//! flattened into one string:
//!
//! ```text
//! <instructions>
//! User: hello
//! Vana: hi there
//! assistant:
//! ```
//!
//! The trailing cue line uses the bare role name rather than the persona,
//! prompting the model to continue as the assistant.

use crate::message::{Message, ROLE_ASSISTANT};

const DEFAULT_ASSISTANT_NAME: &str = "Vana";
const DEFAULT_USER_NAME: &str = "User";
const DEFAULT_CUE_LABEL: &str = "assistant";

const DEFAULT_INSTRUCTIONS: &str = "The following is a conversation between a highly knowledgeable \
and intelligent AI assistant, called Vana, and a human user, called User. In the following \
interactions, User and Vana will converse in natural language, and Vana will answer User's \
questions. Vana was built to be respectful, polite and inclusive. Vana will never decline to \
answer a question, and always attempts to give an answer that User would be satisfied with. \
Vana knows a lot, and always tells the truth. The conversation begins.";

/// Persona labels and preamble used when flattening a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub instructions: String,
    pub assistant_name: String,
    pub user_name: String,
    /// Label of the final, empty line the model completes.
    pub cue_label: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_owned(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_owned(),
            user_name: DEFAULT_USER_NAME.to_owned(),
            cue_label: DEFAULT_CUE_LABEL.to_owned(),
        }
    }
}

impl PromptTemplate {
    /// Label for a stored role. Only the literal `"assistant"` maps to the
    /// assistant persona; every other value is rendered as the user.
    pub fn label_for(&self, role: &str) -> &str {
        if role == ROLE_ASSISTANT {
            &self.assistant_name
        } else {
            &self.user_name
        }
    }

    /// Flatten `messages` (oldest first) into a single prompt string.
    pub fn format(&self, messages: &[Message]) -> String {
        let mut lines = Vec::with_capacity(messages.len() + 2);
        lines.push(self.instructions.clone());
        lines.extend(
            messages
                .iter()
                .map(|m| format!("{}: {}", self.label_for(&m.role), m.content)),
        );
        lines.push(format!("{}:", self.cue_label));
        lines.join("\n")
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
