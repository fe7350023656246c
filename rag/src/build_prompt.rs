use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Builds the grounded prompt: the instruction as a system message, then the
/// retrieved context and the question as the user turn.
pub fn build_prompt_with_context(
    cfg: &Config,
    question: &str,
    chunks: &[String],
) -> (Vec<Message>, String) {
    let context = format_context(chunks);

    let user_content = format!("Context:\n{}\n\nQuestion:\n{}", context, question);

    let messages = vec![Message::system(cfg.system_prompt.clone()), Message::user(user_content)];

    (messages, context)
}

pub fn format_context(chunks: &[String]) -> String {
    if chunks.is_empty() {
        "(no context found)".to_string()
    } else {
        chunks.join("\n\n")
    }
}
