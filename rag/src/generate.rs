use tracing::debug;

use crate::backend::Generator;
use crate::build_prompt::build_prompt_with_context;
use crate::config::Config;
use crate::error::Result;

/// Answers `question` from `chunks` with a single generation call.
/// Failures are returned as-is; there is no retry.
pub fn generate_answer(
    cfg: &Config,
    generator: &dyn Generator,
    question: &str,
    chunks: &[String],
) -> Result<String> {
    let (messages, context) = build_prompt_with_context(cfg, question, chunks);
    debug!(context_chars = context.len(), "requesting answer");
    generator.generate(&messages)
}
