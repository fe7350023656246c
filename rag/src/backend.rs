//! Pluggable embedding and generation providers.
//!
//! The pipeline only sees the two traits below; which concrete service sits
//! behind them is decided once, from [`Config`], when the backend is built.

use std::sync::Arc;

use tracing::info;

use crate::build_prompt::Message;
use crate::config::{ChatProvider, Config, EmbedProvider};
use crate::error::{RagError, Result};
use crate::gemini::GeminiClient;
use crate::hash_embed::HashEmbedder;
use crate::http::JsonClient;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

pub trait Embedder: Send + Sync {
    /// Identifies the model; stored with the index so a later query can
    /// refuse to search vectors produced by a different model.
    fn model_id(&self) -> String;

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub trait Generator: Send + Sync {
    fn generate(&self, messages: &[Message]) -> Result<String>;
}

/// Calls `embed` on consecutive slices of at most `max_batch` texts and
/// joins the results in input order. For providers that cap inputs per
/// request.
pub(crate) fn embed_in_batches<F>(
    provider: &str,
    texts: &[String],
    max_batch: usize,
    mut embed: F,
) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f32>>>,
{
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(max_batch.max(1)) {
        let vectors = embed(batch)?;
        if vectors.len() != batch.len() {
            return Err(RagError::ExternalService(format!(
                "{} returned {} embeddings for {} inputs",
                provider,
                vectors.len(),
                batch.len()
            )));
        }
        out.extend(vectors);
    }
    Ok(out)
}

#[derive(Clone)]
pub struct Backend {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

impl Backend {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        Self { embedder, generator }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = JsonClient::new(cfg.request_timeout)?;

        let embedder: Arc<dyn Embedder> = match cfg.embed_provider {
            EmbedProvider::Ollama => Arc::new(OllamaClient::new(http.clone(), &cfg.ollama)),
            EmbedProvider::Gemini => Arc::new(GeminiClient::new(http.clone(), &cfg.gemini)?),
            EmbedProvider::OpenAi => Arc::new(OpenAiClient::new(http.clone(), &cfg.openai)?),
            EmbedProvider::Hash => Arc::new(HashEmbedder::new(cfg.hash_dim)),
        };
        let generator: Arc<dyn Generator> = match cfg.chat_provider {
            ChatProvider::Ollama => Arc::new(OllamaClient::new(http, &cfg.ollama)),
            ChatProvider::Gemini => Arc::new(GeminiClient::new(http, &cfg.gemini)?),
            ChatProvider::OpenAi => Arc::new(OpenAiClient::new(http, &cfg.openai)?),
        };
        info!(
            embedder = %embedder.model_id(),
            chat = ?cfg.chat_provider,
            "backend selected"
        );
        Ok(Self::new(embedder, generator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn batches_respect_the_cap_and_keep_order() {
        let texts: Vec<String> = (0..250).map(|i| i.to_string()).collect();
        let mut sizes = Vec::new();
        let vectors = embed_in_batches("test", &texts, 100, |batch| {
            sizes.push(batch.len());
            Ok(batch
                .iter()
                .map(|t| vec![t.parse::<f32>().expect("number")])
                .collect())
        })
        .expect("embed");

        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(vectors.len(), 250);
        assert!(vectors.iter().enumerate().all(|(i, v)| v[0] == i as f32));
    }

    #[test]
    fn short_batch_reply_is_an_external_service_error() {
        let texts: Vec<String> = vec!["a".to_string(), "b".to_string()];
        let err = embed_in_batches("test", &texts, 1, |_| Ok(vec![]))
            .expect_err("missing vectors");
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }
}
