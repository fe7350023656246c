use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::backend::{Embedder, Generator};
use crate::build_prompt::Message;
use crate::config::OllamaConfig;
use crate::error::{RagError, Result};
use crate::http::{Auth, JsonClient};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OllamaClient {
    http: JsonClient,
    url: String,
    embed_model: String,
    chat_model: String,
}

impl OllamaClient {
    pub fn new(http: JsonClient, cfg: &OllamaConfig) -> Self {
        Self {
            http,
            url: cfg.url.trim_end_matches('/').to_string(),
            embed_model: cfg.embed_model.clone(),
            chat_model: cfg.chat_model.clone(),
        }
    }

    /// Older servers only expose `/api/embeddings`, one prompt per call.
    fn embed_legacy(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest {
                model: &self.embed_model,
                prompt: text,
            };
            let res = self.http.post_json::<Value, _>(&url, &Auth::None, &req)?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

impl Embedder for OllamaClient {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.embed_model)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/api/embed", self.url);
        let req = EmbedRequest {
            model: &self.embed_model,
            input: texts,
        };
        match self.http.post_json::<Value, _>(&url, &Auth::None, &req) {
            Ok(res) => parse_embeddings(res),
            Err(err @ RagError::Timeout(_)) => Err(err),
            Err(err) => {
                debug!(error = %err, "falling back to legacy embeddings endpoint");
                self.embed_legacy(texts)
            }
        }
    }
}

impl Generator for OllamaClient {
    fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/api/chat", self.url);
        let req = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: false,
        };
        let res = self.http.post_json::<ChatResponse, _>(&url, &Auth::None, &req)?;
        Ok(res.message.and_then(|m| m.content).unwrap_or_default())
    }
}

fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err(RagError::ExternalService("No embeddings in response".to_string()))
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::ExternalService("Invalid embeddings format".to_string()))?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

pub(crate) fn parse_vec(value: &Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::ExternalService("Embedding is not an array".to_string()))?;
    arr.iter()
        .map(|v| {
            v.as_f64().map(|n| n as f32).ok_or_else(|| {
                RagError::ExternalService("Embedding value is not a number".to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_batch_and_single_embedding_shapes() {
        let batch = parse_embeddings(json!({"embeddings": [[1.0, 2.0], [3.0, 4.0]]}))
            .expect("batch shape");
        assert_eq!(batch, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let single = parse_embeddings(json!({"embedding": [0.5, 0.25]})).expect("single shape");
        assert_eq!(single, vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn rejects_missing_or_non_numeric_embeddings() {
        assert!(parse_embeddings(json!({"model": "x"})).is_err());
        assert!(parse_embeddings(json!({"embedding": ["a"]})).is_err());
    }
}
