use serde::{Deserialize, Serialize};

use crate::backend::{embed_in_batches, Embedder, Generator};
use crate::build_prompt::Message;
use crate::config::OpenAiConfig;
use crate::error::{RagError, Result};
use crate::http::{Auth, JsonClient};

const MAX_EMBED_BATCH: usize = 2048;

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI and API-compatible servers.
pub struct OpenAiClient {
    http: JsonClient,
    url: String,
    auth: Auth,
    embed_model: String,
    chat_model: String,
}

impl OpenAiClient {
    pub fn new(http: JsonClient, cfg: &OpenAiConfig) -> Result<Self> {
        let key = cfg
            .api_key
            .clone()
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self {
            http,
            url: cfg.url.trim_end_matches('/').to_string(),
            auth: Auth::Bearer(key),
            embed_model: cfg.embed_model.clone(),
            chat_model: cfg.chat_model.clone(),
        })
    }
}

impl Embedder for OpenAiClient {
    fn model_id(&self) -> String {
        format!("openai:{}", self.embed_model)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.url);
        embed_in_batches("openai", texts, MAX_EMBED_BATCH, |batch| {
            let req = EmbeddingsRequest {
                model: &self.embed_model,
                input: batch,
            };
            let mut res = self.http.post_json::<EmbeddingsResponse, _>(&url, &self.auth, &req)?;
            // The API does not promise response order matches input order.
            res.data.sort_by_key(|d| d.index);
            Ok(res.data.into_iter().map(|d| d.embedding).collect())
        })
    }
}

impl Generator for OpenAiClient {
    fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/chat/completions", self.url);
        let req = ChatRequest {
            model: &self.chat_model,
            messages,
        };
        let res = self.http.post_json::<ChatResponse, _>(&url, &self.auth, &req)?;
        res.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| RagError::ExternalService("openai returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_embeddings_and_chat_choices() {
        let res: EmbeddingsResponse = serde_json::from_value(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }))
        .expect("embeddings");
        assert_eq!(res.data.len(), 2);
        assert_eq!(res.data[0].index, 1);

        let chat: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "I don't know."}}]
        }))
        .expect("chat");
        assert_eq!(chat.choices[0].message.content.as_deref(), Some("I don't know."));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let http = JsonClient::new(std::time::Duration::from_secs(1)).expect("client");
        let cfg = crate::config::Config::default().openai;
        let err = OpenAiClient::new(http, &cfg).err().expect("no key");
        assert!(matches!(err, RagError::Config(_)));
    }
}
