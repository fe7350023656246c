use serde::{Deserialize, Serialize};

use crate::backend::{embed_in_batches, Embedder, Generator};
use crate::build_prompt::Message;
use crate::config::GeminiConfig;
use crate::error::{RagError, Result};
use crate::http::{Auth, JsonClient};

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_EMBED_BATCH: usize = 100;

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiClient {
    http: JsonClient,
    url: String,
    auth: Auth,
    embed_model: String,
    chat_model: String,
}

impl GeminiClient {
    pub fn new(http: JsonClient, cfg: &GeminiConfig) -> Result<Self> {
        let key = cfg
            .api_key
            .clone()
            .ok_or_else(|| RagError::Config("GEMINI_API_KEY is not set".to_string()))?;
        Ok(Self {
            http,
            url: cfg.url.trim_end_matches('/').to_string(),
            auth: Auth::Header("x-goog-api-key", key),
            embed_model: cfg.embed_model.clone(),
            chat_model: cfg.chat_model.clone(),
        })
    }
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: text.to_string(),
        }],
    }
}

impl Embedder for GeminiClient {
    fn model_id(&self) -> String {
        format!("gemini:{}", self.embed_model)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/models/{}:batchEmbedContents", self.url, self.embed_model);
        embed_in_batches("gemini", texts, MAX_EMBED_BATCH, |batch| {
            let body = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| EmbedContentRequest {
                        model: format!("models/{}", self.embed_model),
                        content: text_content(None, t),
                    })
                    .collect(),
            };
            let res = self.http.post_json::<BatchEmbedResponse, _>(&url, &self.auth, &body)?;
            Ok(res.embeddings.into_iter().map(|e| e.values).collect())
        })
    }
}

impl Generator for GeminiClient {
    fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.url, self.chat_model);
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                text_content(Some(role), &m.content)
            })
            .collect();
        let body = GenerateRequest {
            system_instruction: (!system.is_empty())
                .then(|| text_content(None, &system.join("\n\n"))),
            contents,
        };
        let res = self.http.post_json::<GenerateResponse, _>(&url, &self.auth, &body)?;
        let text = res
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .ok_or_else(|| RagError::ExternalService("gemini returned no candidates".to_string()))?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_messages_become_system_instruction() {
        let body = GenerateRequest {
            system_instruction: Some(text_content(None, "be brief")),
            contents: vec![text_content(Some("user"), "hi")],
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(value["contents"][0]["role"], "user");
        assert!(value["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn reads_candidate_text_and_embedding_values() {
        let res: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Four"}, {"text": " feet."}]}}]
        }))
        .expect("generate response");
        let content = res.candidates.into_iter().next().and_then(|c| c.content).expect("content");
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        assert_eq!(text, "Four feet.");

        let res: BatchEmbedResponse =
            serde_json::from_value(json!({"embeddings": [{"values": [0.1, 0.2]}]}))
                .expect("embed response");
        assert_eq!(res.embeddings[0].values, vec![0.1, 0.2]);
    }
}
