use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RagError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an Expert.\n\
Use only the provided context to answer the question.\n\
If the answer is not in the context, say you don't know.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedProvider {
    Ollama,
    Gemini,
    OpenAi,
    /// Offline feature-hashing embedder, no network.
    Hash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatProvider {
    Ollama,
    Gemini,
    OpenAi,
}

impl FromStr for EmbedProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "hash" => Ok(Self::Hash),
            other => Err(RagError::Config(format!("unknown embed provider '{}'", other))),
        }
    }
}

impl FromStr for ChatProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(RagError::Config(format!("unknown chat provider '{}'", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub url: String,
    pub embed_model: String,
    pub chat_model: String,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub embed_model: String,
    pub chat_model: String,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub embed_model: String,
    pub chat_model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embed_provider: EmbedProvider,
    pub chat_provider: ChatProvider,
    pub hash_dim: usize,
    pub system_prompt: String,
    pub request_timeout: Duration,
    pub chat_deadline: Duration,
    pub pdftotext_bin: String,
    pub ollama: OllamaConfig,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            chunk_size: 1500,
            chunk_overlap: 200,
            top_k: 4,
            embed_provider: EmbedProvider::Ollama,
            chat_provider: ChatProvider::Ollama,
            hash_dim: 384,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout: Duration::from_secs(120),
            chat_deadline: Duration::from_secs(300),
            pdftotext_bin: "pdftotext".to_string(),
            ollama: OllamaConfig {
                url: "http://localhost:11434".to_string(),
                embed_model: "nomic-embed-text".to_string(),
                chat_model: "llama3.1".to_string(),
            },
            gemini: GeminiConfig {
                url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: None,
                embed_model: "text-embedding-004".to_string(),
                chat_model: "gemini-2.0-flash".to_string(),
            },
            openai: OpenAiConfig {
                url: "https://api.openai.com/v1".to_string(),
                api_key: None,
                embed_model: "text-embedding-3-small".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env if present so API keys work without manual `source .env`.
        let _ = dotenvy::dotenv();
        let d = Self::default();
        let cfg = Self {
            data_dir: env::var("RAG_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            chunk_size: parsed("RAG_CHUNK_SIZE").unwrap_or(d.chunk_size),
            chunk_overlap: parsed("RAG_CHUNK_OVERLAP").unwrap_or(d.chunk_overlap),
            top_k: parsed("RAG_TOP_K").unwrap_or(d.top_k),
            embed_provider: match env::var("RAG_EMBED_PROVIDER") {
                Ok(v) => v.parse()?,
                Err(_) => d.embed_provider,
            },
            chat_provider: match env::var("RAG_CHAT_PROVIDER") {
                Ok(v) => v.parse()?,
                Err(_) => d.chat_provider,
            },
            hash_dim: parsed("RAG_HASH_DIM").unwrap_or(d.hash_dim),
            system_prompt: env::var("RAG_SYSTEM_PROMPT").unwrap_or(d.system_prompt),
            request_timeout: parsed("RAG_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.request_timeout),
            chat_deadline: parsed("RAG_CHAT_DEADLINE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.chat_deadline),
            pdftotext_bin: env::var("PDFTOTEXT_BIN").unwrap_or(d.pdftotext_bin),
            ollama: OllamaConfig {
                url: env::var("OLLAMA_URL").unwrap_or(d.ollama.url),
                embed_model: env::var("OLLAMA_EMBED_MODEL").unwrap_or(d.ollama.embed_model),
                chat_model: env::var("OLLAMA_CHAT_MODEL").unwrap_or(d.ollama.chat_model),
            },
            gemini: GeminiConfig {
                url: env::var("GEMINI_URL").unwrap_or(d.gemini.url),
                api_key: non_empty("GEMINI_API_KEY"),
                embed_model: env::var("GEMINI_EMBED_MODEL").unwrap_or(d.gemini.embed_model),
                chat_model: env::var("GEMINI_CHAT_MODEL").unwrap_or(d.gemini.chat_model),
            },
            openai: OpenAiConfig {
                url: env::var("OPENAI_URL").unwrap_or(d.openai.url),
                api_key: non_empty("OPENAI_API_KEY"),
                embed_model: env::var("OPENAI_EMBED_MODEL").unwrap_or(d.openai.embed_model),
                chat_model: env::var("OPENAI_CHAT_MODEL").unwrap_or(d.openai.chat_model),
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings that would make the pipeline misbehave later.
    ///
    /// An overlap at or above the chunk size would stall or rewind the
    /// chunker cursor, so it is refused here rather than clamped.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("RAG_CHUNK_SIZE must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "RAG_CHUNK_OVERLAP ({}) must be smaller than RAG_CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("RAG_TOP_K must be greater than 0".to_string()));
        }
        if self.embed_provider == EmbedProvider::Hash && self.hash_dim == 0 {
            return Err(RagError::Config("RAG_HASH_DIM must be greater than 0".to_string()));
        }
        let needs_gemini = self.embed_provider == EmbedProvider::Gemini
            || self.chat_provider == ChatProvider::Gemini;
        if needs_gemini && self.gemini.api_key.is_none() {
            return Err(RagError::Config("GEMINI_API_KEY is not set".to_string()));
        }
        let needs_openai = self.embed_provider == EmbedProvider::OpenAi
            || self.chat_provider == ChatProvider::OpenAi;
        if needs_openai && self.openai.api_key.is_none() {
            return Err(RagError::Config("OPENAI_API_KEY is not set".to_string()));
        }
        Ok(())
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.data_dir.join("knowledge.pdf")
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.json")
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.data_dir.join("chunks.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("pdfchat.log")
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("defaults should validate");
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let cfg = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        let err = cfg.validate().expect_err("overlap == size must fail");
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn remote_provider_without_key_fails_fast() {
        let cfg = Config {
            chat_provider: ChatProvider::Gemini,
            ..Config::default()
        };
        let err = cfg.validate().expect_err("missing key must fail");
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn parses_provider_names() {
        assert_eq!("OpenAI".parse::<EmbedProvider>().expect("openai"), EmbedProvider::OpenAi);
        assert_eq!(" hash ".parse::<EmbedProvider>().expect("hash"), EmbedProvider::Hash);
        assert!("hash".parse::<ChatProvider>().is_err());
    }
}
