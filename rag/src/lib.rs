mod backend;
mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod extract_text;
mod gemini;
mod generate;
mod hash_embed;
mod http;
mod ollama;
mod openai;
mod retrieve_chunks;
mod service;
mod store_index;
mod vector_index;

pub use backend::{Backend, Embedder, Generator};
pub use build_prompt::{build_prompt_with_context, format_context, Message};
pub use chunk_text::chunk_text;
pub use config::{ChatProvider, Config, EmbedProvider, DEFAULT_SYSTEM_PROMPT};
pub use error::{ErrorKind, RagError, Result};
pub use extract_text::{PdfToText, TextExtractor};
pub use generate::generate_answer;
pub use hash_embed::HashEmbedder;
pub use retrieve_chunks::retrieve_top;
pub use service::{
    ChatReply, IngestOutcome, RagService, ServiceStatus, UploadFile, UploadReceipt,
    ACCEPTED_CONTENT_TYPES, NOT_READY_MESSAGE,
};
pub use store_index::{build_and_save_index, load_index, LoadedIndex};
pub use vector_index::{normalize, FlatIndex, Neighbor};
