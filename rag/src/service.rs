//! Upload, ingest and chat over a single stored document.
//!
//! The service starts without an in-memory index. `ingest` builds one from
//! the stored PDF and keeps it; `chat` falls back to the persisted artifacts
//! after a restart. The (index, chunks) pair lives behind one `Arc` and is
//! only ever replaced whole.

use std::fs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::chunk_text::chunk_text;
use crate::config::Config;
use crate::error::{ErrorKind, RagError, Result};
use crate::extract_text::{PdfToText, TextExtractor};
use crate::generate::generate_answer;
use crate::retrieve_chunks::retrieve_top;
use crate::store_index::{build_and_save_index, load_index, write_atomic, LoadedIndex};

pub const NOT_READY_MESSAGE: &str = "System not ready. Please upload a PDF and run ingest first.";

pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

#[derive(Clone, Debug)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub filename: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum IngestOutcome {
    #[serde(rename = "ok")]
    Success { chunks_count: usize },
    #[serde(rename = "error")]
    Failed { kind: ErrorKind, message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatReply {
    Answer { answer: String, context: Vec<String> },
    NotReady,
}

impl ChatReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer { answer, .. } => answer,
            Self::NotReady => NOT_READY_MESSAGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub document_stored: bool,
    pub index_persisted: bool,
    pub ready: bool,
    pub chunks: usize,
}

pub struct RagService {
    cfg: Config,
    backend: Backend,
    extractor: Box<dyn TextExtractor>,
    /// Held for every read or write of the files in the data directory.
    /// Always taken before `state`.
    disk: Mutex<()>,
    state: Mutex<Option<Arc<LoadedIndex>>>,
}

impl RagService {
    pub fn new(cfg: Config, backend: Backend, extractor: Box<dyn TextExtractor>) -> Result<Self> {
        cfg.validate()?;
        fs::create_dir_all(&cfg.data_dir)
            .map_err(|e| RagError::io(format!("creating {}", cfg.data_dir.display()), e))?;
        Ok(Self {
            cfg,
            backend,
            extractor,
            disk: Mutex::new(()),
            state: Mutex::new(None),
        })
    }

    pub fn from_config(cfg: Config) -> Result<Self> {
        let backend = Backend::from_config(&cfg)?;
        let extractor = Box::new(PdfToText::new(cfg.pdftotext_bin.clone()));
        Self::new(cfg, backend, extractor)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.state).is_some()
    }

    pub fn status(&self) -> ServiceStatus {
        let _disk = lock(&self.disk);
        let loaded = lock(&self.state).clone();
        ServiceStatus {
            document_stored: self.cfg.pdf_path().is_file(),
            index_persisted: self.persisted_exists(),
            ready: loaded.is_some(),
            chunks: loaded.map(|l| l.len()).unwrap_or_default(),
        }
    }

    /// Stores `file` as the single document, replacing any previous one.
    /// The in-memory index is left as it is until the next ingest.
    pub fn upload(&self, file: UploadFile) -> Result<UploadReceipt> {
        let content_type = file.content_type.trim().to_ascii_lowercase();
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(RagError::InvalidInput(format!(
                "File must be a PDF (got '{}')",
                file.content_type
            )));
        }
        let path = self.cfg.pdf_path();
        {
            let _disk = lock(&self.disk);
            write_atomic(&path, &file.bytes)?;
        }
        info!(filename = %file.filename, bytes = file.bytes.len(), "document uploaded");
        Ok(UploadReceipt {
            filename: file.filename,
            message: "File uploaded. Run ingest to process it.".to_string(),
        })
    }

    /// Rebuilds the index from the stored document.
    ///
    /// Never fails hard: any error is reported in the outcome and the
    /// previously loaded index, if any, stays in place.
    pub fn ingest(&self) -> IngestOutcome {
        match self.try_ingest() {
            Ok(chunks_count) => IngestOutcome::Success { chunks_count },
            Err(err) => {
                warn!(error = %err, "ingest failed");
                IngestOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        }
    }

    fn try_ingest(&self) -> Result<usize> {
        let _disk = lock(&self.disk);

        let pdf_path = self.cfg.pdf_path();
        if !pdf_path.is_file() {
            return Err(RagError::NotFound(
                "No PDF found. Please upload one first.".to_string(),
            ));
        }

        let text = self.extractor.extract(&pdf_path)?;
        let chunks = chunk_text(&text, self.cfg.chunk_size, self.cfg.chunk_overlap);
        if chunks.is_empty() {
            return Err(RagError::EmptyContent("PDF extracted text is empty.".to_string()));
        }
        info!(chunks = chunks.len(), "document chunked");

        let index_path = self.cfg.index_path();
        let chunks_path = self.cfg.chunks_path();
        build_and_save_index(self.backend.embedder.as_ref(), &chunks, &index_path, &chunks_path)?;
        let loaded = Arc::new(load_index(&index_path, &chunks_path)?);
        let count = loaded.len();

        *lock(&self.state) = Some(loaded);
        Ok(count)
    }

    /// Answers `message` from the loaded document.
    ///
    /// Returns [`ChatReply::NotReady`] when nothing has been ingested yet,
    /// neither in this process nor on disk. Readiness is checked first, so
    /// a blank message only becomes `InvalidInput` once a document is loaded.
    pub fn chat(&self, message: &str) -> Result<ChatReply> {
        let Some(loaded) = self.loaded_or_recover()? else {
            return Ok(ChatReply::NotReady);
        };
        if message.trim().is_empty() {
            return Err(RagError::InvalidInput("message is empty".to_string()));
        }

        let embedder = self.backend.embedder.as_ref();
        let context = retrieve_top(embedder, &loaded, message, self.cfg.top_k)?;
        let answer = generate_answer(
            &self.cfg,
            self.backend.generator.as_ref(),
            message,
            &context,
        )?;
        Ok(ChatReply::Answer { answer, context })
    }

    fn loaded_or_recover(&self) -> Result<Option<Arc<LoadedIndex>>> {
        if let Some(loaded) = lock(&self.state).clone() {
            return Ok(Some(loaded));
        }

        let _disk = lock(&self.disk);
        let mut state = lock(&self.state);
        // An ingest may have finished while we waited for the disk lock.
        if let Some(loaded) = state.clone() {
            return Ok(Some(loaded));
        }
        if !self.persisted_exists() {
            return Ok(None);
        }
        info!("loading persisted index");
        let loaded = Arc::new(load_index(&self.cfg.index_path(), &self.cfg.chunks_path())?);
        *state = Some(loaded.clone());
        Ok(Some(loaded))
    }

    fn persisted_exists(&self) -> bool {
        self.cfg.index_path().is_file() && self.cfg.chunks_path().is_file()
    }
}

/// The guarded values are only ever replaced whole, so a poisoned lock
/// still holds a consistent value.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
