use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use twox_hash::XxHash64;

use crate::backend::Embedder;
use crate::embed_chunks::embed_chunks;
use crate::error::{RagError, Result};
use crate::vector_index::FlatIndex;

/// An index and the chunk list it was built from. Position `i` in the index
/// always refers to `chunks[i]`.
#[derive(Clone, Debug)]
pub struct LoadedIndex {
    pub index: FlatIndex,
    pub chunks: Vec<String>,
}

impl LoadedIndex {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// On-disk form of the index. The chunk fingerprint ties the file to the
/// exact chunk list written alongside it.
#[derive(Serialize, Deserialize)]
struct StoredIndex {
    chunk_count: usize,
    chunk_digest: u64,
    index: FlatIndex,
}

/// Embeds `chunks`, builds a fresh index and writes both artifacts,
/// replacing whatever was stored at those paths.
pub fn build_and_save_index(
    embedder: &dyn Embedder,
    chunks: &[String],
    index_path: &Path,
    chunks_path: &Path,
) -> Result<()> {
    if chunks.is_empty() {
        return Err(RagError::EmptyContent("no chunks to index".to_string()));
    }
    let vectors = embed_chunks(embedder, chunks)?;
    let dim = vectors.first().map(Vec::len).unwrap_or_default();
    if dim == 0 {
        return Err(RagError::ExternalService("embedder returned empty vectors".to_string()));
    }

    let mut index = FlatIndex::new(dim, embedder.model_id());
    for v in vectors {
        index.add(v)?;
    }

    let chunk_bytes = serde_json::to_vec(chunks)?;
    let stored = StoredIndex {
        chunk_count: chunks.len(),
        chunk_digest: digest(&chunk_bytes),
        index,
    };

    // Both temp files must exist before either artifact is replaced.
    let index_tmp = write_tmp(index_path, &serde_json::to_vec(&stored)?)?;
    let chunks_tmp = match write_tmp(chunks_path, &chunk_bytes) {
        Ok(tmp) => tmp,
        Err(e) => {
            discard(&index_tmp);
            return Err(e);
        }
    };
    if let Err(e) = commit(&index_tmp, index_path) {
        discard(&chunks_tmp);
        return Err(e);
    }
    commit(&chunks_tmp, chunks_path)?;
    info!(
        chunks = chunks.len(),
        dim,
        index = %index_path.display(),
        "index built and saved"
    );
    Ok(())
}

pub fn load_index(index_path: &Path, chunks_path: &Path) -> Result<LoadedIndex> {
    let stored: StoredIndex = serde_json::from_slice(&read_artifact(index_path)?)?;
    let chunks: Vec<String> = serde_json::from_slice(&read_artifact(chunks_path)?)?;
    let index = stored.index;
    if index.len() != chunks.len() || stored.chunk_count != chunks.len() {
        return Err(RagError::Index(format!(
            "index holds {} vectors but chunk list holds {} entries",
            index.len(),
            chunks.len()
        )));
    }
    if stored.chunk_digest != digest(&serde_json::to_vec(&chunks)?) {
        return Err(RagError::Index(
            "chunk list does not match the one the index was built from".to_string(),
        ));
    }
    index.check_vectors()?;
    info!(chunks = chunks.len(), model = index.model_id(), "index loaded");
    Ok(LoadedIndex { index, chunks })
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RagError::NotFound(path.display().to_string())
        } else {
            RagError::io(format!("reading {}", path.display()), e)
        }
    })
}

/// Writes to a sibling temp file, then renames over `path`, so readers never
/// see a half-written artifact.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = write_tmp(path, bytes)?;
    commit(&tmp, path)
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RagError::io(format!("creating {}", parent.display()), e))?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(|e| RagError::io(format!("writing {}", tmp.display()), e))?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).map_err(|e| RagError::io(format!("replacing {}", path.display()), e))
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        warn!(path = %tmp.display(), error = %e, "could not remove temp file");
    }
}

fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
