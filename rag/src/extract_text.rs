use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::error::{RagError, Result};

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Extracts text with poppler's `pdftotext` binary.
pub struct PdfToText {
    bin: String,
}

impl PdfToText {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl TextExtractor for PdfToText {
    fn extract(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.bin)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                RagError::ExternalService(format!(
                    "failed to run {}: {} (is poppler installed?)",
                    self.bin, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "pdftotext failed");
            return Err(RagError::ExternalService(format!(
                "{} failed: {}",
                self.bin,
                stderr.trim()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!(chars = text.chars().count(), "extracted pdf text");
        Ok(text)
    }
}
