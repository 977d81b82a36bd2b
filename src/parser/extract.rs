//! Text extraction with encoding recovery
//!
//! PDF text extraction does not tell us what encoding the embedded text
//! actually used, and resumes from CJK locales regularly come out as
//! mojibake. The recovery loop reinterprets the extracted text under a
//! short candidate list and keeps the first variant that crosses a
//! readability threshold.

use std::borrow::Cow;

use async_trait::async_trait;
use encoding_rs::Encoding;
use thiserror::Error;

/// Minimum fraction of printable characters for text to count as
/// readable.
pub const READABILITY_THRESHOLD: f64 = 0.30;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("text extraction failed: {0}")]
    Extraction(String),
}

/// Extracts plain text from a document's raw bytes. Page structure is
/// flattened; the parsing pipeline only needs the words.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, data: &[u8]) -> Result<String, ExtractError>;
}

/// pdf-extract backed extractor. The extraction itself is CPU-bound and
/// runs on the blocking pool.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, data: &[u8]) -> Result<String, ExtractError> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| ExtractError::Extraction(e.to_string()))
        })
        .await
        .map_err(|e| ExtractError::Extraction(format!("extraction task failed: {e}")))?
    }
}

/// Fraction of characters that are printable ASCII or common CJK
/// ideographs. Empty text scores zero.
pub fn readability_score(text: &str) -> f64 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        let code = c as u32;
        if (0x20..=0x7E).contains(&code) || (0x4E00..=0x9FFF).contains(&code) {
            printable += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    printable as f64 / total as f64
}

/// Try the candidate encodings in order and return the first readable
/// variant, or `None` when nothing clears the threshold.
///
/// Candidate order matters: the raw text first (the common case), then
/// the GBK family, then UTF-8 as written.
pub fn decode_readable(text: &str) -> Option<String> {
    let candidates: [Option<&'static Encoding>; 4] = [
        None,
        Some(encoding_rs::GBK),
        Encoding::for_label(b"gb2312"),
        Some(encoding_rs::UTF_8),
    ];

    for candidate in candidates {
        let decoded: Cow<'_, str> = match candidate {
            None => Cow::Borrowed(text),
            Some(encoding) => {
                let (decoded, _, _) = encoding.decode(text.as_bytes());
                decoded
            }
        };
        let score = readability_score(&decoded);
        if score >= READABILITY_THRESHOLD {
            tracing::debug!(
                encoding = candidate.map(|e| e.name()).unwrap_or("raw"),
                score,
                "Accepted text encoding candidate"
            );
            return Some(decoded.into_owned());
        }
    }

    None
}
