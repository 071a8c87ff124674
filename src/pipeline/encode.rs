//! Document encoding: invoice file → base64 payload for the provider request.
//!
//! The Gemini API accepts documents as `inline_data` parts holding standard
//! base64. The PDF is sent as-is; no rasterisation or text extraction
//! happens locally, the model reads the document itself.

use crate::error::LedgerError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// MIME type attached to every encoded invoice.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A document ready to embed in a JSON request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    /// Standard (padded) base64.
    pub data: String,
    pub mime_type: &'static str,
    /// Size of the original document in bytes.
    pub byte_len: usize,
}

/// Read and encode the document at `path`.
///
/// # Errors
/// `FileNotFound`, `PermissionDenied`, `ReadFailed` for I/O failures and
/// `EmptyDocument` for a zero-byte file.
pub async fn encode_document(path: impl AsRef<Path>) -> Result<EncodedDocument, LedgerError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => LedgerError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => LedgerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => LedgerError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if bytes.is_empty() {
        return Err(LedgerError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }
    if !bytes.starts_with(b"%PDF") {
        warn!("'{}' does not start with %PDF; sending it anyway", path.display());
    }

    Ok(encode_bytes(&bytes))
}

/// Encode an in-memory document. Deterministic.
pub fn encode_bytes(bytes: &[u8]) -> EncodedDocument {
    let data = STANDARD.encode(bytes);
    debug!("Encoded document: {} bytes → {} bytes base64", bytes.len(), data.len());

    EncodedDocument {
        data,
        mime_type: PDF_MIME_TYPE,
        byte_len: bytes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TINY_PDF: &[u8] = b"%PDF-1.4\n1 0 obj<<>>endobj\ntrailer<<>>\n%%EOF\n\x00\xff\x10";

    #[test]
    fn encoded_bytes_decode_back_to_original() {
        let doc = encode_bytes(TINY_PDF);
        assert_eq!(doc.mime_type, "application/pdf");
        assert_eq!(doc.byte_len, TINY_PDF.len());
        let decoded = STANDARD.decode(&doc.data).expect("valid base64");
        assert_eq!(decoded, TINY_PDF);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode_bytes(TINY_PDF), encode_bytes(TINY_PDF));
    }

    #[tokio::test]
    async fn encode_document_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TINY_PDF).unwrap();

        let doc = encode_document(file.path()).await.expect("encode should succeed");
        assert_eq!(STANDARD.decode(&doc.data).unwrap(), TINY_PDF);
    }

    #[tokio::test]
    async fn missing_file_is_an_encoding_error() {
        let err = encode_document("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, LedgerError::FileNotFound { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
    }

    #[tokio::test]
    async fn empty_file_is_an_encoding_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = encode_document(file.path()).await.unwrap_err();
        assert!(matches!(err, LedgerError::EmptyDocument { .. }));
    }
}
