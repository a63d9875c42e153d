//! Error types for the pdfquery library.
//!
//! One enum, [`QueryError`], covers every failure the library can surface.
//! Variants are grouped by the pipeline stage they belong to, and
//! [`QueryError::stage`] reports that stage so callers can tell a broken PDF
//! apart from a provider outage without matching on individual variants.
//!
//! Every error is fatal for the call that produced it: a page that cannot be
//! rendered aborts its document load, a payload built over zero documents is
//! a caller bug, and a failed or malformed completion call is returned as-is.
//! Nothing is retried here — retry policy belongs to the transport collaborator.

use std::path::PathBuf;
use thiserror::Error;

/// The pipeline stage a [`QueryError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Opening, reading, or rasterising a PDF source.
    Load,
    /// Building the request payload or message history.
    Build,
    /// The remote completion call and response decoding.
    Request,
}

/// All errors returned by the pdfquery library.
#[derive(Debug, Error)]
pub enum QueryError {
    // ── Source errors (load stage) ────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Render errors (load stage) ────────────────────────────────────────
    /// pdfium returned an error for a specific page. The whole document load
    /// is aborted — partial documents are never returned.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// A rendered page could not be encoded in the requested image format.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    // ── Context errors (build stage) ──────────────────────────────────────
    /// A payload or message history was requested with zero documents added.
    #[error("No documents in the context.\nAdd at least one document with add_document() before building.")]
    EmptyContext,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Provider errors (request stage) ───────────────────────────────────
    /// The transport call itself failed (connection, TLS, timeout).
    #[error("Completion request failed: {detail}")]
    RequestFailed { detail: String },

    /// The provider answered with a non-success HTTP status.
    #[error("Provider returned HTTP {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// The provider response body could not be decoded or is missing the
    /// parts normalisation needs (e.g. no completion choices).
    #[error("Malformed provider response: {detail}")]
    MalformedResponse { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task join failure, tempfile I/O).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// The pipeline stage this error originated from.
    pub fn stage(&self) -> QueryStage {
        match self {
            QueryError::FileNotFound { .. }
            | QueryError::PermissionDenied { .. }
            | QueryError::NotAPdf { .. }
            | QueryError::CorruptPdf { .. }
            | QueryError::RenderFailed { .. }
            | QueryError::EncodeFailed { .. } => QueryStage::Load,
            QueryError::EmptyContext | QueryError::InvalidConfig(_) => QueryStage::Build,
            QueryError::RequestFailed { .. }
            | QueryError::ApiStatus { .. }
            | QueryError::MalformedResponse { .. } => QueryStage::Request,
            // Internal errors almost always come from the blocking render task.
            QueryError::Internal(_) => QueryStage::Load,
        }
    }
}
