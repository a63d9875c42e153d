//! PDF document loading: per-page text extraction and rasterisation.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the whole load onto a dedicated
//! blocking-pool thread so Tokio workers never stall on CPU-heavy rendering.
//!
//! ## Load semantics
//!
//! A load either produces a complete [`Document`] — every page with its text
//! layer, classification, and exactly one encoded raster image — or fails.
//! There are no partial documents and no per-page retries: pdfium rendering
//! is deterministic, so a page that fails to render means the source itself
//! is unusable.

use crate::config::LoaderConfig;
use crate::error::QueryError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Trimmed-character threshold below which a page counts as image-only.
///
/// A bare page number or stray whitespace in the text layer must not make a
/// scanned page look text-bearing.
const MIN_TEXT_CHARS: usize = 10;

/// Content extracted from a single PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number; contiguous 1..=N in document order.
    pub page_number: u32,
    /// Text extracted from the page's text layer, possibly empty.
    pub text: String,
    /// True when the trimmed text layer is long enough to be meaningful.
    pub has_text: bool,
    /// Encoded raster image of the page. Exactly one per page.
    pub image: Vec<u8>,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
}

impl Page {
    /// The page image as a `data:` URI for embedding in a request body.
    pub fn to_data_uri(&self, mime_type: &str) -> String {
        format!("data:{};base64,{}", mime_type, STANDARD.encode(&self.image))
    }
}

/// A loaded PDF document: ordered pages plus the config used to render them.
///
/// Constructed once by [`Document::load`] (or [`Document::from_pages`] for
/// in-memory sources) and immutable thereafter. Holds no resources beyond
/// the decoded pages.
#[derive(Debug, Clone)]
pub struct Document {
    source_id: String,
    pages: Vec<Page>,
    config: LoaderConfig,
}

impl Document {
    /// Load a PDF from a file path.
    ///
    /// # Errors
    /// - Source errors (`FileNotFound`, `PermissionDenied`, `NotAPdf`,
    ///   `CorruptPdf`) when the input is not a readable, valid PDF.
    /// - `RenderFailed` / `EncodeFailed` when any page cannot be rasterised
    ///   or encoded — the whole load fails.
    pub async fn load(
        path: impl AsRef<Path>,
        config: &LoaderConfig,
    ) -> Result<Document, QueryError> {
        let path = path.as_ref().to_path_buf();
        validate_pdf_source(&path)?;

        let source_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let cfg = config.clone();
        let pages = tokio::task::spawn_blocking(move || load_pages_blocking(&path, &cfg))
            .await
            .map_err(|e| QueryError::Internal(format!("load task panicked: {e}")))??;

        if pages.is_empty() {
            warn!("'{}' loaded with zero pages", source_id);
        }

        Ok(Document {
            source_id,
            pages,
            config: config.clone(),
        })
    }

    /// Load a PDF from an in-memory byte buffer.
    ///
    /// pdfium requires a file-system path, so the bytes are written to a
    /// managed tempfile that is cleaned up on return or panic. `name` becomes
    /// the document's citation label.
    pub async fn load_from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        config: &LoaderConfig,
    ) -> Result<Document, QueryError> {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new()
            .map_err(|e| QueryError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| QueryError::Internal(format!("tempfile write: {e}")))?;

        // `tmp` is dropped (and the file deleted) when this function returns.
        let loaded = Document::load(tmp.path(), config).await?;
        Ok(Document {
            source_id: name.into(),
            ..loaded
        })
    }

    /// Build a document from pre-extracted pages.
    ///
    /// Intended for tests and callers with their own extraction front-end;
    /// `pages` must already be in physical order with contiguous 1-based
    /// page numbers.
    pub fn from_pages(
        source_id: impl Into<String>,
        pages: Vec<Page>,
        config: LoaderConfig,
    ) -> Document {
        Document {
            source_id: source_id.into(),
            pages,
            config,
        }
    }

    /// Identifier used in citation labels (file name or logical name).
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Pages in physical order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page by its 1-based number.
    pub fn get_page(&self, page_number: u32) -> Option<&Page> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx as usize))
    }

    /// MIME type of the encoded page images.
    pub fn mime_type(&self) -> &'static str {
        self.config.image_format.mime_type()
    }
}

/// Classify whether an extracted text layer is meaningful.
fn has_meaningful_text(text: &str) -> bool {
    text.trim().chars().count() > MIN_TEXT_CHARS
}

/// Check existence, readability, and `%PDF` magic bytes before handing the
/// path to pdfium, so callers get a typed error rather than a pdfium crash.
fn validate_pdf_source(path: &Path) -> Result<(), QueryError> {
    use std::io::Read;

    if !path.exists() {
        return Err(QueryError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(QueryError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(QueryError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(QueryError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Blocking implementation of the per-page extraction loop.
fn load_pages_blocking(pdf_path: &PathBuf, config: &LoaderConfig) -> Result<Vec<Page>, QueryError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| QueryError::CorruptPdf {
            path: pdf_path.clone(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages from '{}'", pages.len(), pdf_path.display());

    let mut out = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let page_number = idx + 1;

        let text = page.text().map(|t| t.all()).unwrap_or_default();
        let has_text = has_meaningful_text(&text);

        // Target width from DPI and the page's physical size (points are
        // 1/72 inch), capped so an oversized page cannot exhaust memory.
        let width_pts = page.width().value;
        let target_width = ((width_pts / 72.0) * config.dpi as f32).round() as u32;
        let target_width = target_width.clamp(1, config.max_rendered_pixels);

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .set_maximum_height(config.max_rendered_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| QueryError::RenderFailed {
                page: page_number,
                detail: format!("{e:?}"),
            })?;

        let img = bitmap.as_image();
        debug!(
            "rendered page {} → {}x{} px, text layer: {}",
            page_number,
            img.width(),
            img.height(),
            if has_text { "yes" } else { "no" }
        );

        let (width, height) = (img.width(), img.height());
        let image = encode_image(&img, config).map_err(|e| QueryError::EncodeFailed {
            page: page_number,
            detail: e.to_string(),
        })?;

        out.push(Page {
            page_number: page_number as u32,
            text,
            has_text,
            image,
            width,
            height,
        });
    }

    Ok(out)
}

/// Encode a rendered page in the configured image format.
///
/// JPEG cannot carry an alpha channel, so RGBA renders are flattened to RGB
/// first; PNG keeps the bitmap as-is (lossless, text stays crisp).
fn encode_image(img: &DynamicImage, config: &LoaderConfig) -> Result<Vec<u8>, image::ImageError> {
    let format = config.image_format;
    let flattened;
    let img = if format == crate::config::ImageFormat::Jpeg {
        flattened = DynamicImage::ImageRgb8(img.to_rgb8());
        &flattened
    } else {
        img
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format.to_image_format())?;
    debug!("encoded page image → {} bytes", buf.len());
    Ok(buf)
}
