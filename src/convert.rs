//! Top-level conversion entry points.
//!
//! ## Steps
//!
//! 1. Resolve every input to page sources (directories, ZIPs, URLs, cache
//!    roots expanded into their pages).
//! 2. Load page results concurrently, keeping page order.
//! 3. Compose the deck on a blocking thread.
//! 4. Optionally serialise it to `.pptx` and write it atomically.
//!
//! A page that fails to load is reported and omitted; only when *every*
//! page fails does conversion return an error.

use crate::compose::compose;
use crate::config::ConversionConfig;
use crate::error::{PageError, Pdf2PptxError};
use crate::model::PageResult;
use crate::output::{ConversionReport, OutputDocument};
use crate::pipeline::input;
use crate::pptx::PptxWriter;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load every page result and compose the deck.
///
/// # Arguments
/// * `inputs` — page result sources, in page order: result directories,
///   result ZIPs, HTTP(S) URLs of result ZIPs, or cache roots
/// * `config` — conversion configuration
///
/// # Errors
/// Returns `Err(Pdf2PptxError)` only for fatal errors:
/// - a source path does not exist or is not a result
/// - the configuration is invalid
/// - every page failed to load
pub async fn convert<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<OutputDocument, Pdf2PptxError> {
    let start = Instant::now();
    config.validate()?;

    // ── Step 1: Resolve inputs ───────────────────────────────────────────
    let sources = input::expand_sources(inputs)?;
    let total = sources.len();
    info!("Converting {} page results", total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    // ── Step 2: Load page results ────────────────────────────────────────
    let pages = load_pages(&sources, config).await;
    let loaded = pages.iter().filter(|p| p.is_ok()).count();
    if loaded == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.as_ref().err())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2PptxError::AllPagesFailed { total, first_error });
    }
    debug!("Loaded {}/{} page results", loaded, total);

    // ── Step 3: Compose ──────────────────────────────────────────────────
    let owned = config.clone();
    let doc = tokio::task::spawn_blocking(move || compose(pages, &owned))
        .await
        .map_err(|e| Pdf2PptxError::Internal(format!("compose task panicked: {}", e)))?;

    info!(
        "Conversion complete: {} slides from {} pages in {}ms",
        doc.slides.len(),
        total,
        start.elapsed().as_millis()
    );
    Ok(doc)
}

async fn load_pages(
    sources: &[input::PageSource],
    config: &ConversionConfig,
) -> Vec<Result<PageResult, PageError>> {
    let total = sources.len();
    let timeout = config.download_timeout_secs;
    stream::iter(sources.iter().enumerate())
        .map(|(index, source)| {
            let callback = config.progress_callback.clone();
            async move {
                let result = input::load_page(index, source, timeout).await;
                match &result {
                    Ok(page) => {
                        debug!("Loaded page {} from {}", index + 1, source);
                        if let Some(cb) = &callback {
                            cb.on_page_loaded(index + 1, total, page.content.elements.len());
                        }
                    }
                    Err(e) => {
                        warn!("{}", e);
                        if let Some(cb) = &callback {
                            cb.on_page_error(e.page(), total, &e.to_string());
                        }
                    }
                }
                result
            }
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await
}

/// Convert and serialise to `.pptx` bytes.
pub async fn convert_to_bytes<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<(Vec<u8>, ConversionReport), Pdf2PptxError> {
    let doc = convert(inputs, config).await?;
    serialize(doc, None).await
}

/// Convert and write the deck to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2PptxError> {
    let path = output_path.as_ref();
    let doc = convert(inputs, config).await?;
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());
    let (bytes, report) = serialize(doc, title).await?;

    let write_err = |e| Pdf2PptxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pptx.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(report)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<OutputDocument, Pdf2PptxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2PptxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, config))
}

/// Serialise on the blocking pool; ZIP deflate is CPU-bound.
async fn serialize(
    doc: OutputDocument,
    title: Option<String>,
) -> Result<(Vec<u8>, ConversionReport), Pdf2PptxError> {
    tokio::task::spawn_blocking(move || {
        let mut writer = PptxWriter::new(&doc);
        if let Some(title) = title {
            writer = writer.with_title(title);
        }
        let bytes = writer.generate()?;
        Ok::<_, Pdf2PptxError>((bytes, doc.report()))
    })
    .await
    .map_err(|e| Pdf2PptxError::Internal(format!("serialise task panicked: {}", e)))?
}
