//! Input resolution: turn user-supplied paths and URLs into page sources.
//!
//! Each page's result can be a directory, a local ZIP, or an HTTP(S) URL of
//! a ZIP. A directory that holds `<hash>_page_<N>/` sub-directories (the
//! layout a result cache uses) expands into one source per page, ordered by
//! `N`. Fatal problems with the inputs themselves (missing paths, nothing to
//! convert) are reported before any page is loaded; problems loading a single
//! page become a [`PageError`] for that page only.

use crate::error::{PageError, Pdf2PptxError};
use crate::model::PageResult;
use crate::pipeline::result::{parse_dir, parse_zip};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where one page's result lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// Result files unpacked into a directory.
    Dir(PathBuf),
    /// A result ZIP on disk.
    Zip(PathBuf),
    /// A result ZIP to download.
    Url(String),
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSource::Dir(p) | PageSource::Zip(p) => write!(f, "{}", p.display()),
            PageSource::Url(u) => f.write_str(u),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order, to page sources.
///
/// Cache roots expand in place, so `a.zip cache/ b.zip` yields `a`, then
/// the cached pages, then `b`.
pub fn expand_sources<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PageSource>, Pdf2PptxError> {
    let mut sources = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if is_url(input) {
            sources.push(PageSource::Url(input.to_string()));
        } else {
            sources.extend(resolve_local(input)?);
        }
    }
    if sources.is_empty() {
        return Err(Pdf2PptxError::NoPages);
    }
    debug!("Resolved {} page sources", sources.len());
    Ok(sources)
}

fn resolve_local(path_str: &str) -> Result<Vec<PageSource>, Pdf2PptxError> {
    let path = PathBuf::from(path_str);
    let meta = std::fs::metadata(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2PptxError::PermissionDenied { path: path.clone() },
        _ => Pdf2PptxError::SourceNotFound { path: path.clone() },
    })?;

    if meta.is_file() {
        return if is_zip_file(&path) {
            Ok(vec![PageSource::Zip(path)])
        } else {
            Err(Pdf2PptxError::InvalidInput {
                input: path_str.to_string(),
            })
        };
    }

    if holds_content_list(&path) {
        return Ok(vec![PageSource::Dir(path)]);
    }

    let pages = cached_pages(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2PptxError::PermissionDenied { path: path.clone() },
        _ => Pdf2PptxError::Internal(format!("Failed to list '{}': {}", path.display(), e)),
    })?;
    if pages.is_empty() {
        return Err(Pdf2PptxError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    info!("Expanded cache root {} into {} pages", path.display(), pages.len());
    Ok(pages)
}

/// `.zip` extension, or the `PK` signature for extension-less files.
fn is_zip_file(path: &Path) -> bool {
    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    {
        return true;
    }
    use std::io::Read;
    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .is_ok()
        && magic == *b"PK\x03\x04"
}

fn holds_content_list(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|e| {
                e.file_name()
                    .to_string_lossy()
                    .ends_with("content_list.json")
            })
        })
        .unwrap_or(false)
}

static RE_PAGE_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"_page_(\d+)$").unwrap());

/// Page sub-directories of a cache root, sorted by page number.
fn cached_pages(root: &Path) -> std::io::Result<Vec<PageSource>> {
    let mut pages: Vec<(u64, PageSource)> = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(n) = RE_PAGE_DIR
            .captures(&name)
            .and_then(|c| c[1].parse::<u64>().ok())
        else {
            continue;
        };

        let preferred = path.join("mineru_result.zip");
        let source = if preferred.is_file() {
            PageSource::Zip(preferred)
        } else if let Some(zip) = first_zip(&path)? {
            PageSource::Zip(zip)
        } else {
            // Unpacked result, or nothing at all; loading reports which.
            PageSource::Dir(path)
        };
        pages.push((n, source));
    }
    pages.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pages.into_iter().map(|(_, s)| s).collect())
}

fn first_zip(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut zips: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("zip")))
        .collect();
    zips.sort();
    Ok(zips.into_iter().next())
}

/// Load and parse one page's result. `index` is the 0-based page index.
///
/// Parsing runs on the blocking pool; ZIP inflation and JSON parsing are
/// CPU-bound.
pub async fn load_page(
    index: usize,
    source: &PageSource,
    timeout_secs: u64,
) -> Result<PageResult, PageError> {
    let page = index + 1;
    let task = match source {
        PageSource::Dir(dir) => {
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || parse_dir(index, &dir))
        }
        PageSource::Zip(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| PageError::Missing {
                page,
                detail: format!("{}: {}", path.display(), e),
            })?;
            tokio::task::spawn_blocking(move || parse_zip(index, &bytes))
        }
        PageSource::Url(url) => {
            let bytes = download_bytes(url, timeout_secs)
                .await
                .map_err(|e| PageError::Missing {
                    page,
                    detail: e.to_string(),
                })?;
            tokio::task::spawn_blocking(move || parse_zip(index, &bytes))
        }
    };

    task.await.map_err(|e| PageError::Unparseable {
        page,
        detail: format!("parse task panicked: {}", e),
    })?
}

/// Download a result archive into memory.
pub async fn download_bytes(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Pdf2PptxError> {
    info!("Downloading result from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2PptxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2PptxError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;
    if !response.status().is_success() {
        return Err(Pdf2PptxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}
