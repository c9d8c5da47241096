// Checkpoint Fetcher - Resolve a checkpoint source to a readable local file
// Local paths are used as-is; URLs are streamed into a temp file with progress tracking.
// Nothing is cached: every fetch of a URL downloads it again.

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::errors::CheckpointError;

/// Where a checkpoint lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    /// File on local disk
    Path(PathBuf),
    /// HTTP(S) location
    Url(String),
}

impl CheckpointSource {
    /// Classify a path-or-url string
    pub fn parse(location: &str) -> Self {
        if has_scheme(location, "http://") || has_scheme(location, "https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    /// The location as given, for logging and error messages
    pub fn location(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }

    /// Last path segment of the location (query string stripped)
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Path(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/')
                    .next()
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
            }
        }
    }
}

/// URL schemes are case-insensitive
fn has_scheme(location: &str, scheme: &str) -> bool {
    location
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

impl fmt::Display for CheckpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

/// A checkpoint that can be read from disk
///
/// Downloaded checkpoints are removed when this is dropped.
#[derive(Debug)]
pub enum FetchedCheckpoint {
    Local(PathBuf),
    Downloaded(NamedTempFile),
}

impl FetchedCheckpoint {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Downloaded(file) => file.path(),
        }
    }
}

/// Make a checkpoint source readable from the local filesystem
///
/// This is a blocking operation.
pub fn fetch(
    source: &CheckpointSource,
    show_progress: bool,
) -> Result<FetchedCheckpoint, CheckpointError> {
    match source {
        CheckpointSource::Path(path) => {
            if !path.is_file() {
                return Err(CheckpointError::Io {
                    path: path.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "checkpoint file not found"),
                });
            }
            Ok(FetchedCheckpoint::Local(path.clone()))
        }
        CheckpointSource::Url(url) => download(url, source.file_name(), show_progress),
    }
}

fn download(
    url: &str,
    file_name: Option<String>,
    show_progress: bool,
) -> Result<FetchedCheckpoint, CheckpointError> {
    tracing::info!("Downloading checkpoint from {}", url);

    let fetch_err = |source| CheckpointError::Fetch {
        url: url.to_string(),
        source,
    };

    // No client timeout: large checkpoints take as long as they take
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(fetch_err)?;
    let response = client.get(url).send().map_err(fetch_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CheckpointError::Http {
            url: url.to_string(),
            status,
        });
    }

    // Keep the original extension so the format can still be told apart
    let suffix = file_name
        .as_deref()
        .and_then(|name| name.find('.').map(|idx| name[idx..].to_string()))
        .unwrap_or_default();

    let temp_dir = std::env::temp_dir();
    let temp = tempfile::Builder::new()
        .prefix("ssl-backbones-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|source| CheckpointError::Io {
            path: temp_dir,
            source,
        })?;

    let progress = progress_bar(response.content_length(), show_progress);
    let io_err = |source| CheckpointError::Io {
        path: temp.path().to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(temp.as_file());
    let mut reader = progress.wrap_read(response);
    let bytes = io::copy(&mut reader, &mut writer).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    drop(writer);
    progress.finish_and_clear();

    tracing::info!(
        "✓ Downloaded {} ({:.1} MB) to {:?}",
        file_name.as_deref().unwrap_or(url),
        bytes as f64 / 1_048_576.0,
        temp.path()
    );

    Ok(FetchedCheckpoint::Downloaded(temp))
}

fn progress_bar(total: Option<u64>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}
