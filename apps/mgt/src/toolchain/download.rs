//! Artifact download.
//!
//! Downloads stream into a file the caller owns (normally a temporary file in
//! the download directory) so nothing unverified ever lands at a path a later
//! run would trust. There is no retry loop: a failed transfer is reported to
//! the caller, which owns the retry policy.
//!
//! `file://` URLs are copied from the local filesystem, which lets mirrors on
//! shared drives and test fixtures use the same code path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::errors::ToolchainError;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = concat!("mgt/", env!("CARGO_PKG_VERSION"));

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// Downloads `url` into `dest`, truncating any existing content.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`ToolchainError::DownloadError`] for connection failures and
/// non-success HTTP statuses, and an I/O error if `dest` cannot be written.
pub async fn download_file(url: &str, dest: &Path) -> Result<u64> {
    if let Some(source) = file_url_path(url) {
        tracing::debug!(source = %source.display(), "copying local artifact");
        let bytes = tokio::fs::copy(&source, dest).await.map_err(|e| {
            ToolchainError::download_with_source(
                format!("Failed to read {}", source.display()),
                Box::new(e),
            )
        })?;
        return Ok(bytes);
    }

    download_with_progress(url, dest).await
}

/// Returns the local path of a `file://` URL.
fn file_url_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file://")?;
    // `file:///C:/x` on Windows carries an extra slash before the drive letter.
    #[cfg(windows)]
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    Some(PathBuf::from(rest))
}

async fn download_with_progress(url: &str, dest: &Path) -> Result<u64> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client.get(url).send().await.map_err(|e| {
        ToolchainError::download_with_source(format!("Failed to connect to {url}"), Box::new(e))
    })?;

    if !response.status().is_success() {
        return Err(ToolchainError::download(format!("HTTP error {}: {url}", response.status())).into());
    }

    let total_size = response.content_length().unwrap_or(0);
    tracing::info!(url, total_size, "downloading");

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            ToolchainError::download_with_source(
                format!("Failed to read chunk from {url}"),
                Box::new(e),
            )
        })?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = now;
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
    eprintln!();

    Ok(downloaded)
}

/// Prints a progress line to stderr, keeping stdout for results.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    eprint!(
        "\r{}/{} ({percent}%) {}/s     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_bytes(speed as u64)
    );
    let _ = std::io::stderr().flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}
