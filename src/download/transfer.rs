// Streaming transfer with resume, bounded retry, and cooperative
// cancellation. Downloads always land in a `.part` sidecar; the caller
// renames it into place after a successful terminal status.

use crate::error::{ManagerError, Result};
use futures_util::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Maximum number of retry attempts for chunk read errors
const MAX_CHUNK_RETRIES: u32 = 10;
/// Base delay for exponential backoff (in milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 1000;
/// Maximum delay between retries (in milliseconds)
const MAX_RETRY_DELAY_MS: u64 = 30000;

/// Local-completion sentinel: nothing was left to transfer, so there is no
/// HTTP status to report.
pub const STATUS_LOCAL_COMPLETE: u16 = 0;

/// A transfer is successful only when its terminal status is the local
/// sentinel or a 2xx code.
pub fn is_terminal_success(status: u16) -> bool {
    status == STATUS_LOCAL_COMPLETE || (200..300).contains(&status)
}

/// Fractional progress; 0 when the expected size is unknown or zero.
pub fn progress_fraction(written: u64, expected: Option<u64>) -> f64 {
    match expected {
        Some(total) if total > 0 => written as f64 / total as f64,
        _ => 0.0,
    }
}

#[derive(Debug)]
pub(crate) struct TransferOutcome {
    pub bytes_written: u64,
    pub status: u16,
}

/// Create HTTP client for model downloads
pub(crate) fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(std::time::Duration::from_secs(1800)) // 30 minutes for large models
        .connect_timeout(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Check if server supports Range requests
async fn check_range_support(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            let accepts_ranges = response
                .headers()
                .get("accept-ranges")
                .map(|v| v.to_str().unwrap_or("") != "none")
                .unwrap_or(false);
            log::info!("Server range support: {}", accepts_ranges);
            accepts_ranges
        }
        Err(e) => {
            log::warn!("Failed to check range support: {}", e);
            false
        }
    }
}

/// Calculate exponential backoff delay
fn calculate_backoff_delay(attempt: u32) -> std::time::Duration {
    let delay_ms = BASE_RETRY_DELAY_MS * 2u64.pow(attempt.min(10));
    std::time::Duration::from_millis(delay_ms.min(MAX_RETRY_DELAY_MS))
}

enum StartOutcome {
    Stream {
        response: reqwest::Response,
        total_size: Option<u64>,
        status: u16,
    },
    /// Resume request answered 416: the partial file already holds every
    /// byte the server has.
    AlreadyComplete,
}

/// Start or resume a download request from a given byte offset
async fn start_download_request(
    client: &reqwest::Client,
    url: &str,
    start_byte: u64,
) -> Result<StartOutcome> {
    let mut request = client
        .get(url)
        .header("Accept", "*/*")
        .header("Accept-Encoding", "identity");

    if start_byte > 0 {
        log::info!("Resuming download from byte {}", start_byte);
        request = request.header("Range", format!("bytes={}-", start_byte));
    }

    let response = request
        .send()
        .await
        .map_err(|e| ManagerError::transport(format!("request failed: {}", e)))?;

    let status = response.status();
    log::info!("HTTP response status: {}", status);

    if start_byte > 0 && status == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
        return Ok(StartOutcome::AlreadyComplete);
    }

    let total_size = if start_byte > 0 && status == reqwest::StatusCode::PARTIAL_CONTENT {
        // For resumed downloads, parse Content-Range header to get total size
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split('/').last())
            .and_then(|s| s.parse::<u64>().ok())
    } else {
        response.content_length()
    };

    Ok(StartOutcome::Stream {
        status: status.as_u16(),
        response,
        total_size,
    })
}

/// Download `url` into `part_path`, resuming an existing partial file when
/// the server supports ranges. `on_tick` is invoked with (bytes written,
/// bytes expected) on every received chunk. Cancellation keeps the partial
/// file so a later call can resume it.
pub(crate) async fn download_to_partial(
    client: &reqwest::Client,
    url: &str,
    part_path: &Path,
    cancel: &AtomicBool,
    mut on_tick: impl FnMut(u64, Option<u64>),
) -> Result<TransferOutcome> {
    // Check if server supports range requests for resume capability
    let supports_resume = check_range_support(client, url).await;

    let mut downloaded: u64 = if supports_resume && part_path.exists() {
        let existing_size = tokio::fs::metadata(part_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if existing_size > 0 {
            log::info!(
                "Found partial download: {:.2} MB, will attempt to resume",
                existing_size as f64 / 1_048_576.0
            );
        }
        existing_size
    } else {
        0
    };

    let (response, total_size, status) =
        match start_download_request(client, url, downloaded).await? {
            StartOutcome::AlreadyComplete => {
                on_tick(downloaded, Some(downloaded));
                return Ok(TransferOutcome {
                    bytes_written: downloaded,
                    status: STATUS_LOCAL_COMPLETE,
                });
            }
            StartOutcome::Stream {
                response,
                total_size,
                status,
            } => (response, total_size, status),
        };

    if !is_terminal_success(status) {
        return Err(ManagerError::download_failed(
            status,
            format!("server answered {}", status),
        ));
    }

    // A server may answer a Range request with 200 and the full body even
    // after advertising range support. Appending that to the stale partial
    // would corrupt the artifact, so restart from byte 0.
    if downloaded > 0 && status != 206 {
        log::warn!("Server ignored the range request, restarting from byte 0");
        downloaded = 0;
    }

    if let Some(size) = total_size {
        log::info!("Model size: {:.2} MB", size as f64 / 1_048_576.0);
    } else {
        log::warn!("Model size: unknown (no Content-Length header)");
    }

    // Open file for writing (append if resuming)
    let mut file = if downloaded > 0 {
        let mut f = tokio::fs::OpenOptions::new()
            .append(true)
            .open(part_path)
            .await
            .map_err(|e| ManagerError::transport(format!("failed to open partial file: {}", e)))?;
        f.seek(std::io::SeekFrom::End(0))
            .await
            .map_err(|e| ManagerError::transport(format!("failed to seek partial file: {}", e)))?;
        f
    } else {
        tokio::fs::File::create(part_path)
            .await
            .map_err(|e| ManagerError::transport(format!("failed to create file: {}", e)))?
    };

    let mut stream = response.bytes_stream();
    let mut consecutive_errors = 0u32;

    log::info!("Starting download stream...");

    loop {
        if cancel.load(Ordering::Relaxed) {
            let _ = file.flush().await;
            log::info!(
                "Download cancelled at {:.2} MB, keeping partial file",
                downloaded as f64 / 1_048_576.0
            );
            return Err(ManagerError::DownloadCancelled);
        }

        match stream.next().await {
            Some(Ok(chunk)) => {
                // Reset error counter on successful chunk
                consecutive_errors = 0;

                file.write_all(&chunk)
                    .await
                    .map_err(|e| ManagerError::transport(format!("failed to write chunk: {}", e)))?;

                downloaded += chunk.len() as u64;
                on_tick(downloaded, total_size);
            }
            Some(Err(e)) => {
                consecutive_errors += 1;
                log::warn!(
                    "Chunk read error (attempt {}/{}): {}",
                    consecutive_errors,
                    MAX_CHUNK_RETRIES,
                    e
                );

                if consecutive_errors >= MAX_CHUNK_RETRIES {
                    return Err(ManagerError::transport(format!(
                        "failed to read chunk after {} retries: {}",
                        MAX_CHUNK_RETRIES, e
                    )));
                }

                if !supports_resume {
                    return Err(ManagerError::transport(format!(
                        "failed to read chunk and server does not support resume: {}",
                        e
                    )));
                }

                // Flush current data before reconnecting
                file.flush()
                    .await
                    .map_err(|e| ManagerError::transport(format!("flush before retry: {}", e)))?;
                file.sync_all()
                    .await
                    .map_err(|e| ManagerError::transport(format!("sync before retry: {}", e)))?;

                let delay = calculate_backoff_delay(consecutive_errors - 1);
                log::info!("Waiting {:?} before retry...", delay);
                tokio::time::sleep(delay).await;

                log::info!("Attempting to resume download from byte {}", downloaded);
                match start_download_request(client, url, downloaded).await? {
                    StartOutcome::AlreadyComplete => break,
                    StartOutcome::Stream {
                        response, status, ..
                    } => {
                        if !is_terminal_success(status) {
                            return Err(ManagerError::download_failed(
                                status,
                                format!("resume request answered {}", status),
                            ));
                        }
                        // Same 200-instead-of-206 downgrade as above: drop
                        // the bytes written so far and start over.
                        if downloaded > 0 && status != 206 {
                            log::warn!(
                                "Server ignored the range request, restarting from byte 0"
                            );
                            file.set_len(0).await.map_err(|e| {
                                ManagerError::transport(format!(
                                    "failed to truncate partial file: {}",
                                    e
                                ))
                            })?;
                            downloaded = 0;
                        }
                        stream = response.bytes_stream();
                        log::info!("Successfully resumed download");
                    }
                }
            }
            None => {
                // Stream ended
                break;
            }
        }
    }

    log::info!(
        "Download completed! Total: {:.2} MB",
        downloaded as f64 / 1_048_576.0
    );

    // Flush and sync so verification sees every byte on disk
    file.flush()
        .await
        .map_err(|e| ManagerError::transport(format!("failed to flush file: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| ManagerError::transport(format!("failed to sync file: {}", e)))?;
    drop(file);

    Ok(TransferOutcome {
        bytes_written: downloaded,
        status,
    })
}
