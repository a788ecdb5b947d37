use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{header, Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::config::Config;

/// A single resource to mirror locally. The partial path is always derived
/// from the final path, so an interrupted run and a later resume agree on
/// where the partial bytes live.
#[derive(Clone, Debug)]
pub struct DownloadTarget {
    pub url: String,
    pub final_path: PathBuf,
    pub part_path: PathBuf,
}

impl DownloadTarget {
    pub fn new(url: impl Into<String>, final_path: PathBuf) -> Self {
        let part_path = part_path_for(&final_path);
        Self {
            url: url.into(),
            final_path,
            part_path,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The final file already exists; nothing was fetched.
    Skipped,
    /// The partial file was completed and renamed into place.
    Completed,
}

fn part_path_for(path: &Path) -> PathBuf {
    let mut part = path.to_path_buf();
    if let Some(extension) = path.extension() {
        let mut ext = extension.to_os_string();
        ext.push(".part");
        part.set_extension(ext);
    } else {
        part.set_extension("part");
    }
    part
}

pub struct Fetcher {
    client: Client,
    chunk_size: usize,
}

impl Fetcher {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            chunk_size: config.chunk_size,
        }
    }

    /// Downloads the missing bytes of `target`, reporting cumulative progress
    /// (as a percent of the full resource size) through `on_progress`.
    ///
    /// If a partial file exists its length becomes the range offset, so only
    /// the remainder crosses the network and previously written bytes are
    /// never discarded. The final path is only ever produced by renaming a
    /// size-checked partial file, so it is either absent or complete.
    pub async fn ensure_downloaded(
        &self,
        target: &DownloadTarget,
        on_progress: impl FnMut(f64),
    ) -> Result<Outcome> {
        if target.final_path.exists() {
            return Ok(Outcome::Skipped);
        }

        let mut resumed = 0u64;
        if target.part_path.exists() {
            resumed = fs::metadata(&target.part_path).await?.len();
        }

        let response = self
            .client
            .get(&target.url)
            .header(header::RANGE, format!("bytes={}-", resumed))
            .send()
            .await
            .context("Failed to send request")?;

        check_range_status(response.status(), resumed, target)?;

        // Content-Length covers the remainder only; the denominator for
        // progress is the full resource size.
        let remaining = response
            .content_length()
            .context("Response is missing a Content-Length header")?;
        let total = remaining + resumed;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target.part_path)
            .await
            .context("Failed to open partial file")?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from));
        write_chunks(&mut file, stream, resumed, total, self.chunk_size, on_progress).await?;
        drop(file);

        let part_size = fs::metadata(&target.part_path).await?.len();
        check_complete_size(part_size, total, target)?;

        fs::rename(&target.part_path, &target.final_path)
            .await
            .context("Failed to rename partial file")?;

        Ok(Outcome::Completed)
    }
}

/// A resumed request must come back `206 Partial Content`; a `200 OK` means
/// the server restarted from byte zero and appending its body would corrupt
/// the byte accounting.
fn check_range_status(status: StatusCode, resumed: u64, target: &DownloadTarget) -> Result<()> {
    if !status.is_success() {
        bail!("Request for {} failed with status {}", target.url, status);
    }
    if resumed > 0 && status != StatusCode::PARTIAL_CONTENT {
        bail!(
            "Server ignored the range request for {} (status {} instead of 206); \
             delete {} to restart from scratch",
            target.url,
            status,
            target.part_path.display()
        );
    }
    Ok(())
}

/// The drained partial file must hold exactly the advertised size; anything
/// else aborts before the rename so the final name never gets a short file.
fn check_complete_size(part_size: u64, total: u64, target: &DownloadTarget) -> Result<()> {
    if part_size != total {
        bail!(
            "Size mismatch for {}: expected {} bytes but the partial file holds {}",
            target.url,
            total,
            part_size
        );
    }
    Ok(())
}

/// Appends every chunk of `stream` to `file`, flushing and reporting progress
/// at most `chunk_size` bytes at a time. Returns the cumulative byte count
/// (`resumed` plus everything written here).
///
/// Holds at most one transport chunk in memory; `total` of zero only occurs
/// together with an empty stream, so the percent math never divides by zero.
async fn write_chunks<S>(
    file: &mut File,
    mut stream: S,
    resumed: u64,
    total: u64,
    chunk_size: usize,
    mut on_progress: impl FnMut(f64),
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut written = resumed;

    while let Some(item) = stream.next().await {
        let chunk = item.context("Error while downloading chunk")?;
        for slice in chunk.chunks(chunk_size.max(1)) {
            file.write_all(slice)
                .await
                .context("Error while writing to file")?;
            file.flush().await.context("Failed to flush file")?;
            written += slice.len() as u64;
            on_progress(written as f64 / total as f64 * 100.0);
        }
    }

    Ok(written)
}
