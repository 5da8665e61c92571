//! Streaming downloader with bounded retries.
//!
//! Each attempt performs a streaming GET and writes the body incrementally
//! to a temporary file named after the URL's basename, reporting byte
//! progress against the Content-Length header. A failed attempt never
//! leaves a reusable file behind: every attempt starts a fresh write.
//!
//! Certificate verification is disabled on the real transport. This is a
//! deliberate parity trade-off with the upstream provisioning flow, which
//! fetches first-party artifacts from hosts with chronically broken chains;
//! the extractor still validates archive structure.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::errors::SetupError;

/// Fixed retry budget per download.
pub const RETRY_BUDGET: u32 = 3;

/// Read timeout per attempt.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// One download attempt. The seam between the retry loop and the network,
/// so tests can fake attempt outcomes.
pub trait Transport {
    /// Fetch `url`, writing the complete body to `dest`. Must truncate any
    /// previous content at `dest` before writing.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Retrying downloader over some transport.
pub struct Downloader<T: Transport> {
    transport: T,
    retries: u32,
}

impl<T: Transport> Downloader<T> {
    pub fn new(transport: T) -> Self {
        Downloader {
            transport,
            retries: RETRY_BUDGET,
        }
    }

    #[cfg(test)]
    pub fn with_retries(transport: T, retries: u32) -> Self {
        Downloader { transport, retries }
    }

    /// Fetch a URL to a temporary file, retrying up to the budget.
    pub fn fetch(&self, url: &str) -> Result<PathBuf> {
        let dest = std::env::temp_dir().join(url_basename(url)?);

        for attempt in 1..=self.retries {
            match self.transport.fetch(url, &dest) {
                Ok(()) => {
                    tracing::debug!("downloaded to '{}'", dest.display());
                    tracing::info!("downloaded successfully");
                    return Ok(dest);
                }
                Err(e) => {
                    tracing::debug!("download attempt {}/{} failed: {:#}", attempt, self.retries, e);
                }
            }
        }

        Err(SetupError::Download {
            url: url.to_string(),
            attempts: self.retries,
        }
        .into())
    }
}

/// The final path segment of a URL, used as the local file name.
pub fn url_basename(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("invalid download url: {}", url))?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("download url has no file name: {}", url))
}

/// Real HTTP transport over blocking reqwest.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(READ_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP {} for {}", response.status(), url);
        }

        let pb = match response.content_length() {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} downloading [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                        .unwrap()
                        .progress_chars("#>-"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };

        let mut file = std::fs::File::create(dest)
            .with_context(|| format!("failed to create temp file: {}", dest.display()))?;

        let mut buf = [0u8; 8192];
        loop {
            let n = response
                .read(&mut buf)
                .with_context(|| format!("read failed: {}", url))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .with_context(|| format!("write failed: {}", dest.display()))?;
            pb.inc(n as u64);
        }

        pb.finish_and_clear();
        Ok(())
    }
}
