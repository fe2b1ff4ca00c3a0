//! Where raw GRIB2 bytes for a cycle come from.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::cycle::CycleId;

/// Supplies the GRIB2 buffer for a forecast cycle.
#[async_trait]
pub trait GribSource: Send + Sync {
    async fn fetch(&self, cycle: CycleId) -> Result<Bytes>;

    /// Human-readable origin for logs.
    fn describe(&self, cycle: CycleId) -> String;
}

/// Fetches the GFS subset from the NOMADS grib filter.
pub struct NomadsSource {
    client: Client,
    base_url: String,
}

impl NomadsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl GribSource for NomadsSource {
    #[instrument(skip(self, cycle), fields(cycle = %cycle))]
    async fn fetch(&self, cycle: CycleId) -> Result<Bytes> {
        let url = cycle.nomads_url(&self.base_url);
        info!(url = %url, "Fetching GFS subset");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("NOMADS returned HTTP {} for cycle {}", status, cycle);
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;
        if body.is_empty() {
            bail!("NOMADS returned an empty body for cycle {}", cycle);
        }

        debug!(bytes = body.len(), "Fetched GRIB2 data");
        Ok(body)
    }

    fn describe(&self, cycle: CycleId) -> String {
        cycle.nomads_url(&self.base_url)
    }
}

/// Reads a local GRIB2 file regardless of cycle.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GribSource for FileSource {
    async fn fetch(&self, _cycle: CycleId) -> Result<Bytes> {
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        debug!(path = %self.path.display(), bytes = data.len(), "Read GRIB2 file");
        Ok(Bytes::from(data))
    }

    fn describe(&self, _cycle: CycleId) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn cycle() -> CycleId {
        CycleId {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            hour: 12,
        }
    }

    #[tokio::test]
    async fn test_file_source_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"GRIB....7777").unwrap();

        let source = FileSource::new(file.path());
        let data = source.fetch(cycle()).await.unwrap();
        assert_eq!(&data[..], b"GRIB....7777");
        assert_eq!(source.describe(cycle()), file.path().display().to_string());
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("missing.grib2"));
        let err = source.fetch(cycle()).await.unwrap_err();
        assert!(err.to_string().contains("missing.grib2"));
    }

    #[test]
    fn test_nomads_source_describes_cycle_url() {
        let source = NomadsSource::new("http://localhost:1/filter", Duration::from_secs(5)).unwrap();
        let url = source.describe(cycle());
        assert!(url.starts_with("http://localhost:1/filter?file=gfs.t12z"));
    }
}
