//! Storage sizing for the game claims.
//!
//! The claims are sized from the `Content-Length` of the game bundle plus slack for
//! the emulator's scratch space. The estimate is taken once, when a claim is created.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_LENGTH, StatusCode};
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

const MIB: f64 = 1024.0 * 1024.0;

/// Base size assumed when the server does not report a usable length
pub const DEFAULT_BASE_MIB: f64 = 20.0;

/// Fixed overhead added on top of the bundle size
pub const OVERHEAD_MIB: f64 = 10.0;

const SLACK_FACTOR: f64 = 1.1;

/// Looks up the size of a remote bundle
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CapacityProbe: Send + Sync {
    /// `Ok(None)` when the server answered but gave no numeric `Content-Length`
    async fn content_length(&self, url: &str) -> Result<Option<u64>>;
}

/// HEAD based probe
pub struct HttpCapacityProbe {
    client: reqwest::Client,
}

impl HttpCapacityProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CapacityProbe for HttpCapacityProbe {
    async fn content_length(&self, url: &str) -> Result<Option<u64>> {
        let response = self.client.head(url).send().await.map_err(|e| Error::Probe {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if response.status() != StatusCode::OK {
            return Err(Error::Probe {
                url: url.to_string(),
                reason: format!("unexpected status {}", response.status()),
            });
        }

        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        debug!("HEAD {} reported content length {:?}", url, length);
        Ok(length)
    }
}

/// Capacity in MiB for a bundle of `content_length` bytes
pub fn capacity_mib(content_length: Option<u64>) -> u64 {
    let base = content_length
        .map(|bytes| bytes as f64 / MIB)
        .unwrap_or(DEFAULT_BASE_MIB);

    (base * SLACK_FACTOR + OVERHEAD_MIB).round() as u64
}

pub async fn estimate_capacity(probe: &dyn CapacityProbe, url: &str) -> Result<u64> {
    let length = probe.content_length(url).await?;
    Ok(capacity_mib(length))
}

/// Estimate taken at most once per reconcile pass
pub struct LazyCapacity<'a> {
    probe: &'a dyn CapacityProbe,
    url: &'a str,
    value: Option<u64>,
}

impl<'a> LazyCapacity<'a> {
    pub fn new(probe: &'a dyn CapacityProbe, url: &'a str) -> Self {
        Self {
            probe,
            url,
            value: None,
        }
    }

    pub async fn get(&mut self) -> Result<u64> {
        if let Some(mib) = self.value {
            return Ok(mib);
        }
        let mib = estimate_capacity(self.probe, self.url).await?;
        self.value = Some(mib);
        Ok(mib)
    }
}
