use std::time::Duration;

use async_trait::async_trait;
use prom2mkr_common::error::{Prom2mkrError, Result};
use reqwest::header::{ACCEPT, HeaderValue};
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::{exposition::Decoder, types::MetricFamily};

/// Room for every family of a typical scrape without stalling the producer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

const EXPOSITION_ACCEPT: &str = "text/plain;version=0.0.4;q=1,*/*;q=0.1";

#[async_trait]
pub trait MetricFamilySource: Send + Sync {
    /// Returns every family of one scrape, or an error if any part of it failed.
    async fn fetch_families(&self) -> Result<Vec<MetricFamily>>;
}

/// Scrapes a Prometheus text endpoint over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: Url,
    client: reqwest::Client,
    channel_capacity: usize,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| Prom2mkrError::Config(format!("invalid scrape url {url:?}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Prom2mkrError::Config(format!(
                "unsupported scrape url scheme: {}",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|err| {
                Prom2mkrError::Config(format!("failed to build scrape http client: {err}"))
            })?;

        Ok(Self {
            url,
            client,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

#[async_trait]
impl MetricFamilySource for HttpSource {
    async fn fetch_families(&self) -> Result<Vec<MetricFamily>> {
        let (sender, mut receiver) = mpsc::channel(self.channel_capacity);
        let client = self.client.clone();
        let url = self.url.clone();
        let producer = tokio::spawn(async move { stream_families(client, url, sender).await });

        let mut families = Vec::new();
        while let Some(family) = receiver.recv().await {
            families.push(family);
        }

        // A closed channel only means success once the producer says so.
        match producer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(err) => {
                return Err(Prom2mkrError::Source(format!("scrape task aborted: {err}")));
            }
        }

        debug!(url = %self.url, families = families.len(), "scrape completed");
        Ok(families)
    }
}

async fn stream_families(
    client: reqwest::Client,
    url: Url,
    sender: mpsc::Sender<MetricFamily>,
) -> Result<()> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, HeaderValue::from_static(EXPOSITION_ACCEPT))
        .send()
        .await
        .map_err(|err| Prom2mkrError::Source(format!("failed to scrape {url}: {err}")))?;

    if !response.status().is_success() {
        return Err(Prom2mkrError::Source(format!(
            "scrape target {url} returned status {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|err| Prom2mkrError::Source(format!("failed to read body from {url}: {err}")))?;

    let mut decoder = Decoder::new();
    for line in body.lines() {
        if let Some(family) = decoder.push_line(line)?
            && sender.send(family).await.is_err()
        {
            return Ok(());
        }
    }
    if let Some(family) = decoder.finish()
        && sender.send(family).await.is_err()
    {
        return Ok(());
    }

    Ok(())
}

/// Serves a fixed family set, e.g. a snapshot decoded ahead of time.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    families: Vec<MetricFamily>,
}

impl StaticSource {
    pub fn new(families: Vec<MetricFamily>) -> Self {
        Self { families }
    }
}

#[async_trait]
impl MetricFamilySource for StaticSource {
    async fn fetch_families(&self) -> Result<Vec<MetricFamily>> {
        Ok(self.families.clone())
    }
}
