use std::{io::Write, sync::Arc};

use chrono::{DateTime, Utc};
use prom2mkr_common::{
    error::Result,
    time::{now, unix_seconds},
};
use prom2mkr_flatten::{FlattenedMetrics, Flattener};
use prom2mkr_graphdef::{GraphDef, GraphDefCache, Graphs};
use prom2mkr_metrics::{HttpSource, MetricFamilySource};
use tracing::{debug, info};

use crate::{
    config::PluginConfig,
    output::{AgentPayload, MetricValue, OutputMode, write_meta, write_values},
};

/// Flattened values of one scrape and when they were taken.
#[derive(Debug, Clone)]
pub struct Collection {
    pub metrics: FlattenedMetrics,
    pub collected_at: DateTime<Utc>,
}

impl Collection {
    /// Values sorted by key.
    pub fn values(&self) -> Vec<MetricValue> {
        let time = unix_seconds(&self.collected_at);
        let mut values = self
            .metrics
            .iter()
            .map(|(name, value)| MetricValue {
                name: name.clone(),
                value: *value,
                time,
            })
            .collect::<Vec<_>>();
        values.sort_by(|left, right| left.name.cmp(&right.name));
        values
    }
}

pub struct Prom2mkrPlugin {
    prefix: String,
    source: Arc<dyn MetricFamilySource>,
    flattener: Flattener,
    cache: GraphDefCache,
}

impl Prom2mkrPlugin {
    /// Scrapes `config.url` over HTTP.
    pub fn from_config(config: PluginConfig) -> Result<Self> {
        let source = HttpSource::new(
            &config.url,
            config.scrape_timeout,
            config.accept_invalid_certs,
        )?;
        Ok(Self::new(config, Arc::new(source)))
    }

    pub fn new(config: PluginConfig, source: Arc<dyn MetricFamilySource>) -> Self {
        Self {
            prefix: config.prefix,
            source,
            flattener: Flattener::new(config.flatten),
            cache: GraphDefCache::new(config.graph_def_path),
        }
    }

    pub async fn fetch_metrics(&self) -> Result<FlattenedMetrics> {
        let families = self.source.fetch_families().await?;
        let metrics = self.flattener.flatten(&families, &self.prefix)?;
        debug!(
            families = families.len(),
            metrics = metrics.len(),
            "flattened scrape"
        );
        Ok(metrics)
    }

    pub async fn graph_definition(&self) -> Result<Graphs> {
        self.cache
            .get_or_build(|| self.source.fetch_families())
            .await
    }

    pub async fn collect(&self) -> Result<Collection> {
        let metrics = self.fetch_metrics().await?;
        Ok(Collection {
            metrics,
            collected_at: now(),
        })
    }

    pub async fn run<W: Write>(&self, mode: &OutputMode, out: &mut W) -> Result<()> {
        match mode {
            OutputMode::Values => {
                let collection = self.collect().await?;
                write_values(out, &collection.values())
            }
            OutputMode::Meta => {
                let def = self.prefixed_graph_def().await?;
                write_meta(out, &def)
            }
            OutputMode::Push(target) => {
                let def = self.prefixed_graph_def().await?;
                let collection = self.collect().await?;
                let payload = AgentPayload {
                    graphs: Some(def.graphs),
                    metrics: collection.values(),
                };
                target.push(&payload).await?;
                info!(metrics = payload.metrics.len(), "pushed metrics to agent");
                Ok(())
            }
        }
    }

    async fn prefixed_graph_def(&self) -> Result<GraphDef> {
        let graphs = self.graph_definition().await?;
        Ok(GraphDef { graphs }.with_prefix(&self.prefix))
    }
}
