use std::{
    future::Future,
    path::{Path, PathBuf},
};

use prom2mkr_common::error::{Prom2mkrError, Result};
use prom2mkr_flatten::dot_normalize;
use prom2mkr_metrics::MetricFamily;
use tracing::{debug, info};

use crate::types::{Graph, GraphDef, Graphs, Unit};

pub const DEFAULT_GRAPH_DEF_PATH: &str = "/tmp/prom2mkr.json";

/// Derives one graph per distinct family name.
pub fn build_schema(families: &[MetricFamily]) -> GraphDef {
    let mut graphs = Graphs::new();
    for family in families {
        graphs.insert(
            dot_normalize(&family.name),
            Graph {
                unit: Unit::for_family_type(family.family_type()),
            },
        );
    }
    GraphDef { graphs }
}

/// Write-once graph definition file. Once written it is served verbatim until
/// someone deletes it.
#[derive(Debug, Clone)]
pub struct GraphDefCache {
    path: PathBuf,
}

impl GraphDefCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the cached graphs, building and persisting them from `fetch`
    /// only when no cache file exists yet.
    pub async fn get_or_build<F, Fut>(&self, fetch: F) -> Result<Graphs>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MetricFamily>>>,
    {
        if let Some(cached) = self.read().await? {
            debug!(
                path = %self.path.display(),
                graphs = cached.graphs.len(),
                "using cached graph definition"
            );
            return Ok(cached.graphs);
        }

        let families = fetch().await?;
        let def = build_schema(&families);
        self.write(&def).await?;
        info!(
            path = %self.path.display(),
            graphs = def.graphs.len(),
            "graph definition cached"
        );
        Ok(def.graphs)
    }

    /// `Ok(None)` when the file does not exist.
    pub async fn read(&self) -> Result<Option<GraphDef>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Prom2mkrError::schema_cache(
                    &self.path,
                    format!("failed to read: {err}"),
                ));
            }
        };

        serde_json::from_slice::<GraphDef>(&bytes)
            .map(Some)
            .map_err(|err| {
                Prom2mkrError::schema_cache(&self.path, format!("failed to parse: {err}"))
            })
    }

    pub async fn write(&self, def: &GraphDef) -> Result<()> {
        let payload = serde_json::to_vec(def).map_err(|err| {
            Prom2mkrError::schema_cache(&self.path, format!("failed to serialize: {err}"))
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                Prom2mkrError::schema_cache(
                    &self.path,
                    format!("failed to create directory: {err}"),
                )
            })?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, payload).await.map_err(|err| {
            Prom2mkrError::schema_cache(&tmp_path, format!("failed to write: {err}"))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|err| {
            Prom2mkrError::schema_cache(&self.path, format!("failed to replace: {err}"))
        })?;
        Ok(())
    }

    /// `<file>.tmp` next to the target, never the target itself.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
