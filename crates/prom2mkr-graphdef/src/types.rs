use std::collections::BTreeMap;

use prom2mkr_metrics::FamilyType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Integer,
    Float,
}

impl Unit {
    pub fn for_family_type(family_type: FamilyType) -> Self {
        match family_type {
            FamilyType::Counter
            | FamilyType::Gauge
            | FamilyType::Histogram
            | FamilyType::Summary => Self::Integer,
            FamilyType::Unknown => Self::Float,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub unit: Unit,
}

/// Metric name to graph settings.
pub type Graphs = BTreeMap<String, Graph>;

/// On-disk shape: `{"graphs": {"<metric.name>": {"unit": "integer"}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphDef {
    pub graphs: Graphs,
}

impl GraphDef {
    /// Copy with every graph name behind `prefix.`; unchanged for an empty prefix.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self.clone();
        }
        Self {
            graphs: self
                .graphs
                .iter()
                .map(|(name, graph)| (format!("{prefix}.{name}"), graph.clone()))
                .collect(),
        }
    }
}
