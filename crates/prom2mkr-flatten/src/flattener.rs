use std::collections::{HashMap, HashSet};

use prom2mkr_common::error::{Prom2mkrError, Result};
use prom2mkr_metrics::{Labels, MetricFamily, Samples};
use tracing::{debug, warn};

use crate::naming::{base_key, qualify, quantile_suffix};

pub const DEFAULT_IGNORED_FAMILIES: &[&str] = &["go_info"];
pub const DEFAULT_IGNORED_LABELS: &[&str] = &["error"];

/// Flattened key to value. A key produced twice keeps the last value.
pub type FlattenedMetrics = HashMap<String, f64>;

/// What to do with a value that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Abort the whole flatten call.
    #[default]
    Strict,
    /// Log the value and leave its key out.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    pub ignore_families: HashSet<String>,
    pub ignore_labels: HashSet<String>,
    pub parse_policy: ParsePolicy,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            ignore_families: DEFAULT_IGNORED_FAMILIES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            ignore_labels: DEFAULT_IGNORED_LABELS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            parse_policy: ParsePolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    pub fn new(config: FlattenConfig) -> Self {
        Self { config }
    }

    pub fn flatten(&self, families: &[MetricFamily], prefix: &str) -> Result<FlattenedMetrics> {
        let mut stat = FlattenedMetrics::new();

        for family in families {
            if self.config.ignore_families.contains(&family.name) {
                continue;
            }

            let base = base_key(prefix, &family.name);
            match &family.samples {
                Samples::Counter(samples) | Samples::Gauge(samples) => {
                    for sample in samples {
                        let key = self.qualify(base.clone(), &sample.labels);
                        self.insert(&mut stat, key, &sample.value)?;
                    }
                }
                Samples::Summary(samples) => {
                    for sample in samples {
                        let key = self.qualify(base.clone(), &sample.labels);
                        for (quantile, value) in &sample.quantiles {
                            let quantile_key = format!("{key}.{}", quantile_suffix(quantile));
                            self.insert(&mut stat, quantile_key, value)?;
                        }
                        self.insert(&mut stat, format!("{key}.count"), &sample.count)?;
                        self.insert(&mut stat, format!("{key}.sum"), &sample.sum)?;
                    }
                }
                Samples::Histogram(_) | Samples::Unknown(_) => {
                    debug!(
                        family = %family.name,
                        family_type = family.family_type().as_str(),
                        "no flattening rule for family type, skipping"
                    );
                }
            }
        }

        Ok(stat)
    }

    fn qualify(&self, base: String, labels: &Labels) -> String {
        qualify(base, labels, |name| self.config.ignore_labels.contains(name))
    }

    fn insert(&self, stat: &mut FlattenedMetrics, key: String, value: &str) -> Result<()> {
        match value.parse::<f64>() {
            Ok(parsed) => {
                stat.insert(key, parsed);
                Ok(())
            }
            Err(_) => match self.config.parse_policy {
                ParsePolicy::Strict => Err(Prom2mkrError::Parse {
                    key,
                    value: value.to_string(),
                }),
                ParsePolicy::Lenient => {
                    warn!(key = %key, value = %value, "skipping value that is not a number");
                    Ok(())
                }
            },
        }
    }
}
