use std::{path::PathBuf, time::Duration};

use prom2mkr_flatten::FlattenConfig;
use prom2mkr_graphdef::DEFAULT_GRAPH_DEF_PATH;

pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Exposition endpoint to scrape.
    pub url: String,
    /// Prepended to every metric key and graph name; empty for none.
    pub prefix: String,
    pub graph_def_path: PathBuf,
    pub flatten: FlattenConfig,
    pub scrape_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            prefix: String::new(),
            graph_def_path: PathBuf::from(DEFAULT_GRAPH_DEF_PATH),
            flatten: FlattenConfig::default(),
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}
