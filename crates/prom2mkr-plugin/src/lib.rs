pub mod config;
pub mod output;
pub mod plugin;

pub use config::PluginConfig;
pub use output::{
    AgentPayload, AgentTarget, HttpAgentTarget, MetricValue, OutputMode, write_meta,
    write_values,
};
pub use plugin::{Collection, Prom2mkrPlugin};
