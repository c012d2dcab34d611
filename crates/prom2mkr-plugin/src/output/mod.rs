pub mod agent;
pub mod stdout;

use std::sync::Arc;

use serde::Serialize;

pub use agent::{AgentPayload, AgentTarget, HttpAgentTarget};
pub use stdout::{write_meta, write_values};

/// One value as handed to the monitoring agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
    /// Unix seconds.
    pub time: i64,
}

pub enum OutputMode {
    /// `<key>\t<value>\t<time>` lines.
    Values,
    /// Graph definition for the agent's meta request.
    Meta,
    Push(Arc<dyn AgentTarget>),
}
