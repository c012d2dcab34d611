use async_trait::async_trait;
use prom2mkr_common::error::{Prom2mkrError, Result};
use prom2mkr_graphdef::Graphs;
use serde::Serialize;

use super::MetricValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphs: Option<Graphs>,
    pub metrics: Vec<MetricValue>,
}

#[async_trait]
pub trait AgentTarget: Send + Sync {
    async fn push(&self, payload: &AgentPayload) -> Result<()>;
}

/// Posts payloads as JSON to an agent's HTTP endpoint.
pub struct HttpAgentTarget {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAgentTarget {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, payload: &AgentPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                Prom2mkrError::Push(format!("failed to send metrics to {}: {err}", self.endpoint))
            })?;

        if !response.status().is_success() {
            return Err(Prom2mkrError::Push(format!(
                "agent endpoint {} returned status {}",
                self.endpoint,
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl AgentTarget for HttpAgentTarget {
    async fn push(&self, payload: &AgentPayload) -> Result<()> {
        Self::send(self, payload).await
    }
}
