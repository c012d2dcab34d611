use std::io::Write;

use prom2mkr_common::error::{Prom2mkrError, Result};
use prom2mkr_graphdef::GraphDef;

use super::MetricValue;

const META_HEADER: &str = "# mackerel-agent-plugin";

pub fn write_values<W: Write>(out: &mut W, values: &[MetricValue]) -> Result<()> {
    for metric in values {
        writeln!(out, "{}\t{}\t{}", metric.name, metric.value, metric.time)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_meta<W: Write>(out: &mut W, def: &GraphDef) -> Result<()> {
    let json = serde_json::to_string(def).map_err(|err| {
        Prom2mkrError::Config(format!("failed to serialize graph definition: {err}"))
    })?;
    writeln!(out, "{META_HEADER}")?;
    writeln!(out, "{json}")?;
    out.flush()?;
    Ok(())
}
