use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use prom2mkr_common::Result;
use prom2mkr_flatten::{FlattenConfig, ParsePolicy};
use prom2mkr_graphdef::DEFAULT_GRAPH_DEF_PATH;
use prom2mkr_plugin::{HttpAgentTarget, OutputMode, PluginConfig, Prom2mkrPlugin};
use tracing::error;
use tracing_subscriber::EnvFilter;

const META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";

#[derive(Parser, Debug)]
#[command(
    name = "prom2mkr",
    about = "Report Prometheus exposition metrics as mackerel-agent plugin values"
)]
struct Cli {
    /// Exposition endpoint to scrape.
    #[arg(long)]
    url: String,

    #[arg(long, default_value = "")]
    metric_key_prefix: String,

    /// Graph definition cache; delete it to rebuild from the next scrape.
    #[arg(long, default_value = DEFAULT_GRAPH_DEF_PATH)]
    temp_graph_def: PathBuf,

    #[arg(long = "ignore-family", default_values_t = ["go_info".to_string()])]
    ignore_families: Vec<String>,

    #[arg(long = "ignore-label", default_values_t = ["error".to_string()])]
    ignore_labels: Vec<String>,

    /// Log and drop values that are not numbers instead of failing the run.
    #[arg(long, default_value_t = false)]
    skip_invalid_values: bool,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Accept invalid TLS certificates from the scrape target.
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Push to this agent endpoint instead of printing values.
    #[arg(long)]
    push_endpoint: Option<String>,

    /// Print the graph definition instead of values.
    #[arg(long, env = META_ENV, default_value_t = false, value_parser = parse_meta_flag)]
    meta: bool,
}

impl Cli {
    fn plugin_config(&self) -> PluginConfig {
        let parse_policy = if self.skip_invalid_values {
            ParsePolicy::Lenient
        } else {
            ParsePolicy::Strict
        };

        PluginConfig {
            url: self.url.clone(),
            prefix: self.metric_key_prefix.clone(),
            graph_def_path: self.temp_graph_def.clone(),
            flatten: FlattenConfig {
                ignore_families: self.ignore_families.iter().cloned().collect(),
                ignore_labels: self.ignore_labels.iter().cloned().collect(),
                parse_policy,
            },
            scrape_timeout: Duration::from_secs(self.timeout_secs),
            accept_invalid_certs: self.insecure,
        }
    }

    fn output_mode(&self) -> OutputMode {
        if self.meta {
            return OutputMode::Meta;
        }
        match &self.push_endpoint {
            Some(endpoint) => OutputMode::Push(Arc::new(HttpAgentTarget::new(endpoint.clone()))),
            None => OutputMode::Values,
        }
    }
}

/// The agent sets the variable to any non-empty value.
fn parse_meta_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(!matches!(value.trim(), "" | "0" | "false"))
}

async fn run(cli: Cli) -> Result<()> {
    let plugin = Prom2mkrPlugin::from_config(cli.plugin_config())?;
    let mode = cli.output_mode();
    let mut stdout = std::io::stdout().lock();
    plugin.run(&mode, &mut stdout).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the metric lines, so logs go to stderr.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prom2mkr=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, fatal = err.is_fatal(), "collection failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use prom2mkr_flatten::ParsePolicy;

    use prom2mkr_plugin::OutputMode;

    use super::{Cli, META_ENV, parse_meta_flag};

    #[test]
    fn defaults_match_plugin_conventions() {
        let cli = Cli::try_parse_from(["prom2mkr", "--url", "http://localhost:9100/metrics"])
            .unwrap();
        let config = cli.plugin_config();

        assert_eq!(config.prefix, "");
        assert_eq!(config.graph_def_path.to_str(), Some("/tmp/prom2mkr.json"));
        assert!(config.flatten.ignore_families.contains("go_info"));
        assert!(config.flatten.ignore_labels.contains("error"));
        assert_eq!(config.flatten.parse_policy, ParsePolicy::Strict);
        assert_eq!(config.scrape_timeout.as_secs(), 10);
    }

    #[test]
    fn repeated_ignore_flags_replace_defaults() {
        let cli = Cli::try_parse_from([
            "prom2mkr",
            "--url",
            "http://localhost:9100/metrics",
            "--ignore-label",
            "instance",
            "--ignore-label",
            "job",
            "--skip-invalid-values",
        ])
        .unwrap();
        let config = cli.plugin_config();

        assert_eq!(config.flatten.ignore_labels.len(), 2);
        assert!(!config.flatten.ignore_labels.contains("error"));
        assert_eq!(config.flatten.parse_policy, ParsePolicy::Lenient);
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["prom2mkr"]).is_err());
    }

    // Modes are checked in one test because the meta variable is process-wide.
    #[test]
    fn output_mode_follows_push_endpoint_and_meta_env() {
        let args = [
            "prom2mkr",
            "--url",
            "http://localhost:9100/metrics",
            "--push-endpoint",
            "http://localhost:8080/push",
        ];

        let cli = Cli::try_parse_from(["prom2mkr", "--url", "http://localhost:9100/metrics"])
            .unwrap();
        assert!(matches!(cli.output_mode(), OutputMode::Values));

        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.output_mode(), OutputMode::Push(_)));

        unsafe { std::env::set_var(META_ENV, "1") };
        let parsed = Cli::try_parse_from(args);
        unsafe { std::env::remove_var(META_ENV) };

        let cli = parsed.unwrap();
        assert!(cli.meta);
        assert!(matches!(cli.output_mode(), OutputMode::Meta));
    }

    #[test]
    fn meta_flag_accepts_agent_values() {
        assert_eq!(parse_meta_flag("1"), Ok(true));
        assert_eq!(parse_meta_flag("yes"), Ok(true));
        assert_eq!(parse_meta_flag(""), Ok(false));
        assert_eq!(parse_meta_flag("0"), Ok(false));
    }
}
