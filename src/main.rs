//! Service Target Pods Exporter
//!
//! Polls the cluster for Services and serves the Running Pod count of each
//! one at `/metrics`.

use clap::Parser;
use service_target_pods::{cluster, ExporterConfig, MetricsServer, Poller, ServiceMetrics};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Flags that also accept the single-dash spelling (`-scrapeInterval 10`).
const LEGACY_FLAGS: [&str; 3] = ["scrapeInterval", "listenAddress", "config"];

#[derive(Debug, Parser)]
#[command(name = "service-target-pods-exporter", version, about)]
struct Cli {
    /// Interval to scrape status, in seconds [default: 30]
    #[arg(long = "scrapeInterval", value_name = "SECONDS")]
    scrape_interval: Option<u64>,

    /// The address to listen on for HTTP requests [default: :9299]
    #[arg(long = "listenAddress", value_name = "ADDR")]
    listen_address: Option<String>,

    /// Optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges flags over the config file over defaults.
    fn resolve(&self) -> Result<ExporterConfig, service_target_pods::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::from_file(path)?,
            None => ExporterConfig::default(),
        };
        if let Some(secs) = self.scrape_interval {
            config.scrape_interval_secs = secs;
        }
        if let Some(addr) = &self.listen_address {
            config.listen_address = addr.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Rewrites `-flag` and `-flag=value` to their double-dash form.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let legacy = arg
                .to_str()
                .and_then(|text| text.strip_prefix('-'))
                .map(|rest| rest.split_once('=').map_or(rest, |(name, _)| name))
                .is_some_and(|name| LEGACY_FLAGS.contains(&name));
            if legacy {
                let mut rewritten = OsString::from("-");
                rewritten.push(&arg);
                rewritten
            } else {
                arg
            }
        })
        .collect()
}

/// Log filter from `directives`, or from `RUST_LOG` when `None`.
///
/// Falls back to `info` when nothing usable is given.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    match directives {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(None))
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!(
        "Service Target Pods Exporter v{} (interval {}s, listening on {})",
        service_target_pods::VERSION,
        config.scrape_interval_secs,
        config.listen_address
    );

    let reader = match cluster::connect().await {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to connect to cluster: {}", e);
            std::process::exit(1);
        }
    };

    let metrics = match ServiceMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    let poller = Poller::new(
        Arc::new(reader),
        Arc::clone(&metrics),
        config.scrape_interval(),
    );
    tokio::spawn(poller.run());

    let server = MetricsServer::new(config.bind_address(), metrics);
    if let Err(e) = server.run().await {
        error!("Metrics server failed: {}", e);
        std::process::exit(1);
    }
}
