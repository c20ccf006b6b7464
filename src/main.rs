mod config;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use rfetch::cache::{CacheStorage, MemoryStorage, NoopStorage};
use rfetch::cancel::{self, CancelHandle};
use rfetch::fetch::{FetchOptions, OnTotalFailure, ReqwestTransport, ResilientFetchClient};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rfetch")]
#[command(about = "Fetch records from the first healthy endpoint, with cache and fallback")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./rfetch.yaml or $XDG_CONFIG_HOME/rfetch/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Endpoint base URL; repeat to set the order. Replaces configured endpoints.
  #[arg(short, long = "endpoint", global = true)]
  endpoints: Vec<String>,

  /// Log at debug level (RFETCH_LOG overrides)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch a resource once and print the outcome as JSON
  Fetch {
    /// Resource key, e.g. parties:gamescom2025
    resource: String,
    #[command(flatten)]
    overrides: OptionOverrides,
  },
  /// Re-fetch a resource on an interval, printing a line whenever it changes
  Watch {
    resource: String,
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,
    #[command(flatten)]
    overrides: OptionOverrides,
  },
  /// Try every endpoint and report which ones answer
  Probe {
    resource: String,
    #[arg(long)]
    timeout_ms: Option<u64>,
  },
}

#[derive(clap::Args, Debug)]
struct OptionOverrides {
  /// Skip the fresh-cache short circuit
  #[arg(long)]
  force_refresh: bool,
  /// Neither read nor write the cache
  #[arg(long)]
  no_cache: bool,
  #[arg(long)]
  timeout_ms: Option<u64>,
  #[arg(long, value_enum)]
  on_total_failure: Option<OnTotalFailure>,
  /// Extra query parameter as key=value; repeatable
  #[arg(long = "query", value_parser = parse_query_pair)]
  query: Vec<(String, String)>,
}

impl OptionOverrides {
  fn apply(&self, mut options: FetchOptions) -> FetchOptions {
    if self.force_refresh {
      options = options.with_force_refresh(true);
    }
    if self.no_cache {
      options = options.with_use_cache(false);
    }
    if let Some(ms) = self.timeout_ms {
      options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(policy) = self.on_total_failure {
      options = options.with_on_total_failure(policy);
    }
    for (k, v) in &self.query {
      options = options.with_query(k.as_str(), v.as_str());
    }
    options
  }
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .filter(|(k, _)| !k.is_empty())
    .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let default_level = if args.verbose { "debug" } else { "warn" };
  let filter =
    EnvFilter::try_from_env("RFETCH_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
  let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .init();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override endpoints if specified on command line
  let config = if args.endpoints.is_empty() {
    config
  } else {
    config::Config {
      endpoints: args.endpoints,
      ..config
    }
  };

  let transport =
    ReqwestTransport::new().map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
  let options = config.fetch_options(config::Config::get_auth_token().as_deref())?;

  // Ctrl-C cancels whatever is in flight.
  let (handle, signal) = cancel::pair();
  tokio::spawn(cancel_on_ctrl_c(handle));
  let options = options.with_cancel(signal);

  if config.cache.enabled {
    let client = ResilientFetchClient::with_storage(transport, MemoryStorage::new())
      .with_catalog(config.catalog());
    run(&client, &config.endpoints, options, args.command).await
  } else {
    let client =
      ResilientFetchClient::with_storage(transport, NoopStorage).with_catalog(config.catalog());
    run(&client, &config.endpoints, options, args.command).await
  }
}

async fn cancel_on_ctrl_c(handle: CancelHandle) {
  if tokio::signal::ctrl_c().await.is_ok() {
    handle.cancel();
  }
}

async fn run<S: CacheStorage>(
  client: &ResilientFetchClient<S>,
  endpoints: &[String],
  base: FetchOptions,
  command: Command,
) -> Result<()> {
  match command {
    Command::Fetch {
      resource,
      overrides,
    } => {
      let options = overrides.apply(base);
      let outcome = client.fetch_resource(&resource, endpoints, &options).await?;
      println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Command::Watch {
      resource,
      interval_secs,
      overrides,
    } => {
      let options = overrides.apply(base);
      let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
      let mut last = None;

      let signal = options.cancel.clone();

      loop {
        match &signal {
          Some(signal) => tokio::select! {
            _ = signal.cancelled() => break,
            _ = interval.tick() => {}
          },
          None => {
            interval.tick().await;
          }
        }

        let outcome = match client.fetch_resource(&resource, endpoints, &options).await {
          Ok(outcome) => outcome,
          Err(rfetch::ClientError::Cancelled) => break,
          Err(e) => return Err(e.into()),
        };

        let state = (outcome.revision.clone(), outcome.freshness());
        if last.as_ref() != Some(&state) {
          println!(
            "{} {:?} {} records ({:?})",
            chrono::Utc::now().format("%H:%M:%S"),
            outcome.freshness(),
            outcome.records.len(),
            outcome.source
          );
          last = Some(state);
        }
      }
    }
    Command::Probe {
      resource,
      timeout_ms,
    } => {
      let options = match timeout_ms {
        Some(ms) => base.with_timeout(Duration::from_millis(ms)),
        None => base,
      };
      let reports = client.probe(&resource, endpoints, &options).await?;
      for report in reports {
        let result = match &report.result {
          Ok(count) => format!("ok, {} records", count),
          Err(e) => format!("failed: {}", e),
        };
        println!(
          "{:<60} {:>6}ms  {}",
          report.url,
          report.elapsed.as_millis(),
          result
        );
      }
    }
  }

  Ok(())
}
