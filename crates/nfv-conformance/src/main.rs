//! nfvconf - NFV lifecycle conformance harness
//!
//! Entry point for the nfvconf CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use nfv_conformance::{
    HarnessConfig, LcmContext, ScenarioRunner, TcpConnectProbe, DEFAULT_CONFIG_PATH,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// NFV lifecycle conformance harness
#[derive(Parser, Debug)]
#[command(name = "nfvconf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List vendors with a registered adapter
    Vendors,

    /// Load and validate the configuration, then print it
    CheckConfig,

    /// Run the lifecycle scenario against one vendor
    Run {
        /// Vendor to drive (tacker, openstack, nso)
        #[arg(short = 'v', long)]
        vendor: String,

        /// Drive an existing instance instead of creating one
        #[arg(long)]
        vnf_instance_id: Option<String>,

        /// Descriptor to create the instance from
        #[arg(long)]
        vnfd_id: Option<String>,

        /// Deployment flavour
        #[arg(long)]
        flavour_id: Option<String>,

        /// Skip the traffic step even if configured
        #[arg(long)]
        no_traffic: bool,
    },
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.command {
        Command::Vendors => {
            let context = LcmContext::new(config)?;
            for vendor in context.vendors() {
                println!("{}", vendor);
            }
            Ok(true)
        }
        Command::CheckConfig => {
            config.validate()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
        Command::Run {
            vendor,
            vnf_instance_id,
            vnfd_id,
            flavour_id,
            no_traffic,
        } => {
            if vnf_instance_id.is_some() {
                config.scenario.vnf_instance_id = vnf_instance_id;
            }
            if vnfd_id.is_some() {
                config.scenario.vnfd_id = vnfd_id;
            }
            if let Some(flavour_id) = flavour_id {
                config.scenario.flavour_id = flavour_id;
            }

            let context = LcmContext::new(config)?;
            let mut runner = ScenarioRunner::new(&context);
            if context.config().traffic.enabled && !no_traffic {
                if let Some(probe) = TcpConnectProbe::from_config(&context.config().traffic) {
                    runner = runner.with_traffic(Arc::new(probe));
                }
            }

            info!(vendor = %vendor, "Running lifecycle scenario");
            let report = tokio::select! {
                report = runner.run(&vendor, &context.config().scenario) => report?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, abandoning scenario");
                    return Ok(false);
                }
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(report.passed())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("nfvconf: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "nfvconf failed");
            ExitCode::FAILURE
        }
    }
}
