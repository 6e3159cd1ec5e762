//! wiresim entry point.
//!
//! # Usage
//!
//! ```bash
//! # Default timings
//! wiresim
//!
//! # Faster recovery, long polling, debug logs on stderr
//! wiresim --error-delay-ms 300 --recovery-delay-ms 500 --polling-mode long-polling --log-level debug
//! ```

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wiresim_cli::{Args, Runtime, Simulator, SystemEnv, TerminalDriver, TokioScheduler};
use wiresim_core::Environment;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries the simulation; logs go to stderr
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let env = SystemEnv::new();
    let (scheduler, timers) = TokioScheduler::new(env.clone());
    let simulator = Simulator::new(args.simulator_config(), scheduler, env.clone())?;

    let input = BufReader::new(tokio::io::stdin());
    let driver = TerminalDriver::new(input, std::io::stdout(), timers, env.now());

    tracing::info!(polling = %args.polling_mode, "wiresim starting");

    let mut runtime = Runtime::new(driver, simulator);
    runtime.run().await?;

    Ok(())
}
