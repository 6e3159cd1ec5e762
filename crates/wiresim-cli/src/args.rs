//! Command-line arguments.

use std::time::Duration;

use clap::Parser;
use wiresim_app::SimulatorConfig;
use wiresim_core::{
    ConnectionConfig, PollingMode, StreamConfig,
    connection::{DEFAULT_ERROR_DELAY, DEFAULT_RECOVERY_DELAY},
    stream::{
        DEFAULT_FEED_CADENCE, DEFAULT_FEED_CAPACITY, DEFAULT_PACKET_CADENCE,
        DEFAULT_PACKET_CAPACITY, DEFAULT_TO_CLIENT_RATIO,
    },
};

/// Simulated persistent connection in the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "wiresim")]
#[command(about = "Simulate a persistent connection: lifecycle, recovery and live traffic")]
#[command(version)]
pub struct Args {
    /// Time spent disconnected after a simulated error
    #[arg(long, default_value_t = millis(DEFAULT_ERROR_DELAY))]
    pub error_delay_ms: u64,

    /// Time spent reconnecting before the connection is restored
    #[arg(long, default_value_t = millis(DEFAULT_RECOVERY_DELAY))]
    pub recovery_delay_ms: u64,

    /// Packet stream emission interval
    #[arg(long, default_value_t = millis(DEFAULT_PACKET_CADENCE))]
    pub packet_interval_ms: u64,

    /// Feed stream emission interval
    #[arg(long, default_value_t = millis(DEFAULT_FEED_CADENCE))]
    pub feed_interval_ms: u64,

    /// Packet records kept
    #[arg(long, default_value_t = DEFAULT_PACKET_CAPACITY)]
    pub packet_capacity: usize,

    /// Feed records kept
    #[arg(long, default_value_t = DEFAULT_FEED_CAPACITY)]
    pub feed_capacity: usize,

    /// Probability that a record flows server to client
    #[arg(long, default_value_t = DEFAULT_TO_CLIENT_RATIO)]
    pub to_client_ratio: f64,

    /// Initial polling technique (polling, long-polling, realtime)
    #[arg(long, default_value = "polling")]
    pub polling_mode: PollingMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Simulator settings described by these arguments.
    ///
    /// Not validated here; `Simulator::new` rejects bad values.
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            connection: ConnectionConfig {
                error_delay: Duration::from_millis(self.error_delay_ms),
                recovery_delay: Duration::from_millis(self.recovery_delay_ms),
            },
            packets: StreamConfig {
                cadence: Duration::from_millis(self.packet_interval_ms),
                capacity: self.packet_capacity,
                to_client_ratio: self.to_client_ratio,
                ..StreamConfig::packets()
            },
            feed: StreamConfig {
                cadence: Duration::from_millis(self.feed_interval_ms),
                capacity: self.feed_capacity,
                to_client_ratio: self.to_client_ratio,
                ..StreamConfig::feed()
            },
            polling_mode: self.polling_mode,
            ..SimulatorConfig::default()
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
