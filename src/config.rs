//! Configuration parsing and validation

use crate::constants::threshold;
use crate::error::{AppError, AppResult};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line arguments for the noisemeter application
#[derive(Parser)]
#[command(name = "noisemeter")]
#[command(version, about = "Real-time sound level monitor with threshold alerts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show live loudness and alert when it exceeds the threshold
    Monitor(MonitorArgs),
    /// List available audio input devices
    List(ListArgs),
}

#[derive(Parser)]
pub struct MonitorArgs {
    /// Alert threshold on the meter's 10-100 scale
    #[arg(long, default_value_t = threshold::DEFAULT)]
    pub threshold: u32,

    /// Audio input device name (optional, uses default if not specified)
    #[arg(long)]
    pub device: Option<String>,

    /// Open the monitor without starting capture
    #[arg(long)]
    pub paused: bool,

    /// Write diagnostic logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ListArgs {}

/// Application configuration derived from command line arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub threshold: u32,
    pub device_name: Option<String>,
    pub autostart: bool,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Create configuration from monitor arguments
    pub fn from_monitor_args(monitor_args: MonitorArgs) -> AppResult<Self> {
        if !(threshold::MIN..=threshold::MAX).contains(&monitor_args.threshold) {
            return Err(AppError::Config(format!(
                "Threshold must be between {} and {}, got {}",
                threshold::MIN,
                threshold::MAX,
                monitor_args.threshold
            )));
        }

        if let Some(device) = &monitor_args.device
            && device.trim().is_empty()
        {
            return Err(AppError::Config("Device name must not be empty".to_string()));
        }

        Ok(Config {
            threshold: monitor_args.threshold,
            device_name: monitor_args.device,
            autostart: !monitor_args.paused,
            log_file: monitor_args.log_file,
        })
    }
}
