mod alert;
mod analyzer;
mod app;
mod capture;
mod config;
mod constants;
mod error;
mod loudness;
mod meter;
mod smoothing;
mod state;
mod tone;
mod ui;

use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};
use dialoguer::{Select, theme::ColorfulTheme};
use error::AppResult;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber. With a log file every event goes there;
/// otherwise `to_stderr` decides between stderr and discarding.
fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("noisemeter=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if to_stderr => builder.with_writer(std::io::stderr).init(),
        None => builder.with_writer(std::io::sink).init(),
    }

    Ok(())
}

fn list_devices() -> AppResult<()> {
    let host = cpal::default_host();
    let devices = host.input_devices()?;

    let device_list: Vec<String> = devices.filter_map(|d| d.name().ok()).collect();

    if device_list.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    // Interactive selection
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an audio input device")
        .items(&device_list)
        .default(0)
        .interact()
        .map_err(|e| error::AppError::Io(std::io::Error::other(e)))?;

    println!("{}", device_list[selection]);

    Ok(())
}

#[tokio::main]
async fn main() {
    use app::ExitCode;
    use config::{Args, Commands};

    let args = Args::parse();

    match args.command {
        Commands::Monitor(monitor_args) => {
            let config = match config::Config::from_monitor_args(monitor_args) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            };

            if let Err(e) = init_logging(config.log_file.as_deref(), false) {
                eprintln!("Failed to open log file: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }

            match app::App::new_with_config(config) {
                Ok(app) => {
                    let (result, exit_code) = app.run().await;
                    if let Err(e) = result {
                        eprintln!("Application error: {}", e);
                    }
                    std::process::exit(exit_code as i32);
                }
                Err(e) => {
                    eprintln!("Setup error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            }
        }
        Commands::List(_) => {
            if let Err(e) = init_logging(None, true) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            if let Err(e) = list_devices() {
                eprintln!("Error listing devices: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }
        }
    }
}
