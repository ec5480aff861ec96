//! CLI interface for Firewatch.
//!
//! With no subcommand the node runs. The other commands are field
//! diagnostics for an installer standing next to the rig:
//!
//! - `firewatch run`: listen on both channels and act on alerts.
//! - `firewatch parse <payload>`: show how a sensor payload is read.
//! - `firewatch center`: park the rig at the watch position.
//!
//! Global flags override the corresponding config file keys.

mod format;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::Timestamp;

use crate::config::Config;
use crate::model::Channel;
use crate::{node, parse};

use format::{format_event, format_rejection};

/// Firewatch: point the camera at reported fires.
#[derive(Debug, Parser)]
#[command(name = "firewatch", after_long_help = FIELD_HELP)]
pub struct Cli {
    /// Config file. Defaults to `$FIREWATCH_CONFIG`, then
    /// `~/.firewatch/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// UDP port for local-network alerts.
    #[arg(long, global = true)]
    udp_port: Option<u16>,

    /// Directory photos are written to.
    #[arg(long, global = true)]
    image_dir: Option<PathBuf>,

    /// Seconds before a sensor can trigger the rig again.
    #[arg(long, global = true)]
    cooldown_secs: Option<u64>,

    /// Serial device of the LoRa modem.
    #[arg(long, global = true)]
    radio_device: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

const FIELD_HELP: &str = r#"Field checks
  firewatch parse "FIRE-DETECTED ID:1,"
  firewatch parse --radio "ID:2,ANG:45"
  firewatch center

Logging
  RUST_LOG=firewatch=debug firewatch run"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the node until interrupted (the default).
    Run,

    /// Parse a sensor payload and show what the rig would do.
    ///
    /// Exits non-zero if the payload would be rejected.
    Parse {
        /// The payload, exactly as the sensor sends it.
        payload: String,

        /// Read it as a radio frame instead of a network datagram.
        #[arg(long)]
        radio: bool,
    },

    /// Move the rig to the watch position, settle, and release torque.
    Center,
}

impl Cli {
    /// Load config through the resolution chain and apply flag overrides.
    fn config(&self) -> Result<Config, String> {
        let mut config = Config::load(self.config.as_deref()).map_err(|e| e.to_string())?;

        if let Some(port) = self.udp_port {
            config.udp_port = port;
        }
        if let Some(dir) = &self.image_dir {
            config.image_dir = Some(dir.clone());
        }
        if let Some(secs) = self.cooldown_secs {
            config.cooldown_secs = secs;
        }
        if let Some(device) = &self.radio_device {
            config.radio.device = device.clone();
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Run the CLI, returning an error message on failure.
pub async fn run() -> Result<(), String> {
    let cli = Cli::parse();

    match &cli.command {
        None | Some(Command::Run) => cmd_run(&cli.config()?).await,
        Some(Command::Parse { payload, radio }) => cmd_parse(&cli.config()?, payload, *radio),
        Some(Command::Center) => cmd_center(&cli.config()?).await,
    }
}

async fn cmd_run(config: &Config) -> Result<(), String> {
    node::run(config).await.map_err(|e| e.to_string())
}

fn cmd_parse(config: &Config, payload: &str, radio: bool) -> Result<(), String> {
    let channel = if radio {
        Channel::Radio
    } else {
        Channel::LocalNetwork
    };

    match parse::parse(payload.as_bytes(), channel, Timestamp::now()) {
        Ok(event) => {
            println!("{}", format_event(&event, &config.aim));
            Ok(())
        }
        Err(e) => Err(format_rejection(&e)),
    }
}

async fn cmd_center(config: &Config) -> Result<(), String> {
    node::center(config).await.map_err(|e| e.to_string())?;
    eprintln!("Rig parked at {}", config.aim.neutral);
    Ok(())
}
