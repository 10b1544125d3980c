// flexctl -- command-line control of a network-attached SDR transceiver.
//
// Usage:
//   flexctl --host 192.168.1.100 info
//   flexctl tune 14250000
//   flexctl mode cw
//   flexctl rf-gain 75
//   flexctl ptt on
//   flexctl pan on
//   flexctl mem list
//   flexctl mem recall 1
//   flexctl watch --seconds 60
//
// The radio address comes from the config file
// (<config_dir>/flexctl/config.toml) unless overridden with --host and
// --port. Each invocation opens its own session, creates a slice where
// the command needs one, and tears everything down on exit.

mod config;
mod memory;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use flexctl_client::{Mode, RadioSession, SessionOptions};

use crate::config::{Config, config_path};
use crate::memory::{MemoryBank, MemoryChannel};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Command-line control of a network-attached SDR transceiver.
#[derive(Parser)]
#[command(name = "flexctl", version, about)]
struct Cli {
    /// Radio host address. Overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// TCP command port. Overrides the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Operating mode for the slice (usb, lsb, cw, am, fm, digu, digl).
    #[arg(long, default_value = "usb")]
    mode: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect, create a slice, and print the mirrored state.
    Info,
    /// Tune the slice to a frequency in Hz.
    Tune { hz: u64 },
    /// Create the slice in the given operating mode.
    Mode { mode: String },
    /// Set the RF power level (0-100).
    RfGain { level: u8 },
    /// Set the AF gain level (0-100).
    AfGain { level: u8 },
    /// Key or unkey the transmitter.
    Ptt {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Enable or disable the panadapter feed.
    Pan {
        #[arg(value_enum)]
        state: Switch,
    },
    /// List or recall memory channels.
    Mem {
        #[command(subcommand)]
        op: MemCommand,
    },
    /// Subscribe to state changes and print them as they arrive.
    Watch {
        /// How long to keep watching.
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum MemCommand {
    /// Print the configured memory channels.
    List,
    /// Store a new memory channel in the config file.
    Add {
        name: String,
        /// Frequency in Hz.
        hz: u64,
        #[arg(long, default_value = "usb")]
        mode: String,
        #[arg(long, default_value_t = 50)]
        rf_gain: u8,
        #[arg(long, default_value_t = 50)]
        af_gain: u8,
    },
    /// Overwrite an existing memory channel.
    Set {
        index: usize,
        name: String,
        /// Frequency in Hz.
        hz: u64,
        #[arg(long, default_value = "usb")]
        mode: String,
        #[arg(long, default_value_t = 50)]
        rf_gain: u8,
        #[arg(long, default_value_t = 50)]
        af_gain: u8,
    },
    /// Delete a memory channel.
    Del { index: usize },
    /// Apply a memory channel to the radio.
    Recall { index: usize },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    // Everything except recall operates on the config file alone; no
    // connection needed.
    if let Command::Mem { op } = &cli.command {
        if !matches!(op, MemCommand::Recall { .. }) {
            return run_memory_command(op, &config);
        }
    }

    let host = cli
        .host
        .clone()
        .unwrap_or_else(|| config.radio.host.clone());
    let port = cli.port.unwrap_or(config.radio.tcp_port);
    let slice_mode: Mode = cli
        .mode
        .parse()
        .with_context(|| format!("unknown mode: {}", cli.mode))?;

    let options = SessionOptions {
        udp_port: config.radio.udp_port,
        ..SessionOptions::default()
    };
    let session = RadioSession::connect_with_options(&host, port, options)
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;
    println!("connected to {host}:{port}");

    let result = run(&cli.command, &session, &config, slice_mode).await;
    session.disconnect().await;
    result
}

/// Handle the connection-free memory subcommands: list, add, set, del.
/// Mutations are written back to the config file.
fn run_memory_command(op: &MemCommand, config: &Config) -> Result<()> {
    let mut bank = MemoryBank::from_config(&config.memory);

    match op {
        MemCommand::List => {
            if bank.is_empty() {
                println!("no memory channels configured");
            }
            for (index, channel) in bank.channels().iter().enumerate() {
                println!(
                    "{index:>3}  {:<16} {:>12} Hz  {:<5} rf={:<3} af={:<3}",
                    channel.name,
                    channel.frequency,
                    channel.mode,
                    channel.rf_gain,
                    channel.af_gain
                );
            }
            return Ok(());
        }
        MemCommand::Add {
            name,
            hz,
            mode,
            rf_gain,
            af_gain,
        } => {
            let channel = MemoryChannel {
                name: name.clone(),
                frequency: *hz,
                mode: mode.parse().with_context(|| format!("unknown mode: {mode}"))?,
                rf_gain: *rf_gain,
                af_gain: *af_gain,
            };
            if !bank.add(channel) {
                anyhow::bail!("memory bank is full ({} channels)", bank.len());
            }
            println!("stored {name} ({} channels)", bank.len());
        }
        MemCommand::Set {
            index,
            name,
            hz,
            mode,
            rf_gain,
            af_gain,
        } => {
            let channel = MemoryChannel {
                name: name.clone(),
                frequency: *hz,
                mode: mode.parse().with_context(|| format!("unknown mode: {mode}"))?,
                rf_gain: *rf_gain,
                af_gain: *af_gain,
            };
            if !bank.update(*index, channel) {
                anyhow::bail!("no memory channel {index}");
            }
            println!("updated {index}: {name}");
        }
        MemCommand::Del { index } => {
            if !bank.delete(*index) {
                anyhow::bail!("no memory channel {index}");
            }
            println!("deleted {index} ({} channels left)", bank.len());
        }
        MemCommand::Recall { .. } => anyhow::bail!("recall needs a connection"),
    }

    let mut updated = config.clone();
    updated.memory.channels = bank.channels().to_vec();
    let path = config_path().context("no config directory on this platform")?;
    updated
        .save_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

async fn run(
    command: &Command,
    session: &RadioSession,
    config: &Config,
    slice_mode: Mode,
) -> Result<()> {
    match command {
        Command::Info => {
            session.create_slice(slice_mode).await?;
            // Give the subscription a moment to deliver initial status.
            tokio::time::sleep(Duration::from_millis(500)).await;
            let state = session.state();
            println!("slice:     {}", session.slice_id().unwrap_or_default());
            println!("frequency: {} Hz", state.frequency);
            println!("mode:      {}", state.mode);
            println!("rf gain:   {}", state.rf_gain);
            println!("af gain:   {}", state.af_gain);
            println!("ptt:       {}", if state.ptt { "on" } else { "off" });
        }

        Command::Tune { hz } => {
            session.create_slice(slice_mode).await?;
            session.set_frequency(*hz).await?;
            println!("tuned to {hz} Hz");
        }

        Command::Mode { mode } => {
            let mode: Mode = mode.parse().with_context(|| format!("unknown mode: {mode}"))?;
            let slice_id = session.create_slice(mode).await?;
            println!("slice {slice_id} created in {mode}");
        }

        Command::RfGain { level } => {
            session.create_slice(slice_mode).await?;
            session.set_rf_gain(*level).await?;
            println!("rf gain set to {level}");
        }

        Command::AfGain { level } => {
            session.create_slice(slice_mode).await?;
            session.set_af_gain(*level).await?;
            println!("af gain set to {level}");
        }

        Command::Ptt { state } => {
            session.create_slice(slice_mode).await?;
            let on = *state == Switch::On;
            session.set_ptt(on).await?;
            println!("transmitter {}", if on { "keyed" } else { "unkeyed" });
        }

        Command::Pan { state } => match state {
            Switch::On => {
                let pan_id = session
                    .enable_panadapter(config.display.panadapter_width, None)
                    .await?;
                println!("panadapter {pan_id} enabled");
            }
            Switch::Off => {
                if session.pan_id().is_some() {
                    session.disable_panadapter().await?;
                    println!("panadapter disabled");
                } else {
                    println!("no panadapter enabled in this session");
                }
            }
        },

        Command::Mem { op } => match op {
            MemCommand::Recall { index } => {
                let bank = MemoryBank::from_config(&config.memory);
                match bank.get(*index).cloned() {
                    Some(channel) => {
                        session.create_slice(slice_mode).await?;
                        bank.recall(session, *index).await?;
                        println!(
                            "recalled {index}: {} ({} Hz {})",
                            channel.name, channel.frequency, channel.mode
                        );
                    }
                    None => println!("no memory channel {index}"),
                }
            }
            // Everything else is handled before connecting.
            _ => anyhow::bail!("memory command needs no connection"),
        },

        Command::Watch { seconds } => {
            session.create_slice(slice_mode).await?;
            session.subscribe(|state| {
                println!(
                    "{:>12} Hz  {:<5} rf={:<3} af={:<3} {}",
                    state.frequency,
                    state.mode,
                    state.rf_gain,
                    state.af_gain,
                    if state.ptt { "TX" } else { "RX" }
                );
            });
            println!("watching for {seconds} seconds (ctrl-c to stop)...");
            tokio::time::sleep(Duration::from_secs(*seconds)).await;
        }
    }

    Ok(())
}
