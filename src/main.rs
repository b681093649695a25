//! Binary entrypoint for the wardrive bridge.
//!
//! Commands:
//! - `start` - consume the observer feed and forward uploads until the connection drops
//! - `init` - write a starter `config.toml`
//! - `maintain` - trigger the service's consolidate and repeater clean-up passes
//! - `decode <hex>` - print a raw packet as JSON, decrypting the watched channel when possible
//!
//! See the library crate docs for module-level details: `meshcore_wardrive::`.
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use meshcore_wardrive::bridge::Bridge;
use meshcore_wardrive::config::Config;
use meshcore_wardrive::inspect;
use meshcore_wardrive::service::ServiceClient;
use meshcore_wardrive::transport;

#[derive(Parser)]
#[command(name = "wardrive")]
#[command(about = "Bridges MeshCore observer reports to the wardrive coverage service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge
    Start,
    /// Write a default configuration file
    Init,
    /// Trigger service consolidation and repeater clean-up
    Maintain,
    /// Decode a raw packet given as hex
    Decode {
        /// Packet bytes as hex, as published by observers
        raw: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting wardrive bridge v{}", env!("CARGO_PKG_VERSION"));

            let settings = config.bridge_settings()?;
            info!(
                "Watching channel {:02x} from {} observer(s), {} mi around ({}, {})",
                settings.channel_hash,
                settings.watched_observers.len(),
                settings.geofence.max_distance_miles,
                settings.geofence.center.0,
                settings.geofence.center.1
            );
            if !settings.verify_mac {
                warn!("Channel MAC verification disabled; decrypting unauthenticated messages");
            }

            let uploader = ServiceClient::new(&config.service);
            let mut bridge = Bridge::new(settings, uploader);

            let options = transport::mqtt_options(&config.mqtt)?;
            let stats_interval = match config.logging.stats_interval_seconds {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
            info!(
                "Connecting to {}:{} ({})",
                config.mqtt.host, config.mqtt.port, config.mqtt.transport
            );
            let fatal = transport::run(options, &config.mqtt.topic, &mut bridge, stats_interval).await;
            error!("Bridge stopped: {}", fatal);
            return Err(fatal.into());
        }
        Commands::Init => {
            info!("Initializing new bridge configuration");
            if tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                return Err(anyhow!("{} already exists; not overwriting", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Maintain => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let client = ServiceClient::new(&config.service);
            let mut failures = 0;

            match client.consolidate().await {
                Ok(result) => info!("Consolidate returned {}", result),
                Err(e) => {
                    warn!("Consolidate failed: {}", e);
                    failures += 1;
                }
            }
            match client.clean_up("repeaters").await {
                Ok(result) => info!("Clean-up returned {}", result),
                Err(e) => {
                    warn!("Clean-up failed: {}", e);
                    failures += 1;
                }
            }
            if failures > 0 {
                return Err(anyhow!("{} maintenance request(s) failed", failures));
            }
        }
        Commands::Decode { raw } => {
            // Decrypting is best effort: a missing or invalid config only
            // means the channel text stays encrypted.
            let settings = pre_config.and_then(|c| c.bridge_settings().ok());
            let value = inspect::describe_hex(&raw, settings.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
