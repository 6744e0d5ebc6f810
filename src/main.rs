//! valvecontrol — console front-end for the zone dependency engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  JsonFileStore   MqttChannel            LogEventSink     │
//! │  (ConfigPort)    (CommandChannel +      (EventSink)      │
//! │                   ReportSource)                          │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ──────────────      │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │   ZoneEngine ─ Mutex ─ ZoneService (pure)      │      │
//! │  └────────────────────────────────────────────────┘      │
//! │                                                          │
//! │  console thread (Local) · report-pump thread (Remote)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};

use valvecontrol::adapters::json_store::JsonFileStore;
use valvecontrol::adapters::mqtt::MqttChannel;
use valvecontrol::app::engine::ZoneEngine;
use valvecontrol::app::ports::{CommandChannel, ConfigError, ConfigPort, ReportSource};
use valvecontrol::config::ZoneConfig;
use valvecontrol::console::{self, ConsoleCommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Irrigation zone controller")]
struct Cli {
    /// Path to the zone configuration document.
    #[arg(short, long, default_value = "zones.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the document, connect, and read console commands (default).
    Run,
    /// Validate the document and print the zone table.
    Check,
    /// Write the default document.
    Init {
        /// Overwrite an existing document.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let store = JsonFileStore::new(cli.config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(store),
        Command::Check => check(&store),
        Command::Init { force } => init(&store, force),
    }
}

// ── Subcommands ───────────────────────────────────────────────

fn check(store: &JsonFileStore) -> Result<()> {
    let config = store
        .load()
        .with_context(|| format!("checking {}", store.path().display()))?;
    println!("{} is valid", store.path().display());
    for (id, zone) in config.zones.iter().enumerate() {
        println!(
            "  {id}  {:<20} {:<8} {}",
            zone.name,
            if zone.enabled { "enabled" } else { "disabled" },
            describe_role(zone.is_master, zone.declared_master()),
        );
    }
    println!("  policies: {:?}", config.policy);
    Ok(())
}

fn init(store: &JsonFileStore, force: bool) -> Result<()> {
    if store.path().exists() && !force {
        bail!("{} already exists (use --force to overwrite)", store.path().display());
    }
    store
        .save(&ZoneConfig::default())
        .with_context(|| format!("writing {}", store.path().display()))?;
    println!("wrote default configuration to {}", store.path().display());
    Ok(())
}

fn run(mut store: JsonFileStore) -> Result<()> {
    let mut config = load_or_default(&store)?;

    let channel = MqttChannel::new(config.mqtt.clone());
    let engine = ZoneEngine::new(channel.clone());
    engine
        .install_config(&config.zones, config.policy)
        .context("installing zone table")?;

    channel.on_connection_change(|on| {
        println!("mqtt: {}", if on { "connected" } else { "disconnected" });
    });
    engine.on_state_changed(|zone, active| {
        println!("zone {zone}: {}", if active { "ON" } else { "OFF" });
    });

    let pump = engine
        .spawn_report_pump(channel.subscribe())
        .context("starting report pump")?;

    let (stop_status, stop_rx) = mpsc::channel();
    let status = if config.mqtt.enabled {
        if let Err(e) = channel.connect() {
            warn!("MQTT connect failed: {}", e);
        }
        let period = Duration::from_secs(u64::from(config.mqtt.status_update_interval));
        Some(spawn_status_reporter(channel.clone(), period, stop_rx).context("starting status reporter")?)
    } else {
        info!("MQTT disabled, running offline");
        None
    };

    println!("{}", console::HELP);
    let stdin = io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let line = line.context("reading console")?;
        if line.trim().is_empty() {
            prompt();
            continue;
        }
        match console::parse(&line) {
            Ok(ConsoleCommand::Quit { force }) => {
                if force || !store.has_unsaved_changes(&config) {
                    break;
                }
                println!("unsaved changes: 'save', 'save-as <path>', or 'quit!' to discard them");
            }
            Ok(cmd) => dispatch(cmd, &engine, &channel, &mut store, &mut config),
            Err(e) => println!("error: {e}"),
        }
        prompt();
    }

    if store.has_unsaved_changes(&config) {
        warn!("Discarding unsaved configuration changes");
    }
    drop(stop_status);
    if let Some(status) = status {
        if status.join().is_err() {
            warn!("Status reporter panicked");
        }
    }
    channel.shutdown();
    if pump.join().is_err() {
        warn!("Report pump panicked");
    }
    info!("Shutdown complete");
    Ok(())
}

// ── Console dispatch ──────────────────────────────────────────

fn dispatch(
    cmd: ConsoleCommand,
    engine: &ZoneEngine<MqttChannel>,
    channel: &MqttChannel,
    store: &mut JsonFileStore,
    config: &mut ZoneConfig,
) {
    match cmd {
        ConsoleCommand::Engine(cmd) => {
            if let Err(e) = engine.handle_command(cmd) {
                println!("error: {e}");
            }
            config.policy = engine.policy();
        }
        ConsoleCommand::Status => print_status(engine, store, config),
        ConsoleCommand::Connect => {
            if !channel.settings().enabled {
                println!("mqtt is disabled in {}", store.path().display());
                return;
            }
            match channel.connect() {
                Ok(true) => println!("mqtt: connecting"),
                Ok(false) => println!("mqtt: session already running"),
                Err(e) => println!("error: {e}"),
            }
        }
        ConsoleCommand::Disconnect => channel.disconnect(),
        ConsoleCommand::AddZone
        | ConsoleCommand::RemoveZone
        | ConsoleCommand::SetMaster { .. }
        | ConsoleCommand::SetMasterZone { .. }
        | ConsoleCommand::SetEnabled { .. }
        | ConsoleCommand::Rename { .. } => edit(cmd, engine, config),
        ConsoleCommand::Open(path) => open(path, engine, store, config),
        ConsoleCommand::Save => match store.save(config) {
            Ok(()) => println!("saved {}", store.path().display()),
            Err(e) => println!("error: {e}"),
        },
        ConsoleCommand::SaveAs(path) => {
            let target = JsonFileStore::new(path);
            match target.save(config) {
                Ok(()) => {
                    println!("saved {}", target.path().display());
                    *store = target;
                }
                Err(e) => println!("error: {e}"),
            }
        }
        ConsoleCommand::Help => println!("{}", console::HELP),
        ConsoleCommand::Quit { .. } => {}
    }
}

/// Load another document and install it.  Every zone resets to inactive;
/// the MQTT section only applies on the next start.
fn open(
    path: PathBuf,
    engine: &ZoneEngine<MqttChannel>,
    store: &mut JsonFileStore,
    config: &mut ZoneConfig,
) {
    let source = JsonFileStore::new(path);
    let loaded = match source.load() {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("error: cannot open {}: {e}", source.path().display());
            return;
        }
    };
    if let Err(e) = engine.install_config(&loaded.zones, loaded.policy) {
        println!("error: {e}");
        return;
    }
    if loaded.mqtt != config.mqtt {
        warn!("MQTT settings from {} apply after a restart", source.path().display());
    }
    println!("opened {} ({} zones, all off)", source.path().display(), loaded.zones.len());
    *store = source;
    *config = loaded;
}

/// Apply a document edit and reinstall the table.  Installing resets every
/// zone to inactive, so edits are refused while any valve is open.
fn edit(cmd: ConsoleCommand, engine: &ZoneEngine<MqttChannel>, config: &mut ZoneConfig) {
    let mut draft = config.clone();
    let applied = match cmd {
        ConsoleCommand::AddZone => draft.add_zone().map(|id| format!("added zone {id}")),
        ConsoleCommand::RemoveZone => draft.remove_zone().map(|z| format!("removed '{}'", z.name)),
        ConsoleCommand::SetMaster { zone, is_master } => draft
            .set_master_flag(zone, is_master)
            .then(|| format!("zone {zone} master = {is_master}")),
        ConsoleCommand::SetMasterZone { zone, master } => {
            draft.set_master_zone(zone, master).then(|| match master {
                Some(m) => format!("zone {zone} depends on {m}"),
                None => format!("zone {zone} has no master"),
            })
        }
        ConsoleCommand::SetEnabled { zone, enabled } => draft
            .set_enabled(zone, enabled)
            .then(|| format!("zone {zone} {}", if enabled { "enabled" } else { "disabled" })),
        ConsoleCommand::Rename { zone, name } => draft
            .rename(zone, &name)
            .then(|| format!("zone {zone} renamed")),
        _ => None,
    };
    let Some(message) = applied else {
        println!("edit refused");
        return;
    };

    match engine.install_config_if_idle(&draft.zones, draft.policy) {
        Ok(true) => {
            *config = draft;
            println!("{message}");
        }
        Ok(false) => println!("close all zones before editing the zone table"),
        Err(e) => println!("error: {e}"),
    }
}

fn print_status(engine: &ZoneEngine<MqttChannel>, store: &JsonFileStore, config: &ZoneConfig) {
    println!(
        "mqtt: {}   unsaved changes: {}",
        if engine.is_connected() { "connected" } else { "disconnected" },
        if store.has_unsaved_changes(config) { "yes" } else { "no" },
    );
    for zone in engine.snapshot() {
        println!(
            "  {}  {:<20} {:<3} {:<8} {}",
            zone.id,
            zone.name,
            if zone.active { "ON" } else { "off" },
            if zone.enabled { "" } else { "disabled" },
            describe_role(zone.is_master, zone.master),
        );
    }
    println!("  policies: {:?}", engine.policy());
}

// ── Helpers ───────────────────────────────────────────────────

/// Log the bus connection state every `period` until `stop` disconnects.
fn spawn_status_reporter(
    channel: MqttChannel,
    period: Duration,
    stop: Receiver<()>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("mqtt-status".into()).spawn(move || {
        while let Err(RecvTimeoutError::Timeout) = stop.recv_timeout(period) {
            let s = channel.settings();
            if channel.is_connected() {
                info!("MQTT status: connected to {}:{}", s.broker, s.port);
            } else {
                warn!("MQTT status: not connected to {}:{}", s.broker, s.port);
            }
        }
    })
}

fn load_or_default(store: &JsonFileStore) -> Result<ZoneConfig> {
    match store.load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using the default zone table", store.path().display());
            Ok(ZoneConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", store.path().display())),
    }
}

fn describe_role(is_master: bool, master: Option<u8>) -> String {
    match (is_master, master) {
        (true, _) => "master".into(),
        (false, Some(m)) => format!("depends on {m}"),
        (false, None) => String::new(),
    }
}

fn prompt() {
    print!("> ");
    if let Err(e) = io::stdout().flush() {
        warn!("Cannot flush console: {}", e);
    }
}
