use clap::Parser;

use std::sync::Arc;
use std::time::Duration;

use hfpag_config::{toml_config, SharedConfig};
use hfpag_core::{debug, BdAddr};
use hfpag_events::{AgMsg, StackEvent, StackEventData};
use hfpag_machine::{Collaborators, MachineHandle};

mod sim;
use sim::{PeerScript, SimNative, SimPhonebook, SimService, SimSystem};

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "HFP Audio Gateway simulator",
    long_about = "Drives one per-device AG state machine against a scripted handsfree peer \
                  and prints every collaborator interaction"
)]
struct Args {
    /// Optional TOML config with timer overrides
    #[arg(help = "TOML config; defaults are used when omitted")]
    config: Option<String>,

    /// Simulated peer address
    #[arg(long, default_value = "00:1B:DC:F2:AA:0B")]
    peer: String,
}

/// Pumps scripted peer reactions into the machine until the script is idle
fn pump(handle: &MachineHandle, script: &PeerScript) {
    loop {
        std::thread::sleep(Duration::from_millis(20));
        match script.pop() {
            Some(msg) => {
                handle.send(msg);
            }
            None => break,
        }
    }
    std::thread::sleep(Duration::from_millis(20));
}

fn main() {
    eprintln!("hfpag-sim: HFP Audio Gateway control-plane simulator");
    eprintln!(" -> stack version {}\n", hfpag_core::STACK_VERSION);

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config_from_toml(path),
        None => SharedConfig::default(),
    };
    let _log_guard = debug::setup_logging_default(config.config().debug_log.clone());

    let peer: BdAddr = match args.peer.parse() {
        Ok(addr) => addr,
        Err(_) => {
            println!("Invalid peer address: {}", args.peer);
            std::process::exit(1);
        }
    };

    let script = PeerScript::default();
    let collab = Collaborators {
        native: Box::new(SimNative::new(script.clone())),
        system: Box::new(SimSystem),
        service: Arc::new(SimService::new(Some(peer))),
        phonebook: Box::new(SimPhonebook),
    };
    let handle = MachineHandle::spawn(peer, config, collab);

    tracing::info!("=== connect ===");
    handle.send(AgMsg::Connect(peer));
    pump(&handle, &script);

    tracing::info!("=== peer queries indicators ===");
    handle.send(AgMsg::Stack(StackEvent::new(peer, StackEventData::AtCind)));
    handle.send(AgMsg::Stack(StackEvent::new(peer, StackEventData::AtCops)));
    pump(&handle, &script);

    tracing::info!("=== virtual call brings up SCO ===");
    handle.send(AgMsg::VirtualCallStart(peer));
    pump(&handle, &script);

    tracing::info!("=== peer asks for the call list ===");
    handle.send(AgMsg::Stack(StackEvent::new(peer, StackEventData::AtClcc)));
    pump(&handle, &script);

    tracing::info!("=== virtual call ends, audio follows ===");
    handle.send(AgMsg::VirtualCallStop(peer));
    handle.send(AgMsg::DisconnectAudio(peer));
    pump(&handle, &script);

    tracing::info!("=== disconnect ===");
    handle.send(AgMsg::Disconnect(peer));
    pump(&handle, &script);

    println!("\n{}", handle.dump_string());
    handle.stop();
}
