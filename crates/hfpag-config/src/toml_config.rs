use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::ag_config::{AgConfig, CfgTimers, SharedConfig};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.4";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref timers) = root.timers {
        if !timers.extra.is_empty() {
            return Err(format!("Unrecognized fields: timers::{:?}", sorted_keys(&timers.extra)).into());
        }
    }

    // Build config from required and optional values
    let mut cfg = AgConfig {
        timers: CfgTimers::default(),
        debug_log: root.debug_log,
    };

    if let Some(timers) = root.timers {
        apply_timers_patch(&mut cfg.timers, timers);
    }

    if let Err(e) = cfg.validate() {
        return Err(format!("Invalid AG configuration: {}", e).into());
    }

    Ok(SharedConfig::from_config(cfg))
}

/// Build `SharedConfig` from a TOML file on disk
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

fn apply_timers_patch(timers: &mut CfgTimers, dto: CfgTimersDto) {
    if let Some(v) = dto.connect_timeout_ms {
        timers.connect_timeout_ms = v;
    }
    if let Some(v) = dto.dialing_out_timeout_ms {
        timers.dialing_out_timeout_ms = v;
    }
    if let Some(v) = dto.start_vr_timeout_ms {
        timers.start_vr_timeout_ms = v;
    }
    if let Some(v) = dto.clcc_response_timeout_ms {
        timers.clcc_response_timeout_ms = v;
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

#[derive(Debug, Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,
    timers: Option<CfgTimersDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CfgTimersDto {
    connect_timeout_ms: Option<u64>,
    dialing_out_timeout_ms: Option<u64>,
    start_vr_timeout_ms: Option<u64>,
    clcc_response_timeout_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
