use std::sync::Arc;
use std::time::Duration;

/// Protocol timers of the per-device machine. Production defaults follow
/// HFP practice; tests shrink them to keep runs fast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgTimers {
    /// Guard timer for Connecting/Disconnecting/AudioConnecting/AudioDisconnecting
    pub connect_timeout_ms: u64,
    /// Window for telephony to confirm an AT-initiated outgoing call
    pub dialing_out_timeout_ms: u64,
    /// Window for the local VR confirmation after a remote AT+BVRA=1
    pub start_vr_timeout_ms: u64,
    /// Window for telephony to stream +CLCC entries
    pub clcc_response_timeout_ms: u64,
}

impl Default for CfgTimers {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            dialing_out_timeout_ms: 10_000,
            start_vr_timeout_ms: 5_000,
            clcc_response_timeout_ms: 5_000,
        }
    }
}

impl CfgTimers {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
    pub fn dialing_out_timeout(&self) -> Duration {
        Duration::from_millis(self.dialing_out_timeout_ms)
    }
    pub fn start_vr_timeout(&self) -> Duration {
        Duration::from_millis(self.start_vr_timeout_ms)
    }
    pub fn clcc_response_timeout(&self) -> Duration {
        Duration::from_millis(self.clcc_response_timeout_ms)
    }
}

/// Complete AG stack configuration, immutable after construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgConfig {
    pub timers: CfgTimers,
    /// Optional verbose log file target
    pub debug_log: Option<String>,
}

impl AgConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        let t = &self.timers;
        if t.connect_timeout_ms == 0
            || t.dialing_out_timeout_ms == 0
            || t.start_vr_timeout_ms == 0
            || t.clcc_response_timeout_ms == 0
        {
            return Err("all protocol timers must be non-zero");
        }
        // The VR wake-lock is held for the full waiting window; a timer
        // above one minute would pin the device awake for that long.
        if t.start_vr_timeout_ms > 60_000 {
            return Err("start_vr_timeout_ms must not exceed 60000");
        }
        Ok(())
    }
}

/// Cheap-to-clone handle on the validated configuration
#[derive(Debug, Clone)]
pub struct SharedConfig {
    cfg: Arc<AgConfig>,
}

impl SharedConfig {
    pub fn from_config(cfg: AgConfig) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid AG configuration: {}", e),
        }

        Self { cfg: Arc::new(cfg) }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<AgConfig> {
        Arc::clone(&self.cfg)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::from_config(AgConfig::default())
    }
}
