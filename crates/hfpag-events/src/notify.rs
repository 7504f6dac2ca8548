use hfpag_core::{BdAddr, VolumeType};

/// Outbound notifications the machine hands to the service for system-wide
/// distribution (intent broadcasts in the host platform's terms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgNotification {
    /// A recognised vendor-specific SET command arrived from the peer
    VendorCommand {
        peer: BdAddr,
        command: String,
        company_id: i32,
        args: Vec<String>,
    },
    /// An HF indicator (+BIND registration or +BIEV update) changed.
    /// `value` is -1 for a bare registration.
    HfIndicator { peer: BdAddr, indicator_id: i32, value: i32 },
    /// The peer adjusted a volume via AT+VGS / AT+VGM
    VolumeChanged { peer: BdAddr, vol_type: VolumeType, volume: i32 },
}

/// Foreground activities the machine asks the service to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemActivity {
    /// The platform voice assistant, on remote VR activation
    VoiceCommand,
    /// A privileged outgoing call for the given dial string
    DialCall { number: String },
}
