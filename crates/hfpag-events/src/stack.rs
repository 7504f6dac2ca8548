use core::fmt;

use hfpag_core::{BdAddr, VolumeType};

/// Connection states as reported by the native HFP stack. `Connected`
/// means the RFCOMM link is up; `SlcConnected` means the service level
/// connection negotiation has completed as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalConnectionState {
    Disconnected,
    Connecting,
    Connected,
    SlcConnected,
    Disconnecting,
}

/// SCO states as reported by the native HFP stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalAudioState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Voice recognition state as signalled by the peer via AT+BVRA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrState {
    Stopped,
    Started,
}

/// Result code for a pending AT command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtResponse {
    Ok,
    Error,
}

/// One up-call from the native HFP stack, always tagged with the peer that
/// caused it. Events for a peer another machine owns are dropped by that
/// machine's dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    pub peer: BdAddr,
    pub data: StackEventData,
}

impl StackEvent {
    pub fn new(peer: BdAddr, data: StackEventData) -> Self {
        Self { peer, data }
    }
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StackEvent({}, {:?})", self.peer, self.data)
    }
}

/// Typed payloads of the native stack up-calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEventData {
    ConnectionStateChanged(HalConnectionState),
    AudioStateChanged(HalAudioState),
    VrStateChanged(VrState),
    AnswerCall,
    HangupCall,
    VolumeChanged { vol_type: VolumeType, volume: i32 },
    DialCall { number: String },
    SendDtmf { code: u8 },
    NoiseReduction { enabled: bool },
    Wbs { enabled: bool },
    AtChld { op: i32 },
    SubscriberNumberRequest,
    AtCind,
    AtCops,
    AtClcc,
    UnknownAt { at_string: String },
    KeyPressed,
    AtBind { id_list: String },
    AtBiev { indicator: i32, value: i32 },
}
