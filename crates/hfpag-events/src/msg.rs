use core::fmt;

use hfpag_core::{BdAddr, CallInfo, DeviceState};

use crate::stack::StackEvent;

/// Timer message kinds. Each kind has exactly one owning state or
/// sub-protocol; at most one instance is armed per machine at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    ConnectTimeout,
    DialingOutTimeout,
    StartVrTimeout,
    ClccRspTimeout,
}

/// One entry of a +CLCC current-calls listing streamed by telephony.
/// `index == 0` is the list terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClccEntry {
    pub index: i32,
    /// 0 outgoing, 1 incoming
    pub direction: i32,
    pub status: i32,
    /// 0 voice, 1 data, 2 fax
    pub mode: i32,
    pub mpty: bool,
    pub number: String,
    pub number_type: i32,
}

impl ClccEntry {
    pub fn terminator() -> Self {
        Self {
            index: 0,
            direction: 0,
            status: 0,
            mode: 0,
            mpty: false,
            number: String::new(),
            number_type: 0,
        }
    }
}

/// Every stimulus a per-device state machine can receive, in normalised
/// form. Messages are delivered FIFO and handled to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgMsg {
    // User requests, entering through the service API
    Connect(BdAddr),
    Disconnect(BdAddr),
    ConnectAudio(BdAddr),
    DisconnectAudio(BdAddr),
    VoiceRecognitionStart(BdAddr),
    VoiceRecognitionStop(BdAddr),
    VirtualCallStart(BdAddr),
    VirtualCallStop(BdAddr),

    // System events from telephony and audio routing
    CallStateChanged { call: CallInfo, is_virtual: bool },
    DeviceStateChanged(DeviceState),
    ScoVolumeChanged { peer: BdAddr, volume: i32 },
    ConnectionAccessReply { peer: BdAddr, allowed: bool },
    SendClccResponse(ClccEntry),
    SendVendorResult { command: String, arg: Option<String> },
    SendBsir { in_band: bool },

    // Native stack up-call
    Stack(StackEvent),

    // Timer expirations, injected by the machine runner
    Timeout { kind: TimerKind, peer: BdAddr },
}

impl AgMsg {
    /// The peer a message names, if any. Dispatch drops messages whose
    /// peer does not match the owning machine.
    pub fn peer(&self) -> Option<BdAddr> {
        match self {
            AgMsg::Connect(peer)
            | AgMsg::Disconnect(peer)
            | AgMsg::ConnectAudio(peer)
            | AgMsg::DisconnectAudio(peer)
            | AgMsg::VoiceRecognitionStart(peer)
            | AgMsg::VoiceRecognitionStop(peer)
            | AgMsg::VirtualCallStart(peer)
            | AgMsg::VirtualCallStop(peer)
            | AgMsg::ScoVolumeChanged { peer, .. }
            | AgMsg::ConnectionAccessReply { peer, .. }
            | AgMsg::Timeout { peer, .. } => Some(*peer),
            AgMsg::Stack(event) => Some(event.peer),
            AgMsg::CallStateChanged { .. }
            | AgMsg::DeviceStateChanged(_)
            | AgMsg::SendClccResponse(_)
            | AgMsg::SendVendorResult { .. }
            | AgMsg::SendBsir { .. } => None,
        }
    }

    /// Short kind name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            AgMsg::Connect(_) => "Connect",
            AgMsg::Disconnect(_) => "Disconnect",
            AgMsg::ConnectAudio(_) => "ConnectAudio",
            AgMsg::DisconnectAudio(_) => "DisconnectAudio",
            AgMsg::VoiceRecognitionStart(_) => "VoiceRecognitionStart",
            AgMsg::VoiceRecognitionStop(_) => "VoiceRecognitionStop",
            AgMsg::VirtualCallStart(_) => "VirtualCallStart",
            AgMsg::VirtualCallStop(_) => "VirtualCallStop",
            AgMsg::CallStateChanged { .. } => "CallStateChanged",
            AgMsg::DeviceStateChanged(_) => "DeviceStateChanged",
            AgMsg::ScoVolumeChanged { .. } => "ScoVolumeChanged",
            AgMsg::ConnectionAccessReply { .. } => "ConnectionAccessReply",
            AgMsg::SendClccResponse(_) => "SendClccResponse",
            AgMsg::SendVendorResult { .. } => "SendVendorResult",
            AgMsg::SendBsir { .. } => "SendBsir",
            AgMsg::Stack(_) => "StackEvent",
            AgMsg::Timeout { .. } => "Timeout",
        }
    }
}

impl fmt::Display for AgMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer() {
            Some(peer) => write!(f, "{}({})", self.kind(), peer),
            None => write!(f, "{}", self.kind()),
        }
    }
}
