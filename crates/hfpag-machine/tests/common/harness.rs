//! Infrastructure for driving one machine synchronously in tests.
//! Collaborator doubles record everything; helpers walk the machine into
//! commonly needed states.

use std::sync::Arc;

use hfpag_config::{AgConfig, SharedConfig};
use hfpag_core::{BdAddr, CallInfo, HfpCallState};
use hfpag_events::{AgMsg, HalAudioState, HalConnectionState, StackEvent, StackEventData};
use hfpag_machine::{AgState, Collaborators, PeerMachine};

use super::doubles::{FakePhonebook, FakeService, FakeSystem, RecordingNative};

pub const PEER: &str = "00:1B:DC:F2:AA:0B";

pub fn peer() -> BdAddr {
    PEER.parse().unwrap()
}

pub struct MachineTest {
    pub native: RecordingNative,
    pub system: FakeSystem,
    pub service: FakeService,
    pub phonebook: FakePhonebook,
    pub machine: PeerMachine,
}

impl MachineTest {
    pub fn new() -> Self {
        Self::with_config(AgConfig::default())
    }

    pub fn with_config(config: AgConfig) -> Self {
        hfpag_core::debug::setup_logging_verbose();
        let native = RecordingNative::default();
        let system = FakeSystem::default();
        let service = FakeService::default();
        let phonebook = FakePhonebook::default();
        let collab = Collaborators {
            native: Box::new(native.clone()),
            system: Box::new(system.clone()),
            service: Arc::new(service.clone()),
            phonebook: Box::new(phonebook.clone()),
        };
        let machine = PeerMachine::new(peer(), SharedConfig::from_config(config), collab);
        Self {
            native,
            system,
            service,
            phonebook,
            machine,
        }
    }

    pub fn send(&mut self, msg: AgMsg) {
        self.machine.dispatch(msg);
    }

    pub fn stack(&mut self, data: StackEventData) {
        self.machine.dispatch(AgMsg::Stack(StackEvent::new(peer(), data)));
    }

    pub fn connection_event(&mut self, state: HalConnectionState) {
        self.stack(StackEventData::ConnectionStateChanged(state));
    }

    pub fn audio_event(&mut self, state: HalAudioState) {
        self.stack(StackEventData::AudioStateChanged(state));
    }

    /// Clears everything the doubles recorded so far
    pub fn drain_records(&mut self) {
        self.native.take_calls();
        self.system.take_calls();
        self.service.take_events();
    }

    /// Outbound connect happy path up to the Connected state
    pub fn to_connected(&mut self) {
        self.send(AgMsg::Connect(peer()));
        self.connection_event(HalConnectionState::SlcConnected);
        assert_eq!(self.machine.state(), AgState::Connected);
    }

    /// Connected with SCO up; the peer is promoted to active device and
    /// given an active call so the audio path is acceptable
    pub fn to_audio_on(&mut self) {
        self.to_connected();
        self.service.set_policy(|policy| policy.active = Some(peer()));
        self.system.set_telephony(|telephony| {
            telephony.in_call = true;
            telephony.num_active = 1;
        });
        self.send(AgMsg::CallStateChanged {
            call: CallInfo::new(1, 0, HfpCallState::Idle),
            is_virtual: false,
        });
        self.send(AgMsg::ConnectAudio(peer()));
        assert_eq!(self.machine.state(), AgState::AudioConnecting);
        self.audio_event(HalAudioState::Connected);
        assert_eq!(self.machine.state(), AgState::AudioOn);
    }
}
