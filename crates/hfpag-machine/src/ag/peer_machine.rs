use std::collections::VecDeque;
use std::time::Instant;

use hfpag_config::SharedConfig;
use hfpag_core::{AudioState, BdAddr, CallInfo, ConnectionState, HfpCallState};
use hfpag_events::{AgMsg, HalAudioState, HalConnectionState, StackEvent, StackEventData, TimerKind};

use crate::interfaces::Collaborators;
use crate::runtime::{MachineSnapshot, TimerSet};

/// Machine-internal states. The four audio states only exist while the
/// service level connection is up; they all map onto the public
/// `Connected` signalling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgState {
    Disconnected,
    Connecting,
    Disconnecting,
    Connected,
    AudioConnecting,
    AudioOn,
    AudioDisconnecting,
}

impl AgState {
    pub fn connection_state(self) -> ConnectionState {
        match self {
            AgState::Disconnected => ConnectionState::Disconnected,
            AgState::Connecting => ConnectionState::Connecting,
            AgState::Disconnecting => ConnectionState::Disconnecting,
            AgState::Connected | AgState::AudioConnecting | AgState::AudioOn | AgState::AudioDisconnecting => {
                ConnectionState::Connected
            }
        }
    }

    /// Public audio state. `AudioDisconnecting` still reports `Connected`;
    /// the broadcast logic compensates for the edge back to `AudioOn`.
    pub fn audio_state(self) -> AudioState {
        match self {
            AgState::AudioOn | AgState::AudioDisconnecting => AudioState::Connected,
            AgState::AudioConnecting => AudioState::Connecting,
            _ => AudioState::Disconnected,
        }
    }

    pub fn is_connected_group(self) -> bool {
        matches!(
            self,
            AgState::Connected | AgState::AudioConnecting | AgState::AudioOn | AgState::AudioDisconnecting
        )
    }

    /// States a transition into `self` may legally come from. The initial
    /// entry to `Disconnected` has no predecessor and is exempt.
    pub fn legal_predecessors(self) -> &'static [AgState] {
        use AgState::*;
        match self {
            Disconnected => &[Connecting, Disconnecting, Connected, AudioOn, AudioConnecting, AudioDisconnecting],
            Connecting => &[Disconnected],
            Disconnecting => &[Connected, AudioConnecting, AudioOn, AudioDisconnecting],
            Connected => &[Connecting, AudioConnecting, AudioOn, AudioDisconnecting, Disconnecting, Disconnected],
            AudioConnecting => &[Connected],
            AudioDisconnecting => &[AudioOn],
            AudioOn => &[AudioConnecting, AudioDisconnecting, Connected],
        }
    }
}

/// Result of a state handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

/// Audio configuration pushed to the audio subsystem when SCO comes up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioParams {
    pub name: String,
    pub nrec: bool,
    pub wbs: bool,
}

impl AudioParams {
    pub fn for_peer(peer: BdAddr) -> Self {
        Self {
            name: peer.to_string(),
            nrec: false,
            wbs: false,
        }
    }

    fn on_off(v: bool) -> &'static str {
        if v { "on" } else { "off" }
    }

    pub fn render(&self) -> String {
        format!(
            "bt_headset_name={};bt_headset_nrec={};bt_wbs={}",
            self.name,
            Self::on_off(self.nrec),
            Self::on_off(self.wbs)
        )
    }
}

/// One per remote device: the state machine driving the connection and
/// audio lifecycle of that peer and the AT dialog on top of it.
pub struct PeerMachine {
    pub(crate) config: SharedConfig,
    pub(crate) peer: BdAddr,
    pub(crate) state: AgState,
    pub(crate) prev_state: Option<AgState>,
    pending_transition: Option<AgState>,
    deferred: VecDeque<AgMsg>,
    /// Messages the machine sends to itself, delivered after the current
    /// message completes but before anything from the mailbox
    pub(crate) self_queue: VecDeque<AgMsg>,
    pub(crate) timers: TimerSet,
    pub(crate) connecting_since: Option<Instant>,
    /// Call picture as last delivered, including synthetic virtual-call
    /// updates. CIND answers use the live telephony snapshot instead.
    pub(crate) call_info: CallInfo,
    pub(crate) audio_params: AudioParams,
    pub(crate) speaker_volume: i32,
    pub(crate) mic_volume: i32,
    pub(crate) virtual_call_started: bool,
    pub(crate) voice_recognition_started: bool,
    pub(crate) waiting_for_voice_recognition: bool,
    pub(crate) dialing_out: bool,
    pub(crate) collab: Collaborators,
}

impl PeerMachine {
    pub fn new(peer: BdAddr, config: SharedConfig, collab: Collaborators) -> Self {
        let mut machine = Self {
            config,
            peer,
            state: AgState::Disconnected,
            prev_state: None,
            pending_transition: None,
            deferred: VecDeque::new(),
            self_queue: VecDeque::new(),
            timers: TimerSet::new(),
            connecting_since: None,
            call_info: CallInfo::idle(),
            audio_params: AudioParams::for_peer(peer),
            speaker_volume: 0,
            mic_volume: 0,
            virtual_call_started: false,
            voice_recognition_started: false,
            waiting_for_voice_recognition: false,
            dialing_out: false,
            collab,
        };
        // Initial entry to Disconnected; prev_state stays None
        machine.enter_state();
        machine
    }

    pub fn device(&self) -> BdAddr {
        self.peer
    }

    pub fn state(&self) -> AgState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection_state()
    }

    pub fn audio_state(&self) -> AudioState {
        self.state.audio_state()
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            peer: self.peer,
            state: self.state,
            prev_state: self.prev_state,
            connection_state: self.state.connection_state(),
            audio_state: self.state.audio_state(),
            connecting_since: self.connecting_since,
            speaker_volume: self.speaker_volume,
            mic_volume: self.mic_volume,
            virtual_call_started: self.virtual_call_started,
            voice_recognition_started: self.voice_recognition_started,
            waiting_for_voice_recognition: self.waiting_for_voice_recognition,
            dialing_out: self.dialing_out,
            armed_timers: self.timers.armed_kinds(),
        }
    }

    pub fn dump(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        self.snapshot().dump(w)
    }

    // ─── Runner support ──────────────────────────────────────────────

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn take_due_timers(&mut self, now: Instant) -> Vec<(TimerKind, BdAddr)> {
        self.timers.take_due(now)
    }

    pub fn timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// Expires an armed timer immediately, as the runner would on its
    /// deadline. Test support; a no-op when the timer is not armed.
    pub fn fire_timer(&mut self, kind: TimerKind) {
        if !self.timers.cancel(kind) {
            tracing::warn!("{}: fire_timer({:?}) without armed timer", self.peer, kind);
            return;
        }
        self.dispatch(AgMsg::Timeout { kind, peer: self.peer });
    }

    // ─── Dispatch ────────────────────────────────────────────────────

    /// Delivers one message, runs any requested transition to completion
    /// (including re-delivery of deferred messages) and then drains the
    /// machine's self-queue.
    pub fn dispatch(&mut self, msg: AgMsg) {
        self.dispatch_one(msg);
        while let Some(queued) = self.self_queue.pop_front() {
            self.dispatch_one(queued);
        }
    }

    fn dispatch_one(&mut self, msg: AgMsg) {
        // Events for a peer another machine owns are logged and dropped
        if let Some(peer) = msg.peer() {
            if peer != self.peer {
                tracing::warn!("{}: dropping {} for foreign peer {}", self.peer, msg.kind(), peer);
                return;
            }
        }
        tracing::trace!("{}: <- {} in {:?}", self.peer, msg, self.state);

        // NotHandled is informational; the base handler already logged it
        let _handled = match self.state {
            AgState::Disconnected => self.process_disconnected(msg),
            AgState::Connecting => self.process_connecting(msg),
            AgState::Disconnecting => self.process_disconnecting(msg),
            AgState::Connected => self.process_connected(msg),
            AgState::AudioConnecting => self.process_audio_connecting(msg),
            AgState::AudioOn => self.process_audio_on(msg),
            AgState::AudioDisconnecting => self.process_audio_disconnecting(msg),
        };

        if let Some(next) = self.pending_transition.take() {
            self.perform_transition(next);
            // Re-deliver deferred messages in their original order, ahead
            // of anything enqueued after the transition began
            let deferred: Vec<AgMsg> = self.deferred.drain(..).collect();
            for deferred_msg in deferred {
                self.dispatch_one(deferred_msg);
            }
        }
    }

    /// Requests a transition, honoured after the current handler returns
    pub(crate) fn transition_to(&mut self, next: AgState) {
        if let Some(pending) = self.pending_transition {
            tracing::warn!("{}: replacing pending transition to {:?} with {:?}", self.peer, pending, next);
        }
        self.pending_transition = Some(next);
    }

    fn perform_transition(&mut self, next: AgState) {
        tracing::debug!("{}: {:?} -> {:?}", self.peer, self.state, next);
        self.exit_state();
        let from = self.state;
        if !next.legal_predecessors().contains(&from) {
            // A transition outside the legal-edge table is a machine bug
            panic!("{}: illegal transition {:?} -> {:?}", self.peer, from, next);
        }
        self.prev_state = Some(from);
        self.state = next;
        self.enter_state();
    }

    pub(crate) fn defer(&mut self, msg: AgMsg) {
        tracing::debug!("{}: deferring {}", self.peer, msg);
        self.deferred.push_back(msg);
    }

    fn remove_deferred(&mut self, pred: impl Fn(&AgMsg) -> bool) {
        self.deferred.retain(|msg| !pred(msg));
    }

    pub(crate) fn send_to_self(&mut self, msg: AgMsg) {
        self.self_queue.push_back(msg);
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    // ─── Entry / exit actions ────────────────────────────────────────

    fn enter_state(&mut self) {
        match self.state {
            AgState::Disconnected => self.enter_disconnected(),
            AgState::Connecting => {
                self.connecting_since = Some(Instant::now());
                self.arm_connect_timeout();
            }
            AgState::Disconnecting => {
                if self.virtual_call_started {
                    self.terminate_virtual_voice_call();
                }
                self.arm_connect_timeout();
            }
            AgState::Connected => self.enter_connected(),
            AgState::AudioConnecting => self.arm_connect_timeout(),
            AgState::AudioOn => self.enter_audio_on(),
            AgState::AudioDisconnecting => self.arm_connect_timeout(),
        }

        self.broadcast_state_transitions();

        // Teardown runs last so listeners observe the final state first
        if self.state == AgState::Disconnected && self.prev_state.is_some() {
            let bonded = self.collab.service.is_bonded(self.peer);
            if !bonded {
                tracing::info!("{}: no longer bonded, requesting machine teardown", self.peer);
                self.collab.service.remove_machine(self.peer);
            }
        }
    }

    fn exit_state(&mut self) {
        match self.state {
            AgState::Connecting
            | AgState::Disconnecting
            | AgState::AudioConnecting
            | AgState::AudioDisconnecting => {
                self.timers.cancel(TimerKind::ConnectTimeout);
            }
            AgState::AudioOn => {
                self.collab.system.set_bluetooth_sco_on(false);
            }
            AgState::Disconnected | AgState::Connected => {}
        }
    }

    fn arm_connect_timeout(&mut self) {
        let timeout = self.config.config().timers.connect_timeout();
        self.timers.arm(TimerKind::ConnectTimeout, self.peer, timeout);
    }

    fn enter_disconnected(&mut self) {
        self.connecting_since = None;
        self.collab.phonebook.reset();
        self.collab.system.listen_for_phone_state(self.peer, false);
        if self.virtual_call_started {
            // Forwarding is suppressed in Disconnected; this just clears
            // the synthetic call picture
            self.terminate_virtual_voice_call();
        }
        if self.waiting_for_voice_recognition {
            self.collab.system.release_vr_wake_lock();
        }
        self.voice_recognition_started = false;
        self.waiting_for_voice_recognition = false;
        self.dialing_out = false;
        self.audio_params = AudioParams::for_peer(self.peer);
        self.timers.clear();
    }

    fn enter_connected(&mut self) {
        if self.connecting_since.is_none() {
            self.connecting_since = Some(Instant::now());
        }
        if self.prev_state == Some(AgState::Connecting) {
            self.collab.system.listen_for_phone_state(self.peer, true);
            // Initial NREC configuration; the headset overrides via AT+NREC
            self.audio_params.nrec = false;
            // Query telephony so the next CIND answer is current
            self.collab.system.query_phone_state();
            // Drop stale auto-connect attempts deferred while connecting
            self.remove_deferred(|msg| matches!(msg, AgMsg::Connect(_)));
        }
    }

    fn enter_audio_on(&mut self) {
        self.remove_deferred(|msg| matches!(msg, AgMsg::ConnectAudio(_)));
        let active = self.collab.service.active_device();
        if active != Some(self.peer) {
            if !self.collab.service.set_active_device(Some(self.peer)) {
                tracing::warn!("{}: failed to become the active device", self.peer);
            }
        }
        let params = self.audio_params.render();
        self.collab.system.set_audio_parameters(&params);
        self.collab.system.set_bluetooth_sco_on(true);
    }

    // ─── Broadcasts ──────────────────────────────────────────────────

    /// Emits the audio and connection deltas of the transition that just
    /// completed, audio first so listeners see audio teardown before
    /// connection teardown. Nothing is emitted without a real delta.
    fn broadcast_state_transitions(&mut self) {
        let Some(prev) = self.prev_state else {
            return;
        };
        let prev_audio = prev.audio_state();
        let next_audio = self.state.audio_state();
        // AudioDisconnecting maps onto AUDIO_CONNECTED, so the edge back
        // to AudioOn compares equal; it is still reported as a change
        let audio_changed = prev_audio != next_audio
            || (prev == AgState::AudioDisconnecting && self.state == AgState::AudioOn);
        if audio_changed {
            self.collab.service.on_audio_state_changed(self.peer, prev_audio, next_audio);
        }
        let prev_conn = prev.connection_state();
        let next_conn = self.state.connection_state();
        if prev_conn != next_conn {
            self.collab.service.on_connection_state_changed(self.peer, prev_conn, next_conn);
        }
    }

    /// X -> X connection broadcast after a refused native call, so
    /// observers can retry
    pub(crate) fn broadcast_identity_connection_state(&mut self) {
        let current = self.state.connection_state();
        self.collab.service.on_connection_state_changed(self.peer, current, current);
    }

    pub(crate) fn broadcast_identity_audio_state(&mut self) {
        let current = self.state.audio_state();
        self.collab.service.on_audio_state_changed(self.peer, current, current);
    }

    // ─── Call picture helpers ────────────────────────────────────────

    /// Whether the machine considers a call in progress, including the
    /// synthetic picture of a virtual call
    pub(crate) fn machine_in_call(&self) -> bool {
        self.call_info.num_active > 0 || self.call_info.state != HfpCallState::Idle
    }

    pub(crate) fn machine_ringing(&self) -> bool {
        self.call_info.state == HfpCallState::Incoming
    }

    /// SCO is acceptable iff forced, or this peer is the active device,
    /// routing is allowed and something audible is going on
    pub(crate) fn is_sco_acceptable(&self) -> bool {
        let service = &self.collab.service;
        if service.force_sco_audio() {
            return true;
        }
        if service.active_device() != Some(self.peer) {
            tracing::warn!("{}: SCO not acceptable, not the active device", self.peer);
            return false;
        }
        if !service.audio_route_allowed() {
            tracing::warn!("{}: SCO not acceptable, audio route disallowed", self.peer);
            return false;
        }
        if self.machine_in_call() || self.voice_recognition_started || self.waiting_for_voice_recognition {
            return true;
        }
        if self.machine_ringing() && service.in_band_ringing_enabled() {
            return true;
        }
        tracing::warn!("{}: SCO not acceptable, no call, no VR, no in-band ring", self.peer);
        false
    }

    // ─── State handlers ──────────────────────────────────────────────

    fn process_disconnected(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(peer) => {
                tracing::debug!("{}: connecting", peer);
                if self.collab.native.connect_hfp(peer) {
                    self.transition_to(AgState::Connecting);
                } else {
                    tracing::error!("{}: native connect failed", peer);
                    self.broadcast_identity_connection_state();
                }
                Handled::Yes
            }
            AgMsg::Disconnect(_) | AgMsg::CallStateChanged { .. } | AgMsg::DeviceStateChanged(_) => {
                tracing::debug!("{}: {} ignored while disconnected", self.peer, msg.kind());
                Handled::Yes
            }
            AgMsg::Stack(event) => self.process_disconnected_stack(event),
            other => self.process_base(other),
        }
    }

    fn process_disconnected_stack(&mut self, event: StackEvent) -> Handled {
        match event.data {
            StackEventData::ConnectionStateChanged(
                HalConnectionState::Connected | HalConnectionState::Connecting,
            ) => {
                if self.collab.service.ok_to_accept_connection(event.peer) {
                    self.transition_to(AgState::Connecting);
                } else {
                    tracing::warn!("{}: inbound connection rejected", event.peer);
                    self.collab.native.disconnect_hfp(event.peer);
                    self.broadcast_identity_connection_state();
                }
                Handled::Yes
            }
            StackEventData::ConnectionStateChanged(
                HalConnectionState::Disconnected | HalConnectionState::Disconnecting,
            ) => {
                tracing::debug!("{}: ignoring teardown event while disconnected", self.peer);
                Handled::Yes
            }
            data => {
                tracing::warn!("{}: unexpected stack event while disconnected: {:?}", self.peer, data);
                Handled::Yes
            }
        }
    }

    fn process_connecting(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(_)
            | AgMsg::Disconnect(_)
            | AgMsg::ConnectAudio(_)
            | AgMsg::CallStateChanged { .. }
            | AgMsg::DeviceStateChanged(_) => {
                self.defer(msg);
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::ConnectTimeout, .. } => {
                tracing::warn!("{}: timed out establishing the service level connection", self.peer);
                self.transition_to(AgState::Disconnected);
                Handled::Yes
            }
            AgMsg::Stack(event) => self.process_connecting_stack(event),
            other => self.process_base(other),
        }
    }

    fn process_connecting_stack(&mut self, event: StackEvent) -> Handled {
        match event.data {
            StackEventData::ConnectionStateChanged(state) => {
                match state {
                    HalConnectionState::SlcConnected => self.transition_to(AgState::Connected),
                    HalConnectionState::Disconnected => self.transition_to(AgState::Disconnected),
                    HalConnectionState::Connected => {
                        tracing::debug!("{}: RFCOMM up, negotiating SLC", self.peer);
                    }
                    HalConnectionState::Connecting => {}
                    HalConnectionState::Disconnecting => {
                        tracing::warn!("{}: disconnecting during SLC setup", self.peer);
                        self.transition_to(AgState::Disconnected);
                    }
                }
                Handled::Yes
            }
            // The SLC negotiation requires answers to these before the
            // machine reaches Connected
            StackEventData::AtCind => {
                self.process_at_cind();
                Handled::Yes
            }
            StackEventData::AtChld { op } => {
                self.process_at_chld(op);
                Handled::Yes
            }
            StackEventData::AtBind { id_list } => {
                self.process_at_bind(&id_list);
                Handled::Yes
            }
            StackEventData::Wbs { enabled } => {
                self.process_wbs(enabled);
                Handled::Yes
            }
            // Anything else is early, but answered for interoperability
            data => {
                tracing::warn!("{}: early stack event during SLC setup: {:?}", self.peer, data);
                self.process_connected_stack_base(StackEvent::new(event.peer, data))
            }
        }
    }

    fn process_disconnecting(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(_)
            | AgMsg::Disconnect(_)
            | AgMsg::ConnectAudio(_)
            | AgMsg::CallStateChanged { .. }
            | AgMsg::DeviceStateChanged(_) => {
                self.defer(msg);
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::ConnectTimeout, .. } => {
                tracing::warn!("{}: timed out disconnecting, assuming down", self.peer);
                self.transition_to(AgState::Disconnected);
                Handled::Yes
            }
            AgMsg::Stack(event) => match event.data {
                StackEventData::ConnectionStateChanged(HalConnectionState::Disconnected) => {
                    self.transition_to(AgState::Disconnected);
                    Handled::Yes
                }
                StackEventData::ConnectionStateChanged(HalConnectionState::SlcConnected) => {
                    // Disconnect raced with an SLC that completed anyway
                    tracing::warn!("{}: SLC came up while disconnecting", self.peer);
                    self.transition_to(AgState::Connected);
                    Handled::Yes
                }
                data => {
                    tracing::debug!("{}: ignoring stack event while disconnecting: {:?}", self.peer, data);
                    Handled::Yes
                }
            },
            other => self.process_base(other),
        }
    }

    fn process_connected(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(peer) => {
                tracing::warn!("{}: CONNECT ignored, already connected", peer);
                Handled::Yes
            }
            AgMsg::Disconnect(peer) => {
                tracing::debug!("{}: disconnecting", peer);
                if self.collab.native.disconnect_hfp(peer) {
                    self.transition_to(AgState::Disconnecting);
                } else {
                    tracing::error!("{}: native disconnect failed", peer);
                    self.broadcast_identity_connection_state();
                }
                Handled::Yes
            }
            AgMsg::ConnectAudio(peer) => {
                if !self.is_sco_acceptable() {
                    tracing::warn!("{}: CONNECT_AUDIO rejected", peer);
                    return Handled::Yes;
                }
                if self.collab.native.connect_audio(peer) {
                    self.transition_to(AgState::AudioConnecting);
                } else {
                    tracing::error!("{}: native connect_audio failed", peer);
                    self.broadcast_identity_audio_state();
                }
                Handled::Yes
            }
            AgMsg::DisconnectAudio(peer) => {
                tracing::debug!("{}: DISCONNECT_AUDIO ignored, no audio", peer);
                Handled::Yes
            }
            AgMsg::Stack(event) => match event.data {
                StackEventData::AudioStateChanged(state) => {
                    self.process_connected_audio_event(state);
                    Handled::Yes
                }
                data => self.process_connected_stack_base(StackEvent::new(event.peer, data)),
            },
            other => self.process_connected_base(other),
        }
    }

    fn process_connected_audio_event(&mut self, state: HalAudioState) {
        match state {
            HalAudioState::Connected => {
                if self.is_sco_acceptable() {
                    self.transition_to(AgState::AudioOn);
                } else {
                    tracing::warn!("{}: unsolicited SCO rejected", self.peer);
                    self.collab.native.disconnect_audio(self.peer);
                }
            }
            HalAudioState::Connecting => {
                if self.is_sco_acceptable() {
                    self.transition_to(AgState::AudioConnecting);
                } else {
                    tracing::warn!("{}: remote SCO setup not acceptable", self.peer);
                }
            }
            HalAudioState::Disconnected | HalAudioState::Disconnecting => {
                tracing::debug!("{}: audio already down", self.peer);
            }
        }
    }

    fn process_audio_connecting(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(_) | AgMsg::Disconnect(_) | AgMsg::ConnectAudio(_) | AgMsg::DisconnectAudio(_) => {
                self.defer(msg);
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::ConnectTimeout, .. } => {
                tracing::warn!("{}: timed out establishing SCO", self.peer);
                self.transition_to(AgState::Connected);
                Handled::Yes
            }
            AgMsg::Stack(event) => match event.data {
                StackEventData::AudioStateChanged(state) => {
                    match state {
                        HalAudioState::Connected => self.transition_to(AgState::AudioOn),
                        HalAudioState::Disconnected => {
                            tracing::warn!("{}: SCO setup failed", self.peer);
                            self.transition_to(AgState::Connected);
                        }
                        HalAudioState::Connecting => {}
                        HalAudioState::Disconnecting => {
                            tracing::warn!("{}: SCO tearing down while connecting", self.peer);
                        }
                    }
                    Handled::Yes
                }
                data => self.process_connected_stack_base(StackEvent::new(event.peer, data)),
            },
            other => self.process_connected_base(other),
        }
    }

    fn process_audio_on(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(peer) => {
                tracing::warn!("{}: CONNECT ignored, already connected", peer);
                Handled::Yes
            }
            AgMsg::Disconnect(peer) => {
                // Tear SCO down first, then replay the disconnect
                self.collab.native.disconnect_audio(peer);
                self.defer(AgMsg::Disconnect(peer));
                self.transition_to(AgState::AudioDisconnecting);
                Handled::Yes
            }
            AgMsg::ConnectAudio(peer) => {
                tracing::warn!("{}: CONNECT_AUDIO ignored, audio already on", peer);
                Handled::Yes
            }
            AgMsg::DisconnectAudio(peer) => {
                if self.collab.native.disconnect_audio(peer) {
                    self.transition_to(AgState::AudioDisconnecting);
                } else {
                    tracing::error!("{}: native disconnect_audio failed", peer);
                    self.broadcast_identity_audio_state();
                }
                Handled::Yes
            }
            AgMsg::ScoVolumeChanged { volume, .. } => {
                if volume != self.speaker_volume {
                    self.speaker_volume = volume;
                    self.collab
                        .native
                        .set_volume(self.peer, hfpag_core::VolumeType::Speaker, volume);
                }
                Handled::Yes
            }
            AgMsg::Stack(event) => match event.data {
                StackEventData::AudioStateChanged(state) => {
                    match state {
                        HalAudioState::Disconnected => {
                            if self.virtual_call_started {
                                self.terminate_virtual_voice_call();
                            }
                            self.transition_to(AgState::Connected);
                        }
                        HalAudioState::Disconnecting => self.transition_to(AgState::AudioDisconnecting),
                        HalAudioState::Connected => {}
                        HalAudioState::Connecting => {
                            tracing::warn!("{}: unexpected SCO connecting while on", self.peer);
                        }
                    }
                    Handled::Yes
                }
                StackEventData::Wbs { .. } => {
                    // Codec cannot change while SCO is up
                    tracing::error!("{}: WBS change rejected during audio connection", self.peer);
                    Handled::Yes
                }
                data => self.process_connected_stack_base(StackEvent::new(event.peer, data)),
            },
            other => self.process_connected_base(other),
        }
    }

    fn process_audio_disconnecting(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(_) | AgMsg::Disconnect(_) | AgMsg::ConnectAudio(_) | AgMsg::DisconnectAudio(_) => {
                self.defer(msg);
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::ConnectTimeout, .. } => {
                tracing::warn!("{}: timed out disconnecting SCO, assuming down", self.peer);
                self.transition_to(AgState::Connected);
                Handled::Yes
            }
            AgMsg::Stack(event) => match event.data {
                StackEventData::AudioStateChanged(state) => {
                    match state {
                        HalAudioState::Disconnected => self.transition_to(AgState::Connected),
                        HalAudioState::Connected => {
                            tracing::warn!("{}: SCO disconnection failed", self.peer);
                            self.transition_to(AgState::AudioOn);
                        }
                        HalAudioState::Disconnecting | HalAudioState::Connecting => {}
                    }
                    Handled::Yes
                }
                data => self.process_connected_stack_base(StackEvent::new(event.peer, data)),
            },
            other => self.process_connected_base(other),
        }
    }

    /// Shared handler of the Connected group. Lifecycle messages must be
    /// consumed by the concrete states; reaching them here is a bug.
    fn process_connected_base(&mut self, msg: AgMsg) -> Handled {
        match msg {
            AgMsg::Connect(_)
            | AgMsg::Disconnect(_)
            | AgMsg::ConnectAudio(_)
            | AgMsg::DisconnectAudio(_)
            | AgMsg::Timeout { kind: TimerKind::ConnectTimeout, .. } => {
                panic!("{}: {} reached the connected base handler in {:?}", self.peer, msg.kind(), self.state);
            }
            AgMsg::CallStateChanged { call, is_virtual } => {
                self.process_call_state(call, is_virtual);
                Handled::Yes
            }
            AgMsg::DeviceStateChanged(state) => {
                tracing::debug!("-> device status {:?}", state);
                self.collab.native.notify_device_status(self.peer, &state);
                Handled::Yes
            }
            AgMsg::VirtualCallStart(_) => {
                if !self.initiate_virtual_voice_call() {
                    tracing::warn!("{}: virtual call start refused", self.peer);
                }
                Handled::Yes
            }
            AgMsg::VirtualCallStop(_) => {
                if !self.terminate_virtual_voice_call() {
                    tracing::debug!("{}: no virtual call to stop", self.peer);
                }
                Handled::Yes
            }
            AgMsg::VoiceRecognitionStart(_) => {
                self.process_local_vr_started();
                Handled::Yes
            }
            AgMsg::VoiceRecognitionStop(_) => {
                self.process_local_vr_stopped();
                Handled::Yes
            }
            AgMsg::SendClccResponse(entry) => {
                self.process_send_clcc_response(&entry);
                Handled::Yes
            }
            AgMsg::SendVendorResult { command, arg } => {
                self.process_send_vendor_result(&command, arg.as_deref());
                Handled::Yes
            }
            AgMsg::SendBsir { in_band } => {
                tracing::debug!("-> BSIR {}", in_band);
                self.collab.native.send_bsir(self.peer, in_band);
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::DialingOutTimeout, .. } => {
                self.process_dialing_out_timeout();
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::StartVrTimeout, .. } => {
                self.process_start_vr_timeout();
                Handled::Yes
            }
            AgMsg::Timeout { kind: TimerKind::ClccRspTimeout, .. } => {
                self.process_clcc_timeout();
                Handled::Yes
            }
            AgMsg::Stack(event) => self.process_connected_stack_base(event),
            other => self.process_base(other),
        }
    }

    /// Stack events every Connected-group state treats identically
    fn process_connected_stack_base(&mut self, event: StackEvent) -> Handled {
        match event.data {
            StackEventData::ConnectionStateChanged(state) => {
                match state {
                    HalConnectionState::Disconnecting => self.transition_to(AgState::Disconnecting),
                    HalConnectionState::Disconnected => self.transition_to(AgState::Disconnected),
                    HalConnectionState::Connected | HalConnectionState::SlcConnected | HalConnectionState::Connecting => {
                        tracing::warn!("{}: ignoring connection event {:?} while connected", self.peer, state);
                    }
                }
                Handled::Yes
            }
            StackEventData::AudioStateChanged(state) => {
                tracing::warn!("{}: unhandled audio event {:?} in {:?}", self.peer, state, self.state);
                Handled::Yes
            }
            StackEventData::VrStateChanged(state) => {
                self.process_remote_vr(state);
                Handled::Yes
            }
            StackEventData::AnswerCall => {
                tracing::debug!("<- ATA");
                self.collab.system.answer_call(self.peer);
                Handled::Yes
            }
            StackEventData::HangupCall => {
                self.process_hangup_call();
                Handled::Yes
            }
            StackEventData::VolumeChanged { vol_type, volume } => {
                self.process_volume_event(vol_type, volume);
                Handled::Yes
            }
            StackEventData::DialCall { number } => {
                self.process_dial_call(&number);
                Handled::Yes
            }
            StackEventData::SendDtmf { code } => {
                self.collab.system.send_dtmf(self.peer, code);
                Handled::Yes
            }
            StackEventData::NoiseReduction { enabled } => {
                tracing::debug!("<- NREC {}", enabled);
                self.audio_params.nrec = enabled;
                Handled::Yes
            }
            StackEventData::Wbs { enabled } => {
                self.process_wbs(enabled);
                Handled::Yes
            }
            StackEventData::AtChld { op } => {
                self.process_at_chld(op);
                Handled::Yes
            }
            StackEventData::SubscriberNumberRequest => {
                self.process_subscriber_number_request();
                Handled::Yes
            }
            StackEventData::AtCind => {
                self.process_at_cind();
                Handled::Yes
            }
            StackEventData::AtCops => {
                self.process_at_cops();
                Handled::Yes
            }
            StackEventData::AtClcc => {
                self.process_at_clcc();
                Handled::Yes
            }
            StackEventData::UnknownAt { at_string } => {
                self.process_unknown_at(&at_string);
                Handled::Yes
            }
            StackEventData::KeyPressed => {
                self.process_key_pressed();
                Handled::Yes
            }
            StackEventData::AtBind { id_list } => {
                self.process_at_bind(&id_list);
                Handled::Yes
            }
            StackEventData::AtBiev { indicator, value } => {
                self.process_at_biev(indicator, value);
                Handled::Yes
            }
        }
    }

    /// Fallback for messages no state claims; logged, never fatal
    fn process_base(&mut self, msg: AgMsg) -> Handled {
        tracing::warn!("{}: {} not handled in {:?}", self.peer, msg, self.state);
        Handled::No
    }
}
