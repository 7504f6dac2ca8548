//! Scripted collaborator endpoints for the simulator: a native stack that
//! answers like a well-behaved headset, a canned telephony snapshot and a
//! service that narrates every broadcast.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hfpag_at::AtCommandType;
use hfpag_core::{AudioState, BdAddr, CallInfo, ConnectionState, DeviceState, HfpCallState, VolumeType};
use hfpag_events::{
    AgMsg, AgNotification, AtResponse, ClccEntry, HalAudioState, HalConnectionState, StackEvent, StackEventData,
    SystemActivity,
};
use hfpag_machine::{AgService, NativeInterface, PhonebookInterface, SystemInterface};

/// Stack events the simulated peer wants delivered to the machine. The
/// main loop pumps these into the machine's mailbox.
#[derive(Clone, Default)]
pub struct PeerScript {
    queue: Arc<Mutex<VecDeque<AgMsg>>>,
}

impl PeerScript {
    pub fn pop(&self) -> Option<AgMsg> {
        self.queue.lock().unwrap().pop_front()
    }

    fn push_stack(&self, peer: BdAddr, data: StackEventData) {
        self.queue
            .lock()
            .unwrap()
            .push_back(AgMsg::Stack(StackEvent::new(peer, data)));
    }
}

/// Native stack double that reacts the way a headset would
pub struct SimNative {
    script: PeerScript,
}

impl SimNative {
    pub fn new(script: PeerScript) -> Self {
        Self { script }
    }
}

impl NativeInterface for SimNative {
    fn connect_hfp(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] connect_hfp {}", peer);
        self.script
            .push_stack(peer, StackEventData::ConnectionStateChanged(HalConnectionState::Connected));
        self.script
            .push_stack(peer, StackEventData::ConnectionStateChanged(HalConnectionState::SlcConnected));
        true
    }
    fn disconnect_hfp(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] disconnect_hfp {}", peer);
        self.script
            .push_stack(peer, StackEventData::ConnectionStateChanged(HalConnectionState::Disconnected));
        true
    }
    fn connect_audio(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] connect_audio {}", peer);
        self.script
            .push_stack(peer, StackEventData::AudioStateChanged(HalAudioState::Connected));
        true
    }
    fn disconnect_audio(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] disconnect_audio {}", peer);
        self.script
            .push_stack(peer, StackEventData::AudioStateChanged(HalAudioState::Disconnected));
        true
    }
    fn set_volume(&mut self, peer: BdAddr, vol_type: VolumeType, volume: i32) -> bool {
        tracing::info!("[native] set_volume {} {:?}={}", peer, vol_type, volume);
        true
    }
    fn at_response_code(&mut self, peer: BdAddr, code: AtResponse, error_code: i32) -> bool {
        tracing::info!("[native] -> {} {:?} ({})", peer, code, error_code);
        true
    }
    fn at_response_string(&mut self, peer: BdAddr, response: &str) -> bool {
        tracing::info!("[native] -> {} {}", peer, response);
        true
    }
    fn cind_response(
        &mut self,
        peer: BdAddr,
        service: i32,
        call: i32,
        callsetup: i32,
        callheld: i32,
        signal: i32,
        roam: i32,
        battery: i32,
    ) -> bool {
        tracing::info!(
            "[native] -> {} +CIND: {},{},{},{},{},{},{}",
            peer,
            service,
            call,
            callsetup,
            callheld,
            signal,
            roam,
            battery
        );
        true
    }
    fn clcc_response(&mut self, peer: BdAddr, entry: &ClccEntry) -> bool {
        tracing::info!("[native] -> {} +CLCC: {:?}", peer, entry);
        true
    }
    fn cops_response(&mut self, peer: BdAddr, operator: &str) -> bool {
        tracing::info!("[native] -> {} +COPS: \"{}\"", peer, operator);
        true
    }
    fn phone_state_change(&mut self, peer: BdAddr, call: &CallInfo) -> bool {
        tracing::info!("[native] phone_state_change {} {}", peer, call);
        // An active synthetic call makes the simulated peer open SCO
        if call.num_active > 0 {
            self.script
                .push_stack(peer, StackEventData::AudioStateChanged(HalAudioState::Connecting));
            self.script
                .push_stack(peer, StackEventData::AudioStateChanged(HalAudioState::Connected));
        }
        true
    }
    fn start_voice_recognition(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] start_voice_recognition {}", peer);
        true
    }
    fn stop_voice_recognition(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[native] stop_voice_recognition {}", peer);
        true
    }
    fn send_bsir(&mut self, peer: BdAddr, in_band: bool) -> bool {
        tracing::info!("[native] send_bsir {} {}", peer, in_band);
        true
    }
    fn notify_device_status(&mut self, peer: BdAddr, state: &DeviceState) -> bool {
        tracing::info!("[native] notify_device_status {} {:?}", peer, state);
        true
    }
}

/// Canned telephony and audio subsystem
#[derive(Default)]
pub struct SimSystem;

impl SystemInterface for SimSystem {
    fn is_in_call(&self) -> bool {
        false
    }
    fn is_ringing(&self) -> bool {
        false
    }
    fn num_active_calls(&self) -> i32 {
        0
    }
    fn num_held_calls(&self) -> i32 {
        0
    }
    fn call_state(&self) -> HfpCallState {
        HfpCallState::Idle
    }
    fn cind_service(&self) -> i32 {
        1
    }
    fn cind_signal(&self) -> i32 {
        4
    }
    fn cind_roam(&self) -> i32 {
        0
    }
    fn cind_battery(&self) -> i32 {
        5
    }
    fn network_operator(&self) -> String {
        "SimNet".to_string()
    }
    fn subscriber_number(&self) -> Option<String> {
        Some("+31600000000".to_string())
    }
    fn answer_call(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[system] answer_call {}", peer);
        true
    }
    fn hangup_call(&mut self, peer: BdAddr) -> bool {
        tracing::info!("[system] hangup_call {}", peer);
        true
    }
    fn send_dtmf(&mut self, peer: BdAddr, code: u8) -> bool {
        tracing::info!("[system] send_dtmf {} {}", peer, code as char);
        true
    }
    fn process_chld(&mut self, peer: BdAddr, op: i32) -> bool {
        tracing::info!("[system] process_chld {} {}", peer, op);
        true
    }
    fn list_current_calls(&mut self, _peer: BdAddr) -> bool {
        false
    }
    fn query_phone_state(&mut self) -> bool {
        true
    }
    fn listen_for_phone_state(&mut self, peer: BdAddr, on: bool) {
        tracing::info!("[system] listen_for_phone_state {} {}", peer, on);
    }
    fn set_bluetooth_sco_on(&mut self, on: bool) {
        tracing::info!("[system] set_bluetooth_sco_on {}", on);
    }
    fn set_stream_volume(&mut self, volume: i32) {
        tracing::info!("[system] set_stream_volume {}", volume);
    }
    fn set_audio_parameters(&mut self, key_value_pairs: &str) {
        tracing::info!("[system] set_audio_parameters {}", key_value_pairs);
    }
    fn hold_vr_wake_lock(&mut self, timeout: Duration) {
        tracing::info!("[system] hold_vr_wake_lock {:?}", timeout);
    }
    fn release_vr_wake_lock(&mut self) {
        tracing::info!("[system] release_vr_wake_lock");
    }
}

/// Service that narrates broadcasts and tracks the active device
#[derive(Default)]
pub struct SimService {
    active: Mutex<Option<BdAddr>>,
}

impl SimService {
    pub fn new(active: Option<BdAddr>) -> Self {
        Self {
            active: Mutex::new(active),
        }
    }
}

impl AgService for SimService {
    fn on_connection_state_changed(&self, peer: BdAddr, from: ConnectionState, to: ConnectionState) {
        tracing::info!("[service] {} connection {} -> {}", peer, from, to);
    }
    fn on_audio_state_changed(&self, peer: BdAddr, from: AudioState, to: AudioState) {
        tracing::info!("[service] {} audio {} -> {}", peer, from, to);
    }
    fn active_device(&self) -> Option<BdAddr> {
        *self.active.lock().unwrap()
    }
    fn set_active_device(&self, peer: Option<BdAddr>) -> bool {
        tracing::info!("[service] active device -> {:?}", peer);
        *self.active.lock().unwrap() = peer;
        true
    }
    fn ok_to_accept_connection(&self, _peer: BdAddr) -> bool {
        true
    }
    fn connection_priority(&self, _peer: BdAddr) -> i32 {
        100
    }
    fn audio_route_allowed(&self) -> bool {
        true
    }
    fn in_band_ringing_enabled(&self) -> bool {
        true
    }
    fn force_sco_audio(&self) -> bool {
        false
    }
    fn is_bonded(&self, _peer: BdAddr) -> bool {
        true
    }
    fn remove_machine(&self, peer: BdAddr) {
        tracing::info!("[service] teardown requested for {}", peer);
    }
    fn send_notification(&self, notification: AgNotification) {
        tracing::info!("[service] notification {:?}", notification);
    }
    fn start_activity(&self, activity: SystemActivity) -> bool {
        tracing::info!("[service] start_activity {:?}", activity);
        true
    }
}

/// Minimal phonebook with a single remembered number
pub struct SimPhonebook;

impl PhonebookInterface for SimPhonebook {
    fn handle_cscs(&mut self, peer: BdAddr, _tail: &str, _ty: AtCommandType, native: &mut dyn NativeInterface) {
        native.at_response_code(peer, AtResponse::Ok, 0);
    }
    fn handle_cpbs(&mut self, peer: BdAddr, _tail: &str, _ty: AtCommandType, native: &mut dyn NativeInterface) {
        native.at_response_code(peer, AtResponse::Ok, 0);
    }
    fn handle_cpbr(&mut self, peer: BdAddr, _tail: &str, _ty: AtCommandType, native: &mut dyn NativeInterface) {
        native.at_response_code(peer, AtResponse::Error, 0);
    }
    fn last_dialled_number(&mut self) -> Option<String> {
        Some("+31611111111".to_string())
    }
    fn reset(&mut self) {}
}
