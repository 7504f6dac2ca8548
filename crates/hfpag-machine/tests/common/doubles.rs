//! Recording collaborator doubles. Each double shares its record list via
//! `Arc<Mutex<_>>` clones so tests keep a handle while the machine owns
//! the boxed trait object.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hfpag_at::AtCommandType;
use hfpag_core::{AudioState, BdAddr, CallInfo, ConnectionState, DeviceState, HfpCallState, VolumeType};
use hfpag_events::{AgNotification, AtResponse, ClccEntry, SystemActivity};
use hfpag_machine::{AgService, NativeInterface, PhonebookInterface, SystemInterface};

// ─── Native stack double ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    ConnectHfp(BdAddr),
    DisconnectHfp(BdAddr),
    ConnectAudio(BdAddr),
    DisconnectAudio(BdAddr),
    SetVolume(BdAddr, VolumeType, i32),
    AtResponseCode(BdAddr, AtResponse, i32),
    AtResponseString(BdAddr, String),
    CindResponse {
        peer: BdAddr,
        service: i32,
        call: i32,
        callsetup: i32,
        callheld: i32,
        signal: i32,
        roam: i32,
        battery: i32,
    },
    ClccResponse(BdAddr, ClccEntry),
    CopsResponse(BdAddr, String),
    PhoneStateChange(BdAddr, CallInfo),
    StartVoiceRecognition(BdAddr),
    StopVoiceRecognition(BdAddr),
    SendBsir(BdAddr, bool),
    NotifyDeviceStatus(BdAddr, DeviceState),
}

/// Configurable return values of the native double
#[derive(Debug, Clone)]
pub struct NativeBehaviour {
    pub connect_hfp: bool,
    pub disconnect_hfp: bool,
    pub connect_audio: bool,
    pub disconnect_audio: bool,
    /// Return of start_voice_recognition: whether audio is needed
    pub start_voice_recognition: bool,
    pub stop_voice_recognition: bool,
}

impl Default for NativeBehaviour {
    fn default() -> Self {
        Self {
            connect_hfp: true,
            disconnect_hfp: true,
            connect_audio: true,
            disconnect_audio: true,
            start_voice_recognition: true,
            stop_voice_recognition: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingNative {
    pub calls: Arc<Mutex<Vec<NativeCall>>>,
    pub behaviour: Arc<Mutex<NativeBehaviour>>,
}

impl RecordingNative {
    pub fn take_calls(&self) -> Vec<NativeCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_behaviour(&self, f: impl FnOnce(&mut NativeBehaviour)) {
        f(&mut self.behaviour.lock().unwrap());
    }

    fn record(&self, call: NativeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl NativeInterface for RecordingNative {
    fn connect_hfp(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::ConnectHfp(peer));
        self.behaviour.lock().unwrap().connect_hfp
    }
    fn disconnect_hfp(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::DisconnectHfp(peer));
        self.behaviour.lock().unwrap().disconnect_hfp
    }
    fn connect_audio(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::ConnectAudio(peer));
        self.behaviour.lock().unwrap().connect_audio
    }
    fn disconnect_audio(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::DisconnectAudio(peer));
        self.behaviour.lock().unwrap().disconnect_audio
    }
    fn set_volume(&mut self, peer: BdAddr, vol_type: VolumeType, volume: i32) -> bool {
        self.record(NativeCall::SetVolume(peer, vol_type, volume));
        true
    }
    fn at_response_code(&mut self, peer: BdAddr, code: AtResponse, error_code: i32) -> bool {
        self.record(NativeCall::AtResponseCode(peer, code, error_code));
        true
    }
    fn at_response_string(&mut self, peer: BdAddr, response: &str) -> bool {
        self.record(NativeCall::AtResponseString(peer, response.to_string()));
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
        self.record(NativeCall::CindResponse {
            peer,
            service,
            call,
            callsetup,
            callheld,
            signal,
            roam,
            battery,
        });
        true
    }
    fn clcc_response(&mut self, peer: BdAddr, entry: &ClccEntry) -> bool {
        self.record(NativeCall::ClccResponse(peer, entry.clone()));
        true
    }
    fn cops_response(&mut self, peer: BdAddr, operator: &str) -> bool {
        self.record(NativeCall::CopsResponse(peer, operator.to_string()));
        true
    }
    fn phone_state_change(&mut self, peer: BdAddr, call: &CallInfo) -> bool {
        self.record(NativeCall::PhoneStateChange(peer, call.clone()));
        true
    }
    fn start_voice_recognition(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::StartVoiceRecognition(peer));
        self.behaviour.lock().unwrap().start_voice_recognition
    }
    fn stop_voice_recognition(&mut self, peer: BdAddr) -> bool {
        self.record(NativeCall::StopVoiceRecognition(peer));
        self.behaviour.lock().unwrap().stop_voice_recognition
    }
    fn send_bsir(&mut self, peer: BdAddr, in_band: bool) -> bool {
        self.record(NativeCall::SendBsir(peer, in_band));
        true
    }
    fn notify_device_status(&mut self, peer: BdAddr, state: &DeviceState) -> bool {
        self.record(NativeCall::NotifyDeviceStatus(peer, *state));
        true
    }
}

// ─── Telephony / audio double ────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SystemCall {
    AnswerCall(BdAddr),
    HangupCall(BdAddr),
    SendDtmf(BdAddr, u8),
    ProcessChld(BdAddr, i32),
    ListCurrentCalls(BdAddr),
    QueryPhoneState,
    ListenForPhoneState(BdAddr, bool),
    SetBluetoothScoOn(bool),
    SetStreamVolume(i32),
    SetAudioParameters(String),
    HoldVrWakeLock(Duration),
    ReleaseVrWakeLock,
}

#[derive(Debug, Clone)]
pub struct TelephonyState {
    pub in_call: bool,
    pub ringing: bool,
    pub num_active: i32,
    pub num_held: i32,
    pub call_state: HfpCallState,
    pub service: i32,
    pub signal: i32,
    pub roam: i32,
    pub battery: i32,
    pub operator: String,
    pub subscriber: Option<String>,
    pub chld_accepted: bool,
    pub list_calls_accepted: bool,
}

impl Default for TelephonyState {
    fn default() -> Self {
        Self {
            in_call: false,
            ringing: false,
            num_active: 0,
            num_held: 0,
            call_state: HfpCallState::Idle,
            service: 1,
            signal: 3,
            roam: 0,
            battery: 5,
            operator: "TestNet".to_string(),
            subscriber: Some("+3161234".to_string()),
            chld_accepted: true,
            list_calls_accepted: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeSystem {
    pub telephony: Arc<Mutex<TelephonyState>>,
    pub calls: Arc<Mutex<Vec<SystemCall>>>,
}

impl FakeSystem {
    pub fn take_calls(&self) -> Vec<SystemCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<SystemCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_telephony(&self, f: impl FnOnce(&mut TelephonyState)) {
        f(&mut self.telephony.lock().unwrap());
    }

    pub fn wake_lock_held(&self) -> bool {
        // Last wake-lock operation wins
        let calls = self.calls.lock().unwrap();
        for call in calls.iter().rev() {
            match call {
                SystemCall::HoldVrWakeLock(_) => return true,
                SystemCall::ReleaseVrWakeLock => return false,
                _ => {}
            }
        }
        false
    }

    fn record(&self, call: SystemCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl SystemInterface for FakeSystem {
    fn is_in_call(&self) -> bool {
        self.telephony.lock().unwrap().in_call
    }
    fn is_ringing(&self) -> bool {
        self.telephony.lock().unwrap().ringing
    }
    fn num_active_calls(&self) -> i32 {
        self.telephony.lock().unwrap().num_active
    }
    fn num_held_calls(&self) -> i32 {
        self.telephony.lock().unwrap().num_held
    }
    fn call_state(&self) -> HfpCallState {
        self.telephony.lock().unwrap().call_state
    }
    fn cind_service(&self) -> i32 {
        self.telephony.lock().unwrap().service
    }
    fn cind_signal(&self) -> i32 {
        self.telephony.lock().unwrap().signal
    }
    fn cind_roam(&self) -> i32 {
        self.telephony.lock().unwrap().roam
    }
    fn cind_battery(&self) -> i32 {
        self.telephony.lock().unwrap().battery
    }
    fn network_operator(&self) -> String {
        self.telephony.lock().unwrap().operator.clone()
    }
    fn subscriber_number(&self) -> Option<String> {
        self.telephony.lock().unwrap().subscriber.clone()
    }
    fn answer_call(&mut self, peer: BdAddr) -> bool {
        self.record(SystemCall::AnswerCall(peer));
        true
    }
    fn hangup_call(&mut self, peer: BdAddr) -> bool {
        self.record(SystemCall::HangupCall(peer));
        true
    }
    fn send_dtmf(&mut self, peer: BdAddr, code: u8) -> bool {
        self.record(SystemCall::SendDtmf(peer, code));
        true
    }
    fn process_chld(&mut self, peer: BdAddr, op: i32) -> bool {
        self.record(SystemCall::ProcessChld(peer, op));
        self.telephony.lock().unwrap().chld_accepted
    }
    fn list_current_calls(&mut self, peer: BdAddr) -> bool {
        self.record(SystemCall::ListCurrentCalls(peer));
        self.telephony.lock().unwrap().list_calls_accepted
    }
    fn query_phone_state(&mut self) -> bool {
        self.record(SystemCall::QueryPhoneState);
        true
    }
    fn listen_for_phone_state(&mut self, peer: BdAddr, on: bool) {
        self.record(SystemCall::ListenForPhoneState(peer, on));
    }
    fn set_bluetooth_sco_on(&mut self, on: bool) {
        self.record(SystemCall::SetBluetoothScoOn(on));
    }
    fn set_stream_volume(&mut self, volume: i32) {
        self.record(SystemCall::SetStreamVolume(volume));
    }
    fn set_audio_parameters(&mut self, key_value_pairs: &str) {
        self.record(SystemCall::SetAudioParameters(key_value_pairs.to_string()));
    }
    fn hold_vr_wake_lock(&mut self, timeout: Duration) {
        self.record(SystemCall::HoldVrWakeLock(timeout));
    }
    fn release_vr_wake_lock(&mut self) {
        self.record(SystemCall::ReleaseVrWakeLock);
    }
}

// ─── Service double ──────────────────────────────────────────────

/// Everything the machine reported to the service, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    ConnectionState(BdAddr, ConnectionState, ConnectionState),
    AudioState(BdAddr, AudioState, AudioState),
    Notification(AgNotification),
    Activity(SystemActivity),
    Removed(BdAddr),
}

#[derive(Debug, Clone)]
pub struct ServicePolicy {
    pub active: Option<BdAddr>,
    pub accept_connections: bool,
    pub audio_route_allowed: bool,
    pub in_band_ringing: bool,
    pub force_sco: bool,
    pub bonded: bool,
    pub priority: i32,
    pub set_active_accepted: bool,
    pub start_activity_accepted: bool,
}

impl Default for ServicePolicy {
    fn default() -> Self {
        Self {
            active: None,
            accept_connections: true,
            audio_route_allowed: true,
            in_band_ringing: false,
            force_sco: false,
            bonded: true,
            priority: 100,
            set_active_accepted: true,
            start_activity_accepted: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeService {
    pub policy: Arc<Mutex<ServicePolicy>>,
    pub events: Arc<Mutex<Vec<ServiceEvent>>>,
}

impl FakeService {
    pub fn take_events(&self) -> Vec<ServiceEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn connection_broadcasts(&self) -> Vec<(ConnectionState, ConnectionState)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServiceEvent::ConnectionState(_, from, to) => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn audio_broadcasts(&self) -> Vec<(AudioState, AudioState)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServiceEvent::AudioState(_, from, to) => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn set_policy(&self, f: impl FnOnce(&mut ServicePolicy)) {
        f(&mut self.policy.lock().unwrap());
    }

    pub fn active_device_now(&self) -> Option<BdAddr> {
        self.policy.lock().unwrap().active
    }

    fn record(&self, event: ServiceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl AgService for FakeService {
    fn on_connection_state_changed(&self, peer: BdAddr, from: ConnectionState, to: ConnectionState) {
        self.record(ServiceEvent::ConnectionState(peer, from, to));
    }
    fn on_audio_state_changed(&self, peer: BdAddr, from: AudioState, to: AudioState) {
        self.record(ServiceEvent::AudioState(peer, from, to));
    }
    fn active_device(&self) -> Option<BdAddr> {
        self.policy.lock().unwrap().active
    }
    fn set_active_device(&self, peer: Option<BdAddr>) -> bool {
        let mut policy = self.policy.lock().unwrap();
        if policy.set_active_accepted {
            policy.active = peer;
            true
        } else {
            false
        }
    }
    fn ok_to_accept_connection(&self, _peer: BdAddr) -> bool {
        self.policy.lock().unwrap().accept_connections
    }
    fn connection_priority(&self, _peer: BdAddr) -> i32 {
        self.policy.lock().unwrap().priority
    }
    fn audio_route_allowed(&self) -> bool {
        self.policy.lock().unwrap().audio_route_allowed
    }
    fn in_band_ringing_enabled(&self) -> bool {
        self.policy.lock().unwrap().in_band_ringing
    }
    fn force_sco_audio(&self) -> bool {
        self.policy.lock().unwrap().force_sco
    }
    fn is_bonded(&self, _peer: BdAddr) -> bool {
        self.policy.lock().unwrap().bonded
    }
    fn remove_machine(&self, peer: BdAddr) {
        self.record(ServiceEvent::Removed(peer));
    }
    fn send_notification(&self, notification: AgNotification) {
        self.record(ServiceEvent::Notification(notification));
    }
    fn start_activity(&self, activity: SystemActivity) -> bool {
        self.record(ServiceEvent::Activity(activity));
        self.policy.lock().unwrap().start_activity_accepted
    }
}

// ─── Phonebook double ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PhonebookState {
    pub last_dialled: Option<String>,
    pub resets: usize,
    /// (command, tail, type) of every delegated AT command
    pub handled: Vec<(String, String, AtCommandType)>,
}

#[derive(Clone, Default)]
pub struct FakePhonebook {
    pub state: Arc<Mutex<PhonebookState>>,
}

impl FakePhonebook {
    pub fn set_last_dialled(&self, number: Option<&str>) {
        self.state.lock().unwrap().last_dialled = number.map(str::to_string);
    }

    fn handle(&self, command: &str, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface) {
        self.state
            .lock()
            .unwrap()
            .handled
            .push((command.to_string(), tail.to_string(), ty));
        native.at_response_code(peer, AtResponse::Ok, 0);
    }
}

impl PhonebookInterface for FakePhonebook {
    fn handle_cscs(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface) {
        self.handle("+CSCS", peer, tail, ty, native);
    }
    fn handle_cpbs(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface) {
        self.handle("+CPBS", peer, tail, ty, native);
    }
    fn handle_cpbr(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface) {
        self.handle("+CPBR", peer, tail, ty, native);
    }
    fn last_dialled_number(&mut self) -> Option<String> {
        self.state.lock().unwrap().last_dialled.clone()
    }
    fn reset(&mut self) {
        self.state.lock().unwrap().resets += 1;
    }
}
