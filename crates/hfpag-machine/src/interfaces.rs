//! Collaborator interfaces of the per-device machine
//!
//! The machine never talks to the platform directly; everything flows
//! through these traits. Production wires them to the native stack,
//! telephony/audio and the multi-device service; tests wire recording
//! doubles.

use std::sync::Arc;
use std::time::Duration;

use hfpag_at::AtCommandType;
use hfpag_core::{AudioState, BdAddr, CallInfo, ConnectionState, DeviceState, HfpCallState, VolumeType};
use hfpag_events::{AgNotification, AtResponse, ClccEntry, SystemActivity};

/// Outbound command surface of the native HFP stack. All calls are
/// non-blocking; `false` means the stack refused the request and no state
/// change may be assumed.
pub trait NativeInterface: Send {
    fn connect_hfp(&mut self, peer: BdAddr) -> bool;
    fn disconnect_hfp(&mut self, peer: BdAddr) -> bool;
    fn connect_audio(&mut self, peer: BdAddr) -> bool;
    fn disconnect_audio(&mut self, peer: BdAddr) -> bool;
    fn set_volume(&mut self, peer: BdAddr, vol_type: VolumeType, volume: i32) -> bool;
    fn at_response_code(&mut self, peer: BdAddr, code: AtResponse, error_code: i32) -> bool;
    fn at_response_string(&mut self, peer: BdAddr, response: &str) -> bool;
    /// Indicator order follows the +CIND listing the AG advertises:
    /// service, call, callsetup, callheld, signal, roam, battery
    #[allow(clippy::too_many_arguments)]
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
    ) -> bool;
    fn clcc_response(&mut self, peer: BdAddr, entry: &ClccEntry) -> bool;
    fn cops_response(&mut self, peer: BdAddr, operator: &str) -> bool;
    fn phone_state_change(&mut self, peer: BdAddr, call: &CallInfo) -> bool;
    /// Returns whether an audio connection is needed for the session
    fn start_voice_recognition(&mut self, peer: BdAddr) -> bool;
    fn stop_voice_recognition(&mut self, peer: BdAddr) -> bool;
    fn send_bsir(&mut self, peer: BdAddr, in_band: bool) -> bool;
    fn notify_device_status(&mut self, peer: BdAddr, state: &DeviceState) -> bool;
}

/// Telephony snapshot and actions, audio routing and the VR wake-lock
pub trait SystemInterface: Send {
    // Telephony snapshot
    fn is_in_call(&self) -> bool;
    fn is_ringing(&self) -> bool;
    fn num_active_calls(&self) -> i32;
    fn num_held_calls(&self) -> i32;
    fn call_state(&self) -> HfpCallState;
    fn cind_service(&self) -> i32;
    fn cind_signal(&self) -> i32;
    fn cind_roam(&self) -> i32;
    fn cind_battery(&self) -> i32;
    fn network_operator(&self) -> String;
    fn subscriber_number(&self) -> Option<String>;

    // Telephony actions
    fn answer_call(&mut self, peer: BdAddr) -> bool;
    fn hangup_call(&mut self, peer: BdAddr) -> bool;
    fn send_dtmf(&mut self, peer: BdAddr, code: u8) -> bool;
    fn process_chld(&mut self, peer: BdAddr, op: i32) -> bool;
    /// Asks telephony to stream the current calls as `SendClccResponse`
    /// messages. `false` means no listing will follow.
    fn list_current_calls(&mut self, peer: BdAddr) -> bool;
    fn query_phone_state(&mut self) -> bool;
    fn listen_for_phone_state(&mut self, peer: BdAddr, on: bool);

    // Audio routing
    fn set_bluetooth_sco_on(&mut self, on: bool);
    fn set_stream_volume(&mut self, volume: i32);
    fn set_audio_parameters(&mut self, key_value_pairs: &str);

    // Wake lock held while waiting for a local VR confirmation
    fn hold_vr_wake_lock(&mut self, timeout: Duration);
    fn release_vr_wake_lock(&mut self);
}

/// The multi-device service a machine reports to. Shared between machines,
/// so it must be safe under concurrent invocation.
pub trait AgService: Send + Sync {
    fn on_connection_state_changed(&self, peer: BdAddr, from: ConnectionState, to: ConnectionState);
    fn on_audio_state_changed(&self, peer: BdAddr, from: AudioState, to: AudioState);
    fn active_device(&self) -> Option<BdAddr>;
    fn set_active_device(&self, peer: Option<BdAddr>) -> bool;
    fn ok_to_accept_connection(&self, peer: BdAddr) -> bool;
    fn connection_priority(&self, peer: BdAddr) -> i32;
    fn audio_route_allowed(&self) -> bool;
    fn in_band_ringing_enabled(&self) -> bool;
    fn force_sco_audio(&self) -> bool;
    fn is_bonded(&self, peer: BdAddr) -> bool;
    /// Schedules teardown of the machine for `peer`; called from the
    /// machine's own runner, so the service must defer the actual join.
    fn remove_machine(&self, peer: BdAddr);
    fn send_notification(&self, notification: AgNotification);
    fn start_activity(&self, activity: SystemActivity) -> bool;
}

/// Phonebook access helper answering AT+CSCS / +CPBS / +CPBR.
/// Handlers receive the command tail (everything after the command name)
/// and answer through the native interface themselves.
pub trait PhonebookInterface: Send {
    fn handle_cscs(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface);
    fn handle_cpbs(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface);
    fn handle_cpbr(&mut self, peer: BdAddr, tail: &str, ty: AtCommandType, native: &mut dyn NativeInterface);
    fn last_dialled_number(&mut self) -> Option<String>;
    /// Drops per-session AT state; called when the peer disconnects
    fn reset(&mut self);
}

/// Bundle of the collaborator endpoints one machine owns
pub struct Collaborators {
    pub native: Box<dyn NativeInterface>,
    pub system: Box<dyn SystemInterface>,
    pub service: Arc<dyn AgService>,
    pub phonebook: Box<dyn PhonebookInterface>,
}
