//! Voice recognition sub-protocol. Sessions start either remotely (AT+BVRA
//! from the peer) or locally (service request); the remote path waits for
//! a local confirmation under a timeout with the VR wake-lock held.

use hfpag_core::AudioState;
use hfpag_events::{AgMsg, AtResponse, SystemActivity, TimerKind, VrState};

use crate::ag::peer_machine::PeerMachine;

impl PeerMachine {
    /// AT+BVRA from the peer
    pub(crate) fn process_remote_vr(&mut self, state: VrState) {
        tracing::debug!("<- BVRA {:?}", state);
        match state {
            VrState::Started => {
                if self.collab.system.is_in_call() || self.virtual_call_started {
                    tracing::warn!("{}: rejecting VR start during call", self.peer);
                    self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
                    return;
                }
                if !self.collab.service.start_activity(SystemActivity::VoiceCommand) {
                    tracing::error!("{}: voice command activity unavailable", self.peer);
                    self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
                    return;
                }
                self.expect_voice_recognition();
            }
            VrState::Stopped => {
                if self.voice_recognition_started || self.waiting_for_voice_recognition {
                    let was_waiting = self.waiting_for_voice_recognition;
                    self.voice_recognition_started = false;
                    self.waiting_for_voice_recognition = false;
                    if was_waiting {
                        self.timers.cancel(TimerKind::StartVrTimeout);
                        self.collab.system.release_vr_wake_lock();
                    }
                    self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
                    self.teardown_vr_audio();
                } else {
                    tracing::warn!("{}: BVRA stop without a session", self.peer);
                    self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
                }
            }
        }
    }

    /// Arms the waiting window for the local confirmation of a
    /// remote-initiated session
    fn expect_voice_recognition(&mut self) {
        self.waiting_for_voice_recognition = true;
        self.collab.service.set_active_device(Some(self.peer));
        let timeout = self.config.config().timers.start_vr_timeout();
        self.timers.arm(TimerKind::StartVrTimeout, self.peer, timeout);
        self.collab.system.hold_vr_wake_lock(timeout);
    }

    /// Local VR start, either confirming a waiting remote session or
    /// initiating a fresh one
    pub(crate) fn process_local_vr_started(&mut self) {
        if self.collab.system.is_in_call() {
            tracing::warn!("{}: rejecting local VR start during call", self.peer);
            return;
        }
        if self.voice_recognition_started {
            tracing::warn!("{}: voice recognition already started", self.peer);
            return;
        }
        self.voice_recognition_started = true;
        let need_audio = if self.waiting_for_voice_recognition {
            // The confirmation the peer is waiting for
            self.waiting_for_voice_recognition = false;
            self.timers.cancel(TimerKind::StartVrTimeout);
            self.collab.system.release_vr_wake_lock();
            self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
            true
        } else {
            self.collab.native.start_voice_recognition(self.peer)
        };
        if need_audio && self.state().audio_state() == AudioState::Disconnected {
            self.collab.system.set_audio_parameters("A2dpSuspended=true");
            self.send_to_self(AgMsg::ConnectAudio(self.device()));
        }
    }

    /// Local VR stop
    pub(crate) fn process_local_vr_stopped(&mut self) {
        if self.waiting_for_voice_recognition {
            // The pending remote request can no longer be honoured
            self.waiting_for_voice_recognition = false;
            self.voice_recognition_started = false;
            self.timers.cancel(TimerKind::StartVrTimeout);
            self.collab.system.release_vr_wake_lock();
            self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
            return;
        }
        if !self.voice_recognition_started {
            tracing::debug!("{}: local VR stop without a session", self.peer);
            return;
        }
        self.voice_recognition_started = false;
        if self.collab.native.stop_voice_recognition(self.peer) {
            self.teardown_vr_audio();
        }
    }

    /// The waiting window expired without a local confirmation
    pub(crate) fn process_start_vr_timeout(&mut self) {
        if !self.waiting_for_voice_recognition {
            return;
        }
        tracing::warn!("{}: timed out waiting for VR confirmation", self.peer);
        self.waiting_for_voice_recognition = false;
        self.collab.system.release_vr_wake_lock();
        self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
    }

    /// Drops the VR audio path when no call needs it
    fn teardown_vr_audio(&mut self) {
        if !self.collab.system.is_in_call() && self.state().audio_state() != AudioState::Disconnected {
            self.collab.native.disconnect_audio(self.peer);
            self.collab.system.set_audio_parameters("A2dpSuspended=false");
        }
    }
}
