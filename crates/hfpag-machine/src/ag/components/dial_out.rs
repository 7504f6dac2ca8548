//! Outgoing calls requested by the peer: ATD dial strings, memory dialing
//! and the single-button flows of headsets without a full keypad.

use hfpag_at::pre_dial_transform;
use hfpag_core::AudioState;
use hfpag_events::{AtResponse, SystemActivity, TimerKind};

use crate::ag::peer_machine::PeerMachine;

/// Memory-dial marker the conformance tester uses to probe error handling
const PTS_DIAL_MARKER: &str = ">9999";

impl PeerMachine {
    /// ATD<number>; or ATD><location>; from the peer
    pub(crate) fn process_dial_call(&mut self, number: &str) {
        tracing::debug!("<- ATD{}", number);
        if self.dialing_out {
            tracing::warn!("{}: already dialling out", self.peer);
            self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
            return;
        }
        let dial_number = if number.is_empty() || number.starts_with('>') {
            if number.starts_with(PTS_DIAL_MARKER) {
                self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
                return;
            }
            // Memory dialing collapses onto last-number redial
            match self.collab.phonebook.last_dialled_number() {
                Some(last) => last,
                None => {
                    tracing::warn!("{}: no last dialled number available", self.peer);
                    self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
                    return;
                }
            }
        } else {
            let trimmed = number.strip_suffix(';').unwrap_or(number);
            pre_dial_transform(trimmed)
        };
        if !self.dial_outgoing_call(dial_number) {
            self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
        }
    }

    /// Places an outgoing call for this peer and opens the confirmation
    /// window. The OK/ERROR answer is produced by the subsequent
    /// telephony Dialing event or the timeout.
    pub(crate) fn dial_outgoing_call(&mut self, number: String) -> bool {
        tracing::info!("{}: dialling out", self.peer);
        self.terminate_virtual_voice_call();
        self.collab.service.set_active_device(Some(self.peer));
        if !self.collab.service.start_activity(SystemActivity::DialCall { number }) {
            tracing::error!("{}: failed to launch the call activity", self.peer);
            return false;
        }
        self.dialing_out = true;
        let timeout = self.config.config().timers.dialing_out_timeout();
        self.timers.arm(TimerKind::DialingOutTimeout, self.peer, timeout);
        true
    }

    /// Telephony never confirmed the outgoing call
    pub(crate) fn process_dialing_out_timeout(&mut self) {
        if !self.dialing_out {
            return;
        }
        tracing::warn!("{}: timed out waiting for telephony to dial", self.peer);
        self.dialing_out = false;
        self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
    }

    /// Single-button headset event: answer when ringing, hang up or grab
    /// audio when in a call, redial otherwise
    pub(crate) fn process_key_pressed(&mut self) {
        tracing::debug!("<- key pressed");
        if self.collab.system.is_ringing() {
            self.collab.system.answer_call(self.peer);
            return;
        }
        if self.collab.system.is_in_call() {
            if self.state().audio_state() == AudioState::Disconnected {
                // Route the ongoing call to this headset
                if !self.collab.service.set_active_device(Some(self.device())) {
                    tracing::warn!("{}: failed to claim the ongoing call", self.peer);
                }
            } else {
                self.collab.system.hangup_call(self.peer);
            }
            return;
        }
        if self.state().audio_state() != AudioState::Disconnected {
            // Audio is up without a call (VR or virtual call); nothing to do
            return;
        }
        match self.collab.phonebook.last_dialled_number() {
            Some(number) => {
                if !self.dial_outgoing_call(number) {
                    tracing::warn!("{}: redial failed", self.peer);
                }
            }
            None => {
                tracing::debug!("{}: key pressed with no last dialled number", self.peer);
            }
        }
    }
}
