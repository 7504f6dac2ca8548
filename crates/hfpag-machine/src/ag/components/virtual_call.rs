//! Virtual call sub-protocol: a synthetic telephony sequence that drives
//! the peer into establishing SCO for non-telephony audio.

use hfpag_core::{CallInfo, HfpCallState};
use hfpag_events::{AtResponse, TimerKind};

use crate::ag::peer_machine::{AgState, PeerMachine};

impl PeerMachine {
    /// Starts a virtual voice call by injecting a synthetic
    /// dialing -> alerting -> active sequence. Returns false when one is
    /// already running or a real call / VR session is in the way.
    pub(crate) fn initiate_virtual_voice_call(&mut self) -> bool {
        tracing::debug!("{}: initiate virtual voice call", self.peer);
        if self.virtual_call_started {
            tracing::warn!("{}: virtual call already started", self.peer);
            return false;
        }
        if self.collab.system.is_in_call() {
            tracing::warn!("{}: refusing virtual call during real call", self.peer);
            return false;
        }
        if self.voice_recognition_started || self.waiting_for_voice_recognition {
            tracing::warn!("{}: refusing virtual call during voice recognition", self.peer);
            return false;
        }
        self.virtual_call_started = true;
        self.process_call_state(CallInfo::new(0, 0, HfpCallState::Dialing), true);
        self.process_call_state(CallInfo::new(0, 0, HfpCallState::Alerting), true);
        self.process_call_state(CallInfo::new(1, 0, HfpCallState::Idle), true);
        tracing::info!("{}: virtual voice call started", self.peer);
        true
    }

    /// Ends a running virtual voice call by injecting the idle update.
    /// Returns false when none is active.
    pub(crate) fn terminate_virtual_voice_call(&mut self) -> bool {
        if !self.virtual_call_started {
            return false;
        }
        self.virtual_call_started = false;
        self.process_call_state(CallInfo::idle(), true);
        tracing::info!("{}: virtual voice call terminated", self.peer);
        true
    }

    /// Applies one telephony update, real or synthetic. A real call
    /// preempts a running virtual call before anything is forwarded.
    pub(crate) fn process_call_state(&mut self, call: CallInfo, is_virtual: bool) {
        tracing::debug!("<- {} virtual={}", call, is_virtual);

        let call_appeared = call.num_active > 0 || call.num_held > 0 || call.state != HfpCallState::Idle;
        if !is_virtual && self.virtual_call_started && call_appeared {
            tracing::info!("{}: real call preempts the virtual call", self.peer);
            self.terminate_virtual_voice_call();
        }

        self.call_info = call.clone();

        // Confirmation window of an AT-initiated outgoing call
        if self.dialing_out && call.state == HfpCallState::Dialing {
            if self.timers.is_armed(TimerKind::DialingOutTimeout) {
                tracing::debug!("{}: dial-out confirmed by telephony", self.peer);
                self.collab.service.set_active_device(Some(self.peer));
                self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
                self.timers.cancel(TimerKind::DialingOutTimeout);
            }
        } else if call.state == HfpCallState::Active || call.state == HfpCallState::Idle {
            self.dialing_out = false;
        }

        // Forward to the peer unless disconnected or masked by a virtual
        // call (real updates must not leak through the synthetic picture)
        let masked = !is_virtual && self.virtual_call_started;
        if self.state != AgState::Disconnected && !masked {
            tracing::debug!("-> phone state {}", call);
            self.collab.native.phone_state_change(self.peer, &call);
        }
    }

    /// AT+CHUP or equivalent from the peer: a virtual call is ended
    /// locally, a real call is handed to telephony
    pub(crate) fn process_hangup_call(&mut self) {
        tracing::debug!("<- hangup");
        if self.virtual_call_started {
            self.terminate_virtual_voice_call();
        } else {
            self.collab.system.hangup_call(self.peer);
        }
    }
}
