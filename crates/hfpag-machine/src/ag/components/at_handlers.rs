//! AT command processing shared by the Connected group of states.
//! `Connecting` reuses the CIND/CHLD/BIND/WBS handlers during SLC setup.

use hfpag_at::{
    parse_bind_ids, parse_vendor_set_command, preprocess_unknown_at, toa_from_number, AtCommandType, HfIndicator,
    XAPL_REPLY,
};
use hfpag_core::VolumeType;
use hfpag_events::{AgNotification, AtResponse, ClccEntry, TimerKind};

use crate::ag::peer_machine::PeerMachine;

impl PeerMachine {
    /// AT+CIND?: indicator query. During a virtual call the peer must see
    /// one active call and no call setup, regardless of telephony.
    pub(crate) fn process_at_cind(&mut self) {
        let system = &self.collab.system;
        let (call, callsetup) = if self.virtual_call_started {
            (1, 0)
        } else {
            (system.num_active_calls(), system.call_state().callsetup())
        };
        let callheld = system.num_held_calls();
        let service = system.cind_service();
        let signal = system.cind_signal();
        let roam = system.cind_roam();
        let battery = system.cind_battery();
        tracing::debug!(
            "-> +CIND service={} call={} callsetup={} callheld={}",
            service,
            call,
            callsetup,
            callheld
        );
        self.collab
            .native
            .cind_response(self.peer, service, call, callsetup, callheld, signal, roam, battery);
    }

    /// AT+CHLD=n: call hold/multiparty, delegated to telephony
    pub(crate) fn process_at_chld(&mut self, op: i32) {
        tracing::debug!("<- +CHLD={}", op);
        if self.collab.system.process_chld(self.peer, op) {
            self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
        } else {
            self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
        }
    }

    /// AT+CLCC: current calls listing. A virtual call is answered
    /// directly; real listings are streamed by telephony under a timeout.
    pub(crate) fn process_at_clcc(&mut self) {
        if self.virtual_call_started {
            let number = self.collab.system.subscriber_number().unwrap_or_default();
            let number_type = toa_from_number(&number);
            tracing::debug!("-> +CLCC virtual call, number type {}", number_type);
            let entry = ClccEntry {
                index: 1,
                direction: 0,
                status: 0,
                mode: 0,
                mpty: false,
                number,
                number_type,
            };
            self.collab.native.clcc_response(self.peer, &entry);
            self.collab.native.clcc_response(self.peer, &ClccEntry::terminator());
            return;
        }
        if self.collab.system.list_current_calls(self.peer) {
            let timeout = self.config.config().timers.clcc_response_timeout();
            self.timers.arm(TimerKind::ClccRspTimeout, self.peer, timeout);
        } else {
            tracing::warn!("{}: telephony refused to list calls", self.peer);
            self.collab.native.clcc_response(self.peer, &ClccEntry::terminator());
        }
    }

    /// One streamed +CLCC entry from telephony. Entries arriving with no
    /// listing in progress are dropped; index 0 terminates the listing.
    pub(crate) fn process_send_clcc_response(&mut self, entry: &ClccEntry) {
        if !self.timers.is_armed(TimerKind::ClccRspTimeout) {
            tracing::warn!("{}: dropping unsolicited +CLCC entry", self.peer);
            return;
        }
        if entry.index == 0 {
            self.timers.cancel(TimerKind::ClccRspTimeout);
        }
        self.collab.native.clcc_response(self.peer, entry);
    }

    /// No listing arrived in time; close it with the terminator
    pub(crate) fn process_clcc_timeout(&mut self) {
        tracing::warn!("{}: timed out waiting for the current calls listing", self.peer);
        self.collab.native.clcc_response(self.peer, &ClccEntry::terminator());
    }

    /// AT+COPS?: current network operator, empty when unknown
    pub(crate) fn process_at_cops(&mut self) {
        let operator = self.collab.system.network_operator();
        tracing::debug!("-> +COPS \"{}\"", operator);
        self.collab.native.cops_response(self.peer, &operator);
    }

    /// AT+CNUM: subscriber number with type-of-address
    pub(crate) fn process_subscriber_number_request(&mut self) {
        match self.collab.system.subscriber_number() {
            Some(number) if !number.is_empty() => {
                let number_type = toa_from_number(&number);
                let response = format!("+CNUM: ,\"{}\",{},,4", number, number_type);
                tracing::debug!("-> {}", response);
                self.collab.native.at_response_string(self.peer, &response);
                self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
            }
            _ => {
                tracing::error!("{}: subscriber number unknown", self.peer);
                self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
            }
        }
    }

    /// AT+BIND=: HF indicator registration. Recognised indicators are
    /// reported with value -1 until the first +BIEV arrives.
    pub(crate) fn process_at_bind(&mut self, id_list: &str) {
        tracing::debug!("<- +BIND={}", id_list);
        for id in parse_bind_ids(id_list) {
            match HfIndicator::from_id(id) {
                Some(indicator) => {
                    tracing::debug!("{}: peer registered {:?}", self.peer, indicator);
                    self.collab.service.send_notification(AgNotification::HfIndicator {
                        peer: self.peer,
                        indicator_id: id,
                        value: -1,
                    });
                }
                None => {
                    tracing::debug!("{}: unrecognised HF indicator id {}", self.peer, id);
                }
            }
        }
    }

    /// AT+BIEV=id,value: HF indicator update
    pub(crate) fn process_at_biev(&mut self, indicator: i32, value: i32) {
        tracing::debug!("<- +BIEV={},{}", indicator, value);
        match HfIndicator::from_id(indicator) {
            Some(_) => {
                self.collab.service.send_notification(AgNotification::HfIndicator {
                    peer: self.peer,
                    indicator_id: indicator,
                    value,
                });
            }
            None => {
                tracing::warn!("{}: +BIEV for unrecognised indicator {}", self.peer, indicator);
            }
        }
    }

    /// Codec selection indication from the stack (CVSD vs mSBC)
    pub(crate) fn process_wbs(&mut self, enabled: bool) {
        tracing::debug!("<- WBS {}", enabled);
        self.audio_params.wbs = enabled;
    }

    /// AT command the native layer could not classify: normalise, then
    /// dispatch to the phonebook helpers or the vendor-specific path
    pub(crate) fn process_unknown_at(&mut self, at_string: &str) {
        let preprocessed = preprocess_unknown_at(at_string);
        // Some stacks forward the full command line, others strip "AT"
        let at = preprocessed.strip_prefix("AT").unwrap_or(&preprocessed);
        tracing::debug!("<- {}", at);
        if let Some(tail) = at.strip_prefix("+CSCS") {
            let ty = AtCommandType::of_tail(tail);
            self.collab
                .phonebook
                .handle_cscs(self.peer, tail, ty, self.collab.native.as_mut());
        } else if let Some(tail) = at.strip_prefix("+CPBS") {
            let ty = AtCommandType::of_tail(tail);
            self.collab
                .phonebook
                .handle_cpbs(self.peer, tail, ty, self.collab.native.as_mut());
        } else if let Some(tail) = at.strip_prefix("+CPBR") {
            let ty = AtCommandType::of_tail(tail);
            self.collab
                .phonebook
                .handle_cpbr(self.peer, tail, ty, self.collab.native.as_mut());
        } else {
            let vendor_at = at.to_string();
            self.process_vendor_specific_at(&vendor_at);
        }
    }

    /// Vendor-specific SET command; recognised prefixes are broadcast and
    /// acknowledged, everything else is an error
    pub(crate) fn process_vendor_specific_at(&mut self, at: &str) {
        match parse_vendor_set_command(at) {
            Ok(cmd) => {
                if cmd.command == "+XAPL" {
                    self.process_at_xapl(&cmd.args);
                }
                let args: Vec<String> = cmd.args.iter().map(|arg| arg.to_string()).collect();
                self.collab.service.send_notification(AgNotification::VendorCommand {
                    peer: self.peer,
                    command: cmd.command,
                    company_id: cmd.company_id,
                    args,
                });
                self.collab.native.at_response_code(self.peer, AtResponse::Ok, 0);
            }
            Err(e) => {
                tracing::debug!("{}: not a recognised vendor command ({:?})", self.peer, e);
                self.collab.native.at_response_code(self.peer, AtResponse::Error, 0);
            }
        }
    }

    /// +XAPL=<vendor-product-version>,<features> handshake; the AG
    /// advertises battery reporting only
    fn process_at_xapl(&mut self, args: &[hfpag_at::AtArg]) {
        if args.len() != 2 {
            tracing::warn!("{}: malformed +XAPL, {} args", self.peer, args.len());
            return;
        }
        if args[0].as_str().is_none() || args[1].as_int().is_none() {
            tracing::warn!("{}: malformed +XAPL argument types", self.peer);
            return;
        }
        tracing::debug!("-> {}", XAPL_REPLY);
        self.collab.native.at_response_string(self.peer, XAPL_REPLY);
    }

    /// Volume update from the peer. Applied even when the peer does not
    /// have audio focus; the mismatch is only logged.
    pub(crate) fn process_volume_event(&mut self, vol_type: VolumeType, volume: i32) {
        tracing::debug!("<- volume {:?}={}", vol_type, volume);
        let volume = volume.clamp(hfpag_core::VOLUME_MIN, hfpag_core::VOLUME_MAX);
        if self.collab.service.active_device() != Some(self.peer) {
            tracing::warn!("{}: volume event while not the active device", self.peer);
        }
        match vol_type {
            VolumeType::Speaker => {
                self.speaker_volume = volume;
                self.collab.system.set_stream_volume(volume);
            }
            VolumeType::Mic => {
                self.mic_volume = volume;
            }
        }
        self.collab.service.send_notification(AgNotification::VolumeChanged {
            peer: self.peer,
            vol_type,
            volume,
        });
    }

    /// Unsolicited vendor result code requested by the service,
    /// e.g. "+ANDROID: ..."
    pub(crate) fn process_send_vendor_result(&mut self, command: &str, arg: Option<&str>) {
        let mut response = format!("{}: ", command);
        if let Some(arg) = arg {
            response.push_str(arg);
        }
        tracing::debug!("-> {}", response);
        self.collab.native.at_response_string(self.peer, &response);
    }
}
