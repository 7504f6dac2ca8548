//! Message vocabulary of the HFP Audio Gateway control plane
//!
//! Every stimulus a per-device machine can receive is normalised into an
//! [`AgMsg`]: user requests from the service API, system events from
//! telephony/audio, up-calls from the native stack and timer expirations.
//! Outbound notification payloads live here as well so that the service
//! interface does not depend on the machine crate.

pub mod msg;
pub mod notify;
pub mod stack;

pub use msg::{AgMsg, ClccEntry, TimerKind};
pub use notify::{AgNotification, SystemActivity};
pub use stack::{AtResponse, HalAudioState, HalConnectionState, StackEvent, StackEventData, VrState};
