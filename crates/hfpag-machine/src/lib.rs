//! Per-device control plane of the HFP Audio Gateway
//!
//! One [`PeerMachine`] manages a single remote handsfree peer through its
//! connection lifecycle (RFCOMM/SLC), its SCO audio lifecycle and the AT
//! dialog that runs on top. Machines are driven by a serial event queue;
//! every handler runs to completion before the next message is delivered.

#![allow(dead_code)]

pub mod ag;
pub mod interfaces;
pub mod runtime;

pub use ag::peer_machine::{AgState, Handled, PeerMachine};
pub use interfaces::{AgService, Collaborators, NativeInterface, PhonebookInterface, SystemInterface};
pub use runtime::{MachineHandle, MachineSnapshot, TimerSet};
