//! Machine runner: per-machine mailbox, timers and the public handle
//!
//! Each machine owns one executor thread. All handlers run to completion
//! on that thread; delays exist only as timer messages the runner injects
//! when a deadline passes.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use hfpag_core::{AudioState, BdAddr, ConnectionState};
use hfpag_events::{AgMsg, TimerKind};
use std::time::Duration;

use crate::ag::peer_machine::{AgState, PeerMachine};
use crate::interfaces::Collaborators;
use hfpag_config::SharedConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerEntry {
    kind: TimerKind,
    peer: BdAddr,
    deadline: Instant,
}

/// The armed timers of one machine. At most one timer per kind; arming a
/// kind again replaces the previous deadline.
#[derive(Debug, Default)]
pub struct TimerSet {
    armed: Vec<TimerEntry>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self { armed: Vec::new() }
    }

    pub fn arm(&mut self, kind: TimerKind, peer: BdAddr, timeout: Duration) {
        self.cancel(kind);
        self.armed.push(TimerEntry {
            kind,
            peer,
            deadline: Instant::now() + timeout,
        });
    }

    /// Cancels all pending timers of the given kind. Returns whether one
    /// was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.armed.len();
        self.armed.retain(|entry| entry.kind != kind);
        self.armed.len() != before
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.iter().any(|entry| entry.kind == kind)
    }

    pub fn clear(&mut self) {
        self.armed.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.iter().map(|entry| entry.deadline).min()
    }

    /// Removes and returns all timers whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerKind, BdAddr)> {
        let mut due = Vec::new();
        self.armed.retain(|entry| {
            if entry.deadline <= now {
                due.push((entry.kind, entry.peer));
                false
            } else {
                true
            }
        });
        due
    }

    pub fn armed_kinds(&self) -> Vec<TimerKind> {
        self.armed.iter().map(|entry| entry.kind).collect()
    }
}

/// Point-in-time view of a machine, refreshed by the runner after every
/// dispatch so the service can answer getters without blocking on the
/// machine thread.
#[derive(Debug, Clone)]
pub struct MachineSnapshot {
    pub peer: BdAddr,
    pub state: AgState,
    pub prev_state: Option<AgState>,
    pub connection_state: ConnectionState,
    pub audio_state: AudioState,
    pub connecting_since: Option<Instant>,
    pub speaker_volume: i32,
    pub mic_volume: i32,
    pub virtual_call_started: bool,
    pub voice_recognition_started: bool,
    pub waiting_for_voice_recognition: bool,
    pub dialing_out: bool,
    pub armed_timers: Vec<TimerKind>,
}

impl MachineSnapshot {
    pub fn connecting_elapsed_ms(&self) -> Option<u128> {
        self.connecting_since.map(|since| since.elapsed().as_millis())
    }

    pub fn dump(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(w, "PeerMachine {} (hfpag {})", self.peer, hfpag_core::STACK_VERSION)?;
        writeln!(w, "  state: {:?} (prev: {:?})", self.state, self.prev_state)?;
        writeln!(w, "  connection: {} audio: {}", self.connection_state, self.audio_state)?;
        match self.connecting_elapsed_ms() {
            Some(ms) => writeln!(w, "  connecting_since: {} ms ago", ms)?,
            None => writeln!(w, "  connecting_since: never")?,
        }
        writeln!(w, "  speaker_volume: {} mic_volume: {}", self.speaker_volume, self.mic_volume)?;
        writeln!(
            w,
            "  flags: virtual_call={} vr_started={} vr_waiting={} dialing_out={}",
            self.virtual_call_started,
            self.voice_recognition_started,
            self.waiting_for_voice_recognition,
            self.dialing_out
        )?;
        writeln!(w, "  timers: {:?}", self.armed_timers)
    }
}

/// Owning handle of a spawned machine. Dropping the handle disconnects the
/// mailbox and joins the runner; this is how the service destroys a
/// machine whose peer unbonded.
pub struct MachineHandle {
    peer: BdAddr,
    tx: Option<Sender<AgMsg>>,
    shared: Arc<Mutex<MachineSnapshot>>,
    join: Option<JoinHandle<()>>,
}

impl MachineHandle {
    /// Creates a machine for `peer` and starts its runner thread
    pub fn spawn(peer: BdAddr, config: SharedConfig, collab: Collaborators) -> MachineHandle {
        let (tx, rx) = crossbeam_channel::unbounded();
        let machine = PeerMachine::new(peer, config, collab);
        let shared = Arc::new(Mutex::new(machine.snapshot()));
        let runner_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name(format!("hfpag-{}", peer))
            .spawn(move || run_machine(machine, rx, runner_shared))
            .expect("failed to spawn machine runner");
        Self {
            peer,
            tx: Some(tx),
            shared,
            join: Some(join),
        }
    }

    pub fn device(&self) -> BdAddr {
        self.peer
    }

    /// Enqueues a message. Returns false once the runner has stopped.
    pub fn send(&self, msg: AgMsg) -> bool {
        match &self.tx {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.snapshot().connection_state
    }

    pub fn audio_state(&self) -> AudioState {
        self.snapshot().audio_state
    }

    pub fn connecting_timestamp_ms(&self) -> Option<u128> {
        self.snapshot().connecting_elapsed_ms()
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        self.shared.lock().expect("machine snapshot lock poisoned").clone()
    }

    pub fn dump(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        self.snapshot().dump(w)
    }

    pub fn dump_string(&self) -> String {
        let mut out = String::new();
        let _ = self.dump(&mut out);
        out
    }

    /// Stops the runner and waits for it to finish
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for MachineHandle {
    fn drop(&mut self) {
        // Disconnect the mailbox, then join the runner
        self.tx.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("machine runner for {} aborted", self.peer);
            }
        }
    }
}

fn run_machine(mut machine: PeerMachine, rx: Receiver<AgMsg>, shared: Arc<Mutex<MachineSnapshot>>) {
    tracing::debug!("runner for {} starting", machine.device());
    loop {
        let msg = match machine.next_timer_deadline() {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => {
                    for (kind, peer) in machine.take_due_timers(Instant::now()) {
                        machine.dispatch(AgMsg::Timeout { kind, peer });
                    }
                    None
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };
        if let Some(msg) = msg {
            machine.dispatch(msg);
        }
        *shared.lock().expect("machine snapshot lock poisoned") = machine.snapshot();
    }
    tracing::debug!("runner for {} stopped", machine.device());
}
