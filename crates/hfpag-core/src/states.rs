use core::fmt;

/// Signalling-level connection state as exposed to the service and its
/// listeners. The machine-internal state set is finer grained; it collapses
/// onto these four values for broadcasts and getters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionState::Connecting => write!(f, "CONNECTING"),
            ConnectionState::Connected => write!(f, "CONNECTED"),
            ConnectionState::Disconnecting => write!(f, "DISCONNECTING"),
        }
    }
}

/// SCO audio state as exposed to the service and its listeners.
/// There is no public "disconnecting" audio value; the machine maps its
/// audio-disconnecting state onto `Connected` until the link is down.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AudioState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for AudioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioState::Disconnected => write!(f, "AUDIO_DISCONNECTED"),
            AudioState::Connecting => write!(f, "AUDIO_CONNECTING"),
            AudioState::Connected => write!(f, "AUDIO_CONNECTED"),
        }
    }
}
