use core::fmt;

/// Call setup state of the (real or synthetic) telephony call picture
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HfpCallState {
    Idle,
    Incoming,
    Dialing,
    Alerting,
    Held,
    Active,
}

impl HfpCallState {
    /// CIND "callsetup" indicator value for this call state
    pub fn callsetup(&self) -> i32 {
        match self {
            HfpCallState::Incoming => 1,
            HfpCallState::Dialing => 2,
            HfpCallState::Alerting => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for HfpCallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One snapshot of the telephony call picture, as delivered by the
/// telephony subsystem or synthesized by the virtual call sub-protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub num_active: i32,
    pub num_held: i32,
    pub state: HfpCallState,
    pub number: String,
    /// Type-of-address octet, 145 for international numbers, 129 otherwise
    pub number_type: i32,
}

impl CallInfo {
    pub fn new(num_active: i32, num_held: i32, state: HfpCallState) -> Self {
        Self {
            num_active,
            num_held,
            state,
            number: String::new(),
            number_type: 0,
        }
    }

    pub fn idle() -> Self {
        Self::new(0, 0, HfpCallState::Idle)
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CallInfo(active={} held={} state={})",
            self.num_active, self.num_held, self.state
        )
    }
}

/// Network/battery status pushed to the peer via +CIEV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// Registration indicator, 0 or 1
    pub service: i32,
    /// Roaming indicator, 0 or 1
    pub roam: i32,
    /// Signal strength, 0-5
    pub signal: i32,
    /// Battery charge, 0-5
    pub battery: i32,
}

/// Volume channel selector for AT+VGS / AT+VGM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Speaker,
    Mic,
}
