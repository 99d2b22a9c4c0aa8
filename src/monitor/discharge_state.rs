use std::fmt;
use std::time::{Duration, Instant};

/// Phase of the discharge state machine, without its bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DischargePhase {
    #[default]
    Idle,
    Discharging,
}

/// Discharge state owned by the monitor.
///
/// The bookkeeping only exists while discharging, so an idle monitor has no
/// start time and no teeth count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DischargeState {
    #[default]
    Idle,
    Discharging {
        started_at: Instant,
        started_frame: u64,
        max_teeth_seen: u32,
    },
}

impl DischargeState {
    pub fn phase(&self) -> DischargePhase {
        match self {
            Self::Idle => DischargePhase::Idle,
            Self::Discharging { .. } => DischargePhase::Discharging,
        }
    }

    pub fn max_teeth_seen(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Discharging { max_teeth_seen, .. } => *max_teeth_seen,
        }
    }
}

/// Persisted verdict shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Health {
    /// No discharge has completed yet
    #[default]
    Checking,
    Healthy,
    /// Peak teeth count of the last complete discharge was too low
    Warning(u32),
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "checking"),
            Self::Healthy => write!(f, "healthy"),
            Self::Warning(teeth) => write!(f, "warning: only {} teeth visible", teeth),
        }
    }
}

/// Something the monitor wants the operator to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeEvent {
    Entered,
    /// The discharge lasted long enough and re-classified health
    Completed { teeth: u32, health: Health },
    /// The discharge ended too early; health was left alone
    Incomplete { teeth: u32 },
}

impl fmt::Display for DischargeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entered => write!(f, "entered discharge"),
            Self::Completed { teeth, .. } => write!(f, "discharge complete, teeth={}", teeth),
            Self::Incomplete { teeth } => write!(f, "discharge incomplete, teeth={}", teeth),
        }
    }
}

/// An event stamped with when it was emitted, so a display can apply its
/// own time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub event: DischargeEvent,
    pub emitted_at: Instant,
}

impl TimedEvent {
    pub fn new(event: DischargeEvent, emitted_at: Instant) -> Self {
        Self { event, emitted_at }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Instant::now(), ttl)
    }

    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.emitted_at) < ttl
    }
}
