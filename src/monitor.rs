mod discharge_monitor;
mod discharge_state;

pub use discharge_monitor::DischargeMonitor;
pub use discharge_state::{DischargeEvent, DischargePhase, DischargeState, Health, TimedEvent};
