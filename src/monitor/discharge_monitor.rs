//! Hysteresis state machine classifying bucket discharge cycles.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{ConfigError, MonitorConfig};
use crate::monitor::discharge_state::{DischargeEvent, DischargePhase, DischargeState, Health};

/// Tracks `Idle ⇄ Discharging` from per-frame bucket and teeth areas.
///
/// A discharge starts when the bucket area rises strictly above the enter
/// threshold and ends when it falls strictly below the exit threshold. The
/// exit always returns to `Idle`; the health verdict is only re-classified
/// when the discharge lasted `min_discharge_seconds` or
/// `min_discharge_frames`.
///
/// Driven by exactly one caller. Wrap it in a lock before sharing.
#[derive(Debug, Clone)]
pub struct DischargeMonitor {
    config: MonitorConfig,
    state: DischargeState,
    health: Health,
    frame: u64,
    last_event: Option<DischargeEvent>,
}

impl DischargeMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: DischargeState::Idle,
            health: Health::Checking,
            frame: 0,
            last_event: None,
        })
    }

    /// Feed one frame's observation, timestamped now.
    pub fn update(&mut self, bucket_area: f32, teeth_areas: &[f32]) -> Option<DischargeEvent> {
        self.update_at(Instant::now(), bucket_area, teeth_areas)
    }

    /// Feed one frame's observation taken at `now`.
    ///
    /// `bucket_area` is 0 when no bucket was detected. Returns the event
    /// emitted by this frame, if any.
    pub fn update_at(
        &mut self,
        now: Instant,
        bucket_area: f32,
        teeth_areas: &[f32],
    ) -> Option<DischargeEvent> {
        self.frame += 1;
        let bucket_area = sanitize_area(bucket_area);

        let event = match self.state {
            DischargeState::Idle => {
                if bucket_area > self.config.enter_area_threshold {
                    self.state = DischargeState::Discharging {
                        started_at: now,
                        started_frame: self.frame,
                        max_teeth_seen: 0,
                    };
                    info!(frame = self.frame, bucket_area, "entered discharge");
                    Some(DischargeEvent::Entered)
                } else {
                    None
                }
            }
            DischargeState::Discharging {
                started_at,
                started_frame,
                max_teeth_seen,
            } => {
                let teeth_count = self.count_teeth(teeth_areas);
                let max_teeth_seen = max_teeth_seen.max(teeth_count);
                debug!(
                    frame = self.frame,
                    bucket_area, teeth_count, max_teeth_seen, "discharging"
                );

                if bucket_area < self.config.exit_area_threshold {
                    let elapsed_seconds = now.saturating_duration_since(started_at).as_secs_f64();
                    let elapsed_frames = self.frame - started_frame;
                    self.state = DischargeState::Idle;
                    Some(self.finish(elapsed_seconds, elapsed_frames, max_teeth_seen))
                } else {
                    self.state = DischargeState::Discharging {
                        started_at,
                        started_frame,
                        max_teeth_seen,
                    };
                    None
                }
            }
        };

        if event.is_some() {
            self.last_event = event;
        }
        event
    }

    fn count_teeth(&self, teeth_areas: &[f32]) -> u32 {
        teeth_areas
            .iter()
            .filter(|&&a| sanitize_area(a) > self.config.tooth_area_threshold)
            .count() as u32
    }

    fn finish(&mut self, elapsed_seconds: f64, elapsed_frames: u64, teeth: u32) -> DischargeEvent {
        let duration_ok = elapsed_seconds >= self.config.min_discharge_seconds
            || elapsed_frames >= self.config.min_discharge_frames;

        if !duration_ok {
            info!(
                elapsed_seconds,
                elapsed_frames, teeth, "discharge too short, health unchanged"
            );
            return DischargeEvent::Incomplete { teeth };
        }

        self.health = if teeth < self.config.tooth_min_count {
            warn!(
                teeth,
                required = self.config.tooth_min_count,
                "discharge complete with missing teeth"
            );
            Health::Warning(teeth)
        } else {
            info!(elapsed_seconds, elapsed_frames, teeth, "discharge complete");
            Health::Healthy
        };

        DischargeEvent::Completed {
            teeth,
            health: self.health,
        }
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn phase(&self) -> DischargePhase {
        self.state.phase()
    }

    pub fn state(&self) -> &DischargeState {
        &self.state
    }

    pub fn is_discharging(&self) -> bool {
        self.phase() == DischargePhase::Discharging
    }

    /// Number of `update` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// The most recent event, kept until cleared.
    pub fn last_event(&self) -> Option<DischargeEvent> {
        self.last_event
    }

    pub fn clear_event(&mut self) {
        self.last_event = None;
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

/// Areas are never negative; a negative or non-finite value is a bug
/// upstream. Clamp it in release builds.
fn sanitize_area(area: f32) -> f32 {
    debug_assert!(
        area.is_finite() && area >= 0.0,
        "invalid area passed to discharge monitor: {area}"
    );
    if area.is_finite() && area > 0.0 {
        area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor() -> DischargeMonitor {
        DischargeMonitor::new(MonitorConfig::default()).unwrap()
    }

    fn teeth(n: usize) -> Vec<f32> {
        vec![3000.0; n]
    }

    #[test]
    fn test_starts_idle_and_checking() {
        let m = monitor();
        assert_eq!(m.phase(), DischargePhase::Idle);
        assert_eq!(m.health(), Health::Checking);
        assert_eq!(m.frame_count(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MonitorConfig {
            enter_area_threshold: 1000.0,
            exit_area_threshold: 2000.0,
            ..MonitorConfig::default()
        };
        assert!(DischargeMonitor::new(config).is_err());
    }

    #[test]
    fn test_enter_requires_strictly_greater_area() {
        let mut m = monitor();
        let t0 = Instant::now();
        assert_eq!(m.update_at(t0, 165_000.0, &[]), None);
        assert_eq!(m.phase(), DischargePhase::Idle);
        assert_eq!(
            m.update_at(t0, 165_001.0, &[]),
            Some(DischargeEvent::Entered)
        );
        assert!(m.is_discharging());
    }

    #[test]
    fn test_no_reentry_while_discharging() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        for _ in 0..5 {
            assert_eq!(m.update_at(t0, 300_000.0, &[]), None);
        }
        assert!(m.is_discharging());
    }

    #[test]
    fn test_dip_inside_band_keeps_discharging() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        m.update_at(t0, 140_000.0, &teeth(4));
        m.update_at(t0, 113_000.0, &teeth(2));
        assert!(m.is_discharging());
        assert_eq!(m.state().max_teeth_seen(), 4);
    }

    #[test]
    fn test_entry_frame_does_not_count_teeth() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &teeth(9));
        assert_eq!(m.state().max_teeth_seen(), 0);
    }

    #[test]
    fn test_teeth_at_threshold_not_counted() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        m.update_at(t0, 200_000.0, &[2600.0, 2600.5, 100.0]);
        assert_eq!(m.state().max_teeth_seen(), 1);
    }

    #[test]
    fn test_exit_frame_counts_teeth() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        let event = m.update_at(t0 + Duration::from_secs(3), 0.0, &teeth(5));
        assert_eq!(
            event,
            Some(DischargeEvent::Completed {
                teeth: 5,
                health: Health::Healthy
            })
        );
    }

    #[test]
    fn test_frame_minimum_alone_completes() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        for _ in 0..59 {
            m.update_at(t0, 200_000.0, &teeth(2));
        }
        // 60 frames after entry, no time has passed.
        let event = m.update_at(t0, 0.0, &[]);
        assert_eq!(
            event,
            Some(DischargeEvent::Completed {
                teeth: 2,
                health: Health::Warning(2)
            })
        );
        assert_eq!(m.health(), Health::Warning(2));
    }

    #[test]
    fn test_incomplete_keeps_previous_health() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        m.update_at(t0 + Duration::from_secs(3), 0.0, &teeth(6));
        assert_eq!(m.health(), Health::Healthy);

        let t1 = t0 + Duration::from_secs(10);
        m.update_at(t1, 200_000.0, &[]);
        let event = m.update_at(t1 + Duration::from_millis(500), 0.0, &teeth(1));
        assert_eq!(event, Some(DischargeEvent::Incomplete { teeth: 1 }));
        assert_eq!(m.health(), Health::Healthy);
        assert_eq!(m.phase(), DischargePhase::Idle);
    }

    #[test]
    fn test_last_event_sticky_until_cleared() {
        let mut m = monitor();
        let t0 = Instant::now();
        m.update_at(t0, 200_000.0, &[]);
        m.update_at(t0, 200_000.0, &[]);
        assert_eq!(m.last_event(), Some(DischargeEvent::Entered));
        m.clear_event();
        assert_eq!(m.last_event(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid area")]
    fn test_negative_area_panics_in_debug() {
        let mut m = monitor();
        m.update(-5.0, &[]);
    }
}
