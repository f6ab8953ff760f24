use std::sync::Arc;

use parking_lot::Mutex;
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

use crate::{Readout, TelemetrySample};

/// `MM:SS.T`, tenths truncated. Negative input renders as zero.
pub fn format_elapsed(elapsed_s: f64) -> String {
    let tenths = if elapsed_s.is_finite() && elapsed_s > 0.0 {
        (elapsed_s * 10.0).floor() as u64
    } else {
        0
    };
    let minutes = tenths / 600;
    let seconds = (tenths % 600) / 10;
    format!("{:02}:{:02}.{}", minutes, seconds, tenths % 10)
}

/// Instantaneous tick rate between two elapsed stamps; 0 when the delta is
/// zero, negative or not a number.
pub fn tick_rate(previous_s: f64, current_s: f64) -> f64 {
    let dt = current_s - previous_s;
    if dt.is_finite() && dt > 0.0 {
        1.0 / dt
    } else {
        0.0
    }
}

/// Countdown to ignition. Goes negative after T-0 and is never clamped.
pub fn time_to_launch(t_minus_s: f64, elapsed_s: f64) -> f64 {
    t_minus_s - elapsed_s
}

/// `[HH:MM:SS] message` stamped with local wall time (UTC if the local offset
/// can't be determined).
pub fn log_line(message: &str) -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    stamp(now, message)
}

fn stamp(at: OffsetDateTime, message: &str) -> String {
    let hms = at
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".into());
    format!("[{}] {}", hms, message)
}

pub(crate) fn build_readout(
    session_id: Uuid,
    tick: u64,
    sample: TelemetrySample,
    elapsed_s: f64,
    t_minus_s: f64,
    previous_elapsed_s: f64,
) -> Readout {
    Readout {
        session_id,
        tick,
        altitude: format!("{:.2}", sample.altitude_m),
        velocity: format!("{:.2}", sample.velocity_mps),
        temperature: format!("{:.2}", sample.temperature_c),
        pressure: format!("{:.2}", sample.pressure_kpa),
        acceleration: format!("{:.2}", sample.acceleration_mps2),
        airbrake: format!("{:.0}%", sample.airbrake_percent),
        elapsed: format_elapsed(elapsed_s),
        time_to_launch_s: time_to_launch(t_minus_s, elapsed_s),
        fps: tick_rate(previous_elapsed_s, elapsed_s),
        sample,
    }
}

/// Latest readout published by the producer. Readers always see a whole
/// value: writes replace the slot under the lock, reads clone it out.
#[derive(Clone, Default)]
pub struct ReadoutCell {
    slot: Arc<Mutex<Option<Readout>>>,
}

impl ReadoutCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, readout: Readout) {
        *self.slot.lock() = Some(readout);
    }

    pub fn latest(&self) -> Option<Readout> {
        self.slot.lock().clone()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParachuteState, RocketPhase};
    use time::macros::datetime;

    fn sample(t: f64) -> TelemetrySample {
        TelemetrySample {
            timestamp_s: t,
            altitude_m: 123.456,
            velocity_mps: 9.999,
            temperature_c: 21.0,
            pressure_kpa: 101.325,
            acceleration_mps2: -1.5,
            airbrake_percent: 0.0,
            parachute_main: ParachuteState::Stowed,
            parachute_drogue: ParachuteState::Stowed,
            rocket_phase: RocketPhase::PreLaunch,
        }
    }

    #[test]
    fn elapsed_truncates_tenths() {
        assert_eq!(format_elapsed(75.34), "01:15.3");
        assert_eq!(format_elapsed(0.05), "00:00.0");
        assert_eq!(format_elapsed(59.99), "00:59.9");
        assert_eq!(format_elapsed(600.0), "10:00.0");
        assert_eq!(format_elapsed(-3.0), "00:00.0");
    }

    #[test]
    fn tick_rate_guards_degenerate_deltas() {
        assert_eq!(tick_rate(1.0, 1.0), 0.0);
        assert_eq!(tick_rate(2.0, 1.0), 0.0);
        assert_eq!(tick_rate(0.0, f64::NAN), 0.0);
        assert!((tick_rate(1.0, 1.5) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn countdown_goes_negative() {
        assert_eq!(time_to_launch(60.0, 10.0), 50.0);
        assert_eq!(time_to_launch(60.0, 75.0), -15.0);
    }

    #[test]
    fn log_line_shape() {
        let line = stamp(datetime!(2024-05-01 07:08:09 UTC), "Connected");
        assert_eq!(line, "[07:08:09] Connected");
        assert!(log_line("hi").ends_with("] hi"));
    }

    #[test]
    fn readout_formats_two_decimals() {
        let r = build_readout(Uuid::nil(), 3, sample(75.34), 75.34, 60.0, 75.24);
        assert_eq!(r.altitude, "123.46");
        assert_eq!(r.velocity, "10.00");
        assert_eq!(r.acceleration, "-1.50");
        assert_eq!(r.airbrake, "0%");
        assert_eq!(r.elapsed, "01:15.3");
        assert!((r.time_to_launch_s + 15.34).abs() < 1e-9);
        assert!((r.fps - 10.0).abs() < 1e-6);
    }

    #[test]
    fn cell_holds_latest_whole_value() {
        let cell = ReadoutCell::new();
        assert!(cell.latest().is_none());
        cell.publish(build_readout(Uuid::nil(), 1, sample(1.0), 1.0, 60.0, 0.0));
        cell.publish(build_readout(Uuid::nil(), 2, sample(2.0), 2.0, 60.0, 1.0));
        assert_eq!(cell.latest().map(|r| r.tick), Some(2));
        cell.clear();
        assert!(cell.latest().is_none());
    }
}
