use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum RocketPhase {
    #[default]
    PreLaunch,
    Boost,
    Coast,
    Descent,
    Landed,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ParachuteState {
    #[default]
    Stowed,
    Armed,
    Deployed,
}

/// One telemetry frame as delivered by a source. Never mutated after creation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TelemetrySample {
    pub timestamp_s: f64,
    pub altitude_m: f64,
    pub velocity_mps: f64,
    pub temperature_c: f64,
    pub pressure_kpa: f64,
    pub acceleration_mps2: f64,
    pub airbrake_percent: f64, // 0..100
    pub parachute_main: ParachuteState,
    pub parachute_drogue: ParachuteState,
    pub rocket_phase: RocketPhase,
}

impl TelemetrySample {
    pub fn point(&self) -> SeriesPoint {
        SeriesPoint { t: self.timestamp_s, altitude_m: self.altitude_m }
    }
}

/// Plotted subset of a sample.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct SeriesPoint {
    pub t: f64,
    pub altitude_m: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct AxisBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for AxisBounds {
    fn default() -> Self {
        Self { x_min: 0.0, x_max: 1.0, y_min: 0.0, y_max: 1.0 }
    }
}

/// Human-readable fields for the readout panel, built once per producer tick.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Readout {
    #[serde(with = "uuid::serde::simple")]
    pub session_id: Uuid,
    pub tick: u64,
    pub sample: TelemetrySample,
    pub altitude: String,
    pub velocity: String,
    pub temperature: String,
    pub pressure: String,
    pub acceleration: String,
    pub airbrake: String,
    pub elapsed: String,
    pub time_to_launch_s: f64,
    pub fps: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SeriesSnapshot {
    #[serde(default)]
    pub points: Vec<SeriesPoint>,
    pub bounds: AxisBounds,
}
