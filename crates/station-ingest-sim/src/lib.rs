use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use station_ingest_core::{IngestError, ParachuteState, RocketPhase, TelemetrySample, TelemetrySource};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub altitude_m: RangeInclusive<f64>,
    pub velocity_mps: RangeInclusive<f64>,
    pub temperature_c: RangeInclusive<f64>,
    pub pressure_kpa: RangeInclusive<f64>,
    pub acceleration_mps2: RangeInclusive<f64>,
    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            altitude_m: 0.0..=1000.0,
            velocity_mps: 0.0..=200.0,
            temperature_c: 10.0..=90.0,
            pressure_kpa: 90.0..=110.0,
            acceleration_mps2: -5.0..=5.0,
            seed: None,
        }
    }
}

/// Uniform noise in fixed ranges. Phase, parachutes and airbrake are
/// placeholders until a flight computer link reports them.
pub struct SimSource {
    cfg: SimConfig,
    rng: StdRng,
}

impl SimSource {
    pub fn new(cfg: SimConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, rng }
    }
}

fn draw(rng: &mut StdRng, range: &RangeInclusive<f64>) -> f64 {
    let (lo, hi) = (*range.start(), *range.end());
    if lo.is_finite() && hi.is_finite() && lo < hi {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

impl TelemetrySource for SimSource {
    fn next_sample(&mut self, elapsed_s: f64) -> Result<TelemetrySample, IngestError> {
        let (cfg, rng) = (&self.cfg, &mut self.rng);
        Ok(TelemetrySample {
            timestamp_s: elapsed_s,
            altitude_m: draw(rng, &cfg.altitude_m),
            velocity_mps: draw(rng, &cfg.velocity_mps),
            temperature_c: draw(rng, &cfg.temperature_c),
            pressure_kpa: draw(rng, &cfg.pressure_kpa),
            acceleration_mps2: draw(rng, &cfg.acceleration_mps2),
            airbrake_percent: 0.0,
            parachute_main: ParachuteState::Stowed,
            parachute_drogue: ParachuteState::Stowed,
            rocket_phase: RocketPhase::PreLaunch,
        })
    }
}
