//! Core telemetry plumbing used by the ground station: the source trait, the
//! producer loop and the bounded hand-off to the UI side.

pub mod producer;
pub mod queue;
pub mod readout;
pub mod session;

pub use model::{ParachuteState, Readout, RocketPhase, SeriesPoint, TelemetrySample};
pub use producer::{ProducerConfig, ProducerHandle, ProducerStats, SampleProducer};
pub use queue::{handoff, HandoffRx, HandoffTx};
pub use readout::{format_elapsed, log_line, tick_rate, time_to_launch, ReadoutCell};
pub use session::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Anything that can hand the producer one sample per tick: the simulator
/// today, a radio link or sensor bus in a flight build.
pub trait TelemetrySource: Send {
    fn next_sample(&mut self, elapsed_s: f64) -> Result<TelemetrySample, IngestError>;
}

impl<S: TelemetrySource + ?Sized> TelemetrySource for Box<S> {
    fn next_sample(&mut self, elapsed_s: f64) -> Result<TelemetrySample, IngestError> {
        (**self).next_sample(elapsed_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unplugged;

    impl TelemetrySource for Unplugged {
        fn next_sample(&mut self, _elapsed_s: f64) -> Result<TelemetrySample, IngestError> {
            Err(anyhow::anyhow!("serial port closed").into())
        }
    }

    #[test]
    fn source_errors_carry_their_message() {
        let mut boxed: Box<dyn TelemetrySource> = Box::new(Unplugged);
        let err = boxed.next_sample(0.0).unwrap_err();
        assert!(matches!(err, IngestError::Other(_)));
        assert_eq!(err.to_string(), "serial port closed");
        assert_eq!(IngestError::Msg("no link".into()).to_string(), "no link");
    }
}
