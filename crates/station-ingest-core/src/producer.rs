use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use uuid::Uuid;

use crate::readout::build_readout;
use crate::{HandoffTx, IngestError, ReadoutCell, SeriesPoint, SessionState, TelemetrySource};

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Fixed sleep between ticks (~16.7 ms at 60 Hz).
    pub period: Duration,
    /// Countdown origin, seconds before launch at connect time.
    pub t_minus_s: f64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self { period: Duration::from_secs_f64(1.0 / 60.0), t_minus_s: 60.0 }
    }
}

impl ProducerConfig {
    pub fn from_rate_hz(rate_hz: f64, t_minus_s: f64) -> Self {
        let period = Duration::try_from_secs_f64(1.0 / rate_hz)
            .ok()
            .filter(|p| !p.is_zero())
            .unwrap_or_else(|| Self::default().period);
        Self { period, t_minus_s }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub ticks: u64,
    pub pushed: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Sampling side of the pipeline: one sample per tick from the source, a
/// readout for the display, and the plotted pair onto the hand-off queue.
pub struct SampleProducer<S> {
    source: S,
    tx: HandoffTx,
    readout: ReadoutCell,
    cfg: ProducerConfig,
    session_id: Uuid,
    previous_elapsed_s: f64,
    last_failed: bool,
    stats: ProducerStats,
}

impl<S: TelemetrySource> SampleProducer<S> {
    pub fn new(source: S, tx: HandoffTx, readout: ReadoutCell, cfg: ProducerConfig) -> Self {
        Self {
            source,
            tx,
            readout,
            cfg,
            session_id: Uuid::nil(),
            previous_elapsed_s: 0.0,
            last_failed: false,
            stats: ProducerStats::default(),
        }
    }

    pub fn with_session_id(mut self, id: Uuid) -> Self {
        self.session_id = id;
        self
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    /// One tick at `elapsed_s` seconds into the session. A failing source
    /// means no update this tick; nothing here is fatal.
    pub fn step(&mut self, elapsed_s: f64) {
        self.stats.ticks += 1;
        let sample = match self.source.next_sample(elapsed_s) {
            Ok(s) => {
                self.last_failed = false;
                s
            }
            Err(e) => {
                self.stats.failed += 1;
                if !self.last_failed {
                    tracing::warn!(error = %e, elapsed_s, "telemetry source failed, skipping tick");
                } else {
                    tracing::debug!(error = %e, elapsed_s, "telemetry source still failing");
                }
                self.last_failed = true;
                return;
            }
        };

        // the producer's clock is the only time base; a source's own stamp is
        // kept on the sample but never plotted or displayed
        let point = SeriesPoint { t: elapsed_s, altitude_m: sample.altitude_m };
        let readout = build_readout(
            self.session_id,
            self.stats.ticks,
            sample,
            elapsed_s,
            self.cfg.t_minus_s,
            self.previous_elapsed_s,
        );
        self.previous_elapsed_s = elapsed_s;
        self.readout.publish(readout);

        if self.tx.offer(point) {
            self.stats.pushed += 1;
        } else {
            self.stats.dropped += 1;
        }
    }

    fn run(mut self, running: Arc<AtomicBool>, start: Instant) -> ProducerStats {
        tracing::info!(session = %self.session_id, period_ms = self.cfg.period.as_secs_f64() * 1000.0, "producer started");
        while running.load(Ordering::Acquire) {
            let elapsed = start.elapsed().as_secs_f64();
            self.step(elapsed);
            thread::sleep(self.cfg.period);
        }
        tracing::info!(
            session = %self.session_id,
            ticks = self.stats.ticks,
            dropped = self.stats.dropped,
            failed = self.stats.failed,
            "producer stopped"
        );
        self.stats
    }
}

impl<S: TelemetrySource + 'static> SampleProducer<S> {
    /// Spawn the sampling loop for a connected session.
    pub fn start(mut self, session: &SessionState) -> Result<ProducerHandle, IngestError> {
        let start = session
            .start_time()
            .ok_or_else(|| IngestError::Msg("session is not connected".into()))?;
        if !session.is_running() {
            return Err(IngestError::Msg("session is not running".into()));
        }
        self.session_id = session.id();
        let running = session.running_flag();
        let flag = running.clone();
        let join = thread::Builder::new()
            .name("telemetry-producer".into())
            .spawn(move || self.run(flag, start))
            .context("spawn producer thread")?;
        Ok(ProducerHandle { running, join })
    }
}

pub struct ProducerHandle {
    running: Arc<AtomicBool>,
    join: JoinHandle<ProducerStats>,
}

impl ProducerHandle {
    /// Ask the loop to end after its current tick. Does not wait.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait for the thread, which takes at most about one period.
    pub fn join(self) -> Result<ProducerStats, IngestError> {
        self.stop();
        self.join
            .join()
            .map_err(|_| IngestError::Msg("producer thread panicked".into()))
    }
}
