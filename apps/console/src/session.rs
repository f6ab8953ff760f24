use std::time::{Duration, Instant};

use series::SampleConsumer;
use station_ingest_core::{
    handoff, log_line, HandoffTx, IngestError, ProducerConfig, ProducerHandle, ReadoutCell,
    SampleProducer, SessionState, TelemetrySource,
};
use station_ingest_sim::{SimConfig, SimSource};

use crate::config::StationConfig;
use crate::presentation::Presentation;

pub type SourceFactory = Box<dyn FnMut() -> Box<dyn TelemetrySource>>;

/// UI-side owner of everything stateful: the session flags, the producer
/// handle, the consumer (and through it the series) and the readout bridge.
/// Lives on the single-threaded scheduler; the producer thread only sees the
/// queue sender, the readout cell and its running flag.
pub struct Station {
    session: SessionState,
    producer: Option<ProducerHandle>,
    producer_cfg: ProducerConfig,
    make_source: SourceFactory,
    tx: HandoffTx,
    consumer: SampleConsumer,
    readout: ReadoutCell,
    last_shown_tick: u64,
    log_every: Duration,
    last_log: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub connected: bool,
    pub session: String,
    pub points: usize,
    pub dropped: u64,
    pub elapsed: Option<String>,
}

impl Station {
    pub fn new(cfg: &StationConfig) -> Self {
        let sim: SimConfig = cfg.sim.clone();
        let factory: SourceFactory =
            Box::new(move || Box::new(SimSource::new(sim.clone())) as Box<dyn TelemetrySource>);
        Self::with_source(cfg, factory)
    }

    pub fn with_source(cfg: &StationConfig, make_source: SourceFactory) -> Self {
        let (tx, rx) = handoff(cfg.queue_capacity);
        Self {
            session: SessionState::new(),
            producer: None,
            producer_cfg: cfg.producer(),
            make_source,
            tx,
            consumer: SampleConsumer::new(rx, cfg.series_capacity),
            readout: ReadoutCell::new(),
            last_shown_tick: 0,
            log_every: cfg.telemetry_log_interval(),
            last_log: None,
        }
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    #[cfg(test)]
    pub fn consumer(&self) -> &SampleConsumer {
        &self.consumer
    }

    /// Connect/Disconnect button.
    pub fn toggle_connection(&mut self, ui: &mut dyn Presentation) -> Result<(), IngestError> {
        if self.session.is_connected() {
            self.disconnect(ui);
            Ok(())
        } else {
            self.connect(ui)
        }
    }

    pub fn connect(&mut self, ui: &mut dyn Presentation) -> Result<(), IngestError> {
        if self.session.is_connected() {
            return Ok(());
        }
        // one producer loop at a time: wait out the previous one's last tick
        if let Some(old) = self.producer.take() {
            old.join()?;
        }
        self.consumer.reset();
        self.readout.clear();
        self.last_shown_tick = 0;
        self.last_log = None;

        self.session.connect(Instant::now());
        let source = (self.make_source)();
        let started = SampleProducer::new(source, self.tx.clone(), self.readout.clone(), self.producer_cfg.clone())
            .start(&self.session);
        match started {
            Ok(handle) => {
                self.producer = Some(handle);
                tracing::info!(session = %self.session.id(), "connected");
                ui.append_log(log_line("Connected to rocket telemetry system."));
                Ok(())
            }
            Err(e) => {
                self.session.disconnect();
                ui.append_log(log_line(&format!("Connection failed: {}", e)));
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self, ui: &mut dyn Presentation) {
        if !self.session.disconnect() {
            return;
        }
        if let Some(handle) = &self.producer {
            handle.stop();
        }
        tracing::info!(session = %self.session.id(), dropped = self.consumer.dropped(), "disconnected");
        ui.append_log(log_line("Disconnected from rocket."));
    }

    /// Scheduler tick: drain into the chart, push the newest readout, and
    /// drop a periodic telemetry line into the operator log.
    pub fn tick(&mut self, ui: &mut dyn Presentation) {
        self.consumer.tick(&mut *ui);

        let Some(r) = self.readout.latest() else { return };
        if r.tick == self.last_shown_tick {
            return;
        }
        self.last_shown_tick = r.tick;
        ui.show_readout(&r);

        let now = Instant::now();
        let due = self.last_log.map_or(true, |t| now.duration_since(t) >= self.log_every);
        if self.session.is_connected() && due {
            self.last_log = Some(now);
            ui.append_log(log_line(&format!(
                "Telemetry updated | Alt: {:.1} m | Vel: {:.1} m/s",
                r.sample.altitude_m, r.sample.velocity_mps
            )));
        }
    }

    pub fn status(&self) -> Status {
        Status {
            connected: self.session.is_connected(),
            session: self.session.id().simple().to_string(),
            points: self.consumer.series().len(),
            dropped: self.consumer.dropped(),
            elapsed: self.readout.latest().map(|r| r.elapsed),
        }
    }

    /// Stop the producer and wait for it; used on quit.
    pub fn shutdown(&mut self, ui: &mut dyn Presentation) {
        self.disconnect(ui);
        if let Some(handle) = self.producer.take() {
            match handle.join() {
                Ok(stats) => tracing::debug!(?stats, "producer joined"),
                Err(e) => tracing::warn!(error = %e, "producer did not exit cleanly"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{AxisBounds, Readout};
    use series::{Redraw, SeriesBuffer};
    use std::thread;

    #[derive(Default)]
    struct Capture {
        logs: Vec<String>,
        readouts: usize,
        redraws: usize,
    }

    impl Redraw for Capture {
        fn redraw(&mut self, _series: &SeriesBuffer, _bounds: &AxisBounds) {
            self.redraws += 1;
        }
    }

    impl Presentation for Capture {
        fn show_readout(&mut self, _readout: &Readout) {
            self.readouts += 1;
        }
        fn append_log(&mut self, line: String) {
            self.logs.push(line);
        }
    }

    fn fast_cfg() -> StationConfig {
        let mut cfg = StationConfig { producer_rate_hz: 500.0, ..StationConfig::default() };
        cfg.sim.seed = Some(11);
        cfg
    }

    struct Broken;

    impl TelemetrySource for Broken {
        fn next_sample(&mut self, _elapsed_s: f64) -> Result<model::TelemetrySample, IngestError> {
            Err(IngestError::Msg("no carrier".into()))
        }
    }

    #[test]
    fn toggle_connects_then_disconnects() {
        let mut st = Station::new(&fast_cfg());
        let mut ui = Capture::default();

        st.toggle_connection(&mut ui).unwrap();
        assert!(st.is_connected());
        thread::sleep(Duration::from_millis(50));
        st.tick(&mut ui);
        assert!(ui.redraws >= 1);
        assert!(ui.readouts >= 1);
        assert!(st.consumer().series().len() > 0);

        st.toggle_connection(&mut ui).unwrap();
        assert!(!st.is_connected());
        st.shutdown(&mut ui);

        assert!(ui.logs[0].ends_with("Connected to rocket telemetry system."));
        assert!(ui.logs.iter().any(|l| l.contains("Telemetry updated | Alt:")));
        assert!(ui.logs.last().unwrap().ends_with("Disconnected from rocket."));
    }

    #[test]
    fn reconnect_starts_a_fresh_series() {
        let mut st = Station::new(&fast_cfg());
        let mut ui = Capture::default();

        st.connect(&mut ui).unwrap();
        thread::sleep(Duration::from_millis(30));
        st.tick(&mut ui);
        let first_session = st.status().session;
        st.disconnect(&mut ui);

        st.connect(&mut ui).unwrap();
        assert_ne!(st.status().session, first_session);
        assert!(st.consumer().series().is_empty());
        thread::sleep(Duration::from_millis(30));
        st.tick(&mut ui);
        let times: Vec<f64> = st.consumer().series().times().collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        st.shutdown(&mut ui);
    }

    #[test]
    fn idle_ticks_do_nothing() {
        let mut st = Station::new(&fast_cfg());
        let mut ui = Capture::default();
        for _ in 0..5 {
            st.tick(&mut ui);
        }
        assert_eq!((ui.redraws, ui.readouts), (0, 0));
        assert!(ui.logs.is_empty());
        assert!(!st.status().connected);
    }

    #[test]
    fn failing_source_keeps_station_alive() {
        let mut st = Station::with_source(&fast_cfg(), Box::new(|| Box::new(Broken) as Box<dyn TelemetrySource>));
        let mut ui = Capture::default();
        st.connect(&mut ui).unwrap();
        thread::sleep(Duration::from_millis(20));
        st.tick(&mut ui);
        assert_eq!(ui.redraws, 0);
        assert!(st.is_connected());
        st.shutdown(&mut ui);
        assert!(!st.is_connected());
    }
}
