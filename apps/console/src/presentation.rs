use std::io::Write;
use std::time::{Duration, Instant};

use model::{AxisBounds, Readout};
use series::{Redraw, SeriesBuffer};

/// Everything the station pushes at a display: readouts, operator log lines
/// and chart redraws. Only ever called from the UI tick.
pub trait Presentation: Redraw {
    fn show_readout(&mut self, readout: &Readout);
    fn append_log(&mut self, line: String);
}

/// Plain terminal front end. Log lines go straight out; the readout panel and
/// chart summary are repainted at most once per `refresh`.
pub struct ConsolePresentation<W: Write> {
    out: W,
    json: bool,
    refresh: Duration,
    last_panel: Option<Instant>,
    last_chart: Option<Instant>,
    write_failed: bool,
}

impl<W: Write> ConsolePresentation<W> {
    pub fn new(out: W, refresh: Duration, json: bool) -> Self {
        Self { out, json, refresh, last_panel: None, last_chart: None, write_failed: false }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn due(last: &mut Option<Instant>, refresh: Duration) -> bool {
        let now = Instant::now();
        match last {
            Some(t) if now.duration_since(*t) < refresh => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            if !self.write_failed {
                tracing::warn!(error = %e, "console write failed");
            }
            self.write_failed = true;
        }
    }
}

pub fn render_panel(r: &Readout) -> String {
    format!(
        "{} | T-minus {:.1}s | Alt {} m | Vel {} m/s | Temp {} °C | Press {} kPa | Accel {} m/s² | Airbrake {} | Main {:?} | Drogue {:?} | {:?} | {:.1} Hz",
        r.elapsed,
        r.time_to_launch_s,
        r.altitude,
        r.velocity,
        r.temperature,
        r.pressure,
        r.acceleration,
        r.airbrake,
        r.sample.parachute_main,
        r.sample.parachute_drogue,
        r.sample.rocket_phase,
        r.fps,
    )
}

pub fn render_chart(series: &SeriesBuffer, bounds: &AxisBounds) -> String {
    let last = series
        .last()
        .map(|p| format!("{:.1} m @ {:.1}s", p.altitude_m, p.t))
        .unwrap_or_else(|| "-".into());
    format!(
        "chart: {} pts | x [{:.1}, {:.1}] s | y [{:.1}, {:.1}] m | last {}",
        series.len(),
        bounds.x_min,
        bounds.x_max,
        bounds.y_min,
        bounds.y_max,
        last
    )
}

impl<W: Write> Redraw for ConsolePresentation<W> {
    fn redraw(&mut self, series: &SeriesBuffer, bounds: &AxisBounds) {
        if !Self::due(&mut self.last_chart, self.refresh) {
            return;
        }
        let line = if self.json {
            series::snapshot_json(&series.snapshot(*bounds)).to_string()
        } else {
            render_chart(series, bounds)
        };
        self.emit(&line);
    }
}

impl<W: Write> Presentation for ConsolePresentation<W> {
    fn show_readout(&mut self, readout: &Readout) {
        if self.json || !Self::due(&mut self.last_panel, self.refresh) {
            return;
        }
        let panel = render_panel(readout);
        self.emit(&panel);
    }

    fn append_log(&mut self, line: String) {
        if self.json {
            tracing::info!("{}", line);
            return;
        }
        self.emit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{SeriesPoint, SeriesSnapshot};

    fn text(p: ConsolePresentation<Vec<u8>>) -> String {
        String::from_utf8(p.into_inner()).unwrap()
    }

    #[test]
    fn log_lines_pass_through() {
        let mut p = ConsolePresentation::new(Vec::new(), Duration::from_secs(1), false);
        p.append_log("[00:00:01] System initialized. Waiting for connection...".into());
        assert_eq!(text(p), "[00:00:01] System initialized. Waiting for connection...\n");
    }

    #[test]
    fn chart_repaint_is_throttled() {
        let mut p = ConsolePresentation::new(Vec::new(), Duration::from_secs(60), false);
        let mut s = SeriesBuffer::default();
        s.push(SeriesPoint { t: 1.0, altitude_m: 250.0 });
        let b = series::axis_bounds(&s);
        p.redraw(&s, &b);
        p.redraw(&s, &b);
        let out = text(p);
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("1 pts"));
        assert!(out.contains("last 250.0 m @ 1.0s"));
    }

    #[test]
    fn json_mode_emits_snapshot() {
        let mut p = ConsolePresentation::new(Vec::new(), Duration::ZERO, true);
        let mut s = SeriesBuffer::default();
        s.push(SeriesPoint { t: 0.0, altitude_m: 0.0 });
        p.redraw(&s, &series::axis_bounds(&s));
        let out = text(p);
        let snap: SeriesSnapshot = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(snap.points.len(), 1);
        assert_eq!(snap.bounds.x_max, 0.1);
    }
}
