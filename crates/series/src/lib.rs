//! Capped altitude history for the live chart and the UI-side drain tick.

use std::collections::VecDeque;

use model::{AxisBounds, SeriesPoint, SeriesSnapshot};
use serde_json::Value;
use station_ingest_core::HandoffRx;

pub const DEFAULT_CAPACITY: usize = 100;

/// Pad applied to an axis whose min and max coincide.
const DEGENERATE_PAD: f64 = 0.1;

/// FIFO of the most recent `capacity` points; oldest evicted first.
#[derive(Clone, Debug)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
}

impl Default for SeriesBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SeriesBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { points: VecDeque::with_capacity(capacity + 1), capacity }
    }

    /// Append, evicting from the front once over capacity. A point with a
    /// non-finite time, or older than the newest one already held, is refused
    /// so times stay non-decreasing.
    pub fn push(&mut self, p: SeriesPoint) -> bool {
        if !p.t.is_finite() {
            return false;
        }
        if let Some(last) = self.points.back() {
            if p.t < last.t {
                return false;
            }
        }
        self.points.push_back(p);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        true
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> + '_ {
        self.points.iter()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.t)
    }

    pub fn altitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.altitude_m)
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    pub fn snapshot(&self, bounds: AxisBounds) -> SeriesSnapshot {
        SeriesSnapshot { points: self.points.iter().copied().collect(), bounds }
    }
}

/// Chart limits: both axes start at 0, top out at the largest value (1 when
/// there is none), and get a small pad if the range would be zero-width.
pub fn axis_bounds(series: &SeriesBuffer) -> AxisBounds {
    let (x_min, x_max) = axis(series.times());
    let (y_min, y_max) = axis(series.altitudes());
    AxisBounds { x_min, x_max, y_min, y_max }
}

fn axis(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let min = 0.0;
    let max = values.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));
    let mut max = max.unwrap_or(1.0).max(min);
    if max == min {
        max += DEGENERATE_PAD;
    }
    (min, max)
}

/// Whatever draws the chart. Implementations update the existing line and
/// limits in place rather than rebuilding the plot.
pub trait Redraw {
    fn redraw(&mut self, series: &SeriesBuffer, bounds: &AxisBounds);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub drained: usize,
    pub rejected: usize,
}

/// UI-side half of the pipeline. Owns the series; nothing else mutates it.
pub struct SampleConsumer {
    rx: HandoffRx,
    series: SeriesBuffer,
    bounds: AxisBounds,
}

impl SampleConsumer {
    pub fn new(rx: HandoffRx, capacity: usize) -> Self {
        Self { rx, series: SeriesBuffer::with_capacity(capacity), bounds: AxisBounds::default() }
    }

    /// One scheduler tick: drain the queue, and if anything arrived recompute
    /// the bounds and ask for a redraw. Idle ticks touch nothing.
    pub fn tick<R: Redraw + ?Sized>(&mut self, surface: &mut R) -> TickReport {
        let mut report = TickReport::default();
        for p in self.rx.drain() {
            report.drained += 1;
            if !self.series.push(p) {
                report.rejected += 1;
            }
        }
        if report.drained == 0 {
            return report;
        }
        if report.rejected > 0 {
            tracing::debug!(rejected = report.rejected, "out-of-order or non-finite points refused");
        }
        self.bounds = axis_bounds(&self.series);
        surface.redraw(&self.series, &self.bounds);
        report
    }

    /// Start a fresh history: drop anything still queued from a previous
    /// session and empty the series.
    pub fn reset(&mut self) {
        let stale = self.rx.discard();
        if stale > 0 {
            tracing::debug!(stale, "discarded queued points from previous session");
        }
        self.series.clear();
        self.bounds = AxisBounds::default();
    }

    pub fn series(&self) -> &SeriesBuffer {
        &self.series
    }

    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    pub fn dropped(&self) -> u64 {
        self.rx.dropped()
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        self.series.snapshot(self.bounds)
    }
}

/// Snapshot as a JSON value, for front ends that take JSON.
pub fn snapshot_json(snapshot: &SeriesSnapshot) -> Value {
    serde_json::to_value(snapshot).unwrap_or_else(|e| {
        tracing::warn!(error = %e, points = snapshot.points.len(), "series snapshot did not serialize");
        Value::Null
    })
}
