use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::SeriesPoint;

/// Producer half of the hand-off queue. Never blocks.
#[derive(Clone)]
pub struct HandoffTx {
    tx: Sender<SeriesPoint>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half of the hand-off queue. Never blocks.
pub struct HandoffRx {
    rx: Receiver<SeriesPoint>,
    dropped: Arc<AtomicU64>,
}

/// Bounded single-producer/single-consumer FIFO between the sampling thread
/// and the UI tick. `capacity` must be at least 1.
pub fn handoff(capacity: usize) -> (HandoffTx, HandoffRx) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        HandoffTx { tx, dropped: dropped.clone() },
        HandoffRx { rx, dropped },
    )
}

impl HandoffTx {
    /// Returns false when the point was dropped (queue full or consumer gone).
    pub fn offer(&self, point: SeriesPoint) -> bool {
        match self.tx.try_send(point) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(t = point.t, "hand-off queue full, sample dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}

impl HandoffRx {
    /// Everything queued right now, oldest first. Stops at the first empty poll.
    pub fn drain(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.rx.try_iter()
    }

    /// Throw away whatever is queued, returning how many points were discarded.
    pub fn discard(&self) -> usize {
        self.drain().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Total points dropped by the producer side because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
