use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

/// Connection state of one ground-station session.
///
/// `running` is shared with the producer thread; everything else is only
/// touched from the UI side. Each connect mints a fresh flag so a producer
/// still finishing its last tick can never be revived by a later session.
#[derive(Debug)]
pub struct SessionState {
    id: Uuid,
    connected: bool,
    running: Arc<AtomicBool>,
    start_time: Option<Instant>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::nil(),
            connected: false,
            running: Arc::new(AtomicBool::new(false)),
            start_time: None,
        }
    }

    /// disconnected -> connected+running. Returns false if already connected.
    pub fn connect(&mut self, now: Instant) -> bool {
        if self.connected {
            return false;
        }
        self.id = Uuid::new_v4();
        self.connected = true;
        self.running = Arc::new(AtomicBool::new(true));
        self.start_time = Some(now);
        true
    }

    /// connected+running -> disconnected. Returns false if already disconnected.
    pub fn disconnect(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.connected = false;
        self.running.store(false, Ordering::Release);
        true
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// Handle the producer polls at the top of every tick.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
