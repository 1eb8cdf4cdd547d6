//! Concurrent scheduling: shared state, countdown task, announce loop
//!
//! Three long-lived tasks share one [`SharedState`]: the announce loop
//! (writes records, resets the countdown), the countdown task (decrements
//! once per second), and the status renderer (reads everything). The
//! countdown is atomic; history and swarm stats sit behind their own locks.
//! Announce cycles are strictly sequential, so there is never more than one
//! in-flight tracker request.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::Result;
use crate::announce::{AnnounceEvent, AnnounceHistory, AnnounceRecord, AnnounceSession};

/// Swarm statistics from the last confirmed announce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwarmStats {
    pub seeders: u64,
    pub leechers: u64,
}

/// State shared between the announce loop, the countdown task, and the
/// status renderer. The only cross-task mutable values in the process.
#[derive(Debug, Default)]
pub struct SharedState {
    countdown: AtomicI64,
    history: parking_lot::RwLock<AnnounceHistory>,
    swarm: parking_lot::RwLock<SwarmStats>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Restarts the countdown at `secs`, on each scheduling event.
    pub fn reset_countdown(&self, secs: u64) {
        self.countdown.store(secs as i64, Ordering::SeqCst);
    }

    pub fn countdown_secs(&self) -> i64 {
        self.countdown.load(Ordering::SeqCst)
    }

    /// One second elapsed; the countdown stops at zero.
    pub fn tick(&self) {
        let _ = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                (value > 0).then(|| value - 1)
            });
    }

    pub fn push_record(&self, record: AnnounceRecord) {
        self.history.write().push(record);
    }

    pub fn latest_record(&self) -> Option<AnnounceRecord> {
        self.history.read().latest().copied()
    }

    pub fn history_snapshot(&self) -> Vec<AnnounceRecord> {
        self.history.read().iter().copied().collect()
    }

    pub fn set_swarm(&self, seeders: u64, leechers: u64) {
        *self.swarm.write() = SwarmStats { seeders, leechers };
    }

    pub fn swarm(&self) -> SwarmStats {
        *self.swarm.read()
    }
}

/// Spawns the countdown task.
///
/// Decrements the shared countdown once per second for the process
/// lifetime; there is no cancellation, the task dies with the runtime.
pub fn spawn_countdown(shared: Arc<SharedState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so each later tick
        // marks one elapsed second.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            shared.tick();
        }
    })
}

/// Drives the announce loop until an error propagates.
///
/// One `started` announce, then repeating cycles of schedule, sleep for
/// exactly the confirmed interval, announce. No network activity happens
/// while sleeping and no retry happens on failure; the error reaches the
/// caller, who decides whether the process ends.
///
/// # Errors
/// - `SpoofError::TrackerUnreachable` - An announce cycle exhausted all tiers
/// - `SpoofError::ProtocolViolation` - A tracker answered without an interval
pub async fn run(session: &mut AnnounceSession) -> Result<()> {
    session.announce(AnnounceEvent::Started).await?;
    loop {
        session.schedule_next();
        let interval = session.confirmed_interval_secs();
        tokio::time::sleep(Duration::from_secs(interval)).await;
        session.announce(AnnounceEvent::None).await?;
    }
}
