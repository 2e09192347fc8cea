use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use serde_derive::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::config::Subnet;
use crate::diff;
use crate::leases::{self, LeaseRecord};

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
pub enum ReparseError {
    ReadError(std::io::Error),
}

impl std::fmt::Display for ReparseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &*self {
            ReparseError::ReadError(err) => write!(f, "Failed reading lease file: {}", err),
        }
    }
}

impl From<std::io::Error> for ReparseError {
    fn from(error: std::io::Error) -> Self {
        ReparseError::ReadError(error)
    }
}

/// The full active-lease set at one parse instant.
///
/// Snapshots are immutable once published; readers get clones, never a
/// reference into the store.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub leases: HashMap<Ipv4Addr, LeaseRecord>,
    pub used_count: usize,
    #[serde(with = "serde_millis")]
    pub updated_at: SystemTime,
}

/// Pool-level metadata handed to notification consumers after each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMeta {
    pub used_count: usize,
    pub pool_size: u32,
    #[serde(with = "serde_millis")]
    pub updated_at: SystemTime,
}

/// Outcome of one reparse cycle. `changed` is `None` on the first cycle,
/// when there is no previous snapshot to compare against.
#[derive(Debug, Clone)]
pub struct ReparseEvent {
    pub meta: SnapshotMeta,
    pub changed: Option<Vec<LeaseRecord>>,
}

/// Read-only view of the engine, for hosting collaborators.
pub trait AbstractEngine: Send + Sync {
    fn current_snapshot(&self) -> Option<Snapshot>;
    fn subnet(&self) -> Subnet;
    fn meta(&self) -> Option<SnapshotMeta>;
}

/// Owns the lease snapshots and drives reparse cycles.
///
/// The current and previous snapshots are swapped atomically, so a reader
/// always observes a complete snapshot; the previous one is retained for
/// exactly one cycle to diff against, then discarded.
pub struct Engine {
    lease_path: PathBuf,
    subnet: Subnet,
    current: ArcSwapOption<Snapshot>,
    previous: ArcSwapOption<Snapshot>,
    events: broadcast::Sender<ReparseEvent>,
    logger: slog::Logger,
}

impl Engine {
    pub fn create(lease_path: PathBuf, subnet: Subnet, logger: slog::Logger) -> Engine {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Engine {
            lease_path,
            subnet,
            current: ArcSwapOption::from(None),
            previous: ArcSwapOption::from(None),
            events,
            logger,
        }
    }

    /// Registers a notification consumer. Every successful cycle emits one
    /// `ReparseEvent` to all subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<ReparseEvent> {
        self.events.subscribe()
    }

    pub fn subnet(&self) -> &Subnet {
        &self.subnet
    }

    pub fn current_snapshot(&self) -> Option<Snapshot> {
        self.current.load_full().map(|snapshot| (*snapshot).clone())
    }

    pub fn previous_snapshot(&self) -> Option<Snapshot> {
        self.previous
            .load_full()
            .map(|snapshot| (*snapshot).clone())
    }

    pub fn meta(&self) -> Option<SnapshotMeta> {
        self.current.load_full().map(|snapshot| SnapshotMeta {
            used_count: snapshot.used_count,
            pool_size: self.subnet.pool_size,
            updated_at: snapshot.updated_at,
        })
    }

    /// Runs one reparse cycle: read the lease file, rebuild the active
    /// snapshot, swap it in, diff against the displaced snapshot and
    /// notify subscribers.
    ///
    /// Cycles must not overlap; `run` serializes them through its trigger
    /// queue. An unreadable lease file aborts the cycle and leaves the
    /// stored snapshots untouched; a readable file with no lease blocks is
    /// a valid empty snapshot.
    pub async fn reparse(&self) -> Result<SnapshotMeta, ReparseError> {
        let text = tokio::fs::read_to_string(&self.lease_path).await?;
        let records = leases::parse(&text);
        let active = leases::active_leases(&records);

        let snapshot = Arc::new(Snapshot {
            used_count: active.len(),
            leases: active,
            updated_at: SystemTime::now(),
        });
        let meta = SnapshotMeta {
            used_count: snapshot.used_count,
            pool_size: self.subnet.pool_size,
            updated_at: snapshot.updated_at,
        };

        let displaced = self.current.swap(Some(Arc::clone(&snapshot)));
        let changed = displaced
            .as_ref()
            .map(|previous| diff::changed_leases(previous, &snapshot));
        self.previous.store(displaced);

        info!(
            self.logger,
            "Reparse complete: {} of {} leased",
            meta.used_count,
            meta.pool_size
        );
        let event = ReparseEvent {
            meta: meta.clone(),
            changed,
        };
        if self.events.send(event).is_err() {
            debug!(self.logger, "No reparse subscribers");
        }

        Ok(meta)
    }

    /// Single worker draining the trigger queue, one cycle at a time.
    ///
    /// File-change signals arrive in bursts during a dhcpd rewrite; the
    /// bounded queue coalesces them and this loop guarantees exactly one
    /// reparse in flight. Failed cycles are logged and the loop keeps
    /// going with the last-known-good snapshot in place.
    pub async fn run(self: Arc<Self>, mut triggers: mpsc::Receiver<()>) {
        while let Some(()) = triggers.recv().await {
            if let Err(err) = self.reparse().await {
                warn!(self.logger, "Reparse cycle failed: {}", err);
            }
        }
        debug!(self.logger, "Trigger channel closed");
    }
}

impl AbstractEngine for Engine {
    fn current_snapshot(&self) -> Option<Snapshot> {
        Engine::current_snapshot(self)
    }

    fn subnet(&self) -> Subnet {
        self.subnet.clone()
    }

    fn meta(&self) -> Option<SnapshotMeta> {
        Engine::meta(self)
    }
}
