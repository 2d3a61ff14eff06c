//! # JSON-Lines Event Log
//!
//! The durable [`EventLog`] used by the binary: one JSON-encoded
//! [`FactEvent`] per line, appended and flushed before subscribers hear
//! about it. The whole file is read back on open so the engine can build its
//! index from it.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use strand_core::{EventId, EventLog, FactEvent, StrandError, Subscriber, SubscriptionId};

/// Maximum size of an event file accepted on open (512 MB).
const MAX_LOG_FILE_SIZE: u64 = 512 * 1024 * 1024;

struct LogState {
    file: File,
    events: Vec<FactEvent>,
    ids: BTreeSet<EventId>,
}

/// Append-only fact log backed by a `.jsonl` file.
pub struct JsonlLog {
    path: PathBuf,
    /// Held from write to last notification so delivery follows file order.
    append_order: Mutex<()>,
    state: RwLock<LogState>,
    subscribers: RwLock<BTreeMap<SubscriptionId, Subscriber>>,
    next_subscription: AtomicU64,
}

impl JsonlLog {
    /// Open `path`, creating it if it does not exist, and load every event
    /// already recorded in it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StrandError> {
        let path = path.as_ref().to_path_buf();
        let (events, ids) = if path.exists() {
            load(&path)?
        } else {
            (Vec::new(), BTreeSet::new())
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StrandError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), events = events.len(), "event log opened");

        Ok(Self {
            path,
            append_order: Mutex::new(()),
            state: RwLock::new(LogState { file, events, ids }),
            subscribers: RwLock::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().events.is_empty()
    }
}

/// Read and validate every line of an existing log file.
fn load(path: &Path) -> Result<(Vec<FactEvent>, BTreeSet<EventId>), StrandError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StrandError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_LOG_FILE_SIZE {
        return Err(StrandError::Io(format!(
            "Event log {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_LOG_FILE_SIZE
        )));
    }

    let file = File::open(path)
        .map_err(|e| StrandError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

    let mut events = Vec::new();
    let mut ids = BTreeSet::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StrandError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: FactEvent = serde_json::from_str(&line).map_err(|e| {
            StrandError::Serialization(format!("{}:{}: {}", path.display(), number + 1, e))
        })?;
        event.validate()?;
        if !ids.insert(event.id.clone()) {
            tracing::warn!(line = number + 1, event = %event.id, "duplicate event id skipped");
            continue;
        }
        events.push(event);
    }
    Ok((events, ids))
}

impl std::fmt::Debug for JsonlLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlLog")
            .field("path", &self.path)
            .field("events", &self.len())
            .finish()
    }
}

impl EventLog for JsonlLog {
    fn append(&self, event: FactEvent) -> Result<(), StrandError> {
        let reject = |reason: String| StrandError::Ingestion {
            operation: "append".to_string(),
            reason,
        };
        event.validate().map_err(|e| reject(e.to_string()))?;
        let line = serde_json::to_string(&event)?;

        let _order = self.append_order.lock();
        {
            let mut state = self.state.write();
            if state.ids.contains(&event.id) {
                return Err(reject(format!("duplicate event id {}", event.id)));
            }
            writeln!(state.file, "{line}")
                .and_then(|()| state.file.flush())
                .map_err(|e| reject(format!("write to {} failed: {}", self.path.display(), e)))?;
            state.ids.insert(event.id.clone());
            state.events.push(event.clone());
        }

        let subscribers: Vec<Subscriber> = self.subscribers.read().values().cloned().collect();
        for subscriber in subscribers {
            subscriber(&event);
        }
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<FactEvent>, StrandError> {
        Ok(self.state.read().events.clone())
    }

    fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().insert(id, callback);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().remove(&id);
    }
}

// =============================================================================
// TESTS
// =============================================================================
