//! Datapath registry
//!
//! Tracks the set of currently connected switches. The event-dispatch task
//! registers and unregisters on connection state changes; the stats poller
//! snapshots the active set every tick. Both run concurrently, so the map
//! is a concurrent one and `active()` hands out an owned snapshot.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use fabric_common::{DatapathHandle, DatapathId};

/// The set of currently connected switches.
#[derive(Default)]
pub struct DatapathRegistry {
    datapaths: DashMap<DatapathId, Arc<dyn DatapathHandle>>,
}

impl DatapathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites the entry for a switch. Idempotent: re-registering
    /// a known switch replaces the handle without complaint.
    pub fn register(&self, handle: Arc<dyn DatapathHandle>) {
        let dpid = handle.id();
        if self.datapaths.insert(dpid, handle).is_none() {
            info!("Datapath registered: dpid={}", dpid);
        }
    }

    /// Removes the entry for a switch; no-op when it was never registered.
    ///
    /// Statistics requests already in flight for the switch are left alone;
    /// their replies are discarded when they find no registry entry.
    pub fn unregister(&self, dpid: DatapathId) -> Option<Arc<dyn DatapathHandle>> {
        let removed = self.datapaths.remove(&dpid).map(|(_, dp)| dp);
        if removed.is_some() {
            info!("Datapath unregistered: dpid={}", dpid);
        }
        removed
    }

    /// The handle for one switch, if connected.
    pub fn get(&self, dpid: DatapathId) -> Option<Arc<dyn DatapathHandle>> {
        self.datapaths.get(&dpid).map(|e| Arc::clone(e.value()))
    }

    /// True when the switch is currently registered.
    pub fn contains(&self, dpid: DatapathId) -> bool {
        self.datapaths.contains_key(&dpid)
    }

    /// Snapshot of every registered handle.
    pub fn active(&self) -> Vec<Arc<dyn DatapathHandle>> {
        self.datapaths
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.datapaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datapaths.is_empty()
    }
}
