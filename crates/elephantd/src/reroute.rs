//! Elephant rerouting engine
//!
//! When a flow crosses into elephant territory the engine moves it to an
//! alternate spine uplink: strict-delete the installed rule, install a
//! replacement at a higher priority toward the alternate port, and record
//! the new port. Path narration is a side channel — whatever the topology
//! lookups conclude, the flow replacement has already been committed.

use std::sync::Arc;

use tracing::{info, warn};

use fabric_common::{DatapathHandle, DatapathId, FlowMatch, SwitchMessage};

use crate::config::ControllerConfig;
use crate::flow_table::{FlowKey, FlowTable};
use crate::forwarding::FLOW_RULE_PRIORITY;
use crate::topology::Topology;

/// Priority of replacement rules, above the forwarding path's installs so a
/// raced delete cannot leave a stale rule shadowing the replacement.
pub const REROUTE_RULE_PRIORITY: u16 = 20;

/// Alternate-port selection strategy.
///
/// Given the port a flow currently leaves through, pick where it should go
/// instead. Isolated behind a trait so the fixed toggle can later give way
/// to a load-aware or ECMP selector without touching classification.
pub trait PathSelector: Send + Sync {
    fn select(&self, dpid: DatapathId, current: Option<u32>) -> u32;
}

/// The fixed two-way toggle over the configured spine uplink pair.
///
/// Not load-aware: unknown current port maps to the first spine port, each
/// spine port maps to the other, and any non-spine port maps to the first.
/// A deterministic heuristic, documented as such.
#[derive(Debug, Clone, Copy)]
pub struct SpineToggle {
    ports: [u32; 2],
}

impl SpineToggle {
    pub fn new(ports: [u32; 2]) -> Self {
        Self { ports }
    }
}

impl PathSelector for SpineToggle {
    fn select(&self, _dpid: DatapathId, current: Option<u32>) -> u32 {
        match current {
            Some(p) if p == self.ports[0] => self.ports[1],
            Some(p) if p == self.ports[1] => self.ports[0],
            _ => self.ports[0],
        }
    }
}

/// Moves elephant flows onto an alternate spine uplink.
pub struct RerouteEngine {
    table: Arc<FlowTable>,
    selector: Box<dyn PathSelector>,
    topology: Topology,
}

impl RerouteEngine {
    pub fn new(table: Arc<FlowTable>, config: &ControllerConfig) -> Self {
        Self::with_selector(table, config, Box::new(SpineToggle::new(config.spine_ports)))
    }

    pub fn with_selector(
        table: Arc<FlowTable>,
        config: &ControllerConfig,
        selector: Box<dyn PathSelector>,
    ) -> Self {
        Self {
            table,
            selector,
            topology: Topology::from_config(config),
        }
    }

    /// Reroutes one flow. Returns the port the flow now leaves through, or
    /// `None` when the selection matched the current port and nothing was
    /// changed.
    pub fn reroute(
        &self,
        dp: &dyn DatapathHandle,
        match_fields: &FlowMatch,
        key: FlowKey,
    ) -> Option<u32> {
        let dpid = dp.id();
        let current = self.table.out_port(dpid, key);
        let alternate = self.selector.select(dpid, current);

        if current == Some(alternate) {
            return None;
        }

        // Replace the installed rule: strict delete at its install priority,
        // then the replacement toward the alternate port. Failures are
        // logged and the state update proceeds; delivery is fire-and-forget.
        if let Err(e) = dp.send(SwitchMessage::FlowDeleteStrict {
            match_fields: match_fields.clone(),
            priority: FLOW_RULE_PRIORITY,
        }) {
            warn!("Flow delete not delivered: dpid={} flow={}: {}", dpid, key, e);
        }
        if let Err(e) = dp.send(SwitchMessage::FlowAdd {
            match_fields: match_fields.clone(),
            priority: REROUTE_RULE_PRIORITY,
            out_port: alternate,
        }) {
            warn!("Flow add not delivered: dpid={} flow={}: {}", dpid, key, e);
        }
        self.table.set_out_port(dpid, key, alternate);

        info!(
            "Elephant rerouted: dpid={} flow={} out_port {:?} -> {}",
            dpid, key, current, alternate
        );

        // Side channel: narrate the path change when the topology supports
        // it. Suppression here never undoes the replacement above.
        if let Some(change) = self.topology.path_change(dpid, key, current, alternate) {
            info!("Path change: dpid={} flow={}", dpid, key);
            info!("Old path: {}", change.old_path);
            info!("New path: {}", change.new_path);
        }

        Some(alternate)
    }
}
