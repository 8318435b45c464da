//! Controller event enum.
//!
//! Every inbound signal the controller reacts to, in one place. The daemon
//! consumes these from a single queue in arrival order, which is what keeps
//! per-flow processing serialized.

use std::sync::Arc;

use crate::datapath::{DatapathHandle, DatapathId};
use crate::message::{FlowStatsReply, PacketIn};

/// An inbound controller event.
pub enum Event {
    /// A switch connection reached the operational state.
    Connected {
        dpid: DatapathId,
        handle: Arc<dyn DatapathHandle>,
    },

    /// A switch connection went away.
    Disconnected { dpid: DatapathId },

    /// A flow statistics reply arrived.
    FlowStats {
        dpid: DatapathId,
        reply: FlowStatsReply,
    },

    /// An unmatched packet was punted to the controller.
    PacketIn { dpid: DatapathId, packet: PacketIn },

    /// Spanning-tree recomputation invalidated learned state for a switch.
    TopologyChange { dpid: DatapathId },
}

impl Event {
    /// The switch this event concerns.
    pub fn dpid(&self) -> DatapathId {
        match self {
            Event::Connected { dpid, .. }
            | Event::Disconnected { dpid }
            | Event::FlowStats { dpid, .. }
            | Event::PacketIn { dpid, .. }
            | Event::TopologyChange { dpid } => *dpid,
        }
    }

    /// Short event-kind label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Connected { .. } => "connected",
            Event::Disconnected { .. } => "disconnected",
            Event::FlowStats { .. } => "flow-stats",
            Event::PacketIn { .. } => "packet-in",
            Event::TopologyChange { .. } => "topology-change",
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind())
            .field("dpid", &self.dpid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_dpid_and_kind() {
        let ev = Event::Disconnected {
            dpid: DatapathId(2),
        };
        assert_eq!(ev.dpid(), DatapathId(2));
        assert_eq!(ev.kind(), "disconnected");
    }
}
