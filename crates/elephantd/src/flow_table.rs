//! Flow state table
//!
//! Per (switch, 5-tuple) record of the last observed byte count, the current
//! mouse/elephant classification, and the installed output port. The byte
//! baseline, the classification, and the output port have independent
//! lifecycles: the forwarding path seeds an output port before any sample
//! exists, and a flow's first statistics sample only establishes a baseline.

use std::fmt;
use std::net::Ipv4Addr;

use dashmap::DashMap;

use fabric_common::{DatapathId, FlowMatch};

/// Identity of one UDP/IPv4 flow. Unique per switch, not globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub fn new(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, src_port: u16, dst_port: u16) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
        }
    }

    /// Derives the key from a match, when the match carries a full
    /// UDP/IPv4 5-tuple. Generic rules yield `None`.
    pub fn from_match(m: &FlowMatch) -> Option<Self> {
        if !m.is_udp_five_tuple() {
            return None;
        }
        Some(Self {
            src_ip: m.ipv4_src?,
            dst_ip: m.ipv4_dst?,
            src_port: m.udp_src?,
            dst_port: m.udp_dst?,
        })
    }

    /// The exact match that identifies this flow at the switch.
    pub fn to_match(self) -> FlowMatch {
        FlowMatch::udp_five_tuple(self.src_ip, self.dst_ip, self.src_port, self.dst_port)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port
        )
    }
}

/// Classification of one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowClass {
    /// No decision yet; a flow with only its baseline sample stays here.
    #[default]
    Unclassified,
    Mouse,
    Elephant,
}

impl FlowClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowClass::Unclassified => "unclassified",
            FlowClass::Mouse => "mouse",
            FlowClass::Elephant => "elephant",
        }
    }
}

/// State tracked per (switch, flow key).
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// Byte counter from the most recent sample. `None` until the first
    /// sample arrives, even when an output port has already been seeded.
    pub last_byte_count: Option<u64>,
    pub class: FlowClass,
    /// The output port of the currently installed rule, when known.
    pub out_port: Option<u32>,
}

/// Outcome of folding one statistics sample into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// First sample for this key: baseline recorded, nothing to classify.
    Baseline,
    /// Delta against the previous sample. Counter regressions (rule
    /// reinstalls reset hardware counters) clamp to zero.
    Delta {
        delta_bytes: u64,
        prev_class: FlowClass,
    },
}

/// Concurrent per-(switch, flow) state table.
#[derive(Default)]
pub struct FlowTable {
    flows: DashMap<(DatapathId, FlowKey), FlowState>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a byte-count sample into the table.
    ///
    /// Creates the entry on first sight. Updates `last_byte_count`
    /// unconditionally; the returned outcome tells the classifier whether a
    /// baseline was just established or a delta is available.
    pub fn sample(&self, dpid: DatapathId, key: FlowKey, byte_count: u64) -> SampleOutcome {
        let mut entry = self.flows.entry((dpid, key)).or_default();
        match entry.last_byte_count.replace(byte_count) {
            None => SampleOutcome::Baseline,
            Some(last) => SampleOutcome::Delta {
                delta_bytes: byte_count.saturating_sub(last),
                prev_class: entry.class,
            },
        }
    }

    /// Latches a new classification.
    pub fn set_class(&self, dpid: DatapathId, key: FlowKey, class: FlowClass) {
        self.flows.entry((dpid, key)).or_default().class = class;
    }

    pub fn class_of(&self, dpid: DatapathId, key: FlowKey) -> Option<FlowClass> {
        self.flows.get(&(dpid, key)).map(|e| e.class)
    }

    /// The currently installed output port for a flow, when known.
    pub fn out_port(&self, dpid: DatapathId, key: FlowKey) -> Option<u32> {
        self.flows.get(&(dpid, key)).and_then(|e| e.out_port)
    }

    /// Records the output port chosen by a reroute.
    pub fn set_out_port(&self, dpid: DatapathId, key: FlowKey, port: u32) {
        self.flows.entry((dpid, key)).or_default().out_port = Some(port);
    }

    /// Seeds the output port from the forwarding path's initial rule
    /// install. Keeps an already known port — the forwarding path must not
    /// clobber a reroute.
    pub fn seed_out_port(&self, dpid: DatapathId, key: FlowKey, port: u32) {
        let mut entry = self.flows.entry((dpid, key)).or_default();
        if entry.out_port.is_none() {
            entry.out_port = Some(port);
        }
    }

    /// Drops all state for one switch.
    pub fn remove_datapath(&self, dpid: DatapathId) {
        self.flows.retain(|(id, _), _| *id != dpid);
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
