//! Semantic shapes of the switch protocol messages.
//!
//! These are the messages the controller core consumes and produces,
//! independent of any wire encoding. A transport layer is responsible for
//! translating them to and from the actual switch protocol.

use std::fmt;
use std::net::Ipv4Addr;

use crate::packet::{MacAddr, ETH_TYPE_IPV4, IP_PROTO_UDP};

/// Flood output port.
pub const PORT_FLOOD: u32 = 0xffff_fffb;
/// Wildcard output port in delete/stats requests.
pub const PORT_ANY: u32 = 0xffff_ffff;
/// Wildcard group in delete/stats requests.
pub const GROUP_ANY: u32 = 0xffff_ffff;
/// Sentinel for "packet not buffered at the switch".
pub const NO_BUFFER: u32 = 0xffff_ffff;

/// Match fields of a flow rule.
///
/// Optional-field style mirrors the protocol: a rule matches on exactly the
/// fields that are present. The two shapes the controller installs are the
/// full UDP/IPv4 5-tuple and the learned `(in_port, eth_dst)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowMatch {
    pub in_port: Option<u32>,
    pub eth_dst: Option<MacAddr>,
    pub eth_type: Option<u16>,
    pub ip_proto: Option<u8>,
    pub ipv4_src: Option<Ipv4Addr>,
    pub ipv4_dst: Option<Ipv4Addr>,
    pub udp_src: Option<u16>,
    pub udp_dst: Option<u16>,
}

impl FlowMatch {
    /// A fully wildcarded match.
    pub fn any() -> Self {
        Self::default()
    }

    /// The UDP/IPv4 5-tuple match.
    pub fn udp_five_tuple(
        ipv4_src: Ipv4Addr,
        ipv4_dst: Ipv4Addr,
        udp_src: u16,
        udp_dst: u16,
    ) -> Self {
        Self {
            eth_type: Some(ETH_TYPE_IPV4),
            ip_proto: Some(IP_PROTO_UDP),
            ipv4_src: Some(ipv4_src),
            ipv4_dst: Some(ipv4_dst),
            udp_src: Some(udp_src),
            udp_dst: Some(udp_dst),
            ..Self::default()
        }
    }

    /// The learned-destination match used by generic MAC forwarding.
    pub fn learned(in_port: u32, eth_dst: MacAddr) -> Self {
        Self {
            in_port: Some(in_port),
            eth_dst: Some(eth_dst),
            ..Self::default()
        }
    }

    /// A destination-only match, used when flushing learned rules.
    pub fn for_eth_dst(eth_dst: MacAddr) -> Self {
        Self {
            eth_dst: Some(eth_dst),
            ..Self::default()
        }
    }

    /// True when every field of the UDP/IPv4 5-tuple is present.
    pub fn is_udp_five_tuple(&self) -> bool {
        self.eth_type == Some(ETH_TYPE_IPV4)
            && self.ip_proto == Some(IP_PROTO_UDP)
            && self.ipv4_src.is_some()
            && self.ipv4_dst.is_some()
            && self.udp_src.is_some()
            && self.udp_dst.is_some()
    }
}

/// A message from the controller to one switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchMessage {
    /// Request statistics for every installed flow: all tables, any output
    /// port or group, wildcard match. Filtering happens controller-side.
    FlowStatsRequest,

    /// Install a rule directing matching traffic to `out_port`.
    FlowAdd {
        match_fields: FlowMatch,
        priority: u16,
        out_port: u32,
    },

    /// Remove exactly the rule with this match and priority, leaving rules
    /// that overlap only partially untouched.
    FlowDeleteStrict {
        match_fields: FlowMatch,
        priority: u16,
    },

    /// Remove every rule subsumed by this match at the given priority.
    FlowDelete {
        match_fields: FlowMatch,
        priority: u16,
    },

    /// Emit a packet, either by buffer reference or with inline data.
    PacketOut {
        buffer_id: Option<u32>,
        in_port: u32,
        out_port: u32,
        data: Option<Vec<u8>>,
    },
}

/// One entry of a flow statistics reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsEntry {
    pub match_fields: FlowMatch,
    pub priority: u16,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl FlowStatsEntry {
    /// Flow age as reported by the switch, in seconds.
    pub fn duration(&self) -> f64 {
        f64::from(self.duration_sec) + f64::from(self.duration_nsec) / 1e9
    }
}

/// A flow statistics reply from one switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowStatsReply {
    pub entries: Vec<FlowStatsEntry>,
}

/// An unmatched packet punted to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub in_port: u32,
    /// Switch-side buffer reference, when the packet is buffered there.
    pub buffer_id: Option<u32>,
    pub data: Vec<u8>,
}

impl fmt::Display for FlowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_udp_five_tuple() {
            write!(
                f,
                "udp {}:{} -> {}:{}",
                self.ipv4_src.unwrap(),
                self.udp_src.unwrap(),
                self.ipv4_dst.unwrap(),
                self.udp_dst.unwrap()
            )
        } else if let Some(dst) = self.eth_dst {
            write!(f, "eth_dst {dst}")
        } else {
            write!(f, "any")
        }
    }
}
