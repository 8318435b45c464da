//! Forwarding path
//!
//! MAC learning and default rule installation for unmatched packets. This
//! sits outside the classification core; its one contract with the core is
//! seeding: when it installs the first 5-tuple rule for a flow it records
//! the chosen output port in the flow state table, so a later reroute knows
//! which uplink the flow currently uses.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use fabric_common::{
    DatapathHandle, DatapathId, FlowMatch, MacAddr, PacketIn, ParsedPacket, SwitchMessage,
    PORT_FLOOD,
};

use crate::flow_table::{FlowKey, FlowTable};

/// Priority of installed 5-tuple forwarding rules.
pub const FLOW_RULE_PRIORITY: u16 = 10;
/// Priority of generic learned-destination rules.
pub const LEARNED_RULE_PRIORITY: u16 = 1;

/// The forwarding collaborator the controller core composes with.
pub trait ForwardingPath: Send + Sync {
    /// Handles one unmatched packet punted by a switch.
    fn packet_in(&self, dp: &dyn DatapathHandle, packet: &PacketIn);

    /// Discards learned state for a switch and removes its generic rules.
    /// `dp` is absent when the switch is no longer reachable; learned state
    /// is dropped either way.
    fn flush_switch(&self, dp: Option<&dyn DatapathHandle>, dpid: DatapathId);
}

/// Per-switch MAC learning with flow-rule installation.
#[derive(Default)]
pub struct MacLearningPath {
    flows: Arc<FlowTable>,
    mac_tables: DashMap<DatapathId, HashMap<MacAddr, u32>>,
}

impl MacLearningPath {
    pub fn new(flows: Arc<FlowTable>) -> Self {
        Self {
            flows,
            mac_tables: DashMap::new(),
        }
    }

    /// The learned port for a MAC on a switch, for tests and diagnostics.
    pub fn learned_port(&self, dpid: DatapathId, mac: MacAddr) -> Option<u32> {
        self.mac_tables
            .get(&dpid)
            .and_then(|t| t.get(&mac).copied())
    }

    fn send(dp: &dyn DatapathHandle, msg: SwitchMessage) {
        if let Err(e) = dp.send(msg) {
            warn!("Forwarding message not delivered: dpid={}: {}", dp.id(), e);
        }
    }

    fn packet_out(dp: &dyn DatapathHandle, packet: &PacketIn, out_port: u32) {
        // inline the payload only when the switch did not buffer it
        let data = match packet.buffer_id {
            Some(_) => None,
            None => Some(packet.data.clone()),
        };
        Self::send(
            dp,
            SwitchMessage::PacketOut {
                buffer_id: packet.buffer_id,
                in_port: packet.in_port,
                out_port,
                data,
            },
        );
    }
}

impl ForwardingPath for MacLearningPath {
    fn packet_in(&self, dp: &dyn DatapathHandle, packet: &PacketIn) {
        let dpid = dp.id();
        let Some(parsed) = ParsedPacket::parse(&packet.data) else {
            debug!("Unparseable packet-in ignored: dpid={}", dpid);
            return;
        };

        let out_port = {
            let mut table = self.mac_tables.entry(dpid).or_default();
            table.insert(parsed.eth.src, packet.in_port);
            table.get(&parsed.eth.dst).copied().unwrap_or(PORT_FLOOD)
        };

        if let (Some(ip), Some(udp)) = (parsed.ipv4, parsed.udp) {
            let match_fields =
                FlowMatch::udp_five_tuple(ip.src, ip.dst, udp.src_port, udp.dst_port);
            if out_port != PORT_FLOOD {
                Self::send(
                    dp,
                    SwitchMessage::FlowAdd {
                        match_fields,
                        priority: FLOW_RULE_PRIORITY,
                        out_port,
                    },
                );
                let key = FlowKey::new(ip.src, ip.dst, udp.src_port, udp.dst_port);
                self.flows.seed_out_port(dpid, key, out_port);
            }
            Self::packet_out(dp, packet, out_port);
            return;
        }

        if out_port != PORT_FLOOD {
            Self::send(
                dp,
                SwitchMessage::FlowAdd {
                    match_fields: FlowMatch::learned(packet.in_port, parsed.eth.dst),
                    priority: LEARNED_RULE_PRIORITY,
                    out_port,
                },
            );
        }
        Self::packet_out(dp, packet, out_port);
    }

    fn flush_switch(&self, dp: Option<&dyn DatapathHandle>, dpid: DatapathId) {
        let Some((_, table)) = self.mac_tables.remove(&dpid) else {
            return;
        };
        debug!(
            "Flushing learned state: dpid={} macs={}",
            dpid,
            table.len()
        );
        let Some(dp) = dp else {
            return;
        };
        for mac in table.keys() {
            Self::send(
                dp,
                SwitchMessage::FlowDelete {
                    match_fields: FlowMatch::for_eth_dst(*mac),
                    priority: LEARNED_RULE_PRIORITY,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_common::ChannelDatapath;
    use std::net::Ipv4Addr;

    const DPID: DatapathId = DatapathId(1);

    const HOST_A: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x0a]);
    const HOST_B: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x0b]);

    fn udp_packet(src_mac: MacAddr, dst_mac: MacAddr) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&dst_mac.0);
        pkt.extend_from_slice(&src_mac.0);
        pkt.extend_from_slice(&0x0800u16.to_be_bytes());
        pkt.push(0x45);
        pkt.extend_from_slice(&[0; 8]);
        pkt.push(17);
        pkt.extend_from_slice(&[0, 0]);
        pkt.extend_from_slice(&[10, 0, 0, 1]);
        pkt.extend_from_slice(&[10, 0, 0, 3]);
        pkt.extend_from_slice(&6000u16.to_be_bytes());
        pkt.extend_from_slice(&6001u16.to_be_bytes());
        pkt.extend_from_slice(&[0, 8, 0, 0]);
        pkt
    }

    fn arp_packet(src_mac: MacAddr, dst_mac: MacAddr) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&dst_mac.0);
        pkt.extend_from_slice(&src_mac.0);
        pkt.extend_from_slice(&0x0806u16.to_be_bytes());
        pkt.extend_from_slice(&[0; 28]);
        pkt
    }

    fn packet_in(in_port: u32, data: Vec<u8>) -> PacketIn {
        PacketIn {
            in_port,
            buffer_id: None,
            data,
        }
    }

    #[test]
    fn test_unknown_destination_floods_without_install() {
        let path = MacLearningPath::new(Arc::new(FlowTable::new()));
        let (dp, mut rx) = ChannelDatapath::new(DPID, 8);

        path.packet_in(&dp, &packet_in(1, udp_packet(HOST_A, HOST_B)));

        assert_eq!(path.learned_port(DPID, HOST_A), Some(1));
        match rx.try_recv().unwrap() {
            SwitchMessage::PacketOut { out_port, .. } => assert_eq!(out_port, PORT_FLOOD),
            other => panic!("expected packet-out, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_known_destination_installs_and_seeds() {
        let flows = Arc::new(FlowTable::new());
        let path = MacLearningPath::new(Arc::clone(&flows));
        let (dp, mut rx) = ChannelDatapath::new(DPID, 8);

        // learn where B lives, then forward A -> B
        path.packet_in(&dp, &packet_in(2, udp_packet(HOST_B, HOST_A)));
        let _ = rx.try_recv();
        path.packet_in(&dp, &packet_in(1, udp_packet(HOST_A, HOST_B)));

        match rx.try_recv().unwrap() {
            SwitchMessage::FlowAdd {
                match_fields,
                priority,
                out_port,
            } => {
                assert!(match_fields.is_udp_five_tuple());
                assert_eq!(priority, FLOW_RULE_PRIORITY);
                assert_eq!(out_port, 2);
            }
            other => panic!("expected flow add, got {other:?}"),
        }
        match rx.try_recv().unwrap() {
            SwitchMessage::PacketOut { out_port, .. } => assert_eq!(out_port, 2),
            other => panic!("expected packet-out, got {other:?}"),
        }

        let key = FlowKey::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 3),
            6000,
            6001,
        );
        assert_eq!(flows.out_port(DPID, key), Some(2));
    }

    #[test]
    fn test_non_udp_installs_generic_rule() {
        let path = MacLearningPath::new(Arc::new(FlowTable::new()));
        let (dp, mut rx) = ChannelDatapath::new(DPID, 8);

        path.packet_in(&dp, &packet_in(2, arp_packet(HOST_B, HOST_A)));
        let _ = rx.try_recv();
        path.packet_in(&dp, &packet_in(1, arp_packet(HOST_A, HOST_B)));

        match rx.try_recv().unwrap() {
            SwitchMessage::FlowAdd {
                match_fields,
                priority,
                out_port,
            } => {
                assert_eq!(match_fields, FlowMatch::learned(1, HOST_B));
                assert_eq!(priority, LEARNED_RULE_PRIORITY);
                assert_eq!(out_port, 2);
            }
            other => panic!("expected flow add, got {other:?}"),
        }
    }

    #[test]
    fn test_flush_removes_learned_rules() {
        let path = MacLearningPath::new(Arc::new(FlowTable::new()));
        let (dp, mut rx) = ChannelDatapath::new(DPID, 8);

        path.packet_in(&dp, &packet_in(1, udp_packet(HOST_A, HOST_B)));
        let _ = rx.try_recv();

        path.flush_switch(Some(&dp), DPID);
        match rx.try_recv().unwrap() {
            SwitchMessage::FlowDelete {
                match_fields,
                priority,
            } => {
                assert_eq!(match_fields, FlowMatch::for_eth_dst(HOST_A));
                assert_eq!(priority, LEARNED_RULE_PRIORITY);
            }
            other => panic!("expected flow delete, got {other:?}"),
        }
        assert_eq!(path.learned_port(DPID, HOST_A), None);

        // second flush is a no-op
        path.flush_switch(Some(&dp), DPID);
        assert!(rx.try_recv().is_err());
    }
}
