//! Raw packet header parsing for packet-in payloads.
//!
//! Only the headers the controller cares about: Ethernet, IPv4, UDP.
//! Parsing is lenient by contract — a truncated or non-matching packet
//! yields `None` at the relevant layer and the caller falls back to
//! generic forwarding.

use std::fmt;
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

/// Ethertype of IPv4.
pub const ETH_TYPE_IPV4: u16 = 0x0800;
/// IP protocol number of UDP.
pub const IP_PROTO_UDP: u8 = 17;

const ETH_HEADER_LEN: usize = 14;
const UDP_HEADER_LEN: usize = 8;

/// A MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Parsed Ethernet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub eth_type: u16,
}

impl EthernetFrame {
    /// Parses the Ethernet header, returning it and the payload slice.
    pub fn parse(data: &[u8]) -> Option<(EthernetFrame, &[u8])> {
        if data.len() < ETH_HEADER_LEN {
            return None;
        }
        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&data[0..6]);
        src.copy_from_slice(&data[6..12]);
        let eth_type = BigEndian::read_u16(&data[12..14]);
        Some((
            EthernetFrame {
                dst: MacAddr(dst),
                src: MacAddr(src),
                eth_type,
            },
            &data[ETH_HEADER_LEN..],
        ))
    }
}

/// Parsed IPv4 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Parses an IPv4 header, returning it and the layer-4 payload.
    pub fn parse(data: &[u8]) -> Option<(Ipv4Header, &[u8])> {
        if data.len() < 20 {
            return None;
        }
        let version = data[0] >> 4;
        if version != 4 {
            return None;
        }
        let ihl = (data[0] & 0x0f) as usize * 4;
        if ihl < 20 || data.len() < ihl {
            return None;
        }
        let protocol = data[9];
        let src = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let dst = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
        Some((Ipv4Header { protocol, src, dst }, &data[ihl..]))
    }
}

/// Parsed UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

impl UdpHeader {
    pub fn parse(data: &[u8]) -> Option<UdpHeader> {
        if data.len() < UDP_HEADER_LEN {
            return None;
        }
        Some(UdpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
        })
    }
}

/// The header stack of one packet-in payload.
///
/// `ipv4` and `udp` are populated only when the outer layers carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket {
    pub eth: EthernetFrame,
    pub ipv4: Option<Ipv4Header>,
    pub udp: Option<UdpHeader>,
}

impl ParsedPacket {
    /// Parses as deep as the packet allows. Returns `None` only when even
    /// the Ethernet header is unreadable.
    pub fn parse(data: &[u8]) -> Option<ParsedPacket> {
        let (eth, l3) = EthernetFrame::parse(data)?;
        let mut parsed = ParsedPacket {
            eth,
            ipv4: None,
            udp: None,
        };
        if eth.eth_type != ETH_TYPE_IPV4 {
            return Some(parsed);
        }
        let Some((ip, l4)) = Ipv4Header::parse(l3) else {
            return Some(parsed);
        };
        parsed.ipv4 = Some(ip);
        if ip.protocol == IP_PROTO_UDP {
            parsed.udp = UdpHeader::parse(l4);
        }
        Some(parsed)
    }

    /// True when the packet is a UDP/IPv4 datagram with parseable ports.
    pub fn is_udp_ipv4(&self) -> bool {
        self.ipv4.is_some() && self.udp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp_packet(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16) -> Vec<u8> {
        let mut pkt = Vec::new();
        pkt.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // dst mac
        pkt.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]); // src mac
        pkt.extend_from_slice(&ETH_TYPE_IPV4.to_be_bytes());
        // minimal IPv4 header, ihl=5
        pkt.push(0x45);
        pkt.extend_from_slice(&[0; 8]);
        pkt.push(IP_PROTO_UDP);
        pkt.extend_from_slice(&[0, 0]); // checksum
        pkt.extend_from_slice(&src);
        pkt.extend_from_slice(&dst);
        pkt.extend_from_slice(&sport.to_be_bytes());
        pkt.extend_from_slice(&dport.to_be_bytes());
        pkt.extend_from_slice(&[0, 8, 0, 0]); // udp len + checksum
        pkt
    }

    #[test]
    fn test_parse_udp_packet() {
        let pkt = udp_packet([10, 0, 0, 1], [10, 0, 0, 3], 5000, 6000);
        let parsed = ParsedPacket::parse(&pkt).unwrap();

        assert!(parsed.is_udp_ipv4());
        let ip = parsed.ipv4.unwrap();
        assert_eq!(ip.src, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ip.dst, Ipv4Addr::new(10, 0, 0, 3));
        let udp = parsed.udp.unwrap();
        assert_eq!(udp.src_port, 5000);
        assert_eq!(udp.dst_port, 6000);
    }

    #[test]
    fn test_parse_non_ip_stops_at_ethernet() {
        let mut pkt = udp_packet([10, 0, 0, 1], [10, 0, 0, 3], 1, 2);
        pkt[12] = 0x08;
        pkt[13] = 0x06; // ARP
        let parsed = ParsedPacket::parse(&pkt).unwrap();
        assert!(parsed.ipv4.is_none());
        assert!(!parsed.is_udp_ipv4());
    }

    #[test]
    fn test_parse_truncated_returns_none() {
        assert!(ParsedPacket::parse(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_truncated_l4_is_not_udp() {
        let pkt = udp_packet([10, 0, 0, 1], [10, 0, 0, 3], 5000, 6000);
        // cut into the UDP header
        let parsed = ParsedPacket::parse(&pkt[..ETH_HEADER_LEN + 20 + 2]).unwrap();
        assert!(parsed.ipv4.is_some());
        assert!(parsed.udp.is_none());
    }

    #[test]
    fn test_mac_display() {
        let mac = MacAddr([0, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(mac.to_string(), "00:11:22:33:44:55");
    }
}
