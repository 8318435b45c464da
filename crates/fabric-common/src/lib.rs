//! Shared types for the fabric controller.
//!
//! This crate carries everything the controller daemons and their
//! collaborators agree on: datapath identifiers and send handles, the
//! semantic shapes of the switch protocol messages, raw packet header
//! parsing for packet-in payloads, and the controller event enum.
//!
//! Wire encoding/decoding of the switch protocol is deliberately out of
//! scope; a transport layer translates between these shapes and the wire.

pub mod datapath;
pub mod event;
pub mod message;
pub mod packet;

pub use datapath::{ChannelDatapath, DatapathHandle, DatapathId, SendError};
pub use event::Event;
pub use message::{
    FlowMatch, FlowStatsEntry, FlowStatsReply, PacketIn, SwitchMessage, GROUP_ANY, NO_BUFFER,
    PORT_ANY, PORT_FLOOD,
};
pub use packet::{EthernetFrame, Ipv4Header, MacAddr, ParsedPacket, UdpHeader};
