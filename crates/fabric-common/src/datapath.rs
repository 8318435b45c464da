//! Datapath identifiers and send handles.
//!
//! A datapath is one connected switch. The controller core never talks to
//! the wire directly; it holds a [`DatapathHandle`] per switch and hands it
//! messages to deliver. Sends are non-blocking: a handle either queues the
//! message or reports failure, it never suspends the caller.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::message::SwitchMessage;

/// Unique identifier of a connected switch.
///
/// Rendered as the conventional 16-hex-digit zero-padded form
/// (e.g. `0000000000000001`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DatapathId(pub u64);

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for DatapathId {
    fn from(id: u64) -> Self {
        DatapathId(id)
    }
}

/// Error returned when a message could not be handed to a datapath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The outbound queue is full; the message was dropped.
    #[error("datapath send queue full")]
    Full,

    /// The datapath connection is gone.
    #[error("datapath disconnected")]
    Closed,
}

/// Send handle for one connected switch.
///
/// Implementations must be safe to share across the event-dispatch task and
/// the stats poller. `send` must not block.
pub trait DatapathHandle: Send + Sync {
    /// The switch this handle delivers to.
    fn id(&self) -> DatapathId;

    /// Queues a message for delivery. Fire-and-forget: delivery is not
    /// acknowledged and failures surface only as the returned error.
    fn send(&self, msg: SwitchMessage) -> Result<(), SendError>;
}

/// A [`DatapathHandle`] backed by a bounded channel.
///
/// The transport side owns the receiving end and drains it onto the wire.
/// Tests use the receiver directly to observe what the core sent.
#[derive(Debug, Clone)]
pub struct ChannelDatapath {
    id: DatapathId,
    tx: mpsc::Sender<SwitchMessage>,
}

impl ChannelDatapath {
    /// Creates a handle and its outbound receiver.
    pub fn new(id: DatapathId, capacity: usize) -> (Self, mpsc::Receiver<SwitchMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { id, tx }, rx)
    }

    /// Creates a shared handle, for callers that want the trait object form.
    pub fn shared(
        id: DatapathId,
        capacity: usize,
    ) -> (Arc<dyn DatapathHandle>, mpsc::Receiver<SwitchMessage>) {
        let (dp, rx) = Self::new(id, capacity);
        (Arc::new(dp), rx)
    }
}

impl DatapathHandle for ChannelDatapath {
    fn id(&self) -> DatapathId {
        self.id
    }

    fn send(&self, msg: SwitchMessage) -> Result<(), SendError> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}
