//! elephantd - Elephant-Flow Rerouting Controller
//!
//! Control-plane logic for a fixed fat-tree-like switch fabric: polls
//! per-flow statistics from connected switches, classifies UDP/IPv4 flows
//! as mice or elephants from duration and byte rate, and moves
//! newly-detected elephants onto an alternate spine uplink.

pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod flow_table;
pub mod forwarding;
pub mod poller;
pub mod registry;
pub mod reroute;
pub mod topology;

pub use classifier::{ClassOutcome, Classifier, RerouteTrigger};
pub use config::{AdjacencyEntry, ControllerConfig, PortRange};
pub use controller::ElephantController;
pub use error::{ElephantdError, Result};
pub use flow_table::{FlowClass, FlowKey, FlowState, FlowTable, SampleOutcome};
pub use forwarding::{
    ForwardingPath, MacLearningPath, FLOW_RULE_PRIORITY, LEARNED_RULE_PRIORITY,
};
pub use poller::StatsPoller;
pub use registry::DatapathRegistry;
pub use reroute::{PathSelector, RerouteEngine, SpineToggle, REROUTE_RULE_PRIORITY};
pub use topology::{PathChange, Topology};
