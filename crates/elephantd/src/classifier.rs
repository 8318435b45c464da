//! Flow classification state machine
//!
//! Consumes flow statistics replies and decides, per flow, whether the flow
//! is a mouse or an elephant. The rule is duration AND rate: a flow older
//! than the duration threshold whose byte rate over the last poll interval
//! exceeds the rate threshold is an elephant, everything else is a mouse.
//! Classifications latch — a repeated identical decision is silent — and the
//! rerouting trigger fires exactly when a flow that was not an elephant
//! becomes one.

use std::sync::Arc;

use tracing::{debug, info};

use fabric_common::{DatapathId, FlowMatch, FlowStatsEntry, FlowStatsReply};

use crate::config::ControllerConfig;
use crate::flow_table::{FlowClass, FlowKey, FlowTable, SampleOutcome};

/// Outcome of classifying one statistics entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassOutcome {
    /// Entry does not describe a UDP/IPv4 5-tuple rule; ignored.
    Skipped,
    /// First sample for this flow; baseline recorded, nothing classified.
    Baseline,
    /// Classification re-confirmed; no transition, no log.
    Unchanged(FlowClass),
    /// Classification changed and was latched.
    Changed { from: FlowClass, to: FlowClass },
}

/// A mouse-to-elephant transition the rerouting engine must act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerouteTrigger {
    pub key: FlowKey,
    /// The match of the installed rule, for the strict delete.
    pub match_fields: FlowMatch,
}

/// The duration/rate classifier.
pub struct Classifier {
    table: Arc<FlowTable>,
    poll_interval_secs: f64,
    duration_threshold_secs: f64,
    rate_threshold_bps: f64,
}

impl Classifier {
    pub fn new(table: Arc<FlowTable>, config: &ControllerConfig) -> Self {
        Self {
            table,
            poll_interval_secs: config.poll_interval_secs as f64,
            duration_threshold_secs: config.elephant_duration_threshold_secs,
            rate_threshold_bps: config.elephant_rate_threshold_bps,
        }
    }

    /// Processes every entry of a statistics reply.
    ///
    /// Returns the transitions that must be rerouted, in entry order.
    pub fn process_reply(&self, dpid: DatapathId, reply: &FlowStatsReply) -> Vec<RerouteTrigger> {
        let mut triggers = Vec::new();
        for entry in &reply.entries {
            let outcome = self.classify_entry(dpid, entry);
            if let ClassOutcome::Changed {
                to: FlowClass::Elephant,
                ..
            } = outcome
            {
                // `Changed` implies the previous class was not elephant, so
                // this is exactly the (unclassified|mouse) -> elephant edge.
                if let Some(key) = FlowKey::from_match(&entry.match_fields) {
                    triggers.push(RerouteTrigger {
                        key,
                        match_fields: entry.match_fields.clone(),
                    });
                }
            }
        }
        triggers
    }

    /// Classifies a single statistics entry.
    pub fn classify_entry(&self, dpid: DatapathId, entry: &FlowStatsEntry) -> ClassOutcome {
        let Some(key) = FlowKey::from_match(&entry.match_fields) else {
            return ClassOutcome::Skipped;
        };

        let (delta_bytes, prev_class) = match self.table.sample(dpid, key, entry.byte_count) {
            SampleOutcome::Baseline => {
                debug!("Baseline recorded: dpid={} flow={}", dpid, key);
                return ClassOutcome::Baseline;
            }
            SampleOutcome::Delta {
                delta_bytes,
                prev_class,
            } => (delta_bytes, prev_class),
        };

        let rate_bps = delta_bytes as f64 * 8.0 / self.poll_interval_secs;
        let duration = entry.duration();

        let is_elephant =
            duration > self.duration_threshold_secs && rate_bps > self.rate_threshold_bps;
        let new_class = if is_elephant {
            FlowClass::Elephant
        } else {
            FlowClass::Mouse
        };

        if new_class == prev_class {
            return ClassOutcome::Unchanged(new_class);
        }

        self.table.set_class(dpid, key, new_class);
        info!(
            "Flow classified: dpid={} flow={} duration={:.1}s rate={:.2}Mbps class={}",
            dpid,
            key,
            duration,
            rate_bps / 1e6,
            new_class.as_str()
        );

        ClassOutcome::Changed {
            from: prev_class,
            to: new_class,
        }
    }
}
