//! Controller core
//!
//! One object owns all mutable controller state — registry, flow table,
//! classifier, rerouting engine, forwarding path — and dispatches inbound
//! events to it. Events are consumed from a single queue in arrival order,
//! which serializes all per-flow processing; the stats poller is the only
//! other task touching the shared maps, and those are concurrency-safe.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fabric_common::Event;

use crate::classifier::Classifier;
use crate::config::ControllerConfig;
use crate::flow_table::FlowTable;
use crate::forwarding::{ForwardingPath, MacLearningPath};
use crate::registry::DatapathRegistry;
use crate::reroute::{PathSelector, RerouteEngine};

/// The elephant-flow controller core.
pub struct ElephantController {
    config: ControllerConfig,
    registry: Arc<DatapathRegistry>,
    flows: Arc<FlowTable>,
    classifier: Classifier,
    reroute: RerouteEngine,
    forwarding: Box<dyn ForwardingPath>,
}

impl ElephantController {
    pub fn new(config: ControllerConfig) -> Self {
        let flows = Arc::new(FlowTable::new());
        let reroute = RerouteEngine::new(Arc::clone(&flows), &config);
        Self::assemble(config, flows, reroute)
    }

    /// Builds a controller with a custom path-selection strategy.
    pub fn with_selector(config: ControllerConfig, selector: Box<dyn PathSelector>) -> Self {
        let flows = Arc::new(FlowTable::new());
        let reroute = RerouteEngine::with_selector(Arc::clone(&flows), &config, selector);
        Self::assemble(config, flows, reroute)
    }

    fn assemble(config: ControllerConfig, flows: Arc<FlowTable>, reroute: RerouteEngine) -> Self {
        let registry = Arc::new(DatapathRegistry::new());
        let classifier = Classifier::new(Arc::clone(&flows), &config);
        let forwarding = Box::new(MacLearningPath::new(Arc::clone(&flows)));
        Self {
            config,
            registry,
            flows,
            classifier,
            reroute,
            forwarding,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DatapathRegistry> {
        &self.registry
    }

    pub fn flows(&self) -> &Arc<FlowTable> {
        &self.flows
    }

    /// Dispatches one inbound event.
    pub fn handle_event(&self, event: Event) {
        match event {
            Event::Connected { handle, .. } => {
                self.registry.register(handle);
            }
            Event::Disconnected { dpid } => {
                self.registry.unregister(dpid);
                self.flows.remove_datapath(dpid);
            }
            Event::FlowStats { dpid, reply } => {
                // a reply can outlive its switch; drop it on the floor
                let Some(dp) = self.registry.get(dpid) else {
                    debug!("Stats reply for unregistered switch discarded: dpid={}", dpid);
                    return;
                };
                for trigger in self.classifier.process_reply(dpid, &reply) {
                    self.reroute
                        .reroute(dp.as_ref(), &trigger.match_fields, trigger.key);
                }
            }
            Event::PacketIn { dpid, packet } => {
                let Some(dp) = self.registry.get(dpid) else {
                    debug!("Packet-in for unregistered switch discarded: dpid={}", dpid);
                    return;
                };
                self.forwarding.packet_in(dp.as_ref(), &packet);
            }
            Event::TopologyChange { dpid } => {
                let dp = self.registry.get(dpid);
                self.forwarding.flush_switch(dp.as_deref(), dpid);
            }
        }
    }

    /// Consumes events until the queue closes or shutdown is requested.
    pub async fn run(&self, mut events: mpsc::Receiver<Event>, cancel: CancellationToken) {
        info!(
            "Controller core started: poll={}s duration_threshold={}s rate_threshold={}bps",
            self.config.poll_interval_secs,
            self.config.elephant_duration_threshold_secs,
            self.config.elephant_rate_threshold_bps
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Controller core stopped");
                    return;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        debug!("Event: {:?}", event);
                        self.handle_event(event);
                    }
                    None => {
                        info!("Event stream closed; controller core stopped");
                        return;
                    }
                },
            }
        }
    }
}
