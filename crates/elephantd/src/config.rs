//! Controller configuration
//!
//! Everything here is static for the process lifetime: classification
//! thresholds, the spine uplink pair, and the fabric topology tables
//! (host-to-edge mapping, switch-port adjacency, spanning-tree priorities).
//! Loaded from a YAML file; the defaults reproduce the reference 5-switch
//! fat-tree lab topology.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ElephantdError, Result};

/// Default statistics polling period, seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Default flow-age threshold for elephant classification, seconds.
pub const DEFAULT_DURATION_THRESHOLD_SECS: f64 = 30.0;
/// Default rate threshold for elephant classification, bits per second.
pub const DEFAULT_RATE_THRESHOLD_BPS: f64 = 5_000_000.0;

/// A half-open UDP port range, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port < self.end
    }
}

/// One static link: (switch, output port) -> neighbor switch name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdjacencyEntry {
    pub dpid: u64,
    pub port: u32,
    pub neighbor: String,
}

/// Static controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Statistics polling period, seconds
    pub poll_interval_secs: u64,

    /// Flow age above which a flow may be an elephant, seconds
    pub elephant_duration_threshold_secs: f64,

    /// Byte rate above which a flow may be an elephant, bits/sec
    pub elephant_rate_threshold_bps: f64,

    /// The two spine uplink ports reroutes toggle between
    pub spine_ports: [u32; 2],

    /// UDP ports used by the mouse traffic generator (informational only)
    pub mouse_udp_ports: PortRange,

    /// UDP ports used by the elephant traffic generator (informational only)
    pub elephant_udp_ports: PortRange,

    /// Host IP -> edge switch name
    pub host_edge: HashMap<Ipv4Addr, String>,

    /// Static (switch, port) -> neighbor links
    pub adjacency: Vec<AdjacencyEntry>,

    /// Per-switch spanning-tree bridge priority, keyed by dpid
    pub stp_priorities: HashMap<u64, u32>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let host_edge = [
            ("10.0.0.1", "s1"),
            ("10.0.0.2", "s1"),
            ("10.0.0.3", "s2"),
            ("10.0.0.4", "s2"),
            ("10.0.0.5", "s3"),
            ("10.0.0.6", "s3"),
        ]
        .into_iter()
        .map(|(ip, sw)| (ip.parse().unwrap(), sw.to_string()))
        .collect();

        let adjacency = [
            // edge uplinks
            (1, 3, "s4"),
            (1, 4, "s5"),
            (2, 3, "s4"),
            (2, 4, "s5"),
            (3, 3, "s4"),
            (3, 4, "s5"),
            // spine downlinks
            (4, 1, "s1"),
            (4, 2, "s2"),
            (4, 3, "s3"),
            (5, 1, "s1"),
            (5, 2, "s2"),
            (5, 3, "s3"),
        ]
        .into_iter()
        .map(|(dpid, port, neighbor)| AdjacencyEntry {
            dpid,
            port,
            neighbor: neighbor.to_string(),
        })
        .collect();

        let stp_priorities = [
            (1, 0x8000),
            (2, 0x9000),
            (3, 0xa000),
            (4, 0xb000),
            (5, 0xc000),
        ]
        .into_iter()
        .collect();

        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            elephant_duration_threshold_secs: DEFAULT_DURATION_THRESHOLD_SECS,
            elephant_rate_threshold_bps: DEFAULT_RATE_THRESHOLD_BPS,
            spine_ports: [3, 4],
            mouse_udp_ports: PortRange::new(5000, 5010),
            elephant_udp_ports: PortRange::new(6000, 6010),
            host_edge,
            adjacency,
            stp_priorities,
        }
    }
}

impl ControllerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Absent fields fall back to the defaults above.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ElephantdError::ConfigValidation(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.spine_ports[0] == self.spine_ports[1] {
            return Err(ElephantdError::ConfigValidation(
                "spine_ports must name two distinct ports".to_string(),
            ));
        }
        if self.elephant_rate_threshold_bps <= 0.0 {
            return Err(ElephantdError::ConfigValidation(
                "elephant_rate_threshold_bps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Spanning-tree bridge priority for a switch, if configured.
    ///
    /// Consumed by the external spanning-tree layer; the core only carries it.
    pub fn stp_priority(&self, dpid: u64) -> Option<u32> {
        self.stp_priorities.get(&dpid).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reproduces_lab_topology() {
        let config = ControllerConfig::default();

        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.spine_ports, [3, 4]);
        assert_eq!(config.host_edge.len(), 6);
        assert_eq!(
            config.host_edge.get(&"10.0.0.3".parse().unwrap()),
            Some(&"s2".to_string())
        );
        assert_eq!(config.adjacency.len(), 12);
        assert_eq!(config.stp_priority(1), Some(0x8000));
        assert_eq!(config.stp_priority(5), Some(0xc000));
        assert_eq!(config.stp_priority(9), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_port_range_contains() {
        let range = PortRange::new(5000, 5010);
        assert!(range.contains(5000));
        assert!(range.contains(5009));
        assert!(!range.contains(5010));
        assert!(!range.contains(4999));
    }

    #[test]
    fn test_validate_rejects_equal_spine_ports() {
        let config = ControllerConfig {
            spine_ports: [3, 3],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"poll_interval_secs: 2\nspine_ports: [7, 8]\n",
        )
        .unwrap();

        let config = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.spine_ports, [7, 8]);
        // untouched fields keep their defaults
        assert_eq!(config.elephant_rate_threshold_bps, 5_000_000.0);
        assert_eq!(config.host_edge.len(), 6);
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"poll_interval_secs: 0\n").unwrap();
        assert!(ControllerConfig::load(file.path()).is_err());
    }
}
