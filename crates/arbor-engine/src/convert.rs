// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Adapter from a host framework's network shape to the internal model.
//!
//! Host graphs carry per-node `Threshold` (required), `Leak` and `Delay`
//! (optional), per-edge `Weight` (required) and `Delay` (optional), plus
//! optional input/output channel assignments. Values arrive as doubles and
//! are rounded into the device's integer domain; anything outside the
//! processor's configured ranges is rejected before loading.

use serde::{Deserialize, Serialize};

use arbor_neural::{ArborError, Network, Result};

use crate::processor::ProcessorConfig;

/// One node of a host network.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HostNode {
    pub id: u32,
    pub threshold: f64,
    #[serde(default)]
    pub leak: Option<f64>,
    /// Axonal delay.
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub input_id: Option<u32>,
    #[serde(default)]
    pub output_id: Option<u32>,
}

/// One edge of a host network.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HostEdge {
    pub from: u32,
    pub to: u32,
    pub weight: f64,
    /// Synaptic delay.
    #[serde(default)]
    pub delay: Option<f64>,
}

/// A host framework's network, field-for-field convertible to [`Network`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HostNetwork {
    pub nodes: Vec<HostNode>,
    pub edges: Vec<HostEdge>,
    #[serde(default)]
    pub soft_reset: bool,
}

/// Convert a host network into the internal representation, validating
/// every value against the processor's configured ranges.
pub fn host_to_internal(host: &HostNetwork, cfg: &ProcessorConfig) -> Result<Network> {
    let mut net = Network::new();
    net.soft_reset = host.soft_reset;
    net.max_thresh = cfg.max_threshold as u16;

    for node in &host.nodes {
        let threshold = bounded(
            "Threshold",
            node.threshold,
            cfg.min_threshold as i64,
            cfg.max_threshold as i64,
        )? as i16;
        let leak = match node.leak {
            Some(l) => bounded("Leak", l, cfg.min_leak as i64, cfg.max_leak as i64)? as i8,
            None => -1,
        };
        let delay = match node.delay {
            Some(d) => bounded(
                "Delay",
                d,
                cfg.min_axon_delay as i64,
                cfg.max_axon_delay as i64,
            )? as u8,
            None => 0,
        };
        net.add_neuron(node.id, threshold, leak, delay)?;

        if let Some(input) = node.input_id {
            net.set_input(node.id, input as usize)?;
        }
        if let Some(output) = node.output_id {
            net.set_output(node.id, output as usize)?;
        }
    }

    for edge in &host.edges {
        let weight = bounded(
            "Weight",
            edge.weight,
            cfg.min_weight as i64,
            cfg.max_weight as i64,
        )? as i16;
        let delay = match edge.delay {
            Some(d) => bounded(
                "Delay",
                d,
                cfg.min_synapse_delay as i64,
                cfg.max_synapse_delay as i64,
            )? as u8,
            None => 0,
        };
        net.add_synapse(edge.from, edge.to, weight, delay)?;
    }

    Ok(net)
}

fn bounded(name: &'static str, value: f64, min: i64, max: i64) -> Result<i64> {
    let rounded = value.round() as i64;
    if rounded < min || rounded > max {
        return Err(ArborError::InvalidParameter {
            name,
            value: rounded,
            min,
            max,
        });
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ProcessorConfig {
        ProcessorConfig::default()
    }

    #[test]
    fn fields_map_one_to_one() {
        let host = HostNetwork {
            nodes: vec![
                HostNode {
                    id: 0,
                    threshold: 0.0,
                    leak: None,
                    delay: None,
                    input_id: Some(0),
                    output_id: None,
                },
                HostNode {
                    id: 1,
                    threshold: 7.2,
                    leak: Some(2.0),
                    delay: None,
                    input_id: None,
                    output_id: Some(0),
                },
            ],
            edges: vec![HostEdge {
                from: 0,
                to: 1,
                weight: 99.6,
                delay: Some(3.0),
            }],
            soft_reset: true,
        };

        let net = host_to_internal(&host, &cfg()).unwrap();
        assert!(net.soft_reset);
        assert_eq!(net.input(0), Some(0));
        assert_eq!(net.output(0), Some(1));

        let n = net.get_neuron(1).unwrap();
        assert_eq!(n.threshold, 7); // rounded
        assert_eq!(n.leak, 2);

        let s = net.get_synapse(0, 1).unwrap();
        assert_eq!((s.weight, s.delay), (100, 3));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let host = HostNetwork {
            nodes: vec![HostNode {
                id: 0,
                threshold: 300.0,
                leak: None,
                delay: None,
                input_id: None,
                output_id: None,
            }],
            edges: vec![],
            soft_reset: false,
        };
        assert!(matches!(
            host_to_internal(&host, &cfg()),
            Err(ArborError::InvalidParameter { name: "Threshold", .. })
        ));
    }

    #[test]
    fn axonal_delay_needs_a_widened_config() {
        let host = HostNetwork {
            nodes: vec![HostNode {
                id: 0,
                threshold: 1.0,
                leak: None,
                delay: Some(2.0),
                input_id: None,
                output_id: None,
            }],
            edges: vec![],
            soft_reset: false,
        };
        // default config pins the axonal delay range to [0, 0]
        assert!(host_to_internal(&host, &cfg()).is_err());

        let wide = ProcessorConfig {
            max_axon_delay: 15,
            ..cfg()
        };
        let net = host_to_internal(&host, &wide).unwrap();
        assert_eq!(net.get_neuron(0).unwrap().delay, 2);
        assert_eq!(net.max_axon_delay, 2);
    }
}
