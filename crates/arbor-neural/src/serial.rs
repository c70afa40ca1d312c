// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Canonical JSON serialization and the GML inspection export.
//!
//! The wire form is `{version, inputs, outputs, config, neurons,
//! synapses}` with `-1` marking unassigned IO slots. Loading rejects
//! payloads whose declared version is below [`FORMAT_VERSION`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::constants::{FORMAT_VERSION, MAX_THRESHOLD};
use crate::error::{ArborError, Result};
use crate::network::Network;

#[derive(Serialize, Deserialize)]
struct NetworkDoc {
    version: f64,
    #[serde(default)]
    inputs: Vec<i64>,
    #[serde(default)]
    outputs: Vec<i64>,
    #[serde(default)]
    config: ConfigDoc,
    neurons: Vec<NeuronDoc>,
    synapses: Vec<SynapseDoc>,
}

#[derive(Serialize, Deserialize)]
struct ConfigDoc {
    soft_reset: bool,
    max_syn_delay: u8,
    max_axon_delay: u8,
    max_threshold: u16,
}

impl Default for ConfigDoc {
    fn default() -> Self {
        Self {
            soft_reset: false,
            max_syn_delay: 0,
            max_axon_delay: 0,
            max_threshold: MAX_THRESHOLD as u16,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct NeuronDoc {
    id: u32,
    threshold: i16,
    #[serde(default = "no_leak")]
    leak: i8,
    #[serde(default)]
    delay: u8,
}

#[derive(Serialize, Deserialize)]
struct SynapseDoc {
    from: u32,
    to: u32,
    weight: i16,
    #[serde(default)]
    delay: u8,
}

fn no_leak() -> i8 {
    -1
}

impl Network {
    /// Serialize to the canonical JSON form.
    pub fn to_json(&self) -> serde_json::Value {
        let doc = NetworkDoc {
            version: FORMAT_VERSION,
            inputs: (0..self.num_inputs())
                .map(|i| self.input(i).map_or(-1, i64::from))
                .collect(),
            outputs: (0..self.num_outputs())
                .map(|o| self.output(o).map_or(-1, i64::from))
                .collect(),
            config: ConfigDoc {
                soft_reset: self.soft_reset,
                max_syn_delay: self.max_syn_delay,
                max_axon_delay: self.max_axon_delay,
                max_threshold: self.max_thresh,
            },
            neurons: self
                .neuron_list()
                .iter()
                .filter_map(|&id| self.neuron(id))
                .map(|n| NeuronDoc {
                    id: n.id,
                    threshold: n.threshold,
                    leak: n.leak,
                    delay: n.delay,
                })
                .collect(),
            synapses: self
                .synapse_list()
                .iter()
                .filter_map(|&(from, to)| {
                    self.get_synapse(from, to).ok().map(|s| SynapseDoc {
                        from,
                        to,
                        weight: s.weight,
                        delay: s.delay,
                    })
                })
                .collect(),
        };
        // the doc is plain data, it cannot fail to serialize
        serde_json::to_value(doc).unwrap_or_default()
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Reconstruct a network from its canonical JSON form.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let doc: NetworkDoc = serde_json::from_value(value.clone())?;

        if doc.version < FORMAT_VERSION {
            return Err(ArborError::UnsupportedVersion {
                found: doc.version,
                min: FORMAT_VERSION,
            });
        }

        let mut net = Network::new();
        net.soft_reset = doc.config.soft_reset;
        net.max_thresh = doc.config.max_threshold;
        net.max_syn_delay = doc.config.max_syn_delay;
        net.max_axon_delay = doc.config.max_axon_delay;

        for n in &doc.neurons {
            net.add_neuron(n.id, n.threshold, n.leak, n.delay)
                .map_err(|e| ArborError::BadSerialization(e.to_string()))?;
        }
        for s in &doc.synapses {
            net.add_synapse(s.from, s.to, s.weight, s.delay)
                .map_err(|e| ArborError::BadSerialization(e.to_string()))?;
        }

        net.reserve_input_slots(doc.inputs.len());
        for (index, &id) in doc.inputs.iter().enumerate() {
            if id >= 0 {
                net.set_input(id as u32, index)
                    .map_err(|e| ArborError::BadSerialization(e.to_string()))?;
            }
        }
        net.reserve_output_slots(doc.outputs.len());
        for (index, &id) in doc.outputs.iter().enumerate() {
            if id >= 0 {
                net.set_output(id as u32, index)
                    .map_err(|e| ArborError::BadSerialization(e.to_string()))?;
            }
        }

        Ok(net)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    /// GML rendering for graph-tool inspection. Not a load format.
    pub fn to_gml(&self) -> String {
        let mut gml = String::new();
        let _ = writeln!(gml, "graph [");
        let _ = writeln!(gml, "  comment \"generated by arbor\"");
        let _ = writeln!(gml, "  label \"network\"");
        let _ = writeln!(gml, "  directed 1");

        for &id in self.neuron_list() {
            if let Some(n) = self.neuron(id) {
                let _ = writeln!(
                    gml,
                    "  node [\n    id {0}\n    label {0}\n    threshold {1}\n  ]",
                    n.id, n.threshold
                );
            }
        }
        for &(from, to) in self.synapse_list() {
            if let Ok(s) = self.get_synapse(from, to) {
                let _ = writeln!(
                    gml,
                    "  edge [\n    source {}\n    target {}\n    weight {}\n    delay {}\n  ]",
                    from, to, s.weight, s.delay
                );
            }
        }
        let _ = writeln!(gml, "]");
        gml
    }
}
