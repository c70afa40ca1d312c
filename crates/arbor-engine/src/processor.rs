// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The processor facade.
//!
//! Validates a JSON configuration, owns a backend, converts host networks
//! into the internal form, and multiplexes spikes, runs, and output
//! queries over one or many loaded networks.

use serde_json::{json, Value};
use tracing::debug;

use arbor_neural::constants::{
    MAX_AXON_DELAY, MAX_DELAY, MAX_DEVICE_INPUT, MAX_LEAK, MAX_THRESHOLD, MAX_WEIGHT, MIN_LEAK,
    MIN_WEIGHT,
};
use arbor_neural::{ArborError, Network, Result};

use crate::backend::Backend;
use crate::convert::{host_to_internal, HostNetwork};
use crate::simulator::EventSimulator;
use crate::spike::Spike;

/// Name of the only backend available in this build.
pub const EVENT_SIMULATOR: &str = "Event_Simulator";

/// Validated processor configuration.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub backend: String,
    pub debug: bool,
    pub leak_enable: bool,
    pub min_leak: i8,
    pub max_leak: i8,
    pub min_threshold: i16,
    pub max_threshold: i16,
    pub min_weight: i16,
    pub max_weight: i16,
    pub min_axon_delay: u8,
    pub max_axon_delay: u8,
    pub min_synapse_delay: u8,
    pub max_synapse_delay: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            backend: EVENT_SIMULATOR.to_string(),
            debug: false,
            leak_enable: true,
            min_leak: 0,
            max_leak: MAX_LEAK,
            min_threshold: 0,
            max_threshold: MAX_THRESHOLD,
            min_weight: MIN_WEIGHT,
            max_weight: MAX_WEIGHT,
            min_axon_delay: 0,
            max_axon_delay: 0,
            min_synapse_delay: 0,
            max_synapse_delay: MAX_DELAY,
        }
    }
}

impl ProcessorConfig {
    /// Parse and validate a configuration mapping. Unknown keys, wrong
    /// types, inverted or out-of-device ranges all fail
    /// `BadConfiguration`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut cfg = Self::default();

        let map = match value {
            Value::Null => return Ok(cfg),
            Value::Object(map) => map,
            _ => {
                return Err(ArborError::BadConfiguration(
                    "configuration must be a JSON object".into(),
                ))
            }
        };

        for (key, v) in map {
            match key.as_str() {
                "Backend" => {
                    cfg.backend = v
                        .as_str()
                        .ok_or_else(|| bad_type(key, "a string"))?
                        .to_string();
                }
                "Debug" => cfg.debug = v.as_bool().ok_or_else(|| bad_type(key, "a boolean"))?,
                "Leak_Enable" => {
                    cfg.leak_enable = v.as_bool().ok_or_else(|| bad_type(key, "a boolean"))?
                }
                "Min_Leak" => cfg.min_leak = int_field(key, v, MIN_LEAK as i64, MAX_LEAK as i64)? as i8,
                "Max_Leak" => cfg.max_leak = int_field(key, v, MIN_LEAK as i64, MAX_LEAK as i64)? as i8,
                "Min_Threshold" => {
                    cfg.min_threshold = int_field(key, v, 0, MAX_THRESHOLD as i64)? as i16
                }
                "Max_Threshold" => {
                    cfg.max_threshold = int_field(key, v, 0, MAX_THRESHOLD as i64)? as i16
                }
                "Min_Weight" => {
                    cfg.min_weight = int_field(key, v, MIN_WEIGHT as i64, MAX_WEIGHT as i64)? as i16
                }
                "Max_Weight" => {
                    cfg.max_weight = int_field(key, v, MIN_WEIGHT as i64, MAX_WEIGHT as i64)? as i16
                }
                "Min_Axon_Delay" => {
                    cfg.min_axon_delay = int_field(key, v, 0, MAX_AXON_DELAY as i64)? as u8
                }
                "Max_Axon_Delay" => {
                    cfg.max_axon_delay = int_field(key, v, 0, MAX_AXON_DELAY as i64)? as u8
                }
                "Min_Synapse_Delay" => {
                    cfg.min_synapse_delay = int_field(key, v, 0, MAX_DELAY as i64)? as u8
                }
                "Max_Synapse_Delay" => {
                    cfg.max_synapse_delay = int_field(key, v, 0, MAX_DELAY as i64)? as u8
                }
                _ => {
                    return Err(ArborError::BadConfiguration(format!(
                        "unrecognized option '{}'",
                        key
                    )))
                }
            }
        }

        if !cfg.leak_enable {
            cfg.min_leak = -1;
            cfg.max_leak = -1;
        }

        check_order("Leak", cfg.min_leak as i64, cfg.max_leak as i64)?;
        check_order("Threshold", cfg.min_threshold as i64, cfg.max_threshold as i64)?;
        check_order("Weight", cfg.min_weight as i64, cfg.max_weight as i64)?;
        check_order("Axon_Delay", cfg.min_axon_delay as i64, cfg.max_axon_delay as i64)?;
        check_order(
            "Synapse_Delay",
            cfg.min_synapse_delay as i64,
            cfg.max_synapse_delay as i64,
        )?;

        Ok(cfg)
    }

    /// The effective configuration as a JSON mapping.
    pub fn to_json(&self) -> Value {
        json!({
            "Backend": self.backend,
            "Debug": self.debug,
            "Leak_Enable": self.leak_enable,
            "Min_Leak": self.min_leak,
            "Max_Leak": self.max_leak,
            "Min_Threshold": self.min_threshold,
            "Max_Threshold": self.max_threshold,
            "Min_Weight": self.min_weight,
            "Max_Weight": self.max_weight,
            "Min_Axon_Delay": self.min_axon_delay,
            "Max_Axon_Delay": self.max_axon_delay,
            "Min_Synapse_Delay": self.min_synapse_delay,
            "Max_Synapse_Delay": self.max_synapse_delay,
        })
    }
}

fn bad_type(key: &str, expected: &str) -> ArborError {
    ArborError::BadConfiguration(format!("option '{}' must be {}", key, expected))
}

fn int_field(key: &str, v: &Value, min: i64, max: i64) -> Result<i64> {
    let value = v.as_i64().ok_or_else(|| bad_type(key, "an integer"))?;
    if value < min || value > max {
        return Err(ArborError::BadConfiguration(format!(
            "option '{}' = {} is outside [{}, {}]",
            key, value, min, max
        )));
    }
    Ok(value)
}

fn check_order(name: &str, min: i64, max: i64) -> Result<()> {
    if min > max {
        return Err(ArborError::BadConfiguration(format!(
            "Min_{0} = {1} exceeds Max_{0} = {2}",
            name, min, max
        )));
    }
    Ok(())
}

/// Facade over a configured backend and its loaded network(s).
pub struct Processor {
    cfg: ProcessorConfig,
    params: Value,
    dev: Box<dyn Backend>,
    n_loaded: usize,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("cfg", &self.cfg)
            .field("params", &self.params)
            .field("n_loaded", &self.n_loaded)
            .finish()
    }
}

impl Processor {
    /// Build a processor from a configuration mapping.
    pub fn new(config: &Value) -> Result<Self> {
        let cfg = ProcessorConfig::from_json(config)?;
        if cfg.backend != EVENT_SIMULATOR {
            return Err(ArborError::UnsupportedBackend(cfg.backend));
        }
        if cfg.debug {
            debug!("processor configured: {}", cfg.to_json());
        }
        let params = cfg.to_json();
        Ok(Self {
            cfg,
            params,
            dev: Box::new(EventSimulator::new()),
            n_loaded: 0,
        })
    }

    // === Loading ===

    /// Convert a host network and load it as network 0.
    pub fn load_network(&mut self, host: &HostNetwork) -> Result<()> {
        let net = host_to_internal(host, &self.cfg)?;
        self.load(net);
        Ok(())
    }

    /// Load an already-internal network as network 0.
    pub fn load(&mut self, net: Network) {
        self.dev.configure(Some(net));
        self.n_loaded = 1;
    }

    /// Load a batch of shape-identical networks.
    pub fn load_networks(&mut self, nets: Vec<Network>) -> Result<()> {
        let count = nets.len();
        self.dev.configure_multi(nets)?;
        self.n_loaded = count;
        Ok(())
    }

    fn check_loaded(&self, network_id: usize) -> Result<()> {
        if network_id >= self.n_loaded {
            return Err(ArborError::NotLoaded(network_id));
        }
        Ok(())
    }

    // === Spike application ===

    /// Queue a spike. Normalized spikes scale `value in [0, 1]` by the
    /// device input resolution and round; raw spikes use the value as the
    /// weight directly.
    pub fn apply_spike(&mut self, spike: &Spike, normalized: bool, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        let weight = if normalized {
            (spike.value * MAX_DEVICE_INPUT as f64).round() as i16
        } else {
            spike.value as i16
        };
        self.dev.apply_input(spike.id, weight, spike.time.floor() as u64);
        Ok(())
    }

    pub fn apply_spikes(&mut self, spikes: &[Spike], normalized: bool, network_id: usize) -> Result<()> {
        for spike in spikes {
            self.apply_spike(spike, normalized, network_id)?;
        }
        Ok(())
    }

    /// Queue `(weight, time)` pulse lists, one list per input channel.
    pub fn apply_inputs(&mut self, pulses: &[Vec<(i16, u64)>], network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        let inputs = self
            .dev
            .network(network_id)
            .map(|n| n.num_inputs())
            .unwrap_or_default();
        if pulses.len() != inputs {
            return Err(ArborError::InvalidArgument(format!(
                "got pulse lists for {} inputs, network has {}",
                pulses.len(),
                inputs
            )));
        }
        for (input, list) in pulses.iter().enumerate() {
            for &(weight, time) in list {
                self.dev.apply_input(input as u32, weight, time);
            }
        }
        Ok(())
    }

    /// Bulk DVS event submission: input index is `y*W + x`, plus
    /// `p*W*H` when polarity is used; every event carries the maximum
    /// device input weight.
    pub fn apply_dvs_events(
        &mut self,
        x: &[u32],
        y: &[u32],
        p: &[u32],
        t: &[f64],
        dims: (u32, u32),
        use_polarity: bool,
    ) -> Result<()> {
        self.check_loaded(0)?;
        if x.len() != y.len() || y.len() != t.len() || (use_polarity && t.len() != p.len()) {
            return Err(ArborError::LengthMismatch(format!(
                "x={}, y={}, t={}, p={}",
                x.len(),
                y.len(),
                t.len(),
                p.len()
            )));
        }

        let (width, height) = dims;
        let frame_size = width * height;
        for i in 0..x.len() {
            let mut input = y[i] * width + x[i];
            if use_polarity {
                input += p[i] * frame_size;
            }
            self.dev
                .apply_input(input, MAX_DEVICE_INPUT, t[i].floor() as u64);
        }
        Ok(())
    }

    // === Execution ===

    /// Run the loaded network(s) for `duration` cycles.
    pub fn run(&mut self, duration: f64, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        if !self.dev.simulate(duration as u64) {
            return Err(ArborError::NotLoaded(network_id));
        }
        Ok(())
    }

    pub fn get_time(&self, network_id: usize) -> Result<f64> {
        self.check_loaded(network_id)?;
        Ok(self.dev.time() as f64)
    }

    // === Output tracking ===

    pub fn track_aftertime(&mut self, output_id: u32, aftertime: f64, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        self.dev.track_aftertime(output_id, aftertime as u64);
        Ok(())
    }

    pub fn track_output(&mut self, output_id: u32, track: bool, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        self.dev.track_timing(output_id, track);
        Ok(())
    }

    pub fn track_output_events(&mut self, output_id: u32, track: bool, network_id: usize) -> Result<bool> {
        self.check_loaded(network_id)?;
        Ok(self.dev.track_timing(output_id, track))
    }

    // === Output access ===

    pub fn output_last_fire(&self, output_id: u32, network_id: usize) -> Result<f64> {
        self.check_loaded(network_id)?;
        Ok(self.dev.last_output_time(output_id, network_id) as f64)
    }

    pub fn output_count(&self, output_id: u32, network_id: usize) -> Result<i64> {
        self.check_loaded(network_id)?;
        Ok(self.dev.output_count(output_id, network_id))
    }

    pub fn output_vector(&self, output_id: u32, network_id: usize) -> Result<Vec<f64>> {
        self.check_loaded(network_id)?;
        Ok(self
            .dev
            .output_values(output_id, network_id)
            .into_iter()
            .map(f64::from)
            .collect())
    }

    pub fn output_last_fires(&self, network_id: usize) -> Result<Vec<f64>> {
        self.check_loaded(network_id)?;
        Ok((0..self.num_outputs(network_id)?)
            .map(|o| self.dev.last_output_time(o as u32, network_id) as f64)
            .collect())
    }

    pub fn output_counts(&self, network_id: usize) -> Result<Vec<i64>> {
        self.check_loaded(network_id)?;
        Ok((0..self.num_outputs(network_id)?)
            .map(|o| self.dev.output_count(o as u32, network_id))
            .collect())
    }

    pub fn output_vectors(&self, network_id: usize) -> Result<Vec<Vec<f64>>> {
        self.check_loaded(network_id)?;
        (0..self.num_outputs(network_id)?)
            .map(|o| self.output_vector(o as u32, network_id))
            .collect()
    }

    /// Output index with the highest fire count, ties toward the lowest
    /// index, together with that count.
    pub fn output_max_count(&self, network_id: usize) -> Result<(usize, i64)> {
        let counts = self.output_counts(network_id)?;
        let mut best = (0usize, 0i64);
        for (idx, &count) in counts.iter().enumerate() {
            if count > best.1 {
                best = (idx, count);
            }
        }
        Ok(best)
    }

    fn num_outputs(&self, network_id: usize) -> Result<usize> {
        self.dev
            .network(network_id)
            .map(|n| n.num_outputs())
            .ok_or(ArborError::NotLoaded(network_id))
    }

    // === All-neuron spike access ===

    /// Record fires on every neuron, not just outputs.
    pub fn track_spikes(&mut self) {
        self.dev.track_all_spikes(true);
    }

    /// Enable or disable all-neuron event recording. The simulator tracks
    /// whole networks; `node_id` only gates the return value.
    pub fn track_neuron_events(&mut self, node_id: u32, track: bool, network_id: usize) -> Result<bool> {
        self.check_loaded(network_id)?;
        self.dev.track_all_spikes(track);
        Ok(self
            .dev
            .network(network_id)
            .map_or(false, |n| n.is_neuron(node_id)))
    }

    /// Per-neuron fire counts, ascending-id order.
    pub fn neuron_counts(&self, network_id: usize) -> Result<Vec<i64>> {
        self.check_loaded(network_id)?;
        Ok(self.dev.neuron_counts(network_id))
    }

    /// Per-neuron last fire times, ascending-id order, -1 when silent.
    pub fn neuron_last_fires(&self, network_id: usize) -> Result<Vec<f64>> {
        self.check_loaded(network_id)?;
        Ok(self
            .dev
            .neuron_last_fires(network_id)
            .into_iter()
            .map(|t| t as f64)
            .collect())
    }

    /// Per-neuron fire time vectors, ascending-id order.
    pub fn neuron_vectors(&self, network_id: usize) -> Result<Vec<Vec<f64>>> {
        self.check_loaded(network_id)?;
        Ok(self
            .dev
            .neuron_vectors(network_id)
            .into_iter()
            .map(|v| v.into_iter().map(f64::from).collect())
            .collect())
    }

    /// Per-neuron charges, ascending-id order.
    pub fn neuron_charges(&self, network_id: usize) -> Result<Vec<f64>> {
        self.check_loaded(network_id)?;
        let net = self
            .dev
            .network(network_id)
            .ok_or(ArborError::NotLoaded(network_id))?;
        let mut ids = net.neuron_list().to_vec();
        ids.sort_unstable();
        Ok(ids
            .iter()
            .filter_map(|&id| net.neuron(id))
            .map(|n| n.charge as f64)
            .collect())
    }

    /// Flat synapse listing: pre ids, post ids, and weights.
    pub fn synapse_weights(&self, network_id: usize) -> Result<(Vec<u32>, Vec<u32>, Vec<f64>)> {
        self.check_loaded(network_id)?;
        let net = self
            .dev
            .network(network_id)
            .ok_or(ArborError::NotLoaded(network_id))?;
        let mut pres = Vec::with_capacity(net.num_synapses());
        let mut posts = Vec::with_capacity(net.num_synapses());
        let mut weights = Vec::with_capacity(net.num_synapses());
        for &(from, to) in net.synapse_list() {
            if let Ok(s) = net.get_synapse(from, to) {
                pres.push(from);
                posts.push(to);
                weights.push(s.weight as f64);
            }
        }
        Ok((pres, posts, weights))
    }

    // === State management ===

    /// Unload the network(s) and detach the backend.
    pub fn clear(&mut self, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        self.dev.configure(None);
        self.n_loaded = 0;
        Ok(())
    }

    /// Drop all activity, keeping the network(s) loaded.
    pub fn clear_activity(&mut self, network_id: usize) -> Result<()> {
        self.check_loaded(network_id)?;
        self.dev.clear_activity();
        Ok(())
    }

    // === Metrics and introspection ===

    /// Device metric by name (read-and-reset counters).
    pub fn metric(&mut self, name: &str) -> f64 {
        self.dev.metric(name)
    }

    /// Structural metric of a loaded network.
    pub fn network_metric(&self, name: &str, network_id: usize) -> Result<f64> {
        self.check_loaded(network_id)?;
        self.dev
            .network(network_id)
            .map(|n| n.metric(name))
            .ok_or(ArborError::NotLoaded(network_id))
    }

    /// Constant, consumer-visible processor properties.
    pub fn properties(&self) -> Value {
        json!({
            "input_scaling_value": MAX_DEVICE_INPUT,
            "binary_input": true,
            "spike_raster_info": true,
            "plasticity": "none",
            "threshold_inclusive": false,
            "integration_delay": true,
            "run_time_inclusive": false,
        })
    }

    pub fn get_name(&self) -> &'static str {
        "arbor"
    }

    /// The effective configuration the processor was built with.
    pub fn get_params(&self) -> &Value {
        &self.params
    }

    pub fn get_configuration(&self) -> &ProcessorConfig {
        &self.cfg
    }

    /// Direct access to the backend.
    pub fn backend(&self) -> &dyn Backend {
        self.dev.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.dev.as_mut()
    }
}
