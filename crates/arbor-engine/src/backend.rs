// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The backend capability set.
//!
//! A backend executes loaded networks cycle by cycle. The event simulator
//! is the only backend in this build; hardware targets implement the same
//! trait behind their own wire protocols.

use arbor_neural::{Network, Result};

/// An externally injected weight, scheduled for an absolute cycle.
///
/// Input fires carry the *input index*, never a resolved neuron id: in
/// multi-network mode the same index maps to a different neuron in every
/// loaded network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputFire {
    /// Input channel index.
    pub input: u32,
    pub weight: i16,
    /// Absolute delivery cycle.
    pub time: u64,
}

/// Simulation interface over one or many loaded networks.
pub trait Backend {
    /// Load a network, replacing all engine state. `None` detaches the
    /// engine; a detached engine refuses to simulate.
    fn configure(&mut self, network: Option<Network>) -> bool;

    /// Load a batch of shape-identical networks. Output neurons are
    /// tagged with their batch index.
    fn configure_multi(&mut self, networks: Vec<Network>) -> Result<()>;

    /// Queue a weight for the given input index, `time` cycles from now.
    fn apply_input(&mut self, input_id: u32, weight: i16, time: u64);

    /// Run `steps` cycles. Returns false when no network is loaded.
    fn simulate(&mut self, steps: u64) -> bool;

    /// Refresh every neuron (leak catch-up) to the current time.
    fn update(&mut self) -> bool;

    /// Device metrics by name. Counters reset on read; unknown names
    /// warn and return 0.
    fn metric(&mut self, name: &str) -> f64;

    /// Current engine time.
    fn time(&self) -> u64;

    /// Zero all dynamic state and monitor configuration.
    fn reset(&mut self);

    /// Zero all dynamic state, keeping monitor configuration.
    fn clear_activity(&mut self);

    /// Ignore output fires earlier than `aftertime` cycles into a run.
    fn track_aftertime(&mut self, output_id: u32, aftertime: u64) -> bool;

    /// Record exact relative fire times for an output channel.
    fn track_timing(&mut self, output_id: u32, enable: bool) -> bool;

    /// Record fires for every neuron, not just outputs.
    fn track_all_spikes(&mut self, enable: bool);

    /// Fires recorded on an output channel during the last run.
    /// Out-of-range channels are reported as -1.
    fn output_count(&self, output_id: u32, network_id: usize) -> i64;

    /// Relative time of the last recorded fire, -1 when none.
    fn last_output_time(&self, output_id: u32, network_id: usize) -> i64;

    /// Exact relative fire times (requires `track_timing`).
    fn output_values(&self, output_id: u32, network_id: usize) -> Vec<u32>;

    /// Per-neuron fire counts in ascending-id order (requires
    /// `track_all_spikes`).
    fn neuron_counts(&self, network_id: usize) -> Vec<i64>;

    /// Per-neuron last relative fire times in ascending-id order, -1 when
    /// silent (requires `track_all_spikes`).
    fn neuron_last_fires(&self, network_id: usize) -> Vec<i64>;

    /// Per-neuron relative fire times in ascending-id order (requires
    /// `track_all_spikes`).
    fn neuron_vectors(&self, network_id: usize) -> Vec<Vec<u32>>;

    /// Borrow a loaded network.
    fn network(&self, network_id: usize) -> Option<&Network>;

    /// Borrow a loaded network mutably.
    fn network_mut(&mut self, network_id: usize) -> Option<&mut Network>;

    /// Number of loaded networks.
    fn num_loaded(&self) -> usize;

    /// Detach and hand back every loaded network.
    fn take_networks(&mut self) -> Vec<Network>;
}
