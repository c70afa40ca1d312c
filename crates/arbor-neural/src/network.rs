// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron/synapse arena and the network mutation API.
//!
//! A [`Network`] owns its neurons in an id-keyed table. Synapses are stored
//! twice: in the post-synaptic neuron's input map (keyed by pre-synaptic
//! id) and, as a synchronized copy, in the pre-synaptic neuron's output
//! list. Mutators keep the two views in agreement; the simulator reads the
//! output-list copy when scheduling fires and the input map when queried.

use std::collections::BTreeMap;

use ahash::AHashMap;
use tracing::warn;

use crate::constants::*;
use crate::error::{ArborError, Result};

/// A directed, weighted, delayed connection between two neurons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Synapse {
    /// Weight added to the post-synaptic charge on delivery.
    pub weight: i16,
    /// Delay cycles added on top of the implicit one-cycle latency.
    pub delay: u8,
}

impl Synapse {
    pub fn new(weight: i16, delay: u8) -> Self {
        Self { weight, delay }
    }
}

/// A single integrate-and-fire neuron.
///
/// `charge`, `last_event`, and `tcheck` are dynamic state owned by the
/// simulation; everything else is structure.
#[derive(Clone, Debug)]
pub struct Neuron {
    /// Input synapses, keyed by pre-synaptic neuron id.
    pub synapses: BTreeMap<u32, Synapse>,
    /// Outgoing connections: target id plus a synchronized synapse copy.
    pub outputs: Vec<(u32, Synapse)>,
    /// Time of the last fire event into this neuron.
    pub last_event: u64,
    pub id: u32,
    /// Input channel assignment, if any.
    pub input_id: Option<u32>,
    /// Output channel assignment, if any.
    pub output_id: Option<u32>,
    /// Batch index of the owning network in multi-network mode.
    pub tag: i32,
    /// Accumulated charge.
    pub charge: i32,
    /// Charge strictly above this value triggers a fire.
    pub threshold: i16,
    /// Queued for a threshold check in the current cycle.
    pub tcheck: bool,
    /// Leak exponent: `-1` = no leak, otherwise `tau = 2^leak`.
    pub leak: i8,
    /// Axonal delay cycles applied to every outgoing fire.
    pub delay: u8,
}

impl Neuron {
    pub fn new(id: u32, threshold: i16, leak: i8, delay: u8) -> Self {
        Self {
            synapses: BTreeMap::new(),
            outputs: Vec::new(),
            last_event: TIME_NEVER,
            id,
            input_id: None,
            output_id: None,
            tag: -1,
            charge: 0,
            threshold,
            tcheck: false,
            leak,
            delay,
        }
    }

    fn clear_dynamic_state(&mut self) {
        self.charge = 0;
        self.tcheck = false;
        self.last_event = TIME_NEVER;
    }
}

/// Container of neurons and synapses with input/output index tables.
#[derive(Clone, Debug, Default)]
pub struct Network {
    neurons: AHashMap<u32, Neuron>,
    /// input index -> neuron id (`None` = unassigned slot)
    inputs: Vec<Option<u32>>,
    /// output index -> neuron id (`None` = unassigned slot)
    outputs: Vec<Option<u32>>,
    /// neuron ids in insertion order
    neuron_ids: Vec<u32>,
    /// (from, to) pairs in insertion order
    synapse_pairs: Vec<(u32, u32)>,
    n_synapses: usize,
    time: u64,

    /// After a fire, subtract the threshold instead of zeroing the charge.
    pub soft_reset: bool,
    pub max_thresh: u16,
    /// Supremum of currently present synaptic delays.
    pub max_syn_delay: u8,
    /// Supremum of currently present axonal delays.
    pub max_axon_delay: u8,
}

impl Network {
    pub fn new() -> Self {
        Self {
            max_thresh: MAX_THRESHOLD as u16,
            ..Self::default()
        }
    }

    // === Neuron functions ===

    pub fn is_neuron(&self, id: u32) -> bool {
        self.neurons.contains_key(&id)
    }

    /// Add a neuron, or update its parameters if the id already exists.
    pub fn add_neuron(&mut self, id: u32, threshold: i16, leak: i8, delay: u8) -> Result<()> {
        check_range("threshold", threshold as i64, MIN_THRESHOLD as i64, MAX_THRESHOLD as i64)?;
        check_range("leak", leak as i64, MIN_LEAK as i64, MAX_LEAK as i64)?;
        check_range("delay", delay as i64, MIN_AXON_DELAY as i64, MAX_AXON_DELAY as i64)?;

        match self.neurons.get_mut(&id) {
            Some(n) => {
                n.threshold = threshold;
                n.leak = leak;
                n.delay = delay;
            }
            None => {
                self.neurons.insert(id, Neuron::new(id, threshold, leak, delay));
                self.neuron_ids.push(id);
            }
        }

        if delay > self.max_axon_delay {
            self.max_axon_delay = delay;
        }
        Ok(())
    }

    /// Remove a neuron and every incident synapse. Returns `false` when
    /// the id is absent.
    pub fn remove_neuron(&mut self, id: u32) -> bool {
        if !self.is_neuron(id) {
            return false;
        }

        // outgoing first, then incoming; each removal fixes both views
        loop {
            let target = self
                .neurons
                .get(&id)
                .and_then(|n| n.outputs.last())
                .map(|&(t, _)| t);
            match target {
                Some(t) => self.remove_synapse(id, t),
                None => break,
            };
        }
        loop {
            let source = self
                .neurons
                .get(&id)
                .and_then(|n| n.synapses.keys().next())
                .copied();
            match source {
                Some(s) => self.remove_synapse(s, id),
                None => break,
            };
        }

        if let Some(pos) = self.neuron_ids.iter().position(|&n| n == id) {
            self.neuron_ids.swap_remove(pos);
        }
        self.neurons.remove(&id);
        true
    }

    pub fn neuron(&self, id: u32) -> Option<&Neuron> {
        self.neurons.get(&id)
    }

    pub fn neuron_mut(&mut self, id: u32) -> Option<&mut Neuron> {
        self.neurons.get_mut(&id)
    }

    pub fn get_neuron(&self, id: u32) -> Result<&Neuron> {
        self.neurons.get(&id).ok_or(ArborError::UnknownNeuron(id))
    }

    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.values()
    }

    pub fn neurons_mut(&mut self) -> impl Iterator<Item = &mut Neuron> {
        self.neurons.values_mut()
    }

    // === Input/Output functions ===

    /// Assign a neuron to an input channel, growing the index table with
    /// unassigned slots as needed.
    pub fn set_input(&mut self, id: u32, index: usize) -> Result<()> {
        if index >= self.inputs.len() {
            self.inputs.resize(index + 1, None);
        }
        let n = self.neurons.get_mut(&id).ok_or(ArborError::UnknownNeuron(id))?;
        n.input_id = Some(index as u32);
        self.inputs[index] = Some(id);
        Ok(())
    }

    /// Assign a neuron to an output channel, growing the index table with
    /// unassigned slots as needed.
    pub fn set_output(&mut self, id: u32, index: usize) -> Result<()> {
        if index >= self.outputs.len() {
            self.outputs.resize(index + 1, None);
        }
        let n = self.neurons.get_mut(&id).ok_or(ArborError::UnknownNeuron(id))?;
        n.output_id = Some(index as u32);
        self.outputs[index] = Some(id);
        Ok(())
    }

    pub fn input(&self, index: usize) -> Option<u32> {
        self.inputs.get(index).copied().flatten()
    }

    pub fn output(&self, index: usize) -> Option<u32> {
        self.outputs.get(index).copied().flatten()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub(crate) fn reserve_input_slots(&mut self, count: usize) {
        if count > self.inputs.len() {
            self.inputs.resize(count, None);
        }
    }

    pub(crate) fn reserve_output_slots(&mut self, count: usize) {
        if count > self.outputs.len() {
            self.outputs.resize(count, None);
        }
    }

    // === Synapse functions ===

    pub fn is_synapse(&self, from: u32, to: u32) -> bool {
        self.neurons
            .get(&to)
            .map_or(false, |n| n.synapses.contains_key(&from))
    }

    /// Add a synapse, or update weight and delay if it already exists.
    /// Both endpoints must exist.
    pub fn add_synapse(&mut self, from: u32, to: u32, weight: i16, delay: u8) -> Result<()> {
        check_range("weight", weight as i64, MIN_WEIGHT as i64, MAX_WEIGHT as i64)?;
        check_range("delay", delay as i64, MIN_DELAY as i64, MAX_DELAY as i64)?;
        if !self.is_neuron(from) {
            return Err(ArborError::UnknownNeuron(from));
        }

        let syn = Synapse::new(weight, delay);
        let existed = {
            let post = self.neurons.get_mut(&to).ok_or(ArborError::UnknownNeuron(to))?;
            post.synapses.insert(from, syn).is_some()
        };

        // mirror into the pre-synaptic output list
        let pre = self.neurons.get_mut(&from).ok_or(ArborError::UnknownNeuron(from))?;
        if existed {
            if let Some(slot) = pre.outputs.iter_mut().find(|(t, _)| *t == to) {
                slot.1 = syn;
            }
        } else {
            pre.outputs.push((to, syn));
            self.synapse_pairs.push((from, to));
            self.n_synapses += 1;
        }

        if delay > self.max_syn_delay {
            self.max_syn_delay = delay;
        }
        Ok(())
    }

    /// Remove a synapse from both views. Returns `false` when absent.
    pub fn remove_synapse(&mut self, from: u32, to: u32) -> bool {
        let removed = self
            .neurons
            .get_mut(&to)
            .map_or(false, |post| post.synapses.remove(&from).is_some());
        if !removed {
            return false;
        }

        if let Some(pre) = self.neurons.get_mut(&from) {
            if let Some(pos) = pre.outputs.iter().position(|&(t, _)| t == to) {
                pre.outputs.swap_remove(pos);
            }
        }
        if let Some(pos) = self.synapse_pairs.iter().position(|&p| p == (from, to)) {
            self.synapse_pairs.swap_remove(pos);
        }
        self.n_synapses -= 1;
        true
    }

    pub fn get_synapse(&self, from: u32, to: u32) -> Result<&Synapse> {
        self.get_neuron(to)?
            .synapses
            .get(&from)
            .ok_or(ArborError::UnknownNeuron(from))
    }

    // === Sizes and listings ===

    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    pub fn num_synapses(&self) -> usize {
        self.n_synapses
    }

    pub fn neuron_list(&self) -> &[u32] {
        &self.neuron_ids
    }

    pub fn synapse_list(&self) -> &[(u32, u32)] {
        &self.synapse_pairs
    }

    // === Time ===

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, t: u64) {
        self.time = t;
    }

    // === State management ===

    /// Zero every neuron's dynamic fields and rewind time to 0.
    pub fn reset(&mut self) {
        self.time = 0;
        for n in self.neurons.values_mut() {
            n.clear_dynamic_state();
        }
    }

    /// Same scope as [`Network::reset`]; kept distinct because the
    /// simulator layers different monitor semantics on top of each.
    pub fn clear_activity(&mut self) {
        self.time = 0;
        for n in self.neurons.values_mut() {
            n.clear_dynamic_state();
        }
    }

    /// Drop all neurons and synapses, keeping configuration and IO tables.
    pub fn clear(&mut self) {
        self.neurons.clear();
        self.neuron_ids.clear();
        self.synapse_pairs.clear();
        self.n_synapses = 0;
    }

    // === Pruning ===

    /// Remove every neuron that is not forward-reachable from an input or
    /// not reverse-reachable from an output. Neurons carrying an IO
    /// assignment survive unless `include_io` is set.
    pub fn prune(&mut self, include_io: bool) {
        self.reset();
        let roots: Vec<u32> = self.inputs.iter().flatten().copied().collect();
        self.mark_reachable(&roots, false);
        self.sweep_unmarked(include_io);

        self.reset();
        let roots: Vec<u32> = self.outputs.iter().flatten().copied().collect();
        self.mark_reachable(&roots, true);
        self.sweep_unmarked(include_io);

        self.reset();
    }

    /// DFS from `roots`, using the charge field as the visited mark.
    fn mark_reachable(&mut self, roots: &[u32], reverse: bool) {
        let mut stack: Vec<u32> = roots.to_vec();
        while let Some(id) = stack.pop() {
            let Some(n) = self.neurons.get_mut(&id) else { continue };
            if n.charge > 0 {
                continue;
            }
            n.charge = 1;
            if reverse {
                stack.extend(n.synapses.keys().copied());
            } else {
                stack.extend(n.outputs.iter().map(|&(t, _)| t));
            }
        }
    }

    fn sweep_unmarked(&mut self, include_io: bool) {
        let doomed: Vec<u32> = self
            .neurons
            .values()
            .filter(|n| {
                n.charge == 0 && (include_io || (n.input_id.is_none() && n.output_id.is_none()))
            })
            .map(|n| n.id)
            .collect();
        for id in doomed {
            self.remove_neuron(id);
        }
    }

    // === Metrics ===

    /// Structural metrics by name. Unknown names warn and return 0.
    pub fn metric(&self, name: &str) -> f64 {
        match name {
            "neuron_count" => self.neurons.len() as f64,
            "synapse_count" => self.n_synapses as f64,
            "inhibitory_synapse_count" => self.count_synapses(|s| s.weight < 0) as f64,
            "excitatory_synapse_count" => self.count_synapses(|s| s.weight > 0) as f64,
            _ => {
                warn!("network metric '{}' is not implemented", name);
                0.0
            }
        }
    }

    fn count_synapses(&self, pred: impl Fn(&Synapse) -> bool) -> usize {
        self.neurons
            .values()
            .flat_map(|n| n.synapses.values())
            .filter(|s| pred(s))
            .count()
    }
}

/// Structural equality: same neurons (threshold, leak, IO assignments),
/// same synapses (weight, delay), same IO tables and configuration.
/// Dynamic state and tags do not participate.
impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        if self.num_neurons() != other.num_neurons()
            || self.num_synapses() != other.num_synapses()
            || self.num_inputs() != other.num_inputs()
            || self.num_outputs() != other.num_outputs()
            || self.max_syn_delay != other.max_syn_delay
            || self.max_axon_delay != other.max_axon_delay
            || self.max_thresh != other.max_thresh
            || self.soft_reset != other.soft_reset
        {
            return false;
        }

        for id in &self.neuron_ids {
            let Some(a) = self.neurons.get(id) else { return false };
            let Some(b) = other.neurons.get(id) else { return false };
            if a.threshold != b.threshold
                || a.leak != b.leak
                || a.input_id != b.input_id
                || a.output_id != b.output_id
            {
                return false;
            }
        }

        for &(from, to) in &self.synapse_pairs {
            let (Ok(a), Ok(b)) = (self.get_synapse(from, to), other.get_synapse(from, to)) else {
                return false;
            };
            if a != b {
                return false;
            }
        }
        true
    }
}

fn check_range(name: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(ArborError::InvalidParameter { name, value, min, max });
    }
    Ok(())
}
