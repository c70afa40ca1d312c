// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The hybrid event-driven cycle engine.
//!
//! Internal fires live in a circular buffer of buckets whose length is the
//! next power of two above the worst-case total delay; a cycle masks the
//! current time into the ring, drains its bucket, and reuses the bucket's
//! capacity for the rest of the run. Input fires wait in a vector sorted by
//! descending time so the tail pops in temporal order. A per-neuron
//! `tcheck` flag keeps threshold checks at one per touched neuron per
//! cycle.

use std::mem;

use ahash::AHashMap;
use tracing::{debug, warn};

use arbor_neural::constants::{
    delay_bucket, next_pow_of_2, LEAK_COMP, COMP_BITS, MAX_CHARGE, MAX_LEAK, MIN_CHARGE,
};
use arbor_neural::{ArborError, Network, Neuron, Result};

use crate::backend::{Backend, InputFire};

/// A scheduled delivery of a weight to a neuron of a loaded network.
///
/// The weight is the synchronized synapse copy captured at schedule time;
/// reconfiguration during a simulation step is excluded, so this equals
/// resolving the synapse at delivery.
#[derive(Clone, Copy, Debug)]
struct FireEvent {
    net: u32,
    target: u32,
    weight: i16,
}

/// Per-network output monitor data. The aftertime/precise configuration
/// lives on the simulator, per output index, shared by every network.
#[derive(Clone, Debug, Default)]
struct OutputMonitor {
    fire_counts: Vec<u64>,
    last_fire_times: Vec<i64>,
    recorded_fires: Vec<Vec<u32>>,
}

impl OutputMonitor {
    fn sized(outputs: usize) -> Self {
        Self {
            fire_counts: vec![0; outputs],
            last_fire_times: vec![-1; outputs],
            recorded_fires: vec![Vec::new(); outputs],
        }
    }

    fn clear_data(&mut self) {
        for c in &mut self.fire_counts {
            *c = 0;
        }
        for t in &mut self.last_fire_times {
            *t = -1;
        }
        for r in &mut self.recorded_fires {
            r.clear();
        }
    }
}

/// Per-network all-neuron spike log, active under `track_all_spikes`.
#[derive(Clone, Debug, Default)]
struct SpikeLog {
    counts: AHashMap<u32, u64>,
    last: AHashMap<u32, u32>,
    times: AHashMap<u32, Vec<u32>>,
}

impl SpikeLog {
    fn record(&mut self, id: u32, rel_time: u32) {
        *self.counts.entry(id).or_insert(0) += 1;
        self.last.insert(id, rel_time);
        self.times.entry(id).or_default().push(rel_time);
    }

    fn clear(&mut self) {
        self.counts.clear();
        self.last.clear();
        self.times.clear();
    }
}

/// Single-threaded event-driven simulator over one or many loaded
/// networks sharing input/output shape.
#[derive(Default)]
pub struct EventSimulator {
    nets: Vec<Network>,
    multi: bool,

    /// input index -> neuron id, single-network fast path
    input_map: Vec<Option<u32>>,
    /// circular buffer of fire buckets, length a power of two
    fires: Vec<Vec<FireEvent>>,
    dly_mask: u16,
    /// queued input fires, sorted by descending time before a run
    pending: Vec<InputFire>,
    /// (network index, neuron id) owed a threshold check this cycle
    thresh_check: Vec<(u32, u32)>,

    soft_reset: bool,

    monitors: Vec<OutputMonitor>,
    monitor_aftertime: Vec<i64>,
    monitor_precise: Vec<bool>,

    track_all: bool,
    spike_logs: Vec<SpikeLog>,

    metric_fires: u64,
    metric_accumulates: u64,
    metric_timesteps: u64,

    run_start_time: u64,
    net_time: u64,
}

impl EventSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every piece of engine state except the loaded networks.
    fn clear_engine_state(&mut self) {
        self.net_time = 0;
        self.run_start_time = 0;
        self.input_map.clear();
        self.pending.clear();
        self.thresh_check.clear();
        self.monitors.clear();
        self.monitor_aftertime.clear();
        self.monitor_precise.clear();
        self.spike_logs.clear();
        for bucket in &mut self.fires {
            bucket.clear();
        }
    }

    fn size_ring(&mut self, max_syn_delay: u8, max_axon_delay: u8) {
        let total = max_syn_delay as u16 + max_axon_delay as u16 + 1;
        let len = next_pow_of_2(total);
        self.dly_mask = len - 1;
        self.fires.resize(len as usize, Vec::new());
    }

    fn size_monitors(&mut self, outputs: usize, networks: usize) {
        self.monitors = vec![OutputMonitor::sized(outputs); networks];
        self.monitor_aftertime = vec![-1; outputs];
        self.monitor_precise = vec![false; outputs];
        self.spike_logs = vec![SpikeLog::default(); networks];
    }

    fn do_cycle(&mut self) {
        let now = self.net_time;

        // input fires scheduled for this cycle, popped from the sorted tail
        while let Some(&fire) = self.pending.last() {
            if fire.time != now {
                break;
            }
            self.pending.pop();
            self.deliver_input(fire);
        }

        // this cycle's bucket; taken out so its capacity survives the clear
        let idx = delay_bucket(now, self.dly_mask);
        let mut batch = mem::take(&mut self.fires[idx]);
        for event in batch.drain(..) {
            self.accumulate(event.net as usize, event.target, event.weight);
        }
        self.fires[idx] = batch;

        // threshold checks after all accumulation for the cycle
        let mut checks = mem::take(&mut self.thresh_check);
        for (net, id) in checks.drain(..) {
            self.check_threshold(net as usize, id);
        }
        self.thresh_check = checks;
    }

    fn deliver_input(&mut self, fire: InputFire) {
        if self.multi {
            // Broadcast through the ring: batch-mode input fires ride the
            // event queue and pay the same one-cycle latency as internal
            // fires.
            let idx = delay_bucket(self.net_time + 1, self.dly_mask);
            for (net, network) in self.nets.iter().enumerate() {
                match network.input(fire.input as usize) {
                    Some(target) => self.fires[idx].push(FireEvent {
                        net: net as u32,
                        target,
                        weight: fire.weight,
                    }),
                    None => debug!("network {} has no neuron at input {}", net, fire.input),
                }
            }
        } else {
            match self.input_map.get(fire.input as usize).copied().flatten() {
                Some(target) => self.accumulate(0, target, fire.weight),
                None => debug!("no neuron mapped at input {}", fire.input),
            }
        }
    }

    fn accumulate(&mut self, net: usize, id: u32, weight: i16) {
        let now = self.net_time;
        let Some(network) = self.nets.get_mut(net) else { return };
        let Some(n) = network.neuron_mut(id) else {
            debug!("fire event for missing neuron {} in network {}", id, net);
            return;
        };

        if n.last_event != now {
            refresh_neuron(n, now);
        }

        n.charge = (n.charge + weight as i32).clamp(MIN_CHARGE, MAX_CHARGE);
        self.metric_accumulates += 1;

        if n.charge > n.threshold as i32 && !n.tcheck {
            n.tcheck = true;
            self.thresh_check.push((net as u32, id));
        }
    }

    fn check_threshold(&mut self, net: usize, id: u32) {
        let now = self.net_time;
        let soft = self.soft_reset;
        let Some(network) = self.nets.get_mut(net) else { return };
        let Some(n) = network.neuron_mut(id) else { return };

        // the flag comes off before the decision so a later requeue works
        n.tcheck = false;

        if n.charge <= n.threshold as i32 {
            return;
        }

        self.metric_fires += 1;
        n.charge = if soft { n.charge - n.threshold as i32 } else { 0 };

        let axon = n.delay as u64;
        let output_id = n.output_id;
        let tag = n.tag;
        for &(target, syn) in &n.outputs {
            let at = now + syn.delay as u64 + axon + 1;
            self.fires[delay_bucket(at, self.dly_mask)].push(FireEvent {
                net: net as u32,
                target,
                weight: syn.weight,
            });
        }

        let rel = (now - self.run_start_time) as i64;

        if self.track_all {
            if let Some(log) = self.spike_logs.get_mut(net) {
                log.record(id, rel as u32);
            }
        }

        // output fires do not carry the axonal delay
        if let Some(out) = output_id {
            let out = out as usize;
            let mon_net = if self.multi { tag.max(0) as usize } else { 0 };
            if out < self.monitor_aftertime.len() && rel >= self.monitor_aftertime[out] {
                if let Some(mon) = self.monitors.get_mut(mon_net) {
                    mon.fire_counts[out] += 1;
                    mon.last_fire_times[out] = rel;
                    if self.monitor_precise[out] {
                        mon.recorded_fires[out].push(rel as u32);
                    }
                }
            }
        }
    }

    fn sorted_neuron_ids(&self, network_id: usize) -> Vec<u32> {
        let Some(net) = self.nets.get(network_id) else { return Vec::new() };
        let mut ids = net.neuron_list().to_vec();
        ids.sort_unstable();
        ids
    }
}

/// Apply leak to a neuron's stale charge and stamp it with the current
/// time.
///
/// The decay approximates `2^(-dt/tau)` with one table multiply for the
/// fractional tau period and a shift for the whole periods, applied to the
/// charge magnitude so negative charges decay toward zero symmetrically.
fn refresh_neuron(n: &mut Neuron, now: u64) {
    let mut imm = n.charge;

    if n.leak >= 0 && now > n.last_event {
        let dt = now - n.last_event;
        let leak = n.leak as u32;
        let shift = dt >> leak;
        let rem = dt & ((1u64 << leak) - 1);

        imm = imm.abs();

        if rem != 0 {
            let comp_idx = (((1u64 << leak) - rem) << (MAX_LEAK as u32 - leak)) as usize;
            imm = (imm * LEAK_COMP[comp_idx]) >> COMP_BITS;
        }

        imm = if shift < 32 { imm >> shift } else { 0 };
        if n.charge < 0 {
            imm = -imm;
        }
    }

    n.last_event = now;
    n.charge = imm.clamp(MIN_CHARGE, MAX_CHARGE);
}

impl Backend for EventSimulator {
    fn configure(&mut self, network: Option<Network>) -> bool {
        self.clear_engine_state();
        self.nets.clear();
        self.multi = false;

        if let Some(net) = network {
            self.soft_reset = net.soft_reset;
            self.input_map = (0..net.num_inputs()).map(|i| net.input(i)).collect();
            self.size_monitors(net.num_outputs(), 1);
            self.size_ring(net.max_syn_delay, net.max_axon_delay);
            self.net_time = net.time();
            self.nets.push(net);
        }
        true
    }

    fn configure_multi(&mut self, mut networks: Vec<Network>) -> Result<()> {
        self.clear_engine_state();
        self.nets.clear();
        self.multi = false;
        if networks.is_empty() {
            return Ok(());
        }

        let inputs = networks[0].num_inputs();
        let outputs = networks[0].num_outputs();
        for (idx, net) in networks.iter().enumerate() {
            if net.num_inputs() != inputs || net.num_outputs() != outputs {
                return Err(ArborError::ShapeMismatch {
                    network: idx,
                    inputs,
                    outputs,
                    found_inputs: net.num_inputs(),
                    found_outputs: net.num_outputs(),
                });
            }
        }

        let mut max_syn = 0u8;
        let mut max_axon = 0u8;
        for (idx, net) in networks.iter_mut().enumerate() {
            for o in 0..outputs {
                if let Some(id) = net.output(o) {
                    if let Some(n) = net.neuron_mut(id) {
                        n.tag = idx as i32;
                    }
                }
            }
            max_syn = max_syn.max(net.max_syn_delay);
            max_axon = max_axon.max(net.max_axon_delay);
        }

        self.soft_reset = networks[0].soft_reset;
        self.size_ring(max_syn, max_axon);
        self.size_monitors(outputs, networks.len());
        self.net_time = networks[0].time();
        self.multi = true;
        self.nets = networks;
        Ok(())
    }

    fn apply_input(&mut self, input_id: u32, weight: i16, time: u64) {
        self.pending.push(InputFire {
            input: input_id,
            weight,
            time: self.net_time + time,
        });
    }

    fn simulate(&mut self, steps: u64) -> bool {
        if self.nets.is_empty() {
            return false;
        }

        // stable descending sort: equal times stay in insertion order
        self.pending.sort_by(|a, b| b.time.cmp(&a.time));

        for mon in &mut self.monitors {
            mon.clear_data();
        }
        for log in &mut self.spike_logs {
            log.clear();
        }

        self.run_start_time = self.nets[0].time();
        let end_time = self.run_start_time + steps;

        self.net_time = self.run_start_time;
        while self.net_time < end_time {
            self.do_cycle();
            self.net_time += 1;
        }

        for net in &mut self.nets {
            net.set_time(end_time);
        }
        self.metric_timesteps += steps;
        true
    }

    fn update(&mut self) -> bool {
        if self.nets.is_empty() {
            return false;
        }
        let now = self.net_time;
        for net in &mut self.nets {
            for n in net.neurons_mut() {
                refresh_neuron(n, now);
            }
        }
        true
    }

    fn metric(&mut self, name: &str) -> f64 {
        match name {
            "fire_count" => mem::take(&mut self.metric_fires) as f64,
            "accumulate_count" => mem::take(&mut self.metric_accumulates) as f64,
            "total_timesteps" => mem::take(&mut self.metric_timesteps) as f64,
            // no plasticity, and clock gating is a hardware concern
            "depress_count" | "potentiate_count" | "active_clock_cycles" => 0.0,
            _ => {
                warn!("device metric '{}' is not implemented", name);
                0.0
            }
        }
    }

    fn time(&self) -> u64 {
        self.net_time
    }

    fn reset(&mut self) {
        self.net_time = 0;
        self.run_start_time = 0;
        self.pending.clear();
        self.thresh_check.clear();
        for net in &mut self.nets {
            net.reset();
        }
        for mon in &mut self.monitors {
            mon.clear_data();
        }
        for a in &mut self.monitor_aftertime {
            *a = -1;
        }
        for p in &mut self.monitor_precise {
            *p = false;
        }
        for log in &mut self.spike_logs {
            log.clear();
        }
        for bucket in &mut self.fires {
            bucket.clear();
        }
    }

    fn clear_activity(&mut self) {
        self.net_time = 0;
        self.run_start_time = 0;
        self.pending.clear();
        self.thresh_check.clear();
        for net in &mut self.nets {
            net.clear_activity();
        }
        for mon in &mut self.monitors {
            mon.clear_data();
        }
        for log in &mut self.spike_logs {
            log.clear();
        }
        for bucket in &mut self.fires {
            bucket.clear();
        }
    }

    fn track_aftertime(&mut self, output_id: u32, aftertime: u64) -> bool {
        match self.monitor_aftertime.get_mut(output_id as usize) {
            Some(slot) => {
                *slot = aftertime as i64;
                true
            }
            None => false,
        }
    }

    fn track_timing(&mut self, output_id: u32, enable: bool) -> bool {
        match self.monitor_precise.get_mut(output_id as usize) {
            Some(slot) => {
                *slot = enable;
                true
            }
            None => false,
        }
    }

    fn track_all_spikes(&mut self, enable: bool) {
        self.track_all = enable;
        if !enable {
            for log in &mut self.spike_logs {
                log.clear();
            }
        }
    }

    fn output_count(&self, output_id: u32, network_id: usize) -> i64 {
        match self.monitors.get(network_id) {
            Some(mon) => mon
                .fire_counts
                .get(output_id as usize)
                .map_or(-1, |&c| c as i64),
            None => -1,
        }
    }

    fn last_output_time(&self, output_id: u32, network_id: usize) -> i64 {
        match self.monitors.get(network_id) {
            Some(mon) => mon
                .last_fire_times
                .get(output_id as usize)
                .copied()
                .unwrap_or(-1),
            None => -1,
        }
    }

    fn output_values(&self, output_id: u32, network_id: usize) -> Vec<u32> {
        self.monitors
            .get(network_id)
            .and_then(|mon| mon.recorded_fires.get(output_id as usize))
            .cloned()
            .unwrap_or_default()
    }

    fn neuron_counts(&self, network_id: usize) -> Vec<i64> {
        let Some(log) = self.spike_logs.get(network_id) else { return Vec::new() };
        self.sorted_neuron_ids(network_id)
            .iter()
            .map(|id| log.counts.get(id).copied().unwrap_or(0) as i64)
            .collect()
    }

    fn neuron_last_fires(&self, network_id: usize) -> Vec<i64> {
        let Some(log) = self.spike_logs.get(network_id) else { return Vec::new() };
        self.sorted_neuron_ids(network_id)
            .iter()
            .map(|id| log.last.get(id).map_or(-1, |&t| t as i64))
            .collect()
    }

    fn neuron_vectors(&self, network_id: usize) -> Vec<Vec<u32>> {
        let Some(log) = self.spike_logs.get(network_id) else { return Vec::new() };
        self.sorted_neuron_ids(network_id)
            .iter()
            .map(|id| log.times.get(id).cloned().unwrap_or_default())
            .collect()
    }

    fn network(&self, network_id: usize) -> Option<&Network> {
        self.nets.get(network_id)
    }

    fn network_mut(&mut self, network_id: usize) -> Option<&mut Network> {
        self.nets.get_mut(network_id)
    }

    fn num_loaded(&self) -> usize {
        self.nets.len()
    }

    fn take_networks(&mut self) -> Vec<Network> {
        let nets = mem::take(&mut self.nets);
        self.configure(None);
        nets
    }
}
