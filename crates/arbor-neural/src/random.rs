// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Seeded random network generation and random element picks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{MAX_WEIGHT, MIN_THRESHOLD};
use crate::error::Result;
use crate::network::Network;

/// Parameters for [`Network::make_random`].
///
/// Fan-out fields follow the classic 12/12/6 wiring; `hidden_fanin_cap`
/// bounds how many incoming synapses a hidden neuron may accumulate during
/// the hidden-to-hidden pass.
#[derive(Clone, Debug)]
pub struct RandomNetworkParams {
    pub n_neurons: usize,
    pub n_inputs: usize,
    pub n_outputs: usize,
    pub seed: u64,
    /// Synapses drawn from each input into the hidden pool.
    pub input_fanout: usize,
    /// Synapses drawn from the hidden pool into each output.
    pub output_fanin: usize,
    /// Synapses drawn from each hidden neuron into the hidden pool.
    pub hidden_fanout: usize,
    /// Cap on incoming synapses per hidden neuron in the hidden pass.
    pub hidden_fanin_cap: usize,
    /// Probability that a drawn weight is negated.
    pub inhibitory_percentage: f64,
    pub threshold_range: (i16, i16),
    pub leak_range: (i8, i8),
    /// Magnitude range; the inhibitory draw decides the sign.
    pub weight_range: (i16, i16),
    pub delay_range: (u8, u8),
}

impl Default for RandomNetworkParams {
    fn default() -> Self {
        Self {
            n_neurons: 0,
            n_inputs: 0,
            n_outputs: 0,
            seed: 0,
            input_fanout: 12,
            output_fanin: 12,
            hidden_fanout: 6,
            hidden_fanin_cap: 7, // 6 * 1.2, rounded
            inhibitory_percentage: 0.2,
            threshold_range: (MIN_THRESHOLD, 255),
            leak_range: (0, 3),
            weight_range: (0, MAX_WEIGHT),
            delay_range: (0, 15),
        }
    }
}

impl Network {
    /// Replace this network's contents with a randomly wired one.
    ///
    /// Deterministic for a given seed: ids run `0..n_neurons`, the first
    /// `n_inputs` ids become inputs, the next `n_outputs` become outputs,
    /// the rest are hidden. Edges are drawn in three passes
    /// (input->hidden, hidden->output, hidden->hidden).
    pub fn make_random(&mut self, p: &RandomNetworkParams) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(p.seed);

        self.clear();

        let first_output = p.n_inputs;
        let first_hidden = p.n_inputs + p.n_outputs;
        let n_hidden = p.n_neurons.saturating_sub(first_hidden);

        for id in 0..p.n_neurons {
            let threshold = rng.gen_range(p.threshold_range.0..=p.threshold_range.1);
            let leak = rng.gen_range(p.leak_range.0..=p.leak_range.1);
            self.add_neuron(id as u32, threshold, leak, 0)?;
        }

        for i in 0..p.n_inputs {
            self.set_input(i as u32, i)?;
        }
        for i in 0..p.n_outputs {
            self.set_output((first_output + i) as u32, i)?;
        }

        if n_hidden == 0 {
            return Ok(());
        }
        let hidden = first_hidden as u32..p.n_neurons as u32;

        // input -> hidden
        for from in 0..p.n_inputs as u32 {
            for _ in 0..p.input_fanout {
                let to = rng.gen_range(hidden.clone());
                self.add_random_synapse(&mut rng, p, from, to)?;
            }
        }

        // hidden -> output
        for out in 0..p.n_outputs {
            for _ in 0..p.output_fanin {
                let from = rng.gen_range(hidden.clone());
                self.add_random_synapse(&mut rng, p, from, (first_output + out) as u32)?;
            }
        }

        // hidden -> hidden, bounded by the incoming-synapse cap
        for from in hidden.clone() {
            for _ in 0..p.hidden_fanout {
                if n_hidden < 2 {
                    break;
                }
                let mut to = rng.gen_range(hidden.clone());
                while to == from {
                    to = rng.gen_range(hidden.clone());
                }
                let fanin = self.get_neuron(to)?.synapses.len();
                if fanin < p.hidden_fanin_cap {
                    self.add_random_synapse(&mut rng, p, from, to)?;
                }
            }
        }

        Ok(())
    }

    fn add_random_synapse(
        &mut self,
        rng: &mut StdRng,
        p: &RandomNetworkParams,
        from: u32,
        to: u32,
    ) -> Result<()> {
        let sign: i16 = if rng.gen::<f64>() < p.inhibitory_percentage { -1 } else { 1 };
        let weight = rng.gen_range(p.weight_range.0..=p.weight_range.1) * sign;
        let delay = rng.gen_range(p.delay_range.0..=p.delay_range.1);
        self.add_synapse(from, to, weight, delay)
    }

    // === Random element picks ===

    pub fn random_input(&self, rng: &mut impl Rng) -> Option<u32> {
        if self.num_inputs() == 0 {
            return None;
        }
        self.input(rng.gen_range(0..self.num_inputs()))
    }

    pub fn random_output(&self, rng: &mut impl Rng) -> Option<u32> {
        if self.num_outputs() == 0 {
            return None;
        }
        self.output(rng.gen_range(0..self.num_outputs()))
    }

    pub fn random_neuron(&self, rng: &mut impl Rng) -> Option<u32> {
        let ids = self.neuron_list();
        if ids.is_empty() {
            return None;
        }
        Some(ids[rng.gen_range(0..ids.len())])
    }

    pub fn random_synapse(&self, rng: &mut impl Rng) -> Option<(u32, u32)> {
        let pairs = self.synapse_list();
        if pairs.is_empty() {
            return None;
        }
        Some(pairs[rng.gen_range(0..pairs.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RandomNetworkParams {
        RandomNetworkParams {
            n_neurons: 40,
            n_inputs: 4,
            n_outputs: 3,
            seed: 1234,
            ..RandomNetworkParams::default()
        }
    }

    #[test]
    fn same_seed_same_network() {
        let mut a = Network::new();
        let mut b = Network::new();
        a.make_random(&params()).unwrap();
        b.make_random(&params()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.synapse_list(), b.synapse_list());
    }

    #[test]
    fn different_seed_different_network() {
        let mut a = Network::new();
        let mut b = Network::new();
        a.make_random(&params()).unwrap();
        b.make_random(&RandomNetworkParams { seed: 4321, ..params() }).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn io_layout_is_positional() {
        let mut net = Network::new();
        net.make_random(&params()).unwrap();
        assert_eq!(net.num_neurons(), 40);
        assert_eq!(net.num_inputs(), 4);
        assert_eq!(net.num_outputs(), 3);
        for i in 0..4 {
            assert_eq!(net.input(i), Some(i as u32));
        }
        for o in 0..3 {
            assert_eq!(net.output(o), Some(4 + o as u32));
        }
        assert!(net.num_synapses() > 0);
    }

    #[test]
    fn hidden_fanin_cap_is_honored() {
        let p = RandomNetworkParams {
            hidden_fanout: 20,
            hidden_fanin_cap: 3,
            input_fanout: 0,
            output_fanin: 0,
            ..params()
        };
        let mut net = Network::new();
        net.make_random(&p).unwrap();
        for n in net.neurons() {
            if n.input_id.is_none() && n.output_id.is_none() {
                assert!(n.synapses.len() <= 3);
            }
        }
    }

    #[test]
    fn weights_respect_the_device_range() {
        let mut net = Network::new();
        net.make_random(&params()).unwrap();
        for &(from, to) in net.synapse_list() {
            let s = net.get_synapse(from, to).unwrap();
            assert!((-127..=127).contains(&s.weight));
            assert!(s.delay <= 15);
        }
    }
}
