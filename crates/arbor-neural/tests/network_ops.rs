// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structural operations on networks: metrics, pruning, copying,
//! serialization round-trips.

use arbor_neural::{Network, RandomNetworkParams};

#[test]
fn network_metrics_are_correctly_reported() {
    let mut net = Network::new();
    let (ca, cb, cc, cd) = (0, 1, 2, 3);

    net.add_neuron(ca, 2, -1, 0).unwrap();
    net.add_neuron(cb, 2, -1, 0).unwrap();
    net.add_neuron(cc, 1, -1, 0).unwrap();
    net.add_neuron(cd, 2, -1, 0).unwrap();
    assert_eq!(net.metric("neuron_count"), 4.0);

    net.remove_neuron(cd);
    assert_eq!(net.metric("neuron_count"), 3.0);
    assert_eq!(net.num_neurons(), 3);

    assert_eq!(net.metric("synapse_count"), 0.0);

    net.add_synapse(ca, cb, 100, 0).unwrap();
    net.add_synapse(cb, ca, -100, 0).unwrap();
    net.add_synapse(cc, cb, 1, 15).unwrap();
    net.add_synapse(cb, cc, -1, 15).unwrap();
    assert_eq!(net.metric("synapse_count"), 4.0);
    assert_eq!(net.metric("inhibitory_synapse_count"), 2.0);
    assert_eq!(net.metric("excitatory_synapse_count"), 2.0);
    assert_eq!(net.num_synapses(), 4);

    net.remove_synapse(ca, cb);
    assert_eq!(net.metric("synapse_count"), 3.0);
    assert_eq!(net.metric("excitatory_synapse_count"), 1.0);

    net.remove_synapse(cb, ca);
    assert_eq!(net.metric("inhibitory_synapse_count"), 1.0);

    // unknown metrics are a warning, not an error
    assert_eq!(net.metric("flux_capacitance"), 0.0);

    net.clear();
    assert_eq!(net.num_neurons(), 0);
    assert_eq!(net.num_synapses(), 0);
    assert_eq!(net.metric("neuron_count"), 0.0);
    assert_eq!(net.metric("synapse_count"), 0.0);
}

#[test]
fn synapse_count_matches_the_flat_list() {
    let mut net = Network::new();
    for id in 0..6 {
        net.add_neuron(id, 1, -1, 0).unwrap();
    }
    for from in 0..6u32 {
        for to in 0..6u32 {
            if from != to {
                net.add_synapse(from, to, 1, 0).unwrap();
            }
        }
    }
    assert_eq!(net.num_synapses(), net.synapse_list().len());
    net.remove_neuron(2);
    assert_eq!(net.num_synapses(), net.synapse_list().len());
    assert!(net.synapse_list().iter().all(|&(f, t)| f != 2 && t != 2));
}

#[test]
fn copies_are_independent() {
    let mut net = Network::new();
    net.add_neuron(0, 1, -1, 0).unwrap();
    net.add_neuron(1, 2, -1, 0).unwrap();
    net.add_neuron(4, 3, -1, 0).unwrap();

    net.add_synapse(0, 1, 10, 1).unwrap();
    net.add_synapse(0, 4, 20, 1).unwrap();
    net.add_synapse(1, 0, 99, 1).unwrap();
    net.add_synapse(1, 4, 88, 1).unwrap();
    net.add_synapse(4, 0, 1, 2).unwrap();

    let mut copy = net.clone();
    assert_eq!(copy, net);
    assert_eq!(copy.num_synapses(), 5);
    assert_eq!(copy.num_neurons(), 3);

    // the post-side map and pre-side list both survived the copy
    let na = copy.get_neuron(0).unwrap();
    assert_eq!(na.synapses.len(), 2);
    assert_eq!(na.outputs.len(), 2);
    let s = copy.get_synapse(1, 4).unwrap();
    assert_eq!((s.weight, s.delay), (88, 1));

    // mutating the copy leaves the original untouched
    copy.remove_synapse(0, 1);
    assert_eq!(copy.num_synapses(), 4);
    assert_eq!(net.num_synapses(), 5);
    assert!(net.is_synapse(0, 1));
    assert_ne!(copy, net);
}

#[test]
fn prune_removes_unreachable_neurons() {
    let mut net = Network::new();
    for id in 0..8 {
        net.add_neuron(id, 100, -1, 0).unwrap();
    }
    net.set_input(0, 0).unwrap();
    net.set_output(3, 0).unwrap();

    net.add_synapse(0, 1, 100, 0).unwrap();
    net.add_synapse(0, 2, 100, 0).unwrap();
    net.add_synapse(0, 3, 100, 0).unwrap();
    net.add_synapse(1, 3, 100, 0).unwrap();
    net.add_synapse(2, 3, 100, 0).unwrap();
    net.add_synapse(3, 1, 100, 0).unwrap();
    net.add_synapse(3, 4, 100, 0).unwrap();
    net.add_synapse(3, 5, 100, 0).unwrap();
    net.add_synapse(5, 4, 100, 0).unwrap();
    net.add_synapse(4, 6, 100, 0).unwrap();

    net.prune(false);

    for id in 0..4 {
        assert!(net.is_neuron(id), "neuron {id} should survive");
    }
    for id in 4..8 {
        assert!(!net.is_neuron(id), "neuron {id} should be pruned");
    }

    // only intra-core edges remain
    let mut pairs: Vec<(u32, u32)> = net.synapse_list().to_vec();
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 3), (2, 3), (3, 1)]);
    assert_eq!(net.num_synapses(), 6);

    // prune resets activity when done
    assert!(net.neurons().all(|n| n.charge == 0));
}

#[test]
fn prune_keeps_io_neurons_unless_asked() {
    let mut net = Network::new();
    for id in 0..8 {
        net.add_neuron(id, 100, -1, 0).unwrap();
    }
    net.set_input(0, 0).unwrap();
    net.set_input(5, 1).unwrap();
    net.set_output(3, 0).unwrap();
    net.set_output(4, 1).unwrap();
    net.set_output(6, 2).unwrap();

    net.add_synapse(0, 1, 100, 0).unwrap();
    net.add_synapse(1, 2, 100, 0).unwrap();
    net.add_synapse(2, 3, 100, 0).unwrap();
    net.add_synapse(4, 6, 100, 0).unwrap();
    net.add_synapse(6, 4, 100, 0).unwrap();

    net.prune(false);
    for id in [0, 1, 2, 3, 4, 5, 6] {
        assert!(net.is_neuron(id));
    }
    assert!(!net.is_neuron(7));
    assert!(net.is_synapse(4, 6));
    assert!(net.is_synapse(6, 4));

    net.prune(true);
    for id in [0, 1, 2, 3] {
        assert!(net.is_neuron(id));
    }
    for id in [4, 5, 6, 7] {
        assert!(!net.is_neuron(id));
    }
    assert!(net.is_synapse(0, 1));
    assert!(net.is_synapse(1, 2));
    assert!(net.is_synapse(2, 3));
    assert!(!net.is_synapse(4, 6));
}

#[test]
fn serialization_round_trips_a_dense_network() {
    let mut net = Network::new();
    for id in 0..20 {
        net.add_neuron(id, 100 + id as i16, -1, 0).unwrap();
    }
    for from in 0..20u32 {
        for to in 0..20u32 {
            if from != to {
                let weight = (25 + 3 * from as i16 + to as i16) % 127;
                net.add_synapse(from, to, weight, (from / 2) as u8).unwrap();
            }
        }
    }
    for i in 0..4u32 {
        net.set_input(i, i as usize).unwrap();
    }
    for i in 0..3u32 {
        net.set_output(17 + i, i as usize).unwrap();
    }

    let text = net.to_json_string();
    let restored = Network::from_json_str(&text).unwrap();

    assert_eq!(restored.num_neurons(), net.num_neurons());
    assert_eq!(restored.num_synapses(), net.num_synapses());
    assert_eq!(restored, net);

    for &id in net.neuron_list() {
        let a = net.get_neuron(id).unwrap();
        let b = restored.get_neuron(id).unwrap();
        assert_eq!(a.threshold, b.threshold);
        assert_eq!(a.leak, b.leak);
        assert_eq!(a.input_id, b.input_id);
        assert_eq!(a.output_id, b.output_id);
        assert_eq!(a.synapses, b.synapses);
    }
}

#[test]
fn make_random_is_reproducible() {
    let params = RandomNetworkParams {
        n_neurons: 100,
        n_inputs: 10,
        n_outputs: 5,
        seed: 0xA5A5,
        ..RandomNetworkParams::default()
    };

    let mut a = Network::new();
    let mut b = Network::new();
    a.make_random(&params).unwrap();
    b.make_random(&params).unwrap();
    assert_eq!(a, b);

    // a random network survives the serialization round-trip too
    let restored = Network::from_json(&a.to_json()).unwrap();
    assert_eq!(restored, a);
}
