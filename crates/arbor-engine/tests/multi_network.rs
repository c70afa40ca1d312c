// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Batch execution of shape-identical networks in one engine.

use arbor_engine::{Backend, EventSimulator, Processor, Spike};
use arbor_neural::{ArborError, Network};
use serde_json::json;

fn generate_pass(net: &mut Network, width: u32, height: u32, delay: u8) {
    for row in 0..height {
        for col in 0..width {
            let id = row * width + col;
            net.add_neuron(id, 1, -1, 0).unwrap();
            if col != 0 {
                net.add_synapse(id - 1, id, 127, delay).unwrap();
            }
            if col == 0 {
                net.set_input(id, row as usize).unwrap();
            } else if col == width - 1 {
                net.set_output(id, row as usize).unwrap();
            }
        }
    }
}

#[test]
fn chains_of_increasing_width_finish_in_order() {
    const HEIGHT: u32 = 2;
    const COUNT: usize = 25;
    const STEPS: u64 = 42;

    let mut networks = Vec::new();
    for i in 0..COUNT {
        let mut net = Network::new();
        generate_pass(&mut net, i as u32 + 2, HEIGHT, 1);
        networks.push(net);
    }

    let mut sim = EventSimulator::new();
    sim.configure_multi(networks).unwrap();
    for o in 0..HEIGHT {
        sim.track_timing(o, true);
    }
    assert_eq!(sim.time(), 0);

    for row in 0..HEIGHT {
        sim.apply_input(row, 200, row as u64);
    }
    sim.simulate(STEPS);

    for i in 0..COUNT {
        let expected = 2 * (i as i64 + 1);
        if i <= 19 {
            assert_eq!(sim.output_count(0, i), 1, "network {i} output 0");
            assert_eq!(sim.last_output_time(0, i), expected + 1);
        } else {
            assert_eq!(sim.output_count(0, i), 0, "network {i} output 0");
        }
        if i <= 18 {
            assert_eq!(sim.output_count(1, i), 1, "network {i} output 1");
            assert_eq!(sim.last_output_time(1, i), expected + 2);
        } else {
            assert_eq!(sim.output_count(1, i), 0, "network {i} output 1");
        }
        assert_eq!(sim.network(i).unwrap().time(), STEPS);
    }
}

#[test]
fn output_neurons_carry_their_batch_index() {
    let mut networks = Vec::new();
    for _ in 0..4 {
        let mut net = Network::new();
        generate_pass(&mut net, 2, 1, 0);
        networks.push(net);
    }

    let mut sim = EventSimulator::new();
    sim.configure_multi(networks).unwrap();

    for i in 0..4 {
        let net = sim.network(i).unwrap();
        let out = net.output(0).unwrap();
        assert_eq!(net.neuron(out).unwrap().tag, i as i32);
    }
}

#[test]
fn differing_shapes_are_rejected() {
    let mut a = Network::new();
    generate_pass(&mut a, 3, 2, 0);
    let mut b = Network::new();
    generate_pass(&mut b, 3, 1, 0);

    let mut sim = EventSimulator::new();
    let err = sim.configure_multi(vec![a, b]).unwrap_err();
    assert!(matches!(err, ArborError::ShapeMismatch { network: 1, .. }));
    assert!(!sim.simulate(5));
}

#[test]
fn an_unconnected_input_slot_drops_the_fire() {
    // network 1 loses the neuron behind input slot 1, the broadcast must
    // skip it instead of failing the whole cycle
    let mut a = Network::new();
    generate_pass(&mut a, 2, 2, 0);

    let mut b = Network::new();
    generate_pass(&mut b, 2, 2, 0);
    b.remove_neuron(2); // row 1 input neuron; the slot keeps its stale id
    assert_eq!(b.num_inputs(), 2);

    let mut sim = EventSimulator::new();
    sim.configure_multi(vec![a, b]).unwrap();
    sim.apply_input(1, 200, 0);
    sim.simulate(10);

    assert_eq!(sim.output_count(1, 0), 1);
    assert_eq!(sim.output_count(1, 1), 0);
}

#[test]
fn processor_multiplexes_over_loaded_networks() {
    let mut nets = Vec::new();
    for _ in 0..3 {
        let mut net = Network::new();
        generate_pass(&mut net, 3, 1, 1);
        nets.push(net);
    }

    let mut proc = Processor::new(&json!({})).unwrap();
    proc.load_networks(nets).unwrap();

    proc.apply_spike(&Spike::new(0, 0.0, 1.0), true, 0).unwrap();
    proc.run(20.0, 0).unwrap();

    for id in 0..3 {
        assert_eq!(proc.output_count(0, id).unwrap(), 1);
    }
    assert!(matches!(
        proc.output_count(0, 7),
        Err(ArborError::NotLoaded(7))
    ));

    proc.clear_activity(0).unwrap();
    for id in 0..3 {
        assert_eq!(proc.get_time(id).unwrap(), 0.0);
    }
}
