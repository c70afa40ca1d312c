// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pool behavior: prediction matrices, scoring, failure policy.

use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_engine::Spike;
use arbor_infer::{predict_all, PoolOptions, SpikeEncoder};
use arbor_neural::{ArborError, Network};
use serde_json::json;

/// Pulses input 0 once, counting how often it is asked to encode.
struct CountingEncoder {
    calls: AtomicUsize,
}

impl CountingEncoder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl SpikeEncoder for CountingEncoder {
    fn encode(&self, _sample: &[f64]) -> Vec<Spike> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        vec![Spike::new(0, 0.0, 1.0)]
    }
}

/// 1-input/2-output network that always answers `class`.
fn class_network(class: usize) -> Network {
    let mut net = Network::new();
    net.add_neuron(0, 0, -1, 0).unwrap();
    net.add_neuron(1, 1, -1, 0).unwrap();
    net.add_neuron(2, 1, -1, 0).unwrap();
    net.set_input(0, 0).unwrap();
    net.set_output(1, 0).unwrap();
    net.set_output(2, 1).unwrap();
    net.add_synapse(0, (1 + class) as u32, 100, 0).unwrap();
    net
}

fn samples(count: usize) -> Vec<Vec<f64>> {
    (0..count).map(|i| vec![i as f64]).collect()
}

#[test]
fn every_network_predicts_every_sample() {
    let networks: Vec<Network> = (0..6).map(|i| class_network(i % 2)).collect();
    let encoder = CountingEncoder::new();

    let result = predict_all(
        &json!({}),
        &encoder,
        &networks,
        &samples(3),
        10,
        &PoolOptions::default(),
    )
    .unwrap();

    assert_eq!(result.predictions.len(), 6);
    for (n, row) in result.predictions.iter().enumerate() {
        assert_eq!(row, &vec![(n % 2) as i64; 3], "network {n}");
    }
    assert!(result.scores.is_none());

    // the encoder ran exactly once per sample
    assert_eq!(encoder.calls.load(Ordering::Relaxed), 3);
}

#[test]
fn the_matrix_does_not_depend_on_the_worker_count() {
    let networks: Vec<Network> = (0..8).map(|i| class_network(i % 2)).collect();

    let mut results = Vec::new();
    for threads in [1, 2, 4, 8] {
        let encoder = CountingEncoder::new();
        let opts = PoolOptions { threads, ..PoolOptions::default() };
        let result =
            predict_all(&json!({}), &encoder, &networks, &samples(4), 10, &opts).unwrap();
        results.push(result.predictions);
    }
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
}

#[test]
fn labels_produce_per_network_accuracy() {
    let networks = vec![class_network(0), class_network(1)];
    let encoder = CountingEncoder::new();
    let opts = PoolOptions {
        threads: 2,
        labels: Some(vec![0, 1, 0]),
    };

    let result =
        predict_all(&json!({}), &encoder, &networks, &samples(3), 10, &opts).unwrap();

    let scores = result.scores.unwrap();
    assert!((scores[0] - 2.0 / 3.0).abs() < 1e-9);
    assert!((scores[1] - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn ties_break_toward_the_lowest_output_index() {
    let mut net = class_network(0);
    net.add_synapse(0, 2, 100, 0).unwrap(); // both outputs now fire equally

    let encoder = CountingEncoder::new();
    let result = predict_all(
        &json!({}),
        &encoder,
        &[net],
        &samples(2),
        10,
        &PoolOptions::default(),
    )
    .unwrap();

    assert_eq!(result.predictions[0], vec![0, 0]);
}

#[test]
fn a_broken_network_keeps_a_zero_row_and_the_batch_continues() {
    let mut headless = Network::new();
    headless.add_neuron(0, 0, -1, 0).unwrap();
    headless.set_input(0, 0).unwrap(); // no outputs at all

    let networks = vec![class_network(1), headless, class_network(1)];
    let encoder = CountingEncoder::new();
    let opts = PoolOptions {
        threads: 2,
        labels: Some(vec![1, 1]),
    };

    let result =
        predict_all(&json!({}), &encoder, &networks, &samples(2), 10, &opts).unwrap();

    assert_eq!(result.predictions[0], vec![1, 1]);
    assert_eq!(result.predictions[1], vec![0, 0]);
    assert_eq!(result.predictions[2], vec![1, 1]);

    let scores = result.scores.unwrap();
    assert_eq!(scores[0], 1.0);
    assert_eq!(scores[1], 0.0);
    assert_eq!(scores[2], 1.0);
}

#[test]
fn bad_configurations_fail_before_dispatch() {
    let encoder = CountingEncoder::new();
    let err = predict_all(
        &json!({ "Backend": "Quantum_Annealer" }),
        &encoder,
        &[class_network(0)],
        &samples(1),
        10,
        &PoolOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ArborError::UnsupportedBackend(_)));
    assert_eq!(encoder.calls.load(Ordering::Relaxed), 0);
}

#[test]
fn label_and_sample_counts_must_agree() {
    let encoder = CountingEncoder::new();
    let opts = PoolOptions {
        threads: 1,
        labels: Some(vec![0]),
    };
    let err = predict_all(&json!({}), &encoder, &[class_network(0)], &samples(3), 10, &opts)
        .unwrap_err();
    assert!(matches!(err, ArborError::InvalidArgument(_)));
}
