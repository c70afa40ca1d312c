// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The worker pool.

use std::thread;

use crossbeam::queue::ArrayQueue;
use serde_json::Value;
use tracing::warn;

use arbor_engine::Processor;
use arbor_neural::{ArborError, Network, Result};

use crate::encoder::SpikeEncoder;

/// Pool tuning knobs.
#[derive(Clone, Debug)]
pub struct PoolOptions {
    /// Worker thread count.
    pub threads: usize,
    /// Per-sample labels; when present, per-network accuracy is scored.
    pub labels: Option<Vec<i64>>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            labels: None,
        }
    }
}

/// Predictions (and optional accuracy scores) for a batch run.
#[derive(Clone, Debug)]
pub struct BatchResult {
    /// `predictions[n][m]` is the winning output index of network `n` on
    /// sample `m`.
    pub predictions: Vec<Vec<i64>>,
    /// Per-network accuracy against the provided labels.
    pub scores: Option<Vec<f64>>,
}

/// Evaluate every network on every sample.
///
/// The encoder runs once per sample on this thread; the networks are then
/// distributed to `opts.threads` workers through an MPMC index queue. A
/// network that cannot be evaluated keeps an all-zero prediction row and
/// the batch continues.
pub fn predict_all(
    config: &Value,
    encoder: &dyn SpikeEncoder,
    networks: &[Network],
    samples: &[Vec<f64>],
    num_steps: u64,
    opts: &PoolOptions,
) -> Result<BatchResult> {
    // fail before spawning anything if the configuration is unusable
    Processor::new(config)?;

    if let Some(labels) = &opts.labels {
        if labels.len() != samples.len() {
            return Err(ArborError::InvalidArgument(format!(
                "got {} labels for {} samples",
                labels.len(),
                samples.len()
            )));
        }
    }

    // Phase 1: encode, single-threaded, exactly once per sample
    let encoded: Vec<_> = samples.iter().map(|s| encoder.encode(s)).collect();

    // Phase 2/3: seed the index queue and dispatch the workers
    let queue = ArrayQueue::new(networks.len().max(1));
    for id in 0..networks.len() {
        // capacity equals the id count, a push cannot fail
        let _ = queue.push(id);
    }

    let threads = opts.threads.max(1);
    let mut rows: Vec<(usize, Vec<i64>, Option<f64>)> = Vec::with_capacity(networks.len());

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            handles.push(scope.spawn(|| worker(config, &queue, networks, &encoded, num_steps, opts)));
        }
        for handle in handles {
            if let Ok(mut part) = handle.join() {
                rows.append(&mut part);
            }
        }
    });

    // Phase 4: assemble the matrix; failed rows stay all-zero
    let mut predictions = vec![vec![0i64; samples.len()]; networks.len()];
    let mut scores = opts.labels.as_ref().map(|_| vec![0.0; networks.len()]);
    for (id, row, score) in rows {
        predictions[id] = row;
        if let (Some(scores), Some(score)) = (scores.as_mut(), score) {
            scores[id] = score;
        }
    }

    Ok(BatchResult { predictions, scores })
}

/// One worker: its own processor, networks claimed from the queue until
/// it runs dry.
fn worker(
    config: &Value,
    queue: &ArrayQueue<usize>,
    networks: &[Network],
    encoded: &[Vec<arbor_engine::Spike>],
    num_steps: u64,
    opts: &PoolOptions,
) -> Vec<(usize, Vec<i64>, Option<f64>)> {
    let mut finished = Vec::new();
    let Ok(mut proc) = Processor::new(config) else {
        // already validated by the orchestrator
        return finished;
    };

    while let Some(id) = queue.pop() {
        let row = match predict_network(&mut proc, &networks[id], encoded, num_steps) {
            Ok(row) => row,
            Err(err) => {
                warn!("network {} failed, keeping a zero row: {}", id, err);
                vec![0; encoded.len()]
            }
        };

        let score = opts.labels.as_ref().map(|labels| {
            let hits = row.iter().zip(labels).filter(|(p, l)| p == l).count();
            hits as f64 / labels.len().max(1) as f64
        });

        finished.push((id, row, score));
    }
    finished
}

fn predict_network(
    proc: &mut Processor,
    network: &Network,
    encoded: &[Vec<arbor_engine::Spike>],
    num_steps: u64,
) -> Result<Vec<i64>> {
    if network.num_outputs() == 0 {
        return Err(ArborError::InvalidArgument(
            "network has no output channels".into(),
        ));
    }

    proc.load(network.clone());

    let mut row = Vec::with_capacity(encoded.len());
    for spikes in encoded {
        proc.apply_spikes(spikes, true, 0)?;
        proc.run(num_steps as f64, 0)?;

        let (winner, _) = proc.output_max_count(0)?;
        row.push(winner as i64);

        proc.clear_activity(0)?;
    }
    Ok(row)
}
