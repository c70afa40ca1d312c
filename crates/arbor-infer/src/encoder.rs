// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The encoder contract.

use arbor_engine::Spike;

/// Maps one feature vector to the spike train that represents it.
///
/// Implementations live with the host application. The pool invokes the
/// encoder exactly once per sample, never concurrently; the encoded trains
/// are then shared read-only across all worker threads.
pub trait SpikeEncoder: Sync {
    fn encode(&self, sample: &[f64]) -> Vec<Spike>;
}

impl<F> SpikeEncoder for F
where
    F: Fn(&[f64]) -> Vec<Spike> + Sync,
{
    fn encode(&self, sample: &[f64]) -> Vec<Spike> {
        self(sample)
    }
}
