// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arbor Infer
//!
//! Parallel batch inference: evaluate N networks over M encoded samples
//! with a pool of worker threads, each owning its own processor instance.
//!
//! Samples are encoded once, up front, on the calling thread. Network
//! indices feed the workers through a lock-free MPMC queue; a worker loads
//! a network, replays every encoded sample through it, takes the
//! highest-count output as the prediction, and clears activity between
//! samples. Workers share nothing mutable but the queue - each returns its
//! finished rows to the orchestrator, which assembles the N x M matrix
//! after the join.

mod encoder;
mod pool;

pub use encoder::SpikeEncoder;
pub use pool::{predict_all, BatchResult, PoolOptions};
