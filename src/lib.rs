// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arbor
//!
//! An event-driven engine for integer spiking neural networks.
//!
//! Arbor simulates networks of integrate-and-fire neurons with integer
//! charge, strict-greater-than thresholds, table-driven exponential leak,
//! and per-synapse/per-neuron delays, in discrete time. Spikes ride a
//! delay-bucketed circular event queue, so a cycle costs only the work
//! actually scheduled for it.
//!
//! This crate re-exports the workspace members:
//!
//! - [`arbor_neural`] - the network data model, constants, serialization
//! - [`arbor_engine`] - the cycle simulator and the processor facade
//! - [`arbor_infer`] - the parallel batch-inference pool
//!
//! ## Quick start
//!
//! ```
//! use arbor::{Backend, EventSimulator, Network};
//!
//! let mut net = Network::new();
//! net.add_neuron(0, 0, -1, 0).unwrap();
//! net.add_neuron(1, 1, -1, 0).unwrap();
//! net.add_synapse(0, 1, 100, 0).unwrap();
//! net.set_input(0, 0).unwrap();
//! net.set_output(1, 0).unwrap();
//!
//! let mut sim = EventSimulator::new();
//! sim.configure(Some(net));
//! sim.apply_input(0, 255, 0);
//! sim.simulate(10);
//! assert_eq!(sim.output_count(0, 0), 1);
//! ```

pub use arbor_engine::{
    Backend, EventSimulator, HostEdge, HostNetwork, HostNode, InputFire, Processor,
    ProcessorConfig, Spike,
};
pub use arbor_infer::{predict_all, BatchResult, PoolOptions, SpikeEncoder};
pub use arbor_neural::{
    constants, ArborError, Network, Neuron, RandomNetworkParams, Result, Synapse,
};
