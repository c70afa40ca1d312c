// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arbor Neural
//!
//! Data model for the Arbor integer spiking-network engine.
//!
//! This crate holds everything the simulator and the batch-inference pool
//! share but do not own: the device constants and the fixed-point leak
//! table, the error taxonomy, and the [`Network`] arena of neurons and
//! synapses with its mutation, pruning, random-generation, and
//! serialization APIs.
//!
//! Neurons live in an id-keyed table; every synapse is reachable both from
//! its post-synaptic neuron's input map and from its pre-synaptic neuron's
//! output list, and the two views always agree on weight and delay. The
//! simulator borrows neurons through [`Network`] accessors and mutates only
//! their dynamic fields (`charge`, `last_event`, `tcheck`).

pub mod constants;
pub mod error;
pub mod network;
pub mod random;
pub mod serial;

pub use error::{ArborError, Result};
pub use network::{Network, Neuron, Synapse};
pub use random::RandomNetworkParams;
