// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arbor Engine
//!
//! Discrete-time, event-driven execution of Arbor spiking networks.
//!
//! The [`EventSimulator`] runs one or many shape-identical networks through
//! a delay-bucketed circular event queue: input fires drain from a pending
//! vector, internal fires ride the ring, and threshold checks run once per
//! touched neuron per cycle. The [`Processor`] facade validates a
//! configuration, converts host networks into the internal form, and
//! multiplexes spikes, runs, and output queries over the loaded networks.
//!
//! The engine is single-threaded and cooperative: a `simulate` call runs to
//! completion with exclusive access to the loaded networks. Parallelism
//! lives one layer up, in the batch-inference pool, which composes
//! independent engine instances.

pub mod backend;
pub mod convert;
pub mod processor;
pub mod simulator;
pub mod spike;

pub use backend::{Backend, InputFire};
pub use convert::{HostEdge, HostNetwork, HostNode};
pub use processor::{Processor, ProcessorConfig};
pub use simulator::EventSimulator;
pub use spike::Spike;
