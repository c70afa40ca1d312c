// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared error taxonomy for the Arbor workspace.

use thiserror::Error;

/// Errors surfaced by the data model, the event engine, the processor
/// facade, and the batch-inference pool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArborError {
    #[error("configuration rejected: {0}")]
    BadConfiguration(String),

    #[error("backend '{0}' is not available in this build")]
    UnsupportedBackend(String),

    #[error("network format version {found} is below the supported minimum {min}")]
    UnsupportedVersion { found: f64, min: f64 },

    #[error("malformed network payload: {0}")]
    BadSerialization(String),

    #[error("no neuron with id {0}")]
    UnknownNeuron(u32),

    #[error("{name} = {value} is outside [{min}, {max}]")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("network {0} is not loaded")]
    NotLoaded(usize),

    #[error(
        "network {network} has shape {found_inputs}x{found_outputs}, \
         expected {inputs}x{outputs}"
    )]
    ShapeMismatch {
        network: usize,
        inputs: usize,
        outputs: usize,
        found_inputs: usize,
        found_outputs: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("event arrays must have matching lengths ({0})")]
    LengthMismatch(String),
}

pub type Result<T> = std::result::Result<T, ArborError>;

impl From<serde_json::Error> for ArborError {
    fn from(err: serde_json::Error) -> Self {
        ArborError::BadSerialization(err.to_string())
    }
}
