// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The spike record exchanged with host frameworks and encoders.

use serde::{Deserialize, Serialize};

/// One externally applied spike.
///
/// `value` is normalized to `[0, 1]`; the processor scales it by the
/// device input resolution (255) and rounds. `time` is relative to the
/// engine's current time; fractional cycles are floored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    /// Input channel index.
    pub id: u32,
    pub time: f64,
    pub value: f64,
}

impl Spike {
    pub fn new(id: u32, time: f64, value: f64) -> Self {
        Self { id, time, value }
    }
}
