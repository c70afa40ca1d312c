// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device constants and the fixed-point leak table.
//!
//! The leak table and `COMP_BITS` are a bit-exact approximation of
//! `2^(-t/tau)`; the simulator depends on these literal values to
//! reproduce output counts across implementations.

/// Synaptic weight bounds.
pub const MIN_WEIGHT: i16 = -127;
pub const MAX_WEIGHT: i16 = 127;

/// Synaptic delay bounds (in cycles).
pub const MIN_DELAY: u8 = 0;
pub const MAX_DELAY: u8 = 15;

/// Axonal (neuron) delay bounds (in cycles).
pub const MIN_AXON_DELAY: u8 = 0;
pub const MAX_AXON_DELAY: u8 = 15;

/// Stored charge bounds.
pub const MIN_CHARGE: i32 = -32768;
pub const MAX_CHARGE: i32 = 32767;

/// Firing threshold bounds.
pub const MIN_THRESHOLD: i16 = 0;
pub const MAX_THRESHOLD: i16 = 255;

/// Leak exponent bounds. `-1` disables leak, otherwise `tau = 2^leak`.
pub const MIN_LEAK: i8 = -1;
pub const MAX_LEAK: i8 = 4;

/// Shift applied after multiplying a charge by a [`LEAK_COMP`] entry.
pub const COMP_BITS: u32 = 10;

/// `2^(-t/tau)` compensation table, indexed by `t/16` of a tau period.
/// Must be regenerated if [`MAX_LEAK`] changes.
pub const LEAK_COMP: [i32; 16] = [
    512, //  0/16 0/8 0/4 0/2 0/1
    535, //  1/16
    558, //  2/16 1/8
    583, //  3/16
    609, //  4/16 2/8 1/4
    636, //  5/16
    664, //  6/16 3/8
    693, //  7/16
    724, //  8/16 4/8 2/4 1/2
    756, //  9/16
    790, // 10/16 5/8
    825, // 11/16
    861, // 12/16 6/8 3/4
    899, // 13/16
    939, // 14/16 7/8
    981, // 15/16
];

/// Largest weight a device input (e.g. a normalized spike) may carry.
pub const MAX_DEVICE_INPUT: i16 = MAX_THRESHOLD;
pub const DEVICE_INPUT_BITS: u32 = 8;

/// `last_event` value of a neuron that has never been touched.
pub const TIME_NEVER: u64 = u64::MAX;

/// Version of the network serialization format. Payloads declaring an
/// older version are rejected.
pub const FORMAT_VERSION: f64 = 0.4;

/// Round `v` up to the next power of two (`0` maps to `0`).
pub fn next_pow_of_2(mut v: u16) -> u16 {
    v = v.wrapping_sub(1);
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v.wrapping_add(1)
}

/// Bucket index of time `t` in a ring whose length is `mask + 1`.
#[inline]
pub const fn delay_bucket(t: u64, mask: u16) -> usize {
    (t & mask as u64) as usize
}
