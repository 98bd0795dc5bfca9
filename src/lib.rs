// Vorbis decoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

#![forbid(unsafe_code)]
#![cfg_attr(test, deny(warnings))]

/*!
A standalone decoder for the floor subsystem of the Ogg Vorbis I codec.

Two floor variants exist, "type 0" (LSP based) and "type 1" (point and
line based), and both are implemented here: configuration parsing from
the setup header (`FloorConfig`), per-packet unpacking (`FloorData`),
and the final curve synthesis that multiplies a residue buffer in place.

See the `floor`, `floor0` and `floor1` modules for the actual decoders,
and `codebook`/`packet_reader` for the bit-level collaborators they are
built on.
*/

extern crate tinyvec;
#[macro_use]
extern crate log;

pub mod packet_reader;
pub mod huffman_tree;
pub mod codebook;
pub mod floor;
pub mod floor0;
pub mod floor1;

pub use crate::codebook::{Codebook, SetupError};
pub use crate::floor::{FloorConfig, FloorData};

use std::error;
use std::fmt;

/// Errors that can occur while decoding the floor subsystem.
#[derive(Debug)]
pub enum FloorError {
    /// The setup header violated a structural constraint of the format.
    Setup(SetupError),
}

impl From<SetupError> for FloorError {
    fn from(err: SetupError) -> FloorError {
        FloorError::Setup(err)
    }
}

impl error::Error for FloorError {}

impl fmt::Display for FloorError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FloorError::Setup(e) => write!(fmt, "floor setup error: {}", e),
        }
    }
}

/// Returns the number of bits required to store `val`, per the Vorbis
/// spec's `ilog` primitive (`ilog(0) == 0`).
pub(crate) fn ilog(val: u64) -> u8 {
    64 - val.leading_zeros() as u8
}

/// Enables `log` output for tests that exercise the `debug!`/`trace!`
/// call sites; safe to call repeatedly across test threads.
#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = env_logger::try_init();
}

#[test]
fn test_ilog() {
    // Uses the test vectors from the Vorbis I spec
    assert_eq!(ilog(0), 0);
    assert_eq!(ilog(1), 1);
    assert_eq!(ilog(2), 2);
    assert_eq!(ilog(3), 2);
    assert_eq!(ilog(4), 3);
    assert_eq!(ilog(7), 3);
}
