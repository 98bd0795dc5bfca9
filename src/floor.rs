// Vorbis decoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Top level floor type dispatch.

A stream picks one of the two floor types per setup-time declaration;
[`FloorConfig`] and [`FloorData`] erase that choice behind a tagged
enum so callers don't need to match on the floor type themselves.
*/

use crate::codebook::{Codebook, SetupError};
use crate::floor0::{self, Floor0Config, Floor0Data};
use crate::floor1::{self, Floor1Config, Floor1Data};
use crate::packet_reader::PacketReader;

/// Immutable per-stream floor configuration, parsed once from the
/// setup header.
pub enum FloorConfig {
    Type0(Floor0Config),
    Type1(Floor1Config),
}

impl FloorConfig {
    /// Reads the floor type tag and dispatches to the matching
    /// type-specific setup parser.
    pub fn read(rdr: &mut PacketReader, codebook_cnt: u16, blocksizes: (u8, u8))
            -> Result<FloorConfig, SetupError> {
        let floor_type = rdr.read_u16()?;
        match floor_type {
            0 => Ok(FloorConfig::Type0(Floor0Config::read(rdr, codebook_cnt, blocksizes)?)),
            1 => Ok(FloorConfig::Type1(Floor1Config::read(rdr, codebook_cnt)?)),
            _ => Err(SetupError::MalformedStream),
        }
    }
}

enum FloorDataKind {
    Type0(Floor0Data),
    Type1(Floor1Data),
}

/// Per-packet, per-channel decoded floor data.
///
/// `force_energy` and `force_no_energy` are public overrides a
/// collaborating residue stage may set after channel coupling has been
/// resolved; [`FloorData::exec_channel`] folds them together with the
/// type-specific `has_energy` into the final execute-channel decision.
pub struct FloorData {
    kind: FloorDataKind,
    pub force_energy: bool,
    pub force_no_energy: bool,
}

impl FloorData {
    /// Reads the per-packet floor data matching `cfg`'s type.
    pub fn unpack(rdr: &mut PacketReader, codebooks: &[Codebook], cfg: &FloorConfig,
            block_size: u16) -> Result<FloorData, SetupError> {
        let kind = match cfg {
            FloorConfig::Type0(c) => FloorDataKind::Type0(floor0::unpack(rdr, codebooks, c, block_size)?),
            FloorConfig::Type1(c) => FloorDataKind::Type1(floor1::unpack(rdr, codebooks, c, block_size)?),
        };
        Ok(FloorData { kind, force_energy: false, force_no_energy: false })
    }

    fn has_energy(&self) -> bool {
        match &self.kind {
            FloorDataKind::Type0(d) => d.has_energy(),
            FloorDataKind::Type1(d) => d.has_energy(),
        }
    }

    /// Whether the residue stage should process this channel at all:
    /// `(force_energy OR has_energy) AND NOT force_no_energy`.
    pub fn exec_channel(&self) -> bool {
        (self.force_energy || self.has_energy()) && !self.force_no_energy
    }

    /// Synthesises the floor curve and multiplies `residue` in place,
    /// dispatching to the type-specific implementation. `blockflag`
    /// selects which of the two cached bark maps floor type 0 uses;
    /// floor type 1 ignores it.
    pub fn apply(&self, cfg: &FloorConfig, blockflag: bool, residue: &mut [f32]) {
        match (&self.kind, cfg) {
            (FloorDataKind::Type0(d), FloorConfig::Type0(c)) => floor0::apply(d, c, blockflag, residue),
            (FloorDataKind::Type1(d), FloorConfig::Type1(c)) => floor1::apply(d, c, residue),
            _ => unreachable!("FloorData and FloorConfig type tags must match"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_floor_type_is_rejected() {
        let data = [0u8, 2, 0, 0];
        let mut rdr = PacketReader::new(&data);
        let err = FloorConfig::read(&mut rdr, 1, (8, 10)).unwrap_err();
        assert_eq!(err, SetupError::MalformedStream);
    }

    fn floor_data_for_test(has_energy: bool) -> FloorData {
        let kind = FloorDataKind::Type0(Floor0Data {
            block_size: 64,
            amp: if has_energy { 1 } else { 0 },
            coeff: None,
        });
        FloorData { kind, force_energy: false, force_no_energy: false }
    }

    #[test]
    fn test_exec_channel_overrides() {
        let mut data = floor_data_for_test(false);
        assert!(!data.exec_channel());

        data.force_energy = true;
        assert!(data.exec_channel());

        data.force_no_energy = true;
        assert!(!data.exec_channel());
    }

    #[test]
    fn test_exec_channel_has_energy() {
        let data = floor_data_for_test(true);
        assert!(data.exec_channel());
    }
}
