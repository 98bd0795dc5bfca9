// Vorbis decoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Codebook decoding

A `Codebook` is parsed once from the setup header and then used
throughout the stream both for Huffman-only scalar decoding (used
by floor type 1's class/subclass books) and for combined
Huffman+VQ vector decoding (used by floor type 0 and by residues).
*/

use std::error;
use std::fmt;

use crate::huffman_tree::{HuffmanError, VorbisHuffmanTree};
use crate::packet_reader::{EndOfPacket, PacketReader};
use crate::ilog;

/// Errors that can occur while parsing a codebook (or anything else)
/// out of the setup header.
#[derive(Debug, PartialEq, Eq)]
pub enum SetupError {
    EndOfPacket,
    /// The setup header violates a structural constraint of the
    /// Vorbis I spec (out of range index, malformed codeword
    /// lengths, duplicate floor1 x values, unknown floor type, ...).
    MalformedStream,
}

impl From<EndOfPacket> for SetupError {
    fn from(_: EndOfPacket) -> SetupError {
        SetupError::EndOfPacket
    }
}

impl From<HuffmanError> for SetupError {
    fn from(_: HuffmanError) -> SetupError {
        SetupError::MalformedStream
    }
}

impl error::Error for SetupError {}

impl fmt::Display for SetupError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let description = match self {
            SetupError::EndOfPacket => "end of packet reached while reading setup header",
            SetupError::MalformedStream => "setup header violates the format",
        };
        write!(fmt, "{}", description)
    }
}

/// A parsed codebook: Huffman tree plus an optional VQ lookup table.
pub struct Codebook {
    pub(crate) codebook_dimensions: u16,
    #[allow(dead_code)]
    pub(crate) codebook_entries: u32,

    // None if codebook_lookup_type == 0
    pub(crate) codebook_vq_lookup_vec: Option<Vec<f32>>,

    pub(crate) codebook_huffman_tree: VorbisHuffmanTree,
}

/// Error returned by `Codebook::decode_vq` / `PacketReader::read_huffman_vq`.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeVqError {
    EndOfPacket,
    /// The referenced codebook has `codebook_lookup_type == 0` and
    /// therefore carries no VQ lookup table at all.
    NoVqLookupForCodebook,
}

impl From<EndOfPacket> for DecodeVqError {
    fn from(_: EndOfPacket) -> Self {
        DecodeVqError::EndOfPacket
    }
}

impl error::Error for DecodeVqError {}

impl fmt::Display for DecodeVqError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let description = match self {
            DecodeVqError::EndOfPacket => "end of packet reached while decoding a VQ codeword",
            DecodeVqError::NoVqLookupForCodebook => "codebook has no VQ lookup table",
        };
        write!(fmt, "{}", description)
    }
}

impl Codebook {
    /// Decodes a single Huffman codeword, returning its scalar payload.
    ///
    /// Used by floor type 1's class and subclass master books, which
    /// never need the VQ lookup table.
    pub fn decode_scalar(&self, rdr: &mut PacketReader) -> Result<u32, EndOfPacket> {
        rdr.read_huffman(&self.codebook_huffman_tree)
    }

    /// Decodes a Huffman codeword and resolves it against the VQ
    /// lookup table, returning the decoded vector of `codebook_dimensions` floats.
    pub fn decode_vq(&self, rdr: &mut PacketReader) -> Result<&[f32], DecodeVqError> {
        let idx = rdr.read_huffman(&self.codebook_huffman_tree)? as usize;
        let lookup: &[f32] = match self.codebook_vq_lookup_vec.as_ref() {
            Some(v) => v,
            None => return Err(DecodeVqError::NoVqLookupForCodebook),
        };
        let dim = self.codebook_dimensions as usize;
        Ok(&lookup[idx * dim..(idx + 1) * dim])
    }

    /// Reads a codebook which is part of the setup header packet.
    pub fn read_setup(rdr: &mut PacketReader) -> Result<Codebook, SetupError> {
        read_codebook(rdr)
    }
}

struct CodebookVqLookup {
    codebook_lookup_type: u8,
    codebook_minimum_value: f32,
    codebook_delta_value: f32,
    codebook_sequence_p: bool,
    codebook_multiplicands: Vec<u32>,
}

/// Vector value decode for lookup
///
/// Prepares the VQ context vectors for later lookup by the codebook
/// abstraction layer. Returns `codebook_entries` many vectors, each
/// being `codebook_dimensions` scalars wide, all stored in one Vec.
fn lookup_vec_val_decode(lup: &CodebookVqLookup, codebook_entries: u32, codebook_dimensions: u16) -> Vec<f32> {
    let mut value_vectors = Vec::with_capacity(
        codebook_entries as usize * codebook_dimensions as usize);
    if lup.codebook_lookup_type == 1 {
        let codebook_lookup_values = lup.codebook_multiplicands.len();
        for lookup_offset in 0..codebook_entries {
            let mut last = 0.;
            let mut index_divisor = 1;
            for _ in 0..codebook_dimensions {
                let multiplicand_offset = (lookup_offset / index_divisor as u32) as usize %
                    codebook_lookup_values;
                let vec_elem = lup.codebook_multiplicands[multiplicand_offset] as f32 *
                    lup.codebook_delta_value + lup.codebook_minimum_value + last;
                if lup.codebook_sequence_p {
                    last = vec_elem;
                }
                value_vectors.push(vec_elem);
                index_divisor *= codebook_lookup_values;
            }
        }
    } else {
        for lookup_offset in 0..codebook_entries {
            let mut last = 0.;
            let mut multiplicand_offset: usize = lookup_offset as usize * codebook_dimensions as usize;
            for _ in 0..codebook_dimensions {
                let vec_elem = lup.codebook_multiplicands[multiplicand_offset] as f32 *
                    lup.codebook_delta_value + lup.codebook_minimum_value + last;
                if lup.codebook_sequence_p {
                    last = vec_elem;
                }
                value_vectors.push(vec_elem);
                multiplicand_offset += 1;
            }
        }
    }
    value_vectors
}

static MAX_BASES_WITHOUT_OVERFLOW: &[u32] = &[
    0xffffffff, 0xffffffff, 0x0000ffff, 0x00000659,
    0x000000ff, 0x00000054, 0x00000028, 0x00000017,
    0x0000000f, 0x0000000b, 0x00000009, 0x00000007,
    0x00000006, 0x00000005, 0x00000004, 0x00000004,
    0x00000003, 0x00000003, 0x00000003, 0x00000003,
    0x00000003, 0x00000002, 0x00000002, 0x00000002,
    0x00000002, 0x00000002, 0x00000002, 0x00000002,
    0x00000002, 0x00000002, 0x00000002, 0x00000002];

static MAX_BASE_MAX_BITS_WITHOUT_OVERFLOW: &[u8] = &[
    0x1f, 0x1f, 0x0f, 0x0a,
    0x07, 0x06, 0x05, 0x04,
    0x03, 0x03, 0x03, 0x02,
    0x02, 0x02, 0x02, 0x02,
    0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01,
    0x01, 0x01, 0x01, 0x01];

// For this little function we won't include the num crate.
// precondition: base ^ exponent must not overflow.
fn exp_fast(base: u32, exponent: u8) -> u32 {
    let mut res: u32 = 1;
    let mut selfmul = base;
    for i in 0..8 {
        if (1 << i) & exponent > 0 {
            res *= selfmul;
        }
        if let Some(newselfmul) = u32::checked_mul(selfmul, selfmul) {
            selfmul = newselfmul;
        } else {
            // Check whether selfmul would have been needed.
            if i < 7 && (exponent >> (i + 1)) > 0 {
                panic!("Overflow when squaring for exp_fast, precondition violated!");
            }
            return res;
        }
    }
    res
}

/// Returns, as defined in the vorbis spec:
/// "the greatest integer for which to `[return_value]` the power of
/// `[codebook_dimensions]` is less than or equal to `[codebook_entries]`"
/// Essentially an "nth-root" algorithm.
fn lookup1_values(codebook_entries: u32, codebook_dimensions: u16) -> u32 {
    if codebook_dimensions >= 32 {
        // For codebook_dimensions >= 32 we'd already overflow the u32 range if
        // we computed 2 ^ codebook_dimensions.
        // Therefore, the result must be less than 2.
        return if codebook_entries == 0 { 0 } else { 1 };
    }
    let max_base_bits = MAX_BASE_MAX_BITS_WITHOUT_OVERFLOW[codebook_dimensions as usize];
    let max_base = MAX_BASES_WITHOUT_OVERFLOW[codebook_dimensions as usize];
    let mut base_bits: u32 = 0;
    for i in 0..max_base_bits + 1 {
        let cur_disputed_bit: u32 = 1 << (max_base_bits - i);
        base_bits |= cur_disputed_bit;
        if max_base < base_bits ||
                exp_fast(base_bits, codebook_dimensions as u8) > codebook_entries {
            base_bits &= !cur_disputed_bit;
        }
    }
    base_bits
}

#[test]
fn test_lookup1_values() {
    // First, with base two:
    // 2 ^ 10 = 1024
    assert_eq!(lookup1_values(1025, 10), 2);
    assert_eq!(lookup1_values(1024, 10), 2);
    assert_eq!(lookup1_values(1023, 10), 1);

    // Now, the searched base is five:
    // 5 ^ 5 = 3125
    assert_eq!(lookup1_values(3126, 5), 5);
    assert_eq!(lookup1_values(3125, 5), 5);
    assert_eq!(lookup1_values(3124, 5), 4);

    // Now some exotic tests (edge cases :p):
    assert_eq!(lookup1_values(1, 1), 1);
    assert_eq!(lookup1_values(0, 15), 0);
    assert_eq!(lookup1_values(0, 0), 0);
    assert_eq!(lookup1_values(1, 0), std::u32::MAX);
    assert_eq!(lookup1_values(400, 0), std::u32::MAX);
}

/// Macro to convert values of any unsigned integral non-usize type to
/// usize, and then check whether there had been any losses due to conversion.
macro_rules! convert_to_usize {
( $val:expr, $val_type:ident ) => { {
    let converted: usize = $val as usize;
    if $val != converted as $val_type {
        return Err(SetupError::MalformedStream);
    }
    converted
}}
}

/// Reads a codebook which is part of the setup header packet.
fn read_codebook(rdr: &mut PacketReader) -> Result<Codebook, SetupError> {
    // 1. Read the sync pattern
    let sync_pattern = rdr.read_u24()?;
    if sync_pattern != 0x564342 {
        return Err(SetupError::MalformedStream);
    }

    // 2. Read the _dimension, _entries fields and the ordered bitflag
    let codebook_dimensions = rdr.read_u16()?;
    let codebook_entries = rdr.read_u24()?;
    let ordered = rdr.read_bit_flag()?;

    // 3. Read the codeword lengths
    let mut codebook_codeword_lengths = Vec::with_capacity(
        convert_to_usize!(codebook_entries, u32));
    if !ordered {
        let sparse = rdr.read_bit_flag()?;
        for _ in 0..codebook_entries {
            let length = if sparse {
                let flag = rdr.read_bit_flag()?;
                if flag {
                    rdr.read_u5()? + 1
                } else {
                    // A zero length marks an unused entry; it is fine to
                    // reuse 0 for that purpose since elsewhere it is
                    // already guaranteed that used lengths are > 0.
                    0
                }
            } else {
                rdr.read_u5()? + 1
            };
            codebook_codeword_lengths.push(length);
        }
    } else {
        let mut current_entry: u32 = 0;
        let mut current_length = rdr.read_u5()? + 1;
        while current_entry < codebook_entries {
            let number = rdr.read_dyn_u32(
                ilog((codebook_entries - current_entry) as u64))?;
            for _ in current_entry..current_entry + number {
                codebook_codeword_lengths.push(current_length);
            }
            current_entry += number;
            current_length += 1;
            if current_entry > codebook_entries {
                return Err(SetupError::MalformedStream);
            }
        }
    }

    // 4. Read the vector lookup table
    let codebook_lookup_type = rdr.read_u4()?;
    if codebook_lookup_type > 2 {
        // Not decodable per vorbis spec
        return Err(SetupError::MalformedStream);
    }
    let codebook_lookup: Option<CodebookVqLookup> = if codebook_lookup_type == 0 {
        None
    } else {
        let codebook_minimum_value = rdr.read_f32()? as f32;
        let codebook_delta_value = rdr.read_f32()? as f32;
        let codebook_value_bits = rdr.read_u4()? + 1;
        let codebook_sequence_p = rdr.read_bit_flag()?;
        let codebook_lookup_values: u64 = if codebook_lookup_type == 1 {
            lookup1_values(codebook_entries, codebook_dimensions) as u64
        } else {
            codebook_entries as u64 * codebook_dimensions as u64
        };
        let mut codebook_multiplicands = Vec::with_capacity(
            convert_to_usize!(codebook_lookup_values, u64));
        for _ in 0..codebook_lookup_values {
            codebook_multiplicands.push(rdr.read_dyn_u32(codebook_value_bits)?);
        }
        Some(CodebookVqLookup {
            codebook_lookup_type,
            codebook_minimum_value,
            codebook_delta_value,
            codebook_sequence_p,
            codebook_multiplicands,
        })
    };
    let codebook_vq_lookup_vec = codebook_lookup.as_ref().map(|lup| {
        lookup_vec_val_decode(lup, codebook_entries, codebook_dimensions)
    });

    Ok(Codebook {
        codebook_dimensions,
        codebook_entries,
        codebook_vq_lookup_vec,
        codebook_huffman_tree: VorbisHuffmanTree::load_from_array(&codebook_codeword_lengths)?,
    })
}

#[test]
fn test_read_codebook_roundtrip() {
    // A minimal non-sparse, non-ordered codebook with no VQ lookup,
    // matching the official vorbis spec example from section 3.2.1:
    // codeword lengths [2, 4, 4, 4, 4, 2, 3, 3], 8 entries, 1 dimension.
    use crate::packet_reader::PacketReader;

    // We build the setup bytes by hand using the same writer logic the
    // reader expects: sync pattern (3 bytes), dimensions (u16), entries
    // (u24), ordered flag, sparse flag, then 8 * (u5 length - 1) fields,
    // then lookup type 0.
    //
    // Rather than hand-crafting raw bits, exercise decode_scalar logic
    // indirectly by constructing a VorbisHuffmanTree directly, since the
    // packed-bit encoding of this fixture is exercised by
    // huffman_tree::test_huffman_tree already.
    let tree = VorbisHuffmanTree::load_from_array(&[2, 4, 4, 4, 4, 2, 3, 3]).unwrap();
    let cb = Codebook {
        codebook_dimensions: 1,
        codebook_entries: 8,
        codebook_vq_lookup_vec: None,
        codebook_huffman_tree: tree,
    };
    let data = &[0b00000000u8]; // two leading zero bits decode to entry 0
    let mut rdr = PacketReader::new(data);
    assert_eq!(cb.decode_scalar(&mut rdr).unwrap(), 0);
}
