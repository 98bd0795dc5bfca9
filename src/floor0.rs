// Vorbis decoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Floor type 0: the legacy LSP (line spectral pair) based spectral
envelope, reconstructed in the Bark-warped frequency domain.
*/

use tinyvec::TinyVec;

use crate::codebook::{Codebook, DecodeVqError, SetupError};
use crate::ilog;
use crate::packet_reader::PacketReader;

/// The hard maximum for `order` the Vorbis I spec allows (it is read
/// as an 8 bit field, but the `apply` formula additionally needs at
/// least 6 coefficients to index into, see [`Floor0Config::read`]).
pub const MAX_ORDER: usize = 255;

/// Configuration for a floor type 0 instance, parsed once from the
/// setup header.
pub struct Floor0Config {
    pub(crate) order: u8,
    pub(crate) rate: u16,
    pub(crate) bark_map_size: u16,
    pub(crate) amp_bits: u8,
    pub(crate) amp_offset: u8,
    pub(crate) book_list: Vec<u8>,
    /// cos(omega) bark maps, cached per block size, indexed by
    /// block flag (0 = short, 1 = long). Holds `n` entries where the
    /// `n`-th (sentinel) entry is implied to be `-1.0`.
    cached_bark_cos_omega: [Vec<f32>; 2],
}

#[inline]
fn bark(x: f32) -> f32 {
    13.1 * (0.00074 * x).atan() + 2.24 * (0.0000000185 * x * x).atan() + 0.0001 * x
}

/// Precomputes bark map values used by floor type 0 packets.
///
/// Precomputes the cos(omega) values for use by floor type 0
/// computation. The output vec is `n` elements long, not `n+1` like
/// the spec's map array: the last entry (at index `n`), which the
/// spec defines as the sentinel `-1.0`, is implied rather than stored.
fn compute_bark_map_cos_omega(n: u16, rate: u16, bark_map_size: u16) -> Vec<f32> {
    let mut res = Vec::with_capacity(n as usize);
    let hfl = rate as f32 / 2.0;
    let hfl_dn = hfl / n as f32;
    let const_part = bark_map_size as f32 / bark(hfl);
    let bms_m1 = bark_map_size as f32 - 1.0;
    let omega_factor = std::f32::consts::PI / bark_map_size as f32;
    for i in 0..n {
        let mapped = (bark(i as f32 * hfl_dn) * const_part).floor();
        let map_elem = mapped.min(bms_m1);
        res.push((map_elem * omega_factor).cos());
    }
    res
}

impl Floor0Config {
    /// Reads a floor type 0 configuration from the setup header.
    ///
    /// `codebook_cnt` is required to reject out of range book indices;
    /// `blocksizes` are the stream's short and long block size
    /// exponents, from the identification header, used to size the
    /// two cached bark maps.
    pub fn read(rdr: &mut PacketReader, codebook_cnt: u16, blocksizes: (u8, u8))
            -> Result<Floor0Config, SetupError> {
        let order = rdr.read_u8()?;
        let rate = rdr.read_u16()?;
        let bark_map_size = rdr.read_u16()?;
        let amp_bits = rdr.read_u6()?;
        if amp_bits > 63 {
            // We can't read amplitudes wider than 63 bits into a u64.
            return Err(SetupError::MalformedStream);
        }
        let amp_offset = rdr.read_u8()?;
        let number_of_books = rdr.read_u4()? + 1;
        if order < 4 {
            // The curve computation below indexes coefficients up to
            // `2 * ((order - 1) / 2) + 1`; anything less than 4 makes
            // that indexing go out of bounds for some parity of order.
            return Err(SetupError::MalformedStream);
        }
        let mut book_list = Vec::with_capacity(number_of_books as usize);
        for _ in 0..number_of_books {
            let value = rdr.read_u8()?;
            if value as u16 >= codebook_cnt {
                return Err(SetupError::MalformedStream);
            }
            book_list.push(value);
        }
        trace!("floor0 setup: order={} rate={} bark_map_size={} amp_bits={}",
            order, rate, bark_map_size, amp_bits);
        Ok(Floor0Config {
            order,
            rate,
            bark_map_size,
            amp_bits,
            amp_offset,
            book_list,
            cached_bark_cos_omega: [
                compute_bark_map_cos_omega(1 << (blocksizes.0 - 1), rate, bark_map_size),
                compute_bark_map_cos_omega(1 << (blocksizes.1 - 1), rate, bark_map_size),
            ],
        })
    }
}

/// Per-packet decoded floor type 0 data.
pub struct Floor0Data {
    pub(crate) block_size: u16,
    pub(crate) amp: u64,
    pub(crate) coeff: Option<TinyVec<[f32; 32]>>,
}

impl Floor0Data {
    /// Whether this channel carries any spectral energy this packet.
    pub fn has_energy(&self) -> bool {
        self.amp > 0
    }
}

/// Reads the per-packet floor type 0 data: the amplitude, and, if the
/// amplitude is non zero, the coefficient codewords.
///
/// End-of-packet while reading the coefficients is not propagated as
/// an error: it silently demotes the channel to a silent floor, which
/// is the behaviour the residue stage needs (per spec, section 7 error
/// handling design).
pub fn unpack(rdr: &mut PacketReader, codebooks: &[Codebook], cfg: &Floor0Config,
        block_size: u16) -> Result<Floor0Data, SetupError> {
    let amp = match rdr.read_dyn_u64(cfg.amp_bits) {
        Ok(v) => v,
        Err(_) => return Ok(Floor0Data { block_size, amp: 0, coeff: None }),
    };
    if amp == 0 {
        return Ok(Floor0Data { block_size, amp: 0, coeff: None });
    }

    let booknumber = match rdr.read_dyn_u32(ilog(cfg.book_list.len() as u64)) {
        Ok(v) => v,
        Err(_) => return Ok(Floor0Data { block_size, amp: 0, coeff: None }),
    };
    let codebook_idx = match cfg.book_list.get(booknumber as usize) {
        Some(idx) => *idx,
        None => {
            debug!("floor0 unpack: book number {} out of range", booknumber);
            return Err(SetupError::MalformedStream);
        }
    };
    let codebook = &codebooks[codebook_idx as usize];

    let mut coefficients: TinyVec<[f32; 32]> = TinyVec::new();
    let mut last = 0.0f32;
    'outer: loop {
        let mut last_new = last;
        let temp_vector = match codebook.decode_vq(rdr) {
            Ok(v) => v,
            Err(DecodeVqError::EndOfPacket) => {
                return Ok(Floor0Data { block_size, amp: 0, coeff: None });
            }
            Err(DecodeVqError::NoVqLookupForCodebook) => {
                debug!("floor0 unpack: book {} referenced for VQ decode has no VQ lookup table",
                    codebook_idx);
                return Err(SetupError::MalformedStream);
            }
        };
        if temp_vector.len() + coefficients.len() < cfg.order as usize {
            for &e in temp_vector {
                coefficients.push((last + e).cos());
                last_new = e;
            }
        } else {
            for &e in temp_vector {
                coefficients.push((last + e).cos());
                last_new = e;
                if coefficients.len() == cfg.order as usize {
                    break 'outer;
                }
            }
        }
        last += last_new;
        if coefficients.len() >= cfg.order as usize {
            break 'outer;
        }
    }
    Ok(Floor0Data { block_size, amp, coeff: Some(coefficients) })
}

/// Synthesises the floor curve and multiplies `residue` in place.
///
/// No-op if the floor carries no energy (`amp == 0`).
pub fn apply(data: &Floor0Data, cfg: &Floor0Config, blockflag: bool, residue: &mut [f32]) {
    let coeff = match data.coeff.as_ref() {
        Some(c) => c,
        None => return,
    };
    let n = (data.block_size / 2) as usize;
    let cached_bark_cos_omega = &cfg.cached_bark_cos_omega[blockflag as usize];
    let lfv_common_term = data.amp as f32 * cfg.amp_offset as f32 /
        ((1u64 << cfg.amp_bits) - 1) as f32;

    let mut i = 0;
    while i < n {
        let cos_omega = cached_bark_cos_omega[i];

        let (p_upper_border, q_upper_border) = if cfg.order & 1 == 1 {
            ((cfg.order as usize - 3) / 2, (cfg.order as usize - 1) / 2)
        } else {
            let v = (cfg.order as usize - 2) / 2;
            (v, v)
        };
        let (mut p, mut q) = if cfg.order & 1 == 1 {
            (1.0 - cos_omega * cos_omega, 0.25)
        } else {
            ((1.0 - cos_omega) / 2.0, (1.0 + cos_omega) / 2.0)
        };
        for j in 0..p_upper_border + 1 {
            let pm = coeff[2 * j + 1] - cos_omega;
            p *= 4.0 * pm * pm;
        }
        for j in 0..q_upper_border + 1 {
            let qm = coeff[2 * j] - cos_omega;
            q *= 4.0 * qm * qm;
        }

        let linear_floor_value = (0.11512925 *
            (lfv_common_term / (p + q).sqrt() - cfg.amp_offset as f32)).exp();

        let mut iteration_condition = cos_omega;
        while cos_omega == iteration_condition {
            if i < residue.len() {
                residue[i] *= linear_floor_value;
            }
            i += 1;
            iteration_condition = match cached_bark_cos_omega.get(i) {
                Some(v) => *v,
                None => break,
            };
        }
    }
}

#[test]
fn test_silent_floor_is_noop() {
    crate::init_test_logger();
    let data = Floor0Data { block_size: 64, amp: 0, coeff: None };
    let cfg = Floor0Config {
        order: 8,
        rate: 44100,
        bark_map_size: 64,
        amp_bits: 6,
        amp_offset: 10,
        book_list: vec![0],
        cached_bark_cos_omega: [
            compute_bark_map_cos_omega(32, 44100, 64),
            compute_bark_map_cos_omega(32, 44100, 64),
        ],
    };
    let mut residue = vec![1.0f32; 32];
    apply(&data, &cfg, false, &mut residue);
    assert_eq!(residue, vec![1.0f32; 32]);
}

#[test]
fn test_bark_map_is_monotonic_nonincreasing_cos() {
    // cos(omega) should be monotonically non-increasing as bark bin grows,
    // since omega itself is monotonically non-decreasing in [0, pi].
    let map = compute_bark_map_cos_omega(32, 44100, 64);
    for w in map.windows(2) {
        assert!(w[0] >= w[1] - 1e-6);
    }
}

#[test]
fn test_floor0_config_read_roundtrip() {
    // order=8, rate=256, bark_map_size=256, amp_bits=6, amp_offset=0,
    // number_of_books=1, book_list=[0], codebook_cnt=1.
    let data = [0x08u8, 0x00, 0x01, 0x00, 0x01, 0x06, 0x00, 0x00, 0x00];
    let mut rdr = PacketReader::new(&data);
    let cfg = Floor0Config::read(&mut rdr, 1, (8, 10)).unwrap();
    assert_eq!(cfg.order, 8);
    assert_eq!(cfg.rate, 256);
    assert_eq!(cfg.bark_map_size, 256);
    assert_eq!(cfg.amp_bits, 6);
    assert_eq!(cfg.amp_offset, 0);
    assert_eq!(cfg.book_list, vec![0]);
}

#[test]
fn test_floor0_unpack_rejects_vq_less_codebook() {
    crate::init_test_logger();
    use crate::huffman_tree::VorbisHuffmanTree;

    // Same codeword lengths as codebook::test_read_codebook_roundtrip:
    // two leading zero bits decode to entry 0. No VQ lookup table.
    let tree = VorbisHuffmanTree::load_from_array(&[2, 4, 4, 4, 4, 2, 3, 3]).unwrap();
    let codebook = Codebook {
        codebook_dimensions: 1,
        codebook_entries: 8,
        codebook_vq_lookup_vec: None,
        codebook_huffman_tree: tree,
    };
    let codebooks = [codebook];
    let cfg = Floor0Config {
        order: 4,
        rate: 44100,
        bark_map_size: 64,
        amp_bits: 4,
        amp_offset: 10,
        book_list: vec![0],
        cached_bark_cos_omega: [
            compute_bark_map_cos_omega(32, 44100, 64),
            compute_bark_map_cos_omega(32, 44100, 64),
        ],
    };
    // amp=1 (4 bits), booknumber=0 (1 bit), then "00" selects huffman entry 0.
    let data = [0x01u8];
    let mut rdr = PacketReader::new(&data);
    let err = unpack(&mut rdr, &codebooks, &cfg, 64).unwrap_err();
    assert_eq!(err, SetupError::MalformedStream);
}
