// Vorbis decoder written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Floor type 1: the point-and-line spectral envelope.

A handful of "posts" (control points) are Huffman-decoded per packet,
predicted from their neighbours, unwrapped into absolute y values, and
finally rasterised into a piecewise-linear dB curve that is converted
to a linear multiplier and applied to the residue.
*/

use std::cmp::min;

use tinyvec::TinyVec;

use crate::codebook::{Codebook, SetupError};
use crate::packet_reader::PacketReader;

/// Hard upper bound on the number of posts a floor1 config can have
/// (2 fixed posts plus up to 63 partition-derived posts, per spec).
pub const MAX_POSTS: usize = 65;

const RANGE_TABLE: [i32; 4] = [256, 128, 86, 64];
const Y_BITS_TABLE: [u8; 4] = [8, 7, 7, 6];

/// Configuration for a floor type 1 instance, parsed once from the
/// setup header.
pub struct Floor1Config {
    pub(crate) partition_class: Vec<u8>,
    pub(crate) class_dimensions: Vec<u8>,
    pub(crate) class_subclass_bits: Vec<u8>,
    pub(crate) class_masterbooks: Vec<u8>,
    /// Per class, `1 << subclass_bits` entries; `-1` means "no book".
    pub(crate) subclass_books: Vec<Vec<i16>>,
    pub(crate) multiplier: u8,
    pub(crate) range: i32,
    pub(crate) y_bits: u8,
    pub(crate) x_list: Vec<u32>,
    /// `(original_index, x_value)` pairs sorted ascending by `x_value`.
    pub(crate) x_list_sorted: Vec<(usize, u32)>,
}

impl Floor1Config {
    /// Reads a floor type 1 configuration from the setup header.
    ///
    /// `codebook_cnt` is required to reject out of range book indices.
    pub fn read(rdr: &mut PacketReader, codebook_cnt: u16) -> Result<Floor1Config, SetupError> {
        let partitions = rdr.read_u5()?;
        let mut maximum_class: i8 = -1;
        let mut partition_class = Vec::with_capacity(partitions as usize);
        for _ in 0..partitions {
            let cur_class = rdr.read_u4()?;
            if cur_class as i8 > maximum_class {
                maximum_class = cur_class as i8;
            }
            partition_class.push(cur_class);
        }

        let class_count = (maximum_class + 1) as usize;
        let mut class_dimensions = Vec::with_capacity(class_count);
        let mut class_subclass_bits = Vec::with_capacity(class_count);
        let mut subclass_books = Vec::with_capacity(class_count);
        let mut class_masterbooks = Vec::with_capacity(class_count);

        for _ in 0..class_count {
            class_dimensions.push(rdr.read_u3()? + 1);
            let cur_subclass = rdr.read_u2()?;
            class_subclass_bits.push(cur_subclass);
            if cur_subclass != 0 {
                let cur_masterbook = rdr.read_u8()?;
                if cur_masterbook as u16 >= codebook_cnt {
                    return Err(SetupError::MalformedStream);
                }
                class_masterbooks.push(cur_masterbook);
            } else {
                class_masterbooks.push(0);
            }
            let cur_books_cnt: u8 = 1 << cur_subclass;
            let mut cur_books = Vec::with_capacity(cur_books_cnt as usize);
            for _ in 0..cur_books_cnt {
                let cur_book = (rdr.read_u8()? as i16) - 1;
                if cur_book >= codebook_cnt as i16 {
                    return Err(SetupError::MalformedStream);
                }
                cur_books.push(cur_book);
            }
            subclass_books.push(cur_books);
        }

        let multiplier = rdr.read_u2()? + 1;
        let range_bits = rdr.read_u4()?;

        let mut values: u16 = 2;
        for &cur_class_num in &partition_class {
            values += class_dimensions[cur_class_num as usize] as u16;
        }
        if values > MAX_POSTS as u16 {
            return Err(SetupError::MalformedStream);
        }

        let mut x_list = Vec::with_capacity(values as usize);
        x_list.push(0);
        x_list.push(1u32 << range_bits);
        for &cur_class_num in &partition_class {
            for _ in 0..class_dimensions[cur_class_num as usize] {
                x_list.push(rdr.read_dyn_u32(range_bits)?);
            }
        }

        // Uniqueness check: x_list values must be pairwise distinct.
        let mut x_list_sorted = x_list.iter().cloned().enumerate().collect::<Vec<_>>();
        x_list_sorted.sort_by(|a, b| a.1.cmp(&b.1));
        let mut last = None;
        for &(_, v) in &x_list_sorted {
            if Some(v) == last {
                return Err(SetupError::MalformedStream);
            }
            last = Some(v);
        }

        let range = RANGE_TABLE[(multiplier - 1) as usize];
        let y_bits = Y_BITS_TABLE[(multiplier - 1) as usize];

        trace!("floor1 setup: {} posts, {} classes, multiplier={}",
            x_list.len(), class_count, multiplier);

        Ok(Floor1Config {
            partition_class,
            class_dimensions,
            class_subclass_bits,
            class_masterbooks,
            subclass_books,
            multiplier,
            range,
            y_bits,
            x_list,
            x_list_sorted,
        })
    }

    /// Returns the `(index, x_value)` neighbour with the largest
    /// `x_value` strictly less than `x_list[idx]`, searching only
    /// among indices `< idx`.
    fn low_neighbor(&self, idx: usize) -> (usize, u32) {
        extr_neighbor(&self.x_list, idx, |a, b| a.cmp(&b))
    }

    /// Returns the `(index, x_value)` neighbour with the smallest
    /// `x_value` strictly greater than `x_list[idx]`, searching only
    /// among indices `< idx`.
    fn high_neighbor(&self, idx: usize) -> (usize, u32) {
        extr_neighbor(&self.x_list, idx, |a, b| b.cmp(&a))
    }
}

/// Per-packet decoded floor type 1 data.
pub struct Floor1Data {
    pub(crate) block_size: u16,
    /// `None` means the floor is silent this packet (gate bit was 0).
    pub(crate) posts: Option<TinyVec<[u32; MAX_POSTS]>>,
}

impl Floor1Data {
    /// Whether this channel carries any spectral energy this packet.
    pub fn has_energy(&self) -> bool {
        self.posts.is_some()
    }
}

/// Reads the per-packet floor type 1 data: the gate bit, and, if set,
/// the y values for all posts.
///
/// End-of-packet while reading posts is not propagated as an error: it
/// silently demotes the channel to a silent floor.
pub fn unpack(rdr: &mut PacketReader, codebooks: &[Codebook], cfg: &Floor1Config,
        block_size: u16) -> Result<Floor1Data, SetupError> {
    let nonzero = match rdr.read_bit_flag() {
        Ok(v) => v,
        Err(_) => return Ok(Floor1Data { block_size, posts: None }),
    };
    if !nonzero {
        return Ok(Floor1Data { block_size, posts: None });
    }

    let mut y: TinyVec<[u32; MAX_POSTS]> = TinyVec::new();
    macro_rules! demote_on_eof {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(_) => return Ok(Floor1Data { block_size, posts: None }),
            }
        }
    }

    y.push(demote_on_eof!(rdr.read_dyn_u8(cfg.y_bits)) as u32);
    y.push(demote_on_eof!(rdr.read_dyn_u8(cfg.y_bits)) as u32);

    for &class in &cfg.partition_class {
        let uclass = class as usize;
        let cdim = cfg.class_dimensions[uclass];
        let cbits = cfg.class_subclass_bits[uclass];
        let csub = (1u32 << cbits) - 1;
        let mut cval: u32 = 0;
        if cbits > 0 {
            let cbook = cfg.class_masterbooks[uclass] as usize;
            cval = demote_on_eof!(codebooks[cbook].decode_scalar(rdr));
        }
        for _ in 0..cdim {
            let book = cfg.subclass_books[uclass][(cval & csub) as usize];
            cval >>= cbits;
            if book >= 0 {
                y.push(demote_on_eof!(codebooks[book as usize].decode_scalar(rdr)));
            } else {
                y.push(0);
            }
        }
    }

    Ok(Floor1Data { block_size, posts: Some(y) })
}

/// Finds the neighbour of `v[max_idx]` among `v[..max_idx]` extremal
/// with respect to `compare`: the "smaller" direction finds the low
/// neighbour, the "bigger" direction (achieved by flipping the compare
/// closure) finds the high neighbour.
fn extr_neighbor<F>(v: &[u32], max_idx: usize, compare: F) -> (usize, u32)
        where F: Fn(u32, u32) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let bound = v[max_idx];
    let prefix = &v[..max_idx];
    let smaller = |a, b| compare(a, b) == Ordering::Less;

    let min_idx = prefix.iter()
        .position(|&val| smaller(val, bound))
        .unwrap_or_else(||
            panic!("no neighbour of x_list[{}] = {} found among prior entries", max_idx, bound));

    let (offset, max_neighbor) = prefix[min_idx..].iter().cloned()
        .enumerate()
        .rev()
        .filter(|&(_i, val)| smaller(val, bound))
        .max_by(|&(_, a), &(_, b)| compare(a, b))
        .unwrap_or((0, v[min_idx]));

    (min_idx + offset, max_neighbor)
}

#[test]
fn test_floor1_config_read_roundtrip() {
    // partitions=0 (no classes), multiplier=1, range_bits=4.
    let data = [0x00u8, 0x02];
    let mut rdr = PacketReader::new(&data);
    let cfg = Floor1Config::read(&mut rdr, 4).unwrap();
    assert_eq!(cfg.partition_class.len(), 0);
    assert_eq!(cfg.multiplier, 1);
    assert_eq!(cfg.range, 256);
    assert_eq!(cfg.y_bits, 8);
    assert_eq!(cfg.x_list, vec![0, 16]);
}

#[test]
fn test_floor1_config_read_rejects_duplicate_x_list() {
    // One class of dimension 1 contributes an extra x_list value of 0,
    // duplicating the fixed x_list[0] == 0 entry.
    let data = [0x01u8, 0x00, 0x00, 0x04];
    let mut rdr = PacketReader::new(&data);
    let err = Floor1Config::read(&mut rdr, 4).unwrap_err();
    assert_eq!(err, SetupError::MalformedStream);
}

#[test]
fn test_low_high_neighbor() {
    let v = [1, 4, 2, 3, 6, 5];
    let cfg_like = |idx: usize| extr_neighbor(&v, idx, |a, b| a.cmp(&b));
    assert_eq!(cfg_like(1), (0, 1));
    assert_eq!(cfg_like(2), (0, 1));
    assert_eq!(cfg_like(3), (2, 2));
    assert_eq!(cfg_like(4), (1, 4));
    assert_eq!(cfg_like(5), (1, 4));

    let high = |idx: usize| extr_neighbor(&v, idx, |a, b| b.cmp(&a));
    assert_eq!(high(2), (1, 4));
    assert_eq!(high(3), (1, 4));
    assert_eq!(high(5), (4, 6));
}

#[test]
fn test_high_neighbor_extracted() {
    // Data extracted from a real life ogg/vorbis file.
    let v = [0, 128, 12, 46, 4, 8, 16, 23,
        33, 70, 2, 6, 10, 14, 19, 28, 39, 58, 90];
    let high = |idx: usize| extr_neighbor(&v, idx, |a, b| b.cmp(&a));
    assert_eq!(high(2), (1, 128));
    assert_eq!(high(3), (1, 128));
    assert_eq!(high(4), (2, 12));
    assert_eq!(high(9), (1, 128));
    assert_eq!(high(18), (1, 128));
}

/// Integer interpolation of a y value at `x`, between neighbouring
/// posts `(x0, y0)` and `(x1, y1)`.
pub fn render_point(x0: u32, y0: u32, x1: u32, y1: u32, x: u32) -> u32 {
    let dy = y1 as i32 - y0 as i32;
    let adx = x1 - x0;
    let ady = dy.unsigned_abs();
    let off = ady * (x - x0) / adx;
    if dy < 0 {
        y0 - off
    } else {
        y0 + off
    }
}

#[test]
fn test_render_point() {
    // Test data taken from real life ogg/vorbis file.
    assert_eq!(render_point(0, 28, 128, 67, 12), 31);
    assert_eq!(render_point(12, 38, 128, 67, 46), 46);
    assert_eq!(render_point(0, 28, 12, 38, 4), 31);
    assert_eq!(render_point(4, 33, 12, 38, 8), 35);
    assert_eq!(render_point(12, 38, 46, 31, 16), 38);
    assert_eq!(render_point(16, 30, 46, 31, 23), 30);
    assert_eq!(render_point(23, 40, 46, 31, 33), 37);
    assert_eq!(render_point(46, 31, 128, 67, 70), 41);
    assert_eq!(render_point(0, 28, 4, 33, 2), 30);
    assert_eq!(render_point(4, 33, 8, 43, 6), 38);
    assert_eq!(render_point(8, 43, 12, 38, 10), 41);
    assert_eq!(render_point(12, 38, 16, 30, 14), 34);
    assert_eq!(render_point(16, 30, 23, 40, 19), 34);
    assert_eq!(render_point(23, 40, 33, 26, 28), 33);
    assert_eq!(render_point(33, 26, 46, 31, 39), 28);
    assert_eq!(render_point(46, 31, 70, 20, 58), 26);
    assert_eq!(render_point(70, 20, 128, 67, 90), 36);
}

#[test]
fn test_render_point_determinism_scenario() {
    // Scenario 6 from the spec: render_point(0, 10, 16, 50, 4) == 20
    assert_eq!(render_point(0, 10, 16, 50, 4), 20);
}

/// Unwraps the Huffman-decoded posts into absolute y values, also
/// returning, per post, whether it was actually coded (`step_flags`).
///
/// This is the "amplitude value synthesis" step of the vorbis spec's
/// floor 1 packet decode.
fn unwrap_posts(y: &[u32], cfg: &Floor1Config) -> (TinyVec<[u32; MAX_POSTS]>, TinyVec<[bool; MAX_POSTS]>) {
    let range = cfg.range;
    let mut step2_flag: TinyVec<[bool; MAX_POSTS]> = TinyVec::new();
    step2_flag.push(true);
    step2_flag.push(true);
    let mut final_y: TinyVec<[u32; MAX_POSTS]> = TinyVec::new();
    final_y.push(y[0]);
    final_y.push(y[1]);

    for i in 2..cfg.x_list.len() {
        let lo = cfg.low_neighbor(i);
        let hi = cfg.high_neighbor(i);
        let predicted = render_point(
            lo.1, final_y[lo.0],
            hi.1, final_y[hi.0], cfg.x_list[i]) as i32;
        let val = y[i] as i32;
        let highroom = range - predicted;
        let lowroom = predicted;
        let room = min(highroom, lowroom) * 2;
        if val > 0 {
            step2_flag[lo.0] = true;
            step2_flag[hi.0] = true;
            step2_flag.push(true);
            final_y.push(if val >= room {
                if highroom > lowroom {
                    predicted + val - lowroom
                } else {
                    predicted - val + highroom - 1
                }
            } else if val % 2 == 1 {
                predicted - (val + 1) / 2
            } else {
                predicted + val / 2
            } as u32);
        } else {
            final_y.push(predicted as u32);
            step2_flag.push(false);
        }
    }
    for el in final_y.iter_mut() {
        *el = min(range as u32 - 1, *el);
    }
    (final_y, step2_flag)
}

#[test]
fn test_unwrap_highroom_eq_lowroom_edge_case() {
    // Scenario 4 from the spec: predicted=128, val=300, range=256.
    // highroom == lowroom == 128, so val >= room (room = 256) takes the
    // `highroom > lowroom` == false branch:
    // final_y = predicted - val + highroom - 1 = 128 - 300 + 127 = -45
    let predicted: i32 = 128;
    let val: i32 = 300;
    let highroom: i32 = 256 - predicted;
    let lowroom: i32 = predicted;
    assert_eq!(highroom, lowroom);
    let room = min(highroom, lowroom) * 2;
    assert!(val >= room);
    let result = if highroom > lowroom {
        predicted + val - lowroom
    } else {
        predicted - val + highroom - 1
    };
    assert_eq!(result, -45);
}

static FLOOR1_INVERSE_DB_TABLE: &[f32] = &[
    1.0649863e-07, 1.1341951e-07, 1.2079015e-07, 1.2863978e-07,
    1.3699951e-07, 1.4590251e-07, 1.5538408e-07, 1.6548181e-07,
    1.7623575e-07, 1.8768855e-07, 1.9988561e-07, 2.1287530e-07,
    2.2670913e-07, 2.4144197e-07, 2.5713223e-07, 2.7384213e-07,
    2.9163793e-07, 3.1059021e-07, 3.3077411e-07, 3.5226968e-07,
    3.7516214e-07, 3.9954229e-07, 4.2550680e-07, 4.5315863e-07,
    4.8260743e-07, 5.1396998e-07, 5.4737065e-07, 5.8294187e-07,
    6.2082472e-07, 6.6116941e-07, 7.0413592e-07, 7.4989464e-07,
    7.9862701e-07, 8.5052630e-07, 9.0579828e-07, 9.6466216e-07,
    1.0273513e-06, 1.0941144e-06, 1.1652161e-06, 1.2409384e-06,
    1.3215816e-06, 1.4074654e-06, 1.4989305e-06, 1.5963394e-06,
    1.7000785e-06, 1.8105592e-06, 1.9282195e-06, 2.0535261e-06,
    2.1869758e-06, 2.3290978e-06, 2.4804557e-06, 2.6416497e-06,
    2.8133190e-06, 2.9961443e-06, 3.1908506e-06, 3.3982101e-06,
    3.6190449e-06, 3.8542308e-06, 4.1047004e-06, 4.3714470e-06,
    4.6555282e-06, 4.9580707e-06, 5.2802740e-06, 5.6234160e-06,
    5.9888572e-06, 6.3780469e-06, 6.7925283e-06, 7.2339451e-06,
    7.7040476e-06, 8.2047000e-06, 8.7378876e-06, 9.3057248e-06,
    9.9104632e-06, 1.0554501e-05, 1.1240392e-05, 1.1970856e-05,
    1.2748789e-05, 1.3577278e-05, 1.4459606e-05, 1.5399272e-05,
    1.6400004e-05, 1.7465768e-05, 1.8600792e-05, 1.9809576e-05,
    2.1096914e-05, 2.2467911e-05, 2.3928002e-05, 2.5482978e-05,
    2.7139006e-05, 2.8902651e-05, 3.0780908e-05, 3.2781225e-05,
    3.4911534e-05, 3.7180282e-05, 3.9596466e-05, 4.2169667e-05,
    4.4910090e-05, 4.7828601e-05, 5.0936773e-05, 5.4246931e-05,
    5.7772202e-05, 6.1526565e-05, 6.5524908e-05, 6.9783085e-05,
    7.4317983e-05, 7.9147585e-05, 8.4291040e-05, 8.9768747e-05,
    9.5602426e-05, 0.00010181521, 0.00010843174, 0.00011547824,
    0.00012298267, 0.00013097477, 0.00013948625, 0.00014855085,
    0.00015820453, 0.00016848555, 0.00017943469, 0.00019109536,
    0.00020351382, 0.00021673929, 0.00023082423, 0.00024582449,
    0.00026179955, 0.00027881276, 0.00029693158, 0.00031622787,
    0.00033677814, 0.00035866388, 0.00038197188, 0.00040679456,
    0.00043323036, 0.00046138411, 0.00049136745, 0.00052329927,
    0.00055730621, 0.00059352311, 0.00063209358, 0.00067317058,
    0.00071691700, 0.00076350630, 0.00081312324, 0.00086596457,
    0.00092223983, 0.00098217216, 0.0010459992,  0.0011139742,
    0.0011863665,  0.0012634633,  0.0013455702,  0.0014330129,
    0.0015261382,  0.0016253153,  0.0017309374,  0.0018434235,
    0.0019632195,  0.0020908006,  0.0022266726,  0.0023713743,
    0.0025254795,  0.0026895994,  0.0028643847,  0.0030505286,
    0.0032487691,  0.0034598925,  0.0036847358,  0.0039241906,
    0.0041792066,  0.0044507950,  0.0047400328,  0.0050480668,
    0.0053761186,  0.0057254891,  0.0060975636,  0.0064938176,
    0.0069158225,  0.0073652516,  0.0078438871,  0.0083536271,
    0.0088964928,  0.009474637,   0.010090352,   0.010746080,
    0.011444421,   0.012188144,   0.012980198,   0.013823725,
    0.014722068,   0.015678791,   0.016697687,   0.017782797,
    0.018938423,   0.020169149,   0.021479854,   0.022875735,
    0.024362330,   0.025945531,   0.027631618,   0.029427276,
    0.031339626,   0.033376252,   0.035545228,   0.037855157,
    0.040315199,   0.042935108,   0.045725273,   0.048696758,
    0.051861348,   0.055231591,   0.058820850,   0.062643361,
    0.066714279,   0.071049749,   0.075666962,   0.080584227,
    0.085821044,   0.091398179,   0.097337747,   0.10366330,
    0.11039993,    0.11757434,    0.12521498,    0.13335215,
    0.14201813,    0.15124727,    0.16107617,    0.17154380,
    0.18269168,    0.19456402,    0.20720788,    0.22067342,
    0.23501402,    0.25028656,    0.26655159,    0.28387361,
    0.30232132,    0.32196786,    0.34289114,    0.36517414,
    0.38890521,    0.41417847,    0.44109412,    0.46975890,
    0.50028648,    0.53279791,    0.56742212,    0.60429640,
    0.64356699,    0.68538959,    0.72993007,    0.77736504,
    0.82788260,    0.88168307,    0.9389798,     1.];

/// Rasterises a line segment from `(x0, y0)` to `(x1, y1)`, emitting
/// one multiplier per integer x in `[x0, x1)` into `residue`.
///
/// Uses a Bresenham-style integer walk; `dy / adx` truncates toward
/// zero and the sign of `dy` is recovered via an arithmetic right
/// shift, both required for bit-exact agreement with the reference.
fn render_line_multi(x0: u32, y0: u32, x1: u32, y1: u32, residue: &mut [f32]) {
    let dy = y1 as i32 - y0 as i32;
    let adx = (x1 - x0) as i32;
    let mut ady = dy.abs();
    let sy = 1 - 2 * ((dy >> 31) & 1);
    let b = dy / adx;
    let mut err = -adx;
    ady -= b.abs() * adx;

    let mut y = y0 as i32;
    mul_at(residue, x0, y);
    for x in (x0 + 1)..x1 {
        y += b;
        err += ady;
        if err >= 0 {
            err -= adx;
            y += sy;
        }
        mul_at(residue, x, y);
    }
}

#[inline]
fn mul_at(residue: &mut [f32], x: u32, y: i32) {
    if let Some(slot) = residue.get_mut(x as usize) {
        *slot *= FLOOR1_INVERSE_DB_TABLE[y as usize];
    }
}

/// Synthesises the floor curve and multiplies `residue` in place.
///
/// No-op if the floor carries no energy (the gate bit was 0).
pub fn apply(data: &Floor1Data, cfg: &Floor1Config, residue: &mut [f32]) {
    let y = match data.posts.as_ref() {
        Some(y) => y,
        None => return,
    };
    let n = (data.block_size / 2) as u32;

    let (final_y, step2_flag) = unwrap_posts(y, cfg);

    let final_y_s = |i: usize| final_y[cfg.x_list_sorted[i].0];
    let x_list_s = |i: usize| cfg.x_list_sorted[i].1;
    let step2_flag_s = |i: usize| step2_flag[cfg.x_list_sorted[i].0];

    let mut hx = 0u32;
    let mut hy = 0u32;
    let mut lx = 0u32;
    let mut ly = final_y_s(0) * cfg.multiplier as u32;

    for i in 1..cfg.x_list.len() {
        if step2_flag_s(i) {
            hy = final_y_s(i) * cfg.multiplier as u32;
            hx = x_list_s(i);
            render_line_multi(lx, ly, min(hx, n), hy, residue);
            lx = hx.min(n);
            ly = hy;
            if lx >= n {
                break;
            }
        }
    }
    if lx < n {
        render_line_multi(lx, ly, n, ly, residue);
    }
}

#[test]
fn test_floor1_silent_is_noop() {
    crate::init_test_logger();
    let cfg = build_test_config();
    let data = Floor1Data { block_size: 64, posts: None };
    let mut residue = vec![1.0f32; 32];
    apply(&data, &cfg, &mut residue);
    assert_eq!(residue, vec![1.0f32; 32]);
}

#[cfg(test)]
fn build_test_config() -> Floor1Config {
    Floor1Config {
        partition_class: vec![],
        class_dimensions: vec![],
        class_subclass_bits: vec![],
        class_masterbooks: vec![],
        subclass_books: vec![],
        multiplier: 1,
        range: 256,
        y_bits: 8,
        x_list: vec![0, 32],
        x_list_sorted: vec![(0, 0), (1, 32)],
    }
}

#[test]
fn test_floor1_constant_curve() {
    let cfg = build_test_config();
    let mut y: TinyVec<[u32; MAX_POSTS]> = TinyVec::new();
    y.push(64);
    y.push(64);
    let data = Floor1Data { block_size: 64, posts: Some(y) };
    let mut residue = vec![1.0f32; 32];
    apply(&data, &cfg, &mut residue);
    for &r in &residue {
        assert_eq!(r, FLOOR1_INVERSE_DB_TABLE[64]);
    }
}

#[test]
fn test_floor1_linear_ramp() {
    let cfg = build_test_config();
    let mut y: TinyVec<[u32; MAX_POSTS]> = TinyVec::new();
    y.push(0);
    y.push(255);
    let data = Floor1Data { block_size: 64, posts: Some(y) };
    let mut residue = vec![1.0f32; 32];
    apply(&data, &cfg, &mut residue);
    // Bresenham ramp from y=0 at x=0 to y=255 at x=32; spot check indices.
    assert_eq!(residue[0], FLOOR1_INVERSE_DB_TABLE[0]);
    let expect_idx = |x: u32| -> usize {
        let dy = 255i32;
        let adx = 32i32;
        let b = dy / adx;
        let ady = dy.abs() - b.abs() * adx;
        let mut err = -adx;
        let mut y = 0i32;
        for _ in 1..=x {
            y += b;
            err += ady;
            if err >= 0 {
                err -= adx;
                y += 1;
            }
        }
        y as usize
    };
    assert_eq!(residue[8] as f32, FLOOR1_INVERSE_DB_TABLE[expect_idx(8)]);
    assert_eq!(residue[16] as f32, FLOOR1_INVERSE_DB_TABLE[expect_idx(16)]);
    assert_eq!(residue[24] as f32, FLOOR1_INVERSE_DB_TABLE[expect_idx(24)]);
}
