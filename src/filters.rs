//! Stream filter implementations.
//!
//! Decoders for the filter chains named by `/Filter` and parameterized
//! by `/DecodeParms`:
//! - FlateDecode (zlib/deflate) - most common
//! - LZWDecode - LZW compression
//! - ASCIIHexDecode - hexadecimal encoding
//!
//! PNG predictors (10-15) and the TIFF predictor (2) are applied after
//! the byte-level filter. The writer side re-applies FlateDecode and
//! the PNG Up predictor for cross-reference streams.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::object::Object;

/// Decode parameters for a single filter, from `/DecodeParms`.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (width in samples)
    pub columns: usize,
    /// Number of color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Bytes of sample data per row, without the predictor tag byte.
    fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes each sample occupies, for left-neighbor prediction.
    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Decode a stream buffer through its `/Filter` chain.
///
/// `filter` is the `/Filter` entry (a name or an array of names);
/// `parms` is the matching `/DecodeParms` entry (a dictionary, an array
/// of dictionaries interleaved with nulls, or absent). Filters apply in
/// order; each may carry its own parameters.
pub fn decode_chain(
    data: &[u8],
    filter: Option<&Object>,
    parms: Option<&Object>,
) -> Result<Vec<u8>> {
    let names = filter_names(filter);
    let mut current = data.to_vec();
    for (index, name) in names.iter().enumerate() {
        let params = params_at(parms, index)?;
        current = decode_one(&current, name, &params)?;
    }
    Ok(current)
}

/// Extract the ordered filter names from a `/Filter` entry.
pub fn filter_names(filter: Option<&Object>) -> Vec<String> {
    match filter {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode parameters for the filter at `index` in the chain.
fn params_at(parms: Option<&Object>, index: usize) -> Result<DecodeParams> {
    let dict = match parms {
        None | Some(Object::Null) => return Ok(DecodeParams::default()),
        Some(Object::Dictionary(d)) if index == 0 => d,
        Some(Object::Dictionary(_)) => return Ok(DecodeParams::default()),
        Some(Object::Array(arr)) => match arr.get(index) {
            Some(Object::Dictionary(d)) => d,
            _ => return Ok(DecodeParams::default()),
        },
        _ => return Ok(DecodeParams::default()),
    };

    Ok(DecodeParams {
        predictor: dict.get_integer("Predictor")?.max(1),
        columns: dict.get_integer("Columns")?.max(1) as usize,
        colors: dict.get_integer("Colors")?.max(1) as usize,
        bits_per_component: dict.get_integer("BitsPerComponent").map(|v| {
            if v == 0 {
                8
            } else {
                v as usize
            }
        })?,
    })
}

/// Apply one named filter plus its predictor.
fn decode_one(data: &[u8], name: &str, params: &DecodeParams) -> Result<Vec<u8>> {
    let decoded = match name {
        "FlateDecode" | "Fl" => flate_decode(data)?,
        "LZWDecode" | "LZW" => lzw_decode(data)?,
        "ASCIIHexDecode" | "AHx" => ascii_hex_decode(data)?,
        other => return Err(Error::UnsupportedFilter(other.to_string())),
    };
    apply_predictor(decoded, params)
}

/// FlateDecode (zlib).
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decode(format!("FlateDecode: {}", e)))?;
    Ok(output)
}

/// Flate compression for output streams.
pub fn flate_encode(data: &[u8]) -> Vec<u8> {
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    // Writing to a Vec cannot fail.
    encoder.write_all(data).expect("in-memory deflate");
    encoder.finish().expect("in-memory deflate")
}

/// LZWDecode with PDF's MSB-first, 8-bit minimum code size.
pub fn lzw_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8);
    decoder
        .decode(data)
        .map_err(|e| Error::Decode(format!("LZWDecode: {:?}", e)))
}

/// ASCIIHexDecode: hex digits with whitespace, terminated by `>`.
///
/// An odd trailing digit is padded with zero.
pub fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &byte in data {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b'>' => break,
            b if is_filter_whitespace(b) => continue,
            other => {
                return Err(Error::Decode(format!(
                    "ASCIIHexDecode: invalid byte 0x{:02X}",
                    other
                )))
            }
        };
        match high.take() {
            None => high = Some(digit),
            Some(h) => output.push((h << 4) | digit),
        }
    }
    if let Some(h) = high {
        output.push(h << 4);
    }
    Ok(output)
}

fn is_filter_whitespace(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Reverse the predictor named in the decode parameters.
fn apply_predictor(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(data, params),
        other => Err(Error::UnsupportedPredictor(other)),
    }
}

/// TIFF predictor 2: horizontal differencing, per sample per component.
///
/// Each sample is the delta from the same component one pixel to the
/// left, at the stream's component depth (1, 2, 4, 8 or 16 bits).
fn tiff_predictor(mut data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.pixel_bytes_per_row();
    if row_len == 0 {
        return Ok(data);
    }
    match params.bits_per_component {
        8 => {
            let bpp = params.bytes_per_pixel();
            for row in data.chunks_mut(row_len) {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            Ok(data)
        }
        16 => {
            let stride = params.colors * 2;
            for row in data.chunks_mut(row_len) {
                let mut i = stride;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([row[i - stride], row[i - stride + 1]]);
                    let sum = u16::from_be_bytes([row[i], row[i + 1]]).wrapping_add(left);
                    row[i..i + 2].copy_from_slice(&sum.to_be_bytes());
                    i += 2;
                }
            }
            Ok(data)
        }
        bits @ (1 | 2 | 4) => {
            // Sub-byte depths divide 8 evenly, so samples never
            // straddle byte boundaries; unpack, accumulate mod 2^bits,
            // repack.
            let mask = (1u8 << bits) - 1;
            let colors = params.colors;
            for row in data.chunks_mut(row_len) {
                let count = (params.columns * colors).min(row.len() * 8 / bits);
                let mut samples: Vec<u8> = Vec::with_capacity(count);
                for s in 0..count {
                    let bit = s * bits;
                    let shift = 8 - bits - (bit % 8);
                    samples.push((row[bit / 8] >> shift) & mask);
                }
                for s in colors..count {
                    samples[s] = samples[s].wrapping_add(samples[s - colors]) & mask;
                }
                for (s, &value) in samples.iter().enumerate() {
                    let bit = s * bits;
                    let shift = 8 - bits - (bit % 8);
                    let slot = &mut row[bit / 8];
                    *slot = (*slot & !(mask << shift)) | (value << shift);
                }
            }
            Ok(data)
        }
        other => Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component",
            other
        ))),
    }
}

/// Reverse PNG row prediction (predictors 10-15).
///
/// Each encoded row is prefixed with a tag byte naming the per-row
/// algorithm; predictor 15 (optimum) simply allows the tags to vary.
fn png_predictor(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.pixel_bytes_per_row();
    let bpp = params.bytes_per_pixel();
    let encoded_row = row_len + 1;
    if row_len == 0 || data.len() % encoded_row != 0 {
        return Err(Error::Decode(format!(
            "PNG predictor: data length {} not a multiple of row length {}",
            data.len(),
            encoded_row
        )));
    }

    let rows = data.len() / encoded_row;
    let mut output = vec![0u8; rows * row_len];
    let mut prev_row = vec![0u8; row_len];

    for row_index in 0..rows {
        let src = &data[row_index * encoded_row..(row_index + 1) * encoded_row];
        let tag = src[0];
        let row = &mut output[row_index * row_len..(row_index + 1) * row_len];
        row.copy_from_slice(&src[1..]);

        match tag {
            0 => {}
            1 => {
                for i in bpp..row_len {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    let avg = ((u16::from(left) + u16::from(prev_row[i])) / 2) as u8;
                    row[i] = row[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    row[i] = row[i].wrapping_add(paeth(left, prev_row[i], upper_left));
                }
            }
            other => {
                return Err(Error::Decode(format!(
                    "PNG predictor: unknown row tag {}",
                    other
                )))
            }
        }
        prev_row.copy_from_slice(row);
    }

    Ok(output)
}

/// PNG Paeth predictor function.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Apply the PNG Up predictor (12) for encoding.
///
/// Used by the cross-reference stream writer: each row is emitted as a
/// tag byte 2 followed by the byte-wise difference from the row above.
pub fn png_up_encode(data: &[u8], columns: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() + data.len() / columns.max(1) + 1);
    let mut prev_row = vec![0u8; columns];
    for row in data.chunks(columns) {
        output.push(2);
        for (i, &byte) in row.iter().enumerate() {
            output.push(byte.wrapping_sub(prev_row[i]));
        }
        prev_row[..row.len()].copy_from_slice(row);
    }
    output
}
