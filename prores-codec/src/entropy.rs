//! Hybrid Rice/exp-Golomb codeword coding
//!
//! A codeword starts with a run of `q` zero bits terminated by a one. When
//! `q` does not exceed the codebook's switch point the value is `q` followed
//! by `rice_order` raw bits. Otherwise the codeword is an exp-Golomb code whose
//! suffix length grows with `q`.

use crate::bitstream::{BitReader, BitWriter};
use crate::codebook::Codebook;
use crate::error::{ProResError, Result};

/// Longest exp-Golomb suffix a valid stream may carry
const MAX_ESCAPE_BITS: i32 = 16;

/// Read one codeword.
pub fn read_codeword(reader: &mut BitReader, codebook: &Codebook) -> Result<u32> {
    let window = reader.peek_bits(16);
    if window == 0 {
        return Err(ProResError::CorruptBitstream(
            "codeword prefix longer than 16 bits".into(),
        ));
    }
    let q = window.leading_zeros() - 16;
    reader.skip_bits(q as usize + 1)?;

    if q > codebook.switch_bits {
        let bits = codebook.golomb_bits + q as i32;
        if bits > MAX_ESCAPE_BITS {
            return Err(ProResError::CorruptBitstream(format!(
                "exp-Golomb suffix of {} bits",
                bits
            )));
        }
        let bits = bits as u32;
        let value = ((1u32 << bits) | reader.read_bits(bits)?) as i32 - codebook.golomb_offset;
        Ok(value as u32)
    } else if codebook.rice_order > 0 {
        Ok((q << codebook.rice_order) | reader.read_bits(codebook.rice_order)?)
    } else {
        Ok(q)
    }
}

/// Write one codeword.
pub fn write_codeword(writer: &mut BitWriter, codebook: &Codebook, value: u32) {
    let threshold = codebook.escape_threshold();
    if value >= threshold {
        let v = value - threshold + (1 << codebook.exp_order);
        let exponent = 31 - v.leading_zeros();
        writer.write_zeros(exponent - codebook.exp_order + codebook.switch_bits + 1);
        writer.write_bits(v, exponent + 1);
    } else {
        writer.write_zeros(value >> codebook.rice_order);
        writer.write_bits(1, 1);
        writer.write_bits(value & codebook.rice_mask, codebook.rice_order);
    }
}

/// Length in bits of the codeword for `value`.
pub fn codeword_len(codebook: &Codebook, value: u32) -> u32 {
    let threshold = codebook.escape_threshold();
    if value >= threshold {
        let v = value - threshold + (1 << codebook.exp_order);
        let exponent = 31 - v.leading_zeros();
        2 * exponent - codebook.exp_order + codebook.switch_bits + 2
    } else {
        (value >> codebook.rice_order) + 1 + codebook.rice_order
    }
}

/// Map a signed value onto the unsigned codeword alphabet (0, -1, 1, -2, ...).
#[inline]
pub fn to_golomb(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`to_golomb`].
#[inline]
pub fn to_signed(code: u32) -> i32 {
    ((code >> 1) as i32) ^ -((code & 1) as i32)
}
