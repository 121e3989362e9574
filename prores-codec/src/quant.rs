//! Quantization matrix scaling and coefficient (de)quantization
//!
//! Matrices here are indexed by scan position, matching the order in which
//! coefficients are coded. Dequantized values are in the inverse transform's
//! orthonormal domain; the forward transform produces values four times as
//! large, which the `>> 2` of [`dequantize`] folds back.

/// Bias removed from the DC coefficient before quantization
pub const ENCODER_DC_OFFSET: i32 = 16384;

/// Bias added to the DC coefficient after dequantization
pub const DECODER_DC_OFFSET: i32 = 4096;

/// Largest raw quantizer byte
pub const MAX_RAW_QSCALE: u8 = 224;

/// Multiply every matrix entry by the slice quantizer.
pub fn scale_matrix(matrix: &[u8; 64], qscale: u32) -> [i32; 64] {
    let mut scaled = [0i32; 64];
    for (dst, &q) in scaled.iter_mut().zip(matrix.iter()) {
        *dst = q as i32 * qscale as i32;
    }
    scaled
}

/// Reconstruct a coefficient from its level.
#[inline]
pub fn dequantize(level: i32, scaled_quant: i32) -> i32 {
    (level * scaled_quant) >> 2
}

/// Quantize a forward-transform coefficient, truncating toward zero.
#[inline]
pub fn quantize(coeff: i32, scaled_quant: i32) -> i32 {
    coeff / scaled_quant
}

/// Quantize consecutive 64-coefficient raster blocks into levels.
pub fn quantize_blocks(
    coeffs: &[i32],
    levels: &mut [i32],
    scaled_quant: &[i32; 64],
    scan: &[u8; 64],
) {
    for (src, dst) in coeffs.chunks_exact(64).zip(levels.chunks_exact_mut(64)) {
        dst[0] = quantize(src[0] - ENCODER_DC_OFFSET, scaled_quant[0]);
        for (i, &pos) in scan.iter().enumerate().skip(1) {
            let pos = pos as usize;
            dst[pos] = quantize(src[pos], scaled_quant[i]);
        }
    }
}

/// Expand the quantizer byte of a slice header.
///
/// Values above 128 step by four so a single byte covers quantizers up to 512.
pub fn decode_qscale(raw: u8) -> u32 {
    let q = raw.clamp(1, MAX_RAW_QSCALE) as u32;
    if q > 128 {
        (q - 96) << 2
    } else {
        q
    }
}

/// Fold a quantizer into its header byte. Quantizers above 128 are rounded
/// down to a multiple of four.
pub fn encode_qscale(qscale: u32) -> u8 {
    let q = qscale.clamp(1, 512);
    if q > 128 {
        ((q >> 2) + 96) as u8
    } else {
        q as u8
    }
}
