//! Fixed-point 8x8 DCT and the reduced inverse transforms
//!
//! Basis rows are scaled by 2^14. The forward transform takes 10-bit samples
//! and produces coefficients four times the orthonormal DCT, which is the
//! domain the encoder quantizes in. The inverse transforms take orthonormal
//! coefficients and return clamped 10-bit samples.

const BASIS_8: [[i32; 8]; 8] = [
    [5793, 5793, 5793, 5793, 5793, 5793, 5793, 5793],
    [8035, 6811, 4551, 1598, -1598, -4551, -6811, -8035],
    [7568, 3135, -3135, -7568, -7568, -3135, 3135, 7568],
    [6811, -1598, -8035, -4551, 4551, 8035, 1598, -6811],
    [5793, -5793, -5793, 5793, 5793, -5793, -5793, 5793],
    [4551, -8035, 1598, 6811, -6811, -1598, 8035, -4551],
    [3135, -7568, 7568, -3135, -3135, 7568, -7568, 3135],
    [1598, -4551, 6811, -8035, 8035, -6811, 4551, -1598],
];

const BASIS_4: [[i32; 4]; 4] = [
    [8192, 8192, 8192, 8192],
    [10703, 4433, -4433, -10703],
    [8192, -8192, -8192, 8192],
    [4433, -10703, 10703, -4433],
];

const BASIS_2: [[i32; 2]; 2] = [[11585, 11585], [11585, -11585]];

/// Largest 10-bit sample
pub const MAX_SAMPLE: i32 = 1023;

const ROW_SHIFT: u32 = 11;
const FORWARD_COLUMN_SHIFT: u32 = 15;
const INVERSE_COLUMN_SHIFT: u32 = 17;

#[inline]
fn round_shift(value: i64, shift: u32) -> i64 {
    (value + (1 << (shift - 1))) >> shift
}

/// Forward DCT of an 8x8 block of 10-bit samples in raster order.
pub fn forward_dct(samples: &[i32], out: &mut [i32]) {
    let mut tmp = [0i64; 64];
    for y in 0..8 {
        let row = &samples[y * 8..y * 8 + 8];
        for (u, basis) in BASIS_8.iter().enumerate() {
            let acc: i64 = basis
                .iter()
                .zip(row)
                .map(|(&b, &s)| b as i64 * s as i64)
                .sum();
            tmp[y * 8 + u] = round_shift(acc, ROW_SHIFT);
        }
    }
    for (v, basis) in BASIS_8.iter().enumerate() {
        for u in 0..8 {
            let acc: i64 = (0..8).map(|y| basis[y] as i64 * tmp[y * 8 + u]).sum();
            out[v * 8 + u] = round_shift(acc, FORWARD_COLUMN_SHIFT) as i32;
        }
    }
}

/// Inverse transform of the top-left `N`x`N` coefficients of an 8x8 block.
///
/// The extra column shift compensates for the gain of the truncated basis,
/// so the output is the `N`x`N` downscale of the full-size block.
fn inverse_partial<const N: usize>(
    coeffs: &[i32],
    basis: &[[i32; N]; N],
    column_shift: u32,
    out: &mut [i32],
) {
    let mut tmp = [0i64; 64];
    for v in 0..N {
        for x in 0..N {
            let acc: i64 = (0..N)
                .map(|u| basis[u][x] as i64 * coeffs[v * 8 + u] as i64)
                .sum();
            tmp[v * N + x] = round_shift(acc, ROW_SHIFT);
        }
    }
    for y in 0..N {
        for x in 0..N {
            let acc: i64 = (0..N).map(|v| basis[v][y] as i64 * tmp[v * N + x]).sum();
            out[y * N + x] = round_shift(acc, column_shift).clamp(0, MAX_SAMPLE as i64) as i32;
        }
    }
}

/// Full 8x8 inverse DCT.
pub fn inverse_dct(coeffs: &[i32], out: &mut [i32]) {
    inverse_partial::<8>(coeffs, &BASIS_8, INVERSE_COLUMN_SHIFT, out);
}

/// 4x4 output from the low-frequency quarter of an 8x8 block.
pub fn inverse_dct_4x4(coeffs: &[i32], out: &mut [i32]) {
    inverse_partial::<4>(coeffs, &BASIS_4, INVERSE_COLUMN_SHIFT + 1, out);
}

/// 2x2 output from the four lowest frequencies of an 8x8 block.
pub fn inverse_dct_2x2(coeffs: &[i32], out: &mut [i32]) {
    inverse_partial::<2>(coeffs, &BASIS_2, INVERSE_COLUMN_SHIFT + 2, out);
}

/// Block average from the DC coefficient alone.
pub fn inverse_dc_only(coeffs: &[i32], out: &mut [i32]) {
    out[0] = ((coeffs[0] + 4) >> 3).clamp(0, MAX_SAMPLE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_block_forward() {
        let samples = [512i32; 64];
        let mut coeffs = [0i32; 64];
        forward_dct(&samples, &mut coeffs);
        assert_eq!(coeffs[0], 16386);
        assert!(coeffs[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_dc_inverse() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 4096;
        let mut out = [0i32; 64];
        inverse_dct(&coeffs, &mut out);
        assert!(out.iter().all(|&s| s == 512));

        let mut out4 = [0i32; 16];
        inverse_dct_4x4(&coeffs, &mut out4);
        assert!(out4.iter().all(|&s| s == 512));

        let mut out2 = [0i32; 4];
        inverse_dct_2x2(&coeffs, &mut out2);
        assert!(out2.iter().all(|&s| s == 512));

        let mut out1 = [0i32; 1];
        inverse_dc_only(&coeffs, &mut out1);
        assert_eq!(out1[0], 512);
    }

    #[test]
    fn test_roundtrip_without_quantization() {
        let mut samples = [0i32; 64];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = ((i * 37 + (i / 8) * 11) % 1024) as i32;
        }
        let mut coeffs = [0i32; 64];
        forward_dct(&samples, &mut coeffs);
        // back to the orthonormal domain
        for c in coeffs.iter_mut() {
            *c >>= 2;
        }
        let mut out = [0i32; 64];
        inverse_dct(&coeffs, &mut out);
        for (a, b) in samples.iter().zip(out.iter()) {
            assert!((a - b).abs() <= 2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_output_is_clamped() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 20000;
        let mut out = [0i32; 64];
        inverse_dct(&coeffs, &mut out);
        assert!(out.iter().all(|&s| s == MAX_SAMPLE));
        coeffs[0] = -500;
        inverse_dct(&coeffs, &mut out);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_reduced_matches_block_average() {
        // left half 256, right half 768
        let mut samples = [0i32; 64];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = if i % 8 < 4 { 256 } else { 768 };
        }
        let mut coeffs = [0i32; 64];
        forward_dct(&samples, &mut coeffs);
        for c in coeffs.iter_mut() {
            *c >>= 2;
        }
        let mut out2 = [0i32; 4];
        inverse_dct_2x2(&coeffs, &mut out2);
        assert!((out2[0] - 256).abs() <= 32, "{:?}", out2);
        assert!((out2[1] - 768).abs() <= 32, "{:?}", out2);
        let mut out1 = [0i32; 1];
        inverse_dc_only(&coeffs, &mut out1);
        assert!((out1[0] - 512).abs() <= 1);
    }
}
