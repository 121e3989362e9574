//! Reduced-resolution block reconstruction
//!
//! Decoding at 1/2, 1/4 or 1/8 scale keeps only the low-frequency corner of
//! each block. Both scan orders code that corner first, so the coefficient
//! decoder can stop early and the inverse transform shrinks to match.

use std::fmt;

use crate::dct::{inverse_dc_only, inverse_dct, inverse_dct_2x2, inverse_dct_4x4};
use crate::mapper::PlaneRegion;

/// Turns one block of dequantized coefficients into output samples.
pub trait BlockReducer: Send + Sync + fmt::Debug {
    /// Side of the output block in samples
    fn block_size(&self) -> usize;

    /// Number of leading scan positions the reconstruction uses
    fn max_coeffs_per_block(&self) -> usize;

    /// Reconstruct `block_size()`² samples from 64 raster-order coefficients
    fn inverse_transform(&self, coeffs: &[i32], out: &mut [i32]);

    /// Write reconstructed samples into a plane region
    fn place_samples(&self, region: &mut PlaneRegion<'_>, x: usize, y: usize, samples: &[i32]) {
        region.put_block(x, y, self.block_size(), samples);
    }
}

/// Full-resolution 8x8 reconstruction
#[derive(Debug, Clone, Copy, Default)]
pub struct FullBlock;

impl BlockReducer for FullBlock {
    fn block_size(&self) -> usize {
        8
    }

    fn max_coeffs_per_block(&self) -> usize {
        64
    }

    fn inverse_transform(&self, coeffs: &[i32], out: &mut [i32]) {
        inverse_dct(coeffs, out);
    }
}

/// Half-resolution 4x4 reconstruction
#[derive(Debug, Clone, Copy, Default)]
pub struct Reduced4x4;

impl BlockReducer for Reduced4x4 {
    fn block_size(&self) -> usize {
        4
    }

    fn max_coeffs_per_block(&self) -> usize {
        16
    }

    fn inverse_transform(&self, coeffs: &[i32], out: &mut [i32]) {
        inverse_dct_4x4(coeffs, out);
    }
}

/// Quarter-resolution 2x2 reconstruction
#[derive(Debug, Clone, Copy, Default)]
pub struct Reduced2x2;

impl BlockReducer for Reduced2x2 {
    fn block_size(&self) -> usize {
        2
    }

    fn max_coeffs_per_block(&self) -> usize {
        4
    }

    fn inverse_transform(&self, coeffs: &[i32], out: &mut [i32]) {
        inverse_dct_2x2(coeffs, out);
    }
}

/// One sample per block, the block average
#[derive(Debug, Clone, Copy, Default)]
pub struct DcOnly;

impl BlockReducer for DcOnly {
    fn block_size(&self) -> usize {
        1
    }

    fn max_coeffs_per_block(&self) -> usize {
        1
    }

    fn inverse_transform(&self, coeffs: &[i32], out: &mut [i32]) {
        inverse_dc_only(coeffs, out);
    }
}

/// Output scale of the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockScale {
    /// Full resolution
    #[default]
    Full,
    /// Half width and height
    Half,
    /// Quarter width and height
    Quarter,
    /// One sample per 8x8 block
    Eighth,
}

impl BlockScale {
    /// Reducer implementing this scale
    pub fn reducer(self) -> &'static dyn BlockReducer {
        match self {
            BlockScale::Full => &FullBlock,
            BlockScale::Half => &Reduced4x4,
            BlockScale::Quarter => &Reduced2x2,
            BlockScale::Eighth => &DcOnly,
        }
    }

    /// log2 of the downscale factor
    pub fn log2_factor(self) -> u32 {
        match self {
            BlockScale::Full => 0,
            BlockScale::Half => 1,
            BlockScale::Quarter => 2,
            BlockScale::Eighth => 3,
        }
    }

    /// Scale a full-resolution dimension, rounding up
    pub fn scale_dimension(self, value: u32) -> u32 {
        let shift = self.log2_factor();
        (value + (1 << shift) - 1) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_match_reducers() {
        for scale in [
            BlockScale::Full,
            BlockScale::Half,
            BlockScale::Quarter,
            BlockScale::Eighth,
        ] {
            let reducer = scale.reducer();
            assert_eq!(reducer.block_size(), 8 >> scale.log2_factor());
            assert_eq!(
                reducer.max_coeffs_per_block(),
                reducer.block_size() * reducer.block_size()
            );
        }
    }

    #[test]
    fn test_scale_dimension() {
        assert_eq!(BlockScale::Full.scale_dimension(1080), 1080);
        assert_eq!(BlockScale::Half.scale_dimension(1081), 541);
        assert_eq!(BlockScale::Eighth.scale_dimension(1920), 240);
    }

    #[test]
    fn test_dc_only_places_one_sample() {
        let mut coeffs = [0i32; 64];
        coeffs[0] = 4096;
        let mut sample = [0i32; 1];
        DcOnly.inverse_transform(&coeffs, &mut sample);

        let mut data = vec![0u8; 4];
        let mut region = PlaneRegion::new(&mut data, None, 2, 0, 1);
        DcOnly.place_samples(&mut region, 1, 1, &sample);
        assert_eq!(data, vec![0, 0, 0, 128]);
    }
}
