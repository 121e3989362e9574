//! Per-slice quantizer search
//!
//! Each slice gets a bit budget proportional to its macroblock count. The
//! search starts from the quantizer of the previous slice and walks in one
//! direction until the coded size enters the budget window or the profile's
//! quantizer range is exhausted.

use crate::error::Result;

/// Quantization matrices, bit budget and quantizer range of an encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateProfile {
    /// Luma quantization matrix (raster order)
    pub luma_quant: [u8; 64],
    /// Chroma quantization matrix (raster order)
    pub chroma_quant: [u8; 64],
    /// Target bits per four macroblocks
    pub bitrate: u32,
    /// Finest quantizer the search may use
    pub first_qp: u8,
    /// Coarsest quantizer the search may use
    pub last_qp: u8,
}

/// Accepted size window of one slice, in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitBudget {
    /// Nominal size
    pub estimate: usize,
    /// Sizes below this lower the quantizer
    pub low: usize,
    /// Sizes above this raise the quantizer
    pub high: usize,
}

/// Outcome of a slice search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Quantizer of the final encode
    pub qp: u8,
    /// Size of the final encode in bits
    pub bits: usize,
    /// Number of encodes performed
    pub iterations: u32,
}

/// Quantizer search for one picture.
#[derive(Debug, Clone, Copy)]
pub struct SliceRateController {
    bitrate: u32,
    first_qp: u8,
    last_qp: u8,
}

impl SliceRateController {
    /// Create a controller for a rate profile
    pub fn new(profile: &RateProfile) -> Self {
        SliceRateController {
            bitrate: profile.bitrate,
            first_qp: profile.first_qp,
            last_qp: profile.last_qp.max(profile.first_qp),
        }
    }

    /// Quantizer of the first slice of a picture
    pub fn initial_qp(&self) -> u8 {
        self.first_qp
    }

    /// Size window for a slice of `mb_count` macroblocks
    pub fn budget(&self, mb_count: u32) -> BitBudget {
        let estimate = (mb_count as usize * self.bitrate as usize) >> 2;
        let margin = estimate >> 3;
        BitBudget {
            estimate,
            low: estimate - margin,
            high: estimate + margin,
        }
    }

    /// Pick the quantizer for a slice.
    ///
    /// `encode` codes the whole slice at the given quantizer and returns its
    /// size in bits; it is called once per quantizer tried and the last call
    /// is always made with the returned quantizer.
    pub fn search<F>(&self, previous_qp: u8, mb_count: u32, mut encode: F) -> Result<RateDecision>
    where
        F: FnMut(u8) -> Result<usize>,
    {
        let budget = self.budget(mb_count);
        let mut qp = previous_qp.clamp(self.first_qp, self.last_qp);
        let mut bits = encode(qp)?;
        let mut iterations = 1;

        if bits > budget.high {
            while bits > budget.high && qp < self.last_qp {
                qp += 1;
                bits = encode(qp)?;
                iterations += 1;
            }
        } else if bits < budget.low {
            while bits < budget.low && qp > self.first_qp {
                qp -= 1;
                bits = encode(qp)?;
                iterations += 1;
            }
        }

        tracing::trace!(qp, bits, iterations, budget = budget.estimate, "slice quantizer");
        Ok(RateDecision {
            qp,
            bits,
            iterations,
        })
    }
}
