//! Macroblock to plane sample mapping
//!
//! A macroblock covers 16x16 luma samples. Its luma blocks are ordered
//! top-left, top-right, bottom-left, bottom-right. In 4:2:2 each chroma plane
//! holds one 8-wide column of two blocks (top, bottom); in 4:4:4 the chroma
//! blocks run column-wise: top-left, bottom-left, top-right, bottom-right.
//!
//! Regions address picture lines through `first_line + row * line_step`, so
//! the same code serves progressive pictures and the two fields of an
//! interlaced frame.

use crate::types::ChromaFormat;

const LUMA_BLOCKS: [(usize, usize); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];
const CHROMA_422_BLOCKS: [(usize, usize); 2] = [(0, 0), (0, 1)];
const CHROMA_444_BLOCKS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Block positions inside a macroblock, in coding order, in block units.
pub fn block_positions(plane: usize, chroma_format: ChromaFormat) -> &'static [(usize, usize)] {
    match (plane, chroma_format) {
        (0, _) => &LUMA_BLOCKS,
        (_, ChromaFormat::YUV422) => &CHROMA_422_BLOCKS,
        (_, ChromaFormat::YUV444) => &CHROMA_444_BLOCKS,
    }
}

/// Number of blocks per macroblock in a plane
pub fn blocks_per_mb(plane: usize, chroma_format: ChromaFormat) -> usize {
    block_positions(plane, chroma_format).len()
}

/// Width of a macroblock in a plane, in blocks
pub fn mb_width_in_blocks(plane: usize, chroma_format: ChromaFormat) -> usize {
    if plane == 0 {
        2
    } else {
        2 >> chroma_format.chroma_h_shift()
    }
}

/// Writable window of one plane, usually one macroblock row.
#[derive(Debug)]
pub struct PlaneRegion<'a> {
    data: &'a mut [u8],
    low_bits: Option<&'a mut [u8]>,
    stride: usize,
    first_line: usize,
    line_step: usize,
}

impl<'a> PlaneRegion<'a> {
    /// Wrap plane memory; `first_line` and `line_step` select a field.
    pub fn new(
        data: &'a mut [u8],
        low_bits: Option<&'a mut [u8]>,
        stride: usize,
        first_line: usize,
        line_step: usize,
    ) -> Self {
        PlaneRegion {
            data,
            low_bits,
            stride,
            first_line,
            line_step,
        }
    }

    /// Store an `size`x`size` block of 10-bit samples with its top-left corner at (x, y).
    pub fn put_block(&mut self, x: usize, y: usize, size: usize, samples: &[i32]) {
        for (row, line) in samples.chunks_exact(size).take(size).enumerate() {
            let start = (self.first_line + (y + row) * self.line_step) * self.stride + x;
            let out = &mut self.data[start..start + size];
            for (dst, &s) in out.iter_mut().zip(line) {
                *dst = (s >> 2) as u8;
            }
            if let Some(low) = self.low_bits.as_deref_mut() {
                for (dst, &s) in low[start..start + size].iter_mut().zip(line) {
                    *dst = (s & 3) as u8;
                }
            }
        }
    }
}

/// Read-only window of one plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    low_bits: Option<&'a [u8]>,
    stride: usize,
    first_line: usize,
    line_step: usize,
}

impl<'a> PlaneView<'a> {
    /// Wrap plane memory; `first_line` and `line_step` select a field.
    pub fn new(
        data: &'a [u8],
        low_bits: Option<&'a [u8]>,
        stride: usize,
        first_line: usize,
        line_step: usize,
    ) -> Self {
        PlaneView {
            data,
            low_bits,
            stride,
            first_line,
            line_step,
        }
    }

    /// Load an 8x8 block of 10-bit samples with its top-left corner at (x, y).
    pub fn get_block(&self, x: usize, y: usize, out: &mut [i32]) {
        for (row, line) in out.chunks_exact_mut(8).take(8).enumerate() {
            let start = (self.first_line + (y + row) * self.line_step) * self.stride + x;
            let high = &self.data[start..start + 8];
            match self.low_bits {
                Some(low) => {
                    for ((dst, &h), &l) in line.iter_mut().zip(high).zip(&low[start..start + 8]) {
                        *dst = ((h as i32) << 2) | (l & 3) as i32;
                    }
                }
                None => {
                    for (dst, &h) in line.iter_mut().zip(high) {
                        *dst = (h as i32) << 2;
                    }
                }
            }
        }
    }
}
