//! DC and AC coefficient coding for one slice plane
//!
//! All blocks of a slice plane are coded together. DC values form a chain of
//! differences across blocks, AC values are coded frequency-major: for each
//! scan position, every block's coefficient is visited before moving to the
//! next position, so a zero run can span block boundaries.
//!
//! Blocks are stored as consecutive 64-entry raster arrays.

use crate::bitstream::{BitReader, BitWriter};
use crate::codebook::{codebook, SymbolClass};
use crate::entropy::{read_codeword, to_golomb, to_signed, write_codeword};
use crate::error::{ProResError, Result};
use crate::quant::{dequantize, DECODER_DC_OFFSET};

/// Adaptive state of the coefficient coder.
///
/// A fresh context is used for every plane of every slice; both the reader
/// and the writer update it symbol by symbol in the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderContext {
    /// Previous DC codeword, clamped to the DC table
    pub prev_dc_code: u32,
    /// Running sign of the DC differences
    pub dc_negative: bool,
    /// Previous zero run, clamped to the run table
    pub prev_run: u32,
    /// Previous AC magnitude, clamped to the level table
    pub prev_level: u32,
}

impl CoderContext {
    /// Context at the start of a slice plane
    pub const fn new() -> Self {
        CoderContext {
            prev_dc_code: 5,
            dc_negative: false,
            prev_run: 4,
            prev_level: 2,
        }
    }

    fn update_dc(&mut self, code: u32) {
        if code == 0 {
            self.dc_negative = false;
        } else if code & 1 == 1 {
            self.dc_negative = !self.dc_negative;
        }
        self.prev_dc_code = code.min(6);
    }

    fn update_ac(&mut self, run: u32, level: u32) {
        self.prev_run = run.min(15);
        self.prev_level = level.min(9);
    }
}

impl Default for CoderContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the DC coefficients of `block_count` blocks.
///
/// `scaled_quant` is indexed by scan position.
pub fn read_dc(
    reader: &mut BitReader,
    ctx: &mut CoderContext,
    blocks: &mut [i32],
    block_count: usize,
    scaled_quant: &[i32; 64],
) -> Result<()> {
    let code = read_codeword(reader, codebook(SymbolClass::FirstDc, 0))?;
    let mut prev_dc = to_signed(code);
    blocks[0] = dequantize(prev_dc, scaled_quant[0]) + DECODER_DC_OFFSET;

    for block in 1..block_count {
        let code = read_codeword(reader, codebook(SymbolClass::DcDelta, ctx.prev_dc_code))?;
        ctx.update_dc(code);
        let magnitude = ((code + 1) >> 1) as i32;
        prev_dc += if ctx.dc_negative { -magnitude } else { magnitude };
        blocks[block * 64] = dequantize(prev_dc, scaled_quant[0]) + DECODER_DC_OFFSET;
    }
    Ok(())
}

/// Decode the AC coefficients of `block_count` blocks.
///
/// Coefficients at scan positions `max_coeffs_per_block` and above end the
/// plane early; reduced-resolution decoding never needs them.
pub fn read_ac(
    reader: &mut BitReader,
    ctx: &mut CoderContext,
    blocks: &mut [i32],
    block_count: usize,
    scaled_quant: &[i32; 64],
    scan: &[u8; 64],
    max_coeffs_per_block: usize,
) -> Result<()> {
    debug_assert!(block_count.is_power_of_two());
    let log2_blocks = block_count.trailing_zeros();
    let block_mask = block_count - 1;
    let end = 64 * block_count;
    let limit = max_coeffs_per_block.min(64) * block_count;

    let mut pos = block_mask;
    loop {
        if reader.bits_left() == 0 || reader.only_padding_left() {
            break;
        }
        let run = read_codeword(reader, codebook(SymbolClass::AcRun, ctx.prev_run))?;
        pos += run as usize + 1;
        if pos >= end {
            return Err(ProResError::CorruptBitstream(format!(
                "AC run reaches position {} of {}",
                pos, end
            )));
        }
        if pos >= limit {
            break;
        }
        let level = read_codeword(reader, codebook(SymbolClass::AcLevel, ctx.prev_level))? + 1;
        let negative = reader.read_bit()?;
        ctx.update_ac(run, level);

        let i = pos >> log2_blocks;
        let level = if negative { -(level as i32) } else { level as i32 };
        blocks[((pos & block_mask) << 6) + scan[i] as usize] = dequantize(level, scaled_quant[i]);
    }
    Ok(())
}

/// Encode the quantized DC levels of `block_count` blocks.
pub fn write_dc(writer: &mut BitWriter, ctx: &mut CoderContext, levels: &[i32], block_count: usize) {
    let mut prev_dc = levels[0];
    write_codeword(writer, codebook(SymbolClass::FirstDc, 0), to_golomb(prev_dc));

    for block in 1..block_count {
        let dc = levels[block * 64];
        let delta = dc - prev_dc;
        let flipped = if ctx.dc_negative { -delta } else { delta };
        let code = to_golomb(flipped);
        write_codeword(writer, codebook(SymbolClass::DcDelta, ctx.prev_dc_code), code);
        ctx.prev_dc_code = code.min(6);
        ctx.dc_negative = delta < 0;
        prev_dc = dc;
    }
}

/// Encode the quantized AC levels of `block_count` blocks in scan order.
pub fn write_ac(
    writer: &mut BitWriter,
    ctx: &mut CoderContext,
    levels: &[i32],
    block_count: usize,
    scan: &[u8; 64],
) {
    let mut run = 0u32;
    for &pos in &scan[1..] {
        for block in 0..block_count {
            let level = levels[block * 64 + pos as usize];
            if level == 0 {
                run += 1;
                continue;
            }
            let magnitude = level.unsigned_abs();
            write_codeword(writer, codebook(SymbolClass::AcRun, ctx.prev_run), run);
            write_codeword(writer, codebook(SymbolClass::AcLevel, ctx.prev_level), magnitude - 1);
            writer.write_bits((level < 0) as u32, 1);
            ctx.update_ac(run, magnitude);
            run = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::scale_matrix;
    use crate::tables::PROGRESSIVE_SCAN;

    const BLOCKS: usize = 4;

    fn unit_quant() -> [i32; 64] {
        // 4 * 1 >> 2 keeps levels unchanged
        scale_matrix(&[4; 64], 1)
    }

    fn sample_levels() -> Vec<i32> {
        let mut levels = vec![0i32; BLOCKS * 64];
        let dcs = [3, -7, -7, 12];
        for (b, dc) in dcs.iter().enumerate() {
            levels[b * 64] = *dc;
        }
        levels[1] = 5;
        levels[64 + 8] = -2;
        levels[2 * 64 + 63] = 1;
        levels[3 * 64 + 9] = -40;
        levels[3 * 64 + 1] = 300;
        levels
    }

    fn encode(levels: &[i32]) -> (Vec<u8>, CoderContext) {
        let mut writer = BitWriter::new();
        let mut ctx = CoderContext::new();
        write_dc(&mut writer, &mut ctx, levels, BLOCKS);
        write_ac(&mut writer, &mut ctx, levels, BLOCKS, &PROGRESSIVE_SCAN);
        (writer.into_bytes(), ctx)
    }

    fn decode(data: &[u8], max_coeffs: usize) -> Result<(Vec<i32>, CoderContext)> {
        let mut blocks = vec![0i32; BLOCKS * 64];
        let mut ctx = CoderContext::new();
        let mut reader = BitReader::new(data);
        let quant = unit_quant();
        read_dc(&mut reader, &mut ctx, &mut blocks, BLOCKS, &quant)?;
        read_ac(
            &mut reader,
            &mut ctx,
            &mut blocks,
            BLOCKS,
            &quant,
            &PROGRESSIVE_SCAN,
            max_coeffs,
        )?;
        Ok((blocks, ctx))
    }

    #[test]
    fn test_roundtrip_levels() {
        let levels = sample_levels();
        let (data, enc_ctx) = encode(&levels);
        let (blocks, dec_ctx) = decode(&data, 64).unwrap();

        for b in 0..BLOCKS {
            assert_eq!(blocks[b * 64], levels[b * 64] + DECODER_DC_OFFSET);
            for i in 1..64 {
                assert_eq!(blocks[b * 64 + i], levels[b * 64 + i], "block {} coeff {}", b, i);
            }
        }
        assert_eq!(enc_ctx, dec_ctx);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let (data, _) = encode(&sample_levels());
        let first = decode(&data, 64).unwrap();
        let second = decode(&data, 64).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_ac_stream() {
        let mut levels = vec![0i32; BLOCKS * 64];
        levels[0] = 1;
        let (data, _) = encode(&levels);
        let (blocks, ctx) = decode(&data, 64).unwrap();
        assert_eq!(blocks[0], 1 + DECODER_DC_OFFSET);
        assert!(blocks[1..64].iter().all(|&c| c == 0));
        assert_eq!((ctx.prev_run, ctx.prev_level), (4, 2));
    }

    #[test]
    fn test_reduced_decode_drops_high_frequencies() {
        let levels = sample_levels();
        let (data, _) = encode(&levels);
        let (blocks, _) = decode(&data, 4).unwrap();
        // scan positions 0..4 cover raster 0, 1, 8, 9
        assert_eq!(blocks[1], 5);
        assert_eq!(blocks[64 + 8], -2);
        assert_eq!(blocks[3 * 64 + 9], -40);
        assert_eq!(blocks[3 * 64 + 1], 300);
        assert_eq!(blocks[2 * 64 + 63], 0);
    }

    #[test]
    fn test_dc_sign_chain() {
        // alternating deltas exercise the sign toggle
        let mut levels = vec![0i32; BLOCKS * 64];
        for (b, dc) in [0, 5, -5, 5].iter().enumerate() {
            levels[b * 64] = *dc;
        }
        let (data, _) = encode(&levels);
        let (blocks, _) = decode(&data, 64).unwrap();
        for b in 0..BLOCKS {
            assert_eq!(blocks[b * 64] - DECODER_DC_OFFSET, levels[b * 64]);
        }
    }

    #[test]
    fn test_run_overrun_is_corrupt() {
        let mut writer = BitWriter::new();
        let mut ctx = CoderContext::new();
        write_dc(&mut writer, &mut ctx, &vec![0i32; BLOCKS * 64], BLOCKS);
        write_codeword(&mut writer, codebook(SymbolClass::AcRun, ctx.prev_run), 64 * BLOCKS as u32);
        write_codeword(&mut writer, codebook(SymbolClass::AcLevel, ctx.prev_level), 0);
        writer.write_bits(0, 1);
        let data = writer.into_bytes();

        let err = decode(&data, 64).unwrap_err();
        assert!(matches!(err, ProResError::CorruptBitstream(_)));
    }

    #[test]
    fn test_frequency_major_order() {
        // the same frequency in two blocks is coded before the next frequency
        let mut levels = vec![0i32; BLOCKS * 64];
        levels[1] = 1;
        levels[64 + 1] = 1;
        let mut writer = BitWriter::new();
        let mut ctx = CoderContext::new();
        write_ac(&mut writer, &mut ctx, &levels, BLOCKS, &PROGRESSIVE_SCAN);
        // both runs are zero: the second run is coded with context 0
        assert_eq!(ctx.prev_run, 0);
        assert_eq!(ctx.prev_level, 1);
    }
}
