#![no_main]

//! Fuzz target for the coefficient reader.
//!
//! Decodes arbitrary bytes as one slice plane with a fuzzed block count and
//! coefficient limit. Every outcome must be a value or an error.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use prores_codec::{read_ac, read_dc, scale_matrix, BitReader, CoderContext, INTERLACED_SCAN, PROGRESSIVE_SCAN};

#[derive(Arbitrary, Debug)]
struct SliceInput {
    data: Vec<u8>,
    log2_blocks: u8,
    max_coeffs: u8,
    qscale: u8,
    interlaced: bool,
}

fuzz_target!(|input: SliceInput| {
    let block_count = 1usize << (input.log2_blocks % 6);
    let quant = scale_matrix(&[4; 64], (input.qscale as u32).max(1));
    let scan = if input.interlaced {
        &INTERLACED_SCAN
    } else {
        &PROGRESSIVE_SCAN
    };

    let mut blocks = vec![0i32; block_count * 64];
    let mut ctx = CoderContext::new();
    let mut reader = BitReader::new(&input.data);
    if read_dc(&mut reader, &mut ctx, &mut blocks, block_count, &quant).is_err() {
        return;
    }
    let _ = read_ac(
        &mut reader,
        &mut ctx,
        &mut blocks,
        block_count,
        &quant,
        scan,
        input.max_coeffs as usize % 65,
    );
});
