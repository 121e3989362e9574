#![no_main]

//! Fuzz target for the frame decoder.
//!
//! Feeds arbitrary bytes through header parsing and full decoding, in both
//! concealing and strict mode, at every output scale.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use prores_codec::{get_dimensions, BlockScale, DecoderConfig, ProResDecoder};

#[derive(Arbitrary, Debug)]
struct DecodeInput {
    data: Vec<u8>,
    strict: bool,
    low_bits: bool,
    scale: Scale,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum Scale {
    Full,
    Half,
    Quarter,
    Eighth,
}

impl From<Scale> for BlockScale {
    fn from(scale: Scale) -> Self {
        match scale {
            Scale::Full => BlockScale::Full,
            Scale::Half => BlockScale::Half,
            Scale::Quarter => BlockScale::Quarter,
            Scale::Eighth => BlockScale::Eighth,
        }
    }
}

fuzz_target!(|input: DecodeInput| {
    let _ = get_dimensions(&input.data);

    let config = DecoderConfig::default()
        .with_strict(input.strict)
        .with_low_bits(input.low_bits)
        .with_block_scale(input.scale.into());
    let mut decoder = ProResDecoder::with_config(config);

    let _ = decoder.decode_header(&input.data);
    if let Ok(picture) = decoder.decode_frame(&input.data) {
        assert!(picture.validate().is_ok());
    }
});
