// Codec implementations often use patterns that trigger clippy warnings
#![allow(clippy::too_many_arguments)]

//! ProRes Video Codec
//!
//! This crate provides a pure Rust implementation of the Apple ProRes
//! intra-frame codec. It encodes and decodes the 422 profiles (Proxy, LT,
//! Standard, HQ) and ProRes 4444 without alpha.
//!
//! # Features
//!
//! - Frame, picture and slice header parsing and writing
//! - Adaptive Rice/exp-Golomb coefficient coding
//! - Per-slice quantizer search driven by a bit budget
//! - Progressive and interlaced (two field pictures) frames
//! - 10-bit samples through an optional low-bits plane
//! - Reduced-resolution decoding at 1/2, 1/4 and 1/8 scale
//! - Row-parallel decoding and encoding on rayon
//!
//! # Example
//!
//! ```no_run
//! use prores_codec::{DecoderConfig, EncoderConfig, ProResDecoder, ProResEncoder, ProResProfile};
//! use prores_codec::{ChromaFormat, InterlaceMode, Picture};
//!
//! let y = vec![128u8; 1920 * 1080];
//! let c = vec![128u8; 960 * 1080];
//! let picture = Picture::from_planes(
//!     1920, 1080, ChromaFormat::YUV422, InterlaceMode::Progressive, &y, &c, &c,
//! ).unwrap();
//!
//! let mut encoder = ProResEncoder::with_config(EncoderConfig::new(ProResProfile::HQ));
//! let frame = encoder.encode_to_vec(&picture).unwrap();
//!
//! let mut decoder = ProResDecoder::with_config(DecoderConfig::default().with_multithreading(true));
//! let decoded = decoder.decode_frame(&frame).unwrap();
//! println!("Frame: {}x{}", decoded.width, decoded.height);
//! ```

mod bitstream;
mod coeffs;
mod dct;
mod decoder;
mod encoder;
mod error;
mod frame;
mod mapper;
mod parallel;
mod picture;
mod quant;
mod ratecontrol;
mod reduce;
mod slice;
mod tables;
mod types;

/// Codebook parameters (public for testing)
pub mod codebook;
/// Codeword coding (public for testing)
pub mod entropy;

pub use bitstream::{BitReader, BitWriter};
pub use coeffs::{read_ac, read_dc, write_ac, write_dc, CoderContext};
pub use dct::{forward_dct, inverse_dct};
pub use decoder::{get_dimensions, probe_prores, DecoderConfig, ProResDecoder};
pub use encoder::{EncodeStats, EncoderConfig, ProResEncoder};
pub use error::{ProResError, Result};
pub use frame::{
    coded_dimensions, slice_count, slice_schedule, FrameHeader, PictureHeader, SliceInfo,
};
pub use mapper::{PlaneRegion, PlaneView};
pub use picture::Picture;
pub use quant::{decode_qscale, dequantize, encode_qscale, quantize, scale_matrix};
pub use ratecontrol::{BitBudget, RateDecision, RateProfile, SliceRateController};
pub use reduce::{BlockReducer, BlockScale, DcOnly, FullBlock, Reduced2x2, Reduced4x4};
pub use slice::{SliceHeader, SliceScratch};
pub use tables::{scan_for, INTERLACED_SCAN, PROGRESSIVE_SCAN};
pub use types::{
    ChromaFormat, ColorPrimaries, InterlaceMode, MatrixCoefficients, ProResProfile,
    TransferCharacteristic,
};
