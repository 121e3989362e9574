//! Encode/decode tests over whole frames

use prores_codec::codebook::{codebook, SymbolClass};
use prores_codec::entropy::write_codeword;
use prores_codec::{
    dequantize, read_ac, read_dc, scale_matrix, write_dc, BitReader, BitWriter, BlockScale,
    ChromaFormat, CoderContext, DecoderConfig, EncoderConfig, FrameHeader, InterlaceMode, Picture,
    PictureHeader, ProResDecoder, ProResEncoder, ProResError, ProResProfile, SliceHeader,
};

/// Deterministic pseudo-random bytes
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

fn flat_picture(width: u32, height: u32, chroma: ChromaFormat, values: [u8; 3]) -> Picture {
    let mut picture = Picture::new(width, height, chroma);
    for (plane, value) in picture.planes.iter_mut().zip(values) {
        plane.fill(value);
    }
    picture
}

fn noisy_picture(width: u32, height: u32, chroma: ChromaFormat) -> Picture {
    let mut picture = Picture::new(width, height, chroma);
    for (index, plane) in picture.planes.iter_mut().enumerate() {
        let len = plane.len();
        plane.copy_from_slice(&noise(len, index as u32 + 7));
    }
    picture
}

fn max_error(a: &[u8], b: &[u8]) -> u8 {
    a.iter().zip(b).map(|(&x, &y)| x.abs_diff(y)).max().unwrap_or(0)
}

/// Assemble a progressive frame with flat matrices from raw slices.
fn assemble_frame(width: u16, height: u16, log2_slice_mb_width: u8, slices: &[Vec<u8>]) -> Vec<u8> {
    let header = FrameHeader::new(
        width,
        height,
        ChromaFormat::YUV422,
        InterlaceMode::Progressive,
        &[4; 64],
        &[4; 64],
    );
    let mut out = Vec::new();
    header.write(&mut out).unwrap();

    let slice_sizes: Vec<u16> = slices.iter().map(|s| s.len() as u16).collect();
    let payload: usize = slices.iter().map(Vec::len).sum();
    PictureHeader {
        header_size: 8,
        picture_size: (8 + 2 * slices.len() + payload) as u32,
        log2_slice_mb_width,
        slice_sizes,
    }
    .write(&mut out)
    .unwrap();
    for slice in slices {
        out.extend_from_slice(slice);
    }
    let frame_size = out.len() as u32;
    out[0..4].copy_from_slice(&frame_size.to_be_bytes());
    out
}

fn assemble_slice(qscale_raw: u8, planes: [Vec<u8>; 3]) -> Vec<u8> {
    let mut out = Vec::new();
    SliceHeader {
        header_size: 6,
        qscale_raw,
        y_data_size: planes[0].len() as u16,
        cb_data_size: planes[1].len() as u16,
        cr_data_size: planes[2].len() as u16,
    }
    .write(&mut out)
    .unwrap();
    for plane in planes {
        out.extend_from_slice(&plane);
    }
    out
}

/// A plane holding only zero DC levels
fn zero_plane(blocks: usize) -> Vec<u8> {
    let mut writer = BitWriter::new();
    write_dc(&mut writer, &mut CoderContext::new(), &vec![0; blocks * 64], blocks);
    writer.into_bytes()
}

mod scenarios {
    use super::*;

    #[test]
    fn test_flat_proxy_macroblock_stays_at_first_qp() {
        let picture = flat_picture(16, 16, ChromaFormat::YUV422, [128, 128, 128]);
        let mut encoder = ProResEncoder::with_config(EncoderConfig::new(ProResProfile::Proxy));
        let mut frame = Vec::new();
        let stats = encoder.encode_frame(&picture, &mut frame).unwrap();
        assert_eq!(stats.picture_qps, vec![vec![4]]);

        // one slice: qscale byte follows the slice header size
        let header = FrameHeader::parse(&frame).unwrap();
        let picture_header =
            PictureHeader::parse(&frame[header.picture_offset()..], 1, 1).unwrap();
        let slice_start = header.picture_offset() + picture_header.slice_data_offset();
        let slice_header = SliceHeader::parse(&frame[slice_start..]).unwrap();
        assert_eq!(slice_header.qscale(), 4);

        // every plane is one DC codeword per block and no AC codewords
        let mut offset = slice_start + slice_header.header_size as usize;
        for (plane, block_count) in [(0, 4), (1, 2), (2, 2)] {
            let size = slice_header.plane_size(plane);
            let data = &frame[offset..offset + size];
            offset += size;

            let mut dc_only = BitWriter::new();
            let zeros = vec![0; block_count * 64];
            write_dc(&mut dc_only, &mut CoderContext::new(), &zeros, block_count);
            assert_eq!(data, &dc_only.into_bytes()[..], "plane {}", plane);

            let matrix = if plane == 0 {
                &header.luma_quant_matrix
            } else {
                &header.chroma_quant_matrix
            };
            let quant = scale_matrix(matrix, slice_header.qscale());
            let mut blocks = vec![0i32; block_count * 64];
            let mut ctx = CoderContext::new();
            let mut reader = BitReader::new(data);
            read_dc(&mut reader, &mut ctx, &mut blocks, block_count, &quant).unwrap();
            assert!(reader.only_padding_left());
            read_ac(&mut reader, &mut ctx, &mut blocks, block_count, &quant, header.scan(), 64)
                .unwrap();
            for block in blocks.chunks_exact(64) {
                assert!(block[1..].iter().all(|&c| c == 0));
            }
            assert_eq!((ctx.prev_run, ctx.prev_level), (4, 2));
        }
        assert_eq!(offset, slice_start + picture_header.slice_sizes[0] as usize);

        let decoded = ProResDecoder::new().decode_frame(&frame).unwrap();
        for plane in 0..3 {
            assert!(decoded.crop_plane(plane).iter().all(|&s| s == 128));
        }
    }

    fn overrun_frame() -> Vec<u8> {
        let mut writer = BitWriter::new();
        let mut ctx = CoderContext::new();
        write_dc(&mut writer, &mut ctx, &[0; 4 * 64], 4);
        write_codeword(&mut writer, codebook(SymbolClass::AcRun, ctx.prev_run), 4 * 64);
        write_codeword(&mut writer, codebook(SymbolClass::AcLevel, ctx.prev_level), 0);
        writer.write_bits(0, 1);
        let luma = writer.into_bytes();

        let slice = assemble_slice(1, [luma, zero_plane(2), zero_plane(2)]);
        assemble_frame(16, 16, 0, &[slice])
    }

    #[test]
    fn test_run_overrun_is_concealed() {
        let frame = overrun_frame();
        let mut decoder = ProResDecoder::new();
        let decoded = decoder.decode_frame(&frame).unwrap();
        // DC survives, the AC stream is dropped
        assert!(decoded.planes[0].iter().all(|&s| s == 128));
        assert!(decoded.planes[1].iter().all(|&s| s == 128));
        assert_eq!(decoder.frame_count(), 1);
    }

    #[test]
    fn test_run_overrun_fails_strict_decode() {
        let frame = overrun_frame();
        let mut decoder = ProResDecoder::with_config(DecoderConfig::default().with_strict(true));
        let err = decoder.decode_frame(&frame).unwrap_err();
        assert!(matches!(
            err,
            ProResError::CorruptSliceData {
                mb_x: 0,
                mb_y: 0,
                plane: 0,
                ..
            }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_gradient_roundtrip_at_fixed_qp() {
        let (width, height) = (64usize, 16usize);
        let y: Vec<u8> = (0..width * height)
            .map(|i| ((i % width) * 3 + i / width) as u8)
            .collect();
        let cb: Vec<u8> = (0..width / 2 * height).map(|i| (100 + i % 32) as u8).collect();
        let cr: Vec<u8> = (0..width / 2 * height).map(|i| (150 - i % 32) as u8).collect();
        let picture = Picture::from_planes(
            width as u32,
            height as u32,
            ChromaFormat::YUV422,
            InterlaceMode::Progressive,
            &y,
            &cb,
            &cr,
        )
        .unwrap();

        let config = EncoderConfig::new(ProResProfile::HQ).with_qp_range(10, 10);
        let mut encoder = ProResEncoder::with_config(config);
        let mut frame = Vec::new();
        let stats = encoder.encode_frame(&picture, &mut frame).unwrap();
        assert!(stats.picture_qps[0].iter().all(|&qp| qp == 10));

        let decoded = ProResDecoder::new().decode_frame(&frame).unwrap();
        assert!(max_error(&decoded.crop_plane(0), &y) <= 3);
        assert!(max_error(&decoded.crop_plane(1), &cb) <= 3);
        assert!(max_error(&decoded.crop_plane(2), &cr) <= 3);
    }

    #[test]
    fn test_absent_luma_matrix_with_chroma_matrix() {
        let chroma: [u8; 64] = std::array::from_fn(|i| 8 + i as u8);
        let mut header = FrameHeader::new(
            32,
            32,
            ChromaFormat::YUV422,
            InterlaceMode::Progressive,
            &[4; 64],
            &chroma,
        );
        header.has_luma_quant = false;
        let mut data = Vec::new();
        header.write(&mut data).unwrap();

        let parsed = FrameHeader::parse(&data).unwrap();
        assert_eq!(parsed.header_size, 84);
        assert_eq!(parsed.luma_quant_matrix, [4; 64]);
        assert_eq!(parsed.chroma_quant_matrix, header.chroma_quant_matrix);
    }

    #[test]
    fn test_dequantize_reference() {
        let scaled = scale_matrix(&[4; 64], 10);
        assert_eq!(dequantize(5, scaled[0]), 50);
    }
}

mod layouts {
    use super::*;

    #[test]
    fn test_interlaced_fields_roundtrip() {
        for interlace in [InterlaceMode::InterlacedTFF, InterlaceMode::InterlacedBFF] {
            let mut picture = Picture::for_layout(16, 32, ChromaFormat::YUV422, interlace);
            for plane in 0..3 {
                let stride = picture.stride(plane);
                for (line, row) in picture.planes[plane].chunks_mut(stride).enumerate() {
                    row.fill(if line % 2 == 0 { 60 } else { 180 });
                }
            }

            let mut encoder =
                ProResEncoder::with_config(EncoderConfig::default().with_interlace(interlace));
            let frame = encoder.encode_to_vec(&picture).unwrap();

            let mut decoder = ProResDecoder::new();
            let header = decoder.decode_header(&frame).unwrap();
            assert_eq!(header.interlace_mode, interlace);
            let decoded = decoder.decode_frame(&frame).unwrap();
            assert_eq!(decoded.planes, picture.planes, "{:?}", interlace);
        }
    }

    #[test]
    fn test_444_roundtrip() {
        let picture = flat_picture(32, 16, ChromaFormat::YUV444, [90, 30, 220]);
        let mut encoder = ProResEncoder::with_config(EncoderConfig::new(ProResProfile::P4444));
        let frame = encoder.encode_to_vec(&picture).unwrap();

        let decoded = ProResDecoder::new().decode_frame(&frame).unwrap();
        assert_eq!(decoded.chroma_format, ChromaFormat::YUV444);
        assert_eq!(decoded.planes, picture.planes);
    }

    #[test]
    fn test_low_bits_roundtrip() {
        let mut picture = Picture::new(16, 16, ChromaFormat::YUV422).with_low_bits();
        for plane in picture.planes.iter_mut() {
            plane.fill(128);
        }
        if let Some(low) = picture.low_bits.as_mut() {
            for plane in low.iter_mut() {
                plane.fill(1);
            }
        }

        let frame = ProResEncoder::new().encode_to_vec(&picture).unwrap();
        let config = DecoderConfig::default().with_low_bits(true);
        let decoded = ProResDecoder::with_config(config).decode_frame(&frame).unwrap();
        assert_eq!(decoded.sample(0, 5, 5), 513);
        assert_eq!(decoded.sample(2, 7, 15), 513);
    }

    #[test]
    fn test_display_size_is_cropped() {
        let y = vec![77u8; 20 * 10];
        let c = vec![33u8; 10 * 10];
        let picture = Picture::from_planes(
            20,
            10,
            ChromaFormat::YUV422,
            InterlaceMode::Progressive,
            &y,
            &c,
            &c,
        )
        .unwrap();
        let frame = ProResEncoder::new().encode_to_vec(&picture).unwrap();

        let decoded = ProResDecoder::new().decode_frame(&frame).unwrap();
        assert_eq!((decoded.width, decoded.height), (20, 10));
        assert_eq!((decoded.coded_width, decoded.coded_height), (32, 16));
        assert_eq!(decoded.crop_plane(0), y);
        assert_eq!(decoded.crop_plane(1), c);
    }
}

mod reduced {
    use super::*;

    fn two_tone_frame() -> Vec<u8> {
        let mut picture = Picture::new(32, 16, ChromaFormat::YUV422);
        for plane in 0..3 {
            let stride = picture.stride(plane);
            for row in picture.planes[plane].chunks_mut(stride) {
                let (left, right) = row.split_at_mut(stride / 2);
                left.fill(40);
                right.fill(200);
            }
        }
        ProResEncoder::new().encode_to_vec(&picture).unwrap()
    }

    #[test]
    fn test_eighth_scale_gives_block_averages() {
        let frame = two_tone_frame();
        let config = DecoderConfig::default().with_block_scale(BlockScale::Eighth);
        let decoded = ProResDecoder::with_config(config).decode_frame(&frame).unwrap();

        assert_eq!((decoded.coded_width, decoded.coded_height), (4, 2));
        assert_eq!(decoded.planes[0], vec![40, 40, 200, 200, 40, 40, 200, 200]);
        assert_eq!(decoded.planes[1], vec![40, 200, 40, 200]);
    }

    #[test]
    fn test_half_scale() {
        let frame = two_tone_frame();
        let config = DecoderConfig::default().with_block_scale(BlockScale::Half);
        let decoded = ProResDecoder::with_config(config).decode_frame(&frame).unwrap();

        assert_eq!((decoded.width, decoded.height), (16, 8));
        for row in decoded.planes[0].chunks(16) {
            assert!(row[..8].iter().all(|&s| s.abs_diff(40) <= 1));
            assert!(row[8..].iter().all(|&s| s.abs_diff(200) <= 1));
        }
    }

    #[test]
    fn test_decode_into_checks_reduced_size() {
        let frame = two_tone_frame();
        let config = DecoderConfig::default().with_block_scale(BlockScale::Quarter);
        let mut decoder = ProResDecoder::with_config(config);

        let mut full = Picture::new(32, 16, ChromaFormat::YUV422);
        assert!(decoder.decode_into(&frame, &mut full).is_err());

        let mut quarter = Picture::with_coded_size(8, 4, 8, 4, ChromaFormat::YUV422);
        let header = decoder.decode_into(&frame, &mut quarter).unwrap();
        assert_eq!(header.width, 32);
        assert!(quarter.planes[0][..4].iter().all(|&s| s.abs_diff(40) <= 1));
    }
}

mod rate_control {
    use super::*;

    #[test]
    fn test_qps_stay_in_profile_range() {
        let picture = noisy_picture(128, 32, ChromaFormat::YUV422);
        for profile in [ProResProfile::Proxy, ProResProfile::LT, ProResProfile::HQ] {
            let rate = profile.rate_profile();
            let mut encoder = ProResEncoder::with_config(EncoderConfig::new(profile));
            let mut frame = Vec::new();
            let stats = encoder.encode_frame(&picture, &mut frame).unwrap();
            for &qp in &stats.picture_qps[0] {
                assert!(qp >= rate.first_qp && qp <= rate.last_qp, "{:?} qp {}", profile, qp);
            }
            assert!(ProResDecoder::new().decode_frame(&frame).is_ok());
        }
    }

    #[test]
    fn test_noise_saturates_at_last_qp() {
        let picture = noisy_picture(64, 16, ChromaFormat::YUV422);
        let config = EncoderConfig::new(ProResProfile::Proxy).with_bitrate(1);
        let stats = ProResEncoder::with_config(config)
            .encode_frame(&picture, &mut Vec::new())
            .unwrap();
        assert!(stats.picture_qps[0].iter().all(|&qp| qp == 8));
    }

    #[test]
    fn test_lower_qp_gives_larger_frames() {
        let picture = noisy_picture(64, 16, ChromaFormat::YUV422);
        let size = |qp: u8| {
            let config = EncoderConfig::new(ProResProfile::HQ).with_qp_range(qp, qp);
            ProResEncoder::with_config(config)
                .encode_to_vec(&picture)
                .unwrap()
                .len()
        };
        assert!(size(2) > size(8));
    }
}

mod parallel {
    use super::*;

    #[test]
    fn test_parallel_decode_matches_sequential() {
        let picture = noisy_picture(96, 64, ChromaFormat::YUV422);
        let frame = ProResEncoder::new().encode_to_vec(&picture).unwrap();

        let sequential = ProResDecoder::new().decode_frame(&frame).unwrap();
        let config = DecoderConfig::default().with_multithreading(true).with_threads(3);
        let parallel = ProResDecoder::with_config(config).decode_frame(&frame).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parallel_encode_matches_at_fixed_qp() {
        let picture = noisy_picture(48, 48, ChromaFormat::YUV444);
        let config = EncoderConfig::new(ProResProfile::P4444).with_qp_range(3, 3);
        let sequential = ProResEncoder::with_config(config.clone())
            .encode_to_vec(&picture)
            .unwrap();
        let parallel = ProResEncoder::with_config(config.with_multithreading(true))
            .encode_to_vec(&picture)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parallel_interlaced_decode() {
        let mut picture =
            Picture::for_layout(32, 64, ChromaFormat::YUV422, InterlaceMode::InterlacedTFF);
        for (plane, data) in picture.planes.iter_mut().enumerate() {
            let len = data.len();
            data.copy_from_slice(&noise(len, 40 + plane as u32));
        }
        let mut encoder = ProResEncoder::with_config(
            EncoderConfig::default().with_interlace(InterlaceMode::InterlacedTFF),
        );
        let frame = encoder.encode_to_vec(&picture).unwrap();

        let sequential = ProResDecoder::new().decode_frame(&frame).unwrap();
        let parallel = ProResDecoder::with_config(DecoderConfig::default().with_multithreading(true))
            .decode_frame(&frame)
            .unwrap();
        assert_eq!(sequential, parallel);
    }
}
