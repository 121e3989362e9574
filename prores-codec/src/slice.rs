//! ProRes slice header and slice payload coding

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::bitstream::{BitReader, BitWriter};
use crate::coeffs::{read_ac, read_dc, write_ac, write_dc, CoderContext};
use crate::dct::forward_dct;
use crate::error::{ProResError, Result};
use crate::frame::SliceInfo;
use crate::mapper::{block_positions, blocks_per_mb, mb_width_in_blocks, PlaneRegion, PlaneView};
use crate::quant::{
    decode_qscale, encode_qscale, quantize_blocks, scale_matrix, DECODER_DC_OFFSET,
};
use crate::ratecontrol::SliceRateController;
use crate::reduce::BlockReducer;
use crate::types::ChromaFormat;

/// Slice header size written by the encoder (no explicit Cr size)
pub const SLICE_HEADER_SIZE: usize = 6;

/// Widest slice in macroblocks
pub const MAX_SLICE_MB_WIDTH: usize = 8;

const MAX_BLOCKS_PER_PLANE: usize = MAX_SLICE_MB_WIDTH * 4;

/// Mid-grey 10-bit sample used for concealment
const CONCEAL_SAMPLE: i32 = 512;

/// Slice header information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHeader {
    /// Slice header size in bytes
    pub header_size: u8,
    /// Quantizer byte as stored
    pub qscale_raw: u8,
    /// Y data size in bytes
    pub y_data_size: u16,
    /// Cb data size in bytes
    pub cb_data_size: u16,
    /// Cr data size in bytes (explicit or derived from the slice size)
    pub cr_data_size: u16,
}

impl SliceHeader {
    /// Parse the header of a slice occupying all of `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < SLICE_HEADER_SIZE {
            return Err(ProResError::MalformedHeader(format!(
                "slice of {} bytes has no header",
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let header_size = cursor.read_u8()? >> 3;
        if (header_size as usize) < SLICE_HEADER_SIZE || header_size as usize > data.len() {
            return Err(ProResError::MalformedHeader(format!(
                "slice header size {} invalid for {} bytes",
                header_size,
                data.len()
            )));
        }
        let qscale_raw = cursor.read_u8()?;
        let y_data_size = cursor.read_u16::<BigEndian>()?;
        let cb_data_size = cursor.read_u16::<BigEndian>()?;

        let used = header_size as usize + y_data_size as usize + cb_data_size as usize;
        if used > data.len() {
            return Err(ProResError::MalformedHeader(format!(
                "plane sizes {} + {} exceed slice of {} bytes",
                y_data_size,
                cb_data_size,
                data.len()
            )));
        }

        let cr_data_size = if header_size >= 8 {
            let size = cursor.read_u16::<BigEndian>()?;
            if used + size as usize > data.len() {
                return Err(ProResError::MalformedHeader(format!(
                    "Cr size {} exceeds slice",
                    size
                )));
            }
            size
        } else {
            u16::try_from(data.len() - used).map_err(|_| ProResError::SliceOverflow {
                size: data.len(),
            })?
        };

        Ok(SliceHeader {
            header_size,
            qscale_raw,
            y_data_size,
            cb_data_size,
            cr_data_size,
        })
    }

    /// Append the header to `out`; the Cr size is written only for 8-byte headers.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u8(self.header_size << 3)?;
        out.write_u8(self.qscale_raw)?;
        out.write_u16::<BigEndian>(self.y_data_size)?;
        out.write_u16::<BigEndian>(self.cb_data_size)?;
        if self.header_size >= 8 {
            out.write_u16::<BigEndian>(self.cr_data_size)?;
            for _ in 8..self.header_size {
                out.write_u8(0)?;
            }
        }
        Ok(())
    }

    /// Quantizer of the slice
    pub fn qscale(&self) -> u32 {
        decode_qscale(self.qscale_raw)
    }

    /// Coded size of a plane
    pub fn plane_size(&self, plane: usize) -> usize {
        match plane {
            0 => self.y_data_size as usize,
            1 => self.cb_data_size as usize,
            _ => self.cr_data_size as usize,
        }
    }
}

/// Frame-wide inputs of slice coding
#[derive(Debug, Clone, Copy)]
pub(crate) struct SliceParams<'a> {
    pub scan: &'a [u8; 64],
    /// Luma matrix, indexed by scan position
    pub luma_quant: &'a [u8; 64],
    /// Chroma matrix, indexed by scan position
    pub chroma_quant: &'a [u8; 64],
    pub chroma_format: ChromaFormat,
}

/// Working memory for coding one slice at a time.
///
/// Each worker thread owns one; nothing in it outlives a slice.
#[derive(Debug, Clone)]
pub struct SliceScratch {
    coeffs: [Vec<i32>; 3],
    levels: Vec<i32>,
    samples: Vec<i32>,
    writers: [BitWriter; 3],
}

impl SliceScratch {
    /// Allocate scratch space for the widest slice
    pub fn new() -> Self {
        let coeffs = || vec![0i32; MAX_BLOCKS_PER_PLANE * 64];
        SliceScratch {
            coeffs: [coeffs(), coeffs(), coeffs()],
            levels: vec![0i32; MAX_BLOCKS_PER_PLANE * 64],
            samples: vec![0i32; 64],
            writers: [
                BitWriter::with_capacity(1024),
                BitWriter::with_capacity(512),
                BitWriter::with_capacity(512),
            ],
        }
    }
}

impl Default for SliceScratch {
    fn default() -> Self {
        Self::new()
    }
}

fn block_origin(
    slice: &SliceInfo,
    plane: usize,
    chroma_format: ChromaFormat,
    block: usize,
    size: usize,
) -> (usize, usize) {
    let positions = block_positions(plane, chroma_format);
    let mb = block / positions.len();
    let (bx, by) = positions[block % positions.len()];
    let mb_width = mb_width_in_blocks(plane, chroma_format);
    let x = ((slice.mb_x as usize + mb) * mb_width + bx) * size;
    (x, by * size)
}

fn blocks_in_slice(slice: &SliceInfo, plane: usize, chroma_format: ChromaFormat) -> usize {
    slice.mb_count as usize * blocks_per_mb(plane, chroma_format)
}

fn corrupt(slice: &SliceInfo, plane: usize, err: &ProResError) -> ProResError {
    ProResError::CorruptSliceData {
        mb_x: slice.mb_x,
        mb_y: slice.mb_y,
        plane,
        reason: err.to_string(),
    }
}

/// Fill a slice with mid-grey.
fn conceal_slice(
    slice: &SliceInfo,
    params: &SliceParams<'_>,
    reducer: &dyn BlockReducer,
    scratch: &mut SliceScratch,
    planes: &mut [PlaneRegion<'_>; 3],
) {
    let size = reducer.block_size();
    let samples = &mut scratch.samples[..size * size];
    samples.fill(CONCEAL_SAMPLE);
    for (plane, region) in planes.iter_mut().enumerate() {
        for block in 0..blocks_in_slice(slice, plane, params.chroma_format) {
            let (x, y) = block_origin(slice, plane, params.chroma_format, block, size);
            reducer.place_samples(region, x, y, samples);
        }
    }
}

/// Decode one slice into the macroblock row strip held by `planes`.
///
/// Corrupt payloads are concealed: the affected plane keeps the coefficients
/// decoded before the error and the rest stay at level zero. With `strict`
/// the error is returned instead.
pub(crate) fn decode_slice(
    data: &[u8],
    slice: &SliceInfo,
    params: &SliceParams<'_>,
    reducer: &dyn BlockReducer,
    strict: bool,
    scratch: &mut SliceScratch,
    planes: &mut [PlaneRegion<'_>; 3],
) -> Result<()> {
    let header = match SliceHeader::parse(data) {
        Ok(header) => header,
        Err(err) => {
            let err = corrupt(slice, 0, &err);
            if strict {
                return Err(err);
            }
            tracing::warn!(mb_x = slice.mb_x, mb_y = slice.mb_y, error = %err, "concealing slice");
            conceal_slice(slice, params, reducer, scratch, planes);
            return Ok(());
        }
    };

    let qscale = header.qscale();
    let luma_quant = scale_matrix(params.luma_quant, qscale);
    let chroma_quant = scale_matrix(params.chroma_quant, qscale);
    let size = reducer.block_size();
    let SliceScratch {
        coeffs, samples, ..
    } = scratch;
    let coeffs = &mut coeffs[0];
    let samples = &mut samples[..size * size];

    let mut offset = header.header_size as usize;
    for (plane, region) in planes.iter_mut().enumerate() {
        let plane_data = &data[offset..offset + header.plane_size(plane)];
        offset += header.plane_size(plane);

        let block_count = blocks_in_slice(slice, plane, params.chroma_format);
        let blocks = &mut coeffs[..block_count * 64];
        blocks.fill(0);
        for block in blocks.chunks_exact_mut(64) {
            block[0] = DECODER_DC_OFFSET;
        }

        let quant = if plane == 0 { &luma_quant } else { &chroma_quant };
        let mut ctx = CoderContext::new();
        let mut reader = BitReader::new(plane_data);
        let decoded = read_dc(&mut reader, &mut ctx, blocks, block_count, quant).and_then(|()| {
            read_ac(
                &mut reader,
                &mut ctx,
                blocks,
                block_count,
                quant,
                params.scan,
                reducer.max_coeffs_per_block(),
            )
        });
        if let Err(err) = decoded {
            let err = corrupt(slice, plane, &err);
            if strict {
                return Err(err);
            }
            tracing::warn!(
                mb_x = slice.mb_x,
                mb_y = slice.mb_y,
                plane,
                error = %err,
                "concealing corrupt slice data"
            );
        }

        for (index, block) in blocks.chunks_exact(64).enumerate() {
            let (x, y) = block_origin(slice, plane, params.chroma_format, index, size);
            reducer.inverse_transform(block, samples);
            reducer.place_samples(region, x, y, samples);
        }
    }
    Ok(())
}

/// Encode one slice and append it to `out`. Returns the chosen quantizer.
///
/// `planes` cover the whole picture (or field).
pub(crate) fn encode_slice(
    planes: &[PlaneView<'_>; 3],
    slice: &SliceInfo,
    params: &SliceParams<'_>,
    controller: &SliceRateController,
    previous_qp: u8,
    scratch: &mut SliceScratch,
    out: &mut Vec<u8>,
) -> Result<u8> {
    let SliceScratch {
        coeffs,
        levels,
        samples,
        writers,
    } = scratch;

    let mut block_counts = [0usize; 3];
    for (plane, view) in planes.iter().enumerate() {
        let block_count = blocks_in_slice(slice, plane, params.chroma_format);
        block_counts[plane] = block_count;
        for (index, block) in coeffs[plane][..block_count * 64]
            .chunks_exact_mut(64)
            .enumerate()
        {
            let (x, y) = block_origin(slice, plane, params.chroma_format, index, 8);
            view.get_block(x, y + slice.mb_y as usize * 16, samples);
            forward_dct(samples, block);
        }
    }

    let decision = controller.search(previous_qp, slice.mb_count, |qp| {
        let qscale = decode_qscale(encode_qscale(qp as u32));
        let luma_quant = scale_matrix(params.luma_quant, qscale);
        let chroma_quant = scale_matrix(params.chroma_quant, qscale);
        let mut bits = 0;
        for plane in 0..3 {
            let block_count = block_counts[plane];
            let quant = if plane == 0 { &luma_quant } else { &chroma_quant };
            let levels = &mut levels[..block_count * 64];
            quantize_blocks(&coeffs[plane][..block_count * 64], levels, quant, params.scan);

            let writer = &mut writers[plane];
            writer.clear();
            let mut ctx = CoderContext::new();
            write_dc(writer, &mut ctx, levels, block_count);
            write_ac(writer, &mut ctx, levels, block_count, params.scan);
            writer.flush();
            bits += writer.bit_len();
        }
        Ok(bits)
    })?;

    let plane_size = |plane: usize| -> Result<u16> {
        let size = writers[plane].as_bytes().len();
        u16::try_from(size).map_err(|_| ProResError::SliceOverflow { size })
    };
    let header = SliceHeader {
        header_size: SLICE_HEADER_SIZE as u8,
        qscale_raw: encode_qscale(decision.qp as u32),
        y_data_size: plane_size(0)?,
        cb_data_size: plane_size(1)?,
        cr_data_size: plane_size(2)?,
    };
    header.write(out)?;
    for writer in writers.iter() {
        out.extend_from_slice(writer.as_bytes());
    }
    Ok(decision.qp)
}
