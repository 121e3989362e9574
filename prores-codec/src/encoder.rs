//! ProRes encoder implementation
//!
//! Each picture is cut into slices, and every slice is encoded at the
//! quantizer chosen by the slice rate controller. Slices are buffered until
//! the whole picture is coded so the slice index can precede them.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{ProResError, Result};
use crate::frame::{
    coded_dimensions, slice_schedule, FrameHeader, PictureHeader, SliceInfo,
    MAX_LOG2_SLICE_MB_WIDTH, PICTURE_HEADER_SIZE,
};
use crate::mapper::PlaneView;
use crate::parallel::{build_pool, install};
use crate::picture::Picture;
use crate::ratecontrol::{RateProfile, SliceRateController};
use crate::slice::{encode_slice, SliceParams, SliceScratch};
use crate::types::{
    ColorPrimaries, InterlaceMode, MatrixCoefficients, ProResProfile, TransferCharacteristic,
};

/// ProRes encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncoderConfig {
    /// Target profile
    pub profile: ProResProfile,
    /// Quantizer range overriding the profile's
    pub qp_range: Option<(u8, u8)>,
    /// Bits per four macroblocks overriding the profile's
    pub bitrate: Option<u32>,
    /// Interlace mode
    pub interlace_mode: InterlaceMode,
    /// Color primaries
    pub color_primaries: ColorPrimaries,
    /// Transfer characteristic
    pub transfer_characteristic: TransferCharacteristic,
    /// Matrix coefficients
    pub matrix_coefficients: MatrixCoefficients,
    /// log2 of the slice width in macroblocks (0..=3)
    pub log2_slice_mb_width: u8,
    /// Encode macroblock rows in parallel
    pub multithreaded: bool,
    /// Number of threads (0 = rayon's global pool)
    pub num_threads: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            profile: ProResProfile::HQ,
            qp_range: None,
            bitrate: None,
            interlace_mode: InterlaceMode::Progressive,
            color_primaries: ColorPrimaries::BT709,
            transfer_characteristic: TransferCharacteristic::BT709,
            matrix_coefficients: MatrixCoefficients::BT709,
            log2_slice_mb_width: MAX_LOG2_SLICE_MB_WIDTH,
            multithreaded: false,
            num_threads: 0,
        }
    }
}

impl EncoderConfig {
    /// Create a new encoder configuration with specified profile
    pub fn new(profile: ProResProfile) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }

    /// Restrict the quantizer search to `first..=last`
    pub fn with_qp_range(mut self, first: u8, last: u8) -> Self {
        self.qp_range = Some((first, last));
        self
    }

    /// Override the profile's bit budget
    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Set interlace mode
    pub fn with_interlace(mut self, interlace_mode: InterlaceMode) -> Self {
        self.interlace_mode = interlace_mode;
        self
    }

    /// Set color description
    pub fn with_color(
        mut self,
        primaries: ColorPrimaries,
        transfer: TransferCharacteristic,
        matrix: MatrixCoefficients,
    ) -> Self {
        self.color_primaries = primaries;
        self.transfer_characteristic = transfer;
        self.matrix_coefficients = matrix;
        self
    }

    /// Set the slice width as log2 of macroblocks
    pub fn with_slice_width(mut self, log2_slice_mb_width: u8) -> Self {
        self.log2_slice_mb_width = log2_slice_mb_width;
        self
    }

    /// Enable or disable row-parallel encoding
    pub fn with_multithreading(mut self, multithreaded: bool) -> Self {
        self.multithreaded = multithreaded;
        self
    }

    /// Use a dedicated pool of `num_threads` workers
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Matrices, budget and quantizer range after overrides
    pub fn rate_profile(&self) -> RateProfile {
        let mut rate = self.profile.rate_profile();
        if let Some((first, last)) = self.qp_range {
            rate.first_qp = first;
            rate.last_qp = last;
        }
        if let Some(bitrate) = self.bitrate {
            rate.bitrate = bitrate;
        }
        rate
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some((first, last)) = self.qp_range {
            if first == 0 || first > last {
                return Err(ProResError::InvalidConfig(format!(
                    "invalid quantizer range {}..={}",
                    first, last
                )));
            }
        }
        if self.bitrate == Some(0) {
            return Err(ProResError::InvalidConfig("bitrate must be positive".into()));
        }
        if self.log2_slice_mb_width > MAX_LOG2_SLICE_MB_WIDTH {
            return Err(ProResError::InvalidConfig(format!(
                "slice width 2^{} exceeds {} macroblocks",
                self.log2_slice_mb_width,
                1 << MAX_LOG2_SLICE_MB_WIDTH
            )));
        }
        Ok(())
    }
}

/// Summary of one encoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeStats {
    /// Bytes appended to the output
    pub bytes_written: usize,
    /// Quantizer of every slice, per picture in coding order
    pub picture_qps: Vec<Vec<u8>>,
}

/// Coded slices of one macroblock row
#[derive(Debug, Default)]
struct RowOutput {
    data: Vec<u8>,
    slice_sizes: Vec<u16>,
    qps: Vec<u8>,
}

/// Encode a row of slices, carrying the quantizer from slice to slice.
fn encode_row(
    planes: &[PlaneView<'_>; 3],
    row: &[SliceInfo],
    params: &SliceParams<'_>,
    controller: &SliceRateController,
    mut qp: u8,
    scratch: &mut SliceScratch,
) -> Result<RowOutput> {
    let mut output = RowOutput::default();
    for slice in row {
        let start = output.data.len();
        qp = encode_slice(planes, slice, params, controller, qp, scratch, &mut output.data)?;
        let size = output.data.len() - start;
        output
            .slice_sizes
            .push(u16::try_from(size).map_err(|_| ProResError::SliceOverflow { size })?);
        output.qps.push(qp);
    }
    Ok(output)
}

/// ProRes video encoder
///
/// # Example
///
/// ```no_run
/// use prores_codec::{ChromaFormat, EncoderConfig, Picture, ProResEncoder, ProResProfile};
///
/// let picture = Picture::new(1920, 1080, ChromaFormat::YUV422);
/// let mut encoder = ProResEncoder::with_config(EncoderConfig::new(ProResProfile::HQ));
/// let frame = encoder.encode_to_vec(&picture).unwrap();
/// ```
#[derive(Debug)]
pub struct ProResEncoder {
    config: EncoderConfig,
    /// Dedicated worker pool, if requested
    pool: Option<ThreadPool>,
    /// Scratch space for sequential encoding
    scratch: SliceScratch,
    /// Frame counter
    frame_count: u64,
}

impl Default for ProResEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProResEncoder {
    /// Create a new ProRes encoder with default configuration (HQ profile)
    pub fn new() -> Self {
        Self::with_config(EncoderConfig::default())
    }

    /// Create a new ProRes encoder with specified configuration
    pub fn with_config(config: EncoderConfig) -> Self {
        let pool = if config.multithreaded {
            build_pool(config.num_threads, "prores-enc")
        } else {
            None
        };
        ProResEncoder {
            config,
            pool,
            scratch: SliceScratch::new(),
            frame_count: 0,
        }
    }

    /// Get the encoder configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Get the number of frames encoded
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Encode a frame into a new buffer
    pub fn encode_to_vec(&mut self, picture: &Picture) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_frame(picture, &mut out)?;
        Ok(out)
    }

    /// Encode a frame and append it to `out`.
    pub fn encode_frame(&mut self, picture: &Picture, out: &mut Vec<u8>) -> Result<EncodeStats> {
        self.config.validate()?;
        self.validate_picture(picture)?;

        let rate = self.config.rate_profile();
        let interlace = self.config.interlace_mode;
        let mut header = FrameHeader::new(
            picture.width as u16,
            picture.height as u16,
            picture.chroma_format,
            interlace,
            &rate.luma_quant,
            &rate.chroma_quant,
        );
        header.color_primaries = self.config.color_primaries;
        header.transfer_characteristic = self.config.transfer_characteristic;
        header.matrix_coefficients = self.config.matrix_coefficients;

        let start = out.len();
        header.write(out)?;

        let controller = SliceRateController::new(&rate);
        let params = SliceParams {
            scan: header.scan(),
            luma_quant: &header.luma_quant_matrix,
            chroma_quant: &header.chroma_quant_matrix,
            chroma_format: header.chroma_format,
        };
        let mb_width = header.mb_width();
        let mb_height = header.picture_mb_height();
        let schedule = slice_schedule(mb_width, mb_height, self.config.log2_slice_mb_width);
        let slices_per_row = schedule.len() / mb_height as usize;

        let mut picture_qps = Vec::with_capacity(interlace.picture_count());
        for index in 0..interlace.picture_count() {
            let (first_line, line_step) = interlace.field_layout(index);
            let planes = Self::plane_views(picture, first_line, line_step);
            let rows = self.encode_rows(&planes, &schedule, slices_per_row, &params, &controller)?;

            let slice_sizes: Vec<u16> = rows
                .iter()
                .flat_map(|row| row.slice_sizes.iter().copied())
                .collect();
            let payload: usize = rows.iter().map(|row| row.data.len()).sum();
            let picture_size = PICTURE_HEADER_SIZE + 2 * slice_sizes.len() + payload;
            let picture_header = PictureHeader {
                header_size: PICTURE_HEADER_SIZE,
                picture_size: u32::try_from(picture_size).map_err(|_| {
                    ProResError::InvalidConfig(format!("picture of {} bytes", picture_size))
                })?,
                log2_slice_mb_width: self.config.log2_slice_mb_width,
                slice_sizes,
            };
            picture_header.write(out)?;

            let mut qps = Vec::with_capacity(schedule.len());
            for row in rows {
                out.extend_from_slice(&row.data);
                qps.extend(row.qps);
            }
            tracing::debug!(
                picture = index,
                slices = qps.len(),
                picture_size,
                "encoded picture"
            );
            picture_qps.push(qps);
        }

        let frame_size = out.len() - start;
        let frame_size_field = u32::try_from(frame_size)
            .map_err(|_| ProResError::InvalidConfig(format!("frame of {} bytes", frame_size)))?;
        out[start..start + 4].copy_from_slice(&frame_size_field.to_be_bytes());

        self.frame_count += 1;

        Ok(EncodeStats {
            bytes_written: frame_size,
            picture_qps,
        })
    }

    /// Check that the picture has the layout the configuration encodes
    fn validate_picture(&self, picture: &Picture) -> Result<()> {
        if picture.width == 0 || picture.height == 0 {
            return Err(ProResError::InvalidConfig("Zero frame dimensions".into()));
        }

        if picture.width > u16::MAX as u32 || picture.height > u16::MAX as u32 {
            return Err(ProResError::InvalidConfig(format!(
                "Frame dimensions too large: {}x{}",
                picture.width, picture.height
            )));
        }

        let chroma_format = self.config.profile.chroma_format();
        if picture.chroma_format != chroma_format {
            return Err(ProResError::InvalidConfig(format!(
                "{:?} profile encodes {:?}, picture is {:?}",
                self.config.profile, chroma_format, picture.chroma_format
            )));
        }

        let (coded_width, coded_height) =
            coded_dimensions(picture.width, picture.height, self.config.interlace_mode);
        if picture.coded_width != coded_width || picture.coded_height < coded_height {
            return Err(ProResError::InvalidConfig(format!(
                "picture coded as {}x{}, frame needs {}x{}",
                picture.coded_width, picture.coded_height, coded_width, coded_height
            )));
        }

        picture.validate()
    }

    fn plane_views(picture: &Picture, first_line: usize, line_step: usize) -> [PlaneView<'_>; 3] {
        let view = |plane: usize| {
            PlaneView::new(
                &picture.planes[plane],
                picture.low_bits.as_ref().map(|low| &low[plane][..]),
                picture.stride(plane),
                first_line,
                line_step,
            )
        };
        [view(0), view(1), view(2)]
    }

    /// Encode every macroblock row of one picture
    fn encode_rows(
        &mut self,
        planes: &[PlaneView<'_>; 3],
        schedule: &[SliceInfo],
        slices_per_row: usize,
        params: &SliceParams<'_>,
        controller: &SliceRateController,
    ) -> Result<Vec<RowOutput>> {
        if self.config.multithreaded {
            install(self.pool.as_ref(), || {
                schedule
                    .par_chunks(slices_per_row)
                    .map_init(SliceScratch::new, |scratch, row| {
                        encode_row(planes, row, params, controller, controller.initial_qp(), scratch)
                    })
                    .collect()
            })
        } else {
            let mut qp = controller.initial_qp();
            let mut rows = Vec::with_capacity(schedule.len() / slices_per_row);
            for row in schedule.chunks(slices_per_row) {
                let output = encode_row(planes, row, params, controller, qp, &mut self.scratch)?;
                qp = output.qps.last().copied().unwrap_or(qp);
                rows.push(output);
            }
            Ok(rows)
        }
    }
}
