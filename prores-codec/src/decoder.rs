//! Main ProRes decoder implementation

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{ProResError, Result};
use crate::frame::{slice_schedule, FrameHeader, PictureHeader, SliceInfo, FRAME_SIGNATURE};
use crate::mapper::PlaneRegion;
use crate::parallel::{build_pool, install};
use crate::picture::Picture;
use crate::reduce::{BlockReducer, BlockScale};
use crate::slice::{decode_slice, SliceParams, SliceScratch};

/// ProRes decoder configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// Decode macroblock rows in parallel
    pub multithreaded: bool,
    /// Number of threads (0 = rayon's global pool)
    pub num_threads: usize,
    /// Output resolution relative to the coded frame
    pub block_scale: BlockScale,
    /// Fail on corrupt slice data instead of concealing it
    pub strict: bool,
    /// Allocate low-bits planes in `decode_frame` output
    pub low_bits: bool,
}

impl DecoderConfig {
    /// Enable or disable row-parallel decoding
    pub fn with_multithreading(mut self, multithreaded: bool) -> Self {
        self.multithreaded = multithreaded;
        self
    }

    /// Use a dedicated pool of `num_threads` workers
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Decode at a reduced resolution
    pub fn with_block_scale(mut self, block_scale: BlockScale) -> Self {
        self.block_scale = block_scale;
        self
    }

    /// Report corrupt slices as errors
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Keep the two low-order bits of every sample
    pub fn with_low_bits(mut self, low_bits: bool) -> Self {
        self.low_bits = low_bits;
        self
    }
}

/// ProRes video decoder
///
/// Decodes 4:2:2 and 4:4:4 frames, progressive or interlaced, at full or
/// reduced resolution.
///
/// # Example
///
/// ```no_run
/// use prores_codec::ProResDecoder;
///
/// let mut decoder = ProResDecoder::new();
/// let frame_data = std::fs::read("frame.prores").unwrap();
/// let picture = decoder.decode_frame(&frame_data).unwrap();
/// let luma = picture.crop_plane(0);
/// ```
#[derive(Debug)]
pub struct ProResDecoder {
    /// Decoder configuration
    config: DecoderConfig,
    /// Dedicated worker pool, if requested
    pool: Option<ThreadPool>,
    /// Scratch space for sequential decoding
    scratch: SliceScratch,
    /// Frame counter
    frame_count: u64,
}

impl Default for ProResDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Plane memory of one macroblock row
struct RowStrip<'a> {
    planes: [&'a mut [u8]; 3],
    low_bits: Option<[&'a mut [u8]; 3]>,
}

impl RowStrip<'_> {
    fn regions(
        &mut self,
        strides: [usize; 3],
        first_line: usize,
        line_step: usize,
    ) -> [PlaneRegion<'_>; 3] {
        let [y, cb, cr] = &mut self.planes;
        let (y_low, cb_low, cr_low) = match &mut self.low_bits {
            Some([y_low, cb_low, cr_low]) => {
                (Some(&mut **y_low), Some(&mut **cb_low), Some(&mut **cr_low))
            }
            None => (None, None, None),
        };
        [
            PlaneRegion::new(y, y_low, strides[0], first_line, line_step),
            PlaneRegion::new(cb, cb_low, strides[1], first_line, line_step),
            PlaneRegion::new(cr, cr_low, strides[2], first_line, line_step),
        ]
    }
}

fn split_rows<'a>(
    planes: &'a mut [Vec<u8>; 3],
    strides: [usize; 3],
    strip_lines: usize,
) -> impl Iterator<Item = [&'a mut [u8]; 3]> {
    let [y, cb, cr] = planes;
    y.chunks_mut(strides[0] * strip_lines)
        .zip(cb.chunks_mut(strides[1] * strip_lines))
        .zip(cr.chunks_mut(strides[2] * strip_lines))
        .map(|((y, cb), cr)| [y, cb, cr])
}

impl ProResDecoder {
    /// Create a new ProRes decoder with default configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a new ProRes decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        let pool = if config.multithreaded {
            build_pool(config.num_threads, "prores-dec")
        } else {
            None
        };
        ProResDecoder {
            config,
            pool,
            scratch: SliceScratch::new(),
            frame_count: 0,
        }
    }

    /// Decode a frame into a newly allocated picture
    pub fn decode_frame(&mut self, data: &[u8]) -> Result<Picture> {
        let header = FrameHeader::parse(data)?;
        // The first slice table must fit the frame before planes are allocated
        picture_at(data, header.picture_offset(), 0, &header)?;
        let mut picture = self.allocate(&header)?;
        self.decode_pictures(data, &header, &mut picture)?;
        self.frame_count += 1;
        Ok(picture)
    }

    /// Decode a frame into caller-owned planes.
    ///
    /// The picture must have the frame's chroma format and its coded width at
    /// the configured scale; planes shorter than the coded height are rejected
    /// before anything is decoded.
    pub fn decode_into(&mut self, data: &[u8], picture: &mut Picture) -> Result<FrameHeader> {
        let header = FrameHeader::parse(data)?;
        self.check_destination(&header, picture)?;
        self.decode_pictures(data, &header, picture)?;
        self.frame_count += 1;
        Ok(header)
    }

    /// Decode only the frame header without full decode
    pub fn decode_header(&self, data: &[u8]) -> Result<FrameHeader> {
        FrameHeader::parse(data)
    }

    /// Get the number of frames decoded
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.scratch = SliceScratch::new();
        self.frame_count = 0;
    }

    /// Get decoder configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Coded dimensions of the output at the configured scale
    fn output_dimensions(&self, header: &FrameHeader) -> (u32, u32) {
        let shift = self.config.block_scale.log2_factor();
        let (coded_width, coded_height) = header.coded_dimensions();
        (coded_width >> shift, coded_height >> shift)
    }

    fn allocate(&self, header: &FrameHeader) -> Result<Picture> {
        let scale = self.config.block_scale;
        let (coded_width, coded_height) = self.output_dimensions(header);
        let picture = Picture::try_with_coded_size(
            scale.scale_dimension(header.width as u32),
            scale.scale_dimension(header.height as u32),
            coded_width,
            coded_height,
            header.chroma_format,
        )?;
        Ok(if self.config.low_bits {
            picture.with_low_bits()
        } else {
            picture
        })
    }

    fn check_destination(&self, header: &FrameHeader, picture: &Picture) -> Result<()> {
        let (coded_width, coded_height) = self.output_dimensions(header);
        if picture.chroma_format != header.chroma_format {
            return Err(ProResError::InvalidConfig(format!(
                "picture is {:?}, frame is {:?}",
                picture.chroma_format, header.chroma_format
            )));
        }
        if picture.coded_width != coded_width {
            return Err(ProResError::InvalidConfig(format!(
                "picture coded width {} does not match frame coded width {}",
                picture.coded_width, coded_width
            )));
        }
        if picture.coded_height < coded_height {
            let needed = picture.stride(0) * coded_height as usize;
            return Err(ProResError::BufferTooSmall {
                plane: 0,
                needed,
                available: picture.planes[0].len(),
            });
        }
        picture.validate()
    }

    /// Decode every picture (one, or two fields) of a frame
    fn decode_pictures(
        &mut self,
        data: &[u8],
        header: &FrameHeader,
        picture: &mut Picture,
    ) -> Result<()> {
        let interlace = header.interlace_mode;
        let mb_width = header.mb_width();
        let mb_height = header.picture_mb_height();
        let params = SliceParams {
            scan: header.scan(),
            luma_quant: &header.luma_quant_matrix,
            chroma_quant: &header.chroma_quant_matrix,
            chroma_format: header.chroma_format,
        };

        let mut offset = header.picture_offset();
        for index in 0..interlace.picture_count() {
            let (picture_header, picture_data) = picture_at(data, offset, index, header)?;
            let schedule =
                slice_schedule(mb_width, mb_height, picture_header.log2_slice_mb_width);

            let mut slice_offset = picture_header.slice_data_offset();
            let mut slices = Vec::with_capacity(schedule.len());
            for (slice, &size) in schedule.iter().zip(&picture_header.slice_sizes) {
                let end = slice_offset + size as usize;
                slices.push((*slice, &picture_data[slice_offset..end]));
                slice_offset = end;
            }

            tracing::debug!(
                picture = index,
                slices = slices.len(),
                log2_slice_mb_width = picture_header.log2_slice_mb_width,
                picture_size = picture_header.picture_size,
                "decoding picture"
            );

            let (first_line, line_step) = interlace.field_layout(index);
            self.decode_rows(
                &slices,
                slices.len() / mb_height as usize,
                &params,
                picture,
                first_line,
                line_step,
            )?;
            offset += picture_header.picture_size as usize;
        }
        Ok(())
    }

    fn decode_rows(
        &mut self,
        slices: &[(SliceInfo, &[u8])],
        slices_per_row: usize,
        params: &SliceParams<'_>,
        picture: &mut Picture,
        first_line: usize,
        line_step: usize,
    ) -> Result<()> {
        let reducer: &dyn BlockReducer = self.config.block_scale.reducer();
        let strict = self.config.strict;
        let strides = [picture.stride(0), picture.stride(1), picture.stride(2)];
        let strip_lines = 2 * reducer.block_size() * line_step;

        let Picture {
            planes, low_bits, ..
        } = picture;
        let mut low_rows = low_bits
            .as_mut()
            .map(|low| split_rows(low, strides, strip_lines));
        let mut strips: Vec<RowStrip<'_>> = split_rows(planes, strides, strip_lines)
            .map(|planes| RowStrip {
                planes,
                low_bits: low_rows.as_mut().and_then(|rows| rows.next()),
            })
            .collect();

        let decode_row =
            |scratch: &mut SliceScratch, strip: &mut RowStrip<'_>, row: &[(SliceInfo, &[u8])]| {
                let mut regions = strip.regions(strides, first_line, line_step);
                for (slice, bytes) in row {
                    decode_slice(bytes, slice, params, reducer, strict, scratch, &mut regions)?;
                }
                Ok::<(), ProResError>(())
            };

        if self.config.multithreaded {
            install(self.pool.as_ref(), || {
                strips
                    .par_iter_mut()
                    .zip(slices.par_chunks(slices_per_row))
                    .try_for_each_init(SliceScratch::new, |scratch, (strip, row)| {
                        decode_row(scratch, strip, row)
                    })
            })
        } else {
            for (strip, row) in strips.iter_mut().zip(slices.chunks(slices_per_row)) {
                decode_row(&mut self.scratch, strip, row)?;
            }
            Ok(())
        }
    }
}

/// Parse the picture header at `offset`, returning it with the picture's bytes.
fn picture_at<'a>(
    data: &'a [u8],
    offset: usize,
    index: usize,
    header: &FrameHeader,
) -> Result<(PictureHeader, &'a [u8])> {
    let picture_data = data.get(offset..).ok_or_else(|| {
        ProResError::MalformedHeader(format!(
            "picture {} starts at {} beyond frame of {} bytes",
            index,
            offset,
            data.len()
        ))
    })?;
    let picture_header =
        PictureHeader::parse(picture_data, header.mb_width(), header.picture_mb_height())?;
    Ok((picture_header, picture_data))
}

/// Probe data to check if it's a valid ProRes frame
pub fn probe_prores(data: &[u8]) -> bool {
    if data.len() < 8 {
        return false;
    }

    // Check for frame signature
    &data[4..8] == FRAME_SIGNATURE
}

/// Get frame dimensions without full decode
pub fn get_dimensions(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 20 || !probe_prores(data) {
        return None;
    }

    let width = u16::from_be_bytes([data[16], data[17]]);
    let height = u16::from_be_bytes([data[18], data[19]]);

    if width > 0 && height > 0 {
        Some((width, height))
    } else {
        None
    }
}
