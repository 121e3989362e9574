//! ProRes frame and picture header parsing and writing

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{ProResError, Result};
use crate::tables::{scan_for, to_raster_order, to_scan_order, FLAT_QUANT_MATRIX};
use crate::types::{
    ChromaFormat, ColorPrimaries, InterlaceMode, MatrixCoefficients, TransferCharacteristic,
};

/// ProRes frame signature
pub const FRAME_SIGNATURE: &[u8; 4] = b"icpf";

/// Bytes preceding the frame header: frame size and signature
pub const FRAME_PREFIX_SIZE: usize = 8;

/// Frame header size without quantization matrices
pub const MIN_FRAME_HEADER_SIZE: usize = 20;

/// Picture header size written by the encoder
pub const PICTURE_HEADER_SIZE: usize = 8;

/// Largest supported log2 of the slice width in macroblocks
pub const MAX_LOG2_SLICE_MB_WIDTH: u8 = 3;

/// Creator code written by the encoder
pub const DEFAULT_CREATOR: [u8; 4] = *b"apl0";

const LUMA_QUANT_FLAG: u8 = 0x02;
const CHROMA_QUANT_FLAG: u8 = 0x01;

/// Dimensions of the coded area for a frame.
///
/// Widths are padded to whole macroblocks. Interlaced heights are padded so
/// that each field holds whole macroblock rows.
pub fn coded_dimensions(width: u32, height: u32, interlace: InterlaceMode) -> (u32, u32) {
    let coded_width = (width + 15) & !15;
    let coded_height = if interlace.is_interlaced() {
        (height + 31) & !31
    } else {
        (height + 15) & !15
    };
    (coded_width, coded_height)
}

/// ProRes frame header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame size in bytes (including header)
    pub frame_size: u32,
    /// Header size in bytes, counted from the version field
    pub header_size: u16,
    /// Bitstream version
    pub version: u16,
    /// Creator code of the encoder
    pub creator: [u8; 4],
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
    /// Chroma format (4:2:2 or 4:4:4)
    pub chroma_format: ChromaFormat,
    /// Interlace mode
    pub interlace_mode: InterlaceMode,
    /// Color primaries
    pub color_primaries: ColorPrimaries,
    /// Transfer characteristic
    pub transfer_characteristic: TransferCharacteristic,
    /// Matrix coefficients
    pub matrix_coefficients: MatrixCoefficients,
    /// Alpha channel info (0 = no alpha)
    pub alpha_info: u8,
    /// Luma quantization matrix, indexed by scan position
    pub luma_quant_matrix: [u8; 64],
    /// Chroma quantization matrix, indexed by scan position
    pub chroma_quant_matrix: [u8; 64],
    /// Whether the luma matrix is carried in the header
    pub has_luma_quant: bool,
    /// Whether the chroma matrix is carried in the header
    pub has_chroma_quant: bool,
}

impl FrameHeader {
    /// Header for a new frame with both quantization matrices given in raster order.
    pub fn new(
        width: u16,
        height: u16,
        chroma_format: ChromaFormat,
        interlace_mode: InterlaceMode,
        luma_quant: &[u8; 64],
        chroma_quant: &[u8; 64],
    ) -> Self {
        let scan = scan_for(interlace_mode.is_interlaced());
        FrameHeader {
            frame_size: 0,
            header_size: (MIN_FRAME_HEADER_SIZE + 128) as u16,
            version: 0,
            creator: DEFAULT_CREATOR,
            width,
            height,
            chroma_format,
            interlace_mode,
            color_primaries: ColorPrimaries::Unknown,
            transfer_characteristic: TransferCharacteristic::Unknown,
            matrix_coefficients: MatrixCoefficients::Unknown,
            alpha_info: 0,
            luma_quant_matrix: to_scan_order(luma_quant, scan),
            chroma_quant_matrix: to_scan_order(chroma_quant, scan),
            has_luma_quant: true,
            has_chroma_quant: true,
        }
    }

    /// Parse a ProRes frame header from the start of a frame
    pub fn parse(data: &[u8]) -> Result<Self> {
        let needed = FRAME_PREFIX_SIZE + MIN_FRAME_HEADER_SIZE;
        if data.len() < needed {
            return Err(ProResError::InsufficientData {
                needed,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let frame_size = cursor.read_u32::<BigEndian>()?;

        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature)?;
        if &signature != FRAME_SIGNATURE {
            return Err(ProResError::InvalidSignature(signature));
        }

        let header_size = cursor.read_u16::<BigEndian>()?;
        if (header_size as usize) < MIN_FRAME_HEADER_SIZE {
            return Err(ProResError::MalformedHeader(format!(
                "frame header size {} too small",
                header_size
            )));
        }
        if FRAME_PREFIX_SIZE + header_size as usize > data.len() {
            return Err(ProResError::MalformedHeader(format!(
                "frame header size {} exceeds frame of {} bytes",
                header_size,
                data.len()
            )));
        }

        let version = cursor.read_u16::<BigEndian>()?;
        if version > 1 {
            return Err(ProResError::MalformedHeader(format!(
                "unsupported version {}",
                version
            )));
        }

        let mut creator = [0u8; 4];
        cursor.read_exact(&mut creator)?;

        let width = cursor.read_u16::<BigEndian>()?;
        let height = cursor.read_u16::<BigEndian>()?;
        if width == 0 || height == 0 {
            return Err(ProResError::MalformedHeader(format!(
                "invalid dimensions {}x{}",
                width, height
            )));
        }

        let flags = cursor.read_u8()?;
        let chroma_format = ChromaFormat::from_code(flags >> 6).ok_or_else(|| {
            ProResError::MalformedHeader(format!("invalid chroma format {}", flags >> 6))
        })?;
        let frame_type = (flags >> 2) & 3;
        let interlace_mode = InterlaceMode::from_code(frame_type).ok_or_else(|| {
            ProResError::MalformedHeader(format!("invalid frame type {}", frame_type))
        })?;

        let _reserved = cursor.read_u8()?;
        let color_primaries = ColorPrimaries::from_code(cursor.read_u8()?);
        let transfer_characteristic = TransferCharacteristic::from_code(cursor.read_u8()?);
        let matrix_coefficients = MatrixCoefficients::from_code(cursor.read_u8()?);
        let alpha_info = cursor.read_u8()? & 0x0F;
        let _reserved = cursor.read_u8()?;
        let quant_flags = cursor.read_u8()?;

        let has_luma_quant = quant_flags & LUMA_QUANT_FLAG != 0;
        let has_chroma_quant = quant_flags & CHROMA_QUANT_FLAG != 0;
        let matrices = has_luma_quant as usize + has_chroma_quant as usize;
        if (header_size as usize) < MIN_FRAME_HEADER_SIZE + 64 * matrices {
            return Err(ProResError::MalformedHeader(format!(
                "frame header size {} cannot hold {} matrices",
                header_size, matrices
            )));
        }

        let scan = scan_for(interlace_mode.is_interlaced());
        let mut read_matrix = |present: bool| -> Result<[u8; 64]> {
            if !present {
                return Ok(FLAT_QUANT_MATRIX);
            }
            let mut raster = [0u8; 64];
            cursor.read_exact(&mut raster)?;
            Ok(to_scan_order(&raster, scan))
        };
        let luma_quant_matrix = read_matrix(has_luma_quant)?;
        let chroma_quant_matrix = read_matrix(has_chroma_quant)?;

        tracing::debug!(
            width,
            height,
            ?chroma_format,
            ?interlace_mode,
            header_size,
            "parsed frame header"
        );

        Ok(FrameHeader {
            frame_size,
            header_size,
            version,
            creator,
            width,
            height,
            chroma_format,
            interlace_mode,
            color_primaries,
            transfer_characteristic,
            matrix_coefficients,
            alpha_info,
            luma_quant_matrix,
            chroma_quant_matrix,
            has_luma_quant,
            has_chroma_quant,
        })
    }

    /// Append the frame prefix and header to `out`.
    ///
    /// `frame_size` is written as stored; encoders patch it once the frame is complete.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let matrices = self.has_luma_quant as usize + self.has_chroma_quant as usize;
        let header_size = (MIN_FRAME_HEADER_SIZE + 64 * matrices) as u16;

        out.write_u32::<BigEndian>(self.frame_size)?;
        out.extend_from_slice(FRAME_SIGNATURE);
        out.write_u16::<BigEndian>(header_size)?;
        out.write_u16::<BigEndian>(self.version)?;
        out.extend_from_slice(&self.creator);
        out.write_u16::<BigEndian>(self.width)?;
        out.write_u16::<BigEndian>(self.height)?;
        out.write_u8((self.chroma_format.code() << 6) | (self.interlace_mode.code() << 2))?;
        out.write_u8(0)?;
        out.write_u8(self.color_primaries.code())?;
        out.write_u8(self.transfer_characteristic.code())?;
        out.write_u8(self.matrix_coefficients.code())?;
        out.write_u8(self.alpha_info & 0x0F)?;
        out.write_u8(0)?;

        let mut quant_flags = 0u8;
        if self.has_luma_quant {
            quant_flags |= LUMA_QUANT_FLAG;
        }
        if self.has_chroma_quant {
            quant_flags |= CHROMA_QUANT_FLAG;
        }
        out.write_u8(quant_flags)?;

        let scan = self.scan();
        if self.has_luma_quant {
            out.extend_from_slice(&to_raster_order(&self.luma_quant_matrix, scan));
        }
        if self.has_chroma_quant {
            out.extend_from_slice(&to_raster_order(&self.chroma_quant_matrix, scan));
        }
        Ok(())
    }

    /// Offset of the first picture header from the start of the frame
    pub fn picture_offset(&self) -> usize {
        FRAME_PREFIX_SIZE + self.header_size as usize
    }

    /// Coefficient scan order of the frame
    pub fn scan(&self) -> &'static [u8; 64] {
        scan_for(self.interlace_mode.is_interlaced())
    }

    /// Coded frame dimensions
    pub fn coded_dimensions(&self) -> (u32, u32) {
        coded_dimensions(self.width as u32, self.height as u32, self.interlace_mode)
    }

    /// Macroblocks per row
    pub fn mb_width(&self) -> u32 {
        self.coded_dimensions().0 / 16
    }

    /// Macroblock rows per picture (per field when interlaced)
    pub fn picture_mb_height(&self) -> u32 {
        self.coded_dimensions().1 / 16 / self.interlace_mode.picture_count() as u32
    }

    /// Check if this frame carries an alpha channel
    pub fn has_alpha(&self) -> bool {
        self.alpha_info != 0
    }
}

/// Position and width of one slice within a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceInfo {
    /// First macroblock column
    pub mb_x: u32,
    /// Macroblock row
    pub mb_y: u32,
    /// Width in macroblocks (a power of two)
    pub mb_count: u32,
}

/// Number of slices in a picture
pub fn slice_count(mb_width: u32, mb_height: u32, log2_slice_mb_width: u8) -> usize {
    let mask = (1u32 << log2_slice_mb_width) - 1;
    let per_row = (mb_width >> log2_slice_mb_width) + (mb_width & mask).count_ones();
    (mb_height * per_row) as usize
}

/// Lay slices out over a picture.
///
/// Each row starts with slices of `1 << log2_slice_mb_width` macroblocks and
/// halves the width whenever the rest of the row is narrower.
pub fn slice_schedule(mb_width: u32, mb_height: u32, log2_slice_mb_width: u8) -> Vec<SliceInfo> {
    let mut slices = Vec::with_capacity(slice_count(mb_width, mb_height, log2_slice_mb_width));
    for mb_y in 0..mb_height {
        let mut mb_x = 0;
        let mut mb_count = 1u32 << log2_slice_mb_width;
        while mb_x < mb_width {
            while mb_width - mb_x < mb_count {
                mb_count >>= 1;
            }
            slices.push(SliceInfo {
                mb_x,
                mb_y,
                mb_count,
            });
            mb_x += mb_count;
        }
    }
    slices
}

/// ProRes picture header and slice index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureHeader {
    /// Header size in bytes
    pub header_size: usize,
    /// Size of the whole picture in bytes, header included
    pub picture_size: u32,
    /// log2 of the nominal slice width in macroblocks
    pub log2_slice_mb_width: u8,
    /// Coded size of each slice in bytes
    pub slice_sizes: Vec<u16>,
}

impl PictureHeader {
    /// Parse a picture header and validate its slice index against the picture.
    pub fn parse(data: &[u8], mb_width: u32, mb_height: u32) -> Result<Self> {
        if data.len() < PICTURE_HEADER_SIZE {
            return Err(ProResError::MalformedHeader(format!(
                "picture header truncated at {} bytes",
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let header_size = (cursor.read_u8()? >> 3) as usize;
        if header_size < PICTURE_HEADER_SIZE {
            return Err(ProResError::MalformedHeader(format!(
                "picture header size {} too small",
                header_size
            )));
        }
        let picture_size = cursor.read_u32::<BigEndian>()?;
        if picture_size as usize > data.len() {
            return Err(ProResError::MalformedHeader(format!(
                "picture size {} exceeds {} available bytes",
                picture_size,
                data.len()
            )));
        }
        let count = cursor.read_u16::<BigEndian>()? as usize;
        let log2_bits = cursor.read_u8()?;
        let log2_slice_mb_width = log2_bits >> 4;
        if log2_bits & 0x0F != 0 || log2_slice_mb_width > MAX_LOG2_SLICE_MB_WIDTH {
            return Err(ProResError::MalformedHeader(format!(
                "unsupported slice dimensions 0x{:02x}",
                log2_bits
            )));
        }

        let expected = slice_count(mb_width, mb_height, log2_slice_mb_width);
        if count != expected {
            return Err(ProResError::MalformedHeader(format!(
                "{} slices do not tile {}x{} macroblocks (expected {})",
                count, mb_width, mb_height, expected
            )));
        }

        let index_end = header_size + 2 * count;
        if index_end > picture_size as usize {
            return Err(ProResError::MalformedHeader(
                "slice index exceeds picture".into(),
            ));
        }
        cursor.set_position(header_size as u64);
        let mut slice_sizes = Vec::with_capacity(count);
        for _ in 0..count {
            slice_sizes.push(cursor.read_u16::<BigEndian>()?);
        }

        let payload: usize = slice_sizes.iter().map(|&s| s as usize).sum();
        if index_end + payload > picture_size as usize {
            return Err(ProResError::MalformedHeader(format!(
                "slice data of {} bytes exceeds picture of {} bytes",
                payload, picture_size
            )));
        }

        Ok(PictureHeader {
            header_size,
            picture_size,
            log2_slice_mb_width,
            slice_sizes,
        })
    }

    /// Append the picture header and slice index to `out`
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u8((PICTURE_HEADER_SIZE as u8) << 3)?;
        out.write_u32::<BigEndian>(self.picture_size)?;
        out.write_u16::<BigEndian>(self.slice_sizes.len() as u16)?;
        out.write_u8(self.log2_slice_mb_width << 4)?;
        for &size in &self.slice_sizes {
            out.write_u16::<BigEndian>(size)?;
        }
        Ok(())
    }

    /// Offset of the first slice from the start of the picture
    pub fn slice_data_offset(&self) -> usize {
        self.header_size + 2 * self.slice_sizes.len()
    }
}
