//! Planar picture buffers exchanged with the codec

use crate::error::{ProResError, Result};
use crate::frame::coded_dimensions;
use crate::types::{ChromaFormat, InterlaceMode};

/// Byte sizes of the luma and chroma planes of a coded area.
pub(crate) fn plane_sizes(
    coded_width: u32,
    coded_height: u32,
    chroma_format: ChromaFormat,
) -> Option<(usize, usize)> {
    let rows = usize::try_from(coded_height).ok()?;
    let luma = usize::try_from(coded_width).ok()?.checked_mul(rows)?;
    let chroma_width = usize::try_from(coded_width >> chroma_format.chroma_h_shift()).ok()?;
    Some((luma, chroma_width.checked_mul(rows)?))
}

/// Y, Cb and Cr planes of 8-bit samples sized to the coded area.
///
/// The optional low-bits planes hold the two least significant bits of each
/// 10-bit sample, one sample per byte: `sample = (plane << 2) | low_bits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// Display width in pixels
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
    /// Width of the coded area
    pub coded_width: u32,
    /// Height of the coded area
    pub coded_height: u32,
    /// Chroma layout
    pub chroma_format: ChromaFormat,
    /// Y, Cb, Cr sample planes
    pub planes: [Vec<u8>; 3],
    /// Optional low-order bits of each plane
    pub low_bits: Option<[Vec<u8>; 3]>,
}

impl Picture {
    /// Allocate a progressive picture
    pub fn new(width: u32, height: u32, chroma_format: ChromaFormat) -> Self {
        let (coded_width, coded_height) =
            coded_dimensions(width, height, InterlaceMode::Progressive);
        Self::with_coded_size(width, height, coded_width, coded_height, chroma_format)
    }

    /// Allocate a picture with the coded layout of the given interlace mode
    pub fn for_layout(
        width: u32,
        height: u32,
        chroma_format: ChromaFormat,
        interlace: InterlaceMode,
    ) -> Self {
        let (coded_width, coded_height) = coded_dimensions(width, height, interlace);
        Self::with_coded_size(width, height, coded_width, coded_height, chroma_format)
    }

    /// Allocate a picture with explicit coded dimensions
    pub fn with_coded_size(
        width: u32,
        height: u32,
        coded_width: u32,
        coded_height: u32,
        chroma_format: ChromaFormat,
    ) -> Self {
        let height_rows = coded_height as usize;
        let luma_size = coded_width as usize * height_rows;
        let chroma_size = (coded_width >> chroma_format.chroma_h_shift()) as usize * height_rows;
        Self::from_sizes(
            width,
            height,
            coded_width,
            coded_height,
            chroma_format,
            luma_size,
            chroma_size,
        )
    }

    /// Allocate a picture with explicit coded dimensions, failing when the
    /// plane sizes do not fit in memory arithmetic.
    pub fn try_with_coded_size(
        width: u32,
        height: u32,
        coded_width: u32,
        coded_height: u32,
        chroma_format: ChromaFormat,
    ) -> Result<Self> {
        let (luma_size, chroma_size) = plane_sizes(coded_width, coded_height, chroma_format)
            .ok_or_else(|| {
                ProResError::MalformedHeader(format!(
                    "coded size {}x{} overflows plane allocation",
                    coded_width, coded_height
                ))
            })?;
        Ok(Self::from_sizes(
            width,
            height,
            coded_width,
            coded_height,
            chroma_format,
            luma_size,
            chroma_size,
        ))
    }

    fn from_sizes(
        width: u32,
        height: u32,
        coded_width: u32,
        coded_height: u32,
        chroma_format: ChromaFormat,
        luma_size: usize,
        chroma_size: usize,
    ) -> Self {
        Picture {
            width,
            height,
            coded_width,
            coded_height,
            chroma_format,
            planes: [
                vec![0u8; luma_size],
                vec![0u8; chroma_size],
                vec![0u8; chroma_size],
            ],
            low_bits: None,
        }
    }

    /// Attach zeroed low-bits planes
    pub fn with_low_bits(mut self) -> Self {
        self.low_bits = Some([
            vec![0u8; self.planes[0].len()],
            vec![0u8; self.planes[1].len()],
            vec![0u8; self.planes[2].len()],
        ]);
        self
    }

    /// Build a picture from display-sized planes.
    ///
    /// The coded area outside the display window repeats the last column and
    /// row, which keeps edge macroblocks cheap to encode.
    pub fn from_planes(
        width: u32,
        height: u32,
        chroma_format: ChromaFormat,
        interlace: InterlaceMode,
        y_plane: &[u8],
        cb_plane: &[u8],
        cr_plane: &[u8],
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ProResError::InvalidConfig(format!(
                "invalid picture size {}x{}",
                width, height
            )));
        }
        let mut picture = Self::for_layout(width, height, chroma_format, interlace);
        for (plane, src) in [y_plane, cb_plane, cr_plane].into_iter().enumerate() {
            let src_width = picture.display_plane_width(plane) as usize;
            let needed = src_width * height as usize;
            if src.len() < needed {
                return Err(ProResError::BufferTooSmall {
                    plane,
                    needed,
                    available: src.len(),
                });
            }
            let stride = picture.stride(plane);
            let coded_height = picture.coded_height as usize;
            let dst = &mut picture.planes[plane];
            for row in 0..coded_height {
                let src_row = row.min(height as usize - 1);
                let line = &src[src_row * src_width..(src_row + 1) * src_width];
                let out = &mut dst[row * stride..(row + 1) * stride];
                out[..src_width].copy_from_slice(line);
                let edge = line[src_width - 1];
                out[src_width..].fill(edge);
            }
        }
        Ok(picture)
    }

    /// Bytes per row of a plane
    pub fn stride(&self, plane: usize) -> usize {
        self.plane_width(plane) as usize
    }

    /// Coded width of a plane
    pub fn plane_width(&self, plane: usize) -> u32 {
        if plane == 0 {
            self.coded_width
        } else {
            self.coded_width >> self.chroma_format.chroma_h_shift()
        }
    }

    /// Display width of a plane
    pub fn display_plane_width(&self, plane: usize) -> u32 {
        if plane == 0 {
            self.width
        } else {
            let shift = self.chroma_format.chroma_h_shift();
            (self.width + (1 << shift) - 1) >> shift
        }
    }

    /// Bytes a plane needs for the coded area
    pub fn required_plane_size(&self, plane: usize) -> usize {
        self.stride(plane) * self.coded_height as usize
    }

    /// Check that every plane covers the coded area
    pub fn validate(&self) -> Result<()> {
        for plane in 0..3 {
            let needed = self.required_plane_size(plane);
            let available = self.planes[plane].len();
            if available < needed {
                return Err(ProResError::BufferTooSmall {
                    plane,
                    needed,
                    available,
                });
            }
            if let Some(low) = &self.low_bits {
                if low[plane].len() < needed {
                    return Err(ProResError::BufferTooSmall {
                        plane,
                        needed,
                        available: low[plane].len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 10-bit sample at a coded position
    pub fn sample(&self, plane: usize, x: usize, y: usize) -> u16 {
        let index = y * self.stride(plane) + x;
        let high = (self.planes[plane][index] as u16) << 2;
        match &self.low_bits {
            Some(low) => high | (low[plane][index] & 3) as u16,
            None => high,
        }
    }

    /// Copy of a plane cropped to the display window
    pub fn crop_plane(&self, plane: usize) -> Vec<u8> {
        let width = self.display_plane_width(plane) as usize;
        let stride = self.stride(plane);
        let mut out = Vec::with_capacity(width * self.height as usize);
        for row in self.planes[plane].chunks(stride).take(self.height as usize) {
            out.extend_from_slice(&row[..width]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_padded_dimensions() {
        let picture = Picture::new(1920, 1080, ChromaFormat::YUV422);
        assert_eq!((picture.coded_width, picture.coded_height), (1920, 1088));
        assert_eq!(picture.planes[0].len(), 1920 * 1088);
        assert_eq!(picture.planes[1].len(), 960 * 1088);
        assert!(picture.low_bits.is_none());
        assert!(picture.validate().is_ok());
    }

    #[test]
    fn test_plane_sizes_of_largest_header() {
        // 65535 rounds up to 65536 in both directions
        let sizes = plane_sizes(65536, 65536, ChromaFormat::YUV422);
        if usize::BITS > 32 {
            assert_eq!(sizes, Some((1 << 32, 1 << 31)));
        } else {
            assert_eq!(sizes, None);
        }
        assert_eq!(plane_sizes(32, 16, ChromaFormat::YUV444), Some((512, 512)));
    }

    #[test]
    fn test_try_with_coded_size() {
        let picture = Picture::try_with_coded_size(30, 10, 32, 16, ChromaFormat::YUV422).unwrap();
        assert_eq!(picture.planes[0].len(), 512);
        assert_eq!(picture.planes[1].len(), 256);
        assert_eq!(picture, Picture::with_coded_size(30, 10, 32, 16, ChromaFormat::YUV422));
    }

    #[test]
    fn test_interlaced_layout() {
        let picture =
            Picture::for_layout(720, 486, ChromaFormat::YUV444, InterlaceMode::InterlacedBFF);
        assert_eq!(picture.coded_height, 512);
        assert_eq!(picture.planes[2].len(), 720 * 512);
    }

    #[test]
    fn test_from_planes_replicates_edges() {
        let y: Vec<u8> = (0..10 * 3).map(|i| i as u8).collect();
        let c = vec![7u8; 5 * 3];
        let picture = Picture::from_planes(
            10,
            3,
            ChromaFormat::YUV422,
            InterlaceMode::Progressive,
            &y,
            &c,
            &c,
        )
        .unwrap();
        assert_eq!(picture.coded_width, 16);
        assert_eq!(picture.planes[0][15], 9);
        assert_eq!(picture.planes[0][15 * 16], 20);
        assert_eq!(picture.planes[0][15 * 16 + 15], 29);
        assert_eq!(picture.crop_plane(0), y);
        assert_eq!(picture.crop_plane(1), c);
    }

    #[test]
    fn test_from_planes_too_small() {
        let result = Picture::from_planes(
            16,
            16,
            ChromaFormat::YUV422,
            InterlaceMode::Progressive,
            &[0u8; 16],
            &[0u8; 128],
            &[0u8; 128],
        );
        assert!(matches!(
            result,
            Err(ProResError::BufferTooSmall { plane: 0, .. })
        ));
    }

    #[test]
    fn test_sample_with_low_bits() {
        let mut picture = Picture::new(16, 16, ChromaFormat::YUV444).with_low_bits();
        picture.planes[1][17] = 0x80;
        if let Some(low) = picture.low_bits.as_mut() {
            low[1][17] = 3;
        }
        assert_eq!(picture.sample(1, 1, 1), 515);
        assert_eq!(picture.sample(0, 1, 1), 0);
    }

    #[test]
    fn test_validate_detects_short_plane() {
        let mut picture = Picture::new(32, 16, ChromaFormat::YUV422);
        picture.planes[2].truncate(10);
        assert!(matches!(
            picture.validate(),
            Err(ProResError::BufferTooSmall { plane: 2, .. })
        ));
    }
}
