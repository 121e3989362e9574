//! ProRes type definitions

use crate::ratecontrol::RateProfile;
use crate::tables::{
    HQ_QUANT_MATRIX, LT_QUANT_MATRIX, PROXY_CHROMA_QUANT_MATRIX, PROXY_LUMA_QUANT_MATRIX,
    STANDARD_QUANT_MATRIX,
};

/// ProRes profile variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProResProfile {
    /// ProRes 422 Proxy - Lowest quality, highest compression
    Proxy,
    /// ProRes 422 LT - Low quality
    LT,
    /// ProRes 422 Standard - Standard quality
    Standard,
    /// ProRes 422 HQ - High quality
    HQ,
    /// ProRes 4444 - High quality with 4:4:4 chroma
    P4444,
}

impl ProResProfile {
    /// Returns true if this is a 4:4:4 profile
    pub fn is_444(&self) -> bool {
        matches!(self, ProResProfile::P4444)
    }

    /// Chroma layout the profile encodes.
    pub fn chroma_format(&self) -> ChromaFormat {
        if self.is_444() {
            ChromaFormat::YUV444
        } else {
            ChromaFormat::YUV422
        }
    }

    /// Quantization matrices, bit budget and QP range for this profile.
    pub fn rate_profile(&self) -> RateProfile {
        match self {
            ProResProfile::Proxy => RateProfile {
                luma_quant: PROXY_LUMA_QUANT_MATRIX,
                chroma_quant: PROXY_CHROMA_QUANT_MATRIX,
                bitrate: 1000,
                first_qp: 4,
                last_qp: 8,
            },
            ProResProfile::LT => RateProfile {
                luma_quant: LT_QUANT_MATRIX,
                chroma_quant: LT_QUANT_MATRIX,
                bitrate: 2100,
                first_qp: 1,
                last_qp: 9,
            },
            ProResProfile::Standard => RateProfile {
                luma_quant: STANDARD_QUANT_MATRIX,
                chroma_quant: STANDARD_QUANT_MATRIX,
                bitrate: 3500,
                first_qp: 1,
                last_qp: 6,
            },
            ProResProfile::HQ => RateProfile {
                luma_quant: HQ_QUANT_MATRIX,
                chroma_quant: HQ_QUANT_MATRIX,
                bitrate: 5400,
                first_qp: 1,
                last_qp: 6,
            },
            ProResProfile::P4444 => RateProfile {
                luma_quant: HQ_QUANT_MATRIX,
                chroma_quant: HQ_QUANT_MATRIX,
                bitrate: 8000,
                first_qp: 1,
                last_qp: 6,
            },
        }
    }
}

/// Chroma subsampling format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChromaFormat {
    /// 4:2:2 chroma subsampling
    YUV422,
    /// 4:4:4 chroma subsampling (no subsampling)
    YUV444,
}

impl ChromaFormat {
    /// Parse from the two-bit chroma code of the frame header
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(ChromaFormat::YUV422),
            3 => Some(ChromaFormat::YUV444),
            _ => None,
        }
    }

    /// Two-bit chroma code written to the frame header
    pub fn code(&self) -> u8 {
        match self {
            ChromaFormat::YUV422 => 2,
            ChromaFormat::YUV444 => 3,
        }
    }

    /// Returns the chroma width shift
    pub fn chroma_h_shift(&self) -> u32 {
        match self {
            ChromaFormat::YUV422 => 1,
            ChromaFormat::YUV444 => 0,
        }
    }
}

/// Interlace mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterlaceMode {
    /// Progressive scan
    Progressive,
    /// Interlaced, top field first
    InterlacedTFF,
    /// Interlaced, bottom field first
    InterlacedBFF,
}

impl InterlaceMode {
    /// Parse from the two-bit frame type of the frame header
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(InterlaceMode::Progressive),
            1 => Some(InterlaceMode::InterlacedTFF),
            2 => Some(InterlaceMode::InterlacedBFF),
            _ => None,
        }
    }

    /// Two-bit frame type written to the frame header
    pub fn code(&self) -> u8 {
        match self {
            InterlaceMode::Progressive => 0,
            InterlaceMode::InterlacedTFF => 1,
            InterlaceMode::InterlacedBFF => 2,
        }
    }

    /// Returns true for both field orders
    pub fn is_interlaced(&self) -> bool {
        !matches!(self, InterlaceMode::Progressive)
    }

    /// Number of coded pictures per frame
    pub fn picture_count(&self) -> usize {
        if self.is_interlaced() {
            2
        } else {
            1
        }
    }

    /// First frame line of the given picture, and the line step between its rows.
    pub fn field_layout(&self, picture: usize) -> (usize, usize) {
        match self {
            InterlaceMode::Progressive => (0, 1),
            InterlaceMode::InterlacedTFF => (picture & 1, 2),
            InterlaceMode::InterlacedBFF => ((picture & 1) ^ 1, 2),
        }
    }
}

/// Color primaries (based on ITU-T H.273)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorPrimaries {
    /// Unknown/unspecified
    Unknown,
    /// ITU-R BT.709 (HD)
    BT709,
    /// ITU-R BT.601 (SD NTSC)
    BT601NTSC,
    /// ITU-R BT.601 (SD PAL)
    BT601PAL,
    /// ITU-R BT.2020 (UHD)
    BT2020,
    /// DCI-P3
    DCIP3,
}

impl ColorPrimaries {
    /// Parse from ProRes color primaries code
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ColorPrimaries::BT709,
            6 => ColorPrimaries::BT601NTSC,
            5 => ColorPrimaries::BT601PAL,
            9 => ColorPrimaries::BT2020,
            11 | 12 => ColorPrimaries::DCIP3,
            _ => ColorPrimaries::Unknown,
        }
    }

    /// Code written to the frame header
    pub fn code(&self) -> u8 {
        match self {
            ColorPrimaries::Unknown => 0,
            ColorPrimaries::BT709 => 1,
            ColorPrimaries::BT601NTSC => 6,
            ColorPrimaries::BT601PAL => 5,
            ColorPrimaries::BT2020 => 9,
            ColorPrimaries::DCIP3 => 11,
        }
    }
}

/// Transfer characteristics (gamma)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferCharacteristic {
    /// Unknown/unspecified
    Unknown,
    /// ITU-R BT.709
    BT709,
    /// ITU-R BT.601
    BT601,
    /// SMPTE ST 2084 (PQ/HDR10)
    PQ,
    /// ARIB STD-B67 (HLG)
    HLG,
}

impl TransferCharacteristic {
    /// Parse from ProRes transfer characteristic code
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => TransferCharacteristic::BT709,
            6 => TransferCharacteristic::BT601,
            16 => TransferCharacteristic::PQ,
            18 => TransferCharacteristic::HLG,
            _ => TransferCharacteristic::Unknown,
        }
    }

    /// Code written to the frame header
    pub fn code(&self) -> u8 {
        match self {
            TransferCharacteristic::Unknown => 0,
            TransferCharacteristic::BT709 => 1,
            TransferCharacteristic::BT601 => 6,
            TransferCharacteristic::PQ => 16,
            TransferCharacteristic::HLG => 18,
        }
    }
}

/// Matrix coefficients for YCbCr to RGB conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatrixCoefficients {
    /// Unknown/unspecified
    Unknown,
    /// ITU-R BT.709
    BT709,
    /// ITU-R BT.601
    BT601,
    /// ITU-R BT.2020 non-constant luminance
    BT2020NCL,
}

impl MatrixCoefficients {
    /// Parse from ProRes matrix code
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MatrixCoefficients::BT709,
            6 => MatrixCoefficients::BT601,
            9 => MatrixCoefficients::BT2020NCL,
            _ => MatrixCoefficients::Unknown,
        }
    }

    /// Code written to the frame header
    pub fn code(&self) -> u8 {
        match self {
            MatrixCoefficients::Unknown => 0,
            MatrixCoefficients::BT709 => 1,
            MatrixCoefficients::BT601 => 6,
            MatrixCoefficients::BT2020NCL => 9,
        }
    }
}
