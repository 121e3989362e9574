//! Error types for ProRes encoding and decoding

use thiserror::Error;

/// Result type for ProRes operations
pub type Result<T> = std::result::Result<T, ProResError>;

/// Errors that can occur during ProRes encoding and decoding
#[derive(Error, Debug)]
pub enum ProResError {
    /// Invalid or unrecognized frame signature
    #[error("Invalid frame signature: expected 'icpf', got {0:?}")]
    InvalidSignature([u8; 4]),

    /// Frame data is too short
    #[error("Insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Frame, picture or slice header that cannot be parsed
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Invalid codeword in the entropy-coded payload
    #[error("Corrupt bitstream: {0}")]
    CorruptBitstream(String),

    /// Slice payload that failed to decode
    #[error("Corrupt slice data at macroblock ({mb_x}, {mb_y}), plane {plane}: {reason}")]
    CorruptSliceData {
        mb_x: u32,
        mb_y: u32,
        plane: usize,
        reason: String,
    },

    /// Output picture plane smaller than the frame requires
    #[error("Buffer too small for plane {plane}: need {needed} bytes, have {available}")]
    BufferTooSmall {
        plane: usize,
        needed: usize,
        available: usize,
    },

    /// Encoded slice does not fit the 16-bit size fields
    #[error("Slice too large: {size} bytes")]
    SliceOverflow { size: usize },

    /// Invalid encoder or decoder configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProResError {
    /// Whether the decoder can conceal this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProResError::CorruptBitstream(_) | ProResError::CorruptSliceData { .. }
        )
    }
}
