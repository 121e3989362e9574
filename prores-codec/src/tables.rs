//! ProRes constant tables (scan orders and quantization matrices)

/// Coefficient scan order for progressive pictures.
///
/// Entry `i` is the raster position inside the 8x8 block of the `i`-th coded
/// coefficient.
pub const PROGRESSIVE_SCAN: [u8; 64] = [
    0, 1, 8, 9, 2, 3, 10, 11, 16, 17, 24, 25, 18, 19, 26, 27, 4, 5, 12, 20, 13, 6, 7, 14, 21, 28,
    29, 22, 15, 23, 30, 31, 32, 33, 40, 48, 41, 34, 35, 42, 49, 56, 57, 50, 43, 36, 37, 44, 51, 58,
    59, 52, 45, 38, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Coefficient scan order for interlaced (field) pictures.
pub const INTERLACED_SCAN: [u8; 64] = [
    0, 8, 1, 9, 16, 24, 17, 25, 2, 10, 3, 11, 18, 26, 19, 27, 32, 40, 33, 34, 41, 48, 56, 49, 42,
    35, 43, 50, 57, 58, 51, 59, 4, 12, 5, 6, 13, 20, 28, 21, 14, 7, 15, 22, 29, 36, 44, 37, 30, 23,
    31, 38, 45, 52, 60, 53, 46, 39, 47, 54, 61, 62, 55, 63,
];

/// Matrix used when the frame header carries no quantization matrix.
pub const FLAT_QUANT_MATRIX: [u8; 64] = [4; 64];

/// ProRes 422 Proxy luma matrix (raster order)
pub const PROXY_LUMA_QUANT_MATRIX: [u8; 64] = [
    4, 7, 9, 11, 13, 14, 15, 63, //
    7, 7, 11, 12, 14, 15, 63, 63, //
    9, 11, 13, 14, 15, 63, 63, 63, //
    11, 11, 13, 14, 63, 63, 63, 63, //
    11, 13, 14, 63, 63, 63, 63, 63, //
    13, 14, 63, 63, 63, 63, 63, 63, //
    13, 63, 63, 63, 63, 63, 63, 63, //
    63, 63, 63, 63, 63, 63, 63, 63,
];

/// ProRes 422 Proxy chroma matrix (raster order)
pub const PROXY_CHROMA_QUANT_MATRIX: [u8; 64] = [
    4, 7, 9, 11, 13, 14, 63, 63, //
    7, 7, 11, 12, 14, 63, 63, 63, //
    9, 11, 13, 14, 63, 63, 63, 63, //
    11, 11, 13, 14, 63, 63, 63, 63, //
    11, 13, 14, 63, 63, 63, 63, 63, //
    13, 14, 63, 63, 63, 63, 63, 63, //
    13, 63, 63, 63, 63, 63, 63, 63, //
    63, 63, 63, 63, 63, 63, 63, 63,
];

/// ProRes 422 LT matrix (raster order)
pub const LT_QUANT_MATRIX: [u8; 64] = [
    4, 5, 6, 7, 9, 11, 13, 15, //
    5, 5, 7, 8, 11, 13, 15, 17, //
    6, 7, 9, 11, 13, 15, 15, 17, //
    7, 7, 9, 11, 13, 15, 17, 19, //
    7, 9, 11, 13, 14, 16, 19, 23, //
    9, 11, 13, 14, 16, 19, 23, 29, //
    9, 11, 13, 15, 17, 21, 28, 35, //
    11, 13, 16, 17, 21, 28, 35, 41,
];

/// ProRes 422 Standard matrix (raster order)
pub const STANDARD_QUANT_MATRIX: [u8; 64] = [
    4, 4, 5, 5, 6, 7, 7, 9, //
    4, 4, 5, 6, 7, 7, 9, 9, //
    5, 5, 6, 7, 7, 9, 9, 10, //
    5, 5, 6, 7, 7, 9, 9, 10, //
    5, 6, 7, 7, 8, 9, 10, 12, //
    6, 7, 7, 8, 9, 10, 12, 15, //
    6, 7, 7, 9, 10, 11, 14, 17, //
    7, 7, 9, 10, 11, 14, 17, 21,
];

/// ProRes 422 HQ and 4444 matrix (raster order)
pub const HQ_QUANT_MATRIX: [u8; 64] = [
    4, 4, 4, 4, 4, 4, 4, 4, //
    4, 4, 4, 4, 4, 4, 4, 4, //
    4, 4, 4, 4, 4, 4, 4, 4, //
    4, 4, 4, 4, 4, 4, 4, 5, //
    4, 4, 4, 4, 4, 4, 5, 5, //
    4, 4, 4, 4, 4, 5, 5, 6, //
    4, 4, 4, 4, 5, 5, 6, 7, //
    4, 4, 4, 4, 5, 6, 7, 7,
];

/// Scan order for a frame's interlace mode
pub fn scan_for(interlaced: bool) -> &'static [u8; 64] {
    if interlaced {
        &INTERLACED_SCAN
    } else {
        &PROGRESSIVE_SCAN
    }
}

/// Reorder a raster-order matrix into scan-position order.
pub fn to_scan_order(raster: &[u8; 64], scan: &[u8; 64]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (dst, &pos) in out.iter_mut().zip(scan.iter()) {
        *dst = raster[pos as usize];
    }
    out
}

/// Reorder a scan-position-order matrix back into raster order.
pub fn to_raster_order(scanned: &[u8; 64], scan: &[u8; 64]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (&value, &pos) in scanned.iter().zip(scan.iter()) {
        out[pos as usize] = value;
    }
    out
}
