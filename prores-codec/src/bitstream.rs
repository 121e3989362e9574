//! MSB-first bit reader and writer for slice payloads

use crate::error::{ProResError, Result};

/// Bitstream reader over one slice plane.
///
/// Lookahead past the end of the data reads as zero bits, which lets the
/// codeword decoder peek a full 16-bit window near the end of a plane.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bitstream reader
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0 }
    }

    /// Number of unread bits
    #[inline]
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    /// Current bit position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Peek at the next `n` bits (at most 32) without consuming them.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        if n == 0 {
            return 0;
        }
        let byte = self.pos >> 3;
        let mut window = 0u64;
        for i in 0..5 {
            window <<= 8;
            if let Some(&b) = self.data.get(byte + i) {
                window |= b as u64;
            }
        }
        let shift = 40 - (self.pos & 7) - n as usize;
        ((window >> shift) & ((1u64 << n) - 1)) as u32
    }

    /// Read `n` bits (at most 32)
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n as usize > self.bits_left() {
            return Err(ProResError::CorruptBitstream(format!(
                "read of {} bits with {} left",
                n,
                self.bits_left()
            )));
        }
        let value = self.peek_bits(n);
        self.pos += n as usize;
        Ok(value)
    }

    /// Read a single bit
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Skip `n` bits
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if n > self.bits_left() {
            return Err(ProResError::CorruptBitstream("skip past end of data".into()));
        }
        self.pos += n;
        Ok(())
    }

    /// True when fewer than 32 bits remain and all of them are zero.
    ///
    /// Writers pad the last byte of a plane with zeros, so this marks the end
    /// of the coefficient data.
    pub fn only_padding_left(&self) -> bool {
        let left = self.bits_left();
        left < 32 && self.peek_bits(left as u32) == 0
    }
}

/// Bitstream writer that accumulates a slice plane in memory.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    acc: u64,
    acc_bits: u32,
}

impl BitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `bytes` bytes
    pub fn with_capacity(bytes: usize) -> Self {
        BitWriter {
            buffer: Vec::with_capacity(bytes),
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Write the low `n` bits (at most 32) of `value`
    #[inline]
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        if n == 0 {
            return;
        }
        let value = (value as u64) & ((1u64 << n) - 1);
        self.acc = (self.acc << n) | value;
        self.acc_bits += n;
        while self.acc_bits >= 8 {
            self.acc_bits -= 8;
            self.buffer.push((self.acc >> self.acc_bits) as u8);
        }
        self.acc &= (1u64 << self.acc_bits) - 1;
    }

    /// Write `n` zero bits
    pub fn write_zeros(&mut self, mut n: u32) {
        while n > 0 {
            let chunk = n.min(32);
            self.write_bits(0, chunk);
            n -= chunk;
        }
    }

    /// Number of bits written so far
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.buffer.len() * 8 + self.acc_bits as usize
    }

    /// Pad the final byte with zero bits
    pub fn flush(&mut self) {
        if self.acc_bits > 0 {
            let pad = 8 - self.acc_bits;
            self.write_bits(0, pad);
        }
    }

    /// Bytes written so far; call [`flush`](Self::flush) first to include a partial byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Reset the writer, keeping its allocation
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.acc = 0;
        self.acc_bits = 0;
    }

    /// Flush and return the written bytes
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }
}
