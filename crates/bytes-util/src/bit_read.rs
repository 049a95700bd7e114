use std::io;

/// A reader that reads individual bits from a stream, most significant bit first.
///
/// The reader keeps a running count of consumed bits so parsers can query
/// their position without requiring the underlying reader to be seekable.
#[derive(Debug)]
#[must_use]
pub struct BitReader<T> {
    data: T,
    bit_pos: u8,
    current_byte: u8,
    consumed_bits: u64,
}

impl<T> BitReader<T> {
    /// Create a new BitReader from a reader
    pub const fn new(data: T) -> Self {
        Self {
            data,
            bit_pos: 0,
            current_byte: 0,
            consumed_bits: 0,
        }
    }
}

impl<T: io::Read> BitReader<T> {
    /// Reads a single bit
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.is_aligned() {
            self.update_byte()?;
        }

        let bit = (self.current_byte >> (7 - self.bit_pos)) & 1;

        self.bit_pos = (self.bit_pos + 1) % 8;
        self.consumed_bits += 1;

        Ok(bit == 1)
    }

    fn update_byte(&mut self) -> io::Result<()> {
        let mut buf = [0];
        self.data.read_exact(&mut buf)?;
        self.current_byte = buf[0];
        Ok(())
    }

    /// Reads multiple bits
    ///
    /// At most 64 bits can be read at once, larger counts are clamped.
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        let count = count.min(64);

        let mut bits = 0;
        for _ in 0..count {
            let bit = self.read_bit()?;
            bits <<= 1;
            bits |= if bit { 1 } else { 0 };
        }

        Ok(bits)
    }

    /// Skips `count` bits.
    ///
    /// Whole bytes are skipped without being split into bits once the reader is aligned.
    pub fn skip_bits(&mut self, count: u64) -> io::Result<()> {
        let mut remaining = count;

        while remaining > 0 && !self.is_aligned() {
            self.read_bit()?;
            remaining -= 1;
        }

        let mut buf = [0; 64];
        while remaining >= 8 {
            let bytes = (remaining / 8).min(buf.len() as u64) as usize;
            self.data.read_exact(&mut buf[..bytes])?;
            self.consumed_bits += bytes as u64 * 8;
            remaining -= bytes as u64 * 8;
        }

        for _ in 0..remaining {
            self.read_bit()?;
        }

        Ok(())
    }

    /// Aligns the reader to the next byte boundary
    #[inline(always)]
    pub fn align(&mut self) -> io::Result<()> {
        // The rest of the current byte is already buffered, dropping the bit
        // position makes the next read_bit call fetch the next byte.
        if !self.is_aligned() {
            self.consumed_bits += (8 - self.bit_pos) as u64;
            self.bit_pos = 0;
        }
        Ok(())
    }
}

impl<T> BitReader<T> {
    /// Returns the underlying reader
    #[inline(always)]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Returns a reference to the underlying reader
    #[inline(always)]
    #[must_use]
    pub const fn get_ref(&self) -> &T {
        &self.data
    }

    /// Returns the current bit position (0-7)
    #[inline(always)]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        self.bit_pos
    }

    /// Returns the number of bits consumed since the reader was created.
    #[inline(always)]
    #[must_use]
    pub const fn bit_position(&self) -> u64 {
        self.consumed_bits
    }

    /// Checks if the reader is aligned to the byte boundary
    #[inline(always)]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }
}

impl<T: io::Read> io::Read for BitReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Aligned reads go straight to the underlying reader.
        if self.is_aligned() {
            let read = self.data.read(buf)?;
            self.consumed_bits += read as u64 * 8;
            return Ok(read);
        }

        // Unaligned reads are stitched together from the tail of the current
        // byte and the head of the next one:
        //
        // 011|0110 0000000 11111111
        //    ^---- next bit to read
        // yields [01100000, 00001111]
        for byte in buf.iter_mut() {
            *byte = 0;
            for _ in 0..8 {
                let bit = self.read_bit()?;
                *byte <<= 1;
                *byte |= bit as u8;
            }
        }

        Ok(buf.len())
    }
}

impl<B: AsRef<[u8]>> BitReader<std::io::Cursor<B>> {
    /// Creates a new BitReader from a slice
    pub const fn new_from_slice(data: B) -> Self {
        Self::new(std::io::Cursor::new(data))
    }
}
