use std::io;

/// Wraps a reader or writer and removes or inserts NAL emulation prevention
/// bytes (`0x03` following two zero bytes).
///
/// Reading yields the RBSP with every emulation prevention byte stripped.
/// Writing turns an RBSP into a NAL payload that contains no start code
/// prefix.
///
/// The wrapper works one byte at a time, so the inner io should be an
/// in-memory buffer or be buffered.
#[derive(Debug)]
pub struct EmulationPreventionIo<I> {
    inner: I,
    zero_count: u8,
}

impl<I> EmulationPreventionIo<I> {
    /// Creates a new wrapper around `inner`.
    pub const fn new(inner: I) -> Self {
        Self { inner, zero_count: 0 }
    }

    /// Returns the wrapped reader or writer.
    pub fn into_inner(self) -> I {
        self.inner
    }

    fn track(&mut self, byte: u8) {
        if byte == 0x00 {
            self.zero_count = self.zero_count.saturating_add(1);
        } else {
            self.zero_count = 0;
        }
    }
}

impl<I: io::Write> io::Write for EmulationPreventionIo<I> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if self.zero_count >= 2 && byte <= 0x03 {
                self.inner.write_all(&[0x03])?;
                self.zero_count = 0;
            }

            self.inner.write_all(&[byte])?;
            self.track(byte);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<I: io::Read> io::Read for EmulationPreventionIo<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        let mut byte = [0; 1];

        while filled < buf.len() {
            if self.inner.read(&mut byte)? == 0 {
                break;
            }

            if byte[0] == 0x03 && self.zero_count >= 2 {
                self.zero_count = 0;
                continue;
            }

            self.track(byte[0]);
            buf[filled] = byte[0];
            filled += 1;
        }

        Ok(filled)
    }
}
