//! Exp-Golomb (`ue(v)` / `se(v)`) coding on top of the
//! [`bytes-util`](bytes_util) bit reader and writer.
//!
//! ```rust
//! # fn test() -> std::io::Result<()> {
//! use expgolomb::{BitReaderExpGolombExt, BitWriterExpGolombExt};
//! use bytes_util::{BitReader, BitWriter};
//!
//! let mut bit_writer = BitWriter::default();
//! bit_writer.write_exp_golomb(0)?;
//! bit_writer.write_signed_exp_golomb(-2)?;
//! bit_writer.write_exp_golomb(7)?;
//!
//! let data: Vec<u8> = bit_writer.finish()?;
//!
//! let mut bit_reader = BitReader::new_from_slice(data);
//! assert_eq!(bit_reader.read_exp_golomb()?, 0);
//! assert_eq!(bit_reader.read_signed_exp_golomb()?, -2);
//! bit_reader.skip_exp_golomb()?;
//! assert_eq!(bit_reader.bit_position(), 1 + 5 + 7);
//! # Ok(())
//! # }
//! # test().expect("failed to run test");
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::io;

use bytes_util::{BitReader, BitWriter};

/// Longest prefix accepted when decoding, larger codes cannot fit in a `u64`.
const MAX_LEADING_ZEROS: u32 = 63;

/// Extension trait for reading Exp-Golomb encoded numbers from a [`BitReader`]
///
/// See: <https://en.wikipedia.org/wiki/Exponential-Golomb_coding>
pub trait BitReaderExpGolombExt {
    /// Reads an unsigned Exp-Golomb encoded number, `ue(v)`
    ///
    /// A prefix of more than 63 zero bits is rejected with
    /// [`io::ErrorKind::InvalidData`].
    fn read_exp_golomb(&mut self) -> io::Result<u64>;

    /// Reads a signed Exp-Golomb encoded number, `se(v)`
    fn read_signed_exp_golomb(&mut self) -> io::Result<i64> {
        let code = self.read_exp_golomb()?;

        if code % 2 == 0 {
            Ok(-((code / 2) as i64))
        } else {
            Ok((code / 2) as i64 + 1)
        }
    }

    /// Consumes one Exp-Golomb code without returning it
    fn skip_exp_golomb(&mut self) -> io::Result<()> {
        self.read_exp_golomb().map(|_| ())
    }
}

impl<R: io::Read> BitReaderExpGolombExt for BitReader<R> {
    fn read_exp_golomb(&mut self) -> io::Result<u64> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > MAX_LEADING_ZEROS {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "exp-golomb prefix too long",
                ));
            }
        }

        let suffix = self.read_bits(leading_zeros as u8)?;
        Ok(((1u64 << leading_zeros) - 1) + suffix)
    }
}

/// Extension trait for writing Exp-Golomb encoded numbers to a [`BitWriter`]
///
/// See: <https://en.wikipedia.org/wiki/Exponential-Golomb_coding>
pub trait BitWriterExpGolombExt {
    /// Writes an unsigned Exp-Golomb encoded number
    fn write_exp_golomb(&mut self, input: u64) -> io::Result<()>;

    /// Writes a signed Exp-Golomb encoded number
    fn write_signed_exp_golomb(&mut self, number: i64) -> io::Result<()> {
        let number = if number <= 0 {
            -number as u64 * 2
        } else {
            number as u64 * 2 - 1
        };

        self.write_exp_golomb(number)
    }
}

impl<W: io::Write> BitWriterExpGolombExt for BitWriter<W> {
    fn write_exp_golomb(&mut self, input: u64) -> io::Result<()> {
        if input == u64::MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "exp-golomb value too large",
            ));
        }

        let code = input + 1;
        let leading_zeros = 63 - code.leading_zeros() as u8;

        self.write_bits(0, leading_zeros)?;
        self.write_bits(code, leading_zeros + 1)
    }
}
