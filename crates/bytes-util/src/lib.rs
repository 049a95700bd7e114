//! Bit and byte level helpers shared by the bitstream parsers.
//!
//! - [`BitReader`] / [`BitWriter`] read and write MSB-first bit fields.
//! - [`EmulationPreventionIo`] strips or inserts NAL emulation prevention bytes.
//! - [`range_check!`] validates parsed values.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod bit_read;
mod bit_write;
mod nal_emulation_prevention;
mod range_check;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
pub use nal_emulation_prevention::EmulationPreventionIo;
