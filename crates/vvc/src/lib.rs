//! A pure Rust implementation of the VVC/H.266 decoder configuration record.
//!
//! The crate reads the parameter sets of a VVC elementary stream and
//! builds the `VVCDecoderConfigurationRecord` (ISO/IEC 14496-15 - 11.2.4.2)
//! that MP4 and Matroska muxers store as codec private data. It also turns
//! an Annex-B stream into a length-prefixed one.
//!
//! ## Examples
//!
//! ```
//! use vvc::{ConversionConfig, VVCDecoderConfigurationRecord};
//!
//! # fn test(annexb: &[u8]) -> vvc::Result<()> {
//! let config = ConversionConfig::builder().ps_array_completeness(true).build();
//! let vvcc = vvc::write_vvcc(annexb, &config)?;
//!
//! let record = VVCDecoderConfigurationRecord::demux(vvcc.as_slice())?;
//! println!("{record:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! This project is licensed under the MIT or Apache-2.0 license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(unreachable_pub)]

mod annexb;
mod builder;
mod config;
mod conversion_config;
mod enums;
mod error;
mod hrd;
mod nal_unit_header;
mod pps;
mod ptl;
mod ptl_aggregator;
mod ptl_record;
mod sps;
mod vps;

#[cfg(test)]
mod test_utils;

pub use annexb::{
    AnnexBNalIter, LengthPrefixedStream, annexb_to_length_prefixed, has_start_code, record_from_annexb, write_vvcc,
};
pub use builder::{ConfigRecordBuilder, RECORD_AVG_FRAME_RATE, RECORD_CONSTANT_FRAME_RATE};
pub use config::{MAX_PPS_COUNT, MAX_SPS_COUNT, MAX_VPS_COUNT, NaluArray, VVCDecoderConfigurationRecord, VvcPtlInfo};
pub use conversion_config::{ConversionConfig, ConversionConfigBuilder, LengthSize};
pub use enums::*;
pub use error::{Result, VvcError};
pub use hrd::{GeneralTimingHrdParameters, skip_ols_timing_hrd_parameters};
pub use nal_unit_header::NALUnitHeader;
pub use pps::PictureParameterSet;
pub use ptl::{GeneralConstraintsInfo, MAX_SUBLAYERS, ProfileTierLevel};
pub use ptl_aggregator::PtlAggregator;
pub use ptl_record::VvcPtlRecord;
pub use sps::SequenceParameterSet;
pub use vps::VideoParameterSet;
