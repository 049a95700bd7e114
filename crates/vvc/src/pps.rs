use std::io;

use crate::NALUnitType;
use crate::error::{Result, VvcError};
use crate::nal_unit_header::NALUnitHeader;

/// Picture parameter set.
///
/// None of the PPS fields end up in a decoder configuration record, only the
/// NAL unit header is read.
///
/// `pic_parameter_set_rbsp()`
///
/// - ISO/IEC 23090-3 - 7.3.2.5
#[derive(Debug, Clone, PartialEq)]
pub struct PictureParameterSet {
    /// The NAL unit header.
    pub nal_unit_header: NALUnitHeader,
}

impl PictureParameterSet {
    /// Parses a PPS NAL unit, including its 2-byte header.
    pub fn parse(reader: impl io::Read) -> Result<Self> {
        let nal_unit_header = NALUnitHeader::parse(reader)?;
        if nal_unit_header.nal_unit_type != NALUnitType::PpsNut {
            return Err(VvcError::invalid("nal_unit_type is not PPS_NUT"));
        }

        Ok(Self { nal_unit_header })
    }
}
