use std::io;
use std::num::NonZero;

use bytes_util::{BitReader, range_check};

use crate::NALUnitType;

/// NAL unit header.
///
/// - ISO/IEC 23090-3 - 7.3.1.2
/// - ISO/IEC 23090-3 - 7.4.2.2
#[derive(Debug, Clone, PartialEq)]
pub struct NALUnitHeader {
    /// Specifies the identifier of the layer to which a VCL NAL unit belongs or the identifier of a
    /// layer to which a non-VCL NAL unit applies.
    ///
    /// This value is in range \[0, 63\], values above 55 are reserved.
    pub nuh_layer_id: u8,
    /// Specifies the NAL unit type as specified in ISO/IEC 23090-3 Table 5.
    pub nal_unit_type: NALUnitType,
    /// This value minus 1 specifies a temporal identifier for the NAL unit.
    ///
    /// This value is in range from \[1, 7\].
    pub nuh_temporal_id_plus1: NonZero<u8>,
}

impl NALUnitHeader {
    /// Parses the 2-byte NAL unit header.
    pub fn parse(reader: impl io::Read) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(reader);

        let forbidden_zero_bit = bit_reader.read_bit()?;
        if forbidden_zero_bit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "forbidden_zero_bit is not zero",
            ));
        }

        bit_reader.read_bit()?; // nuh_reserved_zero_bit

        let nuh_layer_id = bit_reader.read_bits(6)? as u8;
        range_check!(nuh_layer_id, 0, 63)?;

        let nal_unit_type = NALUnitType::from(bit_reader.read_bits(5)? as u8);

        let nuh_temporal_id_plus1 = bit_reader.read_bits(3)? as u8;
        let nuh_temporal_id_plus1 = NonZero::new(nuh_temporal_id_plus1).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "nuh_temporal_id_plus1 cannot be 0",
            )
        })?;

        Ok(Self {
            nuh_layer_id,
            nal_unit_type,
            nuh_temporal_id_plus1,
        })
    }

    /// Returns the temporal id of the NAL unit.
    ///
    /// Defined as `TemporalId` by ISO/IEC 23090-3 - 7.4.2.2.
    pub fn temporal_id(&self) -> u8 {
        self.nuh_temporal_id_plus1.get() - 1
    }
}
