use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use bytes_util::{BitReader, BitWriter};
use tracing::{debug, warn};

use crate::error::{Result, VvcError};
use crate::ptl::MAX_SUBLAYERS;
use crate::{ConstantFrameRate, NALUnitType, VvcPtlRecord};

/// Maximum number of VPS NAL units in a record.
pub const MAX_VPS_COUNT: usize = 16;
/// Maximum number of SPS NAL units in a record.
pub const MAX_SPS_COUNT: usize = 16;
/// Maximum number of PPS NAL units in a record.
pub const MAX_PPS_COUNT: usize = 64;

/// VVC Decoder Configuration Record.
///
/// ISO/IEC 14496-15 - 11.2.4.2
#[derive(Debug, Clone, PartialEq)]
pub struct VVCDecoderConfigurationRecord {
    /// This value plus 1 indicates the length in bytes of the `NALUnitLength` field in a
    /// VVC video sample in the stream to which this configuration record applies.
    ///
    /// The value of this field is one of 0, 1, or 3
    /// corresponding to a length encoded with 1, 2, or 4 bytes, respectively.
    pub length_size_minus_one: u8,
    /// Stream properties and the native profile, tier and level, present when
    /// `ptl_present_flag` is set.
    pub ptl: Option<VvcPtlInfo>,
    /// [`NaluArray`]s that are part of this configuration record.
    pub arrays: Vec<NaluArray>,
}

/// The block of a [`VVCDecoderConfigurationRecord`] guarded by `ptl_present_flag`.
#[derive(Debug, Clone, PartialEq)]
pub struct VvcPtlInfo {
    /// The output layer set index, stored in 9 bits.
    pub ols_idx: u16,
    /// The number of temporal sublayers of the stream, in range \[0, 7\].
    ///
    /// Value 1 indicates that the stream is not temporally scalable, 0 that
    /// it is unknown.
    pub num_sublayers: u8,
    /// See [`ConstantFrameRate`] for more info.
    pub constant_frame_rate: ConstantFrameRate,
    /// Matches [`sps_chroma_format_idc`](crate::SequenceParameterSet::sps_chroma_format_idc).
    pub chroma_format_idc: u8,
    /// Matches [`sps_bitdepth_minus8`](crate::SequenceParameterSet::sps_bitdepth_minus8), stored in 3 bits.
    pub bit_depth_minus8: u8,
    /// The profile, tier and level the stream conforms to.
    pub native_ptl: VvcPtlRecord,
    /// The largest [`sps_pic_width_max_in_luma_samples`](crate::SequenceParameterSet::sps_pic_width_max_in_luma_samples).
    pub max_picture_width: u16,
    /// The largest [`sps_pic_height_max_in_luma_samples`](crate::SequenceParameterSet::sps_pic_height_max_in_luma_samples).
    pub max_picture_height: u16,
    /// Gives the average frame rate in units of frames/(256 seconds).
    ///
    /// Value 0 indicates an unspecified average frame rate.
    pub avg_frame_rate: u16,
}

/// Nalu Array Structure
///
/// ISO/IEC 14496-15 - 11.2.4.2
#[derive(Debug, Clone, PartialEq)]
pub struct NaluArray {
    /// When equal to `true` indicates that all NAL units of the given type are in the
    /// following array and none are in the stream; when equal to `false` indicates that additional NAL units
    /// of the indicated type may be in the stream.
    pub array_completeness: bool,
    /// Indicates the type of the NAL units in the following array (which shall be all of
    /// that type); it is restricted to take one of the values indicating a DCI, OPI,
    /// VPS, SPS, PPS, prefix SEI, or suffix SEI NAL unit.
    pub nal_unit_type: NALUnitType,
    /// The raw NAL units, including their 2-byte header.
    ///
    /// You might want to use [`SequenceParameterSet::parse`](crate::SequenceParameterSet::parse)
    /// to parse an SPS NAL unit.
    pub nalus: Vec<Bytes>,
}

impl NaluArray {
    fn allowed_type(nal_unit_type: NALUnitType) -> bool {
        nal_unit_type.is_record_candidate() || nal_unit_type == NALUnitType::DciNut
    }
}

impl VVCDecoderConfigurationRecord {
    /// Demuxes a [`VVCDecoderConfigurationRecord`] from a byte stream.
    pub fn demux(data: impl io::Read) -> Result<Self> {
        let mut bit_reader = BitReader::new(data);

        let reserved = bit_reader.read_bits(5)?;
        if reserved != 0b11111 {
            return Err(VvcError::invalid("reserved bits of the first byte must be set"));
        }

        let length_size_minus_one = bit_reader.read_bits(2)? as u8;
        if length_size_minus_one == 2 {
            return Err(VvcError::invalid("length_size_minus_one must be 0, 1, or 3"));
        }

        let ptl_present_flag = bit_reader.read_bit()?;
        let ptl = if ptl_present_flag {
            let ols_idx = bit_reader.read_bits(9)? as u16;
            let num_sublayers = bit_reader.read_bits(3)? as u8;
            let constant_frame_rate = bit_reader.read_bits(2)? as u8;
            let chroma_format_idc = bit_reader.read_bits(2)? as u8;
            let bit_depth_minus8 = bit_reader.read_bits(3)? as u8;
            bit_reader.read_bits(5)?; // reserved

            let native_ptl = VvcPtlRecord::demux(&mut bit_reader, num_sublayers)?;

            let max_picture_width = bit_reader.read_u16::<BigEndian>()?;
            let max_picture_height = bit_reader.read_u16::<BigEndian>()?;
            let avg_frame_rate = bit_reader.read_u16::<BigEndian>()?;

            Some(VvcPtlInfo {
                ols_idx,
                num_sublayers,
                constant_frame_rate: ConstantFrameRate::from(constant_frame_rate),
                chroma_format_idc,
                bit_depth_minus8,
                native_ptl,
                max_picture_width,
                max_picture_height,
                avg_frame_rate,
            })
        } else {
            None
        };

        let num_of_arrays = bit_reader.read_u8()?;
        let mut arrays = Vec::with_capacity(num_of_arrays as usize);

        for _ in 0..num_of_arrays {
            let array_completeness = bit_reader.read_bit()?;
            bit_reader.read_bits(2)?; // reserved

            let nal_unit_type = NALUnitType::from(bit_reader.read_bits(5)? as u8);
            if !NaluArray::allowed_type(nal_unit_type) {
                return Err(VvcError::invalid(format!("invalid nal_unit_type: {nal_unit_type:?}")));
            }

            let num_nalus = if nal_unit_type.is_single_nalu_array() {
                1
            } else {
                bit_reader.read_u16::<BigEndian>()?
            };

            let mut nalus = Vec::with_capacity(num_nalus as usize);
            for _ in 0..num_nalus {
                let nal_unit_length = bit_reader.read_u16::<BigEndian>()?;
                let mut data = vec![0; nal_unit_length as usize];
                bit_reader.read_exact(&mut data)?;
                nalus.push(data.into());
            }

            arrays.push(NaluArray {
                array_completeness,
                nal_unit_type,
                nalus,
            });
        }

        Ok(VVCDecoderConfigurationRecord {
            length_size_minus_one,
            ptl,
            arrays,
        })
    }

    /// Returns the total byte size of the [`VVCDecoderConfigurationRecord`].
    pub fn size(&self) -> u64 {
        1 // reserved, length_size_minus_one, ptl_present_flag
        + self.ptl.as_ref().map_or(0, |ptl| {
            2 // ols_idx, num_sublayers, constant_frame_rate, chroma_format_idc
            + 1 // bit_depth_minus8, reserved
            + ptl.native_ptl.size(ptl.num_sublayers)
            + 2 // max_picture_width
            + 2 // max_picture_height
            + 2 // avg_frame_rate
        })
        + 1 // num_of_arrays
        + self.arrays.iter().map(|array| {
            1 // array_completeness, reserved, nal_unit_type
            + if array.nal_unit_type.is_single_nalu_array() { 0 } else { 2 } // num_nalus
            + array.nalus.iter().map(|nalu| {
                2 // nal_unit_length
                + nalu.len() as u64 // nal_unit
            }).sum::<u64>()
        }).sum::<u64>()
    }

    /// Number of NAL units of the given type across all arrays.
    pub fn count(&self, nal_unit_type: NALUnitType) -> usize {
        self.arrays
            .iter()
            .filter(|array| array.nal_unit_type == nal_unit_type)
            .map(|array| array.nalus.len())
            .sum()
    }

    /// Checks that the record can be serialized.
    ///
    /// The record needs between 1 and 16 VPS and SPS NAL units, at most 64 PPS
    /// NAL units, at most 255 arrays and NAL units of at most 65535 bytes.
    /// Every field must fit its serialized width.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.length_size_minus_one, 0 | 1 | 3) {
            return Err(VvcError::invalid(format!(
                "length_size_minus_one must be 0, 1, or 3: {}",
                self.length_size_minus_one
            )));
        }

        let vps_count = self.count(NALUnitType::VpsNut);
        if !(1..=MAX_VPS_COUNT).contains(&vps_count) {
            return Err(VvcError::invalid(format!(
                "VPS count out of range [1, {MAX_VPS_COUNT}]: {vps_count}"
            )));
        }

        let sps_count = self.count(NALUnitType::SpsNut);
        if !(1..=MAX_SPS_COUNT).contains(&sps_count) {
            return Err(VvcError::invalid(format!(
                "SPS count out of range [1, {MAX_SPS_COUNT}]: {sps_count}"
            )));
        }

        let pps_count = self.count(NALUnitType::PpsNut);
        if pps_count > MAX_PPS_COUNT {
            return Err(VvcError::invalid(format!(
                "PPS count out of range [0, {MAX_PPS_COUNT}]: {pps_count}"
            )));
        }

        if self.arrays.len() > u8::MAX as usize {
            return Err(VvcError::invalid(format!("too many NAL unit arrays: {}", self.arrays.len())));
        }

        for array in &self.arrays {
            if !NaluArray::allowed_type(array.nal_unit_type) {
                return Err(VvcError::invalid(format!(
                    "invalid nal_unit_type: {:?}",
                    array.nal_unit_type
                )));
            }

            if array.nal_unit_type.is_single_nalu_array() && array.nalus.len() != 1 {
                return Err(VvcError::invalid(format!(
                    "{:?} array must hold exactly one NAL unit: {}",
                    array.nal_unit_type,
                    array.nalus.len()
                )));
            }

            if array.nalus.len() > u16::MAX as usize {
                return Err(VvcError::invalid(format!("too many NAL units: {}", array.nalus.len())));
            }

            if let Some(nalu) = array.nalus.iter().find(|nalu| nalu.len() > u16::MAX as usize) {
                return Err(VvcError::invalid(format!(
                    "{:?} NAL unit too large: {} bytes",
                    array.nal_unit_type,
                    nalu.len()
                )));
            }
        }

        if let Some(ptl) = &self.ptl {
            if ptl.ols_idx > 0x1FF {
                return Err(VvcError::invalid(format!("ols_idx does not fit 9 bits: {}", ptl.ols_idx)));
            }
            if ptl.num_sublayers as usize > MAX_SUBLAYERS {
                return Err(VvcError::invalid(format!(
                    "num_sublayers out of range [0, {MAX_SUBLAYERS}]: {}",
                    ptl.num_sublayers
                )));
            }
            if ptl.chroma_format_idc > 3 {
                return Err(VvcError::invalid(format!(
                    "chroma_format_idc does not fit 2 bits: {}",
                    ptl.chroma_format_idc
                )));
            }
            if ptl.bit_depth_minus8 > 7 {
                return Err(VvcError::invalid(format!(
                    "bit_depth_minus8 does not fit 3 bits: {}",
                    ptl.bit_depth_minus8
                )));
            }
            ptl.native_ptl.validate()?;
        }

        Ok(())
    }

    /// Muxes the [`VVCDecoderConfigurationRecord`] into a byte stream.
    ///
    /// The record is validated first, nothing is written if it is rejected.
    pub fn mux<T: io::Write>(&self, writer: &mut T) -> Result<()> {
        if let Err(err) = self.validate() {
            warn!(%err, "rejecting decoder configuration record");
            return Err(err);
        }

        if let Some(ptl) = &self.ptl {
            debug!(
                length_size_minus_one = self.length_size_minus_one,
                num_sublayers = ptl.num_sublayers,
                constant_frame_rate = ?ptl.constant_frame_rate,
                chroma_format_idc = ptl.chroma_format_idc,
                bit_depth_minus8 = ptl.bit_depth_minus8,
                general_profile_idc = ptl.native_ptl.general_profile_idc,
                general_tier_flag = ptl.native_ptl.general_tier_flag,
                general_level_idc = ptl.native_ptl.general_level_idc,
                num_bytes_constraint_info = ptl.native_ptl.general_constraint_info.len(),
                max_picture_width = ptl.max_picture_width,
                max_picture_height = ptl.max_picture_height,
                avg_frame_rate = ptl.avg_frame_rate,
                "writing decoder configuration record"
            );
        }
        for array in &self.arrays {
            debug!(
                nal_unit_type = ?array.nal_unit_type,
                array_completeness = array.array_completeness,
                num_nalus = array.nalus.len(),
                "NAL unit array"
            );
        }

        let mut bit_writer = BitWriter::new(writer);

        bit_writer.write_bits(0b11111, 5)?; // reserved
        bit_writer.write_bits(self.length_size_minus_one as u64, 2)?;
        bit_writer.write_bit(self.ptl.is_some())?;

        if let Some(ptl) = &self.ptl {
            bit_writer.write_bits(ptl.ols_idx as u64, 9)?;
            bit_writer.write_bits(ptl.num_sublayers as u64, 3)?;
            bit_writer.write_bits(ptl.constant_frame_rate as u64, 2)?;
            bit_writer.write_bits(ptl.chroma_format_idc as u64, 2)?;
            bit_writer.write_bits(ptl.bit_depth_minus8 as u64, 3)?;
            bit_writer.write_bits(0b11111, 5)?; // reserved

            ptl.native_ptl.mux(&mut bit_writer, ptl.num_sublayers)?;

            bit_writer.write_u16::<BigEndian>(ptl.max_picture_width)?;
            bit_writer.write_u16::<BigEndian>(ptl.max_picture_height)?;
            bit_writer.write_u16::<BigEndian>(ptl.avg_frame_rate)?;
        }

        bit_writer.write_u8(self.arrays.len() as u8)?;
        for array in &self.arrays {
            bit_writer.write_bit(array.array_completeness)?;
            bit_writer.write_bits(0b00, 2)?; // reserved
            bit_writer.write_bits(array.nal_unit_type as u64, 5)?;

            if !array.nal_unit_type.is_single_nalu_array() {
                bit_writer.write_u16::<BigEndian>(array.nalus.len() as u16)?;
            }

            for nalu in &array.nalus {
                bit_writer.write_u16::<BigEndian>(nalu.len() as u16)?;
                bit_writer.write_all(nalu)?;
            }
        }

        bit_writer.finish()?;

        Ok(())
    }

    /// Returns `true` if `data` starts like a serialized record rather than an
    /// Annex-B stream, the 5 reserved bits of the first byte are set.
    pub fn is_record_format(data: &[u8]) -> bool {
        data.first().is_some_and(|byte| byte & 0xF8 == 0xF8)
    }
}
