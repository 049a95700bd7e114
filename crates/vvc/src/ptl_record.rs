use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes_util::{BitReader, BitWriter};

use crate::ptl::MAX_SUBLAYERS;

/// Number of per-sublayer entries, the highest sublayer uses the general level.
pub(crate) const SUBLAYER_ENTRIES: usize = MAX_SUBLAYERS - 1;

/// Largest value of the 6-bit `num_bytes_constraint_info` field.
const MAX_CONSTRAINT_INFO_BYTES: usize = 0x3F;

/// Profile, tier and level record of a VVC decoder configuration record.
///
/// ISO/IEC 14496-15 - 11.2.4.2.2 (`VvcPTLRecord`)
#[derive(Debug, Clone, PartialEq)]
pub struct VvcPtlRecord {
    /// Matches the [`general_profile_idc`](crate::ProfileTierLevel::general_profile_idc) field as defined in ISO/IEC 23090-3.
    pub general_profile_idc: u8,
    /// Matches the [`general_tier_flag`](crate::ProfileTierLevel::general_tier_flag) field as defined in ISO/IEC 23090-3.
    pub general_tier_flag: bool,
    /// Matches the [`general_level_idc`](crate::ProfileTierLevel::general_level_idc) field as defined in ISO/IEC 23090-3.
    pub general_level_idc: u8,
    /// Matches `ptl_frame_only_constraint_flag` as defined in ISO/IEC 23090-3.
    pub ptl_frame_only_constraint_flag: bool,
    /// Matches `ptl_multilayer_enabled_flag` as defined in ISO/IEC 23090-3.
    pub ptl_multilayer_enabled_flag: bool,
    /// The `general_constraint_info` bytes, `num_bytes_constraint_info` is their length.
    ///
    /// The record stores `8 * num_bytes_constraint_info - 2` bits after the two
    /// flags above, so the last two bits of this buffer are not serialized.
    pub general_constraint_info: Vec<u8>,
    /// `ptl_sublayer_level_present_flag[i]`, only the first `num_sublayers - 1`
    /// entries are meaningful.
    pub ptl_sublayer_level_present_flags: [bool; SUBLAYER_ENTRIES],
    /// `sublayer_level_idc[i]`, only the first `num_sublayers - 1` entries are
    /// meaningful.
    pub sublayer_level_idcs: [u8; SUBLAYER_ENTRIES],
    /// `general_sub_profile_idc[j]`
    pub general_sub_profile_idcs: Vec<u32>,
}

impl Default for VvcPtlRecord {
    fn default() -> Self {
        Self {
            general_profile_idc: 0,
            general_tier_flag: false,
            general_level_idc: 0,
            ptl_frame_only_constraint_flag: false,
            ptl_multilayer_enabled_flag: false,
            general_constraint_info: vec![0],
            ptl_sublayer_level_present_flags: [false; SUBLAYER_ENTRIES],
            sublayer_level_idcs: [0; SUBLAYER_ENTRIES],
            general_sub_profile_idcs: Vec::new(),
        }
    }
}

impl VvcPtlRecord {
    /// Demuxes a [`VvcPtlRecord`] for a stream with `num_sublayers` sublayers.
    pub fn demux<R: io::Read>(bit_reader: &mut BitReader<R>, num_sublayers: u8) -> io::Result<Self> {
        bit_reader.read_bits(2)?; // reserved
        let num_bytes_constraint_info = bit_reader.read_bits(6)? as usize;
        if num_bytes_constraint_info == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "num_bytes_constraint_info must not be 0",
            ));
        }

        let general_profile_idc = bit_reader.read_bits(7)? as u8;
        let general_tier_flag = bit_reader.read_bit()?;
        let general_level_idc = bit_reader.read_u8()?;
        let ptl_frame_only_constraint_flag = bit_reader.read_bit()?;
        let ptl_multilayer_enabled_flag = bit_reader.read_bit()?;

        let mut general_constraint_info = vec![0; num_bytes_constraint_info];
        let constraint_bits = num_bytes_constraint_info * 8 - 2;
        for i in 0..constraint_bits {
            if bit_reader.read_bit()? {
                general_constraint_info[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let mut ptl_sublayer_level_present_flags = [false; SUBLAYER_ENTRIES];
        let mut sublayer_level_idcs = [0; SUBLAYER_ENTRIES];
        let entries = sublayer_entries(num_sublayers);

        if num_sublayers > 1 {
            for i in (0..entries).rev() {
                ptl_sublayer_level_present_flags[i] = bit_reader.read_bit()?;
            }
            bit_reader.align()?; // ptl_reserved_zero_bit
        }

        for i in (0..entries).rev() {
            if ptl_sublayer_level_present_flags[i] {
                sublayer_level_idcs[i] = bit_reader.read_u8()?;
            }
        }

        let num_sub_profiles = bit_reader.read_u8()?;
        let mut general_sub_profile_idcs = Vec::with_capacity(num_sub_profiles as usize);
        for _ in 0..num_sub_profiles {
            general_sub_profile_idcs.push(bit_reader.read_u32::<BigEndian>()?);
        }

        Ok(Self {
            general_profile_idc,
            general_tier_flag,
            general_level_idc,
            ptl_frame_only_constraint_flag,
            ptl_multilayer_enabled_flag,
            general_constraint_info,
            ptl_sublayer_level_present_flags,
            sublayer_level_idcs,
            general_sub_profile_idcs,
        })
    }

    /// Returns the serialized size in bytes for a stream with `num_sublayers` sublayers.
    pub fn size(&self, num_sublayers: u8) -> u64 {
        let entries = sublayer_entries(num_sublayers);

        1 // reserved, num_bytes_constraint_info
        + 1 // general_profile_idc, general_tier_flag
        + 1 // general_level_idc
        + self.general_constraint_info.len() as u64 // flags, general_constraint_info
        + if num_sublayers > 1 { 1 } else { 0 } // ptl_sublayer_level_present_flag, reserved
        + self.ptl_sublayer_level_present_flags[..entries].iter().filter(|present| **present).count() as u64
        + 1 // num_sub_profiles
        + 4 * self.general_sub_profile_idcs.len() as u64
    }

    /// Checks that every field fits its serialized width.
    pub fn validate(&self) -> io::Result<()> {
        let num_bytes = self.general_constraint_info.len();
        if num_bytes == 0 || num_bytes > MAX_CONSTRAINT_INFO_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("num_bytes_constraint_info out of range [1, 63]: {num_bytes}"),
            ));
        }

        if self.general_profile_idc > 0x7F {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("general_profile_idc does not fit 7 bits: {}", self.general_profile_idc),
            ));
        }

        if self.general_sub_profile_idcs.len() > u8::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("too many sub profiles: {}", self.general_sub_profile_idcs.len()),
            ));
        }

        Ok(())
    }

    /// Muxes the [`VvcPtlRecord`] for a stream with `num_sublayers` sublayers.
    pub fn mux<W: io::Write>(&self, bit_writer: &mut BitWriter<W>, num_sublayers: u8) -> io::Result<()> {
        self.validate()?;

        let num_bytes = self.general_constraint_info.len();
        bit_writer.write_bits(0, 2)?; // reserved
        bit_writer.write_bits(num_bytes as u64, 6)?;

        bit_writer.write_bits(self.general_profile_idc as u64, 7)?;
        bit_writer.write_bit(self.general_tier_flag)?;
        bit_writer.write_u8(self.general_level_idc)?;

        bit_writer.write_bit(self.ptl_frame_only_constraint_flag)?;
        bit_writer.write_bit(self.ptl_multilayer_enabled_flag)?;
        bit_writer.write_bits_from_slice(&self.general_constraint_info, num_bytes as u64 * 8 - 2)?;

        let entries = sublayer_entries(num_sublayers);
        if num_sublayers > 1 {
            for i in (0..entries).rev() {
                bit_writer.write_bit(self.ptl_sublayer_level_present_flags[i])?;
            }
            bit_writer.align()?; // ptl_reserved_zero_bit
        }

        for i in (0..entries).rev() {
            if self.ptl_sublayer_level_present_flags[i] {
                bit_writer.write_u8(self.sublayer_level_idcs[i])?;
            }
        }

        bit_writer.write_u8(self.general_sub_profile_idcs.len() as u8)?;
        for sub_profile_idc in &self.general_sub_profile_idcs {
            bit_writer.write_u32::<BigEndian>(*sub_profile_idc)?;
        }

        Ok(())
    }
}

pub(crate) fn sublayer_entries(num_sublayers: u8) -> usize {
    (num_sublayers as usize).saturating_sub(1).min(SUBLAYER_ENTRIES)
}
