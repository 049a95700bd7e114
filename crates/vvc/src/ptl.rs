use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes_util::{BitReader, BitWriter, range_check};

/// Maximum number of temporal sublayers.
pub const MAX_SUBLAYERS: usize = 7;

/// Number of constraint flag bits in `general_constraints_info()` when
/// `gci_present_flag` is set, excluding the reserved bits.
const GCI_FLAG_BITS: u8 = 71;

/// Profile, tier and level.
///
/// `profile_tier_level(profileTierPresentFlag, MaxNumSubLayersMinus1)`
///
/// - ISO/IEC 23090-3 - 7.3.3.1
/// - ISO/IEC 23090-3 - 7.4.4.1
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTierLevel {
    /// Indicates a profile to which the OLS conforms as specified in Annex A.
    ///
    /// Zero (or inherited from the previous structure in a VPS) when the
    /// profile and tier are not present.
    pub general_profile_idc: u8,
    /// Specifies the tier context for the interpretation of `general_level_idc`.
    pub general_tier_flag: bool,
    /// Indicates a level to which the OLS conforms as specified in Annex A.
    pub general_level_idc: u8,
    /// Equal to `true` specifies that `sps_field_seq_flag` is equal to 0.
    pub ptl_frame_only_constraint_flag: bool,
    /// Equal to `true` specifies that the OLS may contain more than one layer.
    pub ptl_multilayer_enabled_flag: bool,
    /// `general_constraints_info()`, `None` when absent or when
    /// `gci_present_flag` is 0.
    pub general_constraints_info: Option<GeneralConstraintsInfo>,
    /// `ptl_sublayer_level_present_flag[i]` for `i` in `0..MaxNumSubLayersMinus1`.
    pub ptl_sublayer_level_present_flags: Vec<bool>,
    /// `sublayer_level_idc[i]` for `i` in `0..MaxNumSubLayersMinus1`.
    ///
    /// Entries whose presence flag is not set hold the inferred value: the level of
    /// the next higher sublayer, or `general_level_idc` for the highest one.
    pub sublayer_level_idcs: Vec<u8>,
    /// `general_sub_profile_idc[i]`.
    pub general_sub_profile_idcs: Vec<u32>,
}

impl ProfileTierLevel {
    /// Parses a `profile_tier_level()` structure.
    ///
    /// The reader must be positioned on a byte boundary of the RBSP, alignment
    /// inside the structure is relative to the start of the reader.
    pub fn parse<R: io::Read>(
        bit_reader: &mut BitReader<R>,
        profile_tier_present_flag: bool,
        max_num_sub_layers_minus1: u8,
    ) -> io::Result<Self> {
        range_check!(max_num_sub_layers_minus1, 0, MAX_SUBLAYERS as u8 - 1)?;
        let sublayers = max_num_sub_layers_minus1 as usize;

        let mut general_profile_idc = 0;
        let mut general_tier_flag = false;
        if profile_tier_present_flag {
            general_profile_idc = bit_reader.read_bits(7)? as u8;
            general_tier_flag = bit_reader.read_bit()?;
        }

        let general_level_idc = bit_reader.read_u8()?;
        let ptl_frame_only_constraint_flag = bit_reader.read_bit()?;
        let ptl_multilayer_enabled_flag = bit_reader.read_bit()?;

        let general_constraints_info = if profile_tier_present_flag {
            GeneralConstraintsInfo::parse(bit_reader)?
        } else {
            None
        };

        let mut ptl_sublayer_level_present_flags = vec![false; sublayers];
        for i in (0..sublayers).rev() {
            ptl_sublayer_level_present_flags[i] = bit_reader.read_bit()?;
        }

        bit_reader.align()?; // ptl_reserved_zero_bit

        let mut sublayer_level_idcs = vec![0; sublayers];
        for i in (0..sublayers).rev() {
            sublayer_level_idcs[i] = if ptl_sublayer_level_present_flags[i] {
                bit_reader.read_u8()?
            } else if i + 1 == sublayers {
                general_level_idc
            } else {
                sublayer_level_idcs[i + 1]
            };
        }

        let mut general_sub_profile_idcs = Vec::new();
        if profile_tier_present_flag {
            let ptl_num_sub_profiles = bit_reader.read_u8()?;
            general_sub_profile_idcs.reserve_exact(ptl_num_sub_profiles as usize);
            for _ in 0..ptl_num_sub_profiles {
                general_sub_profile_idcs.push(bit_reader.read_u32::<BigEndian>()?);
            }
        }

        Ok(ProfileTierLevel {
            general_profile_idc,
            general_tier_flag,
            general_level_idc,
            ptl_frame_only_constraint_flag,
            ptl_multilayer_enabled_flag,
            general_constraints_info,
            ptl_sublayer_level_present_flags,
            sublayer_level_idcs,
            general_sub_profile_idcs,
        })
    }

    /// Copies the fields that are inferred when `profileTierPresentFlag` is 0.
    ///
    /// ISO/IEC 23090-3 - 7.4.4.1
    pub(crate) fn inherit_profile_tier(&mut self, previous: &ProfileTierLevel) {
        self.general_profile_idc = previous.general_profile_idc;
        self.general_tier_flag = previous.general_tier_flag;
        self.general_constraints_info = previous.general_constraints_info.clone();
        self.general_sub_profile_idcs = previous.general_sub_profile_idcs.clone();
    }
}

/// General constraints information.
///
/// Only the flag bits are kept, the values of the reserved bits are skipped
/// and re-encoded as zero.
///
/// - ISO/IEC 23090-3 - 7.3.3.2
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralConstraintsInfo {
    /// The 71 constraint flag bits following `gci_present_flag`, right aligned.
    pub general_constraints: u128,
    /// `gci_num_reserved_bits`
    pub gci_num_reserved_bits: u8,
}

impl GeneralConstraintsInfo {
    /// Parses `general_constraints_info()` including the trailing alignment.
    ///
    /// Returns `None` if `gci_present_flag` is 0.
    pub fn parse<R: io::Read>(bit_reader: &mut BitReader<R>) -> io::Result<Option<Self>> {
        let gci_present_flag = bit_reader.read_bit()?;

        let info = if gci_present_flag {
            let high = bit_reader.read_bits(GCI_FLAG_BITS - 64)? as u128;
            let low = bit_reader.read_bits(64)? as u128;
            let gci_num_reserved_bits = bit_reader.read_u8()?;
            bit_reader.skip_bits(gci_num_reserved_bits as u64)?; // gci_reserved_zero_bit

            Some(Self {
                general_constraints: (high << 64) | low,
                gci_num_reserved_bits,
            })
        } else {
            None
        };

        bit_reader.align()?; // gci_alignment_zero_bit

        Ok(info)
    }

    /// Size in bytes of the re-encoded structure, `10 + ceil(gci_num_reserved_bits / 8)`.
    pub fn encoded_len(&self) -> usize {
        10 + (self.gci_num_reserved_bits as usize).div_ceil(8)
    }

    /// Re-encodes the structure: `gci_present_flag` (1), the constraint
    /// flags, `gci_num_reserved_bits`, zeroed reserved bits and alignment.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bit_writer = BitWriter::new(Vec::with_capacity(self.encoded_len()));

        bit_writer.write_bit(true)?;
        bit_writer.write_bits((self.general_constraints >> 64) as u64 & 0x7F, GCI_FLAG_BITS - 64)?;
        bit_writer.write_bits(self.general_constraints as u64, 64)?;
        bit_writer.write_bits(self.gci_num_reserved_bits as u64, 8)?;
        for _ in 0..self.gci_num_reserved_bits {
            bit_writer.write_bit(false)?;
        }

        bit_writer.finish()
    }
}
