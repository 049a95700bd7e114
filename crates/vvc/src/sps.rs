use std::io;

use bytes_util::{BitReader, EmulationPreventionIo, range_check};
use expgolomb::BitReaderExpGolombExt;

use crate::NALUnitType;
use crate::error::{Result, VvcError};
use crate::nal_unit_header::NALUnitHeader;
use crate::ptl::ProfileTierLevel;

/// Sequence parameter set.
///
/// Parsing stops after `sps_bitdepth_minus8`, the remaining syntax is not
/// needed for a decoder configuration record.
///
/// `seq_parameter_set_rbsp()`
///
/// - ISO/IEC 23090-3 - 7.3.2.4
/// - ISO/IEC 23090-3 - 7.4.3.4
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceParameterSet {
    /// The NAL unit header.
    pub nal_unit_header: NALUnitHeader,
    /// Provides an identifier for the SPS for reference by other syntax elements.
    pub sps_seq_parameter_set_id: u8,
    /// The `vps_video_parameter_set_id` of the VPS referred to by the SPS, 0 if
    /// the SPS does not refer to a VPS.
    pub sps_video_parameter_set_id: u8,
    /// This value plus 1 specifies the maximum number of temporal sublayers
    /// that may be present in each CLVS referring to the SPS.
    ///
    /// The value is in range \[0, 6\].
    pub sps_max_sublayers_minus1: u8,
    /// Specifies the chroma sampling relative to the luma sampling.
    ///
    /// The value is in range \[0, 3\].
    pub sps_chroma_format_idc: u8,
    /// This value plus 5 specifies the luma coding tree block size of each CTU.
    ///
    /// The value is in range \[0, 2\].
    pub sps_log2_ctu_size_minus5: u8,
    /// The `profile_tier_level()` structure, present when
    /// `sps_ptl_dpb_hrd_params_present_flag` is set.
    pub profile_tier_level: Option<ProfileTierLevel>,
    /// Specifies the maximum width, in units of luma samples, of each decoded picture referring to the SPS.
    pub sps_pic_width_max_in_luma_samples: u64,
    /// Specifies the maximum height, in units of luma samples, of each decoded picture referring to the SPS.
    pub sps_pic_height_max_in_luma_samples: u64,
    /// This value plus 1 specifies the number of subpictures in each picture,
    /// 0 when `sps_subpic_info_present_flag` is not set.
    pub sps_num_subpics_minus1: u16,
    /// Specifies the bit depth of the samples of the luma and chroma arrays minus 8.
    ///
    /// The value is in range \[0, 8\].
    pub sps_bitdepth_minus8: u8,
}

impl SequenceParameterSet {
    /// Parses an SPS NAL unit, including its 2-byte header.
    pub fn parse(mut reader: impl io::Read) -> Result<Self> {
        let nal_unit_header = NALUnitHeader::parse(&mut reader)?;
        if nal_unit_header.nal_unit_type != NALUnitType::SpsNut {
            return Err(VvcError::invalid("nal_unit_type is not SPS_NUT"));
        }

        let mut bit_reader = BitReader::new(EmulationPreventionIo::new(reader));

        let sps_seq_parameter_set_id = bit_reader.read_bits(4)? as u8;
        let sps_video_parameter_set_id = bit_reader.read_bits(4)? as u8;

        let sps_max_sublayers_minus1 = bit_reader.read_bits(3)? as u8;
        range_check!(sps_max_sublayers_minus1, 0, 6)?;

        let sps_chroma_format_idc = bit_reader.read_bits(2)? as u8;

        let sps_log2_ctu_size_minus5 = bit_reader.read_bits(2)? as u8;
        range_check!(sps_log2_ctu_size_minus5, 0, 2)?;

        let sps_ptl_dpb_hrd_params_present_flag = bit_reader.read_bit()?;
        let profile_tier_level = if sps_ptl_dpb_hrd_params_present_flag {
            Some(ProfileTierLevel::parse(&mut bit_reader, true, sps_max_sublayers_minus1)?)
        } else {
            None
        };

        bit_reader.read_bit()?; // sps_gdr_enabled_flag
        let sps_ref_pic_resampling_enabled_flag = bit_reader.read_bit()?;
        if sps_ref_pic_resampling_enabled_flag {
            bit_reader.read_bit()?; // sps_res_change_in_clvs_allowed_flag
        }

        let sps_pic_width_max_in_luma_samples = bit_reader.read_exp_golomb()?;
        let sps_pic_height_max_in_luma_samples = bit_reader.read_exp_golomb()?;

        let sps_conformance_window_flag = bit_reader.read_bit()?;
        if sps_conformance_window_flag {
            bit_reader.skip_exp_golomb()?; // sps_conf_win_left_offset
            bit_reader.skip_exp_golomb()?; // sps_conf_win_right_offset
            bit_reader.skip_exp_golomb()?; // sps_conf_win_top_offset
            bit_reader.skip_exp_golomb()?; // sps_conf_win_bottom_offset
        }

        let mut sps_num_subpics_minus1 = 0;
        let sps_subpic_info_present_flag = bit_reader.read_bit()?;
        if sps_subpic_info_present_flag {
            let ctb_log2_size_y = sps_log2_ctu_size_minus5 + 5;
            sps_num_subpics_minus1 = skip_subpic_info(
                &mut bit_reader,
                ctb_log2_size_y,
                sps_pic_width_max_in_luma_samples,
                sps_pic_height_max_in_luma_samples,
            )?;
        }

        let sps_bitdepth_minus8 = bit_reader.read_exp_golomb()?;
        range_check!(sps_bitdepth_minus8, 0, 8)?;

        Ok(Self {
            nal_unit_header,
            sps_seq_parameter_set_id,
            sps_video_parameter_set_id,
            sps_max_sublayers_minus1,
            sps_chroma_format_idc,
            sps_log2_ctu_size_minus5,
            profile_tier_level,
            sps_pic_width_max_in_luma_samples,
            sps_pic_height_max_in_luma_samples,
            sps_num_subpics_minus1,
            sps_bitdepth_minus8: sps_bitdepth_minus8 as u8,
        })
    }

    /// Returns `CtbSizeY`, the luma coding tree block size.
    ///
    /// ISO/IEC 23090-3 - 7.4.3.4, equation 34.
    pub fn ctb_size_y(&self) -> u64 {
        1 << (self.sps_log2_ctu_size_minus5 + 5)
    }
}

/// Reads past the subpicture layout and returns `sps_num_subpics_minus1`.
fn skip_subpic_info<R: io::Read>(
    bit_reader: &mut BitReader<R>,
    ctb_log2_size_y: u8,
    pic_width: u64,
    pic_height: u64,
) -> io::Result<u16> {
    let ctb_size_y = 1u64 << ctb_log2_size_y;

    let sps_num_subpics_minus1 = bit_reader.read_exp_golomb()?;
    range_check!(sps_num_subpics_minus1, 0, 599)?;
    let num_subpics_minus1 = sps_num_subpics_minus1 as usize;

    let mut sps_independent_subpics_flag = true;
    let mut sps_subpic_same_size_flag = false;
    if num_subpics_minus1 > 0 {
        sps_independent_subpics_flag = bit_reader.read_bit()?;
        sps_subpic_same_size_flag = bit_reader.read_bit()?;
    }

    let x_bits = ceil_log2(pic_width.div_ceil(ctb_size_y));
    let y_bits = ceil_log2(pic_height.div_ceil(ctb_size_y));
    let wide = pic_width > ctb_size_y;
    let tall = pic_height > ctb_size_y;

    if num_subpics_minus1 > 0 {
        for i in 0..=num_subpics_minus1 {
            if !sps_subpic_same_size_flag || i == 0 {
                if i > 0 && wide {
                    bit_reader.read_bits(x_bits)?; // sps_subpic_ctu_top_left_x[i]
                }
                if i > 0 && tall {
                    bit_reader.read_bits(y_bits)?; // sps_subpic_ctu_top_left_y[i]
                }
                if i < num_subpics_minus1 && wide {
                    bit_reader.read_bits(x_bits)?; // sps_subpic_width_minus1[i]
                }
                if i < num_subpics_minus1 && tall {
                    bit_reader.read_bits(y_bits)?; // sps_subpic_height_minus1[i]
                }
            }

            if !sps_independent_subpics_flag {
                bit_reader.read_bit()?; // sps_subpic_treated_as_pic_flag[i]
                bit_reader.read_bit()?; // sps_loop_filter_across_subpic_enabled_flag[i]
            }
        }
    }

    let sps_subpic_id_len_minus1 = bit_reader.read_exp_golomb()?;
    range_check!(sps_subpic_id_len_minus1, 0, 15)?;

    let sps_subpic_id_mapping_explicitly_signalled_flag = bit_reader.read_bit()?;
    if sps_subpic_id_mapping_explicitly_signalled_flag {
        let sps_subpic_id_mapping_present_flag = bit_reader.read_bit()?;
        if sps_subpic_id_mapping_present_flag {
            bit_reader.skip_bits((num_subpics_minus1 as u64 + 1) * (sps_subpic_id_len_minus1 + 1))?; // sps_subpic_id[i]
        }
    }

    Ok(sps_num_subpics_minus1 as u16)
}

/// `Ceil(Log2(n))`, 0 for `n <= 1`.
fn ceil_log2(n: u64) -> u8 {
    if n <= 1 {
        0
    } else {
        (u64::BITS - (n - 1).leading_zeros()) as u8
    }
}
