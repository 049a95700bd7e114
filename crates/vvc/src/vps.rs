use std::io;

use bytes_util::{BitReader, EmulationPreventionIo, range_check};
use expgolomb::BitReaderExpGolombExt;

use crate::error::{Result, VvcError};
use crate::hrd::{GeneralTimingHrdParameters, skip_ols_timing_hrd_parameters};
use crate::nal_unit_header::NALUnitHeader;
use crate::ptl::ProfileTierLevel;
use crate::NALUnitType;

/// Video parameter set.
///
/// Only the syntax up to the timing and HRD parameters is read. The fields
/// after the profile, tier and level structures are parsed to validate the
/// bitstream but not kept, apart from the derived OLS counts.
///
/// `video_parameter_set_rbsp()`
///
/// - ISO/IEC 23090-3 - 7.3.2.3
/// - ISO/IEC 23090-3 - 7.4.3.3
#[derive(Debug, Clone, PartialEq)]
pub struct VideoParameterSet {
    /// The NAL unit header.
    pub nal_unit_header: NALUnitHeader,
    /// Provides an identifier for the VPS for reference by other syntax elements.
    pub vps_video_parameter_set_id: u8,
    /// This value plus 1 specifies the number of layers specified by the VPS.
    pub vps_max_layers_minus1: u8,
    /// This value plus 1 specifies the maximum number of temporal sublayers
    /// that may be present in a layer.
    ///
    /// The value is in range \[0, 6\].
    pub vps_max_sublayers_minus1: u8,
    /// Equal to `true` when `vps_ptl_max_tid`, `vps_dpb_max_tid` and
    /// `vps_hrd_max_tid` are not present and inferred from
    /// `vps_max_sublayers_minus1`.
    pub vps_default_ptl_dpb_hrd_max_tid_flag: bool,
    /// Equal to `true` specifies that all layers are independently coded.
    pub vps_all_independent_layers_flag: bool,
    /// Equal to `true` specifies that each OLS contains only one layer.
    pub vps_each_layer_is_an_ols_flag: bool,
    /// Mode of deriving the OLSs, in range \[0, 2\].
    pub vps_ols_mode_idc: u8,
    /// `TotalNumOlss`, the number of output layer sets.
    pub total_num_olss: usize,
    /// `NumMultiLayerOlss`, the number of output layer sets with more than one layer.
    pub num_multi_layer_olss: usize,
    /// The `profile_tier_level()` structures, `vps_num_ptls_minus1 + 1` entries.
    ///
    /// The profile and tier of entries without `vps_pt_present_flag` are
    /// inferred from the previous entry.
    pub profile_tier_levels: Vec<ProfileTierLevel>,
    /// `vps_ptl_max_tid[i]` for each entry of [`profile_tier_levels`](Self::profile_tier_levels).
    pub vps_ptl_max_tids: Vec<u8>,
    /// Equal to `true` specifies that the timing and HRD parameters are present.
    pub vps_timing_hrd_params_present_flag: bool,
}

impl VideoParameterSet {
    /// Parses a VPS NAL unit, including its 2-byte header.
    pub fn parse(mut reader: impl io::Read) -> Result<Self> {
        let nal_unit_header = NALUnitHeader::parse(&mut reader)?;
        if nal_unit_header.nal_unit_type != NALUnitType::VpsNut {
            return Err(VvcError::invalid("nal_unit_type is not VPS_NUT"));
        }

        let mut bit_reader = BitReader::new(EmulationPreventionIo::new(reader));

        let vps_video_parameter_set_id = bit_reader.read_bits(4)? as u8;
        let vps_max_layers_minus1 = bit_reader.read_bits(6)? as u8;
        let vps_max_sublayers_minus1 = bit_reader.read_bits(3)? as u8;
        range_check!(vps_max_sublayers_minus1, 0, 6)?;

        let max_layers = vps_max_layers_minus1 as usize + 1;

        let mut vps_default_ptl_dpb_hrd_max_tid_flag = true;
        if vps_max_layers_minus1 > 0 && vps_max_sublayers_minus1 > 0 {
            vps_default_ptl_dpb_hrd_max_tid_flag = bit_reader.read_bit()?;
        }

        let mut vps_all_independent_layers_flag = true;
        if vps_max_layers_minus1 > 0 {
            vps_all_independent_layers_flag = bit_reader.read_bit()?;
        }

        // vps_direct_ref_layer_flag[i][j]
        let mut direct_ref_layer = vec![vec![false; max_layers]; max_layers];
        for (i, direct_refs) in direct_ref_layer.iter_mut().enumerate() {
            bit_reader.read_bits(6)?; // vps_layer_id[i]

            if i > 0 && !vps_all_independent_layers_flag {
                let vps_independent_layer_flag = bit_reader.read_bit()?;
                if !vps_independent_layer_flag {
                    let vps_max_tid_ref_present_flag = bit_reader.read_bit()?;
                    for direct_ref in direct_refs.iter_mut().take(i) {
                        *direct_ref = bit_reader.read_bit()?;
                        if vps_max_tid_ref_present_flag && *direct_ref {
                            bit_reader.read_bits(3)?; // vps_max_tid_il_ref_pics_plus1[i][j]
                        }
                    }
                }
            }
        }

        let mut vps_each_layer_is_an_ols_flag = vps_max_layers_minus1 == 0;
        let mut vps_ols_mode_idc = 2;
        let mut vps_num_output_layer_sets_minus2 = 0;
        let mut vps_ols_output_layer_flags = Vec::new();
        let mut vps_num_ptls_minus1 = 0;

        if vps_max_layers_minus1 > 0 {
            if vps_all_independent_layers_flag {
                vps_each_layer_is_an_ols_flag = bit_reader.read_bit()?;
            }

            if !vps_each_layer_is_an_ols_flag {
                if !vps_all_independent_layers_flag {
                    vps_ols_mode_idc = bit_reader.read_bits(2)? as u8;
                    range_check!(vps_ols_mode_idc, 0, 2)?;
                }

                if vps_ols_mode_idc == 2 {
                    vps_num_output_layer_sets_minus2 = bit_reader.read_bits(8)? as usize;
                    // index 0 is the OLS that only contains the base layer
                    vps_ols_output_layer_flags.push(vec![false; max_layers]);
                    for _ in 1..=vps_num_output_layer_sets_minus2 + 1 {
                        let mut flags = vec![false; max_layers];
                        for flag in flags.iter_mut() {
                            *flag = bit_reader.read_bit()?;
                        }
                        vps_ols_output_layer_flags.push(flags);
                    }
                }
            }

            vps_num_ptls_minus1 = bit_reader.read_bits(8)? as usize;
        }

        let num_layers_in_ols = num_layers_in_ols(
            max_layers,
            vps_each_layer_is_an_ols_flag,
            vps_ols_mode_idc,
            vps_num_output_layer_sets_minus2,
            &vps_ols_output_layer_flags,
            &direct_ref_layer,
        );
        let total_num_olss = num_layers_in_ols.len();
        let num_multi_layer_olss = num_layers_in_ols.iter().filter(|layers| **layers > 1).count();

        let num_ptls = vps_num_ptls_minus1 + 1;
        let mut vps_pt_present_flags = vec![true; num_ptls];
        let mut vps_ptl_max_tids = vec![vps_max_sublayers_minus1; num_ptls];
        for i in 0..num_ptls {
            if i > 0 {
                vps_pt_present_flags[i] = bit_reader.read_bit()?;
            }
            if !vps_default_ptl_dpb_hrd_max_tid_flag {
                vps_ptl_max_tids[i] = bit_reader.read_bits(3)? as u8;
                range_check!(vps_ptl_max_tids[i], 0, vps_max_sublayers_minus1)?;
            }
        }

        bit_reader.align()?; // vps_ptl_alignment_zero_bit

        let mut profile_tier_levels: Vec<ProfileTierLevel> = Vec::with_capacity(num_ptls);
        for i in 0..num_ptls {
            let mut ptl = ProfileTierLevel::parse(&mut bit_reader, vps_pt_present_flags[i], vps_ptl_max_tids[i])?;
            if let Some(previous) = profile_tier_levels.last().filter(|_| !vps_pt_present_flags[i]) {
                ptl.inherit_profile_tier(previous);
            }
            profile_tier_levels.push(ptl);
        }

        for _ in 0..total_num_olss {
            if vps_num_ptls_minus1 > 0 && num_ptls != total_num_olss {
                bit_reader.read_bits(8)?; // vps_ols_ptl_idx[i]
            }
        }

        let mut vps_timing_hrd_params_present_flag = false;

        if !vps_each_layer_is_an_ols_flag {
            let vps_num_dpb_params_minus1 = bit_reader.read_exp_golomb()?;
            range_check!(vps_num_dpb_params_minus1, 0, total_num_olss as u64)?;
            let vps_num_dpb_params = vps_num_dpb_params_minus1 as usize + 1;

            let mut vps_sublayer_dpb_params_present_flag = false;
            if vps_max_sublayers_minus1 > 0 {
                vps_sublayer_dpb_params_present_flag = bit_reader.read_bit()?;
            }

            for _ in 0..vps_num_dpb_params {
                let mut vps_dpb_max_tid = vps_max_sublayers_minus1;
                if !vps_default_ptl_dpb_hrd_max_tid_flag {
                    vps_dpb_max_tid = bit_reader.read_bits(3)? as u8;
                }
                skip_dpb_parameters(&mut bit_reader, vps_dpb_max_tid, vps_sublayer_dpb_params_present_flag)?;
            }

            for _ in 0..num_multi_layer_olss {
                bit_reader.skip_exp_golomb()?; // vps_ols_dpb_pic_width[i]
                bit_reader.skip_exp_golomb()?; // vps_ols_dpb_pic_height[i]
                bit_reader.read_bits(2)?; // vps_ols_dpb_chroma_format[i]
                bit_reader.skip_exp_golomb()?; // vps_ols_dpb_bitdepth_minus8[i]
                if vps_num_dpb_params > 1 && vps_num_dpb_params != num_multi_layer_olss {
                    bit_reader.skip_exp_golomb()?; // vps_ols_dpb_params_idx[i]
                }
            }

            vps_timing_hrd_params_present_flag = bit_reader.read_bit()?;
            if vps_timing_hrd_params_present_flag {
                let general = GeneralTimingHrdParameters::parse(&mut bit_reader)?;

                let mut vps_sublayer_cpb_params_present_flag = false;
                if vps_max_sublayers_minus1 > 0 {
                    vps_sublayer_cpb_params_present_flag = bit_reader.read_bit()?;
                }

                let vps_num_ols_timing_hrd_params_minus1 = bit_reader.read_exp_golomb()?;
                range_check!(vps_num_ols_timing_hrd_params_minus1, 0, num_multi_layer_olss as u64)?;

                for _ in 0..=vps_num_ols_timing_hrd_params_minus1 {
                    let mut vps_hrd_max_tid = vps_max_sublayers_minus1;
                    if !vps_default_ptl_dpb_hrd_max_tid_flag {
                        vps_hrd_max_tid = bit_reader.read_bits(3)? as u8;
                    }
                    let first_sub_layer = if vps_sublayer_cpb_params_present_flag {
                        0
                    } else {
                        vps_hrd_max_tid
                    };
                    skip_ols_timing_hrd_parameters(&mut bit_reader, &general, first_sub_layer, vps_hrd_max_tid)?;
                }

                if vps_num_ols_timing_hrd_params_minus1 > 0
                    && vps_num_ols_timing_hrd_params_minus1 as usize + 1 != num_multi_layer_olss
                {
                    for _ in 0..num_multi_layer_olss {
                        bit_reader.skip_exp_golomb()?; // vps_ols_timing_hrd_idx[i]
                    }
                }
            }
        }

        Ok(Self {
            nal_unit_header,
            vps_video_parameter_set_id,
            vps_max_layers_minus1,
            vps_max_sublayers_minus1,
            vps_default_ptl_dpb_hrd_max_tid_flag,
            vps_all_independent_layers_flag,
            vps_each_layer_is_an_ols_flag,
            vps_ols_mode_idc,
            total_num_olss,
            num_multi_layer_olss,
            profile_tier_levels,
            vps_ptl_max_tids,
            vps_timing_hrd_params_present_flag,
        })
    }
}

/// Derives `NumLayersInOls[i]` for every OLS, the length of the result is `TotalNumOlss`.
///
/// ISO/IEC 23090-3 - 7.4.3.3, equations 38 and 39.
fn num_layers_in_ols(
    max_layers: usize,
    each_layer_is_an_ols: bool,
    ols_mode_idc: u8,
    num_output_layer_sets_minus2: usize,
    ols_output_layer_flags: &[Vec<bool>],
    direct_ref_layer: &[Vec<bool>],
) -> Vec<usize> {
    if each_layer_is_an_ols {
        return vec![1; max_layers];
    }

    if ols_mode_idc != 2 {
        return (1..=max_layers).collect();
    }

    // dependencyFlag[i][j], layer j is a direct or indirect reference of layer i
    let mut dependency = vec![vec![false; max_layers]; max_layers];
    for i in 0..max_layers {
        for j in 0..max_layers {
            let depends = direct_ref_layer[i][j] || (0..i).any(|k| direct_ref_layer[i][k] && dependency[k][j]);
            dependency[i][j] = depends;
        }
    }

    let total_num_olss = num_output_layer_sets_minus2 + 2;
    let mut num_layers = vec![1; total_num_olss];
    for (i, layers) in num_layers.iter_mut().enumerate().skip(1) {
        let Some(output_flags) = ols_output_layer_flags.get(i) else {
            continue;
        };

        let mut included = vec![false; max_layers];
        for (k, output) in output_flags.iter().enumerate() {
            if *output {
                included[k] = true;
                for (j, depends) in dependency[k].iter().enumerate() {
                    included[j] |= *depends;
                }
            }
        }

        *layers = included.iter().filter(|included| **included).count();
    }

    num_layers
}

/// Reads past `dpb_parameters(MaxSubLayersMinus1, subLayerInfoFlag)`.
///
/// ISO/IEC 23090-3 - 7.3.4
fn skip_dpb_parameters<R: io::Read>(
    bit_reader: &mut BitReader<R>,
    max_sub_layers_minus1: u8,
    sub_layer_info_flag: bool,
) -> io::Result<()> {
    let first = if sub_layer_info_flag { 0 } else { max_sub_layers_minus1 };
    for _ in first..=max_sub_layers_minus1 {
        bit_reader.skip_exp_golomb()?; // dpb_max_dec_pic_buffering_minus1[i]
        bit_reader.skip_exp_golomb()?; // dpb_max_num_reorder_pics[i]
        bit_reader.skip_exp_golomb()?; // dpb_max_latency_increase_plus1[i]
    }

    Ok(())
}
