use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes_util::BitReader;
use expgolomb::BitReaderExpGolombExt;

use crate::error::{Result, VvcError};

/// Largest `hrd_cpb_cnt_minus1` allowed by ISO/IEC 23090-3 - 7.4.6.1.
const MAX_CPB_CNT_MINUS1: u64 = 31;

/// General timing and HRD parameters.
///
/// Only the fields that steer the parsing of [`skip_ols_timing_hrd_parameters`]
/// and the timing fields are kept.
///
/// - ISO/IEC 23090-3 - 7.3.5.1
/// - ISO/IEC 23090-3 - 7.4.6.1
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralTimingHrdParameters {
    /// The number of time units of a clock operating at `time_scale` Hz that
    /// corresponds to one clock tick.
    pub num_units_in_tick: u32,
    /// The number of time units that pass in one second.
    pub time_scale: u32,
    /// Specifies that NAL HRD parameters are present.
    pub general_nal_hrd_params_present_flag: bool,
    /// Specifies that VCL HRD parameters are present.
    pub general_vcl_hrd_params_present_flag: bool,
    /// Specifies that DU level HRD parameters are present.
    pub general_du_hrd_params_present_flag: bool,
    /// Number of alternative CPB delivery schedules minus 1, in range \[0, 31\].
    pub hrd_cpb_cnt_minus1: u8,
}

impl GeneralTimingHrdParameters {
    /// Parses `general_timing_hrd_parameters()`.
    ///
    /// Fails with [`VvcError::UnsupportedCpbCount`] if `hrd_cpb_cnt_minus1` is above 31.
    pub fn parse<R: io::Read>(bit_reader: &mut BitReader<R>) -> Result<Self> {
        let num_units_in_tick = bit_reader.read_u32::<BigEndian>()?;
        let time_scale = bit_reader.read_u32::<BigEndian>()?;
        let general_nal_hrd_params_present_flag = bit_reader.read_bit()?;
        let general_vcl_hrd_params_present_flag = bit_reader.read_bit()?;

        let mut general_du_hrd_params_present_flag = false;
        let mut hrd_cpb_cnt_minus1 = 0;

        if general_nal_hrd_params_present_flag || general_vcl_hrd_params_present_flag {
            bit_reader.read_bit()?; // general_same_pic_timing_in_all_ols_flag
            general_du_hrd_params_present_flag = bit_reader.read_bit()?;
            if general_du_hrd_params_present_flag {
                bit_reader.read_bits(8)?; // tick_divisor_minus2
            }

            bit_reader.read_bits(4)?; // bit_rate_scale
            bit_reader.read_bits(4)?; // cpb_size_scale
            if general_du_hrd_params_present_flag {
                bit_reader.read_bits(4)?; // cpb_size_du_scale
            }

            let cpb_cnt_minus1 = bit_reader.read_exp_golomb()?;
            if cpb_cnt_minus1 > MAX_CPB_CNT_MINUS1 {
                return Err(VvcError::UnsupportedCpbCount(cpb_cnt_minus1));
            }
            hrd_cpb_cnt_minus1 = cpb_cnt_minus1 as u8;
        }

        Ok(Self {
            num_units_in_tick,
            time_scale,
            general_nal_hrd_params_present_flag,
            general_vcl_hrd_params_present_flag,
            general_du_hrd_params_present_flag,
            hrd_cpb_cnt_minus1,
        })
    }

    fn hrd_params_present(&self) -> bool {
        self.general_nal_hrd_params_present_flag || self.general_vcl_hrd_params_present_flag
    }
}

/// Reads past `ols_timing_hrd_parameters(firstSubLayer, MaxSubLayersVal)`.
///
/// ISO/IEC 23090-3 - 7.3.5.2
pub fn skip_ols_timing_hrd_parameters<R: io::Read>(
    bit_reader: &mut BitReader<R>,
    general: &GeneralTimingHrdParameters,
    first_sub_layer: u8,
    max_sub_layers_val: u8,
) -> Result<()> {
    for _ in first_sub_layer..=max_sub_layers_val {
        let fixed_pic_rate_general_flag = bit_reader.read_bit()?;
        let fixed_pic_rate_within_cvs_flag = if fixed_pic_rate_general_flag {
            true
        } else {
            bit_reader.read_bit()?
        };

        if fixed_pic_rate_within_cvs_flag {
            bit_reader.skip_exp_golomb()?; // elemental_duration_in_tc_minus1
        } else if general.hrd_params_present() && general.hrd_cpb_cnt_minus1 == 0 {
            bit_reader.read_bit()?; // low_delay_hrd_flag
        }

        if general.general_nal_hrd_params_present_flag {
            skip_sublayer_hrd_parameters(bit_reader, general)?;
        }
        if general.general_vcl_hrd_params_present_flag {
            skip_sublayer_hrd_parameters(bit_reader, general)?;
        }
    }

    Ok(())
}

/// ISO/IEC 23090-3 - 7.3.5.3
fn skip_sublayer_hrd_parameters<R: io::Read>(
    bit_reader: &mut BitReader<R>,
    general: &GeneralTimingHrdParameters,
) -> Result<()> {
    for _ in 0..=general.hrd_cpb_cnt_minus1 {
        bit_reader.skip_exp_golomb()?; // bit_rate_value_minus1
        bit_reader.skip_exp_golomb()?; // cpb_size_value_minus1
        if general.general_du_hrd_params_present_flag {
            bit_reader.skip_exp_golomb()?; // cpb_size_du_value_minus1
            bit_reader.skip_exp_golomb()?; // bit_rate_du_value_minus1
        }
        bit_reader.read_bit()?; // cbr_flag
    }

    Ok(())
}
