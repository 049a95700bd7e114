use bytes::Bytes;
use tracing::trace;

use crate::config::{NaluArray, VVCDecoderConfigurationRecord, VvcPtlInfo};
use crate::error::{Result, VvcError};
use crate::nal_unit_header::NALUnitHeader;
use crate::pps::PictureParameterSet;
use crate::ptl_aggregator::PtlAggregator;
use crate::sps::SequenceParameterSet;
use crate::vps::VideoParameterSet;
use crate::{ConstantFrameRate, ConversionConfig, LengthSize, NALUnitType};

/// `constant_frame_rate` written into every record.
///
/// The frame rate cannot be derived from the parameter sets alone, so this is
/// a fixed policy value and not a claim about the stream. Readers must treat
/// it like [`RECORD_AVG_FRAME_RATE`], as unspecified.
pub const RECORD_CONSTANT_FRAME_RATE: ConstantFrameRate = ConstantFrameRate::Constant;

/// `avg_frame_rate` written into every record, 0 means unspecified.
pub const RECORD_AVG_FRAME_RATE: u16 = 0;

/// Collects the OPI, VPS, SPS, PPS and SEI NAL units of a stream and
/// accumulates the stream properties needed for a
/// [`VVCDecoderConfigurationRecord`].
#[derive(Debug, Clone)]
pub struct ConfigRecordBuilder {
    length_size: LengthSize,
    ps_array_completeness: bool,
    num_sublayers: u8,
    chroma_format_idc: u8,
    bit_depth_minus8: u8,
    max_picture_width: u64,
    max_picture_height: u64,
    ptl: PtlAggregator,
    arrays: Vec<NaluArray>,
}

impl Default for ConfigRecordBuilder {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

impl ConfigRecordBuilder {
    /// Creates an empty builder.
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            length_size: config.length_size,
            ps_array_completeness: config.ps_array_completeness,
            num_sublayers: 0,
            chroma_format_idc: 0,
            bit_depth_minus8: 0,
            max_picture_width: 0,
            max_picture_height: 0,
            ptl: PtlAggregator::new(),
            arrays: Vec::new(),
        }
    }

    /// The number of temporal sublayers seen so far.
    pub fn num_sublayers(&self) -> u8 {
        self.num_sublayers
    }

    /// The NAL unit arrays collected so far, in order of first appearance.
    pub fn arrays(&self) -> &[NaluArray] {
        &self.arrays
    }

    /// Adds a raw NAL unit, header included and start code removed.
    ///
    /// Parameter sets are parsed before the NAL unit is stored, a NAL unit
    /// that fails to parse leaves the builder untouched apart from the
    /// values folded in by earlier parameter sets.
    pub fn add_nal_unit(&mut self, nal: &[u8]) -> Result<()> {
        let header = NALUnitHeader::parse(nal)?;
        let nal_unit_type = header.nal_unit_type;

        if !nal_unit_type.is_record_candidate() {
            return Err(VvcError::invalid(format!(
                "{nal_unit_type:?} cannot be stored in a decoder configuration record"
            )));
        }

        trace!(?nal_unit_type, size = nal.len(), "adding NAL unit");

        match nal_unit_type {
            NALUnitType::VpsNut => self.parse_vps(nal)?,
            NALUnitType::SpsNut => self.parse_sps(nal)?,
            NALUnitType::PpsNut => {
                PictureParameterSet::parse(nal)?;
            }
            // OPI and SEI payloads are stored as is
            _ => {}
        }

        self.push(nal_unit_type, nal)
    }

    fn parse_vps(&mut self, nal: &[u8]) -> Result<()> {
        let vps = VideoParameterSet::parse(nal)?;

        self.num_sublayers = self.num_sublayers.max(vps.vps_max_sublayers_minus1 + 1);
        for ptl in &vps.profile_tier_levels {
            self.ptl.merge(ptl, self.num_sublayers)?;
        }

        Ok(())
    }

    fn parse_sps(&mut self, nal: &[u8]) -> Result<()> {
        let sps = SequenceParameterSet::parse(nal)?;

        self.num_sublayers = self.num_sublayers.max(sps.sps_max_sublayers_minus1 + 1);
        if let Some(ptl) = &sps.profile_tier_level {
            self.ptl.merge(ptl, self.num_sublayers)?;
        }

        self.max_picture_width = self.max_picture_width.max(sps.sps_pic_width_max_in_luma_samples);
        self.max_picture_height = self.max_picture_height.max(sps.sps_pic_height_max_in_luma_samples);
        self.chroma_format_idc = sps.sps_chroma_format_idc;
        self.bit_depth_minus8 = sps.sps_bitdepth_minus8;

        Ok(())
    }

    fn push(&mut self, nal_unit_type: NALUnitType, nal: &[u8]) -> Result<()> {
        let mut data = Vec::new();
        data.try_reserve_exact(nal.len()).map_err(|_| VvcError::AllocationFailure)?;
        data.extend_from_slice(nal);

        let index = match self.arrays.iter().position(|array| array.nal_unit_type == nal_unit_type) {
            Some(index) => index,
            None => {
                self.arrays.try_reserve(1).map_err(|_| VvcError::AllocationFailure)?;
                self.arrays.push(NaluArray {
                    array_completeness: nal_unit_type.is_parameter_set() && self.ps_array_completeness,
                    nal_unit_type,
                    nalus: Vec::new(),
                });
                self.arrays.len() - 1
            }
        };

        let array = &mut self.arrays[index];
        array.nalus.try_reserve(1).map_err(|_| VvcError::AllocationFailure)?;
        array.nalus.push(Bytes::from(data));

        Ok(())
    }

    /// Finishes the record.
    ///
    /// The record is not validated here, [`VVCDecoderConfigurationRecord::mux`]
    /// does that before writing.
    pub fn finish(self) -> Result<VVCDecoderConfigurationRecord> {
        let max_picture_width = u16::try_from(self.max_picture_width).map_err(|_| {
            VvcError::invalid(format!("max_picture_width does not fit 16 bits: {}", self.max_picture_width))
        })?;
        let max_picture_height = u16::try_from(self.max_picture_height).map_err(|_| {
            VvcError::invalid(format!("max_picture_height does not fit 16 bits: {}", self.max_picture_height))
        })?;

        Ok(VVCDecoderConfigurationRecord {
            length_size_minus_one: self.length_size.length_size_minus_one(),
            ptl: Some(VvcPtlInfo {
                ols_idx: 0,
                num_sublayers: self.num_sublayers,
                constant_frame_rate: RECORD_CONSTANT_FRAME_RATE,
                chroma_format_idc: self.chroma_format_idc,
                bit_depth_minus8: self.bit_depth_minus8,
                native_ptl: self.ptl.into_record(),
                max_picture_width,
                max_picture_height,
                avg_frame_rate: RECORD_AVG_FRAME_RATE,
            }),
            arrays: self.arrays,
        })
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::{ConfigRecordBuilder, RECORD_AVG_FRAME_RATE, RECORD_CONSTANT_FRAME_RATE};
    use crate::ptl::tests::PtlSpec;
    use crate::sps::tests::SpsSpec;
    use crate::test_utils::init_test_tracing;
    use crate::vps::tests::single_layer_vps;
    use crate::{ConstantFrameRate, ConversionConfig, NALUnitType, VvcError};

    const PPS: &[u8] = &[0x00, 0x81, 0xC0];

    fn sps(width: u64, height: u64) -> Vec<u8> {
        SpsSpec::new(width, height).to_nal()
    }

    #[test]
    fn test_max_picture_size_any_order() {
        init_test_tracing!();

        for order in [[(1920, 1080), (3840, 2160)], [(3840, 2160), (1920, 1080)]] {
            let mut builder = ConfigRecordBuilder::default();
            for (width, height) in order {
                builder.add_nal_unit(&sps(width, height)).unwrap();
            }

            let record = builder.finish().unwrap();
            let ptl = record.ptl.unwrap();
            assert_eq!(ptl.max_picture_width, 3840);
            assert_eq!(ptl.max_picture_height, 2160);
        }
    }

    #[test]
    fn test_array_grouping() {
        let first = sps(1280, 720);
        let second = sps(1920, 1080);
        let third = sps(640, 480);

        let mut builder = ConfigRecordBuilder::default();
        for nal in [first.as_slice(), second.as_slice(), PPS, third.as_slice()] {
            builder.add_nal_unit(nal).unwrap();
        }

        let arrays = builder.arrays();
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays[0].nal_unit_type, NALUnitType::SpsNut);
        assert_eq!(arrays[0].nalus, vec![first.clone(), second.clone(), third.clone()]);
        assert_eq!(arrays[1].nal_unit_type, NALUnitType::PpsNut);
        assert_eq!(arrays[1].nalus.len(), 1);
        assert!(arrays.iter().all(|array| array.array_completeness));
    }

    #[test]
    fn test_array_completeness() {
        let config = ConversionConfig::builder().ps_array_completeness(false).build();
        let mut builder = ConfigRecordBuilder::new(&config);
        builder.add_nal_unit(PPS).unwrap();
        assert!(!builder.arrays()[0].array_completeness);

        // SEI arrays are never complete
        let mut builder = ConfigRecordBuilder::default();
        builder.add_nal_unit(&[0x00, 0xB9, 0x01, 0x02]).unwrap();
        assert_eq!(builder.arrays()[0].nal_unit_type, NALUnitType::PrefixSeiNut);
        assert!(!builder.arrays()[0].array_completeness);
    }

    #[test]
    fn test_no_sps_fails_without_output() {
        let vps = single_layer_vps(&PtlSpec::new(1, false, 60), 0);

        let mut builder = ConfigRecordBuilder::default();
        builder.add_nal_unit(&vps).unwrap();
        builder.add_nal_unit(PPS).unwrap();

        let record = builder.finish().unwrap();
        let mut output = Vec::new();
        let err = record.mux(&mut output).unwrap_err();
        assert!(err.is_invalid_data());
        assert!(output.is_empty());
    }

    #[test]
    fn test_sublayers_fold_before_merge() {
        let mut spec = SpsSpec::new(1920, 1080);
        spec.max_sublayers_minus1 = 2;
        if let Some(ptl) = spec.ptl.as_mut() {
            ptl.sublayer_levels = vec![Some(30), None];
        }

        let mut builder = ConfigRecordBuilder::default();
        builder.add_nal_unit(&single_layer_vps(&PtlSpec::new(1, false, 60), 0)).unwrap();
        builder.add_nal_unit(&spec.to_nal()).unwrap();
        assert_eq!(builder.num_sublayers(), 3);

        let record = builder.finish().unwrap();
        let ptl = record.ptl.unwrap();
        assert_eq!(ptl.num_sublayers, 3);
        assert_eq!(ptl.native_ptl.ptl_sublayer_level_present_flags[..2], [true, false]);
        assert_eq!(ptl.native_ptl.sublayer_level_idcs[..2], [30, 60]);
    }

    #[test]
    fn test_rejects_other_types() {
        let mut builder = ConfigRecordBuilder::default();
        // IDR_W_RADL
        let err = builder.add_nal_unit(&[0x00, 0x39, 0x00]).unwrap_err();
        assert!(matches!(err, VvcError::InvalidData(_)));
        assert!(builder.arrays().is_empty());
    }

    #[test]
    fn test_parse_failure_is_not_stored() {
        let mut builder = ConfigRecordBuilder::default();
        // truncated SPS
        let err = builder.add_nal_unit(&[0x00, 0x79, 0x00]).unwrap_err();
        assert!(matches!(err, VvcError::OutOfData));
        assert!(builder.arrays().is_empty());
    }

    #[test]
    fn test_picture_too_large() {
        let mut builder = ConfigRecordBuilder::default();
        builder.add_nal_unit(&sps(70000, 1080)).unwrap();
        assert!(builder.finish().unwrap_err().is_invalid_data());
    }

    #[test]
    fn test_frame_rate_policy_values() {
        let mut builder = ConfigRecordBuilder::default();
        builder.add_nal_unit(&sps(1920, 1080)).unwrap();

        let ptl = builder.finish().unwrap().ptl.unwrap();
        assert_eq!(ptl.constant_frame_rate, RECORD_CONSTANT_FRAME_RATE);
        assert_eq!(ptl.constant_frame_rate as u8, 1);
        assert_eq!(ptl.constant_frame_rate, ConstantFrameRate::Constant);
        assert_eq!(ptl.avg_frame_rate, RECORD_AVG_FRAME_RATE);
        assert_eq!(ptl.avg_frame_rate, 0);
    }
}
