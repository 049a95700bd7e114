use byteorder::{BigEndian, WriteBytesExt};
use memchr::memmem;
use tracing::{debug, trace, warn};

use crate::builder::ConfigRecordBuilder;
use crate::config::VVCDecoderConfigurationRecord;
use crate::error::{Result, VvcError};
use crate::{ConversionConfig, LengthSize, NALUnitType};

const START_CODE: &[u8] = &[0x00, 0x00, 0x01];

/// Smallest input [`write_vvcc`] accepts.
const MIN_RECORD_INPUT: usize = 6;

/// Iterator over the NAL units of an Annex-B byte stream.
///
/// NAL units are yielded without their start code. A zero byte right before
/// a start code is taken as the first byte of a 4-byte start code. Bytes
/// before the first start code and empty NAL units are skipped.
#[derive(Debug, Clone)]
pub struct AnnexBNalIter<'a> {
    data: &'a [u8],
    finder: memmem::Finder<'static>,
    next_nal: Option<usize>,
}

impl<'a> AnnexBNalIter<'a> {
    /// Creates an iterator over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        let finder = memmem::Finder::new(START_CODE);
        let next_nal = finder.find(data).map(|pos| pos + START_CODE.len());

        Self { data, finder, next_nal }
    }
}

impl<'a> Iterator for AnnexBNalIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.next_nal?;

            let end = match self.finder.find(&self.data[start..]) {
                Some(pos) => {
                    self.next_nal = Some(start + pos + START_CODE.len());
                    let end = start + pos;
                    if pos > 0 && self.data[end - 1] == 0 { end - 1 } else { end }
                }
                None => {
                    self.next_nal = None;
                    self.data.len()
                }
            };

            if end > start {
                return Some(&self.data[start..end]);
            }
        }
    }
}

/// Returns `true` if `data` starts with a 3 or 4 byte start code.
pub fn has_start_code(data: &[u8]) -> bool {
    data.starts_with(START_CODE) || data.starts_with(&[0x00, 0x00, 0x00, 0x01])
}

/// A length-prefixed NAL unit stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LengthPrefixedStream {
    /// NAL units, each preceded by its big-endian length.
    pub data: Vec<u8>,
    /// Number of VPS, SPS and PPS NAL units that were dropped.
    pub ps_count: usize,
}

/// Converts an Annex-B stream into a length-prefixed stream.
///
/// With [`ConversionConfig::filter_parameter_sets`] VPS, SPS and PPS NAL units
/// are dropped and counted in [`LengthPrefixedStream::ps_count`].
pub fn annexb_to_length_prefixed(data: &[u8], config: &ConversionConfig) -> Result<LengthPrefixedStream> {
    let length_size = config.length_size;
    let mut stream = LengthPrefixedStream::default();

    for nal in AnnexBNalIter::new(data) {
        let nal_unit_type = NALUnitType::from_nal_header_bytes(nal);
        if config.filter_parameter_sets && nal_unit_type.is_some_and(|ty| ty.is_parameter_set()) {
            trace!(?nal_unit_type, size = nal.len(), "dropping parameter set");
            stream.ps_count += 1;
            continue;
        }

        if nal.len() as u64 > length_size.max_nal_len() {
            return Err(VvcError::invalid(format!(
                "NAL unit of {} bytes does not fit a {} byte length prefix",
                nal.len(),
                length_size.bytes()
            )));
        }

        stream
            .data
            .try_reserve(length_size.bytes() + nal.len())
            .map_err(|_| VvcError::AllocationFailure)?;

        match length_size {
            LengthSize::One => stream.data.write_u8(nal.len() as u8)?,
            LengthSize::Two => stream.data.write_u16::<BigEndian>(nal.len() as u16)?,
            LengthSize::Four => stream.data.write_u32::<BigEndian>(nal.len() as u32)?,
        }
        stream.data.extend_from_slice(nal);
    }

    debug!(size = stream.data.len(), ps_count = stream.ps_count, "converted to length-prefixed stream");

    Ok(stream)
}

/// Builds a [`VVCDecoderConfigurationRecord`] from the parameter sets and SEI
/// of an Annex-B stream.
///
/// NAL units of other types are skipped.
pub fn record_from_annexb(data: &[u8], config: &ConversionConfig) -> Result<VVCDecoderConfigurationRecord> {
    let mut builder = ConfigRecordBuilder::new(config);
    let mut skipped = 0usize;

    for nal in AnnexBNalIter::new(data) {
        match NALUnitType::from_nal_header_bytes(nal) {
            Some(nal_unit_type) if nal_unit_type.is_record_candidate() => builder.add_nal_unit(nal)?,
            nal_unit_type => {
                trace!(?nal_unit_type, size = nal.len(), "skipping NAL unit");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "NAL units not stored in the decoder configuration record");
    }

    builder.finish()
}

/// Writes a serialized [`VVCDecoderConfigurationRecord`] for `data`.
///
/// `data` is either an Annex-B stream or an already serialized record, which
/// is returned unchanged. Nothing is returned unless the whole record could be
/// built and validated.
pub fn write_vvcc(data: &[u8], config: &ConversionConfig) -> Result<Vec<u8>> {
    if data.len() < MIN_RECORD_INPUT {
        return Err(VvcError::invalid(format!(
            "{} bytes are too short for a decoder configuration record",
            data.len()
        )));
    }

    if VVCDecoderConfigurationRecord::is_record_format(data) {
        debug!(size = data.len(), "input is already a decoder configuration record");
        return Ok(data.to_vec());
    }

    if !has_start_code(data) {
        return Err(VvcError::invalid("input does not start with an Annex-B start code"));
    }

    let record = record_from_annexb(data, config)?;

    let mut output = Vec::new();
    output
        .try_reserve_exact(record.size() as usize)
        .map_err(|_| VvcError::AllocationFailure)?;
    record.mux(&mut output)?;

    Ok(output)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::{AnnexBNalIter, annexb_to_length_prefixed, record_from_annexb, write_vvcc};
    use crate::ptl::tests::PtlSpec;
    use crate::sps::tests::SpsSpec;
    use crate::test_utils::{annexb, init_test_tracing};
    use crate::vps::tests::single_layer_vps;
    use crate::{ConstantFrameRate, ConversionConfig, LengthSize, NALUnitType, VVCDecoderConfigurationRecord, VvcError};

    const PPS: &[u8] = &[0x00, 0x81, 0xC0];
    const IDR: &[u8] = &[0x00, 0x39, 0x84, 0x21, 0x10];

    fn stream() -> Vec<u8> {
        let vps = single_layer_vps(&PtlSpec::new(1, false, 60), 0);
        let sps = SpsSpec::new(1920, 1080).to_nal();
        annexb(&[&vps, &sps, PPS, IDR])
    }

    #[test]
    fn test_nal_iter_start_codes() {
        let data = [
            0xFF, 0xEE, // garbage
            0x00, 0x00, 0x01, 0x01, 0x02, // 3-byte start code
            0x00, 0x00, 0x00, 0x01, 0x03, 0x00, // 4-byte start code, trailing zero
            0x00, 0x00, 0x00, 0x01, // empty
            0x00, 0x00, 0x01, 0x04,
        ];

        let nals: Vec<_> = AnnexBNalIter::new(&data).collect();
        assert_eq!(nals, vec![&[0x01, 0x02][..], &[0x03, 0x00], &[0x04]]);
    }

    #[test]
    fn test_nal_iter_no_start_code() {
        assert_eq!(AnnexBNalIter::new(&[0x00, 0x00, 0x02, 0x01]).count(), 0);
        assert_eq!(AnnexBNalIter::new(&[]).count(), 0);
    }

    #[test]
    fn test_end_to_end_record() {
        init_test_tracing!();

        let output = write_vvcc(&stream(), &ConversionConfig::default()).unwrap();
        let record = VVCDecoderConfigurationRecord::demux(output.as_slice()).unwrap();

        assert_eq!(record.length_size_minus_one, 3);
        assert_eq!(record.size(), output.len() as u64);

        let ptl = record.ptl.as_ref().unwrap();
        insta::assert_debug_snapshot!(ptl, @r"
        VvcPtlInfo {
            ols_idx: 0,
            num_sublayers: 1,
            constant_frame_rate: Constant,
            chroma_format_idc: 1,
            bit_depth_minus8: 2,
            native_ptl: VvcPtlRecord {
                general_profile_idc: 1,
                general_tier_flag: false,
                general_level_idc: 60,
                ptl_frame_only_constraint_flag: true,
                ptl_multilayer_enabled_flag: false,
                general_constraint_info: [
                    0,
                ],
                ptl_sublayer_level_present_flags: [
                    false,
                    false,
                    false,
                    false,
                    false,
                    false,
                ],
                sublayer_level_idcs: [
                    0,
                    0,
                    0,
                    0,
                    0,
                    0,
                ],
                general_sub_profile_idcs: [],
            },
            max_picture_width: 1920,
            max_picture_height: 1080,
            avg_frame_rate: 0,
        }
        ");
        assert_eq!(ptl.constant_frame_rate, ConstantFrameRate::Constant);

        let types: Vec<_> = record.arrays.iter().map(|array| array.nal_unit_type).collect();
        assert_eq!(types, vec![NALUnitType::VpsNut, NALUnitType::SpsNut, NALUnitType::PpsNut]);
        assert!(record.arrays.iter().all(|array| array.nalus.len() == 1));
        assert_eq!(record.arrays[2].nalus[0], PPS);
    }

    #[test]
    fn test_record_without_sps_is_rejected() {
        let vps = single_layer_vps(&PtlSpec::new(1, false, 60), 0);
        let data = annexb(&[&vps, PPS]);

        let err = write_vvcc(&data, &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, VvcError::InvalidData(_)));
    }

    #[test]
    fn test_record_truncated_sps_is_rejected() {
        init_test_tracing!();

        let vps = single_layer_vps(&PtlSpec::new(1, false, 60), 0);
        let sps = SpsSpec::new(1920, 1080).to_nal();
        let data = annexb(&[&vps, PPS, &sps[..5]]);

        let err = write_vvcc(&data, &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, VvcError::OutOfData));
    }

    #[test]
    fn test_record_length_size() {
        let config = ConversionConfig::builder().length_size(LengthSize::Two).build();
        let record = record_from_annexb(&stream(), &config).unwrap();
        assert_eq!(record.length_size_minus_one, 1);
    }

    #[test]
    fn test_record_pass_through() {
        let record = write_vvcc(&stream(), &ConversionConfig::default()).unwrap();
        let output = write_vvcc(&record, &ConversionConfig::default()).unwrap();
        assert_eq!(output, record);

        // only the reserved bits are looked at
        let data = [0xF8, 0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(write_vvcc(&data, &ConversionConfig::default()).unwrap(), data);
    }

    #[test]
    fn test_record_invalid_input() {
        let err = write_vvcc(&[0x00, 0x00, 0x01, 0x79, 0x00], &ConversionConfig::default()).unwrap_err();
        assert!(err.is_invalid_data());

        let err = write_vvcc(&[0x00, 0x00, 0x02, 0x79, 0x00, 0x00], &ConversionConfig::default()).unwrap_err();
        assert!(err.is_invalid_data());
    }

    #[test]
    fn test_length_prefixed() {
        let data = annexb(&[PPS, IDR]);
        let stream = annexb_to_length_prefixed(&data, &ConversionConfig::default()).unwrap();

        assert_eq!(stream.ps_count, 0);
        assert_eq!(
            stream.data,
            vec![
                0x00, 0x00, 0x00, 0x03, 0x00, 0x81, 0xC0, //
                0x00, 0x00, 0x00, 0x05, 0x00, 0x39, 0x84, 0x21, 0x10,
            ]
        );
    }

    #[test]
    fn test_length_prefixed_filter_parameter_sets() {
        let config = ConversionConfig::builder()
            .filter_parameter_sets(true)
            .length_size(LengthSize::One)
            .build();
        let stream = annexb_to_length_prefixed(&stream(), &config).unwrap();

        assert_eq!(stream.ps_count, 3);
        assert_eq!(stream.data, vec![0x05, 0x00, 0x39, 0x84, 0x21, 0x10]);
    }

    #[test]
    fn test_length_prefixed_nal_too_long() {
        let mut nal = vec![0x00, 0x39];
        nal.resize(300, 0xAA);
        let data = annexb(&[&nal]);

        let config = ConversionConfig::builder().length_size(LengthSize::One).build();
        let err = annexb_to_length_prefixed(&data, &config).unwrap_err();
        assert!(err.is_invalid_data());

        let config = ConversionConfig::builder().length_size(LengthSize::Two).build();
        let stream = annexb_to_length_prefixed(&data, &config).unwrap();
        assert_eq!(&stream.data[..2], &[0x01, 0x2C]);
    }
}
