use std::fs;

use tracing::{info, warn};
use vvc::{VVCDecoderConfigurationRecord, annexb_to_length_prefixed, write_vvcc};

use crate::config::{ProgramConfig, Task};
use crate::error::AppError;

pub fn run(config: &ProgramConfig) -> Result<(), AppError> {
    let data = fs::read(&config.input)?;
    if data.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is empty", config.input.display())));
    }

    info!(input = %config.input.display(), size = data.len(), task = ?config.task, "processing");

    match config.task {
        Task::Record => {
            let record = write_vvcc(&data, &config.conversion)?;
            write_output(config, &record)?;
            info!(size = record.len(), "wrote decoder configuration record");
        }
        Task::LengthPrefixed => {
            let stream = annexb_to_length_prefixed(&data, &config.conversion)?;
            write_output(config, &stream.data)?;
            info!(
                size = stream.data.len(),
                dropped_parameter_sets = stream.ps_count,
                "wrote length-prefixed stream"
            );
        }
        Task::Inspect => {
            let record = inspect(&data)?;
            log_record(&record);
        }
    }

    Ok(())
}

fn write_output(config: &ProgramConfig, data: &[u8]) -> Result<(), AppError> {
    let output = config
        .output
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("no output path".to_string()))?;

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, data)?;

    info!(output = %output.display(), "output written");
    Ok(())
}

/// Demuxes a serialized record.
pub fn inspect(data: &[u8]) -> Result<VVCDecoderConfigurationRecord, AppError> {
    if !VVCDecoderConfigurationRecord::is_record_format(data) {
        return Err(AppError::InvalidInput(
            "not a decoder configuration record, the first byte must have its 5 reserved bits set".to_string(),
        ));
    }

    let record = VVCDecoderConfigurationRecord::demux(data)?;
    if record.size() != data.len() as u64 {
        warn!(record_size = record.size(), input_size = data.len(), "trailing data after the record");
    }

    Ok(record)
}

fn log_record(record: &VVCDecoderConfigurationRecord) {
    info!(
        length_size = record.length_size_minus_one + 1,
        ptl_present = record.ptl.is_some(),
        num_arrays = record.arrays.len(),
        "VVCDecoderConfigurationRecord"
    );

    if let Some(ptl) = &record.ptl {
        info!(
            ols_idx = ptl.ols_idx,
            num_sublayers = ptl.num_sublayers,
            constant_frame_rate = ?ptl.constant_frame_rate,
            chroma_format_idc = ptl.chroma_format_idc,
            bit_depth = ptl.bit_depth_minus8 + 8,
            max_picture_width = ptl.max_picture_width,
            max_picture_height = ptl.max_picture_height,
            avg_frame_rate = ptl.avg_frame_rate,
            "stream"
        );

        let native = &ptl.native_ptl;
        info!(
            profile = native.general_profile_idc,
            tier = native.general_tier_flag,
            level = native.general_level_idc,
            frame_only = native.ptl_frame_only_constraint_flag,
            multilayer = native.ptl_multilayer_enabled_flag,
            constraint_info_bytes = native.general_constraint_info.len(),
            sub_profiles = ?native.general_sub_profile_idcs,
            "profile, tier and level"
        );
    }

    for array in &record.arrays {
        let sizes: Vec<_> = array.nalus.iter().map(|nalu| nalu.len()).collect();
        info!(
            nal_unit_type = ?array.nal_unit_type,
            complete = array.array_completeness,
            sizes = ?sizes,
            "NAL unit array"
        );
    }

    if let Err(err) = record.validate() {
        warn!(%err, "record would be rejected when written");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use vvc::{ConversionConfig, LengthSize, NALUnitType};

    use super::{inspect, run};
    use crate::config::{ProgramConfig, Task};
    use crate::error::AppError;

    const RECORD: &[u8] = &[
        0xFF, 0x00, 0x15, 0x5F, 0x01, 0x02, 60, 0x80, 0x00, 0x07, 0x80, 0x04, 0x38, 0x00, 0x00, 0x03, //
        0x8E, 0x00, 0x01, 0x00, 0x03, 0x00, 0x71, 0xAA, //
        0x8F, 0x00, 0x01, 0x00, 0x04, 0x00, 0x79, 0xBB, 0xCC, //
        0x90, 0x00, 0x01, 0x00, 0x03, 0x00, 0x81, 0xDD,
    ];

    fn program(task: Task, input: PathBuf, output: Option<PathBuf>, conversion: ConversionConfig) -> ProgramConfig {
        ProgramConfig {
            task,
            input,
            output,
            conversion,
        }
    }

    #[test]
    fn test_record_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.vvcc");
        let output = dir.path().join("out/record.vvcc");
        fs::write(&input, RECORD).unwrap();

        run(&program(Task::Record, input, Some(output.clone()), ConversionConfig::default())).unwrap();
        assert_eq!(fs::read(output).unwrap(), RECORD);
    }

    #[test]
    fn test_length_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.266");
        let output = dir.path().join("out.bin");
        fs::write(
            &input,
            [0x00, 0x00, 0x00, 0x01, 0x00, 0x81, 0xC0, 0x00, 0x00, 0x01, 0x00, 0x39, 0x84],
        )
        .unwrap();

        let conversion = ConversionConfig::builder()
            .length_size(LengthSize::Two)
            .filter_parameter_sets(true)
            .build();
        run(&program(Task::LengthPrefixed, input, Some(output.clone()), conversion)).unwrap();

        assert_eq!(fs::read(output).unwrap(), vec![0x00, 0x03, 0x00, 0x39, 0x84]);
    }

    #[test]
    fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.266");
        fs::write(&input, b"").unwrap();

        let err = run(&program(Task::Inspect, input, None, ConversionConfig::default())).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&program(Task::Inspect, dir.path().join("missing"), None, ConversionConfig::default()))
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_inspect() {
        let record = inspect(RECORD).unwrap();
        assert_eq!(record.arrays.len(), 3);
        assert_eq!(record.arrays[1].nal_unit_type, NALUnitType::SpsNut);
        assert!(record.validate().is_ok());

        let err = inspect(&[0x00, 0x00, 0x01, 0x79]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = inspect(&RECORD[..20]).unwrap_err();
        assert!(matches!(err, AppError::Vvc(vvc::VvcError::OutOfData)));
    }
}
