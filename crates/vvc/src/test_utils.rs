use std::io::Write;

use bytes_util::{BitWriter, EmulationPreventionIo};

use crate::NALUnitType;

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(TRACE)` - uses specified level
macro_rules! init_test_tracing {
    () => {
        $crate::test_utils::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

pub(crate) use init_test_tracing;

/// Appends `rbsp_trailing_bits()` and returns the RBSP bytes.
pub(crate) fn finish_rbsp(mut bit_writer: BitWriter<Vec<u8>>) -> Vec<u8> {
    bit_writer.write_bit(true).unwrap(); // rbsp_stop_one_bit
    bit_writer.finish().unwrap()
}

/// Builds a NAL unit (header with layer 0 and temporal id 0) from an RBSP,
/// inserting emulation prevention bytes.
pub(crate) fn nal_unit(nal_unit_type: NALUnitType, rbsp: &[u8]) -> Vec<u8> {
    let mut nal = vec![0x00, ((nal_unit_type as u8) << 3) | 1];
    let mut writer = EmulationPreventionIo::new(&mut nal);
    writer.write_all(rbsp).unwrap();
    nal
}

/// Joins NAL units into an Annex-B stream with 4-byte start codes.
pub(crate) fn annexb(nal_units: &[&[u8]]) -> Vec<u8> {
    let mut stream = Vec::new();
    for nal in nal_units {
        stream.extend_from_slice(&[0, 0, 0, 1]);
        stream.extend_from_slice(nal);
    }
    stream
}
