use std::fmt::Display;

use crate::error::VvcError;

/// Width of the NAL unit length prefix of a length-prefixed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthSize {
    /// 1 byte, NAL units up to 255 bytes.
    One,
    /// 2 bytes, NAL units up to 65535 bytes.
    Two,
    /// 4 bytes.
    #[default]
    Four,
}

impl LengthSize {
    /// Number of bytes of the prefix.
    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// The `length_size_minus_one` field of a decoder configuration record.
    pub fn length_size_minus_one(self) -> u8 {
        self.bytes() as u8 - 1
    }

    /// Largest NAL unit length the prefix can hold.
    pub fn max_nal_len(self) -> u64 {
        match self {
            Self::One => u8::MAX as u64,
            Self::Two => u16::MAX as u64,
            Self::Four => u32::MAX as u64,
        }
    }
}

impl TryFrom<u8> for LengthSize {
    type Error = VvcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            _ => Err(VvcError::invalid(format!("length size must be 1, 2 or 4: {value}"))),
        }
    }
}

/// Options of the Annex-B conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Prefix width of the length-prefixed stream, also written as
    /// `length_size_minus_one` into a decoder configuration record.
    pub length_size: LengthSize,

    /// Completeness flag of the VPS, SPS and PPS arrays of a record.
    pub ps_array_completeness: bool,

    /// Drop VPS, SPS and PPS NAL units from a length-prefixed stream.
    pub filter_parameter_sets: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            length_size: LengthSize::Four,
            ps_array_completeness: true,
            filter_parameter_sets: false,
        }
    }
}

impl Display for ConversionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConversionConfig {{ length_size: {} bytes, ps_array_completeness: {}, filter_parameter_sets: {} }}",
            self.length_size.bytes(),
            self.ps_array_completeness,
            self.filter_parameter_sets
        )
    }
}

impl ConversionConfig {
    /// Returns a builder starting from the defaults.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    /// Sets the length prefix width.
    pub fn length_size(mut self, length_size: LengthSize) -> Self {
        self.config.length_size = length_size;
        self
    }

    /// Sets the completeness flag of the parameter set arrays.
    pub fn ps_array_completeness(mut self, ps_array_completeness: bool) -> Self {
        self.config.ps_array_completeness = ps_array_completeness;
        self
    }

    /// Drops parameter sets from length-prefixed output.
    pub fn filter_parameter_sets(mut self, filter_parameter_sets: bool) -> Self {
        self.config.filter_parameter_sets = filter_parameter_sets;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> ConversionConfig {
        self.config
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::{ConversionConfig, LengthSize};

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.length_size, LengthSize::Four);
        assert_eq!(config.length_size.length_size_minus_one(), 3);
        assert!(config.ps_array_completeness);
        assert!(!config.filter_parameter_sets);
        assert_eq!(ConversionConfig::builder().build(), config);
    }

    #[test]
    fn test_builder() {
        let config = ConversionConfig::builder()
            .length_size(LengthSize::Two)
            .ps_array_completeness(false)
            .filter_parameter_sets(true)
            .build();

        assert_eq!(config.length_size.length_size_minus_one(), 1);
        assert_eq!(config.length_size.max_nal_len(), 65535);
        assert_eq!(
            config.to_string(),
            "ConversionConfig { length_size: 2 bytes, ps_array_completeness: false, filter_parameter_sets: true }"
        );
    }

    #[test]
    fn test_length_size_from_u8() {
        assert_eq!(LengthSize::try_from(1).unwrap(), LengthSize::One);
        assert_eq!(LengthSize::try_from(4).unwrap(), LengthSize::Four);
        assert!(LengthSize::try_from(3).unwrap_err().is_invalid_data());
    }
}
