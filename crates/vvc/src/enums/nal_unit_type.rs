/// NAL (Network Abstraction Layer) unit types as defined by ISO/IEC 23090-3 Table 5.
#[derive(Debug, Clone, PartialEq, Copy, PartialOrd, Ord, Eq, Hash)]
#[repr(u8)]
pub enum NALUnitType {
    /// Coded slice of a trailing picture or subpicture
    ///
    /// NAL unit type class: VCL
    TrailNut = 0,
    /// Coded slice of an STSA picture or subpicture
    ///
    /// NAL unit type class: VCL
    StsaNut = 1,
    /// Coded slice of a RADL picture or subpicture
    ///
    /// NAL unit type class: VCL
    RadlNut = 2,
    /// Coded slice of a RASL picture or subpicture
    ///
    /// NAL unit type class: VCL
    RaslNut = 3,
    /// Reserved non-IRAP VCL NAL unit types
    ///
    /// NAL unit type class: VCL
    RsvVcl4 = 4,
    /// Reserved non-IRAP VCL NAL unit types
    ///
    /// NAL unit type class: VCL
    RsvVcl5 = 5,
    /// Reserved non-IRAP VCL NAL unit types
    ///
    /// NAL unit type class: VCL
    RsvVcl6 = 6,
    /// Coded slice of an IDR picture or subpicture that may have RADL pictures
    ///
    /// NAL unit type class: VCL
    IdrWRadl = 7,
    /// Coded slice of an IDR picture or subpicture without leading pictures
    ///
    /// NAL unit type class: VCL
    IdrNLp = 8,
    /// Coded slice of a CRA picture or subpicture
    ///
    /// NAL unit type class: VCL
    CraNut = 9,
    /// Coded slice of a GDR picture or subpicture
    ///
    /// NAL unit type class: VCL
    GdrNut = 10,
    /// Reserved IRAP VCL NAL unit type
    ///
    /// NAL unit type class: VCL
    RsvIrap11 = 11,
    /// Operating point information
    ///
    /// NAL unit type class: non-VCL
    OpiNut = 12,
    /// Decoding capability information
    ///
    /// NAL unit type class: non-VCL
    DciNut = 13,
    /// Video parameter set
    ///
    /// NAL unit type class: non-VCL
    VpsNut = 14,
    /// Sequence parameter set
    ///
    /// NAL unit type class: non-VCL
    SpsNut = 15,
    /// Picture parameter set
    ///
    /// NAL unit type class: non-VCL
    PpsNut = 16,
    /// Adaptation parameter set (prefix)
    ///
    /// NAL unit type class: non-VCL
    PrefixApsNut = 17,
    /// Adaptation parameter set (suffix)
    ///
    /// NAL unit type class: non-VCL
    SuffixApsNut = 18,
    /// Picture header
    ///
    /// NAL unit type class: non-VCL
    PhNut = 19,
    /// Access unit delimiter
    ///
    /// NAL unit type class: non-VCL
    AudNut = 20,
    /// End of sequence
    ///
    /// NAL unit type class: non-VCL
    EosNut = 21,
    /// End of bitstream
    ///
    /// NAL unit type class: non-VCL
    EobNut = 22,
    /// Supplemental enhancement information (prefix)
    ///
    /// NAL unit type class: non-VCL
    PrefixSeiNut = 23,
    /// Supplemental enhancement information (suffix)
    ///
    /// NAL unit type class: non-VCL
    SuffixSeiNut = 24,
    /// Filler data
    ///
    /// NAL unit type class: non-VCL
    FdNut = 25,
    /// Reserved non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    RsvNvcl26 = 26,
    /// Reserved non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    RsvNvcl27 = 27,
    /// Unspecified non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    UnspecNvcl28 = 28,
    /// Unspecified non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    UnspecNvcl29 = 29,
    /// Unspecified non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    UnspecNvcl30 = 30,
    /// Unspecified non-VCL NAL unit types
    ///
    /// NAL unit type class: non-VCL
    UnspecNvcl31 = 31,
}

impl From<u8> for NALUnitType {
    /// Only the five low bits are used, every value maps to a type.
    fn from(value: u8) -> Self {
        match value & 0x1F {
            0 => NALUnitType::TrailNut,
            1 => NALUnitType::StsaNut,
            2 => NALUnitType::RadlNut,
            3 => NALUnitType::RaslNut,
            4 => NALUnitType::RsvVcl4,
            5 => NALUnitType::RsvVcl5,
            6 => NALUnitType::RsvVcl6,
            7 => NALUnitType::IdrWRadl,
            8 => NALUnitType::IdrNLp,
            9 => NALUnitType::CraNut,
            10 => NALUnitType::GdrNut,
            11 => NALUnitType::RsvIrap11,
            12 => NALUnitType::OpiNut,
            13 => NALUnitType::DciNut,
            14 => NALUnitType::VpsNut,
            15 => NALUnitType::SpsNut,
            16 => NALUnitType::PpsNut,
            17 => NALUnitType::PrefixApsNut,
            18 => NALUnitType::SuffixApsNut,
            19 => NALUnitType::PhNut,
            20 => NALUnitType::AudNut,
            21 => NALUnitType::EosNut,
            22 => NALUnitType::EobNut,
            23 => NALUnitType::PrefixSeiNut,
            24 => NALUnitType::SuffixSeiNut,
            25 => NALUnitType::FdNut,
            26 => NALUnitType::RsvNvcl26,
            27 => NALUnitType::RsvNvcl27,
            28 => NALUnitType::UnspecNvcl28,
            29 => NALUnitType::UnspecNvcl29,
            30 => NALUnitType::UnspecNvcl30,
            _ => NALUnitType::UnspecNvcl31,
        }
    }
}

impl NALUnitType {
    /// Returns `true` if the NAL unit type class of this NAL unit type is VCL (Video Coding Layer).
    ///
    /// See ISO/IEC 23090-3 - Table 5, NAL unit type class column.
    pub fn is_vcl(&self) -> bool {
        (*self as u8) <= 11
    }

    /// Returns `true` for VPS, SPS and PPS.
    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::VpsNut | Self::SpsNut | Self::PpsNut)
    }

    /// Returns `true` for the types that may be carried in the NAL unit arrays
    /// of a decoder configuration record: OPI, VPS, SPS, PPS and SEI.
    pub fn is_record_candidate(&self) -> bool {
        matches!(
            self,
            Self::OpiNut
                | Self::VpsNut
                | Self::SpsNut
                | Self::PpsNut
                | Self::PrefixSeiNut
                | Self::SuffixSeiNut
        )
    }

    /// Returns `true` for types whose record array has no `num_nalus` field
    /// and therefore holds exactly one NAL unit.
    pub fn is_single_nalu_array(&self) -> bool {
        matches!(self, Self::OpiNut | Self::DciNut)
    }

    /// Reads the type out of the second byte of a raw NAL unit header.
    ///
    /// Returns `None` if `nal` is shorter than the 2-byte header.
    pub fn from_nal_header_bytes(nal: &[u8]) -> Option<Self> {
        nal.get(1).map(|byte| Self::from(byte >> 3))
    }
}
