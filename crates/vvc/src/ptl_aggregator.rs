use tracing::trace;

use crate::error::Result;
use crate::ptl::ProfileTierLevel;
use crate::ptl_record::{VvcPtlRecord, sublayer_entries};

/// Folds every `profile_tier_level()` found in the parameter sets of a
/// stream into a single [`VvcPtlRecord`].
///
/// The record has to describe every parameter set seen so far, so most
/// fields only ever grow:
///
/// - tier and profile keep the maximum.
/// - the level follows a higher tier outright, otherwise it keeps the maximum.
/// - `ptl_frame_only_constraint_flag` and `ptl_multilayer_enabled_flag` are
///   set only if every merged structure sets them.
/// - the general constraints info is replaced by the one of the last merge.
/// - sublayer presence flags are ORed, levels of absent sublayers are taken
///   from the next higher sublayer.
/// - the sub profile list is overwritten by the last merge but never shrinks.
#[derive(Debug, Clone, Default)]
pub struct PtlAggregator {
    record: VvcPtlRecord,
    merged: usize,
}

impl PtlAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The aggregated record.
    pub fn record(&self) -> &VvcPtlRecord {
        &self.record
    }

    /// Consumes the aggregator and returns the aggregated record.
    pub fn into_record(self) -> VvcPtlRecord {
        self.record
    }

    /// Merges `ptl` into the record.
    ///
    /// `num_sublayers` is the number of sublayers of the whole stream at the
    /// time of the merge, it must already include the sublayers of the
    /// parameter set `ptl` was read from.
    pub fn merge(&mut self, ptl: &ProfileTierLevel, num_sublayers: u8) -> Result<()> {
        let record = &mut self.record;

        if record.general_tier_flag < ptl.general_tier_flag {
            record.general_level_idc = ptl.general_level_idc;
        } else {
            record.general_level_idc = record.general_level_idc.max(ptl.general_level_idc);
        }

        record.general_tier_flag |= ptl.general_tier_flag;
        record.general_profile_idc = record.general_profile_idc.max(ptl.general_profile_idc);

        if self.merged == 0 {
            record.ptl_frame_only_constraint_flag = ptl.ptl_frame_only_constraint_flag;
            record.ptl_multilayer_enabled_flag = ptl.ptl_multilayer_enabled_flag;
        } else {
            record.ptl_frame_only_constraint_flag &= ptl.ptl_frame_only_constraint_flag;
            record.ptl_multilayer_enabled_flag &= ptl.ptl_multilayer_enabled_flag;
        }

        record.general_constraint_info = match &ptl.general_constraints_info {
            Some(gci) => gci.to_bytes()?,
            None => vec![0],
        };

        let entries = sublayer_entries(num_sublayers);
        for i in (0..entries).rev() {
            let present = ptl.ptl_sublayer_level_present_flags.get(i).copied().unwrap_or(false);
            let level = ptl.sublayer_level_idcs.get(i).copied().unwrap_or(0);

            record.ptl_sublayer_level_present_flags[i] |= present;
            record.sublayer_level_idcs[i] = if record.ptl_sublayer_level_present_flags[i] {
                record.sublayer_level_idcs[i].max(level)
            } else if i + 1 == entries {
                record.general_level_idc
            } else {
                record.sublayer_level_idcs[i + 1]
            };
        }

        let sub_profiles = &ptl.general_sub_profile_idcs;
        if record.general_sub_profile_idcs.len() < sub_profiles.len() {
            record.general_sub_profile_idcs.resize(sub_profiles.len(), 0);
        }
        record.general_sub_profile_idcs[..sub_profiles.len()].copy_from_slice(sub_profiles);

        self.merged += 1;

        trace!(
            profile = record.general_profile_idc,
            tier = record.general_tier_flag,
            level = record.general_level_idc,
            merged = self.merged,
            "merged profile_tier_level"
        );

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::PtlAggregator;
    use crate::ptl::{GeneralConstraintsInfo, ProfileTierLevel};

    fn ptl(profile: u8, tier: bool, level: u8) -> ProfileTierLevel {
        ProfileTierLevel {
            general_profile_idc: profile,
            general_tier_flag: tier,
            general_level_idc: level,
            ptl_frame_only_constraint_flag: true,
            ptl_multilayer_enabled_flag: false,
            general_constraints_info: None,
            ptl_sublayer_level_present_flags: Vec::new(),
            sublayer_level_idcs: Vec::new(),
            general_sub_profile_idcs: Vec::new(),
        }
    }

    #[test]
    fn test_higher_tier_adopts_its_level() {
        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&ptl(1, false, 60), 1).unwrap();
        aggregator.merge(&ptl(1, true, 30), 1).unwrap();

        let record = aggregator.record();
        assert!(record.general_tier_flag);
        assert_eq!(record.general_level_idc, 30);

        // same tier keeps the maximum, a lower tier never lowers the level
        aggregator.merge(&ptl(1, true, 51), 1).unwrap();
        aggregator.merge(&ptl(1, false, 90), 1).unwrap();
        let record = aggregator.record();
        assert!(record.general_tier_flag);
        assert_eq!(record.general_level_idc, 90);
    }

    #[test]
    fn test_profile_is_numeric_max() {
        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&ptl(17, false, 60), 1).unwrap();
        aggregator.merge(&ptl(1, false, 60), 1).unwrap();
        assert_eq!(aggregator.record().general_profile_idc, 17);
    }

    #[test]
    fn test_flags_and_semantics() {
        let mut aggregator = PtlAggregator::new();
        for frame_only in [true, true, false] {
            let mut p = ptl(1, false, 60);
            p.ptl_frame_only_constraint_flag = frame_only;
            aggregator.merge(&p, 1).unwrap();
        }
        assert!(!aggregator.record().ptl_frame_only_constraint_flag);

        let mut aggregator = PtlAggregator::new();
        for _ in 0..3 {
            aggregator.merge(&ptl(1, false, 60), 1).unwrap();
        }
        assert!(aggregator.record().ptl_frame_only_constraint_flag);
        assert!(!aggregator.record().ptl_multilayer_enabled_flag);
    }

    #[test]
    fn test_sublayer_inheritance() {
        let mut p = ptl(1, false, 60);
        p.ptl_sublayer_level_present_flags = vec![true, false];
        p.sublayer_level_idcs = vec![30, 60];

        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&p, 3).unwrap();

        let record = aggregator.record();
        assert_eq!(record.ptl_sublayer_level_present_flags[..2], [true, false]);
        assert_eq!(record.sublayer_level_idcs[..2], [30, 60]);

        // a later structure without sublayer info keeps the reported level
        // and re-inherits the others from the new general level
        aggregator.merge(&ptl(1, false, 80), 3).unwrap();
        let record = aggregator.record();
        assert_eq!(record.ptl_sublayer_level_present_flags[..2], [true, false]);
        assert_eq!(record.sublayer_level_idcs[..2], [30, 80]);
    }

    #[test]
    fn test_sublayer_present_levels_keep_maximum() {
        let mut first = ptl(1, false, 60);
        first.ptl_sublayer_level_present_flags = vec![true];
        first.sublayer_level_idcs = vec![48];
        let mut second = ptl(1, false, 60);
        second.ptl_sublayer_level_present_flags = vec![true];
        second.sublayer_level_idcs = vec![32];

        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&first, 2).unwrap();
        aggregator.merge(&second, 2).unwrap();
        assert_eq!(aggregator.record().sublayer_level_idcs[0], 48);
    }

    #[test]
    fn test_constraint_info_last_writer_wins() {
        let mut with_gci = ptl(1, false, 60);
        with_gci.general_constraints_info = Some(GeneralConstraintsInfo {
            general_constraints: 1 << 70,
            gci_num_reserved_bits: 8,
        });

        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&with_gci, 1).unwrap();
        let info = &aggregator.record().general_constraint_info;
        assert_eq!(info.len(), 11);
        assert_eq!(info[0], 0xC0);

        // a structure without constraints resets the bytes, nothing is ORed
        aggregator.merge(&ptl(1, false, 60), 1).unwrap();
        assert_eq!(aggregator.record().general_constraint_info, vec![0]);
    }

    #[test]
    fn test_sub_profiles_never_shrink() {
        let mut first = ptl(1, false, 60);
        first.general_sub_profile_idcs = vec![1, 2, 3];
        let mut second = ptl(1, false, 60);
        second.general_sub_profile_idcs = vec![9];

        let mut aggregator = PtlAggregator::new();
        aggregator.merge(&first, 1).unwrap();
        aggregator.merge(&second, 1).unwrap();
        assert_eq!(aggregator.into_record().general_sub_profile_idcs, vec![9, 2, 3]);
    }
}
