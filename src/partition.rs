//! Grouping of resolved regions into device sessions.
//!
//! The scanner cannot change sky-writing inside one session, so every
//! session must hold regions that agree on it. [`JobGroup`] can only be
//! built here, which keeps that invariant true for every group in
//! existence.

use crate::region::{MarkParameters, ResolvedRegion};
use crate::sky_writing::{SkyWritingMode, SkyWritingState};
use log::warn;
use serde::Serialize;

/// Non-empty run of regions sharing one sky-writing state.
/// One group is emitted as one device session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobGroup {
    state: SkyWritingState,
    regions: Vec<ResolvedRegion>,
}

impl JobGroup {
    fn new(first: ResolvedRegion) -> JobGroup {
        JobGroup {
            state: first.sky_writing.state,
            regions: vec![first],
        }
    }

    pub fn state(&self) -> SkyWritingState {
        self.state
    }

    pub fn sky_writing_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Session level sky-writing setting. Taken from the first region;
    /// all regions agree on whether it is enabled.
    pub fn sky_writing_mode(&self) -> &SkyWritingMode {
        &self.regions[0].sky_writing.mode
    }

    pub fn regions(&self) -> &[ResolvedRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when the group holds no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    /// Device parameters, one layer per region in group order
    pub fn mark_parameters(&self) -> Vec<MarkParameters> {
        self.regions.iter().map(|r| r.mark_parameters.clone()).collect()
    }

    pub fn into_regions(self) -> Vec<ResolvedRegion> {
        self.regions
    }

    /// Regions whose own sky-writing mode differs from the session mode.
    /// The device takes one mode per session, so these regions are marked
    /// with the first region's mode. One message per differing field.
    pub fn mode_mismatches(&self) -> Vec<String> {
        let (first, rest) = match self.regions.split_first() {
            Some(split) => split,
            None => return Vec::new(),
        };
        let session = &first.sky_writing.mode;
        let mut found = Vec::new();
        for region in rest {
            for (field, used, wanted) in mode_differences(session, &region.sky_writing.mode) {
                found.push(format!(
                    "region '{}' wants {} {}, session from '{}' uses {}",
                    region.name, field, wanted, first.name, used
                ));
            }
        }
        found
    }
}

/// Fields other than `enabled` where `other` differs from `session`,
/// as (field, session value, other value)
fn mode_differences(
    session: &SkyWritingMode,
    other: &SkyWritingMode,
) -> Vec<(&'static str, String, String)> {
    let mut diffs = Vec::new();
    if session.mode != other.mode {
        diffs.push(("mode", session.mode.to_string(), other.mode.to_string()));
    }
    if session.uniform_len != other.uniform_len {
        diffs.push((
            "uniform_len",
            session.uniform_len.to_string(),
            other.uniform_len.to_string(),
        ));
    }
    if session.acc_len != other.acc_len {
        diffs.push((
            "acc_len",
            format!("{:?}", session.acc_len),
            format!("{:?}", other.acc_len),
        ));
    }
    if session.angle_limit != other.angle_limit {
        diffs.push((
            "angle_limit",
            format!("{:?}", session.angle_limit),
            format!("{:?}", other.angle_limit),
        ));
    }
    diffs
}

/// How regions may be arranged into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOrder {
    /// Keep submission order. Groups are maximal runs of adjacent regions
    /// with equal sky-writing state.
    Preserve,
    /// Collect all regions with the state of the first region, then all
    /// others, each in submission order. At most two groups, at the cost
    /// of reordering the emission.
    MergeByFlag,
}

impl Default for PartitionOrder {
    fn default() -> Self {
        PartitionOrder::Preserve
    }
}

/// Split regions into groups, keeping submission order
pub fn partition(regions: Vec<ResolvedRegion>) -> Vec<JobGroup> {
    let mut groups: Vec<JobGroup> = Vec::new();
    for region in regions {
        let same = groups
            .last()
            .map_or(false, |g| g.state == region.sky_writing.state);
        if !same {
            groups.push(JobGroup::new(region));
        } else if let Some(group) = groups.last_mut() {
            group.regions.push(region);
        }
    }
    for group in &groups {
        for mismatch in group.mode_mismatches() {
            warn!("Sky-writing mode overridden: {}", mismatch);
        }
    }
    groups
}

pub fn partition_with(regions: Vec<ResolvedRegion>, order: PartitionOrder) -> Vec<JobGroup> {
    match order {
        PartitionOrder::Preserve => partition(regions),
        PartitionOrder::MergeByFlag => {
            let first_state = match regions.first() {
                Some(r) => r.sky_writing.state,
                None => return Vec::new(),
            };
            let (first, rest): (Vec<_>, Vec<_>) = regions
                .into_iter()
                .partition(|r| r.sky_writing.state == first_state);
            let mut groups = partition(first);
            groups.extend(partition(rest));
            groups
        }
    }
}

#[cfg(test)]
use crate::region::test_resolved;

#[cfg(test)]
fn regions(flags: &[bool]) -> Vec<ResolvedRegion> {
    flags
        .iter()
        .enumerate()
        .map(|(i, &f)| test_resolved(&format!("r{}", i), f))
        .collect()
}

#[cfg(test)]
fn runs(flags: &[bool]) -> usize {
    if flags.is_empty() {
        0
    } else {
        1 + flags.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

#[test]
fn test_two_groups() {
    let groups = partition(vec![
        test_resolved("edges", true),
        test_resolved("infill_hatch", true),
        test_resolved("support_hatch", false),
    ]);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].names(), vec!["edges", "infill_hatch"]);
    assert_eq!(groups[1].names(), vec!["support_hatch"]);
    assert!(groups[0].sky_writing_enabled());
    assert!(!groups[1].sky_writing_enabled());
    assert!(groups[0].sky_writing_mode().enabled);
    assert_eq!(groups[0].mark_parameters().len(), 2);
}

#[test]
fn test_degenerate() {
    assert!(partition(Vec::new()).is_empty());
    let groups = partition(regions(&[false]));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 1);
    assert!(!groups[0].is_empty());
}

#[test]
fn test_completeness_and_minimality() {
    // Every flag sequence up to length 8
    for len in 0..=8 {
        for bits in 0u32..(1 << len) {
            let flags: Vec<bool> = (0..len).map(|i| (bits & (1 << i)) != 0).collect();
            let groups = partition(regions(&flags));
            assert_eq!(groups.len(), runs(&flags));
            for g in &groups {
                assert!(g.regions().iter().all(|r| r.sky_writing.state == g.state()));
            }
            for w in groups.windows(2) {
                assert_ne!(w[0].state(), w[1].state());
            }
            let flat: Vec<(String, bool)> = groups
                .into_iter()
                .flat_map(|g| g.into_regions())
                .map(|r| {
                    let enabled = r.sky_writing_enabled();
                    (r.name, enabled)
                })
                .collect();
            let expected: Vec<(String, bool)> = flags
                .iter()
                .enumerate()
                .map(|(i, &f)| (format!("r{}", i), f))
                .collect();
            assert_eq!(flat, expected);
        }
    }
}

#[test]
fn test_merge_by_flag() {
    let groups = partition_with(
        regions(&[false, true, false, true, true, false]),
        PartitionOrder::MergeByFlag,
    );
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].names(), vec!["r0", "r2", "r5"]);
    assert_eq!(groups[1].names(), vec!["r1", "r3", "r4"]);
    assert!(!groups[0].sky_writing_enabled());

    let groups = partition_with(regions(&[true, true]), PartitionOrder::MergeByFlag);
    assert_eq!(groups.len(), 1);
    assert!(partition_with(Vec::new(), PartitionOrder::MergeByFlag).is_empty());
    assert_eq!(PartitionOrder::default(), PartitionOrder::Preserve);
}

#[test]
fn test_session_mode_mismatch_reported() {
    let edges = test_resolved("edges", true);
    let mut hatch = test_resolved("infill_hatch", true);
    hatch.sky_writing.mode.uniform_len = 0.4;
    hatch.sky_writing.mode.angle_limit = Some(90.0);
    let groups = partition(vec![edges, hatch, test_resolved("upskin_hatch", true)]);
    assert_eq!(groups.len(), 1);
    assert_relative_eq!(groups[0].sky_writing_mode().uniform_len, 0.1);
    assert_eq!(groups[0].sky_writing_mode().angle_limit, None);

    let mismatches = groups[0].mode_mismatches();
    assert_eq!(mismatches.len(), 2);
    assert_eq!(
        mismatches[0],
        "region 'infill_hatch' wants uniform_len 0.4, session from 'edges' uses 0.1"
    );
    assert_eq!(
        mismatches[1],
        "region 'infill_hatch' wants angle_limit Some(90.0), session from 'edges' uses None"
    );
}

#[test]
fn test_equal_modes_not_reported() {
    let groups = partition(regions(&[false, false, true, true]));
    assert!(groups.iter().all(|g| g.mode_mismatches().is_empty()));
}
