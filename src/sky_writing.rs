//! Sky-writing resolution for one region.
//!
//! Sky-writing is a scanner smoothing mode which keeps the mirrors at
//! speed through corners. The device fixes it per session, so a region has
//! exactly one of two states and no transitions happen inside a region.

use crate::calibration::ProcessVariableEntry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkyWritingState {
    On,
    Off,
}

impl SkyWritingState {
    pub fn from_enabled(enabled: bool) -> SkyWritingState {
        if enabled {
            SkyWritingState::On
        } else {
            SkyWritingState::Off
        }
    }

    pub fn is_enabled(self) -> bool {
        self == SkyWritingState::On
    }
}

/// Scanner delays in µs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayProfile {
    pub mark_delay: i32,
    pub jump_delay: i32,
    pub polygon_delay: i32,
    pub laser_on_delay: f64,
    pub laser_off_delay: f64,
}

/// Session level sky-writing setting as the device takes it.
/// `mode`, `acc_len` and `angle_limit` are carried through from the
/// calibration without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkyWritingMode {
    pub enabled: bool,
    pub mode: i32,
    pub uniform_len: f64,
    pub acc_len: Option<f64>,
    pub angle_limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkyWriting {
    pub state: SkyWritingState,
    pub delays: DelayProfile,
    pub mode: SkyWritingMode,
}

/// Delays to use for `entry` in the given state.
///
/// With sky-writing on, jump and polygon delays must be zero or the
/// smoothing has no effect, and the laser delays come from the
/// sky-writing columns of the entry.
pub fn delay_profile(state: SkyWritingState, entry: &ProcessVariableEntry) -> DelayProfile {
    match state {
        SkyWritingState::On => DelayProfile {
            mark_delay: entry.mark_delay,
            jump_delay: 0,
            polygon_delay: 0,
            laser_on_delay: entry.laser_on_delay_for_sky_writing,
            laser_off_delay: entry.laser_off_delay_for_sky_writing,
        },
        SkyWritingState::Off => DelayProfile {
            mark_delay: entry.mark_delay,
            jump_delay: entry.jump_delay,
            polygon_delay: entry.polygon_delay,
            laser_on_delay: entry.laser_on_delay,
            laser_off_delay: entry.laser_off_delay,
        },
    }
}

/// Resolve sky-writing for a region.
///
/// # Arguments
/// * `requested` - The region's own setting. Always wins when present.
/// * `entry` - Process variables selected for the region's speed. Its flag
///   is used when the region does not say.
pub fn resolve(requested: Option<bool>, entry: &ProcessVariableEntry) -> SkyWriting {
    let enabled = requested.unwrap_or(entry.sky_writing_enabled);
    let state = SkyWritingState::from_enabled(enabled);
    SkyWriting {
        state,
        delays: delay_profile(state, entry),
        mode: SkyWritingMode {
            enabled,
            mode: entry.sky_writing_mode,
            uniform_len: entry.sky_writing_uniform_len,
            acc_len: entry.sky_writing_acc_len,
            angle_limit: entry.sky_writing_angle_limit,
        },
    }
}

#[cfg(test)]
use crate::calibration::test_entry;

#[test]
fn test_delay_switch() {
    let entry = test_entry(800);
    let on = resolve(Some(true), &entry);
    assert_eq!(on.state, SkyWritingState::On);
    assert_eq!(
        on.delays,
        DelayProfile {
            mark_delay: 470,
            jump_delay: 0,
            polygon_delay: 0,
            laser_on_delay: 600.0,
            laser_off_delay: 730.0,
        }
    );
    let off = resolve(Some(false), &entry);
    assert_eq!(off.state, SkyWritingState::Off);
    assert_eq!(
        off.delays,
        DelayProfile {
            mark_delay: 470,
            jump_delay: 40000,
            polygon_delay: 385,
            laser_on_delay: 420.0,
            laser_off_delay: 490.0,
        }
    );
}

#[test]
fn test_region_overrides_calibration() {
    let mut entry = test_entry(800);
    entry.sky_writing_enabled = true;
    assert_eq!(resolve(Some(false), &entry).state, SkyWritingState::Off);
    assert_eq!(resolve(None, &entry).state, SkyWritingState::On);
    entry.sky_writing_enabled = false;
    assert_eq!(resolve(Some(true), &entry).state, SkyWritingState::On);
    assert_eq!(resolve(None, &entry).state, SkyWritingState::Off);
}

#[test]
fn test_mode_pass_through() {
    let mut entry = test_entry(800);
    entry.sky_writing_mode = 2;
    entry.sky_writing_acc_len = Some(0.05);
    let sw = resolve(Some(true), &entry);
    assert_eq!(
        sw.mode,
        SkyWritingMode {
            enabled: true,
            mode: 2,
            uniform_len: 0.1,
            acc_len: Some(0.05),
            angle_limit: None,
        }
    );
    assert!(!resolve(Some(false), &entry).mode.enabled);
}
