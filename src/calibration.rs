//! Physical constants of one scanner head.
//!
//! A [`CalibrationModel`] is loaded once (see `calibration_parser`),
//! validated, and from then on only read. Every other component takes it
//! by shared reference, so it can be handed to any number of worker
//! threads at the same time.

use crate::coords::Point;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

/// Lowest laser on/off delay the scanner card accepts, in µs
pub const MIN_LASER_DELAY: f64 = -320.0;

/// Timing parameters valid for one nominal mark speed.
///
/// Speeds are in mm/s, delays in µs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVariableEntry {
    pub mark_speed: i32,
    pub jump_speed: i32,
    pub mark_delay: i32,
    pub jump_delay: i32,
    pub polygon_delay: i32,
    pub laser_on_delay: f64,
    pub laser_off_delay: f64,
    pub laser_on_delay_for_sky_writing: f64,
    pub laser_off_delay_for_sky_writing: f64,
    #[serde(default, alias = "swenable")]
    pub sky_writing_enabled: bool,
    #[serde(default, alias = "umax")]
    pub sky_writing_uniform_len: f64,
    /// Passed through to the device untouched
    #[serde(default)]
    pub sky_writing_mode: i32,
    /// Passed through to the device untouched
    #[serde(default)]
    pub sky_writing_acc_len: Option<f64>,
    /// Passed through to the device untouched
    #[serde(default)]
    pub sky_writing_angle_limit: Option<f64>,
}

impl ProcessVariableEntry {
    fn validate(&self, context: &str) -> Result<()> {
        let ints = [
            ("markSpeed", self.mark_speed),
            ("jumpSpeed", self.jump_speed),
            ("markDelay", self.mark_delay),
            ("jumpDelay", self.jump_delay),
            ("polygonDelay", self.polygon_delay),
        ];
        for &(field, v) in &ints {
            if v < 0 {
                return Err(Error::calibration(
                    field,
                    format!("{} must be >= 0, got {}", context, v),
                ));
            }
        }
        let delays = [
            ("laserOnDelay", self.laser_on_delay),
            ("laserOffDelay", self.laser_off_delay),
            ("laserOnDelayForSkyWriting", self.laser_on_delay_for_sky_writing),
            ("laserOffDelayForSkyWriting", self.laser_off_delay_for_sky_writing),
        ];
        for &(field, v) in &delays {
            if !v.is_finite() || v < MIN_LASER_DELAY {
                return Err(Error::calibration(
                    field,
                    format!(
                        "{} must be >= {}, got {}",
                        context, MIN_LASER_DELAY, v
                    ),
                ));
            }
        }
        if !self.sky_writing_uniform_len.is_finite() || self.sky_writing_uniform_len < 0.0 {
            return Err(Error::calibration(
                "skyWritingUniformLen",
                format!(
                    "{} must be >= 0, got {}",
                    context, self.sky_writing_uniform_len
                ),
            ));
        }
        Ok(())
    }
}

/// Identifies the scanner card a calibration belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub seq_index: Option<u32>,
}

fn one() -> f64 {
    1.0
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationModel {
    #[serde(default)]
    pub card_info: Option<CardInfo>,

    /// Beam diameter at zero focus offset, µm
    pub nominal_diameter_microns: f64,
    /// mm of Z offset per 10 µm of diameter change
    pub focus_coefficient: f64,
    /// When false, beam diameter does not move the focus
    #[serde(default = "enabled")]
    pub diameter_change_enabled: bool,

    /// Device output at equal normalized-power steps over [0, 1]
    pub power_correction_table: Vec<f64>,
    pub max_power_watts: f64,
    #[serde(default)]
    pub power_offset_enabled: bool,
    #[serde(default)]
    pub power_offset_k: f64,
    #[serde(default)]
    pub power_offset_c: f64,

    #[serde(default)]
    pub curvature_enabled: bool,
    #[serde(default)]
    pub curvature_a: f64,
    #[serde(default)]
    pub curvature_b: f64,
    #[serde(default)]
    pub curvature_c: f64,

    #[serde(default)]
    pub axis_offset_x: f64,
    #[serde(default)]
    pub axis_offset_y: f64,
    #[serde(default)]
    pub axis_offset_z: f64,
    #[serde(default = "one")]
    pub axis_scale_x: f64,
    #[serde(default = "one")]
    pub axis_scale_y: f64,
    #[serde(default = "one")]
    pub axis_scale_z: f64,
    #[serde(default)]
    pub axis_rotate_degrees: f64,

    /// Sorted by `mark_speed`, ascending
    pub process_variables: Vec<ProcessVariableEntry>,
    /// When false every region uses `default_process_variables`
    #[serde(default = "enabled")]
    pub dynamic_process_variables: bool,
    #[serde(default)]
    pub default_process_variables: Option<ProcessVariableEntry>,
}

assert_impl_all!(CalibrationModel: Send, Sync);

impl Default for CalibrationModel {
    fn default() -> Self {
        CalibrationModel {
            card_info: None,
            nominal_diameter_microns: 0.0,
            focus_coefficient: 0.0,
            diameter_change_enabled: true,
            power_correction_table: Vec::new(),
            max_power_watts: 0.0,
            power_offset_enabled: false,
            power_offset_k: 0.0,
            power_offset_c: 0.0,
            curvature_enabled: false,
            curvature_a: 0.0,
            curvature_b: 0.0,
            curvature_c: 0.0,
            axis_offset_x: 0.0,
            axis_offset_y: 0.0,
            axis_offset_z: 0.0,
            axis_scale_x: 1.0,
            axis_scale_y: 1.0,
            axis_scale_z: 1.0,
            axis_rotate_degrees: 0.0,
            process_variables: Vec::new(),
            dynamic_process_variables: true,
            default_process_variables: None,
        }
    }
}

fn check_finite(field: &'static str, v: f64) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(Error::calibration(field, format!("must be finite, got {}", v)))
    }
}

impl CalibrationModel {
    pub fn axis_scale(&self) -> Point {
        Point::new(self.axis_scale_x, self.axis_scale_y)
    }

    pub fn axis_offset(&self) -> Point {
        Point::new(self.axis_offset_x, self.axis_offset_y)
    }

    /// Checks every precondition the converters rely on.
    ///
    /// A zero `focus_coefficient` is accepted here, since only the inverse
    /// conversion needs it; `focus::z_to_diameter` reports it on use.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("nominalDiameterMicrons", self.nominal_diameter_microns),
            ("focusCoefficient", self.focus_coefficient),
            ("maxPowerWatts", self.max_power_watts),
            ("powerOffsetK", self.power_offset_k),
            ("powerOffsetC", self.power_offset_c),
            ("curvatureA", self.curvature_a),
            ("curvatureB", self.curvature_b),
            ("curvatureC", self.curvature_c),
            ("axisOffsetX", self.axis_offset_x),
            ("axisOffsetY", self.axis_offset_y),
            ("axisOffsetZ", self.axis_offset_z),
            ("axisScaleX", self.axis_scale_x),
            ("axisScaleY", self.axis_scale_y),
            ("axisScaleZ", self.axis_scale_z),
            ("axisRotateDegrees", self.axis_rotate_degrees),
        ];
        for &(field, v) in &finite {
            check_finite(field, v)?;
        }
        if self.nominal_diameter_microns <= 0.0 {
            return Err(Error::calibration(
                "nominalDiameterMicrons",
                format!("must be > 0, got {}", self.nominal_diameter_microns),
            ));
        }
        if self.max_power_watts <= 0.0 {
            return Err(Error::calibration(
                "maxPowerWatts",
                format!("must be > 0, got {}", self.max_power_watts),
            ));
        }
        if self.power_correction_table.len() < 2 {
            return Err(Error::calibration(
                "powerCorrectionTable",
                format!(
                    "needs at least 2 entries, got {}",
                    self.power_correction_table.len()
                ),
            ));
        }
        if let Some(v) = self.power_correction_table.iter().find(|v| !v.is_finite()) {
            return Err(Error::calibration(
                "powerCorrectionTable",
                format!("contains non-finite value {}", v),
            ));
        }
        for &(field, v) in &[
            ("axisScaleX", self.axis_scale_x),
            ("axisScaleY", self.axis_scale_y),
            ("axisScaleZ", self.axis_scale_z),
        ] {
            if v == 0.0 {
                return Err(Error::calibration(field, "must not be 0"));
            }
        }
        if self.process_variables.is_empty() {
            return Err(Error::calibration("processVariables", "must not be empty"));
        }
        for (i, entry) in self.process_variables.iter().enumerate() {
            entry.validate(&format!("processVariables[{}]", i))?;
        }
        if let Some(pair) = self
            .process_variables
            .windows(2)
            .find(|w| w[0].mark_speed > w[1].mark_speed)
        {
            return Err(Error::calibration(
                "processVariables",
                format!(
                    "not sorted by markSpeed: {} before {}",
                    pair[0].mark_speed, pair[1].mark_speed
                ),
            ));
        }
        if let Some(entry) = &self.default_process_variables {
            entry.validate("defaultProcessVariables")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_entry(mark_speed: i32) -> ProcessVariableEntry {
    ProcessVariableEntry {
        mark_speed,
        jump_speed: 5000,
        mark_delay: 470,
        jump_delay: 40000,
        polygon_delay: 385,
        laser_on_delay: 420.0,
        laser_off_delay: 490.0,
        laser_on_delay_for_sky_writing: 600.0,
        laser_off_delay_for_sky_writing: 730.0,
        sky_writing_enabled: false,
        sky_writing_uniform_len: 0.1,
        ..Default::default()
    }
}

#[cfg(test)]
pub(crate) fn test_calibration() -> CalibrationModel {
    CalibrationModel {
        nominal_diameter_microns: 120.0,
        focus_coefficient: 0.3,
        power_correction_table: vec![0.0, 1.0],
        max_power_watts: 500.0,
        process_variables: vec![test_entry(550), test_entry(800), test_entry(1600)],
        ..Default::default()
    }
}

#[test]
fn test_valid_calibration() {
    assert!(test_calibration().validate().is_ok());
}

#[test]
fn test_empty_process_variables() {
    let calib = CalibrationModel {
        process_variables: vec![],
        ..test_calibration()
    };
    match calib.validate() {
        Err(Error::InvalidCalibration { field, .. }) => assert_eq!(field, "processVariables"),
        r => panic!("unexpected {:?}", r),
    }
}

#[test]
fn test_short_power_table() {
    let calib = CalibrationModel {
        power_correction_table: vec![1.0],
        ..test_calibration()
    };
    match calib.validate() {
        Err(Error::InvalidCalibration { field, .. }) => assert_eq!(field, "powerCorrectionTable"),
        r => panic!("unexpected {:?}", r),
    }
}

#[test]
fn test_unsorted_process_variables() {
    let calib = CalibrationModel {
        process_variables: vec![test_entry(800), test_entry(550)],
        ..test_calibration()
    };
    assert!(calib.validate().is_err());
}

#[test]
fn test_laser_delay_limit() {
    let mut entry = test_entry(800);
    entry.laser_off_delay_for_sky_writing = -321.0;
    let calib = CalibrationModel {
        process_variables: vec![entry],
        ..test_calibration()
    };
    match calib.validate() {
        Err(Error::InvalidCalibration { field, .. }) => {
            assert_eq!(field, "laserOffDelayForSkyWriting")
        }
        r => panic!("unexpected {:?}", r),
    }
    let mut entry = test_entry(800);
    entry.laser_on_delay = -320.0;
    let calib = CalibrationModel {
        process_variables: vec![entry],
        ..test_calibration()
    };
    assert!(calib.validate().is_ok());
}

#[test]
fn test_zero_focus_coefficient_accepted() {
    let calib = CalibrationModel {
        focus_coefficient: 0.0,
        ..test_calibration()
    };
    assert!(calib.validate().is_ok());
}

#[test]
fn test_default_entry_named_in_error() {
    let mut entry = test_entry(800);
    entry.jump_delay = -1;
    let calib = CalibrationModel {
        default_process_variables: Some(entry),
        ..test_calibration()
    };
    match calib.validate() {
        Err(Error::InvalidCalibration { field, reason }) => {
            assert_eq!(field, "jumpDelay");
            assert!(reason.starts_with("defaultProcessVariables "), "{}", reason);
        }
        r => panic!("unexpected {:?}", r),
    }
    let mut entry = test_entry(1600);
    entry.mark_delay = -5;
    let calib = CalibrationModel {
        process_variables: vec![test_entry(550), entry],
        ..test_calibration()
    };
    match calib.validate() {
        Err(Error::InvalidCalibration { reason, .. }) => {
            assert!(reason.starts_with("processVariables[1] "), "{}", reason)
        }
        r => panic!("unexpected {:?}", r),
    }
}
