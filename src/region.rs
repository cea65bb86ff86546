use crate::calibration::{ProcessVariableEntry, MIN_LASER_DELAY};
use crate::coords::{Point, Point3};
use crate::error::{Error, Result};
use crate::sky_writing::{DelayProfile, SkyWriting};
use serde::{Deserialize, Serialize};

/// Process intent for one named region of a build layer,
/// e.g. "downskin_hatch".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSpec {
    pub name: String,
    pub beam_diameter_microns: f64,
    pub power_watts: f64,
    pub speed_mm_per_sec: f64,
    /// `None` leaves the decision to the calibration
    #[serde(default)]
    pub sky_writing_requested: Option<bool>,
    /// Open or closed polyline, mm
    #[serde(default)]
    pub geometry: Vec<Point>,
}

impl RegionSpec {
    /// Rejects numbers no scanner can act on. Geometry is not checked.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("beamDiameterMicrons", self.beam_diameter_microns),
            ("powerWatts", self.power_watts),
            ("speedMmPerSec", self.speed_mm_per_sec),
        ];
        for &(field, v) in &fields {
            if !v.is_finite() {
                return Err(Error::region(
                    &self.name,
                    field,
                    format!("must be finite, got {}", v),
                ));
            }
        }
        if self.beam_diameter_microns <= 0.0 {
            return Err(Error::region(
                &self.name,
                "beamDiameterMicrons",
                format!("must be > 0, got {}", self.beam_diameter_microns),
            ));
        }
        if self.power_watts < 0.0 {
            return Err(Error::region(
                &self.name,
                "powerWatts",
                format!("must be >= 0, got {}", self.power_watts),
            ));
        }
        if self.speed_mm_per_sec <= 0.0 {
            return Err(Error::region(
                &self.name,
                "speedMmPerSec",
                format!("must be > 0, got {}", self.speed_mm_per_sec),
            ));
        }
        Ok(())
    }
}

/// Everything the scanner needs to mark one region, in device units:
/// speeds in mm/s, delays in µs, power in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkParameters {
    pub mark_speed: i32,
    pub jump_speed: i32,
    pub mark_delay: i32,
    pub jump_delay: i32,
    pub polygon_delay: i32,
    pub laser_on_delay: f64,
    pub laser_off_delay: f64,
    pub laser_power: f64,
    pub mark_count: u32,
}

impl MarkParameters {
    pub fn new(entry: &ProcessVariableEntry, delays: &DelayProfile, laser_power: f64) -> Self {
        MarkParameters {
            mark_speed: entry.mark_speed,
            jump_speed: entry.jump_speed,
            mark_delay: delays.mark_delay,
            jump_delay: delays.jump_delay,
            polygon_delay: delays.polygon_delay,
            laser_on_delay: delays.laser_on_delay,
            laser_off_delay: delays.laser_off_delay,
            laser_power,
            mark_count: 1,
        }
    }

    /// Values the device would refuse or clip. Empty when all are in range.
    pub fn out_of_range(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(0.0..=100.0).contains(&self.laser_power) {
            problems.push(format!("laser power {}% outside [0, 100]", self.laser_power));
        }
        if self.laser_on_delay < MIN_LASER_DELAY {
            problems.push(format!(
                "laser on delay {} µs below {}",
                self.laser_on_delay, MIN_LASER_DELAY
            ));
        }
        if self.laser_off_delay < MIN_LASER_DELAY {
            problems.push(format!(
                "laser off delay {} µs below {}",
                self.laser_off_delay, MIN_LASER_DELAY
            ));
        }
        problems
    }
}

/// A region with every parameter resolved against the calibration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRegion {
    pub name: String,
    pub focus_z: f64,
    pub corrected_power_percent: f64,
    pub process_variables: ProcessVariableEntry,
    pub sky_writing: SkyWriting,
    pub mark_parameters: MarkParameters,
    pub transformed_geometry: Vec<Point3>,
}

impl ResolvedRegion {
    pub fn sky_writing_enabled(&self) -> bool {
        self.sky_writing.state.is_enabled()
    }
}

#[cfg(test)]
pub(crate) fn test_resolved(name: &str, sky_writing: bool) -> ResolvedRegion {
    use crate::calibration::test_entry;
    let entry = test_entry(800);
    let sky_writing = crate::sky_writing::resolve(Some(sky_writing), &entry);
    ResolvedRegion {
        name: name.to_string(),
        focus_z: 0.0,
        corrected_power_percent: 50.0,
        mark_parameters: MarkParameters::new(&entry, &sky_writing.delays, 50.0),
        process_variables: entry,
        sky_writing,
        transformed_geometry: vec![],
    }
}

#[cfg(test)]
fn spec(diameter: f64, power: f64, speed: f64) -> RegionSpec {
    RegionSpec {
        name: "infill_hatch".to_string(),
        beam_diameter_microns: diameter,
        power_watts: power,
        speed_mm_per_sec: speed,
        sky_writing_requested: None,
        geometry: vec![Point::new(f64::NAN, 0.0)],
    }
}

#[test]
fn test_region_validation() {
    assert!(spec(80.0, 260.0, 900.0).validate().is_ok());
    assert!(spec(80.0, 0.0, 900.0).validate().is_ok());
    let bad = [
        (spec(f64::NAN, 260.0, 900.0), "beamDiameterMicrons"),
        (spec(0.0, 260.0, 900.0), "beamDiameterMicrons"),
        (spec(80.0, -1.0, 900.0), "powerWatts"),
        (spec(80.0, f64::INFINITY, 900.0), "powerWatts"),
        (spec(80.0, 260.0, -900.0), "speedMmPerSec"),
        (spec(80.0, 260.0, 0.0), "speedMmPerSec"),
    ];
    for (s, expected) in bad.iter() {
        match s.validate() {
            Err(Error::InvalidRegionInput { region, field, .. }) => {
                assert_eq!(region, "infill_hatch");
                assert_eq!(field, *expected);
            }
            r => panic!("unexpected {:?}", r),
        }
    }
}

#[test]
fn test_mark_parameters_range() {
    let r = test_resolved("edges", true);
    assert!(r.mark_parameters.out_of_range().is_empty());
    assert_eq!(r.mark_parameters.mark_count, 1);
    assert_eq!(r.mark_parameters.jump_delay, 0);
    let mut p = r.mark_parameters.clone();
    p.laser_power = 104.0;
    p.laser_off_delay = -400.0;
    assert_eq!(p.out_of_range().len(), 2);
}
