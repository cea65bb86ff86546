use crate::calibration::CalibrationModel;
use crate::error::{Error, Result};
use log::debug;

/// Corrected device power in percent for a requested optical power.
///
/// The correction table holds the device output fraction at equally
/// spaced normalized powers over [0, 1]. Requests outside the table range
/// are clamped to the nearest end point, never extrapolated. When power
/// offset is enabled the interpolated percentage `p` becomes
/// `p + k*p + c`.
///
/// # Arguments
/// * `requested_watts` - Optical power wanted at the work surface
/// * `calib` - Calibration holding the table and offset terms
pub fn correct(requested_watts: f64, calib: &CalibrationModel) -> Result<f64> {
    let table = &calib.power_correction_table;
    if table.len() < 2 {
        return Err(Error::calibration(
            "powerCorrectionTable",
            format!("needs at least 2 entries, got {}", table.len()),
        ));
    }
    if calib.max_power_watts <= 0.0 {
        return Err(Error::calibration(
            "maxPowerWatts",
            format!("must be > 0, got {}", calib.max_power_watts),
        ));
    }
    let raw = requested_watts / calib.max_power_watts;
    let normalized = num::clamp(raw, 0.0, 1.0);
    if normalized != raw {
        debug!(
            "Requested power {} W outside [0, {}] W, clamped",
            requested_watts, calib.max_power_watts
        );
    }

    let steps = table.len() - 1;
    let step_size = 1.0 / steps as f64;
    let lower = ((normalized / step_size).floor() as usize).min(steps - 1);
    let t = (normalized - lower as f64 * step_size) / step_size;
    let value = table[lower] + (table[lower + 1] - table[lower]) * t;

    let mut percent = value * 100.0;
    if calib.power_offset_enabled {
        percent += calib.power_offset_k * percent + calib.power_offset_c;
    }
    Ok(percent)
}

#[cfg(test)]
use crate::calibration::test_calibration;

#[cfg(test)]
fn table_calibration(table: Vec<f64>) -> CalibrationModel {
    CalibrationModel {
        power_correction_table: table,
        ..test_calibration()
    }
}

#[test]
fn test_identity_table() {
    let calib = test_calibration();
    assert_relative_eq!(correct(280.0, &calib).unwrap(), 56.0, max_relative = 1e-12);
    assert_eq!(correct(0.0, &calib).unwrap(), 0.0);
    assert_relative_eq!(correct(500.0, &calib).unwrap(), 100.0);
}

#[test]
fn test_interpolation() {
    let calib = table_calibration(vec![0.0, 0.3, 0.5, 1.0]);
    // Steps at 0, 1/3, 2/3 and 1
    assert_relative_eq!(correct(500.0 / 3.0, &calib).unwrap(), 30.0, max_relative = 1e-9);
    assert_relative_eq!(correct(250.0, &calib).unwrap(), 40.0, max_relative = 1e-9);
    assert_relative_eq!(correct(500.0 * 5.0 / 6.0, &calib).unwrap(), 75.0, max_relative = 1e-9);
}

#[test]
fn test_clamp() {
    let calib = table_calibration(vec![0.05, 0.3, 0.5, 0.97]);
    let low = correct(0.0, &calib).unwrap();
    let high = correct(calib.max_power_watts, &calib).unwrap();
    assert_relative_eq!(low, 5.0, max_relative = 1e-12);
    assert_relative_eq!(high, 97.0, max_relative = 1e-12);
    for i in 1..100 {
        let w = i as f64 * 13.7;
        assert_eq!(correct(-w, &calib).unwrap(), low);
        assert_eq!(correct(calib.max_power_watts + w, &calib).unwrap(), high);
    }
}

#[test]
fn test_monotonic() {
    let calib = table_calibration(vec![0.0, 0.1, 0.1, 0.35, 0.6, 0.62, 1.0]);
    let mut prev = correct(-10.0, &calib).unwrap();
    for i in -10..=520 {
        let p = correct(i as f64, &calib).unwrap();
        assert!(p >= prev, "{} < {} at {} W", p, prev, i);
        prev = p;
    }
}

#[test]
fn test_power_offset() {
    let calib = CalibrationModel {
        power_offset_enabled: true,
        power_offset_k: 0.1,
        power_offset_c: 2.0,
        ..test_calibration()
    };
    assert_relative_eq!(correct(280.0, &calib).unwrap(), 63.6, max_relative = 1e-12);
    let calib = CalibrationModel {
        power_offset_enabled: false,
        ..calib
    };
    assert_relative_eq!(correct(280.0, &calib).unwrap(), 56.0, max_relative = 1e-12);
}

#[test]
fn test_short_table() {
    let calib = table_calibration(vec![1.0]);
    assert!(correct(100.0, &calib).unwrap_err().is_calibration_error());
    let calib = table_calibration(vec![]);
    assert!(correct(100.0, &calib).is_err());
}
