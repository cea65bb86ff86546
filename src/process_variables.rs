use crate::calibration::{CalibrationModel, ProcessVariableEntry};
use crate::error::{Error, Result};
use log::debug;

/// Select the process variable entry whose mark speed is closest to `speed`.
///
/// Entries are sorted by ascending mark speed, so on a tie the entry with
/// the lower mark speed wins. With dynamic process variables switched off
/// the configured default entry (or the first entry) is used for every
/// speed.
///
/// # Arguments
/// * `speed` - Requested mark speed in mm/s
/// * `calib` - Calibration holding the entries
pub fn select(speed: f64, calib: &CalibrationModel) -> Result<&ProcessVariableEntry> {
    let entries = &calib.process_variables;
    let first = match entries.first() {
        Some(e) => e,
        None => return Err(Error::calibration("processVariables", "must not be empty")),
    };
    if !calib.dynamic_process_variables {
        return Ok(calib.default_process_variables.as_ref().unwrap_or(first));
    }

    let mut best = first;
    let mut best_dist = (first.mark_speed as f64 - speed).abs();
    for entry in &entries[1..] {
        let dist = (entry.mark_speed as f64 - speed).abs();
        if dist < best_dist {
            best = entry;
            best_dist = dist;
        }
    }
    debug!(
        "Speed {} mm/s uses process variables for {} mm/s",
        speed, best.mark_speed
    );
    Ok(best)
}

#[cfg(test)]
use crate::calibration::{test_calibration, test_entry};

#[test]
fn test_nearest() {
    let calib = test_calibration(); // 550, 800, 1600
    assert_eq!(select(800.0, &calib).unwrap().mark_speed, 800);
    assert_eq!(select(0.0, &calib).unwrap().mark_speed, 550);
    assert_eq!(select(650.0, &calib).unwrap().mark_speed, 550);
    assert_eq!(select(700.0, &calib).unwrap().mark_speed, 800);
    assert_eq!(select(1199.5, &calib).unwrap().mark_speed, 800);
    assert_eq!(select(1201.0, &calib).unwrap().mark_speed, 1600);
    assert_eq!(select(90000.0, &calib).unwrap().mark_speed, 1600);
}

#[test]
fn test_tie_prefers_lower_speed() {
    let calib = test_calibration();
    assert_eq!(select(675.0, &calib).unwrap().mark_speed, 550);
    assert_eq!(select(1200.0, &calib).unwrap().mark_speed, 800);
}

#[test]
fn test_static_process_variables() {
    let mut default = test_entry(425);
    default.mark_delay = 100;
    let calib = CalibrationModel {
        dynamic_process_variables: false,
        default_process_variables: Some(default),
        ..test_calibration()
    };
    let entry = select(1600.0, &calib).unwrap();
    assert_eq!(entry.mark_speed, 425);
    assert_eq!(entry.mark_delay, 100);

    let calib = CalibrationModel {
        dynamic_process_variables: false,
        ..test_calibration()
    };
    assert_eq!(select(1600.0, &calib).unwrap().mark_speed, 550);
}

#[test]
fn test_empty() {
    let calib = CalibrationModel {
        process_variables: vec![],
        ..test_calibration()
    };
    assert!(select(800.0, &calib).unwrap_err().is_calibration_error());
}
