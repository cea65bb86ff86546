use crate::calibration::CalibrationModel;
use crate::error::Result;
use crate::region::RegionSpec;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};

fn open(file_name: &str) -> Result<BufReader<File>> {
    let file = File::open(file_name)?;
    Ok(BufReader::new(file))
}

fn validated(calib: Vec<CalibrationModel>) -> Result<Vec<CalibrationModel>> {
    for c in &calib {
        c.validate()?;
        debug!(
            "Calibration loaded: card {:?}, {} process variable entries, {} power table entries",
            c.card_info,
            c.process_variables.len(),
            c.power_correction_table.len()
        );
    }
    Ok(calib)
}

/// A calibration file holds either one card or an array with one entry
/// per card
fn from_reader<R: Read>(reader: R) -> Result<Vec<CalibrationModel>> {
    let value: Value = serde_json::from_reader(reader)?;
    let calib = if value.is_array() {
        Vec::<CalibrationModel>::deserialize(value)?
    } else {
        vec![CalibrationModel::deserialize(value)?]
    };
    validated(calib)
}

/// Parse and validate all calibrations in a JSON document
pub fn parse_calibrations(json: &str) -> Result<Vec<CalibrationModel>> {
    from_reader(json.as_bytes())
}

/// Parse and validate a single calibration
pub fn parse_calibration(json: &str) -> Result<CalibrationModel> {
    let calib: CalibrationModel = serde_json::from_str(json)?;
    calib.validate()?;
    Ok(calib)
}

/// Read all calibrations from a file. A file holding a single object
/// yields one calibration.
pub fn read_calibrations(file_name: &str) -> Result<Vec<CalibrationModel>> {
    from_reader(open(file_name)?)
}

pub fn read_calibration(file_name: &str) -> Result<CalibrationModel> {
    let calib: CalibrationModel = serde_json::from_reader(open(file_name)?)?;
    calib.validate()?;
    Ok(calib)
}

/// Parse the ordered regions of one build layer
pub fn parse_layer(json: &str) -> Result<Vec<RegionSpec>> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_layer(file_name: &str) -> Result<Vec<RegionSpec>> {
    Ok(serde_json::from_reader(open(file_name)?)?)
}

#[cfg(test)]
use crate::error::Error;

#[cfg(test)]
const CARD_JSON: &str = r#"{
    "cardInfo": {"ipAddress": "172.18.34.227", "seqIndex": 0},
    "nominalDiameterMicrons": 120.0,
    "focusCoefficient": 0.3,
    "powerCorrectionTable": [0.0, 0.52, 1.0],
    "maxPowerWatts": 500.0,
    "curvatureEnabled": true,
    "curvatureA": 0.0001,
    "processVariables": [
        {"markSpeed": 550, "jumpSpeed": 5000, "markDelay": 470, "jumpDelay": 40000,
         "polygonDelay": 385, "laserOnDelay": 420.0, "laserOffDelay": 490.0,
         "laserOnDelayForSkyWriting": 600.0, "laserOffDelayForSkyWriting": 730.0,
         "swenable": true, "umax": 0.1},
        {"markSpeed": 800, "jumpSpeed": 5000, "markDelay": 470, "jumpDelay": 40000,
         "polygonDelay": 385, "laserOnDelay": 420.0, "laserOffDelay": 490.0,
         "laserOnDelayForSkyWriting": 600.0, "laserOffDelayForSkyWriting": 730.0,
         "skyWritingEnabled": false, "skyWritingAngleLimit": 120.0}
    ]
}"#;

#[test]
fn test_parse_calibration() {
    let calib = parse_calibration(CARD_JSON).unwrap();
    assert_eq!(calib.process_variables.len(), 2);
    assert!(calib.process_variables[0].sky_writing_enabled);
    assert_relative_eq!(calib.process_variables[0].sky_writing_uniform_len, 0.1);
    assert_eq!(calib.process_variables[1].sky_writing_angle_limit, Some(120.0));
    assert_eq!(calib.process_variables[1].sky_writing_acc_len, None);
    assert_eq!(calib.axis_scale_x, 1.0);
    assert!(calib.diameter_change_enabled);
    assert!(calib.curvature_enabled);
    assert_eq!(
        calib.card_info.and_then(|c| c.ip_address),
        Some("172.18.34.227".to_string())
    );
}

#[test]
fn test_parse_calibration_array() {
    let json = format!("[{}, {}]", CARD_JSON, CARD_JSON);
    let calib = parse_calibrations(&json).unwrap();
    assert_eq!(calib.len(), 2);
    let calib = parse_calibrations(CARD_JSON).unwrap();
    assert_eq!(calib.len(), 1);
}

#[test]
fn test_parse_invalid_calibration() {
    let json = CARD_JSON.replace("[0.0, 0.52, 1.0]", "[0.0]");
    assert!(parse_calibration(&json).unwrap_err().is_calibration_error());
    assert!(parse_calibration("{").is_err());
}

#[test]
fn test_parse_layer() {
    let regions = parse_layer(
        r#"[
        {"name": "edges", "beamDiameterMicrons": 80, "powerWatts": 140,
         "speedMmPerSec": 550, "skyWritingRequested": true,
         "geometry": [{"x": 0, "y": 0}, {"x": 5, "y": 0}]},
        {"name": "support_hatch", "beamDiameterMicrons": 80, "powerWatts": 260,
         "speedMmPerSec": 900, "geometry": []}
    ]"#,
    )
    .unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].sky_writing_requested, Some(true));
    assert_eq!(regions[1].sky_writing_requested, None);
    assert_eq!(regions[0].geometry.len(), 2);
}

#[test]
fn test_schema_error_keeps_detail() {
    let json = CARD_JSON.replace("\"focusCoefficient\": 0.3", "\"focusCoefficient\": \"0.3\"");
    for doc in &[json.clone(), format!("[{}]", json)] {
        match parse_calibrations(doc) {
            Err(Error::Parse(e)) => {
                let msg = e.to_string();
                assert!(msg.contains("expected f64"), "{}", msg);
                assert!(!msg.contains("did not match any variant"), "{}", msg);
            }
            r => panic!("unexpected {:?}", r),
        }
    }
}
