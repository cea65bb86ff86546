use super::super::{
    calibration::{CalibrationModel, ProcessVariableEntry},
    calibration_parser::{parse_calibration, parse_layer},
    coords::Point,
    error::Error,
    partition::PartitionOrder,
    pipeline::{build_layer, build_layer_with, resolve_regions},
    region::RegionSpec,
};

const CALIBRATION: &str = r#"{
    "nominalDiameterMicrons": 120.0,
    "focusCoefficient": 0.3,
    "powerCorrectionTable": [0.0, 0.25, 0.5, 0.75, 1.0],
    "maxPowerWatts": 500.0,
    "curvatureEnabled": true,
    "curvatureA": 0.0001,
    "curvatureB": 0.0,
    "curvatureC": 0.0,
    "axisOffsetZ": 0.1,
    "processVariables": [
        {"markSpeed": 500, "jumpSpeed": 5000, "markDelay": 470, "jumpDelay": 40000,
         "polygonDelay": 385, "laserOnDelay": 420.0, "laserOffDelay": 490.0,
         "laserOnDelayForSkyWriting": 600.0, "laserOffDelayForSkyWriting": 730.0,
         "swenable": true, "umax": 0.1},
        {"markSpeed": 1000, "jumpSpeed": 5000, "markDelay": 300, "jumpDelay": 30000,
         "polygonDelay": 200, "laserOnDelay": 400.0, "laserOffDelay": 450.0,
         "laserOnDelayForSkyWriting": 580.0, "laserOffDelayForSkyWriting": 700.0,
         "swenable": false, "umax": 0.1}
    ]
}"#;

const LAYER: &str = r#"[
    {"name": "edges", "beamDiameterMicrons": 80, "powerWatts": 140,
     "speedMmPerSec": 550, "skyWritingRequested": true,
     "geometry": [{"x": 30, "y": 40}, {"x": -30, "y": 40}]},
    {"name": "downskin_hatch", "beamDiameterMicrons": 80, "powerWatts": 180,
     "speedMmPerSec": -1600, "skyWritingRequested": true, "geometry": []},
    {"name": "support_border", "beamDiameterMicrons": 100, "powerWatts": 100,
     "speedMmPerSec": 425, "skyWritingRequested": false,
     "geometry": [{"x": 0, "y": 0}]}
]"#;

fn region(name: &str, sky_writing: bool) -> RegionSpec {
    RegionSpec {
        name: name.to_string(),
        beam_diameter_microns: 90.0,
        power_watts: 200.0,
        speed_mm_per_sec: 700.0,
        sky_writing_requested: Some(sky_writing),
        geometry: vec![Point::new(1.0, 2.0)],
    }
}

#[test]
fn test_bad_region_does_not_abort_layer() {
    let calib = parse_calibration(CALIBRATION).unwrap();
    let layer = parse_layer(LAYER).unwrap();
    let jobs = build_layer(&layer, &calib).unwrap();

    assert!(!jobs.is_complete());
    assert_eq!(jobs.rejected.len(), 1);
    let (index, error) = &jobs.rejected[0];
    assert_eq!(*index, 1);
    assert_eq!(error.region_name(), Some("downskin_hatch"));

    assert_eq!(jobs.groups.len(), 2);
    assert_eq!(jobs.groups[0].names(), vec!["edges"]);
    assert_eq!(jobs.groups[1].names(), vec!["support_border"]);

    let edges = &jobs.groups[0].regions()[0];
    // r = 50, field correction 0.25, focus -1.2, axis 0.1
    for p in &edges.transformed_geometry {
        assert_relative_eq!(p.z, -1.2 + 0.25 + 0.1, max_relative = 1e-12);
    }
    assert_relative_eq!(edges.corrected_power_percent, 28.0, max_relative = 1e-12);
    assert_eq!(edges.process_variables.mark_speed, 500);

    let support = &jobs.groups[1].regions()[0];
    assert_relative_eq!(support.focus_z, -0.6, max_relative = 1e-12);
    assert_relative_eq!(support.transformed_geometry[0].z, -0.5, max_relative = 1e-12);
}

#[test]
fn test_invalid_calibration_is_fatal() {
    let calib = CalibrationModel {
        process_variables: Vec::new(),
        ..parse_calibration(CALIBRATION).unwrap()
    };
    match build_layer(&[region("edges", true)], &calib) {
        Err(Error::InvalidCalibration { field, .. }) => assert_eq!(field, "processVariables"),
        r => panic!("unexpected {:?}", r),
    }
}

#[test]
fn test_parallel_results_in_input_order() {
    let calib = parse_calibration(CALIBRATION).unwrap();
    let layer: Vec<RegionSpec> = (0..500)
        .map(|i| region(&format!("r{}", i), (i / 7) % 2 == 0))
        .collect();
    let resolved = resolve_regions(&layer, &calib);
    assert_eq!(resolved.len(), layer.len());
    for (spec, r) in layer.iter().zip(&resolved) {
        assert_eq!(r.as_ref().unwrap().name, spec.name);
    }

    let jobs = build_layer(&layer, &calib).unwrap();
    let names: Vec<&str> = jobs.groups.iter().flat_map(|g| g.names()).collect();
    let expected: Vec<&str> = layer.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, expected);
    assert_eq!(jobs.groups.len(), (500 + 6) / 7);
}

#[test]
fn test_merge_by_flag_layer() {
    let calib = parse_calibration(CALIBRATION).unwrap();
    let layer = vec![
        region("edges", true),
        region("support_hatch", false),
        region("upskin_hatch", true),
    ];
    let jobs = build_layer_with(&layer, &calib, PartitionOrder::MergeByFlag).unwrap();
    assert_eq!(jobs.groups.len(), 2);
    assert_eq!(jobs.groups[0].names(), vec!["edges", "upskin_hatch"]);
    assert_eq!(jobs.groups[1].names(), vec!["support_hatch"]);
}

#[test]
fn test_diameter_change_disabled() {
    let calib = CalibrationModel {
        diameter_change_enabled: false,
        curvature_enabled: false,
        ..parse_calibration(CALIBRATION).unwrap()
    };
    let jobs = build_layer(&[region("edges", true)], &calib).unwrap();
    let r = &jobs.groups[0].regions()[0];
    assert_eq!(r.focus_z, 0.0);
    assert_relative_eq!(r.transformed_geometry[0].z, 0.1);
}

#[test]
fn test_power_above_range_still_resolves() {
    let calib = CalibrationModel {
        power_offset_enabled: true,
        power_offset_k: 0.0,
        power_offset_c: 10.0,
        process_variables: vec![ProcessVariableEntry {
            mark_speed: 700,
            ..Default::default()
        }],
        ..parse_calibration(CALIBRATION).unwrap()
    };
    let mut spec = region("edges", false);
    spec.power_watts = 900.0;
    let jobs = build_layer(&[spec], &calib).unwrap();
    assert!(jobs.is_complete());
    let r = &jobs.groups[0].regions()[0];
    assert_relative_eq!(r.corrected_power_percent, 110.0);
    assert_eq!(r.mark_parameters.out_of_range().len(), 1);
}
