use super::super::{
    calibration::{CalibrationModel, ProcessVariableEntry},
    coords::Point,
    operation::{play, Operation},
    pipeline::{build_layer, resolve_region},
    region::RegionSpec,
};

fn entry(mark_speed: i32, sky_writing: bool) -> ProcessVariableEntry {
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
        sky_writing_enabled: sky_writing,
        sky_writing_uniform_len: 0.1,
        ..Default::default()
    }
}

fn calibration() -> CalibrationModel {
    CalibrationModel {
        nominal_diameter_microns: 120.0,
        focus_coefficient: 0.3,
        power_correction_table: vec![0.0, 1.0],
        max_power_watts: 500.0,
        process_variables: vec![entry(550, true), entry(800, false), entry(1600, true)],
        ..Default::default()
    }
}

fn region(name: &str, power: f64, speed: f64, sky_writing: Option<bool>) -> RegionSpec {
    RegionSpec {
        name: name.to_string(),
        beam_diameter_microns: 80.0,
        power_watts: power,
        speed_mm_per_sec: speed,
        sky_writing_requested: sky_writing,
        geometry: vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(0.0, 0.0),
        ],
    }
}

#[test]
fn test_single_region() {
    let calib = calibration();
    let r = resolve_region(&region("downskin_hatch", 280.0, 800.0, Some(false)), &calib).unwrap();
    assert_relative_eq!(r.focus_z, -1.2, max_relative = 1e-12);
    assert_relative_eq!(r.corrected_power_percent, 56.0, max_relative = 1e-12);
    assert_relative_eq!(r.mark_parameters.laser_power, 56.0, max_relative = 1e-12);
    assert_eq!(r.process_variables.mark_speed, 800);
    assert!(!r.sky_writing_enabled());
    assert_eq!(r.mark_parameters.jump_delay, 40000);
    assert_eq!(r.mark_parameters.polygon_delay, 385);
    assert_eq!(r.mark_parameters.laser_on_delay, 420.0);
    assert_eq!(r.transformed_geometry.len(), 4);
    for (p, q) in r.transformed_geometry.iter().zip(&region("", 0.0, 1.0, None).geometry) {
        assert_eq!(p.x, q.x);
        assert_eq!(p.y, q.y);
        assert_relative_eq!(p.z, -1.2, max_relative = 1e-12);
    }
}

#[test]
fn test_three_regions_two_groups() {
    let calib = calibration();
    let layer = vec![
        region("edges", 140.0, 550.0, Some(true)),
        region("infill_hatch", 260.0, 900.0, Some(true)),
        region("support_hatch", 260.0, 900.0, Some(false)),
    ];
    let jobs = build_layer(&layer, &calib).unwrap();
    assert!(jobs.is_complete());
    assert_eq!(jobs.groups.len(), 2);
    assert_eq!(jobs.groups[0].len(), 2);
    assert_eq!(jobs.groups[1].len(), 1);
    assert_eq!(jobs.groups[0].names(), vec!["edges", "infill_hatch"]);
    assert_eq!(jobs.groups[1].names(), vec!["support_hatch"]);

    // Sky-writing zeroes jump and polygon delays
    let infill = &jobs.groups[0].regions()[1];
    assert_eq!(infill.mark_parameters.jump_delay, 0);
    assert_eq!(infill.mark_parameters.polygon_delay, 0);
    assert_eq!(infill.mark_parameters.laser_off_delay, 730.0);

    let mut ops: Vec<Operation> = Vec::new();
    play(&jobs.groups, &mut ops).unwrap();
    let begins = ops
        .iter()
        .filter(|op| matches!(op, Operation::BeginSession(_)))
        .count();
    assert_eq!(begins, 2);
}

#[test]
fn test_calibration_flag_used_without_region_setting() {
    let calib = calibration();
    let layer = vec![
        region("edges", 140.0, 560.0, None),          // 550 entry, on
        region("infill_hatch", 260.0, 790.0, None),   // 800 entry, off
        region("upskin_hatch", 210.0, 1500.0, None),  // 1600 entry, on
        region("upskin_border", 170.0, 1500.0, Some(false)),
    ];
    let jobs = build_layer(&layer, &calib).unwrap();
    let states: Vec<bool> = jobs.groups.iter().map(|g| g.sky_writing_enabled()).collect();
    assert_eq!(states, vec![true, false, true, false]);
}
