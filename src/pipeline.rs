//! Turns the regions of one build layer into device sessions.
//!
//! Each region is resolved on its own: focus, power, process variables,
//! sky-writing and geometry. Regions do not depend on each other, so they
//! are resolved in parallel. The results are collected in submission
//! order before partitioning.

use crate::calibration::CalibrationModel;
use crate::error::{Error, Result};
use crate::partition::{partition_with, JobGroup, PartitionOrder};
use crate::region::{MarkParameters, RegionSpec, ResolvedRegion};
use crate::transform::AxisTransform;
use crate::{focus, power, process_variables, sky_writing};
use log::{debug, warn};
use rayon::prelude::*;

/// Outcome of building one layer. Regions that failed are listed in
/// `rejected` with their position in the input; all others are in
/// `groups`.
#[derive(Debug)]
pub struct LayerJobs {
    pub groups: Vec<JobGroup>,
    pub rejected: Vec<(usize, Error)>,
}

impl LayerJobs {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

fn resolve_with(
    spec: &RegionSpec,
    calib: &CalibrationModel,
    axis: &AxisTransform,
) -> Result<ResolvedRegion> {
    spec.validate()?;
    let focus_z = if calib.diameter_change_enabled {
        focus::diameter_to_z(spec.beam_diameter_microns, calib)
    } else {
        0.0
    };
    let corrected_power_percent = power::correct(spec.power_watts, calib)?;
    let entry = process_variables::select(spec.speed_mm_per_sec, calib)?;
    let sky_writing = sky_writing::resolve(spec.sky_writing_requested, entry);
    let mark_parameters = MarkParameters::new(entry, &sky_writing.delays, corrected_power_percent);
    for problem in mark_parameters.out_of_range() {
        warn!("Region '{}': {}", spec.name, problem);
    }

    Ok(ResolvedRegion {
        name: spec.name.clone(),
        focus_z,
        corrected_power_percent,
        process_variables: entry.clone(),
        sky_writing,
        mark_parameters,
        transformed_geometry: axis.apply_polyline(&spec.geometry, focus_z),
    })
}

/// Resolve a single region against the calibration
pub fn resolve_region(spec: &RegionSpec, calib: &CalibrationModel) -> Result<ResolvedRegion> {
    resolve_with(spec, calib, &AxisTransform::new(calib))
}

/// Resolve all regions in parallel. The result has one entry per input
/// region, in input order.
pub fn resolve_regions(specs: &[RegionSpec], calib: &CalibrationModel) -> Vec<Result<ResolvedRegion>> {
    let axis = AxisTransform::new(calib);
    specs
        .par_iter()
        .map(|spec| resolve_with(spec, calib, &axis))
        .collect()
}

/// Build the device sessions for one layer, keeping submission order
pub fn build_layer(specs: &[RegionSpec], calib: &CalibrationModel) -> Result<LayerJobs> {
    build_layer_with(specs, calib, PartitionOrder::Preserve)
}

/// Build the device sessions for one layer.
///
/// A calibration that fails validation aborts the whole layer. A region
/// with bad input is reported in `rejected` and left out of the groups,
/// the remaining regions are still processed.
pub fn build_layer_with(
    specs: &[RegionSpec],
    calib: &CalibrationModel,
    order: PartitionOrder,
) -> Result<LayerJobs> {
    calib.validate()?;
    let mut resolved = Vec::with_capacity(specs.len());
    let mut rejected = Vec::new();
    for (index, result) in resolve_regions(specs, calib).into_iter().enumerate() {
        match result {
            Ok(region) => resolved.push(region),
            Err(e) if e.is_calibration_error() => return Err(e),
            Err(e) => {
                warn!("Rejected region {}: {}", index, e);
                rejected.push((index, e));
            }
        }
    }
    let groups = partition_with(resolved, order);
    debug!(
        "{} regions in {} job groups, {} rejected",
        specs.len() - rejected.len(),
        groups.len(),
        rejected.len()
    );
    Ok(LayerJobs { groups, rejected })
}
