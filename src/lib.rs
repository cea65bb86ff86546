//! Translation of per-region laser process parameters into galvanometer
//! scanner parameters.
//!
//! A [`calibration::CalibrationModel`] describes one scanner head. The
//! regions of a build layer are resolved against it and grouped into
//! [`partition::JobGroup`]s, each of which the driver emits as one device
//! session.

#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod calibration;
pub mod calibration_parser;
pub mod coords;
pub mod error;
pub mod field_curvature;
pub mod focus;
pub mod operation;
pub mod partition;
pub mod pipeline;
pub mod power;
pub mod process_variables;
pub mod region;
pub mod sky_writing;
pub mod transform;

pub use crate::error::{Error, Result};

#[cfg(test)]
mod tests;
