//! Operation stream handed to the scanner driver.
//!
//! Each [`JobGroup`] becomes one session: the sky-writing mode is set once
//! when the session begins and never again until it ends.

use crate::coords::Point3;
use crate::partition::JobGroup;
use crate::region::MarkParameters;
use crate::sky_writing::SkyWritingMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Open a device session (one output file)
    BeginSession(SkyWritingMode),
    /// Mark parameters of every layer in the session, indexed by layer
    SetLayers(Vec<MarkParameters>),
    /// Mark a polyline with the parameters of `layer`
    Polyline { layer: usize, points: Vec<Point3> },
    EndSession,
}

/// Receiver of operations. Implemented by the scanner driver.
pub trait ScannerSink {
    type Error;
    fn send(&mut self, op: Operation) -> Result<(), Self::Error>;
}

/// Collects operations in memory
impl ScannerSink for Vec<Operation> {
    type Error = std::convert::Infallible;
    fn send(&mut self, op: Operation) -> Result<(), Self::Error> {
        self.push(op);
        Ok(())
    }
}

impl JobGroup {
    /// The operations of this group as one session.
    /// Regions without geometry still get a layer but no polyline.
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(self.len() + 3);
        ops.push(Operation::BeginSession(self.sky_writing_mode().clone()));
        ops.push(Operation::SetLayers(self.mark_parameters()));
        for (layer, region) in self.regions().iter().enumerate() {
            if !region.transformed_geometry.is_empty() {
                ops.push(Operation::Polyline {
                    layer,
                    points: region.transformed_geometry.clone(),
                });
            }
        }
        ops.push(Operation::EndSession);
        ops
    }
}

/// Send every group to `sink` as its own session, in order.
/// Stops at the first error from the sink.
pub fn play<S: ScannerSink>(groups: &[JobGroup], sink: &mut S) -> Result<(), S::Error> {
    for group in groups {
        for op in group.operations() {
            sink.send(op)?;
        }
    }
    Ok(())
}

#[cfg(test)]
use crate::partition::partition;
#[cfg(test)]
use crate::region::test_resolved;

#[test]
fn test_one_session_per_group() {
    let mut edges = test_resolved("edges", true);
    edges.transformed_geometry = vec![Point3::new(0.0, 0.0, -1.2), Point3::new(5.0, 0.0, -1.2)];
    let groups = partition(vec![
        edges,
        test_resolved("infill_hatch", true),
        test_resolved("support_hatch", false),
    ]);
    let mut ops: Vec<Operation> = Vec::new();
    play(&groups, &mut ops).unwrap();

    let sessions: Vec<bool> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::BeginSession(mode) => Some(mode.enabled),
            _ => None,
        })
        .collect();
    assert_eq!(sessions, vec![true, false]);
    assert_eq!(
        ops.iter().filter(|op| **op == Operation::EndSession).count(),
        2
    );
    match &ops[1] {
        Operation::SetLayers(layers) => assert_eq!(layers.len(), 2),
        op => panic!("unexpected {:?}", op),
    }
    match &ops[2] {
        Operation::Polyline { layer, points } => {
            assert_eq!(*layer, 0);
            assert_eq!(points.len(), 2);
        }
        op => panic!("unexpected {:?}", op),
    }
    assert_eq!(ops[3], Operation::EndSession);
}

#[cfg(test)]
struct FailingSink {
    accepted: usize,
}

#[cfg(test)]
impl ScannerSink for FailingSink {
    type Error = String;
    fn send(&mut self, op: Operation) -> Result<(), String> {
        if let Operation::Polyline { .. } = op {
            return Err("queue full".to_string());
        }
        self.accepted += 1;
        Ok(())
    }
}

#[test]
fn test_sink_error_stops_playback() {
    let mut r = test_resolved("edges", false);
    r.transformed_geometry = vec![Point3::new(1.0, 1.0, 0.0)];
    let groups = partition(vec![r, test_resolved("upskin_hatch", true)]);
    let mut sink = FailingSink { accepted: 0 };
    assert_eq!(play(&groups, &mut sink), Err("queue full".to_string()));
    assert_eq!(sink.accepted, 2);
}
