//! Curve/automation engine
//!
//! Pure, synchronous evaluation of time-varying parameter curves. Lanes store
//! normalized 0..1 values; `denormalize` converts to the target parameter's
//! real units at consumption time only, so `min_value`/`max_value` can be
//! edited without rewriting point history.
//!
//! Points are kept in insertion order and sorted by time at evaluation, so a
//! drag gesture may move a point past its neighbors freely.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Interpolation curve for the segment starting at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    /// Straight line to the next point
    #[default]
    Linear,
    /// Quadratic ease-in to the next point
    Exponential,
    /// Hold this point's value until the next point
    Hold,
    /// Smoothstep blend to the next point
    Smooth,
}

/// Mix parameters that accept automation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomatableParam {
    Volume,
    ReverbSend,
    DelaySend,
    MasterVolume,
}

/// Stable identifier for an automation point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointId(u64);

/// One automation point: a normalized value at a time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    /// Time in seconds (>= 0)
    pub time: f64,
    /// Normalized value (0..1)
    pub value: f32,
    /// Curve of the segment starting here
    pub curve: CurveType,
}

impl AutomationPoint {
    fn clamp(&mut self) {
        self.time = self.time.max(0.0);
        self.value = self.value.clamp(0.0, 1.0);
    }
}

/// A time-indexed curve controlling one mix parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationLane {
    /// The controlled parameter
    pub parameter: AutomatableParam,
    /// Points in insertion order; evaluation sorts by time
    points: Vec<(PointId, AutomationPoint)>,
    next_id: u64,
    /// Real-unit value at normalized 0
    pub min_value: f32,
    /// Real-unit value at normalized 1
    pub max_value: f32,
    /// Disabled lanes are skipped by consumers
    pub enabled: bool,
}

impl AutomationLane {
    /// Create an empty lane for a parameter
    pub fn new(parameter: AutomatableParam, min_value: f32, max_value: f32) -> Self {
        Self {
            parameter,
            points: Vec::new(),
            next_id: 0,
            min_value,
            max_value,
            enabled: true,
        }
    }

    /// Insert a point at a time and value, returning its stable id
    pub fn add_point(&mut self, time: f64, value: f32) -> PointId {
        let mut point = AutomationPoint {
            time,
            value,
            curve: CurveType::default(),
        };
        point.clamp();
        let id = PointId(self.next_id);
        self.next_id += 1;
        self.points.push((id, point));
        id
    }

    /// Move a point to a new time and value
    ///
    /// The move is unconstrained by neighboring points; ordering is restored
    /// at the next evaluation.
    pub fn move_point(&mut self, id: PointId, time: f64, value: f32) -> Result<()> {
        let point = self.point_mut(id)?;
        point.time = time;
        point.value = value;
        point.clamp();
        Ok(())
    }

    /// Delete a point
    pub fn delete_point(&mut self, id: PointId) -> Result<AutomationPoint> {
        let index = self
            .points
            .iter()
            .position(|(point_id, _)| *point_id == id)
            .ok_or_else(|| Self::missing(id))?;
        Ok(self.points.remove(index).1)
    }

    /// Change the curve of the segment starting at a point
    pub fn set_curve(&mut self, id: PointId, curve: CurveType) -> Result<()> {
        self.point_mut(id)?.curve = curve;
        Ok(())
    }

    /// Get a point by id
    pub fn point(&self, id: PointId) -> Option<&AutomationPoint> {
        self.points
            .iter()
            .find(|(point_id, _)| *point_id == id)
            .map(|(_, point)| point)
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the lane has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the lane at a time, returning a normalized 0..1 value
    ///
    /// An empty lane evaluates to 0.5 everywhere; a single point is constant.
    /// Outside the covered range the nearest endpoint's value holds.
    pub fn value_at(&self, t: f64) -> f32 {
        if self.points.is_empty() {
            return 0.5;
        }

        // Stable sort: ties keep insertion order
        let mut sorted: Vec<&AutomationPoint> =
            self.points.iter().map(|(_, point)| point).collect();
        sorted.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));

        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // Locate the bracketing pair with p1.time <= t < p2.time
        for pair in sorted.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            if t >= p1.time && t < p2.time {
                return interpolate(p1, p2, t);
            }
        }
        last.value
    }

    /// Evaluate the lane and convert to the parameter's real units
    pub fn denormalized_value_at(&self, t: f64) -> f32 {
        denormalize(self.value_at(t), self.min_value, self.max_value)
    }

    fn point_mut(&mut self, id: PointId) -> Result<&mut AutomationPoint> {
        self.points
            .iter_mut()
            .find(|(point_id, _)| *point_id == id)
            .map(|(_, point)| point)
            .ok_or_else(|| Self::missing(id))
    }

    fn missing(id: PointId) -> EngineError {
        EngineError::InvalidParameter {
            param: "point_id".to_string(),
            value: format!("{:?}", id),
            expected: "an existing automation point".to_string(),
        }
    }
}

/// Interpolate between two points using the first point's curve
fn interpolate(p1: &AutomationPoint, p2: &AutomationPoint, t: f64) -> f32 {
    let span = p2.time - p1.time;
    if span <= 0.0 {
        return p1.value;
    }
    let frac = ((t - p1.time) / span) as f32;
    match p1.curve {
        CurveType::Hold => p1.value,
        CurveType::Linear => p1.value + (p2.value - p1.value) * frac,
        CurveType::Exponential => p1.value + (p2.value - p1.value) * frac * frac,
        CurveType::Smooth => {
            let smoothed = frac * frac * (3.0 - 2.0 * frac);
            p1.value + (p2.value - p1.value) * smoothed
        }
    }
}

/// Convert a normalized 0..1 value into a parameter's real units
pub fn denormalize(normalized: f32, min_value: f32, max_value: f32) -> f32 {
    min_value + normalized * (max_value - min_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn lane_with(points: &[(f64, f32)]) -> AutomationLane {
        let mut lane = AutomationLane::new(AutomatableParam::Volume, 0.0, 1.0);
        for &(time, value) in points {
            lane.add_point(time, value);
        }
        lane
    }

    #[test]
    fn test_empty_lane_is_half() {
        let lane = lane_with(&[]);
        assert_eq!(lane.value_at(0.0), 0.5);
        assert_eq!(lane.value_at(123.0), 0.5);
    }

    #[test]
    fn test_single_point_is_constant() {
        let lane = lane_with(&[(2.0, 0.8)]);
        assert_eq!(lane.value_at(0.0), 0.8);
        assert_eq!(lane.value_at(2.0), 0.8);
        assert_eq!(lane.value_at(100.0), 0.8);
    }

    #[test]
    fn test_hold_at_edges() {
        let lane = lane_with(&[(1.0, 0.2), (3.0, 0.9)]);
        assert_eq!(lane.value_at(0.0), 0.2);
        assert_eq!(lane.value_at(5.0), 0.9);
    }

    #[test_case(CurveType::Linear ; "linear")]
    #[test_case(CurveType::Exponential ; "exponential")]
    #[test_case(CurveType::Hold ; "hold")]
    #[test_case(CurveType::Smooth ; "smooth")]
    fn test_boundary_exactness(curve: CurveType) {
        let mut lane = lane_with(&[(1.0, 0.25), (2.0, 0.75), (4.0, 0.1)]);
        let ids: Vec<PointId> = (0..3).map(|i| PointId(i as u64)).collect();
        for id in &ids {
            lane.set_curve(*id, curve).unwrap();
        }
        assert_relative_eq!(lane.value_at(1.0), 0.25);
        assert_relative_eq!(lane.value_at(2.0), 0.75);
        assert_relative_eq!(lane.value_at(4.0), 0.1);
    }

    #[test]
    fn test_linear_midpoint() {
        let lane = lane_with(&[(0.0, 0.0), (2.0, 1.0)]);
        assert_relative_eq!(lane.value_at(1.0), 0.5);
    }

    #[test]
    fn test_exponential_lags_linear() {
        let mut lane = lane_with(&[(0.0, 0.0), (2.0, 1.0)]);
        lane.set_curve(PointId(0), CurveType::Exponential).unwrap();
        // frac^2 at the midpoint: 0.25
        assert_relative_eq!(lane.value_at(1.0), 0.25);
    }

    #[test]
    fn test_hold_keeps_value_until_next() {
        let mut lane = lane_with(&[(0.0, 0.3), (2.0, 0.9)]);
        lane.set_curve(PointId(0), CurveType::Hold).unwrap();
        assert_eq!(lane.value_at(1.999), 0.3);
        assert_eq!(lane.value_at(2.0), 0.9);
    }

    #[test]
    fn test_smoothstep_midpoint() {
        let mut lane = lane_with(&[(0.0, 0.0), (2.0, 1.0)]);
        lane.set_curve(PointId(0), CurveType::Smooth).unwrap();
        // smoothstep(0.5) = 0.5, but quarter points differ from linear
        assert_relative_eq!(lane.value_at(1.0), 0.5);
        assert!(lane.value_at(0.5) < 0.25);
        assert!(lane.value_at(1.5) > 0.75);
    }

    #[test]
    fn test_unsorted_insertion_evaluates_sorted() {
        let lane = lane_with(&[(3.0, 0.9), (1.0, 0.1)]);
        assert_eq!(lane.value_at(0.0), 0.1);
        assert_eq!(lane.value_at(4.0), 0.9);
        assert_relative_eq!(lane.value_at(2.0), 0.5);
    }

    #[test]
    fn test_move_past_neighbor_resorts() {
        let mut lane = lane_with(&[(1.0, 0.0), (2.0, 1.0)]);
        // Drag the first point beyond the second
        lane.move_point(PointId(0), 3.0, 0.0).unwrap();
        assert_eq!(lane.value_at(0.0), 1.0);
        assert_eq!(lane.value_at(5.0), 0.0);
    }

    #[test]
    fn test_point_clamping() {
        let mut lane = lane_with(&[]);
        let id = lane.add_point(-1.0, 2.0);
        let point = lane.point(id).unwrap();
        assert_eq!(point.time, 0.0);
        assert_eq!(point.value, 1.0);
    }

    #[test]
    fn test_delete_point() {
        let mut lane = lane_with(&[(0.0, 0.2), (1.0, 0.8)]);
        lane.delete_point(PointId(0)).unwrap();
        assert_eq!(lane.len(), 1);
        assert_eq!(lane.value_at(0.0), 0.8);
        assert!(lane.delete_point(PointId(0)).is_err());
    }

    #[test]
    fn test_denormalize() {
        assert_relative_eq!(denormalize(0.5, -12.0, 12.0), 0.0);
        assert_relative_eq!(denormalize(0.0, -12.0, 12.0), -12.0);
        assert_relative_eq!(denormalize(1.0, 0.2, 0.8), 0.8);
    }

    #[test]
    fn test_denormalized_value_at() {
        let mut lane = AutomationLane::new(AutomatableParam::ReverbSend, 0.0, 0.5);
        lane.add_point(0.0, 1.0);
        assert_relative_eq!(lane.denormalized_value_at(0.0), 0.5);
    }

    #[test]
    fn test_tied_times_keep_insertion_order() {
        // Two points at the same time: the earlier-inserted one wins below,
        // the later-inserted one wins above the tied time.
        let lane = lane_with(&[(1.0, 0.2), (1.0, 0.8)]);
        assert_eq!(lane.value_at(0.5), 0.2);
        assert_eq!(lane.value_at(1.5), 0.8);
    }
}
