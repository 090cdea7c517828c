// Trajectory storage and decoding of the trajectory service response.
// See DESIGN.md: Trajectory Store

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::interpolate;
use crate::types::TrajectoryPoint;

/// Ordered path samples. Immutable once built; replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(transparent)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn from_points(points: Vec<TrajectoryPoint>) -> Self {
        Trajectory { points }
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<TrajectoryPoint> {
        self.points.first().copied()
    }

    pub fn position_at(&self, t: f64) -> Option<TrajectoryPoint> {
        interpolate::position_at(&self.points, t)
    }

    /// JSON array of `{x, y}` objects, as sent alongside the recording.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode the trajectory service body: `{"trajectory": [{"x": .., "y": ..}, ...]}`.
///
/// A missing, null or non-array `trajectory` field, or a sample without numeric
/// coordinates, is a structural error. An empty array is accepted.
pub fn parse_response(body: &str) -> Result<Trajectory, EngineError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| EngineError::FatalLoad(format!("malformed response: {}", e)))?;

    let samples = value
        .get("trajectory")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::FatalLoad("response has no trajectory sequence".to_string()))?;

    let points = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let coord = |axis: &str| sample.get(axis).and_then(Value::as_f64);
            match (coord("x"), coord("y")) {
                (Some(x), Some(y)) => Ok(TrajectoryPoint::new(x, y)),
                _ => Err(EngineError::FatalLoad(format!(
                    "trajectory sample {} lacks numeric x/y",
                    i
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Trajectory::from_points(points))
}

/// Holds the session's loaded trajectory and exposes it read-only.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    current: Option<Trajectory>,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        TrajectoryStore { current: None }
    }

    /// Replace any previously loaded trajectory.
    pub fn load(&mut self, trajectory: Trajectory) {
        self.current = Some(trajectory);
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Loaded and non-empty: the only state in which playback may run.
    pub fn is_playable(&self) -> bool {
        self.current.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_response() {
        let body = r#"{"trajectory":[{"x":-1,"y":0},{"x":1.0,"y":0.25}]}"#;
        let trajectory = parse_response(body).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.points()[1], TrajectoryPoint::new(1.0, 0.25));
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let trajectory = parse_response(r#"{"trajectory":[{"x":1.2,"y":-3}]}"#).unwrap();
        assert_eq!(trajectory.first(), Some(TrajectoryPoint::new(1.0, -1.0)));
    }

    #[test]
    fn empty_sequence_is_accepted() {
        let trajectory = parse_response(r#"{"trajectory":[]}"#).unwrap();
        assert!(trajectory.is_empty());
    }

    #[test]
    fn structural_errors_are_fatal() {
        for body in [
            r#"{}"#,
            r#"{"trajectory":null}"#,
            r#"{"trajectory":{"x":0,"y":0}}"#,
            r#"{"trajectory":[{"x":0}]}"#,
            r#"{"trajectory":[{"x":"0","y":0}]}"#,
            "not json",
        ] {
            let err = parse_response(body).unwrap_err();
            assert!(matches!(err, EngineError::FatalLoad(_)), "{}", body);
        }
    }

    #[test]
    fn store_tracks_loaded_state() {
        let mut store = TrajectoryStore::new();
        assert!(!store.is_loaded());
        assert!(!store.is_playable());

        store.load(Trajectory::default());
        assert!(store.is_loaded());
        assert!(!store.is_playable());

        store.load(Trajectory::from_points(vec![TrajectoryPoint::origin()]));
        assert!(store.is_playable());
        assert_eq!(store.trajectory().map(Trajectory::len), Some(1));
    }

    #[test]
    fn serializes_as_point_array() {
        let trajectory = Trajectory::from_points(vec![TrajectoryPoint::new(0.5, -0.5)]);
        assert_eq!(trajectory.to_json().unwrap(), r#"[{"x":0.5,"y":-0.5}]"#);
    }
}
