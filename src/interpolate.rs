// Piecewise-linear position along a trajectory for a normalized progress value.
// See DESIGN.md: Interpolator

use crate::types::TrajectoryPoint;

/// Position at progress `t` in [0, 1]. `None` only for an empty trajectory.
///
/// `t` is spread linearly over the index range `[0, n - 1]`; x and y are
/// interpolated independently between the two bracketing samples.
pub fn position_at(points: &[TrajectoryPoint], t: f64) -> Option<TrajectoryPoint> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let (index, weight) = bracket(points.len(), t);
            Some(lerp(points[index], points[index + 1], weight))
        }
    }
}

/// Lower bracketing index and the fractional weight toward the next sample.
fn bracket(len: usize, t: f64) -> (usize, f64) {
    let last_segment = len - 2;
    let position = t * (len - 1) as f64;
    let index = (position.floor().max(0.0) as usize).min(last_segment);
    (index, position - index as f64)
}

fn lerp(a: TrajectoryPoint, b: TrajectoryPoint, w: f64) -> TrajectoryPoint {
    TrajectoryPoint {
        x: a.x + (b.x - a.x) * w,
        y: a.y + (b.y - a.y) * w,
    }
}
