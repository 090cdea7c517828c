// Path preview and per-frame marker rendering.
// Rendering targets a DrawSurface; DrawList is the batch form shipped to JS for canvas replay.
// See DESIGN.md: Renderer

use serde::Serialize;

use crate::mapper;
use crate::trajectory::Trajectory;
use crate::types::{PixelCoord, RenderStyle, SurfaceGeometry, TrajectoryPoint};

/// Minimal 2-D drawing surface.
pub trait DrawSurface {
    fn clear(&mut self, geometry: &SurfaceGeometry, color: &str);
    fn polyline(&mut self, points: &[PixelCoord], color: &str, width: f64);
    fn circle(&mut self, center: PixelCoord, radius: f64, color: &str);
}

/// Single recorded drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear {
        width: f64,
        height: f64,
        color: String,
    },
    Polyline {
        points: Vec<PixelCoord>,
        color: String,
        width: f64,
    },
    Circle {
        center: PixelCoord,
        radius: f64,
        color: String,
    },
}

/// Surface that records operations for the host to replay on its canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(transparent)]
pub struct DrawList {
    ops: Vec<DrawOp>,
}

impl DrawList {
    pub fn new() -> Self {
        DrawList { ops: Vec::new() }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Marker centre of the last circle drawn, if any.
    pub fn marker(&self) -> Option<PixelCoord> {
        self.ops.iter().rev().find_map(|op| match op {
            DrawOp::Circle { center, .. } => Some(*center),
            _ => None,
        })
    }
}

impl DrawSurface for DrawList {
    fn clear(&mut self, geometry: &SurfaceGeometry, color: &str) {
        self.ops.push(DrawOp::Clear {
            width: geometry.width,
            height: geometry.height,
            color: color.to_string(),
        });
    }

    fn polyline(&mut self, points: &[PixelCoord], color: &str, width: f64) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color: color.to_string(),
            width,
        });
    }

    fn circle(&mut self, center: PixelCoord, radius: f64, color: &str) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            color: color.to_string(),
        });
    }
}

/// Draws the static path and the moving marker. Geometry is never cached.
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Renderer { style }
    }

    /// Full path with the marker fixed at the first sample (fixation preview).
    pub fn draw_preview<S: DrawSurface>(
        &self,
        surface: &mut S,
        trajectory: &Trajectory,
        geometry: &SurfaceGeometry,
    ) {
        self.draw_path(surface, trajectory, geometry);
        if let Some(first) = trajectory.first() {
            self.draw_marker(surface, first, geometry);
        }
    }

    /// Full path with the marker interpolated at `progress`.
    pub fn draw_frame<S: DrawSurface>(
        &self,
        surface: &mut S,
        trajectory: &Trajectory,
        geometry: &SurfaceGeometry,
        progress: f64,
    ) {
        self.draw_path(surface, trajectory, geometry);
        if let Some(position) = trajectory.position_at(progress) {
            self.draw_marker(surface, position, geometry);
        }
    }

    fn draw_path<S: DrawSurface>(
        &self,
        surface: &mut S,
        trajectory: &Trajectory,
        geometry: &SurfaceGeometry,
    ) {
        surface.clear(geometry, &self.style.background);
        if trajectory.len() < 2 {
            return;
        }

        let pixels: Vec<PixelCoord> = trajectory
            .points()
            .iter()
            .map(|p| mapper::map(*p, geometry))
            .collect();
        surface.polyline(&pixels, &self.style.path_color, self.style.path_width);
    }

    fn draw_marker<S: DrawSurface>(
        &self,
        surface: &mut S,
        position: TrajectoryPoint,
        geometry: &SurfaceGeometry,
    ) {
        surface.circle(
            mapper::map(position, geometry),
            self.style.marker_radius,
            &self.style.marker_color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep() -> Trajectory {
        Trajectory::from_points(vec![
            TrajectoryPoint::new(-1.0, 0.0),
            TrajectoryPoint::new(1.0, 0.0),
        ])
    }

    #[test]
    fn preview_marks_first_sample() {
        let renderer = Renderer::new(RenderStyle::default());
        let geometry = SurfaceGeometry::new(800.0, 600.0, 40.0);
        let mut list = DrawList::new();

        renderer.draw_preview(&mut list, &sweep(), &geometry);

        assert_eq!(list.ops().len(), 3);
        assert!(matches!(list.ops()[0], DrawOp::Clear { .. }));
        assert!(matches!(&list.ops()[1], DrawOp::Polyline { points, .. } if points.len() == 2));
        assert_eq!(list.marker(), Some(PixelCoord::new(40.0, 300.0)));
    }

    #[test]
    fn frame_marker_follows_progress() {
        let renderer = Renderer::new(RenderStyle::default());
        let geometry = SurfaceGeometry::new(800.0, 600.0, 40.0);
        let mut list = DrawList::new();

        renderer.draw_frame(&mut list, &sweep(), &geometry, 0.5);

        assert_eq!(list.marker(), Some(PixelCoord::new(400.0, 300.0)));
    }

    #[test]
    fn single_point_draws_marker_only() {
        let renderer = Renderer::new(RenderStyle::default());
        let geometry = SurfaceGeometry::default();
        let mut list = DrawList::new();
        let still = Trajectory::from_points(vec![TrajectoryPoint::origin()]);

        renderer.draw_frame(&mut list, &still, &geometry, 0.7);

        assert_eq!(list.ops().len(), 2);
        assert_eq!(list.marker(), Some(geometry.center()));
    }

    #[test]
    fn empty_trajectory_only_clears() {
        let renderer = Renderer::new(RenderStyle::default());
        let mut list = DrawList::new();

        renderer.draw_preview(&mut list, &Trajectory::default(), &SurfaceGeometry::default());

        assert_eq!(list.ops().len(), 1);
        assert!(list.marker().is_none());
    }

    #[test]
    fn draw_ops_serialize_tagged() {
        let mut list = DrawList::new();
        list.circle(PixelCoord::new(1.0, 2.0), 3.0, "red");
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(
            json,
            r#"[{"op":"circle","center":{"x":1.0,"y":2.0},"radius":3.0,"color":"red"}]"#
        );
    }
}
