// Normalized path space -> drawing-surface pixels.
// See DESIGN.md: Coordinate Mapper

use crate::types::{PixelCoord, SurfaceGeometry, TrajectoryPoint};

/// Map a normalized point onto the surface. ±1 reaches the margin; y is flipped.
pub fn map(point: TrajectoryPoint, geometry: &SurfaceGeometry) -> PixelCoord {
    let center = geometry.center();
    let (half_w, half_h) = geometry.half_extent();

    PixelCoord::new(center.x + point.x * half_w, center.y - point.y * half_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn origin_maps_to_center() {
        let g = SurfaceGeometry::new(800.0, 600.0, 40.0);
        assert_eq!(map(TrajectoryPoint::origin(), &g), PixelCoord::new(400.0, 300.0));
    }

    #[test]
    fn corners_reach_margin() {
        let g = SurfaceGeometry::new(800.0, 600.0, 40.0);
        // Normalized up-right is screen top-right.
        assert_eq!(
            map(TrajectoryPoint::new(1.0, 1.0), &g),
            PixelCoord::new(760.0, 40.0)
        );
        assert_eq!(
            map(TrajectoryPoint::new(-1.0, -1.0), &g),
            PixelCoord::new(40.0, 560.0)
        );
    }

    proptest! {
        #[test]
        fn mapped_point_stays_inside_margin(
            width in 100.0f64..4000.0,
            height in 100.0f64..4000.0,
            margin in 0.0f64..50.0,
            x in -1.0f64..=1.0,
            y in -1.0f64..=1.0,
        ) {
            let g = SurfaceGeometry::new(width, height, margin);
            let p = map(TrajectoryPoint::new(x, y), &g);
            let eps = 1e-9;
            prop_assert!(p.x >= margin - eps && p.x <= width - margin + eps);
            prop_assert!(p.y >= margin - eps && p.y <= height - margin + eps);
        }
    }
}
