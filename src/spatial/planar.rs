//! Bucket grid over the surface coordinates of a plane.

use nalgebra::{Point3, Vector2};

use super::{bounds, polygon_contains, Buckets};
use crate::algo::attributes::{face_polygon, Positions};
use crate::mesh::{FaceId, MeshIndex, Topology};
use crate::surface::{PlanarSurface, Surface};

/// One periodic image of a face in surface coordinates.
#[derive(Debug, Clone)]
struct FaceImage<I: MeshIndex> {
    face: FaceId<I>,
    polygon: Vec<Vector2<f64>>,
    min: Vector2<f64>,
    max: Vector2<f64>,
}

#[derive(Debug, Clone)]
pub(super) struct PlanarIndex<I: MeshIndex> {
    plane: PlanarSurface,
    /// Lower corner of the bucketed domain.
    lo: Vector2<f64>,
    /// Extent of the bucketed domain.
    extent: Vector2<f64>,
    images: Vec<FaceImage<I>>,
    buckets: Buckets,
}

impl<I: MeshIndex> PlanarIndex<I> {
    pub(super) fn build(
        topology: &Topology<I>,
        surface: &Surface,
        plane: &PlanarSurface,
        positions: &Positions,
    ) -> Self {
        let mut images = Vec::new();
        for f in topology.internal_face_ids() {
            let polygon: Vec<Vector2<f64>> = face_polygon(topology, surface, positions, f)
                .iter()
                .map(|p| plane.coordinates(p))
                .collect();
            let (min, max) = bounds(&polygon);

            // One image per period the face overlaps inside [0, 1).
            for s0 in periodic_shifts(min.x, max.x, plane.wrap_axis0) {
                for &s1 in &periodic_shifts(min.y, max.y, plane.wrap_axis1) {
                    let shift = Vector2::new(s0, s1);
                    images.push(FaceImage {
                        face: f,
                        polygon: polygon.iter().map(|p| p + shift).collect(),
                        min: min + shift,
                        max: max + shift,
                    });
                }
            }
        }

        let (mut lo, mut hi) = images.iter().fold(
            (
                Vector2::repeat(f64::INFINITY),
                Vector2::repeat(f64::NEG_INFINITY),
            ),
            |(lo, hi), image| (lo.inf(&image.min), hi.sup(&image.max)),
        );
        if plane.wrap_axis0 || images.is_empty() {
            lo.x = 0.0;
            hi.x = 1.0;
        }
        if plane.wrap_axis1 || images.is_empty() {
            lo.y = 0.0;
            hi.y = 1.0;
        }
        let extent = (hi - lo).map(|e| e.max(f64::EPSILON));

        let side = (topology.num_internal_faces() as f64).sqrt().ceil() as usize;
        let mut index = Self {
            plane: *plane,
            lo,
            extent,
            images: Vec::new(),
            buckets: Buckets::new(side, side),
        };
        for (entry, image) in images.iter().enumerate() {
            let (c0, r0) = index.cell(&image.min);
            let (c1, r1) = index.cell(&image.max);
            for row in r0..=r1 {
                for col in c0..=c1 {
                    index.buckets.insert(col, row, entry);
                }
            }
        }
        index.images = images;
        index
    }

    pub(super) fn find(&self, point: &Point3<f64>) -> Option<FaceId<I>> {
        let mut uv = self.plane.coordinates(point);
        if self.plane.wrap_axis0 {
            uv.x = uv.x.rem_euclid(1.0);
        }
        if self.plane.wrap_axis1 {
            uv.y = uv.y.rem_euclid(1.0);
        }

        let hi = self.lo + self.extent;
        if uv.x < self.lo.x || uv.y < self.lo.y || uv.x > hi.x || uv.y > hi.y {
            return None;
        }

        let (col, row) = self.cell(&uv);
        self.buckets
            .get(col, row)
            .iter()
            .map(|&entry| &self.images[entry])
            .find(|image| polygon_contains(&image.polygon, &uv))
            .map(|image| image.face)
    }

    pub(super) fn num_entries(&self) -> usize {
        self.images.len()
    }

    pub(super) fn num_cells(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket containing `uv`, clamped to the grid.
    fn cell(&self, uv: &Vector2<f64>) -> (usize, usize) {
        let t = (uv - self.lo).component_div(&self.extent);
        let clamp = |t: f64, n: usize| ((t * n as f64).floor().max(0.0) as usize).min(n - 1);
        (clamp(t.x, self.buckets.cols), clamp(t.y, self.buckets.rows))
    }
}

/// Shifts by whole periods that bring `[min, max]` to overlap `[0, 1)`.
fn periodic_shifts(min: f64, max: f64, wraps: bool) -> Vec<f64> {
    if !wraps {
        return vec![0.0];
    }
    let first = -min.floor();
    (0..)
        .map(|k| first - k as f64)
        .take_while(|s| max + s > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_shifts() {
        assert_eq!(periodic_shifts(0.2, 0.4, false), vec![0.0]);
        assert_eq!(periodic_shifts(0.2, 0.4, true), vec![0.0]);
        assert_eq!(periodic_shifts(0.9, 1.1, true), vec![0.0, -1.0]);
        assert_eq!(periodic_shifts(-0.1, 0.1, true), vec![1.0, 0.0]);
        assert_eq!(periodic_shifts(2.5, 2.7, true), vec![-2.0]);
    }
}
