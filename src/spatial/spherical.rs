//! Latitude/longitude bucket grid over a sphere.
//!
//! Each face is bounded by a spherical cap around its center direction and
//! inserted into every bucket the cap overlaps. Containment is tested in the
//! gnomonic projection onto the plane tangent at the face center, which maps
//! great-circle edges to straight lines, so the test is exact for faces
//! smaller than a hemisphere.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Point3, Vector2, Vector3};

use super::{polygon_contains, Buckets};
use crate::algo::attributes::{face_polygon, Positions};
use crate::mesh::{FaceId, MeshIndex, Topology};
use crate::surface::{SphericalSurface, Surface};

/// Slack added to cap radii.
const CAP_MARGIN: f64 = 1e-9;

#[derive(Debug, Clone)]
struct CapFace<I: MeshIndex> {
    face: FaceId<I>,
    center: Vector3<f64>,
    tangent0: Vector3<f64>,
    tangent1: Vector3<f64>,
    /// Corners in the gnomonic projection.
    polygon: Vec<Vector2<f64>>,
}

impl<I: MeshIndex> CapFace<I> {
    fn project(&self, dir: &Vector3<f64>) -> Option<Vector2<f64>> {
        let cos = dir.dot(&self.center);
        if cos <= f64::EPSILON {
            return None;
        }
        let q = dir / cos;
        Some(Vector2::new(q.dot(&self.tangent0), q.dot(&self.tangent1)))
    }

    fn contains(&self, dir: &Vector3<f64>) -> bool {
        self.project(dir)
            .map_or(false, |uv| polygon_contains(&self.polygon, &uv))
    }
}

#[derive(Debug, Clone)]
pub(super) struct SphericalIndex<I: MeshIndex> {
    sphere: SphericalSurface,
    faces: Vec<CapFace<I>>,
    /// Columns are longitude, rows latitude.
    buckets: Buckets,
}

impl<I: MeshIndex> SphericalIndex<I> {
    pub(super) fn build(
        topology: &Topology<I>,
        surface: &Surface,
        sphere: &SphericalSurface,
        positions: &Positions,
    ) -> Self {
        let rows = ((topology.num_internal_faces() as f64) / 2.0).sqrt().ceil() as usize;
        let mut buckets = Buckets::new(2 * rows, rows);
        let mut faces = Vec::with_capacity(topology.num_internal_faces());

        for f in topology.internal_face_ids() {
            let dirs: Vec<Vector3<f64>> = face_polygon(topology, surface, positions, f)
                .iter()
                .map(|p| sphere.normal_at(p))
                .collect();
            let sum: Vector3<f64> = dirs.iter().sum();
            let center = sum
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(|| dirs.first().copied().unwrap_or_else(Vector3::z));

            let radius = dirs
                .iter()
                .map(|d| d.dot(&center).clamp(-1.0, 1.0).acos())
                .fold(0.0, f64::max)
                + CAP_MARGIN;

            let helper = if center.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            let tangent0 = center.cross(&helper).normalize();
            let tangent1 = center.cross(&tangent0);

            let mut face = CapFace {
                face: f,
                center,
                tangent0,
                tangent1,
                polygon: Vec::with_capacity(dirs.len()),
            };
            face.polygon = dirs
                .iter()
                .map(|d| face.project(d).unwrap_or_else(Vector2::zeros))
                .collect();

            let entry = faces.len();
            insert_cap(&mut buckets, &center, radius, entry);
            faces.push(face);
        }

        Self {
            sphere: *sphere,
            faces,
            buckets,
        }
    }

    pub(super) fn find(&self, point: &Point3<f64>) -> Option<FaceId<I>> {
        let dir = self.sphere.normal_at(point);
        let (col, row) = cell(&self.buckets, &dir);
        self.buckets
            .get(col, row)
            .iter()
            .map(|&entry| &self.faces[entry])
            .find(|face| face.contains(&dir))
            .map(|face| face.face)
    }

    pub(super) fn num_entries(&self) -> usize {
        self.buckets.cells.iter().map(Vec::len).sum()
    }

    pub(super) fn num_cells(&self) -> usize {
        self.buckets.len()
    }
}

fn latitude(dir: &Vector3<f64>) -> f64 {
    dir.z.clamp(-1.0, 1.0).asin()
}

fn longitude(dir: &Vector3<f64>) -> f64 {
    dir.y.atan2(dir.x)
}

fn row_of(buckets: &Buckets, lat: f64) -> usize {
    let t = (lat + FRAC_PI_2) / PI;
    ((t * buckets.rows as f64).floor().max(0.0) as usize).min(buckets.rows - 1)
}

/// Unwrapped longitude bucket, may lie outside `0..cols`.
fn col_of(buckets: &Buckets, lon: f64) -> i64 {
    ((lon + PI) / TAU * buckets.cols as f64).floor() as i64
}

fn cell(buckets: &Buckets, dir: &Vector3<f64>) -> (usize, usize) {
    let col = col_of(buckets, longitude(dir)).rem_euclid(buckets.cols as i64) as usize;
    (col, row_of(buckets, latitude(dir)))
}

/// Insert `entry` into every bucket overlapped by the cap of angular radius
/// `radius` around `center`.
fn insert_cap(buckets: &mut Buckets, center: &Vector3<f64>, radius: f64, entry: usize) {
    let lat = latitude(center);
    let lo = lat - radius;
    let hi = lat + radius;
    let rows = row_of(buckets, lo.max(-FRAC_PI_2))..=row_of(buckets, hi.min(FRAC_PI_2));

    // Longitude half-width of the cap, unless it covers a pole.
    let half_width = if lo <= -FRAC_PI_2 || hi >= FRAC_PI_2 {
        None
    } else {
        let s = radius.sin() / lat.cos();
        (s < 1.0).then(|| s.asin())
    };

    let all = 0..buckets.cols as i64;
    let cols = match half_width {
        Some(w) => {
            let lon = longitude(center);
            let first = col_of(buckets, lon - w);
            let last = col_of(buckets, lon + w);
            if last - first + 1 >= buckets.cols as i64 {
                all
            } else {
                first..last + 1
            }
        }
        None => all,
    };

    for row in rows {
        for col in cols.clone() {
            let col = col.rem_euclid(buckets.cols as i64) as usize;
            buckets.insert(col, row, entry);
        }
    }
}
