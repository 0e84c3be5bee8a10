//! Surfaces a tiling lives on.
//!
//! A [`Surface`] supplies the geometry the topology itself does not know
//! about: the normal at a point, which axes wrap around, how far one period
//! of a wrapped axis reaches, and where a ray meets the surface.

use nalgebra::{Point3, Vector2, Vector3};

use crate::mesh::WrapOffset;

/// A ray defined by an origin point and a direction vector.
///
/// The direction does not need to be normalized, but must be non-zero.
///
/// # Example
///
/// ```
/// use tessel::surface::Ray;
/// use nalgebra::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), -Vector3::z());
/// let p = ray.point_at(0.5);
/// assert!((p.z - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin of the ray.
    pub origin: Point3<f64>,
    /// The direction of the ray (not necessarily normalized).
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    pub const fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// A ray that starts `distance` away from `target` along `normal` and
    /// points back at it.
    pub fn toward(target: Point3<f64>, normal: Vector3<f64>, distance: f64) -> Self {
        Self::new(target + normal * distance, -normal)
    }

    /// Returns the point along the ray at parameter `t`.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// A flat surface spanned by two axes.
///
/// `axis0` and `axis1` span the full extent of the tiling, which is also one
/// period of each wrapped axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarSurface {
    /// Corner of the tiling.
    pub origin: Point3<f64>,
    /// Extent along the first axis.
    pub axis0: Vector3<f64>,
    /// Extent along the second axis.
    pub axis1: Vector3<f64>,
    /// Whether the first axis wraps around.
    pub wrap_axis0: bool,
    /// Whether the second axis wraps around.
    pub wrap_axis1: bool,
}

impl PlanarSurface {
    /// Unit normal, `axis0 × axis1` normalized.
    pub fn normal(&self) -> Vector3<f64> {
        let n = self.axis0.cross(&self.axis1);
        let len = n.norm();
        if len > f64::EPSILON {
            n / len
        } else {
            Vector3::z()
        }
    }

    /// Offset of a periodic image.
    pub fn offset(&self, wrap: WrapOffset) -> Vector3<f64> {
        self.axis0 * wrap.axis0 as f64 + self.axis1 * wrap.axis1 as f64
    }

    /// Coordinates of `p` in units of the two axes, relative to `origin`.
    ///
    /// The component of `p` along the normal is ignored. Points inside the
    /// tiling land in `[0, 1] x [0, 1]`.
    pub fn coordinates(&self, p: &Point3<f64>) -> Vector2<f64> {
        let w = p - self.origin;
        let g00 = self.axis0.dot(&self.axis0);
        let g01 = self.axis0.dot(&self.axis1);
        let g11 = self.axis1.dot(&self.axis1);
        let det = g00 * g11 - g01 * g01;
        if det.abs() < f64::EPSILON {
            return Vector2::zeros();
        }
        let r0 = w.dot(&self.axis0);
        let r1 = w.dot(&self.axis1);
        Vector2::new((g11 * r0 - g01 * r1) / det, (g00 * r1 - g01 * r0) / det)
    }

    /// The point at surface coordinates `uv`.
    pub fn point_at(&self, uv: &Vector2<f64>) -> Point3<f64> {
        self.origin + self.axis0 * uv.x + self.axis1 * uv.y
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        let n = self.normal();
        p - n * (p - self.origin).dot(&n)
    }

    /// Intersection of a ray with the plane, ignoring the tiling's extent.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<f64>> {
        let n = self.normal();
        let denom = ray.direction.dot(&n);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (self.origin - ray.origin).dot(&n) / denom;
        if t < 0.0 {
            return None;
        }
        Some(ray.point_at(t))
    }
}

/// A sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalSurface {
    /// Center of the sphere.
    pub center: Point3<f64>,
    /// Radius, strictly positive.
    pub radius: f64,
}

impl SphericalSurface {
    /// Outward unit normal at `p`.
    pub fn normal_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        let d = p - self.center;
        let len = d.norm();
        if len > f64::EPSILON {
            d / len
        } else {
            Vector3::z()
        }
    }

    /// Radial projection onto the sphere.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        self.center + self.normal_at(p) * self.radius
    }

    /// Nearest intersection of a ray with the sphere in front of its origin.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<f64>> {
        let oc = ray.origin - self.center;
        let a = ray.direction.norm_squared();
        if a < f64::EPSILON {
            return None;
        }
        let half_b = oc.dot(&ray.direction);
        let c = oc.norm_squared() - self.radius * self.radius;
        let disc = half_b * half_b - a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let near = (-half_b - sqrt_disc) / a;
        let far = (-half_b + sqrt_disc) / a;
        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };
        Some(ray.point_at(t))
    }
}

/// The surface a tiling is embedded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// A plane tiled with quadrilaterals.
    PlanarQuadrilateral(PlanarSurface),
    /// A plane tiled with hexagons.
    PlanarHexagonal(PlanarSurface),
    /// A sphere.
    Spherical(SphericalSurface),
}

impl Surface {
    /// The planar description, if this surface is flat.
    pub fn as_planar(&self) -> Option<&PlanarSurface> {
        match self {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => Some(plane),
            Surface::Spherical(_) => None,
        }
    }

    /// Whether this surface is flat.
    pub fn is_planar(&self) -> bool {
        self.as_planar().is_some()
    }

    /// Unit normal at `p`.
    pub fn normal_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        match self {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => plane.normal(),
            Surface::Spherical(sphere) => sphere.normal_at(p),
        }
    }

    /// Whether the first axis wraps around.
    pub fn wraps_axis0(&self) -> bool {
        self.as_planar().map_or(false, |plane| plane.wrap_axis0)
    }

    /// Whether the second axis wraps around.
    pub fn wraps_axis1(&self) -> bool {
        self.as_planar().map_or(false, |plane| plane.wrap_axis1)
    }

    /// Translation from a vertex's stored position to the periodic image
    /// named by `wrap`.
    pub fn offset(&self, wrap: WrapOffset) -> Vector3<f64> {
        match self {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => {
                plane.offset(wrap)
            }
            Surface::Spherical(_) => Vector3::zeros(),
        }
    }

    /// Closest point on the surface.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => {
                plane.project(p)
            }
            Surface::Spherical(sphere) => sphere.project(p),
        }
    }

    /// Where a ray first meets the surface.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<f64>> {
        match self {
            Surface::PlanarQuadrilateral(plane) | Surface::PlanarHexagonal(plane) => {
                plane.intersect(ray)
            }
            Surface::Spherical(sphere) => sphere.intersect(ray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane() -> PlanarSurface {
        PlanarSurface {
            origin: Point3::new(1.0, 2.0, 0.0),
            axis0: Vector3::new(4.0, 0.0, 0.0),
            axis1: Vector3::new(1.0, 3.0, 0.0),
            wrap_axis0: true,
            wrap_axis1: false,
        }
    }

    #[test]
    fn test_planar_normal_and_wraps() {
        let surface = Surface::PlanarQuadrilateral(plane());
        assert_relative_eq!(surface.normal_at(&Point3::origin()), Vector3::z());
        assert!(surface.wraps_axis0());
        assert!(!surface.wraps_axis1());
        assert!(surface.is_planar());
    }

    #[test]
    fn test_planar_coordinates_skewed_axes() {
        let plane = plane();
        let uv = Vector2::new(0.25, 0.75);
        let p = plane.point_at(&uv);
        assert_relative_eq!(plane.coordinates(&p), uv, epsilon = 1e-12);
    }

    #[test]
    fn test_planar_offset() {
        let surface = Surface::PlanarHexagonal(plane());
        assert_relative_eq!(
            surface.offset(WrapOffset::new(-1, 2)),
            Vector3::new(-2.0, 6.0, 0.0)
        );
    }

    #[test]
    fn test_planar_intersect() {
        let surface = Surface::PlanarQuadrilateral(plane());
        let ray = Ray::new(Point3::new(2.0, 3.0, 5.0), Vector3::new(0.0, 0.0, -2.0));
        let hit = surface.intersect(&ray).unwrap();
        assert_relative_eq!(hit, Point3::new(2.0, 3.0, 0.0));

        let away = Ray::new(Point3::new(2.0, 3.0, 5.0), Vector3::z());
        assert!(surface.intersect(&away).is_none());

        let parallel = Ray::new(Point3::new(2.0, 3.0, 5.0), Vector3::x());
        assert!(surface.intersect(&parallel).is_none());
    }

    #[test]
    fn test_sphere_intersect_and_project() {
        let sphere = SphericalSurface {
            center: Point3::new(0.0, 0.0, 1.0),
            radius: 2.0,
        };
        let surface = Surface::Spherical(sphere);

        let ray = Ray::new(Point3::new(10.0, 0.0, 1.0), -Vector3::x());
        assert_relative_eq!(surface.intersect(&ray).unwrap(), Point3::new(2.0, 0.0, 1.0));

        // From inside, the far side is hit.
        let inside = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::y());
        assert_relative_eq!(surface.intersect(&inside).unwrap(), Point3::new(0.0, 2.0, 1.0));

        let miss = Ray::new(Point3::new(10.0, 5.0, 1.0), -Vector3::x());
        assert!(surface.intersect(&miss).is_none());

        let p = surface.project(&Point3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(surface.offset(WrapOffset::new(1, 1)), Vector3::zeros());
        assert!(!surface.wraps_axis0());
    }
}
