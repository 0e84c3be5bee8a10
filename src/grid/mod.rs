//! Builders for initial tilings.
//!
//! Every builder returns a [`Grid`]: a fresh [`Topology`], the position of
//! every vertex, and the [`Surface`] the tiling lives on. Builders validate
//! their descriptor before allocating anything, so a degenerate request
//! fails with [`MeshError::InvalidTopology`](crate::error::MeshError::InvalidTopology)
//! and never yields a partial topology.
//!
//! - [`build_quad_grid`]: rectangular grid of quadrilaterals
//! - [`build_hex_grid`]: rectangular grid of pointy-top hexagons
//! - [`build_sphere`]: subdivided regular polyhedron, optionally dualized
//!
//! Planar grids may wrap on either axis. A wrapped axis keeps one copy of the
//! vertices along the seam, and the edges that cross it carry a
//! [`WrapOffset`](crate::mesh::WrapOffset).

mod planar;
mod sphere;

use nalgebra::Point3;

use crate::error::Result;
use crate::mesh::{MeshIndex, Topology, VertexAttribute};
use crate::surface::Surface;

pub use planar::{build_hex_grid, build_quad_grid, HexGridDescriptor, QuadGridDescriptor};
pub use sphere::{build_sphere, dual_of, subdivide, BasePolyhedron, SphereDescriptor};

/// A topology together with its geometry.
#[derive(Debug, Clone)]
pub struct Grid<I: MeshIndex = u32> {
    /// Combinatorial structure.
    pub topology: Topology<I>,
    /// Position of every vertex, in its canonical periodic image.
    pub positions: VertexAttribute<Point3<f64>>,
    /// Surface the tiling lives on.
    pub surface: Surface,
}

/// Any of the supported grid descriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum GridDescriptor {
    /// Quadrilateral grid on a plane.
    Quad(QuadGridDescriptor),
    /// Hexagonal grid on a plane.
    Hex(HexGridDescriptor),
    /// Tiled sphere.
    Sphere(SphereDescriptor),
}

/// Build the grid described by `descriptor`.
///
/// The result depends only on the descriptor.
pub fn build_grid<I: MeshIndex>(descriptor: &GridDescriptor) -> Result<Grid<I>> {
    match descriptor {
        GridDescriptor::Quad(desc) => build_quad_grid(desc),
        GridDescriptor::Hex(desc) => build_hex_grid(desc),
        GridDescriptor::Sphere(desc) => build_sphere(desc),
    }
}

impl From<QuadGridDescriptor> for GridDescriptor {
    fn from(desc: QuadGridDescriptor) -> Self {
        GridDescriptor::Quad(desc)
    }
}

impl From<HexGridDescriptor> for GridDescriptor {
    fn from(desc: HexGridDescriptor) -> Self {
        GridDescriptor::Hex(desc)
    }
}

impl From<SphereDescriptor> for GridDescriptor {
    fn from(desc: SphereDescriptor) -> Self {
        GridDescriptor::Sphere(desc)
    }
}
