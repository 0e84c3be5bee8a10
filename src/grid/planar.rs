//! Rectangular quad and hex grids on a plane.
//!
//! Both grids are laid out on an integer lattice. Lattice points on a wrapped
//! axis are reduced modulo the period; the quotient becomes the periodic
//! image of the corner, which the topology builder turns into per-edge wrap
//! offsets.

use std::collections::BTreeMap;

use log::debug;
use nalgebra::{Point3, Vector3};

use super::Grid;
use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, Corner, MeshIndex, WrapOffset};
use crate::surface::{PlanarSurface, Surface};

/// Smallest allowed `|sin θ|` between the two axes.
const MIN_AXIS_SINE: f64 = 1e-6;

/// Description of a rectangular grid of quadrilaterals.
///
/// Cell `(col, row)` spans `origin + col * axis0 + row * axis1` to
/// `origin + (col + 1) * axis0 + (row + 1) * axis1`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGridDescriptor {
    /// Corner of cell `(0, 0)`.
    pub origin: Point3<f64>,
    /// Edge of one cell along the first axis.
    pub axis0: Vector3<f64>,
    /// Edge of one cell along the second axis.
    pub axis1: Vector3<f64>,
    /// Number of cells along the first axis.
    pub width: usize,
    /// Number of cells along the second axis.
    pub height: usize,
    /// Whether the first axis wraps around.
    pub wrap_axis0: bool,
    /// Whether the second axis wraps around.
    pub wrap_axis1: bool,
}

impl QuadGridDescriptor {
    /// Unit cells in the XY plane at the origin, no wrapping.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            origin: Point3::origin(),
            axis0: Vector3::x(),
            axis1: Vector3::y(),
            width,
            height,
            wrap_axis0: false,
            wrap_axis1: false,
        }
    }

    /// Set the grid origin.
    pub fn with_origin(mut self, origin: Point3<f64>) -> Self {
        self.origin = origin;
        self
    }

    /// Set the cell axes.
    pub fn with_axes(mut self, axis0: Vector3<f64>, axis1: Vector3<f64>) -> Self {
        self.axis0 = axis0;
        self.axis1 = axis1;
        self
    }

    /// Set which axes wrap around.
    pub fn with_wrap(mut self, wrap_axis0: bool, wrap_axis1: bool) -> Self {
        self.wrap_axis0 = wrap_axis0;
        self.wrap_axis1 = wrap_axis1;
        self
    }
}

/// Description of a rectangular grid of pointy-top hexagons in offset rows.
///
/// `axis0` is the step between horizontally adjacent hex centers and `axis1`
/// the step between rows. Odd rows are shifted by half of `axis0`.
#[derive(Debug, Clone, PartialEq)]
pub struct HexGridDescriptor {
    /// Center of hex `(0, 0)`.
    pub origin: Point3<f64>,
    /// Step between neighboring centers in a row.
    pub axis0: Vector3<f64>,
    /// Step between rows.
    pub axis1: Vector3<f64>,
    /// Number of hexes per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Whether the first axis wraps around.
    pub wrap_axis0: bool,
    /// Whether the second axis wraps around. Requires an even height.
    pub wrap_axis1: bool,
}

impl HexGridDescriptor {
    /// Regular hexagons of unit circumradius in the XY plane, no wrapping.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            origin: Point3::origin(),
            axis0: Vector3::new(3f64.sqrt(), 0.0, 0.0),
            axis1: Vector3::new(0.0, 1.5, 0.0),
            width,
            height,
            wrap_axis0: false,
            wrap_axis1: false,
        }
    }

    /// Set the grid origin.
    pub fn with_origin(mut self, origin: Point3<f64>) -> Self {
        self.origin = origin;
        self
    }

    /// Set the center-to-center axes.
    pub fn with_axes(mut self, axis0: Vector3<f64>, axis1: Vector3<f64>) -> Self {
        self.axis0 = axis0;
        self.axis1 = axis1;
        self
    }

    /// Set which axes wrap around.
    pub fn with_wrap(mut self, wrap_axis0: bool, wrap_axis1: bool) -> Self {
        self.wrap_axis0 = wrap_axis0;
        self.wrap_axis1 = wrap_axis1;
        self
    }
}

/// Build a rectangular grid of quadrilaterals.
///
/// # Errors
///
/// Returns [`MeshError::InvalidTopology`] if a dimension is zero, an axis has
/// zero length, the axes are parallel, or a wrapped axis has fewer than two
/// cells.
///
/// # Example
///
/// ```
/// use tessel::grid::{build_quad_grid, Grid, QuadGridDescriptor};
///
/// let grid: Grid = build_quad_grid(&QuadGridDescriptor::new(5, 3)).unwrap();
/// assert_eq!(grid.topology.num_vertices(), 24);
/// assert_eq!(grid.topology.num_external_faces(), 1);
/// ```
pub fn build_quad_grid<I: MeshIndex>(desc: &QuadGridDescriptor) -> Result<Grid<I>> {
    check_plane(&desc.origin, &desc.axis0, &desc.axis1, desc.width, desc.height)?;
    check_wrapped_extent("width", desc.wrap_axis0, desc.width)?;
    check_wrapped_extent("height", desc.wrap_axis1, desc.height)?;

    let (w, h) = (desc.width as i64, desc.height as i64);
    let mut cells = Vec::with_capacity(desc.width * desc.height);
    for row in 0..h {
        for col in 0..w {
            cells.push(vec![
                [col, row],
                [col + 1, row],
                [col + 1, row + 1],
                [col, row + 1],
            ]);
        }
    }

    let lattice = Lattice {
        period: [w, h],
        wrap: [desc.wrap_axis0, desc.wrap_axis1],
    };
    let surface = Surface::PlanarQuadrilateral(PlanarSurface {
        origin: desc.origin,
        axis0: desc.axis0 * w as f64,
        axis1: desc.axis1 * h as f64,
        wrap_axis0: desc.wrap_axis0,
        wrap_axis1: desc.wrap_axis1,
    });

    debug!(
        "Building {}x{} quad grid (wrap {}/{})",
        desc.width, desc.height, desc.wrap_axis0, desc.wrap_axis1
    );
    lattice.assemble(&cells, surface, |[x, y]| {
        desc.origin + desc.axis0 * x as f64 + desc.axis1 * y as f64
    })
}

/// Build a rectangular grid of pointy-top hexagons.
///
/// # Errors
///
/// Returns [`MeshError::InvalidTopology`] under the same conditions as
/// [`build_quad_grid`], and also when the second axis wraps with an odd
/// number of rows, since the row offsets would not line up across the seam.
pub fn build_hex_grid<I: MeshIndex>(desc: &HexGridDescriptor) -> Result<Grid<I>> {
    check_plane(&desc.origin, &desc.axis0, &desc.axis1, desc.width, desc.height)?;
    check_wrapped_extent("width", desc.wrap_axis0, desc.width)?;
    check_wrapped_extent("height", desc.wrap_axis1, desc.height)?;
    if desc.wrap_axis1 && desc.height % 2 != 0 {
        return Err(MeshError::invalid_topology(format!(
            "hex grid wrapping its second axis needs an even height, got {}",
            desc.height
        )));
    }

    // Lattice units: half a center step along axis0, a third of a row step
    // along axis1. Center of (col, row) is (2 col + row parity, 3 row).
    let (w, h) = (desc.width as i64, desc.height as i64);
    let mut cells = Vec::with_capacity(desc.width * desc.height);
    for row in 0..h {
        for col in 0..w {
            let x = 2 * col + (row & 1);
            let y = 3 * row;
            cells.push(vec![
                [x + 1, y - 1],
                [x + 1, y + 1],
                [x, y + 2],
                [x - 1, y + 1],
                [x - 1, y - 1],
                [x, y - 2],
            ]);
        }
    }

    let lattice = Lattice {
        period: [2 * w, 3 * h],
        wrap: [desc.wrap_axis0, desc.wrap_axis1],
    };
    let surface = Surface::PlanarHexagonal(PlanarSurface {
        origin: desc.origin,
        axis0: desc.axis0 * w as f64,
        axis1: desc.axis1 * h as f64,
        wrap_axis0: desc.wrap_axis0,
        wrap_axis1: desc.wrap_axis1,
    });

    debug!(
        "Building {}x{} hex grid (wrap {}/{})",
        desc.width, desc.height, desc.wrap_axis0, desc.wrap_axis1
    );
    lattice.assemble(&cells, surface, |[x, y]| {
        desc.origin + desc.axis0 * (x as f64 / 2.0) + desc.axis1 * (y as f64 / 3.0)
    })
}

struct Lattice {
    period: [i64; 2],
    wrap: [bool; 2],
}

impl Lattice {
    /// Canonical lattice point and the periodic image `p` lies in.
    fn reduce(&self, p: [i64; 2]) -> ([i64; 2], WrapOffset) {
        let mut key = p;
        let mut image = [0i64; 2];
        for axis in 0..2 {
            if self.wrap[axis] {
                image[axis] = p[axis].div_euclid(self.period[axis]);
                key[axis] = p[axis].rem_euclid(self.period[axis]);
            }
        }
        (key, WrapOffset::new(image[0] as i32, image[1] as i32))
    }

    fn assemble<I: MeshIndex>(
        &self,
        cells: &[Vec<[i64; 2]>],
        surface: Surface,
        position: impl Fn([i64; 2]) -> Point3<f64>,
    ) -> Result<Grid<I>> {
        // Number vertices row by row so small grids read naturally.
        let mut index: BTreeMap<(i64, i64), usize> = BTreeMap::new();
        for cell in cells {
            for &p in cell {
                let (key, _) = self.reduce(p);
                index.insert((key[1], key[0]), 0);
            }
        }
        let mut positions = Vec::with_capacity(index.len());
        for (i, (&(y, x), slot)) in index.iter_mut().enumerate() {
            *slot = i;
            positions.push(position([x, y]));
        }

        let polygons: Vec<Vec<Corner>> = cells
            .iter()
            .map(|cell| {
                cell.iter()
                    .map(|&p| {
                        let (key, image) = self.reduce(p);
                        Corner::new(index[&(key[1], key[0])], image)
                    })
                    .collect()
            })
            .collect();

        let topology = build_from_polygons(positions.len(), &polygons)?;
        Ok(Grid {
            topology,
            positions: positions.into(),
            surface,
        })
    }
}

fn check_plane(
    origin: &Point3<f64>,
    axis0: &Vector3<f64>,
    axis1: &Vector3<f64>,
    width: usize,
    height: usize,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MeshError::invalid_topology(format!(
            "grid size must be positive, got {}x{}",
            width, height
        )));
    }
    let finite = origin.iter().chain(axis0.iter()).chain(axis1.iter()).all(|c| c.is_finite());
    if !finite {
        return Err(MeshError::invalid_topology("grid origin and axes must be finite"));
    }

    let len0 = axis0.norm();
    let len1 = axis1.norm();
    if len0 < f64::EPSILON || len1 < f64::EPSILON {
        return Err(MeshError::invalid_topology(format!(
            "grid axes must have non-zero length, got {:.3e} and {:.3e}",
            len0, len1
        )));
    }
    let sine = axis0.cross(axis1).norm() / (len0 * len1);
    if sine < MIN_AXIS_SINE {
        return Err(MeshError::invalid_topology(
            "grid axes are parallel or nearly parallel",
        ));
    }
    Ok(())
}

fn check_wrapped_extent(name: &str, wraps: bool, cells: usize) -> Result<()> {
    if wraps && cells < 2 {
        return Err(MeshError::invalid_topology(format!(
            "a wrapped axis needs at least two cells, {} is {}",
            name, cells
        )));
    }
    Ok(())
}
