use itertools::iproduct;
use nalgebra::Vector3;

/// Number of grid nodes touched by a particle along each axis.
pub const STENCIL_WIDTH: usize = 3;

/// Base node coordinates are clamped to this magnitude so stencil offsets cannot overflow
/// `i32` for diverged (huge or infinite) positions. It lies far outside any valid grid.
const BASE_COORD_LIMIT: f32 = (1 << 24) as f32;

/// Per-axis quadratic B-spline weights for a particle at local offset `fx` from the
/// stencil's lower corner, in cell units.
///
/// For `fx` in `[0.5, 1.5)` (the range produced by [`Stencil::new`]) all three weights are
/// non-negative, and on every axis they sum to one for any `fx`.
#[inline]
pub fn quadratic_bspline_weights(fx: &Vector3<f32>) -> [Vector3<f32>; STENCIL_WIDTH] {
    let w0 = (Vector3::repeat(1.5) - fx).map(|d| 0.5 * d * d);
    let w1 = (fx - Vector3::repeat(1.0)).map(|d| 0.75 - d * d);
    let w2 = (fx - Vector3::repeat(0.5)).map(|d| 0.5 * d * d);
    [w0, w1, w2]
}

/// Offsets `(i, j, k)` of the 27 nodes in a particle's stencil, relative to its base node.
pub fn stencil_offsets() -> impl Iterator<Item = [usize; 3]> {
    iproduct!(0..STENCIL_WIDTH, 0..STENCIL_WIDTH, 0..STENCIL_WIDTH).map(|(i, j, k)| [i, j, k])
}

/// The 3x3x3 interpolation stencil of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stencil {
    /// Integer coordinate of the stencil's lower corner node.
    pub base: Vector3<i32>,
    /// Particle position relative to `base`, in cell units.
    pub fx: Vector3<f32>,
    pub weights: [Vector3<f32>; STENCIL_WIDTH],
}

impl Stencil {
    pub fn new(position: &Vector3<f32>, inv_dx: f32) -> Self {
        let scaled = position * inv_dx;
        let base_f = (scaled - Vector3::repeat(0.5)).map(f32::floor);
        let fx = scaled - base_f;
        Self {
            base: base_f.map(|c| c.clamp(-BASE_COORD_LIMIT, BASE_COORD_LIMIT) as i32),
            fx,
            weights: quadratic_bspline_weights(&fx),
        }
    }

    #[inline]
    pub fn weight(&self, [i, j, k]: [usize; 3]) -> f32 {
        self.weights[i].x * self.weights[j].y * self.weights[k].z
    }

    /// Grid coordinate of the stencil node at `offset`. May lie outside the grid.
    #[inline]
    pub fn node(&self, [i, j, k]: [usize; 3]) -> Vector3<i32> {
        Vector3::new(
            self.base.x.saturating_add(i as i32),
            self.base.y.saturating_add(j as i32),
            self.base.z.saturating_add(k as i32),
        )
    }

    /// Vector from the particle to the node at `offset`, in cell units.
    #[inline]
    pub fn node_offset(&self, [i, j, k]: [usize; 3]) -> Vector3<f32> {
        Vector3::new(i as f32, j as f32, k as f32) - self.fx
    }
}
