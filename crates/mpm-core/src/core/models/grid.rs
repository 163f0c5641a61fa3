use crate::core::utils::atomic::AtomicF32;
use nalgebra::Vector3;

/// One node of the background grid.
///
/// During particle-to-grid transfer `momentum` accumulates mass-weighted velocity from many
/// particles at once. The grid solve then overwrites it in place with the node velocity.
#[derive(Debug, Default)]
pub struct GridNode {
    pub momentum: [AtomicF32; 3],
    pub mass: AtomicF32,
}

impl GridNode {
    /// Adds a particle's contribution. Safe to call concurrently on the same node.
    #[inline]
    pub fn accumulate(&self, momentum: &Vector3<f32>, mass: f32) {
        for (slot, value) in self.momentum.iter().zip(momentum.iter()) {
            slot.fetch_add(*value);
        }
        self.mass.fetch_add(mass);
    }

    /// Current contents of the vector slot: momentum before the grid solve, velocity after.
    #[inline]
    pub fn vector(&self) -> Vector3<f32> {
        Vector3::new(
            self.momentum[0].load(),
            self.momentum[1].load(),
            self.momentum[2].load(),
        )
    }

    #[inline]
    pub fn velocity(&self) -> Vector3<f32> {
        self.vector()
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass.load()
    }

    #[inline]
    pub fn set_vector(&mut self, value: &Vector3<f32>) {
        for (slot, component) in self.momentum.iter_mut().zip(value.iter()) {
            slot.set(*component);
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.set_vector(&Vector3::zeros());
        self.mass.set(0.0);
    }
}

/// Splits a flat x-major node index into its `(i, j, k)` coordinate.
#[inline]
pub fn split_index(index: usize, resolution: usize) -> [usize; 3] {
    let n = resolution;
    [index / (n * n), (index / n) % n, index % n]
}

/// Dense cubic grid of `resolution³` nodes covering the unit cube, stored x-major.
#[derive(Debug)]
pub struct Grid {
    resolution: usize,
    nodes: Vec<GridNode>,
}

impl Grid {
    pub fn new(resolution: usize) -> Self {
        let count = resolution * resolution * resolution;
        Self {
            resolution,
            nodes: (0..count).map(|_| GridNode::default()).collect(),
        }
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.resolution + j) * self.resolution + k
    }

    /// Inverse of [`Grid::index`].
    #[inline]
    pub fn coord(&self, index: usize) -> [usize; 3] {
        split_index(index, self.resolution)
    }

    /// Flat index of a signed node coordinate, or `None` if it lies outside the grid.
    #[inline]
    pub fn checked_index(&self, node: &Vector3<i32>) -> Option<usize> {
        let n = self.resolution as i32;
        if node.iter().all(|&c| (0..n).contains(&c)) {
            Some(self.index(node.x as usize, node.y as usize, node.z as usize))
        } else {
            None
        }
    }

    #[inline]
    pub fn node(&self, i: usize, j: usize, k: usize) -> &GridNode {
        &self.nodes[self.index(i, j, k)]
    }

    #[inline]
    pub fn node_mut(&mut self, i: usize, j: usize, k: usize) -> &mut GridNode {
        let index = self.index(i, j, k);
        &mut self.nodes[index]
    }

    #[inline]
    pub fn get(&self, node: &Vector3<i32>) -> Option<&GridNode> {
        self.checked_index(node).map(|index| &self.nodes[index])
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [GridNode] {
        &mut self.nodes
    }

    pub fn total_mass(&self) -> f64 {
        self.nodes.iter().map(|node| node.mass() as f64).sum()
    }

    /// Sum of the vector slot over all nodes. Meaningful as total momentum only between
    /// particle-to-grid transfer and the grid solve.
    pub fn total_momentum(&self) -> Vector3<f64> {
        self.nodes
            .iter()
            .map(|node| node.vector().cast::<f64>())
            .fold(Vector3::zeros(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_zeroed_with_cubic_node_count() {
        let grid = Grid::new(8);
        assert_eq!(grid.len(), 512);
        assert_eq!(grid.total_mass(), 0.0);
        assert_eq!(grid.total_momentum(), Vector3::zeros());
    }

    #[test]
    fn index_and_coord_are_inverse() {
        let grid = Grid::new(16);
        for index in [0, 1, 17, 255, 4095] {
            let [i, j, k] = grid.coord(index);
            assert_eq!(grid.index(i, j, k), index);
        }
        assert_eq!(grid.coord(grid.index(3, 5, 7)), [3, 5, 7]);
    }

    #[test]
    fn checked_index_rejects_out_of_range_nodes() {
        let grid = Grid::new(8);
        assert_eq!(grid.checked_index(&Vector3::new(0, 0, 0)), Some(0));
        assert_eq!(grid.checked_index(&Vector3::new(7, 7, 7)), Some(511));
        assert_eq!(grid.checked_index(&Vector3::new(-1, 0, 0)), None);
        assert_eq!(grid.checked_index(&Vector3::new(0, 8, 0)), None);
    }

    #[test]
    fn accumulate_sums_contributions_and_clear_resets() {
        let mut grid = Grid::new(4);
        grid.node(1, 2, 3).accumulate(&Vector3::new(1.0, 2.0, 3.0), 0.5);
        grid.node(1, 2, 3).accumulate(&Vector3::new(1.0, 0.0, -1.0), 0.25);

        let node = grid.node(1, 2, 3);
        assert_eq!(node.vector(), Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(node.mass(), 0.75);
        assert_eq!(grid.total_mass(), 0.75);

        grid.node_mut(1, 2, 3).clear();
        assert_eq!(grid.node(1, 2, 3).mass(), 0.0);
        assert_eq!(grid.node(1, 2, 3).vector(), Vector3::zeros());
    }
}
