//! # Chunk Grid
//!
//! The streaming window of chunks around the viewer.
//!
//! The grid allocates `Dx * Dy * Dz` chunks once, in an arena addressed by
//! `ChunkId`. A separate layout table maps each logical cell of the window to the
//! chunk currently occupying it; logical cell `c` always holds the chunk at chunk
//! coordinate `origin + c`.
//!
//! ## Rotation
//!
//! When the viewer crosses a chunk boundary the window slides. For each axis with
//! a non-zero shift `n`:
//!
//! 1. the layout is circularly shifted by `n`, so cells keep their chunks and
//!    the slab that fell off the trailing edge reappears on the leading edge
//! 2. every chunk of that slab is repositioned by `±dim` along the axis and reset
//!    (`loaded = false`, `mesh_dirty = true`, `mesh_uploaded = false`)
//! 3. neighbor links are rebuilt for the cells whose neighbors changed: the moved
//!    slab, the slab next to it, and both edge slabs of the axis
//!
//! Axes are processed one at a time, so each axis sees the others already in
//! their final arrangement. No chunk is ever allocated or freed after `new`.
//!
//! ## Locking
//!
//! Every chunk sits behind its own `MtResource`. Rotation locks chunks one at a
//! time and expects the caller to hold the grid exclusively (the engine keeps the
//! whole grid in an `MtResource` and write-locks it to rotate).

use std::collections::BTreeSet;

use cgmath::{Point3, Vector3};
use log::{debug, info};

use crate::core::MtResource;

use super::{
    block::block_side::BlockSide,
    chunk::{Chunk, ChunkId},
};

/// Fixed-size toroidal array of chunks.
pub struct ChunkGrid {
    dimensions: Vector3<i32>,
    origin: Point3<i32>,
    chunks: Vec<MtResource<Chunk>>,
    layout: Vec<ChunkId>,
}

impl ChunkGrid {
    /// Allocates every chunk of a grid whose logical cell `(0, 0, 0)` is the chunk
    /// at `origin`.
    ///
    /// # Panics
    /// Panics if a dimension is less than 1.
    pub fn new(dimensions: [i32; 3], origin: Point3<i32>) -> Self {
        assert!(
            dimensions.iter().all(|d| *d >= 1),
            "grid dimensions must be positive, got {dimensions:?}"
        );
        let dimensions = Vector3::from(dimensions);
        let count = (dimensions.x * dimensions.y * dimensions.z) as usize;

        let mut grid = ChunkGrid {
            dimensions,
            origin,
            chunks: Vec::with_capacity(count),
            layout: (0..count).map(ChunkId).collect(),
        };
        for index in 0..count {
            let position = origin + grid.logical_of(index);
            grid.chunks.push(MtResource::new(Chunk::new(position)));
        }
        grid.relink_all();

        info!(
            "Chunk grid created: {:?} chunks around {:?}",
            dimensions,
            grid.center()
        );
        grid
    }

    /// Number of chunks along each axis.
    pub fn dimensions(&self) -> Vector3<i32> {
        self.dimensions
    }

    /// Chunk coordinate held by logical cell `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    /// Chunk coordinate at the middle of the window.
    pub fn center(&self) -> Point3<i32> {
        self.origin + self.dimensions / 2
    }

    /// Total number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always `false`; a grid holds at least one chunk.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Every chunk id, in arena order.
    pub fn ids(&self) -> impl Iterator<Item = ChunkId> {
        (0..self.chunks.len()).map(ChunkId)
    }

    /// The chunk with the given id.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this grid.
    pub fn chunk(&self, id: ChunkId) -> &MtResource<Chunk> {
        &self.chunks[id.0]
    }

    /// The chunk occupying logical cell `cell`, if the cell is inside the window.
    pub fn id_at(&self, cell: Vector3<i32>) -> Option<ChunkId> {
        self.index_of(cell).map(|index| self.layout[index])
    }

    /// The chunk currently at chunk coordinate `position`, if it is in the window.
    pub fn id_at_position(&self, position: Point3<i32>) -> Option<ChunkId> {
        self.id_at(position - self.origin)
    }

    /// `true` if chunk coordinate `position` is inside the window.
    pub fn contains_position(&self, position: Point3<i32>) -> bool {
        self.index_of(position - self.origin).is_some()
    }

    fn index_of(&self, cell: Vector3<i32>) -> Option<usize> {
        let d = self.dimensions;
        let inside = (0..d.x).contains(&cell.x) && (0..d.y).contains(&cell.y) && (0..d.z).contains(&cell.z);
        inside.then(|| (cell.x + d.x * (cell.y + d.y * cell.z)) as usize)
    }

    fn logical_of(&self, index: usize) -> Vector3<i32> {
        let d = self.dimensions;
        let index = index as i32;
        Vector3::new(index % d.x, (index / d.x) % d.y, index / (d.x * d.y))
    }

    /// Rebuilds the six neighbor links of the chunk at logical cell `cell`.
    fn link_cell(&self, cell: Vector3<i32>) {
        let Some(id) = self.id_at(cell) else {
            return;
        };
        let mut chunk = self.chunks[id.0].get_mut();
        for side in BlockSide::all() {
            chunk.set_neighbor(side, self.id_at(cell + side.normal()));
        }
    }

    fn relink_all(&self) {
        for index in 0..self.layout.len() {
            self.link_cell(self.logical_of(index));
        }
    }

    /// Slides the window by `amount` chunks.
    ///
    /// # Returns
    /// The chunks that were repositioned, sorted and without duplicates. Their
    /// meshes describe the old position and should be hidden.
    pub fn rotate(&mut self, amount: Vector3<i32>) -> Vec<ChunkId> {
        let mut moved = BTreeSet::new();
        for axis in 0..3 {
            if amount[axis] != 0 {
                self.rotate_axis(axis, amount[axis], &mut moved);
            }
        }
        if moved.is_empty() {
            return Vec::new();
        }

        // Meshes along the seam reference blocks that are about to change.
        for id in &moved {
            let neighbors: Vec<ChunkId> = {
                let chunk = self.chunks[id.0].get();
                BlockSide::all()
                    .into_iter()
                    .filter_map(|side| chunk.neighbor(side))
                    .collect()
            };
            for neighbor in neighbors {
                if !moved.contains(&neighbor) {
                    self.chunks[neighbor.0].get_mut().mesh_dirty = true;
                }
            }
        }

        info!(
            "Grid rotated by {:?}: {} chunks moved, now centred on {:?}",
            amount,
            moved.len(),
            self.center()
        );
        moved.into_iter().collect()
    }

    fn rotate_axis(&mut self, axis: usize, shift: i32, moved: &mut BTreeSet<ChunkId>) {
        let dim = self.dimensions[axis];

        let old_layout = self.layout.clone();
        for index in 0..self.layout.len() {
            let mut source = self.logical_of(index);
            source[axis] = (source[axis] + shift).rem_euclid(dim);
            if let Some(source_index) = self.index_of(source) {
                self.layout[index] = old_layout[source_index];
            }
        }
        self.origin[axis] += shift;

        // Cells along `axis` whose chunk changed position.
        let moved_slab: Vec<i32> = if shift.abs() >= dim {
            (0..dim).collect()
        } else if shift > 0 {
            (dim - shift..dim).collect()
        } else {
            (0..-shift).collect()
        };

        for index in 0..self.layout.len() {
            let cell = self.logical_of(index);
            if moved_slab.contains(&cell[axis]) {
                let id = self.layout[index];
                self.chunks[id.0].get_mut().reposition(self.origin + cell);
                moved.insert(id);
            }
        }
        debug!("Axis {axis} shifted by {shift}: slab {moved_slab:?} repositioned");

        let mut relink: BTreeSet<i32> = moved_slab.iter().copied().collect();
        relink.insert(0);
        relink.insert(dim - 1);
        if shift > 0 && shift < dim {
            relink.insert(dim - shift - 1);
        } else if shift < 0 && -shift < dim {
            relink.insert(-shift);
        }
        for index in 0..self.layout.len() {
            let cell = self.logical_of(index);
            if relink.contains(&cell[axis]) {
                self.link_cell(cell);
            }
        }
    }

    /// Slides the window so that chunk coordinate `center` is in the middle.
    pub fn recenter(&mut self, center: Point3<i32>) -> Vec<ChunkId> {
        let shift = center - self.center();
        if shift == Vector3::new(0, 0, 0) {
            return Vec::new();
        }
        self.rotate(shift)
    }

    /// Checks that every link is reciprocated and points at the geometric
    /// neighbor.
    pub fn neighbors_consistent(&self) -> bool {
        (0..self.layout.len()).all(|index| {
            let cell = self.logical_of(index);
            let id = self.layout[index];
            let chunk = self.chunks[id.0].get();
            if chunk.position() != self.origin + cell {
                return false;
            }
            BlockSide::all().into_iter().all(|side| {
                let expected = self.id_at(cell + side.normal());
                if chunk.neighbor(side) != expected {
                    return false;
                }
                match expected {
                    Some(other) => self.chunks[other.0].get().neighbor(side.opposite()) == Some(id),
                    None => true,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(grid: &ChunkGrid) -> Vec<Point3<i32>> {
        grid.ids().map(|id| grid.chunk(id).get().position()).collect()
    }

    #[test]
    fn new_grid_is_linked() {
        let grid = ChunkGrid::new([3, 2, 2], Point3::new(-1, 0, 0));
        assert_eq!(grid.len(), 12);
        assert!(grid.neighbors_consistent());
        let corner = grid.id_at(Vector3::new(0, 0, 0)).unwrap();
        let chunk = grid.chunk(corner).get();
        assert_eq!(chunk.neighbor(BlockSide::NX), None);
        assert_eq!(chunk.neighbor(BlockSide::PX), grid.id_at(Vector3::new(1, 0, 0)));
    }

    #[test]
    fn rotation_moves_trailing_slab_forward() {
        let mut grid = ChunkGrid::new([4, 2, 1], Point3::new(0, 0, 0));
        for id in grid.ids() {
            let mut chunk = grid.chunk(id).get_mut();
            chunk.loaded = true;
            chunk.mesh_dirty = false;
            chunk.mesh_uploaded = true;
        }

        let moved = grid.rotate(Vector3::new(1, 0, 0));
        assert_eq!(moved.len(), 2);
        assert_eq!(grid.origin(), Point3::new(1, 0, 0));
        for id in &moved {
            let chunk = grid.chunk(*id).get();
            assert_eq!(chunk.position().x, 4);
            assert!(!chunk.loaded && chunk.mesh_dirty && !chunk.mesh_uploaded);
        }
        // The chunk now next to the new slab has to rebuild its seam.
        let seam = grid.id_at(Vector3::new(2, 0, 0)).unwrap();
        assert!(grid.chunk(seam).get().mesh_dirty);
        let far = grid.id_at(Vector3::new(0, 0, 0)).unwrap();
        assert!(!grid.chunk(far).get().mesh_dirty);
        assert!(grid.neighbors_consistent());
    }

    #[test]
    fn rotation_round_trip_restores_positions() {
        let mut grid = ChunkGrid::new([4, 3, 2], Point3::new(5, 5, 0));
        let before = positions(&grid);
        grid.rotate(Vector3::new(2, 0, 0));
        grid.rotate(Vector3::new(-2, 0, 0));
        assert_eq!(positions(&grid), before);
        assert!(grid.neighbors_consistent());
    }

    #[test]
    fn large_shift_moves_everything() {
        let mut grid = ChunkGrid::new([2, 2, 2], Point3::new(0, 0, 0));
        let moved = grid.rotate(Vector3::new(0, -5, 3));
        assert_eq!(moved.len(), 8);
        assert_eq!(grid.origin(), Point3::new(0, -5, 3));
        assert!(grid.neighbors_consistent());
        assert!(grid.id_at_position(Point3::new(1, -4, 4)).is_some());
        assert!(grid.id_at_position(Point3::new(0, 0, 0)).is_none());
    }

    #[test]
    fn recenter_follows_viewer() {
        let mut grid = ChunkGrid::new([5, 5, 3], Point3::new(-2, -2, -1));
        assert_eq!(grid.center(), Point3::new(0, 0, 0));
        assert!(grid.recenter(Point3::new(0, 0, 0)).is_empty());
        let moved = grid.recenter(Point3::new(1, 0, 0));
        assert_eq!(moved.len(), 15);
        assert_eq!(grid.center(), Point3::new(1, 0, 0));
        assert!(grid.neighbors_consistent());
    }
}
