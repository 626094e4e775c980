/*
path.rs

Copyright 2025 Hervé Quatremain

This file is part of Lightpath.

Lightpath is free software: you can redistribute it and/or modify it under the
terms of the GNU General Public License as published by the Free Software
Foundation, either version 3 of the License, or (at your option) any later
version.

Lightpath is distributed in the hope that it will be useful, but WITHOUT ANY
WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
A PARTICULAR PURPOSE. See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License along with
Lightpath. If not, see <https://www.gnu.org/licenses/>.

SPDX-License-Identifier: GPL-3.0-or-later
*/

//! Path of the beam across the grid.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::grid::{Direction, GridPosition};
use super::materials::MaterialType;

/// One straight run of the beam between two interactions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub start: GridPosition,
    pub end: GridPosition,
    pub direction: Direction,

    /// Material that closed the segment. The last segment of a beam leaving the grid is
    /// [`MaterialType::Empty`].
    pub material: MaterialType,
}

impl PathSegment {
    /// Cells covered by the segment, from `start` to `end` included.
    ///
    /// Also stops after `grid_size` steps, so a segment whose end is not reachable from its start
    /// cannot run forever.
    pub fn cells(&self, grid_size: usize) -> Vec<GridPosition> {
        let mut cells: Vec<GridPosition> = vec![self.start];
        let mut p: GridPosition = self.start;
        while p != self.end && cells.len() <= grid_size {
            match p.step(self.direction, grid_size) {
                Some(next) => {
                    cells.push(next);
                    p = next;
                }
                None => break,
            }
        }
        cells
    }
}

/// Complete beam path.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaserPath {
    /// Connected chain of segments: the end of a segment is the start of the next one.
    pub segments: Vec<PathSegment>,

    /// Last cell before the beam left the grid, or None if it never left.
    pub exit: Option<GridPosition>,

    /// Whether an absorber stopped the beam.
    pub terminated: bool,
}

impl LaserPath {
    /// Create an empty [`LaserPath`] object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment at the end of the path.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether each segment starts where the previous one ends.
    pub fn is_connected(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].end == w[1].start)
    }

    /// Accumulated energy loss, one constant per segment, capped at 1.0.
    pub fn energy_loss(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.material.energy_loss())
            .sum::<f64>()
            .min(1.0)
    }

    /// Cells visited by the first `count` segments, in visiting order, without duplicates.
    pub fn visited_cells(&self, count: usize, grid_size: usize) -> Vec<GridPosition> {
        let mut seen: HashSet<GridPosition> = HashSet::new();
        let mut cells: Vec<GridPosition> = Vec::new();
        for segment in self.segments.iter().take(count) {
            for c in segment.cells(grid_size) {
                if seen.insert(c) {
                    cells.push(c);
                }
            }
        }
        cells
    }

    /// Cells visited by the whole path.
    pub fn all_cells(&self, grid_size: usize) -> Vec<GridPosition> {
        self.visited_cells(self.segments.len(), grid_size)
    }

    /// Return the first cell of the path.
    pub fn get_first(&self) -> Option<GridPosition> {
        self.segments.first().map(|s| s.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(
        start: (usize, usize),
        end: (usize, usize),
        direction: Direction,
        material: MaterialType,
    ) -> PathSegment {
        PathSegment {
            start: GridPosition::new(start.0, start.1),
            end: GridPosition::new(end.0, end.1),
            direction,
            material,
        }
    }

    #[test]
    fn energy_loss_sums_segment_constants() {
        let mut path = LaserPath::new();
        path.push(segment((0, 0), (2, 0), Direction::East, MaterialType::Water));
        path.push(segment((2, 0), (2, 3), Direction::South, MaterialType::Glass));
        path.push(segment((2, 3), (2, 5), Direction::South, MaterialType::Empty));
        assert!((path.energy_loss() - 0.16).abs() < 1e-9);
    }

    #[test]
    fn energy_loss_is_capped() {
        let mut path = LaserPath::new();
        for _ in 0..20 {
            path.push(segment((1, 1), (1, 1), Direction::East, MaterialType::Water));
        }
        assert_eq!(path.energy_loss(), 1.0);
    }

    #[test]
    fn segment_cells_walk_from_start_to_end() {
        let s = segment((1, 4), (1, 1), Direction::North, MaterialType::Mirror);
        assert_eq!(
            s.cells(6),
            vec![
                GridPosition::new(1, 4),
                GridPosition::new(1, 3),
                GridPosition::new(1, 2),
                GridPosition::new(1, 1)
            ]
        );
        let reversed = segment((3, 3), (3, 3), Direction::West, MaterialType::Metal);
        assert_eq!(reversed.cells(6), vec![GridPosition::new(3, 3)]);
    }

    #[test]
    fn visited_cells_are_unique_and_ordered() {
        let mut path = LaserPath::new();
        path.push(segment((0, 2), (3, 2), Direction::East, MaterialType::Mirror));
        path.push(segment((3, 2), (3, 0), Direction::North, MaterialType::Empty));
        assert!(path.is_connected());
        assert_eq!(path.visited_cells(1, 6).len(), 4);
        assert_eq!(path.all_cells(6).len(), 6);
        assert_eq!(path.get_first(), Some(GridPosition::new(0, 2)));
    }
}
