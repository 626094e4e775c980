/*
grid.rs

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

//! Grid positions, beam directions, and the geometry helpers used by every other module.
//!
//! The grid is square. `x` grows to the right and `y` grows downward, so the top row is `y = 0`.
//! Angles are expressed in degrees, counter-clockwise from east, the way they appear on screen:
//! [`Direction::North`] is 90° and moves the beam toward `y = 0`.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::FromRepr;

/// Cell coordinates in the grid.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// The eight compass directions a beam can travel in.
///
/// The discriminant multiplied by 45 gives the direction angle in degrees.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    East = 0,
    NorthEast = 1,
    North = 2,
    NorthWest = 3,
    West = 4,
    SouthWest = 5,
    South = 6,
    SouthEast = 7,
}

impl Direction {
    /// All the directions, counter-clockwise from east.
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::NorthEast,
        Direction::North,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    /// Step vector `(dx, dy)` for one move in this direction.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::East => (1, 0),
            Direction::NorthEast => (1, -1),
            Direction::North => (0, -1),
            Direction::NorthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::SouthWest => (-1, 1),
            Direction::South => (0, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    /// Angle of the direction in degrees, in the `0..360` range.
    pub fn degrees(self) -> i32 {
        self as i32 * 45
    }

    /// Return the direction closest to the given angle. Any angle is accepted.
    pub fn from_degrees(degrees: i32) -> Direction {
        let normalized: i32 = degrees.rem_euclid(360);
        let index: i32 = ((normalized + 22) / 45) % 8;
        Direction::from_repr(index as u8).unwrap_or(Direction::East)
    }

    /// Rotate counter-clockwise by `steps` times 45°. Negative values rotate clockwise.
    pub fn rotate(self, steps: i32) -> Direction {
        Direction::from_degrees(self.degrees() + steps * 45)
    }

    /// Direction rotated by 180°.
    pub fn opposite(self) -> Direction {
        self.rotate(4)
    }

    pub fn is_diagonal(self) -> bool {
        (self as u8) % 2 == 1
    }
}

/// Grid edge a beam leaves through.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// One of the four grid regions, split at the grid midpoint.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl GridPosition {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Position one step away in the given direction, or None when the step leaves the grid.
    pub fn step(self, direction: Direction, grid_size: usize) -> Option<GridPosition> {
        let (dx, dy) = direction.delta();
        let x: isize = self.x as isize + dx;
        let y: isize = self.y as isize + dy;
        if is_in_bounds(x, y, grid_size) {
            Some(GridPosition::new(x as usize, y as usize))
        } else {
            None
        }
    }

    /// Edge crossed when stepping from this position in the given direction, or None if the
    /// step stays inside the grid.
    ///
    /// For a diagonal step through a corner, the horizontal edge (left or right) wins.
    pub fn exit_edge(self, direction: Direction, grid_size: usize) -> Option<Edge> {
        let (dx, dy) = direction.delta();
        let x: isize = self.x as isize + dx;
        let y: isize = self.y as isize + dy;
        if x < 0 {
            Some(Edge::Left)
        } else if x >= grid_size as isize {
            Some(Edge::Right)
        } else if y < 0 {
            Some(Edge::Top)
        } else if y >= grid_size as isize {
            Some(Edge::Bottom)
        } else {
            None
        }
    }

    /// Whether the position is on the grid perimeter.
    pub fn is_on_boundary(self, grid_size: usize) -> bool {
        self.x == 0 || self.y == 0 || self.x + 1 == grid_size || self.y + 1 == grid_size
    }

    /// Whether the position is one of the four grid corners.
    pub fn is_corner(self, grid_size: usize) -> bool {
        (self.x == 0 || self.x + 1 == grid_size) && (self.y == 0 || self.y + 1 == grid_size)
    }

    /// Edges the position touches. Corners touch two edges, other perimeter cells one, and
    /// interior cells none.
    pub fn edges(self, grid_size: usize) -> Vec<Edge> {
        let mut edges: Vec<Edge> = Vec::with_capacity(2);
        if self.x == 0 {
            edges.push(Edge::Left);
        }
        if self.x + 1 == grid_size {
            edges.push(Edge::Right);
        }
        if self.y == 0 {
            edges.push(Edge::Top);
        }
        if self.y + 1 == grid_size {
            edges.push(Edge::Bottom);
        }
        edges
    }

    /// Direction a beam entering the grid at this perimeter cell travels in.
    ///
    /// Left and right edges take precedence over top and bottom, so corners shoot horizontally.
    /// Interior cells default to east.
    pub fn inward_direction(self, grid_size: usize) -> Direction {
        if self.x == 0 {
            Direction::East
        } else if self.x + 1 == grid_size {
            Direction::West
        } else if self.y == 0 {
            Direction::South
        } else if self.y + 1 == grid_size {
            Direction::North
        } else {
            Direction::East
        }
    }

    /// Quadrant the position belongs to.
    pub fn quadrant(self, grid_size: usize) -> Quadrant {
        let mid: usize = grid_size / 2;
        match (self.x < mid, self.y < mid) {
            (true, true) => Quadrant::TopLeft,
            (false, true) => Quadrant::TopRight,
            (true, false) => Quadrant::BottomLeft,
            (false, false) => Quadrant::BottomRight,
        }
    }

    /// The up to four orthogonal neighbors inside the grid.
    pub fn neighbors4(self, grid_size: usize) -> Vec<GridPosition> {
        [
            Direction::East,
            Direction::North,
            Direction::West,
            Direction::South,
        ]
        .iter()
        .filter_map(|d| self.step(*d, grid_size))
        .collect()
    }

    /// The up to eight orthogonal and diagonal neighbors inside the grid.
    pub fn neighbors8(self, grid_size: usize) -> Vec<GridPosition> {
        Direction::ALL
            .iter()
            .filter_map(|d| self.step(*d, grid_size))
            .collect()
    }
}

/// Whether signed coordinates are inside a grid of the given size.
pub fn is_in_bounds(x: isize, y: isize, grid_size: usize) -> bool {
    x >= 0 && y >= 0 && (x as usize) < grid_size && (y as usize) < grid_size
}

pub fn manhattan_distance(a: GridPosition, b: GridPosition) -> usize {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

pub fn euclidean_distance(a: GridPosition, b: GridPosition) -> f64 {
    let dx: f64 = a.x.abs_diff(b.x) as f64;
    let dy: f64 = a.y.abs_diff(b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Spacing distance between an entry and an exit: the larger of the Manhattan and Euclidean
/// distances.
pub fn spacing_distance(a: GridPosition, b: GridPosition) -> f64 {
    (manhattan_distance(a, b) as f64).max(euclidean_distance(a, b))
}

/// All the perimeter cells, clockwise from the top-left corner. Each cell appears once.
pub fn perimeter_cells(grid_size: usize) -> Vec<GridPosition> {
    if grid_size == 0 {
        return Vec::new();
    }
    if grid_size == 1 {
        return vec![GridPosition::new(0, 0)];
    }
    let last: usize = grid_size - 1;
    let mut cells: Vec<GridPosition> = Vec::with_capacity(4 * last);
    for x in 0..last {
        cells.push(GridPosition::new(x, 0));
    }
    for y in 0..last {
        cells.push(GridPosition::new(last, y));
    }
    for x in (1..=last).rev() {
        cells.push(GridPosition::new(x, last));
    }
    for y in (1..=last).rev() {
        cells.push(GridPosition::new(0, y));
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stays_inside_or_reports_none() {
        let p = GridPosition::new(0, 0);
        assert_eq!(p.step(Direction::East, 6), Some(GridPosition::new(1, 0)));
        assert_eq!(p.step(Direction::North, 6), None);
        assert_eq!(p.step(Direction::SouthEast, 6), Some(GridPosition::new(1, 1)));
        assert_eq!(GridPosition::new(5, 5).step(Direction::South, 6), None);
    }

    #[test]
    fn exit_edges() {
        assert_eq!(
            GridPosition::new(3, 0).exit_edge(Direction::North, 6),
            Some(Edge::Top)
        );
        assert_eq!(
            GridPosition::new(5, 2).exit_edge(Direction::East, 6),
            Some(Edge::Right)
        );
        assert_eq!(
            GridPosition::new(0, 5).exit_edge(Direction::SouthWest, 6),
            Some(Edge::Left)
        );
        assert_eq!(GridPosition::new(2, 2).exit_edge(Direction::South, 6), None);
    }

    #[test]
    fn direction_angles_round_trip_through_rotation() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_degrees(d.degrees()), d);
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.rotate(8), d);
        }
        assert_eq!(Direction::from_degrees(-90), Direction::South);
        assert_eq!(Direction::from_degrees(450), Direction::North);
        assert_eq!(Direction::East.rotate(-2), Direction::South);
        assert!(Direction::NorthWest.is_diagonal());
        assert!(!Direction::West.is_diagonal());
    }

    #[test]
    fn distances() {
        let a = GridPosition::new(0, 0);
        let b = GridPosition::new(3, 4);
        assert_eq!(manhattan_distance(a, b), 7);
        assert!((euclidean_distance(a, b) - 5.0).abs() < 1e-9);
        assert!((spacing_distance(a, b) - 7.0).abs() < 1e-9);
        assert!((spacing_distance(a, GridPosition::new(3, 0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn boundary_and_corners() {
        assert!(GridPosition::new(0, 3).is_on_boundary(6));
        assert!(GridPosition::new(5, 5).is_corner(6));
        assert!(!GridPosition::new(2, 2).is_on_boundary(6));
        assert_eq!(GridPosition::new(0, 0).edges(6), vec![Edge::Left, Edge::Top]);
        assert!(GridPosition::new(3, 3).edges(6).is_empty());
    }

    #[test]
    fn inward_directions() {
        assert_eq!(GridPosition::new(0, 0).inward_direction(6), Direction::East);
        assert_eq!(GridPosition::new(5, 0).inward_direction(6), Direction::West);
        assert_eq!(GridPosition::new(2, 0).inward_direction(6), Direction::South);
        assert_eq!(GridPosition::new(2, 5).inward_direction(6), Direction::North);
    }

    #[test]
    fn perimeter_has_unique_boundary_cells() {
        for size in 2..12 {
            let cells = perimeter_cells(size);
            assert_eq!(cells.len(), 4 * (size - 1));
            let mut sorted = cells.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), cells.len());
            assert!(cells.iter().all(|c| c.is_on_boundary(size)));
        }
    }

    #[test]
    fn neighbors_and_quadrants() {
        assert_eq!(GridPosition::new(0, 0).neighbors4(6).len(), 2);
        assert_eq!(GridPosition::new(0, 0).neighbors8(6).len(), 3);
        assert_eq!(GridPosition::new(2, 2).neighbors8(6).len(), 8);
        assert_eq!(GridPosition::new(1, 1).quadrant(6), Quadrant::TopLeft);
        assert_eq!(GridPosition::new(3, 1).quadrant(6), Quadrant::TopRight);
        assert_eq!(GridPosition::new(1, 4).quadrant(6), Quadrant::BottomLeft);
        assert_eq!(GridPosition::new(5, 5).quadrant(6), Quadrant::BottomRight);
    }
}
