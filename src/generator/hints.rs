/*
hints.rs

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

//! Progressive hints.
//!
//! Each hint reveals a prefix of the solution path. The four levels reveal 25%, 50%, 75%, and
//! 100% of the path segments, so a higher level always shows at least the cells of the lower
//! ones.

use serde::{Deserialize, Serialize};

use super::grid::{GridPosition, Quadrant};
use super::path::LaserPath;

/// Percentage of the solution path revealed by each hint level.
pub const HINT_PERCENTAGES: [u8; 4] = [25, 50, 75, 100];

/// One hint level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    /// Level, from 1 to 4.
    pub level: u8,

    pub percentage: u8,

    /// Number of path segments revealed.
    pub segment_count: usize,

    /// Cells crossed by the revealed segments, in path order.
    pub revealed_cells: Vec<GridPosition>,

    /// Grid quadrants the revealed cells belong to.
    pub quadrants: Vec<Quadrant>,
}

/// Build the four hints for the given solution path.
pub fn build_hints(path: &LaserPath, grid_size: usize) -> Vec<Hint> {
    let total: usize = path.len();
    HINT_PERCENTAGES
        .iter()
        .enumerate()
        .map(|(i, percentage)| {
            let segment_count: usize = (total * *percentage as usize).div_ceil(100);
            let revealed_cells: Vec<GridPosition> = path.visited_cells(segment_count, grid_size);
            let mut quadrants: Vec<Quadrant> = revealed_cells
                .iter()
                .map(|c| c.quadrant(grid_size))
                .collect();
            quadrants.sort();
            quadrants.dedup();
            Hint {
                level: i as u8 + 1,
                percentage: *percentage,
                segment_count,
                revealed_cells,
                quadrants,
            }
        })
        .collect()
}
