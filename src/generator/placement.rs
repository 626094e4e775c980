/*
placement.rs

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

//! Select entry and exit points.
//!
//! Every perimeter cell is a candidate for both the entry and the exit. Pairs that are too close
//! are discarded, the others are scored and ranked, best first.

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::grid::{self, GridPosition};
use super::puzzles::Difficulty;
use crate::config::SpacingConstraints;

/// How the pair uses the grid corners.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    /// Both points are corners.
    Corner,

    /// Neither point is a corner.
    Edge,

    /// Exactly one point is a corner.
    Optimal,
}

/// Candidate entry and exit.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitPair {
    pub entry: GridPosition,
    pub exit: GridPosition,
    pub distance: f64,
    pub difficulty: Difficulty,
    pub validation_score: f64,
    pub placement_type: PlacementType,
}

/// Return whether the two points are far enough apart for the given constraints.
pub fn meets_spacing(
    entry: GridPosition,
    exit: GridPosition,
    constraints: &SpacingConstraints,
) -> bool {
    entry != exit && grid::spacing_distance(entry, exit) >= constraints.min_distance
}

/// Score a pair. Higher is better.
pub fn score_pair(
    entry: GridPosition,
    exit: GridPosition,
    grid_size: usize,
    constraints: &SpacingConstraints,
) -> (f64, PlacementType) {
    let distance: f64 = grid::spacing_distance(entry, exit);
    let proximity: f64 = 100.0 - (distance - constraints.preferred_distance).abs() * 10.0;
    match (entry.is_corner(grid_size), exit.is_corner(grid_size)) {
        (true, true) => (proximity + constraints.corner_bonus, PlacementType::Corner),
        (true, false) | (false, true) => {
            (proximity + constraints.edge_bonus, PlacementType::Optimal)
        }
        (false, false) => (proximity, PlacementType::Edge),
    }
}

/// Build the ranked list of entry and exit pairs.
///
/// Pairs with the same score are ordered randomly, so that different seeds produce different
/// puzzles. The list holds at most [`SpacingConstraints::max_search_attempts`] pairs.
pub fn rank_candidates<R: Rng>(
    grid_size: usize,
    difficulty: Difficulty,
    constraints: &SpacingConstraints,
    rng: &mut R,
) -> Vec<EntryExitPair> {
    let cells: Vec<GridPosition> = grid::perimeter_cells(grid_size);
    let mut pairs: Vec<EntryExitPair> = Vec::with_capacity(cells.len() * cells.len());

    for entry in &cells {
        for exit in &cells {
            if !meets_spacing(*entry, *exit, constraints) {
                continue;
            }
            let (score, placement_type) = score_pair(*entry, *exit, grid_size, constraints);
            pairs.push(EntryExitPair {
                entry: *entry,
                exit: *exit,
                distance: grid::spacing_distance(*entry, *exit),
                difficulty,
                validation_score: score,
                placement_type,
            });
        }
    }

    pairs.shuffle(rng);
    pairs.sort_by(|a, b| b.validation_score.total_cmp(&a.validation_score));
    pairs.truncate(constraints.max_search_attempts);
    debug!(
        "{} entry/exit candidates for a {grid_size}x{grid_size} grid (min distance {})",
        pairs.len(),
        constraints.min_distance
    );
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuaranteedGenerationConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn easy_spacing() -> SpacingConstraints {
        GuaranteedGenerationConfig::default()
            .profile(Difficulty::Easy)
            .spacing
            .clone()
    }

    #[test]
    fn easy_minimum_distance_is_three() {
        let spacing = easy_spacing();
        let entry = GridPosition::new(0, 0);
        assert!(meets_spacing(entry, GridPosition::new(3, 0), &spacing));
        assert!(!meets_spacing(entry, GridPosition::new(2, 0), &spacing));
        assert!(!meets_spacing(entry, entry, &spacing));
    }

    #[test]
    fn corners_are_classified() {
        let spacing = easy_spacing();
        let (_, t) = score_pair(GridPosition::new(0, 0), GridPosition::new(5, 5), 6, &spacing);
        assert_eq!(t, PlacementType::Corner);
        let (_, t) = score_pair(GridPosition::new(0, 0), GridPosition::new(3, 5), 6, &spacing);
        assert_eq!(t, PlacementType::Optimal);
        let (_, t) = score_pair(GridPosition::new(0, 2), GridPosition::new(3, 5), 6, &spacing);
        assert_eq!(t, PlacementType::Edge);
    }

    #[test]
    fn preferred_distance_scores_higher() {
        let spacing = easy_spacing();
        let entry = GridPosition::new(0, 2);
        let at_preferred = GridPosition::new(3, 0);
        let too_far = GridPosition::new(5, 5);
        assert_eq!(
            grid::spacing_distance(entry, at_preferred),
            spacing.preferred_distance
        );
        let (near, _) = score_pair(entry, at_preferred, 6, &spacing);
        let (far, _) = score_pair(entry, too_far, 6, &spacing);
        assert!(near > far);
    }

    #[test]
    fn ranking_is_sorted_capped_and_spaced() {
        let spacing = easy_spacing();
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = rank_candidates(6, Difficulty::Easy, &spacing, &mut rng);
        assert!(!pairs.is_empty());
        assert!(pairs.len() <= spacing.max_search_attempts);
        for w in pairs.windows(2) {
            assert!(w[0].validation_score >= w[1].validation_score);
        }
        for p in &pairs {
            assert_ne!(p.entry, p.exit);
            assert!(p.distance >= spacing.min_distance);
            assert!(p.entry.is_on_boundary(6) && p.exit.is_on_boundary(6));
        }
    }

    #[test]
    fn impossible_spacing_gives_no_candidate() {
        let mut spacing = easy_spacing();
        spacing.min_distance = 50.0;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(rank_candidates(6, Difficulty::Easy, &spacing, &mut rng).is_empty());
    }
}
