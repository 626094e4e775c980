/*
fallback.rs

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

//! Predefined puzzles used when generating a puzzle fails.
//!
//! Each layout is simulated and validated when [`BuiltinFallbacks`] is created. A layout that
//! does not produce its recorded exit, or that has more than one solution, is dropped.
//! A puzzle is only handed out when its grid size and spacing fit the active profile.

use chrono::Utc;
use log::{debug, warn};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

use super::grid::{self, Direction, GridPosition};
use super::hints;
use super::materials::{Material, MaterialGrid, MaterialType};
use super::physics::{BeamPhysics, BeamTrace, ReflectionEngine};
use super::puzzles::{Difficulty, Puzzle};
use super::validator::{SolutionValidator, ValidationResult};
use crate::config::DifficultyProfile;

/// Supplier of pre-validated puzzles.
pub trait FallbackSource {
    /// Return a puzzle for the given difficulty that fits `profile`, picked with `rng`.
    fn fallback<R: Rng>(
        &self,
        difficulty: Difficulty,
        profile: &DifficultyProfile,
        rng: &mut R,
    ) -> Option<Puzzle>;
}

/// Whether the puzzle has the grid size of the profile and respects its minimum spacing.
pub fn fits_profile(puzzle: &Puzzle, profile: &DifficultyProfile) -> bool {
    puzzle.grid_size == profile.grid_size
        && grid::spacing_distance(puzzle.entry, puzzle.solution) >= profile.spacing.min_distance
}

/// Hand-made layout: entry, recorded exit, and materials as `(x, y, type, mirror angle)`.
struct FallbackLayout {
    grid_size: usize,
    entry: (usize, usize),
    exit: (usize, usize),
    materials: &'static [(usize, usize, MaterialType, u16)],
}

const EASY_LAYOUTS: [FallbackLayout; 2] = [
    FallbackLayout {
        grid_size: 6,
        entry: (0, 1),
        exit: (3, 5),
        materials: &[
            (3, 1, MaterialType::Mirror, 135),
            (1, 4, MaterialType::Water, 0),
            (5, 3, MaterialType::Glass, 0),
            (0, 5, MaterialType::Metal, 0),
            (4, 4, MaterialType::Mirror, 45),
        ],
    },
    FallbackLayout {
        grid_size: 6,
        entry: (2, 0),
        exit: (4, 5),
        materials: &[
            (2, 3, MaterialType::Mirror, 135),
            (4, 3, MaterialType::Mirror, 135),
            (0, 0, MaterialType::Water, 0),
            (1, 5, MaterialType::Metal, 0),
            (5, 1, MaterialType::Mirror, 90),
            (0, 4, MaterialType::Absorber, 0),
        ],
    },
];

const MEDIUM_LAYOUTS: [FallbackLayout; 2] = [
    FallbackLayout {
        grid_size: 8,
        entry: (0, 6),
        exit: (7, 2),
        materials: &[
            (5, 6, MaterialType::Mirror, 45),
            (5, 2, MaterialType::Mirror, 45),
            (2, 2, MaterialType::Glass, 0),
            (6, 5, MaterialType::Water, 0),
            (1, 1, MaterialType::Absorber, 0),
            (3, 4, MaterialType::Metal, 0),
            (7, 7, MaterialType::Mirror, 135),
        ],
    },
    FallbackLayout {
        grid_size: 8,
        entry: (3, 7),
        exit: (1, 0),
        materials: &[
            (3, 4, MaterialType::Mirror, 135),
            (1, 4, MaterialType::Mirror, 135),
            (5, 5, MaterialType::Water, 0),
            (6, 1, MaterialType::Glass, 0),
            (4, 2, MaterialType::Absorber, 0),
            (6, 6, MaterialType::Metal, 0),
            (0, 7, MaterialType::Mirror, 45),
        ],
    },
];

const HARD_LAYOUTS: [FallbackLayout; 2] = [
    FallbackLayout {
        grid_size: 10,
        entry: (0, 2),
        exit: (3, 9),
        materials: &[
            (6, 2, MaterialType::Mirror, 135),
            (6, 7, MaterialType::Mirror, 45),
            (3, 7, MaterialType::Mirror, 45),
            (8, 8, MaterialType::Water, 0),
            (1, 5, MaterialType::Glass, 0),
            (9, 0, MaterialType::Absorber, 0),
            (8, 4, MaterialType::Metal, 0),
            (4, 4, MaterialType::Mirror, 90),
            (5, 0, MaterialType::Water, 0),
        ],
    },
    FallbackLayout {
        grid_size: 10,
        entry: (9, 5),
        exit: (7, 0),
        materials: &[
            (4, 5, MaterialType::Mirror, 45),
            (4, 8, MaterialType::Mirror, 135),
            (7, 8, MaterialType::Mirror, 45),
            (1, 1, MaterialType::Glass, 0),
            (2, 8, MaterialType::Water, 0),
            (0, 9, MaterialType::Absorber, 0),
            (1, 4, MaterialType::Metal, 0),
            (9, 9, MaterialType::Mirror, 135),
            (5, 2, MaterialType::Water, 0),
        ],
    },
];

fn layouts(difficulty: Difficulty) -> &'static [FallbackLayout] {
    match difficulty {
        Difficulty::Easy => &EASY_LAYOUTS,
        Difficulty::Medium => &MEDIUM_LAYOUTS,
        Difficulty::Hard => &HARD_LAYOUTS,
    }
}

/// Simulate and validate a layout. Return None if the layout is not a valid puzzle.
fn build_puzzle<P: BeamPhysics>(
    physics: &P,
    difficulty: Difficulty,
    index: usize,
    layout: &FallbackLayout,
) -> Option<Puzzle> {
    let entry: GridPosition = GridPosition::new(layout.entry.0, layout.entry.1);
    let exit: GridPosition = GridPosition::new(layout.exit.0, layout.exit.1);
    let materials: Vec<Material> = layout
        .materials
        .iter()
        .map(|(x, y, t, angle)| {
            let position: GridPosition = GridPosition::new(*x, *y);
            match t {
                MaterialType::Mirror => Material::mirror(position, *angle),
                _ => Material::new(*t, position),
            }
        })
        .collect();

    let mut material_grid: MaterialGrid = MaterialGrid::new(layout.grid_size);
    material_grid.reserve(entry);
    for m in &materials {
        if let Err(e) = material_grid.place(*m) {
            warn!("Fallback {difficulty} #{index}: {e:?}");
            return None;
        }
    }

    let direction: Direction = entry.inward_direction(layout.grid_size);
    let mut rng: StdRng = StdRng::seed_from_u64(index as u64);
    let trace: BeamTrace = physics.trace(&material_grid, entry, direction, &mut rng);
    if trace.exit() != Some(exit) {
        warn!(
            "Fallback {difficulty} #{index}: the beam ends with {:?} instead of leaving at {exit}",
            trace.end
        );
        return None;
    }

    let puzzle: Puzzle = Puzzle {
        id: format!("fallback-{}-{}", difficulty.to_string().to_lowercase(), index + 1),
        difficulty,
        grid_size: layout.grid_size,
        materials: material_grid.materials(),
        entry,
        solution: exit,
        hints: hints::build_hints(&trace.path, layout.grid_size),
        solution_path: trace.path,
        created_at: Utc::now(),
        material_density: material_grid.density(),
    };

    let result: ValidationResult = SolutionValidator::new(physics).verify_unique_solution(&puzzle);
    if !result.is_valid {
        warn!("Fallback {difficulty} #{index}: {:?}", result.issues);
        return None;
    }
    debug!(
        "Fallback {difficulty} #{index}: {entry} -> {exit}, distance {}",
        grid::spacing_distance(entry, exit)
    );
    Some(puzzle)
}

/// Fallback puzzles shipped with the library.
#[derive(Debug, Clone)]
pub struct BuiltinFallbacks {
    puzzles: HashMap<Difficulty, Vec<Puzzle>>,
}

impl Default for BuiltinFallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinFallbacks {
    /// Build the puzzles with the default physics engine.
    pub fn new() -> Self {
        Self::with_physics(&ReflectionEngine)
    }

    /// Build the puzzles with the given physics engine.
    pub fn with_physics<P: BeamPhysics>(physics: &P) -> Self {
        let mut puzzles: HashMap<Difficulty, Vec<Puzzle>> = HashMap::new();
        for difficulty in Difficulty::ALL {
            let list: Vec<Puzzle> = layouts(difficulty)
                .iter()
                .enumerate()
                .filter_map(|(i, l)| build_puzzle(physics, difficulty, i, l))
                .collect();
            puzzles.insert(difficulty, list);
        }
        Self { puzzles }
    }

    /// Number of available puzzles for the given difficulty.
    pub fn len(&self, difficulty: Difficulty) -> usize {
        self.puzzles.get(&difficulty).map_or(0, |l| l.len())
    }
}

impl FallbackSource for BuiltinFallbacks {
    fn fallback<R: Rng>(
        &self,
        difficulty: Difficulty,
        profile: &DifficultyProfile,
        rng: &mut R,
    ) -> Option<Puzzle> {
        let list: Vec<&Puzzle> = self
            .puzzles
            .get(&difficulty)?
            .iter()
            .filter(|p| fits_profile(p, profile))
            .collect();
        if list.is_empty() {
            debug!(
                "No {difficulty} fallback puzzle for a {0}x{0} grid",
                profile.grid_size
            );
            return None;
        }
        let mut puzzle: Puzzle = list[rng.random_range(0..list.len())].clone();
        puzzle.created_at = Utc::now();
        Some(puzzle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuaranteedGenerationConfig;

    #[test]
    fn every_layout_is_valid() {
        let fallbacks = BuiltinFallbacks::new();
        for difficulty in Difficulty::ALL {
            assert_eq!(fallbacks.len(difficulty), 2, "{difficulty}");
        }
    }

    #[test]
    fn fallbacks_respect_the_difficulty_profile() {
        let config = GuaranteedGenerationConfig::default();
        let fallbacks = BuiltinFallbacks::new();
        let mut rng = StdRng::seed_from_u64(3);
        for difficulty in Difficulty::ALL {
            let profile = config.profile(difficulty);
            for _ in 0..10 {
                let puzzle = fallbacks
                    .fallback(difficulty, profile, &mut rng)
                    .expect("puzzle");
                assert_eq!(puzzle.difficulty, difficulty);
                assert_eq!(puzzle.grid_size, profile.grid_size);
                assert_ne!(puzzle.entry, puzzle.solution);
                assert!(
                    grid::spacing_distance(puzzle.entry, puzzle.solution)
                        >= profile.spacing.min_distance
                );
                assert_eq!(puzzle.hints.len(), 4);
                assert_eq!(puzzle.solution_path.exit, Some(puzzle.solution));
            }
        }
    }

    #[test]
    fn fallback_solution_is_unique() {
        let fallbacks = BuiltinFallbacks::new();
        let mut rng = StdRng::seed_from_u64(5);
        let config = GuaranteedGenerationConfig::default();
        let puzzle = fallbacks
            .fallback(Difficulty::Hard, config.profile(Difficulty::Hard), &mut rng)
            .expect("puzzle");
        let result = SolutionValidator::new(&ReflectionEngine).verify_unique_solution(&puzzle);
        assert!(result.has_unique_solution);
        assert_eq!(result.alternative_count, 0);
    }

    #[test]
    fn layouts_for_another_grid_size_are_not_used() {
        let mut config = GuaranteedGenerationConfig::default();
        config.profile_mut(Difficulty::Easy).grid_size = 7;
        config.profile_mut(Difficulty::Medium).spacing.min_distance = 20.0;
        let fallbacks = BuiltinFallbacks::new();
        let mut rng = StdRng::seed_from_u64(8);
        assert!(fallbacks
            .fallback(Difficulty::Easy, config.profile(Difficulty::Easy), &mut rng)
            .is_none());
        assert!(fallbacks
            .fallback(Difficulty::Medium, config.profile(Difficulty::Medium), &mut rng)
            .is_none());
        assert!(fallbacks
            .fallback(Difficulty::Hard, config.profile(Difficulty::Hard), &mut rng)
            .is_some());
    }
}
