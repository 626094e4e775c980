/*
puzzles.rs

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

//! Puzzle records handed to the callers.
//!
//! [`Puzzle`] and [`PuzzleGenerationMetadata`] are plain data: they serialize to JSON (camelCase
//! field names) and carry no behavior besides convenience accessors and an ASCII rendering.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::FromRepr;

use super::grid::GridPosition;
use super::hints::Hint;
use super::materials::{Material, MaterialGrid, PlacementError};
use super::path::LaserPath;
use crate::config::ConfigError;

/// Puzzle difficulty level.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    FromRepr,
    Default,
)]
#[repr(u8)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ConfigError::UnknownDifficulty(String::from(s))),
        }
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Next easier level, or None for [`Difficulty::Easy`].
    pub fn easier(self) -> Option<Difficulty> {
        (self as u8).checked_sub(1).and_then(Difficulty::from_repr)
    }
}

/// Generation algorithm that produced the puzzle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationAlgorithm {
    /// Reverse-engineered and validated by the guaranteed generator.
    Guaranteed,

    /// Pre-validated fallback puzzle.
    Legacy,
}

/// Generated puzzle.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub id: String,
    pub difficulty: Difficulty,
    pub grid_size: usize,

    /// Materials on the grid. Empty cells are not listed.
    pub materials: Vec<Material>,

    /// Cell where the beam enters the grid.
    pub entry: GridPosition,

    /// Cell where the beam leaves the grid.
    pub solution: GridPosition,

    pub solution_path: LaserPath,

    /// Progressive hints, always four of them (25%, 50%, 75%, and 100% of the path).
    pub hints: Vec<Hint>,

    pub created_at: DateTime<Utc>,

    /// Fraction of the grid cells holding a material.
    pub material_density: f64,
}

impl Puzzle {
    /// Build the material grid of the puzzle. The entry cell is reserved.
    ///
    /// # Errors
    ///
    /// Return an error if the material list is inconsistent (overlapping materials, material on
    /// the entry cell, or material outside the grid).
    pub fn layout(&self) -> Result<MaterialGrid, PlacementError> {
        let mut grid: MaterialGrid = MaterialGrid::new(self.grid_size);
        grid.reserve(self.entry);
        for m in &self.materials {
            grid.place(*m)?;
        }
        Ok(grid)
    }

    /// Return the material in the given cell, if any.
    pub fn material_at(&self, position: GridPosition) -> Option<&Material> {
        self.materials.iter().find(|m| m.position == position)
    }
}

/// ASCII rendering: `E` is the entry, `O` the exit (unless a material sits on it).
impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} ({}, {}x{}) {} -> {}",
            self.id, self.difficulty, self.grid_size, self.grid_size, self.entry, self.solution
        )?;
        for y in 0..self.grid_size {
            let mut row: String = String::with_capacity(self.grid_size * 2);
            for x in 0..self.grid_size {
                let p: GridPosition = GridPosition::new(x, y);
                let c: char = if p == self.entry {
                    'E'
                } else if let Some(m) = self.material_at(p) {
                    m.symbol()
                } else if p == self.solution {
                    'O'
                } else {
                    '.'
                };
                row.push(c);
                if x + 1 < self.grid_size {
                    row.push(' ');
                }
            }
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Information about how a puzzle was produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleGenerationMetadata {
    /// Identifier of the puzzle. Empty when no puzzle was produced.
    pub puzzle_id: String,

    pub algorithm: GenerationAlgorithm,

    /// Number of generation attempts.
    pub attempts: usize,

    pub generation_time_ms: u64,

    /// Validation confidence of the returned puzzle, from 0 to 100.
    pub confidence_score: f64,

    pub validation_passed: bool,

    /// Distance between the entry and the exit.
    pub spacing_distance: f64,

    /// Complexity score of the solution path.
    pub path_complexity: f64,

    pub material_density_achieved: f64,

    pub fallback_used: bool,

    /// When a Hard puzzle was generated with an easier configuration, the level whose
    /// configuration was used. The puzzle keeps its Hard label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapted_from_difficulty: Option<Difficulty>,
}

/// Result of a generation request.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Always present, unless fallback puzzles are disabled and generation failed.
    pub puzzle: Option<Puzzle>,

    pub metadata: PuzzleGenerationMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parsing() {
        assert_eq!("easy".parse::<Difficulty>().ok(), Some(Difficulty::Easy));
        assert_eq!(" Hard ".parse::<Difficulty>().ok(), Some(Difficulty::Hard));
        assert!(matches!(
            "nightmare".parse::<Difficulty>(),
            Err(ConfigError::UnknownDifficulty(_))
        ));
    }

    #[test]
    fn easier_levels() {
        assert_eq!(Difficulty::Hard.easier(), Some(Difficulty::Medium));
        assert_eq!(Difficulty::Medium.easier(), Some(Difficulty::Easy));
        assert_eq!(Difficulty::Easy.easier(), None);
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let metadata = PuzzleGenerationMetadata {
            puzzle_id: String::from("2026-10-17-hard"),
            algorithm: GenerationAlgorithm::Guaranteed,
            attempts: 4,
            generation_time_ms: 3,
            confidence_score: 100.0,
            validation_passed: true,
            spacing_distance: 9.0,
            path_complexity: 70.0,
            material_density_achieved: 0.25,
            fallback_used: false,
            adapted_from_difficulty: Some(Difficulty::Medium),
        };
        let json = serde_json::to_string(&metadata).expect("serializable");
        assert!(json.contains("\"adaptedFromDifficulty\":\"Medium\""));
        assert!(json.contains("\"algorithm\":\"guaranteed\""));
        assert!(json.contains("\"fallbackUsed\":false"));
    }
}
