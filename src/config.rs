/*
config.rs

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

//! Generation parameters.
//!
//! [`GuaranteedGenerationConfig`] groups the global limits (attempts, timeout, fallback) and one
//! [`DifficultyProfile`] per difficulty level. The configuration can be loaded from a JSON file;
//! missing fields take their default values.
//!
//! Unlike generation problems, which the generator always recovers from, configuration problems
//! are programming errors and are reported immediately through [`ConfigError`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

use crate::generator::materials::{MaterialType, MaterialWeights};
use crate::generator::puzzles::Difficulty;

/// Smallest grid the generator accepts.
pub const MIN_GRID_SIZE: usize = 3;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown difficulty {0:?} (expected easy, medium, or hard)")]
    UnknownDifficulty(String),

    #[error("cannot read the configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse the configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Distance rules between the entry and the exit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpacingConstraints {
    /// Pairs closer than this distance are rejected.
    pub min_distance: f64,

    /// Pairs at this distance get the best proximity score.
    pub preferred_distance: f64,

    /// Score bonus when both points are corners.
    pub corner_bonus: f64,

    /// Score bonus when exactly one point is a corner.
    pub edge_bonus: f64,

    /// Maximum number of ranked candidate pairs.
    pub max_search_attempts: usize,
}

/// Relative weights of the filler materials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialWeightTable {
    pub mirror: f64,
    pub water: f64,
    pub glass: f64,
    pub metal: f64,
    pub absorber: f64,
}

impl MaterialWeightTable {
    /// Return the table as `(type, weight)` pairs.
    pub fn entries(&self) -> [(MaterialType, f64); 5] {
        [
            (MaterialType::Mirror, self.mirror),
            (MaterialType::Water, self.water),
            (MaterialType::Glass, self.glass),
            (MaterialType::Metal, self.metal),
            (MaterialType::Absorber, self.absorber),
        ]
    }

    /// Build the weighted choice table. None if no weight is positive.
    pub fn to_weights(&self) -> Option<MaterialWeights> {
        MaterialWeights::new(&self.entries())
    }
}

/// Filler materials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialConfig {
    /// Target fraction of the grid cells holding a material.
    pub density: f64,

    pub weights: MaterialWeightTable,
}

/// Number of reflections in the solution path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityConfig {
    pub min_reflections: usize,
    pub max_reflections: usize,
    pub preferred_reflections: usize,
}

/// Parameters for one difficulty level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyProfile {
    pub grid_size: usize,
    pub spacing: SpacingConstraints,
    pub materials: MaterialConfig,
    pub complexity: ComplexityConfig,

    /// Minimum validation confidence (0 to 100) for a generated puzzle to be accepted.
    pub confidence_threshold: f64,
}

impl DifficultyProfile {
    /// Built-in parameters for the given difficulty.
    pub fn builtin(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                grid_size: 6,
                spacing: SpacingConstraints {
                    min_distance: 3.0,
                    preferred_distance: 5.0,
                    corner_bonus: 5.0,
                    edge_bonus: 8.0,
                    max_search_attempts: 50,
                },
                materials: MaterialConfig {
                    density: 0.15,
                    weights: MaterialWeightTable {
                        mirror: 0.4,
                        water: 0.2,
                        glass: 0.2,
                        metal: 0.1,
                        absorber: 0.1,
                    },
                },
                complexity: ComplexityConfig {
                    min_reflections: 1,
                    max_reflections: 3,
                    preferred_reflections: 2,
                },
                confidence_threshold: 80.0,
            },
            Difficulty::Medium => Self {
                grid_size: 8,
                spacing: SpacingConstraints {
                    min_distance: 4.0,
                    preferred_distance: 7.0,
                    corner_bonus: 5.0,
                    edge_bonus: 8.0,
                    max_search_attempts: 80,
                },
                materials: MaterialConfig {
                    density: 0.2,
                    weights: MaterialWeightTable {
                        mirror: 0.35,
                        water: 0.2,
                        glass: 0.2,
                        metal: 0.15,
                        absorber: 0.1,
                    },
                },
                complexity: ComplexityConfig {
                    min_reflections: 2,
                    max_reflections: 4,
                    preferred_reflections: 3,
                },
                confidence_threshold: 80.0,
            },
            Difficulty::Hard => Self {
                grid_size: 10,
                spacing: SpacingConstraints {
                    min_distance: 5.0,
                    preferred_distance: 9.0,
                    corner_bonus: 5.0,
                    edge_bonus: 8.0,
                    max_search_attempts: 120,
                },
                materials: MaterialConfig {
                    density: 0.25,
                    weights: MaterialWeightTable {
                        mirror: 0.3,
                        water: 0.2,
                        glass: 0.2,
                        metal: 0.15,
                        absorber: 0.15,
                    },
                },
                complexity: ComplexityConfig {
                    min_reflections: 3,
                    max_reflections: 6,
                    preferred_reflections: 4,
                },
                confidence_threshold: 80.0,
            },
        }
    }

    /// Verify the profile. `name` prefixes the field names in error messages.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.grid_size < MIN_GRID_SIZE {
            return Err(invalid(
                format!("{name}.gridSize"),
                format!("must be at least {MIN_GRID_SIZE}"),
            ));
        }

        let s: &SpacingConstraints = &self.spacing;
        if !s.min_distance.is_finite() || s.min_distance < 1.0 {
            return Err(invalid(
                format!("{name}.spacing.minDistance"),
                "must be at least 1",
            ));
        }
        if !s.preferred_distance.is_finite() || s.preferred_distance < s.min_distance {
            return Err(invalid(
                format!("{name}.spacing.preferredDistance"),
                "must not be smaller than minDistance",
            ));
        }
        if !s.corner_bonus.is_finite() || !s.edge_bonus.is_finite() {
            return Err(invalid(
                format!("{name}.spacing"),
                "bonuses must be finite numbers",
            ));
        }
        if s.max_search_attempts == 0 {
            return Err(invalid(
                format!("{name}.spacing.maxSearchAttempts"),
                "must be positive",
            ));
        }

        let m: &MaterialConfig = &self.materials;
        if !(0.0..1.0).contains(&m.density) {
            return Err(invalid(
                format!("{name}.materials.density"),
                "must be in the [0, 1) range",
            ));
        }
        if m
            .weights
            .entries()
            .iter()
            .any(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(invalid(
                format!("{name}.materials.weights"),
                "weights must be non-negative numbers",
            ));
        }
        if m.weights.to_weights().is_none() {
            return Err(invalid(
                format!("{name}.materials.weights"),
                "at least one weight must be positive",
            ));
        }

        let c: &ComplexityConfig = &self.complexity;
        if c.min_reflections > c.max_reflections {
            return Err(invalid(
                format!("{name}.complexity"),
                "minReflections must not exceed maxReflections",
            ));
        }
        if c.preferred_reflections < c.min_reflections
            || c.preferred_reflections > c.max_reflections
        {
            return Err(invalid(
                format!("{name}.complexity.preferredReflections"),
                "must be between minReflections and maxReflections",
            ));
        }

        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err(invalid(
                format!("{name}.confidenceThreshold"),
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// One profile per difficulty level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DifficultyProfiles {
    pub easy: DifficultyProfile,
    pub medium: DifficultyProfile,
    pub hard: DifficultyProfile,
}

impl Default for DifficultyProfiles {
    fn default() -> Self {
        Self {
            easy: DifficultyProfile::builtin(Difficulty::Easy),
            medium: DifficultyProfile::builtin(Difficulty::Medium),
            hard: DifficultyProfile::builtin(Difficulty::Hard),
        }
    }
}

/// Generation parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GuaranteedGenerationConfig {
    /// Maximum number of generation attempts before using a fallback puzzle.
    pub max_attempts: usize,

    /// Wall-clock budget for all the attempts, in milliseconds.
    pub timeout_ms: u64,

    /// Whether a fallback puzzle can be returned when generation fails.
    pub enable_fallback: bool,

    /// Number of consecutive failures at one configuration level before a Hard puzzle is
    /// generated with the next easier configuration.
    pub adapt_after_failures: usize,

    pub profiles: DifficultyProfiles,
}

impl Default for GuaranteedGenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            timeout_ms: 5_000,
            enable_fallback: true,
            adapt_after_failures: 3,
            profiles: DifficultyProfiles::default(),
        }
    }
}

impl GuaranteedGenerationConfig {
    /// Return the profile for the given difficulty.
    pub fn profile(&self, difficulty: Difficulty) -> &DifficultyProfile {
        match difficulty {
            Difficulty::Easy => &self.profiles.easy,
            Difficulty::Medium => &self.profiles.medium,
            Difficulty::Hard => &self.profiles.hard,
        }
    }

    /// Return a mutable reference to the profile for the given difficulty.
    pub fn profile_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyProfile {
        match difficulty {
            Difficulty::Easy => &mut self.profiles.easy,
            Difficulty::Medium => &mut self.profiles.medium,
            Difficulty::Hard => &mut self.profiles.hard,
        }
    }

    /// Verify all the parameters.
    ///
    /// # Errors
    ///
    /// Return the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("maxAttempts", "must be positive"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeoutMs", "must be positive"));
        }
        if self.adapt_after_failures == 0 {
            return Err(invalid("adaptAfterFailures", "must be positive"));
        }
        for difficulty in Difficulty::ALL {
            self.profile(difficulty)
                .validate(&difficulty.to_string().to_lowercase())?;
        }
        Ok(())
    }

    /// Parse and verify a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GuaranteedGenerationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and verify a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {:?}", path.as_ref());
        let file: File = File::open(path)?;
        let reader: BufReader<File> = BufReader::new(file);
        let config: GuaranteedGenerationConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
