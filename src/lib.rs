/*
lib.rs

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

//! Laser puzzle generator.
//!
//! Generate grid puzzles where a laser beam crosses materials and leaves the grid through exactly
//! one exit.
//!
//! ```no_run
//! use lightpath::config::GuaranteedGenerationConfig;
//! use lightpath::generator::guaranteed::GuaranteedGenerator;
//! use lightpath::generator::puzzles::Difficulty;
//!
//! let generator = GuaranteedGenerator::new(GuaranteedGenerationConfig::default())?;
//! let result = generator.generate_guaranteed_puzzle(Difficulty::Medium, "2026-10-17");
//! if let Some(puzzle) = result.puzzle {
//!     println!("{puzzle}");
//! }
//! # Ok::<(), lightpath::config::ConfigError>(())
//! ```

pub mod config;
pub mod generator;
pub mod metrics;
