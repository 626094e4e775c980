/*
generator.rs

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

//! Generate laser puzzles.
//!
//! A puzzle is a square grid of materials (mirrors, water, glass, metal, and absorbers), an entry
//! cell on the border where a laser beam enters the grid, and the exit cell where the beam leaves
//! it. The player must find the exit.
//!
//! Puzzles are built backward. The [`placement`] module ranks entry/exit pairs, the [`planner`]
//! module plans a route between them, and the [`guaranteed::GuaranteedGenerator`] object places
//! the materials, simulates the beam with the [`physics`] module, and validates the result with
//! the [`validator`] module.
//! If it takes too many attempts or too long to build a puzzle, then a predefined puzzle from the
//! [`fallback`] module is used.

pub mod fallback;
pub mod grid;
pub mod guaranteed;
pub mod hints;
pub mod materials;
pub mod path;
pub mod physics;
pub mod placement;
pub mod planner;
pub mod puzzles;
pub mod recovery;
pub mod validator;
