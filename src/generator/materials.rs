/*
materials.rs

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

//! Materials placed on the grid, and the grid that holds them.

use log::debug;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};
use strum_macros::FromRepr;

use super::grid::GridPosition;

/// Mirror angles the generator may pick for filler mirrors, in degrees.
pub const MIRROR_ANGLES: [u16; 4] = [0, 45, 90, 135];

/// Angle used when glass reflects the beam instead of letting it through.
pub const GLASS_REFLECTION_ANGLE: u16 = 45;

/// Kind of material.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MaterialType {
    Empty,
    Mirror,
    Water,
    Glass,
    Metal,
    Absorber,
}

impl MaterialType {
    /// Energy lost by the beam for one segment ending on this material.
    pub fn energy_loss(self) -> f64 {
        match self {
            MaterialType::Empty => 0.01,
            MaterialType::Mirror => 0.02,
            MaterialType::Water => 0.1,
            MaterialType::Glass => 0.05,
            MaterialType::Metal => 0.03,
            MaterialType::Absorber => 1.0,
        }
    }

    /// Single character used in the ASCII rendering of puzzles. Mirrors are rendered from
    /// their angle instead, see [`Material::symbol`].
    pub fn symbol(self) -> char {
        match self {
            MaterialType::Empty => '.',
            MaterialType::Mirror => '/',
            MaterialType::Water => '~',
            MaterialType::Glass => '#',
            MaterialType::Metal => 'M',
            MaterialType::Absorber => 'X',
        }
    }
}

/// Physical constants of a material.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProperties {
    /// Probability that the beam is reflected. Mirrors and metal always reflect; for glass this
    /// is the split probability.
    pub reflectivity: f64,

    /// Fraction of the beam that goes through the material.
    pub transparency: f64,

    /// Probability that water bends the beam by 45°, in either direction.
    pub diffusion: f64,

    /// Whether the material stops the beam.
    pub absorbs: bool,
}

impl MaterialProperties {
    /// Default constants for the given material type.
    pub fn for_type(material_type: MaterialType) -> Self {
        let (reflectivity, transparency, diffusion, absorbs) = match material_type {
            MaterialType::Empty => (0.0, 1.0, 0.0, false),
            MaterialType::Mirror => (1.0, 0.0, 0.0, false),
            MaterialType::Water => (0.0, 0.8, 0.3, false),
            MaterialType::Glass => (0.5, 0.5, 0.0, false),
            MaterialType::Metal => (1.0, 0.0, 0.0, false),
            MaterialType::Absorber => (0.0, 0.0, 0.0, true),
        };
        Self {
            reflectivity,
            transparency,
            diffusion,
            absorbs,
        }
    }
}

/// Material placed in a grid cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(rename = "type")]
    pub material_type: MaterialType,

    pub position: GridPosition,

    /// Mirror angle in degrees. Ignored for the other materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<u16>,

    pub properties: MaterialProperties,
}

impl Material {
    /// Create a material with the default properties of its type.
    pub fn new(material_type: MaterialType, position: GridPosition) -> Self {
        Self {
            material_type,
            position,
            angle: None,
            properties: MaterialProperties::for_type(material_type),
        }
    }

    /// Create a mirror with the given angle, in degrees.
    pub fn mirror(position: GridPosition, angle: u16) -> Self {
        Self {
            angle: Some(angle % 180),
            ..Self::new(MaterialType::Mirror, position)
        }
    }

    /// Character used in the ASCII rendering.
    pub fn symbol(&self) -> char {
        if self.material_type != MaterialType::Mirror {
            return self.material_type.symbol();
        }
        match self.angle.unwrap_or(45) % 180 {
            0 => '-',
            90 => '|',
            135 => '\\',
            _ => '/',
        }
    }
}

/// Type of errors when placing materials.
#[derive(Debug, PartialEq)]
pub enum PlacementError {
    /// The position is outside the grid.
    OutOfBounds(GridPosition),

    /// The cell already holds a material.
    Occupied(GridPosition),

    /// The cell is reserved (the beam entry, for example).
    Reserved(GridPosition),
}

/// Square grid of materials.
#[derive(Debug, Clone)]
pub struct MaterialGrid {
    /// Number of cells per side.
    size: usize,

    /// One optional material per cell, row by row.
    cells: Vec<Option<Material>>,

    /// Cells that never receive a material.
    reserved: Vec<GridPosition>,
}

impl MaterialGrid {
    /// Create an empty grid.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
            reserved: Vec::new(),
        }
    }

    /// Create a grid from a list of materials, ignoring empty ones.
    ///
    /// # Errors
    ///
    /// Return an error if a material is out of the grid or if two materials share a cell.
    pub fn from_materials(size: usize, materials: &[Material]) -> Result<Self, PlacementError> {
        let mut grid: MaterialGrid = MaterialGrid::new(size);
        for m in materials {
            grid.place(*m)?;
        }
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, position: GridPosition) -> Option<usize> {
        if position.x < self.size && position.y < self.size {
            Some(position.y * self.size + position.x)
        } else {
            None
        }
    }

    /// Prevent any material from being placed in the given cell.
    pub fn reserve(&mut self, position: GridPosition) {
        if !self.reserved.contains(&position) {
            self.reserved.push(position);
        }
    }

    pub fn is_reserved(&self, position: GridPosition) -> bool {
        self.reserved.contains(&position)
    }

    /// Place a material. Empty materials are accepted but not stored.
    pub fn place(&mut self, material: Material) -> Result<(), PlacementError> {
        let position: GridPosition = material.position;
        let index: usize = self
            .index(position)
            .ok_or(PlacementError::OutOfBounds(position))?;
        if self.is_reserved(position) {
            return Err(PlacementError::Reserved(position));
        }
        if material.material_type == MaterialType::Empty {
            return Ok(());
        }
        if self.cells[index].is_some() {
            return Err(PlacementError::Occupied(position));
        }
        self.cells[index] = Some(material);
        Ok(())
    }

    /// Material in the given cell, if any.
    pub fn get(&self, position: GridPosition) -> Option<&Material> {
        self.index(position).and_then(|i| self.cells[i].as_ref())
    }

    pub fn is_free(&self, position: GridPosition) -> bool {
        self.get(position).is_none() && !self.is_reserved(position)
    }

    /// Number of placed materials.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of the grid cells that hold a material.
    pub fn density(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.len() as f64 / self.cells.len() as f64
    }

    /// All the placed materials, row by row.
    pub fn materials(&self) -> Vec<Material> {
        self.cells.iter().filter_map(|c| *c).collect()
    }

    /// All the cells without material that are not reserved.
    pub fn free_cells(&self) -> Vec<GridPosition> {
        let mut free: Vec<GridPosition> = Vec::with_capacity(self.cells.len());
        for y in 0..self.size {
            for x in 0..self.size {
                let p: GridPosition = GridPosition::new(x, y);
                if self.is_free(p) {
                    free.push(p);
                }
            }
        }
        free
    }
}

/// Weighted random choice among material types.
#[derive(Debug, Clone)]
pub struct MaterialWeights {
    types: Vec<MaterialType>,
    index: WeightedIndex<f64>,
}

impl MaterialWeights {
    /// Build the table from `(type, weight)` pairs.
    ///
    /// Return None if no weight is positive or if a weight is negative or not finite.
    pub fn new(weights: &[(MaterialType, f64)]) -> Option<Self> {
        let entries: Vec<(MaterialType, f64)> = weights
            .iter()
            .filter(|(t, _)| *t != MaterialType::Empty)
            .copied()
            .collect();
        let index: WeightedIndex<f64> = WeightedIndex::new(entries.iter().map(|(_, w)| *w)).ok()?;
        Some(Self {
            types: entries.iter().map(|(t, _)| *t).collect(),
            index,
        })
    }

    /// Pick a material type.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> MaterialType {
        self.types[self.index.sample(rng)]
    }

    /// Build a random material of a weighted type at the given position. Mirrors get a random
    /// angle from [`MIRROR_ANGLES`].
    pub fn random_material<R: Rng>(&self, position: GridPosition, rng: &mut R) -> Material {
        let material_type: MaterialType = self.choose(rng);
        let material: Material = if material_type == MaterialType::Mirror {
            Material::mirror(
                position,
                MIRROR_ANGLES[rng.random_range(0..MIRROR_ANGLES.len())],
            )
        } else {
            Material::new(material_type, position)
        };
        debug!("Filler {:?} at {position}", material.material_type);
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn place_rejects_occupied_and_reserved_cells() {
        let mut grid = MaterialGrid::new(4);
        let p = GridPosition::new(1, 1);
        grid.reserve(GridPosition::new(0, 0));

        assert_eq!(grid.place(Material::mirror(p, 45)), Ok(()));
        assert_eq!(
            grid.place(Material::new(MaterialType::Water, p)),
            Err(PlacementError::Occupied(p))
        );
        assert_eq!(
            grid.place(Material::new(MaterialType::Glass, GridPosition::new(0, 0))),
            Err(PlacementError::Reserved(GridPosition::new(0, 0)))
        );
        assert_eq!(
            grid.place(Material::new(MaterialType::Glass, GridPosition::new(4, 0))),
            Err(PlacementError::OutOfBounds(GridPosition::new(4, 0)))
        );
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.free_cells().len(), 14);
        assert!((grid.density() - 1.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn mirror_symbols_follow_angle() {
        let p = GridPosition::new(0, 0);
        assert_eq!(Material::mirror(p, 0).symbol(), '-');
        assert_eq!(Material::mirror(p, 45).symbol(), '/');
        assert_eq!(Material::mirror(p, 90).symbol(), '|');
        assert_eq!(Material::mirror(p, 135).symbol(), '\\');
        assert_eq!(Material::mirror(p, 225).angle, Some(45));
        assert_eq!(Material::new(MaterialType::Absorber, p).symbol(), 'X');
    }

    #[test]
    fn weights_skip_zero_entries() {
        let weights = MaterialWeights::new(&[
            (MaterialType::Water, 0.0),
            (MaterialType::Metal, 1.0),
            (MaterialType::Empty, 5.0),
        ])
        .expect("valid weights");
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(weights.choose(&mut rng), MaterialType::Metal);
        }
    }

    #[test]
    fn weights_without_positive_entry_are_rejected() {
        assert!(MaterialWeights::new(&[(MaterialType::Water, 0.0)]).is_none());
        assert!(MaterialWeights::new(&[]).is_none());
        assert!(MaterialWeights::new(&[(MaterialType::Glass, -1.0)]).is_none());
    }
}
