//! Tile grid component.
//!
//! A [`Tilemap`] is a row-major grid of tile ids anchored at its entity's
//! position (top-left corner). Id `0` is empty. Ids listed as solid can be
//! turned into platform colliders with [`Tilemap::solid_rects`].

use std::collections::BTreeSet;

use ember_ecs::component::{Capability, Component};
use ember_ecs::transform::Transform;
use ember_ecs::vector::Vector2;
use serde::{Deserialize, Serialize};

use crate::spatial::Rect;

pub const EMPTY_TILE: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tilemap {
    columns: usize,
    rows: usize,
    tile_size: f64,
    tiles: Vec<u32>,
    solid: BTreeSet<u32>,
}

impl Tilemap {
    pub fn new(columns: usize, rows: usize, tile_size: f64) -> Self {
        Self {
            columns,
            rows,
            tile_size,
            tiles: vec![EMPTY_TILE; columns * rows],
            solid: BTreeSet::new(),
        }
    }

    /// Build from text rows: `'#'` is tile 1, `'.'` or space is empty, a
    /// digit is that tile id. Short rows are padded with empty tiles.
    pub fn from_rows(rows: &[&str], tile_size: f64) -> Self {
        let columns = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut map = Self::new(columns, rows.len(), tile_size);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let id = match ch {
                    '#' => 1,
                    c => c.to_digit(10).unwrap_or(EMPTY_TILE),
                };
                map.set_tile(col, row, id);
            }
        }
        map
    }

    /// Mark tile ids that collide.
    pub fn with_solid(mut self, ids: &[u32]) -> Self {
        self.solid.extend(ids.iter().copied().filter(|id| *id != EMPTY_TILE));
        self
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn tile(&self, col: usize, row: usize) -> Option<u32> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles.get(row * self.columns + col).copied()
    }

    /// Returns `false` for an out-of-range cell.
    pub fn set_tile(&mut self, col: usize, row: usize, id: u32) -> bool {
        if col >= self.columns || row >= self.rows {
            return false;
        }
        self.tiles[row * self.columns + col] = id;
        true
    }

    pub fn is_solid(&self, col: usize, row: usize) -> bool {
        self.tile(col, row).is_some_and(|id| self.solid.contains(&id))
    }

    /// World-space size of one cell: `tile_size` scaled by the magnitude of
    /// the owner's scale. The grid always grows right and down from the
    /// owner's position.
    pub fn cell_extent(&self, transform: &Transform) -> Vector2 {
        Vector2::new(
            self.tile_size * transform.scale.x.abs(),
            self.tile_size * transform.scale.y.abs(),
        )
    }

    /// Cell under a world-space point, for a map owned by `transform`.
    pub fn cell_at(&self, transform: &Transform, point: Vector2) -> Option<(usize, usize)> {
        let local = point - transform.position;
        let cell = self.cell_extent(transform);
        if local.x < 0.0 || local.y < 0.0 || cell.x <= 0.0 || cell.y <= 0.0 {
            return None;
        }
        let col = (local.x / cell.x) as usize;
        let row = (local.y / cell.y) as usize;
        (col < self.columns && row < self.rows).then_some((col, row))
    }

    /// World-space bounds of every solid tile, row by row.
    pub fn solid_rects(&self, transform: &Transform) -> Vec<Rect> {
        let origin = transform.position;
        let cell = self.cell_extent(transform);
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |col| (col, row)))
            .filter(|&(col, row)| self.is_solid(col, row))
            .map(|(col, row)| {
                Rect::new(
                    origin.x + col as f64 * cell.x,
                    origin.y + row as f64 * cell.y,
                    cell.x,
                    cell.y,
                )
            })
            .collect()
    }
}

impl Component for Tilemap {
    fn type_name(&self) -> &'static str {
        "Tilemap"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Tilemap]
    }
}
