//! Placement of tiles within a combined mosaic.
//!
//! Neighbouring tiles share one row or column of grid points, so a
//! mosaic of `n` tiles across is `n * (resolution - 1) + 1` samples
//! wide. Serializing the placements (e.g. as a VRT) is left to the
//! consumer.

use crate::{
    raster::{GeoTransform, Window},
    ElevationTile, GeoRectangle, C,
};
use log::warn;
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};

/// A tile's placement on the global grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TileRef {
    pub left: i32,
    pub bottom: i32,
    /// Samples per degree-edge.
    pub resolution: usize,
    /// Where the tile is stored, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl TileRef {
    /// Latitude of the north edge.
    pub fn top(&self) -> i32 {
        self.bottom + 1
    }
}

impl From<&ElevationTile> for TileRef {
    fn from(tile: &ElevationTile) -> Self {
        Self {
            left: tile.left(),
            bottom: tile.bottom(),
            resolution: tile.resolution(),
            path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub tile: TileRef,
    /// Column of the tile's west edge within the mosaic.
    pub x_offset: usize,
    /// Row of the tile's north edge within the mosaic.
    pub y_offset: usize,
}

/// Tiles of one resolution laid out on a common raster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mosaic {
    pub resolution: usize,
    /// Longitude of the westernmost tile's west edge.
    pub west: i32,
    /// Latitude of the northernmost tile's north edge.
    pub north: i32,
    pub columns: usize,
    pub rows: usize,
    pub placements: Vec<Placement>,
}

impl Mosaic {
    fn seg(&self) -> usize {
        self.resolution - 1
    }

    /// Returns the area referenced geotransform of the mosaic raster.
    #[allow(clippy::cast_precision_loss)]
    pub fn transform(&self) -> GeoTransform {
        let pixel = 1.0 / self.seg() as C;
        GeoTransform {
            origin_x: C::from(self.west),
            pixel_width: pixel,
            origin_y: C::from(self.north),
            pixel_height: -pixel,
        }
        .point_to_area()
    }

    /// Returns the mosaic's extent on the global grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn rect(&self) -> GeoRectangle {
        let seg = self.seg() as i32;
        GeoRectangle::new(
            self.resolution as i32,
            self.west * seg,
            -self.north * seg,
            self.columns as i32 - 1,
            self.rows as i32 - 1,
        )
    }

    /// Returns the mosaic window covered by `placement`.
    pub fn window(&self, placement: &Placement) -> Window {
        Window {
            x: placement.x_offset,
            y: placement.y_offset,
            columns: self.resolution,
            rows: self.resolution,
        }
    }
}

/// Lays out `tiles`, one [`Mosaic`] per resolution in ascending
/// order.
///
/// Tiles with fewer than two samples per edge cannot be placed and
/// are skipped.
#[allow(clippy::cast_sign_loss)]
pub fn plan(tiles: impl IntoIterator<Item = TileRef>) -> Vec<Mosaic> {
    let mut by_resolution: BTreeMap<usize, Vec<TileRef>> = BTreeMap::new();
    for tile in tiles {
        if tile.resolution < 2 {
            warn!(
                "skipping tile at ({}, {}) with resolution {}",
                tile.left, tile.bottom, tile.resolution
            );
            continue;
        }
        by_resolution.entry(tile.resolution).or_default().push(tile);
    }

    by_resolution
        .into_iter()
        .filter_map(|(resolution, tiles)| {
            let seg = resolution - 1;
            let min_left = tiles.iter().map(|t| t.left).min()?;
            let max_left = tiles.iter().map(|t| t.left).max()?;
            let min_bottom = tiles.iter().map(|t| t.bottom).min()?;
            let max_bottom = tiles.iter().map(|t| t.bottom).max()?;
            let max_top = max_bottom + 1;
            let placements = tiles
                .into_iter()
                .map(|tile| Placement {
                    x_offset: (tile.left - min_left) as usize * seg,
                    y_offset: (max_top - tile.top()) as usize * seg,
                    tile,
                })
                .collect();
            Some(Mosaic {
                resolution,
                west: min_left,
                north: max_top,
                columns: (max_left - min_left + 1) as usize * seg + 1,
                rows: (max_bottom - min_bottom + 1) as usize * seg + 1,
                placements,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{plan, TileRef};
    use approx::assert_relative_eq;

    fn tile(left: i32, bottom: i32, resolution: usize) -> TileRef {
        TileRef {
            left,
            bottom,
            resolution,
            path: None,
        }
    }

    #[test]
    fn test_plan_single_tile() {
        let mosaics = plan([tile(2, 51, 1201)]);
        assert_eq!(mosaics.len(), 1);
        let m = &mosaics[0];
        assert_eq!((m.columns, m.rows), (1201, 1201));
        assert_eq!((m.west, m.north), (2, 52));
        assert_eq!(m.placements[0].x_offset, 0);
        assert_eq!(m.placements[0].y_offset, 0);
    }

    #[test]
    fn test_plan_grid_shares_edges() {
        let tiles = [tile(10, 46, 11), tile(12, 47, 11), tile(11, 46, 11)];
        let m = &plan(tiles)[0];
        assert_eq!(m.columns, 3 * 10 + 1);
        assert_eq!(m.rows, 2 * 10 + 1);
        let offsets: Vec<_> = m
            .placements
            .iter()
            .map(|p| (p.tile.left, p.x_offset, p.y_offset))
            .collect();
        assert_eq!(offsets, vec![(10, 0, 10), (12, 20, 0), (11, 10, 10)]);
        assert_eq!(m.rect().width(), 30);
        assert_eq!(m.rect().height(), 20);
        assert_eq!(m.rect().west(), 100);
        assert_eq!(m.rect().north(), -480);
    }

    #[test]
    fn test_plan_groups_by_resolution() {
        let tiles = [tile(0, 0, 3601), tile(5, 5, 1201), tile(1, 0, 3601), tile(9, 9, 1)];
        let mosaics = plan(tiles);
        let shape: Vec<_> = mosaics
            .iter()
            .map(|m| (m.resolution, m.placements.len(), m.columns, m.rows))
            .collect();
        assert_eq!(shape, vec![(1201, 1, 1201, 1201), (3601, 2, 7201, 3601)]);
    }

    #[test]
    fn test_mosaic_transform_is_area_referenced() {
        let m = &plan([tile(-1, -1, 5)])[0];
        let t = m.transform();
        assert_relative_eq!(t.pixel_width, 0.25);
        assert_relative_eq!(t.pixel_height, -0.25);
        assert_relative_eq!(t.origin_x, -1.125);
        assert_relative_eq!(t.origin_y, 0.125);
    }

    #[test]
    fn test_plan_serializes() {
        let json = serde_json::to_value(plan([tile(2, 51, 1201)])).unwrap();
        assert_eq!(json[0]["placements"][0]["tile"]["left"], 2);
        assert!(json[0]["placements"][0]["tile"].get("path").is_none());
    }
}
