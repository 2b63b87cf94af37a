//! Cutting a source raster into whole-degree tiles, and gluing tiles
//! back into a raster.

use crate::{
    mosaic::{self, Mosaic, TileRef},
    raster::{ColorInterpretation, MemRaster, RasterSink, RasterSource, Window},
    store::{self, WriteOptions},
    Elev, ElevationTile, GeoRectangle, TileError, C, NO_VALUE,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io, path::Path};

/// Slicing configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceOptions {
    /// Largest tolerated relative difference between pixel width and
    /// height, and between the pixel size and a whole fraction of a
    /// degree.
    pub pixel_tolerance: C,

    /// Discard tiles whose only valid samples lie on their outer
    /// ring; a neighbouring tile already holds those points.
    pub skip_near_empty: bool,

    /// Source sample value to treat as void, overriding the source's
    /// own no-data value.
    pub no_data: Option<C>,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self {
            pixel_tolerance: 1e-4,
            skip_near_empty: false,
            no_data: None,
        }
    }
}

/// Returns `value` as a sample, or [`TileError::InvalidRange`] if it
/// is not a 16-bit signed integer.
pub fn no_data_value(value: C) -> Result<Elev, TileError> {
    if value.fract() != 0.0 || !(C::from(Elev::MIN)..=C::from(Elev::MAX)).contains(&value) {
        return Err(TileError::InvalidRange(value));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(value as Elev)
}

/// The geometry of one slicing run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlicePlan {
    /// Point referenced extent of the source.
    pub source_rect: GeoRectangle,
    /// Whole degree extent containing the source.
    pub all_tiles_rect: GeoRectangle,
    /// Source value rewritten to [`NO_VALUE`].
    pub no_data: Option<Elev>,
}

impl SlicePlan {
    pub fn resolution(&self) -> i32 {
        self.source_rect.resolution()
    }

    /// Candidate tile rectangles, rows north to south and each row
    /// west to east.
    #[allow(clippy::cast_sign_loss)]
    pub fn tiles(&self) -> impl Iterator<Item = GeoRectangle> {
        let all = self.all_tiles_rect;
        let (res, seg) = (all.resolution(), all.seg());
        let (west, east) = (all.west(), all.west() + all.width());
        (all.north()..all.south())
            .step_by(seg as usize)
            .flat_map(move |north| {
                (west..east)
                    .step_by(seg as usize)
                    .map(move |west| GeoRectangle::new(res, west, north, seg, seg))
            })
    }
}

/// Tile counts of a slicing run.
#[derive(Debug, Default)]
pub struct SliceReport {
    pub emitted: usize,
    /// Candidates the source does not touch.
    pub outside: usize,
    /// Candidates that held no useful samples.
    pub discarded: usize,
    /// Candidates whose read failed.
    pub failures: Vec<(GeoRectangle, TileError)>,
}

enum Cut {
    Outside,
    Discarded,
    Tile(ElevationTile),
}

#[derive(Clone, Debug, Default)]
pub struct TileSlicer {
    options: SliceOptions,
}

impl TileSlicer {
    pub fn new(options: SliceOptions) -> Result<Self, TileError> {
        if let Some(value) = options.no_data {
            no_data_value(value)?;
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &SliceOptions {
        &self.options
    }

    /// Validates `source` and computes the geometry of slicing it.
    pub fn plan<S: RasterSource + ?Sized>(&self, source: &S) -> Result<SlicePlan, TileError> {
        let info = source.info();
        let tolerance = self.options.pixel_tolerance;

        if info.band_count != 1 {
            return Err(TileError::unsupported(format!(
                "{} bands, expected 1",
                info.band_count
            )));
        }
        if !info.sample_type.is_integer() {
            return Err(TileError::unsupported(format!(
                "{:?} samples, expected integers",
                info.sample_type
            )));
        }
        if !matches!(
            info.color,
            ColorInterpretation::Undefined | ColorInterpretation::Gray
        ) {
            return Err(TileError::unsupported(format!(
                "{:?} color interpretation",
                info.color
            )));
        }
        if info.columns == 0 || info.rows == 0 {
            return Err(TileError::unsupported("empty raster"));
        }

        let t = info.point_transform();
        let (dx, dy) = (t.pixel_width, -t.pixel_height);
        if !(dx > 0.0 && dy > 0.0) {
            return Err(TileError::unsupported(format!(
                "pixel size {} x {}, expected a north-up raster",
                t.pixel_width, t.pixel_height
            )));
        }
        if (dx - dy).abs() > tolerance * dx {
            return Err(TileError::unsupported(format!(
                "non-square pixels {dx} x {dy}"
            )));
        }
        if !(t.origin_x.is_finite() && t.origin_y.is_finite())
            || t.origin_x.abs() > 360.0
            || t.origin_y.abs() > 180.0
        {
            return Err(TileError::unsupported(format!(
                "origin ({}, {}) is not a geographic coordinate",
                t.origin_x, t.origin_y
            )));
        }
        let per_degree = 1.0 / dx;
        let seg = per_degree.round();
        if seg < 1.0
            || seg > C::from(i32::MAX / 720)
            || (per_degree - seg).abs() > tolerance * per_degree
        {
            return Err(TileError::unsupported(format!(
                "pixel size {dx} is not a whole fraction of a degree"
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        let resolution = seg as i32 + 1;
        let (columns, rows) = match (i32::try_from(info.columns), i32::try_from(info.rows)) {
            (Ok(c), Ok(r)) => (c, r),
            _ => return Err(TileError::unsupported("raster too large")),
        };

        let misalignment = (t.origin_x * seg - (t.origin_x * seg).round()).abs()
            + (t.origin_y * seg - (t.origin_y * seg).round()).abs();
        if misalignment > 0.01 {
            warn!(
                "source origin ({}, {}) is off the tile grid by up to {misalignment:.3} pixels",
                t.origin_x, t.origin_y
            );
        }

        let origin = GeoRectangle::from_degrees(resolution, t.origin_x, t.origin_y, 0.0, 0.0);
        let source_rect = GeoRectangle::new(
            resolution,
            origin.west(),
            origin.north(),
            columns - 1,
            rows - 1,
        );
        let all_tiles_rect = source_rect.whole_numbered_bounding();

        let no_data = match (self.options.no_data, info.no_data) {
            (Some(value), _) => Some(no_data_value(value)?),
            (None, Some(value)) => match no_data_value(value) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("ignoring source no-data value: {err}");
                    None
                }
            },
            (None, None) => None,
        };

        debug!("source {source_rect}, tiles {all_tiles_rect}");
        Ok(SlicePlan {
            source_rect,
            all_tiles_rect,
            no_data,
        })
    }

    /// Slices `source` into tiles held in memory.
    pub fn slice<S: RasterSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(Vec<ElevationTile>, SliceReport), TileError> {
        let mut tiles = Vec::new();
        let report = self.slice_with(source, |tile| {
            tiles.push(tile);
            Ok(())
        })?;
        Ok((tiles, report))
    }

    /// Slices `source` and writes each tile into `dir`.
    pub fn slice_to_dir<S: RasterSource + ?Sized>(
        &self,
        source: &S,
        dir: impl AsRef<Path>,
        options: WriteOptions,
    ) -> Result<SliceReport, TileError> {
        let dir = dir.as_ref();
        self.slice_with(source, |tile| {
            store::write_to_dir(&tile, dir, options).map(|_| ())
        })
    }

    /// Slices `source`, handing each tile to `emit` as soon as it is
    /// cut.
    ///
    /// A tile whose read fails is logged, recorded in the report and
    /// skipped. An error from `emit` aborts the run.
    pub fn slice_with<S, F>(&self, source: &S, mut emit: F) -> Result<SliceReport, TileError>
    where
        S: RasterSource + ?Sized,
        F: FnMut(ElevationTile) -> Result<(), TileError>,
    {
        let plan = self.plan(source)?;
        let mut report = SliceReport::default();
        for rect in plan.tiles() {
            match self.cut(&plan, source, &rect) {
                Ok(Cut::Outside) => report.outside += 1,
                Ok(Cut::Discarded) => {
                    debug!("discarding {rect}");
                    report.discarded += 1;
                }
                Ok(Cut::Tile(tile)) => {
                    debug!("emitting {}", tile.name());
                    emit(tile)?;
                    report.emitted += 1;
                }
                Err(err) => {
                    warn!("skipping {rect}: {err}");
                    report.failures.push((rect, err));
                }
            }
        }
        info!(
            "emitted {} tiles, discarded {}, {} failed",
            report.emitted,
            report.discarded,
            report.failures.len()
        );
        Ok(report)
    }

    #[allow(clippy::cast_sign_loss)]
    fn cut<S: RasterSource + ?Sized>(
        &self,
        plan: &SlicePlan,
        source: &S,
        tile: &GeoRectangle,
    ) -> Result<Cut, TileError> {
        let src = &plan.source_rect;
        let Some(overlap) = src.intersect(tile) else {
            return Ok(Cut::Outside);
        };
        let period = 360 * src.seg();
        let res = tile.resolution() as usize;

        let window = Window {
            x: (overlap.west() - src.west()).rem_euclid(period) as usize,
            y: (overlap.north() - src.north()) as usize,
            columns: overlap.width() as usize + 1,
            rows: overlap.height() as usize + 1,
        };
        let read = source.read_window(&window)?;
        if read.len() != window.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("read {} samples of {window:?}", read.len()),
            )
            .into());
        }

        let mut samples = if overlap == *tile {
            read
        } else {
            let mut samples = vec![NO_VALUE; res * res];
            let dx = (overlap.west() - tile.west()).rem_euclid(period) as usize;
            let dy = (overlap.north() - tile.north()) as usize;
            for (row, chunk) in read.chunks_exact(window.columns).enumerate() {
                let start = (dy + row) * res + dx;
                samples[start..start + window.columns].copy_from_slice(chunk);
            }
            samples
        };

        if let Some(no_data) = plan.no_data.filter(|&v| v != NO_VALUE) {
            for sample in &mut samples {
                if *sample == no_data {
                    *sample = NO_VALUE;
                }
            }
        }

        if !self.is_informative(&samples, res) {
            return Ok(Cut::Discarded);
        }

        let seg = tile.seg();
        let left = tile.west().div_euclid(seg);
        let bottom = -tile.south().div_euclid(seg);
        Ok(Cut::Tile(ElevationTile::new(left, bottom, samples)))
    }

    fn is_informative(&self, samples: &[Elev], dim: usize) -> bool {
        if self.options.skip_near_empty {
            samples
                .chunks_exact(dim)
                .skip(1)
                .take(dim.saturating_sub(2))
                .any(|row| row[1..dim - 1].iter().any(|&s| s != NO_VALUE))
        } else {
            samples.iter().any(|&s| s != NO_VALUE)
        }
    }
}

/// Writes `tiles` into `sink` at their placement in `mosaic`.
///
/// Tiles not placed in `mosaic` are ignored. Void samples never
/// overwrite valid ones, so the order of tiles sharing an edge does
/// not matter.
pub fn compose_into<K: RasterSink + ?Sized>(
    mosaic: &Mosaic,
    tiles: &[ElevationTile],
    sink: &mut K,
) -> Result<(), TileError> {
    let by_corner: HashMap<(i32, i32), &ElevationTile> = tiles
        .iter()
        .filter(|t| t.resolution() == mosaic.resolution)
        .map(|t| ((t.left(), t.bottom()), t))
        .collect();
    for placement in &mosaic.placements {
        let Some(tile) = by_corner.get(&(placement.tile.left, placement.tile.bottom)) else {
            continue;
        };
        let window = mosaic.window(placement);
        let mut merged = sink.read_window(&window)?;
        for (dst, &src) in merged.iter_mut().zip(tile.samples()) {
            if src != NO_VALUE {
                *dst = src;
            }
        }
        sink.write_window(&window, &merged)?;
    }
    Ok(())
}

/// Glues `tiles` into in-memory rasters, one per resolution.
pub fn compose(tiles: &[ElevationTile]) -> Result<Vec<(Mosaic, MemRaster)>, TileError> {
    mosaic::plan(tiles.iter().map(TileRef::from))
        .into_iter()
        .map(|mosaic| {
            let mut raster = MemRaster::new(mosaic.columns, mosaic.rows, mosaic.transform());
            compose_into(&mosaic, tiles, &mut raster)?;
            Ok((mosaic, raster))
        })
        .collect()
}
