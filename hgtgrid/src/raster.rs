//! Access to arbitrarily sized, arbitrarily positioned source rasters.
//!
//! Decoding of real raster formats lives outside this crate; callers
//! adapt their reader of choice to [`RasterSource`] (and
//! [`RasterSink`] for writing).

use crate::{Elev, C, NO_VALUE};
use serde::{Deserialize, Serialize};
use std::io;

/// Affine georeference of a north-up raster, in GDAL order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Longitude of the origin.
    pub origin_x: C,
    /// Degrees per column, positive eastward.
    pub pixel_width: C,
    /// Latitude of the origin.
    pub origin_y: C,
    /// Degrees per row, negative for north-up rasters.
    pub pixel_height: C,
}

impl GeoTransform {
    /// Returns `self` moved half a pixel so that it references pixel
    /// centers.
    pub fn area_to_point(&self) -> Self {
        Self {
            origin_x: self.origin_x + self.pixel_width / 2.0,
            origin_y: self.origin_y + self.pixel_height / 2.0,
            ..*self
        }
    }

    /// Inverse of [`GeoTransform::area_to_point`].
    pub fn point_to_area(&self) -> Self {
        Self {
            origin_x: self.origin_x - self.pixel_width / 2.0,
            origin_y: self.origin_y - self.pixel_height / 2.0,
            ..*self
        }
    }
}

/// What a raster's geotransform origin refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelReference {
    /// The origin is the outer corner of the first pixel.
    #[default]
    Area,
    /// The origin is the first sample itself.
    Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorInterpretation {
    #[default]
    Undefined,
    Gray,
    Palette,
    Red,
    Green,
    Blue,
    Alpha,
}

/// Metadata of a source raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub columns: usize,
    pub rows: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub color: ColorInterpretation,
    pub transform: GeoTransform,
    pub reference: PixelReference,
    /// The raster's own no-data value, if any.
    pub no_data: Option<C>,
}

impl RasterInfo {
    /// Single band, `i16`, area referenced.
    pub fn elevation(columns: usize, rows: usize, transform: GeoTransform) -> Self {
        Self {
            columns,
            rows,
            band_count: 1,
            sample_type: SampleType::I16,
            color: ColorInterpretation::Gray,
            transform,
            reference: PixelReference::Area,
            no_data: Some(C::from(NO_VALUE)),
        }
    }

    /// Returns the geotransform referenced to pixel centers.
    pub fn point_transform(&self) -> GeoTransform {
        match self.reference {
            PixelReference::Area => self.transform.area_to_point(),
            PixelReference::Point => self.transform,
        }
    }
}

/// An axis aligned pixel window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    pub x: usize,
    pub y: usize,
    pub columns: usize,
    pub rows: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fits(&self, info: &RasterInfo) -> bool {
        self.x + self.columns <= info.columns && self.y + self.rows <= info.rows
    }
}

/// A readable single band raster.
///
/// Windows passed to `read_window` never overlap within one slicing
/// run, and the trait requires `Sync` so per-tile reads may be spread
/// over threads.
pub trait RasterSource: Sync {
    fn info(&self) -> &RasterInfo;

    /// Returns the samples of `window`, row-major, north row first.
    fn read_window(&self, window: &Window) -> io::Result<Vec<Elev>>;
}

/// A writable single band raster.
pub trait RasterSink: RasterSource {
    fn write_window(&mut self, window: &Window, samples: &[Elev]) -> io::Result<()>;
}

/// An in-memory `i16` raster.
#[derive(Clone, Debug, PartialEq)]
pub struct MemRaster {
    info: RasterInfo,
    samples: Vec<Elev>,
}

impl MemRaster {
    /// Returns a [`NO_VALUE`] filled raster.
    pub fn new(columns: usize, rows: usize, transform: GeoTransform) -> Self {
        Self {
            info: RasterInfo::elevation(columns, rows, transform),
            samples: vec![NO_VALUE; columns * rows],
        }
    }

    /// Returns a raster whose sample at (`col`, `row`) is `f(col, row)`.
    pub fn from_fn(
        columns: usize,
        rows: usize,
        transform: GeoTransform,
        mut f: impl FnMut(usize, usize) -> Elev,
    ) -> Self {
        let mut raster = Self::new(columns, rows, transform);
        for (idx, sample) in raster.samples.iter_mut().enumerate() {
            *sample = f(idx % columns, idx / columns);
        }
        raster
    }

    pub fn info_mut(&mut self) -> &mut RasterInfo {
        &mut self.info
    }

    pub fn samples(&self) -> &[Elev] {
        &self.samples
    }

    pub fn get(&self, col: usize, row: usize) -> Option<Elev> {
        (col < self.info.columns && row < self.info.rows)
            .then(|| self.samples[row * self.info.columns + col])
    }
}

fn out_of_bounds(window: &Window, info: &RasterInfo) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "window {window:?} exceeds {}x{} raster",
            info.columns, info.rows
        ),
    )
}

impl RasterSource for MemRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, window: &Window) -> io::Result<Vec<Elev>> {
        if !window.fits(&self.info) {
            return Err(out_of_bounds(window, &self.info));
        }
        let mut out = Vec::with_capacity(window.len());
        for row in window.y..window.y + window.rows {
            let start = row * self.info.columns + window.x;
            out.extend_from_slice(&self.samples[start..start + window.columns]);
        }
        Ok(out)
    }
}

impl RasterSink for MemRaster {
    fn write_window(&mut self, window: &Window, samples: &[Elev]) -> io::Result<()> {
        if !window.fits(&self.info) || samples.len() != window.len() {
            return Err(out_of_bounds(window, &self.info));
        }
        if window.is_empty() {
            return Ok(());
        }
        let stride = self.info.columns;
        for (row, chunk) in samples.chunks_exact(window.columns).enumerate() {
            let start = (window.y + row) * stride + window.x;
            self.samples[start..start + window.columns].copy_from_slice(chunk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transform() -> GeoTransform {
        GeoTransform {
            origin_x: 10.0,
            pixel_width: 0.5,
            origin_y: 48.0,
            pixel_height: -0.5,
        }
    }

    #[test]
    fn test_half_pixel_shift() {
        let point = transform().area_to_point();
        assert_relative_eq!(point.origin_x, 10.25);
        assert_relative_eq!(point.origin_y, 47.75);
        assert_eq!(point.point_to_area(), transform());
    }

    #[test]
    fn test_read_window() {
        let raster = MemRaster::from_fn(4, 3, transform(), |c, r| (r * 10 + c) as Elev);
        let window = Window {
            x: 1,
            y: 1,
            columns: 2,
            rows: 2,
        };
        assert_eq!(raster.read_window(&window).unwrap(), vec![11, 12, 21, 22]);
        let too_wide = Window { columns: 4, ..window };
        assert!(raster.read_window(&too_wide).is_err());
    }

    #[test]
    fn test_write_window() {
        let mut raster = MemRaster::new(3, 3, transform());
        let window = Window {
            x: 1,
            y: 0,
            columns: 2,
            rows: 2,
        };
        raster.write_window(&window, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            raster.samples(),
            &[NO_VALUE, 1, 2, NO_VALUE, 3, 4, NO_VALUE, NO_VALUE, NO_VALUE]
        );
        assert!(raster.write_window(&window, &[1, 2, 3]).is_err());
        assert_eq!(raster.get(2, 1), Some(4));
        assert_eq!(raster.get(3, 1), None);
    }
}
