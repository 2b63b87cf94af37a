use crate::{
    codec::{self, TileStats},
    name, Elev, TileError, C, NO_VALUE,
};
use geo::{
    geometry::{Coord, Polygon},
    polygon,
};
#[cfg(feature = "image")]
use image::{ImageBuffer, Luma};
#[cfg(feature = "image")]
use num_traits::AsPrimitive;

/// A 1°×1° elevation tile.
///
/// Samples are grid points shared with neighbouring tiles: the
/// easternmost column of a tile holds the same points as the
/// westernmost column of its eastern neighbour.
///
/// Samples are private so that [`TileStats`] can never go stale;
/// every mutator recomputes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElevationTile {
    /// Longitude of the south-west corner.
    left: i32,

    /// Latitude of the south-west corner.
    bottom: i32,

    /// Number of rows and columns, `floor(sqrt(samples.len()))`.
    dimension: usize,

    /// Row-major samples, north row first.
    samples: Box<[Elev]>,

    stats: TileStats,
}

impl ElevationTile {
    /// Returns a tile with no samples.
    pub fn empty(left: i32, bottom: i32) -> Self {
        Self::new(left, bottom, Vec::new())
    }

    pub fn new(left: i32, bottom: i32, samples: Vec<Elev>) -> Self {
        let samples = samples.into_boxed_slice();
        Self {
            left,
            bottom,
            dimension: codec::dimension_of(samples.len()),
            stats: codec::compute_stats(&samples),
            samples,
        }
    }

    /// Returns a `dimension`×`dimension` tile with every sample set to
    /// `value`.
    pub fn filled(left: i32, bottom: i32, dimension: usize, value: Elev) -> Self {
        Self::new(left, bottom, vec![value; dimension * dimension])
    }

    /// Decodes a raw `.hgt` payload.
    pub fn decode(left: i32, bottom: i32, bytes: &[u8]) -> Result<Self, TileError> {
        Ok(Self::new(left, bottom, codec::decode_samples(bytes)?))
    }

    /// Encodes this tile as a raw `.hgt` payload.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode_samples(&self.samples)
    }

    /// Replaces all samples.
    pub fn set_samples(&mut self, samples: Vec<Elev>) {
        *self = Self::new(self.left, self.bottom, samples);
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn rows(&self) -> usize {
        self.dimension
    }

    pub fn columns(&self) -> usize {
        self.dimension
    }

    /// Samples per degree-edge.
    pub fn resolution(&self) -> usize {
        self.dimension
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Elev] {
        &self.samples
    }

    pub fn stats(&self) -> TileStats {
        self.stats
    }

    pub fn minimum(&self) -> Elev {
        self.stats.minimum
    }

    pub fn maximum(&self) -> Elev {
        self.stats.maximum
    }

    pub fn invalid_count(&self) -> usize {
        self.stats.invalid_count
    }

    /// This tile's standard file name, e.g. `N51E002.hgt`.
    pub fn name(&self) -> String {
        name::standard_name(self.left, self.bottom)
    }

    pub fn sw_corner(&self) -> Coord<i32> {
        Coord {
            x: self.left,
            y: self.bottom,
        }
    }

    /// Returns this tile's outline as a polygon.
    pub fn polygon(&self) -> Polygon<C> {
        let (w, s) = (C::from(self.left), C::from(self.bottom));
        let (e, n) = (w + 1.0, s + 1.0);
        polygon![
            (x: w, y: s),
            (x: e, y: s),
            (x: e, y: n),
            (x: w, y: n),
            (x: w, y: s),
        ]
    }

    /// Returns the sample at `row` (from the north) and `col` (from
    /// the west), or [`NO_VALUE`] when out of range.
    pub fn lookup(&self, row: usize, col: usize) -> Elev {
        if row < self.dimension && col < self.dimension {
            self.samples[row * self.dimension + col]
        } else {
            NO_VALUE
        }
    }

    /// Returns the sample at `x` (from the west) and `y` (from the
    /// south), or [`NO_VALUE`] when out of range.
    pub fn lookup_xy(&self, x: usize, y: usize) -> Elev {
        match self.dimension.checked_sub(1).and_then(|last| last.checked_sub(y)) {
            Some(row) => self.lookup(row, x),
            None => NO_VALUE,
        }
    }

    /// Replaces every sample outside the closed rectangle
    /// `[min_col, max_col] × [min_row, max_row]` with [`NO_VALUE`].
    ///
    /// Returns the number of samples inside the rectangle.
    pub fn discard_except(
        &mut self,
        min_col: usize,
        min_row: usize,
        max_col: usize,
        max_row: usize,
    ) -> usize {
        let dim = self.dimension;
        let mut retained = 0;
        for (idx, sample) in self.samples.iter_mut().enumerate() {
            let inside = dim != 0 && {
                let (row, col) = (idx / dim, idx % dim);
                row < dim && (min_row..=max_row).contains(&row) && (min_col..=max_col).contains(&col)
            };
            if inside {
                retained += 1;
            } else {
                *sample = NO_VALUE;
            }
        }
        self.stats = codec::compute_stats(&self.samples);
        retained
    }

    /// Like [`ElevationTile::discard_except`] with bounds in absolute
    /// degrees.
    ///
    /// Bounds are clamped to the tile and scaled by its dimension:
    /// `col = floor(lon_fraction * columns)` and, since rows run north
    /// to south, `row = floor((1 - lat_fraction) * rows)`, both clamped
    /// to the last index.
    pub fn discard_except_by_degrees(
        &mut self,
        min_lon: C,
        min_lat: C,
        max_lon: C,
        max_lat: C,
    ) -> usize {
        let fraction = |deg: C, origin: i32| (deg - C::from(origin)).clamp(0.0, 1.0);
        let last = self.dimension.saturating_sub(1);
        #[allow(clippy::cast_precision_loss)]
        let dim = self.dimension as C;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = |f: C| ((f * dim).floor() as usize).min(last);

        let min_col = index(fraction(min_lon, self.left));
        let max_col = index(fraction(max_lon, self.left));
        let min_row = index(1.0 - fraction(max_lat, self.bottom));
        let max_row = index(1.0 - fraction(min_lat, self.bottom));

        if min_col > max_col || min_row > max_row {
            return self.discard_except(1, 1, 0, 0);
        }
        self.discard_except(min_col, min_row, max_col, max_row)
    }

    /// Returns and iterator over `self`'s samples, north row first.
    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        (0..self.dimension * self.dimension).map(|index| Sample { tile: self, index })
    }
}

#[cfg(feature = "image")]
impl ElevationTile {
    /// Returns an [`ImageBuffer`] of this tile.
    ///
    /// The image is scaled so that the lowest valid elevation is `1`
    /// and the highest is the pixel type's maximum. Voids are `0`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_image<Pix>(&self) -> ImageBuffer<Luma<Pix>, Vec<Pix>>
    where
        Pix: image::Primitive + 'static,
        f32: AsPrimitive<Pix> + From<Pix>,
    {
        let dim = self.dimension as u32;
        let mut img = ImageBuffer::new(dim, dim);
        let min_elev: f32 = self.minimum().into();
        let max_elev: f32 = self.maximum().into();
        let span = (max_elev - min_elev).max(1.0);
        let top = f32::from(Pix::max_value());
        for sample in self.iter() {
            let (col, row) = sample.col_row();
            let elev = sample.elevation();
            let scaled = if elev == NO_VALUE {
                0.0
            } else {
                1.0 + (<f32 as From<Elev>>::from(elev) - min_elev) / span * (top - 1.0)
            };
            img.put_pixel(col as u32, row as u32, Luma([scaled.as_()]));
        }
        img
    }
}

/// One grid point of an [`ElevationTile`].
pub struct Sample<'a> {
    tile: &'a ElevationTile,
    index: usize,
}

impl<'a> Sample<'a> {
    #[inline]
    pub fn elevation(&self) -> Elev {
        self.tile.samples[self.index]
    }

    /// This sample's offset in the tile's samples.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// (column, row), with (0, 0) the NW corner.
    #[inline]
    pub fn col_row(&self) -> (usize, usize) {
        (self.index % self.tile.dimension, self.index / self.tile.dimension)
    }

    /// (x, y), with (0, 0) the SW corner.
    #[inline]
    pub fn xy(&self) -> (usize, usize) {
        let (col, row) = self.col_row();
        (col, self.tile.dimension - 1 - row)
    }

    /// Location of this grid point in degrees.
    #[allow(clippy::cast_precision_loss)]
    pub fn geo(&self) -> Coord<C> {
        let (x, y) = self.xy();
        let seg = (self.tile.dimension - 1).max(1) as C;
        Coord {
            x: C::from(self.tile.left) + x as C / seg,
            y: C::from(self.tile.bottom) + y as C / seg,
        }
    }
}
