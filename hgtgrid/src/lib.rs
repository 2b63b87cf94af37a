// #![deny(missing_docs)]

//! SRTM style elevation (`.hgt`) tiles and the raster grid they live
//! on.
//!
//! - [`GeoRectangle`]: integer grid rectangles with antimeridian
//!   wraparound, intersection and whole-degree snapping.
//! - [`ElevationTile`] and [`codec`]: the 1°×1° big-endian `i16` tile
//!   format, with [`store`] for bare and zipped files on disk.
//! - [`TileSlicer`]: cuts a [`raster::RasterSource`] into tiles and
//!   composes tiles back into rasters.
//! - [`mosaic`]: placement of tiles within a combined raster.
//!
//! # References
//!
//! 1. [HGT file layout](https://www.researchgate.net/profile/Pierre-Boulanger-4/publication/228924813/figure/fig8/AS:300852653903880@1448740270695/Description-of-a-HGT-file-structure-The-name-file-in-this-case-is-N20W100HGT.png)
//! 1. [Archive Team](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

pub mod codec;
mod error;
pub mod mosaic;
pub mod name;
pub mod raster;
mod rect;
pub mod slicer;
pub mod store;
mod tile;

pub use crate::{
    codec::TileStats,
    error::TileError,
    mosaic::{Mosaic, Placement, TileRef},
    name::{parse_name, standard_name},
    rect::GeoRectangle,
    slicer::{SliceOptions, SliceReport, TileSlicer},
    tile::{ElevationTile, Sample},
};
pub use geo;

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

/// Bit representation of elevation samples.
pub type Elev = i16;

/// Sample value marking a void.
pub const NO_VALUE: Elev = Elev::MIN;

pub type Result<T, E = TileError> = std::result::Result<T, E>;
