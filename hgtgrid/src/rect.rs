use crate::C;
use geo::{geometry::Polygon, polygon};
use std::fmt;

/// An axis aligned rectangle of grid points on a global raster.
///
/// Coordinates are integral raster units of `resolution - 1`
/// segments per degree. `x` grows eastward from the prime meridian,
/// `y` grows southward from the equator, so the north edge of a
/// rectangle has the smallest `y`.
///
/// The west edge wraps at the antimeridian and is kept in
/// `[-180°, 180°)`. The north edge wraps with a 180° period and is
/// kept in `[-90°, 90°)`. Width is clamped to one full turn and
/// height is clamped so the south edge never passes the south pole.
///
/// Edges are grid points, so a rectangle `width` units wide spans
/// `width + 1` samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeoRectangle {
    resolution: i32,
    west: i32,
    north: i32,
    width: i32,
    height: i32,
}

impl GeoRectangle {
    /// Returns a rectangle from raw grid units, normalized.
    pub fn new(resolution: i32, west: i32, north: i32, width: i32, height: i32) -> Self {
        debug_assert!(resolution > 1, "resolution must be at least 2");
        let seg = resolution - 1;
        let west = wrap_x(seg, west);
        let north = wrap_y(seg, north);
        let width = width.clamp(0, 360 * seg);
        let height = height.clamp(0, 90 * seg - north);
        Self {
            resolution,
            west,
            north,
            width,
            height,
        }
    }

    /// Returns a rectangle from its north-west corner and extent in
    /// degrees.
    pub fn from_degrees(resolution: i32, west: C, north: C, width: C, height: C) -> Self {
        let seg = resolution - 1;
        Self::new(
            resolution,
            to_grid(seg, west),
            to_grid(seg, -north),
            to_grid(seg, width),
            to_grid(seg, height),
        )
    }

    /// Samples per degree-edge of a tile on this grid.
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    /// Grid units per degree.
    pub fn seg(&self) -> i32 {
        self.resolution - 1
    }

    pub fn west(&self) -> i32 {
        self.west
    }

    pub fn north(&self) -> i32 {
        self.north
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// East edge, wrapped back into `[-180°, 180°)`.
    pub fn east(&self) -> i32 {
        wrap_x(self.seg(), self.west + self.width)
    }

    /// South edge. Never wrapped; height is clamped instead.
    pub fn south(&self) -> i32 {
        self.north + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn degree_to_x(&self, lon: C) -> i32 {
        wrap_x(self.seg(), to_grid(self.seg(), lon))
    }

    pub fn x_to_degree(&self, x: i32) -> C {
        C::from(wrap_x(self.seg(), x)) / C::from(self.seg())
    }

    pub fn degree_to_y(&self, lat: C) -> i32 {
        wrap_y(self.seg(), to_grid(self.seg(), -lat))
    }

    pub fn y_to_degree(&self, y: i32) -> C {
        -C::from(wrap_y(self.seg(), y)) / C::from(self.seg())
    }

    pub fn west_degrees(&self) -> C {
        self.x_to_degree(self.west)
    }

    pub fn east_degrees(&self) -> C {
        self.x_to_degree(self.east())
    }

    pub fn north_degrees(&self) -> C {
        self.y_to_degree(self.north)
    }

    /// South edge in degrees.
    ///
    /// Unlike [`GeoRectangle::y_to_degree`] this does not wrap, so a
    /// rectangle reaching the south pole reports -90.
    pub fn south_degrees(&self) -> C {
        -C::from(self.south()) / C::from(self.seg())
    }

    /// Returns the overlap of two rectangles, or `None` if they do
    /// not overlap or live on different grids.
    ///
    /// Rectangles that only share an edge overlap in a zero width (or
    /// height) rectangle holding the shared grid points.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.resolution != other.resolution {
            return None;
        }

        let north = self.north.max(other.north);
        let south = self.south().min(other.south());
        if north > south {
            return None;
        }

        let period = 360 * self.seg();
        let (west, width) = match (self.width == period, other.width == period) {
            (true, true) => (self.west.min(other.west), period),
            (true, false) => (other.west, other.width),
            (false, true) => (self.west, self.width),
            (false, false) => {
                let (aw, ae) = (self.west, self.west + self.width);
                let (bw, be) = (other.west, other.west + other.width);
                // Either span may cross the antimeridian, so try the
                // other span one turn either side as well. When two
                // disjoint pieces overlap keep the widest.
                [0, period, -period]
                    .into_iter()
                    .filter_map(|shift| {
                        let lo = aw.max(bw + shift);
                        let hi = ae.min(be + shift);
                        (lo <= hi).then(|| (wrap_x(self.seg(), lo), hi - lo))
                    })
                    .max_by(|(w1, d1), (w2, d2)| d1.cmp(d2).then(w2.cmp(w1)))?
            }
        };

        Some(Self::new(
            self.resolution,
            west,
            north,
            width,
            south - north,
        ))
    }

    /// Rounds `v` down to a whole degree.
    pub fn floor_raster(&self, v: i32) -> i32 {
        v.div_euclid(self.seg()) * self.seg()
    }

    /// Rounds `v` up to a whole degree.
    pub fn ceil_raster(&self, v: i32) -> i32 {
        -(-v).div_euclid(self.seg()) * self.seg()
    }

    /// Whole degree at or west of the west edge.
    pub fn westerly_raster(&self) -> i32 {
        self.floor_raster(self.west)
    }

    /// Whole degree at or east of the east edge.
    ///
    /// Measured from the west edge without wrapping, so it is never
    /// less than [`GeoRectangle::westerly_raster`].
    pub fn easterly_raster(&self) -> i32 {
        self.ceil_raster(self.west + self.width)
    }

    /// Whole degree at or north of the north edge.
    pub fn northerly_raster(&self) -> i32 {
        self.floor_raster(self.north)
    }

    /// Whole degree at or south of the south edge.
    pub fn southerly_raster(&self) -> i32 {
        self.ceil_raster(self.south())
    }

    /// Returns the smallest rectangle with whole degree edges that
    /// contains `self`.
    pub fn whole_numbered_bounding(&self) -> Self {
        let west = self.westerly_raster();
        let north = self.northerly_raster();
        Self::new(
            self.resolution,
            west,
            north,
            self.easterly_raster() - west,
            self.southerly_raster() - north,
        )
    }

    /// Returns this rectangle's outline in degrees.
    ///
    /// The east edge is not wrapped, so the outline of a rectangle
    /// crossing the antimeridian extends past 180°.
    pub fn polygon(&self) -> Polygon<C> {
        let seg = C::from(self.seg());
        let w = self.west_degrees();
        let e = w + C::from(self.width) / seg;
        let n = self.north_degrees();
        let s = self.south_degrees();
        polygon![
            (x: w, y: s),
            (x: e, y: s),
            (x: e, y: n),
            (x: w, y: n),
            (x: w, y: s),
        ]
    }
}

impl fmt::Display for GeoRectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} x {}..{} @{}",
            self.west_degrees(),
            self.east_degrees(),
            self.north_degrees(),
            self.south_degrees(),
            self.resolution
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_grid(seg: i32, deg: C) -> i32 {
    (C::from(seg) * deg).round() as i32
}

fn wrap_x(seg: i32, x: i32) -> i32 {
    wrap(180 * i64::from(seg), x)
}

fn wrap_y(seg: i32, y: i32) -> i32 {
    wrap(90 * i64::from(seg), y)
}

/// Wraps `v` into `[-half, half)`.
#[allow(clippy::cast_possible_truncation)]
fn wrap(half: i64, v: i32) -> i32 {
    ((i64::from(v) + half).rem_euclid(2 * half) - half) as i32
}

#[cfg(test)]
mod tests {
    use super::GeoRectangle;
    use approx::assert_relative_eq;
    use itertools::iproduct;

    const RES: i32 = 1201;
    const SEG: i32 = RES - 1;

    fn deg(west: f64, north: f64, width: f64, height: f64) -> GeoRectangle {
        GeoRectangle::from_degrees(RES, west, north, width, height)
    }

    #[test]
    fn test_east_wraps_at_antimeridian() {
        let r = GeoRectangle::new(RES, 170 * SEG, 0, 20 * SEG, SEG);
        assert_eq!(r.east(), r.degree_to_x(-170.0));
        assert_eq!(r.east(), -170 * SEG);
        assert_relative_eq!(r.east_degrees(), -170.0);
        assert_relative_eq!(r.west_degrees(), 170.0);
    }

    #[test]
    fn test_extreme_coordinates_wrap_without_overflow() {
        let r = GeoRectangle::new(RES, i32::MAX, i32::MIN, 0, 0);
        assert!((-180 * SEG..180 * SEG).contains(&r.west()));
        assert!((-90 * SEG..90 * SEG).contains(&r.north()));

        let r = deg(1e10, -1e10, 1.0, 1.0);
        assert!((-180 * SEG..180 * SEG).contains(&r.west()));
        assert!((-90 * SEG..90 * SEG).contains(&r.north()));
        assert!(r.degree_to_x(f64::MAX) < 180 * SEG);
        assert!(r.degree_to_y(-f64::MAX) < 90 * SEG);
    }

    #[test]
    fn test_west_is_normalized() {
        assert_eq!(GeoRectangle::new(RES, 180 * SEG, 0, 0, 0).west(), -180 * SEG);
        assert_eq!(GeoRectangle::new(RES, 540 * SEG, 0, 0, 0).west(), -180 * SEG);
        assert_eq!(GeoRectangle::new(RES, -190 * SEG, 0, 0, 0).west(), 170 * SEG);
        assert_eq!(deg(-181.0, 0.0, 1.0, 1.0).west(), 179 * SEG);
    }

    #[test]
    fn test_north_wraps_with_half_period() {
        assert_eq!(GeoRectangle::new(RES, 0, 90 * SEG, 0, 0).north(), -90 * SEG);
        assert_eq!(GeoRectangle::new(RES, 0, 100 * SEG, 0, 0).north(), -80 * SEG);
        assert_eq!(deg(0.0, 95.0, 1.0, 1.0).north(), 85 * SEG);
    }

    #[test]
    fn test_extent_clamping() {
        let r = GeoRectangle::new(RES, 0, 80 * SEG, 400 * SEG, 20 * SEG);
        assert_eq!(r.width(), 360 * SEG);
        assert_eq!(r.height(), 10 * SEG);
        assert_eq!(r.south(), 90 * SEG);
        assert_relative_eq!(r.south_degrees(), -90.0);
        assert_eq!(GeoRectangle::new(RES, 0, 0, -5, -5).width(), 0);
    }

    #[test]
    fn test_degree_conversions() {
        let r = deg(-77.25, -14.5, 1.0, 1.0);
        assert_eq!(r.west(), -77 * SEG - SEG / 4);
        assert_eq!(r.north(), 14 * SEG + SEG / 2);
        assert_relative_eq!(r.west_degrees(), -77.25);
        assert_relative_eq!(r.north_degrees(), -14.5);
        assert_relative_eq!(r.south_degrees(), -15.5);
        assert_eq!(r.degree_to_y(51.0), -51 * SEG);
        assert_relative_eq!(r.y_to_degree(-51 * SEG), 51.0);
        assert_relative_eq!(r.x_to_degree(190 * SEG), -170.0);
    }

    #[test]
    fn test_empty() {
        assert!(GeoRectangle::new(RES, 0, 0, 0, 10).is_empty());
        assert!(GeoRectangle::new(RES, 0, 0, 10, 0).is_empty());
        assert!(!GeoRectangle::new(RES, 0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_raster_snapping_handles_negatives() {
        let r = GeoRectangle::new(RES, 0, 0, 0, 0);
        assert_eq!(r.floor_raster(0), 0);
        assert_eq!(r.floor_raster(1), 0);
        assert_eq!(r.floor_raster(SEG), SEG);
        assert_eq!(r.floor_raster(-1), -SEG);
        assert_eq!(r.floor_raster(-SEG), -SEG);
        assert_eq!(r.floor_raster(-SEG - 1), -2 * SEG);
        assert_eq!(r.ceil_raster(0), 0);
        assert_eq!(r.ceil_raster(1), SEG);
        assert_eq!(r.ceil_raster(SEG), SEG);
        assert_eq!(r.ceil_raster(-1), 0);
        assert_eq!(r.ceil_raster(-SEG), -SEG);
        assert_eq!(r.ceil_raster(-SEG - 1), -SEG);
    }

    #[test]
    fn test_edge_snapping() {
        let r = deg(-0.5, 0.5, 1.0, 1.0);
        assert_eq!(r.westerly_raster(), -SEG);
        assert_eq!(r.easterly_raster(), SEG);
        assert_eq!(r.northerly_raster(), -SEG);
        assert_eq!(r.southerly_raster(), SEG);
    }

    #[test]
    fn test_whole_numbered_bounding() {
        let b = deg(10.25, 48.5, 2.5, 2.25).whole_numbered_bounding();
        assert_eq!(b, deg(10.0, 49.0, 3.0, 3.0));

        // Already whole.
        let whole = deg(-3.0, -7.0, 2.0, 1.0);
        assert_eq!(whole.whole_numbered_bounding(), whole);

        // Straddling the antimeridian.
        let b = deg(179.5, 1.0, 1.0, 1.0).whole_numbered_bounding();
        assert_eq!(b.west(), 179 * SEG);
        assert_eq!(b.width(), 2 * SEG);
        assert_eq!(b.east(), -179 * SEG);
    }

    #[test]
    fn test_intersect_simple() {
        let a = deg(0.0, 2.0, 2.0, 2.0);
        let b = deg(1.0, 1.0, 2.0, 2.0);
        assert_eq!(a.intersect(&b), Some(deg(1.0, 1.0, 1.0, 1.0)));
        let inner = deg(0.25, 1.75, 0.5, 0.5);
        assert_eq!(a.intersect(&inner), Some(inner));
    }

    #[test]
    fn test_intersect_disjoint() {
        let a = deg(0.0, 2.0, 1.0, 1.0);
        assert_eq!(a.intersect(&deg(5.0, 2.0, 1.0, 1.0)), None);
        assert_eq!(a.intersect(&deg(0.0, -3.0, 1.0, 1.0)), None);
        let other_grid = GeoRectangle::from_degrees(3601, 0.0, 2.0, 1.0, 1.0);
        assert_eq!(a.intersect(&other_grid), None);
    }

    #[test]
    fn test_intersect_touching_edge() {
        let a = deg(0.0, 1.0, 1.0, 1.0);
        let b = deg(1.0, 1.0, 1.0, 1.0);
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.west(), SEG);
        assert_eq!(overlap.width(), 0);
        assert_eq!(overlap.height(), SEG);
        assert!(overlap.is_empty());
    }

    #[test]
    fn test_intersect_across_antimeridian() {
        let crossing = deg(170.0, 10.0, 20.0, 5.0);
        let east_side = deg(-175.0, 8.0, 10.0, 1.0);
        let expected = deg(-175.0, 8.0, 5.0, 1.0);
        assert_eq!(crossing.intersect(&east_side), Some(expected));
        assert_eq!(east_side.intersect(&crossing), Some(expected));

        let west_side = deg(165.0, 10.0, 10.0, 5.0);
        assert_eq!(crossing.intersect(&west_side), Some(deg(170.0, 10.0, 5.0, 5.0)));

        let both = deg(175.0, 10.0, 10.0, 5.0);
        assert_eq!(crossing.intersect(&both), Some(both));
    }

    #[test]
    fn test_intersect_full_turn() {
        let world = deg(-180.0, 90.0, 360.0, 180.0);
        let r = deg(100.0, 10.0, 1.0, 1.0);
        assert_eq!(world.intersect(&r), Some(r));
        let shifted_world = deg(-10.0, 90.0, 360.0, 180.0);
        assert_eq!(world.intersect(&shifted_world), Some(world));
        assert_eq!(shifted_world.intersect(&world), Some(world));
    }

    #[test]
    fn test_intersect_is_commutative() {
        let edges = [-180.0, -179.5, -10.0, 0.0, 0.5, 170.0, 179.0];
        let widths = [0.0, 0.5, 1.0, 15.0, 200.0, 360.0];
        let rects: Vec<_> = iproduct!(edges, widths)
            .map(|(w, dw)| deg(w, 1.0 - dw / 720.0, dw, 1.0))
            .collect();
        for (a, b) in iproduct!(&rects, &rects) {
            assert_eq!(a.intersect(b), b.intersect(a), "{a} vs {b}");
        }
    }

    #[test]
    fn test_polygon_in_degrees() {
        let p = deg(179.0, 1.0, 2.0, 1.0).polygon();
        let xs: Vec<f64> = p.exterior().points().map(|p| p.x()).collect();
        let ys: Vec<f64> = p.exterior().points().map(|p| p.y()).collect();
        assert_eq!(xs, vec![179.0, 181.0, 181.0, 179.0, 179.0]);
        assert_eq!(ys, vec![0.0, 0.0, 1.0, 1.0, 0.0]);
    }
}
