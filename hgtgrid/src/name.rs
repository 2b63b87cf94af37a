//! Tile file naming: `[N|S]DD[E|W]DDD.hgt`, named after the tile's
//! south-west corner.

use std::path::Path;

pub const HGT_EXT: &str = "hgt";

/// Returns the standard file name of the tile whose south-west
/// corner is at (`left`, `bottom`) degrees.
pub fn standard_name(left: i32, bottom: i32) -> String {
    let ns = if bottom < 0 { 'S' } else { 'N' };
    let ew = if left < 0 { 'W' } else { 'E' };
    format!(
        "{ns}{:02}{ew}{:03}.{HGT_EXT}",
        bottom.unsigned_abs(),
        left.unsigned_abs()
    )
}

/// Parses `(longitude, latitude)` of a tile's south-west corner from
/// its file name.
///
/// Only the first seven characters are significant; whatever follows
/// must be an extension (`.hgt`, `.zip`, `.txt`, `.hgt.zip`, ...).
/// Returns `None` for anything else.
pub fn parse_name(name: &str) -> Option<(i32, i32)> {
    let (stem, rest) = (name.get(0..7)?, name.get(7..)?);
    if !stem.is_ascii() || !(rest.is_empty() || rest.starts_with('.')) {
        return None;
    }
    let digits = |s: &str| {
        s.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| s.parse::<i32>().ok())
            .flatten()
    };
    let lat_sign = match &stem[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return None,
    };
    let lat = lat_sign * digits(&stem[1..3])?;
    let lon_sign = match &stem[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return None,
    };
    let lon = lon_sign * digits(&stem[4..7])?;
    Some((lon, lat))
}

/// [`parse_name`] applied to the file name of `path`.
pub fn parse_path(path: &Path) -> Option<(i32, i32)> {
    path.file_name()
        .and_then(std::ffi::OsStr::to_str)
        .and_then(parse_name)
}

#[cfg(test)]
mod tests {
    use super::{parse_name, parse_path, standard_name};
    use std::path::Path;

    #[test]
    fn test_standard_name() {
        assert_eq!(standard_name(2, 51), "N51E002.hgt");
        assert_eq!(standard_name(-77, -14), "S14W077.hgt");
        assert_eq!(standard_name(0, 0), "N00E000.hgt");
        assert_eq!(standard_name(-180, -1), "S01W180.hgt");
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(parse_name("N51E002.hgt"), Some((2, 51)));
        assert_eq!(parse_name("S14W077.hgt"), Some((-77, -14)));
        assert_eq!(parse_name("n44w072.HGT"), Some((-72, 44)));
        assert_eq!(parse_name("N51E002.hgt.zip"), Some((2, 51)));
        assert_eq!(parse_name("N51E002.ZIP"), Some((2, 51)));
        assert_eq!(parse_name("S01W180.txt"), Some((-180, -1)));
        assert_eq!(parse_name("N51E002"), Some((2, 51)));
    }

    #[test]
    fn test_parse_rejects_other_names() {
        assert_eq!(parse_name("X51E002.hgt"), None);
        assert_eq!(parse_name("N51X002.hgt"), None);
        assert_eq!(parse_name("N5aE002.hgt"), None);
        assert_eq!(parse_name("N+1E002.hgt"), None);
        assert_eq!(parse_name("N51E0021.hgt"), None);
        assert_eq!(parse_name("N51E02.hgt"), None);
        assert_eq!(parse_name("README.md"), None);
        assert_eq!(parse_name(""), None);
        assert_eq!(parse_name("Ñ51E002.hgt"), None);
    }

    #[test]
    fn test_name_round_trip() {
        for (lon, lat) in [(2, 51), (-77, -14), (179, 89), (-180, -90), (0, -1)] {
            assert_eq!(parse_name(&standard_name(lon, lat)), Some((lon, lat)));
        }
    }

    #[test]
    fn test_parse_path() {
        let path = Path::new("/data/tiles/N44W072.hgt.zip");
        assert_eq!(parse_path(path), Some((-72, 44)));
        assert_eq!(parse_path(Path::new("/data/tiles/")), None);
    }
}
