//! Reading and writing tiles on disk, bare or zipped.
//!
//! A tile `N51E002.hgt` may also be stored as `N51E002.hgt.zip`, a
//! single-entry archive whose member is named `N51E002.hgt`.

use crate::{
    codec,
    mosaic::TileRef,
    name::{self, HGT_EXT},
    ElevationTile, TileError,
};
use log::{debug, warn};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, Write},
    mem::size_of,
    path::{Path, PathBuf},
};
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

const ZIP_EXT: &str = "zip";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Replace existing files instead of failing.
    pub overwrite: bool,
    /// Write `<name>.hgt.zip` instead of `<name>.hgt`.
    pub zipped: bool,
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ZIP_EXT))
}

/// Returns `path` with `.zip` appended.
pub fn zip_path(path: impl AsRef<Path>) -> PathBuf {
    let mut os = path.as_ref().as_os_str().to_owned();
    os.push(".");
    os.push(ZIP_EXT);
    PathBuf::from(os)
}

/// Resolves `path`, bare or zipped, into the bare path, the archive
/// path and the archive member name.
fn locate(path: &Path) -> Result<(PathBuf, PathBuf, String), TileError> {
    let (bare, archive) = if is_zip(path) {
        (path.with_extension(""), path.to_path_buf())
    } else {
        (path.to_path_buf(), zip_path(path))
    };
    let member = bare
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| TileError::TileName(path.to_path_buf()))?
        .to_owned();
    Ok((bare, archive, member))
}

fn archive_error(path: &Path, err: ZipError) -> TileError {
    match err {
        ZipError::Io(err) => TileError::Io(err),
        other => TileError::MalformedArchive {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Finds `member` in `archive`, ignoring ASCII case.
fn member_name<R: Read + Seek>(
    archive: &ZipArchive<R>,
    path: &Path,
    member: &str,
) -> Result<String, TileError> {
    archive
        .file_names()
        .find(|name| name.eq_ignore_ascii_case(member))
        .map(str::to_owned)
        .ok_or_else(|| TileError::MalformedArchive {
            path: path.to_path_buf(),
            reason: format!("no member named {member}"),
        })
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, TileError> {
    ZipArchive::new(File::open(path)?).map_err(|err| archive_error(path, err))
}

fn member_len(path: &Path, file: &zip::read::ZipFile<'_>) -> Result<usize, TileError> {
    usize::try_from(file.size()).map_err(|_| TileError::MalformedArchive {
        path: path.to_path_buf(),
        reason: format!("member of {} bytes is too large", file.size()),
    })
}

/// Reads a tile from `path`.
///
/// `path` may name either form. The bare file is preferred; failing
/// that the archive must exist and hold the tile. The tile's corner
/// is parsed from its name.
pub fn read_tile(path: impl AsRef<Path>) -> Result<ElevationTile, TileError> {
    let path = path.as_ref();
    let (bare, archive, member) = locate(path)?;
    let (left, bottom) =
        name::parse_name(&member).ok_or_else(|| TileError::TileName(path.to_path_buf()))?;

    if bare.is_file() {
        debug!("reading {bare:?}");
        let file = File::open(&bare)?;
        if file.metadata()?.len() == 0 {
            return Ok(ElevationTile::empty(left, bottom));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        ElevationTile::decode(left, bottom, &mmap)
    } else if archive.is_file() {
        debug!("reading {member} from {archive:?}");
        let mut zip = open_archive(&archive)?;
        let found = member_name(&zip, &archive, &member)?;
        let mut file = zip
            .by_name(&found)
            .map_err(|err| archive_error(&archive, err))?;
        let len = member_len(&archive, &file)?;
        let samples = codec::read_samples(&mut file, len)?;
        Ok(ElevationTile::new(left, bottom, samples))
    } else {
        Err(TileError::NotFound(bare))
    }
}

/// Writes `tile` to `path`; a `.zip` extension selects the archive
/// form.
///
/// Unless `overwrite` is set the file must not exist yet. A failed
/// write removes the partial file.
pub fn write_tile(
    tile: &ElevationTile,
    path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<(), TileError> {
    let path = path.as_ref();
    let member = if is_zip(path) {
        Some(locate(path)?.2)
    } else {
        None
    };
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .create_new(!overwrite)
        .open(path)
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => TileError::AlreadyExists(path.to_path_buf()),
            _ => TileError::Io(err),
        })?;
    if let Err(err) = write_payload(file, path, member, &tile.encode()) {
        if let Err(rm_err) = fs::remove_file(path) {
            warn!("failed to remove partial {path:?}: {rm_err}");
        }
        return Err(err);
    }
    debug!("wrote {path:?}");
    Ok(())
}

fn write_payload(
    mut file: File,
    path: &Path,
    member: Option<String>,
    payload: &[u8],
) -> Result<(), TileError> {
    match member {
        Some(member) => {
            let mut zip = ZipWriter::new(file);
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(member, options)
                .map_err(|err| archive_error(path, err))?;
            zip.write_all(payload)?;
            zip.finish().map_err(|err| archive_error(path, err))?;
        }
        None => {
            file.write_all(payload)?;
        }
    }
    Ok(())
}

/// Writes `tile` into `dir` under its standard name and returns the
/// path written.
pub fn write_to_dir(
    tile: &ElevationTile,
    dir: impl AsRef<Path>,
    options: WriteOptions,
) -> Result<PathBuf, TileError> {
    let mut path = dir.as_ref().join(tile.name());
    if options.zipped {
        path = zip_path(path);
    }
    write_tile(tile, &path, options.overwrite)?;
    Ok(path)
}

/// Returns the placement of the tile at `path` without decoding it.
///
/// The resolution is derived from the payload length.
pub fn probe(path: impl AsRef<Path>) -> Result<TileRef, TileError> {
    let path = path.as_ref();
    let (bare, archive, member) = locate(path)?;
    let (left, bottom) =
        name::parse_name(&member).ok_or_else(|| TileError::TileName(path.to_path_buf()))?;

    let byte_len = if bare.is_file() {
        #[allow(clippy::cast_possible_truncation)]
        let len = bare.metadata()?.len() as usize;
        len
    } else if archive.is_file() {
        let mut zip = open_archive(&archive)?;
        let found = member_name(&zip, &archive, &member)?;
        let file = zip
            .by_name(&found)
            .map_err(|err| archive_error(&archive, err))?;
        member_len(&archive, &file)?
    } else {
        return Err(TileError::NotFound(bare));
    };
    if byte_len % size_of::<crate::Elev>() != 0 {
        return Err(TileError::TruncatedData(byte_len));
    }

    Ok(TileRef {
        left,
        bottom,
        resolution: codec::dimension_of(byte_len / size_of::<crate::Elev>()),
        path: Some(path.to_path_buf()),
    })
}

/// Lists the tiles in `dir`, sorted south to north then west to east.
///
/// Files whose names are not tile names are skipped. When both forms
/// of a tile are present the bare file wins.
pub fn scan_dir(dir: impl AsRef<Path>) -> Result<Vec<TileRef>, TileError> {
    let mut found: BTreeMap<(i32, i32), PathBuf> = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        let tile_ext = Path::new(file_name)
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(HGT_EXT) || ext.eq_ignore_ascii_case(ZIP_EXT));
        let Some((left, bottom)) = name::parse_name(file_name).filter(|_| tile_ext) else {
            continue;
        };
        found
            .entry((bottom, left))
            .and_modify(|prev| {
                if is_zip(prev) && !is_zip(&path) {
                    *prev = path.clone();
                }
            })
            .or_insert_with(|| path.clone());
    }
    found.into_values().map(probe).collect()
}
