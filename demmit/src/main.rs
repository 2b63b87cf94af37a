use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use hgtgrid::{
    slicer,
    store::{self, WriteOptions},
    SliceOptions, TileSlicer,
};
use log::{info, warn};
use std::fs;

/// An SRTM '.hgt' tile multitool.
#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: SubCmd,
}

#[derive(Clone, Debug, Subcommand)]
enum SubCmd {
    /// Print name, resolution and statistics of '.hgt' files as JSON.
    Info(InfoArgs),
    /// Render '.hgt' file as an image.
    Render(RenderArgs),
    /// Print the mosaic layout of a directory of tiles as JSON.
    Mosaic(MosaicArgs),
    /// Void everything in a tile outside a bounding box.
    Crop(CropArgs),
    /// Glue a directory of tiles together and slice it again.
    Repack(RepackArgs),
}

#[derive(Args, Clone, Debug)]
struct InfoArgs {
    /// Bare or zipped tiles.
    #[arg(required = true)]
    tiles: Vec<Utf8PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct RenderArgs {
    /// Source hgt file.
    src: Utf8PathBuf,

    /// Optional output file name.
    ///
    /// Image format will be based on `dest`'s extension.
    ///
    /// If not specified, a png will be written with the tile's
    /// basename in the tile's dir.
    dest: Option<Utf8PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct MosaicArgs {
    dir: Utf8PathBuf,
}

#[derive(Args, Clone, Debug)]
struct WriteArgs {
    /// Replace existing tiles.
    #[arg(long)]
    overwrite: bool,

    /// Write '.hgt.zip' archives.
    #[arg(long)]
    zipped: bool,
}

impl From<&WriteArgs> for WriteOptions {
    fn from(args: &WriteArgs) -> Self {
        Self {
            overwrite: args.overwrite,
            zipped: args.zipped,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct CropArgs {
    src: Utf8PathBuf,

    /// Directory to write the cropped tile to.
    dest: Utf8PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    min_lon: f64,
    #[arg(long, allow_hyphen_values = true)]
    min_lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    max_lon: f64,
    #[arg(long, allow_hyphen_values = true)]
    max_lat: f64,

    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args, Clone, Debug)]
struct RepackArgs {
    /// Directory of tiles to read.
    src: Utf8PathBuf,

    /// Directory to write tiles to.
    dest: Utf8PathBuf,

    /// JSON file of slicing options.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Drop tiles whose only valid samples lie on their outer ring.
    #[arg(long)]
    skip_near_empty: bool,

    #[command(flatten)]
    write: WriteArgs,
}

fn info(InfoArgs { tiles }: InfoArgs) -> Result<()> {
    let mut out = Vec::with_capacity(tiles.len());
    for path in tiles {
        let tile = store::read_tile(&path).with_context(|| format!("reading {path}"))?;
        out.push(serde_json::json!({
            "path": path.as_str(),
            "name": tile.name(),
            "resolution": tile.resolution(),
            "stats": tile.stats(),
            "valid": tile.stats().valid_count(tile.len()),
        }));
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn render(RenderArgs { src, dest }: RenderArgs) -> Result<()> {
    let tile = store::read_tile(&src)?;
    let mut out = match dest {
        Some(mut out) if out.is_dir() => {
            out.push(tile.name());
            out
        }
        Some(out) => out,
        None => src.with_file_name(tile.name()),
    };
    if out.extension().map_or(true, |ext| ext.eq_ignore_ascii_case("hgt")) {
        out.set_extension("png");
    }

    info!("writing to {out}");
    if let Some("png" | "tif" | "tiff") = out.extension() {
        tile.to_image::<u16>().save(&out)?;
    } else {
        tile.to_image::<u8>().save(&out)?;
    }
    Ok(())
}

fn mosaic(MosaicArgs { dir }: MosaicArgs) -> Result<()> {
    let tiles = store::scan_dir(&dir)?;
    if tiles.is_empty() {
        bail!("no tiles in {dir}");
    }
    let mosaics = hgtgrid::mosaic::plan(tiles);
    println!("{}", serde_json::to_string_pretty(&mosaics)?);
    Ok(())
}

fn crop(args: CropArgs) -> Result<()> {
    let mut tile = store::read_tile(&args.src)?;
    let retained =
        tile.discard_except_by_degrees(args.min_lon, args.min_lat, args.max_lon, args.max_lat);
    info!(
        "{}: kept {retained} of {} samples",
        tile.name(),
        tile.len()
    );
    let path = store::write_to_dir(&tile, &args.dest, (&args.write).into())?;
    info!("wrote {path:?}");
    Ok(())
}

fn repack(args: RepackArgs) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<SliceOptions>(&json)
                .with_context(|| format!("parsing {path}"))?
        }
        None => SliceOptions::default(),
    };
    options.skip_near_empty |= args.skip_near_empty;
    let slicer = TileSlicer::new(options)?;

    let tiles = store::scan_dir(&args.src)?
        .into_iter()
        .filter_map(|tile| tile.path)
        .map(store::read_tile)
        .collect::<Result<Vec<_>, _>>()?;
    fs::create_dir_all(&args.dest)?;

    for (mosaic, raster) in slicer::compose(&tiles)? {
        info!(
            "{}x{} mosaic at ({}, {})",
            mosaic.columns, mosaic.rows, mosaic.west, mosaic.north
        );
        let report = slicer.slice_to_dir(&raster, &args.dest, (&args.write).into())?;
        for (rect, err) in &report.failures {
            warn!("{rect}: {err}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        SubCmd::Info(args) => info(args),
        SubCmd::Render(args) => render(args),
        SubCmd::Mosaic(args) => mosaic(args),
        SubCmd::Crop(args) => crop(args),
        SubCmd::Repack(args) => repack(args),
    }
}
