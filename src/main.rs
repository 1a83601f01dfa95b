//! Terrain-forge CLI - heightfield, skybox, mask and auto-paint tools.
//!
//! Converts zoned heightfields to and from editable rasters, projects
//! panoramas onto skybox cubes, generates transition masks and paints
//! material tiles from height and slope rules.

use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use terrain_forge::autopaint::{AutoPainter, MaskLibrary, PolylineSet, RuleSet, SlopeScale};
use terrain_forge::heightfield::{
    decode, decode_headerless, direct_raster_heights, encode_headerless, from_legacy_raster, load_legacy_raster,
    load_raster16, preview_image, read_header, save_legacy_png, save_raster16_png, to_direct_raster,
    to_legacy_raster, write_heightfield, zones_from_map_size, BitDepth, DecodeReport, DirectRasterOptions,
    HeightAdjustments, HeightfieldGrid, LegacyRasterOptions, HEADERLESS_ZONE_SIZE_LOG2, HEADER_MARKER,
};
use terrain_forge::mask::{write_pair, MaskParams, MaskStyle};
use terrain_forge::skybox::{
    cross_preview, export_skybox, preview, Interpolation, Panorama, ProjectionOptions, SkyboxExportOptions,
};

type CliResult = Result<(), Box<dyn Error>>;

/// Terrain asset toolkit.
#[derive(Parser)]
#[command(name = "terrain-forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a heightfield into an editable PNG.
    Hg2ToPng {
        /// Heightfield file to read.
        #[arg(short, long)]
        input: PathBuf,

        /// PNG file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Write the two-channel 8-bit legacy raster instead of 16-bit grey.
        #[arg(long)]
        legacy: bool,

        /// Legacy raster only: leave the low-bits channel empty.
        #[arg(long)]
        no_precision: bool,

        /// Rotate 90 degrees counter-clockwise for editing.
        #[arg(long)]
        rotate: bool,

        /// Stretch the height range to the full 16-bit range (lossy).
        #[arg(long)]
        normalize: bool,

        /// Input has no header; zone counts come from the map size.
        #[arg(long)]
        headerless: bool,

        /// Header-less map width in meters.
        #[arg(long, default_value = "10240")]
        map_width: f32,

        /// Header-less map depth in meters.
        #[arg(long, default_value = "10240")]
        map_depth: f32,

        /// Also write an 8-bit greyscale preview.
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Convert an edited PNG back into a heightfield.
    PngToHg2 {
        /// PNG file to read.
        #[arg(short, long)]
        input: PathBuf,

        /// Heightfield file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Zones across the map.
        #[arg(long, default_value = "8")]
        zones_wide: u16,

        /// Zones along the map.
        #[arg(long, default_value = "8")]
        zones_long: u16,

        /// Input is a two-channel 8-bit legacy raster.
        #[arg(long)]
        legacy: bool,

        /// Legacy raster only: ignore the low-bits channel.
        #[arg(long)]
        no_precision: bool,

        /// Undo the editing rotation (16-bit input only).
        #[arg(long)]
        rotate: bool,

        /// Height multiplier.
        #[arg(long, default_value = "1.0")]
        brightness: f32,

        /// Contrast around the middle of the 16-bit range.
        #[arg(long, default_value = "1.0")]
        contrast: f32,

        /// Gaussian smoothing sigma in pixels (0 = off).
        #[arg(long, default_value = "0.0")]
        smoothing: f32,

        /// Write the header-less 12-bit format (zone size 128).
        #[arg(long)]
        headerless: bool,

        /// Also write an 8-bit greyscale preview of the adjusted heights.
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Print the header of a heightfield file.
    Info {
        /// Heightfield file to inspect.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Project an equirectangular panorama onto six skybox faces.
    Skybox {
        /// Panorama image (2:1, or 4:1 with a mirrored lower half).
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "sky")]
        name: String,

        /// Face resolution in pixels.
        #[arg(short, long, default_value = "1024")]
        resolution: u32,

        /// Longitude offset in degrees.
        #[arg(long, default_value = "180")]
        rotation_deg: f64,

        /// Resampling filter.
        #[arg(long, default_value = "cubic")]
        interpolation: InterpolationArg,

        /// Skip the material file.
        #[arg(long)]
        no_material: bool,

        /// Skip the sky entry snippet.
        #[arg(long)]
        no_entry: bool,

        /// Also write a cross-layout preview image.
        #[arg(long)]
        cross: bool,

        /// Only write a low-resolution cross preview.
        #[arg(long)]
        preview_only: bool,
    },

    /// Generate a cap/diag pair of transition masks.
    Mask {
        /// Output directory.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "mask")]
        name: String,

        /// Mask style.
        #[arg(long, default_value = "blocky")]
        style: MaskStyleArg,

        /// Mask side length in pixels.
        #[arg(short, long, default_value = "512")]
        resolution: u32,

        /// Tooth depth as a fraction of the resolution.
        #[arg(long, default_value = "0.1")]
        depth: f64,

        /// Tooth count or noise frequency.
        #[arg(long, default_value = "12")]
        density: u32,

        /// Vertex offset noise in pixels, or noise influence in percent.
        #[arg(long, default_value = "0.0")]
        jitter: f64,

        /// Feather sigma in pixels.
        #[arg(long, default_value = "0.0")]
        feather: f32,

        /// Random seed for reproducible masks.
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Paint material tiles onto a heightfield from rules.
    Autopaint {
        /// Heightfield file to paint.
        #[arg(short, long)]
        input: PathBuf,

        /// Rule set (JSON).
        #[arg(long)]
        rules: PathBuf,

        /// Material tile file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Named polylines referenced by rule masks (JSON).
        #[arg(long)]
        polylines: Option<PathBuf>,

        /// Input has no header; zone counts come from the map size.
        #[arg(long)]
        headerless: bool,

        /// Header-less map width in meters.
        #[arg(long, default_value = "10240")]
        map_width: f32,

        /// Header-less map depth in meters.
        #[arg(long, default_value = "10240")]
        map_depth: f32,

        /// Override the vertex spacing used for slopes.
        #[arg(long)]
        slope_spacing: Option<f32>,

        /// Override the height per raster unit used for slopes.
        #[arg(long)]
        slope_vertical: Option<f32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InterpolationArg {
    /// Nearest pixel.
    Nearest,
    /// Bilinear.
    Linear,
    /// Bicubic (Catmull-Rom).
    Cubic,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Linear => Interpolation::Linear,
            InterpolationArg::Cubic => Interpolation::Cubic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MaskStyleArg {
    Blocky,
    Sawtooth,
    Interlocking,
    Sine,
    Stairs,
    Fractal,
    Clouds,
    Dither,
    Cellular,
    Plasma,
    Radial,
}

impl From<MaskStyleArg> for MaskStyle {
    fn from(arg: MaskStyleArg) -> Self {
        match arg {
            MaskStyleArg::Blocky => MaskStyle::Blocky,
            MaskStyleArg::Sawtooth => MaskStyle::Sawtooth,
            MaskStyleArg::Interlocking => MaskStyle::Interlocking,
            MaskStyleArg::Sine => MaskStyle::Sine,
            MaskStyleArg::Stairs => MaskStyle::Stairs,
            MaskStyleArg::Fractal => MaskStyle::Fractal,
            MaskStyleArg::Clouds => MaskStyle::Clouds,
            MaskStyleArg::Dither => MaskStyle::Dither,
            MaskStyleArg::Cellular => MaskStyle::Cellular,
            MaskStyleArg::Plasma => MaskStyle::Plasma,
            MaskStyleArg::Radial => MaskStyle::Radial,
        }
    }
}

fn main() {
    terrain_forge::logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hg2ToPng {
            input,
            output,
            legacy,
            no_precision,
            rotate,
            normalize,
            headerless,
            map_width,
            map_depth,
            preview,
        } => {
            let map_size = headerless.then_some((map_width, map_depth));
            if legacy {
                run_hg2_to_legacy_png(&input, &output, !no_precision, map_size, preview.as_deref())
            } else {
                let options = DirectRasterOptions {
                    rotate_for_editing: rotate,
                    normalize,
                };
                run_hg2_to_png(&input, &output, &options, map_size, preview.as_deref())
            }
        }
        Commands::PngToHg2 {
            input,
            output,
            zones_wide,
            zones_long,
            legacy,
            no_precision,
            rotate,
            brightness,
            contrast,
            smoothing,
            headerless,
            preview,
        } => {
            let adjustments = HeightAdjustments {
                brightness,
                contrast,
                smoothing,
            };
            let legacy = legacy.then_some(LegacyRasterOptions {
                precision: !no_precision,
            });
            run_png_to_hg2(
                &input,
                &output,
                zones_wide,
                zones_long,
                legacy.as_ref(),
                rotate,
                &adjustments,
                headerless,
                preview.as_deref(),
            )
        }
        Commands::Info { input } => run_info(&input),
        Commands::Skybox {
            input,
            output,
            name,
            resolution,
            rotation_deg,
            interpolation,
            no_material,
            no_entry,
            cross,
            preview_only,
        } => {
            let options = SkyboxExportOptions {
                projection: ProjectionOptions {
                    resolution,
                    rotation: rotation_deg.to_radians(),
                    interpolation: interpolation.into(),
                },
                material: !no_material,
                entry: !no_entry,
                cross_preview: cross,
            };
            run_skybox(&input, &output, &name, &options, preview_only)
        }
        Commands::Mask {
            output,
            name,
            style,
            resolution,
            depth,
            density,
            jitter,
            feather,
            seed,
        } => {
            let params = MaskParams {
                style: style.into(),
                resolution,
                depth,
                density,
                jitter,
                feather,
                seed: seed.unwrap_or_else(clock_seed),
            };
            run_mask(&params, &output, &name)
        }
        Commands::Autopaint {
            input,
            rules,
            output,
            polylines,
            headerless,
            map_width,
            map_depth,
            slope_spacing,
            slope_vertical,
        } => {
            let map_size = headerless.then_some((map_width, map_depth));
            run_autopaint(
                &input,
                &rules,
                &output,
                polylines.as_deref(),
                map_size,
                slope_spacing,
                slope_vertical,
            )
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Reads a versioned heightfield, or a header-less one when `map_size` is given.
fn load_heightfield(input: &Path, map_size: Option<(f32, f32)>) -> Result<HeightfieldGrid, Box<dyn Error>> {
    let bytes = std::fs::read(input)?;
    let (grid, report) = match map_size {
        Some((width_m, depth_m)) => {
            let (zones_wide, zones_long) = zones_from_map_size(width_m, depth_m);
            decode_headerless(&bytes, zones_wide, zones_long)?
        }
        None => decode(&bytes)?,
    };
    print_report(&report);
    Ok(grid)
}

fn print_report(report: &DecodeReport) {
    if report.is_clean() {
        return;
    }
    println!(
        "Warning: {} incomplete zone(s), {} sample(s) filled with zero",
        report.anomalies.len(),
        report.missing_samples()
    );
    for anomaly in &report.anomalies {
        println!(
            "  zone {}: {}/{} samples present",
            anomaly.zone_index, anomaly.present_samples, anomaly.expected_samples
        );
    }
}

fn save_preview(heights: &terrain_forge::Grid<f32>, path: &Path) -> CliResult {
    preview_image(heights).save(path)?;
    println!("Preview: {}", path.display());
    Ok(())
}

fn run_hg2_to_png(
    input: &Path,
    output: &Path,
    options: &DirectRasterOptions,
    map_size: Option<(f32, f32)>,
    preview: Option<&Path>,
) -> CliResult {
    let grid = load_heightfield(input, map_size)?;
    let layout = grid.layout();
    println!(
        "Heightfield: {}x{} ({}x{} zones of {})",
        grid.width(),
        grid.height(),
        layout.zones_wide,
        layout.zones_long,
        layout.zone_size()
    );

    let raster = to_direct_raster(&grid, options);
    save_raster16_png(&raster, output)?;
    println!("Wrote {}", output.display());

    if let Some(path) = preview {
        save_preview(&grid.to_raster_heights(), path)?;
    }
    Ok(())
}

fn run_hg2_to_legacy_png(
    input: &Path,
    output: &Path,
    precision: bool,
    map_size: Option<(f32, f32)>,
    preview: Option<&Path>,
) -> CliResult {
    let grid = load_heightfield(input, map_size)?;
    let raster = to_legacy_raster(&grid, &LegacyRasterOptions { precision });
    save_legacy_png(&raster, output)?;
    println!(
        "Wrote {} ({}x{}, precision channel {})",
        output.display(),
        raster.width(),
        raster.height(),
        if precision { "on" } else { "off" }
    );

    if let Some(path) = preview {
        save_preview(&grid.to_raster_heights(), path)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_png_to_hg2(
    input: &Path,
    output: &Path,
    zones_wide: u16,
    zones_long: u16,
    legacy: Option<&LegacyRasterOptions>,
    rotate: bool,
    adjustments: &HeightAdjustments,
    headerless: bool,
    preview: Option<&Path>,
) -> CliResult {
    let bit_depth = if headerless { BitDepth::Twelve } else { BitDepth::Thirteen };

    let grid = if let Some(legacy_options) = legacy {
        let raster = load_legacy_raster(input)?;
        let (zw, zl) = zone_counts(raster.width() as usize, raster.height() as usize, zones_wide, zones_long, headerless);
        let mut grid = from_legacy_raster(&raster, zw, zl, bit_depth, legacy_options)?;
        adjustments.apply_to_grid(&mut grid)?;
        grid
    } else {
        let raster = load_raster16(input)?;
        let options = DirectRasterOptions {
            rotate_for_editing: rotate,
            normalize: false,
        };
        let mut heights = direct_raster_heights(&raster, &options);
        adjustments.apply(&mut heights);
        let (zw, zl) = zone_counts(heights.width(), heights.height(), zones_wide, zones_long, headerless);
        HeightfieldGrid::from_raster_heights(&heights, zw, zl, bit_depth)?
    };

    if headerless {
        let bytes = encode_headerless(&grid)?;
        std::fs::write(output, &bytes)?;
        println!("Wrote {} ({} bytes, header-less)", output.display(), bytes.len());
    } else {
        let layout = grid.layout();
        write_heightfield(&grid, output, layout.zones_wide, layout.zones_long)?;
        println!(
            "Wrote {} ({}x{} zones of {})",
            output.display(),
            layout.zones_wide,
            layout.zones_long,
            layout.zone_size()
        );
    }

    if let Some(path) = preview {
        save_preview(&grid.to_raster_heights(), path)?;
    }
    Ok(())
}

/// Header-less files fix the zone size, so their zone counts follow the image.
fn zone_counts(width: usize, height: usize, zones_wide: u16, zones_long: u16, headerless: bool) -> (u16, u16) {
    if headerless {
        let zone = 1usize << HEADERLESS_ZONE_SIZE_LOG2;
        ((width / zone) as u16, (height / zone) as u16)
    } else {
        (zones_wide, zones_long)
    }
}

fn run_info(input: &Path) -> CliResult {
    let header = read_header(input)?;
    let zone_size = header.zone_size();

    println!("Heightfield Header");
    println!("==================");
    println!("File:       {}", input.display());
    println!("Version:    {}", header.version);
    println!("Zone size:  {} (2^{})", zone_size, header.zone_size_log2);
    println!("Zones:      {} x {}", header.zones_wide, header.zones_long);
    println!(
        "Samples:    {} x {}",
        zone_size * header.zones_wide as usize,
        zone_size * header.zones_long as usize
    );
    println!(
        "Marker:     {}{}",
        header.marker,
        if header.marker == HEADER_MARKER { "" } else { " (unexpected)" }
    );
    println!("Reserved:   {}", header.reserved);
    Ok(())
}

fn run_skybox(
    input: &Path,
    output: &Path,
    name: &str,
    options: &SkyboxExportOptions,
    preview_only: bool,
) -> CliResult {
    let panorama = Panorama::load(input)?;
    println!("Panorama: {}x{}", panorama.width(), panorama.height());

    let start = Instant::now();
    if preview_only {
        std::fs::create_dir_all(output)?;
        let faces = preview(&panorama)?;
        let path = output.join(format!("{}_preview.png", name));
        cross_preview(&faces).save(&path)?;
        println!("Preview written to {} in {:.2?}", path.display(), start.elapsed());
        return Ok(());
    }

    let summary = export_skybox(&panorama, output, name, options)?;
    println!("Exported in {:.2?}", start.elapsed());
    for path in summary
        .faces
        .iter()
        .chain(summary.material.iter())
        .chain(summary.entry.iter())
        .chain(summary.cross_preview.iter())
    {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_mask(params: &MaskParams, output: &Path, name: &str) -> CliResult {
    println!(
        "Mask: {:?}, {}px, depth {}, density {}, seed {}",
        params.style, params.resolution, params.depth, params.density, params.seed
    );
    let [cap, diag] = write_pair(params, output, name)?;
    println!("  {}", cap.display());
    println!("  {}", diag.display());
    Ok(())
}

fn run_autopaint(
    input: &Path,
    rules: &Path,
    output: &Path,
    polylines: Option<&Path>,
    map_size: Option<(f32, f32)>,
    slope_spacing: Option<f32>,
    slope_vertical: Option<f32>,
) -> CliResult {
    let grid = load_heightfield(input, map_size)?;
    let rule_set = RuleSet::load(rules)?;
    println!("Rules: {} from {}", rule_set.rules.len(), rules.display());

    let mut painter = AutoPainter::new(rule_set)?;
    if !painter.overlaps().is_empty() {
        println!("Overlapping rules: {} (later rules win)", painter.overlaps().len());
    }
    if let Some(path) = polylines {
        let library = MaskLibrary::from_set(PolylineSet::load(path)?);
        println!("Polylines: {} from {}", library.len(), path.display());
        painter = painter.with_library(library);
    }
    if slope_spacing.is_some() || slope_vertical.is_some() {
        let base = SlopeScale::for_zone_size(grid.layout().zone_size());
        painter = painter.with_slope_scale(SlopeScale {
            horizontal_spacing: slope_spacing.unwrap_or(base.horizontal_spacing),
            vertical_scale: slope_vertical.unwrap_or(base.vertical_scale),
        });
    }

    let start = Instant::now();
    let mut last_tenth = 0;
    let result = painter.run(&grid, output, |progress| {
        let tenth = (progress * 10.0) as u32;
        if tenth > last_tenth {
            last_tenth = tenth;
            println!("  {:>3}%", tenth * 10);
        }
    })?;

    let (lo, hi) = result.slopes.value_range();
    println!("Slope range: [{:.2}, {:.2}] degrees", lo, hi);
    println!(
        "Wrote {} ({}x{} tiles) in {:.2?}",
        output.display(),
        result.tiles.width(),
        result.tiles.height(),
        start.elapsed()
    );
    Ok(())
}
