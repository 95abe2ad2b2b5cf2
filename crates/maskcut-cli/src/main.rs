//! maskcut: command-line front end for the masking engine.
//!
//! Segments an image, applies region selections and brush strokes, and
//! writes the resulting cutout and/or mask as PNG. Per-stage segmentation
//! diagnostics are printed to stdout. Useful for:
//!
//! - Batch cutouts driven by a recorded stroke script
//! - Tuning segmentation parameters against real images
//! - Inspecting which regions the segmenter proposes (`--overlay-output`)
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin maskcut -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use maskcut_engine::{
    MaskSettings, Point, RgbaImage, SegmentationOutcome, Segmenter, SegmenterConfig, Session,
    StrokeTool,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Interactive-style image masking from the command line.
///
/// Proposes regions by color clustering, toggles the regions under the
/// given points, replays brush strokes, and exports the masked image.
#[derive(Parser)]
#[command(name = "maskcut", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Write the cutout (source with mask-scaled alpha) as PNG.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write the mask as grayscale PNG.
    #[arg(long)]
    mask_output: Option<PathBuf>,

    /// Write the tinted region/stroke overlay as PNG.
    #[arg(long)]
    overlay_output: Option<PathBuf>,

    /// Toggle the region under `X,Y` (image pixels). Repeatable.
    #[arg(long = "select", value_name = "X,Y", value_parser = parse_point)]
    selections: Vec<Point>,

    /// JSON file of strokes to replay, each committed as one edit:
    /// `[{"tool": "add", "points": [[x, y], ...]}, ...]`.
    #[arg(long)]
    strokes: Option<PathBuf>,

    /// Undo this many edits after replaying selections and strokes.
    #[arg(long, default_value_t = 0)]
    undo: usize,

    /// Brush width in image pixels for strokes without their own size.
    #[arg(long, default_value_t = MaskSettings::DEFAULT_PEN_SIZE)]
    pen_size: f64,

    /// Grow selected regions and add strokes (shrink subtract strokes).
    #[arg(long, default_value_t = MaskSettings::DEFAULT_BORDER_SIZE)]
    border_size: f64,

    /// Gaussian blur sigma applied to the final mask.
    #[arg(long, default_value_t = MaskSettings::DEFAULT_FEATHER)]
    feather: f64,

    /// Complement the final mask.
    #[arg(long)]
    invert: bool,

    /// Full mask settings as a JSON string (overrides the flags above).
    #[arg(long)]
    settings_json: Option<String>,

    /// Working resolution (max dimension in pixels after downsampling).
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_WORKING_RESOLUTION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    working_resolution: u32,

    /// Number of k-means color clusters.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_CLUSTER_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    clusters: usize,

    /// k-means iterations.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    iterations: usize,

    /// Minimum region size as a fraction of the working grid.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_MIN_COMPONENT_FRACTION)]
    min_component_fraction: f64,

    /// Minimum boundary point spacing in pixels.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Full segmenter config as a JSON string.
    ///
    /// When provided, all other segmenter parameter flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Seed for k-means initialization (random when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// One entry of a `--strokes` script.
#[derive(Debug, Deserialize)]
struct ScriptStroke {
    tool: StrokeTool,
    points: Vec<[f64; 2]>,
    /// Overrides the pen size for this stroke only.
    #[serde(default)]
    pen_size: Option<f64>,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Point::new(x, y))
}

/// Build a [`SegmenterConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<SegmenterConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        SegmenterConfig {
            working_resolution: cli.working_resolution,
            cluster_count: cli.clusters,
            iterations: cli.iterations,
            min_component_fraction: cli.min_component_fraction,
            simplify_tolerance: cli.simplify_tolerance,
            ..SegmenterConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Build [`MaskSettings`] from CLI arguments, clamped to their ranges.
fn settings_from_cli(cli: &Cli) -> Result<MaskSettings, String> {
    let settings = if let Some(ref json) = cli.settings_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --settings-json: {e}"))?
    } else {
        MaskSettings {
            pen_size: cli.pen_size,
            border_size: cli.border_size,
            feather: cli.feather,
            invert_mask: cli.invert,
        }
    };
    Ok(settings.clamped())
}

fn read_strokes(path: &Path) -> Result<Vec<ScriptStroke>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

/// Load and segment `image`, printing diagnostics.
fn load(
    session: &mut Session,
    image: RgbaImage,
    segmenter: &mut Segmenter,
    json: bool,
) -> Result<(), String> {
    let job = session.begin_load(image);
    let result = segmenter.segment_staged(job.image());
    let result = match result {
        Ok((staged, diagnostics)) => {
            if json {
                let text = serde_json::to_string_pretty(&diagnostics)
                    .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
                println!("{text}");
            } else {
                println!("{}", diagnostics.report());
            }
            Ok(staged.segments)
        }
        Err(e) => Err(e),
    };

    // A failed segmentation still leaves a usable session with no
    // regions, so it is reported but not fatal.
    if let Err(e) = session.finish_load(SegmentationOutcome {
        generation: job.generation(),
        result,
    }) {
        tracing::warn!("{e}");
    }
    Ok(())
}

fn apply_edits(session: &mut Session, cli: &Cli) -> Result<(), String> {
    for &point in &cli.selections {
        match session.toggle_at(point).map_err(|e| e.to_string())? {
            Some(id) => tracing::info!(%id, x = point.x, y = point.y, "toggled region"),
            None => tracing::warn!(x = point.x, y = point.y, "no region under point"),
        }
    }

    if let Some(ref path) = cli.strokes {
        let default_pen = session.settings().pen_size;
        for stroke in read_strokes(path)? {
            session.set_pen_size(stroke.pen_size.unwrap_or(default_pen));
            let points: Vec<Point> = stroke.points.iter().map(|&[x, y]| Point::new(x, y)).collect();
            if session
                .commit_stroke(points, stroke.tool)
                .map_err(|e| e.to_string())?
                .is_none()
            {
                tracing::warn!(tool = %stroke.tool, "skipping stroke with fewer than 2 points");
            }
        }
        session.set_pen_size(default_pen);
    }

    for _ in 0..cli.undo {
        if !session.undo().map_err(|e| e.to_string())? {
            tracing::warn!("nothing left to undo");
            break;
        }
    }
    Ok(())
}

fn write_png(path: &Path, bytes: &[u8], what: &str) -> Result<(), String> {
    std::fs::write(path, bytes)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    eprintln!("{what} written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn write_outputs(session: &Session, cli: &Cli) -> Result<(), String> {
    if let Some(ref path) = cli.output
        && let Some(cutout) = session.export()
    {
        let png = maskcut_export::encode_cutout_png(&cutout).map_err(|e| e.to_string())?;
        write_png(path, &png, "Cutout")?;
    }
    if let Some(ref path) = cli.mask_output
        && let Some(mask) = session.mask()
    {
        let png = maskcut_export::encode_mask_png(&mask).map_err(|e| e.to_string())?;
        write_png(path, &png, "Mask")?;
    }
    if let Some(ref path) = cli.overlay_output
        && let Some(overlay) = session.overlay()
    {
        let png = maskcut_export::encode_cutout_png(&overlay).map_err(|e| e.to_string())?;
        write_png(path, &png, "Overlay")?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let settings = settings_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    let image = maskcut_export::decode_rgba(&image_bytes).map_err(|e| e.to_string())?;
    tracing::info!(
        path = %cli.image_path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );

    let mut segmenter = match cli.seed {
        Some(seed) => Segmenter::seeded(config, seed),
        None => Segmenter::new(config),
    };

    let mut session = Session::new();
    session.set_settings(settings);
    load(&mut session, image, &mut segmenter, cli.json)?;
    apply_edits(&mut session, cli)?;

    let snapshot = session.snapshot();
    tracing::info!(
        regions = snapshot.segments.len(),
        selected = snapshot.selected_count(),
        strokes = snapshot.manual_paths.len(),
        "edits applied"
    );

    write_outputs(&session, cli)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("maskcut").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parse_point_accepts_spaces() {
        let p = parse_point("12.5, 7").unwrap();
        assert!((p.x - 12.5).abs() < f64::EPSILON);
        assert!((p.y - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_point_rejects_garbage() {
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let cli = cli(&["in.png"]);
        assert_eq!(config_from_cli(&cli).unwrap(), SegmenterConfig::default());
        assert_eq!(settings_from_cli(&cli).unwrap(), MaskSettings::default());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = cli(&["in.png", "--clusters", "3", "--config-json", r#"{"cluster_count": 5}"#]);
        assert_eq!(config_from_cli(&cli).unwrap().cluster_count, 5);
    }

    #[test]
    fn invalid_config_json_is_reported() {
        let cli = cli(&["in.png", "--config-json", r#"{"min_component_fraction": 2.0}"#]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn settings_flags_are_clamped() {
        let cli = cli(&["in.png", "--pen-size", "500", "--invert"]);
        let settings = settings_from_cli(&cli).unwrap();
        assert!((settings.pen_size - MaskSettings::MAX_PEN_SIZE).abs() < f64::EPSILON);
        assert!(settings.invert_mask);
    }

    #[test]
    fn repeated_select_collects_points() {
        let cli = cli(&["in.png", "--select", "1,2", "--select", "3,4"]);
        assert_eq!(cli.selections.len(), 2);
        assert!((cli.selections[1].y - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn script_stroke_parses() {
        let strokes: Vec<ScriptStroke> = serde_json::from_str(
            r#"[{"tool": "subtract", "points": [[1, 2], [3, 4]], "pen_size": 5}]"#,
        )
        .unwrap();
        assert_eq!(strokes[0].tool, StrokeTool::Subtract);
        assert_eq!(strokes[0].points.len(), 2);
        assert!((strokes[0].pen_size.unwrap() - 5.0).abs() < f64::EPSILON);
    }
}
