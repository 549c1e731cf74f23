use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use geoframes::config::{CameraProfile, CropBox, TransformOptions};
use geoframes::georect::rectify_batch;
use geoframes::io::{object_from_json, read_synced_frames, synced_frame_writer};
use geoframes::pipeline;
use geoframes::store::{build_store, StoreOptions};
use geoframes::sync::{synchronize, FileVideoOpener, Selection};
use geoframes::telemetry::{align, LogFormat};

#[derive(Parser)]
#[command(version, about, author)]
struct GeoframesCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract telemetry-tagged frames from drone videos
    ExtractFrames(ExtractFramesArgs),
    /// Write georeferenced GeoTIFFs for nadir frames of a synced-frame table
    Rectify(RectifyArgs),
    /// Pack the frames of a synced-frame table into an HDF5 store
    BuildStore(BuildStoreArgs),
}

#[derive(Args)]
struct ShapeArgs {
    /// output width in pixels
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// output height in pixels
    #[arg(long, requires = "width")]
    height: Option<u32>,
}

impl ShapeArgs {
    fn size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

#[derive(Args)]
struct ExtractFramesArgs {
    /// video files in recording order
    #[arg(long, num_args = 1.., required = true)]
    video_files: Vec<PathBuf>,

    /// flight logs in recording order
    #[arg(long, num_args = 1.., required = true)]
    flight_data: Vec<PathBuf>,

    /// directory receiving the extracted images
    #[arg(long)]
    frames_dir: PathBuf,

    /// synced-frame CSV table
    #[arg(long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "airdata-feet")]
    log_format: LogFormat,

    #[arg(long, value_enum, default_value = "all")]
    select: Selection,

    /// minimum spacing between emitted frames of the same video
    #[arg(long, default_value_t = 0)]
    min_time_gap_ms: i64,

    /// crop rectangle as x,y,width,height
    #[arg(long)]
    crop: Option<CropBox>,

    #[command(flatten)]
    shape: ShapeArgs,

    /// 1 for grayscale, 3 for color
    #[arg(long, default_value_t = 3)]
    channels: u8,

    /// camera description as JSON
    #[arg(long)]
    camera_profile: Option<PathBuf>,
}

#[derive(Args)]
struct RectifyArgs {
    #[arg(long)]
    synced_frames: PathBuf,

    #[arg(long)]
    output_dir: PathBuf,

    /// diagonal field of view in degrees; derived from the camera profile when omitted
    #[arg(long)]
    dfov: Option<f64>,

    #[arg(long)]
    camera_profile: Option<PathBuf>,

    /// directory that relative image paths in the table are resolved against
    #[arg(long)]
    images_root: Option<PathBuf>,
}

#[derive(Args)]
struct BuildStoreArgs {
    #[arg(long)]
    synced_frames: PathBuf,

    #[arg(long)]
    output: PathBuf,

    /// 1 stores grayscale arrays
    #[arg(long)]
    channels: Option<u8>,

    #[command(flatten)]
    shape: ShapeArgs,
}

fn load_camera_profile(path: Option<&Path>) -> Result<CameraProfile> {
    match path {
        Some(path) => object_from_json(path)
            .with_context(|| format!("loading camera profile {}", path.display())),
        None => Ok(CameraProfile::default()),
    }
}

fn extract_frames(args: ExtractFramesArgs) -> Result<()> {
    let camera = load_camera_profile(args.camera_profile.as_deref())?;
    let options = TransformOptions {
        crop: args.crop,
        channels: args.channels,
        size: args.shape.size(),
    };

    let segments = align(&args.flight_data, args.log_format, args.video_files.len())
        .context("aligning flight logs with videos")?;
    let frames = synchronize(
        FileVideoOpener,
        args.video_files,
        segments,
        camera,
        Some(args.select.selector()),
        args.min_time_gap_ms,
    );

    let mut writer = synced_frame_writer(&args.output)?;
    let persisted = pipeline::run(frames, &args.frames_dir, &mut writer, &options)
        .context("extracting frames")?;
    log::info!(
        "{} frames written to {}, table {}",
        persisted,
        args.frames_dir.display(),
        args.output.display()
    );
    Ok(())
}

fn rectify(args: RectifyArgs) -> Result<()> {
    let dfov = match args.dfov {
        Some(dfov) => dfov,
        None => load_camera_profile(args.camera_profile.as_deref())?.diagonal_fov_deg(),
    };
    if !(dfov > 0.0 && dfov < 180.0) {
        bail!("diagonal field of view must be in (0, 180) degrees, got {}", dfov);
    }
    log::debug!("diagonal field of view {:.3}°", dfov);

    let records = read_synced_frames(&args.synced_frames)?;
    let summary = rectify_batch(
        &records,
        &args.output_dir,
        dfov,
        args.images_root.as_deref(),
    )?;
    if summary.failed > 0 {
        log::warn!("{} of {} frames failed", summary.failed, records.len());
    }
    Ok(())
}

fn build_store_command(args: BuildStoreArgs) -> Result<()> {
    let options = StoreOptions {
        channels: args.channels,
        shape: args.shape.size(),
    };
    build_store(&args.synced_frames, &args.output, &options)
        .with_context(|| format!("building store {}", args.output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = GeoframesCli::parse();
    let now = Instant::now();
    match cli.command {
        Command::ExtractFrames(args) => extract_frames(args)?,
        Command::Rectify(args) => rectify(args)?,
        Command::BuildStore(args) => build_store_command(args)?,
    }
    log::info!("finished in {:.3} sec", now.elapsed().as_secs_f64());
    Ok(())
}
