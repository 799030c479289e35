use anyhow::{Context, Result, anyhow};
use clap::Parser;
use image::{GrayImage, RgbImage};
use laser_vision::{
    DetectionConfig, DetectionControl, IngestConfig, IngestLoop, IngestSinks, LaserColor,
    ReplaySource, Shot, ThresholdListener,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory of recorded frames, replayed in file name order.
    input_dir: PathBuf,
    /// Replay rate of the recorded frames.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    /// Minimum time between detection cycles, in milliseconds.
    #[arg(long, default_value_t = 100)]
    cadence_ms: u64,
    /// Grayscale cutoff for bright pixels (1-255).
    #[arg(long, default_value_t = 230)]
    brightness: u8,
    /// Margin by which the laser channel must dominate the others.
    #[arg(long, default_value_t = 1.05)]
    color_diff: f64,
    /// Run of dark pixels that marks the edge of a flash.
    #[arg(long, default_value_t = 3)]
    border_width: u32,
    /// Flashes narrower and shorter than this are ignored.
    #[arg(long, default_value_t = 7)]
    min_dimension: u32,
    /// Number of past frames in the background window; 0 disables detection.
    #[arg(long, default_value_t = 10)]
    depth: usize,
    /// Skip shots of this color ("red" or "green").
    #[arg(long)]
    ignore_color: Option<LaserColor>,
    /// Upper bound on concurrent shot searches (defaults to the number of CPUs).
    #[arg(long)]
    searchers: Option<usize>,
    /// Write the foreground of every searched cycle here as PNG.
    #[arg(long)]
    preview_dir: Option<PathBuf>,
}

/// Writes every threshold preview it receives as a numbered PNG.
struct PreviewWriter {
    dir: PathBuf,
    written: u64,
}

impl ThresholdListener for PreviewWriter {
    fn update_threshold(&mut self, preview: &GrayImage) {
        let path = self.dir.join(format!("threshold_{:05}.png", self.written));
        match preview.save(&path) {
            Ok(()) => self.written += 1,
            Err(err) => log::warn!("could not write threshold preview {}: {}", path.display(), err),
        }
    }
}

fn load_frames(dir: &Path) -> Result<Vec<RgbImage>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|frame| frame.to_rgb8())
                .with_context(|| format!("loading frame {}", path.display()))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // --- 1. Configuration ---
    let detection = DetectionConfig {
        cadence: Duration::from_millis(args.cadence_ms),
        brightness_threshold: args.brightness,
        color_diff_threshold: args.color_diff,
        center_border_width: args.border_width,
        min_shot_dimension: args.min_dimension,
        accumulator_depth: args.depth,
        ignored_color: args.ignore_color,
        ..DetectionConfig::default()
    };
    let control = DetectionControl::new(detection).context("invalid detection settings")?;
    let mut ingest = IngestConfig::default();
    if let Some(searchers) = args.searchers {
        ingest.searcher_concurrency = searchers;
    }

    // --- 2. Recorded Frames ---
    let frames = load_frames(&args.input_dir)?;
    if frames.is_empty() {
        return Err(anyhow!("no frames found in {}", args.input_dir.display()));
    }
    log::info!("loaded {} frames from {}", frames.len(), args.input_dir.display());
    let source = ReplaySource::with_fps(args.input_dir.display().to_string(), frames, args.fps);

    // --- 3. Sinks ---
    let (shot_tx, mut shot_rx) = mpsc::unbounded_channel::<Shot>();
    let mut sinks = IngestSinks::new(Arc::new(shot_tx));
    if let Some(dir) = args.preview_dir {
        fs::create_dir_all(&dir).with_context(|| format!("creating preview directory {}", dir.display()))?;
        sinks = sinks.with_threshold_listener(PreviewWriter { dir, written: 0 });
    }

    let printer = tokio::spawn(async move {
        let mut shots = Vec::new();
        while let Some(shot) = shot_rx.recv().await {
            println!("cycle {:>5}: {} shot at ({:.1}, {:.1})", shot.cycle, shot.color, shot.x, shot.y);
            shots.push(shot);
        }
        shots
    });

    // --- 4. Replay ---
    let stopper = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupted; stopping replay");
            stopper.set_streaming(false);
        }
    });

    let summary = IngestLoop::new(source, control, sinks, ingest)
        .context("invalid ingest settings")?
        .run()
        .await?;

    // The pool is drained and the loop dropped its sender, so the printer finishes.
    let shots = printer.await.context("shot printer failed")?;
    let red = shots.iter().filter(|shot| shot.color == LaserColor::Red).count();
    log::info!(
        "{} frames, {} cycles, {} searches ({} dropped), {} shots ({} red, {} green)",
        summary.frames_seen,
        summary.cycles_run,
        summary.searches_submitted,
        summary.searches_dropped,
        shots.len(),
        red,
        shots.len() - red
    );
    Ok(())
}
