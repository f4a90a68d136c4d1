//! Face tracking crop filter driven from a camera or video file.

use anyhow::{Context, Result};
use clap::Parser;
use face_tracker::{
    backend::cv::{CascadeFaceDetector, KcfTracker, VideoInput, VideoSource},
    config::{Config, EXAMPLE_CONFIG},
    detector::spawn_detector,
    tracker::spawn_tracker,
    FaceTrackerFilter, RenderOutput, RenderSink,
};
use log::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Video file to process
    #[arg(short, long)]
    video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Haar cascade used for face detection
    #[arg(long, default_value = "assets/haarcascade_frontalface_default.xml")]
    cascade: String,

    /// Stop after this many frames (0 runs to the end of the input)
    #[arg(long, default_value = "0")]
    frames: u64,

    /// Frame rate to assume when the input does not report one
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Render the crop as a preview with debug overlays
    #[arg(long)]
    preview: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

/// Prints the crop of every rendered frame
#[derive(Default)]
struct PrintSink {
    frame: u64,
}

impl RenderSink for PrintSink {
    fn draw(&mut self, output: &RenderOutput) {
        let c = output.crop;
        println!("{} {} {} {} {}", self.frame, c.x0, c.y0, c.x1, c.y1);
        for overlay in &output.overlays {
            debug!("frame {} overlay {:?} {:?}", self.frame, overlay.kind, overlay.rect);
        }
        self.frame += 1;
    }

    fn skip(&mut self) {
        debug!("frame {} skipped", self.frame);
        self.frame += 1;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Face Tracker");

    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let input = if let Some(video_path) = args.video {
        VideoInput::File(video_path)
    } else {
        VideoInput::Camera(args.cam)
    };
    let mut source = VideoSource::open(&input)?;
    let fps = source.fps().unwrap_or(args.fps);
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("Invalid frame rate {fps}");
    }
    info!("Running at {:.2} fps", fps);

    let detector = CascadeFaceDetector::new(&args.cascade)
        .with_context(|| format!("Cannot load cascade {}", args.cascade))?;
    let detector = spawn_detector(Box::new(detector))?;
    let factory = Box::new(|| spawn_tracker(Box::new(KcfTracker::new())));

    let mut filter = FaceTrackerFilter::new(&config, detector, factory)?;
    if !args.preview {
        filter.activate();
    }

    #[allow(clippy::cast_possible_truncation)]
    let second = (1.0 / fps) as f32;
    let mut sink = PrintSink::default();
    let mut frames = 0u64;
    while source.advance()? {
        filter.tick(second, &mut source);
        filter.render(&mut sink);
        frames += 1;
        if args.frames > 0 && frames >= args.frames {
            break;
        }
    }

    info!(
        "Processed {} frames, {} trackers active, {} allocated",
        frames,
        filter.pool().active_len(),
        filter.pool().allocated()
    );
    filter.shutdown();

    Ok(())
}
