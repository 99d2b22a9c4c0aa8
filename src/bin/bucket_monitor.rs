//! Replay recorded detections through the discharge monitor.
//!
//! Input is JSON lines, one frame per line:
//!
//! ```text
//! {"frame": 1, "t": 0.033, "detections": [{"label": "bucket", "bbox": [0, 0, 450, 450], "confidence": 0.91}]}
//! ```
//!
//! `t` is seconds since the start of the recording and `bbox` is x1, y1, x2, y2
//! in frame pixels.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use bucket_monitor::integration::{IntoDetections, area_report};
use bucket_monitor::{ClassLabel, Config, Detection, DischargeEvent, FrameAnalyzer};
use clap::Parser;
use serde::Deserialize;
use tracing::{Level, debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay recorded bucket/teeth detections through the discharge monitor")]
struct Args {
    /// Recorded detections, one JSON object per line
    #[arg(short, long)]
    detections: PathBuf,

    /// JSON configuration; canonical thresholds when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print bucket and teeth areas for every frame
    #[arg(long)]
    show_areas: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct RecordedDetection {
    label: ClassLabel,
    bbox: [f32; 4],
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    frame: u64,
    t: f64,
    #[serde(default)]
    detections: Vec<RecordedDetection>,
}

impl IntoDetections for RecordedFrame {
    fn into_detections(self) -> Vec<Detection> {
        self.detections
            .into_iter()
            .map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                Detection::new(d.label, x1, y1, x2, y2, d.confidence)
            })
            .collect()
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Recording timestamp `t` seconds after `start`; `None` for negative,
/// non-finite or out-of-range values.
fn frame_instant(start: Instant, t: f64) -> Option<Instant> {
    Duration::try_from_secs_f64(t)
        .ok()
        .and_then(|offset| start.checked_add(offset))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config = load_config(args.config.as_ref())?;
    let mut analyzer = FrameAnalyzer::new(config.monitor, &config.pipeline)?;

    let file = File::open(&args.detections)
        .with_context(|| format!("opening {}", args.detections.display()))?;

    let start = Instant::now();
    let mut frames = 0u64;
    let mut discharges = 0u64;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let recorded: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", line_no + 1))?;
        let Some(now) = frame_instant(start, recorded.t) else {
            bail!("line {}: invalid timestamp {}", line_no + 1, recorded.t);
        };

        let frame = recorded.frame;
        let analysis = analyzer.analyze_at(now, &recorded.into_detections());
        frames += 1;

        if args.show_areas {
            for line in area_report(&analysis.association) {
                println!("frame {frame}: {line}");
            }
        }
        debug!(frame, teeth = analysis.teeth.len(), phase = ?analysis.phase, "replayed");

        if let Some(event) = analysis.event {
            if !matches!(event, DischargeEvent::Entered) {
                discharges += 1;
            }
            println!("frame {frame}: {event} ({})", analysis.health);
        }
    }

    info!(frames, discharges, "replay finished");
    println!("final health: {}", analyzer.monitor().health());
    Ok(())
}
