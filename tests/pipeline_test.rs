use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use bucket_monitor::integration::ProcessedFrame;
use bucket_monitor::{
    ClassLabel, Config, Detection, Detector, DischargePhase, DisplaySettings, FrameSource,
    Pipeline, PipelineBuilder, PipelineError,
};
use image::{Rgb, RgbImage};

/// Endless source alternating between two shades so frames carry motion.
struct ShadeSource {
    count: u8,
}

impl FrameSource for ShadeSource {
    type Error = Infallible;

    fn read_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
        self.count = self.count.wrapping_add(1);
        let shade = if self.count % 2 == 0 { 0 } else { 200 };
        thread::sleep(Duration::from_millis(2));
        Ok(Some(RgbImage::from_pixel(32, 32, Rgb([shade; 3]))))
    }
}

struct BigBucket;

impl Detector for BigBucket {
    type Error = io::Error;

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
        Ok(vec![Detection::new(
            ClassLabel::Bucket,
            0.0,
            0.0,
            500.0,
            500.0,
            0.9,
        )])
    }
}

struct Broken;

impl Detector for Broken {
    type Error = io::Error;

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
        Err(io::Error::other("model unavailable"))
    }
}

/// Source that fails or comes back empty on two reads out of three.
struct FlakySource {
    reads: u32,
}

impl FrameSource for FlakySource {
    type Error = io::Error;

    fn read_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
        self.reads += 1;
        match self.reads % 3 {
            0 => Ok(Some(RgbImage::new(32, 32))),
            1 => Ok(None),
            _ => Err(io::Error::other("camera hiccup")),
        }
    }
}

/// Detector far slower than the source.
struct SlowBucket;

impl Detector for SlowBucket {
    type Error = io::Error;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
        thread::sleep(Duration::from_millis(30));
        BigBucket.detect(image)
    }
}

fn fast_backoff() -> Config {
    let mut config = Config::default();
    config.pipeline.source_error_backoff_ms = 1;
    config.pipeline.idle_backoff_ms = 1;
    config
}

fn wait_for_result(pipeline: &Pipeline) -> Arc<ProcessedFrame> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(result) = pipeline.latest() {
            return result;
        }
        assert!(Instant::now() < deadline, "no frame processed in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_pipeline_publishes_processed_frames() {
    let pipeline = Pipeline::spawn(Config::default(), ShadeSource { count: 0 }, BigBucket).unwrap();

    let result = wait_for_result(&pipeline);
    assert!(result.inferred);
    assert_eq!(result.phase, DischargePhase::Discharging);
    assert!(result.sequence_id >= 1);
    assert!(pipeline.is_running());

    let stats = pipeline.shutdown().unwrap();
    assert!(stats.processed >= 1);
    assert!(stats.captured >= stats.processed);
}

#[test]
fn test_detector_failure_stops_pipeline() {
    let pipeline = Pipeline::spawn(Config::default(), ShadeSource { count: 0 }, Broken).unwrap();

    let err = pipeline.join().unwrap_err();
    assert!(matches!(err, PipelineError::Detector(_)));
    assert!(err.to_string().contains("model unavailable"));
}

#[test]
fn test_closed_gate_skips_detection() {
    let pipeline = PipelineBuilder::new(Config::default())
        .gate(|_: &RgbImage| false)
        .spawn(ShadeSource { count: 0 }, BigBucket)
        .unwrap();

    let result = wait_for_result(&pipeline);
    assert!(!result.inferred);
    assert_eq!(result.phase, DischargePhase::Idle);
    assert_eq!(result.bucket_area, 0.0);
    pipeline.shutdown().unwrap();
}

#[test]
fn test_snapshot_sink_sees_captured_frames() {
    let offered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&offered);
    let pipeline = PipelineBuilder::new(Config::default())
        .snapshot_sink(move |_: &RgbImage, _motion: f32| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .spawn(ShadeSource { count: 0 }, BigBucket)
        .unwrap();

    wait_for_result(&pipeline);
    let stats = pipeline.shutdown().unwrap();
    assert_eq!(offered.load(Ordering::Relaxed) as u64, stats.captured);
}

#[test]
fn test_settings_apply_while_running() {
    let pipeline = Pipeline::spawn(Config::default(), ShadeSource { count: 0 }, BigBucket).unwrap();
    let settings = DisplaySettings {
        show_area_values: true,
        ..DisplaySettings::default()
    };
    pipeline.apply_settings(settings);
    assert_eq!(pipeline.settings(), settings);

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let result = wait_for_result(&pipeline);
        if !result.area_report.is_empty() {
            assert_eq!(result.area_report, vec!["Bucket #1: 250000".to_string()]);
            break;
        }
        assert!(Instant::now() < deadline, "settings never applied");
        thread::sleep(Duration::from_millis(5));
    }
    pipeline.shutdown().unwrap();
}

#[test]
fn test_invalid_config_rejected_before_spawn() {
    let mut config = Config::default();
    config.monitor.exit_area_threshold = config.monitor.enter_area_threshold + 1.0;
    let result = Pipeline::spawn(config, ShadeSource { count: 0 }, BigBucket);
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_source_errors_do_not_stop_capture() {
    let pipeline = Pipeline::spawn(fast_backoff(), FlakySource { reads: 0 }, BigBucket).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while pipeline.stats().processed < 3 {
        assert!(Instant::now() < deadline, "capture stalled after source errors");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(pipeline.is_running());

    let stats = pipeline.shutdown().unwrap();
    // Every good read is preceded by an empty and a failed one.
    assert!(stats.source_errors >= 2 * stats.captured);
}

#[test]
fn test_slow_detector_skips_stale_frames() {
    let pipeline = Pipeline::spawn(fast_backoff(), ShadeSource { count: 0 }, SlowBucket).unwrap();

    let mut seen: Vec<u64> = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.len() < 4 {
        assert!(Instant::now() < deadline, "too few frames processed");
        if let Some(result) = pipeline.latest() {
            if seen.last() != Some(&result.sequence_id) {
                seen.push(result.sequence_id);
            }
        }
        thread::sleep(Duration::from_millis(2));
    }

    let stats = pipeline.shutdown().unwrap();
    assert!(stats.overwritten > 0);
    assert!(stats.processed < stats.captured);
    assert!(seen.windows(2).all(|w| w[1] > w[0]));
    assert!(
        seen.windows(2).any(|w| w[1] > w[0] + 1),
        "no frame skipped: {seen:?}"
    );
}
