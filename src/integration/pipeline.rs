//! Capture and processing workers joined by single-slot mailboxes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::GrayImage;
use image::imageops::grayscale;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::config::{Config, ConfigError, DisplaySettings};
use crate::integration::collaborators::{ProcessingGate, SnapshotSink};
use crate::integration::detector::Detector;
use crate::integration::frame::{Frame, FrameSource, motion_score};
use crate::integration::mailbox::Mailbox;
use crate::integration::processor::{FrameProcessor, ProcessedFrame};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("detector failed: {0}")]
    Detector(#[source] BoxError),
    #[error("failed to spawn {worker} worker: {source}")]
    Spawn {
        worker: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}

/// Counters updated by the workers.
#[derive(Debug, Default)]
struct Counters {
    captured: AtomicU64,
    overwritten: AtomicU64,
    source_errors: AtomicU64,
    processed: AtomicU64,
}

/// Point-in-time copy of the worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames read from the source
    pub captured: u64,
    /// Frames replaced in the mailbox before the processing worker saw them
    pub overwritten: u64,
    /// Failed or empty source reads
    pub source_errors: u64,
    /// Frames run through the processor
    pub processed: u64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            captured: self.captured.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the workers and the [`Pipeline`] handle.
struct Shared {
    running: AtomicBool,
    frames: Mailbox<Frame>,
    results: Mailbox<Arc<ProcessedFrame>>,
    settings: RwLock<DisplaySettings>,
    counters: Counters,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn settings(&self) -> DisplaySettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder wiring optional collaborators into a [`Pipeline`].
pub struct PipelineBuilder {
    config: Config,
    snapshot_sink: Option<Box<dyn SnapshotSink>>,
    gate: Option<Box<dyn ProcessingGate>>,
}

impl PipelineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            snapshot_sink: None,
            gate: None,
        }
    }

    pub fn snapshot_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.snapshot_sink = Some(Box::new(sink));
        self
    }

    pub fn gate(mut self, gate: impl ProcessingGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Validate the configuration and start both workers.
    pub fn spawn<S, D>(self, source: S, detector: D) -> Result<Pipeline, PipelineError>
    where
        S: FrameSource + Send + 'static,
        D: Detector + Send + 'static,
        D::Error: std::error::Error + Send + Sync + 'static,
    {
        let Self {
            config,
            snapshot_sink,
            gate,
        } = self;
        config.validate()?;
        let processor = FrameProcessor::new(detector, config.monitor, &config.pipeline)?;

        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            frames: Mailbox::new(),
            results: Mailbox::new(),
            settings: RwLock::new(config.display),
            counters: Counters::default(),
        });

        let capture = CaptureWorker {
            source,
            snapshot_sink,
            shared: Arc::clone(&shared),
            fallback_fps: config.pipeline.fallback_fps,
            error_backoff: config.pipeline.source_error_backoff(),
        };
        let capture = thread::Builder::new()
            .name("bucket-capture".into())
            .spawn(move || capture.run())
            .map_err(|source| PipelineError::Spawn {
                worker: "capture",
                source,
            })?;

        let processing = ProcessingWorker {
            processor,
            gate,
            shared: Arc::clone(&shared),
            idle_backoff: config.pipeline.idle_backoff(),
        };
        let processing = match thread::Builder::new()
            .name("bucket-processing".into())
            .spawn(move || processing.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                shared.stop();
                if capture.join().is_err() {
                    error!("capture worker panicked");
                }
                return Err(PipelineError::Spawn {
                    worker: "processing",
                    source,
                });
            }
        };

        info!("pipeline started");
        Ok(Pipeline {
            shared,
            capture: Some(capture),
            processing: Some(processing),
        })
    }
}

/// Handle to the running capture and processing workers.
///
/// The display polls [`Pipeline::latest`] at its own cadence. Dropping the
/// handle stops and joins both workers.
pub struct Pipeline {
    shared: Arc<Shared>,
    capture: Option<JoinHandle<()>>,
    processing: Option<JoinHandle<Result<(), PipelineError>>>,
}

impl Pipeline {
    /// Start a pipeline without snapshot sink or processing gate.
    pub fn spawn<S, D>(config: Config, source: S, detector: D) -> Result<Self, PipelineError>
    where
        S: FrameSource + Send + 'static,
        D: Detector + Send + 'static,
        D::Error: std::error::Error + Send + Sync + 'static,
    {
        PipelineBuilder::new(config).spawn(source, detector)
    }

    /// The most recently published result, if any frame has been processed.
    pub fn latest(&self) -> Option<Arc<ProcessedFrame>> {
        self.shared.results.latest()
    }

    /// Replace the display settings; the next processed frame uses them.
    pub fn apply_settings(&self, settings: DisplaySettings) {
        *self
            .shared
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        debug!(?settings, "display settings applied");
    }

    pub fn settings(&self) -> DisplaySettings {
        self.shared.settings()
    }

    /// False once [`stop`](Self::stop) was called or a worker hit a fatal
    /// error.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.counters.snapshot()
    }

    /// Ask both workers to stop after their current iteration.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Wait for both workers to exit and report a detector failure, if any.
    ///
    /// Blocks until something calls [`stop`](Self::stop) or the processing
    /// worker fails.
    pub fn join(mut self) -> Result<PipelineStats, PipelineError> {
        self.join_workers()?;
        Ok(self.stats())
    }

    /// Stop and join.
    pub fn shutdown(self) -> Result<PipelineStats, PipelineError> {
        self.stop();
        self.join()
    }

    fn join_workers(&mut self) -> Result<(), PipelineError> {
        let processing = match self.processing.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("processing"))
                .and_then(|result| result),
            None => Ok(()),
        };
        // The processing worker clears the flag on failure; make sure the
        // capture loop sees it even after a panic.
        self.shared.stop();
        let capture = match self.capture.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("capture")),
            None => Ok(()),
        };
        info!(stats = ?self.stats(), "pipeline stopped");
        processing.and(capture)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.capture.is_some() || self.processing.is_some() {
            self.shared.stop();
            if let Err(e) = self.join_workers() {
                error!(error = %e, "pipeline stopped with error");
            }
        }
    }
}

/// Pacing for the capture loop: the source's own rate when it reports a sane
/// one, the configured fallback when it reports nonsense, none for live
/// sources or a rate with no representable interval.
fn frame_interval(fallback_fps: f64, nominal_fps: Option<f64>) -> Option<Duration> {
    let fps = nominal_fps.map(|fps| {
        if fps > 1.0 && fps <= 120.0 {
            fps
        } else {
            fallback_fps
        }
    })?;
    Duration::try_from_secs_f64(1.0 / fps).ok()
}

struct CaptureWorker<S> {
    source: S,
    snapshot_sink: Option<Box<dyn SnapshotSink>>,
    shared: Arc<Shared>,
    fallback_fps: f64,
    error_backoff: Duration,
}

impl<S: FrameSource> CaptureWorker<S> {
    fn run(mut self) {
        let interval = frame_interval(self.fallback_fps, self.source.nominal_fps());
        debug!(?interval, "capture worker started");

        let mut previous_gray: Option<GrayImage> = None;
        let mut sequence_id = 0u64;

        while self.shared.is_running() {
            let started = Instant::now();

            match self.source.read_frame() {
                Ok(Some(image)) => {
                    let gray = grayscale(&image);
                    let motion = previous_gray
                        .as_ref()
                        .map_or(0.0, |previous| motion_score(previous, &gray));
                    previous_gray = Some(gray);
                    sequence_id += 1;

                    if let Some(sink) = self.snapshot_sink.as_mut() {
                        sink.offer(&image, motion);
                    }

                    let frame = Frame {
                        image,
                        sequence_id,
                        captured_at: started,
                        motion_score: motion,
                    };
                    let counters = &self.shared.counters;
                    counters.captured.fetch_add(1, Ordering::Relaxed);
                    if self.shared.frames.publish(frame).is_some() {
                        counters.overwritten.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!(sequence_id, motion, "frame captured");
                }
                Ok(None) => {
                    self.shared
                        .counters
                        .source_errors
                        .fetch_add(1, Ordering::Relaxed);
                    trace!("source returned no frame");
                    thread::sleep(self.error_backoff);
                }
                Err(e) => {
                    self.shared
                        .counters
                        .source_errors
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "frame read failed");
                    thread::sleep(self.error_backoff);
                }
            }

            if let Some(rest) = interval
                .and_then(|interval| interval.checked_sub(started.elapsed()))
            {
                thread::sleep(rest);
            }
        }
        debug!(frames = sequence_id, "capture worker exiting");
    }
}

struct ProcessingWorker<D: Detector> {
    processor: FrameProcessor<D>,
    gate: Option<Box<dyn ProcessingGate>>,
    shared: Arc<Shared>,
    idle_backoff: Duration,
}

impl<D> ProcessingWorker<D>
where
    D: Detector,
    D::Error: std::error::Error + Send + Sync + 'static,
{
    fn run(mut self) -> Result<(), PipelineError> {
        debug!("processing worker started");
        while self.shared.is_running() {
            let Some(frame) = self.shared.frames.take() else {
                thread::sleep(self.idle_backoff);
                continue;
            };

            let settings = self.shared.settings();
            let infer = self
                .gate
                .as_mut()
                .is_none_or(|gate| gate.should_process(&frame.image));

            match self.processor.process(frame, &settings, infer) {
                Ok(result) => {
                    trace!(sequence_id = result.sequence_id, health = %result.health, "frame processed");
                    self.shared.results.publish(Arc::new(result));
                    self.shared
                        .counters
                        .processed
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!(error = %e, "detector failed, stopping pipeline");
                    self.shared.stop();
                    return Err(PipelineError::Detector(Box::new(e)));
                }
            }
        }
        debug!("processing worker exiting");
        Ok(())
    }
}
