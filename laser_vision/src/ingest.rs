// THEORY:
// The `IngestLoop` ties one frame source to one detector. It is the only place
// the engine waits on anything, and it only ever waits on the source.
//
// Per iteration:
// 1.  Stop if the operator switched streaming off.
// 2.  Reap searches that have finished since the last frame.
// 3.  Pull a frame. Every frame goes to the display sink, detection or not.
// 4.  Take one config snapshot and hand the frame to the `DetectionPipeline`.
// 5.  A ready cycle sends its foreground to the threshold listener and its
//     snapshot to the searcher pool, without waiting for the result.
//
// When the source has nothing to give:
// - still open: back off briefly and poll again;
// - closed and finite: the recording is over, finish normally;
// - closed and live: count a missed poll, and after `max_missed_polls` in a row
//   notify the device-lost sink once and return `DeviceError::Lost`.
//
// Either way out, the pool is drained first so accepted searches still report.

use crate::config::IngestConfig;
use crate::control::DetectionControl;
use crate::error::{ConfigError, DeviceError};
use crate::pipeline::{CycleOutcome, DetectionPipeline};
use crate::searcher_pool::{SearcherPool, Submission};
use crate::sinks::IngestSinks;
use crate::source::FrameSource;

/// Counters describing one finished ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub frames_seen: u64,
    pub cycles_run: u64,
    pub searches_submitted: u64,
    pub searches_dropped: u64,
}

/// Why a loop stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    StreamingStopped,
    EndOfStream,
}

pub struct IngestLoop<S: FrameSource> {
    source: S,
    control: DetectionControl,
    sinks: IngestSinks,
    config: IngestConfig,
    pipeline: DetectionPipeline,
    pool: SearcherPool,
    summary: IngestSummary,
    missed_polls: u32,
}

impl<S: FrameSource> IngestLoop<S> {
    pub fn new(
        source: S,
        control: DetectionControl,
        sinks: IngestSinks,
        config: IngestConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = DetectionPipeline::new(control.snapshot().accumulator_depth);
        let pool = SearcherPool::new(config.searcher_concurrency, sinks.shots.clone());
        Ok(Self {
            source,
            control,
            sinks,
            config,
            pipeline,
            pool,
            summary: IngestSummary::default(),
            missed_polls: 0,
        })
    }

    pub fn control(&self) -> &DetectionControl {
        &self.control
    }

    /// Runs until streaming is switched off, a finite source ends, or the
    /// source is lost.
    pub async fn run(mut self) -> Result<IngestSummary, DeviceError> {
        log::info!(
            "starting ingest from video source {} ({} shot searchers)",
            self.source.id(),
            self.pool.concurrency()
        );

        let exit = loop {
            if !self.control.is_streaming() {
                break Exit::StreamingStopped;
            }
            self.pool.reap();

            let Some(frame) = self.source.next_frame().await else {
                if self.source.is_open() {
                    tokio::time::sleep(self.config.idle_backoff).await;
                    continue;
                }
                if self.source.is_finite() {
                    break Exit::EndOfStream;
                }

                self.missed_polls += 1;
                if self.missed_polls >= self.config.max_missed_polls {
                    return Err(self.lose_device().await);
                }
                tokio::time::sleep(self.config.idle_backoff).await;
                continue;
            };
            self.missed_polls = 0;
            self.summary.frames_seen += 1;

            self.sinks.display.update_background(&frame);

            let config = self.control.snapshot();
            match self.pipeline.process(&frame, &config, self.control.is_detecting()) {
                CycleOutcome::Skipped => {}
                CycleOutcome::WarmingUp { cycle, collected, depth } => {
                    log::debug!("cycle {}: background model warming ({}/{})", cycle, collected, depth);
                }
                CycleOutcome::Ready(snapshot) => {
                    if let Some(listener) = self.sinks.threshold.as_mut() {
                        listener.update_threshold(&snapshot.foreground.to_image());
                    }
                    match self.pool.submit(snapshot) {
                        Submission::Accepted => self.summary.searches_submitted += 1,
                        Submission::Dropped => self.summary.searches_dropped += 1,
                    }
                }
            }
        };

        self.pool.drain().await;
        self.summary.cycles_run = self.pipeline.cycles_run();
        match exit {
            Exit::StreamingStopped => log::info!("streaming stopped for video source {}", self.source.id()),
            Exit::EndOfStream => log::info!("video source {} finished", self.source.id()),
        }
        log::info!("ingest summary: {:?}", self.summary);
        Ok(self.summary)
    }

    async fn lose_device(&mut self) -> DeviceError {
        let source_id = self.source.id().to_string();
        log::error!(
            "video source {} returned no frame {} times in a row while closed",
            source_id,
            self.missed_polls
        );
        self.pool.drain().await;
        self.sinks.device_lost.device_lost(&source_id);
        DeviceError::Lost { source_id }
    }
}
