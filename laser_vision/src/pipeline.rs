// THEORY:
// The `pipeline` module is the synchronous heart of detection. It owns the only
// mutable detection state in the engine (the background model, the time of the
// last cycle and the cycle counter) and decides, frame by frame, whether a cycle
// runs and what its searcher gets to see.
//
// Per frame:
// 1.  **Reconfigure**: A changed depth throws the window away (fresh warm-up).
//     This runs on every frame, even one that starts no cycle, so going through
//     depth 0 and back always costs a full warm-up.
// 2.  **Gate**: No cycle while detection is switched off, while the depth is zero,
//     or before `cadence` has elapsed since the last cycle.
// 3.  **Threshold**: Grayscale the frame and cut at the brightness threshold.
// 4.  **Background**: Feed the mask to the model; once ready it yields the
//     foreground, the pixels that just lit up.
// 5.  **Snapshot**: Package frame, foreground and config for a searcher.
//
// The first frame of a session always passes the cadence gate: there is no
// previous cycle to measure from. The first cycle does not wait one cadence
// after the stream starts; the warm-up simply begins one cadence earlier, and
// which flashes are found does not change.
//
// Nothing here blocks on a searcher. The pipeline only produces snapshots; who
// runs them is the ingest loop's business.

use crate::config::DetectionConfig;
use crate::core_modules::background_model::{BackgroundModel, ModelState};
use crate::core_modules::frame::Frame;
use crate::core_modules::mask::BinaryMask;
use crate::core_modules::thresholder::threshold_frame;

// Re-export key data structures for the public API.
pub use crate::core_modules::shot_searcher::SearchSnapshot;

/// What one frame amounted to.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// No cycle ran for this frame.
    Skipped,
    /// A cycle ran but the background model is still collecting its window.
    WarmingUp { cycle: u64, collected: usize, depth: usize },
    /// A cycle ran on a ready model and produced a searchable snapshot.
    Ready(SearchSnapshot),
}

/// The main, top-level struct for per-frame detection.
#[derive(Debug)]
pub struct DetectionPipeline {
    model: BackgroundModel,
    last_cycle: Option<tokio::time::Instant>,
    cycles: u64,
}

impl DetectionPipeline {
    pub fn new(depth: usize) -> Self {
        Self {
            model: BackgroundModel::new(depth),
            last_cycle: None,
            cycles: 0,
        }
    }

    pub fn model_state(&self) -> ModelState {
        self.model.state()
    }

    /// Cycles run so far, warm-up included.
    pub fn cycles_run(&self) -> u64 {
        self.cycles
    }

    pub fn process(
        &mut self,
        frame: &Frame,
        config: &DetectionConfig,
        detecting: bool,
    ) -> CycleOutcome {
        // Stage 1: Reconfigure
        self.model.reconfigure(config.accumulator_depth);

        // Stage 2: Gate
        if !detecting || !config.detection_enabled() {
            return CycleOutcome::Skipped;
        }
        let now = frame.captured_at();
        if let Some(last) = self.last_cycle {
            if now.saturating_duration_since(last) < config.cadence {
                return CycleOutcome::Skipped;
            }
        }
        self.last_cycle = Some(now);
        self.cycles += 1;
        let cycle = self.cycles;

        // Stage 3: Threshold
        let mask: BinaryMask = threshold_frame(frame, config.brightness_threshold);

        // Stage 4: Background
        let Some(foreground) = self.model.observe(mask) else {
            return match self.model.state() {
                ModelState::Warming { collected, depth } => CycleOutcome::WarmingUp { cycle, collected, depth },
                // The model reports ready on the cycle that completes its window.
                _ => CycleOutcome::WarmingUp {
                    cycle,
                    collected: self.model.depth(),
                    depth: self.model.depth(),
                },
            };
        };

        // Stage 5: Snapshot
        CycleOutcome::Ready(SearchSnapshot {
            cycle,
            frame: frame.shared_image(),
            foreground,
            config: config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::Duration;
    use tokio::time::Instant;

    fn frame_at(start: Instant, millis: u64, bright: bool) -> Frame {
        let image = RgbImage::from_fn(9, 9, |x, y| {
            if bright && x == 4 && y == 4 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });
        Frame::new(image, start + Duration::from_millis(millis))
    }

    fn config(depth: usize) -> DetectionConfig {
        DetectionConfig { accumulator_depth: depth, ..DetectionConfig::default() }
    }

    #[test]
    fn cadence_gates_cycles() {
        let start = Instant::now();
        let mut pipeline = DetectionPipeline::new(2);
        let config = config(2);

        assert!(matches!(pipeline.process(&frame_at(start, 0, false), &config, true), CycleOutcome::WarmingUp { cycle: 1, collected: 1, depth: 2 }));
        assert!(matches!(pipeline.process(&frame_at(start, 50, false), &config, true), CycleOutcome::Skipped));
        assert!(matches!(pipeline.process(&frame_at(start, 100, false), &config, true), CycleOutcome::WarmingUp { cycle: 2, collected: 2, depth: 2 }));
        assert_eq!(pipeline.model_state(), ModelState::Ready);

        match pipeline.process(&frame_at(start, 200, true), &config, true) {
            CycleOutcome::Ready(snapshot) => {
                assert_eq!(snapshot.cycle, 3);
                assert!(snapshot.foreground.is_on(4, 4));
                assert_eq!(snapshot.foreground.count_on(), 1);
            }
            other => panic!("expected a ready cycle, got {other:?}"),
        }
        assert_eq!(pipeline.cycles_run(), 3);
    }

    #[test]
    fn detecting_off_or_zero_depth_runs_nothing() {
        let start = Instant::now();
        let mut pipeline = DetectionPipeline::new(2);
        assert!(matches!(pipeline.process(&frame_at(start, 0, false), &config(2), false), CycleOutcome::Skipped));
        assert!(matches!(pipeline.process(&frame_at(start, 100, false), &config(0), true), CycleOutcome::Skipped));
        assert_eq!(pipeline.cycles_run(), 0);
    }

    #[test]
    fn passing_through_zero_depth_restarts_warm_up() {
        let start = Instant::now();
        let mut pipeline = DetectionPipeline::new(2);
        pipeline.process(&frame_at(start, 0, false), &config(2), true);
        pipeline.process(&frame_at(start, 100, false), &config(2), true);
        assert_eq!(pipeline.model_state(), ModelState::Ready);

        assert!(matches!(pipeline.process(&frame_at(start, 200, false), &config(0), true), CycleOutcome::Skipped));
        assert_eq!(pipeline.model_state(), ModelState::Disabled);

        let outcome = pipeline.process(&frame_at(start, 300, false), &config(2), true);
        assert!(matches!(outcome, CycleOutcome::WarmingUp { collected: 1, depth: 2, .. }), "{outcome:?}");
    }

    #[test]
    fn depth_change_restarts_warm_up() {
        let start = Instant::now();
        let mut pipeline = DetectionPipeline::new(1);
        pipeline.process(&frame_at(start, 0, false), &config(1), true);
        assert!(matches!(pipeline.process(&frame_at(start, 100, false), &config(1), true), CycleOutcome::Ready(_)));

        let outcome = pipeline.process(&frame_at(start, 200, false), &config(3), true);
        assert!(matches!(outcome, CycleOutcome::WarmingUp { collected: 1, depth: 3, .. }));
    }
}
