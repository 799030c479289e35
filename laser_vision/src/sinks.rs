// THEORY:
// The detector talks to the outside world through four narrow interfaces. None of
// them returns anything: the detector fires and forgets, and a slow or failing
// consumer is the consumer's problem.
//
// - `ShotSink` receives shots. Searchers run on blocking worker threads and may
//   finish out of order, so it must be shareable across threads.
// - `DisplaySink` receives every frame, detection or not, so a viewer stays live.
// - `ThresholdListener` receives the bright-pixel preview of each cycle.
// - `DeviceLostNotifier` hears about a lost source exactly once.

use crate::core_modules::frame::Frame;
use crate::core_modules::shot::Shot;
use image::GrayImage;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub trait ShotSink: Send + Sync + 'static {
    fn report_shot(&self, shot: Shot);
}

pub trait DisplaySink: Send {
    fn update_background(&mut self, frame: &Frame);
}

pub trait ThresholdListener: Send {
    fn update_threshold(&mut self, preview: &GrayImage);
}

pub trait DeviceLostNotifier: Send {
    fn device_lost(&mut self, source_id: &str);
}

impl ShotSink for mpsc::UnboundedSender<Shot> {
    fn report_shot(&self, shot: Shot) {
        if self.send(shot).is_err() {
            log::warn!("shot receiver dropped; discarding {} shot from cycle {}", shot.color, shot.cycle);
        }
    }
}

impl<T: ShotSink + ?Sized> ShotSink for Arc<T> {
    fn report_shot(&self, shot: Shot) {
        (**self).report_shot(shot)
    }
}

/// Keeps every reported shot in memory.
#[derive(Debug, Default)]
pub struct ShotLog {
    shots: Mutex<Vec<Shot>>,
}

impl ShotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shots in the order they were reported.
    pub fn shots(&self) -> Vec<Shot> {
        match self.shots.lock() {
            Ok(shots) => shots.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ShotSink for ShotLog {
    fn report_shot(&self, shot: Shot) {
        match self.shots.lock() {
            Ok(mut shots) => shots.push(shot),
            Err(poisoned) => poisoned.into_inner().push(shot),
        }
    }
}

/// Discards whatever it is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl DisplaySink for Discard {
    fn update_background(&mut self, _frame: &Frame) {}
}

impl ThresholdListener for Discard {
    fn update_threshold(&mut self, _preview: &GrayImage) {}
}

impl DeviceLostNotifier for Discard {
    fn device_lost(&mut self, _source_id: &str) {}
}

/// Logs a lost device at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeviceLost;

impl DeviceLostNotifier for LogDeviceLost {
    fn device_lost(&mut self, source_id: &str) {
        log::error!("can no longer communicate with video source {}; was it unplugged?", source_id);
    }
}

/// Every consumer one ingest loop reports to.
pub struct IngestSinks {
    pub shots: Arc<dyn ShotSink>,
    pub display: Box<dyn DisplaySink>,
    pub threshold: Option<Box<dyn ThresholdListener>>,
    pub device_lost: Box<dyn DeviceLostNotifier>,
}

impl IngestSinks {
    /// Reports shots to `shots` and drops everything else.
    pub fn new(shots: Arc<dyn ShotSink>) -> Self {
        Self {
            shots,
            display: Box::new(Discard),
            threshold: None,
            device_lost: Box::new(LogDeviceLost),
        }
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_threshold_listener(mut self, listener: impl ThresholdListener + 'static) -> Self {
        self.threshold = Some(Box::new(listener));
        self
    }

    pub fn with_device_lost(mut self, notifier: impl DeviceLostNotifier + 'static) -> Self {
        self.device_lost = Box::new(notifier);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::shot::LaserColor;

    fn shot(cycle: u64) -> Shot {
        Shot { color: LaserColor::Green, x: 1.0, y: 2.0, cycle }
    }

    #[test]
    fn shot_log_keeps_report_order() {
        let log = Arc::new(ShotLog::new());
        let sink: Arc<dyn ShotSink> = log.clone();
        sink.report_shot(shot(3));
        sink.report_shot(shot(1));
        assert_eq!(log.shots().iter().map(|s| s.cycle).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn channel_sink_forwards_and_survives_closed_receiver() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        sender.report_shot(shot(5));
        assert_eq!(receiver.try_recv().unwrap(), shot(5));
        drop(receiver);
        sender.report_shot(shot(6));
    }
}
