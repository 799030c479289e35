// THEORY:
// A `FrameSource` is anything that can hand the ingest loop color frames: a
// camera driver, a network stream, a recorded session replayed from disk.
//
// "No frame right now" (`None`) is normal and does not mean the source is gone.
// The loop asks `is_open()` to tell the two apart. A live source that stays
// closed is a lost device. A finite source (a recording) that is closed has
// simply reached its end.

use crate::core_modules::frame::Frame;
use futures::{Stream, StreamExt};
use image::RgbImage;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub trait FrameSource: Send {
    /// Name used in logs and in the device-lost notification.
    fn id(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Whether running out of frames is the expected end of this source.
    fn is_finite(&self) -> bool {
        false
    }

    /// The next frame, or `None` if there is none available now.
    fn next_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;
}

/// Replays recorded images at a fixed frame interval, stamping each with the
/// time it is delivered.
#[derive(Debug)]
pub struct ReplaySource {
    id: String,
    frames: VecDeque<RgbImage>,
    interval: Duration,
    next_due: Option<Instant>,
}

impl ReplaySource {
    pub fn new(id: impl Into<String>, frames: impl IntoIterator<Item = RgbImage>, interval: Duration) -> Self {
        Self {
            id: id.into(),
            frames: frames.into_iter().collect(),
            interval,
            next_due: None,
        }
    }

    /// Frames per second is converted to an interval; zero means as fast as possible.
    pub fn with_fps(id: impl Into<String>, frames: impl IntoIterator<Item = RgbImage>, fps: f64) -> Self {
        let interval = if fps > 0.0 && fps.is_finite() {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };
        Self::new(id, frames, interval)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    fn is_finite(&self) -> bool {
        true
    }

    async fn next_frame(&mut self) -> Option<Frame> {
        let image = self.frames.pop_front()?;
        if let Some(due) = self.next_due {
            tokio::time::sleep_until(due).await;
        }
        let now = Instant::now();
        self.next_due = Some(now + self.interval);
        Some(Frame::new(image, now))
    }
}

/// Adapts any stream of frames. The source closes when the stream ends.
pub struct StreamSource<S> {
    id: String,
    stream: S,
    open: bool,
    finite: bool,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = Frame> + Unpin + Send,
{
    /// A live feed: the stream ending means the device went away.
    pub fn live(id: impl Into<String>, stream: S) -> Self {
        Self {
            id: id.into(),
            stream,
            open: true,
            finite: false,
        }
    }

    /// A recording: the stream ending is the end of the session.
    pub fn recorded(id: impl Into<String>, stream: S) -> Self {
        Self {
            finite: true,
            ..Self::live(id, stream)
        }
    }
}

impl<S> FrameSource for StreamSource<S>
where
    S: Stream<Item = Frame> + Unpin + Send,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_finite(&self) -> bool {
        self.finite
    }

    async fn next_frame(&mut self) -> Option<Frame> {
        if !self.open {
            return None;
        }
        let frame = self.stream.next().await;
        if frame.is_none() {
            log::debug!("stream for video source {} ended", self.id);
            self.open = false;
        }
        frame
    }
}
