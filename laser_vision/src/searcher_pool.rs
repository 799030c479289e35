// THEORY:
// The `SearcherPool` runs shot searches off the ingest loop. Each accepted cycle
// becomes one blocking task on tokio's blocking thread pool, holding one permit
// of a `Semaphore` for as long as it runs.
//
// Ingestion never waits on a searcher. If every permit is taken when a cycle
// wants one, that cycle's search is dropped and counted instead. Finished tasks
// are reaped opportunistically (every frame) so the `JoinSet` does not grow, and
// a panicking search is logged and contained. When the loop ends the pool is
// drained so every accepted search gets to report.

use crate::core_modules::shot_searcher::{SearchSnapshot, shot_searcher};
use crate::sinks::ShotSink;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// Every searcher was busy; the snapshot was discarded. A flash in it is
    /// never reported, and since the background model has already taken in its
    /// mask, the same spot stays suppressed for the next `depth` cycles.
    Dropped,
}

pub struct SearcherPool {
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    sink: Arc<dyn ShotSink>,
    concurrency: usize,
}

impl SearcherPool {
    pub fn new(concurrency: usize, sink: Arc<dyn ShotSink>) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(concurrency)),
            tasks: JoinSet::new(),
            sink,
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Searches currently running or finished but not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Starts a search for `snapshot` if a searcher is free.
    pub fn submit(&mut self, snapshot: SearchSnapshot) -> Submission {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                log::warn!(
                    "all {} shot searchers busy; dropping search for cycle {}",
                    self.concurrency,
                    snapshot.cycle
                );
                return Submission::Dropped;
            }
        };

        let sink = Arc::clone(&self.sink);
        self.tasks.spawn_blocking(move || {
            let _permit = permit;
            if let Some(shot) = shot_searcher::find_shot(&snapshot) {
                log::info!(
                    "{} shot at ({:.1}, {:.1}) in cycle {}",
                    shot.color,
                    shot.x,
                    shot.y,
                    shot.cycle
                );
                sink.report_shot(shot);
            }
        });
        Submission::Accepted
    }

    /// Collects every search that has already finished, without waiting.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.tasks.try_join_next() {
            Self::log_outcome(result);
            reaped += 1;
        }
        reaped
    }

    /// Waits for every outstanding search to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            Self::log_outcome(result);
        }
    }

    fn log_outcome(result: Result<(), JoinError>) {
        if let Err(err) = result {
            if err.is_panic() {
                log::error!("shot searcher panicked: {err}");
            } else if !err.is_cancelled() {
                log::error!("shot searcher join error: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::core_modules::mask::BinaryMask;
    use crate::core_modules::shot::LaserColor;
    use crate::sinks::ShotLog;
    use image::{Rgb, RgbImage};

    fn snapshot(cycle: u64) -> SearchSnapshot {
        let frame = RgbImage::from_fn(30, 30, |x, y| {
            if (12..16).contains(&x) && (12..16).contains(&y) { Rgb([200, 90, 80]) } else { Rgb([0, 0, 0]) }
        });
        let foreground = BinaryMask::from_fn(30, 30, |x, y| (12..16).contains(&x) && (12..16).contains(&y));
        SearchSnapshot {
            cycle,
            frame: Arc::new(frame),
            foreground,
            config: DetectionConfig { min_shot_dimension: 0, ..DetectionConfig::default() },
        }
    }

    #[tokio::test]
    async fn accepted_searches_report_after_drain() {
        let log = Arc::new(ShotLog::new());
        let mut pool = SearcherPool::new(2, log.clone());

        assert_eq!(pool.submit(snapshot(1)), Submission::Accepted);
        pool.drain().await;
        assert_eq!(pool.submit(snapshot(2)), Submission::Accepted);
        pool.drain().await;

        let mut cycles: Vec<u64> = log.shots().iter().map(|s| s.cycle).collect();
        cycles.sort();
        assert_eq!(cycles, vec![1, 2]);
        assert!(log.shots().iter().all(|s| s.color == LaserColor::Red));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn saturated_pool_drops_instead_of_waiting() {
        let log = Arc::new(ShotLog::new());
        let mut pool = SearcherPool::new(1, log.clone());

        // Hold the only permit so the next submission finds the pool busy.
        let held = Arc::clone(&pool.permits).try_acquire_owned().unwrap();
        assert_eq!(pool.submit(snapshot(1)), Submission::Dropped);
        drop(held);

        assert_eq!(pool.submit(snapshot(2)), Submission::Accepted);
        pool.drain().await;
        assert_eq!(log.shots().len(), 1);
        assert_eq!(log.shots()[0].cycle, 2);
        // The dropped cycle held the same flash and is never searched later.
        assert!(log.shots().iter().all(|shot| shot.cycle != 1));
    }

    struct PanickingSink;

    impl ShotSink for PanickingSink {
        fn report_shot(&self, _shot: crate::core_modules::shot::Shot) {
            panic!("sink failure");
        }
    }

    #[tokio::test]
    async fn panicking_search_is_contained() {
        let mut pool = SearcherPool::new(1, Arc::new(PanickingSink));
        assert_eq!(pool.submit(snapshot(1)), Submission::Accepted);
        pool.drain().await;
        // The permit was released during unwinding.
        assert_eq!(pool.submit(snapshot(2)), Submission::Accepted);
        pool.drain().await;
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let pool = SearcherPool::new(0, Arc::new(ShotLog::new()));
        assert_eq!(pool.concurrency(), 1);
    }
}
