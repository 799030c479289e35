// THEORY:
// The `BackgroundModel` is the temporal memory of the detector. A laser flash is
// short; glare, lamps and reflections are not. The model remembers, for every
// pixel, how many of the last N bright/dark masks had that pixel on. A pixel is
// only "foreground" when it is on now and was off for the whole window.
//
// Key architectural principles:
// 1.  **Arena + Index**: The last N masks live in a fixed ring (`Vec` of masks plus
//     the index of the oldest one). Nothing is ever re-summed in steady state: each
//     cycle subtracts the evicted mask from the running sum and adds the new one.
// 2.  **Learning First**: Like any stateful analyzer it starts by gathering data.
//     While fewer than N masks have been seen the model is `Warming` and reports no
//     foreground at all.
// 3.  **Single Owner**: Only the ingest loop mutates the model. Searchers receive
//     the foreground mask it produces, never the model itself.

use crate::core_modules::mask::BinaryMask;

/// Where the model is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Depth is zero; detection is off.
    Disabled,
    /// Still collecting the first `depth` masks.
    Warming { collected: usize, depth: usize },
    /// A full window is available and every observation yields a foreground mask.
    Ready,
}

/// Per-pixel count of "on" occurrences across the retained masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatorGrid {
    width: u32,
    height: u32,
    counts: Vec<u16>,
}

impl AccumulatorGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counts: vec![0; width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.counts[y as usize * self.width as usize + x as usize]
    }

    /// Row-major counts, one per pixel.
    pub fn counts(&self) -> &[u16] {
        &self.counts
    }

    fn add(&mut self, mask: &BinaryMask) {
        for (count, &bit) in self.counts.iter_mut().zip(mask.bits()) {
            *count = count.saturating_add(bit as u16);
        }
    }

    fn subtract(&mut self, mask: &BinaryMask) {
        for (count, &bit) in self.counts.iter_mut().zip(mask.bits()) {
            *count = count.saturating_sub(bit as u16);
        }
    }
}

/// Rolling background model over the last `depth` threshold masks.
#[derive(Debug)]
pub struct BackgroundModel {
    depth: usize,
    /// The retained masks. Grows to `depth` while warming, then rotates in place.
    ring: Vec<BinaryMask>,
    /// Index of the oldest mask in `ring` once the model is ready.
    oldest: usize,
    accumulator: AccumulatorGrid,
    ready: bool,
}

impl BackgroundModel {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            ring: Vec::with_capacity(depth),
            oldest: 0,
            accumulator: AccumulatorGrid::new(0, 0),
            ready: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn state(&self) -> ModelState {
        if self.depth == 0 {
            ModelState::Disabled
        } else if self.ready {
            ModelState::Ready
        } else {
            ModelState::Warming {
                collected: self.ring.len(),
                depth: self.depth,
            }
        }
    }

    pub fn accumulator(&self) -> &AccumulatorGrid {
        &self.accumulator
    }

    /// Changes the window depth. Any change throws away the window and restarts
    /// warm-up; returns whether that happened.
    pub fn reconfigure(&mut self, depth: usize) -> bool {
        if depth == self.depth {
            return false;
        }
        log::debug!("accumulator depth changed {} -> {}; restarting warm-up", self.depth, depth);
        self.depth = depth;
        self.reset();
        true
    }

    /// Discards every retained mask and the running sum.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.ring.shrink_to(self.depth);
        self.oldest = 0;
        self.ready = false;
        let (width, height) = self.accumulator.dimensions();
        self.accumulator = AccumulatorGrid::new(width, height);
    }

    /// Feeds one threshold mask into the model.
    ///
    /// Returns the foreground mask (on now, off across the whole window) once the
    /// model is ready, and `None` while disabled or warming.
    pub fn observe(&mut self, mask: BinaryMask) -> Option<BinaryMask> {
        if self.depth == 0 {
            return None;
        }

        if mask.dimensions() != self.accumulator.dimensions() {
            if !self.ring.is_empty() {
                log::debug!(
                    "frame size changed {:?} -> {:?}; restarting warm-up",
                    self.accumulator.dimensions(),
                    mask.dimensions()
                );
            }
            self.ring.clear();
            self.oldest = 0;
            self.ready = false;
            self.accumulator = AccumulatorGrid::new(mask.width(), mask.height());
        }

        if !self.ready {
            self.accumulator.add(&mask);
            self.ring.push(mask);
            if self.ring.len() == self.depth {
                self.ready = true;
                self.oldest = 0;
                log::info!(
                    "finished initializing background model ({} frames in window): enabling shot detection",
                    self.depth
                );
            }
            return None;
        }

        // --- 1. Foreground Extraction ---
        let accumulator = &self.accumulator;
        let foreground = BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
            mask.is_on(x, y) && accumulator.get(x, y) == 0
        });

        // --- 2. Window Rotation ---
        self.accumulator.subtract(&self.ring[self.oldest]);
        self.accumulator.add(&mask);
        self.ring[self.oldest] = mask;
        self.oldest = (self.oldest + 1) % self.depth;

        Some(foreground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const W: u32 = 6;
    const H: u32 = 4;

    /// Deterministic pseudo-random masks so the invariant is checked on varied input.
    fn scrambled_mask(seed: u32) -> BinaryMask {
        BinaryMask::from_fn(W, H, |x, y| {
            let v = (x * 31 + y * 17 + seed * 13).wrapping_mul(2654435761);
            (v >> 7) % 3 == 0
        })
    }

    fn expected_counts(window: &VecDeque<BinaryMask>) -> Vec<u16> {
        let mut counts = vec![0u16; (W * H) as usize];
        for mask in window {
            for (count, &bit) in counts.iter_mut().zip(mask.bits()) {
                *count += bit as u16;
            }
        }
        counts
    }

    #[test]
    fn warms_up_for_exactly_depth_cycles() {
        for depth in 1..=5 {
            let mut model = BackgroundModel::new(depth);
            for cycle in 0..depth {
                assert_eq!(
                    model.state(),
                    ModelState::Warming { collected: cycle, depth }
                );
                assert!(model.observe(scrambled_mask(cycle as u32)).is_none());
            }
            assert_eq!(model.state(), ModelState::Ready);
            assert!(model.observe(scrambled_mask(99)).is_some());
        }
    }

    #[test]
    fn accumulator_tracks_the_last_depth_masks() {
        let depth = 4;
        let mut model = BackgroundModel::new(depth);
        let mut window = VecDeque::new();

        for cycle in 0..30u32 {
            let mask = scrambled_mask(cycle);
            window.push_back(mask.clone());
            if window.len() > depth {
                window.pop_front();
            }
            model.observe(mask);
            assert_eq!(
                model.accumulator().counts(),
                expected_counts(&window).as_slice(),
                "cycle {cycle}"
            );
        }
    }

    #[test]
    fn warm_up_masks_are_summed_as_they_arrive() {
        let mut model = BackgroundModel::new(3);
        let spot = BinaryMask::from_fn(W, H, |x, y| x == 1 && y == 1);
        model.observe(spot.clone());
        assert_eq!(model.accumulator().get(1, 1), 1);
        model.observe(spot);
        assert_eq!(model.accumulator().get(1, 1), 2);
        assert_eq!(model.state(), ModelState::Warming { collected: 2, depth: 3 });
    }

    #[test]
    fn foreground_is_new_brightness_only() {
        let depth = 3;
        let mut model = BackgroundModel::new(depth);
        // Pixel (0,0) glows constantly; (1,0) is always dark until the flash.
        let glow = BinaryMask::from_fn(W, H, |x, y| x == 0 && y == 0);
        for _ in 0..depth {
            model.observe(glow.clone());
        }

        let flash = BinaryMask::from_fn(W, H, |x, y| y == 0 && x <= 1);
        let foreground = model.observe(flash).expect("model is ready");
        assert!(!foreground.is_on(0, 0), "sustained glow must be suppressed");
        assert!(foreground.is_on(1, 0), "new flash must be foreground");
        assert_eq!(foreground.count_on(), 1);
    }

    #[test]
    fn flash_is_suppressed_while_it_remains_in_the_window() {
        let depth = 2;
        let mut model = BackgroundModel::new(depth);
        let dark = BinaryMask::empty(W, H);
        let flash = BinaryMask::from_fn(W, H, |x, y| x == 3 && y == 2);
        model.observe(dark.clone());
        model.observe(dark.clone());

        assert_eq!(model.observe(flash.clone()).map(|f| f.count_on()), Some(1));
        assert_eq!(model.observe(flash.clone()).map(|f| f.count_on()), Some(0));
        model.observe(dark.clone());
        model.observe(dark.clone());
        assert_eq!(model.observe(flash).map(|f| f.count_on()), Some(1));
    }

    #[test]
    fn depth_change_forces_fresh_warm_up() {
        let mut model = BackgroundModel::new(2);
        for seed in 0..5 {
            model.observe(scrambled_mask(seed));
        }
        assert_eq!(model.state(), ModelState::Ready);

        assert!(model.reconfigure(3));
        assert_eq!(model.state(), ModelState::Warming { collected: 0, depth: 3 });
        assert!(model.accumulator().counts().iter().all(|&c| c == 0));
        for seed in 0..3 {
            assert!(model.observe(scrambled_mask(seed)).is_none());
        }
        assert_eq!(model.state(), ModelState::Ready);
        assert!(!model.reconfigure(3));
    }

    #[test]
    fn zero_depth_disables_the_model() {
        let mut model = BackgroundModel::new(0);
        assert_eq!(model.state(), ModelState::Disabled);
        for seed in 0..10 {
            assert!(model.observe(scrambled_mask(seed)).is_none());
        }
        assert_eq!(model.state(), ModelState::Disabled);
    }

    #[test]
    fn frame_size_change_restarts_warm_up() {
        let mut model = BackgroundModel::new(1);
        model.observe(BinaryMask::empty(W, H));
        assert_eq!(model.state(), ModelState::Ready);

        assert!(model.observe(BinaryMask::empty(W + 1, H)).is_none());
        assert_eq!(model.state(), ModelState::Ready);
        assert_eq!(model.accumulator().dimensions(), (W + 1, H));
    }
}
