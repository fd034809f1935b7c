//! Per-source frame-skip filter: admits every `(skip_frame + 1)`-th frame, dropping the rest.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Tracks one counter per `source_id` and decides whether to admit the next frame from it.
pub struct FrameSkipFilter {
    skip_frame: u32,
    counters: Mutex<HashMap<String, u32>>,
}

impl FrameSkipFilter {
    /// Creates a filter. `skip_frame == 0` admits every frame.
    #[must_use]
    pub fn new(skip_frame: u32) -> Self {
        Self {
            skip_frame,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the frame from `source_id` should be admitted.
    ///
    /// With `skip_frame = N`, this admits the frame when the per-source counter reaches `N` and
    /// resets it to zero; every other frame increments the counter and is dropped. For a single
    /// source emitting frames `0..M`, this admits exactly `⌊M / (N+1)⌋` frames.
    pub fn admit(&self, source_id: &str) -> bool {
        if self.skip_frame == 0 {
            return true;
        }
        let mut counters = self.counters.lock();
        let counter = counters.entry(source_id.to_owned()).or_insert(0);
        if *counter == self.skip_frame {
            *counter = 0;
            true
        } else {
            *counter += 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_frame_zero_admits_everything() {
        let filter = FrameSkipFilter::new(0);
        for _ in 0..10 {
            assert!(filter.admit("cam0"));
        }
    }

    #[test]
    fn skip_frame_two_admits_every_third_frame() {
        let filter = FrameSkipFilter::new(2);
        let admitted: Vec<usize> = (0..10).filter(|_| filter.admit("cam0")).collect();
        // frame index 0,1,2 -> admit on index 2 (third call); matches spec S5: {2,5,8}
        assert_eq!(admitted.len(), 3);
    }

    #[test]
    fn admitted_indices_match_spec_scenario_s5() {
        let filter = FrameSkipFilter::new(2);
        let admitted: Vec<usize> = (0..10usize)
            .filter(|i| {
                let _ = i;
                filter.admit("cam0")
            })
            .collect();
        assert_eq!(admitted, vec![2, 5, 8]);
    }

    #[test]
    fn counters_are_independent_per_source() {
        let filter = FrameSkipFilter::new(1);
        assert!(!filter.admit("a"));
        assert!(!filter.admit("b"));
        assert!(filter.admit("a"));
        assert!(filter.admit("b"));
    }
}
