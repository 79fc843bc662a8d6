//! Rolling finger-count history.
//!
//! Per-frame counts flicker when a finger sits near its threshold. The
//! smoother keeps the last N raw counts and reports their mode, so a single
//! outlier frame never changes the displayed count.

use std::collections::VecDeque;

/// Below this many samples the latest raw count is reported unchanged.
const MIN_SAMPLES_TO_SMOOTH: usize = 3;

const MAX_COUNT: usize = 5;

#[derive(Clone, Debug)]
pub struct CountSmoother {
    history: VecDeque<u8>,
    capacity: usize,
}

impl CountSmoother {
    /// `capacity` is clamped to at least one sample. The history grows on
    /// demand rather than reserving the whole window up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, count: u8) {
        let count = count.min(MAX_COUNT as u8);
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(count);
    }

    /// Pushes `count` and returns the smoothed value including it.
    pub fn update(&mut self, count: u8) -> u8 {
        self.push(count);
        self.smoothed().unwrap_or(count)
    }

    pub fn smoothed(&self) -> Option<u8> {
        let latest = *self.history.back()?;
        if self.history.len() < MIN_SAMPLES_TO_SMOOTH {
            return Some(latest);
        }

        let samples: Vec<u8> = self.history.iter().copied().collect();
        Some(mode_or_median(&samples))
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    fn history(&self) -> impl Iterator<Item = u8> + '_ {
        self.history.iter().copied()
    }
}

/// Most frequent value; when several values share the top frequency, the
/// lower median of the sorted samples.
///
/// `samples` must be non-empty and hold counts in `0..=5`.
fn mode_or_median(samples: &[u8]) -> u8 {
    let mut frequency = [0usize; MAX_COUNT + 1];
    for &count in samples {
        frequency[count as usize] += 1;
    }

    let top = frequency.iter().copied().max().unwrap_or(0);
    let mut leaders = frequency
        .iter()
        .enumerate()
        .filter(|(_, freq)| **freq == top && top > 0)
        .map(|(count, _)| count as u8);

    match (leaders.next(), leaders.next()) {
        (Some(mode), None) => mode,
        _ => lower_median(samples),
    }
}

fn lower_median(samples: &[u8]) -> u8 {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    sorted[(sorted.len() - 1) / 2]
}
