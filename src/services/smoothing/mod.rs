//! Noise smoothing for repeated observations.
//!
//! A [`ConfidenceWindow`] reports a value only once it dominates the recent history, which
//! keeps a single odd reading from flipping a downstream decision.

use std::{collections::VecDeque, hash::Hash};

/// Bounded history of the last `size` observations.
#[derive(Debug, Clone)]
pub struct ConfidenceWindow<T> {
	values: VecDeque<T>,
	size: usize,
	threshold: f64,
}

impl<T: Clone + Eq + Hash> ConfidenceWindow<T> {
	/// # Arguments
	/// * `size` - Observations kept; at least one
	/// * `threshold` - Share of the window the modal value must reach, in `0.0..=1.0`
	pub fn new(size: usize, threshold: f64) -> Self {
		let size = size.max(1);
		Self {
			values: VecDeque::with_capacity(size),
			size,
			threshold: threshold.clamp(0.0, 1.0),
		}
	}

	pub fn append(&mut self, value: T) {
		if self.values.len() == self.size {
			self.values.pop_front();
		}
		self.values.push_back(value);
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn clear(&mut self) {
		self.values.clear();
	}

	pub fn threshold(&self) -> f64 {
		self.threshold
	}

	/// Modal value with its share of the current window.
	///
	/// Ties go to the value that occurs first in the window.
	pub fn dominant(&self) -> Option<(&T, f64)> {
		let mut counts: Vec<(&T, usize)> = Vec::new();
		for value in &self.values {
			match counts.iter_mut().find(|(seen, _)| *seen == value) {
				Some((_, count)) => *count += 1,
				None => counts.push((value, 1)),
			}
		}

		let mut best: Option<(&T, usize)> = None;
		for (value, count) in counts {
			if best.map_or(true, |(_, best_count)| count > best_count) {
				best = Some((value, count));
			}
		}
		best.map(|(value, count)| (value, count as f64 / self.values.len() as f64))
	}

	/// Modal value, or `None` when empty or, with `require_threshold`, not dominant enough.
	pub fn most_common(&self, require_threshold: bool) -> Option<T> {
		let (value, share) = self.dominant()?;
		if require_threshold && share < self.threshold {
			return None;
		}
		Some(value.clone())
	}
}
