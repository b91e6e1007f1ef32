use crate::{log2::dlog_2, SplitEngine};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

impl SplitEngine {
	/// Compute the entropy in bits of a class count histogram. An empty histogram has entropy 0.
	pub fn compute_info(&mut self, counts: &[usize]) -> f64 {
		let mut total = 0;
		let mut info = 0.0;
		for &count in counts {
			total += count;
			info -= count.to_f64().unwrap() * self.log2.dlog_2_int(count);
		}
		if total == 0 {
			return 0.0;
		}
		info / total.to_f64().unwrap() + self.log2.dlog_2_int(total)
	}

	/// Compute the entropy in bits of the branch sizes of a split. A split with no examples has split info 0.
	pub fn compute_split_info(&mut self, sizes: &[usize]) -> f64 {
		let mut total = 0;
		let mut info = 0.0;
		for &size in sizes {
			total += size;
			info -= size.to_f64().unwrap() * dlog_2(size.to_f64().unwrap());
		}
		if total == 0 {
			return 0.0;
		}
		info / total.to_f64().unwrap() + dlog_2(total.to_f64().unwrap())
	}

	/// Compute the information gain of a split. `counts` has one row per branch and one column per class.
	pub fn compute_gain(&mut self, counts: ArrayView2<usize>) -> f64 {
		let across_branches: Vec<usize> = counts.sum_axis(Axis(0)).to_vec();
		let mut total = 0;
		let mut weighted_info = 0.0;
		for row in counts.genrows() {
			let branch_total: usize = row.sum();
			total += branch_total;
			let row = row.to_vec();
			weighted_info += branch_total.to_f64().unwrap() * self.compute_info(&row);
		}
		let info = self.compute_info(&across_branches);
		if total == 0 {
			return info;
		}
		info - weighted_info / total.to_f64().unwrap()
	}

	/// Compute the average Hellinger distance over every pair of classes that both have examples. Returns 0 if there is no such pair.
	pub fn compute_hellinger(&self, counts: ArrayView2<usize>) -> f64 {
		let class_totals = counts.sum_axis(Axis(0));
		let n_classes = class_totals.len();
		let mut sum = 0.0;
		let mut n_pairs = 0;
		for a in 0..n_classes {
			for b in a + 1..n_classes {
				if class_totals[a] != 0 && class_totals[b] != 0 {
					sum += compute_hellinger_for_pair(counts, a, b);
					n_pairs += 1;
				}
			}
		}
		if n_pairs == 0 {
			0.0
		} else {
			sum / n_pairs.to_f64().unwrap()
		}
	}
}

/// Compute the Hellinger distance between the distributions of classes `a` and `b` across the branches of a split.
pub fn compute_hellinger_for_pair(counts: ArrayView2<usize>, a: usize, b: usize) -> f64 {
	let total_a: usize = counts.column(a).sum();
	let total_b: usize = counts.column(b).sum();
	if total_a == 0 || total_b == 0 {
		return 0.0;
	}
	let total_a = total_a.to_f64().unwrap();
	let total_b = total_b.to_f64().unwrap();
	counts
		.genrows()
		.into_iter()
		.map(|row| {
			let p_a = (row[a].to_f64().unwrap() / total_a).sqrt();
			let p_b = (row[b].to_f64().unwrap() / total_b).sqrt();
			(p_a - p_b).powi(2)
		})
		.sum::<f64>()
		.sqrt()
}

#[test]
fn test_compute_info() {
	let mut engine = SplitEngine::new();
	assert!((engine.compute_info(&[25, 25, 25, 25]) - 2.0).abs() < 1e-12);
	assert!((engine.compute_info(&[10, 10]) - 1.0).abs() < 1e-12);
	assert_eq!(engine.compute_info(&[10, 0]), 0.0);
	assert_eq!(engine.compute_info(&[0, 0, 0]), 0.0);
}

#[test]
fn test_compute_split_info() {
	let mut engine = SplitEngine::new();
	assert!((engine.compute_split_info(&[200, 100, 50, 25, 25]) - 1.875).abs() < 1e-12);
	assert_eq!(engine.compute_split_info(&[]), 0.0);
}

#[test]
fn test_compute_gain_uniform_is_zero() {
	let mut engine = SplitEngine::new();
	let counts = Array2::from_elem((4, 3), 100);
	assert_eq!(engine.compute_gain(counts.view()), 0.0);
}

#[test]
fn test_compute_gain_pure_split() {
	let mut engine = SplitEngine::new();
	let counts = arr2(&[[5, 0], [0, 5]]);
	assert!((engine.compute_gain(counts.view()) - 1.0).abs() < 1e-12);
}

#[test]
fn test_compute_hellinger() {
	let engine = SplitEngine::new();
	// Perfectly separated classes are at the maximum distance sqrt(2).
	let counts = arr2(&[[5, 0], [0, 5]]);
	assert!((engine.compute_hellinger(counts.view()) - 2.0f64.sqrt()).abs() < 1e-12);
	// Identical distributions are at distance 0.
	let counts = arr2(&[[3, 6], [1, 2]]);
	assert!(engine.compute_hellinger(counts.view()).abs() < 1e-12);
	// A class with no examples is skipped.
	let counts = arr2(&[[5, 0, 0], [0, 5, 0]]);
	assert!((engine.compute_hellinger(counts.view()) - 2.0f64.sqrt()).abs() < 1e-12);
	let counts = arr2(&[[5, 0], [3, 0]]);
	assert_eq!(engine.compute_hellinger(counts.view()), 0.0);
}
