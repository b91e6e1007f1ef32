use crate::{log2::dlog_2, AttributeSplit, SplitCriterion, SplitEngine, SplitOptions};
use copse_dataset::{AttributeType, Subset};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::Rng;

/// Per-class example counts for each distinct value of a continuous attribute within the subset's `[low, high]` bounds.
struct AttributeValueCounts {
	/// (n_distinct_values, n_classes)
	counts: Array2<usize>,
	/// The number of examples with each distinct value.
	totals: Vec<usize>,
	low: usize,
}

impl AttributeValueCounts {
	fn compute(subset: &Subset, attribute_index: usize) -> AttributeValueCounts {
		let low = subset.low[attribute_index];
		let high = subset.high[attribute_index];
		let n_distinct_values = high - low + 1;
		let mut counts = Array2::zeros((n_distinct_values, subset.n_classes()));
		let mut totals = vec![0; n_distinct_values];
		for example in subset.examples.iter() {
			let value = example.distinct_values[attribute_index];
			if value >= low && value <= high {
				counts[(value - low, example.class)] += 1;
				totals[value - low] += 1;
			}
		}
		AttributeValueCounts {
			counts,
			totals,
			low,
		}
	}

	fn n_distinct_values(&self) -> usize {
		self.totals.len()
	}

	/// Visit each boundary between adjacent nonempty distinct values from left to right. `f` receives the bucket indexes on either side of the boundary and the per-class counts of the left and right sides as a (2, n_classes) array.
	fn for_each_boundary<F>(&self, mut f: F)
	where
		F: FnMut(usize, usize, ArrayView2<usize>),
	{
		let n = self.n_distinct_values();
		if n < 2 {
			return;
		}
		let mut sides = Array2::<usize>::zeros((2, self.counts.ncols()));
		sides.row_mut(1).assign(&self.counts.sum_axis(Axis(0)));
		let mut i = 0;
		while self.totals[i] == 0 && i < n - 2 {
			i += 1;
		}
		while i < n - 1 {
			let mut j = i + 1;
			while self.totals[j] == 0 && j < n - 1 {
				j += 1;
			}
			if self.totals[j] != 0 {
				let bucket = self.counts.row(i).to_owned();
				{
					let mut left = sides.row_mut(0);
					left += &bucket;
				}
				{
					let mut right = sides.row_mut(1);
					right -= &bucket;
				}
				f(i, j, sides.view());
			}
			i = j;
		}
	}

	/// Find the boundaries that leave at least `min_split` examples on each side, the candidates for a randomized cut.
	fn random_cut_candidates(&self, min_split: usize) -> Vec<(usize, usize)> {
		let n = self.n_distinct_values();
		let total: usize = self.totals.iter().sum();
		let mut candidates = Vec::new();
		let mut below = 0;
		for i in 0..n.saturating_sub(1) {
			below += self.totals[i];
			if self.totals[i] == 0 {
				continue;
			}
			let mut j = i + 1;
			while self.totals[j] == 0 && j < n - 1 {
				j += 1;
			}
			let above = total - self.totals[..j].iter().sum::<usize>();
			if below >= min_split && above >= min_split {
				candidates.push((i, j));
			}
		}
		candidates
	}
}

fn side_sizes(sides: ArrayView2<usize>) -> [usize; 2] {
	[sides.row(0).sum(), sides.row(1).sum()]
}

impl SplitEngine {
	/**
	Score the best split of the attribute at `attribute_index` of `subset`. Returns `None` if the attribute has no admissible split under the options, for example because every boundary leaves fewer than the minimum number of examples on one side, or because the attribute is discrete and an ancestor already split on it.

	`rng` is only drawn from by the randomized criteria.
	*/
	pub fn evaluate_best_split<R>(
		&mut self,
		subset: &Subset,
		attribute_index: usize,
		options: &SplitOptions,
		rng: &mut R,
	) -> Option<AttributeSplit>
	where
		R: Rng + ?Sized,
	{
		let min_split = options.min_examples_per_split(subset);
		let split = match subset.attribute_type(attribute_index) {
			AttributeType::Continuous => {
				let counts = AttributeValueCounts::compute(subset, attribute_index);
				if counts.n_distinct_values() < 2 {
					return None;
				}
				match options.criterion {
					SplitCriterion::InfoGain | SplitCriterion::GainRatio => {
						self.best_continuous_gain(&counts, options.criterion, min_split)
					}
					SplitCriterion::C45 | SplitCriterion::Hellinger => self
						.best_continuous_penalized(
							&counts,
							options.criterion,
							min_split,
							subset.n_examples(),
							options.split_on_zero_gain,
						),
					SplitCriterion::ExtremelyRandom | SplitCriterion::TotallyRandom => self
						.random_continuous_cut(
							subset,
							attribute_index,
							&counts,
							options.criterion,
							min_split,
							rng,
						),
				}
			}
			AttributeType::Discrete => {
				self.discrete_split(subset, attribute_index, options.criterion, min_split, rng)
			}
		};
		split.filter(|split| split.score.is_finite())
	}

	fn best_continuous_gain(
		&mut self,
		counts: &AttributeValueCounts,
		criterion: SplitCriterion,
		min_split: usize,
	) -> Option<AttributeSplit> {
		let mut best: Option<AttributeSplit> = None;
		counts.for_each_boundary(|i, j, sides| {
			let sizes = side_sizes(sides);
			if sizes[0] < min_split || sizes[1] < min_split {
				return;
			}
			let mut score = self.compute_gain(sides);
			if criterion == SplitCriterion::GainRatio {
				score /= self.compute_split_info(&sizes);
			}
			if score > best.as_ref().map_or(f64::MIN, |best| best.score) {
				best = Some(AttributeSplit {
					score,
					boundary: Some((i + counts.low, j + counts.low)),
					cut_threshold: None,
				});
			}
		});
		best
	}

	/// C45 and Hellinger keep the boundary with the best raw measure, then subtract `log2(n_candidates) / n_examples` from it.
	fn best_continuous_penalized(
		&mut self,
		counts: &AttributeValueCounts,
		criterion: SplitCriterion,
		min_split: usize,
		n_examples: usize,
		split_on_zero_gain: bool,
	) -> Option<AttributeSplit> {
		let mut best: Option<(f64, f64, (usize, usize))> = None;
		let mut n_candidates = 0usize;
		counts.for_each_boundary(|i, j, sides| {
			let sizes = side_sizes(sides);
			if sizes[0] < min_split || sizes[1] < min_split {
				return;
			}
			let measure = match criterion {
				SplitCriterion::Hellinger => self.compute_hellinger(sides),
				_ => self.compute_gain(sides),
			};
			if measure > best.map_or(f64::MIN, |best| best.0) {
				let divisor = match criterion {
					SplitCriterion::Hellinger => 2.0f64.sqrt(),
					_ => self.compute_split_info(&sizes),
				};
				best = Some((measure, divisor, (i + counts.low, j + counts.low)));
			}
			n_candidates += 1;
		});
		let (measure, divisor, boundary) = best?;
		let measure = measure
			- self.log2.dlog_2_int(n_candidates) / n_examples.to_f64().unwrap();
		if measure > 0.0 || split_on_zero_gain {
			Some(AttributeSplit {
				score: measure / divisor,
				boundary: Some(boundary),
				cut_threshold: None,
			})
		} else {
			None
		}
	}

	/// ERT and TRT draw a uniform cut between the extreme candidate values and split at the candidate boundary containing it.
	fn random_continuous_cut<R>(
		&mut self,
		subset: &Subset,
		attribute_index: usize,
		counts: &AttributeValueCounts,
		criterion: SplitCriterion,
		min_split: usize,
		rng: &mut R,
	) -> Option<AttributeSplit>
	where
		R: Rng + ?Sized,
	{
		let candidates = counts.random_cut_candidates(min_split);
		let (first, last) = (*candidates.first()?, *candidates.last()?);
		let random_score = if criterion == SplitCriterion::TotallyRandom {
			Some(rng.gen::<f64>())
		} else {
			None
		};
		let value = |bucket: usize| subset.value(attribute_index, bucket + counts.low);
		let min_value = value(first.0);
		let max_value = value(last.1);
		let cut = min_value + rng.gen::<f32>() * (max_value - min_value);
		let (low, high) = candidates
			.iter()
			.cloned()
			.find(|&(low, high)| value(low) <= cut && value(high) >= cut)
			.unwrap_or(last);
		let score = match random_score {
			Some(score) => score,
			None => {
				let mut sides = Array2::<usize>::zeros((2, counts.counts.ncols()));
				sides
					.row_mut(0)
					.assign(&counts.counts.slice(s![..low + 1, ..]).sum_axis(Axis(0)));
				sides
					.row_mut(1)
					.assign(&counts.counts.slice(s![low + 1.., ..]).sum_axis(Axis(0)));
				let sizes = side_sizes(sides.view());
				let gain = self.compute_gain(sides.view())
					- dlog_2(candidates.len().to_f64().unwrap())
						/ subset.n_examples().to_f64().unwrap();
				gain / self.compute_split_info(&sizes)
			}
		};
		Some(AttributeSplit {
			score,
			boundary: Some((low + counts.low, high + counts.low)),
			cut_threshold: Some(cut),
		})
	}

	/// Discrete attributes split into one branch per level. The split is admissible only if no branch holds more than `n_examples - min_split` examples.
	fn discrete_split<R>(
		&mut self,
		subset: &Subset,
		attribute_index: usize,
		criterion: SplitCriterion,
		min_split: usize,
		rng: &mut R,
	) -> Option<AttributeSplit>
	where
		R: Rng + ?Sized,
	{
		if subset.discrete_used[attribute_index] {
			return None;
		}
		let arity = subset.metadata.n_discrete_values[attribute_index];
		let mut counts = Array2::zeros((arity, subset.n_classes()));
		for example in subset.examples.iter() {
			counts[(example.distinct_values[attribute_index], example.class)] += 1;
		}
		let sizes: Vec<usize> = counts.sum_axis(Axis(1)).to_vec();
		let max_size = sizes.iter().cloned().max().unwrap_or(0);
		if max_size + min_split > subset.n_examples() {
			return None;
		}
		let score = match criterion {
			SplitCriterion::InfoGain => self.compute_gain(counts.view()),
			SplitCriterion::GainRatio | SplitCriterion::C45 | SplitCriterion::ExtremelyRandom => {
				self.compute_gain(counts.view()) / self.compute_split_info(&sizes)
			}
			SplitCriterion::Hellinger => self.compute_hellinger(counts.view()) / 2.0f64.sqrt(),
			SplitCriterion::TotallyRandom => rng.gen::<f64>(),
		};
		Some(AttributeSplit {
			score,
			boundary: None,
			cut_threshold: None,
		})
	}
}

#[cfg(test)]
pub(crate) fn fixture() -> Subset {
	use copse_dataset::{Example, Metadata};
	let metadata = Metadata {
		n_classes: 2,
		attribute_types: vec![AttributeType::Continuous, AttributeType::Discrete],
		n_discrete_values: vec![0, 3],
		n_examples_per_class: vec![],
	};
	let value_tables = vec![(0..10).map(|v| v as f32).collect(), vec![]];
	let classes = [0, 0, 0, 0, 1, 0, 1, 1, 1, 1];
	let examples = classes
		.iter()
		.enumerate()
		.map(|(i, &class)| Example::new(vec![i, i % 3], class))
		.collect();
	Subset::new(metadata, value_tables, examples)
}

#[cfg(test)]
fn options(criterion: SplitCriterion, min_examples_per_split: usize) -> SplitOptions {
	SplitOptions {
		criterion,
		min_examples_per_split,
		..Default::default()
	}
}

#[cfg(test)]
fn rng(seed: u64) -> rand_xoshiro::Xoshiro256Plus {
	rand::SeedableRng::seed_from_u64(seed)
}

#[test]
fn test_c45_min_split_1() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::C45, 1), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((3, 4)));
	let gain = engine.compute_gain(arr2(&[[4, 0], [1, 5]]).view());
	let split_info = engine.compute_split_info(&[4, 6]);
	let expected = (gain - dlog_2(9.0) / 10.0) / split_info;
	assert!((split.score - expected).abs() < 1e-12);
}

#[test]
fn test_c45_min_split_5() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::C45, 5), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((4, 5)));
	let gain = engine.compute_gain(arr2(&[[4, 1], [1, 4]]).view());
	assert!((split.score - gain).abs() < 1e-12);
}

#[test]
fn test_info_gain_boundaries() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::InfoGain, 1), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((3, 4)));
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::InfoGain, 5), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((4, 5)));
	assert_eq!(
		engine.evaluate_best_split(&subset, 0, &options(SplitCriterion::InfoGain, 6), &mut rng(0)),
		None
	);
}

#[test]
fn test_gain_ratio() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::GainRatio, 2), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((3, 4)));
	assert!((split.score - 0.62824).abs() < 1e-5);
}

#[test]
fn test_hellinger() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 0, &options(SplitCriterion::Hellinger, 1), &mut rng(0))
		.unwrap();
	assert!(split.boundary == Some((3, 4)) || split.boundary == Some((5, 6)));
	let expected = (1.05146 - dlog_2(9.0) / 10.0) / 2.0f64.sqrt();
	assert!((split.score - expected).abs() < 1e-5);
}

#[test]
fn test_selected_split_respects_min_split() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	for &criterion in &[
		SplitCriterion::InfoGain,
		SplitCriterion::GainRatio,
		SplitCriterion::C45,
		SplitCriterion::Hellinger,
		SplitCriterion::ExtremelyRandom,
		SplitCriterion::TotallyRandom,
	] {
		for min_split in 1..=5 {
			let split = engine
				.evaluate_best_split(&subset, 0, &options(criterion, min_split), &mut rng(7))
				.unwrap();
			let (low, high) = split.boundary.unwrap();
			assert!(low < high);
			let left = subset
				.examples
				.iter()
				.filter(|example| example.distinct_values[0] <= low)
				.count();
			let right = subset.n_examples() - left;
			assert!(left.min(right) >= min_split, "{:?} {}", criterion, min_split);
		}
	}
}

#[test]
fn test_random_cut_falls_in_boundary() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	for seed in 0..50 {
		let split = engine
			.evaluate_best_split(
				&subset,
				0,
				&options(SplitCriterion::ExtremelyRandom, 3),
				&mut rng(seed),
			)
			.unwrap();
		let (low, high) = split.boundary.unwrap();
		let cut = split.cut_threshold.unwrap();
		assert!(subset.value(0, low) <= cut && cut <= subset.value(0, high));
		assert!((2..=6).contains(&low));
		let split = engine
			.evaluate_best_split(
				&subset,
				0,
				&options(SplitCriterion::TotallyRandom, 3),
				&mut rng(seed),
			)
			.unwrap();
		assert!(split.score >= 0.0 && split.score < 1.0);
	}
}

#[test]
fn test_random_cut_is_reproducible() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let options = options(SplitCriterion::ExtremelyRandom, 1);
	let a = engine.evaluate_best_split(&subset, 0, &options, &mut rng(3));
	let b = engine.evaluate_best_split(&subset, 0, &options, &mut rng(3));
	assert_eq!(a, b);
}

#[test]
fn test_discrete() {
	let mut subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 1, &options(SplitCriterion::InfoGain, 1), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, None);
	assert!((split.score - 0.0490225).abs() < 1e-6);
	let split = engine
		.evaluate_best_split(&subset, 1, &options(SplitCriterion::C45, 6), &mut rng(0))
		.unwrap();
	assert!((split.score - 0.0312056).abs() < 1e-6);
	assert_eq!(
		engine.evaluate_best_split(&subset, 1, &options(SplitCriterion::C45, 7), &mut rng(0)),
		None
	);
	subset.discrete_used[1] = true;
	assert_eq!(
		engine.evaluate_best_split(&subset, 1, &options(SplitCriterion::C45, 1), &mut rng(0)),
		None
	);
}

#[test]
fn test_single_distinct_value_has_no_split() {
	let subset = fixture().filter(|example| example.distinct_values[0] == 4);
	let mut engine = SplitEngine::new();
	assert_eq!(
		engine.evaluate_best_split(&subset, 0, &options(SplitCriterion::C45, 0), &mut rng(0)),
		None
	);
}

#[test]
fn test_penalized_criteria_need_positive_gain() {
	// Every example of class 1, so every boundary has zero gain and the four candidates cost log2(4) / 5.
	let subset = fixture().filter(|example| example.class == 1);
	let mut engine = SplitEngine::new();
	for &criterion in &[SplitCriterion::C45, SplitCriterion::Hellinger] {
		assert_eq!(
			engine.evaluate_best_split(&subset, 0, &options(criterion, 1), &mut rng(0)),
			None
		);
	}
	let zero_gain = |criterion| SplitOptions {
		split_on_zero_gain: true,
		..options(criterion, 1)
	};
	let split = engine
		.evaluate_best_split(&subset, 0, &zero_gain(SplitCriterion::C45), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((4, 6)));
	let expected = -(dlog_2(4.0) / 5.0) / engine.compute_split_info(&[1, 4]);
	assert!((split.score - expected).abs() < 1e-12);
	assert!((split.score + 0.554072).abs() < 1e-6);
	let split = engine
		.evaluate_best_split(&subset, 0, &zero_gain(SplitCriterion::Hellinger), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, Some((4, 6)));
	assert!((split.score + 0.4 / 2.0f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_discrete_criteria() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let split = engine
		.evaluate_best_split(&subset, 1, &options(SplitCriterion::Hellinger, 1), &mut rng(0))
		.unwrap();
	assert_eq!(split.boundary, None);
	// The class distributions over the levels are (2, 1, 2) / 5 and (2, 2, 1) / 5.
	assert!((split.score - (0.4f64.sqrt() - 0.2f64.sqrt())).abs() < 1e-12);
	let c45 = engine
		.evaluate_best_split(&subset, 1, &options(SplitCriterion::C45, 1), &mut rng(0))
		.unwrap();
	let ert = engine
		.evaluate_best_split(
			&subset,
			1,
			&options(SplitCriterion::ExtremelyRandom, 1),
			&mut rng(0),
		)
		.unwrap();
	assert_eq!(ert, c45);
	assert_eq!(ert.cut_threshold, None);
	let trt = engine
		.evaluate_best_split(&subset, 1, &options(SplitCriterion::TotallyRandom, 1), &mut rng(5))
		.unwrap();
	assert_eq!(trt.score, rng(5).gen::<f64>());
	assert_eq!(trt.boundary, None);
	assert_eq!(
		engine.evaluate_best_split(
			&subset,
			1,
			&options(SplitCriterion::TotallyRandom, 7),
			&mut rng(5)
		),
		None
	);
}
