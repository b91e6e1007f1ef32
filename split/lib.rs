/*!
This crate scores candidate splits for growing decision trees. A [`SplitEngine`](struct.SplitEngine.html) evaluates the best split of a single attribute with [`evaluate_best_split`](struct.SplitEngine.html#method.evaluate_best_split) and the best split across all attributes with [`choose_best_split`](struct.SplitEngine.html#method.choose_best_split). The engine owns a memoized log table, so use one engine per thread.

# Example

```
use copse_split::SplitEngine;

let mut engine = SplitEngine::new();
assert!((engine.compute_split_info(&[200, 100, 50, 25, 25]) - 1.875).abs() < 1e-12);
```
*/

#![allow(clippy::tabs_in_doc_comments)]

mod choose_best_split;
mod compute;
mod evaluate_best_split;
mod log2;

pub use self::choose_best_split::BestSplit;
pub use self::log2::{dlog_2, Log2Table};

use copse_dataset::Subset;
use num_traits::ToPrimitive;

/// The criterion used to score candidate splits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
	/// Parent entropy minus size weighted child entropy.
	#[serde(rename = "infogain")]
	InfoGain,
	/// Information gain divided by the entropy of the partition sizes.
	#[serde(rename = "gainratio")]
	GainRatio,
	/// Gain ratio with the gain penalized by the number of candidate boundaries.
	#[serde(rename = "c45")]
	C45,
	/// Hellinger distance between the class distributions of the branches.
	#[serde(rename = "hellinger")]
	Hellinger,
	/// Extremely random trees. The boundary is chosen by a uniformly random cut.
	#[serde(rename = "ert")]
	ExtremelyRandom,
	/// Totally random trees. The boundary is chosen by a uniformly random cut and the score is random.
	#[serde(rename = "trt")]
	TotallyRandom,
}

/// These are the options that control split search.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SplitOptions {
	pub criterion: SplitCriterion,
	/// Each side of a split must have at least this many examples.
	pub min_examples_per_split: usize,
	/// If true, the minimum is raised to `0.1 * n_examples / n_classes`, capped at 25, when that is larger than `min_examples_per_split`.
	pub dynamic_bounds: bool,
	/// If true, splits whose score is zero or negative are still taken.
	pub split_on_zero_gain: bool,
	/// If this is `Some(k)`, attributes are visited in random order and the search stops after `k` attributes produced an admissible split.
	pub random_attributes: Option<usize>,
}

impl Default for SplitOptions {
	fn default() -> SplitOptions {
		SplitOptions {
			criterion: SplitCriterion::C45,
			min_examples_per_split: 2,
			dynamic_bounds: false,
			split_on_zero_gain: false,
			random_attributes: None,
		}
	}
}

impl SplitOptions {
	/// Compute the minimum number of examples on each side of a split of `subset`.
	pub fn min_examples_per_split(&self, subset: &Subset) -> usize {
		if !self.dynamic_bounds {
			return self.min_examples_per_split;
		}
		let n_examples = subset.n_examples().to_f32().unwrap();
		let n_classes = subset.n_classes().to_f32().unwrap();
		let min = (0.1 * n_examples / n_classes).to_usize().unwrap_or(0);
		if min <= self.min_examples_per_split {
			self.min_examples_per_split
		} else {
			min.min(25)
		}
	}
}

/// The result of scoring a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeSplit {
	pub score: f64,
	/// For continuous attributes this is the pair of adjacent nonempty distinct values the split falls between.
	pub boundary: Option<(usize, usize)>,
	/// For randomized criteria on continuous attributes this is the random cut that selected `boundary`.
	pub cut_threshold: Option<f32>,
}

/// A `SplitEngine` owns the state that split scoring reuses across calls.
#[derive(Debug, Default)]
pub struct SplitEngine {
	log2: Log2Table,
}

impl SplitEngine {
	pub fn new() -> SplitEngine {
		SplitEngine::default()
	}

	/// Clear the memoized log table.
	pub fn reset(&mut self) {
		self.log2.reset();
	}

	pub fn log2_table(&mut self) -> &mut Log2Table {
		&mut self.log2
	}
}

#[test]
fn test_min_examples_per_split() {
	use copse_dataset::{AttributeType, Example, Metadata};
	let metadata = Metadata {
		n_classes: 2,
		attribute_types: vec![AttributeType::Discrete],
		n_discrete_values: vec![1],
		n_examples_per_class: vec![],
	};
	let subset = |n: usize| {
		let examples = (0..n).map(|i| Example::new(vec![0], i % 2)).collect();
		Subset::new(metadata.clone(), vec![vec![]], examples)
	};
	let mut options = SplitOptions {
		min_examples_per_split: 3,
		..Default::default()
	};
	assert_eq!(options.min_examples_per_split(&subset(1000)), 3);
	options.dynamic_bounds = true;
	assert_eq!(options.min_examples_per_split(&subset(20)), 3);
	assert_eq!(options.min_examples_per_split(&subset(100)), 5);
	assert_eq!(options.min_examples_per_split(&subset(1000)), 25);
}
