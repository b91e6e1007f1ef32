use crate::{SplitEngine, SplitOptions};
use copse_dataset::{AttributeType, BranchSplit, Subset};
use rand::{seq::SliceRandom, Rng};

/// The best split across all attributes of a subset.
#[derive(Clone, Debug, PartialEq)]
pub struct BestSplit {
	pub attribute_index: usize,
	pub score: f64,
	pub split: BranchSplit,
	/// For continuous splits these are the distinct values on either side of the threshold.
	pub boundary: Option<(usize, usize)>,
}

impl SplitEngine {
	/**
	Choose the best split of `subset` across its attributes, or `None` if the node should be a leaf.

	A split must score higher than 0, or higher than any finite score if `split_on_zero_gain` is set. Ties go to the attribute visited first. If `random_attributes` is `Some(k)`, attributes are visited in a random order and the search stops once `k` attributes have produced an admissible split.

	The threshold of a continuous split is the midpoint of the values on either side of the boundary, or the random cut for the randomized criteria.
	*/
	pub fn choose_best_split<R>(
		&mut self,
		subset: &Subset,
		options: &SplitOptions,
		rng: &mut R,
	) -> Option<BestSplit>
	where
		R: Rng + ?Sized,
	{
		let mut attribute_indexes: Vec<usize> = (0..subset.n_attributes()).collect();
		let max_attempts = match options.random_attributes {
			Some(k) => {
				attribute_indexes.shuffle(rng);
				k
			}
			None => attribute_indexes.len(),
		};
		let mut best_score = if options.split_on_zero_gain {
			f64::MIN
		} else {
			0.0
		};
		let mut best: Option<BestSplit> = None;
		let mut n_attempted = 0;
		for attribute_index in attribute_indexes {
			if n_attempted >= max_attempts {
				break;
			}
			let split = match self.evaluate_best_split(subset, attribute_index, options, rng) {
				Some(split) => split,
				None => continue,
			};
			n_attempted += 1;
			if split.score <= best_score {
				continue;
			}
			let branch_split = match subset.attribute_type(attribute_index) {
				AttributeType::Continuous => {
					let threshold = split.cut_threshold.or_else(|| {
						split.boundary.map(|(low, high)| {
							(subset.value(attribute_index, low) + subset.value(attribute_index, high))
								/ 2.0
						})
					});
					match threshold {
						Some(threshold) => BranchSplit::Continuous { threshold },
						None => continue,
					}
				}
				AttributeType::Discrete => BranchSplit::Discrete {
					n_branches: subset.metadata.n_discrete_values[attribute_index],
				},
			};
			best_score = split.score;
			best = Some(BestSplit {
				attribute_index,
				score: split.score,
				split: branch_split,
				boundary: split.boundary,
			});
		}
		if best.is_none() {
			log::debug!(
				"no split of {} examples scores above {}, {} of {} attributes had an admissible split",
				subset.n_examples(),
				best_score,
				n_attempted,
				subset.n_attributes()
			);
		}
		best
	}
}

#[cfg(test)]
use crate::{evaluate_best_split::fixture, SplitCriterion};

#[cfg(test)]
fn rng(seed: u64) -> rand_xoshiro::Xoshiro256Plus {
	rand::SeedableRng::seed_from_u64(seed)
}

#[test]
fn test_choose_best_split() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let options = SplitOptions {
		criterion: SplitCriterion::C45,
		min_examples_per_split: 1,
		..Default::default()
	};
	let best = engine.choose_best_split(&subset, &options, &mut rng(0)).unwrap();
	assert_eq!(best.attribute_index, 0);
	assert_eq!(best.boundary, Some((3, 4)));
	assert_eq!(best.split, BranchSplit::Continuous { threshold: 3.5 });
}

#[test]
fn test_choose_best_split_discrete() {
	let mut subset =
		fixture().filter(|example| example.distinct_values[0] == 0 || example.class == 1);
	// Collapse the continuous attribute so only the discrete one can split.
	for example in subset.examples.iter_mut() {
		example.distinct_values[0] = 0;
	}
	subset.update_bounds();
	let mut engine = SplitEngine::new();
	let options = SplitOptions {
		criterion: SplitCriterion::InfoGain,
		min_examples_per_split: 1,
		..Default::default()
	};
	let best = engine.choose_best_split(&subset, &options, &mut rng(0)).unwrap();
	assert_eq!(best.attribute_index, 1);
	assert_eq!(best.split, BranchSplit::Discrete { n_branches: 3 });
	assert_eq!(best.boundary, None);
}

#[test]
fn test_zero_gain_is_a_leaf() {
	let subset = fixture().filter(|example| example.class == 1);
	let mut engine = SplitEngine::new();
	let mut options = SplitOptions {
		criterion: SplitCriterion::InfoGain,
		min_examples_per_split: 1,
		..Default::default()
	};
	assert_eq!(engine.choose_best_split(&subset, &options, &mut rng(0)), None);
	options.split_on_zero_gain = true;
	let best = engine.choose_best_split(&subset, &options, &mut rng(0)).unwrap();
	assert_eq!(best.score, 0.0);
}

#[test]
fn test_random_attributes() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let options = SplitOptions {
		criterion: SplitCriterion::C45,
		min_examples_per_split: 1,
		random_attributes: Some(1),
		..Default::default()
	};
	for seed in 0..10 {
		// Only one attribute is tried, so the discrete attribute wins whenever it is visited first.
		let best = engine.choose_best_split(&subset, &options, &mut rng(seed)).unwrap();
		match best.attribute_index {
			0 => assert_eq!(best.boundary, Some((3, 4))),
			1 => assert_eq!(best.split, BranchSplit::Discrete { n_branches: 3 }),
			_ => unreachable!(),
		}
	}
}

#[test]
fn test_extremely_random_uses_cut_threshold() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let options = SplitOptions {
		criterion: SplitCriterion::ExtremelyRandom,
		min_examples_per_split: 2,
		..Default::default()
	};
	let best = engine.choose_best_split(&subset, &options, &mut rng(11)).unwrap();
	if let BranchSplit::Continuous { threshold } = best.split {
		let (low, high) = best.boundary.unwrap();
		assert!(subset.value(0, low) <= threshold && threshold <= subset.value(0, high));
	}
}

#[test]
fn test_best_split_snapshot() {
	let subset = fixture();
	let mut engine = SplitEngine::new();
	let options = SplitOptions {
		criterion: SplitCriterion::InfoGain,
		min_examples_per_split: 5,
		..Default::default()
	};
	let best = engine.choose_best_split(&subset, &options, &mut rng(0)).unwrap();
	insta::assert_debug_snapshot!(best.split, @r###"
 Continuous {
     threshold: 4.5,
 }
 "###);
	assert_eq!(best.boundary, Some((4, 5)));
}
