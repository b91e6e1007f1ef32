use crate::SkewCorrector;
use copse_dataset::{Example, Subset};
use num_traits::ToPrimitive;
use rand::{seq::SliceRandom, Rng};

/**
Shuffle the examples of each class and record each example's 0-based position in its class's shuffled order as its clump number. Each example also receives a random id, a permutation of `0..examples.len()`.

This mutates the examples in place and should run exactly once per training run, before the first call to [`get_next_balanced_set`](struct.SkewCorrector.html#method.get_next_balanced_set).
*/
pub fn assign_clump_numbers<R>(examples: &mut [Example], rng: &mut R)
where
	R: Rng + ?Sized,
{
	let mut random_ids: Vec<u64> = (0..examples.len())
		.map(|id| id.to_u64().unwrap())
		.collect();
	random_ids.shuffle(rng);
	for (example, random_id) in examples.iter_mut().zip(random_ids) {
		example.random_id = random_id;
	}
	let mut order: Vec<usize> = (0..examples.len()).collect();
	order.sort_by_key(|&index| (examples[index].class, examples[index].random_id));
	let mut previous_class = None;
	let mut position = 0;
	for index in order {
		let class = examples[index].class;
		if previous_class != Some(class) {
			previous_class = Some(class);
			position = 0;
		}
		examples[index].clump = position;
		position += 1;
	}
}

/// The clump positions of one class included in a balanced set. The primary window is `[low1, high1)` and the wrapped window is `[low2, high2)`.
#[derive(Debug, PartialEq)]
struct ClumpWindows {
	low1: usize,
	high1: usize,
	low2: usize,
	high2: usize,
}

impl ClumpWindows {
	fn compute(cycle: usize, n_in_class: usize, n_per_clump: usize) -> ClumpWindows {
		let mut low1 = cycle * n_per_clump;
		let mut low2 = low1;
		let mut high1 = low1 + n_per_clump;
		let mut high2 = low2 + n_per_clump;
		if n_in_class == 0 {
			return ClumpWindows {
				low1,
				high1,
				low2,
				high2,
			};
		}
		if high2 >= n_in_class && low2 >= n_in_class {
			low1 %= n_in_class;
			low2 %= n_in_class;
			high1 = low1 + n_per_clump;
			high2 = low2 + n_per_clump;
		}
		if high2 >= n_in_class && low2 < n_in_class {
			high1 = n_in_class;
			low2 = 0;
			high2 = n_per_clump - (high1 - low1);
		}
		ClumpWindows {
			low1,
			high1,
			low2,
			high2,
		}
	}

	fn contains(&self, clump: usize) -> bool {
		(clump >= self.low1 && clump < self.high1) || (clump >= self.low2 && clump < self.high2)
	}
}

impl SkewCorrector {
	/**
	Build the balanced subset for round `cycle` from `source`, whose examples must already have clump numbers assigned by [`assign_clump_numbers`](fn.assign_clump_numbers.html).

	The cycle is taken modulo the number of clumps. Each class contributes the examples whose clump numbers fall in its window for the cycle. A window that runs past the end of a class wraps around to its start. If the resulting counts differ from the plan the difference is logged as an error and the subset is returned as built.
	*/
	pub fn get_next_balanced_set(&self, cycle: usize, source: &Subset) -> Subset {
		let plan = self.plan();
		let cycle = cycle % plan.n_clumps;
		let windows: Vec<ClumpWindows> = source
			.metadata
			.n_examples_per_class
			.iter()
			.zip(plan.n_examples_per_class_per_clump.iter())
			.map(|(&n_in_class, &n_per_clump)| {
				ClumpWindows::compute(cycle, n_in_class, n_per_clump)
			})
			.collect();
		let balanced = source.filter(|example| windows[example.class].contains(example.clump));
		if balanced.n_examples() != plan.n_examples_per_clump {
			log::error!(
				"added {} examples to balanced set {} instead of {}",
				balanced.n_examples(),
				cycle,
				plan.n_examples_per_clump
			);
		}
		for (class, (&planned, &added)) in plan
			.n_examples_per_class_per_clump
			.iter()
			.zip(balanced.metadata.n_examples_per_class.iter())
			.enumerate()
		{
			if planned != added {
				log::error!(
					"added {} examples of class {} to balanced set {} instead of {}",
					added,
					class,
					cycle,
					planned
				);
			}
		}
		balanced
	}
}

#[cfg(test)]
use crate::{Sampling, SkewOptions};
#[cfg(test)]
use itertools::Itertools;

#[cfg(test)]
fn source(n_examples_per_class: &[usize]) -> Subset {
	use copse_dataset::{AttributeType, Metadata};
	let metadata = Metadata {
		n_classes: n_examples_per_class.len(),
		attribute_types: vec![AttributeType::Continuous],
		n_discrete_values: vec![0],
		n_examples_per_class: vec![],
	};
	let mut examples = Vec::new();
	for (class, &n) in n_examples_per_class.iter().enumerate() {
		for _ in 0..n {
			let global_id = examples.len();
			examples.push(Example {
				global_id,
				..Example::new(vec![global_id], class)
			});
		}
	}
	let value_tables = vec![(0..examples.len()).map(|v| v as f32).collect()];
	Subset::new(metadata, value_tables, examples)
}

#[cfg(test)]
fn rng(seed: u64) -> rand_xoshiro::Xoshiro256Plus {
	rand::SeedableRng::seed_from_u64(seed)
}

#[test]
fn test_assign_clump_numbers() {
	let mut subset = source(&[7, 3, 5]);
	assign_clump_numbers(&mut subset.examples, &mut rng(1));
	for class in 0..3 {
		let clumps: Vec<usize> = subset
			.examples
			.iter()
			.filter(|example| example.class == class)
			.map(|example| example.clump)
			.sorted()
			.collect();
		let n = subset.metadata.n_examples_per_class[class];
		assert_eq!(clumps, (0..n).collect::<Vec<_>>());
	}
	let random_ids: Vec<u64> = subset
		.examples
		.iter()
		.map(|example| example.random_id)
		.sorted()
		.collect();
	assert_eq!(random_ids, (0..15).collect::<Vec<u64>>());
	let mut again = source(&[7, 3, 5]);
	assign_clump_numbers(&mut again.examples, &mut rng(1));
	assert_eq!(subset, again);
}

#[test]
fn test_clump_windows() {
	assert_eq!(
		ClumpWindows::compute(2, 10, 4),
		ClumpWindows {
			low1: 8,
			high1: 10,
			low2: 0,
			high2: 2,
		}
	);
	assert_eq!(
		ClumpWindows::compute(3, 10, 4),
		ClumpWindows {
			low1: 2,
			high1: 6,
			low2: 2,
			high2: 6,
		}
	);
	let minority = ClumpWindows::compute(5, 6, 6);
	assert!((0..6).all(|clump| minority.contains(clump)));
}

#[test]
fn test_get_next_balanced_set_matches_plan() {
	let mut subset = source(&[1000, 10, 505, 25]);
	assign_clump_numbers(&mut subset.examples, &mut rng(3));
	let options = SkewOptions {
		minority_classes: vec![1, 3],
		proportions: vec![0.1, 0.2],
		sampling: Sampling::None,
	};
	let corrector = SkewCorrector::new(&subset.metadata, options).unwrap();
	let plan = corrector.plan().clone();
	let mut seen = vec![false; subset.n_examples()];
	for cycle in 0..2 * plan.n_clumps {
		let balanced = corrector.get_next_balanced_set(cycle, &subset);
		assert_eq!(balanced.n_examples(), plan.n_examples_per_clump);
		assert_eq!(
			balanced.metadata.n_examples_per_class,
			plan.n_examples_per_class_per_clump
		);
		for example in balanced.examples.iter() {
			seen[example.global_id] = true;
		}
	}
	assert!(seen.iter().all(|&seen| seen));
}

#[test]
fn test_get_next_balanced_set_repeats() {
	let mut subset = source(&[400, 20]);
	assign_clump_numbers(&mut subset.examples, &mut rng(9));
	let options = SkewOptions {
		minority_classes: vec![1],
		proportions: vec![0.25],
		sampling: Sampling::None,
	};
	let corrector = SkewCorrector::new(&subset.metadata, options).unwrap();
	let n_clumps = corrector.plan().n_clumps;
	assert_eq!(
		corrector.get_next_balanced_set(1, &subset),
		corrector.get_next_balanced_set(n_clumps + 1, &subset)
	);
}
