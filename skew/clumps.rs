use crate::{Sampling, SkewOptions};
use anyhow::{bail, Result};
use copse_dataset::Metadata;
use num_traits::ToPrimitive;

#[derive(Clone, Debug, PartialEq)]
pub struct ClumpPlan {
	pub n_clumps: usize,
	/// This is the total number of examples in each clump.
	pub n_examples_per_clump: usize,
	/// This is the number of examples of each class in each clump. Minority classes contribute every example.
	pub n_examples_per_class_per_clump: Vec<usize>,
	/// When the sampling is `MajorityBagging`, this is the derived bag size as a percentage of the dataset.
	pub bag_size: Option<f32>,
	/// When the sampling is `MajorityIvoting`, this is the derived bite size.
	pub bite_size: Option<usize>,
}

/**
Compute how many clumps are needed to reach the target proportions and how many examples each clump holds.

Each minority class implies a population of `count / proportion`. The average of these is the initial clump size. Each majority class receives its share of the remaining proportion mass, and the number of clumps is the largest number needed to exhaust any majority class at its share. The clump size is then recomputed from that number of clumps.

A warning is logged if a minority proportion implies a population larger than the dataset. Majority classes with no examples are skipped.
*/
pub fn compute_number_of_clumps(metadata: &Metadata, options: &SkewOptions) -> Result<ClumpPlan> {
	if options.minority_classes.is_empty() {
		bail!("balanced learning requires at least one minority class");
	}
	if options.minority_classes.len() != options.proportions.len() {
		bail!(
			"{} minority classes were given but {} proportions",
			options.minority_classes.len(),
			options.proportions.len()
		);
	}
	let n_classes = metadata.n_classes;
	let mut is_minority = vec![false; n_classes];
	for &class in options.minority_classes.iter() {
		if class >= n_classes {
			bail!("minority class {} is out of range for {} classes", class, n_classes);
		}
		is_minority[class] = true;
	}
	let n_examples = metadata.n_examples();
	let count = |class: usize| metadata.n_examples_per_class[class].to_f32().unwrap();

	let mut warned = false;
	let mut population_sum = 0.0f32;
	let mut minority_proportion = 0.0f32;
	for (&class, &proportion) in options.minority_classes.iter().zip(options.proportions.iter()) {
		if proportion <= 0.0 {
			bail!("the proportion for class {} must be positive", class);
		}
		let population = count(class) / proportion;
		if !warned && (population + 0.5).to_usize().unwrap_or(usize::MAX) > n_examples {
			warned = true;
			log::warn!(
				"the proportion {} for class {} is too small and unattainable",
				proportion,
				class
			);
		}
		population_sum += population;
		minority_proportion += proportion;
	}
	let population = population_sum / options.minority_classes.len().to_f32().unwrap();
	let initial_clump_size = (population + 0.5).floor();

	let majority_total: usize = (0..n_classes)
		.filter(|&class| !is_minority[class])
		.map(|class| metadata.n_examples_per_class[class])
		.sum();
	let mut n_clumps = 0;
	for class in (0..n_classes).filter(|&class| !is_minority[class]) {
		if metadata.n_examples_per_class[class] == 0 {
			continue;
		}
		let fraction_of_majority = count(class) / majority_total.to_f32().unwrap();
		let share = (fraction_of_majority.to_f64().unwrap()
			* (1.0 - minority_proportion.to_f64().unwrap()))
		.to_f32()
		.unwrap();
		let n_per_clump = (initial_clump_size * share).ceil();
		if n_per_clump <= 0.0 {
			bail!(
				"the minority proportions leave no room for majority class {}",
				class
			);
		}
		let n_needed = (count(class) / n_per_clump).ceil().to_usize().unwrap();
		n_clumps = n_clumps.max(n_needed);
	}
	// Every class is a minority class, so one clump holds the whole dataset.
	let n_clumps = n_clumps.max(1);

	let n_examples_per_class_per_clump: Vec<usize> = (0..n_classes)
		.map(|class| {
			if is_minority[class] {
				metadata.n_examples_per_class[class]
			} else {
				(count(class) / n_clumps.to_f32().unwrap())
					.ceil()
					.to_usize()
					.unwrap()
			}
		})
		.collect();
	let n_examples_per_clump: usize = n_examples_per_class_per_clump.iter().sum();

	let capacity_percent =
		n_examples_per_clump.to_f32().unwrap() * 100.0 / n_examples.to_f32().unwrap();
	let (bag_size, bite_size) = match options.sampling {
		Sampling::None => (None, None),
		Sampling::MajorityBagging => (Some(capacity_percent), None),
		Sampling::MajorityIvoting => (None, Some(n_examples_per_clump)),
		Sampling::Ivoting { bite_size } => {
			if bite_size > n_examples_per_clump {
				bail!(
					"the bite size {} is too large, the maximum value is {}",
					bite_size,
					n_examples_per_clump
				);
			}
			(None, Some(bite_size))
		}
		Sampling::Bagging { bag_size } => {
			if bag_size * n_examples.to_f32().unwrap() / 100.0
				> n_examples_per_clump.to_f32().unwrap()
			{
				bail!(
					"the bag size {}% is too large, the maximum value is {:.2}%",
					bag_size,
					capacity_percent
				);
			}
			(Some(bag_size), None)
		}
	};

	Ok(ClumpPlan {
		n_clumps,
		n_examples_per_clump,
		n_examples_per_class_per_clump,
		bag_size,
		bite_size,
	})
}

#[cfg(test)]
fn metadata(n_examples_per_class: Vec<usize>) -> Metadata {
	use copse_dataset::AttributeType;
	Metadata {
		n_classes: n_examples_per_class.len(),
		attribute_types: vec![AttributeType::Continuous],
		n_discrete_values: vec![0],
		n_examples_per_class,
	}
}

#[cfg(test)]
fn options(minority_classes: Vec<usize>, proportions: Vec<f32>, sampling: Sampling) -> SkewOptions {
	SkewOptions {
		minority_classes,
		proportions,
		sampling,
	}
}

#[test]
fn test_two_classes() {
	let plan = compute_number_of_clumps(
		&metadata(vec![10000, 100]),
		&options(vec![1], vec![0.5], Sampling::None),
	)
	.unwrap();
	assert_eq!(plan.n_clumps, 100);
	assert_eq!(plan.n_examples_per_clump, 200);
	assert_eq!(plan.n_examples_per_class_per_clump, vec![100, 100]);
	let plan = compute_number_of_clumps(
		&metadata(vec![10001, 100]),
		&options(vec![1], vec![0.5], Sampling::None),
	)
	.unwrap();
	assert_eq!(plan.n_clumps, 101);
	assert_eq!(plan.n_examples_per_clump, 200);
}

#[test]
fn test_many_classes() {
	let plan = compute_number_of_clumps(
		&metadata(vec![120, 100, 1000, 5000, 110, 100, 4950, 10300, 7490, 6080]),
		&options(vec![0, 1, 4, 5], vec![0.1; 4], Sampling::None),
	)
	.unwrap();
	assert_eq!(plan.n_clumps, 54);
	assert_eq!(plan.n_examples_per_clump, 1077);
	for class in [0, 1, 4, 5].iter() {
		assert_eq!(
			plan.n_examples_per_class_per_clump[*class],
			[120, 100, 1000, 5000, 110, 100, 4950, 10300, 7490, 6080][*class]
		);
	}
}

#[test]
fn test_empty_majority_class_is_skipped() {
	let plan = compute_number_of_clumps(
		&metadata(vec![10000, 100, 0]),
		&options(vec![1], vec![0.5], Sampling::None),
	)
	.unwrap();
	assert_eq!(plan.n_clumps, 100);
	assert_eq!(plan.n_examples_per_class_per_clump, vec![100, 100, 0]);
}

#[test]
fn test_sampling() {
	let metadata = metadata(vec![10000, 100]);
	let plan =
		compute_number_of_clumps(&metadata, &options(vec![1], vec![0.5], Sampling::MajorityIvoting))
			.unwrap();
	assert_eq!(plan.bite_size, Some(200));
	let plan =
		compute_number_of_clumps(&metadata, &options(vec![1], vec![0.5], Sampling::MajorityBagging))
			.unwrap();
	assert!((plan.bag_size.unwrap() - 200.0 * 100.0 / 10100.0).abs() < 1e-4);
	let plan = compute_number_of_clumps(
		&metadata,
		&options(vec![1], vec![0.5], Sampling::Ivoting { bite_size: 150 }),
	)
	.unwrap();
	assert_eq!(plan.bite_size, Some(150));
	assert!(compute_number_of_clumps(
		&metadata,
		&options(vec![1], vec![0.5], Sampling::Ivoting { bite_size: 201 }),
	)
	.is_err());
	assert!(compute_number_of_clumps(
		&metadata,
		&options(vec![1], vec![0.5], Sampling::Bagging { bag_size: 1.0 }),
	)
	.is_ok());
	assert!(compute_number_of_clumps(
		&metadata,
		&options(vec![1], vec![0.5], Sampling::Bagging { bag_size: 2.5 }),
	)
	.is_err());
}

#[test]
fn test_invalid_options() {
	let metadata = metadata(vec![10000, 100]);
	assert!(compute_number_of_clumps(&metadata, &options(vec![], vec![], Sampling::None)).is_err());
	assert!(
		compute_number_of_clumps(&metadata, &options(vec![1], vec![], Sampling::None)).is_err()
	);
	assert!(
		compute_number_of_clumps(&metadata, &options(vec![2], vec![0.5], Sampling::None)).is_err()
	);
	assert!(
		compute_number_of_clumps(&metadata, &options(vec![1], vec![1.0], Sampling::None)).is_err()
	);
}

#[test]
fn test_unattainable_proportion_still_plans() {
	// 100 / 0.001 implies a population far larger than the dataset.
	let plan = compute_number_of_clumps(
		&metadata(vec![10000, 100]),
		&options(vec![1], vec![0.001], Sampling::None),
	)
	.unwrap();
	assert_eq!(plan.n_clumps, 1);
	assert_eq!(plan.n_examples_per_clump, 10100);
}

#[test]
fn test_plan_snapshot() {
	let plan = compute_number_of_clumps(
		&metadata(vec![10000, 100]),
		&options(vec![1], vec![0.5], Sampling::MajorityIvoting),
	)
	.unwrap();
	insta::assert_debug_snapshot!(plan, @r###"
 ClumpPlan {
     n_clumps: 100,
     n_examples_per_clump: 200,
     n_examples_per_class_per_clump: [
         100,
         100,
     ],
     bag_size: None,
     bite_size: Some(
         200,
     ),
 }
 "###);
}
