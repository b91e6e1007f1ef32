use crate::{
	prediction_matrix::{BoostPredictionMatrix, PredictionMatrix},
	EvaluateOptions,
};
use copse_metrics::{Accuracy, ConfusionMatrix, StreamingMetric};
use rand::Rng;

/// The result of reducing a prediction matrix by voting.
#[derive(Clone, Debug)]
pub struct VotedAccuracy {
	/// The proportion of examples whose winning class equals their label, or `None` if there were no examples.
	pub accuracy: Option<f32>,
	/// The count of examples by winning class and label.
	pub confusion_matrix: ConfusionMatrix,
}

/// Count the votes each class receives from the trees for the example at `example_index`.
pub fn count_class_votes_from_matrix(matrix: &PredictionMatrix, example_index: usize) -> Vec<usize> {
	let mut votes = vec![0; matrix.n_classes];
	for prediction in matrix.predictions.row(example_index).iter() {
		votes[*prediction] += 1;
	}
	votes
}

/**
Find the class with the most votes.

When several classes tie for the most votes, the winner is the tied class with the lowest index, unless `options.break_ties_randomly` is set, in which case it is drawn uniformly from the tied classes with `rng`.
*/
pub fn find_best_class<R>(votes: &[usize], options: &EvaluateOptions, rng: &mut R) -> usize
where
	R: Rng + ?Sized,
{
	let mut most_votes = None;
	let mut tied = Vec::new();
	for (class, n_votes) in votes.iter().enumerate() {
		match most_votes {
			Some(most_votes) if *n_votes < most_votes => {}
			Some(most_votes) if *n_votes == most_votes => tied.push(class),
			_ => {
				most_votes = Some(*n_votes);
				tied.clear();
				tied.push(class);
			}
		}
	}
	match tied.len() {
		0 => {
			log::error!("unable to find a best class among {} classes", votes.len());
			0
		}
		1 => tied[0],
		_ if !options.break_ties_randomly => tied[0],
		n_tied => tied[rng.gen_range(0, n_tied)],
	}
}

/// Compute the accuracy of the plurality vote of the trees for each example, and the confusion matrix of the winning classes.
pub fn compute_voted_accuracy<R>(
	matrix: &PredictionMatrix,
	options: &EvaluateOptions,
	rng: &mut R,
) -> VotedAccuracy
where
	R: Rng + ?Sized,
{
	let mut accuracy = Accuracy::new();
	let mut confusion_matrix = ConfusionMatrix::new(matrix.n_classes);
	for (example_index, label) in matrix.labels.iter().enumerate() {
		let votes = count_class_votes_from_matrix(matrix, example_index);
		let best_class = find_best_class(&votes, options, rng);
		accuracy.update((best_class, *label));
		confusion_matrix.update((best_class, *label));
	}
	VotedAccuracy {
		accuracy: accuracy.finalize(),
		confusion_matrix,
	}
}

/// Compute the accuracy of the highest scoring class for each example of a boosted ensemble. Ties go to the class with the lowest index.
pub fn compute_boosting_accuracy(matrix: &BoostPredictionMatrix) -> VotedAccuracy {
	let n_classes = matrix.scores.ncols();
	let mut accuracy = Accuracy::new();
	let mut confusion_matrix = ConfusionMatrix::new(n_classes);
	for (scores, label) in matrix.scores.genrows().into_iter().zip(matrix.labels.iter()) {
		let mut best_class = 0;
		for (class, score) in scores.iter().enumerate() {
			if *score > scores[best_class] {
				best_class = class;
			}
		}
		accuracy.update((best_class, *label));
		confusion_matrix.update((best_class, *label));
	}
	VotedAccuracy {
		accuracy: accuracy.finalize(),
		confusion_matrix,
	}
}

/// Compute the mean accuracy of the individual trees, counting every (example, tree) pair once.
pub fn compute_average_accuracy(matrix: &PredictionMatrix) -> Option<f32> {
	let mut accuracy = Accuracy::new();
	for (predictions, label) in matrix
		.predictions
		.genrows()
		.into_iter()
		.zip(matrix.labels.iter())
	{
		for prediction in predictions.iter() {
			accuracy.update((*prediction, *label));
		}
	}
	accuracy.finalize()
}

#[cfg(test)]
use crate::{
	classify::{fixture_subset, fixture_tree},
	prediction_matrix::{build_boost_prediction_matrix, build_prediction_matrix, ensemble},
};
#[cfg(test)]
use copse_dataset::Ensemble;
#[cfg(test)]
use ndarray::prelude::*;

#[cfg(test)]
fn rng() -> rand_xoshiro::Xoshiro256Plus {
	rand::SeedableRng::seed_from_u64(42)
}

#[test]
fn test_count_class_votes_from_matrix() {
	let matrix = build_prediction_matrix(&ensemble(), &fixture_subset());
	assert_eq!(count_class_votes_from_matrix(&matrix, 0), vec![3, 0, 0]);
	assert_eq!(count_class_votes_from_matrix(&matrix, 3), vec![1, 2, 0]);
	assert_eq!(count_class_votes_from_matrix(&matrix, 5), vec![2, 0, 1]);
}

#[test]
fn test_find_best_class() {
	let mut rng = rng();
	let options = EvaluateOptions {
		break_ties_randomly: false,
	};
	assert_eq!(find_best_class(&[0, 4, 1], &options, &mut rng), 1);
	assert_eq!(find_best_class(&[2, 0, 2], &options, &mut rng), 0);
	assert_eq!(find_best_class(&[0, 0, 0], &options, &mut rng), 0);
	assert_eq!(find_best_class(&[], &options, &mut rng), 0);
	let options = EvaluateOptions::default();
	let mut winners = [0; 3];
	for _ in 0..100 {
		winners[find_best_class(&[1, 1, 0], &options, &mut rng)] += 1;
	}
	assert!(winners[0] > 0);
	assert!(winners[1] > 0);
	assert_eq!(winners[2], 0);
	// A clear winner never consults the rng.
	assert_eq!(find_best_class(&[1, 3, 2], &options, &mut rng), 1);
}

#[test]
fn test_compute_voted_accuracy() {
	let mut rng = rng();
	let matrix = build_prediction_matrix(&ensemble(), &fixture_subset());
	let voted = compute_voted_accuracy(&matrix, &EvaluateOptions::default(), &mut rng);
	assert_eq!(voted.accuracy, Some(0.5));
	assert_eq!(
		voted.confusion_matrix.counts(),
		arr2(&[[2u64, 1, 1], [0, 1, 1], [0, 0, 0]])
	);
}

#[test]
fn test_compute_voted_accuracy_ties() {
	let mut rng = rng();
	let ensemble = Ensemble {
		n_classes: 3,
		trees: vec![fixture_tree(1.0), fixture_tree(3.0)],
		boosting_betas: None,
	};
	let matrix = build_prediction_matrix(&ensemble, &fixture_subset());
	assert_eq!(count_class_votes_from_matrix(&matrix, 2), vec![1, 1, 0]);
	assert_eq!(count_class_votes_from_matrix(&matrix, 5), vec![1, 0, 1]);
	let options = EvaluateOptions {
		break_ties_randomly: false,
	};
	let first = compute_voted_accuracy(&matrix, &options, &mut rng);
	let second = compute_voted_accuracy(&matrix, &options, &mut rng);
	assert_eq!(first.accuracy, Some(0.5));
	assert_eq!(first.confusion_matrix.counts(), second.confusion_matrix.counts());
}

#[test]
fn test_compute_boosting_accuracy() {
	let matrix = build_boost_prediction_matrix(&ensemble(), &fixture_subset()).unwrap();
	let voted = compute_boosting_accuracy(&matrix);
	assert_eq!(voted.accuracy, Some(0.5));
	assert_eq!(
		voted.confusion_matrix.counts(),
		arr2(&[[2u64, 1, 1], [0, 1, 1], [0, 0, 0]])
	);
}

#[test]
fn test_compute_average_accuracy() {
	let matrix = build_prediction_matrix(&ensemble(), &fixture_subset());
	let accuracy = compute_average_accuracy(&matrix).unwrap();
	assert!((accuracy - 10.0 / 18.0).abs() < 1e-6);
	let empty = build_prediction_matrix(&Ensemble::new(3), &fixture_subset());
	assert_eq!(compute_average_accuracy(&empty), None);
}

#[test]
fn test_random_ties_only_change_tied_examples() {
	let ensemble = Ensemble {
		n_classes: 3,
		trees: vec![fixture_tree(1.0), fixture_tree(3.0)],
		boosting_betas: None,
	};
	let matrix = build_prediction_matrix(&ensemble, &fixture_subset());
	let options = EvaluateOptions::default();
	let winners = |seed: u64| -> Vec<usize> {
		let mut rng: rand_xoshiro::Xoshiro256Plus = rand::SeedableRng::seed_from_u64(seed);
		(0..matrix.n_examples())
			.map(|example_index| {
				let votes = count_class_votes_from_matrix(&matrix, example_index);
				find_best_class(&votes, &options, &mut rng)
			})
			.collect()
	};
	let (first, second) = (winners(1), winners(2));
	// Examples 2 and 5 split their votes between two classes.
	for example_index in [0, 1, 3, 4].iter() {
		assert_eq!(first[*example_index], second[*example_index]);
	}
	assert_eq!(&first[..2], &[0, 0]);
	assert_eq!(&first[3..5], &[1, 1]);
	for winners in [first, second].iter() {
		assert!(winners[2] == 0 || winners[2] == 1);
		assert!(winners[5] == 0 || winners[5] == 2);
	}
	for seed in 1..4 {
		let mut rng: rand_xoshiro::Xoshiro256Plus = rand::SeedableRng::seed_from_u64(seed);
		let voted = compute_voted_accuracy(&matrix, &options, &mut rng);
		let accuracy = voted.accuracy.unwrap();
		assert!(accuracy >= 0.5 && accuracy <= 5.0 / 6.0 + 1e-6);
		assert_eq!(voted.confusion_matrix.counts().sum_axis(Axis(0)), arr1(&[2u64, 2, 2]));
	}
}
