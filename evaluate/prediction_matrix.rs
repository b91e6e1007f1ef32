use crate::classify::{classify_example, find_example_probabilities};
use anyhow::{bail, Result};
use copse_dataset::{Ensemble, Subset};
use copse_split::dlog_2;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// A `PredictionMatrix` holds the class each tree of an ensemble predicts for each example.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionMatrix {
	pub n_classes: usize,
	/// The shape is (n_examples).
	pub labels: Array1<usize>,
	/// The shape is (n_examples, n_trees).
	pub predictions: Array2<usize>,
}

impl PredictionMatrix {
	pub fn n_examples(&self) -> usize {
		self.predictions.nrows()
	}

	pub fn n_trees(&self) -> usize {
		self.predictions.ncols()
	}
}

/// A `BoostPredictionMatrix` holds the weighted vote of a boosted ensemble for each class of each example.
#[derive(Clone, Debug, PartialEq)]
pub struct BoostPredictionMatrix {
	/// The shape is (n_examples).
	pub labels: Array1<usize>,
	/// The shape is (n_examples, n_classes). Each tree adds `log2(1 / beta)` to the score of the class it predicts.
	pub scores: Array2<f32>,
}

fn labels(subset: &Subset) -> Array1<usize> {
	Array1::from(
		subset
			.examples
			.iter()
			.map(|example| example.class)
			.collect::<Vec<_>>(),
	)
}

fn boosting_betas(ensemble: &Ensemble) -> Result<&[f32]> {
	match &ensemble.boosting_betas {
		Some(betas) if betas.len() == ensemble.n_trees() => Ok(betas),
		Some(betas) => bail!(
			"the ensemble has {} trees but {} boosting weights",
			ensemble.n_trees(),
			betas.len()
		),
		None => bail!("the ensemble was not trained with boosting"),
	}
}

/// Classify every example of `subset` with every tree of `ensemble`.
pub fn build_prediction_matrix(ensemble: &Ensemble, subset: &Subset) -> PredictionMatrix {
	let mut predictions = Array2::<usize>::zeros((subset.n_examples(), ensemble.n_trees()));
	for (example, mut row) in subset.examples.iter().zip(predictions.genrows_mut()) {
		for (tree, prediction) in ensemble.trees.iter().zip(row.iter_mut()) {
			*prediction = classify_example(tree, subset, example).0;
		}
	}
	PredictionMatrix {
		n_classes: subset.n_classes(),
		labels: labels(subset),
		predictions,
	}
}

/// Score every class of every example of `subset` by the boosting weights of the trees of `ensemble` that predict it. This fails if the ensemble has no boosting weights.
pub fn build_boost_prediction_matrix(
	ensemble: &Ensemble,
	subset: &Subset,
) -> Result<BoostPredictionMatrix> {
	let betas = boosting_betas(ensemble)?;
	let weights: Vec<f32> = betas
		.iter()
		.map(|beta| dlog_2(1.0 / beta.to_f64().unwrap()).to_f32().unwrap())
		.collect();
	let mut scores = Array2::<f32>::zeros((subset.n_examples(), subset.n_classes()));
	for (example, mut row) in subset.examples.iter().zip(scores.genrows_mut()) {
		for (tree, weight) in ensemble.trees.iter().zip(weights.iter()) {
			let (class, _) = classify_example(tree, subset, example);
			row[class] += weight;
		}
	}
	Ok(BoostPredictionMatrix {
		labels: labels(subset),
		scores,
	})
}

/// Average the leaf class probabilities of every tree of `ensemble` for every example of `subset`. The shape of the result is (n_examples, n_classes).
pub fn build_probability_matrix(ensemble: &Ensemble, subset: &Subset) -> Array2<f32> {
	let n_trees = ensemble.n_trees().to_f64().unwrap();
	let mut probabilities = Array2::<f32>::zeros((subset.n_examples(), subset.n_classes()));
	for (example, mut row) in subset.examples.iter().zip(probabilities.genrows_mut()) {
		for tree in ensemble.trees.iter() {
			let leaf_probabilities = find_example_probabilities(tree, subset, example);
			for (probability, leaf_probability) in row.iter_mut().zip(leaf_probabilities.iter()) {
				*probability = (probability.to_f64().unwrap()
					+ leaf_probability.to_f64().unwrap() / n_trees)
					.to_f32()
					.unwrap();
			}
		}
	}
	probabilities
}

/// Average the leaf class probabilities of every tree of `ensemble` for every example of `subset`, weighting each tree by its boosting weight. This fails if the ensemble has no boosting weights.
pub fn build_boost_probability_matrix(ensemble: &Ensemble, subset: &Subset) -> Result<Array2<f32>> {
	let betas = boosting_betas(ensemble)?;
	let sum_betas: f64 = betas.iter().map(|beta| beta.to_f64().unwrap()).sum();
	let mut probabilities = Array2::<f32>::zeros((subset.n_examples(), subset.n_classes()));
	for (example, mut row) in subset.examples.iter().zip(probabilities.genrows_mut()) {
		for (tree, beta) in ensemble.trees.iter().zip(betas.iter()) {
			let leaf_probabilities = find_example_probabilities(tree, subset, example);
			for (probability, leaf_probability) in row.iter_mut().zip(leaf_probabilities.iter()) {
				let weighted = (beta * leaf_probability).to_f64().unwrap();
				*probability = (probability.to_f64().unwrap() + weighted / sum_betas)
					.to_f32()
					.unwrap();
			}
		}
	}
	Ok(probabilities)
}

#[cfg(test)]
use crate::classify::{fixture_subset, fixture_tree};

#[cfg(test)]
pub(crate) fn ensemble() -> Ensemble {
	Ensemble {
		n_classes: 3,
		trees: vec![fixture_tree(1.0), fixture_tree(3.0), fixture_tree(5.0)],
		boosting_betas: Some(vec![0.125, 0.25, 0.5]),
	}
}

#[test]
fn test_build_prediction_matrix() {
	let matrix = build_prediction_matrix(&ensemble(), &fixture_subset());
	assert_eq!(matrix.n_examples(), 6);
	assert_eq!(matrix.n_trees(), 3);
	assert_eq!(matrix.labels, arr1(&[0usize, 0, 1, 1, 2, 2]));
	assert_eq!(
		matrix.predictions,
		arr2(&[[0usize, 0, 0], [0, 0, 0], [1, 0, 0], [1, 1, 0], [1, 1, 0], [2, 0, 0]])
	);
}

#[test]
fn test_build_boost_prediction_matrix() {
	let matrix = build_boost_prediction_matrix(&ensemble(), &fixture_subset()).unwrap();
	// The trees have weights 3, 2 and 1.
	assert_eq!(
		matrix.scores,
		arr2(&[
			[6.0f32, 0.0, 0.0],
			[6.0, 0.0, 0.0],
			[3.0, 3.0, 0.0],
			[1.0, 5.0, 0.0],
			[1.0, 5.0, 0.0],
			[3.0, 0.0, 3.0],
		])
	);
	let mut unboosted = ensemble();
	unboosted.boosting_betas = None;
	assert!(build_boost_prediction_matrix(&unboosted, &fixture_subset()).is_err());
	unboosted.boosting_betas = Some(vec![0.5]);
	assert!(build_boost_prediction_matrix(&unboosted, &fixture_subset()).is_err());
}

#[test]
fn test_build_probability_matrix() {
	let subset = fixture_subset();
	let probabilities = build_probability_matrix(&ensemble(), &subset);
	assert_eq!(probabilities.dim(), (6, 3));
	for row in probabilities.genrows() {
		assert!((row.sum() - 1.0).abs() < 1e-6);
	}
	// Two trees reach the leaf with counts [0, 2, 0] and one reaches the leaf with counts [2, 0, 0].
	let expected = [1.0 / 3.0, 1.4 / 3.0, 0.2];
	for (probability, expected) in probabilities.row(3).iter().zip(expected.iter()) {
		assert!((probability - expected).abs() < 1e-6);
	}
	let empty = Ensemble::new(3);
	assert_eq!(
		build_probability_matrix(&empty, &subset),
		Array2::<f32>::zeros((6, 3))
	);
}

#[test]
fn test_build_boost_probability_matrix() {
	let subset = fixture_subset();
	let probabilities = build_boost_probability_matrix(&ensemble(), &subset).unwrap();
	// Every tree sends the first example to a leaf with counts [2, 0, 0].
	let expected = [0.6, 0.2, 0.2];
	for (probability, expected) in probabilities.row(0).iter().zip(expected.iter()) {
		assert!((probability - expected).abs() < 1e-6);
	}
	// The weights are 1/7, 2/7 and 4/7 of the total.
	let expected = [
		(0.2 + 2.0 * 0.2 + 4.0 * 0.6) / 7.0,
		(0.6 + 2.0 * 0.6 + 4.0 * 0.2) / 7.0,
		(0.2 + 2.0 * 0.2 + 4.0 * 0.2) / 7.0,
	];
	for (probability, expected) in probabilities.row(3).iter().zip(expected.iter()) {
		assert!((probability - expected).abs() < 1e-6);
	}
}
