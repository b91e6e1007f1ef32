use super::{
	auc_roc::auc_roc,
	brier_score::BrierScore,
	calibration::{calibration, CalibrationOutput},
	confusion_matrix::{ConfusionMatrix, ConfusionMatrixOutput},
	cross_entropy::CrossEntropy,
	per_class::{ClassProbabilities, PerClassOutput},
	StreamingMetric,
};
use ndarray::prelude::*;

/// The metrics that score a matrix of predicted class probabilities.
#[derive(Debug)]
pub struct ProbabilityMetricsOutput {
	/// The precision, recall and F-measure of the most probable class of each example.
	pub classification: ConfusionMatrixOutput,
	pub brier_score: PerClassOutput,
	pub cross_entropy: PerClassOutput,
	pub auc_roc: PerClassOutput,
	pub calibration: CalibrationOutput,
}

/// Compute every probability metric. The shape of `probabilities` is (n_examples, n_classes) and `labels` holds the label of each example.
pub fn compute_probability_metrics(
	probabilities: ArrayView2<f32>,
	labels: &[usize],
) -> ProbabilityMetricsOutput {
	let n_classes = probabilities.ncols();
	let mut classification = ConfusionMatrix::new(n_classes);
	let mut brier_score = BrierScore::new(n_classes);
	let mut cross_entropy = CrossEntropy::new(n_classes);
	for (probabilities, label) in probabilities.genrows().into_iter().zip(labels.iter()) {
		classification.update((most_probable_class(probabilities), *label));
		brier_score.update(ClassProbabilities {
			probabilities,
			label: *label,
		});
		cross_entropy.update(ClassProbabilities {
			probabilities,
			label: *label,
		});
	}
	ProbabilityMetricsOutput {
		classification: classification.finalize(),
		brier_score: brier_score.finalize(),
		cross_entropy: cross_entropy.finalize(),
		auc_roc: auc_roc(probabilities, labels),
		calibration: calibration(probabilities, labels),
	}
}

/// Ties go to the class with the lowest index.
fn most_probable_class(probabilities: ArrayView1<f32>) -> usize {
	let mut best_class = 0;
	for (class, probability) in probabilities.iter().enumerate() {
		if *probability > probabilities[best_class] {
			best_class = class;
		}
	}
	best_class
}

#[test]
fn test_most_probable_class() {
	assert_eq!(most_probable_class(arr1(&[0.25f32, 0.5, 0.25]).view()), 1);
	assert_eq!(most_probable_class(arr1(&[0.5f32, 0.0, 0.5]).view()), 0);
	assert_eq!(most_probable_class(arr1(&[0.0f32, 0.0]).view()), 0);
}

#[test]
fn test_compute_probability_metrics() {
	let probabilities = arr2(&[
		[0.75f32, 0.25],
		[0.5, 0.5],
		[0.25, 0.75],
		[0.75, 0.25],
	]);
	let labels = [0, 0, 1, 1];
	let metrics = compute_probability_metrics(probabilities.view(), &labels);
	let predicted: Vec<u64> = metrics
		.classification
		.class_metrics
		.iter()
		.map(|class| class.n_predicted)
		.collect();
	assert_eq!(predicted, vec![3, 1]);
	assert_eq!(metrics.classification.accuracy, Some(0.75));
	// The squared errors are 0.125, 0.5, 0.125 and 1.125.
	assert_eq!(metrics.brier_score.per_class, vec![Some(0.3125), Some(0.625)]);
	assert_eq!(metrics.brier_score.overall, Some(0.46875));
	// The cross entropies of the class 1 examples are -log2(0.75) and -log2(0.25).
	let cross_entropy = metrics.cross_entropy.per_class[1].unwrap();
	assert!((cross_entropy - 1.207_518_8).abs() < 1e-5);
	assert_eq!(metrics.auc_roc.per_class, vec![Some(0.625), Some(0.625)]);
	assert_eq!(metrics.auc_roc.overall, Some(0.625));
	assert_eq!(metrics.calibration.calibration.per_class, vec![None, None]);
}
