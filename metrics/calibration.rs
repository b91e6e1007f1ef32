use super::{mean::Mean, per_class::PerClassOutput, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::cmp::Ordering;

/// The calibration and refinement of the probabilities predicted for each class.
#[derive(Debug, PartialEq)]
pub struct CalibrationOutput {
	/// The mean absolute difference between the predicted probability of a class and the observed frequency of the class, over windows of examples with similar predictions. Lower is better.
	pub calibration: PerClassOutput,
	/// The mean of `frequency * (1 - frequency)` over the same windows. Lower means the predictions separate the class from the rest more sharply.
	pub refinement: PerClassOutput,
}

/// Smaller datasets use narrower windows.
fn window_size(n_examples: usize) -> usize {
	if n_examples < 100 {
		50
	} else {
		100
	}
}

/**
Compute the calibration and refinement of each class. The examples are sorted by the probability predicted for the class and every run of `window_size` consecutive examples forms a window. A class has no value if there are fewer examples than one window.

The shape of `probabilities` is (n_examples, n_classes).
*/
pub fn calibration(probabilities: ArrayView2<f32>, labels: &[usize]) -> CalibrationOutput {
	let window_size = window_size(labels.len());
	let (calibration, refinement): (Vec<_>, Vec<_>) = (0..probabilities.ncols())
		.map(|class| {
			let mut scores: Vec<(f32, bool)> = probabilities
				.column(class)
				.iter()
				.zip(labels.iter())
				.map(|(probability, label)| (*probability, *label == class))
				.collect();
			scores.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
			let mut calibration = Mean::new();
			let mut refinement = Mean::new();
			for window in scores.windows(window_size) {
				let n = window.len().to_f32().unwrap();
				let mean_probability =
					window.iter().map(|(probability, _)| probability).sum::<f32>() / n;
				let n_positives = window.iter().filter(|(_, positive)| *positive).count();
				let frequency = n_positives.to_f32().unwrap() / n;
				calibration.update((mean_probability - frequency).abs());
				refinement.update(frequency * (1.0 - frequency));
			}
			(calibration.finalize(), refinement.finalize())
		})
		.unzip();
	CalibrationOutput {
		calibration: PerClassOutput::new(calibration, None),
		refinement: PerClassOutput::new(refinement, None),
	}
}

#[test]
fn test_calibration() {
	// The probability of class 1 rises from 0 to 59/64 while the second half of the examples are labeled 1.
	let n_examples = 60;
	let probabilities = Array2::from_shape_fn((n_examples, 2), |(example, class)| {
		let probability = example.to_f32().unwrap() / 64.0;
		if class == 1 {
			probability
		} else {
			1.0 - probability
		}
	});
	let labels: Vec<usize> = (0..n_examples).map(|example| example / 30).collect();
	let output = calibration(probabilities.view(), &labels);
	// There are 11 windows of 50 examples. Window j has mean probability (j + 24.5) / 64 and frequency (j + 20) / 50.
	for class in 0..2 {
		assert!((output.calibration.per_class[class].unwrap() - 0.0390625).abs() < 1e-6);
		assert!((output.refinement.per_class[class].unwrap() - 0.246).abs() < 1e-6);
	}
	assert!((output.calibration.class_average.unwrap() - 0.0390625).abs() < 1e-6);
	assert_eq!(output.calibration.overall, None);
}

#[test]
fn test_calibration_too_few_examples() {
	let probabilities = arr2(&[[0.75f32, 0.25], [0.25, 0.75]]);
	let output = calibration(probabilities.view(), &[0, 1]);
	assert_eq!(output.calibration.per_class, vec![None, None]);
	assert_eq!(output.refinement.class_average, None);
	assert_eq!(window_size(99), 50);
	assert_eq!(window_size(100), 100);
}
