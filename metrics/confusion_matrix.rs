use super::{mean::Mean, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// A `ConfusionMatrix` counts `(prediction, label)` pairs and summarizes them with the precision, recall and F-measure of each class.
#[derive(Clone, Debug)]
pub struct ConfusionMatrix {
	/// The shape of the confusion matrix is (n_classes x n_classes).
	confusion_matrix: Array2<u64>,
}

#[derive(Debug)]
pub struct ConfusionMatrixOutput {
	pub class_metrics: Vec<ClassMetrics>,
	/// The proportion of examples whose prediction equals their label, or `None` if there were no examples.
	pub accuracy: Option<f32>,
	/// The means of the per class metrics, with every class weighted equally.
	pub precision_average: f32,
	pub recall_average: f32,
	pub f_measure_average: f32,
}

/**
The metrics of a single class. A ratio whose numerator is zero is zero, so a class that is never predicted or never labeled scores zero instead of `NaN`.
*/
#[derive(Debug)]
pub struct ClassMetrics {
	/// The count of examples with this label.
	pub n_examples: u64,
	/// The count of examples predicted as this class.
	pub n_predicted: u64,
	/// The count of examples with this label that were predicted as this class.
	pub n_correct: u64,
	pub precision: f32,
	pub recall: f32,
	/// The harmonic mean of precision and recall.
	pub f_measure: f32,
}

impl ConfusionMatrix {
	pub fn new(n_classes: usize) -> ConfusionMatrix {
		//                                           prediction    label
		//                                               |           |
		//                                               v           v
		let confusion_matrix = <Array2<u64>>::zeros((n_classes, n_classes));
		ConfusionMatrix { confusion_matrix }
	}

	/// The count of examples predicted as the row's class whose label is the column's class.
	pub fn counts(&self) -> ArrayView2<u64> {
		self.confusion_matrix.view()
	}
}

impl StreamingMetric<'_> for ConfusionMatrix {
	type Input = (usize, usize);
	type Output = ConfusionMatrixOutput;

	fn update(&mut self, (prediction, label): Self::Input) {
		self.confusion_matrix[(prediction, label)] += 1;
	}

	fn merge(&mut self, other: Self) {
		self.confusion_matrix += &other.confusion_matrix;
	}

	fn finalize(self) -> ConfusionMatrixOutput {
		let n_predicted = self.confusion_matrix.sum_axis(Axis(1));
		let n_examples = self.confusion_matrix.sum_axis(Axis(0));
		let class_metrics: Vec<ClassMetrics> = self
			.confusion_matrix
			.diag()
			.iter()
			.zip(n_predicted.iter().zip(n_examples.iter()))
			.map(|(&n_correct, (&n_predicted, &n_examples))| {
				let precision = ratio(n_correct, n_predicted);
				let recall = ratio(n_correct, n_examples);
				let f_measure = if precision > 0.0 && recall > 0.0 {
					2.0 * precision * recall / (precision + recall)
				} else {
					0.0
				};
				ClassMetrics {
					n_examples,
					n_predicted,
					n_correct,
					precision,
					recall,
					f_measure,
				}
			})
			.collect();
		let n_correct: u64 = self.confusion_matrix.diag().sum();
		let n_examples: u64 = self.confusion_matrix.sum();
		let accuracy = if n_examples > 0 {
			Some(ratio(n_correct, n_examples))
		} else {
			None
		};
		let average = |value: fn(&ClassMetrics) -> f32| {
			let mut mean = Mean::new();
			for class in class_metrics.iter() {
				mean.update(value(class));
			}
			mean.finalize().unwrap_or(0.0)
		};
		let precision_average = average(|class| class.precision);
		let recall_average = average(|class| class.recall);
		let f_measure_average = average(|class| class.f_measure);
		ConfusionMatrixOutput {
			class_metrics,
			accuracy,
			precision_average,
			recall_average,
			f_measure_average,
		}
	}
}

fn ratio(numerator: u64, denominator: u64) -> f32 {
	if numerator == 0 {
		0.0
	} else {
		numerator.to_f32().unwrap() / denominator.to_f32().unwrap()
	}
}

#[cfg(test)]
fn update_all(metric: &mut ConfusionMatrix, predictions: &[usize], labels: &[usize]) {
	for (prediction, label) in predictions.iter().zip(labels.iter()) {
		metric.update((*prediction, *label));
	}
}

#[test]
fn test_binary() {
	let mut metrics = ConfusionMatrix::new(2);
	let labels = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
	let predictions = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0];
	update_all(&mut metrics, &predictions, &labels);
	assert_eq!(metrics.counts(), arr2(&[[5u64, 2], [3, 3]]));
	let metrics = metrics.finalize();
	insta::assert_debug_snapshot!(metrics, @r###"
 ConfusionMatrixOutput {
     class_metrics: [
         ClassMetrics {
             n_examples: 8,
             n_predicted: 7,
             n_correct: 5,
             precision: 0.71428573,
             recall: 0.625,
             f_measure: 0.6666667,
         },
         ClassMetrics {
             n_examples: 5,
             n_predicted: 6,
             n_correct: 3,
             precision: 0.5,
             recall: 0.6,
             f_measure: 0.54545456,
         },
     ],
     accuracy: Some(
         0.61538464,
     ),
     precision_average: 0.60714287,
     recall_average: 0.6125,
     f_measure_average: 0.6060606,
 }
 "###);
}

#[test]
fn test_multiclass() {
	// example taken from https://en.wikipedia.org/wiki/Confusion_matrix
	let mut metrics = ConfusionMatrix::new(3);
	let labels = [
		0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 1, 2, 2, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
	];
	let predictions = [
		0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
	];
	update_all(&mut metrics, &predictions, &labels);
	let mut merged = ConfusionMatrix::new(3);
	merged.merge(metrics);
	let metrics = merged.finalize();
	let class_metrics: Vec<(f32, f32, f32)> = metrics
		.class_metrics
		.iter()
		.map(|class| (class.precision, class.recall, class.f_measure))
		.collect();
	assert_eq!(
		class_metrics,
		vec![
			(0.71428573, 0.625, 0.6666667),
			(0.375, 0.5, 0.42857143),
			(0.9166667, 0.84615386, 0.88),
		]
	);
	assert_eq!(metrics.accuracy, Some(0.7037037));
	assert_eq!(metrics.precision_average, 0.6686508);
	assert_eq!(metrics.recall_average, 0.65705127);
	assert_eq!(metrics.f_measure_average, 0.6584127);
}

#[test]
fn test_missing_class() {
	let mut metrics = ConfusionMatrix::new(3);
	update_all(&mut metrics, &[0, 0, 1, 1], &[0, 1, 1, 2]);
	let metrics = metrics.finalize();
	let class = &metrics.class_metrics[2];
	assert_eq!((class.n_examples, class.n_predicted, class.n_correct), (1, 0, 0));
	assert_eq!((class.precision, class.recall, class.f_measure), (0.0, 0.0, 0.0));
	assert_eq!(metrics.class_metrics[0].f_measure, 0.6666667);
	assert_eq!(metrics.accuracy, Some(0.5));
	assert_eq!(metrics.precision_average, 0.33333334);
	assert_eq!(metrics.f_measure_average, 0.3888889);
	assert_eq!(ConfusionMatrix::new(2).finalize().accuracy, None);
}
