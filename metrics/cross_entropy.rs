use super::{
	per_class::{ClassMean, ClassProbabilities, PerClassOutput},
	StreamingMetric,
};

/// The smallest probability scored, so that a confident wrong prediction costs a finite amount.
const MIN_PROBABILITY: f32 = 1e-6;

/// CrossEntropy is the negative log2 of the probability predicted for the label of an example. [Learn more](https://en.wikipedia.org/wiki/Cross_entropy).
#[derive(Clone, Debug)]
pub struct CrossEntropy(ClassMean);

impl CrossEntropy {
	pub fn new(n_classes: usize) -> CrossEntropy {
		CrossEntropy(ClassMean::new(n_classes))
	}
}

impl<'a> StreamingMetric<'a> for CrossEntropy {
	type Input = ClassProbabilities<'a>;
	type Output = PerClassOutput;

	fn update(&mut self, input: ClassProbabilities) {
		let probability = input.probabilities[input.label].max(MIN_PROBABILITY);
		self.0.update(input.label, -probability.log2())
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Self::Output {
		self.0.finalize()
	}
}

#[cfg(test)]
use ndarray::prelude::*;

#[test]
fn test_cross_entropy() {
	let probabilities = arr2(&[[0.5f32, 0.5], [0.25, 0.75], [0.0, 1.0], [0.125, 0.875]]);
	let labels = [0, 0, 0, 1];
	let mut first = CrossEntropy::new(2);
	let mut second = CrossEntropy::new(2);
	for (index, (probabilities, label)) in probabilities
		.genrows()
		.into_iter()
		.zip(labels.iter())
		.enumerate()
	{
		let metric = if index < 2 { &mut first } else { &mut second };
		metric.update(ClassProbabilities {
			probabilities,
			label: *label,
		});
	}
	first.merge(second);
	let cross_entropy = first.finalize();
	// -log2(1e-6) is 19.931568.
	let expected_class_0 = (1.0 + 2.0 + 19.931_568) / 3.0;
	let expected_class_1 = -(0.875f32.log2());
	let close = |a: Option<f32>, b: f32| (a.unwrap() - b).abs() < 1e-4;
	assert!(close(cross_entropy.per_class[0], expected_class_0));
	assert!(close(cross_entropy.per_class[1], expected_class_1));
	assert!(close(
		cross_entropy.class_average,
		(expected_class_0 + expected_class_1) / 2.0
	));
	assert!(close(
		cross_entropy.overall,
		(1.0 + 2.0 + 19.931_568 + expected_class_1) / 4.0
	));
}
