use super::{
	per_class::{ClassMean, ClassProbabilities, PerClassOutput},
	StreamingMetric,
};

/// The Brier score of an example is the squared distance between its predicted class distribution and the one hot distribution of its label. [Learn more](https://en.wikipedia.org/wiki/Brier_score).
#[derive(Clone, Debug)]
pub struct BrierScore(ClassMean);

impl BrierScore {
	pub fn new(n_classes: usize) -> BrierScore {
		BrierScore(ClassMean::new(n_classes))
	}
}

impl<'a> StreamingMetric<'a> for BrierScore {
	type Input = ClassProbabilities<'a>;
	type Output = PerClassOutput;

	fn update(&mut self, input: ClassProbabilities) {
		let score = input
			.probabilities
			.indexed_iter()
			.map(|(class, probability)| {
				let target: f32 = if class == input.label { 1.0 } else { 0.0 };
				(target - *probability).powi(2)
			})
			.sum::<f32>();
		self.0.update(input.label, score)
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
fn test_brier_score() {
	let probabilities = arr2(&[[0.75f32, 0.25], [0.5, 0.5], [1.0, 0.0]]);
	let labels = [0, 1, 0];
	let mut brier_score = BrierScore::new(2);
	for (probabilities, label) in probabilities.genrows().into_iter().zip(labels.iter()) {
		brier_score.update(ClassProbabilities {
			probabilities,
			label: *label,
		});
	}
	let brier_score = brier_score.finalize();
	assert_eq!(brier_score.per_class, vec![Some(0.0625), Some(0.5)]);
	assert_eq!(brier_score.class_average, Some(0.28125));
	assert_eq!(brier_score.overall, Some(0.20833333));
}
