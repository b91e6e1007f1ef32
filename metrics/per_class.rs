use super::{mean::Mean, StreamingMetric};
use ndarray::prelude::*;

/// The input to metrics that score a predicted class distribution against the label of an example.
pub struct ClassProbabilities<'a> {
	/// (n_classes)
	pub probabilities: ArrayView1<'a, f32>,
	pub label: usize,
}

/// A metric reported for each class, averaged over the classes, and over all examples.
#[derive(Debug, PartialEq)]
pub struct PerClassOutput {
	/// This is `None` for a class with nothing to score.
	pub per_class: Vec<Option<f32>>,
	/// The mean over the classes that have a value.
	pub class_average: Option<f32>,
	/// The value over all examples, for metrics that have one.
	pub overall: Option<f32>,
}

impl PerClassOutput {
	pub(crate) fn new(per_class: Vec<Option<f32>>, overall: Option<f32>) -> PerClassOutput {
		let mut class_average = Mean::new();
		for value in per_class.iter().flatten() {
			class_average.update(*value);
		}
		PerClassOutput {
			per_class,
			class_average: class_average.finalize(),
			overall,
		}
	}
}

/// The mean of a per example loss, both within each class and over all examples.
#[derive(Clone, Debug)]
pub(crate) struct ClassMean {
	per_class: Vec<Mean>,
	overall: Mean,
}

impl ClassMean {
	pub fn new(n_classes: usize) -> ClassMean {
		ClassMean {
			per_class: vec![Mean::new(); n_classes],
			overall: Mean::new(),
		}
	}

	pub fn update(&mut self, label: usize, value: f32) {
		self.per_class[label].update(value);
		self.overall.update(value);
	}

	pub fn merge(&mut self, other: ClassMean) {
		for (mean, other) in self.per_class.iter_mut().zip(other.per_class) {
			mean.merge(other);
		}
		self.overall.merge(other.overall);
	}

	pub fn finalize(self) -> PerClassOutput {
		let per_class = self.per_class.into_iter().map(|mean| mean.finalize()).collect();
		PerClassOutput::new(per_class, self.overall.finalize())
	}
}

#[test]
fn test_class_mean() {
	let mut a = ClassMean::new(3);
	a.update(0, 1.0);
	a.update(0, 3.0);
	let mut b = ClassMean::new(3);
	b.update(1, 4.0);
	a.merge(b);
	insta::assert_debug_snapshot!(a.finalize(), @r###"
 PerClassOutput {
     per_class: [
         Some(
             2.0,
         ),
         Some(
             4.0,
         ),
         None,
     ],
     class_average: Some(
         3.0,
     ),
     overall: Some(
         2.6666667,
     ),
 }
 "###);
}
