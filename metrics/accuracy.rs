use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of `(prediction, label)` pairs where the prediction equals the label.
#[derive(Clone, Debug, Default)]
pub struct Accuracy(Mean);

impl Accuracy {
	pub fn new() -> Accuracy {
		Accuracy::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	type Input = (usize, usize);
	type Output = Option<f32>;

	fn update(&mut self, (prediction, label): Self::Input) {
		self.0.update(if prediction == label { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut accuracy = Accuracy::new();
	for pair in [(0, 0), (1, 0), (2, 2), (1, 1)].iter() {
		accuracy.update(*pair);
	}
	assert_eq!(accuracy.finalize(), Some(0.75));
	assert_eq!(Accuracy::new().finalize(), None);
}
