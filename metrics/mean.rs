use super::StreamingMetric;
use num_traits::ToPrimitive;

/// The arithmetic mean of the inputs, or `None` if there were none.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl Mean {
	pub fn new() -> Mean {
		Mean::default()
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f32;
	type Output = Option<f32>;

	fn update(&mut self, value: f32) {
		self.n += 1;
		let n = self.n.to_f64().unwrap();
		self.mean += (value.to_f64().unwrap() - self.mean) / n;
	}

	fn merge(&mut self, other: Self) {
		if other.n == 0 {
			return;
		}
		let n_a = self.n.to_f64().unwrap();
		let n_b = other.n.to_f64().unwrap();
		self.mean = ((n_a * self.mean) + (n_b * other.mean)) / (n_a + n_b);
		self.n += other.n;
	}

	fn finalize(self) -> Option<f32> {
		if self.n > 0 {
			Some(self.mean.to_f32().unwrap())
		} else {
			None
		}
	}
}

#[test]
fn test_mean() {
	let mut mean = Mean::new();
	for value in [1.0, 2.0, 3.0, 4.0].iter() {
		mean.update(*value);
	}
	let mut other = Mean::new();
	other.update(10.0);
	mean.merge(other);
	mean.merge(Mean::new());
	assert_eq!(mean.finalize(), Some(4.0));
	assert_eq!(Mean::new().finalize(), None);
}
