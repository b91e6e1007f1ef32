use num_traits::ToPrimitive;

/// Compute the base 2 logarithm of `x`, defined as 0 for `x < 1e-6` instead of `-inf`.
pub fn dlog_2(x: f64) -> f64 {
	if x < 0.000_001 {
		0.0
	} else {
		x.ln() / 2.0f64.ln()
	}
}

/// A `Log2Table` memoizes `dlog_2` for the integer counts that entropy computations are made of.
#[derive(Debug, Default)]
pub struct Log2Table {
	values: Vec<f64>,
}

impl Log2Table {
	pub fn new() -> Log2Table {
		Log2Table::default()
	}

	pub fn dlog_2_int(&mut self, x: usize) -> f64 {
		if x >= self.values.len() {
			let start = self.values.len();
			self.values
				.extend((start..=x).map(|n| dlog_2(n.to_f64().unwrap())));
		}
		self.values[x]
	}

	/// Drop every memoized value.
	pub fn reset(&mut self) {
		self.values.clear();
		self.values.shrink_to_fit();
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

#[test]
fn test_dlog_2() {
	assert_eq!(dlog_2(2.0), 1.0);
	assert_eq!(dlog_2(1024.0), 10.0);
	assert_eq!(dlog_2(1.0), 0.0);
	assert_eq!(dlog_2(0.0), 0.0);
	assert_eq!(dlog_2(0.000_000_1), 0.0);
	assert!(dlog_2(0.5) < 0.0);
}

#[test]
fn test_dlog_2_int_matches_dlog_2() {
	let mut table = Log2Table::new();
	for i in (0..10_000).rev() {
		assert_eq!(table.dlog_2_int(i), dlog_2(i as f64));
	}
	assert_eq!(table.len(), 10_000);
	table.reset();
	assert!(table.is_empty());
	assert_eq!(table.dlog_2_int(8), 3.0);
}
