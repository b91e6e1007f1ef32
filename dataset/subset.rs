use crate::{AttributeType, Example, Metadata};

/// A `Subset` is a collection of examples along with the per-attribute `[low, high]` bounds of their distinct values and the per-class example counts. Both are recomputed whenever the subset is filtered.
#[derive(Clone, Debug, PartialEq)]
pub struct Subset {
	pub metadata: Metadata,
	/// For continuous attributes this is the table mapping distinct value indexes to attribute values. It is empty for discrete attributes.
	pub value_tables: Vec<Vec<f32>>,
	/// Discrete attributes that were split on by an ancestor node are marked here and never split on again.
	pub discrete_used: Vec<bool>,
	pub low: Vec<usize>,
	pub high: Vec<usize>,
	pub examples: Vec<Example>,
}

impl Subset {
	/// Create a subset from a set of examples. The class counts in `metadata` are replaced with the counts computed from `examples`.
	pub fn new(metadata: Metadata, value_tables: Vec<Vec<f32>>, examples: Vec<Example>) -> Subset {
		let n_attributes = metadata.n_attributes();
		let mut subset = Subset {
			metadata,
			value_tables,
			discrete_used: vec![false; n_attributes],
			low: vec![0; n_attributes],
			high: vec![0; n_attributes],
			examples,
		};
		subset.update_class_counts();
		subset.update_bounds();
		subset
	}

	pub fn n_examples(&self) -> usize {
		self.examples.len()
	}

	pub fn n_classes(&self) -> usize {
		self.metadata.n_classes
	}

	pub fn n_attributes(&self) -> usize {
		self.metadata.n_attributes()
	}

	pub fn attribute_type(&self, attribute_index: usize) -> AttributeType {
		self.metadata.attribute_types[attribute_index]
	}

	/// Look up the attribute value for a distinct value index of a continuous attribute.
	pub fn value(&self, attribute_index: usize, distinct_value: usize) -> f32 {
		self.value_tables[attribute_index][distinct_value]
	}

	pub fn update_class_counts(&mut self) {
		let mut counts = vec![0; self.metadata.n_classes];
		for example in self.examples.iter() {
			counts[example.class] += 1;
		}
		self.metadata.n_examples_per_class = counts;
	}

	/// Recompute the `[low, high]` bounds. Continuous attributes are bounded by the smallest and largest distinct values present. Discrete attributes always span every level.
	pub fn update_bounds(&mut self) {
		for attribute_index in 0..self.n_attributes() {
			match self.metadata.attribute_types[attribute_index] {
				AttributeType::Continuous => {
					let mut values = self
						.examples
						.iter()
						.map(|example| example.distinct_values[attribute_index]);
					let (low, high) = match values.next() {
						Some(first) => values.fold((first, first), |(low, high), value| {
							(low.min(value), high.max(value))
						}),
						None => (0, 0),
					};
					self.low[attribute_index] = low;
					self.high[attribute_index] = high;
				}
				AttributeType::Discrete => {
					self.low[attribute_index] = 0;
					self.high[attribute_index] =
						self.metadata.n_discrete_values[attribute_index].saturating_sub(1);
				}
			}
		}
	}

	/// Create a new subset containing the examples for which `f` returns true. The bounds and class counts of the new subset are recomputed and `discrete_used` is carried over.
	pub fn filter<F>(&self, mut f: F) -> Subset
	where
		F: FnMut(&Example) -> bool,
	{
		let examples = self
			.examples
			.iter()
			.filter(|example| f(example))
			.cloned()
			.collect();
		let mut subset = Subset::new(self.metadata.clone(), self.value_tables.clone(), examples);
		subset.discrete_used = self.discrete_used.clone();
		subset
	}

	/// Select the examples in fold `fold`, or every example not in it if `complement` is true.
	pub fn fold(&self, fold: usize, complement: bool) -> Subset {
		self.filter(|example| (example.fold == fold) != complement)
	}
}

#[cfg(test)]
pub(crate) fn fixture() -> Subset {
	let metadata = Metadata {
		n_classes: 2,
		attribute_types: vec![AttributeType::Continuous, AttributeType::Discrete],
		n_discrete_values: vec![0, 3],
		n_examples_per_class: vec![],
	};
	let value_tables = vec![(0..10).map(|v| v as f32).collect(), vec![]];
	let classes = [0, 0, 0, 0, 1, 0, 1, 1, 1, 1];
	let examples = classes
		.iter()
		.enumerate()
		.map(|(i, &class)| Example {
			fold: i % 2,
			global_id: i,
			..Example::new(vec![i, i % 3], class)
		})
		.collect();
	Subset::new(metadata, value_tables, examples)
}

#[test]
fn test_new_computes_counts_and_bounds() {
	let subset = fixture();
	assert_eq!(subset.metadata.n_examples_per_class, vec![5, 5]);
	assert_eq!(subset.metadata.n_examples(), 10);
	assert_eq!(subset.low, vec![0, 0]);
	assert_eq!(subset.high, vec![9, 2]);
}

#[test]
fn test_filter_recomputes_bounds() {
	let subset = fixture();
	let left = subset.filter(|example| example.distinct_values[0] <= 3);
	assert_eq!(left.metadata.n_examples_per_class, vec![4, 0]);
	assert_eq!(left.low[0], 0);
	assert_eq!(left.high[0], 3);
	let right = subset.filter(|example| example.distinct_values[0] > 3);
	assert_eq!(right.metadata.n_examples_per_class, vec![1, 5]);
	assert_eq!(right.low[0], 4);
	assert_eq!(right.high[0], 9);
	assert_eq!(right.high[1], 2);
}

#[test]
fn test_fold() {
	let subset = fixture();
	let even = subset.fold(0, false);
	let odd = subset.fold(0, true);
	assert_eq!(even.n_examples(), 5);
	assert_eq!(odd.n_examples(), 5);
	assert!(even.examples.iter().all(|example| example.global_id % 2 == 0));
	assert_eq!(odd.low[0], 1);
}
