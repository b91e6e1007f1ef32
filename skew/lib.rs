/*!
This crate corrects for class imbalance by training on "clumps". Every clump holds all of the examples of each minority class and a slice of each majority class sized so that the minority classes make up their target proportions. Cycling through the clumps eventually visits every majority example.

# Example

```
use copse_dataset::{AttributeType, Metadata};
use copse_skew::{SkewCorrector, SkewOptions};

let metadata = Metadata {
	n_classes: 2,
	attribute_types: vec![AttributeType::Continuous],
	n_discrete_values: vec![0],
	n_examples_per_class: vec![10000, 100],
};
let options = SkewOptions {
	minority_classes: vec![1],
	proportions: vec![0.5],
	..Default::default()
};
let corrector = SkewCorrector::new(&metadata, options).unwrap();
assert_eq!(corrector.plan().n_clumps, 100);
assert_eq!(corrector.plan().n_examples_per_clump, 200);
```
*/

#![allow(clippy::tabs_in_doc_comments)]

mod balanced_set;
mod clumps;

pub use self::balanced_set::assign_clump_numbers;
pub use self::clumps::{compute_number_of_clumps, ClumpPlan};

use anyhow::Result;
use copse_dataset::Metadata;

/// These are the options for balanced learning.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SkewOptions {
	/// These are the indexes of the minority classes.
	pub minority_classes: Vec<usize>,
	/// This is the target proportion of each clump for each class in `minority_classes`.
	pub proportions: Vec<f32>,
	/// This controls how each training round subsamples a clump.
	pub sampling: Sampling,
}

impl Default for SkewOptions {
	fn default() -> SkewOptions {
		SkewOptions {
			minority_classes: Vec::new(),
			proportions: Vec::new(),
			sampling: Sampling::None,
		}
	}
}

/// The per-round subsample drawn by the ensemble method.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Sampling {
	#[serde(rename = "none")]
	None,
	/// Bagging with a bag of `bag_size` percent of the dataset.
	#[serde(rename = "bagging")]
	Bagging { bag_size: f32 },
	/// Bagging with the bag size set to the size of a clump.
	#[serde(rename = "majority_bagging")]
	MajorityBagging,
	/// Ivoting with bites of `bite_size` examples.
	#[serde(rename = "ivoting")]
	Ivoting { bite_size: usize },
	/// Ivoting with the bite size set to the size of a clump.
	#[serde(rename = "majority_ivoting")]
	MajorityIvoting,
}

/// A `SkewCorrector` holds the clump plan for a dataset and produces balanced subsets from it.
#[derive(Clone, Debug)]
pub struct SkewCorrector {
	options: SkewOptions,
	plan: ClumpPlan,
}

impl SkewCorrector {
	/// Plan the clumps for a dataset described by `metadata`. This fails if the options are structurally infeasible, for example if a bite is larger than a clump.
	pub fn new(metadata: &Metadata, options: SkewOptions) -> Result<SkewCorrector> {
		let plan = compute_number_of_clumps(metadata, &options)?;
		Ok(SkewCorrector { options, plan })
	}

	pub fn plan(&self) -> &ClumpPlan {
		&self.plan
	}

	pub fn options(&self) -> &SkewOptions {
		&self.options
	}
}
