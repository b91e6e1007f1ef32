use crate::{DatasetError, Tree};

/// An `Ensemble` is an ordered list of trees. When it was trained with boosting it also carries one weight, `beta`, per tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Ensemble {
	pub n_classes: usize,
	pub trees: Vec<Tree>,
	pub boosting_betas: Option<Vec<f32>>,
}

impl Ensemble {
	pub fn new(n_classes: usize) -> Ensemble {
		Ensemble {
			n_classes,
			trees: Vec::new(),
			boosting_betas: None,
		}
	}

	pub fn n_trees(&self) -> usize {
		self.trees.len()
	}

	pub fn validate(&self) -> Result<(), DatasetError> {
		if let Some(betas) = &self.boosting_betas {
			if betas.len() != self.trees.len() {
				return Err(DatasetError::BetaCountMismatch {
					n_trees: self.trees.len(),
					n_betas: betas.len(),
				});
			}
		}
		for tree in self.trees.iter() {
			tree.validate(self.n_classes)?;
		}
		Ok(())
	}

	/// Append the trees of `other` to this ensemble. Every tree of `other` is validated against this ensemble's class count first so a failed concatenation leaves `self` unchanged. Boosting weights are kept only if both ensembles have them.
	pub fn concat(&mut self, other: Ensemble) -> Result<(), DatasetError> {
		if other.n_classes != self.n_classes {
			return Err(DatasetError::ClassCountMismatch {
				left: self.n_classes,
				right: other.n_classes,
			});
		}
		for tree in other.trees.iter() {
			tree.validate(self.n_classes)?;
		}
		self.boosting_betas = match (self.boosting_betas.take(), other.boosting_betas) {
			(Some(mut betas), Some(other_betas)) => {
				betas.extend(other_betas);
				Some(betas)
			}
			_ => None,
		};
		self.trees.extend(other.trees);
		Ok(())
	}
}

#[test]
fn test_concat() {
	use crate::tree::stump;
	let mut left = Ensemble {
		n_classes: 2,
		trees: vec![stump(1.5)],
		boosting_betas: Some(vec![0.5]),
	};
	let right = Ensemble {
		n_classes: 2,
		trees: vec![stump(2.5), stump(3.5)],
		boosting_betas: Some(vec![0.25, 0.125]),
	};
	left.concat(right).unwrap();
	assert_eq!(left.n_trees(), 3);
	assert_eq!(left.boosting_betas, Some(vec![0.5, 0.25, 0.125]));
	assert_eq!(left.validate(), Ok(()));
	let mismatched = Ensemble {
		n_classes: 3,
		trees: vec![],
		boosting_betas: None,
	};
	assert_eq!(
		left.concat(mismatched),
		Err(DatasetError::ClassCountMismatch { left: 2, right: 3 })
	);
	assert_eq!(left.n_trees(), 3);
}
