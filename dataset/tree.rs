use crate::DatasetError;
use num_traits::ToPrimitive;

/// Trees are stored as a `Vec` of `Node`s. The root is at index 0 and each branch holds the indexes of its children in the same `Vec`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	/// This is the index of the attribute the branch splits on.
	pub attribute_index: usize,
	pub split: BranchSplit,
	/// These are the indexes of the children in the tree's node vector. Continuous splits have two children. Discrete splits have one per level.
	pub children: Vec<usize>,
}

/// A continuous split sends an example to the first child if its value is less than `threshold` and to the second child otherwise. A discrete split sends it to the child at the index of its distinct value.
#[derive(Clone, Debug, PartialEq)]
pub enum BranchSplit {
	Continuous { threshold: f32 },
	Discrete { n_branches: usize },
}

impl BranchSplit {
	pub fn n_branches(&self) -> usize {
		match self {
			BranchSplit::Continuous { .. } => 2,
			BranchSplit::Discrete { n_branches } => *n_branches,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// This is the predicted class.
	pub class: usize,
	/// This is the number of training examples of each class that reached the leaf.
	pub class_counts: Vec<usize>,
	/// These are the Laplace smoothed class probabilities derived from `class_counts`.
	pub probabilities: Vec<f32>,
}

impl LeafNode {
	/// Create a leaf predicting the most frequent class in `class_counts`. Ties go to the lowest class index.
	pub fn from_class_counts(class_counts: Vec<usize>) -> LeafNode {
		let class = class_counts
			.iter()
			.enumerate()
			.fold((0, 0), |(best_class, best_count), (class, &count)| {
				if count > best_count {
					(class, count)
				} else {
					(best_class, best_count)
				}
			})
			.0;
		let probabilities = laplace_probabilities(&class_counts);
		LeafNode {
			class,
			class_counts,
			probabilities,
		}
	}
}

/// Compute `(count + 1) / (total + n_classes)` for each class.
pub fn laplace_probabilities(class_counts: &[usize]) -> Vec<f32> {
	let total: usize = class_counts.iter().sum();
	let denominator = (total + class_counts.len()).to_f32().unwrap();
	class_counts
		.iter()
		.map(|count| (count + 1).to_f32().unwrap() / denominator)
		.collect()
}

impl Tree {
	pub fn n_nodes(&self) -> usize {
		self.nodes.len()
	}

	/// Check that every child index is in range, that each branch has as many children as its split requires, and that every leaf describes a valid class.
	pub fn validate(&self, n_classes: usize) -> Result<(), DatasetError> {
		if self.nodes.is_empty() {
			return Err(DatasetError::EmptyTree);
		}
		let n_nodes = self.nodes.len();
		for (node_index, node) in self.nodes.iter().enumerate() {
			match node {
				Node::Branch(branch) => {
					let expected = branch.split.n_branches();
					if branch.children.len() != expected {
						return Err(DatasetError::WrongChildCount {
							node_index,
							n_children: branch.children.len(),
							expected,
						});
					}
					if let Some(&child_index) =
						branch.children.iter().find(|&&child| child >= n_nodes)
					{
						return Err(DatasetError::ChildOutOfRange {
							node_index,
							child_index,
							n_nodes,
						});
					}
				}
				Node::Leaf(leaf) => {
					if leaf.class >= n_classes {
						return Err(DatasetError::LabelOutOfRange {
							node_index,
							class: leaf.class,
							n_classes,
						});
					}
					if leaf.class_counts.len() != n_classes {
						return Err(DatasetError::WrongClassCountLength {
							node_index,
							len: leaf.class_counts.len(),
							n_classes,
						});
					}
				}
			}
		}
		Ok(())
	}
}

#[cfg(test)]
pub(crate) fn stump(threshold: f32) -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				attribute_index: 0,
				split: BranchSplit::Continuous { threshold },
				children: vec![1, 2],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![4, 0])),
			Node::Leaf(LeafNode::from_class_counts(vec![1, 5])),
		],
	}
}

#[test]
fn test_leaf_from_class_counts() {
	let leaf = LeafNode::from_class_counts(vec![1, 5, 5]);
	insta::assert_debug_snapshot!(leaf, @r###"
 LeafNode {
     class: 1,
     class_counts: [
         1,
         5,
         5,
     ],
     probabilities: [
         0.14285715,
         0.42857143,
         0.42857143,
     ],
 }
 "###);
}

#[test]
fn test_validate() {
	assert_eq!(stump(3.5).validate(2), Ok(()));
	assert_eq!(
		stump(3.5).validate(1),
		Err(DatasetError::WrongClassCountLength {
			node_index: 1,
			len: 2,
			n_classes: 1,
		})
	);
	let mut tree = stump(3.5);
	if let Node::Branch(branch) = &mut tree.nodes[0] {
		branch.children[1] = 7;
	}
	assert_eq!(
		tree.validate(2),
		Err(DatasetError::ChildOutOfRange {
			node_index: 0,
			child_index: 7,
			n_nodes: 3,
		})
	);
	let mut tree = stump(3.5);
	if let Node::Branch(branch) = &mut tree.nodes[0] {
		branch.split = BranchSplit::Discrete { n_branches: 3 };
	}
	assert!(matches!(
		tree.validate(2),
		Err(DatasetError::WrongChildCount { expected: 3, .. })
	));
	assert_eq!(Tree { nodes: vec![] }.validate(2), Err(DatasetError::EmptyTree));
}
