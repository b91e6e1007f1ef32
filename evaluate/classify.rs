use copse_dataset::{BranchSplit, Example, LeafNode, Node, Subset, Tree};

fn find_leaf<'a>(tree: &'a Tree, subset: &Subset, example: &Example) -> (usize, &'a LeafNode) {
	// Start at the root node.
	let mut node_index = 0;
	// Traverse the tree until we get to a leaf.
	loop {
		match &tree.nodes[node_index] {
			Node::Leaf(leaf) => return (node_index, leaf),
			Node::Branch(branch) => {
				let distinct_value = example.distinct_values[branch.attribute_index];
				node_index = match branch.split {
					BranchSplit::Continuous { threshold } => {
						if subset.value(branch.attribute_index, distinct_value) < threshold {
							branch.children[0]
						} else {
							branch.children[1]
						}
					}
					BranchSplit::Discrete { .. } => branch.children[distinct_value],
				};
			}
		}
	}
}

/**
Classify `example` with `tree` and return the predicted class and the index of the leaf that predicted it.

Continuous branches send the example to the first child if its value is less than the threshold and to the second otherwise. Discrete branches send it to the child at the index of its distinct value. `subset` supplies the value tables the example's distinct values refer to.
*/
pub fn classify_example(tree: &Tree, subset: &Subset, example: &Example) -> (usize, usize) {
	let (leaf_index, leaf) = find_leaf(tree, subset, example);
	(leaf.class, leaf_index)
}

/// Return the class probabilities of the leaf `example` reaches in `tree`.
pub fn find_example_probabilities<'a>(
	tree: &'a Tree,
	subset: &Subset,
	example: &Example,
) -> &'a [f32] {
	let (_, leaf) = find_leaf(tree, subset, example);
	&leaf.probabilities
}

#[cfg(test)]
pub(crate) fn fixture_subset() -> Subset {
	use copse_dataset::{AttributeType, Metadata};
	let metadata = Metadata {
		n_classes: 3,
		attribute_types: vec![AttributeType::Continuous, AttributeType::Discrete],
		n_discrete_values: vec![0, 3],
		n_examples_per_class: vec![],
	};
	let value_tables = vec![vec![-1.0, 0.5, 2.0, 4.5], vec![]];
	let examples = vec![
		Example::new(vec![0, 0], 0),
		Example::new(vec![1, 2], 0),
		Example::new(vec![2, 1], 1),
		Example::new(vec![3, 1], 1),
		Example::new(vec![3, 2], 2),
		Example::new(vec![2, 0], 2),
	];
	Subset::new(metadata, value_tables, examples)
}

/// Split on the continuous attribute at `threshold`, then split the right side on the discrete attribute.
#[cfg(test)]
pub(crate) fn fixture_tree(threshold: f32) -> Tree {
	use copse_dataset::BranchNode;
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				attribute_index: 0,
				split: BranchSplit::Continuous { threshold },
				children: vec![1, 2],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![2, 0, 0])),
			Node::Branch(BranchNode {
				attribute_index: 1,
				split: BranchSplit::Discrete { n_branches: 3 },
				children: vec![3, 4, 5],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![0, 0, 1])),
			Node::Leaf(LeafNode::from_class_counts(vec![0, 2, 0])),
			Node::Leaf(LeafNode::from_class_counts(vec![0, 1, 1])),
		],
	}
}

#[test]
fn test_classify_example() {
	let subset = fixture_subset();
	let tree = fixture_tree(1.0);
	let predictions: Vec<(usize, usize)> = subset
		.examples
		.iter()
		.map(|example| classify_example(&tree, &subset, example))
		.collect();
	assert_eq!(
		predictions,
		vec![(0, 1), (0, 1), (1, 4), (1, 4), (1, 5), (2, 3)]
	);
	// A value equal to the threshold goes right.
	let tree = fixture_tree(0.5);
	assert_eq!(classify_example(&tree, &subset, &subset.examples[1]), (1, 5));
	assert_eq!(
		classify_example(&tree, &subset, &subset.examples[1]),
		classify_example(&tree, &subset, &subset.examples[1])
	);
}

#[test]
fn test_find_example_probabilities() {
	let subset = fixture_subset();
	let tree = fixture_tree(1.0);
	insta::assert_debug_snapshot!(find_example_probabilities(&tree, &subset, &subset.examples[4]), @r###"
 [
     0.2,
     0.4,
     0.4,
 ]
 "###);
}
