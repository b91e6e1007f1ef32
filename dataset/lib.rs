/*!
This crate defines the data model shared by the rest of copse: the [`Metadata`](struct.Metadata.html) describing a dataset, the [`Example`](struct.Example.html)s and [`Subset`](struct.Subset.html)s that training operates on, and the [`Tree`](struct.Tree.html)s and [`Ensemble`](struct.Ensemble.html)s that training produces.

Attribute values are stored pre-discretized. Each value is a "distinct value", an index into a per-attribute sorted table of the unique values observed for that attribute.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod ensemble;
mod subset;
mod tree;

pub use self::ensemble::Ensemble;
pub use self::subset::Subset;
pub use self::tree::{BranchNode, BranchSplit, LeafNode, Node, Tree};

use thiserror::Error;

/// An attribute is either continuous, in which case splits are two-way comparisons against a threshold, or discrete, in which case splits have one branch per level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttributeType {
	#[serde(rename = "continuous")]
	Continuous,
	#[serde(rename = "discrete")]
	Discrete,
}

/// `Metadata` describes the shape of a dataset or of a subset of one.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
	/// This is the number of distinct class labels.
	pub n_classes: usize,
	/// This is the type of each attribute.
	pub attribute_types: Vec<AttributeType>,
	/// For discrete attributes this is the arity. It is 0 for continuous attributes.
	pub n_discrete_values: Vec<usize>,
	/// This is the number of examples with each class label.
	pub n_examples_per_class: Vec<usize>,
}

impl Metadata {
	pub fn n_attributes(&self) -> usize {
		self.attribute_types.len()
	}

	pub fn n_examples(&self) -> usize {
		self.n_examples_per_class.iter().sum()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Example {
	/// This is the distinct value index of each attribute.
	pub distinct_values: Vec<usize>,
	/// This is the index of the example's class label.
	pub class: usize,
	/// This is the fold or partition the example was assigned to.
	pub fold: usize,
	/// This is the example's position within its class after clump assignment.
	pub clump: usize,
	/// This is a random id used to shuffle examples.
	pub random_id: u64,
	/// This is the index of the example in the full dataset.
	pub global_id: usize,
}

impl Example {
	pub fn new(distinct_values: Vec<usize>, class: usize) -> Example {
		Example {
			distinct_values,
			class,
			fold: 0,
			clump: 0,
			random_id: 0,
			global_id: 0,
		}
	}
}

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
	#[error("node {node_index} references child {child_index} but the tree has {n_nodes} nodes")]
	ChildOutOfRange {
		node_index: usize,
		child_index: usize,
		n_nodes: usize,
	},
	#[error("node {node_index} has {n_children} children but its split requires {expected}")]
	WrongChildCount {
		node_index: usize,
		n_children: usize,
		expected: usize,
	},
	#[error("leaf {node_index} has class {class} but there are only {n_classes} classes")]
	LabelOutOfRange {
		node_index: usize,
		class: usize,
		n_classes: usize,
	},
	#[error("leaf {node_index} has {len} class counts but there are {n_classes} classes")]
	WrongClassCountLength {
		node_index: usize,
		len: usize,
		n_classes: usize,
	},
	#[error("the tree has no nodes")]
	EmptyTree,
	#[error("ensembles with {left} and {right} classes cannot be combined")]
	ClassCountMismatch { left: usize, right: usize },
	#[error("ensemble has {n_trees} trees but {n_betas} boosting weights")]
	BetaCountMismatch { n_trees: usize, n_betas: usize },
}
