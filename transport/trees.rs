use crate::{
	pack::{ChunkReader, ChunkWriter, Packer, Unpacker, U32_SIZE},
	Channel, Tag, TransportOptions, ROOT_RANK,
};
use anyhow::{bail, Context, Result};
use copse_dataset::{BranchNode, BranchSplit, LeafNode, Node, Tree};

const LEAF: u32 = 0;
const BRANCH: u32 = 1;
const CONTINUOUS: u32 = 0;
const DISCRETE: u32 = 1;

/**
Send `trees` to the coordinator.

Each tree is packed as its node count followed by its nodes. Every node starts with its kind. A leaf adds its class, its class counts and its class probabilities. A branch adds its attribute, its split and its child indexes. Whole trees are batched into as few messages as the ceiling allows, and it is an error if a single tree does not fit in a message by itself.
*/
pub fn send_trees<C>(
	channel: &C,
	trees: &[Tree],
	n_classes: usize,
	options: &TransportOptions,
) -> Result<()>
where
	C: Channel + ?Sized,
{
	let mut writer = ChunkWriter::new(channel, ROOT_RANK, Tag::TreeNode, options.ceiling);
	for (tree_index, tree) in trees.iter().enumerate() {
		tree.validate(n_classes)?;
		let record = pack_tree(tree);
		if record.len() > writer.max_record_len() {
			bail!(
				"tree {} has {} nodes and packs to {} bytes which is too big for a message of at most {} bytes",
				tree_index,
				tree.n_nodes(),
				record.len(),
				options.ceiling
			);
		}
		writer.push(&record)?;
	}
	writer.finish()?;
	Ok(())
}

fn pack_tree(tree: &Tree) -> Vec<u8> {
	let mut packer = Packer::new();
	packer.pack_usize(tree.n_nodes());
	for node in tree.nodes.iter() {
		match node {
			Node::Leaf(leaf) => {
				packer.pack_u32(LEAF);
				packer.pack_usize(leaf.class);
				packer.pack_usizes(&leaf.class_counts);
				packer.pack_f32s(&leaf.probabilities);
			}
			Node::Branch(branch) => {
				packer.pack_u32(BRANCH);
				packer.pack_usize(branch.attribute_index);
				match branch.split {
					BranchSplit::Continuous { threshold } => {
						packer.pack_u32(CONTINUOUS);
						packer.pack_f32(threshold);
					}
					BranchSplit::Discrete { n_branches } => {
						packer.pack_u32(DISCRETE);
						packer.pack_usize(n_branches);
					}
				}
				packer.pack_usizes(&branch.children);
			}
		}
	}
	packer.into_bytes()
}

/// Unpack one tree written by [`send_trees`](fn.send_trees.html). Leaves hold `n_classes` class counts and probabilities. The unpacked tree is validated before it is returned.
pub fn receive_one_tree(unpacker: &mut Unpacker, n_classes: usize) -> Result<Tree> {
	let n_nodes = unpacker.unpack_usize()?;
	// Every node packs at least its kind.
	unpacker.check_count(n_nodes, U32_SIZE)?;
	let mut nodes = Vec::with_capacity(n_nodes);
	for _ in 0..n_nodes {
		let node = match unpacker.unpack_u32()? {
			LEAF => {
				let class = unpacker.unpack_usize()?;
				let class_counts = unpacker.unpack_usizes(n_classes)?;
				let probabilities = unpacker.unpack_f32s(n_classes)?;
				Node::Leaf(LeafNode {
					class,
					class_counts,
					probabilities,
				})
			}
			BRANCH => {
				let attribute_index = unpacker.unpack_usize()?;
				let split = match unpacker.unpack_u32()? {
					CONTINUOUS => BranchSplit::Continuous {
						threshold: unpacker.unpack_f32()?,
					},
					DISCRETE => BranchSplit::Discrete {
						n_branches: unpacker.unpack_usize()?,
					},
					code => bail!("unknown split kind {}", code),
				};
				let children = unpacker.unpack_usizes(split.n_branches())?;
				Node::Branch(BranchNode {
					attribute_index,
					split,
					children,
				})
			}
			code => bail!("unknown node kind {}", code),
		};
		nodes.push(node);
	}
	let tree = Tree { nodes };
	tree.validate(n_classes)?;
	Ok(tree)
}

/// Receive `n_trees` trees sent by [`send_trees`](fn.send_trees.html) from rank `source`.
pub fn receive_trees<C>(
	channel: &C,
	source: usize,
	n_classes: usize,
	n_trees: usize,
	options: &TransportOptions,
) -> Result<Vec<Tree>>
where
	C: Channel + ?Sized,
{
	let mut trees = Vec::with_capacity(n_trees);
	let reader = ChunkReader::new(channel, source, Tag::TreeNode, options.ceiling);
	reader
		.read(n_trees, |unpacker| {
			trees.push(receive_one_tree(unpacker, n_classes)?);
			Ok(())
		})
		.with_context(|| format!("failed to receive trees from rank {}", source))?;
	Ok(trees)
}

#[cfg(test)]
use crate::{LocalNetwork, Source};

#[cfg(test)]
fn discrete_tree() -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				attribute_index: 1,
				split: BranchSplit::Discrete { n_branches: 3 },
				children: vec![1, 2, 3],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![3, 0, 1])),
			Node::Branch(BranchNode {
				attribute_index: 0,
				split: BranchSplit::Continuous { threshold: 2.75 },
				children: vec![4, 5],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![0, 0, 6])),
			Node::Leaf(LeafNode::from_class_counts(vec![1, 4, 0])),
			Node::Leaf(LeafNode::from_class_counts(vec![2, 2, 2])),
		],
	}
}

#[cfg(test)]
fn leaf_tree(class: usize) -> Tree {
	let mut class_counts = vec![0; 3];
	class_counts[class] = 5;
	Tree {
		nodes: vec![Node::Leaf(LeafNode::from_class_counts(class_counts))],
	}
}

#[test]
fn test_pack_tree() {
	// Node count, then a leaf with kind, class, 3 counts and 3 probabilities.
	assert_eq!(pack_tree(&leaf_tree(1)).len(), 8 + 4 + 8 + 3 * 8 + 3 * 4);
	let bytes = pack_tree(&discrete_tree());
	let tree = receive_one_tree(&mut Unpacker::new(&bytes), 3).unwrap();
	assert_eq!(tree, discrete_tree());
}

#[test]
fn test_trees_round_trip() {
	let trees = vec![discrete_tree(), leaf_tree(0), leaf_tree(2), discrete_tree()];
	// The leaf trees are 56 bytes each, so a small ceiling forces several batches.
	let options = TransportOptions { ceiling: 512 };
	let mut channels = LocalNetwork::new(2).into_channels();
	let coordinator = channels.remove(0);
	let worker = channels.remove(0);
	let sent = trees.clone();
	let send_options = options.clone();
	let handle = std::thread::spawn(move || send_trees(&worker, &sent, 3, &send_options));
	let received = receive_trees(&coordinator, 1, 3, trees.len(), &options).unwrap();
	handle.join().unwrap().unwrap();
	assert_eq!(received, trees);
}

#[test]
fn test_trees_are_batched() {
	let options = TransportOptions {
		ceiling: 8 + 2 * 56,
	};
	let channels = LocalNetwork::new(2).into_channels();
	let trees: Vec<Tree> = (0..5).map(|i| leaf_tree(i % 3)).collect();
	send_trees(&channels[1], &trees, 3, &options).unwrap();
	let n_trees_per_message: Vec<usize> = (0..3)
		.map(|_| {
			let message = channels[0].recv(Source::Rank(1), Tag::TreeNode).unwrap();
			Unpacker::new(&message.bytes).unpack_usize().unwrap()
		})
		.collect();
	assert_eq!(n_trees_per_message, vec![2, 2, 1]);
}

#[test]
fn test_receive_malformed_tree() {
	let mut packer = Packer::new();
	packer.pack_usize(usize::MAX / 2);
	packer.pack_u32(LEAF);
	let bytes = packer.into_bytes();
	assert!(receive_one_tree(&mut Unpacker::new(&bytes), 3).is_err());
	// A discrete branch declaring more children than the message holds.
	let mut packer = Packer::new();
	packer.pack_usize(1);
	packer.pack_u32(BRANCH);
	packer.pack_usize(0);
	packer.pack_u32(DISCRETE);
	packer.pack_usize(usize::MAX);
	let bytes = packer.into_bytes();
	assert!(receive_one_tree(&mut Unpacker::new(&bytes), 3).is_err());
	let mut packer = Packer::new();
	packer.pack_usize(1);
	packer.pack_u32(7);
	let bytes = packer.into_bytes();
	assert!(receive_one_tree(&mut Unpacker::new(&bytes), 3).is_err());
}

#[test]
fn test_tree_too_big() {
	let options = TransportOptions { ceiling: 100 };
	let channels = LocalNetwork::new(2).into_channels();
	assert!(send_trees(&channels[1], &[leaf_tree(0)], 3, &options).is_ok());
	assert!(send_trees(&channels[1], &[discrete_tree()], 3, &options).is_err());
	assert!(send_trees(&channels[1], &[leaf_tree(0)], 2, &options).is_err());
}
