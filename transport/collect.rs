use crate::{
	pack::{Packer, Unpacker},
	receive_subset, receive_trees, send_subset, send_trees, Channel, Source, Tag, TransportOptions,
	ROOT_RANK,
};
use anyhow::{bail, Result};
use copse_dataset::{Ensemble, Subset, Tree};

/// The coordinator answers each worker's request to send a tree with one of these codes. A worker asks by sending `SendOneTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreePassingCode {
	/// Stop building trees.
	SendNoTree,
	/// Send the tree that was just built.
	SendOneTree,
	/// Discard the tree that was just built and receive a new partition to build trees on.
	ReceiveNewData,
}

impl TreePassingCode {
	fn to_u32(self) -> u32 {
		match self {
			TreePassingCode::SendNoTree => 0,
			TreePassingCode::SendOneTree => 1,
			TreePassingCode::ReceiveNewData => 2,
		}
	}

	fn from_u32(code: u32) -> Result<TreePassingCode> {
		match code {
			0 => Ok(TreePassingCode::SendNoTree),
			1 => Ok(TreePassingCode::SendOneTree),
			2 => Ok(TreePassingCode::ReceiveNewData),
			_ => bail!("unknown tree passing code {}", code),
		}
	}
}

fn send_code<C>(channel: &C, dest: usize, code: TreePassingCode) -> Result<()>
where
	C: Channel + ?Sized,
{
	let mut packer = Packer::new();
	packer.pack_u32(code.to_u32());
	channel.send(dest, Tag::PermToSend, packer.into_bytes())
}

fn recv_code<C>(channel: &C, source: Source) -> Result<(usize, TreePassingCode)>
where
	C: Channel + ?Sized,
{
	let message = channel.recv(source, Tag::PermToSend)?;
	let mut unpacker = Unpacker::new(&message.bytes);
	let code = TreePassingCode::from_u32(unpacker.unpack_u32()?)?;
	unpacker.finish()?;
	Ok((message.source, code))
}

/**
Run the coordinator's side of distributed tree building and return one ensemble of `n_trees` trees per partition.

The partitions are first dealt to the workers round robin. Each worker then repeatedly builds a tree and asks permission to send it. While the worker's partition needs more trees the coordinator accepts the tree. Once it has enough, the partition is marked complete and the worker is given the next incomplete partition after the one most recently assigned, or told to stop if every partition is complete. This returns once every worker has been told to stop.
*/
pub fn collect_trees<C>(
	channel: &C,
	partitions: &[Subset],
	n_trees: usize,
	options: &TransportOptions,
) -> Result<Vec<Ensemble>>
where
	C: Channel + ?Sized,
{
	if channel.rank() != ROOT_RANK {
		bail!("only rank {} can collect trees", ROOT_RANK);
	}
	let n_ranks = channel.n_ranks();
	if n_ranks < 2 {
		bail!("collecting trees requires at least one worker");
	}
	if partitions.is_empty() {
		bail!("collecting trees requires at least one partition");
	}
	let n_partitions = partitions.len();
	let mut ensembles: Vec<Ensemble> = partitions
		.iter()
		.map(|partition| Ensemble::new(partition.n_classes()))
		.collect();
	let mut is_complete = vec![false; n_partitions];
	let mut partition_for_worker = vec![0; n_ranks];
	let mut last_assigned = n_partitions - 1;
	for worker in (0..n_ranks).filter(|&rank| rank != ROOT_RANK) {
		last_assigned = (last_assigned + 1) % n_partitions;
		send_subset(channel, &partitions[last_assigned], worker, options)?;
		partition_for_worker[worker] = last_assigned;
	}

	let mut n_stopped = 0;
	while n_stopped < n_ranks - 1 {
		let (worker, code) = recv_code(channel, Source::Any)?;
		if code != TreePassingCode::SendOneTree {
			bail!("rank {} asked to send a tree with {:?}", worker, code);
		}
		let partition = partition_for_worker[worker];
		let ensemble = &mut ensembles[partition];
		if ensemble.n_trees() < n_trees {
			send_code(channel, worker, TreePassingCode::SendOneTree)?;
			let trees = receive_trees(channel, worker, ensemble.n_classes, 1, options)?;
			ensemble.trees.extend(trees);
			log::debug!(
				"received tree {} of partition {} from rank {}",
				ensemble.n_trees(),
				partition,
				worker
			);
			continue;
		}
		is_complete[partition] = true;
		let mut next = (last_assigned + 1) % n_partitions;
		while next != last_assigned && is_complete[next] {
			next = (next + 1) % n_partitions;
		}
		if is_complete[next] {
			send_code(channel, worker, TreePassingCode::SendNoTree)?;
			n_stopped += 1;
		} else {
			send_code(channel, worker, TreePassingCode::ReceiveNewData)?;
			send_subset(channel, &partitions[next], worker, options)?;
			partition_for_worker[worker] = next;
			last_assigned = next;
		}
	}
	log::info!(
		"collected {} trees for {} partitions from {} workers",
		ensembles.iter().map(|ensemble| ensemble.n_trees()).sum::<usize>(),
		n_partitions,
		n_ranks - 1
	);
	Ok(ensembles)
}

/**
Run a worker's side of distributed tree building. `grow` builds one tree from the partition the worker currently holds. This returns the number of trees the coordinator accepted.
*/
pub fn serve_trees<C, F>(channel: &C, options: &TransportOptions, mut grow: F) -> Result<usize>
where
	C: Channel + ?Sized,
	F: FnMut(&Subset) -> Result<Tree>,
{
	let mut partition = receive_subset(channel, ROOT_RANK, options)?;
	let mut n_sent = 0;
	loop {
		let tree = grow(&partition)?;
		send_code(channel, ROOT_RANK, TreePassingCode::SendOneTree)?;
		let (_, code) = recv_code(channel, Source::Rank(ROOT_RANK))?;
		match code {
			TreePassingCode::SendOneTree => {
				send_trees(channel, &[tree], partition.n_classes(), options)?;
				n_sent += 1;
			}
			TreePassingCode::ReceiveNewData => {
				partition = receive_subset(channel, ROOT_RANK, options)?;
			}
			TreePassingCode::SendNoTree => break,
		}
	}
	Ok(n_sent)
}

#[cfg(test)]
use crate::{subset::fixture, LocalNetwork};
#[cfg(test)]
use copse_dataset::{LeafNode, Node};

#[cfg(test)]
fn run(n_workers: usize, partitions: Vec<Subset>, n_trees: usize) -> (Vec<Ensemble>, usize) {
	let options = TransportOptions::default();
	let mut channels = LocalNetwork::new(n_workers + 1).into_channels();
	let coordinator = channels.remove(0);
	let handles: Vec<_> = channels
		.into_iter()
		.map(|channel| {
			let options = options.clone();
			std::thread::spawn(move || {
				serve_trees(&channel, &options, |partition| {
					let leaf = LeafNode::from_class_counts(
						partition.metadata.n_examples_per_class.clone(),
					);
					Ok(Tree {
						nodes: vec![Node::Leaf(leaf)],
					})
				})
			})
		})
		.collect();
	let ensembles = collect_trees(&coordinator, &partitions, n_trees, &options).unwrap();
	let n_sent = handles
		.into_iter()
		.map(|handle| handle.join().unwrap().unwrap())
		.sum();
	(ensembles, n_sent)
}

#[test]
fn test_collect_trees() {
	let partitions = vec![fixture(30), fixture(7), fixture(12)];
	let (ensembles, n_sent) = run(2, partitions.clone(), 4);
	assert_eq!(n_sent, 12);
	for (ensemble, partition) in ensembles.iter().zip(partitions.iter()) {
		assert_eq!(ensemble.n_trees(), 4);
		// Each tree is a single leaf holding the class counts of the partition it was built on.
		for tree in ensemble.trees.iter() {
			match &tree.nodes[0] {
				Node::Leaf(leaf) => {
					assert_eq!(leaf.class_counts, partition.metadata.n_examples_per_class)
				}
				Node::Branch(_) => unreachable!(),
			}
		}
	}
}

#[test]
fn test_collect_trees_with_more_workers_than_partitions() {
	let (ensembles, n_sent) = run(3, vec![fixture(9)], 5);
	assert_eq!(n_sent, 5);
	assert_eq!(ensembles.len(), 1);
	assert_eq!(ensembles[0].n_trees(), 5);
}

#[test]
fn test_collect_no_trees() {
	let (ensembles, n_sent) = run(2, vec![fixture(9), fixture(4)], 0);
	assert_eq!(n_sent, 0);
	assert!(ensembles.iter().all(|ensemble| ensemble.n_trees() == 0));
}

#[test]
fn test_tree_passing_codes() {
	for code in [
		TreePassingCode::SendNoTree,
		TreePassingCode::SendOneTree,
		TreePassingCode::ReceiveNewData,
	]
	.iter()
	{
		assert_eq!(TreePassingCode::from_u32(code.to_u32()).unwrap(), *code);
	}
	assert!(TreePassingCode::from_u32(3).is_err());
}
