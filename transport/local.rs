use crate::{Channel, Envelope, Message, Source, Tag};
use anyhow::{bail, format_err, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::{
	cell::RefCell,
	collections::VecDeque,
	sync::{Arc, Barrier},
};

/**
A `LocalNetwork` connects ranks running as threads of one process. Each rank owns one [`LocalChannel`](struct.LocalChannel.html), which can be moved to the thread that runs the rank.

Sends never block. A receive blocks until a matching message arrives, and fails once every other rank has dropped its channel.
*/
pub struct LocalNetwork {
	channels: Vec<LocalChannel>,
}

impl LocalNetwork {
	pub fn new(n_ranks: usize) -> LocalNetwork {
		let (senders, receivers): (Vec<Sender<Message>>, Vec<Receiver<Message>>) =
			(0..n_ranks).map(|_| unbounded()).unzip();
		let barrier = Arc::new(Barrier::new(n_ranks));
		let channels = receivers
			.into_iter()
			.enumerate()
			.map(|(rank, receiver)| LocalChannel {
				rank,
				// A rank holds no sender to itself so its receiver disconnects once every other rank is gone.
				senders: senders
					.iter()
					.enumerate()
					.map(|(dest, sender)| if dest == rank { None } else { Some(sender.clone()) })
					.collect(),
				receiver,
				pending: RefCell::new(VecDeque::new()),
				barrier: barrier.clone(),
			})
			.collect();
		LocalNetwork { channels }
	}

	pub fn into_channels(self) -> Vec<LocalChannel> {
		self.channels
	}
}

pub struct LocalChannel {
	rank: usize,
	senders: Vec<Option<Sender<Message>>>,
	receiver: Receiver<Message>,
	/// These are messages that arrived while waiting for a message with a different source or tag.
	pending: RefCell<VecDeque<Message>>,
	barrier: Arc<Barrier>,
}

impl LocalChannel {
	fn find_pending(
		&self,
		pending: &mut VecDeque<Message>,
		source: Source,
		tag: Tag,
	) -> Result<usize> {
		loop {
			let index = pending
				.iter()
				.position(|message| message.tag == tag && source.matches(message.source));
			if let Some(index) = index {
				return Ok(index);
			}
			let message = self.receiver.recv().map_err(|_| {
				format_err!(
					"rank {} is waiting for a {:?} message but every other rank has disconnected",
					self.rank,
					tag
				)
			})?;
			pending.push_back(message);
		}
	}
}

impl Channel for LocalChannel {
	fn rank(&self) -> usize {
		self.rank
	}

	fn n_ranks(&self) -> usize {
		self.senders.len()
	}

	fn send(&self, dest: usize, tag: Tag, bytes: Vec<u8>) -> Result<()> {
		let sender = match self.senders.get(dest) {
			Some(Some(sender)) => sender,
			Some(None) => bail!("rank {} cannot send a message to itself", self.rank),
			None => bail!(
				"rank {} does not exist, there are {} ranks",
				dest,
				self.senders.len()
			),
		};
		let message = Message {
			source: self.rank,
			tag,
			bytes,
		};
		sender
			.send(message)
			.map_err(|_| format_err!("rank {} has disconnected", dest))
	}

	fn probe(&self, source: Source, tag: Tag) -> Result<Envelope> {
		let mut pending = self.pending.borrow_mut();
		let index = self.find_pending(&mut pending, source, tag)?;
		Ok(pending[index].envelope())
	}

	fn recv(&self, source: Source, tag: Tag) -> Result<Message> {
		let mut pending = self.pending.borrow_mut();
		let index = self.find_pending(&mut pending, source, tag)?;
		pending
			.remove(index)
			.ok_or_else(|| format_err!("pending message {} is missing", index))
	}

	fn barrier(&self) -> Result<()> {
		self.barrier.wait();
		Ok(())
	}
}

#[test]
fn test_messages_are_matched_by_tag() {
	let mut channels = LocalNetwork::new(2).into_channels();
	let b = channels.pop().unwrap();
	let a = channels.pop().unwrap();
	a.send(1, Tag::SubsetData, vec![1]).unwrap();
	a.send(1, Tag::SubsetMeta, vec![2, 2]).unwrap();
	a.send(1, Tag::SubsetData, vec![3]).unwrap();
	let envelope = b.probe(Source::Rank(0), Tag::SubsetMeta).unwrap();
	insta::assert_debug_snapshot!(envelope, @r###"
 Envelope {
     source: 0,
     tag: SubsetMeta,
     len: 2,
 }
 "###);
	assert_eq!(b.recv(Source::Rank(0), Tag::SubsetMeta).unwrap().bytes, vec![2, 2]);
	assert_eq!(b.recv(Source::Any, Tag::SubsetData).unwrap().bytes, vec![1]);
	assert_eq!(b.recv(Source::Any, Tag::SubsetData).unwrap().bytes, vec![3]);
}

#[test]
fn test_invalid_destinations() {
	let channels = LocalNetwork::new(2).into_channels();
	assert!(channels[0].send(0, Tag::Options, vec![]).is_err());
	assert!(channels[0].send(2, Tag::Options, vec![]).is_err());
}

#[test]
fn test_disconnected_peer() {
	let mut channels = LocalNetwork::new(2).into_channels();
	let b = channels.pop().unwrap();
	let a = channels.pop().unwrap();
	a.send(1, Tag::TreeNode, vec![7]).unwrap();
	drop(a);
	assert_eq!(b.recv(Source::Rank(0), Tag::TreeNode).unwrap().bytes, vec![7]);
	assert!(b.recv(Source::Rank(0), Tag::TreeNode).is_err());
	assert!(b.send(0, Tag::TreeNode, vec![]).is_err());
}

#[test]
fn test_barrier() {
	let channels = LocalNetwork::new(3).into_channels();
	let handles: Vec<_> = channels
		.into_iter()
		.map(|channel| {
			std::thread::spawn(move || {
				if channel.rank() != 0 {
					channel.send(0, Tag::PermToSend, vec![]).unwrap();
				}
				channel.barrier().unwrap();
				if channel.rank() == 0 {
					channel.recv(Source::Any, Tag::PermToSend).unwrap();
					channel.recv(Source::Any, Tag::PermToSend).unwrap();
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
}
