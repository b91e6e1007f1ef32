use crate::Tag;
use anyhow::Result;

/// The ranks a receive will accept a message from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
	Any,
	Rank(usize),
}

impl Source {
	pub fn matches(self, rank: usize) -> bool {
		match self {
			Source::Any => true,
			Source::Rank(source) => source == rank,
		}
	}
}

/// An `Envelope` describes a message that has arrived but has not been received yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
	pub source: usize,
	pub tag: Tag,
	/// This is the length of the message in bytes.
	pub len: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
	pub source: usize,
	pub tag: Tag,
	pub bytes: Vec<u8>,
}

impl Message {
	pub fn envelope(&self) -> Envelope {
		Envelope {
			source: self.source,
			tag: self.tag,
			len: self.bytes.len(),
		}
	}
}

/**
A `Channel` connects one rank to every other rank of a run.

Messages from one source with one tag are received in the order they were sent. Messages with different tags are independent, so a receiver waiting on one tag never consumes a message with another.
*/
pub trait Channel {
	/// This is the rank of this end of the channel.
	fn rank(&self) -> usize;

	/// This is the number of ranks in the run, including the coordinator.
	fn n_ranks(&self) -> usize;

	fn send(&self, dest: usize, tag: Tag, bytes: Vec<u8>) -> Result<()>;

	/// Block until a message with `tag` from `source` has arrived and describe it without receiving it.
	fn probe(&self, source: Source, tag: Tag) -> Result<Envelope>;

	/// Block until a message with `tag` from `source` has arrived and receive it.
	fn recv(&self, source: Source, tag: Tag) -> Result<Message>;

	/// Block until every rank has entered the barrier.
	fn barrier(&self) -> Result<()>;
}
