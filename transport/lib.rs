/*!
This crate moves training data and trained trees between the ranks of a distributed training run. Rank 0 is the coordinator and every other rank is a worker.

Every message is a flat byte buffer in host-native byte order, so ranks must share an architecture. No message may be larger than the ceiling in [`TransportOptions`](struct.TransportOptions.html). Large payloads are streamed as a sequence of self-describing chunks, each starting with the number of records it holds.

The ranks talk over any [`Channel`](trait.Channel.html). [`LocalNetwork`](struct.LocalNetwork.html) connects ranks running as threads of one process.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod broadcast;
mod channel;
mod collect;
mod local;
mod pack;
mod subset;
mod trees;

pub use self::broadcast::broadcast_options;
pub use self::channel::{Channel, Envelope, Message, Source};
pub use self::collect::{collect_trees, serve_trees, TreePassingCode};
pub use self::local::{LocalChannel, LocalNetwork};
pub use self::pack::{ChunkReader, ChunkWriter, Packer, Unpacker};
pub use self::subset::{receive_subset, send_subset};
pub use self::trees::{receive_one_tree, receive_trees, send_trees};

/// This is the rank of the coordinator.
pub const ROOT_RANK: usize = 0;

/// These are the options for the transport.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransportOptions {
	/// This is the largest number of bytes allowed in a single message.
	pub ceiling: usize,
}

impl Default for TransportOptions {
	fn default() -> TransportOptions {
		TransportOptions { ceiling: 25_000_000 }
	}
}

/// Every message carries a tag naming what kind of message it is. A receiver only ever matches messages with the tag it asks for, so the kinds never interleave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
	SubsetMeta,
	SubsetData,
	PermToSend,
	TreeNode,
	Options,
}
