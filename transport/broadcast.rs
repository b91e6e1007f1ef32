use crate::{Channel, Source, Tag, ROOT_RANK};
use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};

/**
Send the coordinator's options to every worker. The coordinator passes `Some(options)` and every worker passes `None`. Every rank returns the coordinator's options.

The broadcast is framed by barriers on both sides so no worker starts before the coordinator has finished resolving its options, and no rank continues until every worker has them.
*/
pub fn broadcast_options<C, T>(channel: &C, options: Option<T>) -> Result<T>
where
	C: Channel + ?Sized,
	T: Serialize + DeserializeOwned,
{
	channel.barrier()?;
	let options = if channel.rank() == ROOT_RANK {
		let options = match options {
			Some(options) => options,
			None => bail!("the coordinator must provide the options to broadcast"),
		};
		let bytes = serde_json::to_vec(&options).context("failed to serialize the options")?;
		for dest in (0..channel.n_ranks()).filter(|&rank| rank != ROOT_RANK) {
			channel.send(dest, Tag::Options, bytes.clone())?;
		}
		options
	} else {
		let message = channel.recv(Source::Rank(ROOT_RANK), Tag::Options)?;
		serde_json::from_slice(&message.bytes).context("failed to deserialize the options")?
	};
	channel.barrier()?;
	Ok(options)
}

#[cfg(test)]
use crate::{LocalNetwork, TransportOptions};

#[test]
fn test_broadcast_options() {
	let channels = LocalNetwork::new(3).into_channels();
	let handles: Vec<_> = channels
		.into_iter()
		.map(|channel| {
			std::thread::spawn(move || {
				let options = if channel.rank() == ROOT_RANK {
					Some(TransportOptions { ceiling: 1234 })
				} else {
					None
				};
				broadcast_options(&channel, options)
			})
		})
		.collect();
	for handle in handles {
		let options = handle.join().unwrap().unwrap();
		assert_eq!(options, TransportOptions { ceiling: 1234 });
	}
}
