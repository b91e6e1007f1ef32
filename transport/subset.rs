use crate::{
	pack::{ChunkReader, ChunkWriter, Packer, Unpacker, U32_SIZE},
	Channel, Source, Tag, TransportOptions,
};
use anyhow::{bail, Context, Result};
use copse_dataset::{AttributeType, Example, Metadata, Subset};

/**
Send `subset` to rank `dest`.

The subset is sent as one metadata message followed by the examples in as many data chunks as the ceiling requires. The metadata message holds, in order: the number of classes, attributes and examples, the per-class counts, the attribute types, the discrete attributes already split on, the discrete arities, the `high` and `low` bounds, and the value table of each attribute. It is an error if the metadata alone is larger than the ceiling.
*/
pub fn send_subset<C>(
	channel: &C,
	subset: &Subset,
	dest: usize,
	options: &TransportOptions,
) -> Result<()>
where
	C: Channel + ?Sized,
{
	let n_attributes = subset.n_attributes();
	let mut packer = Packer::new();
	packer.pack_usize(subset.n_classes());
	packer.pack_usize(n_attributes);
	packer.pack_usize(subset.n_examples());
	packer.pack_usizes(&subset.metadata.n_examples_per_class);
	for attribute_type in subset.metadata.attribute_types.iter() {
		packer.pack_u32(match attribute_type {
			AttributeType::Continuous => 0,
			AttributeType::Discrete => 1,
		});
	}
	for used in subset.discrete_used.iter() {
		packer.pack_u32(if *used { 1 } else { 0 });
	}
	packer.pack_usizes(&subset.metadata.n_discrete_values);
	packer.pack_usizes(&subset.high);
	packer.pack_usizes(&subset.low);
	for value_table in subset.value_tables.iter() {
		packer.pack_usize(value_table.len());
		packer.pack_f32s(value_table);
	}
	if packer.len() > options.ceiling {
		bail!(
			"the subset metadata packs to {} bytes which is more than the ceiling of {} bytes, increase the ceiling",
			packer.len(),
			options.ceiling
		);
	}
	channel.send(dest, Tag::SubsetMeta, packer.into_bytes())?;

	let mut writer = ChunkWriter::new(channel, dest, Tag::SubsetData, options.ceiling);
	for example in subset.examples.iter() {
		let mut record = Packer::new();
		record.pack_usize(example.global_id);
		record.pack_usize(example.class);
		record.pack_usize(example.fold);
		record.pack_usize(example.clump);
		record.pack_u64(example.random_id);
		record.pack_usizes(&example.distinct_values);
		writer.push(&record.into_bytes())?;
	}
	let n_examples = writer.finish()?;
	log::debug!(
		"rank {} sent a subset of {} examples to rank {}",
		channel.rank(),
		n_examples,
		dest
	);
	Ok(())
}

/// Receive a subset sent by [`send_subset`](fn.send_subset.html) from rank `source`. The metadata message is received first and the data chunks are read until every example it declared has arrived.
pub fn receive_subset<C>(channel: &C, source: usize, options: &TransportOptions) -> Result<Subset>
where
	C: Channel + ?Sized,
{
	let envelope = channel.probe(Source::Rank(source), Tag::SubsetMeta)?;
	if envelope.len > options.ceiling {
		bail!(
			"the subset metadata is {} bytes which is more than the ceiling of {} bytes",
			envelope.len,
			options.ceiling
		);
	}
	let message = channel.recv(Source::Rank(source), Tag::SubsetMeta)?;
	let mut subset = unpack_metadata(&mut Unpacker::new(&message.bytes))
		.context("failed to unpack the subset metadata")?;

	let n_examples = subset.metadata.n_examples();
	let n_attributes = subset.n_attributes();
	let mut examples = Vec::new();
	let reader = ChunkReader::new(channel, source, Tag::SubsetData, options.ceiling);
	reader
		.read(n_examples, |unpacker| {
			let global_id = unpacker.unpack_usize()?;
			let class = unpacker.unpack_usize()?;
			let fold = unpacker.unpack_usize()?;
			let clump = unpacker.unpack_usize()?;
			let random_id = unpacker.unpack_u64()?;
			let distinct_values = unpacker.unpack_usizes(n_attributes)?;
			examples.push(Example {
				distinct_values,
				class,
				fold,
				clump,
				random_id,
				global_id,
			});
			Ok(())
		})
		.context("failed to receive the subset examples")?;
	subset.examples = examples;
	Ok(subset)
}

fn unpack_metadata(unpacker: &mut Unpacker) -> Result<Subset> {
	let n_classes = unpacker.unpack_usize()?;
	let n_attributes = unpacker.unpack_usize()?;
	let n_examples = unpacker.unpack_usize()?;
	let n_examples_per_class = unpacker.unpack_usizes(n_classes)?;
	let sum = n_examples_per_class
		.iter()
		.try_fold(0usize, |sum, n| sum.checked_add(*n));
	match sum {
		Some(sum) if sum == n_examples => {}
		Some(sum) => bail!(
			"the class counts sum to {} but the subset has {} examples",
			sum,
			n_examples
		),
		None => bail!("the class counts overflow"),
	}
	// Every attribute packs at least its type.
	unpacker.check_count(n_attributes, U32_SIZE)?;
	let attribute_types = (0..n_attributes)
		.map(|_| -> Result<AttributeType> {
			match unpacker.unpack_u32()? {
				0 => Ok(AttributeType::Continuous),
				1 => Ok(AttributeType::Discrete),
				code => bail!("unknown attribute type {}", code),
			}
		})
		.collect::<Result<Vec<_>>>()?;
	let discrete_used = (0..n_attributes)
		.map(|_| unpacker.unpack_u32().map(|used| used != 0))
		.collect::<Result<Vec<_>>>()?;
	let n_discrete_values = unpacker.unpack_usizes(n_attributes)?;
	let high = unpacker.unpack_usizes(n_attributes)?;
	let low = unpacker.unpack_usizes(n_attributes)?;
	let value_tables = (0..n_attributes)
		.map(|_| {
			let len = unpacker.unpack_usize()?;
			unpacker.unpack_f32s(len)
		})
		.collect::<Result<Vec<_>>>()?;
	unpacker.finish()?;
	Ok(Subset {
		metadata: Metadata {
			n_classes,
			attribute_types,
			n_discrete_values,
			n_examples_per_class,
		},
		value_tables,
		discrete_used,
		low,
		high,
		examples: Vec::new(),
	})
}

#[cfg(test)]
pub(crate) fn fixture(n_examples: usize) -> Subset {
	let metadata = Metadata {
		n_classes: 3,
		attribute_types: vec![AttributeType::Continuous, AttributeType::Discrete],
		n_discrete_values: vec![0, 4],
		n_examples_per_class: vec![],
	};
	let value_tables = vec![(0..n_examples).map(|v| v as f32 * 0.5).collect(), vec![]];
	let examples = (0..n_examples)
		.map(|i| Example {
			fold: i % 5,
			clump: i / 3,
			random_id: (i * 7919 % 101) as u64,
			global_id: 1000 + i,
			..Example::new(vec![i, i % 4], i % 3)
		})
		.collect();
	let mut subset = Subset::new(metadata, value_tables, examples);
	subset.discrete_used[1] = true;
	subset
}

#[cfg(test)]
use crate::LocalNetwork;

#[test]
fn test_subset_round_trip() {
	let subset = fixture(50);
	// Each example record is 56 bytes, so a chunk holds seven examples.
	let options = TransportOptions { ceiling: 400 };
	let mut channels = LocalNetwork::new(2).into_channels();
	let receiver = channels.pop().unwrap();
	let sender = channels.pop().unwrap();
	let sent = subset.clone();
	let send_options = options.clone();
	let handle = std::thread::spawn(move || send_subset(&sender, &sent, 1, &send_options));
	let received = receive_subset(&receiver, 0, &options).unwrap();
	handle.join().unwrap().unwrap();
	assert_eq!(received, subset);
	assert_eq!(received.metadata.n_examples_per_class, vec![17, 17, 16]);
	assert_eq!(received.low, vec![0, 0]);
	assert_eq!(received.high, vec![49, 3]);
}

#[test]
fn test_empty_subset_round_trip() {
	let subset = fixture(0);
	let options = TransportOptions::default();
	let channels = LocalNetwork::new(2).into_channels();
	send_subset(&channels[0], &subset, 1, &options).unwrap();
	assert_eq!(receive_subset(&channels[1], 0, &options).unwrap(), subset);
}

#[test]
fn test_unpack_malformed_metadata() {
	let unpack = |values: &[usize]| {
		let mut packer = Packer::new();
		packer.pack_usizes(values);
		let bytes = packer.into_bytes();
		unpack_metadata(&mut Unpacker::new(&bytes))
	};
	// n_classes, n_attributes, n_examples, then the class counts.
	let error = unpack(&[2, 0, usize::MAX, usize::MAX, 6]).unwrap_err();
	assert!(error.to_string().contains("overflow"));
	let error = unpack(&[2, 0, 5, 1, 2]).unwrap_err();
	assert!(error.to_string().contains("sum to 3"));
	assert!(unpack(&[usize::MAX / 2, 0, 0]).is_err());
	assert!(unpack(&[1, usize::MAX / 2, 0, 0]).is_err());
	assert!(unpack(&[1, 0, 0, 0]).is_ok());
}

#[test]
fn test_metadata_larger_than_the_ceiling() {
	let subset = fixture(50);
	let options = TransportOptions { ceiling: 100 };
	let channels = LocalNetwork::new(2).into_channels();
	assert!(send_subset(&channels[0], &subset, 1, &options).is_err());
}
