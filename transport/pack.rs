use crate::{Channel, Source, Tag};
use anyhow::{bail, format_err, Result};
use num_traits::ToPrimitive;

/// Counts and indexes are packed as 8 byte unsigned integers.
pub const USIZE_SIZE: usize = 8;
pub const U32_SIZE: usize = 4;
pub const F32_SIZE: usize = 4;

/// A `Packer` appends values to a byte buffer in host-native byte order.
#[derive(Debug, Default)]
pub struct Packer {
	bytes: Vec<u8>,
}

impl Packer {
	pub fn new() -> Packer {
		Packer::default()
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	pub fn pack_u32(&mut self, value: u32) {
		self.bytes.extend_from_slice(&value.to_ne_bytes());
	}

	pub fn pack_u64(&mut self, value: u64) {
		self.bytes.extend_from_slice(&value.to_ne_bytes());
	}

	pub fn pack_usize(&mut self, value: usize) {
		self.pack_u64(value.to_u64().unwrap());
	}

	pub fn pack_f32(&mut self, value: f32) {
		self.bytes.extend_from_slice(&value.to_ne_bytes());
	}

	pub fn pack_usizes(&mut self, values: &[usize]) {
		for value in values {
			self.pack_usize(*value);
		}
	}

	pub fn pack_f32s(&mut self, values: &[f32]) {
		for value in values {
			self.pack_f32(*value);
		}
	}

	pub fn pack_bytes(&mut self, bytes: &[u8]) {
		self.bytes.extend_from_slice(bytes);
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}
}

/// An `Unpacker` reads values written by a [`Packer`](struct.Packer.html) in the same order they were packed.
pub struct Unpacker<'a> {
	bytes: &'a [u8],
	position: usize,
}

impl<'a> Unpacker<'a> {
	pub fn new(bytes: &'a [u8]) -> Unpacker<'a> {
		Unpacker { bytes, position: 0 }
	}

	pub fn is_finished(&self) -> bool {
		self.position == self.bytes.len()
	}

	/// The number of bytes not yet read.
	pub fn remaining(&self) -> usize {
		self.bytes.len() - self.position
	}

	/// Fail unless there are enough bytes left to hold `count` values of at least `size` bytes each. Call this before trusting a count read from a message.
	pub fn check_count(&self, count: usize, size: usize) -> Result<()> {
		match count.checked_mul(size) {
			Some(n_bytes) if n_bytes <= self.remaining() => Ok(()),
			_ => bail!(
				"a count of {} does not fit in the {} bytes left in the message",
				count,
				self.remaining()
			),
		}
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8]> {
		let end = match self.position.checked_add(n) {
			Some(end) => end,
			None => bail!("attempted to read {} bytes at position {}", n, self.position),
		};
		if end > self.bytes.len() {
			bail!(
				"attempted to read {} bytes at position {} of a message with {} bytes",
				n,
				self.position,
				self.bytes.len()
			);
		}
		let bytes = &self.bytes[self.position..end];
		self.position = end;
		Ok(bytes)
	}

	pub fn unpack_u32(&mut self) -> Result<u32> {
		let mut bytes = [0u8; U32_SIZE];
		bytes.copy_from_slice(self.take(U32_SIZE)?);
		Ok(u32::from_ne_bytes(bytes))
	}

	pub fn unpack_u64(&mut self) -> Result<u64> {
		let mut bytes = [0u8; USIZE_SIZE];
		bytes.copy_from_slice(self.take(USIZE_SIZE)?);
		Ok(u64::from_ne_bytes(bytes))
	}

	pub fn unpack_usize(&mut self) -> Result<usize> {
		let value = self.unpack_u64()?;
		value
			.to_usize()
			.ok_or_else(|| format_err!("{} does not fit in a usize", value))
	}

	pub fn unpack_f32(&mut self) -> Result<f32> {
		let mut bytes = [0u8; F32_SIZE];
		bytes.copy_from_slice(self.take(F32_SIZE)?);
		Ok(f32::from_ne_bytes(bytes))
	}

	pub fn unpack_usizes(&mut self, n: usize) -> Result<Vec<usize>> {
		self.check_count(n, USIZE_SIZE)?;
		(0..n).map(|_| self.unpack_usize()).collect()
	}

	pub fn unpack_f32s(&mut self, n: usize) -> Result<Vec<f32>> {
		self.check_count(n, F32_SIZE)?;
		(0..n).map(|_| self.unpack_f32()).collect()
	}

	/// Fail if any bytes were left unread.
	pub fn finish(&self) -> Result<()> {
		if !self.is_finished() {
			bail!(
				"{} bytes were left unread at the end of a message",
				self.bytes.len() - self.position
			);
		}
		Ok(())
	}
}

/**
A `ChunkWriter` streams records to one rank as a sequence of messages no larger than the ceiling. Each message starts with the number of records it holds, followed by the records themselves.

Records are collected until the next one would overflow the ceiling, at which point the collected records are sent as one chunk. A record too large to fit in a chunk by itself is an error.
*/
pub struct ChunkWriter<'a, C>
where
	C: Channel + ?Sized,
{
	channel: &'a C,
	dest: usize,
	tag: Tag,
	ceiling: usize,
	n_records: usize,
	records: Vec<u8>,
	n_records_written: usize,
}

impl<'a, C> ChunkWriter<'a, C>
where
	C: Channel + ?Sized,
{
	pub fn new(channel: &'a C, dest: usize, tag: Tag, ceiling: usize) -> ChunkWriter<'a, C> {
		ChunkWriter {
			channel,
			dest,
			tag,
			ceiling,
			n_records: 0,
			records: Vec::new(),
			n_records_written: 0,
		}
	}

	/// This is the largest record that fits in a chunk.
	pub fn max_record_len(&self) -> usize {
		self.ceiling.saturating_sub(USIZE_SIZE)
	}

	pub fn push(&mut self, record: &[u8]) -> Result<()> {
		if record.len() > self.max_record_len() {
			bail!(
				"a record of {} bytes does not fit in a message of at most {} bytes",
				record.len(),
				self.ceiling
			);
		}
		if USIZE_SIZE + self.records.len() + record.len() > self.ceiling {
			self.flush()?;
		}
		self.records.extend_from_slice(record);
		self.n_records += 1;
		Ok(())
	}

	fn flush(&mut self) -> Result<()> {
		if self.n_records == 0 {
			return Ok(());
		}
		let mut packer = Packer::new();
		packer.pack_usize(self.n_records);
		packer.pack_bytes(&self.records);
		log::debug!(
			"rank {} is sending {} {:?} records ({} bytes) to rank {}",
			self.channel.rank(),
			self.n_records,
			self.tag,
			packer.len(),
			self.dest
		);
		self.channel.send(self.dest, self.tag, packer.into_bytes())?;
		self.n_records_written += self.n_records;
		self.n_records = 0;
		self.records.clear();
		Ok(())
	}

	/// Send any records not yet sent and return the total number of records written.
	pub fn finish(mut self) -> Result<usize> {
		self.flush()?;
		Ok(self.n_records_written)
	}
}

/// A `ChunkReader` receives the chunks written by a [`ChunkWriter`](struct.ChunkWriter.html).
pub struct ChunkReader<'a, C>
where
	C: Channel + ?Sized,
{
	channel: &'a C,
	source: usize,
	tag: Tag,
	ceiling: usize,
}

impl<'a, C> ChunkReader<'a, C>
where
	C: Channel + ?Sized,
{
	pub fn new(channel: &'a C, source: usize, tag: Tag, ceiling: usize) -> ChunkReader<'a, C> {
		ChunkReader {
			channel,
			source,
			tag,
			ceiling,
		}
	}

	/// Receive chunks until `n_records` records have been read, calling `f` once to unpack each record.
	pub fn read<F>(&self, n_records: usize, mut f: F) -> Result<()>
	where
		F: FnMut(&mut Unpacker) -> Result<()>,
	{
		let mut n_records_read = 0;
		while n_records_read < n_records {
			let envelope = self.channel.probe(Source::Rank(self.source), self.tag)?;
			if envelope.len > self.ceiling {
				bail!(
					"a {:?} message of {} bytes is larger than the ceiling of {} bytes",
					self.tag,
					envelope.len,
					self.ceiling
				);
			}
			let message = self.channel.recv(Source::Rank(self.source), self.tag)?;
			let mut unpacker = Unpacker::new(&message.bytes);
			let n_records_in_chunk = unpacker.unpack_usize()?;
			if n_records_in_chunk == 0 || n_records_in_chunk > n_records - n_records_read {
				bail!(
					"a chunk declared {} records but {} of {} records remain",
					n_records_in_chunk,
					n_records - n_records_read,
					n_records
				);
			}
			for _ in 0..n_records_in_chunk {
				f(&mut unpacker)?;
			}
			unpacker.finish()?;
			n_records_read += n_records_in_chunk;
		}
		Ok(())
	}
}

#[cfg(test)]
use crate::LocalNetwork;

#[test]
fn test_unpack() {
	let mut packer = Packer::new();
	packer.pack_usize(3);
	packer.pack_u32(7);
	packer.pack_f32s(&[0.5, -1.25]);
	packer.pack_u64(u64::MAX);
	assert_eq!(packer.len(), USIZE_SIZE + U32_SIZE + 2 * F32_SIZE + USIZE_SIZE);
	let bytes = packer.into_bytes();
	let mut unpacker = Unpacker::new(&bytes);
	assert_eq!(unpacker.unpack_usize().unwrap(), 3);
	assert_eq!(unpacker.unpack_u32().unwrap(), 7);
	assert_eq!(unpacker.unpack_f32s(2).unwrap(), vec![0.5, -1.25]);
	assert!(!unpacker.is_finished());
	assert!(unpacker.finish().is_err());
	assert_eq!(unpacker.unpack_u64().unwrap(), u64::MAX);
	assert!(unpacker.is_finished());
	assert!(unpacker.unpack_u32().is_err());
}

#[test]
fn test_unpack_huge_count() {
	let mut packer = Packer::new();
	packer.pack_usizes(&[1, 2]);
	let bytes = packer.into_bytes();
	let mut unpacker = Unpacker::new(&bytes);
	assert_eq!(unpacker.remaining(), 2 * USIZE_SIZE);
	assert!(unpacker.check_count(2, USIZE_SIZE).is_ok());
	assert!(unpacker.check_count(3, USIZE_SIZE).is_err());
	assert!(unpacker.check_count(usize::MAX / 2, USIZE_SIZE).is_err());
	assert!(unpacker.unpack_usizes(usize::MAX).is_err());
	assert!(unpacker.unpack_f32s(5).is_err());
	assert_eq!(unpacker.unpack_usizes(2).unwrap(), vec![1, 2]);
}

#[cfg(test)]
fn write_values(channel: &impl Channel, tag: Tag, ceiling: usize, values: &[usize]) -> usize {
	let mut writer = ChunkWriter::new(channel, 1, tag, ceiling);
	for value in values {
		let mut record = Packer::new();
		record.pack_usize(*value);
		writer.push(&record.into_bytes()).unwrap();
	}
	writer.finish().unwrap()
}

#[test]
fn test_chunks_respect_the_ceiling() {
	let channels = LocalNetwork::new(2).into_channels();
	// Each record is one usize, so two records fit under a ceiling of 24 bytes.
	let ceiling = 3 * USIZE_SIZE;
	assert_eq!(write_values(&channels[0], Tag::SubsetData, ceiling, &[0, 1, 2, 3, 4]), 5);
	let lens: Vec<usize> = (0..3)
		.map(|_| {
			channels[1]
				.recv(Source::Rank(0), Tag::SubsetData)
				.unwrap()
				.bytes
				.len()
		})
		.collect();
	assert_eq!(lens, vec![24, 24, 16]);
	write_values(&channels[0], Tag::TreeNode, ceiling, &[5, 6, 7, 8, 9]);
	let reader = ChunkReader::new(&channels[1], 0, Tag::TreeNode, ceiling);
	let mut values = Vec::new();
	reader
		.read(5, |unpacker| {
			values.push(unpacker.unpack_usize()?);
			Ok(())
		})
		.unwrap();
	assert_eq!(values, vec![5, 6, 7, 8, 9]);
}

#[test]
fn test_malformed_chunk() {
	let channels = LocalNetwork::new(2).into_channels();
	write_values(&channels[0], Tag::SubsetData, 1024, &[0, 1, 2]);
	let reader = ChunkReader::new(&channels[1], 0, Tag::SubsetData, 1024);
	assert!(reader.read(2, |unpacker| unpacker.unpack_usize().map(|_| ())).is_err());
}

#[test]
fn test_record_larger_than_the_ceiling() {
	let channels = LocalNetwork::new(2).into_channels();
	let mut writer = ChunkWriter::new(&channels[0], 1, Tag::TreeNode, 16);
	assert!(writer.push(&[0; 8]).is_ok());
	assert!(writer.push(&[0; 9]).is_err());
}
