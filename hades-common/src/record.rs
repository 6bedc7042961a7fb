//! Event record encoding.
//!
//! A record is a 64 byte [`EventContext`] followed by fields appended in a
//! fixed order per event type. Each field is `index u8 | kind u8 | payload`,
//! integers are little endian:
//!
//! - `Str`: `len u32` then `len` bytes, no NUL.
//! - `StrArray`: `count u32 | total u32 | flags u8` then `count` times
//!   `len u32` + bytes. `total` is how many entries the source vector held,
//!   `count` how many of them made it into the record.
//! - `I32` / `U64`: the raw value.
//! - `U32Array`: `count u8` then `count` u32 values.
//!
//! Every append either lands completely or leaves the record untouched.

use zerocopy::{FromBytes, IntoBytes};

use crate::{
	consts::{EVENT_BUF_SIZE, MAX_STR_ARR_ELEM, MAX_STR_ARR_SCAN},
	event::{EventContext, FieldKind},
	Error, ReadFault, Result,
};

// -- Encoded sizes, for callers reserving room for later fields
pub const FIELD_HEADER_SIZE: usize = 2;
pub const I32_FIELD_SIZE: usize = FIELD_HEADER_SIZE + 4;
pub const STR_ARRAY_HEADER_SIZE: usize = FIELD_HEADER_SIZE + 9;

pub const fn str_field_size(bound: usize) -> usize {
	FIELD_HEADER_SIZE + 4 + bound
}

/// `StrArray` flag: the source vector had no terminator within the scan bound.
pub const STR_ARRAY_UNTERMINATED: u8 = 1;

pub struct EventRecord {
	buf: [u8; EVENT_BUF_SIZE],
	len: usize,
}

impl Default for EventRecord {
	fn default() -> Self {
		Self::new()
	}
}

impl EventRecord {
	pub const fn new() -> Self {
		Self {
			buf: [0u8; EVENT_BUF_SIZE],
			len: 0,
		}
	}

	/// Start a new record, dropping whatever the slot held before.
	pub fn init(&mut self, ctx: &EventContext) {
		let mut ctx = *ctx;
		ctx.argnum = 0;
		self.buf[..EventContext::SIZE].copy_from_slice(ctx.as_bytes());
		self.len = EventContext::SIZE;
	}

	pub fn argnum(&self) -> u8 {
		self.buf[EventContext::ARGNUM_OFFSET]
	}

	/// The encoded prefix, what goes out on submit.
	pub fn as_bytes(&self) -> &[u8] {
		self.buf.get(..self.len).unwrap_or(&[])
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn push_i32(&mut self, index: u8, value: i32) -> Result<()> {
		self.append(|rec| {
			rec.field_header(index, FieldKind::I32)?;
			rec.put(&value.to_le_bytes())
		})
	}

	pub fn push_u64(&mut self, index: u8, value: u64) -> Result<()> {
		self.append(|rec| {
			rec.field_header(index, FieldKind::U64)?;
			rec.put(&value.to_le_bytes())
		})
	}

	pub fn push_u32_array(&mut self, index: u8, values: &[u32]) -> Result<()> {
		let count = values.len().min(u8::MAX as usize);
		self.append(|rec| {
			rec.field_header(index, FieldKind::U32Array)?;
			rec.put(&[count as u8])?;
			for value in values.iter().take(count) {
				rec.put(&value.to_le_bytes())?;
			}
			Ok(())
		})
	}

	/// Append a string filled in place by `fill`, at most `bound` bytes.
	///
	/// `fill` gets the destination window and returns how many bytes it wrote.
	/// A faulting fill leaves an empty string so the field still occupies its
	/// position.
	pub fn push_str_with<F>(&mut self, index: u8, bound: usize, fill: F) -> Result<usize>
	where
		F: FnOnce(&mut [u8]) -> core::result::Result<usize, ReadFault>,
	{
		let mut written = 0;
		self.append(|rec| {
			rec.field_header(index, FieldKind::Str)?;
			let len_at = rec.len;
			rec.put(&0u32.to_le_bytes())?;
			let dst = rec.window(EVENT_BUF_SIZE, bound)?;
			let room = dst.len();
			written = fill(dst).unwrap_or(0).min(room);
			rec.commit(len_at, written)
		})?;
		Ok(written)
	}

	/// Append a string vector produced entry by entry.
	///
	/// `next(i, dst)` returns `None` once the vector ends, otherwise the bytes
	/// written into `dst` for entry `i`. An empty `dst` only asks whether entry
	/// `i` exists. Capture stops at [`MAX_STR_ARR_ELEM`] entries or when only
	/// `reserve` bytes are left, the last entry cut to what still fits.
	/// Remaining entries are counted up to [`MAX_STR_ARR_SCAN`]. Returns the
	/// number of entries kept.
	pub fn push_str_array<F>(&mut self, index: u8, elem_bound: usize, reserve: usize, mut next: F) -> Result<u32>
	where
		F: FnMut(usize, &mut [u8]) -> Option<core::result::Result<usize, ReadFault>>,
	{
		let limit = EVENT_BUF_SIZE.saturating_sub(reserve);
		let mut count = 0u32;
		self.append(|rec| {
			rec.field_header(index, FieldKind::StrArray)?;
			let header_at = rec.len;
			rec.put(&[0u8; 9])?;

			let mut total = 0u32;
			let mut terminated = false;
			for i in 0..MAX_STR_ARR_SCAN {
				let capture = i < MAX_STR_ARR_ELEM && rec.len + 4 < limit;
				if !capture {
					if next(i, &mut []).is_none() {
						terminated = true;
						break;
					}
					total += 1;
					continue;
				}

				let len_at = rec.len;
				rec.put(&0u32.to_le_bytes())?;
				let dst = rec.window(limit, elem_bound)?;
				let room = dst.len();
				let Some(read) = next(i, dst) else {
					rec.len = len_at;
					terminated = true;
					break;
				};
				rec.commit(len_at, read.unwrap_or(0).min(room))?;
				count += 1;
				total += 1;
			}

			let flags = if terminated { 0 } else { STR_ARRAY_UNTERMINATED };
			rec.patch_u32(header_at, count)?;
			rec.patch_u32(header_at + 4, total)?;
			rec.patch(header_at + 8, &[flags])
		})?;
		Ok(count)
	}

	// region:    --- Raw writes

	fn append<F>(&mut self, f: F) -> Result<()>
	where
		F: FnOnce(&mut Self) -> Result<()>,
	{
		if self.len < EventContext::SIZE {
			return Err(Error::RecordUnavailable);
		}
		let start = self.len;
		match f(self) {
			Ok(()) => {
				let argnum = &mut self.buf[EventContext::ARGNUM_OFFSET];
				*argnum = argnum.wrapping_add(1);
				Ok(())
			}
			Err(err) => {
				self.len = start;
				Err(err)
			}
		}
	}

	fn field_header(&mut self, index: u8, kind: FieldKind) -> Result<()> {
		self.put(&[index, kind as u8])
	}

	fn put(&mut self, bytes: &[u8]) -> Result<()> {
		let end = self.len.checked_add(bytes.len()).ok_or(Error::RecordFull)?;
		let dst = self.buf.get_mut(self.len..end).ok_or(Error::RecordFull)?;
		dst.copy_from_slice(bytes);
		self.len = end;
		Ok(())
	}

	/// Free space between the cursor and `limit`, capped at `bound`.
	fn window(&mut self, limit: usize, bound: usize) -> Result<&mut [u8]> {
		let room = limit.min(EVENT_BUF_SIZE).saturating_sub(self.len).min(bound);
		let end = self.len + room;
		self.buf.get_mut(self.len..end).ok_or(Error::RecordFull)
	}

	/// Accept `written` bytes of the window and fill in their length prefix.
	fn commit(&mut self, len_at: usize, written: usize) -> Result<()> {
		self.len = (len_at + 4 + written).min(EVENT_BUF_SIZE);
		self.patch_u32(len_at, written as u32)
	}

	fn patch_u32(&mut self, at: usize, value: u32) -> Result<()> {
		self.patch(at, &value.to_le_bytes())
	}

	fn patch(&mut self, at: usize, bytes: &[u8]) -> Result<()> {
		let dst = self.buf.get_mut(at..at + bytes.len()).ok_or(Error::RecordFull)?;
		dst.copy_from_slice(bytes);
		Ok(())
	}

	// endregion: --- Raw writes
}

// region:    --- Reader

/// Malformed record bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
	Truncated,
	UnknownFieldKind(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawField<'a> {
	pub index: u8,
	pub value: RawValue<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
	Str(&'a [u8]),
	StrArray(StrEntries<'a>),
	I32(i32),
	U64(u64),
	U32Array(U32Entries<'a>),
}

/// Positional reader over the fields of an encoded record.
pub struct RecordReader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> RecordReader<'a> {
	/// Split `data` into its header and a reader over the fields.
	pub fn new(data: &'a [u8]) -> core::result::Result<(EventContext, Self), DecodeError> {
		let (ctx, _) = EventContext::read_from_prefix(data).map_err(|_| DecodeError::Truncated)?;
		let reader = RecordReader {
			data,
			pos: EventContext::SIZE,
		};
		Ok((ctx, reader))
	}

	pub fn next_field(&mut self) -> Option<core::result::Result<RawField<'a>, DecodeError>> {
		if self.pos >= self.data.len() {
			return None;
		}
		Some(self.read_field())
	}

	fn read_field(&mut self) -> core::result::Result<RawField<'a>, DecodeError> {
		let index = self.take_u8()?;
		let raw_kind = self.take_u8()?;
		let kind = FieldKind::from_raw(raw_kind).ok_or(DecodeError::UnknownFieldKind(raw_kind))?;

		let value = match kind {
			FieldKind::Str => {
				let len = self.take_u32()? as usize;
				RawValue::Str(self.take(len)?)
			}
			FieldKind::StrArray => {
				let count = self.take_u32()?;
				let total = self.take_u32()?;
				let flags = self.take_u8()?;
				let start = self.pos;
				for _ in 0..count {
					let len = self.take_u32()? as usize;
					self.take(len)?;
				}
				RawValue::StrArray(StrEntries {
					data: &self.data[start..self.pos],
					remaining: count,
					count,
					total,
					flags,
				})
			}
			FieldKind::I32 => RawValue::I32(i32::from_le_bytes(self.take_array()?)),
			FieldKind::U64 => RawValue::U64(u64::from_le_bytes(self.take_array()?)),
			FieldKind::U32Array => {
				let count = self.take_u8()? as usize;
				RawValue::U32Array(U32Entries {
					data: self.take(count * 4)?,
				})
			}
		};

		Ok(RawField { index, value })
	}

	fn take(&mut self, len: usize) -> core::result::Result<&'a [u8], DecodeError> {
		let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated)?;
		let bytes = self.data.get(self.pos..end).ok_or(DecodeError::Truncated)?;
		self.pos = end;
		Ok(bytes)
	}

	fn take_array<const N: usize>(&mut self) -> core::result::Result<[u8; N], DecodeError> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(N)?);
		Ok(out)
	}

	fn take_u8(&mut self) -> core::result::Result<u8, DecodeError> {
		Ok(self.take_array::<1>()?[0])
	}

	fn take_u32(&mut self) -> core::result::Result<u32, DecodeError> {
		Ok(u32::from_le_bytes(self.take_array()?))
	}
}

/// Entries of a `StrArray` field, already bounds-checked by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrEntries<'a> {
	data: &'a [u8],
	remaining: u32,
	count: u32,
	total: u32,
	flags: u8,
}

impl StrEntries<'_> {
	pub fn len(&self) -> u32 {
		self.remaining
	}

	pub fn is_empty(&self) -> bool {
		self.remaining == 0
	}

	/// Entries the source vector held, a lower bound when unterminated.
	pub fn total(&self) -> u32 {
		self.total
	}

	pub fn is_unterminated(&self) -> bool {
		self.flags & STR_ARRAY_UNTERMINATED != 0
	}

	/// Some entries of the source vector are missing from the record.
	pub fn is_truncated(&self) -> bool {
		self.total > self.count || self.is_unterminated()
	}
}

impl<'a> Iterator for StrEntries<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}
		let len = u32::from_le_bytes(self.data.get(..4)?.try_into().ok()?) as usize;
		let entry = self.data.get(4..4 + len)?;
		self.data = &self.data[4 + len..];
		self.remaining -= 1;
		Some(entry)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U32Entries<'a> {
	data: &'a [u8],
}

impl U32Entries<'_> {
	pub fn len(&self) -> usize {
		self.data.len() / 4
	}

	pub fn is_empty(&self) -> bool {
		self.data.len() < 4
	}
}

impl Iterator for U32Entries<'_> {
	type Item = u32;

	fn next(&mut self) -> Option<Self::Item> {
		let (head, rest) = self.data.split_first_chunk::<4>()?;
		self.data = rest;
		Some(u32::from_le_bytes(*head))
	}
}

// endregion: --- Reader

// region:    --- Tests


// endregion: --- Tests
