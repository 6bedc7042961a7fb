//! Typed view of the records coming out of `EVT_MAP`.

use hades_common::{
	event::{EventContext, EventType, ScanKind},
	record::{RawValue, RecordReader, StrEntries},
};

use crate::{Error, Result};

/// Header fields shared by every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
	pub start_time: u64,
	pub cgroup_id: u64,
	pub pid: u32,
	pub tid: u32,
	pub ppid: u32,
	pub uid: u32,
	pub gid: u32,
	pub comm: String,
}

impl From<&EventContext> for EventMeta {
	fn from(ctx: &EventContext) -> Self {
		EventMeta {
			start_time: ctx.start_time,
			cgroup_id: ctx.cgroup_id,
			pid: ctx.pid,
			tid: ctx.tid,
			ppid: ctx.ppid,
			uid: ctx.uid,
			gid: ctx.gid,
			comm: String::from_utf8_lossy(&ctx.comm).trim_end_matches('\0').to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEvent {
	pub meta: EventMeta,
	pub name: String,
	pub exe: String,
	pub pid_tree: Vec<u32>,
	pub pwd: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelReadEvent {
	pub meta: EventMeta,
	pub path: String,
	pub read_id: i32,
}

/// A captured `argv`/`envp`, with how much of the original it covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringVector {
	pub entries: Vec<String>,
	/// Entries the kernel side saw, a lower bound when `unterminated`.
	pub total: u32,
	pub unterminated: bool,
}

impl StringVector {
	pub fn is_truncated(&self) -> bool {
		self.unterminated || self.total as usize > self.entries.len()
	}
}

impl From<StrEntries<'_>> for StringVector {
	fn from(entries: StrEntries<'_>) -> Self {
		StringVector {
			total: entries.total(),
			unterminated: entries.is_unterminated(),
			entries: entries.map(lossy).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHelperEvent {
	pub meta: EventMeta,
	pub path: String,
	pub argv: StringVector,
	pub envp: StringVector,
	pub wait: i32,
	pub exe: String,
}

/// Handler address found by a syscall table or IDT scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingEvent {
	pub meta: EventMeta,
	pub kind: ScanKind,
	pub index: u64,
	pub address: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HadesEvent {
	Module(ModuleEvent),
	KernelRead(KernelReadEvent),
	UserHelper(UserHelperEvent),
	Finding(FindingEvent),
}

impl HadesEvent {
	pub fn name(&self) -> &'static str {
		let event_type = match self {
			Self::Module(_) => EventType::DoInitModule,
			Self::KernelRead(_) => EventType::SecurityKernelReadFile,
			Self::UserHelper(_) => EventType::CallUsermodehelper,
			Self::Finding(_) => EventType::AntiRootkit,
		};
		event_type.name()
	}

	pub fn meta(&self) -> &EventMeta {
		match self {
			Self::Module(e) => &e.meta,
			Self::KernelRead(e) => &e.meta,
			Self::UserHelper(e) => &e.meta,
			Self::Finding(e) => &e.meta,
		}
	}
}

// region:    --- Decoder

/// Decode one ring buffer record, fields are checked positionally.
pub fn parse_event_from_bytes(data: &[u8]) -> Result<HadesEvent> {
	let (ctx, reader) = RecordReader::new(data)?;
	let event_type = EventType::from_raw(ctx.event_type).ok_or(Error::UnknownEventType(ctx.event_type))?;
	let meta = EventMeta::from(&ctx);
	let mut fields = Fields { reader, next: 0 };

	let evt = match event_type {
		EventType::DoInitModule => HadesEvent::Module(ModuleEvent {
			meta,
			name: fields.str()?,
			exe: fields.str()?,
			pid_tree: fields.u32_array()?,
			pwd: fields.str()?,
		}),
		EventType::SecurityKernelReadFile => HadesEvent::KernelRead(KernelReadEvent {
			meta,
			path: fields.str()?,
			read_id: fields.i32()?,
		}),
		EventType::CallUsermodehelper => HadesEvent::UserHelper(UserHelperEvent {
			meta,
			path: fields.str()?,
			argv: fields.str_array()?,
			envp: fields.str_array()?,
			wait: fields.i32()?,
			exe: fields.str()?,
		}),
		EventType::AntiRootkit => {
			let address = fields.u64()?;
			let index = fields.u64()?;
			let tag = fields.i32()?;
			let kind = ScanKind::from_tag(tag).ok_or(Error::UnknownFindingTag(tag))?;
			HadesEvent::Finding(FindingEvent {
				meta,
				kind,
				index,
				address,
			})
		}
	};

	Ok(evt)
}

struct Fields<'a> {
	reader: RecordReader<'a>,
	next: u8,
}

impl<'a> Fields<'a> {
	fn take(&mut self) -> Result<(u8, RawValue<'a>)> {
		let expected = self.next;
		let field = self.reader.next_field().ok_or(Error::MissingField(expected))??;
		if field.index != expected {
			return Err(Error::FieldIndexMismatch {
				expected,
				got: field.index,
			});
		}
		self.next += 1;
		Ok((expected, field.value))
	}

	fn str(&mut self) -> Result<String> {
		match self.take()? {
			(_, RawValue::Str(bytes)) => Ok(lossy(bytes)),
			(index, _) => Err(Error::FieldKindMismatch(index)),
		}
	}

	fn str_array(&mut self) -> Result<StringVector> {
		match self.take()? {
			(_, RawValue::StrArray(entries)) => Ok(entries.into()),
			(index, _) => Err(Error::FieldKindMismatch(index)),
		}
	}

	fn i32(&mut self) -> Result<i32> {
		match self.take()? {
			(_, RawValue::I32(value)) => Ok(value),
			(index, _) => Err(Error::FieldKindMismatch(index)),
		}
	}

	fn u64(&mut self) -> Result<u64> {
		match self.take()? {
			(_, RawValue::U64(value)) => Ok(value),
			(index, _) => Err(Error::FieldKindMismatch(index)),
		}
	}

	fn u32_array(&mut self) -> Result<Vec<u32>> {
		match self.take()? {
			(_, RawValue::U32Array(values)) => Ok(values.collect()),
			(index, _) => Err(Error::FieldKindMismatch(index)),
		}
	}
}

fn lossy(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).into_owned()
}

// endregion: --- Decoder

// region:    --- Tests


// endregion: --- Tests
