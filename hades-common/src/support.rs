//! In-memory collaborators for the unit tests.

use std::collections::HashMap;

use crate::{
	consts::{KernelField, MAX_KSYM_NAME_SIZE},
	event::{EventContext, EventType, ScanKind},
	gate::{GateDescriptor, GateLayout},
	ksym::KsymName,
	probe::{IntegrityCache, KernelLayout, KernelMemory, KernelState, ProbeConfig, RecordChannel, SymbolTable},
	record::{EventRecord, RecordReader},
	Error, ReadFault, Result,
};

// region:    --- Builders

impl EventRecord {
	/// Append a string copied from `value`.
	pub fn push_str(&mut self, index: u8, bound: usize, value: &[u8]) -> Result<usize> {
		self.push_str_with(index, bound, |dst| {
			let n = value.len().min(dst.len());
			dst[..n].copy_from_slice(&value[..n]);
			Ok(n)
		})
	}

	pub fn context(&self) -> Option<EventContext> {
		RecordReader::new(self.as_bytes()).ok().map(|(ctx, _)| ctx)
	}
}

impl GateDescriptor {
	/// Split `addr` the way the CPU expects it in a gate.
	pub fn from_target(addr: u64, segment: u16, bits: u16) -> Self {
		GateDescriptor {
			offset_low: addr as u16,
			segment,
			bits,
			offset_middle: (addr >> 16) as u16,
			offset_high: (addr >> 32) as u32,
		}
	}
}

/// `bits` of a present ring 0 gate of `gate_type`.
pub const fn gate_bits(gate_type: u8, dpl: u8, ist: u8) -> u16 {
	(1 << 15) | (((dpl & 0x3) as u16) << 13) | (((gate_type & 0x1f) as u16) << 8) | (ist & 0x7) as u16
}

impl KsymName {
	/// The name up to its first NUL.
	pub fn name(&self) -> &[u8] {
		let len = self.str.iter().position(|&b| b == 0).unwrap_or(MAX_KSYM_NAME_SIZE);
		&self.str[..len]
	}
}

// endregion: --- Builders

// region:    --- Memory

/// Byte addressed kernel memory, anything not written faults.
#[derive(Default)]
pub struct FakeMemory {
	bytes: HashMap<u64, u8>,
}

impl FakeMemory {
	pub fn with_bytes(mut self, addr: u64, bytes: &[u8]) -> Self {
		for (i, b) in bytes.iter().enumerate() {
			self.bytes.insert(addr + i as u64, *b);
		}
		self
	}

	pub fn with_u64(self, addr: u64, value: u64) -> Self {
		self.with_bytes(addr, &value.to_le_bytes())
	}

	pub fn with_str(self, addr: u64, value: &[u8]) -> Self {
		let with_nul: Vec<u8> = value.iter().copied().chain([0]).collect();
		self.with_bytes(addr, &with_nul)
	}

	pub fn with_gate(self, addr: u64, gate: &GateDescriptor) -> Self {
		self.with_bytes(addr, &gate.offset_low.to_le_bytes())
			.with_bytes(addr + 2, &gate.segment.to_le_bytes())
			.with_bytes(addr + 4, &gate.bits.to_le_bytes())
			.with_bytes(addr + 6, &gate.offset_middle.to_le_bytes())
			.with_bytes(addr + 8, &gate.offset_high.to_le_bytes())
			.with_bytes(addr + 12, &[0u8; 4])
	}

	fn read_array<const N: usize>(&self, addr: u64) -> core::result::Result<[u8; N], ReadFault> {
		let mut out = [0u8; N];
		for (i, b) in out.iter_mut().enumerate() {
			*b = *self.bytes.get(&(addr + i as u64)).ok_or(ReadFault)?;
		}
		Ok(out)
	}
}

impl KernelMemory for FakeMemory {
	fn read_u16(&self, addr: u64) -> core::result::Result<u16, ReadFault> {
		self.read_array(addr).map(u16::from_le_bytes)
	}

	fn read_u32(&self, addr: u64) -> core::result::Result<u32, ReadFault> {
		self.read_array(addr).map(u32::from_le_bytes)
	}

	fn read_u64(&self, addr: u64) -> core::result::Result<u64, ReadFault> {
		self.read_array(addr).map(u64::from_le_bytes)
	}

	/// Same contract as `bpf_probe_read_kernel_str`: the last byte of `dst`
	/// always holds the NUL, so at most `dst.len() - 1` bytes are returned.
	fn read_str(&self, addr: u64, dst: &mut [u8]) -> core::result::Result<usize, ReadFault> {
		let room = dst.len().checked_sub(1).ok_or(ReadFault)?;
		for i in 0..room {
			let b = *self.bytes.get(&(addr + i as u64)).ok_or(ReadFault)?;
			dst[i] = b;
			if b == 0 {
				return Ok(i);
			}
		}
		dst[room] = 0;
		Ok(room)
	}
}

// endregion: --- Memory

// region:    --- Maps

#[derive(Default)]
pub struct FakeSymbols {
	entries: HashMap<KsymName, u64>,
}

impl FakeSymbols {
	pub fn with(mut self, name: &[u8], addr: u64) -> Self {
		self.entries.insert(KsymName::new(name), addr);
		self
	}
}

impl SymbolTable for FakeSymbols {
	fn lookup(&self, name: &KsymName) -> Option<u64> {
		self.entries.get(name).copied()
	}
}

#[derive(Default)]
pub struct FakeCache {
	syscall: Option<u64>,
	idt: Option<u64>,
}

impl FakeCache {
	pub fn with(mut self, kind: ScanKind, index: u64) -> Self {
		match kind {
			ScanKind::Syscall => self.syscall = Some(index),
			ScanKind::Idt => self.idt = Some(index),
		}
		self
	}
}

impl IntegrityCache for FakeCache {
	fn pending(&self, kind: ScanKind) -> Option<u64> {
		match kind {
			ScanKind::Syscall => self.syscall,
			ScanKind::Idt => self.idt,
		}
	}
}

pub struct FakeConfig {
	pub controlling_tid: Option<u32>,
	pub layout: GateLayout,
}

impl Default for FakeConfig {
	fn default() -> Self {
		FakeConfig {
			controlling_tid: None,
			layout: GateLayout::X86_64,
		}
	}
}

impl ProbeConfig for FakeConfig {
	fn controlling_tid(&self) -> Option<u32> {
		self.controlling_tid
	}

	fn gate_layout(&self) -> GateLayout {
		self.layout
	}
}

/// Every member sits 8 bytes after the previous one.
pub struct FakeLayout {
	pub loaded: bool,
}

impl Default for FakeLayout {
	fn default() -> Self {
		FakeLayout { loaded: true }
	}
}

impl FakeLayout {
	pub fn off(field: KernelField) -> u64 {
		(field as u64 + 1) * 8
	}
}

impl KernelLayout for FakeLayout {
	fn offset(&self, field: KernelField) -> Option<u64> {
		self.loaded.then(|| Self::off(field))
	}
}

// endregion: --- Maps

// region:    --- Task

pub struct FakeKernel {
	pub tid: u32,
	pub exe: Vec<u8>,
	pub pids: Vec<u32>,
	pub pwd: Option<Vec<u8>>,
	pub files: HashMap<u64, Vec<u8>>,
}

impl Default for FakeKernel {
	fn default() -> Self {
		FakeKernel {
			tid: 4242,
			exe: b"/usr/bin/kmod".to_vec(),
			pids: vec![4242, 4100, 1],
			pwd: Some(b"/root".to_vec()),
			files: HashMap::new(),
		}
	}
}

fn copy_into(src: &[u8], dst: &mut [u8]) -> usize {
	let n = src.len().min(dst.len());
	dst[..n].copy_from_slice(&src[..n]);
	n
}

impl KernelState for FakeKernel {
	fn current_tid(&self) -> u32 {
		self.tid
	}

	fn exe_path(&self, dst: &mut [u8]) -> core::result::Result<usize, ReadFault> {
		Ok(copy_into(&self.exe, dst))
	}

	fn pid_tree(&self, dst: &mut [u32]) -> usize {
		let n = self.pids.len().min(dst.len());
		dst[..n].copy_from_slice(&self.pids[..n]);
		n
	}

	fn pwd_path(&self, dst: &mut [u8]) -> Option<core::result::Result<usize, ReadFault>> {
		self.pwd.as_ref().map(|pwd| Ok(copy_into(pwd, dst)))
	}

	fn file_path(&self, file: u64, dst: &mut [u8]) -> core::result::Result<usize, ReadFault> {
		let path = self.files.get(&file).ok_or(ReadFault)?;
		Ok(copy_into(path, dst))
	}
}

// endregion: --- Task

// region:    --- Channel

pub struct FakeChannel {
	pub rec: Box<EventRecord>,
	pub available: bool,
	pub tid: u32,
	pub submitted: Vec<Vec<u8>>,
}

impl Default for FakeChannel {
	fn default() -> Self {
		FakeChannel {
			rec: Box::new(EventRecord::new()),
			available: true,
			tid: 4242,
			submitted: Vec::new(),
		}
	}
}

impl RecordChannel for FakeChannel {
	fn init(&mut self, event_type: EventType) -> Option<&mut EventRecord> {
		if !self.available {
			return None;
		}
		self.rec.init(&EventContext {
			event_type: event_type as u32,
			pid: self.tid,
			tid: self.tid,
			..Default::default()
		});
		Some(&mut *self.rec)
	}

	fn submit(&mut self) -> Result<()> {
		if self.rec.is_empty() {
			return Err(Error::RecordUnavailable);
		}
		self.submitted.push(self.rec.as_bytes().to_vec());
		Ok(())
	}
}

// endregion: --- Channel
