//! Collaborators a probe invocation runs against.
//!
//! The kernel side backs them with BPF helpers and maps, tests with plain
//! in-memory fakes. Everything is read-only except the record channel.

use crate::{
	consts::KernelField,
	event::{EventType, ScanKind},
	gate::GateLayout,
	ksym::KsymName,
	record::EventRecord,
	ReadFault, Result,
};

/// Bounded, fault tolerant reads of kernel memory.
pub trait KernelMemory {
	fn read_u16(&self, addr: u64) -> core::result::Result<u16, ReadFault>;

	fn read_u32(&self, addr: u64) -> core::result::Result<u32, ReadFault>;

	fn read_u64(&self, addr: u64) -> core::result::Result<u64, ReadFault>;

	/// Copy a NUL terminated string at `addr` into `dst`.
	///
	/// Stops at the first NUL or one byte short of `dst.len()`, the last byte
	/// is kept for the NUL. Returns the number of bytes copied without the NUL,
	/// an empty `dst` faults.
	fn read_str(&self, addr: u64, dst: &mut [u8]) -> core::result::Result<usize, ReadFault>;
}

/// Symbol name to kernel address, filled by user space from kallsyms.
pub trait SymbolTable {
	fn lookup(&self, name: &KsymName) -> Option<u64>;
}

/// Pending scan index per kind, filled by user space before each trigger.
pub trait IntegrityCache {
	fn pending(&self, kind: ScanKind) -> Option<u64>;
}

/// Struct member offsets of the running kernel.
pub trait KernelLayout {
	/// Byte offset of `field` inside its struct, `None` until user space
	/// loaded the layout.
	fn offset(&self, field: KernelField) -> Option<u64>;
}

pub trait ProbeConfig {
	/// Thread allowed to fire scans, `None` until user space sets it.
	fn controlling_tid(&self) -> Option<u32>;

	fn gate_layout(&self) -> GateLayout;
}

/// What the handlers need to know about the task that hit the hook.
pub trait KernelState {
	fn current_tid(&self) -> u32;

	fn exe_path(&self, dst: &mut [u8]) -> core::result::Result<usize, ReadFault>;

	/// Fill `dst` with the tgids from the current task up to init, returns
	/// how many were written.
	fn pid_tree(&self, dst: &mut [u32]) -> usize;

	/// Working directory of the current task, `None` when the task has no
	/// `fs_struct`.
	fn pwd_path(&self, dst: &mut [u8]) -> Option<core::result::Result<usize, ReadFault>>;

	fn file_path(&self, file: u64, dst: &mut [u8]) -> core::result::Result<usize, ReadFault>;
}

/// Per invocation record slot plus the channel records leave through.
pub trait RecordChannel {
	/// Claim and initialize the record for this invocation.
	fn init(&mut self, event_type: EventType) -> Option<&mut EventRecord>;

	/// Send the record initialized last. Never retried.
	fn submit(&mut self) -> Result<()>;
}
