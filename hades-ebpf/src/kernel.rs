//! BPF helper and map backed collaborators.

use aya_ebpf::helpers::{
	bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_current_uid_gid, bpf_ktime_get_ns, bpf_probe_read_kernel,
	bpf_probe_read_kernel_str_bytes,
	r#gen::{bpf_get_current_cgroup_id, bpf_get_current_task},
};
use hades_common::{
	consts::{ConfigKey, KernelField},
	event::{EventContext, EventType, ScanKind},
	gate::GateLayout,
	ksym::KsymName,
	probe::{IntegrityCache, KernelLayout, KernelMemory, KernelState, ProbeConfig, RecordChannel, SymbolTable},
	record::EventRecord,
	task::TaskReader,
	Error, ReadFault, Result,
};

use crate::{ANALYZE_CACHE, CONFIG, EVENT_BUF, EVT_MAP, KERNEL_LAYOUT, KSYMBOLS};

type ReadResult<T> = core::result::Result<T, ReadFault>;

// region:    --- Memory

pub struct ProbeMemory;

impl ProbeMemory {
	fn read<T>(&self, addr: u64) -> ReadResult<T> {
		if addr == 0 {
			return Err(ReadFault);
		}
		unsafe { bpf_probe_read_kernel(addr as *const T) }.map_err(|_| ReadFault)
	}
}

impl KernelMemory for ProbeMemory {
	fn read_u16(&self, addr: u64) -> ReadResult<u16> {
		self.read(addr)
	}

	fn read_u32(&self, addr: u64) -> ReadResult<u32> {
		self.read(addr)
	}

	fn read_u64(&self, addr: u64) -> ReadResult<u64> {
		self.read(addr)
	}

	fn read_str(&self, addr: u64, dst: &mut [u8]) -> ReadResult<usize> {
		if addr == 0 || dst.is_empty() {
			return Err(ReadFault);
		}
		unsafe { bpf_probe_read_kernel_str_bytes(addr as *const u8, dst) }
			.map(|s| s.len())
			.map_err(|_| ReadFault)
	}
}

// endregion: --- Memory

// region:    --- Maps

pub struct MapSymbols;

impl SymbolTable for MapSymbols {
	fn lookup(&self, name: &KsymName) -> Option<u64> {
		unsafe { KSYMBOLS.get(name) }.copied()
	}
}

pub struct MapCache;

impl IntegrityCache for MapCache {
	fn pending(&self, kind: ScanKind) -> Option<u64> {
		unsafe { ANALYZE_CACHE.get(&kind.cache_key()) }.copied()
	}
}

fn config(key: ConfigKey) -> u64 {
	CONFIG.get(key as u32).copied().unwrap_or(0)
}

pub struct MapConfig;

impl ProbeConfig for MapConfig {
	fn controlling_tid(&self) -> Option<u32> {
		match config(ConfigKey::ControllingTid) {
			0 => None,
			tid => Some(tid as u32),
		}
	}

	fn gate_layout(&self) -> GateLayout {
		GateLayout::from_raw(config(ConfigKey::GateLayout))
	}
}

pub struct MapLayout;

impl KernelLayout for MapLayout {
	fn offset(&self, field: KernelField) -> Option<u64> {
		if config(ConfigKey::LayoutLoaded) == 0 {
			return None;
		}
		KERNEL_LAYOUT.get(field as u32).copied()
	}
}

// endregion: --- Maps

// region:    --- Task

/// The task running the probe.
pub struct CurrentTask {
	task: u64,
}

impl CurrentTask {
	pub fn new() -> Self {
		let task = unsafe { bpf_get_current_task() };
		CurrentTask { task }
	}

	fn reader(&self) -> TaskReader<'static, ProbeMemory, MapLayout> {
		TaskReader::new(&ProbeMemory, &MapLayout)
	}

	pub fn ppid(&self) -> u32 {
		self.reader().parent_tgid(self.task).unwrap_or(0)
	}
}

impl KernelState for CurrentTask {
	fn current_tid(&self) -> u32 {
		bpf_get_current_pid_tgid() as u32
	}

	fn exe_path(&self, dst: &mut [u8]) -> ReadResult<usize> {
		self.reader().exe_path(self.task, dst)
	}

	fn pid_tree(&self, dst: &mut [u32]) -> usize {
		self.reader().pid_tree(self.task, dst)
	}

	fn pwd_path(&self, dst: &mut [u8]) -> Option<ReadResult<usize>> {
		self.reader().pwd_path(self.task, dst)
	}

	fn file_path(&self, file: u64, dst: &mut [u8]) -> ReadResult<usize> {
		self.reader().file_path(file, dst)
	}
}

// endregion: --- Task

// region:    --- Channel

/// Per-CPU record slot drained into `EVT_MAP`.
pub struct RingBufChannel<'a> {
	task: &'a CurrentTask,
}

impl<'a> RingBufChannel<'a> {
	pub fn new(task: &'a CurrentTask) -> Self {
		RingBufChannel { task }
	}

	fn slot(&self) -> Option<&'static mut EventRecord> {
		let ptr = EVENT_BUF.get_ptr_mut(0)?;
		unsafe { ptr.as_mut() }
	}
}

impl RecordChannel for RingBufChannel<'_> {
	fn init(&mut self, event_type: EventType) -> Option<&mut EventRecord> {
		let rec = self.slot()?;
		let pid_tgid = bpf_get_current_pid_tgid();
		let uid_gid = bpf_get_current_uid_gid();

		rec.init(&EventContext {
			start_time: unsafe { bpf_ktime_get_ns() },
			cgroup_id: unsafe { bpf_get_current_cgroup_id() },
			event_type: event_type as u32,
			pid: (pid_tgid >> 32) as u32,
			tid: pid_tgid as u32,
			uid: uid_gid as u32,
			gid: (uid_gid >> 32) as u32,
			ppid: self.task.ppid(),
			comm: bpf_get_current_comm().unwrap_or([0u8; 16]),
			..Default::default()
		});
		Some(rec)
	}

	fn submit(&mut self) -> Result<()> {
		let rec = self.slot().ok_or(Error::RecordUnavailable)?;
		if rec.is_empty() {
			return Err(Error::RecordUnavailable);
		}
		EVT_MAP.output(rec.as_bytes(), 0).map_err(|_| Error::SubmitFailed)
	}
}

// endregion: --- Channel
