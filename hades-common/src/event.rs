use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::consts::{IDT_CACHE, IOCTL_SCAN_IDTS, IOCTL_SCAN_SYSCALLS, SYSCALL_CACHE};

/// Fixed header at the start of every record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EventContext {
	pub start_time: u64, // 0..8
	pub cgroup_id: u64,  // 8..16
	pub event_type: u32, // 16..20
	pub pid: u32,        // 20..24
	pub tid: u32,        // 24..28
	pub uid: u32,        // 28..32
	pub gid: u32,        // 32..36
	pub ppid: u32,       // 36..40
	pub comm: [u8; 16],  // 40..56
	pub argnum: u8,      // 56..57
	pub _pad0: [u8; 7],  // 57..64
}

impl EventContext {
	pub const SIZE: usize = 64;
	pub const ARGNUM_OFFSET: usize = 56;
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
	DoInitModule = 1026,
	SecurityKernelReadFile = 1027,
	CallUsermodehelper = 1028,
	AntiRootkit = 1030,
}

impl EventType {
	pub const fn from_raw(raw: u32) -> Option<Self> {
		match raw {
			1026 => Some(Self::DoInitModule),
			1027 => Some(Self::SecurityKernelReadFile),
			1028 => Some(Self::CallUsermodehelper),
			1030 => Some(Self::AntiRootkit),
			_ => None,
		}
	}

	pub const fn name(&self) -> &'static str {
		match self {
			Self::DoInitModule => "DO_INIT_MODULE",
			Self::SecurityKernelReadFile => "SECURITY_KERNEL_READ_FILE",
			Self::CallUsermodehelper => "CALL_USERMODEHELPER",
			Self::AntiRootkit => "ANTI_ROOTKIT",
		}
	}
}

pub const ANTI_ROOTKIT_SYSCALL: i32 = 1100;
pub const ANTI_ROOTKIT_IDT: i32 = 1101;

/// The two active scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
	Syscall,
	Idt,
}

impl ScanKind {
	pub const fn from_ioctl(cmd: u32) -> Option<Self> {
		match cmd {
			IOCTL_SCAN_SYSCALLS => Some(Self::Syscall),
			IOCTL_SCAN_IDTS => Some(Self::Idt),
			_ => None,
		}
	}

	pub const fn from_tag(tag: i32) -> Option<Self> {
		match tag {
			ANTI_ROOTKIT_SYSCALL => Some(Self::Syscall),
			ANTI_ROOTKIT_IDT => Some(Self::Idt),
			_ => None,
		}
	}

	pub const fn ioctl_cmd(&self) -> u32 {
		match self {
			Self::Syscall => IOCTL_SCAN_SYSCALLS,
			Self::Idt => IOCTL_SCAN_IDTS,
		}
	}

	/// Key of this kind in the integrity cache.
	pub const fn cache_key(&self) -> u32 {
		match self {
			Self::Syscall => SYSCALL_CACHE,
			Self::Idt => IDT_CACHE,
		}
	}

	/// Classification tag written as the last field of a finding.
	pub const fn finding_tag(&self) -> i32 {
		match self {
			Self::Syscall => ANTI_ROOTKIT_SYSCALL,
			Self::Idt => ANTI_ROOTKIT_IDT,
		}
	}
}

/// Wire tag of a record field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Str = 1,
	StrArray = 2,
	I32 = 3,
	U64 = 4,
	U32Array = 5,
}

impl FieldKind {
	pub const fn from_raw(raw: u8) -> Option<Self> {
		match raw {
			1 => Some(Self::Str),
			2 => Some(Self::StrArray),
			3 => Some(Self::I32),
			4 => Some(Self::U64),
			5 => Some(Self::U32Array),
			_ => None,
		}
	}
}
