// -- Symbol table
pub const MAX_KSYM_NAME_SIZE: usize = 64;
pub const KSYMBOLS_MAX_ENTRIES: u32 = 64;
pub const SYS_CALL_TABLE: &[u8] = b"sys_call_table";
pub const IDT_TABLE: &[u8] = b"idt_table";

// -- Integrity cache
pub const ANALYZE_CACHE_MAX_ENTRIES: u32 = 2;
pub const IDT_CACHE: u32 = 0;
pub const SYSCALL_CACHE: u32 = 1;

// -- Trigger gate (ioctl command codes)
pub const IOCTL_SCAN_SYSCALLS: u32 = 65;
pub const IOCTL_SCAN_IDTS: u32 = 66;

// -- Tables
pub const IDT_ENTRIES: u64 = 256;
pub const SYSCALL_ENTRY_SIZE: u64 = 8;

// -- Record
// per-CPU map values are capped at 32 KiB, the record cursor takes 8
pub const EVENT_BUF_SIZE: usize = (1 << 15) - 8;
pub const MAX_STRING_SIZE: usize = 256;
pub const MAX_PATH_SIZE: usize = 256;
pub const MAX_STR_ARR_ELEM: usize = 128;
// entries past MAX_STR_ARR_ELEM are only counted, up to here
pub const MAX_STR_ARR_SCAN: usize = 512;
pub const MAX_PID_TREE_DEPTH: usize = 12;
// MODULE_NAME_LEN, 64 - sizeof(unsigned long)
pub const MODULE_NAME_LEN: usize = 56;

// -- Kernel side path walk
pub const MAX_PATH_COMPONENTS: usize = 16;

// -- Ring buffer
pub const EVT_MAP_BYTE_SIZE: u32 = 1 << 22;

/// Slots of the `CONFIG` array map.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
	ControllingTid = 0,
	GateLayout = 1,
	LayoutLoaded = 2,
}

impl ConfigKey {
	pub const COUNT: u32 = 3;
}

/// Slots of the `KERNEL_LAYOUT` array map, one member offset each.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelField {
	ModuleName = 0,
	TaskTgid,
	TaskRealParent,
	TaskMm,
	TaskFs,
	MmExeFile,
	FileFPath,
	PathMnt,
	PathDentry,
	DentryParent,
	DentryName,
	QstrName,
	FsPwd,
	MountMnt,
	MountParent,
	MountMountpoint,
	VfsmountMntRoot,
}

impl KernelField {
	pub const COUNT: u32 = 17;

	pub const ALL: [KernelField; Self::COUNT as usize] = [
		Self::ModuleName,
		Self::TaskTgid,
		Self::TaskRealParent,
		Self::TaskMm,
		Self::TaskFs,
		Self::MmExeFile,
		Self::FileFPath,
		Self::PathMnt,
		Self::PathDentry,
		Self::DentryParent,
		Self::DentryName,
		Self::QstrName,
		Self::FsPwd,
		Self::MountMnt,
		Self::MountParent,
		Self::MountMountpoint,
		Self::VfsmountMntRoot,
	];

	/// `(struct, member)` as named in the kernel BTF.
	pub const fn btf_member(&self) -> (&'static str, &'static str) {
		match self {
			Self::ModuleName => ("module", "name"),
			Self::TaskTgid => ("task_struct", "tgid"),
			Self::TaskRealParent => ("task_struct", "real_parent"),
			Self::TaskMm => ("task_struct", "mm"),
			Self::TaskFs => ("task_struct", "fs"),
			Self::MmExeFile => ("mm_struct", "exe_file"),
			Self::FileFPath => ("file", "f_path"),
			Self::PathMnt => ("path", "mnt"),
			Self::PathDentry => ("path", "dentry"),
			Self::DentryParent => ("dentry", "d_parent"),
			Self::DentryName => ("dentry", "d_name"),
			Self::QstrName => ("qstr", "name"),
			Self::FsPwd => ("fs_struct", "pwd"),
			Self::MountMnt => ("mount", "mnt"),
			Self::MountParent => ("mount", "mnt_parent"),
			Self::MountMountpoint => ("mount", "mnt_mountpoint"),
			Self::VfsmountMntRoot => ("vfsmount", "mnt_root"),
		}
	}
}
