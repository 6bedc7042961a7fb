//! Hook handlers, one per attach point.
//!
//! Each handler claims a record, appends its fields in a fixed order and
//! submits once. Any error leaves the record unsent.

use crate::{
	consts::{MAX_PATH_SIZE, MAX_PID_TREE_DEPTH, MAX_STRING_SIZE, MODULE_NAME_LEN},
	event::{EventType, ScanKind},
	probe::{IntegrityCache, KernelMemory, KernelState, ProbeConfig, RecordChannel, SymbolTable},
	record::{str_field_size, I32_FIELD_SIZE, STR_ARRAY_HEADER_SIZE},
	scan::{Finding, IntegrityScanner},
	Error, ReadFault, Result,
};

// room kept behind each vector so `wait` and the caller exe always fit
const ENVP_RESERVE: usize = I32_FIELD_SIZE + str_field_size(MAX_PATH_SIZE);
const ARGV_RESERVE: usize = STR_ARRAY_HEADER_SIZE + ENVP_RESERVE;

/// `do_init_module`: module name, loader exe, ancestor pids, working directory.
pub fn module_load<R, M, K>(chan: &mut R, mem: &M, kernel: &K, module_name: u64) -> Result<()>
where
	R: RecordChannel,
	M: KernelMemory,
	K: KernelState,
{
	let rec = chan.init(EventType::DoInitModule).ok_or(Error::RecordUnavailable)?;

	rec.push_str_with(0, MODULE_NAME_LEN, |dst| mem.read_str(module_name, dst))?;
	rec.push_str_with(1, MAX_PATH_SIZE, |dst| kernel.exe_path(dst))?;

	let mut pids = [0u32; MAX_PID_TREE_DEPTH];
	let depth = kernel.pid_tree(&mut pids);
	rec.push_u32_array(2, &pids[..depth.min(MAX_PID_TREE_DEPTH)])?;

	let mut has_fs = true;
	rec.push_str_with(3, MAX_PATH_SIZE, |dst| match kernel.pwd_path(dst) {
		Some(read) => read,
		None => {
			has_fs = false;
			Ok(0)
		}
	})?;
	if !has_fs {
		return Err(Error::MissingFsStruct);
	}

	chan.submit()
}

/// `security_kernel_read_file`: path of the file and the read id.
pub fn kernel_read_file<R, K>(chan: &mut R, kernel: &K, file: u64, read_id: i32) -> Result<()>
where
	R: RecordChannel,
	K: KernelState,
{
	let rec = chan.init(EventType::SecurityKernelReadFile).ok_or(Error::RecordUnavailable)?;

	rec.push_str_with(0, MAX_PATH_SIZE, |dst| kernel.file_path(file, dst))?;
	rec.push_i32(1, read_id)?;

	chan.submit()
}

/// Raw arguments of `call_usermodehelper`.
#[derive(Debug, Clone, Copy)]
pub struct HelperArgs {
	pub path: u64,
	pub argv: u64,
	pub envp: u64,
	pub wait: i32,
}

/// `call_usermodehelper`: helper path, argv, envp, wait flag, caller exe.
pub fn usermodehelper<R, M, K>(chan: &mut R, mem: &M, kernel: &K, args: HelperArgs) -> Result<()>
where
	R: RecordChannel,
	M: KernelMemory,
	K: KernelState,
{
	let rec = chan.init(EventType::CallUsermodehelper).ok_or(Error::RecordUnavailable)?;

	rec.push_str_with(0, MAX_PATH_SIZE, |dst| mem.read_str(args.path, dst))?;
	rec.push_str_array(1, MAX_STRING_SIZE, ARGV_RESERVE, |i, dst| vector_entry(mem, args.argv, i, dst))?;
	rec.push_str_array(2, MAX_STRING_SIZE, ENVP_RESERVE, |i, dst| vector_entry(mem, args.envp, i, dst))?;
	rec.push_i32(3, args.wait)?;
	rec.push_str_with(4, MAX_PATH_SIZE, |dst| kernel.exe_path(dst))?;

	chan.submit()
}

/// Entry `i` of a NULL terminated `char **`, `None` past the end.
///
/// A pointer slot that cannot be read ends the vector, an entry whose string
/// faults is kept empty. An empty `dst` only checks the slot.
fn vector_entry<M: KernelMemory>(
	mem: &M,
	vec: u64,
	i: usize,
	dst: &mut [u8],
) -> Option<core::result::Result<usize, ReadFault>> {
	if vec == 0 {
		return None;
	}
	let slot = (i as u64).checked_mul(8).and_then(|off| vec.checked_add(off))?;
	match mem.read_u64(slot) {
		Ok(0) | Err(_) => None,
		Ok(_) if dst.is_empty() => Some(Ok(0)),
		Ok(ptr) => Some(mem.read_str(ptr, dst)),
	}
}

/// `security_file_ioctl` trigger gate.
///
/// Only the configured controlling thread may fire a scan. Anything else
/// returns before the command code is even looked at.
pub fn file_ioctl<R, S, C, M, P, K>(
	chan: &mut R,
	scanner: &IntegrityScanner<'_, S, C, M>,
	config: &P,
	kernel: &K,
	cmd: u32,
) -> Result<Finding>
where
	R: RecordChannel,
	S: SymbolTable,
	C: IntegrityCache,
	M: KernelMemory,
	P: ProbeConfig,
	K: KernelState,
{
	let controlling = config.controlling_tid().ok_or(Error::NotControllingTask)?;
	if kernel.current_tid() != controlling {
		return Err(Error::NotControllingTask);
	}

	let kind = ScanKind::from_ioctl(cmd).ok_or(Error::UnknownCommand(cmd))?;
	scanner.scan(kind, config.gate_layout(), chan)
}

// region:    --- Tests


// endregion: --- Tests
