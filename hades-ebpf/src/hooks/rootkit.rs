use aya_ebpf::programs::ProbeContext;
use hades_common::{hooks, scan::IntegrityScanner, Error, Result};

use crate::kernel::{CurrentTask, MapCache, MapConfig, MapSymbols, ProbeMemory, RingBufChannel};

/// `security_file_ioctl(file, cmd, arg)` as the scan trigger.
pub fn try_security_file_ioctl(ctx: &ProbeContext) -> Result<()> {
	let cmd: u32 = ctx.arg(1).ok_or(Error::ReadFault)?;

	let task = CurrentTask::new();
	let scanner = IntegrityScanner::new(&MapSymbols, &MapCache, &ProbeMemory);
	let mut chan = RingBufChannel::new(&task);
	hooks::file_ioctl(&mut chan, &scanner, &MapConfig, &task, cmd).map(|_| ())
}
