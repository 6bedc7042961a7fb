use aya_ebpf::programs::ProbeContext;
use hades_common::{hooks, Error, Result};

use crate::kernel::{CurrentTask, RingBufChannel};

pub fn try_security_kernel_read_file(ctx: &ProbeContext) -> Result<()> {
	let file: u64 = ctx.arg(0).ok_or(Error::ReadFault)?;
	let read_id: i32 = ctx.arg(1).ok_or(Error::ReadFault)?;

	let task = CurrentTask::new();
	let mut chan = RingBufChannel::new(&task);
	hooks::kernel_read_file(&mut chan, &task, file, read_id)
}
