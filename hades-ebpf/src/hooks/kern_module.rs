use aya_ebpf::programs::ProbeContext;
use hades_common::{consts::KernelField, hooks, probe::KernelLayout, Error, Result};

use crate::kernel::{CurrentTask, MapLayout, ProbeMemory, RingBufChannel};

pub fn try_do_init_module(ctx: &ProbeContext) -> Result<()> {
	let module: u64 = ctx.arg(0).ok_or(Error::ReadFault)?;
	if module == 0 {
		return Err(Error::ReadFault);
	}

	// an unknown layout leaves the name unreadable, the record still goes out
	let name = MapLayout
		.offset(KernelField::ModuleName)
		.and_then(|off| module.checked_add(off))
		.unwrap_or(0);

	let task = CurrentTask::new();
	let mut chan = RingBufChannel::new(&task);
	hooks::module_load(&mut chan, &ProbeMemory, &task, name)
}
