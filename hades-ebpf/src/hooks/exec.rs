use aya_ebpf::programs::ProbeContext;
use hades_common::{
	hooks::{self, HelperArgs},
	Error, Result,
};

use crate::kernel::{CurrentTask, ProbeMemory, RingBufChannel};

pub fn try_call_usermodehelper(ctx: &ProbeContext) -> Result<()> {
	let args = HelperArgs {
		path: ctx.arg(0).ok_or(Error::ReadFault)?,
		argv: ctx.arg(1).ok_or(Error::ReadFault)?,
		envp: ctx.arg(2).ok_or(Error::ReadFault)?,
		wait: ctx.arg(3).ok_or(Error::ReadFault)?,
	};

	let task = CurrentTask::new();
	let mut chan = RingBufChannel::new(&task);
	hooks::usermodehelper(&mut chan, &ProbeMemory, &task, args)
}
