use aya_ebpf::programs::ProbeContext;
use aya_log_ebpf::error;
use hades_common::Error;

mod exec;
mod fs;
mod kern_module;
mod rootkit;

pub use exec::*;
pub use fs::*;
pub use kern_module::*;
pub use rootkit::*;

/// Log dropped records, everything else ends silently. The hook always
/// gets 0 back.
pub fn report(ctx: &ProbeContext, err: Error) -> u32 {
	if err.is_resource() {
		error!(ctx, "hades: record dropped ->> ERROR: {}", err.code());
	}
	0
}
