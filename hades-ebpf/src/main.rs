#![no_std]
#![no_main]

use aya_ebpf::{
	macros::{kprobe, map},
	maps::{Array, HashMap, PerCpuArray, RingBuf},
	programs::ProbeContext,
};
use hades_common::{
	consts::{
		ConfigKey, KernelField, ANALYZE_CACHE_MAX_ENTRIES, EVT_MAP_BYTE_SIZE, KSYMBOLS_MAX_ENTRIES,
	},
	ksym::KsymName,
	record::EventRecord,
};

mod hooks;
mod kernel;

/// `sys_call_table` / `idt_table` addresses, pushed from kallsyms.
#[map]
static KSYMBOLS: HashMap<KsymName, u64> = HashMap::with_max_entries(KSYMBOLS_MAX_ENTRIES, 0);

/// Pending scan index per kind, armed right before each trigger.
#[map]
static ANALYZE_CACHE: HashMap<u32, u64> = HashMap::with_max_entries(ANALYZE_CACHE_MAX_ENTRIES, 0);

#[map]
static CONFIG: Array<u64> = Array::with_max_entries(ConfigKey::COUNT, 0);

#[map]
static KERNEL_LAYOUT: Array<u64> = Array::with_max_entries(KernelField::COUNT, 0);

#[map]
static EVENT_BUF: PerCpuArray<EventRecord> = PerCpuArray::with_max_entries(1, 0);

#[map]
static EVT_MAP: RingBuf = RingBuf::with_byte_size(EVT_MAP_BYTE_SIZE, 0);

#[kprobe]
pub fn do_init_module(ctx: ProbeContext) -> u32 {
	match hooks::try_do_init_module(&ctx) {
		Ok(()) => 0,
		Err(err) => hooks::report(&ctx, err),
	}
}

#[kprobe]
pub fn security_kernel_read_file(ctx: ProbeContext) -> u32 {
	match hooks::try_security_kernel_read_file(&ctx) {
		Ok(()) => 0,
		Err(err) => hooks::report(&ctx, err),
	}
}

#[kprobe]
pub fn call_usermodehelper(ctx: ProbeContext) -> u32 {
	match hooks::try_call_usermodehelper(&ctx) {
		Ok(()) => 0,
		Err(err) => hooks::report(&ctx, err),
	}
}

#[kprobe]
pub fn security_file_ioctl(ctx: ProbeContext) -> u32 {
	match hooks::try_security_file_ioctl(&ctx) {
		Ok(()) => 0,
		Err(err) => hooks::report(&ctx, err),
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
