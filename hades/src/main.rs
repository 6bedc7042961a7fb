// region:    --- Modules
mod baseline;
mod cli;
mod error;
mod event;
mod ksyms;
mod layout;
mod supervisor;
mod trigger;
mod trx;
mod users;
mod workers;
// endregion: --- Modules

use crate::{
	baseline::Baseline,
	cli::args::{Cli, RunMode},
	event::HadesEvent,
	ksyms::Kallsyms,
	layout::KernelOffsets,
	supervisor::Supervisor,
	trigger::ScanTrigger,
	trx::new_channel,
	users::UserCache,
	workers::{ReceiverWorker, RingBufWorker},
};

pub use self::error::{Error, Result};
use aya::{
	maps::{HashMap, MapData, RingBuf},
	programs::KProbe,
	Ebpf,
};
use clap::Parser;
use hades_common::{
	consts::{IDT_TABLE, SYS_CALL_TABLE},
	ksym::KsymName,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
#[rustfmt::skip]
use tracing::{debug, info, warn};
use tokio::io::unix::AsyncFd;

const KPROBES: [&str; 4] = [
	"do_init_module",
	"security_kernel_read_file",
	"call_usermodehelper",
	"security_file_ioctl",
];

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	if args.interval == Some(0) {
		return Err(Error::custom("--interval must be at least 1 second"));
	}

	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}

	let mut ebpf = aya::Ebpf::load(aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/hades")))?;
	if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
		// This can happen if you remove all log statements from your eBPF program.
		warn!("failed to initialize eBPF logger: {e}");
	}

	let ksyms = Kallsyms::load(&args.kallsyms)?;
	load_ksymbols(&mut ebpf, &ksyms)?;

	let gate = layout::write_gate_layout(&mut ebpf)?;
	debug!("gate layout: {gate:?}");
	match KernelOffsets::resolve(&args.btf) {
		Ok(offsets) => offsets.write(&mut ebpf)?,
		Err(err) => warn!("kernel layout unavailable, paths and pid trees will be empty: {err}"),
	}

	let ringbuf_fd = load_hooks(&mut ebpf)?;

	let (ringbuf_tx, ringbuf_rx) = new_channel::<HadesEvent>("ringbuf");

	let mut supervisor = Supervisor::new();
	let ringbuf_worker = RingBufWorker::start(ringbuf_fd, ringbuf_tx, supervisor.token())?;
	let receiver_worker = ReceiverWorker::start(
		ringbuf_rx,
		Baseline::new(ksyms),
		UserCache::new(&args.passwd),
		supervisor.token(),
	)?;
	supervisor.spawn("ringbuf", ringbuf_worker.run());
	supervisor.spawn("receiver", receiver_worker.run());

	let trigger = match args.mode {
		RunMode::Scan => {
			let trigger = ScanTrigger::new(&mut ebpf, args.syscalls)?;
			Some(trigger.spawn(args.interval.map(Duration::from_secs)))
		}
		RunMode::Monitor => None,
	};

	info!("hades running in {:?} mode, Ctrl-C to stop", args.mode);
	tokio::signal::ctrl_c().await?;

	if let Some(trigger) = trigger {
		tokio::task::spawn_blocking(move || trigger.stop()).await??;
	}
	supervisor.shutdown().await?;

	Ok(())
}

/// Push the table addresses the scanners resolve in the kernel.
fn load_ksymbols(ebpf: &mut Ebpf, ksyms: &Kallsyms) -> Result<()> {
	let map = ebpf.map_mut("KSYMBOLS").ok_or(Error::MapNotFound("KSYMBOLS"))?;
	let mut symbols: HashMap<&mut MapData, KsymName, u64> = HashMap::try_from(map)?;

	for name in [SYS_CALL_TABLE, IDT_TABLE] {
		let name_str = String::from_utf8_lossy(name);
		match ksyms.address(&name_str) {
			Some(addr) => {
				symbols.insert(KsymName::new(name), addr, 0)?;
				debug!("ksym: {name_str} at {addr:#x}");
			}
			None => warn!("{name_str} not found in kallsyms, its scan is disabled"),
		}
	}

	Ok(())
}

pub fn load_hooks(ebpf: &mut Ebpf) -> Result<AsyncFd<RingBuf<MapData>>> {
	for name in KPROBES {
		let program: &mut KProbe = ebpf.program_mut(name).ok_or(Error::EbpfProgNotFound(name))?.try_into()?;
		program.load()?;
		program.attach(name, 0)?;
	}

	let ring_buf = RingBuf::try_from(ebpf.take_map("EVT_MAP").ok_or(Error::MapNotFound("EVT_MAP"))?)?;
	let fd = AsyncFd::new(ring_buf)?;
	Ok(fd)
}
