//! Drives the in-kernel scans through `ioctl` on `/dev/null`.
//!
//! The probe honours only the thread whose tid sits in `CONFIG`, so the loop
//! runs on its own OS thread and never migrates between tids.

use std::{
	fs::File,
	os::fd::AsRawFd,
	thread::{self, JoinHandle},
	time::Duration,
};

use aya::{
	maps::{Array, HashMap, MapData},
	Ebpf,
};
use flume::{Receiver, RecvTimeoutError, Sender};
use hades_common::{
	consts::{ConfigKey, IDT_ENTRIES},
	event::ScanKind,
};
use tracing::{debug, info, warn};

use crate::{Error, Result};

pub struct ScanTrigger {
	config: Array<MapData, u64>,
	cache: HashMap<MapData, u32, u64>,
	dev: File,
	syscalls: u64,
}

impl ScanTrigger {
	pub fn new(ebpf: &mut Ebpf, syscalls: u64) -> Result<Self> {
		let config = ebpf.take_map("CONFIG").ok_or(Error::MapNotFound("CONFIG"))?;
		let cache = ebpf.take_map("ANALYZE_CACHE").ok_or(Error::MapNotFound("ANALYZE_CACHE"))?;

		Ok(ScanTrigger {
			config: Array::try_from(config)?,
			cache: HashMap::try_from(cache)?,
			dev: File::open("/dev/null")?,
			syscalls,
		})
	}

	/// Run the scan rounds on a dedicated thread.
	///
	/// With no `interval` a single round is run.
	pub fn spawn(self, interval: Option<Duration>) -> TriggerHandle {
		let (stop_tx, stop_rx) = flume::bounded(1);
		let thread = thread::spawn(move || self.run(stop_rx, interval));
		TriggerHandle { stop_tx, thread }
	}

	fn run(mut self, stop_rx: Receiver<()>, interval: Option<Duration>) -> Result<()> {
		self.claim()?;
		let res = self.run_rounds(&stop_rx, interval);
		self.release()?;
		res
	}

	fn run_rounds(&mut self, stop_rx: &Receiver<()>, interval: Option<Duration>) -> Result<()> {
		let mut round = 0u64;
		loop {
			self.round()?;
			round += 1;
			debug!("trigger: round {round} done");

			let Some(interval) = interval else {
				return Ok(());
			};
			match stop_rx.recv_timeout(interval) {
				Err(RecvTimeoutError::Timeout) => continue,
				Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
			}
		}
	}

	fn round(&mut self) -> Result<()> {
		for index in 0..self.syscalls {
			self.fire(ScanKind::Syscall, index)?;
		}
		for vector in 0..IDT_ENTRIES {
			self.fire(ScanKind::Idt, vector)?;
		}
		Ok(())
	}

	/// Arm the cache with `index` and enter the probe.
	///
	/// The probe runs synchronously inside the syscall, so the cache entry
	/// is consumed before the next one is written.
	fn fire(&mut self, kind: ScanKind, index: u64) -> Result<()> {
		self.cache.insert(kind.cache_key(), index, 0)?;
		// /dev/null answers ENOTTY, the probe has already run by then
		let _ = unsafe { libc::ioctl(self.dev.as_raw_fd(), kind.ioctl_cmd() as _, 0) };
		Ok(())
	}

	fn claim(&mut self) -> Result<()> {
		let tid = unsafe { libc::syscall(libc::SYS_gettid) } as u64;
		self.config.set(ConfigKey::ControllingTid as u32, tid, 0)?;
		info!("Scan trigger running as tid {tid}");
		Ok(())
	}

	fn release(&mut self) -> Result<()> {
		self.config.set(ConfigKey::ControllingTid as u32, 0, 0)?;
		Ok(())
	}
}

pub struct TriggerHandle {
	stop_tx: Sender<()>,
	thread: JoinHandle<Result<()>>,
}

impl TriggerHandle {
	pub fn stop(self) -> Result<()> {
		if self.stop_tx.send(()).is_err() {
			debug!("trigger: thread already finished");
		}
		let res = self.thread.join().map_err(|_| Error::TriggerThreadPanic)?;
		if let Err(err) = &res {
			warn!("Scan trigger stopped with error: {err}");
		}
		res
	}
}
