use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
	baseline::{Baseline, Verdict},
	error::Result,
	event::{FindingEvent, HadesEvent, StringVector},
	trx::Rx,
	users::UserCache,
};

/// Logs every event, findings go through the baseline first.
pub struct ReceiverWorker {
	pub rx: Rx<HadesEvent>,
	baseline: Baseline,
	users: UserCache,
	shutdown: CancellationToken,
}

impl ReceiverWorker {
	pub fn start(rx: Rx<HadesEvent>, baseline: Baseline, users: UserCache, shutdown: CancellationToken) -> Result<Self> {
		Ok(ReceiverWorker {
			rx,
			baseline,
			users,
			shutdown,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => {
					break;
				}

				evt = self.rx.recv() => {
					match evt {
						Ok(evt) => self.handle(&evt),
						Err(e) => {
							info!("Event channel {} closed: {:?}", self.rx.name(), e);
							break;
						}
					}
				}
			}
		}

		if self.rx.backlog() > 0 {
			warn!("{} events left unread on {}", self.rx.backlog(), self.rx.name());
		}
		Ok(())
	}

	fn handle(&mut self, evt: &HadesEvent) {
		let meta = evt.meta();
		let user = self.users.username(meta.uid).unwrap_or("").to_string();
		debug!(
			"[{}] start: {} cgroup: {} tid: {} ppid: {} gid: {}",
			evt.name(),
			meta.start_time,
			meta.cgroup_id,
			meta.tid,
			meta.ppid,
			meta.gid
		);
		match evt {
			HadesEvent::Module(m) => {
				info!(
					"[{}] {} loaded by {} (PID: {}, UID: {}, USER: {}, EXE: {}, PWD: {}, TREE: {:?})",
					evt.name(),
					m.name,
					meta.comm,
					meta.pid,
					meta.uid,
					user,
					m.exe,
					m.pwd,
					m.pid_tree
				);
			}
			HadesEvent::KernelRead(r) => {
				info!(
					"[{}] {} read {} (PID: {}, USER: {}, READ_ID: {})",
					evt.name(),
					meta.comm,
					r.path,
					meta.pid,
					user,
					r.read_id
				);
			}
			HadesEvent::UserHelper(h) => {
				info!(
					"[{}] {} {:?} (WAIT: {}, ENVP: {:?}, PID: {}, USER: {}, EXE: {})",
					evt.name(),
					h.path,
					h.argv.entries,
					h.wait,
					h.envp.entries,
					meta.pid,
					user,
					h.exe
				);
				warn_truncated(evt.name(), "argv", &h.argv);
				warn_truncated(evt.name(), "envp", &h.envp);
			}
			HadesEvent::Finding(f) => self.report(evt.name(), f),
		}
	}

	fn report(&self, name: &str, f: &FindingEvent) {
		let judgement = self.baseline.judge(f);
		let symbol = judgement.symbol.as_deref().unwrap_or("?");
		match judgement.verdict {
			Verdict::Hooked => warn!(
				"[{name}] {:?}[{}] -> {:#x} <{symbol}> {}",
				f.kind, f.index, f.address, judgement.verdict
			),
			Verdict::Clean | Verdict::Unknown => info!(
				"[{name}] {:?}[{}] -> {:#x} <{symbol}> {}",
				f.kind, f.index, f.address, judgement.verdict
			),
		}
	}
}

fn warn_truncated(name: &str, what: &str, vector: &StringVector) {
	if !vector.is_truncated() {
		return;
	}
	let more = if vector.unterminated { "+" } else { "" };
	warn!(
		"[{name}] {what} truncated: {} of {}{more} entries kept",
		vector.entries.len(),
		vector.total
	);
}
