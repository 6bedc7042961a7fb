use aya::maps::{MapData, RingBuf};
use tokio::io::unix::AsyncFd;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
	error::Result,
	event::{parse_event_from_bytes, HadesEvent},
	trx::Tx,
};

pub struct RingBufWorker {
	pub ringbuf_fd: AsyncFd<RingBuf<MapData>>,
	pub tx: Tx<HadesEvent>,
	shutdown: CancellationToken,
	dropped: u64,
}

impl RingBufWorker {
	pub fn start(ringbuf_fd: AsyncFd<RingBuf<MapData>>, tx: Tx<HadesEvent>, shutdown: CancellationToken) -> Result<Self> {
		Ok(RingBufWorker {
			ringbuf_fd,
			tx,
			shutdown,
			dropped: 0,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			let mut guard = tokio::select! {
				_ = self.shutdown.cancelled() => break,
				guard = self.ringbuf_fd.readable_mut() => match guard {
					Ok(g) => g,
					Err(_) => break,
				},
			};

			let ring_buf = guard.get_inner_mut();

			while let Some(item) = ring_buf.next() {
				match parse_event_from_bytes(item.as_ref()) {
					Ok(evt) => self.tx.send(evt).await?,
					Err(err) => {
						self.dropped += 1;
						debug!("ringbuf: dropped record: {err}");
					}
				}
			}

			guard.clear_ready();
		}

		info!("Ring buffer worker stopped ({} undecodable records)", self.dropped);
		Ok(())
	}
}
