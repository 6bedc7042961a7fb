//! Named flume channels between the workers.

use crate::{Error, Result};
use flume::{Receiver, Sender};

pub struct Tx<T> {
	name: &'static str,
	tx: Sender<T>,
}

impl<T> Clone for Tx<T> {
	fn clone(&self) -> Self {
		Tx {
			name: self.name,
			tx: self.tx.clone(),
		}
	}
}

impl<T> Tx<T> {
	pub async fn send(&self, item: T) -> Result<()> {
		self.tx
			.send_async(item)
			.await
			.map_err(|err| Error::EventSend(format!("{}: {err}", self.name)))
	}
}

pub struct Rx<T> {
	name: &'static str,
	rx: Receiver<T>,
}

impl<T> Rx<T> {
	pub async fn recv(&self) -> Result<T> {
		let res = self.rx.recv_async().await?;
		Ok(res)
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Items sent but not yet received.
	pub fn backlog(&self) -> usize {
		self.rx.len()
	}
}

pub fn new_channel<T>(name: &'static str) -> (Tx<T>, Rx<T>) {
	let (tx, rx) = flume::unbounded::<T>();

	(Tx { name, tx }, Rx { name, rx })
}
