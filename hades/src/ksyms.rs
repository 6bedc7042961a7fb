//! `/proc/kallsyms` snapshot.

use std::{collections::HashMap, fs, path::Path};

use tracing::{debug, warn};

use crate::Result;

pub struct Kallsyms {
	by_name: HashMap<String, u64>,
	// sorted by address
	by_addr: Vec<(u64, String)>,
}

impl Kallsyms {
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)?;
		let ksyms = Self::parse(&content);
		if ksyms.is_empty() {
			warn!("{} exposes no addresses, kptr_restrict is probably set", path.display());
		}
		debug!("kallsyms: {} symbols from {}", ksyms.len(), path.display());
		Ok(ksyms)
	}

	/// Parse `addr type name [module]` lines.
	///
	/// Zero addresses (kptr_restrict) and malformed lines are skipped.
	pub fn parse(content: &str) -> Self {
		let mut by_name = HashMap::new();
		let mut by_addr = Vec::new();

		for line in content.lines() {
			let mut parts = line.split_whitespace();
			let (Some(addr), Some(_kind), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
				continue;
			};
			let Ok(addr) = u64::from_str_radix(addr, 16) else {
				continue;
			};
			if addr == 0 {
				continue;
			}
			by_name.entry(name.to_string()).or_insert(addr);
			by_addr.push((addr, name.to_string()));
		}
		by_addr.sort_by_key(|(addr, _)| *addr);

		Kallsyms { by_name, by_addr }
	}

	pub fn len(&self) -> usize {
		self.by_addr.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_addr.is_empty()
	}

	pub fn address(&self, name: &str) -> Option<u64> {
		self.by_name.get(name).copied()
	}

	/// `[_stext, _etext)` of the core kernel image.
	pub fn text_range(&self) -> Option<(u64, u64)> {
		let start = self.address("_stext")?;
		let end = self.address("_etext")?;
		(start < end).then_some((start, end))
	}

	/// Closest symbol at or below `addr`, with the offset into it.
	pub fn nearest(&self, addr: u64) -> Option<(&str, u64)> {
		let idx = self.by_addr.partition_point(|(sym, _)| *sym <= addr);
		let (sym, name) = self.by_addr.get(idx.checked_sub(1)?)?;
		Some((name.as_str(), addr - sym))
	}
}

// region:    --- Tests


// endregion: --- Tests
