//! Syscall table and IDT integrity scans.
//!
//! A scan checks exactly one entry per trigger: user space arms the index in
//! the integrity cache, fires the ioctl, and the probe reports the handler
//! address it finds there. Judging the address is left to user space.

use crate::{
	consts::{IDT_ENTRIES, IDT_TABLE, SYSCALL_ENTRY_SIZE, SYS_CALL_TABLE},
	event::{EventType, ScanKind},
	gate::{GateDescriptor, GateLayout},
	ksym,
	probe::{IntegrityCache, KernelMemory, RecordChannel, SymbolTable},
	Error, Result,
};

/// Handler address found at one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
	pub kind: ScanKind,
	pub index: u64,
	pub address: u64,
}

pub struct IntegrityScanner<'a, S, C, M> {
	symbols: &'a S,
	cache: &'a C,
	mem: &'a M,
}

impl<'a, S, C, M> IntegrityScanner<'a, S, C, M>
where
	S: SymbolTable,
	C: IntegrityCache,
	M: KernelMemory,
{
	pub fn new(symbols: &'a S, cache: &'a C, mem: &'a M) -> Self {
		IntegrityScanner { symbols, cache, mem }
	}

	pub fn scan<R: RecordChannel>(&self, kind: ScanKind, layout: GateLayout, chan: &mut R) -> Result<Finding> {
		match kind {
			ScanKind::Syscall => self.scan_syscall_table(chan),
			ScanKind::Idt => self.scan_idt(layout, chan),
		}
	}

	pub fn scan_syscall_table<R: RecordChannel>(&self, chan: &mut R) -> Result<Finding> {
		let base = ksym::resolve(self.symbols, SYS_CALL_TABLE).ok_or(Error::SymbolNotFound)?;
		let index = self.cache.pending(ScanKind::Syscall).ok_or(Error::NoPendingIndex)?;

		let entry = index
			.checked_mul(SYSCALL_ENTRY_SIZE)
			.and_then(|off| base.checked_add(off))
			.ok_or(Error::IndexOutOfRange)?;

		let address = match self.mem.read_u64(entry)? {
			0 => return Err(Error::ZeroEntry),
			addr => addr,
		};

		emit(
			chan,
			Finding {
				kind: ScanKind::Syscall,
				index,
				address,
			},
		)
	}

	pub fn scan_idt<R: RecordChannel>(&self, layout: GateLayout, chan: &mut R) -> Result<Finding> {
		let entry_size = layout.entry_size().ok_or(Error::UnsupportedGateLayout)?;
		let base = ksym::resolve(self.symbols, IDT_TABLE).ok_or(Error::SymbolNotFound)?;
		let vector = self.cache.pending(ScanKind::Idt).ok_or(Error::NoPendingIndex)?;
		if vector >= IDT_ENTRIES {
			return Err(Error::IndexOutOfRange);
		}

		// vector < 256, the multiplication cannot overflow
		let entry = base.checked_add(vector * entry_size).ok_or(Error::IndexOutOfRange)?;
		let address = GateDescriptor::read(self.mem, entry)?.handler()?;

		emit(
			chan,
			Finding {
				kind: ScanKind::Idt,
				index: vector,
				address,
			},
		)
	}
}

fn emit<R: RecordChannel>(chan: &mut R, finding: Finding) -> Result<Finding> {
	let rec = chan.init(EventType::AntiRootkit).ok_or(Error::RecordUnavailable)?;
	rec.push_u64(0, finding.address)?;
	rec.push_u64(1, finding.index)?;
	rec.push_i32(2, finding.kind.finding_tag())?;
	chan.submit()?;
	Ok(finding)
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::{
		event::{EventType, ANTI_ROOTKIT_IDT, ANTI_ROOTKIT_SYSCALL},
		gate::GATE_INTERRUPT,
		record::{RawValue, RecordReader},
		support::{gate_bits, FakeCache, FakeChannel, FakeMemory, FakeSymbols},
	};

	const FX_SYSCALL_BASE: u64 = 0xffff_ffff_8220_0300;
	const FX_IDT_BASE: u64 = 0xffff_fe00_0000_0000;

	fn fields_of(bytes: &[u8]) -> Result<(u32, Vec<RawValue<'_>>)> {
		let (ctx, mut reader) = RecordReader::new(bytes).map_err(|e| format!("{e:?}"))?;
		let mut values = Vec::new();
		while let Some(field) = reader.next_field() {
			values.push(field.map_err(|e| format!("{e:?}"))?.value);
		}
		Ok((ctx.event_type, values))
	}

	#[test]
	fn scan_syscall_table_emits_finding_ok() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(SYS_CALL_TABLE, FX_SYSCALL_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Syscall, 3);
		let fx_mem = FakeMemory::default().with_u64(FX_SYSCALL_BASE + 3 * 8, 0xffff_ffff_8123_4560);
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let finding = scanner.scan_syscall_table(&mut chan).map_err(|e| e.to_string())?;

		// -- Check
		assert_eq!(finding.address, 0xffff_ffff_8123_4560);
		assert_eq!(finding.index, 3);
		assert_eq!(chan.submitted.len(), 1);
		let (event_type, values) = fields_of(&chan.submitted[0])?;
		assert_eq!(event_type, EventType::AntiRootkit as u32);
		assert_eq!(
			values,
			vec![
				RawValue::U64(0xffff_ffff_8123_4560),
				RawValue::U64(3),
				RawValue::I32(ANTI_ROOTKIT_SYSCALL)
			]
		);

		Ok(())
	}

	#[test]
	fn scan_missing_symbol_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default();
		let fx_cache = FakeCache::default().with(ScanKind::Syscall, 0).with(ScanKind::Idt, 0);
		let fx_mem = FakeMemory::default();
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec & Check
		for kind in [ScanKind::Syscall, ScanKind::Idt] {
			let res = scanner.scan(kind, GateLayout::X86_64, &mut chan);
			assert_eq!(res, Err(Error::SymbolNotFound));
		}
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_no_pending_index_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default()
			.with(SYS_CALL_TABLE, FX_SYSCALL_BASE)
			.with(IDT_TABLE, FX_IDT_BASE);
		let fx_cache = FakeCache::default();
		let fx_mem = FakeMemory::default();
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec & Check
		for kind in [ScanKind::Syscall, ScanKind::Idt] {
			let res = scanner.scan(kind, GateLayout::X86_64, &mut chan);
			assert_eq!(res, Err(Error::NoPendingIndex));
		}
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_syscall_table_zero_entry_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(SYS_CALL_TABLE, FX_SYSCALL_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Syscall, 1);
		let fx_mem = FakeMemory::default().with_u64(FX_SYSCALL_BASE + 8, 0);
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan_syscall_table(&mut chan);

		// -- Check
		assert_eq!(res, Err(Error::ZeroEntry));
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_syscall_table_index_overflow_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(SYS_CALL_TABLE, FX_SYSCALL_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Syscall, u64::MAX / 4);
		let fx_mem = FakeMemory::default();
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan_syscall_table(&mut chan);

		// -- Check
		assert_eq!(res, Err(Error::IndexOutOfRange));
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_idt_reconstructs_handler_ok() -> Result<()> {
		// -- Setup & Fixtures
		let fx_handler = 0xffff_ffff_8160_0a10;
		let fx_gate = GateDescriptor::from_target(fx_handler, 0x10, gate_bits(GATE_INTERRUPT, 0, 0));
		let fx_symbols = FakeSymbols::default().with(IDT_TABLE, FX_IDT_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Idt, 14);
		let fx_mem = FakeMemory::default().with_gate(FX_IDT_BASE + 14 * 16, &fx_gate);
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let finding = scanner.scan_idt(GateLayout::X86_64, &mut chan).map_err(|e| e.to_string())?;

		// -- Check
		assert_eq!(finding.address, fx_handler);
		assert_eq!(finding.kind, ScanKind::Idt);
		let (_, values) = fields_of(&chan.submitted[0])?;
		assert_eq!(
			values,
			vec![RawValue::U64(fx_handler), RawValue::U64(14), RawValue::I32(ANTI_ROOTKIT_IDT)]
		);

		Ok(())
	}

	#[test]
	fn scan_idt_unknown_layout_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_gate = GateDescriptor::from_target(0xffff_ffff_8160_0a10, 0x10, gate_bits(GATE_INTERRUPT, 0, 0));
		let fx_symbols = FakeSymbols::default().with(IDT_TABLE, FX_IDT_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Idt, 0);
		let fx_mem = FakeMemory::default().with_gate(FX_IDT_BASE, &fx_gate);
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan_idt(GateLayout::Unknown, &mut chan);

		// -- Check
		assert_eq!(res, Err(Error::UnsupportedGateLayout));
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_idt_vector_out_of_range_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(IDT_TABLE, FX_IDT_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Idt, IDT_ENTRIES);
		let fx_mem = FakeMemory::default();
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan_idt(GateLayout::X86_64, &mut chan);

		// -- Check
		assert_eq!(res, Err(Error::IndexOutOfRange));
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_idt_unreadable_entry_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(IDT_TABLE, FX_IDT_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Idt, 2);
		let fx_mem = FakeMemory::default();
		let mut chan = FakeChannel::default();
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan_idt(GateLayout::X86_64, &mut chan);

		// -- Check
		assert_eq!(res, Err(Error::ReadFault));
		assert!(chan.submitted.is_empty());

		Ok(())
	}

	#[test]
	fn scan_record_unavailable_err() -> Result<()> {
		// -- Setup & Fixtures
		let fx_symbols = FakeSymbols::default().with(SYS_CALL_TABLE, FX_SYSCALL_BASE);
		let fx_cache = FakeCache::default().with(ScanKind::Syscall, 0);
		let fx_mem = FakeMemory::default().with_u64(FX_SYSCALL_BASE, 0xffff_ffff_8100_1000);
		let mut chan = FakeChannel {
			available: false,
			..Default::default()
		};
		let scanner = IntegrityScanner::new(&fx_symbols, &fx_cache, &fx_mem);

		// -- Exec
		let res = scanner.scan(ScanKind::Syscall, GateLayout::X86_64, &mut chan);

		// -- Check
		assert_eq!(res, Err(Error::RecordUnavailable));
		assert!(chan.submitted.is_empty());

		Ok(())
	}
}

// endregion: --- Tests
