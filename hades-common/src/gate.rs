//! Interrupt gate descriptors.
//!
//! Only the x86-64 `gate_struct` is understood:
//!
//! ```text
//!  0        2        4        6              8               12             16
//!  | low16  | segment| bits   | middle16     | high32        | reserved      |
//! ```
//!
//! The handler address is split over `low`, `middle` and `high`. Anything
//! else (other architectures, absent or non interrupt/trap gates) is refused
//! rather than decoded into a garbage address.

use crate::{probe::KernelMemory, Error, Result};

/// Descriptor layout of the running kernel, set by user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateLayout {
	Unknown,
	X86_64,
}

impl GateLayout {
	pub const fn from_raw(raw: u64) -> Self {
		match raw {
			1 => Self::X86_64,
			_ => Self::Unknown,
		}
	}

	pub const fn to_raw(&self) -> u64 {
		match self {
			Self::Unknown => 0,
			Self::X86_64 => 1,
		}
	}

	/// Layout matching a `std::env::consts::ARCH` style name.
	pub fn for_arch(arch: &str) -> Self {
		match arch {
			"x86_64" => Self::X86_64,
			_ => Self::Unknown,
		}
	}

	/// Size of one table entry, `None` for an unrecognized layout.
	pub const fn entry_size(&self) -> Option<u64> {
		match self {
			Self::X86_64 => Some(GateDescriptor::SIZE),
			Self::Unknown => None,
		}
	}
}

pub const GATE_INTERRUPT: u8 = 0xe;
pub const GATE_TRAP: u8 = 0xf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateDescriptor {
	pub offset_low: u16,
	pub segment: u16,
	pub bits: u16,
	pub offset_middle: u16,
	pub offset_high: u32,
}

impl GateDescriptor {
	pub const SIZE: u64 = 16;

	const OFFSET_LOW: u64 = 0;
	const SEGMENT: u64 = 2;
	const BITS: u64 = 4;
	const OFFSET_MIDDLE: u64 = 6;
	const OFFSET_HIGH: u64 = 8;

	/// Read the descriptor at `entry`, one sub-field at a time.
	pub fn read<M: KernelMemory>(mem: &M, entry: u64) -> Result<Self> {
		Ok(GateDescriptor {
			offset_low: mem.read_u16(entry.wrapping_add(Self::OFFSET_LOW))?,
			segment: mem.read_u16(entry.wrapping_add(Self::SEGMENT))?,
			bits: mem.read_u16(entry.wrapping_add(Self::BITS))?,
			offset_middle: mem.read_u16(entry.wrapping_add(Self::OFFSET_MIDDLE))?,
			offset_high: mem.read_u32(entry.wrapping_add(Self::OFFSET_HIGH))?,
		})
	}

	pub fn target(&self) -> u64 {
		(self.offset_low as u64) | ((self.offset_middle as u64) << 16) | ((self.offset_high as u64) << 32)
	}

	pub fn gate_type(&self) -> u8 {
		((self.bits >> 8) & 0x1f) as u8
	}

	pub fn is_present(&self) -> bool {
		self.bits & (1 << 15) != 0
	}

	/// Reconstructed handler address of a present interrupt or trap gate.
	pub fn handler(&self) -> Result<u64> {
		if !self.is_present() {
			return Err(Error::GateNotPresent);
		}
		if !matches!(self.gate_type(), GATE_INTERRUPT | GATE_TRAP) {
			return Err(Error::UnsupportedGateLayout);
		}
		match self.target() {
			0 => Err(Error::ZeroEntry),
			addr => Ok(addr),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
