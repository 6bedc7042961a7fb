use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

/// Why a probe invocation ended without a record.
///
/// None of these ever reach the kernel's own control flow, the entry points
/// always return success to the hook.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("{self:?}")]
pub enum Error {
	// -- Resource unavailable
	RecordUnavailable,
	RecordFull,
	SubmitFailed,

	// -- Lookup miss
	SymbolNotFound,
	NoPendingIndex,
	LayoutNotLoaded,
	MissingFsStruct,

	// -- Invalid / zero read result
	ReadFault,
	ZeroEntry,
	IndexOutOfRange,
	UnsupportedGateLayout,
	GateNotPresent,

	// -- Permission mismatch
	NotControllingTask,
	UnknownCommand(u32),
}

impl Error {
	/// Record pool or channel failures, the only ones worth logging.
	pub const fn is_resource(&self) -> bool {
		matches!(self, Self::RecordUnavailable | Self::RecordFull | Self::SubmitFailed)
	}

	/// Stable numeric code for the kernel-side logger.
	pub const fn code(&self) -> u32 {
		match self {
			Self::RecordUnavailable => 1,
			Self::RecordFull => 2,
			Self::SubmitFailed => 3,
			Self::SymbolNotFound => 10,
			Self::NoPendingIndex => 11,
			Self::LayoutNotLoaded => 12,
			Self::MissingFsStruct => 13,
			Self::ReadFault => 20,
			Self::ZeroEntry => 21,
			Self::IndexOutOfRange => 22,
			Self::UnsupportedGateLayout => 23,
			Self::GateNotPresent => 24,
			Self::NotControllingTask => 30,
			Self::UnknownCommand(_) => 31,
		}
	}
}

/// A bounded kernel read hit an invalid address.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("ReadFault")]
pub struct ReadFault;

impl From<ReadFault> for Error {
	fn from(_: ReadFault) -> Self {
		Self::ReadFault
	}
}
