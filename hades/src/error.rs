use derive_more::{Display, From};
use flume::RecvError;
use hades_common::record::DecodeError;
use tokio::task::JoinError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	EventSend(String),
	EventRecv(RecvError),
	EbpfProgNotFound(&'static str),
	MapNotFound(&'static str),
	#[display("Kernel layout member {_0}.{_1} not found in BTF")]
	LayoutMemberNotFound(&'static str, &'static str),
	TriggerThreadPanic,

	// -- Decoder
	InvalidEventSize,
	UnknownEventType(u32),
	UnknownFieldKind(u8),
	UnknownFindingTag(i32),
	MissingField(u8),
	FieldIndexMismatch {
		expected: u8,
		got: u8,
	},
	FieldKindMismatch(u8),

	// -- Externals
	#[from]
	JoinError(JoinError),
	#[from]
	AyaEbpf(aya::EbpfError),
	#[from]
	AyaMaps(aya::maps::MapError),
	#[from]
	AyaProgram(aya::programs::ProgramError),
	#[display("BTF error: {_0}")]
	#[from]
	Btf(anyhow::Error),
	#[from]
	Io(std::io::Error),
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Self::EventRecv(err)
	}
}

impl From<DecodeError> for Error {
	fn from(err: DecodeError) -> Self {
		match err {
			DecodeError::Truncated => Self::InvalidEventSize,
			DecodeError::UnknownFieldKind(kind) => Self::UnknownFieldKind(kind),
		}
	}
}

// region:    --- Custom

impl Error {
	pub fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
