use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{consts::MAX_KSYM_NAME_SIZE, probe::SymbolTable};

/// Key of the `KSYMBOLS` map: a NUL padded symbol name.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct KsymName {
	pub str: [u8; MAX_KSYM_NAME_SIZE],
}

impl KsymName {
	/// Copy `name` into a fresh key, keeping room for the terminating NUL.
	pub fn new(name: &[u8]) -> Self {
		let mut str = [0u8; MAX_KSYM_NAME_SIZE];
		let len = name
			.iter()
			.position(|&b| b == 0)
			.unwrap_or(name.len())
			.min(MAX_KSYM_NAME_SIZE - 1);
		str[..len].copy_from_slice(&name[..len]);
		KsymName { str }
	}
}

/// Address of `name` in the symbol table, if user space loaded it.
///
/// A zero address is never a valid symbol and reads as absent.
pub fn resolve<S: SymbolTable>(symbols: &S, name: &[u8]) -> Option<u64> {
	let key = KsymName::new(name);
	symbols.lookup(&key).filter(|&addr| addr != 0)
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for KsymName {}

// region:    --- Tests


// endregion: --- Tests
