use derive_more::Display;

use crate::{event::FindingEvent, ksyms::Kallsyms};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	#[display("clean")]
	Clean,
	#[display("HOOKED")]
	Hooked,
	#[display("unknown")]
	Unknown,
}

/// Verdict for a finding plus the symbol its handler lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgement {
	pub verdict: Verdict,
	pub symbol: Option<String>,
}

/// Expected-value baseline: handlers must live in the core kernel text.
pub struct Baseline {
	ksyms: Kallsyms,
}

impl Baseline {
	pub fn new(ksyms: Kallsyms) -> Self {
		Baseline { ksyms }
	}

	pub fn judge(&self, finding: &FindingEvent) -> Judgement {
		let symbol = self
			.ksyms
			.nearest(finding.address)
			.map(|(name, offset)| format!("{name}+{offset:#x}"));

		let verdict = match self.ksyms.text_range() {
			Some((start, end)) if (start..end).contains(&finding.address) => Verdict::Clean,
			Some(_) => Verdict::Hooked,
			None => Verdict::Unknown,
		};

		Judgement { verdict, symbol }
	}
}

// region:    --- Tests


// endregion: --- Tests
