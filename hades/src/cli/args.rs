use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "hades")]
pub struct Cli {
	#[arg(long, value_enum, default_value = "monitor")]
	pub mode: RunMode,

	#[arg(long, default_value = "/proc/kallsyms")]
	pub kallsyms: PathBuf,

	#[arg(long, default_value = "/sys/kernel/btf/vmlinux")]
	pub btf: PathBuf,

	#[arg(long, default_value = "/etc/passwd", help = "Source of user names for logged uids")]
	pub passwd: PathBuf,

	#[arg(long, default_value_t = 460, help = "Syscall table entries checked per scan round")]
	pub syscalls: u64,

	#[arg(long, help = "Seconds between scan rounds. A single round runs when omitted")]
	pub interval: Option<u64>,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum RunMode {
	/// Hooks only.
	Monitor,
	/// Hooks plus syscall table and IDT scans.
	Scan,
}
