use which::which;

// Rebuild the probe whenever `bpf-linker` changes.
fn main() {
	match which("bpf-linker") {
		Ok(bpf_linker) => println!("cargo:rerun-if-changed={}", bpf_linker.display()),
		Err(err) => println!("cargo:warning=bpf-linker not found: {err}"),
	}
}
