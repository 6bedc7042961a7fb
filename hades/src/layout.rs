//! Kernel struct member offsets, resolved from BTF.

use std::path::Path;

use aya::{
	maps::{Array, MapData},
	Ebpf,
};
use btf_rs::{Btf, Type};
use hades_common::{
	consts::{ConfigKey, KernelField},
	gate::GateLayout,
};
use tracing::{debug, info};

use crate::{Error, Result};

/// Byte offset of each [`KernelField`], indexed by its discriminant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelOffsets {
	offsets: [u64; KernelField::COUNT as usize],
}

impl KernelOffsets {
	pub fn resolve(btf_path: &Path) -> Result<Self> {
		let btf = Btf::from_file(btf_path)?;
		let mut offsets = [0u64; KernelField::COUNT as usize];

		for field in KernelField::ALL {
			let (st, member) = field.btf_member();
			let bits = member_bit_offset(&btf, st, member)?.ok_or(Error::LayoutMemberNotFound(st, member))?;
			offsets[field as usize] = bits / 8;
			debug!("layout: {st}.{member} at {}", bits / 8);
		}

		Ok(KernelOffsets { offsets })
	}

	pub fn get(&self, field: KernelField) -> u64 {
		self.offsets[field as usize]
	}

	/// Publish to `KERNEL_LAYOUT` and flag the layout as loaded.
	pub fn write(&self, ebpf: &mut Ebpf) -> Result<()> {
		let map = ebpf.map_mut("KERNEL_LAYOUT").ok_or(Error::MapNotFound("KERNEL_LAYOUT"))?;
		let mut layout: Array<&mut MapData, u64> = Array::try_from(map)?;
		for field in KernelField::ALL {
			layout.set(field as u32, self.get(field), 0)?;
		}

		config_map(ebpf)?.set(ConfigKey::LayoutLoaded as u32, 1, 0)?;
		info!("Kernel layout loaded ({} members)", KernelField::COUNT);
		Ok(())
	}
}

/// Tell the IDT scanner how gate descriptors are laid out on this host.
pub fn write_gate_layout(ebpf: &mut Ebpf) -> Result<GateLayout> {
	let gate = GateLayout::for_arch(std::env::consts::ARCH);
	config_map(ebpf)?.set(ConfigKey::GateLayout as u32, gate.to_raw(), 0)?;
	Ok(gate)
}

fn config_map(ebpf: &mut Ebpf) -> Result<Array<&mut MapData, u64>> {
	let map = ebpf.map_mut("CONFIG").ok_or(Error::MapNotFound("CONFIG"))?;
	Ok(Array::try_from(map)?)
}

fn member_bit_offset(btf: &Btf, st: &str, member: &str) -> Result<Option<u64>> {
	for ty in btf.resolve_types_by_name(st)? {
		if let Some(bits) = find_member(btf, &ty, member)? {
			return Ok(Some(bits));
		}
	}
	Ok(None)
}

/// Search `ty` for `name`, descending into anonymous struct/union members.
fn find_member(btf: &Btf, ty: &Type, name: &str) -> Result<Option<u64>> {
	let members = match ty {
		Type::Struct(s) => &s.members,
		Type::Union(u) => &u.members,
		_ => return Ok(None),
	};

	for member in members {
		let member_name = btf.resolve_name(member).unwrap_or_default();
		if member_name == name {
			return Ok(Some(member.bit_offset() as u64));
		}
		if member_name.is_empty() {
			let inner = btf.resolve_chained_type(member)?;
			if let Some(bits) = find_member(btf, &inner, name)? {
				return Ok(Some(member.bit_offset() as u64 + bits));
			}
		}
	}

	Ok(None)
}
