//! `task_struct` and path accessors over raw kernel memory.
//!
//! Member offsets come from a [`KernelLayout`]. While none is loaded every
//! accessor reads as a fault, which the record layer turns into an empty
//! field.

use crate::{
	consts::{KernelField, MAX_PATH_COMPONENTS, MAX_PID_TREE_DEPTH},
	probe::{KernelLayout, KernelMemory},
	ReadFault,
};

type ReadResult<T> = core::result::Result<T, ReadFault>;

pub struct TaskReader<'a, M, L> {
	mem: &'a M,
	layout: &'a L,
}

impl<'a, M, L> TaskReader<'a, M, L>
where
	M: KernelMemory,
	L: KernelLayout,
{
	pub fn new(mem: &'a M, layout: &'a L) -> Self {
		TaskReader { mem, layout }
	}

	pub fn tgid(&self, task: u64) -> ReadResult<u32> {
		self.mem.read_u32(self.field(task, KernelField::TaskTgid)?)
	}

	pub fn parent_tgid(&self, task: u64) -> ReadResult<u32> {
		let parent = self.deref(task, KernelField::TaskRealParent)?;
		self.tgid(parent)
	}

	/// Tgids from `task` up through its ancestors, stopping after init.
	pub fn pid_tree(&self, task: u64, dst: &mut [u32]) -> usize {
		let mut task = task;
		let mut depth = 0;
		for slot in dst.iter_mut().take(MAX_PID_TREE_DEPTH) {
			let Ok(tgid) = self.tgid(task) else {
				break;
			};
			*slot = tgid;
			depth += 1;
			if tgid <= 1 {
				break;
			}
			match self.deref(task, KernelField::TaskRealParent) {
				Ok(parent) => task = parent,
				Err(_) => break,
			}
		}
		depth
	}

	/// `task->mm->exe_file`, faults for kernel threads.
	pub fn exe_path(&self, task: u64, dst: &mut [u8]) -> ReadResult<usize> {
		let mm = self.deref(task, KernelField::TaskMm)?;
		let exe = self.deref(mm, KernelField::MmExeFile)?;
		self.file_path(exe, dst)
	}

	/// `task->fs->pwd`, `None` when the task has no `fs_struct`.
	pub fn pwd_path(&self, task: u64, dst: &mut [u8]) -> Option<ReadResult<usize>> {
		let fs = match self.field(task, KernelField::TaskFs).and_then(|addr| self.mem.read_u64(addr)) {
			Ok(0) => return None,
			Ok(fs) => fs,
			Err(err) => return Some(Err(err)),
		};
		Some(self.field(fs, KernelField::FsPwd).and_then(|pwd| self.path(pwd, dst)))
	}

	pub fn file_path(&self, file: u64, dst: &mut [u8]) -> ReadResult<usize> {
		let path = self.field(file, KernelField::FileFPath)?;
		self.path(path, dst)
	}

	/// Rebuild the absolute path of a `struct path` into `dst`.
	///
	/// Walks `d_parent` up to the mount root and hops to the parent mount
	/// through `struct mount` until the global root. Only the
	/// `MAX_PATH_COMPONENTS` components closest to the leaf are kept.
	pub fn path(&self, path: u64, dst: &mut [u8]) -> ReadResult<usize> {
		let mut dentry = self.deref(path, KernelField::PathDentry)?;
		let vfsmnt = self.deref(path, KernelField::PathMnt)?;
		let mnt_off = self.layout.offset(KernelField::MountMnt).ok_or(ReadFault)?;
		let mut mnt = vfsmnt.checked_sub(mnt_off).ok_or(ReadFault)?;
		let mut mnt_root = self.deref(vfsmnt, KernelField::VfsmountMntRoot)?;

		let mut names = [0u64; MAX_PATH_COMPONENTS];
		let mut depth = 0;
		for _ in 0..MAX_PATH_COMPONENTS * 2 {
			let parent = self.deref(dentry, KernelField::DentryParent)?;

			if dentry == mnt_root || dentry == parent {
				let mnt_parent = self.deref(mnt, KernelField::MountParent)?;
				if mnt_parent == mnt {
					break;
				}
				dentry = self.deref(mnt, KernelField::MountMountpoint)?;
				mnt = mnt_parent;
				mnt_root = self.deref(self.field(mnt, KernelField::MountMnt)?, KernelField::VfsmountMntRoot)?;
				continue;
			}

			if depth == MAX_PATH_COMPONENTS {
				break;
			}
			let qstr = self.field(dentry, KernelField::DentryName)?;
			names[depth] = self.deref(qstr, KernelField::QstrName)?;
			depth += 1;
			dentry = parent;
		}

		Ok(self.join(&names[..depth], dst))
	}

	fn join(&self, names: &[u64], dst: &mut [u8]) -> usize {
		if names.is_empty() {
			return match dst.first_mut() {
				Some(slash) => {
					*slash = b'/';
					1
				}
				None => 0,
			};
		}

		let mut len = 0;
		for &name in names.iter().rev() {
			// slash, one name byte and the NUL read_str keeps
			if dst.len().saturating_sub(len) < 3 {
				break;
			}
			let Some((slash, rest)) = dst.get_mut(len..).and_then(|tail| tail.split_first_mut()) else {
				break;
			};
			*slash = b'/';
			len += 1 + self.mem.read_str(name, rest).unwrap_or(0);
		}
		len
	}

	// region:    --- Raw access

	fn field(&self, base: u64, field: KernelField) -> ReadResult<u64> {
		let off = self.layout.offset(field).ok_or(ReadFault)?;
		base.checked_add(off).ok_or(ReadFault)
	}

	/// Read the pointer member `field` of `base`, NULL reads as a fault.
	fn deref(&self, base: u64, field: KernelField) -> ReadResult<u64> {
		match self.mem.read_u64(self.field(base, field)?)? {
			0 => Err(ReadFault),
			ptr => Ok(ptr),
		}
	}

	// endregion: --- Raw access
}

// region:    --- Tests


// endregion: --- Tests
