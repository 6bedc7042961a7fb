//! uid to user name, cached.

use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use tracing::debug;

/// Names resolved from a passwd file. Only hits are kept, a uid that is not
/// there yet is looked up again next time.
pub struct UserCache {
	passwd: PathBuf,
	names: HashMap<u32, String>,
}

impl UserCache {
	pub fn new(passwd: &Path) -> Self {
		UserCache {
			passwd: passwd.to_path_buf(),
			names: HashMap::new(),
		}
	}

	pub fn username(&mut self, uid: u32) -> Option<&str> {
		if !self.names.contains_key(&uid) {
			let name = self.lookup(uid)?;
			self.names.insert(uid, name);
		}
		self.names.get(&uid).map(String::as_str)
	}

	fn lookup(&self, uid: u32) -> Option<String> {
		match fs::read_to_string(&self.passwd) {
			Ok(content) => passwd_entry(&content, uid),
			Err(err) => {
				debug!("users: cannot read {}: {err}", self.passwd.display());
				None
			}
		}
	}
}

/// Name on the `name:password:uid:...` line for `uid`.
fn passwd_entry(content: &str, uid: u32) -> Option<String> {
	content.lines().filter(|line| !line.starts_with('#')).find_map(|line| {
		let mut parts = line.split(':');
		let name = parts.next().filter(|name| !name.is_empty())?;
		let id: u32 = parts.nth(1)?.trim().parse().ok()?;
		(id == uid).then(|| name.to_string())
	})
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	const FX_PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
# comment:x:7:7
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
broken:x:notanumber:0::/:/bin/false
:x:2:2::/:/bin/false
alice:x:1000:1000:Alice,,,:/home/alice:/bin/zsh
";

	fn fx_passwd_file(tag: &str, content: &str) -> Result<PathBuf> {
		let path = std::env::temp_dir().join(format!("hades-passwd-{}-{tag}", std::process::id()));
		fs::write(&path, content)?;
		Ok(path)
	}

	#[test]
	fn users_passwd_entry_ok() -> Result<()> {
		// -- Exec & Check
		assert_eq!(passwd_entry(FX_PASSWD, 0).as_deref(), Some("root"));
		assert_eq!(passwd_entry(FX_PASSWD, 1000).as_deref(), Some("alice"));
		assert_eq!(passwd_entry(FX_PASSWD, 7), None);
		assert_eq!(passwd_entry(FX_PASSWD, 2), None);
		assert_eq!(passwd_entry(FX_PASSWD, 65534), None);

		Ok(())
	}

	#[test]
	fn users_cache_serves_hits_without_reread_ok() -> Result<()> {
		// -- Setup & Fixtures
		let fx_path = fx_passwd_file("hits", FX_PASSWD)?;
		let mut cache = UserCache::new(&fx_path);
		assert_eq!(cache.username(1000), Some("alice"));

		// -- Exec
		fs::remove_file(&fx_path)?;

		// -- Check
		assert_eq!(cache.username(1000), Some("alice"));
		assert_eq!(cache.username(0), None);

		Ok(())
	}

	#[test]
	fn users_cache_retries_misses_ok() -> Result<()> {
		// -- Setup & Fixtures
		let fx_path = fx_passwd_file("misses", "root:x:0:0:root:/root:/bin/bash\n")?;
		let mut cache = UserCache::new(&fx_path);
		assert_eq!(cache.username(1001), None);

		// -- Exec
		fs::write(&fx_path, "root:x:0:0:root:/root:/bin/bash\nbob:x:1001:1001::/home/bob:/bin/sh\n")?;

		// -- Check
		assert_eq!(cache.username(1001), Some("bob"));
		fs::remove_file(&fx_path)?;

		Ok(())
	}
}

// endregion: --- Tests
