//! Persisted session storage.
//!
//! The engine only needs atomic replacement of a single record, so stores
//! expose `get`/`set`/`clear` and nothing else.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::session::Session;

pub trait SessionStore: Send + Sync {
	fn get(&self) -> Result<Option<Session>>;

	/// Replaces the stored session.
	fn set(&self, session: &Session) -> Result<()>;

	/// Removes the stored session. Succeeds when nothing is stored.
	fn clear(&self) -> Result<()>;
}

/// Store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(session: Session) -> Self {
		Self {
			slot: Mutex::new(Some(session)),
		}
	}
}

impl SessionStore for MemorySessionStore {
	fn get(&self) -> Result<Option<Session>> {
		Ok(self.slot.lock().clone())
	}

	fn set(&self, session: &Session) -> Result<()> {
		*self.slot.lock() = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		self.slot.lock().take();
		Ok(())
	}
}

/// JSON file store.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// readers never observe a partial record.
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
	path: PathBuf,
}

impl JsonFileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
		name.push(".tmp");
		self.path.with_file_name(name)
	}
}

impl SessionStore for JsonFileSessionStore {
	fn get(&self) -> Result<Option<Session>> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(Error::store(e)),
		};
		serde_json::from_str(&content).map(Some).map_err(Error::store)
	}

	fn set(&self, session: &Session) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(Error::store)?;
		}

		let temp = self.temp_path();
		let json = serde_json::to_string_pretty(session).map_err(Error::store)?;
		fs::write(&temp, json).map_err(Error::store)?;
		fs::rename(&temp, &self.path).map_err(Error::store)
	}

	fn clear(&self) -> Result<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(Error::store(e)),
		}
	}
}
