//! Directory dispatcher: walks a tree of `.hl7` files and ships each one through a shared
//! [`MessageStoreClient`].
//!
//! File system work runs on tokio's blocking pool so the dispatcher can share a runtime
//! with other tasks. Every file is handled independently. A read, send, or acknowledgement failure is recorded
//! in the [`DispatchReport`] and the run moves on to the next file; only a failure to scan
//! the root aborts a run.

pub mod transform;
pub mod walk;

pub use transform::*;
pub use walk::*;

// std
use std::io;
// crates.io
use tokio::{fs, task};
// self
use crate::{
	_prelude::*,
	ack::{self, Acknowledgement},
	store::{MessageStoreClient, payload_digest},
};

/// Knobs for a dispatch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOptions {
	/// Number of passes over the root directory; zero sends nothing.
	pub loops: u32,
	/// Append a timestamped `ZAC` segment to every payload.
	pub trailer: bool,
	/// Directory receiving a copy of each transformed payload.
	pub retain_dir: Option<PathBuf>,
}
impl Default for DispatchOptions {
	fn default() -> Self {
		Self { loops: 1, trailer: false, retain_dir: None }
	}
}

/// A file the store accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivered {
	/// Resource name assigned by the store.
	pub name: String,
	/// Parsed acknowledgement.
	pub ack: Acknowledgement,
}

/// Result of dispatching one file in one pass.
#[derive(Debug)]
pub struct FileOutcome {
	/// Zero-based pass index.
	pub pass: u32,
	/// Source file.
	pub path: PathBuf,
	/// Digest of the payload that was sent, when it got that far.
	pub digest: Option<String>,
	/// Delivery result.
	pub result: Result<Delivered>,
}

/// Per-file outcomes of a run, in dispatch order.
#[derive(Debug, Default)]
pub struct DispatchReport {
	/// All outcomes.
	pub outcomes: Vec<FileOutcome>,
}
impl DispatchReport {
	/// Number of files delivered with a positive acknowledgement.
	pub fn delivered(&self) -> usize {
		self.outcomes.iter().filter(|outcome| outcome.result.is_ok()).count()
	}

	/// Number of files that failed at any stage.
	pub fn failed(&self) -> usize {
		self.outcomes.len() - self.delivered()
	}

	/// Outcomes that failed.
	pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
		self.outcomes.iter().filter(|outcome| outcome.result.is_err())
	}
}

/// Sends every message file under a root through one client.
#[derive(Debug)]
pub struct Dispatcher {
	client: Arc<MessageStoreClient>,
	options: DispatchOptions,
}
impl Dispatcher {
	/// Creates a dispatcher sharing `client` across all files and passes.
	pub fn new(client: Arc<MessageStoreClient>, options: DispatchOptions) -> Self {
		Self { client, options }
	}

	/// Runs all configured passes over `root`.
	pub async fn run(&self, root: &Path) -> Result<DispatchReport> {
		let mut report = DispatchReport::default();

		if let Some(dir) = &self.options.retain_dir {
			fs::create_dir_all(dir)
				.await
				.map_err(|source| Error::MessageFile { path: dir.to_owned(), source })?;
		}

		for pass in 0..self.options.loops {
			let files = Self::discover_blocking(root).await?;

			tracing::info!(
				pass = pass + 1,
				root = %root.display(),
				files = files.len(),
				"Starting dispatch pass."
			);

			for path in files {
				let outcome = self.dispatch_file(pass, path).await;

				if let Err(e) = &outcome.result {
					tracing::warn!(path = %outcome.path.display(), error = %e, "Dispatch failed.");
				}

				report.outcomes.push(outcome);
			}
		}

		Ok(report)
	}

	/// Reads, transforms, sends, and checks one file.
	pub async fn dispatch_file(&self, pass: u32, path: PathBuf) -> FileOutcome {
		let payload = match self.prepare(&path).await {
			Ok(payload) => payload,
			Err(e) => return FileOutcome { pass, path, digest: None, result: Err(e) },
		};
		let digest = payload_digest(&payload);
		let result = self.deliver(&payload).await;

		if let Ok(delivered) = &result {
			tracing::info!(path = %path.display(), name = %delivered.name, "Message delivered.");
		}

		FileOutcome { pass, path, digest: Some(digest), result }
	}

	async fn discover_blocking(root: &Path) -> Result<Vec<PathBuf>> {
		let owned = root.to_owned();

		task::spawn_blocking(move || discover(&owned)).await.map_err(|e| Error::Discovery {
			path: root.to_owned(),
			source: io::Error::other(e),
		})?
	}

	async fn prepare(&self, path: &Path) -> Result<Vec<u8>> {
		let raw = fs::read(path)
			.await
			.map_err(|source| Error::MessageFile { path: path.to_owned(), source })?;
		let mut payload = sanitize(&raw);

		if self.options.trailer {
			payload = append_trailer(&payload, OffsetDateTime::now_utc())?;
		}
		if let Some(dir) = &self.options.retain_dir {
			if let Some(name) = path.file_name() {
				let copy = dir.join(name);

				fs::write(&copy, &payload)
					.await
					.map_err(|source| Error::MessageFile { path: copy, source })?;
			}
		}

		Ok(payload)
	}

	async fn deliver(&self, payload: &[u8]) -> Result<Delivered> {
		let sent = self.client.send(payload).await?;
		let ack = ack::check(&sent.ack)?;

		Ok(Delivered { name: sent.name, ack })
	}
}
