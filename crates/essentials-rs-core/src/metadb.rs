//! # Manifest index
//!
//! Session cache of what each repository's manifest declares.
//!
//! A repository is in one of three states: never attempted, attempted without usable
//! metadata, or indexed. Once attempted it is never fetched again, so the resolver
//! can read the index on every selection change without touching the network.
//!
//! The one exception is [`ManifestError::Forbidden`], which is reported but not
//! recorded; it signals an exhausted quota rather than a property of the repository.

use std::collections::HashMap;

use crate::catalog::PackageRecord;
use crate::http::HttpFetch;

mod manifest;
pub use manifest::PackageMeta;
pub use manifest::ManifestError;
pub use manifest::parse_manifest;
pub use manifest::fetch_manifest;

mod identifier_index;
pub use identifier_index::IdentifierIndex;

/// A recorded fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ManifestEntry {
	Unavailable(ManifestError),
	Indexed(PackageMeta),
}

/// Cache state of a single repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestState<'a> {
	NotAttempted,
	Unavailable(&'a ManifestError),
	Indexed(&'a PackageMeta),
}

#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
	entries: HashMap<String, ManifestEntry>,
	identifiers: IdentifierIndex,
}

impl ManifestIndex {
	pub fn state(&self, repository: &str) -> ManifestState<'_> {
		match self.entries.get(repository) {
			None => ManifestState::NotAttempted,
			Some(ManifestEntry::Unavailable(e)) => ManifestState::Unavailable(e),
			Some(ManifestEntry::Indexed(meta)) => ManifestState::Indexed(meta),
		}
	}

	/// Metadata for `repository` if it was indexed successfully.
	pub fn meta(&self, repository: &str) -> Option<&PackageMeta> {
		match self.entries.get(repository) {
			Some(ManifestEntry::Indexed(meta)) => Some(meta),
			_ => None,
		}
	}

	pub fn is_attempted(&self, repository: &str) -> bool {
		self.entries.contains_key(repository)
	}

	pub fn identifiers(&self) -> &IdentifierIndex {
		&self.identifiers
	}

	/// Number of attempted repositories, indexed or not.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Records the outcome of a fetch for `repository`.
	///
	/// An existing entry is never replaced and `Forbidden` is not recorded.
	pub fn record(&mut self, repository: &str, outcome: Result<PackageMeta, ManifestError>) {
		if self.entries.contains_key(repository) {
			return;
		}

		let entry = match outcome {
			Ok(meta) => {
				self.identifiers.register(&meta.identifier, repository);
				ManifestEntry::Indexed(meta)
			},
			Err(ManifestError::Forbidden) => return,
			Err(e) => ManifestEntry::Unavailable(e),
		};
		self.entries.insert(repository.to_string(), entry);
	}

	/// Indexes the manifest of `record`, fetching only if it was never attempted.
	///
	/// # Errors
	/// The cached or fresh [`ManifestError`] explaining why there's no usable metadata.
	/// Callers doing a bulk pass should stop on [`ManifestError::Forbidden`].
	pub async fn index_manifest<F: HttpFetch>(&mut self, fetcher: &F, config: &crate::Config, record: &PackageRecord) -> Result<&PackageMeta, ManifestError> {
		if !self.is_attempted(&record.name) {
			let outcome = fetch_manifest(fetcher, config, record).await;
			match &outcome {
				Ok(meta) => log::debug!("Indexed {} as {} with {} dependencies.", record.name, meta.identifier, meta.dependencies.len()),
				Err(e) => log::warn!("Skipping {}: {}", record.name, e),
			}
			if let Err(ManifestError::Forbidden) = outcome {
				return Err(ManifestError::Forbidden);
			}
			self.record(&record.name, outcome);
		}

		match self.entries.get(&record.name) {
			Some(ManifestEntry::Indexed(meta)) => Ok(meta),
			Some(ManifestEntry::Unavailable(e)) => Err(e.clone()),
			None => Err(ManifestError::Unreachable),
		}
	}

	/// Forgets repositories rejected by `keep`.
	pub fn retain_repositories(&mut self, mut keep: impl FnMut(&str) -> bool) {
		self.entries.retain(|repository, _| keep(repository.as_str()));
		self.identifiers.retain_repositories(keep);
	}
}
