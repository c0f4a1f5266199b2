use std::collections::HashMap;

/// Maps declared package identifiers to the repositories publishing them and back.
///
/// When two repositories declare the same identifier the first registration stays
/// resolvable and the later one can't be reached through dependency edges.
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
	/// Every registration in order, shadowed ones included, so the index can be rebuilt.
	registrations: Vec<(String, String)>,
	repository_by_identifier: HashMap<String, String>,
	identifier_by_repository: HashMap<String, String>,
}

impl IdentifierIndex {
	/// Registers `repository` as publishing `identifier`.
	///
	/// Returns `false` if another repository already owns the identifier.
	pub fn register(&mut self, identifier: &str, repository: &str) -> bool {
		if self.identifier_by_repository.contains_key(repository) {
			return self.repository_by_identifier.get(identifier).map(String::as_str) == Some(repository);
		}

		self.registrations.push((identifier.to_string(), repository.to_string()));
		self.identifier_by_repository.insert(repository.to_string(), identifier.to_string());

		match self.repository_by_identifier.get(identifier) {
			Some(owner) => {
				log::warn!("Package {} declared by both {} and {}, keeping {}.", identifier, owner, repository, owner);
				false
			},
			None => {
				self.repository_by_identifier.insert(identifier.to_string(), repository.to_string());
				true
			},
		}
	}

	pub fn repository_for(&self, identifier: &str) -> Option<&str> {
		self.repository_by_identifier.get(identifier).map(String::as_str)
	}

	pub fn identifier_for(&self, repository: &str) -> Option<&str> {
		self.identifier_by_repository.get(repository).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.repository_by_identifier.len()
	}

	pub fn is_empty(&self) -> bool {
		self.repository_by_identifier.is_empty()
	}

	/// Drops repositories rejected by `keep`, replaying the remaining registrations in order.
	pub fn retain_repositories(&mut self, mut keep: impl FnMut(&str) -> bool) {
		let registrations = std::mem::take(&mut self.registrations);
		*self = Self::default();
		for (identifier, repository) in registrations {
			if keep(repository.as_str()) {
				self.register(&identifier, &repository);
			}
		}
	}
}
