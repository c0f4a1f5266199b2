//! The user's choices over the repositories of a session.
//!
//! Choices are kept per repository name, so narrowing or widening the text filter
//! never shifts a choice onto a different repository.

use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionRecord {
	pub selected: bool,
	pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
	/// Catalog order.
	order: Vec<String>,
	records: HashMap<String, SelectionRecord>,
	filter: String,
}

impl Selection {
	/// Starts with nothing selected and everything visible.
	pub fn new(repositories: impl IntoIterator<Item = impl Into<String>>) -> Self {
		let mut order = Vec::<String>::new();
		let mut records = HashMap::<String, SelectionRecord>::new();
		for name in repositories {
			let name = name.into();
			if name.is_empty() || records.contains_key(&name) {
				continue;
			}
			records.insert(name.clone(), SelectionRecord { selected: false, visible: true });
			order.push(name);
		}
		Self { order, records, filter: String::new() }
	}

	pub fn filter(&self) -> &str {
		&self.filter
	}

	/// Shows only repositories whose name contains `filter`, ignoring case.
	/// An empty filter shows everything. Choices are left untouched.
	pub fn set_filter(&mut self, filter: &str) {
		self.filter = filter.to_string();
		let needle = filter.to_lowercase();
		for name in &self.order {
			if let Some(record) = self.records.get_mut(name) {
				record.visible = needle.is_empty() || name.to_lowercase().contains(&needle);
			}
		}
	}

	pub fn record(&self, repository: &str) -> Option<SelectionRecord> {
		self.records.get(repository).copied()
	}

	pub fn contains(&self, repository: &str) -> bool {
		self.records.contains_key(repository)
	}

	/// Every repository in catalog order, hidden ones included.
	pub fn repositories(&self) -> &[String] {
		&self.order
	}

	/// The filtered view in catalog order.
	pub fn visible_names(&self) -> Vec<String> {
		self.order.iter()
			.filter(|name| self.records.get(name.as_str()).map_or(false, |r| r.visible))
			.cloned()
			.collect()
	}

	/// User choices, index aligned with [`visible_names()`](Self::visible_names).
	pub fn user_selected(&self) -> Vec<bool> {
		self.order.iter()
			.filter_map(|name| self.records.get(name.as_str()))
			.filter(|r| r.visible)
			.map(|r| r.selected)
			.collect()
	}

	/// The user's choice for `repository`, whether or not it is currently visible.
	pub fn is_selected(&self, repository: &str) -> bool {
		self.records.get(repository).map_or(false, |r| r.selected)
	}

	/// Returns `false` if the repository is unknown.
	pub fn set_selected(&mut self, repository: &str, selected: bool) -> bool {
		match self.records.get_mut(repository) {
			Some(record) => {
				record.selected = selected;
				true
			},
			None => false,
		}
	}

	/// Flips the choice for `repository` and returns the new value.
	pub fn toggle(&mut self, repository: &str) -> Option<bool> {
		let record = self.records.get_mut(repository)?;
		record.selected = !record.selected;
		Some(record.selected)
	}

	/// Sets the choice of every visible repository. Hidden ones keep theirs.
	pub fn set_all_visible(&mut self, selected: bool) {
		for record in self.records.values_mut().filter(|r| r.visible) {
			record.selected = selected;
		}
	}

	/// Number of visible repositories the user picked.
	pub fn selected_count(&self) -> usize {
		self.records.values().filter(|r| r.visible && r.selected).count()
	}
}

/// The repositories to install: visible user choices plus every forced repository,
/// hidden or not.
pub fn effective_selection(visible: &[String], user_selected: &[bool], forced: &BTreeSet<String>) -> BTreeSet<String> {
	visible.iter()
		.zip(user_selected)
		.filter(|(_, selected)| **selected)
		.map(|(name, _)| name.clone())
		.chain(forced.iter().cloned())
		.collect()
}
