//! Stateful shell around the catalog, the manifest index and the user's selection.
//!
//! A [`Session`] owns everything mutable. Resolution itself is a pure function of the
//! session's state and is recomputed on every query, so the forced set can never go
//! stale after a toggle or a filter change.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{self, CatalogError, PackageRecord};
use crate::config::starts_with_ignore_case;
use crate::http::HttpFetch;
use crate::installation::{self, InstallSummary, PackageInstaller};
use crate::metadb::{ManifestError, ManifestIndex, ManifestState, PackageMeta};
use crate::progress::ProgressObserver;
use crate::relationship_resolver;
use crate::selection::{self, Selection};

/// What the presentation layer renders after each change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
	pub visible: Vec<String>,
	/// Index aligned with `visible`.
	pub user_selected: Vec<bool>,
	pub forced: BTreeSet<String>,
	pub effective: BTreeSet<String>,
}

/// Counts from a bulk indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
	pub indexed: usize,
	pub unavailable: usize,
	/// Repositories whose manifest was already attempted and were not fetched again.
	pub cached: usize,
}

pub struct Session<F: HttpFetch> {
	config: crate::Config,
	fetcher: F,
	records: Vec<PackageRecord>,
	manifests: ManifestIndex,
	selection: Selection,
}

impl<F: HttpFetch> Session<F> {
	/// An empty session. Call [`refresh_catalog()`](Self::refresh_catalog) to populate it.
	pub fn new(config: crate::Config, fetcher: F) -> Self {
		Self::with_records(config, fetcher, Vec::new())
	}

	/// A session over an already known set of repositories.
	pub fn with_records(config: crate::Config, fetcher: F, records: Vec<PackageRecord>) -> Self {
		let selection = Selection::new(records.iter().map(|r| r.name.clone()));
		Self {
			config,
			fetcher,
			records,
			manifests: ManifestIndex::default(),
			selection,
		}
	}

	/* Fields */

	pub fn config(&self) -> &crate::Config {
		&self.config
	}

	pub fn records(&self) -> &[PackageRecord] {
		&self.records
	}

	pub fn record(&self, repository: &str) -> Option<&PackageRecord> {
		self.records.iter().find(|r| r.name == repository)
	}

	pub fn manifests(&self) -> &ManifestIndex {
		&self.manifests
	}

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/* Catalog */

	/// Replaces the session's repositories with a fresh catalog listing.
	///
	/// Choices are cleared, the text filter is kept and cached manifests of
	/// repositories still listed are kept. On error the session is left as it was.
	///
	/// # Errors
	/// - [`RateLimited`](crate::Error::RateLimited) when the catalog quota is spent.
	/// - [`Catalog`](crate::Error::Catalog) for unparsable pages or transport failures.
	pub async fn refresh_catalog(&mut self) -> crate::Result<usize> {
		let owner = self.config.catalog_owner().to_string();
		let records = match catalog::list_repositories(&self.fetcher, &self.config, &owner).await {
			Ok(r) => r,
			Err(CatalogError::RateLimited) => return Err(crate::Error::RateLimited),
			Err(e) => return Err(e.into()),
		};

		let names: std::collections::HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
		self.manifests.retain_repositories(|r| names.contains(r));

		let filter = self.selection.filter().to_string();
		self.selection = Selection::new(records.iter().map(|r| r.name.clone()));
		self.selection.set_filter(&filter);
		self.records = records;

		Ok(self.records.len())
	}

	/* Manifests */

	/// Indexes one repository's manifest, fetching only if it was never attempted.
	pub async fn index_manifest(&mut self, repository: &str) -> Result<&PackageMeta, ManifestError> {
		let record = self.records.iter()
			.find(|r| r.name == repository)
			.ok_or(ManifestError::InvalidRepository)?;
		self.manifests.index_manifest(&self.fetcher, &self.config, record).await
	}

	/// Indexes every repository not attempted yet, one fetch at a time.
	///
	/// `observer` hears about each fetched repository and is asked whether to stop
	/// before the next one. Metadata cached before an early stop is kept.
	///
	/// # Errors
	/// - [`RateLimited`](crate::Error::RateLimited) on the first forbidden response; the rest of the pass is abandoned.
	/// - [`Cancelled`](crate::Error::Cancelled) when the observer cancels.
	pub async fn index_all<O: ProgressObserver>(&mut self, observer: &mut O) -> crate::Result<IndexReport> {
		let mut report = IndexReport::default();

		let pending: Vec<&PackageRecord> = self.records.iter()
			.filter(|r| {
				let attempted = self.manifests.is_attempted(&r.name);
				if attempted {
					report.cached += 1;
				}
				!attempted
			})
			.collect();

		let total = pending.len();
		log::info!("Indexing {} manifests ({} cached).", total, report.cached);

		for (i, record) in pending.into_iter().enumerate() {
			if observer.is_cancelled() {
				log::warn!("Indexing cancelled after {} of {} manifests.", i, total);
				return Err(crate::Error::Cancelled);
			}

			match self.manifests.index_manifest(&self.fetcher, &self.config, record).await {
				Ok(_) => report.indexed += 1,
				Err(ManifestError::Forbidden) => {
					log::error!("Manifest fetch for {} was forbidden, abandoning the remaining {} fetches.", record.name, total - i - 1);
					return Err(crate::Error::RateLimited);
				},
				Err(_) => report.unavailable += 1,
			}

			observer.progress(i + 1, total, &record.name);
		}

		Ok(report)
	}

	pub fn manifest_state(&self, repository: &str) -> ManifestState<'_> {
		self.manifests.state(repository)
	}

	/* Selection */

	pub fn set_filter(&mut self, filter: &str) {
		self.selection.set_filter(filter);
	}

	/// Returns `false` if the repository is unknown.
	pub fn set_selected(&mut self, repository: &str, selected: bool) -> bool {
		self.selection.set_selected(repository, selected)
	}

	pub fn toggle(&mut self, repository: &str) -> Option<bool> {
		self.selection.toggle(repository)
	}

	pub fn select_all_visible(&mut self) {
		self.selection.set_all_visible(true);
	}

	pub fn clear_visible(&mut self) {
		self.selection.set_all_visible(false);
	}

	/* Resolution */

	pub fn forced(&self) -> BTreeSet<String> {
		relationship_resolver::compute_forced(
			&self.selection.visible_names(),
			&self.selection.user_selected(),
			&self.manifests,
			self.config.dependency_namespace(),
		)
	}

	/// Forced repositories mapped to the repository that pulled each one in.
	pub fn forced_sources(&self) -> BTreeMap<String, String> {
		relationship_resolver::compute_forced_sources(
			&self.selection.visible_names(),
			&self.selection.user_selected(),
			&self.manifests,
			self.config.dependency_namespace(),
		)
	}

	pub fn effective_selection(&self) -> BTreeSet<String> {
		self.snapshot().effective
	}

	pub fn snapshot(&self) -> SelectionSnapshot {
		let visible = self.selection.visible_names();
		let user_selected = self.selection.user_selected();
		let forced = relationship_resolver::compute_forced(&visible, &user_selected, &self.manifests, self.config.dependency_namespace());
		let effective = selection::effective_selection(&visible, &user_selected, &forced);
		SelectionSnapshot { visible, user_selected, forced, effective }
	}

	/* Installation */

	/// Whether an indexed manifest in the effective selection depends on an identifier
	/// inside the dependency namespace that no indexed repository publishes yet.
	fn has_unresolved_dependency(&self, effective: &BTreeSet<String>) -> bool {
		let namespace = self.config.dependency_namespace();
		effective.iter()
			.filter_map(|name| self.manifests.meta(name))
			.flat_map(|meta| meta.dependencies.iter())
			.filter(|dependency| starts_with_ignore_case(dependency, namespace))
			.any(|dependency| self.manifests.identifiers().repository_for(dependency).is_none())
	}

	/// Indexes the effective selection and whatever it pulls in, until resolution is stable.
	///
	/// A dependency edge only resolves once the publishing repository's manifest is
	/// indexed, so while a selected manifest names an unknown identifier the rest of the
	/// catalog is indexed too. `observer` hears about each fetch and can cancel between
	/// fetches. Metadata cached before an early stop is kept.
	///
	/// # Errors
	/// - [`RateLimited`](crate::Error::RateLimited) on the first forbidden response.
	/// - [`Cancelled`](crate::Error::Cancelled) when the observer cancels.
	pub async fn index_effective<O: ProgressObserver>(&mut self, observer: &mut O) -> crate::Result<()> {
		loop {
			let effective = self.effective_selection();
			let mut pending: Vec<PackageRecord> = self.records.iter()
				.filter(|r| effective.contains(&r.name) && !self.manifests.is_attempted(&r.name))
				.cloned()
				.collect();

			if pending.is_empty() && self.has_unresolved_dependency(&effective) {
				pending = self.records.iter()
					.filter(|r| !self.manifests.is_attempted(&r.name))
					.cloned()
					.collect();
				if !pending.is_empty() {
					log::debug!("Selection has unresolved dependencies, indexing {} more manifests.", pending.len());
				}
			}

			if pending.is_empty() {
				return Ok(());
			}

			let total = pending.len();
			for (i, record) in pending.iter().enumerate() {
				if observer.is_cancelled() {
					log::warn!("Indexing cancelled after {} of {} manifests.", i, total);
					return Err(crate::Error::Cancelled);
				}

				if let Err(ManifestError::Forbidden) = self.manifests.index_manifest(&self.fetcher, &self.config, record).await {
					log::error!("Manifest fetch for {} was forbidden, dependencies of the selection may be missing.", record.name);
					return Err(crate::Error::RateLimited);
				}

				observer.progress(i + 1, total, &record.name);
			}
		}
	}

	/// Installs or updates the effective selection through `installer`.
	///
	/// Manifests of the selection and everything it pulls in are indexed first through
	/// [`index_effective()`](Self::index_effective), so dependencies are installed even
	/// when nothing was indexed beforehand. Cancelling during that step installs nothing.
	pub async fn install<I, O>(&mut self, installer: &mut I, observer: &mut O) -> InstallSummary
	where
		I: PackageInstaller,
		O: ProgressObserver,
	{
		match self.index_effective(observer).await {
			Ok(()) => {},
			Err(crate::Error::Cancelled) => return InstallSummary { cancelled: true, ..Default::default() },
			Err(e) => log::warn!("Installing with incomplete dependency information: {}", e),
		}

		let effective = self.effective_selection();
		installation::install_selection(&self.fetcher, &self.config, &mut self.manifests, &self.records, &effective, installer, observer).await
	}
}
