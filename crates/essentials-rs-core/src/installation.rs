//! Installing the effective selection into a project.
//!
//! Packages are installed one at a time and independently of each other, no install
//! order is computed. A failure is counted and the pass carries on with the next
//! package.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::catalog::PackageRecord;
use crate::http::HttpFetch;
use crate::metadb::{ManifestError, ManifestIndex};
use crate::progress::ProgressObserver;

pub mod project_manifest;
pub use project_manifest::ProjectManifestInstaller;

#[derive(Debug, Error)]
pub enum InstallError {
	#[error("no project manifest found at {0}")]
	ProjectMissing(std::path::PathBuf),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("invalid project manifest: {0}")]
	Parse(String),
}

/// Where a package is installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
	/// Git URL with the branch as fragment, `https://host/owner/name.git#branch`.
	pub url: String,
	/// Identifier the package declares in its manifest.
	pub identifier: String,
}

impl SourceLocator {
	pub fn for_record(config: &crate::Config, record: &PackageRecord, identifier: impl Into<String>) -> Self {
		Self { url: record.git_url(config), identifier: identifier.into() }
	}
}

/// A package the installer reports as present after a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
	pub identifier: String,
	pub source: String,
}

/// Installs packages from source locators.
#[allow(async_fn_in_trait)]
pub trait PackageInstaller {
	/// Identifiers of the packages currently installed.
	async fn installed_packages(&self) -> Result<Vec<String>, InstallError>;

	/// Installs the package or, when already installed, updates it to the locator's source.
	async fn install_or_update(&mut self, locator: &SourceLocator) -> Result<InstalledPackage, InstallError>;
}

/// End of run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallSummary {
	pub installed: usize,
	pub updated: usize,
	pub skipped: usize,
	pub failed: usize,
	/// The pass stopped early; remaining packages are in none of the counts.
	pub cancelled: bool,
}

impl std::fmt::Display for InstallSummary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.cancelled {
			writeln!(f, "Install/Update cancelled.")?;
		} else {
			writeln!(f, "Install/Update complete.")?;
		}
		writeln!(f)?;
		writeln!(f, "Installed: {}", self.installed)?;
		writeln!(f, "Updated: {}", self.updated)?;
		writeln!(f, "Skipped: {}", self.skipped)?;
		write!(f, "Failed: {}", self.failed)
	}
}

/// Installs or updates every repository in `effective`, in catalog order.
///
/// Repositories without usable manifest metadata are skipped. Manifests never
/// attempted before are fetched here and cached in `manifests`, until the first
/// forbidden response; after that only already indexed repositories are installed.
///
/// # Parameters
/// - `records` - The session's repositories, used for ordering and locators.
/// - `effective` - Names to install, usually [`Session::effective_selection()`](crate::Session::effective_selection).
/// - `observer` - Told after each package; can cancel between packages.
pub async fn install_selection<F, I, O>(
	fetcher: &F,
	config: &crate::Config,
	manifests: &mut ManifestIndex,
	records: &[PackageRecord],
	effective: &BTreeSet<String>,
	installer: &mut I,
	observer: &mut O,
) -> InstallSummary
where
	F: HttpFetch,
	I: PackageInstaller,
	O: ProgressObserver,
{
	let mut summary = InstallSummary::default();

	let mut installed: HashSet<String> = match installer.installed_packages().await {
		Ok(packages) => packages.into_iter().map(|p| p.to_lowercase()).collect(),
		Err(e) => {
			log::warn!("Failed to read installed packages, treating every package as new: {}", e);
			HashSet::new()
		}
	};

	let targets: Vec<&PackageRecord> = records.iter().filter(|r| effective.contains(&r.name)).collect();
	for name in effective.iter().filter(|n| !records.iter().any(|r| &r.name == *n)) {
		log::warn!("Skipping {}: not in the catalog.", name);
		summary.skipped += 1;
	}

	let total = targets.len();
	let mut forbidden = false;
	for (i, record) in targets.into_iter().enumerate() {
		if observer.is_cancelled() {
			log::warn!("Install cancelled after {} of {} packages.", i, total);
			summary.cancelled = true;
			break;
		}

		if forbidden && !manifests.is_attempted(&record.name) {
			log::info!("Skipping {}: manifest access forbidden earlier in this pass.", record.name);
			summary.skipped += 1;
			observer.progress(i + 1, total, &record.name);
			continue;
		}

		let identifier = match manifests.index_manifest(fetcher, config, record).await {
			Ok(meta) => meta.identifier.clone(),
			Err(ManifestError::Forbidden) => {
				log::error!("Manifest fetch for {} was forbidden, only already indexed packages will be installed.", record.name);
				forbidden = true;
				summary.skipped += 1;
				observer.progress(i + 1, total, &record.name);
				continue;
			},
			Err(e) => {
				log::info!("Skipping {}: {}", record.name, e);
				summary.skipped += 1;
				observer.progress(i + 1, total, &record.name);
				continue;
			}
		};

		let was_installed = installed.contains(&identifier.to_lowercase());
		log::info!("{} {}...", if was_installed { "Updating" } else { "Installing" }, identifier);

		let locator = SourceLocator::for_record(config, record, identifier);
		match installer.install_or_update(&locator).await {
			Ok(package) => {
				if was_installed {
					summary.updated += 1;
				} else {
					summary.installed += 1;
				}
				installed.insert(package.identifier.to_lowercase());
			},
			Err(e) => {
				log::error!("Failed to install {} from {}: {}", locator.identifier, locator.url, e);
				summary.failed += 1;
			},
		}

		observer.progress(i + 1, total, &record.name);
	}

	summary
}
