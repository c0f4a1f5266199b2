//! Installs git packages by editing a Unity project's `Packages/manifest.json`.
//!
//! The editor resolves the manifest the next time it gains focus. Git dependencies are
//! pinned to a commit in `Packages/packages-lock.json`, so the package's lock entry is
//! dropped on every install to make the editor fetch the branch head again.

use std::path::{Path, PathBuf};

use super::{InstallError, InstalledPackage, PackageInstaller, SourceLocator};

#[derive(Debug, Clone)]
pub struct ProjectManifestInstaller {
	project_dir: PathBuf,
}

impl ProjectManifestInstaller {
	/// # Errors
	/// - [`InstallError::ProjectMissing`] when `project_dir` has no `Packages/manifest.json`.
	pub fn new(project_dir: impl AsRef<Path>) -> Result<Self, InstallError> {
		let installer = Self { project_dir: project_dir.as_ref().to_path_buf() };
		if !installer.manifest_path().is_file() {
			return Err(InstallError::ProjectMissing(installer.manifest_path()));
		}
		Ok(installer)
	}

	pub fn project_dir(&self) -> &Path {
		&self.project_dir
	}

	pub fn manifest_path(&self) -> PathBuf {
		self.project_dir.join("Packages").join("manifest.json")
	}

	pub fn lock_path(&self) -> PathBuf {
		self.project_dir.join("Packages").join("packages-lock.json")
	}

	async fn read_json_object(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>, InstallError> {
		let text = tokio::fs::read_to_string(path).await?;
		match serde_json::from_str::<serde_json::Value>(&text)? {
			serde_json::Value::Object(obj) => Ok(obj),
			_ => Err(InstallError::Parse(format!("{} is not a JSON object", path.display()))),
		}
	}

	async fn write_json_object(path: &Path, obj: serde_json::Map<String, serde_json::Value>) -> Result<(), InstallError> {
		let mut text = serde_json::to_string_pretty(&serde_json::Value::Object(obj))?;
		text.push('\n');
		tokio::fs::write(path, text).await?;
		Ok(())
	}

	/// Removes `identifier` from the lock file, if there is one.
	async fn unlock(&self, identifier: &str) -> Result<(), InstallError> {
		let path = self.lock_path();
		if !path.is_file() {
			return Ok(());
		}

		let mut lock = Self::read_json_object(&path).await?;
		let removed = lock.get_mut("dependencies")
			.and_then(|d| d.as_object_mut())
			.and_then(|d| d.remove(identifier))
			.is_some();

		if removed {
			log::debug!("Dropped {} from {}", identifier, path.display());
			Self::write_json_object(&path, lock).await?;
		}
		Ok(())
	}
}

impl PackageInstaller for ProjectManifestInstaller {
	async fn installed_packages(&self) -> Result<Vec<String>, InstallError> {
		let manifest = Self::read_json_object(&self.manifest_path()).await?;
		Ok(manifest.get("dependencies")
			.and_then(|d| d.as_object())
			.map(|d| d.keys().cloned().collect())
			.unwrap_or_default())
	}

	async fn install_or_update(&mut self, locator: &SourceLocator) -> Result<InstalledPackage, InstallError> {
		let path = self.manifest_path();
		let mut manifest = Self::read_json_object(&path).await?;

		let dependencies = manifest.entry("dependencies")
			.or_insert_with(|| serde_json::Value::Object(Default::default()))
			.as_object_mut()
			.ok_or_else(|| InstallError::Parse("'dependencies' is not an object".to_string()))?;

		/* Replace an entry differing only in case instead of adding a second one */
		let existing = dependencies.keys()
			.find(|k| k.eq_ignore_ascii_case(&locator.identifier))
			.cloned();
		let identifier = existing.unwrap_or_else(|| locator.identifier.clone());
		dependencies.insert(identifier.clone(), serde_json::Value::String(locator.url.clone()));

		Self::write_json_object(&path, manifest).await?;
		self.unlock(&identifier).await?;

		log::info!("Wrote {} = {} to {}", identifier, locator.url, path.display());
		Ok(InstalledPackage { identifier, source: locator.url.clone() })
	}
}
