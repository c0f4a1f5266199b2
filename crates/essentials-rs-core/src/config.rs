//! Persistent settings for the package manager.
//!
//! Stored as JSON in the user's config directory. Every field has a default so a
//! partially written file still loads.

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// User whose repositories make up the catalog.
	catalog_owner: String,
	api_base: String,
	raw_base: String,
	git_base: String,
	/// Only repositories with this name prefix are considered packages.
	repository_prefix: String,
	/// Every package identifier must start with this, compared ignoring ASCII case.
	package_prefix: String,
	/// Dependencies inside this namespace are followed by the resolver.
	dependency_namespace: String,
	per_page: u32,
	/// Pages are requested while `page < page_limit`.
	page_limit: u32,
	timeout_secs: u64,
	user_agent: String,
	https_only: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			catalog_owner: "CanTalat-Yakan".to_string(),
			api_base: "https://api.github.com".to_string(),
			raw_base: "https://raw.githubusercontent.com".to_string(),
			git_base: "https://github.com".to_string(),
			repository_prefix: "Unity.".to_string(),
			package_prefix: "com.".to_string(),
			dependency_namespace: "com.unityessentials.".to_string(),
			per_page: 100,
			page_limit: 20,
			timeout_secs: 30,
			user_agent: "UnityEssentialsPackageInstaller".to_string(),
			https_only: true,
		}
	}
}

impl Config {
	/// Directory holding `config.json`.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when neither the platform variable nor `HOME` is set.
	pub fn config_dir() -> crate::Result<std::path::PathBuf> {
		#[cfg(target_os = "windows")]
		let path = std::path::PathBuf::from(
			std::env::var("APPDATA").map_err(|_| crate::Error::Parse("APPDATA missing.".to_string()))?
		);

		#[cfg(not(target_os = "windows"))]
		let path = if let Ok(e) = std::env::var("XDG_CONFIG_HOME") {
			std::path::PathBuf::from(e)
		} else {
			std::path::PathBuf::from(
				std::env::var("HOME").map_err(|_| crate::Error::Parse("HOME environment variable not set.".to_string()))?
			).join(".config")
		};

		Ok(path.join("essentials-rs"))
	}

	/// Loads the config from the default location.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file is missing or unreadable.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is not a valid config.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_file(Self::config_dir()?.join("config.json"))
	}

	pub fn load_from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Writes the config to the default location, creating the directory if needed.
	pub fn save_to_disk(&self) -> crate::Result<()> {
		self.save_to_file(Self::config_dir()?.join("config.json"))
	}

	pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
		let path = path.as_ref();
		std::fs::create_dir_all(path.with_file_name(""))?;
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	/* Fields */

	pub fn catalog_owner(&self) -> &str {
		&self.catalog_owner
	}
	pub fn set_catalog_owner(&mut self, owner: impl Into<String>) {
		self.catalog_owner = owner.into();
	}

	pub fn api_base(&self) -> &str {
		&self.api_base
	}
	pub fn set_api_base(&mut self, url: impl Into<String>) {
		self.api_base = url.into();
	}

	pub fn raw_base(&self) -> &str {
		&self.raw_base
	}
	pub fn set_raw_base(&mut self, url: impl Into<String>) {
		self.raw_base = url.into();
	}

	pub fn git_base(&self) -> &str {
		&self.git_base
	}
	pub fn set_git_base(&mut self, url: impl Into<String>) {
		self.git_base = url.into();
	}

	pub fn repository_prefix(&self) -> &str {
		&self.repository_prefix
	}
	pub fn set_repository_prefix(&mut self, prefix: impl Into<String>) {
		self.repository_prefix = prefix.into();
	}

	pub fn package_prefix(&self) -> &str {
		&self.package_prefix
	}
	pub fn set_package_prefix(&mut self, prefix: impl Into<String>) {
		self.package_prefix = prefix.into();
	}

	pub fn dependency_namespace(&self) -> &str {
		&self.dependency_namespace
	}
	pub fn set_dependency_namespace(&mut self, namespace: impl Into<String>) {
		self.dependency_namespace = namespace.into();
	}

	pub fn per_page(&self) -> u32 {
		self.per_page
	}
	pub fn set_per_page(&mut self, per_page: u32) {
		self.per_page = per_page;
	}

	pub fn page_limit(&self) -> u32 {
		self.page_limit
	}
	pub fn set_page_limit(&mut self, page_limit: u32) {
		self.page_limit = page_limit;
	}

	pub fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout_secs)
	}
	pub fn set_timeout_secs(&mut self, secs: u64) {
		self.timeout_secs = secs;
	}

	pub fn user_agent(&self) -> &str {
		&self.user_agent
	}

	pub fn https_only(&self) -> bool {
		self.https_only
	}
	pub fn set_https_only(&mut self, https_only: bool) {
		self.https_only = https_only;
	}
}

/// ASCII case-insensitive `starts_with`.
pub(crate) fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
	s.len() >= prefix.len()
		&& s.is_char_boundary(prefix.len())
		&& s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_file_keeps_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		std::fs::write(&path, r#"{ "catalog_owner": "someone-else", "per_page": 50 }"#).unwrap();

		let config = Config::load_from_file(&path).expect("failed to load config");
		assert_eq!(config.catalog_owner(), "someone-else");
		assert_eq!(config.per_page(), 50);
		assert_eq!(config.dependency_namespace(), "com.unityessentials.");
		assert_eq!(config.page_limit(), 20);
	}

	#[test]
	fn save_then_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.json");
		let mut config = Config::default();
		config.set_https_only(false);
		config.set_repository_prefix("Tool.");
		config.save_to_file(&path).expect("failed to save config");

		assert_eq!(Config::load_from_file(&path).unwrap(), config);
	}

	#[test]
	fn prefix_ignores_case() {
		assert!(starts_with_ignore_case("COM.UnityEssentials.Core", "com.unityessentials."));
		assert!(!starts_with_ignore_case("org.other", "com."));
		assert!(!starts_with_ignore_case("co", "com."));
		assert!(!starts_with_ignore_case("cé.x", "com"));
	}
}
