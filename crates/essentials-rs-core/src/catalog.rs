//! Listing the repositories that make up the package catalog.

use serde::Deserialize;
use thiserror::Error;

use crate::http::{FetchError, HttpFetch};

/// One remote repository known to the session.
///
/// `name` is the identity used by selection and resolution, the other fields only
/// locate the manifest and the install source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRecord {
	pub name: String,
	pub default_branch: String,
	pub owner_login: String,
}

impl PackageRecord {
	pub fn new(name: impl Into<String>, default_branch: impl Into<String>, owner_login: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			default_branch: default_branch.into(),
			owner_login: owner_login.into(),
		}
	}

	/// Whether the record has enough information to locate a manifest.
	pub fn is_locatable(&self) -> bool {
		!self.name.is_empty() && !self.default_branch.is_empty()
	}

	pub fn manifest_url(&self, config: &crate::Config) -> String {
		format!("{}/{}/{}/{}/package.json", config.raw_base().trim_end_matches('/'), self.owner_login, self.name, self.default_branch)
	}

	/// Git locator understood by the package installer, pinned to the default branch.
	pub fn git_url(&self, config: &crate::Config) -> String {
		format!("{}/{}/{}.git#{}", config.git_base().trim_end_matches('/'), self.owner_login, self.name, self.default_branch)
	}
}

#[derive(Debug, Error)]
pub enum CatalogError {
	/// The catalog service reported an exhausted quota. Nothing fetched so far is usable.
	#[error("catalog rate limit exceeded, try again later")]
	RateLimited,
	#[error("failed to parse catalog response: {0}")]
	Parse(String),
	#[error("catalog request failed: {0}")]
	Fetch(#[from] FetchError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteOwner {
	login: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteRepository {
	name: Option<String>,
	default_branch: Option<String>,
	owner: Option<RemoteOwner>,
}

fn parse_page(body: &str) -> Result<Vec<RemoteRepository>, CatalogError> {
	serde_json::from_str::<Vec<RemoteRepository>>(body).map_err(|e| CatalogError::Parse(e.to_string()))
}

/// Fetches every repository of `owner` that carries the configured name prefix.
///
/// Pages are requested in order until an empty page, a non-success status or the
/// page ceiling. The result keeps catalog order; a repeated name keeps its first entry.
///
/// # Errors
/// - [`CatalogError::RateLimited`] on a 403 with an exhausted rate limit header.
/// - [`CatalogError::Parse`] when a page is not a JSON array of repositories.
/// - [`CatalogError::Fetch`] when a request fails before producing a status.
pub async fn list_repositories<F: HttpFetch>(fetcher: &F, config: &crate::Config, owner: &str) -> Result<Vec<PackageRecord>, CatalogError> {
	let mut records = Vec::<PackageRecord>::new();
	let mut seen = std::collections::HashSet::<String>::new();

	let mut page = 1;
	while page < config.page_limit() {
		let url = format!("{}/users/{}/repos?per_page={}&page={}", config.api_base().trim_end_matches('/'), owner, config.per_page(), page);
		let response = fetcher.fetch_text(&url).await?;

		if response.status == 403 && response.header("x-ratelimit-remaining") == Some("0") {
			log::error!("Catalog rate limit exceeded. Try again later.");
			return Err(CatalogError::RateLimited);
		}

		if !response.is_success() {
			log::debug!("Catalog page {} returned status {}, stopping.", page, response.status);
			break;
		}

		if response.body.trim().is_empty() {
			break;
		}

		let repositories = parse_page(&response.body)?;
		if repositories.is_empty() {
			break;
		}

		log::debug!("Catalog page {} listed {} repositories.", page, repositories.len());

		for repo in repositories {
			let name = match repo.name {
				Some(name) if !name.is_empty() => name,
				_ => continue,
			};
			if !name.starts_with(config.repository_prefix()) {
				continue;
			}
			if !seen.insert(name.clone()) {
				continue;
			}

			records.push(PackageRecord {
				name,
				default_branch: repo.default_branch.unwrap_or_default(),
				owner_login: repo.owner.and_then(|o| o.login).unwrap_or_default(),
			});
		}

		page += 1;
	}

	log::info!("Catalog for {} lists {} packages.", owner, records.len());
	Ok(records)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn urls_follow_record_location() {
		let config = crate::Config::default();
		let record = PackageRecord::new("Unity.Core", "main", "CanTalat-Yakan");
		assert_eq!(record.manifest_url(&config), "https://raw.githubusercontent.com/CanTalat-Yakan/Unity.Core/main/package.json");
		assert_eq!(record.git_url(&config), "https://github.com/CanTalat-Yakan/Unity.Core.git#main");
	}

	#[test]
	fn page_tolerates_missing_fields() {
		let page = parse_page(r#"[{"name": "Unity.A", "default_branch": "main", "owner": {"login": "me"}, "stars": 4}, {"name": null}, {}]"#).unwrap();
		assert_eq!(page.len(), 3);
		assert_eq!(page[0].owner.as_ref().and_then(|o| o.login.as_deref()), Some("me"));
		assert!(page[1].name.is_none());
	}

	#[test]
	fn page_rejects_object() {
		assert!(matches!(parse_page(r#"{"message": "Not Found"}"#), Err(CatalogError::Parse(_))));
	}

	#[test]
	fn unlocatable_records() {
		assert!(!PackageRecord::new("Unity.A", "", "me").is_locatable());
		assert!(!PackageRecord::new("", "main", "me").is_locatable());
		assert!(PackageRecord::new("Unity.A", "main", "").is_locatable());
	}
}
