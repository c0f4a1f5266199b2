//! Reading a package's `package.json`.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::catalog::PackageRecord;
use crate::config::starts_with_ignore_case;
use crate::http::HttpFetch;

/// What a manifest declares about its package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMeta {
	pub identifier: String,
	/// Package identifiers this package depends on, limited to the package prefix.
	pub dependencies: BTreeSet<String>,
}

/// Why a repository has no usable metadata.
///
/// The display text is the skip reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
	#[error("Invalid repo metadata")]
	InvalidRepository,
	/// Usually a spent request quota, every further fetch in the pass will fail the same way.
	#[error("Access forbidden while fetching package.json (rate limit?)")]
	Forbidden,
	#[error("package.json missing or unreachable")]
	Unreachable,
	#[error("package.json has no 'name'")]
	MissingName,
	#[error("Failed to parse package.json: {0}")]
	Malformed(String),
	#[error("invalid package name '{identifier}' (must start with '{prefix}')")]
	InvalidIdentifier { identifier: String, prefix: String },
}

/// Parses manifest text.
///
/// Only `dependencies` keys starting with `package_prefix` and holding a string
/// value are kept, anything else in that block is ignored.
pub fn parse_manifest(json: &str, package_prefix: &str) -> Result<PackageMeta, ManifestError> {
	let value = serde_json::from_str::<serde_json::Value>(json).map_err(|e| ManifestError::Malformed(e.to_string()))?;
	let obj = value.as_object().ok_or_else(|| ManifestError::Malformed("expected a JSON object".to_string()))?;

	let identifier = match obj.get("name").and_then(|v| v.as_str()) {
		Some(name) if !name.is_empty() => name.to_string(),
		_ => return Err(ManifestError::MissingName),
	};

	if !starts_with_ignore_case(&identifier, package_prefix) {
		return Err(ManifestError::InvalidIdentifier { identifier, prefix: package_prefix.to_string() });
	}

	let dependencies = obj.get("dependencies")
		.and_then(|v| v.as_object())
		.map(|deps| {
			deps.iter()
				.filter(|(key, value)| value.is_string() && starts_with_ignore_case(key, package_prefix))
				.map(|(key, _)| key.clone())
				.collect()
		})
		.unwrap_or_default();

	Ok(PackageMeta { identifier, dependencies })
}

/// Fetches and parses the manifest of `record`.
///
/// Transport failures, non-success statuses and empty bodies all become
/// [`ManifestError::Unreachable`], except 403 which is [`ManifestError::Forbidden`].
pub async fn fetch_manifest<F: HttpFetch>(fetcher: &F, config: &crate::Config, record: &PackageRecord) -> Result<PackageMeta, ManifestError> {
	if !record.is_locatable() {
		return Err(ManifestError::InvalidRepository);
	}

	let url = record.manifest_url(config);
	let response = match fetcher.fetch_text(&url).await {
		Ok(r) => r,
		Err(e) => {
			log::debug!("Fetching {} failed: {}", url, e);
			return Err(ManifestError::Unreachable);
		}
	};

	if response.status == 403 {
		return Err(ManifestError::Forbidden);
	}

	if !response.is_success() || response.body.is_empty() {
		return Err(ManifestError::Unreachable);
	}

	parse_manifest(&response.body, config.package_prefix())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_prefixed_string_dependencies() {
		let meta = parse_manifest(r#"{
			"name": "com.unityessentials.ui",
			"version": "1.0.0",
			"dependencies": {
				"com.unityessentials.core": "1.0.0",
				"COM.UnityEssentials.Input": "https://github.com/x/y.git",
				"com.unity.textmeshpro": "3.0.6",
				"org.other.lib": "1.0.0",
				"com.broken": 3
			}
		}"#, "com.").expect("manifest should parse");

		assert_eq!(meta.identifier, "com.unityessentials.ui");
		let deps: Vec<_> = meta.dependencies.iter().map(String::as_str).collect();
		assert_eq!(deps, ["COM.UnityEssentials.Input", "com.unity.textmeshpro", "com.unityessentials.core"]);
	}

	#[test]
	fn no_dependency_block() {
		let meta = parse_manifest(r#"{"name": "com.unityessentials.core"}"#, "com.").unwrap();
		assert!(meta.dependencies.is_empty());
	}

	#[test]
	fn missing_and_malformed_are_distinct() {
		assert_eq!(parse_manifest(r#"{"version": "1.0.0"}"#, "com."), Err(ManifestError::MissingName));
		assert_eq!(parse_manifest(r#"{"name": ""}"#, "com."), Err(ManifestError::MissingName));
		assert_eq!(parse_manifest(r#"{"name": 12}"#, "com."), Err(ManifestError::MissingName));
		assert!(matches!(parse_manifest("{ not json", "com."), Err(ManifestError::Malformed(_))));
		assert!(matches!(parse_manifest("[1, 2]", "com."), Err(ManifestError::Malformed(_))));
	}

	#[test]
	fn identifier_needs_prefix() {
		let err = parse_manifest(r#"{"name": "unity-core"}"#, "com.").unwrap_err();
		assert_eq!(err.to_string(), "invalid package name 'unity-core' (must start with 'com.')");
	}

	#[test]
	fn prefix_check_ignores_case() {
		assert_eq!(parse_manifest(r#"{"name": "Com.Example.Tool"}"#, "com.").unwrap().identifier, "Com.Example.Tool");
	}
}
