use essentials_rs_core::metadb::{ManifestError, ManifestIndex, ManifestState};
use essentials_rs_core::{Config, PackageRecord};
use essentials_rs_test_utils::*;

#[tokio::test]
async fn attempted_manifests_are_never_refetched() {
	let config = Config::default();
	let good = PackageRecord::new("Unity.Core", "main", "owner");
	let missing = PackageRecord::new("Unity.Gone", "main", "owner");
	let fetcher = ScriptedFetcher::new()
		.package(&config, &good, "com.unityessentials.core", &["com.unityessentials.ui", "com.unity.ugui"]);

	let mut index = ManifestIndex::default();
	for _ in 0..3 {
		let meta = index.index_manifest(&fetcher, &config, &good).await.expect("manifest should index");
		assert_eq!(meta.identifier, "com.unityessentials.core");
		assert!(meta.dependencies.contains("com.unityessentials.ui"));

		let err = index.index_manifest(&fetcher, &config, &missing).await.expect_err("manifest should be missing");
		assert_eq!(err, ManifestError::Unreachable);
	}

	assert_eq!(fetcher.call_count(&good.manifest_url(&config)), 1);
	assert_eq!(fetcher.call_count(&missing.manifest_url(&config)), 1);
	assert_eq!(index.identifiers().repository_for("com.unityessentials.core"), Some("Unity.Core"));
}

#[tokio::test]
async fn forbidden_is_retried_later() {
	let config = Config::default();
	let record = PackageRecord::new("Unity.Core", "main", "owner");
	let url = record.manifest_url(&config);
	let fetcher = ScriptedFetcher::new().respond(url.as_str(), 403, "");

	let mut index = ManifestIndex::default();
	assert_eq!(index.index_manifest(&fetcher, &config, &record).await, Err(ManifestError::Forbidden));
	assert_eq!(index.state("Unity.Core"), ManifestState::NotAttempted);
	assert_eq!(index.index_manifest(&fetcher, &config, &record).await, Err(ManifestError::Forbidden));
	assert_eq!(fetcher.call_count(&url), 2);
}

#[tokio::test]
async fn rejected_manifests_keep_their_reason() {
	let config = Config::default();
	let foreign = PackageRecord::new("Unity.Foreign", "main", "owner");
	let broken = PackageRecord::new("Unity.Broken", "main", "owner");
	let nameless = PackageRecord::new("Unity.Nameless", "main", "owner");
	let fetcher = ScriptedFetcher::new()
		.package(&config, &foreign, "org.other.foreign", &[])
		.ok(broken.manifest_url(&config), "{ \"name\": ")
		.ok(nameless.manifest_url(&config), r#"{"version": "1.0.0"}"#);

	let mut index = ManifestIndex::default();
	for record in [&foreign, &broken, &nameless] {
		let _ = index.index_manifest(&fetcher, &config, record).await;
	}

	assert!(matches!(index.state("Unity.Foreign"), ManifestState::Unavailable(ManifestError::InvalidIdentifier { identifier, .. }) if identifier == "org.other.foreign"));
	assert!(matches!(index.state("Unity.Broken"), ManifestState::Unavailable(ManifestError::Malformed(_))));
	assert_eq!(index.state("Unity.Nameless"), ManifestState::Unavailable(&ManifestError::MissingName));
	assert!(index.identifiers().is_empty());
}

#[tokio::test]
async fn unlocatable_record_is_not_fetched() {
	let config = Config::default();
	let record = PackageRecord::new("Unity.Core", "", "owner");
	let fetcher = ScriptedFetcher::new();

	let mut index = ManifestIndex::default();
	assert_eq!(index.index_manifest(&fetcher, &config, &record).await, Err(ManifestError::InvalidRepository));
	assert!(fetcher.calls().is_empty());
	assert!(index.is_attempted("Unity.Core"));
}

#[tokio::test]
async fn transport_failure_is_cached_as_unreachable() {
	let config = Config::default();
	let record = PackageRecord::new("Unity.Core", "main", "owner");
	let url = record.manifest_url(&config);
	let fetcher = ScriptedFetcher::new().transport_error(url.as_str(), "connection reset");

	let mut index = ManifestIndex::default();
	for _ in 0..3 {
		assert_eq!(index.index_manifest(&fetcher, &config, &record).await, Err(ManifestError::Unreachable));
	}
	assert_eq!(index.state("Unity.Core"), ManifestState::Unavailable(&ManifestError::Unreachable));
	assert_eq!(fetcher.call_count(&url), 1);
}
