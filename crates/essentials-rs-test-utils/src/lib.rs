//! Various helpers for testing
//!
//! functions in this crate return results instead of panicking where they touch the
//! filesystem, so failures show up at the call site in the test.

use std::collections::HashMap;
use std::sync::Mutex;

use essentials_rs_core::catalog::PackageRecord;
use essentials_rs_core::http::{FetchError, FetchResponse, HttpFetch};
use essentials_rs_core::Config;

#[derive(Debug, Clone)]
enum Scripted {
	Response(FetchResponse),
	TransportError(String),
}

/// [`HttpFetch`] answering from a fixed URL table.
///
/// Unknown URLs answer 404 with an empty body. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
	responses: HashMap<String, Scripted>,
	calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn respond(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
		self.responses.insert(url.into(), Scripted::Response(FetchResponse { status, headers: HashMap::new(), body: body.into() }));
		self
	}

	pub fn ok(self, url: impl Into<String>, body: impl Into<String>) -> Self {
		self.respond(url, 200, body)
	}

	/// A 403 carrying an exhausted rate limit header.
	pub fn rate_limited(mut self, url: impl Into<String>) -> Self {
		let headers = HashMap::from([("x-ratelimit-remaining".to_string(), "0".to_string())]);
		self.responses.insert(url.into(), Scripted::Response(FetchResponse { status: 403, headers, body: "{\"message\": \"API rate limit exceeded\"}".to_string() }));
		self
	}

	pub fn transport_error(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
		self.responses.insert(url.into(), Scripted::TransportError(message.into()));
		self
	}

	/// Serves `record`'s manifest declaring `identifier` and `dependencies`.
	pub fn package(self, config: &Config, record: &PackageRecord, identifier: &str, dependencies: &[&str]) -> Self {
		let url = record.manifest_url(config);
		self.ok(url, package_json(identifier, dependencies))
	}

	/// Serves catalog pages for `owner`, page numbers starting at 1.
	pub fn catalog(mut self, config: &Config, owner: &str, pages: &[&[PackageRecord]]) -> Self {
		for (i, records) in pages.iter().enumerate() {
			self = self.ok(catalog_page_url(config, owner, i as u32 + 1), catalog_page(records));
		}
		self
	}

	/// Every URL requested so far, in order.
	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().map(|c| c.clone()).unwrap_or_default()
	}

	pub fn call_count(&self, url: &str) -> usize {
		self.calls().iter().filter(|c| c.as_str() == url).count()
	}
}

impl HttpFetch for ScriptedFetcher {
	async fn fetch_text(&self, url: &str) -> Result<FetchResponse, FetchError> {
		if let Ok(mut calls) = self.calls.lock() {
			calls.push(url.to_string());
		}

		match self.responses.get(url) {
			Some(Scripted::Response(r)) => Ok(r.clone()),
			Some(Scripted::TransportError(e)) => Err(FetchError::Transport(e.clone())),
			None => Ok(FetchResponse { status: 404, headers: HashMap::new(), body: String::new() }),
		}
	}
}

pub fn catalog_page_url(config: &Config, owner: &str, page: u32) -> String {
	format!("{}/users/{}/repos?per_page={}&page={}", config.api_base().trim_end_matches('/'), owner, config.per_page(), page)
}

/// A catalog page in the service's JSON shape.
pub fn catalog_page(records: &[PackageRecord]) -> String {
	let repos: Vec<serde_json::Value> = records.iter()
		.map(|r| serde_json::json!({
			"name": r.name,
			"default_branch": r.default_branch,
			"owner": { "login": r.owner_login },
			"private": false,
		}))
		.collect();
	serde_json::Value::Array(repos).to_string()
}

/// A `package.json` declaring `identifier` and depending on each of `dependencies`.
pub fn package_json(identifier: &str, dependencies: &[&str]) -> String {
	let deps: serde_json::Map<String, serde_json::Value> = dependencies.iter()
		.map(|d| (d.to_string(), serde_json::Value::String("1.0.0".to_string())))
		.collect();
	serde_json::json!({
		"name": identifier,
		"version": "1.0.0",
		"displayName": identifier,
		"dependencies": deps,
	}).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
}

/// A throwaway Unity project with a `Packages/manifest.json`.
pub struct ProjectFixture {
	dir: tempfile::TempDir,
}

impl ProjectFixture {
	/// A project whose manifest already depends on each of `installed` (identifier, source).
	pub fn new(installed: &[(&str, &str)]) -> Result<Self, FixtureError> {
		let dir = tempfile::tempdir()?;
		std::fs::create_dir_all(dir.path().join("Packages"))?;

		let deps: serde_json::Map<String, serde_json::Value> = installed.iter()
			.map(|(id, source)| (id.to_string(), serde_json::Value::String(source.to_string())))
			.collect();
		let manifest = serde_json::json!({ "dependencies": deps });
		std::fs::write(dir.path().join("Packages").join("manifest.json"), serde_json::to_string_pretty(&manifest)?)?;

		Ok(Self { dir })
	}

	pub fn path(&self) -> &std::path::Path {
		self.dir.path()
	}

	pub fn manifest(&self) -> Result<serde_json::Value, FixtureError> {
		let text = std::fs::read_to_string(self.path().join("Packages").join("manifest.json"))?;
		Ok(serde_json::from_str(&text)?)
	}

	/// Dependency identifier and source pairs from the manifest.
	pub fn dependencies(&self) -> Result<Vec<(String, String)>, FixtureError> {
		let manifest = self.manifest()?;
		Ok(manifest.get("dependencies")
			.and_then(|d| d.as_object())
			.map(|d| d.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
			.unwrap_or_default())
	}
}
