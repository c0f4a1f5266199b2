//! Text fetches used by the catalog and manifest lookups.
//!
//! The rest of the crate only talks to [`HttpFetch`], so tests can script responses
//! without a network.

use std::collections::HashMap;

use thiserror::Error;

/// A completed request. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
	pub status: u16,
	pub headers: HashMap<String, String>,
	pub body: String,
}

impl FetchResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// The request never produced a status code.
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("transport error: {0}")]
	Transport(String),
}

/// Retrieves a text document from a URL.
///
/// Implementations must bound each request with a timeout. Non-success statuses are
/// returned as responses, only transport failures are errors.
#[allow(async_fn_in_trait)]
pub trait HttpFetch {
	async fn fetch_text(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// [`HttpFetch`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
	client: reqwest::Client,
}

impl ReqwestFetcher {
	pub fn new(config: &crate::Config) -> crate::Result<Self> {
		let client = reqwest::Client::builder()
			.https_only(config.https_only())
			.timeout(config.timeout())
			.user_agent(config.user_agent())
			.build()?;
		Ok(Self { client })
	}
}

impl HttpFetch for ReqwestFetcher {
	async fn fetch_text(&self, url: &str) -> Result<FetchResponse, FetchError> {
		log::trace!("GET {}", url);
		let response = self.client.get(url).send().await?;

		let status = response.status().as_u16();
		let headers = response.headers()
			.iter()
			.filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_ascii_lowercase(), v.to_string())))
			.collect();
		let body = response.text().await?;

		log::trace!("GET {} -> {} ({} bytes)", url, status, body.len());
		Ok(FetchResponse { status, headers, body })
	}
}
