//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("catalog error: {0}")]
	Catalog(#[from] crate::catalog::CatalogError),
	#[error("install error: {0}")]
	Install(#[from] crate::installation::InstallError),
	/// The remote service refused further requests, usually a spent API quota.
	#[error("rate limit exceeded, try again later")]
	RateLimited,
	#[error("operation cancelled")]
	Cancelled,
}
