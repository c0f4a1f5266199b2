pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod http;
pub use http::HttpFetch;
pub use http::ReqwestFetcher;

pub mod catalog;
pub use catalog::PackageRecord;

pub mod metadb;
pub use metadb::ManifestIndex;
pub use metadb::PackageMeta;

pub mod relationship_resolver;
pub mod selection;
pub use selection::Selection;

pub mod progress;
pub mod installation;

pub mod session;
pub use session::Session;
