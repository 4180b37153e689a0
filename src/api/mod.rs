//! Backend job-runner API.
//!
//! The controller talks to the backend only through [`JobApi`], so runs can be
//! driven against the real HTTP service or an in-memory fake.

#[cfg(test)]
pub(crate) mod fake;
mod http;

use crate::model::{Artifact, StatusResponse};
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};

pub(crate) use http::HttpJobApi;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait JobApi: Send + Sync + 'static {
    /// Start a run for `task` and return the backend-issued run id.
    async fn start(&self, task: &str) -> Result<String, ApiError>;

    async fn status(&self, run_id: &str) -> Result<StatusResponse, ApiError>;

    /// Fetch an artifact of a completed run into `dest_dir`, returning the written path.
    async fn download(
        &self,
        artifact: Artifact,
        run_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ApiError>;
}

/// Append `segments` to the path of `base`. Segments are percent-encoded.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // Cannot-be-a-base URLs are rejected when the config is built.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_to_base_path() {
        let base = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            endpoint(&base, &["api", "status", "abc"]).as_str(),
            "http://localhost:8000/api/status/abc"
        );

        let nested = Url::parse("https://runner.example/prefix/").unwrap();
        assert_eq!(
            endpoint(&nested, &["api", "start"]).as_str(),
            "https://runner.example/prefix/api/start"
        );
    }

    #[test]
    fn endpoint_encodes_run_ids() {
        let base = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            endpoint(&base, &["api", "status", "a/b c"]).as_str(),
            "http://localhost:8000/api/status/a%2Fb%20c"
        );
    }
}
