use super::{endpoint, ApiError, JobApi};
use crate::model::{Artifact, RunConfig, StartRequest, StartResponse, StatusResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, Url};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// reqwest-backed client for the job-runner HTTP API.
pub(crate) struct HttpJobApi {
    client: Client,
    base_url: Url,
}

impl HttpJobApi {
    pub fn new(cfg: &RunConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }
}

/// Turn transport failures and non-2xx statuses into [`ApiError`]s.
fn check(url: &Url, res: reqwest::Result<Response>) -> Result<Response, ApiError> {
    let res = res.map_err(|source| ApiError::Request {
        url: url.to_string(),
        source,
    })?;
    let status = res.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(res)
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn start(&self, task: &str) -> Result<String, ApiError> {
        let url = self.url(&["api", "start"]);
        let res = check(
            &url,
            self.client
                .post(url.clone())
                .json(&StartRequest { task })
                .send()
                .await,
        )?;
        let body: StartResponse = res.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok(body.run_id)
    }

    async fn status(&self, run_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.url(&["api", "status", run_id]);
        let res = check(&url, self.client.get(url.clone()).send().await)?;
        res.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn download(
        &self,
        artifact: Artifact,
        run_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        let url = self.url(&["api", artifact.endpoint(), run_id]);
        let res = check(&url, self.client.get(url.clone()).send().await)?;

        let name = artifact.file_name(run_id);
        let path = dest_dir.join(&name);
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| ApiError::Io {
                path: dest_dir.to_path_buf(),
                source,
            })?;

        // Stream into a sibling temp file so a broken transfer never lands at `path`.
        let part = dest_dir.join(format!(".{name}.part"));
        let written = match write_body(&url, res, &part).await {
            Ok(()) => tokio::fs::rename(&part, &path)
                .await
                .map_err(|source| ApiError::Io {
                    path: path.clone(),
                    source,
                }),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        tracing::info!(artifact = ?artifact, path = %path.display(), "artifact downloaded");
        Ok(path)
    }
}

async fn write_body(url: &Url, res: Response, dest: &Path) -> Result<(), ApiError> {
    let io_err = |source| ApiError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
    let mut stream = res.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|source| ApiError::Request {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;
    Ok(())
}
