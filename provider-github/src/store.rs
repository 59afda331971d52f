//! GitHub contents API snapshot store
//!
//! Implements `RemoteSnapshotStore` for a single file in a GitHub repository.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::snapshot::{
    self, RemoteCoordinates, RemoteSnapshot, RemoteSnapshotStore, RemoteStoreError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GitHubError, Result};
use crate::types::{ApiErrorBody, ContentsFile, UpdateContentsRequest, UpdateContentsResponse};

/// Public GitHub REST endpoint
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "tunesync";
const DEFAULT_COMMIT_MESSAGE: &str = "Update tunesync snapshot";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

/// Snapshot store backed by the GitHub repository contents API.
///
/// The fetched blob SHA is the version token. Uploads pass it back as the
/// `sha` precondition, so a concurrent write from another device surfaces as
/// [`RemoteStoreError::VersionConflict`] instead of being overwritten.
///
/// # Example
///
/// ```ignore
/// use provider_github::GitHubSnapshotStore;
/// use bridge_traits::{RemoteCoordinates, RemoteSnapshotStore};
///
/// let store = GitHubSnapshotStore::new(http_client);
/// let coordinates = RemoteCoordinates::new("octocat", "music");
/// let snapshot = store.fetch(&token, &coordinates).await?;
/// ```
pub struct GitHubSnapshotStore {
    http_client: Arc<dyn HttpClient>,
    api_base: String,
    commit_message: String,
}

impl GitHubSnapshotStore {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            api_base: DEFAULT_API_BASE.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    /// Point at a GitHub Enterprise or test endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn contents_url(&self, coordinates: &RemoteCoordinates) -> String {
        let path = coordinates
            .path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            urlencoding::encode(&coordinates.owner),
            urlencoding::encode(&coordinates.repo),
            path
        )
    }

    fn request(&self, method: HttpMethod, url: impl Into<String>, credential: &str) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(credential)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
    }

    /// Execute with exponential backoff on rate limiting, server errors
    /// and transport failures. Other statuses are returned as-is.
    #[instrument(skip_all, fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.http_client.execute(request.clone()).await {
                Ok(response) => {
                    let status = response.status;
                    let retryable = status == 429 || response.is_server_error();
                    if !retryable || attempt >= MAX_ATTEMPTS {
                        debug!(status, attempt, "GitHub request finished");
                        return Ok(response);
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        status,
                        attempt, backoff_ms, "GitHub request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        warn!(error = %e, attempt, "GitHub request failed, giving up");
                        return Err(e.into());
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(error = %e, attempt, backoff_ms, "GitHub request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn get_file(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
    ) -> Result<RemoteSnapshot> {
        let mut request = self.request(HttpMethod::Get, self.contents_url(coordinates), credential);
        if let Some(branch) = &coordinates.branch {
            request = request.query("ref", &urlencoding::encode(branch));
        }

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(status_error(&response, &coordinates.path));
        }

        let file: ContentsFile = serde_json::from_slice(&response.body)
            .map_err(|e| GitHubError::ParseError(format!("not a file entry: {}", e)))?;
        if file.kind != "file" {
            return Err(GitHubError::ParseError(format!(
                "{} is a {}, not a file",
                file.path, file.kind
            )));
        }

        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            _ if file.size == 0 => String::new(),
            (Some("base64"), Some(encoded)) if !encoded.is_empty() => decode_content(encoded)?,
            _ => match &file.download_url {
                Some(url) => {
                    debug!(size = file.size, "Content not inlined, downloading raw file");
                    self.download_raw(credential, url).await?
                }
                None => {
                    return Err(GitHubError::ParseError(
                        "content neither inlined nor downloadable".to_string(),
                    ))
                }
            },
        };

        info!(sha = %file.sha, bytes = content.len(), "Fetched snapshot from GitHub");
        Ok(RemoteSnapshot {
            content,
            version_token: file.sha,
        })
    }

    async fn download_raw(&self, credential: &str, url: &str) -> Result<String> {
        let request = self
            .request(HttpMethod::Get, url, credential)
            .header("Accept", "application/vnd.github.raw");
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(status_error(&response, url));
        }
        String::from_utf8(response.body.to_vec())
            .map_err(|e| GitHubError::DecodeError(e.to_string()))
    }

    async fn put_file(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
        content: &str,
        expected_version: Option<&str>,
    ) -> Result<String> {
        let body = UpdateContentsRequest {
            message: &self.commit_message,
            content: STANDARD.encode(content),
            sha: expected_version,
            branch: coordinates.branch.as_deref(),
        };
        let request = self
            .request(HttpMethod::Put, self.contents_url(coordinates), credential)
            .json(&body)?;

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(status_error(&response, &coordinates.path));
        }

        let updated: UpdateContentsResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GitHubError::ParseError(e.to_string()))?;
        info!(sha = %updated.content.sha, "Uploaded snapshot to GitHub");
        Ok(updated.content.sha)
    }
}

/// Strip the line wrapping GitHub adds, then decode.
fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GitHubError::DecodeError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GitHubError::DecodeError(e.to_string()))
}

fn status_error(response: &HttpResponse, path: &str) -> GitHubError {
    let message = serde_json::from_slice::<ApiErrorBody>(&response.body)
        .map(|body| body.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());

    match response.status {
        401 => GitHubError::Unauthorized(message),
        404 => GitHubError::NotFound {
            path: path.to_string(),
        },
        409 | 422 => GitHubError::Conflict {
            status_code: response.status,
            message,
        },
        status_code => GitHubError::ApiError {
            status_code,
            message,
        },
    }
}

#[async_trait]
impl RemoteSnapshotStore for GitHubSnapshotStore {
    #[instrument(skip(self, credential), fields(remote = %coordinates))]
    async fn fetch(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
    ) -> snapshot::Result<RemoteSnapshot> {
        Ok(self.get_file(credential, coordinates).await?)
    }

    #[instrument(skip(self, credential, content), fields(remote = %coordinates))]
    async fn upload(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
        content: &str,
        expected_version: Option<&str>,
    ) -> snapshot::Result<String> {
        self.put_file(credential, coordinates, content, expected_version)
            .await
            .map_err(|e| match e {
                GitHubError::Conflict { .. } => RemoteStoreError::VersionConflict {
                    expected: expected_version.map(str::to_string),
                },
                other => other.into(),
            })
    }
}
