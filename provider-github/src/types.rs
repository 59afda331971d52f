//! GitHub API request and response types
//!
//! Only the fields the snapshot store reads are modeled.

use serde::{Deserialize, Serialize};

/// A file entry from `GET /repos/{owner}/{repo}/contents/{path}`.
///
/// See: https://docs.github.com/en/rest/repos/contents#get-repository-content
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsFile {
    /// `"file"`, `"dir"`, `"symlink"` or `"submodule"`
    #[serde(rename = "type")]
    pub kind: String,

    pub path: String,

    /// Blob SHA of this revision
    pub sha: String,

    #[serde(default)]
    pub size: u64,

    /// `"base64"`, or `"none"` when the file is too large to inline
    #[serde(default)]
    pub encoding: Option<String>,

    /// Base64 content wrapped at 60 columns
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub download_url: Option<String>,
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateContentsRequest<'a> {
    pub message: &'a str,

    /// Base64 of the new file content
    pub content: String,

    /// Blob SHA being replaced; required when the file exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContentsResponse {
    pub content: ContentRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRef {
    pub sha: String,
}

/// Error body GitHub returns with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}
