use serde::Deserialize;

use crate::triage::types::{PrState, PullRequest};

#[derive(Clone, Debug, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRepo {
    pub name: String,
    #[serde(rename = "nameWithOwner")]
    pub full_name: String,
    pub default_branch_ref: Option<BranchRef>,
}

impl ParentRepo {
    pub fn default_branch_name(&self) -> Option<&str> {
        self.default_branch_ref.as_ref().map(|b| b.name.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoNode {
    pub name: String,
    #[serde(rename = "nameWithOwner")]
    pub full_name: String,
    pub url: String,
    pub default_branch_ref: Option<BranchRef>,
    pub parent: Option<ParentRepo>,
}

impl RepoNode {
    pub fn default_branch_name(&self) -> Option<&str> {
        self.default_branch_ref.as_ref().map(|b| b.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViewerData {
    pub viewer: Viewer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Viewer {
    pub repositories: Connection<RepoNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    pub search: Connection<SearchNode>,
}

/// Search results may include issues, which come back as empty objects.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchNode {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub state: Option<PrState>,
    pub url: Option<String>,
    pub head_ref_name: Option<String>,
}

impl SearchNode {
    pub fn into_pull_request(self) -> Option<PullRequest> {
        let number = self.number.filter(|n| *n != 0)?;
        Some(PullRequest {
            number,
            title: self.title.unwrap_or_default(),
            state: self.state?,
            url: self.url.unwrap_or_default(),
            branch: self.head_ref_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Comparison {
    pub ahead_by: u32,
    pub behind_by: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitEnvelope {
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
    pub committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Signature {
    pub date: Option<String>,
}

impl CommitEnvelope {
    pub fn committer_date(&self) -> Option<&str> {
        self.commit.committer.as_ref()?.date.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBranch {
    pub name: String,
    pub commit: RawBranchCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBranchCommit {
    pub sha: String,
}
