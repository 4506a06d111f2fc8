use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Result, TriageError};
use crate::github::gateway::{ApiGateway, ApiRequest};
use crate::github::types::{
    CommitEnvelope, Comparison, GraphqlEnvelope, ParentRepo, RawBranch, RepoNode, SearchData,
};
use crate::progress::Progress;
use crate::timefmt;
use crate::triage::cache::{merge_cached, PrCache, PrCacheStore};
use crate::triage::types::{Branch, Fork, PullRequest, Recency};

const SEARCH_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    pub ahead: u32,
    pub behind: u32,
}

pub struct ForkAnalyzer<G> {
    gateway: Arc<G>,
    cache: PrCacheStore,
    bypass_cache_reads: bool,
    progress: Progress,
}

impl<G: ApiGateway> ForkAnalyzer<G> {
    pub fn new(gateway: Arc<G>, cache: PrCacheStore) -> Self {
        Self {
            gateway,
            cache,
            bypass_cache_reads: false,
            progress: Progress::disabled(),
        }
    }

    /// Ignore cached PRs when reading; the cache is still refreshed.
    pub fn bypass_cache_reads(mut self, bypass: bool) -> Self {
        self.bypass_cache_reads = bypass;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Every remote step degrades on failure; only a malformed repository
    /// name fails the whole fork.
    pub async fn analyze(&self, repo: &RepoNode) -> Result<Fork> {
        let owner = owner_of(&repo.full_name)?;
        let mut fork = Fork::from_repo(repo);
        let default_branch = repo.default_branch_name();

        if let (Some(parent), Some(branch)) = (&repo.parent, default_branch) {
            self.progress.action(&repo.name, "comparing with upstream");
            match self.divergence(owner, branch, parent).await {
                Ok(d) => {
                    fork.ahead = Some(d.ahead);
                    fork.behind = Some(d.behind);
                }
                Err(e) => step_failed(repo, "compare", &e),
            }
        }

        self.progress.action(&repo.name, "checking commit dates");
        if let Some(branch) = default_branch {
            fork.fork_last_commit = self
                .last_commit(&repo.full_name, branch)
                .await
                .map_err(|e| step_failed(repo, "fork last commit", &e))
                .ok()
                .flatten();
        }
        if let Some(parent) = &repo.parent {
            if let Some(branch) = parent.default_branch_name() {
                fork.upstream_last_commit = self
                    .last_commit(&parent.full_name, branch)
                    .await
                    .map_err(|e| step_failed(repo, "upstream last commit", &e))
                    .ok()
                    .flatten();
            }
        }

        self.progress.action(&repo.name, "fetching branches");
        match self
            .branches(&repo.full_name, &fork.default_branch, fork.fork_last_commit.as_ref())
            .await
        {
            Ok(branches) => fork.branches = branches,
            Err(e) => step_failed(repo, "branches", &e),
        }

        if let Some(parent) = &repo.parent {
            self.progress.action(&repo.name, "fetching PRs");
            match self.pull_requests(owner, &parent.full_name).await {
                Ok(prs) => link_pull_requests(&mut fork.branches, &prs),
                Err(e) => step_failed(repo, "pull requests", &e),
            }
        }

        fork.classify();
        Ok(fork)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.gateway.call(&request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn divergence(
        &self,
        fork_owner: &str,
        fork_branch: &str,
        parent: &ParentRepo,
    ) -> Result<Divergence> {
        let parent_owner = owner_of(&parent.full_name)?;
        let parent_branch = parent.default_branch_name().unwrap_or(fork_branch);
        let endpoint = format!(
            "repos/{}/compare/{parent_owner}:{parent_branch}...{fork_owner}:{fork_branch}",
            parent.full_name
        );
        let c: Comparison = self.fetch(ApiRequest::rest(endpoint)).await?;
        Ok(Divergence {
            ahead: c.ahead_by,
            behind: c.behind_by,
        })
    }

    /// Date of the newest commit on `branch`; `None` for an empty branch.
    pub async fn last_commit(&self, repo: &str, branch: &str) -> Result<Option<Recency>> {
        let endpoint = format!("repos/{repo}/commits?sha={branch}&per_page=1");
        let commits: Vec<CommitEnvelope> = self.fetch(ApiRequest::rest(endpoint)).await?;
        Ok(commits
            .first()
            .and_then(CommitEnvelope::committer_date)
            .and_then(timefmt::recency))
    }

    /// Non-default branch heads are looked up one by one; the default branch
    /// reuses `default_commit` instead.
    pub async fn branches(
        &self,
        repo: &str,
        default_branch: &str,
        default_commit: Option<&Recency>,
    ) -> Result<Vec<Branch>> {
        let endpoint = format!("repos/{repo}/branches?per_page=100");
        let raw: Vec<RawBranch> = self.fetch(ApiRequest::rest(endpoint)).await?;

        let mut branches = Vec::with_capacity(raw.len());
        for b in raw {
            let is_default = b.name == default_branch;
            let commit = if is_default {
                default_commit.cloned()
            } else {
                match self.branch_commit(repo, &b.commit.sha).await {
                    Ok(commit) => commit,
                    Err(e) => {
                        tracing::debug!(repo, branch = %b.name, error = %e, "no branch date");
                        None
                    }
                }
            };
            branches.push(Branch {
                name: b.name,
                commit,
                is_default,
                pr: None,
            });
        }
        Ok(branches)
    }

    async fn branch_commit(&self, repo: &str, sha: &str) -> Result<Option<Recency>> {
        let endpoint = format!("repos/{repo}/commits/{sha}");
        let commit: CommitEnvelope = self.fetch(ApiRequest::rest(endpoint)).await?;
        Ok(commit.committer_date().and_then(timefmt::recency))
    }

    pub async fn pull_requests(
        &self,
        fork_owner: &str,
        upstream: &str,
    ) -> Result<Vec<PullRequest>> {
        let cache = if self.bypass_cache_reads {
            PrCache::default()
        } else {
            self.cache.load(upstream)
        };

        let live = match self.search_pull_requests(fork_owner, upstream).await {
            Ok(live) => live,
            Err(e) if !cache.is_empty() => {
                tracing::debug!(upstream, error = %e, "pr search failed, using cached PRs");
                return Ok(cache.pull_requests());
            }
            Err(e) => return Err(e),
        };

        let merged = merge_cached(live, &cache);
        if let Err(e) = self.cache.persist(upstream, &merged) {
            tracing::debug!(upstream, error = %e, "pr cache not saved");
        }
        Ok(merged)
    }

    async fn search_pull_requests(
        &self,
        fork_owner: &str,
        upstream: &str,
    ) -> Result<Vec<PullRequest>> {
        let query = format!(
            "query {{
  search(
    query: \"is:pr repo:{upstream} author:{fork_owner}\"
    type: ISSUE
    first: {SEARCH_PAGE_SIZE}
  ) {{
    nodes {{
      ... on PullRequest {{
        number
        title
        state
        url
        headRefName
      }}
    }}
  }}
}}"
        );
        let envelope: GraphqlEnvelope<SearchData> = self.fetch(ApiRequest::graphql(query)).await?;
        if let Some(err) = envelope.errors.first() {
            return Err(TriageError::GitHub(err.message.clone()));
        }
        let data = envelope
            .data
            .ok_or_else(|| TriageError::GitHub("pr search returned no data".to_string()))?;
        Ok(data
            .search
            .nodes
            .into_iter()
            .filter_map(|n| n.into_pull_request())
            .collect())
    }
}

/// Attach at most one PR per branch, preferring open, then merged, then closed.
pub fn link_pull_requests(branches: &mut [Branch], prs: &[PullRequest]) {
    let mut best: HashMap<&str, &PullRequest> = HashMap::new();
    for pr in prs {
        best.entry(pr.branch.as_str())
            .and_modify(|current| {
                if pr.state.link_priority() < current.state.link_priority() {
                    *current = pr;
                }
            })
            .or_insert(pr);
    }

    for branch in branches.iter_mut() {
        if let Some(pr) = best.get(branch.name.as_str()) {
            branch.pr = Some((*pr).clone());
        }
    }
}

fn owner_of(full_name: &str) -> Result<&str> {
    match full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok(owner),
        _ => Err(TriageError::InvalidRepoName(full_name.to_string())),
    }
}

fn step_failed(repo: &RepoNode, step: &str, error: &TriageError) {
    tracing::debug!(repo = %repo.full_name, step, error = %error, "analysis step failed");
}
