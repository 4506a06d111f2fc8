#![cfg(test)]

use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, TriageError};
use crate::github::gateway::{ApiGateway, ApiRequest};
use crate::github::types::{BranchRef, ParentRepo, RepoNode};
use crate::triage::category::Category;
use crate::triage::types::{Fork, PrState, PullRequest};

/// Canned API: REST routes match the endpoint exactly, GraphQL routes match
/// when the query contains the needle. Anything else fails.
#[derive(Default)]
pub struct FakeGateway {
    rest: Vec<(String, Value)>,
    graphql: Vec<(String, Value)>,
    failures: Vec<(String, String)>,
    latency: Option<Duration>,
    authenticated: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            authenticated: true,
            ..Self::default()
        }
    }

    pub fn rest(mut self, endpoint: &str, body: Value) -> Self {
        self.rest.push((endpoint.to_string(), body));
        self
    }

    pub fn graphql(mut self, needle: &str, body: Value) -> Self {
        self.graphql.push((needle.to_string(), body));
        self
    }

    /// Any request whose endpoint or query contains `needle` fails with `message`.
    pub fn fail(mut self, needle: &str, message: &str) -> Self {
        self.failures.push((needle.to_string(), message.to_string()));
        self
    }

    pub fn latency(mut self, delay: Duration) -> Self {
        self.latency = Some(delay);
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ApiGateway for FakeGateway {
    async fn call(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        if let Some(delay) = self.latency {
            tokio::time::sleep(delay).await;
        }
        let key = match request {
            ApiRequest::Rest { endpoint } => endpoint,
            ApiRequest::Graphql { query } => query,
        };
        let failure = self
            .failures
            .iter()
            .find(|(needle, _)| key.contains(needle.as_str()));
        if let Some((_, message)) = failure {
            self.calls.lock().unwrap().push(key.clone());
            return Err(TriageError::GitHub(message.clone()));
        }

        let found = match request {
            ApiRequest::Rest { endpoint } => {
                self.calls.lock().unwrap().push(endpoint.clone());
                self.rest.iter().find(|(e, _)| e == endpoint)
            }
            ApiRequest::Graphql { query } => {
                self.calls.lock().unwrap().push(query.clone());
                self.graphql.iter().find(|(n, _)| query.contains(n.as_str()))
            }
        };
        match found {
            Some((_, body)) => Ok(serde_json::to_vec(body)?),
            None => Err(TriageError::GitHub(format!("no route for {request}"))),
        }
    }

    async fn check_auth(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(TriageError::NotAuthenticated {
                profile: Some("test".to_string()),
            })
        }
    }
}

pub fn make_repo(owner: &str, name: &str, parent: Option<&str>) -> RepoNode {
    RepoNode {
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        url: format!("https://github.com/{owner}/{name}"),
        default_branch_ref: Some(BranchRef {
            name: "main".to_string(),
        }),
        parent: parent.map(|p| ParentRepo {
            name: p.rsplit('/').next().unwrap_or(p).to_string(),
            full_name: p.to_string(),
            default_branch_ref: Some(BranchRef {
                name: "main".to_string(),
            }),
        }),
    }
}

pub fn make_pr(number: u64, state: PrState, branch: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR {number}"),
        state,
        url: format!("https://github.com/acme/lib/pull/{number}"),
        branch: branch.to_string(),
    }
}

pub fn make_fork(name: &str, category: Category) -> Fork {
    let mut fork = Fork::from_repo(&make_repo("me", name, None));
    fork.category = category;
    fork
}

pub fn forks_response(nodes: Vec<Value>) -> Value {
    json!({ "data": { "viewer": { "repositories": { "nodes": nodes } } } })
}

pub fn search_response(nodes: Vec<Value>) -> Value {
    json!({ "data": { "search": { "nodes": nodes } } })
}

pub fn pr_node(number: u64, state: &str, branch: &str) -> Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "state": state,
        "url": format!("https://github.com/acme/lib/pull/{number}"),
        "headRefName": branch,
    })
}

pub fn commit_response(date: &str) -> Value {
    json!({ "commit": { "committer": { "date": date } } })
}

/// Routes for a fork `owner/name` of `parent` with branches `main` (aaaa)
/// and `feature` (bbbb). Compare and PR search are left to the caller.
pub fn scripted_fork_gateway(owner: &str, name: &str, parent: &str) -> FakeGateway {
    FakeGateway::new()
        .rest(
            &format!("repos/{owner}/{name}/commits?sha=main&per_page=1"),
            json!([commit_response("2024-03-01T10:00:00Z")]),
        )
        .rest(
            &format!("repos/{parent}/commits?sha=main&per_page=1"),
            json!([commit_response("2024-04-01T10:00:00Z")]),
        )
        .rest(
            &format!("repos/{owner}/{name}/branches?per_page=100"),
            json!([
                { "name": "main", "commit": { "sha": "aaaa" } },
                { "name": "feature", "commit": { "sha": "bbbb" } }
            ]),
        )
        .rest(
            &format!("repos/{owner}/{name}/commits/bbbb"),
            commit_response("2024-02-15T09:30:00Z"),
        )
}
