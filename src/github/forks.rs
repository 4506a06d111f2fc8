use crate::error::{Result, TriageError};
use crate::github::gateway::{ApiGateway, ApiRequest};
use crate::github::types::{GraphqlEnvelope, RepoNode, ViewerData};

/// Only the first page is requested; larger accounts see a truncated list.
pub const FORK_PAGE_SIZE: usize = 100;

fn forks_query() -> String {
    format!(
        "query {{
  viewer {{
    repositories(first: {FORK_PAGE_SIZE}, isFork: true, ownerAffiliations: OWNER) {{
      nodes {{
        name
        nameWithOwner
        url
        isFork
        defaultBranchRef {{ name }}
        parent {{
          name
          nameWithOwner
          defaultBranchRef {{ name }}
        }}
      }}
    }}
  }}
}}"
    )
}

pub async fn list_forks<G: ApiGateway>(gateway: &G) -> Result<Vec<RepoNode>> {
    let body = gateway.call(&ApiRequest::graphql(forks_query())).await?;
    let repos = parse_forks(&body)?;

    if repos.len() >= FORK_PAGE_SIZE {
        tracing::warn!(
            count = repos.len(),
            "fork list hit the page size; only the first {FORK_PAGE_SIZE} forks are analyzed"
        );
    }
    Ok(repos)
}

pub(crate) fn parse_forks(body: &[u8]) -> Result<Vec<RepoNode>> {
    let envelope: GraphqlEnvelope<ViewerData> = serde_json::from_slice(body)?;
    if let Some(err) = envelope.errors.first() {
        return Err(TriageError::GitHub(err.message.clone()));
    }
    let data = envelope
        .data
        .ok_or_else(|| TriageError::GitHub("fork query returned no data".to_string()))?;
    Ok(data.viewer.repositories.nodes)
}
