use serde::{Deserialize, Serialize};

use crate::github::types::RepoNode;
use crate::triage::category::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

impl PrState {
    /// Merged and closed pull requests never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, PrState::Merged | PrState::Closed)
    }

    /// Lower is more relevant when several PRs come from one branch.
    pub fn link_priority(self) -> u8 {
        match self {
            PrState::Open => 0,
            PrState::Merged => 1,
            PrState::Closed => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Merged => "merged",
            PrState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub url: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recency {
    pub date: String,
    pub ago: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<Recency>,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PullRequest>,
}

/// One analyzed fork. `None` fields could not be determined, which is not
/// the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fork {
    pub name: String,
    pub full_name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_full_name: Option<String>,
    pub default_branch: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behind: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fork_last_commit: Option<Recency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_last_commit: Option<Recency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Branch>,
}

impl Fork {
    pub fn from_repo(repo: &RepoNode) -> Self {
        Self {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            url: repo.url.clone(),
            parent_name: repo.parent.as_ref().map(|p| p.name.clone()),
            parent_full_name: repo.parent.as_ref().map(|p| p.full_name.clone()),
            default_branch: repo.default_branch_name().unwrap_or_default().to_string(),
            category: Category::Untouched,
            ahead: None,
            behind: None,
            fork_last_commit: None,
            upstream_last_commit: None,
            branches: Vec::new(),
        }
    }

    pub fn non_default_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| !b.is_default)
    }

    pub fn has_open_pr(&self) -> bool {
        self.branches
            .iter()
            .filter_map(|b| b.pr.as_ref())
            .any(|pr| pr.state == PrState::Open)
    }

    pub fn classify(&mut self) {
        self.category = Category::classify(
            self.ahead,
            self.non_default_branches().count(),
            self.has_open_pr(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!PrState::Open.is_terminal());
        assert!(PrState::Merged.is_terminal());
        assert!(PrState::Closed.is_terminal());
    }

    #[test]
    fn state_wire_format_is_uppercase() {
        let json = serde_json::to_string(&PrState::Merged).unwrap();
        assert_eq!(json, "\"MERGED\"");
        let state: PrState = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(state, PrState::Closed);
    }

    #[test]
    fn unknown_fields_are_omitted_from_json() {
        let fork = Fork {
            name: "lib".to_string(),
            full_name: "me/lib".to_string(),
            url: "https://github.com/me/lib".to_string(),
            parent_name: None,
            parent_full_name: None,
            default_branch: "main".to_string(),
            category: Category::Untouched,
            ahead: None,
            behind: Some(0),
            fork_last_commit: None,
            upstream_last_commit: None,
            branches: Vec::new(),
        };
        let value = serde_json::to_value(&fork).unwrap();
        assert!(value.get("ahead").is_none());
        assert_eq!(value["behind"], 0);
        assert_eq!(value["category"], "untouched");
        assert!(value.get("parent_name").is_none());
    }

    #[test]
    fn parent_names_come_from_the_upstream() {
        let mut repo = crate::test_utils::make_repo("me", "my-lib", Some("acme/lib"));
        if let Some(parent) = repo.parent.as_mut() {
            parent.name = "lib".to_string();
        }
        let fork = Fork::from_repo(&repo);
        assert_eq!(fork.parent_name.as_deref(), Some("lib"));
        assert_eq!(fork.parent_full_name.as_deref(), Some("acme/lib"));

        let value = serde_json::to_value(&fork).unwrap();
        assert_eq!(value["parent_name"], "lib");
    }
}
