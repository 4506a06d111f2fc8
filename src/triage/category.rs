use serde::{Deserialize, Serialize};

use crate::triage::types::Fork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Maintained,
    Contribution,
    Untouched,
}

impl Category {
    /// Unknown divergence counts as zero here.
    pub fn classify(ahead: Option<u32>, non_default_branches: usize, has_open_pr: bool) -> Self {
        if ahead.unwrap_or(0) > 0 {
            Category::Maintained
        } else if non_default_branches > 0 || has_open_pr {
            Category::Contribution
        } else {
            Category::Untouched
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Category::Maintained => 0,
            Category::Contribution => 1,
            Category::Untouched => 2,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Category::Maintained => "Maintained",
            Category::Contribution => "Contributions",
            Category::Untouched => "Untouched",
        }
    }
}

/// Order by category rank, then by name. Completion order never leaks through.
pub fn sort_forks(forks: &mut [Fork]) {
    forks.sort_by(|a, b| {
        a.category
            .rank()
            .cmp(&b.category.rank())
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn finalize(mut forks: Vec<Fork>, show_all: bool) -> Vec<Fork> {
    if !show_all {
        forks.retain(|f| f.category != Category::Untouched);
    }
    sort_forks(&mut forks);
    forks
}
