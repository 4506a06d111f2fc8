use crossterm::style::{StyledContent, Stylize};
use itertools::Itertools;
use std::fmt::Write;

use crate::progress::truncate_width;
use crate::triage::category::Category;
use crate::triage::types::{Fork, PrState};

const TITLE_WIDTH: usize = 50;

pub fn to_json(forks: &[Fork]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(forks)
}

/// Human-readable report grouped by category. Expects sorted input.
pub fn to_text(forks: &[Fork]) -> String {
    if forks.is_empty() {
        return format!(
            "{}\n",
            "No active forks found. Use --all to see untouched forks.".dim()
        );
    }

    let mut out = String::new();
    let groups = forks.iter().chunk_by(|f| f.category);
    for (i, (category, group)) in (&groups).into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", heading(category));
        for fork in group {
            write_fork(&mut out, fork);
        }
    }
    out
}

fn heading(category: Category) -> StyledContent<String> {
    let text = match category {
        Category::Maintained => format!("● {}", category.heading()),
        Category::Contribution => format!("○ {}", category.heading()),
        Category::Untouched => format!("· {}", category.heading()),
    };
    tint(category, text)
}

fn tint(category: Category, text: String) -> StyledContent<String> {
    match category {
        Category::Maintained => text.green().bold(),
        Category::Contribution => text.yellow(),
        Category::Untouched => text.dim(),
    }
}

fn write_fork(out: &mut String, fork: &Fork) {
    let _ = writeln!(out, "{}", tint(fork.category, fork.full_name.clone()));
    if let Some(parent) = &fork.parent_full_name {
        let _ = writeln!(out, "    {}", format!("↑ {parent}").dim());
    }
    let _ = writeln!(out, "    {}", divergence_line(fork));

    for branch in fork.non_default_branches() {
        let mut line = format!("    {}", format!("⎇ {}", branch.name).cyan());
        if let Some(commit) = &branch.commit {
            let date = commit.date.clone().dim();
            let ago = commit.ago.clone().dim().italic();
            let _ = write!(line, "  {date} · {ago}");
        }
        let _ = writeln!(out, "{line}");

        if let Some(pr) = &branch.pr {
            let label = format!("{} #{}", pr.state.label(), pr.number);
            let label = match pr.state {
                PrState::Open => label.yellow(),
                PrState::Merged => label.green().bold(),
                PrState::Closed => label.red(),
            };
            let title = truncate_width(&pr.title, TITLE_WIDTH).dim();
            let _ = writeln!(out, "        {label} {title}");
        }
    }
    out.push('\n');
}

fn divergence_line(fork: &Fork) -> String {
    let ahead = fork.ahead.unwrap_or(0);
    let behind = fork.behind.unwrap_or(0);
    if fork.ahead.is_none() && fork.behind.is_none() {
        return "divergence unknown".dim().to_string();
    }
    if ahead == 0 && behind == 0 {
        let mut s = "in sync".to_string();
        if let Some(up) = &fork.upstream_last_commit {
            let _ = write!(s, " (upstream: {})", up.ago);
        }
        return s.green().to_string();
    }

    let mut parts = Vec::new();
    if ahead > 0 {
        let mut s = format!("{ahead} ahead");
        if let Some(own) = &fork.fork_last_commit {
            let _ = write!(s, " ({})", own.ago);
        }
        parts.push(s.green().bold().to_string());
    }
    if behind > 0 {
        let mut s = format!("{behind} behind");
        if let Some(up) = &fork.upstream_last_commit {
            let _ = write!(s, " (upstream: {})", up.ago);
        }
        parts.push(s.red().to_string());
    }
    parts.join("  ")
}
