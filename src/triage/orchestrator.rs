use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{Result, TriageError};
use crate::github::gateway::ApiGateway;
use crate::github::types::RepoNode;
use crate::progress::Progress;
use crate::triage::analyzer::ForkAnalyzer;
use crate::triage::types::Fork;

// At most this many forks are analyzed at once, to stay inside the API rate limits.
pub const MAX_WORKERS: usize = 5;

#[derive(Debug)]
pub struct AnalysisWarning {
    pub repo: String,
    pub error: TriageError,
}

#[derive(Debug, Default)]
pub struct Analysis {
    pub forks: Vec<Fork>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Slot `i` of the result always belongs to `items[i]`, whatever order the
/// jobs finish in. A panicking job becomes an error in its own slot.
pub async fn run_indexed<T, R, F, Fut>(items: &[T], workers: usize, job: F) -> Vec<Result<R>>
where
    T: Clone,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let handles: Vec<_> = items
        .iter()
        .cloned()
        .enumerate()
        .map(|(idx, item)| {
            let semaphore = Arc::clone(&semaphore);
            let task = job(idx, item);
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| TriageError::Worker("admission limiter closed".to_string()))?;
                task.await
            })
        })
        .collect();

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|e| Err(TriageError::Worker(e.to_string()))))
        .collect()
}

pub fn collect(repos: &[RepoNode], slots: Vec<Result<Fork>>) -> Analysis {
    let mut analysis = Analysis::default();
    for (repo, slot) in repos.iter().zip(slots) {
        match slot {
            Ok(fork) => analysis.forks.push(fork),
            Err(error) => analysis.warnings.push(AnalysisWarning {
                repo: repo.full_name.clone(),
                error,
            }),
        }
    }
    analysis
}

pub async fn analyze_forks<G: ApiGateway>(
    analyzer: Arc<ForkAnalyzer<G>>,
    repos: &[RepoNode],
    progress: Progress,
) -> Analysis {
    let slots = run_indexed(repos, MAX_WORKERS, |_, repo| {
        let analyzer = Arc::clone(&analyzer);
        let progress = progress.clone();
        async move {
            let result = analyzer.analyze(&repo).await;
            progress.finished(&repo.name);
            result
        }
    })
    .await;

    let analysis = collect(repos, slots);
    tracing::info!(
        analyzed = analysis.forks.len(),
        failed = analysis.warnings.len(),
        "fork analysis complete"
    );
    analysis
}
