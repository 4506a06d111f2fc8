use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::github::forks;
use crate::github::gateway::ApiGateway;
use crate::progress::{self, Progress};
use crate::triage::analyzer::ForkAnalyzer;
use crate::triage::cache::PrCacheStore;
use crate::triage::category;
use crate::triage::orchestrator::{self, AnalysisWarning};
use crate::triage::types::Fork;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub show_all: bool,
    pub bypass_cache_reads: bool,
    pub cache_dir: std::path::PathBuf,
    // `None` disables the live status line.
    pub progress_tick: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TriageReport {
    pub enumerated: usize,
    pub forks: Vec<Fork>,
    pub warnings: Vec<AnalysisWarning>,
}

impl TriageReport {
    pub fn analyzed(&self) -> usize {
        self.enumerated - self.warnings.len()
    }
}

/// Only authentication and enumeration failures abort the run.
pub async fn run<G: ApiGateway>(gateway: Arc<G>, options: &RunOptions) -> Result<TriageReport> {
    status(options, "Checking authentication...");
    let auth = gateway.check_auth().await;
    clear_status(options);
    auth?;

    status(options, "Fetching fork list...");
    let repos = forks::list_forks(gateway.as_ref()).await;
    clear_status(options);
    let repos = repos?;

    if repos.is_empty() {
        return Ok(TriageReport::default());
    }

    let (progress, reporter) = match options.progress_tick {
        Some(tick) => {
            let (progress, rx) = Progress::channel(progress::QUEUE_CAPACITY);
            let reporter = progress::spawn_reporter(repos.len(), rx, progress.counter(), tick);
            (progress, Some(reporter))
        }
        None => (Progress::disabled(), None),
    };

    let analyzer = ForkAnalyzer::new(gateway, PrCacheStore::new(&options.cache_dir))
        .bypass_cache_reads(options.bypass_cache_reads)
        .with_progress(progress.clone());

    let analysis = orchestrator::analyze_forks(Arc::new(analyzer), &repos, progress).await;
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }
    // Logged only now so the status line cannot overwrite them.
    for warning in &analysis.warnings {
        tracing::warn!(repo = %warning.repo, error = %warning.error, "failed to analyze fork");
    }

    Ok(TriageReport {
        enumerated: repos.len(),
        forks: category::finalize(analysis.forks, options.show_all),
        warnings: analysis.warnings,
    })
}

fn status(options: &RunOptions, message: &str) {
    if options.progress_tick.is_some() && std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let _ = progress::redraw(Some(&format!("⠋ {message}")));
    }
}

fn clear_status(options: &RunOptions) {
    if options.progress_tick.is_some() && std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let _ = progress::redraw(None);
    }
}
