use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::triage::types::{PrState, PullRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPullRequest {
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub url: String,
    pub branch: String,
}

impl From<&PullRequest> for CachedPullRequest {
    fn from(pr: &PullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            state: pr.state,
            url: pr.url.clone(),
            branch: pr.branch.clone(),
        }
    }
}

impl From<&CachedPullRequest> for PullRequest {
    fn from(pr: &CachedPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            state: pr.state,
            url: pr.url.clone(),
            branch: pr.branch.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrCache {
    #[serde(default)]
    pub prs: BTreeMap<u64, CachedPullRequest>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PrCache {
    pub fn is_empty(&self) -> bool {
        self.prs.is_empty()
    }

    /// Overlay terminal pull requests; open ones are never stored.
    pub fn record(&mut self, prs: &[PullRequest]) {
        for pr in prs.iter().filter(|pr| pr.state.is_terminal()) {
            self.prs.insert(pr.number, CachedPullRequest::from(pr));
        }
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.prs.values().map(PullRequest::from).collect()
    }
}

/// Live results win; the cache only fills in numbers the search left out.
pub fn merge_cached(mut live: Vec<PullRequest>, cache: &PrCache) -> Vec<PullRequest> {
    let seen: HashSet<u64> = live.iter().map(|pr| pr.number).collect();
    live.extend(
        cache
            .prs
            .values()
            .filter(|cached| !seen.contains(&cached.number))
            .map(PullRequest::from),
    );
    live
}

// Saves are atomic renames but there is no locking: two writers for the same
// upstream race and the later save wins.
#[derive(Debug, Clone)]
pub struct PrCacheStore {
    root: PathBuf,
}

impl PrCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, upstream: &str) -> PathBuf {
        self.root.join(cache_file_name(upstream))
    }

    /// Missing or corrupt files read as an empty cache.
    pub fn load(&self, upstream: &str) -> PrCache {
        let path = self.path_for(upstream);
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "pr cache unreadable");
                }
                return PrCache::default();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "pr cache corrupt, ignoring");
                PrCache::default()
            }
        }
    }

    pub fn persist(&self, upstream: &str, prs: &[PullRequest]) -> Result<()> {
        self.persist_at(upstream, prs, Utc::now())
    }

    pub fn persist_at(
        &self,
        upstream: &str,
        prs: &[PullRequest],
        now: DateTime<Utc>,
    ) -> Result<()> {
        create_private_dir(&self.root)?;

        let mut cache = self.load(upstream);
        cache.record(prs);
        cache.updated_at = Some(now);

        let data = serde_json::to_vec_pretty(&cache)?;
        write_atomic(&self.root, &self.path_for(upstream), &data)
    }
}

fn cache_file_name(upstream: &str) -> String {
    let escaped: String = upstream
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{escaped}.json")
}

fn create_private_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)?;
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(dir)?;
    Ok(())
}

// NamedTempFile is created 0600, so the rename keeps the file private.
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_pr;
    use chrono::TimeZone;

    fn store() -> (tempfile::TempDir, PrCacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PrCacheStore::new(dir.path().join("prs"));
        (dir, store)
    }

    fn states(cache: &PrCache) -> Vec<(u64, PrState)> {
        cache.prs.values().map(|p| (p.number, p.state)).collect()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        assert!(store.load("acme/lib").is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path_for("acme/lib").parent().unwrap()).unwrap();
        std::fs::write(store.path_for("acme/lib"), b"{ not json").unwrap();
        assert!(store.load("acme/lib").is_empty());
    }

    #[test]
    fn test_file_name_escapes_separators() {
        let (_dir, store) = store();
        let path = store.path_for("acme/lib");
        assert_eq!(path.file_name().unwrap(), "acme_lib.json");
    }

    #[test]
    fn test_only_terminal_states_persist() {
        let (_dir, store) = store();
        let prs = vec![
            make_pr(1, PrState::Open, "wip"),
            make_pr(2, PrState::Merged, "fix"),
            make_pr(3, PrState::Closed, "nope"),
        ];
        store.persist("acme/lib", &prs).unwrap();

        let cache = store.load("acme/lib");
        assert_eq!(
            states(&cache),
            vec![(2, PrState::Merged), (3, PrState::Closed)]
        );
        assert!(cache.updated_at.is_some());
    }

    #[test]
    fn test_persist_overlays_existing_entries() {
        let (_dir, store) = store();
        store
            .persist("acme/lib", &[make_pr(5, PrState::Closed, "a")])
            .unwrap();
        store
            .persist("acme/lib", &[make_pr(6, PrState::Merged, "b")])
            .unwrap();

        let cache = store.load("acme/lib");
        assert_eq!(
            states(&cache),
            vec![(5, PrState::Closed), (6, PrState::Merged)]
        );
    }

    #[test]
    fn test_fresh_state_wins_over_cache() {
        let (_dir, store) = store();
        store
            .persist("acme/lib", &[make_pr(42, PrState::Closed, "topic")])
            .unwrap();

        let cache = store.load("acme/lib");
        let merged = merge_cached(vec![make_pr(42, PrState::Merged, "topic")], &cache);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].state, PrState::Merged);

        store.persist("acme/lib", &merged).unwrap();
        assert_eq!(states(&store.load("acme/lib")), vec![(42, PrState::Merged)]);
    }

    #[test]
    fn test_cache_fills_search_gaps() {
        let mut cache = PrCache::default();
        cache.record(&[make_pr(7, PrState::Merged, "old-fix")]);

        let live = vec![
            make_pr(8, PrState::Open, "new-thing"),
            make_pr(9, PrState::Closed, "abandoned"),
        ];
        let merged = merge_cached(live, &cache);

        let numbers: Vec<u64> = merged.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![8, 9, 7]);
        let recovered = merged.iter().find(|p| p.number == 7).unwrap();
        assert_eq!(recovered.branch, "old-fix");
        assert_eq!(recovered.state, PrState::Merged);
    }

    #[test]
    fn test_merge_and_persist_is_idempotent() {
        let (_dir, store) = store();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let live = vec![
            make_pr(1, PrState::Open, "a"),
            make_pr(2, PrState::Merged, "b"),
            make_pr(3, PrState::Closed, "c"),
        ];

        let run = || {
            let merged = merge_cached(live.clone(), &store.load("acme/lib"));
            store.persist_at("acme/lib", &merged, now).unwrap();
            std::fs::read(store.path_for("acme/lib")).unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(store.load("acme/lib").prs.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = store();
        store
            .persist("acme/lib", &[make_pr(2, PrState::Merged, "b")])
            .unwrap();
        let mode = std::fs::metadata(store.path_for("acme/lib"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }
}
