use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::config::{config_dir, ProfileEntry};
use crate::error::{Result, TriageError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub gh_user: Option<String>,
}

impl Profile {
    pub fn require_gh_user(&self) -> Result<&str> {
        self.gh_user
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                TriageError::Profile(format!(
                    "profile {:?} has no GitHub user configured",
                    self.name
                ))
            })
    }
}

pub trait ProfileLookup {
    fn lookup(&self, name: &str) -> Result<Profile>;
}

pub struct GitConfigProfiles;

impl ProfileLookup for GitConfigProfiles {
    fn lookup(&self, name: &str) -> Result<Profile> {
        let pattern = format!("^identity\\.{}\\.", escape_regex(name));
        let output = Command::new("git")
            .args(["config", "--global", "--get-regexp", &pattern])
            .output()?;
        // Exit status 1 means no key matched.
        if !output.status.success() {
            return Err(TriageError::Profile(format!("profile {name:?} not found")));
        }
        parse_profile(name, &String::from_utf8_lossy(&output.stdout))
    }
}

// Build a profile from `--get-regexp` output lines of `identity.<name>.<key> <value>`.
fn parse_profile(name: &str, listing: &str) -> Result<Profile> {
    let prefix = format!("identity.{name}.");
    let mut found = false;
    let mut gh_user = None;
    for line in listing.lines() {
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        let Some(field) = key.strip_prefix(&prefix) else {
            continue;
        };
        found = true;
        if field.eq_ignore_ascii_case("ghuser") {
            gh_user = Some(value.trim().to_string());
        }
    }
    if !found {
        return Err(TriageError::Profile(format!("profile {name:?} not found")));
    }
    Ok(Profile {
        name: name.to_string(),
        gh_user,
    })
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct ConfiguredProfiles<'a, F> {
    entries: &'a BTreeMap<String, ProfileEntry>,
    fallback: F,
}

impl<'a, F: ProfileLookup> ConfiguredProfiles<'a, F> {
    pub fn new(entries: &'a BTreeMap<String, ProfileEntry>, fallback: F) -> Self {
        Self { entries, fallback }
    }
}

impl<F: ProfileLookup> ProfileLookup for ConfiguredProfiles<'_, F> {
    fn lookup(&self, name: &str) -> Result<Profile> {
        match self.entries.get(name) {
            Some(entry) => Ok(Profile {
                name: name.to_string(),
                gh_user: entry.gh_user.clone(),
            }),
            None => self.fallback.lookup(name),
        }
    }
}

// Removed from disk when dropped.
#[derive(Debug)]
pub struct IdentityScope {
    dir: TempDir,
    gh_user: String,
}

impl IdentityScope {
    pub fn materialize(profile: &Profile) -> Result<Self> {
        Self::materialize_from(profile, &real_gh_config_dir())
    }

    pub fn materialize_from(profile: &Profile, real_config_dir: &Path) -> Result<Self> {
        let gh_user = profile.require_gh_user()?.to_string();
        let dir = tempfile::Builder::new().prefix("fork-triage-").tempdir()?;

        let real_config = real_config_dir.join("config.yml");
        if real_config.exists() {
            link_or_copy(&real_config, &dir.path().join("config.yml"))?;
        }

        write_private(&dir.path().join("hosts.yml"), hosts_yaml(&gh_user).as_bytes())?;

        tracing::debug!(user = %gh_user, dir = %dir.path().display(), "identity scope ready");
        Ok(Self { dir, gh_user })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn gh_user(&self) -> &str {
        &self.gh_user
    }
}

fn hosts_yaml(user: &str) -> String {
    format!(
        "github.com:\n    git_protocol: ssh\n    users:\n        {user}:\n    user: {user}\n"
    )
}

fn real_gh_config_dir() -> PathBuf {
    std::env::var("GH_CONFIG_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("gh"))
}

#[cfg(unix)]
fn link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    std::os::unix::fs::symlink(src, dst)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    std::fs::copy(src, dst)?;
    Ok(())
}

fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoProfiles;

    impl ProfileLookup for NoProfiles {
        fn lookup(&self, name: &str) -> Result<Profile> {
            Err(TriageError::Profile(format!("profile {name:?} not found")))
        }
    }

    fn profile(user: Option<&str>) -> Profile {
        Profile {
            name: "work".to_string(),
            gh_user: user.map(String::from),
        }
    }

    #[test]
    fn configured_profile_wins() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "work".to_string(),
            ProfileEntry {
                gh_user: Some("octo-work".to_string()),
            },
        );
        let lookup = ConfiguredProfiles::new(&entries, NoProfiles);
        let p = lookup.lookup("work").unwrap();
        assert_eq!(p.gh_user.as_deref(), Some("octo-work"));
        assert!(lookup.lookup("home").is_err());
    }

    #[test]
    fn git_profile_without_gh_user_is_not_missing() {
        let listing = "identity.work.email me@work.example\nidentity.work.sshkey ~/.ssh/work\n";
        let p = parse_profile("work", listing).unwrap();
        assert_eq!(p.gh_user, None);
        let err = p.require_gh_user().unwrap_err();
        assert!(err.to_string().contains("has no GitHub user configured"));
    }

    #[test]
    fn git_profile_reads_gh_user() {
        let listing = "identity.work.email me@work.example\nidentity.work.ghuser octo-work\n";
        let p = parse_profile("work", listing).unwrap();
        assert_eq!(p.require_gh_user().unwrap(), "octo-work");
    }

    #[test]
    fn git_profile_ignores_other_profiles() {
        let err = parse_profile("work", "identity.workshop.ghuser octo\n").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn profile_names_are_regex_escaped() {
        assert_eq!(escape_regex("my.work"), "my\\.work");
        assert_eq!(escape_regex("plain"), "plain");
    }

    #[test]
    fn scope_requires_gh_user() {
        let real = tempfile::tempdir().unwrap();
        let err = IdentityScope::materialize_from(&profile(None), real.path()).unwrap_err();
        assert!(err.to_string().contains("no GitHub user"));
        let err = IdentityScope::materialize_from(&profile(Some("")), real.path()).unwrap_err();
        assert!(matches!(err, TriageError::Profile(_)));
    }

    #[test]
    fn scope_writes_hosts_and_links_config() {
        let real = tempfile::tempdir().unwrap();
        std::fs::write(real.path().join("config.yml"), "editor: vim\n").unwrap();

        let scope =
            IdentityScope::materialize_from(&profile(Some("octo-work")), real.path()).unwrap();
        let hosts = std::fs::read_to_string(scope.path().join("hosts.yml")).unwrap();
        assert!(hosts.contains("user: octo-work"));
        assert!(hosts.contains("        octo-work:"));
        let config = std::fs::read_to_string(scope.path().join("config.yml")).unwrap();
        assert_eq!(config, "editor: vim\n");
        assert_eq!(scope.gh_user(), "octo-work");
    }

    #[test]
    fn scope_is_removed_on_drop() {
        let real = tempfile::tempdir().unwrap();
        let scope = IdentityScope::materialize_from(&profile(Some("octo")), real.path()).unwrap();
        let path = scope.path().to_path_buf();
        assert!(path.exists());
        drop(scope);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn hosts_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let real = tempfile::tempdir().unwrap();
        let scope = IdentityScope::materialize_from(&profile(Some("octo")), real.path()).unwrap();
        let mode = std::fs::metadata(scope.path().join("hosts.yml"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
