use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Gh,
    Token,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub gh_user: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: Backend,
    pub github_token: Option<String>,
    pub gh_program: String,
    pub cache_dir: Option<PathBuf>,
    pub show_all: bool,
    pub no_cache: bool,
    pub progress_tick_ms: u64,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("gh_program", &self.gh_program)
            .field("cache_dir", &self.cache_dir)
            .field("show_all", &self.show_all)
            .field("no_cache", &self.no_cache)
            .field("progress_tick_ms", &self.progress_tick_ms)
            .field("profiles", &self.profiles)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Gh,
            github_token: None,
            gh_program: "gh".to_string(),
            cache_dir: None,
            show_all: false,
            no_cache: false,
            progress_tick_ms: 80,
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub show_all: bool,
    pub no_cache: bool,
}

impl Config {
    pub fn load(overrides: CliOverrides) -> Self {
        let config_file = config_dir().join("fork-triage").join("config.toml");
        Self::figment(&config_file, overrides)
            .extract()
            .unwrap_or_else(|e| {
                eprintln!("warning: config parse error, using defaults: {e}");
                Config::default()
            })
    }

    fn figment(config_file: &std::path::Path, overrides: CliOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if config_file.exists() {
            figment = figment.merge(Toml::file(config_file));
        }

        figment = figment.merge(Env::prefixed("FORK_TRIAGE_")).merge(
            Env::raw()
                .only(&["GITHUB_TOKEN"])
                .map(|_| "github_token".into()),
        );

        if overrides.show_all {
            figment = figment.merge(Serialized::default("show_all", true));
        }
        if overrides.no_cache {
            figment = figment.merge(Serialized::default("no_cache", true));
        }

        figment
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_cache_dir() -> PathBuf {
    std::env::var("XDG_CACHE_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".cache"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fork-triage")
        .join("prs")
}
