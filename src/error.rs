use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("github error: {0}")]
    GitHub(String),

    #[error("{}", not_authenticated_message(.profile))]
    NotAuthenticated { profile: Option<String> },

    #[error("{0}")]
    Profile(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker error: {0}")]
    Worker(String),
}

fn not_authenticated_message(profile: &Option<String>) -> String {
    match profile {
        Some(name) => format!("not authenticated as profile {name:?}. Run: gh auth login"),
        None => "not authenticated. Run: gh auth login".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
