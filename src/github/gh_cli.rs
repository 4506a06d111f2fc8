use std::ffi::OsString;

use tokio::process::Command;

use crate::error::{Result, TriageError};
use crate::github::gateway::{ApiGateway, ApiRequest};
use crate::github::identity::IdentityScope;

pub struct GhCliGateway {
    program: OsString,
    profile: Option<String>,
    scope: Option<IdentityScope>,
}

impl GhCliGateway {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            profile: None,
            scope: None,
        }
    }

    /// Every call made through this gateway uses the scoped config dir.
    pub fn with_identity(
        program: impl Into<OsString>,
        profile: &str,
        scope: IdentityScope,
    ) -> Self {
        tracing::debug!(profile, user = scope.gh_user(), "gh calls scoped to identity");
        Self {
            program: program.into(),
            profile: Some(profile.to_string()),
            scope: Some(scope),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(scope) = &self.scope {
            cmd.env("GH_CONFIG_DIR", scope.path());
        }
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>> {
        let output = self
            .command()
            .args(&args)
            .output()
            .await
            .map_err(|e| TriageError::GitHub(format!("failed to run gh: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TriageError::GitHub(format!(
                "gh {} exited with {}: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

pub(crate) fn request_args(request: &ApiRequest) -> Vec<String> {
    match request {
        ApiRequest::Rest { endpoint } => vec!["api".to_string(), endpoint.clone()],
        ApiRequest::Graphql { query } => vec![
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={query}"),
        ],
    }
}

impl ApiGateway for GhCliGateway {
    async fn call(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        tracing::trace!(%request, "gh call");
        self.run(request_args(request)).await
    }

    async fn check_auth(&self) -> Result<()> {
        let args = vec!["auth".to_string(), "status".to_string()];
        match self.run(args).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "gh auth status failed");
                Err(TriageError::NotAuthenticated {
                    profile: self.profile.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_args() {
        let args = request_args(&ApiRequest::rest("repos/me/lib/branches?per_page=100"));
        assert_eq!(args, vec!["api", "repos/me/lib/branches?per_page=100"]);
    }

    #[test]
    fn graphql_args() {
        let args = request_args(&ApiRequest::graphql("query { viewer { login } }"));
        assert_eq!(
            args,
            vec!["api", "graphql", "-f", "query=query { viewer { login } }"]
        );
    }

    #[tokio::test]
    async fn missing_program_is_not_authenticated() {
        let gateway = GhCliGateway::new("/nonexistent/fork-triage-gh");
        let err = gateway.check_auth().await.unwrap_err();
        assert!(matches!(err, TriageError::NotAuthenticated { profile: None }));
    }

    #[tokio::test]
    async fn missing_program_call_is_github_error() {
        let gateway = GhCliGateway::new("/nonexistent/fork-triage-gh");
        let err = gateway.call(&ApiRequest::rest("user")).await.unwrap_err();
        assert!(matches!(err, TriageError::GitHub(_)));
    }
}
