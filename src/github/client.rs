use octocrab::Octocrab;
use serde_json::{json, Value};

use crate::error::{Result, TriageError};
use crate::github::gateway::{ApiGateway, ApiRequest};

#[derive(Clone)]
pub struct OctocrabGateway {
    octo: Octocrab,
}

impl OctocrabGateway {
    pub fn new(token: &str) -> Result<Self> {
        let octo = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| TriageError::GitHub(e.to_string()))?;

        Ok(Self { octo })
    }
}

fn route(endpoint: &str) -> String {
    format!("/{}", endpoint.trim_start_matches('/'))
}

impl ApiGateway for OctocrabGateway {
    async fn call(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        tracing::trace!(%request, "octocrab call");
        let value: Value = match request {
            ApiRequest::Rest { endpoint } => self
                .octo
                .get::<Value, _, _>(route(endpoint), None::<&()>)
                .await
                .map_err(|e| TriageError::GitHub(e.to_string()))?,
            ApiRequest::Graphql { query } => self
                .octo
                .graphql::<Value>(&json!({ "query": query }))
                .await
                .map_err(|e| TriageError::GitHub(e.to_string()))?,
        };
        Ok(serde_json::to_vec(&value)?)
    }

    async fn check_auth(&self) -> Result<()> {
        match self.octo.current().user().await {
            Ok(user) => {
                tracing::debug!(login = %user.login, "token authenticated");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                Err(TriageError::NotAuthenticated { profile: None })
            }
        }
    }
}
