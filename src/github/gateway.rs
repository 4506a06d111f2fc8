use std::fmt;
use std::future::Future;

use crate::error::Result;
use crate::github::client::OctocrabGateway;
use crate::github::gh_cli::GhCliGateway;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRequest {
    /// Relative to the API root, query string included.
    Rest { endpoint: String },
    Graphql { query: String },
}

impl ApiRequest {
    pub fn rest(endpoint: impl Into<String>) -> Self {
        ApiRequest::Rest {
            endpoint: endpoint.into(),
        }
    }

    pub fn graphql(query: impl Into<String>) -> Self {
        ApiRequest::Graphql {
            query: query.into(),
        }
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiRequest::Rest { endpoint } => write!(f, "GET {endpoint}"),
            ApiRequest::Graphql { .. } => write!(f, "POST graphql"),
        }
    }
}

// Calls have no deadline; a hung call stalls the worker that issued it.
pub trait ApiGateway: Send + Sync + 'static {
    fn call(&self, request: &ApiRequest) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Must succeed before any fork is analyzed.
    fn check_auth(&self) -> impl Future<Output = Result<()>> + Send;
}

pub enum Gateway {
    Cli(GhCliGateway),
    Token(OctocrabGateway),
}

impl ApiGateway for Gateway {
    async fn call(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        match self {
            Gateway::Cli(g) => g.call(request).await,
            Gateway::Token(g) => g.call(request).await,
        }
    }

    async fn check_auth(&self) -> Result<()> {
        match self {
            Gateway::Cli(g) => g.check_auth().await,
            Gateway::Token(g) => g.check_auth().await,
        }
    }
}
