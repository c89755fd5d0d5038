use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A single parameter as served by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

/// Client for a remote parameter store.
///
/// Lookups are pass-throughs: no caching and no retries happen here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParameterProvider: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// HTTP client for the remote parameter store.
pub struct HttpParameterStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpParameterStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn parameter_url(&self, name: &str) -> String {
        // Parameter names are path-like and start with a slash.
        format!("{}/parameters{}", self.base_url, name)
    }
}

#[async_trait]
impl ParameterProvider for HttpParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let url = self.parameter_url(name);

        let response = self.http.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("parameter store unreachable: {}", e))
        })?;

        let status = response.status();
        if status.is_success() {
            let parameter: ParameterValue = response.json().await.map_err(|e| {
                AppError::UpstreamUnavailable(format!(
                    "parameter store returned malformed body: {}",
                    e
                ))
            })?;
            Ok(parameter.value)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(AppError::NotFound(format!(
                "parameter {} does not exist",
                name
            )))
        } else {
            Err(AppError::UpstreamUnavailable(format!(
                "parameter store returned status {}",
                status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_url_joins_path_names() {
        let store = HttpParameterStore::new("http://localhost:4000");
        assert_eq!(
            store.parameter_url("/lambda-powertools/container"),
            "http://localhost:4000/parameters/lambda-powertools/container"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_returns_value() {
        let mut provider = MockParameterProvider::new();
        provider
            .expect_get_parameter()
            .returning(|_| Ok("some-value".to_string()));

        let value = provider.get_parameter("/any/name").await.unwrap();
        assert_eq!(value, "some-value");
    }
}
